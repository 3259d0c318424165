//! Performance summaries: per-ticker window returns and sector aggregates.

use crate::stocks::Bar;
use crate::util::{mean, stddev};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Trading-day offsets for the return windows (approx. 1m/3m/6m/1y).
const WINDOW_1M: usize = 21;
const WINDOW_3M: usize = 63;
const WINDOW_6M: usize = 126;
const WINDOW_1Y: usize = 252;

/// Tickers with less history than this are excluded from the summary.
const MIN_HISTORY_ROWS: usize = 50;

/// Liquid names, one or two per major sector, compared pairwise in the
/// return-correlation matrix.
const CORRELATION_TICKERS: &[&str] = &[
    "SHEL.L", "BP.L", "HSBA.L", "LLOY.L", "AZN.L", "GSK.L", "RIO.L", "GLEN.L", "TSCO.L", "NG.L",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerPerformance {
    pub ticker: String,
    pub company: String,
    pub sector: String,
    pub current_price: f64,
    pub return_1m: Option<f64>,
    pub return_3m: Option<f64>,
    pub return_6m: Option<f64>,
    pub return_1y: Option<f64>,
    pub return_total: f64,
    pub volatility: Option<f64>,
    pub avg_volume: Option<f64>,
    pub min_price: f64,
    pub max_price: f64,
    pub price_range_pct: f64,
}

/// Correlation of daily returns between two companies.
#[derive(Debug, Clone, Serialize)]
pub struct ReturnCorrelation {
    pub company_a: String,
    pub company_b: String,
    pub correlation: f64,
}

/// Return of one sector over one calendar month.
#[derive(Debug, Clone, Serialize)]
pub struct MonthlySectorReturn {
    pub year_month: String,
    pub sector: String,
    pub return_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectorPerformance {
    pub sector: String,
    pub return_1m: Option<f64>,
    pub return_3m: Option<f64>,
    pub return_6m: Option<f64>,
    pub return_1y: Option<f64>,
    pub volatility: Option<f64>,
    pub companies: usize,
}

/// Groups a combined bar table by ticker, each history sorted by date.
pub fn group_by_ticker(bars: Vec<Bar>) -> BTreeMap<String, Vec<Bar>> {
    let mut grouped: BTreeMap<String, Vec<Bar>> = BTreeMap::new();
    for bar in bars {
        grouped.entry(bar.ticker.clone()).or_default().push(bar);
    }
    for history in grouped.values_mut() {
        history.sort_by_key(|b| b.date);
    }
    grouped
}

/// Percentage return from `offset` trading days back to the latest close.
fn window_return(closes: &[f64], offset: usize) -> Option<f64> {
    if closes.len() <= offset {
        return None;
    }
    let latest = *closes.last()?;
    let past = closes[closes.len() - 1 - offset];
    if past == 0.0 {
        return None;
    }
    Some((latest / past - 1.0) * 100.0)
}

fn summarize(history: &[Bar]) -> Option<TickerPerformance> {
    if history.len() < MIN_HISTORY_ROWS {
        return None;
    }

    let closes: Vec<f64> = history.iter().map(|b| b.close).collect();
    let latest = history.last()?;
    let first = closes.first()?;

    let min_price = closes.iter().copied().fold(f64::INFINITY, f64::min);
    let max_price = closes.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let price_range_pct = if min_price != 0.0 {
        (max_price / min_price - 1.0) * 100.0
    } else {
        0.0
    };

    let volumes: Vec<f64> = history.iter().filter_map(|b| b.volume).collect();
    let avg_volume = if volumes.is_empty() {
        None
    } else {
        Some(mean(&volumes))
    };

    // Average 20-day volatility over the rows that have one.
    let vols: Vec<f64> = history.iter().filter_map(|b| b.volatility_20d).collect();
    let volatility = if vols.is_empty() {
        None
    } else {
        Some(mean(&vols))
    };

    Some(TickerPerformance {
        ticker: latest.ticker.clone(),
        company: latest.company.clone(),
        sector: latest.sector.clone(),
        current_price: latest.close,
        return_1m: window_return(&closes, WINDOW_1M),
        return_3m: window_return(&closes, WINDOW_3M),
        return_6m: window_return(&closes, WINDOW_6M),
        return_1y: window_return(&closes, WINDOW_1Y),
        return_total: if *first != 0.0 {
            (latest.close / first - 1.0) * 100.0
        } else {
            0.0
        },
        volatility,
        avg_volume,
        min_price,
        max_price,
        price_range_pct,
    })
}

/// Builds the per-ticker performance table, skipping tickers with too little
/// history, sorted by 1-year return descending.
pub fn calculate_performance(grouped: &BTreeMap<String, Vec<Bar>>) -> Vec<TickerPerformance> {
    let mut perf: Vec<TickerPerformance> =
        grouped.values().filter_map(|h| summarize(h)).collect();
    perf.sort_by(|a, b| {
        b.return_1y
            .unwrap_or(f64::MIN)
            .total_cmp(&a.return_1y.unwrap_or(f64::MIN))
    });
    perf
}

/// Pearson correlation of two equal-length samples. `None` when either side
/// is constant or there are fewer than two observations.
fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let mx = mean(xs);
    let my = mean(ys);
    let sx = stddev(xs, mx);
    let sy = stddev(ys, my);
    if sx == 0.0 || sy == 0.0 {
        return None;
    }
    let cov = xs
        .iter()
        .zip(ys)
        .map(|(x, y)| (x - mx) * (y - my))
        .sum::<f64>()
        / xs.len() as f64;
    Some(cov / (sx * sy))
}

/// Pairwise correlation of daily returns between the major tickers, aligned
/// on the trading days both sides have. Produces the upper triangle,
/// diagonal included.
pub fn return_correlations(grouped: &BTreeMap<String, Vec<Bar>>) -> Vec<ReturnCorrelation> {
    let mut returns: Vec<(String, BTreeMap<NaiveDate, f64>)> = Vec::new();
    for ticker in CORRELATION_TICKERS {
        let Some(history) = grouped.get(*ticker) else {
            continue;
        };
        let Some(company) = history.first().map(|b| b.company.clone()) else {
            continue;
        };
        let by_date: BTreeMap<NaiveDate, f64> = history
            .iter()
            .filter_map(|b| b.daily_return.map(|r| (b.date, r)))
            .collect();
        returns.push((company, by_date));
    }

    let mut out = Vec::new();
    for i in 0..returns.len() {
        for j in i..returns.len() {
            let (company_a, a) = &returns[i];
            let (company_b, b) = &returns[j];
            let mut xs = Vec::new();
            let mut ys = Vec::new();
            for (date, x) in a {
                if let Some(y) = b.get(date) {
                    xs.push(*x);
                    ys.push(*y);
                }
            }
            if let Some(correlation) = pearson(&xs, &ys) {
                out.push(ReturnCorrelation {
                    company_a: company_a.clone(),
                    company_b: company_b.clone(),
                    correlation,
                });
            }
        }
    }
    out
}

/// Mean calendar-month return per sector: each ticker's month is priced from
/// its first to its last close, then averaged across the sector's members.
/// Months with a single observation for a ticker are skipped; the benchmark
/// index is excluded.
pub fn monthly_sector_returns(grouped: &BTreeMap<String, Vec<Bar>>) -> Vec<MonthlySectorReturn> {
    let mut buckets: BTreeMap<(String, String), Vec<f64>> = BTreeMap::new();

    for history in grouped.values() {
        let Some(first_bar) = history.first() else {
            continue;
        };
        if first_bar.sector == "Index" {
            continue;
        }

        // (first close, last close, observations) per calendar month; the
        // history is date-sorted so the last assignment is the month's close.
        let mut months: BTreeMap<String, (f64, f64, usize)> = BTreeMap::new();
        for bar in history {
            let ym = bar.date.format("%Y-%m").to_string();
            months
                .entry(ym)
                .and_modify(|(_, last, n)| {
                    *last = bar.close;
                    *n += 1;
                })
                .or_insert((bar.close, bar.close, 1));
        }

        for (ym, (first, last, n)) in months {
            if n > 1 && first != 0.0 {
                buckets
                    .entry((ym, first_bar.sector.clone()))
                    .or_default()
                    .push((last / first - 1.0) * 100.0);
            }
        }
    }

    buckets
        .into_iter()
        .map(|((year_month, sector), rets)| MonthlySectorReturn {
            year_month,
            sector,
            return_pct: mean(&rets),
        })
        .collect()
}

fn sector_mean(values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(mean(&values))
    }
}

/// Averages ticker performance per sector. The benchmark index is excluded.
pub fn sector_performance(perf: &[TickerPerformance]) -> Vec<SectorPerformance> {
    let mut by_sector: BTreeMap<&str, Vec<&TickerPerformance>> = BTreeMap::new();
    for p in perf.iter().filter(|p| p.sector != "Index") {
        by_sector.entry(p.sector.as_str()).or_default().push(p);
    }

    let mut sectors: Vec<SectorPerformance> = by_sector
        .into_iter()
        .map(|(sector, members)| SectorPerformance {
            sector: sector.to_string(),
            return_1m: sector_mean(members.iter().filter_map(|p| p.return_1m).collect()),
            return_3m: sector_mean(members.iter().filter_map(|p| p.return_3m).collect()),
            return_6m: sector_mean(members.iter().filter_map(|p| p.return_6m).collect()),
            return_1y: sector_mean(members.iter().filter_map(|p| p.return_1y).collect()),
            volatility: sector_mean(members.iter().filter_map(|p| p.volatility).collect()),
            companies: members.len(),
        })
        .collect();

    sectors.sort_by(|a, b| {
        b.return_1y
            .unwrap_or(f64::MIN)
            .total_cmp(&a.return_1y.unwrap_or(f64::MIN))
    });
    sectors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stocks::universe::{FTSE_INDEX, FTSE_UNIVERSE};
    use chrono::NaiveDate;

    fn history(listing_idx: usize, closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let date = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
                    + chrono::Duration::days(i as i64);
                Bar::new(
                    date,
                    &FTSE_UNIVERSE[listing_idx],
                    c,
                    c,
                    c,
                    c,
                    Some(1000.0),
                )
            })
            .collect()
    }

    #[test]
    fn test_window_return() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        // 21 days back: 129 vs 108
        let r = window_return(&closes, 21).unwrap();
        assert!((r - (129.0 / 108.0 - 1.0) * 100.0).abs() < 1e-9);
        assert!(window_return(&closes, 63).is_none());
    }

    #[test]
    fn test_short_history_is_skipped() {
        let grouped = group_by_ticker(history(0, &vec![100.0; 40]));
        assert!(calculate_performance(&grouped).is_empty());
    }

    #[test]
    fn test_performance_summary() {
        let mut closes = vec![100.0; 59];
        closes.push(120.0);
        let grouped = group_by_ticker(history(0, &closes));
        let perf = calculate_performance(&grouped);

        assert_eq!(perf.len(), 1);
        let p = &perf[0];
        assert_eq!(p.current_price, 120.0);
        assert!((p.return_total - 20.0).abs() < 1e-9);
        assert!((p.return_1m.unwrap() - 20.0).abs() < 1e-9);
        assert!(p.return_1y.is_none());
        assert_eq!(p.min_price, 100.0);
        assert_eq!(p.max_price, 120.0);
    }

    #[test]
    fn test_return_correlations_on_aligned_histories() {
        // Proportional closes give identical daily returns, so every pair
        // correlates perfectly.
        let closes_a: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let closes_b: Vec<f64> = closes_a.iter().map(|c| c * 4.0).collect();
        let mut bars = history(0, &closes_a); // SHEL.L
        bars.extend(history(2, &closes_b)); // HSBA.L
        let mut grouped = group_by_ticker(bars);
        for h in grouped.values_mut() {
            crate::stocks::metrics::enrich(h);
        }

        let corr = return_correlations(&grouped);
        // two tickers: SHEL x SHEL, SHEL x HSBA, HSBA x HSBA
        assert_eq!(corr.len(), 3);
        for c in &corr {
            assert!((c.correlation - 1.0).abs() < 1e-9, "{c:?}");
        }
    }

    #[test]
    fn test_return_correlations_empty_without_returns() {
        // Bar histories straight from the fetch parser carry no derived
        // returns yet.
        let grouped = group_by_ticker(history(0, &vec![100.0; 60]));
        assert!(return_correlations(&grouped).is_empty());
    }

    #[test]
    fn test_monthly_sector_returns() {
        // 31 January closes 100..130, then a lone February bar that must be
        // skipped.
        let closes: Vec<f64> = (0..32).map(|i| 100.0 + i as f64).collect();
        let grouped = group_by_ticker(history(0, &closes));

        let rets = monthly_sector_returns(&grouped);
        assert_eq!(rets.len(), 1);
        assert_eq!(rets[0].year_month, "2023-01");
        assert_eq!(rets[0].sector, "Energy");
        assert!((rets[0].return_pct - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_monthly_sector_returns_exclude_index() {
        let index_bars: Vec<Bar> = (0..40)
            .map(|i| {
                let date = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
                    + chrono::Duration::days(i as i64);
                Bar::new(date, &FTSE_INDEX, 7500.0, 7500.0, 7500.0, 7500.0, None)
            })
            .collect();
        let grouped = group_by_ticker(index_bars);
        assert!(monthly_sector_returns(&grouped).is_empty());
    }

    #[test]
    fn test_sector_performance_excludes_index() {
        let mut bars = history(0, &vec![100.0; 60]);
        let index_bars: Vec<Bar> = (0..60)
            .map(|i| {
                let date = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
                    + chrono::Duration::days(i as i64);
                Bar::new(date, &FTSE_INDEX, 7500.0, 7500.0, 7500.0, 7500.0, None)
            })
            .collect();
        bars.extend(index_bars);

        let perf = calculate_performance(&group_by_ticker(bars));
        assert_eq!(perf.len(), 2);

        let sectors = sector_performance(&perf);
        assert_eq!(sectors.len(), 1);
        assert_eq!(sectors[0].sector, "Energy");
        assert_eq!(sectors[0].companies, 1);
    }
}
