//! Per-ticker derived metrics over a date-sorted bar history.

use crate::stocks::Bar;
use crate::util::{mean, stddev};

const VOLATILITY_WINDOW: usize = 20;
const MA_SHORT: usize = 50;
const MA_LONG: usize = 200;

/// Fills in the derived columns for one ticker's history. `bars` must be
/// sorted ascending by date and belong to a single ticker.
///
/// Rolling windows require a full window of observations; earlier rows keep
/// `None`.
pub fn enrich(bars: &mut [Bar]) {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

    // Daily percentage return against the previous close.
    let mut returns: Vec<Option<f64>> = vec![None; bars.len()];
    for i in 1..closes.len() {
        if closes[i - 1] != 0.0 {
            returns[i] = Some((closes[i] / closes[i - 1] - 1.0) * 100.0);
        }
    }

    for (i, bar) in bars.iter_mut().enumerate() {
        bar.daily_return = returns[i];

        // 20-day volatility: stddev over the trailing window of returns.
        if i + 1 >= VOLATILITY_WINDOW + 1 {
            let window: Vec<f64> = returns[i + 1 - VOLATILITY_WINDOW..=i]
                .iter()
                .flatten()
                .copied()
                .collect();
            if window.len() == VOLATILITY_WINDOW {
                let m = mean(&window);
                bar.volatility_20d = Some(stddev(&window, m));
            }
        }

        if i + 1 >= MA_SHORT {
            bar.ma_50 = Some(mean(&closes[i + 1 - MA_SHORT..=i]));
        }
        if i + 1 >= MA_LONG {
            bar.ma_200 = Some(mean(&closes[i + 1 - MA_LONG..=i]));
        }

        if let Some(ma) = bar.ma_50 {
            if ma != 0.0 {
                bar.price_vs_ma50 = Some((bar.close / ma - 1.0) * 100.0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stocks::universe::FTSE_UNIVERSE;
    use chrono::NaiveDate;

    fn history(closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                    + chrono::Duration::days(i as i64);
                Bar::new(date, &FTSE_UNIVERSE[0], c, c, c, c, Some(1000.0))
            })
            .collect()
    }

    #[test]
    fn test_daily_return() {
        let mut bars = history(&[100.0, 110.0, 99.0]);
        enrich(&mut bars);

        assert!(bars[0].daily_return.is_none());
        assert!((bars[1].daily_return.unwrap() - 10.0).abs() < 1e-9);
        assert!((bars[2].daily_return.unwrap() - -10.0).abs() < 1e-9);
    }

    #[test]
    fn test_rolling_windows_need_full_history() {
        let mut bars = history(&vec![100.0; 60]);
        enrich(&mut bars);

        assert!(bars[48].ma_50.is_none());
        assert_eq!(bars[49].ma_50, Some(100.0));
        assert!(bars[59].ma_200.is_none());

        assert!(bars[19].volatility_20d.is_none());
        // 20 returns exist from index 20 onwards, all zero.
        assert_eq!(bars[20].volatility_20d, Some(0.0));
    }

    #[test]
    fn test_price_vs_ma50() {
        let mut closes = vec![100.0; 49];
        closes.push(110.0);
        let mut bars = history(&closes);
        enrich(&mut bars);

        let ma = bars[49].ma_50.unwrap();
        assert!((ma - 100.2).abs() < 1e-9);
        let vs = bars[49].price_vs_ma50.unwrap();
        assert!((vs - (110.0 / ma - 1.0) * 100.0).abs() < 1e-9);
    }
}
