//! The tracked FTSE 100 universe: top constituents by market cap, plus the
//! index itself as benchmark.

pub struct Listing {
    pub ticker: &'static str,
    pub company: &'static str,
    pub sector: &'static str,
}

pub static FTSE_INDEX: Listing = Listing {
    ticker: "^FTSE",
    company: "FTSE 100 Index",
    sector: "Index",
};

pub static FTSE_UNIVERSE: &[Listing] = &[
    // Energy
    Listing { ticker: "SHEL.L", company: "Shell", sector: "Energy" },
    Listing { ticker: "BP.L", company: "BP", sector: "Energy" },
    // Financials
    Listing { ticker: "HSBA.L", company: "HSBC", sector: "Financials" },
    Listing { ticker: "LLOY.L", company: "Lloyds", sector: "Financials" },
    Listing { ticker: "BARC.L", company: "Barclays", sector: "Financials" },
    Listing { ticker: "NWG.L", company: "NatWest", sector: "Financials" },
    Listing { ticker: "STAN.L", company: "Standard Chartered", sector: "Financials" },
    Listing { ticker: "LSEG.L", company: "London Stock Exchange", sector: "Financials" },
    // Consumer goods
    Listing { ticker: "ULVR.L", company: "Unilever", sector: "Consumer Goods" },
    Listing { ticker: "DGE.L", company: "Diageo", sector: "Consumer Goods" },
    Listing { ticker: "RKT.L", company: "Reckitt", sector: "Consumer Goods" },
    Listing { ticker: "BATS.L", company: "British American Tobacco", sector: "Consumer Goods" },
    // Healthcare
    Listing { ticker: "AZN.L", company: "AstraZeneca", sector: "Healthcare" },
    Listing { ticker: "GSK.L", company: "GSK", sector: "Healthcare" },
    // Mining
    Listing { ticker: "RIO.L", company: "Rio Tinto", sector: "Mining" },
    Listing { ticker: "AAL.L", company: "Anglo American", sector: "Mining" },
    Listing { ticker: "GLEN.L", company: "Glencore", sector: "Mining" },
    // Telecom
    Listing { ticker: "VOD.L", company: "Vodafone", sector: "Telecom" },
    Listing { ticker: "BT-A.L", company: "BT Group", sector: "Telecom" },
    // Industrials
    Listing { ticker: "BA.L", company: "BAE Systems", sector: "Industrials" },
    Listing { ticker: "RR.L", company: "Rolls-Royce", sector: "Industrials" },
    Listing { ticker: "REL.L", company: "RELX", sector: "Industrials" },
    // Retail
    Listing { ticker: "TSCO.L", company: "Tesco", sector: "Retail" },
    Listing { ticker: "SBRY.L", company: "Sainsbury", sector: "Retail" },
    Listing { ticker: "JD.L", company: "JD Sports", sector: "Retail" },
    // Utilities
    Listing { ticker: "NG.L", company: "National Grid", sector: "Utilities" },
    Listing { ticker: "SSE.L", company: "SSE", sector: "Utilities" },
    // Real estate
    Listing { ticker: "LAND.L", company: "Land Securities", sector: "Real Estate" },
    Listing { ticker: "BLND.L", company: "British Land", sector: "Real Estate" },
    // Services
    Listing { ticker: "CPG.L", company: "Compass Group", sector: "Services" },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_universe_tickers_are_unique() {
        let mut tickers: Vec<&str> = FTSE_UNIVERSE.iter().map(|l| l.ticker).collect();
        tickers.sort();
        tickers.dedup();
        assert_eq!(tickers.len(), FTSE_UNIVERSE.len());
    }

    #[test]
    fn test_index_is_not_in_universe() {
        assert!(FTSE_UNIVERSE.iter().all(|l| l.ticker != FTSE_INDEX.ticker));
    }
}
