//! UK economic data pipelines: ONS cost-of-living, FTSE stock performance,
//! and London housing market analysis.

pub mod charts;
pub mod dashboard;
pub mod dates;
pub mod db;
pub mod fetch;
pub mod housing;
pub mod inflation;
pub mod output;
pub mod series;
pub mod stocks;
pub mod util;
