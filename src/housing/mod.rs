//! London housing pipeline over HM Land Registry Price Paid Data: yearly
//! downloads stream-filtered to London, cleaning with typed drop accounting,
//! borough/property/regional aggregation, and SQLite storage.

pub mod aggregate;
pub mod clean;
pub mod fetch;
pub mod records;
pub mod report;
