//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - raw source observations (`RawObservation`)
//! - clean monthly facts (`SalesFact`) and forecast rows (`ForecastPoint`)
//! - run options and the `etl_logs` audit record
//! - the known ABS state/category code tables

pub mod types;

pub use types::*;
