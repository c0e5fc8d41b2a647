//! Per-series forecasting.
//!
//! - seasonal-trend model: multiplicative yearly seasonality + linear trend
//!   with residual-based intervals (`model`)
//! - per-scope training loop and the batch all-scopes driver (`runner`)

pub mod model;
pub mod runner;

pub use model::*;
pub use runner::*;
