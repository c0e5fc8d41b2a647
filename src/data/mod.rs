//! Remote source integration.
//!
//! - ABS Data API client, SDMX-CSV parsing, canonical-variant filter (`abs`)

pub mod abs;

pub use abs::*;
