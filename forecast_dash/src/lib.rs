//! # Forecast Dash
//!
//! Terminal front end for `forecast_engine`: picks a constituent of the index
//! list, runs one of the two forecasting strategies and prints or exports the
//! resulting tables.

pub mod error;
pub mod export;
pub mod logging;
pub mod render;
pub mod universe;

pub use crate::error::{DashError, Result};
pub use crate::universe::{Constituent, Universe};

/// Constituent list bundled with the crate
pub const SAMPLE_UNIVERSE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/data/nifty500_sample.csv");
