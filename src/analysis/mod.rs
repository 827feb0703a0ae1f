//! Result aggregation.
//!
//! Turns raw engine records into the series the charts draw.

pub mod aggregator;

pub use aggregator::*;
