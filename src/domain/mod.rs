//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - market classification enums (`Trend`, `Leverage`, `Granularity`)
//! - the in-memory `MarketSnapshot` produced by the metrics core
//! - the on-disk `MarketFile` schema and insight notes
//! - run configuration (`PipelineConfig`, `MarketProfile`, `RetryPolicy`)

pub mod types;

pub use types::*;
