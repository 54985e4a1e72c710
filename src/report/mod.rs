//! Reporting utilities: terminal summaries of markets, runs and the dashboard.

pub mod format;

pub use format::*;
