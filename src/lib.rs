//! `housing-pulse` library crate.
//!
//! The binary (`pulse`) is a thin wrapper around this library so that:
//!
//! - the metrics core is testable without spawning processes
//! - file I/O, fetching and reporting stay swappable collaborators
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod insights;
pub mod io;
pub mod logging;
pub mod metrics;
pub mod report;
