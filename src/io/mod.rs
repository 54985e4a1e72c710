//! Input/output helpers.
//!
//! - CSV location + per-ZIP row lookup (`ingest`)
//! - `market.json` read/write (`market`)
//! - cross-ZIP `dashboard.json` (`dashboard`)
//! - run report and status file (`status`)

pub mod dashboard;
pub mod ingest;
pub mod market;
pub mod status;

pub use dashboard::*;
pub use ingest::*;
pub use market::*;
pub use status::*;
