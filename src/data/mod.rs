//! Data sources: the public ZHVI download and a seeded offline stand-in.

pub mod simulated;
pub mod zillow;

pub use simulated::{SimulatedTable, simulate_zhvi, write_simulated_csv};
pub use zillow::{ZHVI_URL, ZillowClient, retry_with};
