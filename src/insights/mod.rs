//! Human-readable annotations on top of a computed market.
//!
//! - threshold rules for `weekly_insights` (`rules`)
//! - optional remote advisory notes with canned fallbacks (`advisor`)

pub mod advisor;
pub mod rules;

pub use advisor::*;
pub use rules::*;
