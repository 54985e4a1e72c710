//! Process-wide logger setup.

use log::LevelFilter;
use simple_logger::SimpleLogger;

use crate::error::AppError;

/// Pick the level from the `-v` / `-q` flags.
pub fn level_from_flags(verbose: bool, quiet: bool) -> LevelFilter {
    match (verbose, quiet) {
        (true, _) => LevelFilter::Debug,
        (false, true) => LevelFilter::Warn,
        (false, false) => LevelFilter::Info,
    }
}

/// Install the logger. Fails if a logger is already installed.
pub fn init(level: LevelFilter) -> Result<(), AppError> {
    SimpleLogger::new()
        .with_level(level)
        .init()
        .map_err(|e| AppError::usage(format!("Failed to initialise logging: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_to_levels() {
        assert_eq!(level_from_flags(false, false), LevelFilter::Info);
        assert_eq!(level_from_flags(true, false), LevelFilter::Debug);
        assert_eq!(level_from_flags(false, true), LevelFilter::Warn);
    }
}
