//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - turns arg structs into a `PipelineConfig`
//! - dispatches to the pipeline steps
//! - prints the terminal summaries

use std::path::Path;
use std::time::Duration;

use chrono::Local;
use clap::Parser;

use crate::cli::{
    AdviseArgs, Command, CommonArgs, DashboardArgs, FetchArgs, InsightsArgs, MetricsArgs,
    RetryArgs, RunArgs, SimulateArgs,
};
use crate::domain::{MarketProfile, PipelineConfig, RetryPolicy};
use crate::error::AppError;

pub mod pipeline;

const SUBCOMMANDS: [&str; 7] = [
    "fetch",
    "metrics",
    "insights",
    "advise",
    "dashboard",
    "simulate",
    "run",
];

/// Default advisory request timeout when a command has no flag for it.
const ADVISE_TIMEOUT: Duration = Duration::from_secs(30);

/// Entry point for the `pulse` binary.
pub fn run() -> Result<(), AppError> {
    // `pulse`, `pulse 31093` and `pulse -v` all mean `pulse run ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    crate::logging::init(crate::logging::level_from_flags(cli.verbose, cli.quiet))?;

    match cli.command {
        Command::Fetch(args) => handle_fetch(args),
        Command::Metrics(args) => handle_metrics(args),
        Command::Insights(args) => handle_insights(args),
        Command::Advise(args) => handle_advise(args),
        Command::Dashboard(args) => handle_dashboard(args),
        Command::Simulate(args) => handle_simulate(args),
        Command::Run(args) => handle_run(args),
    }
}

fn handle_fetch(args: FetchArgs) -> Result<(), AppError> {
    let config = pipeline_config_from_args(&args.common, Some(&args.retry), &args.zips)?;
    match pipeline::fetch_source(&config) {
        Ok(bytes) => {
            println!("Downloaded {bytes} bytes to {}", config.csv_cache.display());
        }
        Err(e) => {
            log::error!("Failed to fetch Zillow data: {e}");
            let results = pipeline::write_placeholders(&config, Local::now().date_naive());
            println!("{}", crate::report::format_run_results(&results));
        }
    }
    Ok(())
}

fn handle_metrics(args: MetricsArgs) -> Result<(), AppError> {
    let mut config = pipeline_config_from_args(&args.common, None, &[])?;
    let zip = single_zip(args.zip, &config.profile)?;
    config.zip_codes = vec![zip.clone()];
    config.print_summary = !args.no_summary;

    let lookup = pipeline::load_lookup(&config, &config.zip_codes)?;
    let (market, _) = pipeline::build_market(&config, &zip, &lookup, Local::now().date_naive())?;
    let path = pipeline::write_market(&config, &market)?;
    log::info!("Market data for ZIP {zip} written to {}", path.display());

    if config.print_summary {
        println!("{}", crate::report::format_market_summary(&market));
    }
    Ok(())
}

fn handle_insights(args: InsightsArgs) -> Result<(), AppError> {
    let config = pipeline_config_from_args(&args.common, None, &[])?;
    let zip = single_zip(args.zip, &config.profile)?;

    let market = pipeline::annotate_zip(&config, &zip)?;
    println!("{}", crate::report::format_insights(&market.weekly_insights));
    Ok(())
}

fn handle_advise(args: AdviseArgs) -> Result<(), AppError> {
    let mut config = pipeline_config_from_args(&args.common, None, &args.zips)?;
    config.advise_timeout = Duration::from_secs(args.timeout_secs);

    let path = pipeline::advise(&config, &config.zip_codes)?;
    println!("Advisory notes written to {}", path.display());
    Ok(())
}

fn handle_dashboard(args: DashboardArgs) -> Result<(), AppError> {
    let config = pipeline_config_from_args(&args.common, None, &args.zips)?;
    let dashboard = pipeline::dashboard(&config, &config.zip_codes)?;
    println!("{}", crate::report::format_dashboard(&dashboard));
    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let profile = MarketProfile::default();
    let zips = zips_or_default(&args.zips, &profile)?;
    let end = args.end.unwrap_or_else(|| Local::now().date_naive());

    let table = crate::data::simulate_zhvi(
        &zips,
        |zip| profile.city_for(zip).to_string(),
        args.months,
        end,
        args.seed,
    )?;
    crate::data::write_simulated_csv(&args.out, &table)?;
    println!(
        "Simulated {} ZIPs x {} months (seed {}) -> {}",
        table.rows.len(),
        args.months,
        args.seed,
        args.out.display()
    );
    Ok(())
}

fn handle_run(args: RunArgs) -> Result<(), AppError> {
    let mut config = pipeline_config_from_args(&args.common, Some(&args.retry), &args.zips)?;
    config.skip_fetch = args.skip_fetch;
    config.offline_seed = args.offline.then_some(args.seed);
    config.advise_timeout = Duration::from_secs(args.advise_timeout_secs);

    let output = pipeline::run_pipeline(&config)?;

    println!("{}", crate::report::format_run_results(&output.results));
    println!("{}", crate::report::format_dashboard(&output.dashboard));
    println!("Report: {}", output.report_path.display());
    println!("Status: {}", output.status_path.display());
    Ok(())
}

/// Convert parsed args into the plain config the pipeline runs on.
pub fn pipeline_config_from_args(
    common: &CommonArgs,
    retry: Option<&RetryArgs>,
    zips: &[String],
) -> Result<PipelineConfig, AppError> {
    if common.history_len < 2 {
        return Err(AppError::usage(format!(
            "--history-len must be at least 2 (got {}).",
            common.history_len
        )));
    }

    let profile = MarketProfile {
        market_name: common.market_name.clone(),
        granularity: common.granularity,
        history_len: common.history_len,
        ..MarketProfile::default()
    };

    let retry_policy = match retry {
        Some(r) => retry_policy_from_args(r)?,
        None => RetryPolicy::default(),
    };
    let source_url = retry
        .map(|r| r.url.clone())
        .unwrap_or_else(|| crate::data::ZHVI_URL.to_string());

    let (csv_cache, csv_candidates) = match &common.csv {
        Some(path) => (path.clone(), vec![path.clone()]),
        None => {
            let base = Path::new(".");
            (
                base.join("tmp").join("zillow_zhvi.csv"),
                pipeline::default_csv_candidates(base),
            )
        }
    };

    Ok(PipelineConfig {
        zip_codes: zips_or_default(zips, &profile)?,
        profile,
        retry: retry_policy,
        source_url,
        data_root: common.data_root.clone(),
        csv_cache,
        csv_candidates,
        skip_fetch: false,
        offline_seed: None,
        advisor_key: crate::insights::api_key_from_env(),
        advise_timeout: ADVISE_TIMEOUT,
        print_summary: true,
    })
}

fn retry_policy_from_args(args: &RetryArgs) -> Result<RetryPolicy, AppError> {
    if args.retries == 0 {
        return Err(AppError::usage("--retries must be at least 1."));
    }
    if args.timeout_secs == 0 {
        return Err(AppError::usage("--timeout-secs must be positive."));
    }
    Ok(RetryPolicy {
        attempts: args.retries,
        backoff: Duration::from_secs(args.backoff_secs),
        timeout: Duration::from_secs(args.timeout_secs),
    })
}

fn single_zip(zip: Option<String>, profile: &MarketProfile) -> Result<String, AppError> {
    let zip = zip.unwrap_or_else(|| profile.default_zip.clone());
    validate_zip(&zip)?;
    Ok(zip)
}

fn zips_or_default(zips: &[String], profile: &MarketProfile) -> Result<Vec<String>, AppError> {
    if zips.is_empty() {
        return Ok(profile.zip_codes());
    }
    let mut out: Vec<String> = Vec::with_capacity(zips.len());
    for zip in zips {
        validate_zip(zip)?;
        if !out.contains(zip) {
            out.push(zip.clone());
        }
    }
    Ok(out)
}

/// ZIPs become directory names, so keep them to plain identifiers.
fn validate_zip(zip: &str) -> Result<(), AppError> {
    let ok = !zip.is_empty() && zip.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    if ok {
        Ok(())
    } else {
        Err(AppError::usage(format!("Invalid ZIP code '{zip}'.")))
    }
}

/// Rewrite argv so `pulse` defaults to `pulse run`.
///
/// Rules:
/// - `pulse`                          -> `pulse run`
/// - `pulse 31093 ...`                -> `pulse run 31093 ...`
/// - `pulse -v ...`                   -> `pulse run -v ...`
/// - `pulse --help/--version/-h/help` -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("run".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version || SUBCOMMANDS.contains(&arg1.as_str()) {
        return argv;
    }

    // Flags or a bare ZIP both belong to `run`.
    argv.insert(1, "run".to_string());
    argv
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_runs_pipeline() {
        assert_eq!(rewrite_args(argv(&["pulse"])), argv(&["pulse", "run"]));
    }

    #[test]
    fn leading_zip_or_flag_goes_to_run() {
        assert_eq!(
            rewrite_args(argv(&["pulse", "31093"])),
            argv(&["pulse", "run", "31093"])
        );
        assert_eq!(
            rewrite_args(argv(&["pulse", "-v", "--offline"])),
            argv(&["pulse", "run", "-v", "--offline"])
        );
    }

    #[test]
    fn subcommands_and_help_are_untouched() {
        assert_eq!(
            rewrite_args(argv(&["pulse", "metrics", "31098"])),
            argv(&["pulse", "metrics", "31098"])
        );
        assert_eq!(rewrite_args(argv(&["pulse", "--help"])), argv(&["pulse", "--help"]));
    }

    #[test]
    fn config_defaults_to_profile_zips() {
        let cli = crate::cli::Cli::parse_from(["pulse", "run"]);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        let cfg = pipeline_config_from_args(&args.common, Some(&args.retry), &args.zips).unwrap();
        assert_eq!(cfg.zip_codes, vec!["31088", "31093", "31098"]);
        assert_eq!(cfg.retry.attempts, 3);
        assert_eq!(cfg.retry.backoff, Duration::from_secs(5));
        assert_eq!(cfg.csv_candidates.len(), 3);
        assert_eq!(cfg.data_root, PathBuf::from("data/houston-county-ga"));
    }

    #[test]
    fn invalid_values_are_usage_errors() {
        let cli = crate::cli::Cli::parse_from(["pulse", "run", "--retries", "0"]);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        let err = pipeline_config_from_args(&args.common, Some(&args.retry), &args.zips).unwrap_err();
        assert_eq!(err.exit_code(), 2);

        let profile = MarketProfile::default();
        assert!(zips_or_default(&["../etc".to_string()], &profile).is_err());
    }

    #[test]
    fn explicit_csv_is_the_only_candidate() {
        let cli = crate::cli::Cli::parse_from(["pulse", "metrics", "--csv", "/data/zhvi.csv"]);
        let Command::Metrics(args) = cli.command else {
            panic!("expected metrics");
        };
        let cfg = pipeline_config_from_args(&args.common, None, &[]).unwrap();
        assert_eq!(cfg.csv_candidates, vec![PathBuf::from("/data/zhvi.csv")]);
        assert_eq!(cfg.csv_cache, PathBuf::from("/data/zhvi.csv"));
    }
}
