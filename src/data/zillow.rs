//! Zillow ZHVI public CSV download with bounded retry.

use std::fs;
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;

use crate::domain::RetryPolicy;
use crate::error::AppError;

pub const ZHVI_URL: &str = "https://files.zillowstatic.com/research/public_csvs/zhvi/\
                            Zip_zhvi_uc_sfrcondo_tier_0.33_0.67_sm_sa_month.csv";

const USER_AGENT: &str = concat!("housing-pulse/", env!("CARGO_PKG_VERSION"));

/// Run `op` up to `policy.attempts` times, calling `sleep(policy.backoff)`
/// between failed attempts. Returns the last error when every attempt fails.
///
/// `op` receives the 1-based attempt number.
pub fn retry_with<T, F, S>(policy: &RetryPolicy, mut op: F, mut sleep: S) -> Result<T, AppError>
where
    F: FnMut(usize) -> Result<T, AppError>,
    S: FnMut(Duration),
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= attempts => {
                log::error!("Attempt {attempt}/{attempts} failed: {err}");
                return Err(err);
            }
            Err(err) => {
                log::warn!(
                    "Attempt {attempt}/{attempts} failed: {err}; retrying in {}s",
                    policy.backoff.as_secs_f64()
                );
                sleep(policy.backoff);
                attempt += 1;
            }
        }
    }
}

pub struct ZillowClient {
    client: Client,
    url: String,
}

impl ZillowClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AppError::network(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Single GET of the CSV body.
    pub fn fetch_csv(&self) -> Result<String, AppError> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .map_err(|e| AppError::network(format!("ZHVI request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::network(format!(
                "ZHVI request failed with status {}.",
                resp.status()
            )));
        }

        let body = resp
            .text()
            .map_err(|e| AppError::network(format!("Failed to read ZHVI response body: {e}")))?;
        if body.trim().is_empty() {
            return Err(AppError::network("ZHVI response body was empty."));
        }
        Ok(body)
    }

    /// Download with retry and store the body at `dest`.
    pub fn download_to(&self, dest: &Path, policy: &RetryPolicy) -> Result<usize, AppError> {
        let body = retry_with(
            policy,
            |attempt| {
                log::info!("Attempt {attempt} to fetch Zillow data from {}", self.url);
                self.fetch_csv()
            },
            std::thread::sleep,
        )?;

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::io(format!("Failed to create '{}': {e}", parent.display()))
            })?;
        }
        fs::write(dest, &body)
            .map_err(|e| AppError::io(format!("Failed to write '{}': {e}", dest.display())))?;

        log::info!("Zillow CSV downloaded to {} ({} bytes)", dest.display(), body.len());
        Ok(body.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn policy(attempts: usize) -> RetryPolicy {
        RetryPolicy {
            attempts,
            backoff: Duration::from_secs(5),
            timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let mut sleeps = Vec::new();
        let out = retry_with(
            &policy(3),
            |attempt| {
                if attempt < 3 {
                    Err(AppError::network("boom"))
                } else {
                    Ok(attempt)
                }
            },
            |d| sleeps.push(d),
        )
        .unwrap();
        assert_eq!(out, 3);
        assert_eq!(sleeps, vec![Duration::from_secs(5); 2]);
    }

    #[test]
    fn gives_up_after_last_attempt_without_trailing_sleep() {
        let mut calls = 0;
        let mut sleeps = 0;
        let err = retry_with::<(), _, _>(
            &policy(3),
            |_| {
                calls += 1;
                Err(AppError::network("down"))
            },
            |_| sleeps += 1,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
        assert_eq!(calls, 3);
        assert_eq!(sleeps, 2);
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let mut calls = 0;
        let _ = retry_with::<(), _, _>(
            &policy(0),
            |_| {
                calls += 1;
                Err(AppError::network("down"))
            },
            |_| {},
        );
        assert_eq!(calls, 1);
    }
}
