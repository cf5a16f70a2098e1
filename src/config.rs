//! Generator configuration.
//!
//! Every setting has a command-line flag and an environment variable (see
//! `cli::args`); [`GeneratorConfig`] is the validated form handed to the
//! completion client.

use anyhow::{bail, Context, Result};
use std::time::Duration;
use url::Url;

use crate::api::RetryPolicy;

pub const API_URL_ENV: &str = "SITECRAFT_API_URL";
pub const API_KEY_ENV: &str = "SITECRAFT_API_KEY";
pub const MODEL_ENV: &str = "SITECRAFT_MODEL";
pub const REFERER_ENV: &str = "SITECRAFT_REFERER";
pub const TIMEOUT_ENV: &str = "SITECRAFT_TIMEOUT_SECS";
pub const USER_AGENT_ENV: &str = "SITECRAFT_USER_AGENT";

pub const DEFAULT_API_URL: &str = "http://localhost:3000/api/generate";
pub const DEFAULT_MODEL: &str = "minimax/minimax-m2:free";
pub const DEFAULT_REFERER: &str = "http://localhost:3000";
/// Generation can legitimately stream for minutes
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

const DEFAULT_VERSION: &str = env!("CARGO_PKG_VERSION");

fn build_user_agent() -> String {
    std::env::var(USER_AGENT_ENV).unwrap_or_else(|_| format!("sitecraft/{}", DEFAULT_VERSION))
}

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub api_url: Url,
    pub api_key: Option<String>,
    pub model: String,
    pub referer: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub user_agent: String,
}

impl GeneratorConfig {
    /// Validate raw settings.
    pub fn new(
        api_url: &str,
        api_key: Option<String>,
        model: &str,
        referer: &str,
        timeout_secs: u64,
    ) -> Result<Self> {
        let api_url =
            Url::parse(api_url).with_context(|| format!("Invalid API URL: {}", api_url))?;
        if !matches!(api_url.scheme(), "http" | "https") {
            bail!("API URL must be http or https: {}", api_url);
        }
        let model = model.trim();
        if model.is_empty() {
            bail!("Model identifier must not be empty");
        }
        if timeout_secs == 0 {
            bail!("Timeout must be at least one second");
        }

        Ok(Self {
            api_url,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            model: model.to_string(),
            referer: referer.to_string(),
            timeout: Duration::from_secs(timeout_secs),
            retry: RetryPolicy::default(),
            user_agent: build_user_agent(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validates() {
        let config =
            GeneratorConfig::new(DEFAULT_API_URL, Some("  ".to_string()), " m ", "r", 5).unwrap();
        assert_eq!(config.model, "m");
        assert_eq!(config.api_key, None);
        assert_eq!(config.timeout, Duration::from_secs(5));

        assert!(GeneratorConfig::new("not a url", None, "m", "r", 5).is_err());
        assert!(GeneratorConfig::new("ftp://host/x", None, "m", "r", 5).is_err());
        assert!(GeneratorConfig::new(DEFAULT_API_URL, None, "", "r", 5).is_err());
        assert!(GeneratorConfig::new(DEFAULT_API_URL, None, "m", "r", 0).is_err());
    }
}
