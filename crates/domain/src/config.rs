//! Configuration structures
//!
//! Plain data; loading (environment, files) lives in the infra crate.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BACKOFF_BASE_SECS, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_ATTEMPTS, DEFAULT_TIMEOUT_SECS,
    USER_AGENT,
};
use crate::errors::{ModuleoError, Result};

/// Remote API access configuration.
///
/// Passed explicitly to the gateway at construction; there is no
/// process-wide session state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: String,
    pub security_code: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_user_agent() -> String {
    USER_AGENT.to_string()
}

/// Shared retry policy for every gateway call.
///
/// The total attempt budget covers the initial try; backoff doubles
/// per retry starting from `backoff_base_secs`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: usize,
    pub backoff_base_secs: f64,
    pub timeout_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base_secs: DEFAULT_BACKOFF_BASE_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Pipeline-level configuration: where artifacts land and where the
/// mapping tables come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default)]
    pub services_csv: Option<PathBuf>,
    #[serde(default)]
    pub collaborators_csv: Option<PathBuf>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            chunk_size: default_chunk_size(),
            services_csv: None,
            collaborators_csv: None,
        }
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Validate that the credentials required for any API call are
    /// present before the first step runs.
    pub fn validate(&self) -> Result<()> {
        if self.api.api_key.is_empty() {
            return Err(ModuleoError::Config("MODULEO_API_KEY is missing".to_string()));
        }
        if self.api.security_code.is_empty() {
            return Err(ModuleoError::Config("MODULEO_SECURITY_CODE is missing".to_string()));
        }
        if self.api.base_url.is_empty() {
            return Err(ModuleoError::Config("API base URL is missing".to_string()));
        }
        if self.pipeline.chunk_size == 0 {
            return Err(ModuleoError::Config("chunk_size must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            api: ApiConfig {
                base_url: "https://example.test/api".to_string(),
                api_key: "key".to_string(),
                security_code: "code".to_string(),
                user_agent: default_user_agent(),
            },
            retry: RetryConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }

    #[test]
    fn valid_config_passes_validation() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn missing_credentials_fail_validation() {
        let mut config = valid_config();
        config.api.api_key.clear();
        assert!(matches!(config.validate(), Err(ModuleoError::Config(_))));

        let mut config = valid_config();
        config.api.security_code.clear();
        assert!(matches!(config.validate(), Err(ModuleoError::Config(_))));
    }

    #[test]
    fn zero_chunk_size_fails_validation() {
        let mut config = valid_config();
        config.pipeline.chunk_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn retry_defaults_match_shared_policy() {
        let retry = RetryConfig::default();
        assert_eq!(retry.max_attempts, 5);
        assert!((retry.backoff_base_secs - 2.0).abs() < f64::EPSILON);
        assert_eq!(retry.timeout_secs, 30);
    }
}
