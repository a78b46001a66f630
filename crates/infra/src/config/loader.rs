//! Configuration loader
//!
//! Loads pipeline configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If the required credentials are absent, falls back to a file
//! 3. Probes multiple paths for config files
//! 4. Supports TOML and JSON formats
//!
//! ## Environment Variables
//! - `API_BASE_URL`: Base URL of the Moduleo API
//! - `MODULEO_API_KEY`: API key header value (required)
//! - `MODULEO_SECURITY_CODE`: Security code header value (required)
//! - `MODULEO_OUTPUT_DIR`: Directory artifacts are written to
//! - `MODULEO_CHUNK_SIZE`: Batch size for `multi` endpoints
//! - `MODULEO_SERVICES_CSV`: Path to the service mapping file
//! - `MODULEO_COLLABORATORS_CSV`: Path to the collaborator mapping file

use std::path::{Path, PathBuf};

use moduleo_domain::{ApiConfig, Config, ModuleoError, PipelineConfig, Result, RetryConfig};
use moduleo_domain::constants::USER_AGENT;

/// Default API base, overridable through `API_BASE_URL`.
const DEFAULT_BASE_URL: &str = "https://mwa-metris.kipaware.fr/api";

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If the required
/// credentials are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `ModuleoError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - Required fields are missing
pub fn load() -> Result<Config> {
    let config = match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            config
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)?
        }
    };
    config.validate()?;
    Ok(config)
}

/// Load configuration from environment variables
///
/// The two credential variables must be present; everything else has
/// a default.
///
/// # Errors
/// Returns `ModuleoError::Config` if required variables are missing
/// or have invalid values.
pub fn load_from_env() -> Result<Config> {
    let api_key = env_var("MODULEO_API_KEY")?;
    let security_code = env_var("MODULEO_SECURITY_CODE")?;
    let base_url =
        std::env::var("API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

    let mut pipeline = PipelineConfig::default();
    if let Ok(dir) = std::env::var("MODULEO_OUTPUT_DIR") {
        pipeline.output_dir = PathBuf::from(dir);
    }
    if let Ok(raw) = std::env::var("MODULEO_CHUNK_SIZE") {
        pipeline.chunk_size = raw
            .parse::<usize>()
            .map_err(|e| ModuleoError::Config(format!("Invalid chunk size: {}", e)))?;
    }
    if let Ok(path) = std::env::var("MODULEO_SERVICES_CSV") {
        pipeline.services_csv = Some(PathBuf::from(path));
    }
    if let Ok(path) = std::env::var("MODULEO_COLLABORATORS_CSV") {
        pipeline.collaborators_csv = Some(PathBuf::from(path));
    }

    Ok(Config {
        api: ApiConfig {
            base_url,
            api_key,
            security_code,
            user_agent: USER_AGENT.to_string(),
        },
        retry: RetryConfig::default(),
        pipeline,
    })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both TOML and JSON formats (detected by file extension).
///
/// # Errors
/// Returns `ModuleoError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - Required fields are missing
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ModuleoError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            ModuleoError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| ModuleoError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| ModuleoError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| ModuleoError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(ModuleoError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// Searches for `moduleo.{toml,json}` and `config.{toml,json}` in the
/// working directory, up to two parent levels, then relative to the
/// executable.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let names = ["moduleo.toml", "moduleo.json", "config.toml", "config.json"];
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        for base in [cwd.clone(), cwd.join(".."), cwd.join("../..")] {
            candidates.extend(names.iter().map(|name| base.join(name)));
        }
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(names.iter().map(|name| exe_dir.join(name)));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        ModuleoError::Config(format!("Missing required environment variable: {}", key))
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use tempfile::NamedTempFile;

    use super::*;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for key in [
            "MODULEO_API_KEY",
            "MODULEO_SECURITY_CODE",
            "API_BASE_URL",
            "MODULEO_OUTPUT_DIR",
            "MODULEO_CHUNK_SIZE",
            "MODULEO_SERVICES_CSV",
            "MODULEO_COLLABORATORS_CSV",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_load_from_env_all_vars_set() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("MODULEO_API_KEY", "key");
        std::env::set_var("MODULEO_SECURITY_CODE", "code");
        std::env::set_var("API_BASE_URL", "https://example.test/api");
        std::env::set_var("MODULEO_OUTPUT_DIR", "/tmp/moduleo");
        std::env::set_var("MODULEO_CHUNK_SIZE", "50");

        let config = load_from_env().expect("config");
        assert_eq!(config.api.api_key, "key");
        assert_eq!(config.api.security_code, "code");
        assert_eq!(config.api.base_url, "https://example.test/api");
        assert_eq!(config.pipeline.output_dir, PathBuf::from("/tmp/moduleo"));
        assert_eq!(config.pipeline.chunk_size, 50);
        assert_eq!(config.retry.max_attempts, 5);

        clear_env();
    }

    #[test]
    fn test_load_from_env_defaults_base_url() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("MODULEO_API_KEY", "key");
        std::env::set_var("MODULEO_SECURITY_CODE", "code");

        let config = load_from_env().expect("config");
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.pipeline.chunk_size, 100);

        clear_env();
    }

    #[test]
    fn test_load_from_env_missing_credentials() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        let result = load_from_env();
        assert!(matches!(result, Err(ModuleoError::Config(_))));
    }

    #[test]
    fn test_load_from_env_invalid_chunk_size() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("MODULEO_API_KEY", "key");
        std::env::set_var("MODULEO_SECURITY_CODE", "code");
        std::env::set_var("MODULEO_CHUNK_SIZE", "not-a-number");

        let result = load_from_env();
        assert!(matches!(result, Err(ModuleoError::Config(_))));

        clear_env();
    }

    #[test]
    fn test_load_from_file_toml() {
        let toml_content = r#"
[api]
base_url = "https://example.test/api"
api_key = "key"
security_code = "code"

[retry]
max_attempts = 3
backoff_base_secs = 1.0
timeout_secs = 10

[pipeline]
output_dir = "./out"
chunk_size = 25
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        let path = temp_file.path().with_extension("toml");
        std::fs::copy(temp_file.path(), &path).unwrap();

        let config = load_from_file(Some(path.clone())).expect("config");
        assert_eq!(config.api.api_key, "key");
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.pipeline.chunk_size, 25);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_from_file_json() {
        let json_content = r#"{
            "api": {
                "base_url": "https://example.test/api",
                "api_key": "key",
                "security_code": "code"
            }
        }"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(json_content.as_bytes()).unwrap();
        let path = temp_file.path().with_extension("json");
        std::fs::copy(temp_file.path(), &path).unwrap();

        let config = load_from_file(Some(path.clone())).expect("config");
        assert_eq!(config.api.base_url, "https://example.test/api");
        // Sections absent from the file take their defaults.
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.pipeline.chunk_size, 100);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_from_file_not_found() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/moduleo.toml")));
        assert!(matches!(result, Err(ModuleoError::Config(_))));
    }

    #[test]
    fn test_load_from_file_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"[api\nbroken").unwrap();
        let path = temp_file.path().with_extension("toml");
        std::fs::copy(temp_file.path(), &path).unwrap();

        let result = load_from_file(Some(path.clone()));
        assert!(matches!(result, Err(ModuleoError::Config(_))));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_parse_config_unsupported_format() {
        let result = parse_config("some content", &PathBuf::from("moduleo.yaml"));
        assert!(matches!(result, Err(ModuleoError::Config(_))));
    }
}
