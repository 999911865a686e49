//! Configuration file parser for ~/.config/jobfeed/config.toml.
//!
//! The config file is optional. A missing or empty file yields
//! `Config::default()`, and unknown keys are accepted with a warning.
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::job::{StalePolicy, DEFAULT_API_URL};
use crate::util::{validate_api_url, UrlValidationError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid api_url: {0}")]
    InvalidApiUrl(#[from] UrlValidationError),
}

/// Top-level application configuration.
///
/// Every field has a default, so any subset of keys can be specified.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Listing endpoint. Must be https unless it points at a loopback host.
    pub api_url: String,

    /// Per-request timeout in seconds, applied to each attempt.
    pub request_timeout_secs: u64,

    /// Retries after the first attempt for 429 and 5xx responses.
    pub max_retries: u32,

    /// First retry delay in milliseconds; doubles on each further retry.
    pub retry_base_delay_ms: u64,

    /// Maximum postings kept in the feed (0 = unlimited).
    pub max_feed_items: usize,

    /// Drop page responses that were overtaken by a newer request instead of
    /// applying them in arrival order.
    pub discard_superseded_pages: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout_secs: 30,
            max_retries: 3,
            retry_base_delay_ms: 1000,
            max_feed_items: 0,
            discard_superseded_pages: false,
        }
    }
}

impl Config {
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 6] = [
        "api_url",
        "request_timeout_secs",
        "max_retries",
        "retry_base_delay_ms",
        "max_feed_items",
        "discard_superseded_pages",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    ///
    /// `api_url` is not validated here; call [`Config::endpoint`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), api_url = %config.api_url, "Loaded configuration");
        Ok(config)
    }

    /// Validated listing endpoint.
    pub fn endpoint(&self) -> Result<Url, ConfigError> {
        Ok(validate_api_url(&self.api_url)?)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn stale_policy(&self) -> StalePolicy {
        if self.discard_superseded_pages {
            StalePolicy::LatestOnly
        } else {
            StalePolicy::LastWriteWins
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_config(name: &str, content: &str) -> (PathBuf, PathBuf) {
        let dir = std::env::temp_dir().join(format!("jobfeed_config_test_{name}"));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_base_delay(), Duration::from_secs(1));
        assert_eq!(config.max_feed_items, 0);
        assert_eq!(config.stale_policy(), StalePolicy::LastWriteWins);
        assert!(config.endpoint().is_ok());
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/jobfeed_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_whitespace_only_file_returns_default() {
        let (dir, path) = write_config("whitespace", "   \n  \n  ");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.max_retries, 3);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let (dir, path) = write_config("partial", "max_retries = 0\n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.api_url, DEFAULT_API_URL);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_full_config() {
        let content = r#"
api_url = "http://127.0.0.1:9000/jobs"
request_timeout_secs = 5
max_retries = 1
retry_base_delay_ms = 250
max_feed_items = 200
discard_superseded_pages = true
"#;
        let (dir, path) = write_config("full", content);
        let config = Config::load(&path).unwrap();
        assert_eq!(config.endpoint().unwrap().as_str(), "http://127.0.0.1:9000/jobs");
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.retry_base_delay(), Duration::from_millis(250));
        assert_eq!(config.max_feed_items, 200);
        assert_eq!(config.stale_policy(), StalePolicy::LatestOnly);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_insecure_api_url_rejected_by_endpoint() {
        let (dir, path) = write_config("insecure", "api_url = \"http://jobs.example.com/\"\n");
        let config = Config::load(&path).unwrap();
        assert!(matches!(
            config.endpoint(),
            Err(ConfigError::InvalidApiUrl(UrlValidationError::InsecureScheme))
        ));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let (dir, path) = write_config("invalid", "this is not [valid toml");
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let (dir, path) = write_config("unknown", "max_retries = 2\ntheme = \"dark\"\n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.max_retries, 2);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_wrong_type_returns_error() {
        let (dir, path) = write_config("wrongtype", "max_retries = \"lots\"\n");
        assert!(Config::load(&path).is_err());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_too_large_file_rejected() {
        let (dir, path) = write_config("too_large", &"a".repeat(1_048_577));
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        assert!(err.to_string().contains("too large"));
        std::fs::remove_dir_all(&dir).ok();
    }
}
