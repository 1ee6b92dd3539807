//! File configuration for the `genoscore` command.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.genoscore/config.toml` (user)
//! 3. `/etc/genoscore/config.toml` (system)
//!
//! When none exists the built-in defaults apply.
//!
//! The API key is loaded separately with mandatory permission checks:
//! 1. `~/.genoscore/secrets.toml` (user, must be 0600)
//! 2. `/etc/genoscore/secrets.toml` (system, must be 0600)
//! 3. the `GENOSCORE_API_KEY` environment variable

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::client::{DEFAULT_RATE_LIMIT_INTERVAL, PredictionClientBuilder};
use crate::providers::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT, RetryConfig};
use crate::{GenoscoreError, PredictionClient, Result};

/// Environment variable consulted when no secrets file provides a key.
pub const API_KEY_ENV: &str = "GENOSCORE_API_KEY";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub retry: RetrySection,
    #[serde(default)]
    pub cache: CacheSection,
}

/// Prediction service settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-attempt timeout in seconds (default: 30).
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Minimum spacing between calls in milliseconds (default: 100).
    #[serde(default = "default_rate_limit_ms")]
    pub rate_limit_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_timeout_secs(),
            rate_limit_ms: default_rate_limit_ms(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_rate_limit_ms() -> u64 {
    DEFAULT_RATE_LIMIT_INTERVAL.as_millis() as u64
}

/// Retry settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySection {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_secs: default_max_delay_secs(),
        }
    }
}

fn default_max_retries() -> u32 {
    RetryConfig::default().max_retries
}

fn default_base_delay_ms() -> u64 {
    RetryConfig::default().base_delay.as_millis() as u64
}

fn default_max_delay_secs() -> u64 {
    RetryConfig::default().max_delay.as_secs()
}

/// Cache settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSection {
    /// Set to false to disable caching entirely (default: true).
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Cache root (default: `<platform cache dir>/genoscore`).
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
            ttl_secs: default_ttl_secs(),
            max_entries: default_max_entries(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_ttl_secs() -> u64 {
    CacheConfig::default().default_ttl.as_secs()
}

fn default_max_entries() -> usize {
    CacheConfig::default().max_entries
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// An explicit path must exist; otherwise a missing file means defaults.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            GenoscoreError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            GenoscoreError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(GenoscoreError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".genoscore").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        let system_config = PathBuf::from("/etc/genoscore/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }

    /// Effective cache directory, or `None` when caching is disabled.
    pub fn cache_dir(&self) -> Option<PathBuf> {
        if !self.cache.enabled {
            return None;
        }
        self.cache
            .dir
            .clone()
            .or_else(|| dirs::cache_dir().map(|d| d.join("genoscore")))
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new()
            .default_ttl(Duration::from_secs(self.cache.ttl_secs))
            .max_entries(self.cache.max_entries)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new()
            .max_retries(self.retry.max_retries)
            .base_delay(Duration::from_millis(self.retry.base_delay_ms))
            .max_delay(Duration::from_secs(self.retry.max_delay_secs))
    }

    /// A client builder carrying every setting from this file.
    pub fn client_builder(&self) -> PredictionClientBuilder {
        let mut builder = PredictionClient::builder()
            .base_url(self.service.base_url.clone())
            .request_timeout(Duration::from_secs(self.service.request_timeout_secs))
            .rate_limit_interval(Duration::from_millis(self.service.rate_limit_ms))
            .retry(self.retry_config())
            .cache_config(self.cache_config());
        if let Some(dir) = self.cache_dir() {
            builder = builder.cache_dir(dir);
        }
        builder
    }
}

/// Secrets file contents.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Secrets {
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Secrets {
    /// Load secrets from the standard locations with permission checks.
    ///
    /// Returns empty secrets if no file exists (the key may come from the
    /// environment).
    pub fn load() -> Result<Self> {
        if let Some(home) = dirs::home_dir() {
            let user_secrets = home.join(".genoscore").join("secrets.toml");
            if user_secrets.exists() {
                return Self::load_from_file(&user_secrets);
            }
        }

        let system_secrets = PathBuf::from("/etc/genoscore/secrets.toml");
        if system_secrets.exists() {
            return Self::load_from_file(&system_secrets);
        }

        Ok(Secrets::default())
    }

    /// Load one secrets file after checking its permissions.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        Self::check_permissions(path)?;
        let content = fs::read_to_string(path).map_err(|e| {
            GenoscoreError::Configuration(format!("Failed to read secrets file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            GenoscoreError::Configuration(format!("Failed to parse secrets file {path:?}: {e}"))
        })
    }

    /// Check that the secrets file has secure permissions (0600 or 0400).
    #[cfg(unix)]
    fn check_permissions(path: &Path) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let metadata = fs::metadata(path).map_err(|e| {
            GenoscoreError::Configuration(format!("Failed to stat secrets file {path:?}: {e}"))
        })?;

        let mode = metadata.permissions().mode();
        // Reject if group or other bits are set
        if mode & 0o077 != 0 {
            return Err(GenoscoreError::Configuration(format!(
                "Secrets file {path:?} has insecure permissions {:o}. Must be 0600 or 0400.",
                mode & 0o777
            )));
        }

        Ok(())
    }

    #[cfg(not(unix))]
    fn check_permissions(_path: &Path) -> Result<()> {
        Ok(())
    }

    /// API key from the secrets file, falling back to [`API_KEY_ENV`].
    pub fn api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.service.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.service.request_timeout_secs, 30);
        assert_eq!(config.service.rate_limit_ms, 100);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.cache.ttl_secs, 7 * 24 * 3600);
        assert_eq!(config.cache.max_entries, 1000);
        assert!(config.cache.enabled);
    }

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
            [service]
            rate_limit_ms = 250
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.service.rate_limit_ms, 250);
        // Defaults preserved
        assert_eq!(config.service.request_timeout_secs, 30);
        assert_eq!(config.retry.max_retries, 3);
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
            [service]
            base_url = "http://localhost:8080/v1"
            request_timeout_secs = 10
            rate_limit_ms = 0

            [retry]
            max_retries = 5
            base_delay_ms = 200
            max_delay_secs = 5

            [cache]
            dir = "/var/cache/genoscore"
            ttl_secs = 3600
            max_entries = 50
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.service.base_url, "http://localhost:8080/v1");
        assert_eq!(
            config.retry_config(),
            RetryConfig::new()
                .max_retries(5)
                .base_delay(Duration::from_millis(200))
                .max_delay(Duration::from_secs(5))
        );
        assert_eq!(config.cache_config().max_entries, 50);
        assert_eq!(config.cache_config().default_ttl, Duration::from_secs(3600));
        assert_eq!(config.cache_dir(), Some(PathBuf::from("/var/cache/genoscore")));
    }

    #[test]
    fn disabled_cache_has_no_dir() {
        let toml = r#"
            [cache]
            enabled = false
            dir = "/tmp/ignored"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.cache_dir(), None);
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let err = Config::load(Some(Path::new("/nonexistent/genoscore.toml"))).unwrap_err();
        assert!(matches!(err, GenoscoreError::Configuration(_)));
    }

    #[test]
    fn api_key_from_secrets_file_wins() {
        let secrets = Secrets {
            api_key: Some("from-file".to_string()),
        };
        assert_eq!(secrets.api_key(), Some("from-file".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn insecure_secrets_file_is_rejected() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.toml");
        fs::write(&path, "api_key = \"k\"\n").unwrap();

        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
        assert!(Secrets::load_from_file(&path).is_err());

        fs::set_permissions(&path, fs::Permissions::from_mode(0o600)).unwrap();
        let secrets = Secrets::load_from_file(&path).unwrap();
        assert_eq!(secrets.api_key.as_deref(), Some("k"));
    }
}
