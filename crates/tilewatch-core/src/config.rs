// SPDX-License-Identifier: Apache-2.0

//! Configuration management for tilewatch.
//!
//! Provides layered configuration from files and environment variables.
//! Uses XDG-compliant paths with environment variable support.
//!
//! # Configuration Sources (in priority order)
//!
//! 1. Environment variables (prefix: `TILEWATCH_`)
//! 2. Config file: `~/.config/tilewatch/config.toml`
//! 3. Built-in defaults
//!
//! # Examples
//!
//! ```bash
//! # Poll a local gateway every 5 seconds with 3 retries
//! TILEWATCH_CATALOG__BASE_URL=https://localhost:10010 \
//! TILEWATCH_POLLING__UPDATE_PERIOD_MS=5000 \
//! TILEWATCH_POLLING__MAX_RETRIES=3 tilewatch watch
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::TilewatchError;
use crate::poller::PollerSettings;
use crate::retry::{DEFAULT_EXCLUDED_SERVER_CODES, DEFAULT_TERMINATING_STATUS_CODES, RetryPolicy};
use crate::transport::CatalogEndpoints;

/// Application configuration.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Where the API Catalog lives.
    pub catalog: CatalogConfig,
    /// Polling and retry behaviour.
    pub polling: PollingConfig,
}

impl AppConfig {
    /// Endpoints for the configured catalog.
    pub fn endpoints(&self) -> Result<CatalogEndpoints, TilewatchError> {
        CatalogEndpoints::new(&self.catalog.base_url)
    }
}

/// API Catalog connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Gateway URL the catalog is served from.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
    /// Accept self-signed gateway certificates.
    pub accept_invalid_certs: bool,
    /// API ML session token, sent as the `apimlAuthenticationToken` cookie.
    #[serde(skip_serializing, deserialize_with = "deserialize_secret")]
    pub auth_token: Option<SecretString>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "https://localhost:10010".to_string(),
            timeout_seconds: 30,
            accept_invalid_certs: false,
            auth_token: None,
        }
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .filter(|token| !token.is_empty())
        .map(SecretString::from))
}

/// Polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Time between fetch cycles in milliseconds.
    pub update_period_ms: u64,
    /// Quiet period after a start before the first fetch, in milliseconds.
    pub debounce_ms: u64,
    /// Retries per cycle after the first failed fetch.
    pub max_retries: u32,
    /// Backoff unit in milliseconds; retry `n` waits `n * scaling_ms`.
    pub scaling_ms: u64,
    /// HTTP statuses that end the session.
    pub terminating_status_codes: Vec<u16>,
    /// Message code prefixes that keep a terminating status retryable.
    pub excluded_server_codes: Vec<String>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            update_period_ms: 30_000,
            debounce_ms: 300,
            max_retries: 5,
            scaling_ms: 1_000,
            terminating_status_codes: DEFAULT_TERMINATING_STATUS_CODES.to_vec(),
            excluded_server_codes: DEFAULT_EXCLUDED_SERVER_CODES
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

impl PollingConfig {
    /// Convert to poller settings.
    ///
    /// # Errors
    ///
    /// Returns `TilewatchError::Config` if `update_period_ms` is zero.
    pub fn to_settings(&self) -> Result<PollerSettings, TilewatchError> {
        if self.update_period_ms == 0 {
            return Err(TilewatchError::Config {
                message: "polling.update_period_ms must be greater than zero".to_string(),
            });
        }

        let retry = RetryPolicy {
            max_retries: self.max_retries,
            scaling_unit: Duration::from_millis(self.scaling_ms),
            terminating_status_codes: self.terminating_status_codes.iter().copied().collect(),
            excluded_server_codes: self
                .excluded_server_codes
                .iter()
                .map(|code| code.trim().to_string())
                .filter(|code| !code.is_empty())
                .collect(),
        };

        Ok(PollerSettings::builder()
            .update_period(Duration::from_millis(self.update_period_ms))
            .debounce_window(Duration::from_millis(self.debounce_ms))
            .retry(retry)
            .build())
    }
}

/// Returns the tilewatch configuration directory.
///
/// Respects the `XDG_CONFIG_HOME` environment variable if set,
/// otherwise defaults to `~/.config/tilewatch`.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME")
        && !xdg_config.is_empty()
    {
        return PathBuf::from(xdg_config).join("tilewatch");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("tilewatch")
}

/// Returns the path to the configuration file.
#[must_use]
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Load application configuration from the default location.
///
/// Loads from config file (if exists) and environment variables.
/// Environment variables use the prefix `TILEWATCH_` and double underscore
/// for nested keys (e.g., `TILEWATCH_POLLING__MAX_RETRIES`).
///
/// # Errors
///
/// Returns `TilewatchError::Config` if the config file exists but is invalid.
pub fn load_config() -> Result<AppConfig, TilewatchError> {
    load_config_from(&config_file_path())
}

/// Load application configuration with `path` as the config file.
///
/// A missing file is not an error.
pub fn load_config_from(path: &Path) -> Result<AppConfig, TilewatchError> {
    let config = Config::builder()
        // Load from config file (optional - may not exist)
        .add_source(File::from(path).required(false))
        // Override with environment variables
        .add_source(
            Environment::with_prefix("TILEWATCH")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("polling.terminating_status_codes")
                .with_list_parse_key("polling.excluded_server_codes"),
        )
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serial_test::serial;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("create temp file");
        file.write_all(contents.as_bytes()).expect("write config");
        file
    }

    #[test]
    #[serial]
    fn test_load_config_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = load_config_from(&dir.path().join("missing.toml"))
            .expect("should load with defaults");

        assert_eq!(config.catalog.base_url, "https://localhost:10010");
        assert_eq!(config.catalog.timeout_seconds, 30);
        assert!(!config.catalog.accept_invalid_certs);
        assert!(config.catalog.auth_token.is_none());
        assert_eq!(config.polling.update_period_ms, 30_000);
        assert_eq!(config.polling.debounce_ms, 300);
        assert_eq!(config.polling.max_retries, 5);
        assert_eq!(config.polling.scaling_ms, 1_000);
        assert_eq!(config.polling.terminating_status_codes, vec![500, 401, 403]);
        assert_eq!(config.polling.excluded_server_codes, vec!["ZWEAM104"]);
    }

    #[test]
    #[serial]
    fn test_load_config_from_file() {
        let file = write_config(
            r#"
[catalog]
base_url = "https://gateway.example.com:7554"
accept_invalid_certs = true
auth_token = "eyJhbGciOi"

[polling]
update_period_ms = 5000
max_retries = 2
terminating_status_codes = [500]
"#,
        );

        let config = load_config_from(file.path()).expect("should load");
        assert_eq!(config.catalog.base_url, "https://gateway.example.com:7554");
        assert!(config.catalog.accept_invalid_certs);
        assert_eq!(
            config
                .catalog
                .auth_token
                .as_ref()
                .map(|t| t.expose_secret().to_string()),
            Some("eyJhbGciOi".to_string())
        );
        assert_eq!(config.polling.update_period_ms, 5000);
        assert_eq!(config.polling.max_retries, 2);
        assert_eq!(config.polling.terminating_status_codes, vec![500]);
        // Untouched keys keep their defaults
        assert_eq!(config.polling.debounce_ms, 300);
        assert_eq!(config.catalog.timeout_seconds, 30);
    }

    #[test]
    #[serial]
    fn test_invalid_config_file_is_error() {
        let file = write_config("[polling]\nmax_retries = \"many\"\n");
        let result = load_config_from(file.path());
        assert!(matches!(result, Err(TilewatchError::Config { .. })));
    }

    #[test]
    #[serial]
    fn test_environment_overrides_file() {
        let file = write_config("[polling]\nmax_retries = 2\n");
        unsafe {
            std::env::set_var("TILEWATCH_POLLING__MAX_RETRIES", "7");
            std::env::set_var("TILEWATCH_POLLING__EXCLUDED_SERVER_CODES", "ZWEAM104,ZWEAM105");
        }

        let result = load_config_from(file.path());

        unsafe {
            std::env::remove_var("TILEWATCH_POLLING__MAX_RETRIES");
            std::env::remove_var("TILEWATCH_POLLING__EXCLUDED_SERVER_CODES");
        }

        let config = result.expect("should load");
        assert_eq!(config.polling.max_retries, 7);
        assert_eq!(
            config.polling.excluded_server_codes,
            vec!["ZWEAM104", "ZWEAM105"]
        );
    }

    #[test]
    fn test_to_settings() {
        let polling = PollingConfig {
            update_period_ms: 2_000,
            debounce_ms: 50,
            max_retries: 3,
            scaling_ms: 250,
            terminating_status_codes: vec![401, 403],
            excluded_server_codes: vec![" ZWEAM104 ".to_string(), String::new()],
        };

        let settings = polling.to_settings().expect("valid settings");
        assert_eq!(settings.update_period, Duration::from_secs(2));
        assert_eq!(settings.debounce_window, Duration::from_millis(50));
        assert_eq!(settings.retry.max_retries, 3);
        assert_eq!(settings.retry.scaling_unit, Duration::from_millis(250));
        assert!(settings.retry.terminating_status_codes.contains(&401));
        assert!(!settings.retry.terminating_status_codes.contains(&500));
        assert_eq!(settings.retry.excluded_server_codes.len(), 1);
        assert!(settings.retry.excluded_server_codes.contains("ZWEAM104"));
    }

    #[test]
    fn test_zero_update_period_rejected() {
        let polling = PollingConfig {
            update_period_ms: 0,
            ..PollingConfig::default()
        };
        assert!(matches!(
            polling.to_settings(),
            Err(TilewatchError::Config { .. })
        ));
    }

    #[test]
    fn test_auth_token_not_serialized() {
        let config = AppConfig {
            catalog: CatalogConfig {
                auth_token: Some(SecretString::from("secret-token".to_string())),
                ..CatalogConfig::default()
            },
            ..AppConfig::default()
        };
        let json = serde_json::to_string(&config).expect("should serialize");
        assert!(!json.contains("secret-token"));
        assert!(json.contains("base_url"));
    }

    #[test]
    fn test_endpoints_from_config() {
        let config = AppConfig::default();
        let endpoints = config.endpoints().expect("default url is valid");
        assert_eq!(endpoints.base_url(), "https://localhost:10010");
    }

    #[test]
    fn test_config_file_path() {
        let path = config_file_path();
        assert!(path.ends_with("config.toml"));
    }

    #[test]
    #[serial]
    fn test_config_dir_respects_xdg_config_home() {
        let original = std::env::var("XDG_CONFIG_HOME").ok();
        unsafe {
            std::env::set_var("XDG_CONFIG_HOME", "/custom/config");
        }

        let dir = config_dir();
        assert_eq!(dir, PathBuf::from("/custom/config/tilewatch"));

        // Cleanup
        unsafe {
            match original {
                Some(val) => std::env::set_var("XDG_CONFIG_HOME", val),
                None => std::env::remove_var("XDG_CONFIG_HOME"),
            }
        }
    }

    #[test]
    #[serial]
    fn test_config_dir_ignores_empty_xdg_config_home() {
        let original = std::env::var("XDG_CONFIG_HOME").ok();
        unsafe {
            std::env::set_var("XDG_CONFIG_HOME", "");
        }

        let dir = config_dir();
        assert!(dir.ends_with("tilewatch"));

        // Cleanup
        unsafe {
            match original {
                Some(val) => std::env::set_var("XDG_CONFIG_HOME", val),
                None => std::env::remove_var("XDG_CONFIG_HOME"),
            }
        }
    }
}
