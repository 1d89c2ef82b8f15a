//! CLI configuration
//!
//! Loaded from TOML (`--config <path>` or `<config_dir>/unl/config.toml`),
//! then overridden by `UNL_RPC_URL` and `UNL_SECRET_BACKEND`. Missing files
//! at the default location fall back to defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use unl_core::{Result, RetryPolicy, UnlError};

/// Environment variable overriding `rpc_url`
pub const ENV_RPC_URL: &str = "UNL_RPC_URL";
/// Environment variable overriding `secrets.backend`
pub const ENV_SECRET_BACKEND: &str = "UNL_SECRET_BACKEND";

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// WebSocket endpoint used for manifest lookups
    pub rpc_url: String,
    /// Deadline for each network request, in seconds
    pub request_timeout_secs: u64,
    /// Rate-limit backoff for manifest lookups
    pub retry: RetryConfig,
    /// Secret storage
    pub secrets: SecretsConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            rpc_url: "wss://s2.ripple.com".to_string(),
            request_timeout_secs: 20,
            retry: RetryConfig::default(),
            secrets: SecretsConfig::default(),
        }
    }
}

/// Backoff settings for rate-limited lookups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per validator
    pub max_attempts: u32,
    /// Wait after the first rate-limited attempt; grows linearly
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 500,
        }
    }
}

/// Where secrets are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretBackend {
    /// JSON file readable only by the owner
    #[default]
    File,
    /// Process memory; nothing persists
    Memory,
}

impl FromStr for SecretBackend {
    type Err = UnlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "memory" => Ok(Self::Memory),
            other => Err(UnlError::config(format!(
                "unknown secret backend '{other}' (expected file or memory)"
            ))),
        }
    }
}

impl std::fmt::Display for SecretBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// Secret storage settings
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretsConfig {
    /// Backend to use
    pub backend: SecretBackend,
    /// File location for the file backend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl CliConfig {
    /// Default configuration file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("unl").join("config.toml"))
    }

    /// Load configuration
    ///
    /// An explicit path must exist; the default location is optional.
    /// Environment overrides are applied and the result validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };
        config.apply_env_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            UnlError::config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&contents)
            .map_err(|e| UnlError::config(format!("{}: {e}", path.display())))
    }

    /// Parse TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| UnlError::config(format!("invalid config: {e}")))
    }

    /// Serialize as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| UnlError::serialization(format!("failed to serialize config: {e}")))
    }

    /// Apply `UNL_RPC_URL` / `UNL_SECRET_BACKEND` from `lookup`
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = lookup(ENV_RPC_URL).filter(|v| !v.is_empty()) {
            self.rpc_url = url;
        }
        if let Some(backend) = lookup(ENV_SECRET_BACKEND).filter(|v| !v.is_empty()) {
            self.secrets.backend = backend.parse()?;
        }
        Ok(())
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if !(self.rpc_url.starts_with("ws://") || self.rpc_url.starts_with("wss://")) {
            return Err(UnlError::config(format!(
                "rpc_url must be a ws:// or wss:// URL, got '{}'",
                self.rpc_url
            )));
        }
        if !(1..=3600).contains(&self.request_timeout_secs) {
            return Err(UnlError::config(
                "request_timeout_secs must be between 1 and 3600",
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(UnlError::config("retry.max_attempts must be at least 1"));
        }
        Ok(())
    }

    /// Lookup retry policy: linear backoff from `base_delay_ms`
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::linear(Duration::from_millis(self.retry.base_delay_ms))
            .with_max_attempts(self.retry.max_attempts)
    }

    /// Per-request deadline
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Secrets file location for the file backend
    pub fn secrets_path(&self) -> Result<PathBuf> {
        match &self.secrets.path {
            Some(path) => Ok(path.clone()),
            None => dirs::data_dir()
                .map(|dir| dir.join("unl").join("secrets.json"))
                .ok_or_else(|| {
                    UnlError::config("no data directory available; set secrets.path")
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_defaults() {
        let config = CliConfig::default();
        assert_eq!(config.rpc_url, "wss://s2.ripple.com");
        assert_eq!(config.request_timeout_secs, 20);
        assert_eq!(config.retry_policy(), RetryPolicy::manifest_lookup());
        assert_eq!(config.secrets.backend, SecretBackend::File);
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = CliConfig::from_toml_str(
            r#"
            rpc_url = "wss://xrplcluster.com"

            [retry]
            max_attempts = 8
            "#,
        )
        .unwrap();
        assert_eq!(config.rpc_url, "wss://xrplcluster.com");
        assert_eq!(config.retry.max_attempts, 8);
        assert_eq!(config.retry.base_delay_ms, 500);
        assert_eq!(config.request_timeout_secs, 20);
    }

    #[test]
    fn test_round_trip() {
        let mut config = CliConfig::default();
        config.secrets.path = Some(PathBuf::from("/tmp/secrets.json"));
        let text = config.to_toml_string().unwrap();
        assert_eq!(CliConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = CliConfig::default();
        config
            .apply_env_overrides(|name| match name {
                ENV_RPC_URL => Some("ws://localhost:6006".to_string()),
                ENV_SECRET_BACKEND => Some("MEMORY".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.rpc_url, "ws://localhost:6006");
        assert_eq!(config.secrets.backend, SecretBackend::Memory);

        assert_matches!(
            config.apply_env_overrides(|name| {
                (name == ENV_SECRET_BACKEND).then(|| "keychain".to_string())
            }),
            Err(UnlError::Config { .. })
        );
    }

    #[test]
    fn test_validation() {
        let mut config = CliConfig::default();
        config.request_timeout_secs = 0;
        assert_matches!(config.validate(), Err(UnlError::Config { .. }));

        let mut config = CliConfig::default();
        config.rpc_url = "https://s2.ripple.com".to_string();
        assert_matches!(config.validate(), Err(UnlError::Config { .. }));

        let mut config = CliConfig::default();
        config.retry.max_attempts = 0;
        assert_matches!(config.validate(), Err(UnlError::Config { .. }));

        assert_matches!(
            CliConfig::from_toml_str("request_timeout_secs = \"soon\""),
            Err(UnlError::Config { .. })
        );
    }
}
