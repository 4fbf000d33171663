//! Client configuration
//!
//! Settings are read from a JSON file (by default
//! `<config dir>/workdesk/client.json`). Every field is optional in the file
//! and falls back to [`ClientConfig::default`].

use crate::error::{CoreError, Result};
use crate::protocol::WireTokens;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default server port used by the data server
pub const DEFAULT_PORT: u16 = 5000;

/// Default cap on a single inbound line (1 MiB)
pub const DEFAULT_MAX_LINE_BYTES: usize = 1024 * 1024;

/// Connection and protocol settings for a [`crate::CommandGate`] session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server hostname or IP
    pub host: String,

    /// Server port
    pub port: u16,

    /// Separator, record-join and terminator tokens
    pub tokens: WireTokens,

    /// Optional bound on a whole command round trip, in milliseconds.
    /// Unset means wait for the terminator indefinitely.
    pub command_timeout_ms: Option<u64>,

    /// Maximum accepted length of one inbound line
    pub max_line_bytes: usize,

    /// Refuse to send arguments that contain a wire token or a newline
    pub reject_unsafe_arguments: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            tokens: WireTokens::default(),
            command_timeout_ms: None,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            reject_unsafe_arguments: false,
        }
    }
}

impl ClientConfig {
    /// Create with custom server address
    pub fn with_server(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Set command timeout
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Set custom wire tokens
    pub fn with_tokens(mut self, tokens: WireTokens) -> Self {
        self.tokens = tokens;
        self
    }

    /// Set maximum inbound line length
    pub fn with_max_line_bytes(mut self, max: usize) -> Self {
        self.max_line_bytes = max;
        self
    }

    /// Enable or disable rejection of arguments containing wire tokens
    pub fn with_reject_unsafe_arguments(mut self, reject: bool) -> Self {
        self.reject_unsafe_arguments = reject;
        self
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_ms.map(Duration::from_millis)
    }

    /// Platform default location of the config file
    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::config_dir().ok_or(CoreError::NoConfigDir)?;
        Ok(dir.join("workdesk").join("client.json"))
    }

    /// Parse configuration from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CoreError::Config(format!("JSON deserialization failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&text)
    }

    /// Load from the default location, or defaults when no file exists there
    pub fn load_or_default() -> Result<Self> {
        let path = match Self::default_path() {
            Ok(path) => path,
            Err(CoreError::NoConfigDir) => return Ok(Self::default()),
            Err(e) => return Err(e),
        };

        if path.exists() {
            tracing::debug!("Loading client config from {}", path.display());
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CoreError::Config(format!("JSON serialization failed: {}", e)))
    }

    /// Check invariants the protocol relies on
    pub fn validate(&self) -> Result<()> {
        if self.max_line_bytes == 0 {
            return Err(CoreError::Config("max_line_bytes must be positive".into()));
        }
        self.tokens.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_server_protocol() {
        let config = ClientConfig::default();
        assert_eq!(config.port, 5000);
        assert_eq!(config.tokens.separator, "@Tr&m");
        assert_eq!(config.tokens.record_join, "@Jump");
        assert_eq!(config.tokens.terminator, "FIN_COMANDO");
        assert_eq!(config.command_timeout(), None);
        assert!(!config.reject_unsafe_arguments);
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config = ClientConfig::from_json(r#"{"host": "10.0.0.2", "command_timeout_ms": 1500}"#).unwrap();
        assert_eq!(config.host, "10.0.0.2");
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.command_timeout(), Some(Duration::from_millis(1500)));
        assert_eq!(config.tokens, WireTokens::default());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = ClientConfig::with_server("db.local", 7000)
            .with_command_timeout(Duration::from_secs(3))
            .with_reject_unsafe_arguments(true);
        let json = config.to_json().unwrap();
        assert_eq!(ClientConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let err = ClientConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn test_empty_token_rejected() {
        let err = ClientConfig::from_json(r#"{"tokens": {"separator": ""}}"#).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("workdesk-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"port": 6001}"#).unwrap();

        let config = ClientConfig::load(&path).unwrap();
        assert_eq!(config.port, 6001);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let err = ClientConfig::load(Path::new("/nonexistent/workdesk/client.json")).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }
}
