//! Configuration loading, validation, and management for orderchat.
//!
//! Loads configuration from `~/.orderchat/config.toml` with environment
//! variable overrides. Everything is resolved once at startup and passed
//! into constructors explicitly; nothing downstream reads the environment.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.orderchat/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Language model settings
    #[serde(default)]
    pub model: ModelConfig,

    /// How to reach the tool server
    #[serde(default)]
    pub tool_server: ToolServerConfig,

    /// HTTP gateway settings
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Client-side UI resource settings
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Provider label used in logs
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Base URL of the OpenAI-compatible API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_model")]
    pub model: String,

    /// API credential
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Max tokens per model response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// HTTP timeout for a single model request
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_provider() -> String {
    "deepseek".into()
}
fn default_base_url() -> String {
    "https://api.deepseek.com".into()
}
fn default_model() -> String {
    "deepseek-chat".into()
}
fn default_request_timeout() -> u64 {
    120
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
            max_tokens: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &redact(&self.api_key))
            .field("max_tokens", &self.max_tokens)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

/// How the tool session reaches the tool server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolTransport {
    /// Spawn `command args...` and speak JSON-RPC over its stdio
    #[default]
    Stdio,
    /// Run the bundled tool server inside this process
    InProcess,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolServerConfig {
    #[serde(default)]
    pub transport: ToolTransport,

    /// Executable to launch (defaults to the running binary)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(default = "default_tool_server_args")]
    pub args: Vec<String>,

    /// Extra environment for the tool server process
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
}

fn default_tool_server_args() -> Vec<String> {
    vec!["tool-server".into()]
}

impl Default for ToolServerConfig {
    fn default() -> Self {
        Self {
            transport: ToolTransport::default(),
            command: None,
            args: default_tool_server_args(),
            env: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    3000
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Base URL the resolver fetches `/api/ui-resources/<id>` from
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_api_base() -> String {
    "http://127.0.0.1:3000".into()
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.orderchat/config.toml).
    ///
    /// Environment overrides (applied after the file):
    /// - `ORDERCHAT_API_KEY`, then `DEEPSEEK_API_KEY`: model credential
    /// - `ORDERCHAT_MODEL`: model name
    /// - `MCP_SERVER_COMMAND` / `MCP_SERVER_ARGS`: tool server launch
    /// - `API_BASE`: UI resource base URL
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if self.model.api_key.is_none() {
            self.model.api_key =
                non_empty("ORDERCHAT_API_KEY").or_else(|| non_empty("DEEPSEEK_API_KEY"));
        }
        if let Some(model) = non_empty("ORDERCHAT_MODEL") {
            self.model.model = model;
        }
        if let Some(command) = non_empty("MCP_SERVER_COMMAND") {
            self.tool_server.command = Some(command);
        }
        if let Some(args) = non_empty("MCP_SERVER_ARGS") {
            self.tool_server.args = args.split_whitespace().map(String::from).collect();
        }
        if let Some(base) = non_empty("API_BASE") {
            self.ui.api_base = base;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".orderchat")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.model.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "model.base_url must not be empty".into(),
            ));
        }

        if self.gateway.port == 0 {
            return Err(ConfigError::ValidationError(
                "gateway.port must be non-zero".into(),
            ));
        }

        if self.tool_server.transport == ToolTransport::Stdio
            && self.tool_server.command.is_none()
            && self.tool_server.args.is_empty()
        {
            return Err(ConfigError::ValidationError(
                "tool_server.args must name the tool-server subcommand when no command is set"
                    .into(),
            ));
        }

        Ok(())
    }

    /// Check if a model credential is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.model.api_key.is_some()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.model.provider, "deepseek");
        assert_eq!(config.model.model, "deepseek-chat");
        assert_eq!(config.gateway.port, 3000);
        assert_eq!(config.tool_server.transport, ToolTransport::Stdio);
        assert_eq!(config.tool_server.args, vec!["tool-server".to_string()]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let toml_str = AppConfig::default_toml();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.model.base_url, "https://api.deepseek.com");
        assert_eq!(parsed.gateway.port, 3000);
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.model.provider, "deepseek");
        assert!(!config.has_api_key());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[model]
model = "deepseek-reasoner"
api_key = "sk-file"

[tool_server]
transport = "in_process"

[gateway]
port = 8080
"#
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.model.model, "deepseek-reasoner");
        assert_eq!(config.model.api_key.as_deref(), Some("sk-file"));
        assert_eq!(config.tool_server.transport, ToolTransport::InProcess);
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config.gateway.host, "127.0.0.1");
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[model\nbroken").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = AppConfig::default();
        config.apply_env(env_of(&[
            ("DEEPSEEK_API_KEY", "sk-env"),
            ("ORDERCHAT_MODEL", "custom-model"),
            ("MCP_SERVER_COMMAND", "node"),
            ("MCP_SERVER_ARGS", "dist/server.js  --stdio"),
            ("API_BASE", "http://example.test"),
        ]));

        assert_eq!(config.model.api_key.as_deref(), Some("sk-env"));
        assert_eq!(config.model.model, "custom-model");
        assert_eq!(config.tool_server.command.as_deref(), Some("node"));
        assert_eq!(config.tool_server.args, vec!["dist/server.js", "--stdio"]);
        assert_eq!(config.ui.api_base, "http://example.test");
    }

    #[test]
    fn orderchat_key_wins_over_deepseek_key() {
        let mut config = AppConfig::default();
        config.apply_env(env_of(&[
            ("ORDERCHAT_API_KEY", "sk-primary"),
            ("DEEPSEEK_API_KEY", "sk-secondary"),
        ]));
        assert_eq!(config.model.api_key.as_deref(), Some("sk-primary"));
    }

    #[test]
    fn file_key_is_not_overridden_and_blank_env_ignored() {
        let mut config = AppConfig::default();
        config.model.api_key = Some("sk-file".into());
        config.apply_env(env_of(&[("DEEPSEEK_API_KEY", "sk-env"), ("ORDERCHAT_MODEL", "  ")]));
        assert_eq!(config.model.api_key.as_deref(), Some("sk-file"));
        assert_eq!(config.model.model, "deepseek-chat");
    }

    #[test]
    fn empty_base_url_rejected() {
        let mut config = AppConfig::default();
        config.model.base_url = " ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn stdio_without_command_or_args_rejected() {
        let mut config = AppConfig::default();
        config.tool_server.args.clear();
        assert!(config.validate().is_err());

        config.tool_server.command = Some("orders-server".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let mut config = AppConfig::default();
        config.model.api_key = Some("sk-super-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
