//! Configuration file support

use anyhow::Context as _;
use chatrelay_core::ProviderSettings;
use chatrelay_core::provider::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default location of the session secret, relative to the working directory
pub const DEFAULT_SESSION_TOKEN_FILE: &str = "sessionToken";

/// Default text put in front of every answer
pub const DEFAULT_REPLY_PREFIX: &str = "ChatGPT: ";

/// Configuration for chatrelay
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// File holding the renewable session secret
    pub session_token_file: Option<String>,
    /// Backend base URL
    pub base_url: Option<String>,
    /// Model identifier sent with each request
    pub model: Option<String>,
    /// Browser user agent presented to the backend
    pub user_agent: Option<String>,
    /// Timeout for one backend request, in seconds
    pub request_timeout_secs: Option<u64>,
    /// Session refresh period, in seconds
    pub refresh_interval_secs: Option<u64>,
    /// Idle time after which a conversation starts over, in seconds
    pub idle_timeout_secs: Option<u64>,
    /// Name the bot is mentioned by in groups
    pub bot_name: Option<String>,
    /// Text put in front of every answer
    pub reply_prefix: Option<String>,
    /// Treat console input as messages in this group
    pub group: Option<String>,
}

impl Config {
    /// Directory holding `config.toml`, e.g. `~/.config/chatrelay` on Linux
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("chatrelay")
    }

    /// `CHATRELAY_CONFIG_PATH` if set, else `config.toml` in [`Self::config_dir`]
    pub fn config_path() -> PathBuf {
        std::env::var_os("CHATRELAY_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| Self::config_dir().join("config.toml"))
    }

    /// Load the config file.
    ///
    /// A missing file means all defaults. An unreadable or malformed file is
    /// logged and also falls back to defaults, so the bot still starts.
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Self::default();
        }

        Self::read(&path).unwrap_or_else(|e| {
            tracing::warn!("Ignoring config file: {:#}", e);
            Self::default()
        })
    }

    fn read(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Write the config to [`Self::config_path`], creating its directory
    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::config_path();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content).with_context(|| format!("failed to write {}", path.display()))
    }

    /// Write a config with the stock session file, timeouts and reply prefix
    /// unless one already exists. Returns its path either way.
    pub fn init() -> anyhow::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }

        let stock = Config {
            session_token_file: Some(DEFAULT_SESSION_TOKEN_FILE.to_string()),
            base_url: Some(DEFAULT_BASE_URL.to_string()),
            model: Some(DEFAULT_MODEL.to_string()),
            request_timeout_secs: Some(120),
            refresh_interval_secs: Some(600),
            idle_timeout_secs: Some(300),
            reply_prefix: Some(DEFAULT_REPLY_PREFIX.to_string()),
            ..Default::default()
        };

        stock.save()?;
        Ok(path)
    }

    /// Path of the session secret file
    pub fn session_token_path(&self) -> PathBuf {
        PathBuf::from(
            self.session_token_file
                .as_deref()
                .unwrap_or(DEFAULT_SESSION_TOKEN_FILE),
        )
    }

    /// Reply prefix, or the default
    pub fn reply_prefix(&self) -> &str {
        self.reply_prefix.as_deref().unwrap_or(DEFAULT_REPLY_PREFIX)
    }

    /// Backend settings with unset values taken from the defaults
    pub fn provider_settings(&self) -> ProviderSettings {
        let defaults = ProviderSettings::default();
        ProviderSettings {
            base_url: self.base_url.clone().unwrap_or(defaults.base_url),
            model: self.model.clone().unwrap_or(defaults.model),
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
            request_timeout: self
                .request_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            refresh_interval: self
                .refresh_interval_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.refresh_interval),
            idle_timeout: self
                .idle_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.idle_timeout),
        }
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# chatrelay configuration file
# Place at ~/.config/chatrelay/config.toml (Linux), or point CHATRELAY_CONFIG_PATH at it

# File containing the session cookie value (at least 100 characters)
session_token_file = "sessionToken"

# Backend base URL and model
base_url = "https://chat.openai.com"
model = "text-davinci-002-render"

# Seconds before a backend request is abandoned
request_timeout_secs = 120

# Seconds between session refreshes
refresh_interval_secs = 600

# Seconds of silence after which a user's conversation starts over
idle_timeout_secs = 300

# Name the bot answers to in groups (messages must contain "@<bot_name>")
# bot_name = "relay"

# Text put in front of every answer
reply_prefix = "ChatGPT: "

# Treat console input as group messages in this group
# group = "lobby"
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.session_token_path(), PathBuf::from("sessionToken"));
        assert_eq!(config.reply_prefix(), DEFAULT_REPLY_PREFIX);

        let settings = config.provider_settings();
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.request_timeout, Duration::from_secs(120));
        assert_eq!(settings.refresh_interval, Duration::from_secs(600));
        assert_eq!(settings.idle_timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_example_config_parses() {
        let config: Config = toml::from_str(example_config()).unwrap();
        assert_eq!(config.session_token_file.as_deref(), Some("sessionToken"));
        assert_eq!(config.idle_timeout_secs, Some(300));
        assert!(config.bot_name.is_none());
    }

    #[test]
    fn test_read_reports_malformed_file() {
        let path = std::env::temp_dir()
            .join(format!("chatrelay-config-{}.toml", std::process::id()));
        fs::write(&path, "idle_timeout_secs = \"soon\"").unwrap();

        let err = Config::read(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("failed to parse"));
        fs::remove_file(path).ok();
    }

    #[test]
    fn test_partial_config_overrides() {
        let config: Config = toml::from_str(
            r#"
            idle_timeout_secs = 60
            model = "custom-model"
            "#,
        )
        .unwrap();
        let settings = config.provider_settings();
        assert_eq!(settings.idle_timeout, Duration::from_secs(60));
        assert_eq!(settings.model, "custom-model");
        assert_eq!(settings.refresh_interval, Duration::from_secs(600));
    }
}
