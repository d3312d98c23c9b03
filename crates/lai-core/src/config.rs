//! Application configuration
//!
//! Loaded from TOML, every field optional. Environment overrides:
//! `LATEXAI_BUILD_URL`, `LATEXAI_CHAT_URL`, `LATEXAI_LOG`.

use crate::error::ConfigError;
use lai_chat::PromptPreset;
use lai_compile::{DEFAULT_BASE_URL, DEFAULT_COMPILER};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Build service URL override
pub const ENV_BUILD_URL: &str = "LATEXAI_BUILD_URL";
/// Assistant endpoint override
pub const ENV_CHAT_URL: &str = "LATEXAI_CHAT_URL";
/// Log filter override
pub const ENV_LOG: &str = "LATEXAI_LOG";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Build service
    pub build: BuildConfig,
    /// Assistant endpoint
    pub chat: ChatConfig,
    /// Log output
    pub logging: LoggingConfig,
}

/// Build service settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Service root; `/builds/sync` is appended
    pub base_url: String,
    /// LaTeX engine
    pub compiler: String,
    /// Whole-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            compiler: DEFAULT_COMPILER.to_string(),
            timeout_secs: 120,
        }
    }
}

impl BuildConfig {
    /// Timeout as a duration
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Assistant endpoint settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Full URL of the streaming chat endpoint
    pub endpoint: String,
    /// Connect and per-read timeout in seconds
    pub timeout_secs: u64,
    /// System prompt sent with each turn
    pub prompt: PromptPreset,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:3000/api/chat".to_string(),
            timeout_secs: 300,
            prompt: PromptPreset::default(),
        }
    }
}

impl ChatConfig {
    /// Timeout as a duration
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// Log settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive
    pub filter: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl AppConfig {
    /// Create config with defaults
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a TOML file
    ///
    /// # Errors
    /// `ConfigError::Read`, `ConfigError::Parse`, or `ConfigError::Invalid`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Parse TOML text
    ///
    /// # Errors
    /// `ConfigError::Parse` or `ConfigError::Invalid`.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    #[must_use]
    pub fn apply_env(self) -> Self {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`; empty values are ignored
    #[must_use]
    pub fn apply_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key| lookup(key).filter(|v: &String| !v.trim().is_empty());
        if let Some(url) = get(ENV_BUILD_URL) {
            self.build.base_url = url;
        }
        if let Some(url) = get(ENV_CHAT_URL) {
            self.chat.endpoint = url;
        }
        if let Some(filter) = get(ENV_LOG) {
            self.logging.filter = filter;
        }
        self
    }

    /// Check values
    ///
    /// # Errors
    /// `ConfigError::Invalid` naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.build.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "build.base_url",
                reason: "must not be empty".to_string(),
            });
        }
        if self.build.compiler.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "build.compiler",
                reason: "must not be empty".to_string(),
            });
        }
        if self.build.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "build.timeout_secs",
                reason: "must be positive".to_string(),
            });
        }
        if self.chat.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "chat.endpoint",
                reason: "must not be empty".to_string(),
            });
        }
        if self.chat.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "chat.timeout_secs",
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Set build service root
    #[must_use]
    pub fn with_build_url(mut self, url: impl Into<String>) -> Self {
        self.build.base_url = url.into();
        self
    }

    /// Set LaTeX engine
    #[must_use]
    pub fn with_compiler(mut self, compiler: impl Into<String>) -> Self {
        self.build.compiler = compiler.into();
        self
    }

    /// Set build timeout
    #[must_use]
    pub fn with_build_timeout(mut self, timeout: Duration) -> Self {
        self.build.timeout_secs = timeout.as_secs();
        self
    }

    /// Set assistant endpoint
    #[must_use]
    pub fn with_chat_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.chat.endpoint = endpoint.into();
        self
    }

    /// Set system prompt preset
    #[must_use]
    pub fn with_prompt(mut self, prompt: PromptPreset) -> Self {
        self.chat.prompt = prompt;
        self
    }

    /// Set log filter
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.logging.filter = filter.into();
        self
    }
}
