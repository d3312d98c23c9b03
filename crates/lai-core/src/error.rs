//! Error types for the session layer

use std::path::PathBuf;

/// Tab navigation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TabError {
    /// Preview requested with no artifact and no compile in flight
    #[error("no preview available: compile the document first")]
    PreviewUnavailable,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config {path}: {source}")]
    Read {
        /// File that was read
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`crate::AppConfig`]
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range or empty
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Dotted field name
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },

    /// The tracing subscriber could not be installed
    #[error("logging setup failed: {0}")]
    Logging(String),
}

/// Errors building a workspace from configuration
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Build client could not be created
    #[error(transparent)]
    Build(#[from] lai_compile::BuildError),

    /// Chat client could not be created
    #[error(transparent)]
    Chat(#[from] lai_chat::ChatError),
}
