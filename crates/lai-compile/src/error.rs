//! Error types for the build pipeline
//!
//! Every variant converts to a display string at the controller boundary;
//! none of them escape to the rendering layer as a fault.

/// Build service errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    /// Non-success response, message already resolved from the body
    #[error("{message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Human-readable message
        message: String,
    },

    /// Connection, DNS or TLS failure
    #[error("network error: {0}")]
    Transport(String),

    /// Request exceeded the configured timeout
    #[error("build request timed out after {0}s")]
    Timeout(u64),

    /// Success status but the body could not be read
    #[error("could not read build output: {0}")]
    Body(String),

    /// Invalid client configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The build service implementation panicked
    #[error("build service failed unexpectedly")]
    Panicked,
}

impl BuildError {
    /// Message shown inline to the user
    #[inline]
    #[must_use]
    pub fn display_message(&self) -> String {
        self.to_string()
    }

    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout(_) => true,
            Self::Status { status, .. } => matches!(*status, 502..=504),
            Self::Body(_) | Self::InvalidConfig(_) | Self::Panicked => false,
        }
    }
}
