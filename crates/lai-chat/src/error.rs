//! Error types for the chat pipeline
//!
//! Covers submission guards, transport failures talking to the assistant
//! endpoint, and malformed stream frames.

use crate::message::MessageId;

/// Chat error type
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// A turn is already submitted or streaming
    #[error("a response is already in progress")]
    Busy,

    /// Input was empty after trimming
    #[error("message is empty")]
    EmptyInput,

    /// No message with this id in the conversation
    #[error("unknown message: {0}")]
    UnknownMessage(MessageId),

    /// Operation only valid on assistant messages
    #[error("message {0} is not an assistant message")]
    NotAssistant(MessageId),

    /// Endpoint answered with a non-success status
    #[error("assistant endpoint returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, possibly empty
        body: String,
    },

    /// Network or connection failure
    #[error("transport error: {0}")]
    Transport(String),

    /// A stream frame could not be decoded
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Invalid client configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ChatError {
    /// Whether the failure happened after the request reached the network
    #[inline]
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Status { .. } | Self::Transport(_) | Self::Protocol(_)
        )
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
