//! LaTeXAI Chat
//!
//! Streams assistant turns, tracks which assistant messages have completed,
//! and lets the user accept a message into the shared document:
//! - [`ChatSession`]: conversation, status and acceptance
//! - [`CompletionTracker`]: per-message finalization flags
//! - [`ChatSource`]: the streamed token source seam
//! - [`DataStreamDecoder`]: incremental wire decoder
//!
//! # Example
//!
//! ```rust,ignore
//! use lai_chat::{ChatSession, HttpChatSource, PromptPreset};
//! use lai_document::DocumentState;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = Arc::new(HttpChatSource::new("http://localhost:3000/api/chat")?);
//! let chat = ChatSession::new(source, PromptPreset::Conversation.text().map(String::from));
//!
//! let turn = chat.submit("Write a one-page article about otters").await?;
//! if let Some(id) = turn.assistant {
//!     chat.accept(id, &DocumentState::new())?;
//! }
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod conversation;
pub mod error;
pub mod message;
pub mod prompt;
pub mod protocol;
pub mod source;
pub mod tracker;

pub use conversation::{ChatSession, ChatStatus, TurnOutcome};
pub use error::ChatError;
pub use message::{AcceptTarget, Message, MessageBody, MessageId, MessageView, Role, WireMessage};
pub use prompt::{PromptPreset, AUTHORING_GUIDELINES, CONVERSATION_SYSTEM_PROMPT};
pub use protocol::{encode_event, DataStreamDecoder, StreamEvent};
pub use source::{ChatRequest, ChatSource, EventStream, HttpChatSource};
pub use tracker::CompletionTracker;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
