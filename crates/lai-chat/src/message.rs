//! Conversation messages and their rendered views

use chrono::{DateTime, Utc};
use lai_extract::ExtractionResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Unique message identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(pub Ulid);

impl MessageId {
    /// Generate new message ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human author
    User,
    /// The assistant
    Assistant,
}

/// A conversation entry
///
/// Assistant messages are created empty and grow in place as tokens arrive.
/// Whether a message is finalized lives in the conversation's tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Identifier
    pub id: MessageId,
    /// Author
    pub role: Role,
    /// Text received so far
    pub content: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// New user message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content.into())
    }

    /// New, empty assistant message
    #[must_use]
    pub fn assistant() -> Self {
        Self::new(Role::Assistant, String::new())
    }

    fn new(role: Role, content: String) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content,
            created_at: Utc::now(),
        }
    }

    /// Whether this is an assistant message
    #[inline]
    #[must_use]
    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }
}

/// Outgoing message shape sent to the assistant endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    /// Author
    pub role: Role,
    /// Text
    pub content: String,
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

/// How a message body should be drawn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    /// User text, shown as typed
    Plain(String),
    /// Assistant text still streaming (or never finalized), shown raw
    Streaming(String),
    /// Finalized assistant text split around its payload
    Parsed(ExtractionResult),
}

/// What the accept action would write into the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcceptTarget {
    /// The extracted payload of a finalized message
    Payload(String),
    /// The full raw content
    Raw(String),
}

impl AcceptTarget {
    /// Text that would be written
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Payload(text) | Self::Raw(text) => text,
        }
    }

    /// Consume into the text
    #[inline]
    #[must_use]
    pub fn into_text(self) -> String {
        match self {
            Self::Payload(text) | Self::Raw(text) => text,
        }
    }

    /// Whether the parsed payload is used
    #[inline]
    #[must_use]
    pub fn is_payload(&self) -> bool {
        matches!(self, Self::Payload(_))
    }
}

/// Render-ready view of a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageView {
    /// Identifier
    pub id: MessageId,
    /// Author
    pub role: Role,
    /// Whether the stream for this message completed
    pub finalized: bool,
    /// Body to draw
    pub body: MessageBody,
    /// Length of the raw content in characters
    pub content_len: usize,
    /// Accept affordance, assistant messages only
    pub accept: Option<AcceptTarget>,
}

impl MessageView {
    pub(crate) fn build(message: &Message, finalized: bool) -> Self {
        let content_len = message.content.chars().count();

        let (body, accept) = match message.role {
            Role::User => (MessageBody::Plain(message.content.clone()), None),
            Role::Assistant if finalized => {
                let parsed = lai_extract::extract(&message.content);
                let accept = match &parsed.payload {
                    Some(payload) => AcceptTarget::Payload(payload.clone()),
                    None => AcceptTarget::Raw(message.content.clone()),
                };
                (MessageBody::Parsed(parsed), Some(accept))
            }
            Role::Assistant => (
                MessageBody::Streaming(message.content.clone()),
                Some(AcceptTarget::Raw(message.content.clone())),
            ),
        };

        Self {
            id: message.id,
            role: message.role,
            finalized,
            body,
            content_len,
            accept,
        }
    }
}
