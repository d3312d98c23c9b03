//! Assistant token sources
//!
//! The token-generation service is an external collaborator. [`ChatSource`]
//! is the seam; [`HttpChatSource`] talks to an endpoint speaking the data
//! stream protocol from [`crate::protocol`].

use crate::error::ChatError;
use crate::message::WireMessage;
use crate::protocol::{DataStreamDecoder, StreamEvent};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::Client;
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;

/// Stream of decoded events for one assistant turn
pub type EventStream = BoxStream<'static, Result<StreamEvent, ChatError>>;

/// Request for one assistant turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    /// System instructions, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Full conversation so far, oldest first
    pub messages: Vec<WireMessage>,
}

/// Source of streamed assistant responses
#[async_trait]
pub trait ChatSource: Send + Sync {
    /// Start a turn and return its event stream
    ///
    /// # Errors
    /// Fails if the turn could not be started at all.
    async fn open(&self, request: ChatRequest) -> Result<EventStream, ChatError>;
}

/// HTTP implementation posting the conversation as JSON
#[derive(Debug, Clone)]
pub struct HttpChatSource {
    endpoint: String,
    http_client: Client,
}

impl HttpChatSource {
    /// Create a source for `endpoint` with the default timeout
    ///
    /// # Errors
    /// Returns `ChatError::InvalidConfig` if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, ChatError> {
        Self::with_timeout(endpoint, Duration::from_secs(300))
    }

    /// Create a source with an explicit idle timeout
    ///
    /// `timeout` bounds connecting and every single read, never the whole
    /// reply, so a long answer keeps streaming as long as tokens arrive.
    ///
    /// # Errors
    /// Returns `ChatError::InvalidConfig` if the HTTP client cannot be built.
    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ChatError> {
        let http_client = Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()
            .map_err(|e| ChatError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            endpoint: endpoint.into(),
            http_client,
        })
    }

    /// Endpoint URL
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatSource for HttpChatSource {
    async fn open(&self, request: ChatRequest) -> Result<EventStream, ChatError> {
        tracing::debug!(
            endpoint = %self.endpoint,
            messages = request.messages.len(),
            "opening assistant stream"
        );

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(decode_body(response.bytes_stream().boxed()))
    }
}

struct DecodeState {
    body: BoxStream<'static, reqwest::Result<Bytes>>,
    decoder: DataStreamDecoder,
    pending: VecDeque<StreamEvent>,
    done: bool,
}

fn decode_body(body: BoxStream<'static, reqwest::Result<Bytes>>) -> EventStream {
    let state = DecodeState {
        body,
        decoder: DataStreamDecoder::new(),
        pending: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.pending.pop_front() {
                return Some((Ok(event), state));
            }
            if state.done {
                return None;
            }

            match state.body.next().await {
                Some(Ok(chunk)) => state.pending.extend(state.decoder.push(&chunk)),
                Some(Err(e)) => {
                    state.done = true;
                    return Some((Err(ChatError::from(e)), state));
                }
                None => {
                    state.done = true;
                    state.pending.extend(state.decoder.finish());
                }
            }
        }
    })
    .boxed()
}
