//! Conversation driving streamed assistant turns
//!
//! A [`ChatSession`] owns the message list and the [`CompletionTracker`].
//! State sits behind a short-lived lock that is never held across an await,
//! so views can be read and the document edited while a turn streams.

use crate::error::ChatError;
use crate::message::{AcceptTarget, Message, MessageId, MessageView, WireMessage};
use crate::protocol::StreamEvent;
use crate::source::{ChatRequest, ChatSource};
use crate::tracker::CompletionTracker;
use futures::StreamExt;
use lai_document::{DocumentState, Writer};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Submission status, used to refuse duplicate submissions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChatStatus {
    /// Idle, a new message may be sent
    Ready,
    /// Request sent, no token received yet
    Submitted,
    /// Tokens are arriving
    Streaming,
}

impl ChatStatus {
    /// Whether a turn is in progress
    #[inline]
    #[must_use]
    pub fn is_busy(self) -> bool {
        !matches!(self, Self::Ready)
    }
}

/// Result of one submitted turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    /// The user message that was appended
    pub user: MessageId,
    /// The assistant message, if any token or start frame arrived
    pub assistant: Option<MessageId>,
    /// Whether an explicit completion signal was received
    pub finalized: bool,
    /// Why the turn ended abnormally
    pub error: Option<String>,
}

#[derive(Debug)]
struct ConversationState {
    messages: Vec<Message>,
    tracker: CompletionTracker,
    status: ChatStatus,
    last_error: Option<String>,
}

impl ConversationState {
    fn find(&self, id: MessageId) -> Result<&Message, ChatError> {
        self.messages
            .iter()
            .find(|m| m.id == id)
            .ok_or(ChatError::UnknownMessage(id))
    }

    fn ensure_assistant(&mut self, slot: &mut Option<MessageId>) -> MessageId {
        if let Some(id) = *slot {
            return id;
        }
        let message = Message::assistant();
        let id = message.id;
        self.tracker.begin(id);
        self.messages.push(message);
        self.status = ChatStatus::Streaming;
        *slot = Some(id);
        id
    }

    fn append(&mut self, id: MessageId, text: &str) {
        if let Some(message) = self.messages.iter_mut().find(|m| m.id == id) {
            message.content.push_str(text);
        }
    }

    fn finalize(&mut self, id: MessageId) -> Result<bool, ChatError> {
        let message = self.find(id)?;
        if !message.is_assistant() {
            return Err(ChatError::NotAssistant(id));
        }
        let message = message.clone();
        Ok(self.tracker.finalize(&message))
    }

    fn view(&self, message: &Message) -> MessageView {
        let finalized = !message.is_assistant() || self.tracker.is_finalized(message.id);
        MessageView::build(message, finalized)
    }
}

struct Inner {
    source: Arc<dyn ChatSource>,
    system_prompt: Option<String>,
    state: Mutex<ConversationState>,
}

/// Handle to a conversation
///
/// Clones share the same conversation.
#[derive(Clone)]
pub struct ChatSession {
    inner: Arc<Inner>,
}

impl fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("ChatSession")
            .field("messages", &state.messages.len())
            .field("status", &state.status)
            .field("has_system_prompt", &self.inner.system_prompt.is_some())
            .finish_non_exhaustive()
    }
}

impl ChatSession {
    /// Create a conversation over `source`
    #[must_use]
    pub fn new(source: Arc<dyn ChatSource>, system_prompt: Option<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                system_prompt,
                state: Mutex::new(ConversationState {
                    messages: Vec::new(),
                    tracker: CompletionTracker::new(),
                    status: ChatStatus::Ready,
                    last_error: None,
                }),
            }),
        }
    }

    /// Send a user message and stream the assistant's reply to completion
    ///
    /// The stream terminating without an explicit completion signal leaves
    /// the assistant message unfinalized for good; it is then only offered
    /// for raw acceptance. Dropping the future mid-stream does the same and
    /// returns the session to `Ready`.
    ///
    /// # Errors
    /// - `ChatError::Busy` while another turn is in progress
    /// - `ChatError::EmptyInput` for blank input
    /// - Any error from opening the stream
    pub async fn submit(&self, input: &str) -> Result<TurnOutcome, ChatError> {
        if input.trim().is_empty() {
            return Err(ChatError::EmptyInput);
        }

        let (user, request) = {
            let mut state = self.inner.state.lock();
            if state.status.is_busy() {
                return Err(ChatError::Busy);
            }
            let message = Message::user(input);
            let user = message.id;
            state.messages.push(message);
            state.status = ChatStatus::Submitted;
            state.last_error = None;

            let request = ChatRequest {
                system: self.inner.system_prompt.clone(),
                messages: state.messages.iter().map(WireMessage::from).collect(),
            };
            (user, request)
        };

        tracing::info!(message_id = %user, "submitting chat turn");
        let mut turn = InTurn {
            state: &self.inner.state,
            armed: true,
        };

        let mut events = match self.inner.source.open(request).await {
            Ok(events) => events,
            Err(e) => {
                tracing::error!("failed to open assistant stream: {}", e);
                turn.armed = false;
                let mut state = self.inner.state.lock();
                state.status = ChatStatus::Ready;
                state.last_error = Some(e.to_string());
                return Err(e);
            }
        };

        let mut assistant = None;
        let mut finalized = false;
        let mut error = None;

        while let Some(item) = events.next().await {
            match item {
                Ok(StreamEvent::Started { remote_id }) => {
                    let id = self.inner.state.lock().ensure_assistant(&mut assistant);
                    tracing::debug!(message_id = %id, ?remote_id, "assistant message started");
                }
                Ok(StreamEvent::Delta(text)) => {
                    let mut state = self.inner.state.lock();
                    let id = state.ensure_assistant(&mut assistant);
                    state.append(id, &text);
                }
                Ok(StreamEvent::Finished { reason }) => {
                    let mut state = self.inner.state.lock();
                    let id = state.ensure_assistant(&mut assistant);
                    if let Err(e) = state.finalize(id) {
                        error = Some(e.to_string());
                        break;
                    }
                    finalized = true;
                    tracing::info!(message_id = %id, ?reason, "assistant message finalized");
                    break;
                }
                Ok(StreamEvent::Error(message)) => {
                    error = Some(message);
                    break;
                }
                Err(e) => {
                    error = Some(e.to_string());
                    break;
                }
            }
        }

        turn.armed = false;
        let mut state = self.inner.state.lock();
        state.status = ChatStatus::Ready;
        if !finalized {
            let reason =
                error.unwrap_or_else(|| "stream ended without a completion signal".to_string());
            tracing::warn!(
                message_id = ?assistant,
                "assistant stream terminated abnormally, message stays unfinalized: {}",
                reason
            );
            state.last_error = Some(reason.clone());
            error = Some(reason);
        }

        Ok(TurnOutcome {
            user,
            assistant,
            finalized,
            error,
        })
    }

    /// Record an out-of-band completion signal for an assistant message
    ///
    /// Returns `true` only if this call finalized the message.
    ///
    /// # Errors
    /// `UnknownMessage` or `NotAssistant`.
    pub fn signal_finished(&self, id: MessageId) -> Result<bool, ChatError> {
        self.inner.state.lock().finalize(id)
    }

    /// Write the message's accept target into the document
    ///
    /// Finalized messages with a payload contribute the payload; everything
    /// else contributes the raw content.
    ///
    /// # Errors
    /// `UnknownMessage` or `NotAssistant`.
    pub fn accept(&self, id: MessageId, document: &DocumentState) -> Result<AcceptTarget, ChatError> {
        let target = {
            let state = self.inner.state.lock();
            let message = state.find(id)?;
            state
                .view(message)
                .accept
                .ok_or(ChatError::NotAssistant(id))?
        };

        document.replace(Writer::Acceptance, target.text());
        tracing::info!(
            message_id = %id,
            payload = target.is_payload(),
            bytes = target.text().len(),
            "accepted assistant content into document"
        );
        Ok(target)
    }

    /// Render-ready views of every message, oldest first
    #[must_use]
    pub fn views(&self) -> Vec<MessageView> {
        let state = self.inner.state.lock();
        state.messages.iter().map(|m| state.view(m)).collect()
    }

    /// View of a single message
    #[must_use]
    pub fn view(&self, id: MessageId) -> Option<MessageView> {
        let state = self.inner.state.lock();
        state.find(id).ok().map(|m| state.view(m))
    }

    /// Copy of the message list
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.inner.state.lock().messages.clone()
    }

    /// Current status
    #[inline]
    #[must_use]
    pub fn status(&self) -> ChatStatus {
        self.inner.state.lock().status
    }

    /// Whether the assistant message's stream completed
    #[inline]
    #[must_use]
    pub fn is_finalized(&self, id: MessageId) -> bool {
        self.inner.state.lock().tracker.is_finalized(id)
    }

    /// Error from the most recent turn, if it ended abnormally
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.inner.state.lock().last_error.clone()
    }

    /// System prompt sent with each turn
    #[inline]
    #[must_use]
    pub fn system_prompt(&self) -> Option<&str> {
        self.inner.system_prompt.as_deref()
    }
}

/// Returns the session to `Ready` if a turn is dropped mid-stream
struct InTurn<'a> {
    state: &'a Mutex<ConversationState>,
    armed: bool,
}

impl Drop for InTurn<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.state.lock();
        state.status = ChatStatus::Ready;
        state.last_error = Some("stream cancelled".to_string());
        tracing::warn!("chat turn cancelled before the stream ended, message stays unfinalized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::EventStream;
    use async_trait::async_trait;
    use futures::stream;
    use pretty_assertions::assert_eq;

    struct FixedSource(Vec<Result<StreamEvent, ChatError>>);

    #[async_trait]
    impl ChatSource for FixedSource {
        async fn open(&self, _request: ChatRequest) -> Result<EventStream, ChatError> {
            let events: Vec<_> = self
                .0
                .iter()
                .map(|e| match e {
                    Ok(event) => Ok(event.clone()),
                    Err(err) => Err(ChatError::Transport(err.to_string())),
                })
                .collect();
            Ok(stream::iter(events).boxed())
        }
    }

    fn session(events: Vec<Result<StreamEvent, ChatError>>) -> ChatSession {
        ChatSession::new(Arc::new(FixedSource(events)), None)
    }

    #[tokio::test]
    async fn finished_turn_offers_payload() {
        let chat = session(vec![
            Ok(StreamEvent::Delta("Done [%LATEX%]".to_string())),
            Ok(StreamEvent::Delta("\\section{A}[%LATEX%]".to_string())),
            Ok(StreamEvent::Finished { reason: None }),
        ]);

        let outcome = chat.submit("make a section").await.unwrap();
        assert!(outcome.finalized);
        let id = outcome.assistant.unwrap();

        let doc = DocumentState::new();
        let target = chat.accept(id, &doc).unwrap();
        assert_eq!(target, AcceptTarget::Payload("\\section{A}".to_string()));
        assert_eq!(doc.text(), "\\section{A}");
        assert_eq!(doc.last_writer(), Some(Writer::Acceptance));
        assert_eq!(chat.status(), ChatStatus::Ready);
    }

    #[tokio::test]
    async fn stream_without_finish_stays_raw() {
        let chat = session(vec![Ok(StreamEvent::Delta(
            "half [%LATEX%]\\documentclass".to_string(),
        ))]);

        let outcome = chat.submit("go").await.unwrap();
        assert!(!outcome.finalized);
        assert!(outcome.error.is_some());

        let id = outcome.assistant.unwrap();
        assert!(!chat.is_finalized(id));

        let doc = DocumentState::new();
        let target = chat.accept(id, &doc).unwrap();
        assert!(!target.is_payload());
        assert_eq!(doc.text(), "half [%LATEX%]\\documentclass");
    }

    #[tokio::test]
    async fn blank_input_is_rejected() {
        let chat = session(vec![]);
        assert!(matches!(chat.submit("   ").await, Err(ChatError::EmptyInput)));
        assert!(chat.messages().is_empty());
    }

    #[tokio::test]
    async fn accepting_user_message_fails() {
        let chat = session(vec![Ok(StreamEvent::Finished { reason: None })]);
        let outcome = chat.submit("hi").await.unwrap();

        let err = chat.accept(outcome.user, &DocumentState::new()).unwrap_err();
        assert!(matches!(err, ChatError::NotAssistant(_)));
    }

    #[tokio::test]
    async fn signal_finished_is_idempotent() {
        let chat = session(vec![Ok(StreamEvent::Delta("x".to_string()))]);
        let id = chat.submit("hi").await.unwrap().assistant.unwrap();

        assert!(chat.signal_finished(id).unwrap());
        assert!(!chat.signal_finished(id).unwrap());
        assert!(chat.is_finalized(id));
    }

    /// First turn stalls after one token, later turns complete
    #[derive(Default)]
    struct StallingSource {
        opened: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl ChatSource for StallingSource {
        async fn open(&self, _request: ChatRequest) -> Result<EventStream, ChatError> {
            let first = self
                .opened
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst)
                == 0;
            if first {
                let head = stream::iter(vec![Ok(StreamEvent::Delta("partial".to_string()))]);
                Ok(head.chain(stream::pending()).boxed())
            } else {
                Ok(stream::iter(vec![
                    Ok(StreamEvent::Delta("again".to_string())),
                    Ok(StreamEvent::Finished { reason: None }),
                ])
                .boxed())
            }
        }
    }

    #[tokio::test]
    async fn cancelled_turn_does_not_wedge_session() {
        let chat = ChatSession::new(Arc::new(StallingSource::default()), None);

        {
            let pending = chat.submit("first");
            tokio::pin!(pending);
            let polled = futures::poll!(pending.as_mut());
            assert!(polled.is_pending());
            assert_eq!(chat.status(), ChatStatus::Streaming);
        }

        assert_eq!(chat.status(), ChatStatus::Ready);
        assert_eq!(chat.last_error().as_deref(), Some("stream cancelled"));
        let messages = chat.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].content, "partial");
        assert!(!chat.is_finalized(messages[1].id));

        let outcome = chat.submit("second").await.unwrap();
        assert!(outcome.finalized);
        assert_eq!(chat.last_error(), None);
    }
}
