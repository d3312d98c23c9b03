//! Testing utilities for LaTeXAI workspace
//!
//! Scripted stand-ins for the assistant stream and the build service, plus
//! document fixtures.

#![allow(missing_docs)]

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use lai_chat::{ChatError, ChatRequest, ChatSource, EventStream, StreamEvent};
use lai_compile::{BuildError, BuildRequest, BuildService};
use lai_document::{DocumentState, Writer};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Semaphore;

pub const MINIMAL_DOCUMENT: &str =
    "\\documentclass{article}\n\\begin{document}\nHello\n\\end{document}\n";

pub const FAKE_PDF: &[u8] = b"%PDF-1.5\n%test\n";

pub fn minimal_document() -> DocumentState {
    DocumentState::with_text(MINIMAL_DOCUMENT)
}

/// Assistant reply wrapping `latex` in the delimiter, with explanation text
pub fn delimited_reply(explanation: &str, latex: &str, closing: &str) -> String {
    format!("{explanation}[%LATEX%]{latex}[%LATEX%]{closing}")
}

/// Events for a complete assistant turn, `text` split into small deltas
pub fn reply_events(text: &str) -> Vec<StreamEvent> {
    let mut events = truncated_reply_events(text);
    events.push(StreamEvent::Finished {
        reason: Some("stop".to_string()),
    });
    events
}

/// Events for a turn that never sends its completion signal
pub fn truncated_reply_events(text: &str) -> Vec<StreamEvent> {
    let mut events = vec![StreamEvent::Started {
        remote_id: Some("msg-test".to_string()),
    }];
    let chars: Vec<char> = text.chars().collect();
    events.extend(
        chars
            .chunks(7)
            .map(|chunk| StreamEvent::Delta(chunk.iter().collect())),
    );
    events
}

/// Chat source replaying one scripted event list per `open`
#[derive(Debug, Default)]
pub struct ScriptedChatSource {
    turns: Mutex<VecDeque<Vec<StreamEvent>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedChatSource {
    pub fn new(turns: Vec<Vec<StreamEvent>>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn single(events: Vec<StreamEvent>) -> Self {
        Self::new(vec![events])
    }

    pub fn push_turn(&self, events: Vec<StreamEvent>) {
        self.turns.lock().push_back(events);
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().clone()
    }

    pub fn open_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl ChatSource for ScriptedChatSource {
    async fn open(&self, request: ChatRequest) -> Result<EventStream, ChatError> {
        self.requests.lock().push(request);
        let events = self
            .turns
            .lock()
            .pop_front()
            .ok_or_else(|| ChatError::Transport("script exhausted".to_string()))?;
        Ok(Box::pin(stream::iter(events.into_iter().map(Ok))))
    }
}

type BuildHook = Box<dyn Fn(&BuildRequest) + Send + Sync>;

/// Build service with scripted responses, request recording and an optional gate
///
/// When gated, every build waits for one [`release`](Self::release) before
/// answering, so a test can hold a compile in flight.
pub struct ScriptedBuildService {
    responses: Mutex<VecDeque<Result<Bytes, BuildError>>>,
    requests: Mutex<Vec<BuildRequest>>,
    gate: Option<Semaphore>,
    waiting: AtomicUsize,
    hook: Option<BuildHook>,
}

impl std::fmt::Debug for ScriptedBuildService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedBuildService")
            .field("pending_responses", &self.responses.lock().len())
            .field("requests", &self.requests.lock().len())
            .field("gated", &self.gate.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for ScriptedBuildService {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedBuildService {
    /// Answers every build with [`FAKE_PDF`] unless a response is queued
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            gate: None,
            waiting: AtomicUsize::new(0),
            hook: None,
        }
    }

    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new()
        }
    }

    pub fn failing(status: u16, message: &str) -> Self {
        let service = Self::new();
        service.push_failure(status, message);
        service
    }

    /// Run `hook` when a build starts, before the gate
    pub fn with_hook(mut self, hook: impl Fn(&BuildRequest) + Send + Sync + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    /// Replace the document text while the build is in flight
    pub fn editing(self, document: DocumentState, text: &'static str) -> Self {
        self.with_hook(move |_| {
            document.replace(Writer::Editor, text);
        })
    }

    pub fn push_success(&self, bytes: impl Into<Bytes>) {
        self.responses.lock().push_back(Ok(bytes.into()));
    }

    pub fn push_failure(&self, status: u16, message: &str) {
        self.responses.lock().push_back(Err(BuildError::Status {
            status,
            message: message.to_string(),
        }));
    }

    pub fn push_error(&self, error: BuildError) {
        self.responses.lock().push_back(Err(error));
    }

    /// Let `n` gated builds answer
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub fn requests(&self) -> Vec<BuildRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Builds currently blocked on the gate
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BuildService for ScriptedBuildService {
    async fn build(&self, request: BuildRequest) -> Result<Bytes, BuildError> {
        if let Some(hook) = &self.hook {
            hook(&request);
        }
        self.requests.lock().push(request);

        if let Some(gate) = &self.gate {
            self.waiting.fetch_add(1, Ordering::SeqCst);
            let permit = gate.acquire().await;
            self.waiting.fetch_sub(1, Ordering::SeqCst);
            match permit {
                Ok(permit) => permit.forget(),
                Err(_) => return Err(BuildError::Transport("gate closed".to_string())),
            }
        }

        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(Bytes::from_static(FAKE_PDF)))
    }
}
