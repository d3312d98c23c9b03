//! Authoring session
//!
//! Wires one document to the chat, the compilation controller and the tab
//! machine. The editing surface calls [`Workspace::edit`] on every change and
//! observes external replacements through [`Workspace::document`].

use crate::config::AppConfig;
use crate::error::{TabError, WorkspaceError};
use crate::view::{
    Affordance, CompileButton, EditorPane, PreviewAvailability, PreviewPane, TabState, ViewTab,
};
use lai_chat::{AcceptTarget, ChatError, ChatSession, ChatSource, HttpChatSource, MessageId, TurnOutcome};
use lai_compile::{BuildService, CompilationController, HttpBuildService, TriggerOutcome};
use lai_document::{DocumentState, Writer};
use parking_lot::Mutex;
use std::sync::Arc;

/// One co-authoring session
#[derive(Debug)]
pub struct Workspace {
    document: DocumentState,
    chat: ChatSession,
    controller: CompilationController,
    tabs: Mutex<TabState>,
}

impl Workspace {
    /// Assemble a session around `document`
    #[must_use]
    pub fn new(
        document: DocumentState,
        chat_source: Arc<dyn ChatSource>,
        build_service: Arc<dyn BuildService>,
        system_prompt: Option<String>,
    ) -> Self {
        let controller = CompilationController::new(build_service, document.clone());
        Self::from_parts(document, ChatSession::new(chat_source, system_prompt), controller)
    }

    /// Session talking to the configured HTTP services
    ///
    /// # Errors
    /// Invalid configuration or HTTP client construction failure.
    pub fn from_config(config: &AppConfig, document: DocumentState) -> Result<Self, WorkspaceError> {
        config.validate()?;

        let build = HttpBuildService::builder()
            .base_url(config.build.base_url.clone())
            .timeout(config.build.timeout())
            .build()?;
        let source = HttpChatSource::with_timeout(config.chat.endpoint.clone(), config.chat.timeout())?;

        let controller = CompilationController::new(Arc::new(build), document.clone())
            .with_compiler(config.build.compiler.clone());
        let chat = ChatSession::new(Arc::new(source), config.chat.prompt.text().map(String::from));
        tracing::debug!(
            build_url = %config.build.base_url,
            chat_url = %config.chat.endpoint,
            "workspace configured"
        );
        Ok(Self::from_parts(document, chat, controller))
    }

    /// Assemble from prebuilt components
    ///
    /// `controller` must compile `document`.
    #[must_use]
    pub fn from_parts(
        document: DocumentState,
        chat: ChatSession,
        controller: CompilationController,
    ) -> Self {
        debug_assert!(controller.document().same_document(&document));
        Self {
            document,
            chat,
            controller,
            tabs: Mutex::new(TabState::new()),
        }
    }

    /// Shared document handle
    #[inline]
    #[must_use]
    pub fn document(&self) -> &DocumentState {
        &self.document
    }

    /// Conversation
    #[inline]
    #[must_use]
    pub fn chat(&self) -> &ChatSession {
        &self.chat
    }

    /// Compilation controller
    #[inline]
    #[must_use]
    pub fn controller(&self) -> &CompilationController {
        &self.controller
    }

    /// Editor content changed
    ///
    /// Returns whether the text differed from the stored document.
    pub fn edit(&self, text: impl Into<String>) -> bool {
        self.document.replace(Writer::Editor, text)
    }

    /// Compile the current document, switching to `Preview` on success
    pub async fn compile(&self) -> TriggerOutcome {
        let outcome = self.controller.trigger_compile().await;
        if outcome.requests_preview() {
            self.tabs.lock().force_preview();
        }
        outcome
    }

    /// Send a chat message and stream the reply
    ///
    /// # Errors
    /// See [`ChatSession::submit`].
    pub async fn send(&self, input: &str) -> Result<TurnOutcome, ChatError> {
        self.chat.submit(input).await
    }

    /// Overwrite the document with an assistant message
    ///
    /// # Errors
    /// See [`ChatSession::accept`].
    pub fn accept(&self, id: MessageId) -> Result<AcceptTarget, ChatError> {
        self.chat.accept(id, &self.document)
    }

    /// Facts the tab machine depends on
    #[must_use]
    pub fn availability(&self) -> PreviewAvailability {
        PreviewAvailability {
            has_artifact: self.controller.has_artifact(),
            compiling: self.controller.is_compiling(),
        }
    }

    /// Visible tab
    #[inline]
    #[must_use]
    pub fn tab(&self) -> ViewTab {
        self.tabs.lock().current()
    }

    /// Switch tabs on user request
    ///
    /// # Errors
    /// `TabError::PreviewUnavailable` with nothing to preview.
    pub fn select_tab(&self, tab: ViewTab) -> Result<ViewTab, TabError> {
        let availability = self.availability();
        self.tabs.lock().select(tab, availability)
    }

    /// Affordance of the preview tab control
    #[must_use]
    pub fn preview_affordance(&self) -> Affordance {
        let availability = self.availability();
        self.tabs.lock().preview_affordance(availability)
    }

    /// Preview tab content
    ///
    /// Rendering a settled result acknowledges it, returning the controller
    /// to `Idle`. The artifact and error stay available.
    #[must_use]
    pub fn preview_pane(&self) -> PreviewPane {
        let pane = PreviewPane::render(
            self.controller.is_compiling(),
            self.controller.artifact(),
            self.controller.last_error(),
        );
        self.controller.acknowledge();
        pane
    }

    /// Editor tab content
    ///
    /// Acknowledges a settled result like [`Workspace::preview_pane`].
    #[must_use]
    pub fn editor_pane(&self) -> EditorPane {
        let pane =
            EditorPane::render(self.tab(), self.document.text(), self.controller.last_error());
        self.controller.acknowledge();
        pane
    }

    /// Compile button state
    #[must_use]
    pub fn compile_button(&self) -> CompileButton {
        CompileButton::render(self.controller.is_compiling(), self.controller.is_stale())
    }
}
