//! Compilation request controller
//!
//! Drives one build at a time from a document snapshot and owns the single
//! live [`CompilationArtifact`]. Phases:
//!
//! ```text
//! Idle ──trigger──▶ Compiling ──ok──▶ Succeeded
//!   ▲                   │
//!   │                   └──err──▶ Failed
//!   └──────acknowledge──────────────┘
//! ```
//!
//! A trigger while `Compiling` is refused, never queued.

use crate::artifact::{ArtifactPreview, ArtifactStore, CompilationArtifact};
use crate::client::{BuildRequest, BuildService, DEFAULT_COMPILER};
use crate::error::BuildError;
use bytes::Bytes;
use futures::FutureExt;
use lai_document::{DocumentSnapshot, DocumentState, Revision, Writer};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Controller phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompilePhase {
    /// Nothing in flight, no unacknowledged result
    #[default]
    Idle,
    /// One build request in flight
    Compiling,
    /// Last build produced the live artifact
    Succeeded,
    /// Last build failed; the message is in `last_error`
    Failed,
}

impl CompilePhase {
    /// Whether a result is waiting to be acknowledged
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Result of one settled build
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileOutcome {
    /// New live artifact
    Success(ArtifactPreview),
    /// User-facing failure message
    Failure(String),
}

impl CompileOutcome {
    /// Whether the build succeeded
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Details of a settled trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileReport {
    /// Build result
    pub outcome: CompileOutcome,
    /// Whether the snapshot was written back over later edits
    pub restored: bool,
    /// Wall time of the request
    pub elapsed: Duration,
}

/// What happened to a trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// A build was already in flight; nothing was sent
    Rejected,
    /// The build ran to completion
    Settled(CompileReport),
}

impl TriggerOutcome {
    /// Whether the caller should switch to the preview tab
    #[inline]
    #[must_use]
    pub fn requests_preview(&self) -> bool {
        matches!(self, Self::Settled(report) if report.outcome.is_success())
    }

    /// Whether the trigger was refused
    #[inline]
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected)
    }
}

/// Edits overwritten when the compiled snapshot was restored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreNotice {
    /// Text that was in the document before the restore
    pub discarded: String,
    /// Revision of the discarded text
    pub discarded_revision: Revision,
    /// Revision written by the restore
    pub restored_revision: Revision,
}

/// Controller counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileStats {
    /// Build requests sent
    pub requests: u64,
    /// Triggers refused while compiling
    pub rejected: u64,
    /// Successful builds
    pub successes: u64,
    /// Failed builds
    pub failures: u64,
    /// Snapshot restorations
    pub restores: u64,
}

#[derive(Debug, Default)]
struct ControllerState {
    phase: CompilePhase,
    artifact: Option<CompilationArtifact>,
    last_error: Option<String>,
    restore_notice: Option<RestoreNotice>,
    compiled_revision: Option<Revision>,
    stats: CompileStats,
}

/// Serializes compile requests and owns the live artifact
///
/// Dropping the controller releases its artifact.
pub struct CompilationController {
    service: Arc<dyn BuildService>,
    document: DocumentState,
    store: ArtifactStore,
    compiler: String,
    state: Mutex<ControllerState>,
}

impl CompilationController {
    /// Create a controller compiling `document` through `service`
    #[must_use]
    pub fn new(service: Arc<dyn BuildService>, document: DocumentState) -> Self {
        Self {
            service,
            document,
            store: ArtifactStore::new(),
            compiler: DEFAULT_COMPILER.to_string(),
            state: Mutex::new(ControllerState::default()),
        }
    }

    /// Use a different LaTeX engine
    #[must_use]
    pub fn with_compiler(mut self, compiler: impl Into<String>) -> Self {
        self.compiler = compiler.into();
        self
    }

    /// Register artifacts in an existing store
    #[must_use]
    pub fn with_store(mut self, store: ArtifactStore) -> Self {
        self.store = store;
        self
    }

    /// Compile the current document
    pub async fn trigger_compile(&self) -> TriggerOutcome {
        let snapshot = self.document.snapshot();
        self.trigger_compile_snapshot(snapshot).await
    }

    /// Compile a snapshot taken by the caller
    ///
    /// After the request settles the snapshot is written back if the
    /// document drifted while compiling.
    pub async fn trigger_compile_snapshot(&self, snapshot: DocumentSnapshot) -> TriggerOutcome {
        {
            let mut state = self.state.lock();
            if state.phase == CompilePhase::Compiling {
                state.stats.rejected += 1;
                tracing::debug!("compile already in flight, trigger rejected");
                return TriggerOutcome::Rejected;
            }
            // Old artifact is released before the request goes out
            state.artifact = None;
            state.last_error = None;
            state.phase = CompilePhase::Compiling;
            state.stats.requests += 1;
        }

        tracing::info!(
            revision = %snapshot.revision,
            bytes = snapshot.text.len(),
            compiler = %self.compiler,
            "compile started"
        );

        let mut guard = InFlight {
            state: &self.state,
            armed: true,
        };
        let started = Instant::now();
        let request = BuildRequest::single(self.compiler.clone(), snapshot.text.clone());
        let result = AssertUnwindSafe(self.service.build(request))
            .catch_unwind()
            .await
            .unwrap_or(Err(BuildError::Panicked));
        let elapsed = started.elapsed();
        guard.armed = false;

        let restored = self.restore_snapshot(&snapshot);

        let outcome = {
            let mut state = self.state.lock();
            state.compiled_revision = Some(self.document.revision());
            match result {
                Ok(bytes) => {
                    let artifact = self.store.create(bytes);
                    let preview = artifact.preview();
                    state.artifact = Some(artifact);
                    state.phase = CompilePhase::Succeeded;
                    state.stats.successes += 1;
                    CompileOutcome::Success(preview)
                }
                Err(err) => {
                    let message = err.display_message();
                    state.last_error = Some(message.clone());
                    state.phase = CompilePhase::Failed;
                    state.stats.failures += 1;
                    CompileOutcome::Failure(message)
                }
            }
        };

        match &outcome {
            CompileOutcome::Success(preview) => tracing::info!(
                artifact = %preview.id,
                bytes = preview.len,
                elapsed_ms = elapsed.as_millis(),
                "compile succeeded"
            ),
            CompileOutcome::Failure(message) => tracing::info!(
                error = %message,
                elapsed_ms = elapsed.as_millis(),
                "compile failed"
            ),
        }

        TriggerOutcome::Settled(CompileReport {
            outcome,
            restored,
            elapsed,
        })
    }

    fn restore_snapshot(&self, snapshot: &DocumentSnapshot) -> bool {
        let current = self.document.snapshot();
        if current.text == snapshot.text {
            return false;
        }
        if !self.document.replace(Writer::CompileRestore, snapshot.text.clone()) {
            return false;
        }
        let restored_revision = self.document.revision();
        tracing::warn!(
            discarded_revision = %current.revision,
            %restored_revision,
            discarded_bytes = current.text.len(),
            "document changed while compiling, compiled snapshot restored"
        );

        let mut state = self.state.lock();
        state.stats.restores += 1;
        state.restore_notice = Some(RestoreNotice {
            discarded: current.text,
            discarded_revision: current.revision,
            restored_revision,
        });
        true
    }

    /// Return a terminal phase to `Idle`; no-op otherwise
    pub fn acknowledge(&self) {
        let mut state = self.state.lock();
        if state.phase.is_terminal() {
            state.phase = CompilePhase::Idle;
        }
    }

    /// Release the artifact and forget the last error
    ///
    /// Ignored while compiling.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        if state.phase == CompilePhase::Compiling {
            return;
        }
        state.artifact = None;
        state.last_error = None;
        state.phase = CompilePhase::Idle;
    }

    /// Current phase
    #[inline]
    #[must_use]
    pub fn phase(&self) -> CompilePhase {
        self.state.lock().phase
    }

    /// Whether a request is in flight
    #[inline]
    #[must_use]
    pub fn is_compiling(&self) -> bool {
        self.phase() == CompilePhase::Compiling
    }

    /// Whether a live artifact exists
    #[inline]
    #[must_use]
    pub fn has_artifact(&self) -> bool {
        self.state.lock().artifact.is_some()
    }

    /// Metadata of the live artifact
    #[must_use]
    pub fn artifact(&self) -> Option<ArtifactPreview> {
        self.state
            .lock()
            .artifact
            .as_ref()
            .map(CompilationArtifact::preview)
    }

    /// Bytes of the live artifact
    #[must_use]
    pub fn artifact_bytes(&self) -> Option<Bytes> {
        self.state
            .lock()
            .artifact
            .as_ref()
            .and_then(CompilationArtifact::bytes)
    }

    /// Message of the last failed build
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.state.lock().last_error.clone()
    }

    /// Take the pending restore notice, if any
    #[must_use]
    pub fn take_restore_notice(&self) -> Option<RestoreNotice> {
        self.state.lock().restore_notice.take()
    }

    /// Whether the document moved since the last compile
    ///
    /// Before the first compile any non-empty document is stale.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        let compiled = self.state.lock().compiled_revision;
        match compiled {
            Some(revision) => revision != self.document.revision(),
            None => !self.document.is_empty(),
        }
    }

    /// Counters snapshot
    #[inline]
    #[must_use]
    pub fn stats(&self) -> CompileStats {
        self.state.lock().stats
    }

    /// Artifacts currently registered in the store
    #[inline]
    #[must_use]
    pub fn live_artifacts(&self) -> usize {
        self.store.live_count()
    }

    /// Store the artifacts are registered in
    #[inline]
    #[must_use]
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Document this controller compiles
    #[inline]
    #[must_use]
    pub fn document(&self) -> &DocumentState {
        &self.document
    }

    /// Engine name sent with every request
    #[inline]
    #[must_use]
    pub fn compiler(&self) -> &str {
        &self.compiler
    }
}

impl fmt::Debug for CompilationController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("CompilationController")
            .field("compiler", &self.compiler)
            .field("phase", &state.phase)
            .field("artifact", &state.artifact)
            .field("stats", &state.stats)
            .finish_non_exhaustive()
    }
}

/// Leaves the controller usable if a trigger future is dropped mid-request
struct InFlight<'a> {
    state: &'a Mutex<ControllerState>,
    armed: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.state.lock();
        state.phase = CompilePhase::Failed;
        state.last_error = Some("compile cancelled".to_string());
        state.stats.failures += 1;
        tracing::warn!("compile cancelled before the build settled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    /// Returns a fixed result and optionally edits the document mid-build
    struct FixedService {
        result: Result<Bytes, BuildError>,
        edit_during_build: Option<(DocumentState, &'static str)>,
    }

    #[async_trait]
    impl BuildService for FixedService {
        async fn build(&self, _request: BuildRequest) -> Result<Bytes, BuildError> {
            if let Some((doc, text)) = &self.edit_during_build {
                doc.replace(Writer::Editor, *text);
            }
            tokio::task::yield_now().await;
            self.result.clone()
        }
    }

    struct PanickingService;

    #[async_trait]
    impl BuildService for PanickingService {
        async fn build(&self, _request: BuildRequest) -> Result<Bytes, BuildError> {
            panic!("renderer crashed");
        }
    }

    fn ok_service() -> Arc<dyn BuildService> {
        Arc::new(FixedService {
            result: Ok(Bytes::from_static(b"%PDF-1.5")),
            edit_during_build: None,
        })
    }

    #[tokio::test]
    async fn success_creates_artifact() {
        let doc = DocumentState::with_text("\\documentclass{article}");
        let controller = CompilationController::new(ok_service(), doc);

        let outcome = controller.trigger_compile().await;
        assert!(outcome.requests_preview());
        assert_eq!(controller.phase(), CompilePhase::Succeeded);
        assert!(controller.has_artifact());
        assert_eq!(
            controller.artifact_bytes(),
            Some(Bytes::from_static(b"%PDF-1.5"))
        );
        assert_eq!(controller.last_error(), None);
        assert!(!controller.is_stale());
    }

    #[tokio::test]
    async fn failure_records_message() {
        let service = Arc::new(FixedService {
            result: Err(BuildError::Status {
                status: 500,
                message: "syntax error".to_string(),
            }),
            edit_during_build: None,
        });
        let controller = CompilationController::new(service, DocumentState::with_text("x"));

        let outcome = controller.trigger_compile().await;
        assert!(!outcome.requests_preview());
        assert_eq!(controller.phase(), CompilePhase::Failed);
        assert_eq!(controller.last_error().as_deref(), Some("syntax error"));
        assert!(!controller.has_artifact());
    }

    #[tokio::test]
    async fn repeated_success_keeps_one_live_artifact() {
        let controller = CompilationController::new(ok_service(), DocumentState::with_text("x"));
        for _ in 0..5 {
            controller.trigger_compile().await;
        }
        assert_eq!(controller.live_artifacts(), 1);
        assert_eq!(controller.store().stats().released, 4);
        assert_eq!(controller.stats().successes, 5);
    }

    #[tokio::test]
    async fn drift_is_restored_with_notice() {
        let doc = DocumentState::with_text("compiled");
        let service = Arc::new(FixedService {
            result: Ok(Bytes::from_static(b"pdf")),
            edit_during_build: Some((doc.clone(), "typed while compiling")),
        });
        let controller = CompilationController::new(service, doc.clone());

        let outcome = controller.trigger_compile().await;
        let TriggerOutcome::Settled(report) = outcome else {
            panic!("expected settled trigger");
        };
        assert!(report.restored);
        assert_eq!(doc.text(), "compiled");
        assert_eq!(doc.last_writer(), Some(Writer::CompileRestore));

        let notice = controller.take_restore_notice().unwrap();
        assert_eq!(notice.discarded, "typed while compiling");
        assert!(notice.restored_revision > notice.discarded_revision);
        assert!(controller.take_restore_notice().is_none());
        assert_eq!(controller.stats().restores, 1);
    }

    #[tokio::test]
    async fn panicking_service_becomes_failure() {
        let controller =
            CompilationController::new(Arc::new(PanickingService), DocumentState::with_text("x"));
        controller.trigger_compile().await;

        assert_eq!(controller.phase(), CompilePhase::Failed);
        assert_eq!(
            controller.last_error(),
            Some(BuildError::Panicked.display_message())
        );
    }

    #[tokio::test]
    async fn acknowledge_and_clear() {
        let controller = CompilationController::new(ok_service(), DocumentState::with_text("x"));
        controller.trigger_compile().await;

        controller.acknowledge();
        assert_eq!(controller.phase(), CompilePhase::Idle);
        assert!(controller.has_artifact());

        controller.clear();
        assert!(!controller.has_artifact());
        assert_eq!(controller.live_artifacts(), 0);
    }

    #[tokio::test]
    async fn edits_after_compile_mark_stale() {
        let doc = DocumentState::new();
        let controller = CompilationController::new(ok_service(), doc.clone());
        assert!(!controller.is_stale());

        doc.replace(Writer::Editor, "draft");
        assert!(controller.is_stale());

        controller.trigger_compile().await;
        assert!(!controller.is_stale());

        doc.replace(Writer::Editor, "draft 2");
        assert!(controller.is_stale());
    }

    #[tokio::test]
    async fn dropping_controller_releases_artifact() {
        let controller = CompilationController::new(ok_service(), DocumentState::with_text("x"));
        controller.trigger_compile().await;
        let store = controller.store().clone();
        assert_eq!(store.live_count(), 1);

        drop(controller);
        assert_eq!(store.live_count(), 0);
    }
}
