//! Controller lifecycle against a scripted build service

use lai_compile::{BuildError, CompilationController, CompilePhase, TriggerOutcome};
use lai_document::{DocumentState, Writer};
use lai_test_utils::{minimal_document, ScriptedBuildService, MINIMAL_DOCUMENT};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::sync::Arc;

async fn wait_until_in_flight(service: &ScriptedBuildService) {
    while service.waiting() == 0 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn second_trigger_while_compiling_is_rejected() {
    let service = Arc::new(ScriptedBuildService::gated());
    let controller = CompilationController::new(service.clone(), minimal_document());

    let (first, second) = tokio::join!(controller.trigger_compile(), async {
        wait_until_in_flight(&service).await;
        assert!(controller.is_compiling());
        let second = controller.trigger_compile().await;
        service.release(1);
        second
    });

    assert!(first.requests_preview());
    assert_eq!(second, TriggerOutcome::Rejected);
    assert_eq!(service.request_count(), 1);
    assert_eq!(controller.stats().rejected, 1);
    assert_eq!(controller.stats().requests, 1);
}

#[tokio::test]
async fn old_artifact_released_before_request() {
    let service = Arc::new(ScriptedBuildService::gated());
    let controller = CompilationController::new(service.clone(), minimal_document());

    service.release(1);
    controller.trigger_compile().await;
    assert_eq!(controller.live_artifacts(), 1);

    tokio::join!(controller.trigger_compile(), async {
        wait_until_in_flight(&service).await;
        assert!(!controller.has_artifact());
        assert_eq!(controller.live_artifacts(), 0);
        service.release(1);
    });

    assert_eq!(controller.live_artifacts(), 1);
    assert_eq!(controller.phase(), CompilePhase::Succeeded);
}

#[tokio::test]
async fn request_carries_document_snapshot() {
    let service = Arc::new(ScriptedBuildService::new());
    let controller = CompilationController::new(service.clone(), minimal_document())
        .with_compiler("xelatex");

    controller.trigger_compile().await;

    let requests = service.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].compiler, "xelatex");
    assert_eq!(requests[0].main_content(), Some(MINIMAL_DOCUMENT));
}

#[tokio::test]
async fn edits_during_compile_are_overwritten_by_snapshot() {
    let doc = minimal_document();
    let service = Arc::new(ScriptedBuildService::new().editing(doc.clone(), "edited mid-compile"));
    let controller = CompilationController::new(service, doc.clone());

    let TriggerOutcome::Settled(report) = controller.trigger_compile().await else {
        panic!("trigger should settle");
    };

    assert!(report.restored);
    assert_eq!(doc.text(), MINIMAL_DOCUMENT);
    assert_eq!(doc.last_writer(), Some(Writer::CompileRestore));
    let notice = controller.take_restore_notice().expect("restore notice");
    assert_eq!(notice.discarded, "edited mid-compile");
    assert!(!controller.is_stale());
}

#[tokio::test]
async fn restore_also_happens_on_failure() {
    let doc = minimal_document();
    let service = ScriptedBuildService::failing(500, "Undefined control sequence")
        .editing(doc.clone(), "edited mid-compile");
    let controller = CompilationController::new(Arc::new(service), doc.clone());

    let TriggerOutcome::Settled(report) = controller.trigger_compile().await else {
        panic!("trigger should settle");
    };

    assert!(report.restored);
    assert_eq!(doc.text(), MINIMAL_DOCUMENT);
    assert_eq!(
        controller.last_error().as_deref(),
        Some("Undefined control sequence")
    );
}

#[tokio::test]
async fn failure_then_success_clears_error() {
    let service = Arc::new(ScriptedBuildService::new());
    service.push_error(BuildError::Transport("connection refused".to_string()));
    let controller = CompilationController::new(service.clone(), minimal_document());

    controller.trigger_compile().await;
    assert_eq!(controller.phase(), CompilePhase::Failed);
    assert!(controller.last_error().is_some());

    controller.trigger_compile().await;
    assert_eq!(controller.phase(), CompilePhase::Succeeded);
    assert_eq!(controller.last_error(), None);
    assert_eq!(controller.stats().failures, 1);
    assert_eq!(controller.stats().successes, 1);
}

#[tokio::test]
async fn cancelled_trigger_does_not_wedge_controller() {
    let service = Arc::new(ScriptedBuildService::gated());
    let controller = CompilationController::new(service.clone(), DocumentState::with_text("x"));

    {
        let pending = controller.trigger_compile();
        tokio::pin!(pending);
        let polled = futures::poll!(pending.as_mut());
        assert!(polled.is_pending());
        assert!(controller.is_compiling());
    }

    assert_eq!(controller.phase(), CompilePhase::Failed);
    service.release(1);
    assert!(controller.trigger_compile().await.requests_preview());
}

proptest! {
    #[test]
    fn sequential_successes_leave_one_live_artifact(n in 1usize..12) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let controller = CompilationController::new(
                Arc::new(ScriptedBuildService::new()),
                minimal_document(),
            );
            for _ in 0..n {
                controller.trigger_compile().await;
            }
            prop_assert_eq!(controller.live_artifacts(), 1);
            prop_assert_eq!(controller.store().stats().created, n as u64);
            Ok(())
        })?;
    }
}
