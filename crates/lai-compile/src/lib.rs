//! LaTeXAI Compile
//!
//! Compile-and-preview lifecycle:
//! - [`CompilationController`]: one request in flight, snapshot restore
//! - [`BuildService`] / [`HttpBuildService`]: `POST /builds/sync`
//! - [`CompilationArtifact`]: unique owner of the compiled document, released on drop
//!
//! # Example
//!
//! ```rust,ignore
//! use lai_compile::{CompilationController, HttpBuildService};
//! use lai_document::DocumentState;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = HttpBuildService::builder()
//!     .base_url("http://localhost:2345")
//!     .build()?;
//! let doc = DocumentState::with_text("\\documentclass{article}\\begin{document}Hi\\end{document}");
//! let controller = CompilationController::new(Arc::new(service), doc);
//!
//! if controller.trigger_compile().await.requests_preview() {
//!     let pdf = controller.artifact_bytes();
//! }
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod artifact;
pub mod client;
pub mod controller;
pub mod error;

pub use artifact::{ArtifactId, ArtifactPreview, ArtifactStore, CompilationArtifact, StoreStats};
pub use client::{
    BuildRequest, BuildResource, BuildService, HttpBuildService, HttpBuildServiceBuilder,
    BUILD_PATH, DEFAULT_BASE_URL, DEFAULT_COMPILER,
};
pub use controller::{
    CompilationController, CompileOutcome, CompilePhase, CompileReport, CompileStats,
    RestoreNotice, TriggerOutcome,
};
pub use error::BuildError;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
