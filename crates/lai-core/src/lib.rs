//! LaTeXAI Core
//!
//! Session layer tying the document, the assistant conversation and the
//! compile pipeline together:
//! - [`Workspace`]: one co-authoring session
//! - [`TabState`]: editor/preview tab machine
//! - [`PreviewPane`], [`EditorPane`], [`CompileButton`]: render-ready pane state
//! - [`AppConfig`] and [`logging::init`]: configuration and tracing setup
//!
//! # Example
//!
//! ```rust,ignore
//! use lai_core::{AppConfig, ViewTab, Workspace};
//! use lai_document::DocumentState;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::new().apply_env();
//! let workspace = Workspace::from_config(&config, DocumentState::new())?;
//!
//! workspace.edit("\\documentclass{article}\\begin{document}Hi\\end{document}");
//! workspace.compile().await;
//! assert_eq!(workspace.tab(), ViewTab::Preview);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod logging;
pub mod view;
pub mod workspace;

pub use config::{AppConfig, BuildConfig, ChatConfig, LogFormat, LoggingConfig};
pub use error::{ConfigError, TabError, WorkspaceError};
pub use view::{
    Affordance, CompileButton, EditorPane, PreviewAvailability, PreviewPane, TabState, ViewTab,
};
pub use workspace::Workspace;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude for common imports
pub mod prelude {
    pub use crate::config::AppConfig;
    pub use crate::view::{PreviewPane, ViewTab};
    pub use crate::workspace::Workspace;
    pub use lai_chat::{ChatSession, MessageId};
    pub use lai_compile::{CompilationController, TriggerOutcome};
    pub use lai_document::{DocumentState, Writer};
}
