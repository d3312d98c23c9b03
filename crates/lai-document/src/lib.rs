//! LaTeXAI Document State
//!
//! The single canonical document text, shared by handle between the editing
//! surface, the chat acceptance action and the compilation controller.
//!
//! Every write is a full-text replacement tagged with the [`Writer`] that
//! performed it. Collaborators receive the same [`DocumentState`] explicitly
//! (it is a cheap `Clone`) rather than discovering it from ambient context.

#![warn(unreachable_pub)]

mod state;

pub use state::{DocumentSnapshot, DocumentState, Revision, Writer};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
