//! Shared document slot

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Monotonic document revision, bumped on every effective write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Revision(pub u64);

impl Revision {
    /// Revision of a freshly created document
    pub const INITIAL: Self = Self(0);

    #[inline]
    fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Who replaced the document text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Writer {
    /// The editing surface, on every content change
    Editor,
    /// The chat acceptance action
    Acceptance,
    /// The compilation controller re-asserting its snapshot
    CompileRestore,
}

/// Point-in-time copy of the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSnapshot {
    /// Full text
    pub text: String,
    /// Revision the text was read at
    pub revision: Revision,
}

#[derive(Debug)]
struct Slot {
    text: String,
    revision: Revision,
    last_writer: Option<Writer>,
}

#[derive(Debug)]
struct Inner {
    slot: RwLock<Slot>,
    changes: watch::Sender<Revision>,
}

/// Handle to the canonical document text
///
/// Clones share the same slot. Locks are held only for the duration of a
/// single read or replace, never across an await point.
#[derive(Debug, Clone)]
pub struct DocumentState {
    inner: Arc<Inner>,
}

impl DocumentState {
    /// Create an empty document
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_text(String::new())
    }

    /// Create a document with initial text
    #[must_use]
    pub fn with_text(text: impl Into<String>) -> Self {
        let (changes, _) = watch::channel(Revision::INITIAL);
        Self {
            inner: Arc::new(Inner {
                slot: RwLock::new(Slot {
                    text: text.into(),
                    revision: Revision::INITIAL,
                    last_writer: None,
                }),
                changes,
            }),
        }
    }

    /// Current text
    #[must_use]
    pub fn text(&self) -> String {
        self.inner.slot.read().text.clone()
    }

    /// Current text together with its revision
    #[must_use]
    pub fn snapshot(&self) -> DocumentSnapshot {
        let slot = self.inner.slot.read();
        DocumentSnapshot {
            text: slot.text.clone(),
            revision: slot.revision,
        }
    }

    /// Current revision
    #[inline]
    #[must_use]
    pub fn revision(&self) -> Revision {
        self.inner.slot.read().revision
    }

    /// Writer of the latest effective replacement
    #[inline]
    #[must_use]
    pub fn last_writer(&self) -> Option<Writer> {
        self.inner.slot.read().last_writer
    }

    /// Length of the text in bytes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.slot.read().text.len()
    }

    /// Whether the document is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.slot.read().text.is_empty()
    }

    /// Replace the whole text
    ///
    /// Returns `false` (and keeps the revision) when `text` equals the
    /// current content.
    pub fn replace(&self, writer: Writer, text: impl Into<String>) -> bool {
        let text = text.into();
        let revision = {
            let mut slot = self.inner.slot.write();
            if slot.text == text {
                return false;
            }
            slot.text = text;
            slot.revision = slot.revision.next();
            slot.last_writer = Some(writer);
            slot.revision
        };

        tracing::trace!(?writer, %revision, "document replaced");
        self.inner.changes.send_replace(revision);
        true
    }

    /// Receiver notified with the new revision after every effective write
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Revision> {
        self.inner.changes.subscribe()
    }

    /// Whether two handles refer to the same slot
    #[inline]
    #[must_use]
    pub fn same_document(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for DocumentState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn starts_empty_at_initial_revision() {
        let doc = DocumentState::new();
        assert!(doc.is_empty());
        assert_eq!(doc.revision(), Revision::INITIAL);
        assert_eq!(doc.last_writer(), None);
    }

    #[test]
    fn replace_bumps_revision_and_records_writer() {
        let doc = DocumentState::new();
        assert!(doc.replace(Writer::Editor, "\\documentclass{article}"));
        assert_eq!(doc.revision(), Revision(1));
        assert_eq!(doc.last_writer(), Some(Writer::Editor));

        assert!(doc.replace(Writer::Acceptance, "\\documentclass{report}"));
        assert_eq!(doc.revision(), Revision(2));
        assert_eq!(doc.last_writer(), Some(Writer::Acceptance));
        assert_eq!(doc.text(), "\\documentclass{report}");
    }

    #[test]
    fn identical_replace_is_noop() {
        let doc = DocumentState::with_text("same");
        assert!(!doc.replace(Writer::Editor, "same"));
        assert_eq!(doc.revision(), Revision::INITIAL);
        assert_eq!(doc.last_writer(), None);
    }

    #[test]
    fn clones_share_the_slot() {
        let doc = DocumentState::new();
        let editor_side = doc.clone();
        editor_side.replace(Writer::Editor, "typed");

        assert_eq!(doc.text(), "typed");
        assert!(doc.same_document(&editor_side));
        assert!(!doc.same_document(&DocumentState::new()));
    }

    #[test]
    fn snapshot_is_detached_from_later_writes() {
        let doc = DocumentState::with_text("v1");
        let snap = doc.snapshot();
        doc.replace(Writer::Editor, "v2");

        assert_eq!(snap.text, "v1");
        assert_eq!(snap.revision, Revision::INITIAL);
        assert_eq!(doc.snapshot().revision, Revision(1));
    }

    #[tokio::test]
    async fn subscribers_observe_revisions() {
        let doc = DocumentState::new();
        let mut rx = doc.subscribe();

        doc.replace(Writer::Acceptance, "from chat");
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), Revision(1));
    }
}
