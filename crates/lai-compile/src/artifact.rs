//! Compiled artifact ownership
//!
//! The [`ArtifactStore`] plays the role of an object-URL registry: it maps an
//! opaque [`ArtifactId`] to the compiled bytes. A [`CompilationArtifact`] is
//! the unique owner of one registration and revokes it when dropped, so every
//! exit path (replacement, clear, teardown) releases the resource.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use ulid::Ulid;

/// Opaque artifact handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ArtifactId(pub Ulid);

impl ArtifactId {
    /// Generate new artifact ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ArtifactId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "artifact:{}", self.0)
    }
}

/// Store counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    /// Artifacts ever registered
    pub created: u64,
    /// Artifacts released
    pub released: u64,
    /// Currently resolvable artifacts
    pub live: usize,
}

#[derive(Debug, Default)]
struct StoreInner {
    live: HashMap<ArtifactId, Bytes>,
    created: u64,
    released: u64,
}

/// Registry of live artifact bytes
#[derive(Debug, Clone, Default)]
pub struct ArtifactStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl ArtifactStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `bytes` and return its owning artifact
    #[must_use]
    pub fn create(&self, bytes: Bytes) -> CompilationArtifact {
        let id = ArtifactId::new();
        let len = bytes.len();
        {
            let mut inner = self.inner.lock();
            inner.live.insert(id, bytes);
            inner.created += 1;
        }
        tracing::debug!(%id, bytes = len, "artifact created");

        CompilationArtifact {
            id,
            len,
            created_at: Utc::now(),
            store: self.clone(),
        }
    }

    /// Bytes for a live artifact, `None` once released
    #[must_use]
    pub fn resolve(&self, id: ArtifactId) -> Option<Bytes> {
        self.inner.lock().live.get(&id).cloned()
    }

    /// Number of live artifacts
    #[inline]
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.inner.lock().live.len()
    }

    /// Counters snapshot
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        let inner = self.inner.lock();
        StoreStats {
            created: inner.created,
            released: inner.released,
            live: inner.live.len(),
        }
    }

    fn release(&self, id: ArtifactId) {
        let mut inner = self.inner.lock();
        if inner.live.remove(&id).is_some() {
            inner.released += 1;
        }
    }
}

/// Metadata of the current artifact, handed to the preview renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPreview {
    /// Handle to resolve through the store
    pub id: ArtifactId,
    /// Size in bytes
    pub len: usize,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Unique owner of one compiled artifact
///
/// Not `Clone`. Dropping it revokes the registration.
pub struct CompilationArtifact {
    id: ArtifactId,
    len: usize,
    created_at: DateTime<Utc>,
    store: ArtifactStore,
}

impl CompilationArtifact {
    /// Handle
    #[inline]
    #[must_use]
    pub fn id(&self) -> ArtifactId {
        self.id
    }

    /// Size in bytes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the build produced an empty body
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Creation time
    #[inline]
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Compiled bytes
    #[must_use]
    pub fn bytes(&self) -> Option<Bytes> {
        self.store.resolve(self.id)
    }

    /// Renderer-facing metadata
    #[inline]
    #[must_use]
    pub fn preview(&self) -> ArtifactPreview {
        ArtifactPreview {
            id: self.id,
            len: self.len,
            created_at: self.created_at,
        }
    }

    /// Release now; equivalent to dropping
    #[inline]
    pub fn release(self) {}
}

impl fmt::Debug for CompilationArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompilationArtifact")
            .field("id", &self.id)
            .field("len", &self.len)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

impl Drop for CompilationArtifact {
    fn drop(&mut self) {
        self.store.release(self.id);
        tracing::debug!(id = %self.id, "artifact released");
    }
}
