//! Arena-backed transient resource handles
//!
//! In-memory binary blobs (encoded rasters, SVG documents) are exposed to
//! callers as short-lived handles with a `mem://` locator string. The creator
//! is responsible for explicit release; the arena is not garbage-collected,
//! so unreleased handles accumulate across a batch. `outstanding()` makes
//! leak-freedom independently testable.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Handle to a blob stored in a [`BlobArena`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobHandle {
    id: u64,
    locator: String,
}

impl BlobHandle {
    /// Short-lived locator string for display purposes
    #[must_use]
    pub fn locator(&self) -> &str {
        &self.locator
    }
}

impl std::fmt::Display for BlobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.locator)
    }
}

#[derive(Debug, Default)]
struct ArenaInner {
    next_id: u64,
    blobs: HashMap<u64, Arc<Vec<u8>>>,
}

/// Shared table of in-memory blobs with explicit create/release lifetime
#[derive(Debug, Default)]
pub struct BlobArena {
    inner: Mutex<ArenaInner>,
}

impl BlobArena {
    /// Create an empty arena
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a blob and return its handle
    pub fn create(&self, bytes: Vec<u8>) -> BlobHandle {
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let id = inner.next_id;
        inner.next_id += 1;
        inner.blobs.insert(id, Arc::new(bytes));
        BlobHandle {
            id,
            locator: format!("mem://blob/{id}"),
        }
    }

    /// Fetch the blob behind a handle, if it has not been released
    #[must_use]
    pub fn get(&self, handle: &BlobHandle) -> Option<Arc<Vec<u8>>> {
        let inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.blobs.get(&handle.id).cloned()
    }

    /// Release the blob behind a handle
    ///
    /// Returns `false` when the handle was already released; double release
    /// is tolerated so teardown paths stay simple.
    pub fn release(&self, handle: &BlobHandle) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let released = inner.blobs.remove(&handle.id).is_some();
        if !released {
            log::debug!("release of already-released handle {}", handle.locator);
        }
        released
    }

    /// Number of handles that have been created but not released
    #[must_use]
    pub fn outstanding(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.blobs.len()
    }
}
