//! In-memory session listener for tests and diagnostics.
//!
//! # Security Note
//!
//! This adapter uses `.expect()` on lock operations, which will panic if
//! the lock is poisoned. It is meant for tests and local diagnostics.

use std::sync::RwLock;

use crate::domain::foundation::{AdapterId, SessionId};
use crate::ports::SessionListener;

/// One observed lifecycle notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleRecord {
    AdapterCreated {
        session_id: SessionId,
        adapter_id: AdapterId,
        object_type: String,
    },
    AdapterDisposed {
        session_id: SessionId,
        adapter_id: AdapterId,
    },
    SessionDisposed {
        session_id: SessionId,
    },
}

/// Records every notification it receives, in order.
///
/// # Example
///
/// ```ignore
/// let recorder = Arc::new(RecordingSessionListener::new());
/// let session = Session::new(models, factory).with_listener(recorder.clone());
///
/// // ... run batches ...
/// assert_eq!(recorder.live_adapters().len(), 0);
/// ```
#[derive(Debug, Default)]
pub struct RecordingSessionListener {
    records: RwLock<Vec<LifecycleRecord>>,
}

impl RecordingSessionListener {
    pub fn new() -> Self {
        Self::default()
    }

    // === Test Helpers ===

    /// Returns all records in arrival order.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn records(&self) -> Vec<LifecycleRecord> {
        self.records
            .read()
            .expect("RecordingSessionListener: records lock poisoned")
            .clone()
    }

    /// Ids of adapters created and not yet disposed, in creation order.
    pub fn live_adapters(&self) -> Vec<AdapterId> {
        let mut live = Vec::new();
        for record in self.records() {
            match record {
                LifecycleRecord::AdapterCreated { adapter_id, .. } => live.push(adapter_id),
                LifecycleRecord::AdapterDisposed { adapter_id, .. } => {
                    live.retain(|id| *id != adapter_id)
                }
                LifecycleRecord::SessionDisposed { .. } => {}
            }
        }
        live
    }

    /// Number of adapters created so far.
    pub fn created_count(&self) -> usize {
        self.records()
            .iter()
            .filter(|r| matches!(r, LifecycleRecord::AdapterCreated { .. }))
            .count()
    }

    /// Number of adapters disposed so far.
    pub fn disposed_count(&self) -> usize {
        self.records()
            .iter()
            .filter(|r| matches!(r, LifecycleRecord::AdapterDisposed { .. }))
            .count()
    }

    /// True once the session reported its own disposal.
    pub fn session_disposed(&self) -> bool {
        self.records()
            .iter()
            .any(|r| matches!(r, LifecycleRecord::SessionDisposed { .. }))
    }

    /// Clears all records (for test isolation).
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn clear(&self) {
        self.records
            .write()
            .expect("RecordingSessionListener: records write lock poisoned")
            .clear();
    }

    fn push(&self, record: LifecycleRecord) {
        self.records
            .write()
            .expect("RecordingSessionListener: records write lock poisoned")
            .push(record);
    }
}

impl SessionListener for RecordingSessionListener {
    fn on_adapter_created(&self, session_id: SessionId, adapter_id: AdapterId, object_type: &str) {
        self.push(LifecycleRecord::AdapterCreated {
            session_id,
            adapter_id,
            object_type: object_type.to_string(),
        });
    }

    fn on_adapter_disposed(&self, session_id: SessionId, adapter_id: AdapterId) {
        self.push(LifecycleRecord::AdapterDisposed {
            session_id,
            adapter_id,
        });
    }

    fn on_session_disposed(&self, session_id: SessionId) {
        self.push(LifecycleRecord::SessionDisposed { session_id });
    }
}
