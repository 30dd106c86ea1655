//! Adapter registry: identity maps of one session.

use std::collections::HashMap;

use crate::domain::foundation::{AdapterId, IdSequence, ModelHandle, SyncError};

use super::adapter::Adapter;

/// Live adapters of one session, indexed by id and by model.
///
/// At most one adapter exists per model. Disposed adapters are removed from
/// both maps, so every adapter reachable here is live.
#[derive(Debug, Default)]
pub struct AdapterRegistry {
    by_id: HashMap<AdapterId, Adapter>,
    by_model: HashMap<ModelHandle, AdapterId>,
    sequence: IdSequence,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn allocate_id(&mut self) -> AdapterId {
        self.sequence.next_id()
    }

    pub(crate) fn insert(&mut self, adapter: Adapter) {
        self.by_model.insert(adapter.model(), adapter.id());
        self.by_id.insert(adapter.id(), adapter);
    }

    pub(crate) fn remove(&mut self, id: AdapterId) -> Option<Adapter> {
        let adapter = self.by_id.remove(&id)?;
        if self.by_model.get(&adapter.model()) == Some(&id) {
            self.by_model.remove(&adapter.model());
        }
        Some(adapter)
    }

    /// Looks up a live adapter by id.
    pub fn get_by_id(&self, id: AdapterId) -> Result<&Adapter, SyncError> {
        self.by_id
            .get(&id)
            .filter(|adapter| !adapter.is_disposed())
            .ok_or(SyncError::AdapterNotFound(id))
    }

    pub(crate) fn get_by_id_mut(&mut self, id: AdapterId) -> Result<&mut Adapter, SyncError> {
        self.by_id
            .get_mut(&id)
            .filter(|adapter| !adapter.is_disposed())
            .ok_or(SyncError::AdapterNotFound(id))
    }

    /// Looks up the live adapter wrapping `model`.
    pub fn get_by_model(&self, model: ModelHandle) -> Result<&Adapter, SyncError> {
        self.id_for_model(model).and_then(|id| self.get_by_id(id))
    }

    pub fn id_for_model(&self, model: ModelHandle) -> Result<AdapterId, SyncError> {
        self.by_model
            .get(&model)
            .copied()
            .ok_or(SyncError::ModelNotAdapted(model))
    }

    pub fn contains(&self, id: AdapterId) -> bool {
        self.get_by_id(id).is_ok()
    }

    /// Ids of every registered adapter, ascending.
    pub fn ids(&self) -> Vec<AdapterId> {
        let mut ids: Vec<_> = self.by_id.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Most recently allocated id.
    pub fn last_id(&self) -> AdapterId {
        self.sequence.last()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
