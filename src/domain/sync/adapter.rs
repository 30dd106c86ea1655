//! Adapter: the session-side counterpart of one model object.

use serde_json::Value as JsonValue;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::domain::foundation::{AdapterId, ModelHandle};
use crate::domain::model::Subscription;

use super::spec::AdapterSpec;

/// Something that requires an adapter to stay alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Owner {
    /// The session itself; owns the root adapter.
    Session,
    /// A parent adapter referencing this one through a property.
    Adapter(AdapterId),
}

impl Owner {
    /// Id reported as `parentId` on the wire.
    pub fn parent_id(&self) -> AdapterId {
        match self {
            Owner::Session => AdapterId::SESSION,
            Owner::Adapter(id) => *id,
        }
    }
}

/// Last state the client has seen for one property.
#[derive(Debug, Clone, Default)]
pub(crate) struct PropertyObserver {
    pub(crate) last_sent: Option<JsonValue>,
    /// Child adapters this property currently references.
    pub(crate) references: Vec<AdapterId>,
}

/// Wraps exactly one model object for one session.
#[derive(Debug)]
pub struct Adapter {
    id: AdapterId,
    model: ModelHandle,
    spec: Arc<AdapterSpec>,
    parent: Owner,
    owners: BTreeSet<Owner>,
    observers: Vec<PropertyObserver>,
    subscription: Option<Subscription>,
    disposed: bool,
}

impl Adapter {
    pub(crate) fn new(
        id: AdapterId,
        model: ModelHandle,
        spec: Arc<AdapterSpec>,
        parent: Owner,
        subscription: Subscription,
    ) -> Self {
        let observers = vec![PropertyObserver::default(); spec.properties().len()];
        Self {
            id,
            model,
            spec,
            parent,
            owners: BTreeSet::from([parent]),
            observers,
            subscription: Some(subscription),
            disposed: false,
        }
    }

    pub fn id(&self) -> AdapterId {
        self.id
    }

    pub fn object_type(&self) -> &str {
        self.spec.object_type()
    }

    pub fn model(&self) -> ModelHandle {
        self.model
    }

    pub fn spec(&self) -> &Arc<AdapterSpec> {
        &self.spec
    }

    /// Owner reported as `parentId`.
    ///
    /// Starts as the creating owner and moves to a remaining owner when that
    /// one releases the adapter.
    pub fn parent(&self) -> Owner {
        self.parent
    }

    pub fn owners(&self) -> &BTreeSet<Owner> {
        &self.owners
    }

    pub fn is_owned_by(&self, owner: Owner) -> bool {
        self.owners.contains(&owner)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Returns true while the model listener is registered.
    pub fn is_attached(&self) -> bool {
        self.subscription.is_some()
    }

    /// Value of `property` as last sent to the client.
    pub fn last_sent(&self, property: &str) -> Option<&JsonValue> {
        self.spec
            .property_index(property)
            .and_then(|index| self.observers[index].last_sent.as_ref())
    }

    /// Every child adapter referenced by any property.
    pub fn owned_children(&self) -> BTreeSet<AdapterId> {
        self.observers
            .iter()
            .flat_map(|observer| observer.references.iter().copied())
            .collect()
    }

    // === Lifecycle (registry only) ===

    pub(crate) fn add_owner(&mut self, owner: Owner) -> bool {
        self.owners.insert(owner)
    }

    /// Removes an owner; returns true if it was present.
    pub(crate) fn remove_owner(&mut self, owner: Owner) -> bool {
        let removed = self.owners.remove(&owner);
        if removed && owner == self.parent {
            if let Some(&next) = self.owners.first() {
                self.parent = next;
            }
        }
        removed
    }

    pub(crate) fn observer_mut(&mut self, index: usize) -> &mut PropertyObserver {
        &mut self.observers[index]
    }

    pub(crate) fn observer(&self, index: usize) -> &PropertyObserver {
        &self.observers[index]
    }

    /// Records the client's own value so the model's echo is suppressed.
    pub(crate) fn assume_sent(&mut self, property: &str, value: JsonValue) {
        if let Some(index) = self.spec.property_index(property) {
            self.observers[index].last_sent = Some(value);
        }
    }

    /// Marks the adapter disposed and drops its model listener.
    ///
    /// Returns the children it owned so the caller can release them.
    pub(crate) fn detach(&mut self) -> BTreeSet<AdapterId> {
        self.disposed = true;
        self.subscription = None;
        self.owners.clear();
        let children = self.owned_children();
        for observer in &mut self.observers {
            observer.references.clear();
        }
        children
    }
}
