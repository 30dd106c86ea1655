//! Arena of model objects plus their listener table.

use serde_json::Value as JsonValue;
use std::any::type_name;
use std::collections::HashMap;
use std::fmt;

use crate::domain::foundation::{ModelHandle, SyncError};

use super::listeners::{self, lock_table, SharedListenerTable};
use super::{ChangeSet, ModelListener, ModelNotification, ModelObject, PropertyFilter, Subscription};

/// Owns the model objects of one session.
///
/// Objects are addressed by [`ModelHandle`]; mutations go through
/// [`ModelStore::update`] so every change is announced to listeners after
/// the new value is in place.
pub struct ModelStore {
    objects: HashMap<ModelHandle, Box<dyn ModelObject>>,
    last_handle: u64,
    listeners: SharedListenerTable,
}

impl ModelStore {
    pub fn new() -> Self {
        Self {
            objects: HashMap::new(),
            last_handle: 0,
            listeners: SharedListenerTable::default(),
        }
    }

    /// Adds a model object and returns its handle.
    pub fn insert<M: ModelObject>(&mut self, model: M) -> ModelHandle {
        self.last_handle += 1;
        let handle = ModelHandle::from_raw(self.last_handle);
        self.objects.insert(handle, Box::new(model));
        handle
    }

    /// Removes a model object. Listeners registered for it stay until their
    /// subscriptions are dropped, but will never fire again.
    pub fn remove(&mut self, handle: ModelHandle) -> Option<Box<dyn ModelObject>> {
        self.objects.remove(&handle)
    }

    pub fn contains(&self, handle: ModelHandle) -> bool {
        self.objects.contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Returns the model object as a trait object.
    pub fn get(&self, handle: ModelHandle) -> Result<&dyn ModelObject, SyncError> {
        self.objects
            .get(&handle)
            .map(|object| object.as_ref())
            .ok_or(SyncError::ModelNotFound(handle))
    }

    /// Returns the model object as its concrete type.
    pub fn get_as<M: ModelObject>(&self, handle: ModelHandle) -> Result<&M, SyncError> {
        self.get(handle)?
            .downcast_ref::<M>()
            .ok_or(SyncError::ModelTypeMismatch {
                handle,
                expected: type_name::<M>(),
            })
    }

    /// Mutates a model object, then fires the notifications recorded in the
    /// change set.
    pub fn update<M, R, F>(&mut self, handle: ModelHandle, mutate: F) -> Result<R, SyncError>
    where
        M: ModelObject,
        F: FnOnce(&mut M, &mut ChangeSet) -> R,
    {
        self.update_dyn(handle, |object, changes| {
            object
                .downcast_mut::<M>()
                .map(|model| mutate(model, changes))
                .ok_or(SyncError::ModelTypeMismatch {
                    handle,
                    expected: type_name::<M>(),
                })
        })?
    }

    /// Mutates a model object through the trait object.
    pub fn update_dyn<R, F>(&mut self, handle: ModelHandle, mutate: F) -> Result<R, SyncError>
    where
        F: FnOnce(&mut dyn ModelObject, &mut ChangeSet) -> R,
    {
        let mut changes = ChangeSet::new();
        let result = {
            let object = self
                .objects
                .get_mut(&handle)
                .ok_or(SyncError::ModelNotFound(handle))?;
            mutate(object.as_mut(), &mut changes)
        };
        self.publish(handle, changes);
        Ok(result)
    }

    /// Fires the notifications of an already-applied change set.
    pub fn publish(&self, handle: ModelHandle, changes: ChangeSet) {
        let (properties, events) = changes.into_parts();
        for property in properties {
            self.fire_property_change(handle, &property);
        }
        for (name, payload) in events {
            self.fire_event(handle, &name, payload);
        }
    }

    /// Notifies listeners that a property of `handle` changed.
    pub fn fire_property_change(&self, handle: ModelHandle, property: &str) {
        self.notify(ModelNotification::PropertyChanged {
            source: handle,
            property: property.to_string(),
        });
    }

    /// Notifies listeners of a model-originated event.
    pub fn fire_event(&self, handle: ModelHandle, name: &str, payload: JsonValue) {
        self.notify(ModelNotification::Event {
            source: handle,
            name: name.to_string(),
            payload,
        });
    }

    /// Registers a listener for one model object.
    pub fn add_listener(
        &self,
        handle: ModelHandle,
        filter: PropertyFilter,
        listener: ModelListener,
    ) -> Subscription {
        listeners::register(&self.listeners, handle, filter, listener)
    }

    /// Number of listeners currently registered for `handle`.
    pub fn listener_count(&self, handle: ModelHandle) -> usize {
        lock_table(&self.listeners).count(handle)
    }

    fn notify(&self, notification: ModelNotification) {
        if !self.contains(notification.source()) {
            return;
        }
        // Clone out first: listeners may register or drop subscriptions.
        let matching = lock_table(&self.listeners).matching(&notification);
        for listener in matching {
            listener(&notification);
        }
    }
}

impl Default for ModelStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ModelStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelStore")
            .field("objects", &self.objects.len())
            .field("last_handle", &self.last_handle)
            .finish()
    }
}
