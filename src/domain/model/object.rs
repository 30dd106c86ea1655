//! The model object contract consumed from domain code.

use serde_json::Value as JsonValue;
use std::any::Any;

use crate::domain::foundation::ModelHandle;

/// Upcast helper so `dyn ModelObject` can be downcast to its concrete type.
///
/// Implemented for every `'static` type; never implement it by hand.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A mutable domain/UI object mirrored to the client.
///
/// Model objects are owned by domain code (inside a `ModelStore`); the
/// adapter layer only ever holds their handles.
pub trait ModelObject: AsAny + Send + 'static {
    /// Kind used to pick the adapter spec (e.g. "Table", "StringField").
    fn model_kind(&self) -> &'static str;

    /// Child model references for a named structural relation.
    fn child_models(&self, _relation: &str) -> Vec<ModelHandle> {
        Vec::new()
    }
}

impl dyn ModelObject {
    /// Downcasts to the concrete model type.
    pub fn downcast_ref<M: ModelObject>(&self) -> Option<&M> {
        self.as_any().downcast_ref::<M>()
    }

    /// Downcasts to the concrete model type, mutably.
    pub fn downcast_mut<M: ModelObject>(&mut self) -> Option<&mut M> {
        self.as_any_mut().downcast_mut::<M>()
    }
}

/// Records what a model mutation changed.
///
/// Passed to mutation closures; after the closure returns (the values are
/// already mutated) the store fires one notification per marked property,
/// then the collected model events.
#[derive(Debug, Default)]
pub struct ChangeSet {
    properties: Vec<String>,
    events: Vec<(String, JsonValue)>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a property as changed. Repeated marks collapse.
    pub fn mark(&mut self, property: impl Into<String>) {
        let property = property.into();
        if !self.properties.contains(&property) {
            self.properties.push(property);
        }
    }

    /// Queues a model event (e.g. "requestFocus") for the client.
    pub fn emit(&mut self, name: impl Into<String>, payload: JsonValue) {
        self.events.push((name.into(), payload));
    }

    pub fn properties(&self) -> &[String] {
        &self.properties
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty() && self.events.is_empty()
    }

    pub(crate) fn into_parts(self) -> (Vec<String>, Vec<(String, JsonValue)>) {
        (self.properties, self.events)
    }
}
