//! Per-kind adapter specifications.
//!
//! An [`AdapterSpec`] is the lookup table for one adapter kind: the observed
//! properties (name plus read function) and the named client events it
//! accepts. Names not in the table fail closed.

use serde_json::Value as JsonValue;
use std::any::type_name;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::domain::foundation::{FacadeError, ModelHandle, SyncError};
use crate::domain::model::{ChangeSet, ModelObject, ModelStore, PropertyFilter};

/// Value read from a model property.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Plain JSON value sent as-is.
    Value(JsonValue),
    /// Reference to a single child model (or none).
    Model(Option<ModelHandle>),
    /// Ordered references to child models.
    Models(Vec<ModelHandle>),
}

type PropertyReader =
    Arc<dyn Fn(&dyn ModelObject, ModelHandle) -> Result<PropertyValue, SyncError> + Send + Sync>;

type PropertyWriter = Arc<
    dyn Fn(&mut dyn ModelObject, ModelHandle, &JsonValue, &mut ChangeSet) -> Result<(), SyncError>
        + Send
        + Sync,
>;

type EventHandler =
    Arc<dyn Fn(&mut ModelStore, ModelHandle, &JsonValue) -> Result<(), SyncError> + Send + Sync>;

fn downcast<M: ModelObject>(
    object: &dyn ModelObject,
    handle: ModelHandle,
) -> Result<&M, SyncError> {
    object
        .downcast_ref::<M>()
        .ok_or(SyncError::ModelTypeMismatch {
            handle,
            expected: type_name::<M>(),
        })
}

fn typed_reader<M, T, F>(read: F, wrap: fn(T) -> PropertyValue) -> PropertyReader
where
    M: ModelObject,
    T: 'static,
    F: Fn(&M) -> T + Send + Sync + 'static,
{
    Arc::new(move |object: &dyn ModelObject, handle: ModelHandle| {
        Ok(wrap(read(downcast::<M>(object, handle)?)))
    })
}

/// One observed property of an adapter kind.
#[derive(Clone)]
pub struct PropertyDef {
    name: String,
    reader: PropertyReader,
    writer: Option<PropertyWriter>,
}

impl PropertyDef {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_writable(&self) -> bool {
        self.writer.is_some()
    }

    /// Reads the property's current value from the model.
    pub fn read(
        &self,
        object: &dyn ModelObject,
        handle: ModelHandle,
    ) -> Result<PropertyValue, SyncError> {
        (self.reader)(object, handle)
    }

    /// Applies a client-originated value to the model.
    pub fn write(
        &self,
        object: &mut dyn ModelObject,
        handle: ModelHandle,
        value: &JsonValue,
        changes: &mut ChangeSet,
    ) -> Result<(), SyncError> {
        match &self.writer {
            Some(writer) => writer(object, handle, value, changes),
            None => Err(SyncError::UnknownProperty {
                object_type: String::new(),
                property: self.name.clone(),
            }),
        }
    }
}

impl fmt::Debug for PropertyDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDef")
            .field("name", &self.name)
            .field("writable", &self.is_writable())
            .finish()
    }
}

/// Lookup table describing one adapter kind.
///
/// # Example
///
/// ```ignore
/// let spec = AdapterSpec::new("Button")
///     .property::<Button, _>("label", |b| json!(b.label))
///     .event::<Button, _>("click", |b, _payload, changes| {
///         b.clicks += 1;
///         changes.mark("clicks");
///         Ok(())
///     });
/// ```
#[derive(Clone)]
pub struct AdapterSpec {
    object_type: String,
    properties: Vec<PropertyDef>,
    property_index: HashMap<String, usize>,
    events: HashMap<String, EventHandler>,
}

impl AdapterSpec {
    pub fn new(object_type: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            properties: Vec::new(),
            property_index: HashMap::new(),
            events: HashMap::new(),
        }
    }

    // === Properties ===

    /// Declares a plain-valued property.
    pub fn property<M, F>(self, name: impl Into<String>, read: F) -> Self
    where
        M: ModelObject,
        F: Fn(&M) -> JsonValue + Send + Sync + 'static,
    {
        self.with_reader(name.into(), typed_reader(read, PropertyValue::Value), None)
    }

    /// Declares a property the client may write through the `property` event.
    ///
    /// The write function applies the value; the property is then marked
    /// changed so normalised values flow back to the client.
    pub fn writable<M, R, W>(self, name: impl Into<String>, read: R, write: W) -> Self
    where
        M: ModelObject,
        R: Fn(&M) -> JsonValue + Send + Sync + 'static,
        W: Fn(&mut M, &JsonValue) -> Result<(), FacadeError> + Send + Sync + 'static,
    {
        let name = name.into();
        let marked = name.clone();
        let writer: PropertyWriter = Arc::new(
            move |object: &mut dyn ModelObject,
                  handle: ModelHandle,
                  value: &JsonValue,
                  changes: &mut ChangeSet| {
                let model = object
                    .downcast_mut::<M>()
                    .ok_or(SyncError::ModelTypeMismatch {
                        handle,
                        expected: type_name::<M>(),
                    })?;
                write(model, value)?;
                changes.mark(marked.clone());
                Ok(())
            },
        );
        self.with_reader(name, typed_reader(read, PropertyValue::Value), Some(writer))
    }

    /// Declares a property referencing a single child model.
    pub fn reference<M, F>(self, name: impl Into<String>, read: F) -> Self
    where
        M: ModelObject,
        F: Fn(&M) -> Option<ModelHandle> + Send + Sync + 'static,
    {
        self.with_reader(name.into(), typed_reader(read, PropertyValue::Model), None)
    }

    /// Declares a property referencing an ordered list of child models.
    pub fn references<M, F>(self, name: impl Into<String>, read: F) -> Self
    where
        M: ModelObject,
        F: Fn(&M) -> Vec<ModelHandle> + Send + Sync + 'static,
    {
        self.with_reader(name.into(), typed_reader(read, PropertyValue::Models), None)
    }

    /// Declares a structural relation read through `ModelObject::child_models`.
    pub fn relation(self, name: impl Into<String>) -> Self {
        let name = name.into();
        let relation = name.clone();
        let reader: PropertyReader = Arc::new(move |object: &dyn ModelObject, _: ModelHandle| {
            Ok(PropertyValue::Models(object.child_models(&relation)))
        });
        self.with_reader(name, reader, None)
    }

    fn with_reader(
        mut self,
        name: String,
        reader: PropertyReader,
        writer: Option<PropertyWriter>,
    ) -> Self {
        let def = PropertyDef {
            name: name.clone(),
            reader,
            writer,
        };
        match self.property_index.get(&name) {
            Some(&index) => self.properties[index] = def,
            None => {
                self.property_index.insert(name, self.properties.len());
                self.properties.push(def);
            }
        }
        self
    }

    // === Events ===

    /// Declares a client event handled by mutating the model directly.
    pub fn event<M, F>(mut self, name: impl Into<String>, handle_event: F) -> Self
    where
        M: ModelObject,
        F: Fn(&mut M, &JsonValue, &mut ChangeSet) -> Result<(), FacadeError>
            + Send
            + Sync
            + 'static,
    {
        let handler: EventHandler = Arc::new(
            move |store: &mut ModelStore, handle: ModelHandle, payload: &JsonValue| {
                store.update::<M, _, _>(handle, |model, changes| {
                    handle_event(model, payload, changes)
                })??;
                Ok(())
            },
        );
        self.events.insert(name.into(), handler);
        self
    }

    /// Declares a client event handled by a facade with access to the whole
    /// store, e.g. to insert new child models.
    pub fn facade<F>(mut self, name: impl Into<String>, handle_event: F) -> Self
    where
        F: Fn(&mut ModelStore, ModelHandle, &JsonValue) -> Result<(), FacadeError>
            + Send
            + Sync
            + 'static,
    {
        let handler: EventHandler = Arc::new(
            move |store: &mut ModelStore, handle: ModelHandle, payload: &JsonValue| {
                Ok(handle_event(store, handle, payload)?)
            },
        );
        self.events.insert(name.into(), handler);
        self
    }

    // === Lookup ===

    pub fn object_type(&self) -> &str {
        &self.object_type
    }

    pub fn properties(&self) -> &[PropertyDef] {
        &self.properties
    }

    pub fn property_index(&self, name: &str) -> Option<usize> {
        self.property_index.get(name).copied()
    }

    /// Looks up a property the client may write.
    pub fn writable_property(&self, name: &str) -> Result<&PropertyDef, SyncError> {
        self.property_index(name)
            .map(|index| &self.properties[index])
            .filter(|def| def.is_writable())
            .ok_or_else(|| SyncError::UnknownProperty {
                object_type: self.object_type.clone(),
                property: name.to_string(),
            })
    }

    pub fn has_event(&self, name: &str) -> bool {
        self.events.contains_key(name)
    }

    /// Filter matching exactly the observed property names.
    pub fn property_filter(&self) -> PropertyFilter {
        PropertyFilter::named(self.properties.iter().map(|def| def.name.clone()))
    }

    /// Runs the named event's handler, failing closed on unknown names.
    pub fn handle_event(
        &self,
        store: &mut ModelStore,
        handle: ModelHandle,
        name: &str,
        payload: &JsonValue,
    ) -> Result<(), SyncError> {
        let handler = self.events.get(name).ok_or_else(|| SyncError::UnknownEvent {
            object_type: self.object_type.clone(),
            event: name.to_string(),
        })?;
        handler(store, handle, payload)
    }
}

impl fmt::Debug for AdapterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut events: Vec<_> = self.events.keys().collect();
        events.sort();
        f.debug_struct("AdapterSpec")
            .field("object_type", &self.object_type)
            .field("properties", &self.properties)
            .field("events", &events)
            .finish()
    }
}
