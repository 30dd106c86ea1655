//! Event dispatcher: routes one client event to its adapter's handler.

use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::domain::foundation::{AdapterId, ModelHandle, SyncError};
use crate::domain::model::ModelStore;

use super::messages::ClientEvent;
use super::registry::AdapterRegistry;
use super::spec::AdapterSpec;

/// Client event writing a property: `{"name": ..., "value": ...}`.
pub const PROPERTY_EVENT: &str = "property";

#[derive(Debug, Deserialize)]
struct PropertyWrite {
    name: String,
    #[serde(default)]
    value: JsonValue,
}

/// Resolves the target adapter and runs the event against its model.
///
/// Runs the facade synchronously; the notifications it fires are left in
/// the session inbox for the caller to drain.
pub(crate) fn dispatch(
    models: &mut ModelStore,
    registry: &mut AdapterRegistry,
    event: &ClientEvent,
) -> Result<(), SyncError> {
    let adapter = registry.get_by_id(event.adapter_id)?;
    let model = adapter.model();
    let spec = adapter.spec().clone();

    if event.name == PROPERTY_EVENT && !spec.has_event(PROPERTY_EVENT) {
        return write_property(models, registry, event.adapter_id, model, &spec, &event.payload);
    }
    spec.handle_event(models, model, &event.name, &event.payload)
}

/// Applies a client-side property edit.
///
/// The adapter's cached value is updated first, so the model's own change
/// notification is only echoed when the model normalised the value.
fn write_property(
    models: &mut ModelStore,
    registry: &mut AdapterRegistry,
    id: AdapterId,
    model: ModelHandle,
    spec: &AdapterSpec,
    payload: &JsonValue,
) -> Result<(), SyncError> {
    let write: PropertyWrite =
        serde_json::from_value(payload.clone()).map_err(|e| SyncError::InvalidPayload {
            event: PROPERTY_EVENT.to_string(),
            reason: e.to_string(),
        })?;
    let def = spec.writable_property(&write.name)?;

    registry
        .get_by_id_mut(id)?
        .assume_sent(&write.name, write.value.clone());
    models.update_dyn(model, |object, changes| {
        def.write(object, model, &write.value, changes)
    })?
}
