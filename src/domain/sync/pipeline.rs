//! Property change pipeline.
//!
//! Model listeners only enqueue notifications into the session's
//! [`NotificationInbox`]. The session drains the inbox synchronously after
//! every facade call, translating accepted changes into outbound messages.
//! Reading properties never mutates models, so draining terminates.

use serde_json::{json, Value as JsonValue};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{trace, warn};

use crate::domain::foundation::{AdapterId, ModelHandle, SyncError};
use crate::domain::model::{ModelListener, ModelNotification};

use super::adapter::Owner;
use super::lifecycle::{self, SyncContext};
use super::messages::OutboundMessage;
use super::spec::PropertyValue;

/// Queue of model notifications awaiting the pipeline.
#[derive(Debug, Clone, Default)]
pub(crate) struct NotificationInbox {
    queue: Arc<Mutex<VecDeque<ModelNotification>>>,
}

impl NotificationInbox {
    fn lock(&self) -> MutexGuard<'_, VecDeque<ModelNotification>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Listener that enqueues every notification it receives.
    pub(crate) fn listener(&self) -> ModelListener {
        let queue = self.queue.clone();
        Arc::new(move |notification: &ModelNotification| {
            queue
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push_back(notification.clone());
        })
    }

    pub(crate) fn pop(&self) -> Option<ModelNotification> {
        self.lock().pop_front()
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    pub(crate) fn clear(&self) {
        self.lock().clear();
    }
}

/// Processes queued notifications until the inbox is empty.
pub(crate) fn drain(ctx: &mut SyncContext<'_>) -> Result<(), SyncError> {
    while let Some(notification) = ctx.inbox.pop() {
        // Notifications for models whose adapter is gone are stale.
        let Ok(id) = ctx.registry.id_for_model(notification.source()) else {
            continue;
        };
        match notification {
            ModelNotification::PropertyChanged { property, .. } => {
                on_property_change(ctx, id, &property)?;
            }
            ModelNotification::Event { name, payload, .. } => {
                trace!(session_id = %ctx.session_id, adapter_id = %id, event = %name, "Model event");
                ctx.response
                    .append(OutboundMessage::event(id, name, payload));
            }
        }
    }
    Ok(())
}

/// Re-reads one property and enqueues it if the client's copy is stale.
///
/// Children no longer referenced by any property are released after the
/// change is enqueued.
pub(crate) fn on_property_change(
    ctx: &mut SyncContext<'_>,
    id: AdapterId,
    property: &str,
) -> Result<(), SyncError> {
    let Ok(adapter) = ctx.registry.get_by_id(id) else {
        return Ok(());
    };
    let Some(index) = adapter.spec().property_index(property) else {
        return Ok(());
    };
    let previous = adapter.owned_children();

    let (value, references) = read_property(ctx, id, index)?;

    let adapter = ctx.registry.get_by_id_mut(id)?;
    let observer = adapter.observer_mut(index);
    if observer.last_sent.as_ref() == Some(&value) {
        observer.references = references;
        trace!(adapter_id = %id, property, "Unchanged property dropped");
        return Ok(());
    }
    observer.last_sent = Some(value.clone());
    observer.references = references;
    let current = adapter.owned_children();

    ctx.response
        .append(OutboundMessage::property_changed(id, property, value));

    for child in previous.difference(&current) {
        lifecycle::release(ctx, *child, Owner::Adapter(id));
    }
    Ok(())
}

/// Reads a property and converts it to its wire value.
///
/// Model-valued properties adapt each referenced model with `id` as owner,
/// yielding `{"ref": childId}` values and the referenced child ids.
pub(crate) fn read_property(
    ctx: &mut SyncContext<'_>,
    id: AdapterId,
    index: usize,
) -> Result<(JsonValue, Vec<AdapterId>), SyncError> {
    let adapter = ctx.registry.get_by_id(id)?;
    let model = adapter.model();
    let spec = adapter.spec().clone();
    let raw = spec.properties()[index].read(ctx.models.get(model)?, model)?;

    match raw {
        PropertyValue::Value(value) => Ok((value, Vec::new())),
        PropertyValue::Model(None) => Ok((JsonValue::Null, Vec::new())),
        PropertyValue::Model(Some(child)) => Ok(match adapt_child(ctx, child, id)? {
            Some(child_id) => (json!({ "ref": child_id }), vec![child_id]),
            None => (JsonValue::Null, Vec::new()),
        }),
        PropertyValue::Models(children) => {
            let mut values = Vec::with_capacity(children.len());
            let mut references = Vec::with_capacity(children.len());
            for child in children {
                if let Some(child_id) = adapt_child(ctx, child, id)? {
                    values.push(json!({ "ref": child_id }));
                    references.push(child_id);
                }
            }
            Ok((JsonValue::Array(values), references))
        }
    }
}

fn adapt_child(
    ctx: &mut SyncContext<'_>,
    child: ModelHandle,
    parent: AdapterId,
) -> Result<Option<AdapterId>, SyncError> {
    if !ctx.models.contains(child) {
        warn!(
            session_id = %ctx.session_id,
            adapter_id = %parent,
            model = %child,
            "Referenced model does not exist, skipping"
        );
        return Ok(None);
    }
    lifecycle::get_or_create(ctx, child, Owner::Adapter(parent), None).map(Some)
}
