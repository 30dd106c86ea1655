//! Adapter lifecycle: creation on first reference, disposal on last release.

use serde_json::Map;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::domain::foundation::{AdapterId, ModelHandle, SessionId, SyncError};
use crate::domain::model::ModelStore;
use crate::ports::SessionListener;

use super::adapter::{Adapter, Owner};
use super::factory::AdapterFactory;
use super::messages::OutboundMessage;
use super::pipeline::{self, NotificationInbox};
use super::registry::AdapterRegistry;
use super::response::ResponseBuffer;

/// Borrowed view of the session state the lifecycle and pipeline mutate.
///
/// Only constructed while the session holds an open response buffer, so
/// every message appended here lands in the current response.
pub(crate) struct SyncContext<'a> {
    pub(crate) session_id: SessionId,
    pub(crate) registry: &'a mut AdapterRegistry,
    pub(crate) models: &'a ModelStore,
    pub(crate) factory: &'a AdapterFactory,
    pub(crate) response: &'a mut ResponseBuffer,
    pub(crate) inbox: &'a NotificationInbox,
    pub(crate) listeners: &'a [Arc<dyn SessionListener>],
}

/// Returns the adapter for `model`, creating it on first reference.
///
/// An existing adapter only gains `owner`. A new adapter is registered,
/// subscribed and snapshotted (creating referenced children first) before
/// its creation message is appended.
pub(crate) fn get_or_create(
    ctx: &mut SyncContext<'_>,
    model: ModelHandle,
    owner: Owner,
    object_type: Option<&str>,
) -> Result<AdapterId, SyncError> {
    if let Ok(id) = ctx.registry.id_for_model(model) {
        if ctx.registry.get_by_id_mut(id)?.add_owner(owner) {
            trace!(session_id = %ctx.session_id, adapter_id = %id, ?owner, "Owner attached");
        }
        return Ok(id);
    }

    let model_kind = ctx.models.get(model)?.model_kind();
    let spec = match object_type {
        Some(object_type) => ctx.factory.spec_for_object_type(object_type)?,
        None => ctx.factory.spec_for_kind(model_kind)?,
    };

    let id = ctx.registry.allocate_id();
    let subscription = ctx
        .models
        .add_listener(model, spec.property_filter(), ctx.inbox.listener());
    ctx.registry
        .insert(Adapter::new(id, model, spec.clone(), owner, subscription));

    let mut properties = Map::new();
    for (index, def) in spec.properties().iter().enumerate() {
        let (value, references) = match pipeline::read_property(ctx, id, index) {
            Ok(read) => read,
            Err(err) => {
                dispose(ctx, id);
                return Err(err);
            }
        };
        let observer = ctx.registry.get_by_id_mut(id)?.observer_mut(index);
        observer.last_sent = Some(value.clone());
        observer.references = references;
        properties.insert(def.name().to_string(), value);
    }

    ctx.response.append(OutboundMessage::adapter_created(
        id,
        spec.object_type(),
        owner.parent_id(),
        properties,
    ));

    debug!(
        session_id = %ctx.session_id,
        adapter_id = %id,
        object_type = spec.object_type(),
        model = %model,
        "Adapter created"
    );
    for listener in ctx.listeners {
        listener.on_adapter_created(ctx.session_id, id, spec.object_type());
    }
    Ok(id)
}

/// Removes `owner` from the adapter; disposes it when no owner remains.
///
/// Unknown ids, disposed adapters and absent owners are no-ops.
pub(crate) fn release(ctx: &mut SyncContext<'_>, id: AdapterId, owner: Owner) {
    let Ok(adapter) = ctx.registry.get_by_id_mut(id) else {
        return;
    };
    if !adapter.remove_owner(owner) {
        return;
    }
    trace!(session_id = %ctx.session_id, adapter_id = %id, ?owner, "Owner released");
    if adapter.owners().is_empty() {
        dispose(ctx, id);
    }
}

/// Disposes an adapter regardless of its owners and cascades to children.
pub(crate) fn dispose(ctx: &mut SyncContext<'_>, id: AdapterId) {
    let Some(mut adapter) = ctx.registry.remove(id) else {
        return;
    };
    let children = adapter.detach();
    for &child in &children {
        release(ctx, child, Owner::Adapter(id));
    }

    if ctx.response.was_created_here(id) {
        for child in children {
            if let Ok(survivor) = ctx.registry.get_by_id(child) {
                let parent = survivor.parent().parent_id();
                ctx.response.reparent(child, id, parent);
            }
        }
        ctx.response.discard_adapter(id);
    } else {
        ctx.response.drop_messages_for(id);
        ctx.response.append(OutboundMessage::adapter_disposed(id));
    }

    debug!(session_id = %ctx.session_id, adapter_id = %id, "Adapter disposed");
    for listener in ctx.listeners {
        listener.on_adapter_disposed(ctx.session_id, id);
    }
}
