//! Shared widget models and helpers for the integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::{json, Value as JsonValue};

use mirror_sync::domain::foundation::{AdapterId, FacadeError, ModelHandle};
use mirror_sync::domain::model::{ModelObject, ModelStore};
use mirror_sync::domain::sync::{
    AdapterFactory, AdapterSpec, ClientEvent, OutboundMessage, ResponsePayload, Session,
};
use mirror_sync::ports::SessionListener;

// =============================================================================
// Widget models
// =============================================================================

/// Top-level container holding panels.
#[derive(Debug, Default)]
pub struct Window {
    pub title: String,
    pub panels: Vec<ModelHandle>,
}

impl ModelObject for Window {
    fn model_kind(&self) -> &'static str {
        "Window"
    }

    fn child_models(&self, relation: &str) -> Vec<ModelHandle> {
        match relation {
            "panels" => self.panels.clone(),
            _ => Vec::new(),
        }
    }
}

/// Panel showing at most one document.
#[derive(Debug, Default)]
pub struct Panel {
    pub caption: String,
    pub content: Option<ModelHandle>,
}

impl ModelObject for Panel {
    fn model_kind(&self) -> &'static str {
        "Panel"
    }
}

/// Editable text document.
#[derive(Debug, Default)]
pub struct Document {
    pub text: String,
}

impl ModelObject for Document {
    fn model_kind(&self) -> &'static str {
        "Document"
    }
}

/// List whose items are created by a facade action.
#[derive(Debug, Default)]
pub struct TodoList {
    pub items: Vec<ModelHandle>,
}

impl ModelObject for TodoList {
    fn model_kind(&self) -> &'static str {
        "TodoList"
    }

    fn child_models(&self, relation: &str) -> Vec<ModelHandle> {
        match relation {
            "items" => self.items.clone(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct TodoItem {
    pub label: String,
    pub done: bool,
}

impl ModelObject for TodoItem {
    fn model_kind(&self) -> &'static str {
        "TodoItem"
    }
}

fn text_field(payload: &JsonValue, field: &str) -> Result<String, FacadeError> {
    payload[field]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| FacadeError::invalid_payload(format!("{} must be a string", field)))
}

pub fn widget_factory() -> Arc<AdapterFactory> {
    let factory = AdapterFactory::new()
        .register(
            "Window",
            AdapterSpec::new("Window")
                .property::<Window, _>("title", |w| json!(w.title))
                .relation("panels"),
        )
        .register(
            "Panel",
            AdapterSpec::new("Panel")
                .property::<Panel, _>("caption", |p| json!(p.caption))
                .reference::<Panel, _>("content", |p| p.content)
                .event::<Panel, _>("close", |panel, _, changes| {
                    panel.content = None;
                    changes.mark("content");
                    Ok(())
                })
                .event::<Panel, _>("rename", |panel, payload, changes| {
                    let caption = text_field(payload, "caption")?;
                    if caption.is_empty() {
                        return Err(FacadeError::new("Caption must not be empty"));
                    }
                    panel.caption = caption;
                    changes.mark("caption");
                    Ok(())
                }),
        )
        .register(
            "Document",
            AdapterSpec::new("Document")
                .writable::<Document, _, _>(
                    "text",
                    |d| json!(d.text),
                    |d, value| {
                        d.text = value
                            .as_str()
                            .ok_or_else(|| FacadeError::invalid_payload("text must be a string"))?
                            .to_string();
                        Ok(())
                    },
                )
                .event::<Document, _>("append", |doc, payload, changes| {
                    doc.text.push_str(&text_field(payload, "text")?);
                    changes.mark("text");
                    Ok(())
                })
                .event::<Document, _>("loaded", |doc, payload, changes| {
                    if let Some(message) = payload["error"].as_str() {
                        return Err(FacadeError::new(message));
                    }
                    doc.text = text_field(&payload["ok"], "text")?;
                    changes.mark("text");
                    Ok(())
                })
                .event::<Document, _>("focus", |_, _, changes| {
                    changes.emit("requestFocus", json!({ "select": true }));
                    Ok(())
                })
                .event::<Document, _>("corrupt", |_, _, _| {
                    Err(FacadeError::fatal("Document storage corrupted"))
                }),
        )
        .register(
            "TodoList",
            AdapterSpec::new("TodoList")
                .relation("items")
                .facade("add", |store: &mut ModelStore, list, payload| {
                    let item = store.insert(TodoItem {
                        label: text_field(payload, "label")?,
                        done: false,
                    });
                    store
                        .update::<TodoList, _, _>(list, |list, changes| {
                            list.items.push(item);
                            changes.mark("items");
                        })
                        .map_err(|e| FacadeError::new(e.to_string()))
                })
                .event::<TodoList, _>("clear", |list, _, changes| {
                    list.items.clear();
                    changes.mark("items");
                    Ok(())
                }),
        )
        .register(
            "TodoItem",
            AdapterSpec::new("TodoItem")
                .property::<TodoItem, _>("label", |i| json!(i.label))
                .writable::<TodoItem, _, _>(
                    "done",
                    |i| json!(i.done),
                    |i, value| {
                        i.done = value
                            .as_bool()
                            .ok_or_else(|| FacadeError::invalid_payload("done must be a boolean"))?;
                        Ok(())
                    },
                ),
        );
    Arc::new(factory)
}

// =============================================================================
// Scenario builders
// =============================================================================

/// Window `R` with panels `X` and `Y` both showing document `M`.
pub struct SharedDocument {
    pub session: Session,
    pub startup: ResponsePayload,
    pub window: ModelHandle,
    pub panel_x: ModelHandle,
    pub panel_y: ModelHandle,
    pub document: ModelHandle,
}

/// Model handles of a [`SharedDocument`].
#[derive(Debug, Clone, Copy)]
pub struct SharedModels {
    pub window: ModelHandle,
    pub panel_x: ModelHandle,
    pub panel_y: ModelHandle,
    pub document: ModelHandle,
}

impl SharedDocument {
    pub fn start() -> Self {
        Self::build(Vec::new())
    }

    /// Like [`SharedDocument::start`], with a lifecycle listener attached.
    pub fn start_observed(listener: Arc<dyn SessionListener>) -> Self {
        Self::build(vec![listener])
    }

    fn build(listeners: Vec<Arc<dyn SessionListener>>) -> Self {
        let mut models = ModelStore::new();
        let document = models.insert(Document {
            text: "draft".into(),
        });
        let panel_x = models.insert(Panel {
            caption: "left".into(),
            content: Some(document),
        });
        let panel_y = models.insert(Panel {
            caption: "right".into(),
            content: Some(document),
        });
        let window = models.insert(Window {
            title: "Editor".into(),
            panels: vec![panel_x, panel_y],
        });

        let mut session = Session::new(models, widget_factory());
        for listener in listeners {
            session = session.with_listener(listener);
        }
        let startup = session.startup(window, "Window").expect("startup");
        Self {
            session,
            startup,
            window,
            panel_x,
            panel_y,
            document,
        }
    }

    /// Moves the session out, keeping the model handles.
    pub fn into_session(self) -> (Session, SharedModels) {
        let models = SharedModels {
            window: self.window,
            panel_x: self.panel_x,
            panel_y: self.panel_y,
            document: self.document,
        };
        (self.session, models)
    }

    pub fn adapter_of(&self, model: ModelHandle) -> AdapterId {
        self.session
            .registry()
            .id_for_model(model)
            .expect("model is adapted")
    }
}

/// Session whose root is an empty todo list; returns the root adapter.
pub fn todo_session() -> (Session, AdapterId) {
    let mut models = ModelStore::new();
    let list = models.insert(TodoList::default());
    let mut session = Session::new(models, widget_factory());
    session.startup(list, "TodoList").expect("startup");
    let root = session.root().expect("root adapter");
    (session, root)
}

// =============================================================================
// Message helpers
// =============================================================================

pub fn event(id: AdapterId, name: &str, payload: JsonValue) -> ClientEvent {
    ClientEvent::new(id, name, payload)
}

pub fn created_ids(messages: &[OutboundMessage]) -> Vec<AdapterId> {
    messages
        .iter()
        .filter_map(|m| match m {
            OutboundMessage::AdapterCreated(created) => Some(created.id),
            _ => None,
        })
        .collect()
}

pub fn disposed_ids(messages: &[OutboundMessage]) -> Vec<AdapterId> {
    messages
        .iter()
        .filter_map(|m| match m {
            OutboundMessage::AdapterDisposed(disposed) => Some(disposed.id),
            _ => None,
        })
        .collect()
}

pub fn property_changes(messages: &[OutboundMessage]) -> Vec<(AdapterId, String, JsonValue)> {
    messages
        .iter()
        .filter_map(|m| match m {
            OutboundMessage::PropertyChanged(change) => {
                Some((change.id, change.name.clone(), change.value.clone()))
            }
            _ => None,
        })
        .collect()
}

fn collect_refs(value: &JsonValue, refs: &mut Vec<AdapterId>) {
    match value {
        JsonValue::Object(map) if map.len() == 1 && map.contains_key("ref") => {
            if let Some(raw) = map["ref"].as_u64() {
                refs.push(AdapterId::from_raw(raw));
            }
        }
        JsonValue::Array(items) => items.iter().for_each(|item| collect_refs(item, refs)),
        _ => {}
    }
}

/// Asserts every `{"ref": id}` points at an adapter the client already
/// knows or one created earlier in the same response.
pub fn assert_creation_before_use(known: &HashSet<AdapterId>, messages: &[OutboundMessage]) {
    let mut seen = known.clone();
    for message in messages {
        let mut refs = Vec::new();
        match message {
            OutboundMessage::AdapterCreated(created) => {
                created
                    .properties
                    .values()
                    .for_each(|value| collect_refs(value, &mut refs));
            }
            OutboundMessage::PropertyChanged(change) => collect_refs(&change.value, &mut refs),
            _ => {}
        }
        for referenced in refs {
            assert!(
                seen.contains(&referenced),
                "adapter {} referenced before its creation in {:?}",
                referenced,
                message
            );
        }
        if let OutboundMessage::AdapterCreated(created) = message {
            seen.insert(created.id);
        }
        if let OutboundMessage::AdapterDisposed(disposed) = message {
            seen.remove(&disposed.id);
        }
    }
}
