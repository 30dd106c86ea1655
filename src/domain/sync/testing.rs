//! Widget fixtures shared by the sync unit tests.

use serde_json::json;

use crate::domain::foundation::{FacadeError, ModelHandle};
use crate::domain::model::ModelObject;

use super::factory::AdapterFactory;
use super::spec::AdapterSpec;

#[derive(Debug, Default)]
pub struct Container {
    pub title: String,
    pub children: Vec<ModelHandle>,
}

impl Container {
    pub fn with_children(children: Vec<ModelHandle>) -> Self {
        Self {
            title: String::new(),
            children,
        }
    }
}

impl ModelObject for Container {
    fn model_kind(&self) -> &'static str {
        "Container"
    }

    fn child_models(&self, relation: &str) -> Vec<ModelHandle> {
        match relation {
            "children" => self.children.clone(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct Leaf {
    pub text: String,
}

impl Leaf {
    pub fn new(text: &str) -> Self {
        Self { text: text.into() }
    }
}

impl ModelObject for Leaf {
    fn model_kind(&self) -> &'static str {
        "Leaf"
    }
}

#[derive(Debug)]
pub struct Field {
    pub value: String,
}

impl Field {
    pub fn new(value: &str) -> Self {
        Self {
            value: value.into(),
        }
    }
}

impl ModelObject for Field {
    fn model_kind(&self) -> &'static str {
        "Field"
    }
}

pub fn fixture_factory() -> AdapterFactory {
    AdapterFactory::new()
        .register(
            "Container",
            AdapterSpec::new("Container")
                .property::<Container, _>("title", |c| json!(c.title))
                .relation("children"),
        )
        .register(
            "Leaf",
            AdapterSpec::new("Leaf")
                .property::<Leaf, _>("text", |l| json!(l.text))
                .event::<Leaf, _>("setText", |leaf, payload, changes| {
                    leaf.text = payload["text"]
                        .as_str()
                        .ok_or_else(|| FacadeError::invalid_payload("text must be a string"))?
                        .to_string();
                    changes.mark("text");
                    Ok(())
                })
                .event::<Leaf, _>("loaded", |leaf, payload, changes| {
                    leaf.text = payload
                        .get("ok")
                        .or_else(|| payload.get("error"))
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string();
                    changes.mark("text");
                    Ok(())
                })
                .event::<Leaf, _>("fail", |_, _, _| Err(FacadeError::new("refused")))
                .event::<Leaf, _>("crash", |_, _, _| Err(FacadeError::fatal("corrupted"))),
        )
        .register(
            "Field",
            AdapterSpec::new("Field")
                .writable::<Field, _, _>(
                    "value",
                    |f| json!(f.value),
                    |f, value| {
                        f.value = value
                            .as_str()
                            .ok_or_else(|| FacadeError::invalid_payload("value must be a string"))?
                            .trim()
                            .to_string();
                        Ok(())
                    },
                )
                .property::<Field, _>("valid", |f| json!(!f.value.is_empty())),
        )
}
