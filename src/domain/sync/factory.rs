//! Maps model kinds to adapter specs.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::foundation::SyncError;

use super::spec::AdapterSpec;

/// Registry of adapter kinds known to a session.
///
/// Children are adapted by their model kind; the root may also be adapted by
/// an explicit object type.
#[derive(Debug, Clone, Default)]
pub struct AdapterFactory {
    by_kind: HashMap<String, Arc<AdapterSpec>>,
    by_object_type: HashMap<String, Arc<AdapterSpec>>,
}

impl AdapterFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the spec used for models of `model_kind`.
    pub fn register(mut self, model_kind: impl Into<String>, spec: AdapterSpec) -> Self {
        let spec = Arc::new(spec);
        self.by_object_type
            .insert(spec.object_type().to_string(), spec.clone());
        self.by_kind.insert(model_kind.into(), spec);
        self
    }

    /// Spec for a model kind.
    pub fn spec_for_kind(&self, model_kind: &str) -> Result<Arc<AdapterSpec>, SyncError> {
        self.by_kind
            .get(model_kind)
            .cloned()
            .ok_or_else(|| SyncError::UnsupportedModelKind(model_kind.to_string()))
    }

    /// Spec for a client object type.
    pub fn spec_for_object_type(&self, object_type: &str) -> Result<Arc<AdapterSpec>, SyncError> {
        self.by_object_type
            .get(object_type)
            .cloned()
            .ok_or_else(|| SyncError::UnsupportedModelKind(object_type.to_string()))
    }

    pub fn len(&self) -> usize {
        self.by_kind.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_kind.is_empty()
    }
}
