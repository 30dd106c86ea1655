//! Listener registration for model notifications.
//!
//! `ModelStore::add_listener` hands out a [`Subscription`]. The subscription
//! is the only way to stay registered: dropping it unregisters the listener,
//! so detaching an adapter is deterministic and needs no explicit bookkeeping.

use serde_json::Value as JsonValue;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::domain::foundation::ModelHandle;

/// Notification fired by the model after a mutation has been applied.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelNotification {
    /// A named property now holds a new value.
    PropertyChanged {
        source: ModelHandle,
        property: String,
    },
    /// A model-originated event meant for the client.
    Event {
        source: ModelHandle,
        name: String,
        payload: JsonValue,
    },
}

impl ModelNotification {
    pub fn source(&self) -> ModelHandle {
        match self {
            ModelNotification::PropertyChanged { source, .. } => *source,
            ModelNotification::Event { source, .. } => *source,
        }
    }
}

/// Callback invoked for matching notifications.
pub type ModelListener = Arc<dyn Fn(&ModelNotification) + Send + Sync>;

/// Which property notifications a listener wants. Events always pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyFilter {
    All,
    Named(BTreeSet<String>),
}

impl PropertyFilter {
    /// Accepts only the given property names.
    pub fn named<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PropertyFilter::Named(names.into_iter().map(Into::into).collect())
    }

    pub fn accepts(&self, notification: &ModelNotification) -> bool {
        match (self, notification) {
            (_, ModelNotification::Event { .. }) => true,
            (PropertyFilter::All, _) => true,
            (PropertyFilter::Named(names), ModelNotification::PropertyChanged { property, .. }) => {
                names.contains(property)
            }
        }
    }
}

struct ListenerEntry {
    id: u64,
    filter: PropertyFilter,
    listener: ModelListener,
}

/// Listener registrations keyed by model handle.
#[derive(Default)]
pub(crate) struct ListenerTable {
    entries: HashMap<ModelHandle, Vec<ListenerEntry>>,
    last_id: u64,
}

impl ListenerTable {
    fn add(&mut self, source: ModelHandle, filter: PropertyFilter, listener: ModelListener) -> u64 {
        self.last_id += 1;
        let id = self.last_id;
        self.entries.entry(source).or_default().push(ListenerEntry {
            id,
            filter,
            listener,
        });
        id
    }

    fn remove(&mut self, source: ModelHandle, id: u64) -> bool {
        let Some(list) = self.entries.get_mut(&source) else {
            return false;
        };
        let before = list.len();
        list.retain(|entry| entry.id != id);
        let removed = list.len() != before;
        if list.is_empty() {
            self.entries.remove(&source);
        }
        removed
    }

    /// Listeners accepting the notification, cloned so the table lock can be
    /// released before they run.
    pub(crate) fn matching(&self, notification: &ModelNotification) -> Vec<ModelListener> {
        self.entries
            .get(&notification.source())
            .map(|list| {
                list.iter()
                    .filter(|entry| entry.filter.accepts(notification))
                    .map(|entry| entry.listener.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn count(&self, source: ModelHandle) -> usize {
        self.entries.get(&source).map(Vec::len).unwrap_or(0)
    }
}

pub(crate) type SharedListenerTable = Arc<Mutex<ListenerTable>>;

/// Locks the table, recovering from poisoning: a panicking listener must not
/// wedge every later registration.
pub(crate) fn lock_table(table: &Mutex<ListenerTable>) -> MutexGuard<'_, ListenerTable> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn register(
    table: &SharedListenerTable,
    source: ModelHandle,
    filter: PropertyFilter,
    listener: ModelListener,
) -> Subscription {
    let id = lock_table(table).add(source, filter, listener);
    Subscription {
        id,
        source,
        table: Arc::downgrade(table),
    }
}

/// Handle for one listener registration. Dropping it unregisters.
#[must_use = "dropping a Subscription unregisters the listener immediately"]
pub struct Subscription {
    id: u64,
    source: ModelHandle,
    table: Weak<Mutex<ListenerTable>>,
}

impl Subscription {
    /// Model this subscription listens to.
    pub fn source(&self) -> ModelHandle {
        self.source
    }

    /// Returns true while the listener is still registered.
    pub fn is_active(&self) -> bool {
        self.table
            .upgrade()
            .map(|table| {
                lock_table(&table)
                    .entries
                    .get(&self.source)
                    .is_some_and(|list| list.iter().any(|entry| entry.id == self.id))
            })
            .unwrap_or(false)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(table) = self.table.upgrade() {
            lock_table(&table).remove(self.source, self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("source", &self.source)
            .finish()
    }
}
