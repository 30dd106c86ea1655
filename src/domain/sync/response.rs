//! Response buffer: the outbound messages of one processing cycle.

use std::collections::HashMap;

use crate::domain::foundation::AdapterId;

use super::messages::OutboundMessage;

/// Ordered, deduplicated accumulation of outbound messages.
///
/// - Messages keep insertion order.
/// - Writing the same `(adapter, property)` twice keeps only the last value,
///   moved to the final position.
/// - A property change for an adapter created in this buffer is folded into
///   its creation snapshot.
#[derive(Debug, Default)]
pub struct ResponseBuffer {
    entries: Vec<Option<OutboundMessage>>,
    created: HashMap<AdapterId, usize>,
    property_slots: HashMap<(AdapterId, String), usize>,
}

impl ResponseBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message, applying the coalescing rules.
    pub fn append(&mut self, message: OutboundMessage) {
        match message {
            OutboundMessage::AdapterCreated(created) => {
                self.created.insert(created.id, self.entries.len());
                self.entries.push(Some(OutboundMessage::AdapterCreated(created)));
            }
            OutboundMessage::PropertyChanged(change) => {
                if let Some(&slot) = self.created.get(&change.id) {
                    if let Some(OutboundMessage::AdapterCreated(created)) = &mut self.entries[slot] {
                        created.properties.insert(change.name, change.value);
                        return;
                    }
                }
                let key = (change.id, change.name.clone());
                if let Some(slot) = self.property_slots.remove(&key) {
                    self.entries[slot] = None;
                }
                self.property_slots.insert(key, self.entries.len());
                self.entries.push(Some(OutboundMessage::PropertyChanged(change)));
            }
            other => self.entries.push(Some(other)),
        }
    }

    /// Returns true if the adapter's creation message is in this buffer.
    pub fn was_created_here(&self, id: AdapterId) -> bool {
        self.created.contains_key(&id)
    }

    /// Removes every trace of an adapter that never reached the client.
    ///
    /// Error entries stay: they answer events the client already sent.
    pub fn discard_adapter(&mut self, id: AdapterId) {
        self.drop_messages_for(id);
        self.created.remove(&id);
    }

    /// Drops all pending messages about `id` except error entries.
    pub fn drop_messages_for(&mut self, id: AdapterId) {
        for entry in self.entries.iter_mut() {
            let stale = entry
                .as_ref()
                .is_some_and(|m| m.adapter_id() == id && !matches!(m, OutboundMessage::Error(_)));
            if stale {
                *entry = None;
            }
        }
        self.property_slots.retain(|(adapter, _), _| *adapter != id);
    }

    /// Points a pending creation message of `child` at a new parent.
    ///
    /// Only rewrites messages still naming `old_parent`.
    pub fn reparent(&mut self, child: AdapterId, old_parent: AdapterId, new_parent: AdapterId) {
        let Some(&slot) = self.created.get(&child) else {
            return;
        };
        if let Some(OutboundMessage::AdapterCreated(created)) = &mut self.entries[slot] {
            if created.parent_id == old_parent {
                created.parent_id = new_parent;
            }
        }
    }

    /// Number of messages that would be flushed.
    pub fn len(&self) -> usize {
        self.entries.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the pending messages, in flush order.
    pub fn messages(&self) -> Vec<&OutboundMessage> {
        self.entries.iter().flatten().collect()
    }

    /// Consumes the buffer and returns the messages in flush order.
    pub fn into_messages(self) -> Vec<OutboundMessage> {
        self.entries.into_iter().flatten().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ErrorCode;
    use serde_json::{json, Map};

    fn id(raw: u64) -> AdapterId {
        AdapterId::from_raw(raw)
    }

    fn created(raw: u64) -> OutboundMessage {
        let mut properties = Map::new();
        properties.insert("label".into(), json!("initial"));
        OutboundMessage::adapter_created(id(raw), "Button", AdapterId::SESSION, properties)
    }

    #[test]
    fn preserves_insertion_order() {
        let mut buffer = ResponseBuffer::new();
        buffer.append(OutboundMessage::property_changed(id(2), "a", json!(1)));
        buffer.append(OutboundMessage::event(id(3), "requestFocus", json!(null)));
        buffer.append(OutboundMessage::adapter_disposed(id(4)));

        let ids: Vec<_> = buffer.into_messages().iter().map(|m| m.adapter_id()).collect();
        assert_eq!(ids, vec![id(2), id(3), id(4)]);
    }

    #[test]
    fn repeated_property_keeps_last_value_in_final_position() {
        let mut buffer = ResponseBuffer::new();
        buffer.append(OutboundMessage::property_changed(id(2), "label", json!("a")));
        buffer.append(OutboundMessage::property_changed(id(3), "label", json!("x")));
        buffer.append(OutboundMessage::property_changed(id(2), "label", json!("b")));

        let messages = buffer.into_messages();
        assert_eq!(
            messages,
            vec![
                OutboundMessage::property_changed(id(3), "label", json!("x")),
                OutboundMessage::property_changed(id(2), "label", json!("b")),
            ]
        );
    }

    #[test]
    fn change_after_creation_folds_into_snapshot() {
        let mut buffer = ResponseBuffer::new();
        buffer.append(created(2));
        buffer.append(OutboundMessage::property_changed(id(2), "label", json!("updated")));

        let messages = buffer.into_messages();
        assert_eq!(messages.len(), 1);
        match &messages[0] {
            OutboundMessage::AdapterCreated(m) => assert_eq!(m.properties["label"], "updated"),
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn discard_adapter_removes_all_its_messages() {
        let mut buffer = ResponseBuffer::new();
        buffer.append(created(2));
        buffer.append(OutboundMessage::event(id(2), "requestFocus", json!(null)));
        buffer.append(OutboundMessage::property_changed(id(3), "label", json!("kept")));
        assert!(buffer.was_created_here(id(2)));

        buffer.discard_adapter(id(2));

        assert!(!buffer.was_created_here(id(2)));
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.messages()[0].adapter_id(), id(3));
    }

    #[test]
    fn dropped_property_slot_does_not_resurrect() {
        let mut buffer = ResponseBuffer::new();
        buffer.append(OutboundMessage::property_changed(id(5), "label", json!("a")));
        buffer.drop_messages_for(id(5));
        buffer.append(OutboundMessage::adapter_disposed(id(5)));

        assert_eq!(
            buffer.into_messages(),
            vec![OutboundMessage::adapter_disposed(id(5))]
        );
    }

    #[test]
    fn errors_are_never_coalesced() {
        let mut buffer = ResponseBuffer::new();
        for _ in 0..2 {
            buffer.append(OutboundMessage::error(
                id(2),
                "click",
                ErrorCode::FacadeFailed,
                "failed",
            ));
        }
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn error_entries_survive_dispose() {
        let mut buffer = ResponseBuffer::new();
        buffer.append(OutboundMessage::error(id(3), "fail", ErrorCode::FacadeFailed, "refused"));
        buffer.append(OutboundMessage::property_changed(id(3), "label", json!("gone")));
        buffer.drop_messages_for(id(3));
        buffer.append(OutboundMessage::adapter_disposed(id(3)));

        assert_eq!(
            buffer.into_messages(),
            vec![
                OutboundMessage::error(id(3), "fail", ErrorCode::FacadeFailed, "refused"),
                OutboundMessage::adapter_disposed(id(3)),
            ]
        );
    }

    #[test]
    fn error_entries_survive_discard() {
        let mut buffer = ResponseBuffer::new();
        buffer.append(created(4));
        buffer.append(OutboundMessage::error(id(4), "fail", ErrorCode::FacadeFailed, "refused"));

        buffer.discard_adapter(id(4));

        assert_eq!(buffer.len(), 1);
        assert!(matches!(buffer.messages()[0], OutboundMessage::Error(_)));
    }

    #[test]
    fn reparent_rewrites_pending_creation() {
        let mut buffer = ResponseBuffer::new();
        buffer.append(OutboundMessage::adapter_created(id(5), "Leaf", id(4), Map::new()));

        buffer.reparent(id(5), id(9), id(2));
        buffer.reparent(id(5), id(4), id(2));

        match buffer.messages()[0] {
            OutboundMessage::AdapterCreated(m) => assert_eq!(m.parent_id, id(2)),
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn empty_buffer_reports_empty() {
        assert!(ResponseBuffer::new().is_empty());
    }
}
