//! Bounded history of sent responses, for safe client retries.

use std::collections::VecDeque;

use super::messages::ResponsePayload;

#[derive(Debug, Clone)]
struct HistoryEntry {
    request_sequence_no: Option<u64>,
    payload: ResponsePayload,
}

/// Responses the client has not yet acknowledged.
///
/// Oldest entries are evicted once `capacity` is exceeded.
#[derive(Debug, Clone)]
pub struct ResponseHistory {
    capacity: usize,
    entries: VecDeque<HistoryEntry>,
}

impl ResponseHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::new(),
        }
    }

    /// Changes the capacity, evicting the oldest entries if needed.
    pub fn resize(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        self.evict_overflow();
    }

    /// Stores a sent response, keyed by the request that produced it.
    pub fn record(&mut self, request_sequence_no: Option<u64>, payload: ResponsePayload) {
        self.entries.push_back(HistoryEntry {
            request_sequence_no,
            payload,
        });
        self.evict_overflow();
    }

    fn evict_overflow(&mut self) {
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Response already produced for this request number, if any.
    pub fn lookup(&self, request_sequence_no: u64) -> Option<&ResponsePayload> {
        self.entries
            .iter()
            .find(|entry| entry.request_sequence_no == Some(request_sequence_no))
            .map(|entry| &entry.payload)
    }

    /// Drops every response up to and including `ack_sequence_no`.
    pub fn confirm(&mut self, ack_sequence_no: u64) {
        self.entries
            .retain(|entry| entry.payload.sequence_no > ack_sequence_no);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
