//! Session: the per-client synchronization context.
//!
//! A session owns the model store, the adapter registry, the id sequence
//! and the currently open response buffer. One inbound batch is processed
//! as `open → dispatch → close`; all adapters live and die with it.

use serde_json::{json, Value as JsonValue};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::domain::foundation::{
    AdapterId, ErrorCode, ModelHandle, SessionId, SessionStatus, SyncError, Timestamp,
};
use crate::domain::model::ModelStore;
use crate::ports::SessionListener;

use super::adapter::{Adapter, Owner};
use super::dispatcher;
use super::factory::AdapterFactory;
use super::history::ResponseHistory;
use super::lifecycle::{self, SyncContext};
use super::messages::{ClientEvent, InboundRequest, OutboundMessage, ResponsePayload};
use super::pipeline::{self, NotificationInbox};
use super::registry::AdapterRegistry;
use super::response::ResponseBuffer;

/// Session event sent once the root adapter exists.
pub const INITIALIZED_EVENT: &str = "initialized";

/// Client event on the session id asking for the session to end.
pub const UNLOAD_EVENT: &str = "unload";

const SESSION_OBJECT_TYPE: &str = "Session";

/// Per-session limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    /// Unacknowledged responses kept for retries.
    pub response_history_size: usize,
    /// Largest accepted inbound batch.
    pub max_events_per_batch: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            response_history_size: 10,
            max_events_per_batch: 1000,
        }
    }
}

/// The per-client-connection synchronization context.
///
/// Not thread-safe on its own; callers serialize access through a
/// single per-session lock (see `application::SessionHandle`).
pub struct Session {
    id: SessionId,
    limits: SessionLimits,
    models: ModelStore,
    factory: Arc<AdapterFactory>,
    registry: AdapterRegistry,
    inbox: NotificationInbox,
    current_response: Option<ResponseBuffer>,
    status: SessionStatus,
    root: Option<AdapterId>,
    dispose_requested: bool,
    history: ResponseHistory,
    last_sequence_no: u64,
    listeners: Vec<Arc<dyn SessionListener>>,
    created_at: Timestamp,
    last_accessed: Timestamp,
}

impl Session {
    /// Creates an idle session over the given models.
    pub fn new(models: ModelStore, factory: Arc<AdapterFactory>) -> Self {
        let limits = SessionLimits::default();
        let now = Timestamp::now();
        Self {
            id: SessionId::new(),
            limits,
            models,
            factory,
            registry: AdapterRegistry::new(),
            inbox: NotificationInbox::default(),
            current_response: None,
            status: SessionStatus::Idle,
            root: None,
            dispose_requested: false,
            history: ResponseHistory::new(limits.response_history_size),
            last_sequence_no: 0,
            listeners: Vec::new(),
            created_at: now,
            last_accessed: now,
        }
    }

    pub fn with_id(mut self, id: SessionId) -> Self {
        self.id = id;
        self
    }

    pub fn with_limits(mut self, limits: SessionLimits) -> Self {
        self.limits = limits;
        self.history.resize(limits.response_history_size);
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn SessionListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    // === Accessors ===

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_disposed(&self) -> bool {
        self.status == SessionStatus::Disposed
    }

    pub fn root(&self) -> Option<AdapterId> {
        self.root
    }

    pub fn limits(&self) -> SessionLimits {
        self.limits
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    pub fn adapter(&self, id: AdapterId) -> Result<&Adapter, SyncError> {
        self.registry.get_by_id(id)
    }

    pub fn models(&self) -> &ModelStore {
        &self.models
    }

    /// Mutable access for domain code between batches.
    ///
    /// Notifications fired here are synchronized at the start of the next
    /// batch.
    pub fn models_mut(&mut self) -> &mut ModelStore {
        &mut self.models
    }

    /// Model notifications not yet translated into messages.
    pub fn pending_notifications(&self) -> usize {
        self.inbox.len()
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn last_accessed(&self) -> Timestamp {
        self.last_accessed
    }

    pub fn touch(&mut self) {
        self.last_accessed = Timestamp::now();
    }

    /// Sequence number of the most recent response.
    pub fn last_sequence_no(&self) -> u64 {
        self.last_sequence_no
    }

    // === Response buffer ===

    /// Opens the response buffer for one processing cycle.
    pub fn open_response(&mut self) -> Result<(), SyncError> {
        self.ensure_alive()?;
        if self.current_response.is_some() {
            return Err(SyncError::protocol("response buffer is already open"));
        }
        self.current_response = Some(ResponseBuffer::new());
        Ok(())
    }

    /// Closes the response buffer and returns its messages.
    pub fn close_response(&mut self) -> Result<Vec<OutboundMessage>, SyncError> {
        self.current_response
            .take()
            .map(ResponseBuffer::into_messages)
            .ok_or_else(|| SyncError::protocol("no open response buffer to close"))
    }

    pub fn is_response_open(&self) -> bool {
        self.current_response.is_some()
    }

    fn context(&mut self) -> Result<SyncContext<'_>, SyncError> {
        let response = self
            .current_response
            .as_mut()
            .ok_or_else(|| SyncError::protocol("append outside an open response buffer"))?;
        Ok(SyncContext {
            session_id: self.id,
            registry: &mut self.registry,
            models: &self.models,
            factory: &self.factory,
            response,
            inbox: &self.inbox,
            listeners: &self.listeners,
        })
    }

    // === Operations ===

    /// Creates the root adapter, owned by the session itself.
    ///
    /// Requires an open response buffer.
    pub fn create_root_adapter(
        &mut self,
        model: ModelHandle,
        object_type: &str,
    ) -> Result<AdapterId, SyncError> {
        self.ensure_alive()?;
        if let Some(root) = self.root {
            return Err(SyncError::protocol(format!(
                "root adapter {} already exists",
                root
            )));
        }
        let mut ctx = self.context()?;
        let id = lifecycle::get_or_create(&mut ctx, model, Owner::Session, Some(object_type))?;
        pipeline::drain(&mut ctx)?;
        self.root = Some(id);
        Ok(id)
    }

    /// Appends a session-level event (e.g. `reloadPage`, `localeChanged`).
    ///
    /// Requires an open response buffer.
    pub fn send_session_event(&mut self, name: &str, payload: JsonValue) -> Result<(), SyncError> {
        let response = self
            .current_response
            .as_mut()
            .ok_or_else(|| SyncError::protocol("session event outside an open response buffer"))?;
        response.append(OutboundMessage::event(AdapterId::SESSION, name, payload));
        Ok(())
    }

    /// Builds the first response: the root adapter tree plus `initialized`.
    pub fn startup(
        &mut self,
        root_model: ModelHandle,
        object_type: &str,
    ) -> Result<ResponsePayload, SyncError> {
        self.open_response()?;
        let root = match self.start_root(root_model, object_type) {
            Ok(root) => root,
            Err(err) => {
                self.current_response = None;
                if err.is_fatal() {
                    self.terminate(&err);
                }
                return Err(err);
            }
        };
        let messages = self.close_response()?;
        let payload = ResponsePayload::new(self.next_sequence_no(), messages);
        self.history.record(None, payload.clone());

        info!(session_id = %self.id, root_adapter_id = %root, "Session started");
        Ok(payload)
    }

    fn start_root(
        &mut self,
        root_model: ModelHandle,
        object_type: &str,
    ) -> Result<AdapterId, SyncError> {
        let root = self.create_root_adapter(root_model, object_type)?;
        self.send_session_event(INITIALIZED_EVENT, json!({ "rootAdapterId": root }))?;
        Ok(root)
    }

    /// Processes one inbound batch and returns the outbound messages.
    ///
    /// Non-fatal event failures become `error` messages and later events
    /// still run. A fatal error terminates the session and is returned.
    pub fn process_batch(
        &mut self,
        events: Vec<ClientEvent>,
    ) -> Result<Vec<OutboundMessage>, SyncError> {
        self.ensure_alive()?;
        self.touch();
        match self.run_batch(&events) {
            Ok(messages) => {
                if self.dispose_requested {
                    self.dispose();
                }
                Ok(messages)
            }
            Err(err) => {
                self.terminate(&err);
                Err(err)
            }
        }
    }

    fn run_batch(&mut self, events: &[ClientEvent]) -> Result<Vec<OutboundMessage>, SyncError> {
        self.status = self.status.transition_to(SessionStatus::Processing)?;
        self.open_response()?;
        debug!(session_id = %self.id, events = events.len(), "Processing batch");

        // Changes made between batches are synchronized first.
        self.drain()?;
        for event in events {
            if let Err(err) = self.dispatch_one(event) {
                if err.is_fatal() {
                    return Err(err);
                }
                self.record_failure(event, &err)?;
            }
            self.drain()?;
        }

        let messages = self.close_response()?;
        self.status = self.status.transition_to(SessionStatus::Idle)?;
        Ok(messages)
    }

    /// Processes a full request: acknowledgement, retry lookup, size limit,
    /// then the batch itself.
    ///
    /// Never fails: fatal conditions yield a `sessionTerminated` response.
    pub fn process_request(&mut self, request: InboundRequest) -> ResponsePayload {
        if self.is_disposed() {
            return ResponsePayload::terminated(self.next_sequence_no(), ErrorCode::SessionDisposed);
        }
        if let Some(ack) = request.ack_sequence_no {
            self.history.confirm(ack);
        }
        if let Some(sequence_no) = request.sequence_no {
            if let Some(previous) = self.history.lookup(sequence_no) {
                debug!(
                    session_id = %self.id,
                    request_sequence_no = sequence_no,
                    "Request already processed, resending response"
                );
                return previous.clone();
            }
        }

        let max = self.limits.max_events_per_batch;
        if request.events.len() > max {
            warn!(
                session_id = %self.id,
                events = request.events.len(),
                max,
                "Batch rejected, too many events"
            );
            let payload = ResponsePayload::rejected(
                self.next_sequence_no(),
                ErrorCode::BatchTooLarge,
                format!(
                    "Batch of {} events exceeds the limit of {}",
                    request.events.len(),
                    max
                ),
            );
            self.history.record(request.sequence_no, payload.clone());
            return payload;
        }

        match self.process_batch(request.events) {
            Ok(messages) => {
                let mut payload = ResponsePayload::new(self.next_sequence_no(), messages);
                payload.session_terminated = self.is_disposed();
                self.history.record(request.sequence_no, payload.clone());
                payload
            }
            Err(err) => ResponsePayload::terminated(self.next_sequence_no(), err.code()),
        }
    }

    /// Disposes every adapter and ends the session. Idempotent.
    ///
    /// While a batch is processing the teardown is deferred until the
    /// batch's response has been closed.
    pub fn dispose(&mut self) {
        match self.status {
            SessionStatus::Disposed => {}
            SessionStatus::Processing => {
                debug!(session_id = %self.id, "Dispose deferred until batch completes");
                self.dispose_requested = true;
            }
            SessionStatus::Idle => self.teardown(),
        }
    }

    /// Tears the session down immediately, even mid-batch.
    ///
    /// Used when processing was abandoned and the batch will never close.
    pub fn force_terminate(&mut self) {
        if !self.is_disposed() {
            self.teardown();
        }
    }

    // === Internals ===

    fn ensure_alive(&self) -> Result<(), SyncError> {
        if self.is_disposed() {
            Err(SyncError::SessionDisposed(self.id))
        } else {
            Ok(())
        }
    }

    fn next_sequence_no(&mut self) -> u64 {
        self.last_sequence_no += 1;
        self.last_sequence_no
    }

    fn drain(&mut self) -> Result<(), SyncError> {
        let mut ctx = self.context()?;
        pipeline::drain(&mut ctx)
    }

    fn dispatch_one(&mut self, event: &ClientEvent) -> Result<(), SyncError> {
        if event.adapter_id == AdapterId::SESSION {
            return self.handle_session_event(event);
        }
        dispatcher::dispatch(&mut self.models, &mut self.registry, event)
    }

    fn handle_session_event(&mut self, event: &ClientEvent) -> Result<(), SyncError> {
        match event.name.as_str() {
            UNLOAD_EVENT => {
                self.dispose_requested = true;
                Ok(())
            }
            other => Err(SyncError::UnknownEvent {
                object_type: SESSION_OBJECT_TYPE.to_string(),
                event: other.to_string(),
            }),
        }
    }

    fn record_failure(&mut self, event: &ClientEvent, err: &SyncError) -> Result<(), SyncError> {
        if let SyncError::AdapterNotFound(id) = err {
            warn!(
                session_id = %self.id,
                adapter_id = %id,
                event = %event.name,
                "Event for unknown or disposed adapter dropped"
            );
            return Ok(());
        }

        warn!(
            session_id = %self.id,
            adapter_id = %event.adapter_id,
            event = %event.name,
            code = %err.code(),
            error = %err,
            "Client event failed"
        );
        let message = match err {
            SyncError::Facade(facade) => facade.message.clone(),
            other => other.to_string(),
        };
        let response = self
            .current_response
            .as_mut()
            .ok_or_else(|| SyncError::protocol("event failure outside an open response buffer"))?;
        response.append(OutboundMessage::error(
            event.adapter_id,
            event.name.clone(),
            err.code(),
            message,
        ));
        Ok(())
    }

    fn terminate(&mut self, err: &SyncError) {
        error!(
            session_id = %self.id,
            code = %err.code(),
            error = %err,
            "Session terminated"
        );
        self.teardown();
    }

    fn teardown(&mut self) {
        let root = self.root.take();
        let mut scratch = ResponseBuffer::new();
        let mut ctx = SyncContext {
            session_id: self.id,
            registry: &mut self.registry,
            models: &self.models,
            factory: &self.factory,
            response: &mut scratch,
            inbox: &self.inbox,
            listeners: &self.listeners,
        };
        if let Some(root) = root {
            lifecycle::release(&mut ctx, root, Owner::Session);
        }

        let leaked = ctx.registry.ids();
        if !leaked.is_empty() {
            warn!(
                session_id = %self.id,
                count = leaked.len(),
                "Adapters still registered after dispose, forcing disposal"
            );
            for id in leaked {
                lifecycle::dispose(&mut ctx, id);
            }
        }

        self.inbox.clear();
        self.current_response = None;
        self.dispose_requested = false;
        self.status = SessionStatus::Disposed;

        info!(session_id = %self.id, "Session disposed");
        for listener in &self.listeners {
            listener.on_session_disposed(self.id);
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("status", &self.status)
            .field("root", &self.root)
            .field("adapters", &self.registry.len())
            .field("last_sequence_no", &self.last_sequence_no)
            .finish()
    }
}
