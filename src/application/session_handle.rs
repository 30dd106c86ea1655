//! SessionHandle - Shared, thread-safe entry point to one session.
//!
//! Wraps a [`Session`] in its [`SessionLock`] and adds the parts that live
//! outside the lock: background jobs and the synthetic event queue they
//! feed. Handles are cheap to clone; all clones address the same session.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::json;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, warn};

use crate::domain::foundation::{AdapterId, ErrorCode, SessionId, Timestamp};
use crate::domain::sync::{ClientEvent, InboundRequest, ResponsePayload, Session};
use crate::ports::ModelJob;

use super::session_lock::SessionLock;

struct Shared {
    id: SessionId,
    lock: SessionLock,
    synthetic: Mutex<VecDeque<ClientEvent>>,
    ready: Notify,
    /// Set once the session is known to be gone; read without the session lock.
    closed: AtomicBool,
}

/// Cloneable handle to one session.
#[derive(Clone)]
pub struct SessionHandle {
    shared: Arc<Shared>,
}

impl SessionHandle {
    pub fn new(session: Session) -> Self {
        Self {
            shared: Arc::new(Shared {
                id: session.id(),
                lock: SessionLock::new(session),
                synthetic: Mutex::new(VecDeque::new()),
                ready: Notify::new(),
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn id(&self) -> SessionId {
        self.shared.id
    }

    /// Runs one client round trip under the session lock.
    ///
    /// Never fails; fatal conditions come back as a terminated response.
    ///
    /// Blocks on the session lock; async callers go through
    /// [`SessionHandle::process_request_async`].
    pub fn process_request(&self, request: InboundRequest) -> ResponsePayload {
        let response = self.shared.lock.lock().process_request(request);
        if response.session_terminated {
            self.mark_closed();
        }
        response
    }

    /// Runs [`SessionHandle::process_request`] on the blocking pool.
    pub async fn process_request_async(&self, request: InboundRequest) -> ResponsePayload {
        let handle = self.clone();
        match tokio::task::spawn_blocking(move || handle.process_request(request)).await {
            Ok(response) => response,
            Err(err) => {
                error!(session_id = %self.id(), error = %err, "Request processing aborted");
                self.mark_closed();
                ResponsePayload::terminated(0, ErrorCode::InternalError)
            }
        }
    }

    /// Runs `f` with exclusive access to the session.
    ///
    /// `f` must not call back into this handle.
    pub fn with_session<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        let mut guard = self.shared.lock.lock();
        let result = f(&mut guard);
        if guard.is_disposed() {
            drop(guard);
            self.mark_closed();
        }
        result
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.lock.lock().is_disposed()
    }

    pub fn last_accessed(&self) -> Timestamp {
        self.shared.lock.lock().last_accessed()
    }

    /// Disposes the session. Idempotent.
    pub fn dispose(&self) {
        self.shared.lock.lock().dispose();
        self.synthetic().clear();
        self.mark_closed();
    }

    /// Disposes the session from async code without blocking the runtime.
    pub async fn dispose_async(&self) {
        let handle = self.clone();
        if let Err(err) = tokio::task::spawn_blocking(move || handle.dispose()).await {
            error!(session_id = %self.id(), error = %err, "Session dispose aborted");
        }
    }

    /// Like [`SessionHandle::is_disposed`], without blocking the runtime.
    pub async fn is_disposed_async(&self) -> bool {
        if self.is_closed() {
            return true;
        }
        let handle = self.clone();
        tokio::task::spawn_blocking(move || handle.is_disposed())
            .await
            .unwrap_or(true)
    }

    /// Like [`SessionHandle::last_accessed`], without blocking the runtime.
    pub async fn last_accessed_async(&self) -> Option<Timestamp> {
        let handle = self.clone();
        tokio::task::spawn_blocking(move || handle.last_accessed())
            .await
            .ok()
    }

    fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    fn mark_closed(&self) {
        self.shared.closed.store(true, Ordering::Release);
        // Wake pollers so they observe the disposal.
        self.shared.ready.notify_waiters();
    }

    // === Background work ===

    /// Queues an event to be processed by the next [`SessionHandle::poll`].
    pub fn submit_synthetic(&self, event: ClientEvent) {
        self.synthetic().push_back(event);
        self.shared.ready.notify_one();
    }

    /// Number of synthetic events awaiting a poll.
    pub fn pending_synthetic(&self) -> usize {
        self.synthetic().len()
    }

    /// Runs `job` on the tokio runtime, outside the session lock.
    ///
    /// The outcome is delivered to `target` as a synthetic event named after
    /// the job, with payload `{"ok": value}` or `{"error": message}`.
    pub fn schedule_job(&self, target: AdapterId, job: Box<dyn ModelJob>) -> JoinHandle<()> {
        let handle = self.clone();
        tokio::spawn(async move {
            let name = job.name().to_string();
            let payload = match job.run().await {
                Ok(value) => json!({ "ok": value }),
                Err(err) => {
                    warn!(
                        session_id = %handle.id(),
                        adapter_id = %target,
                        job = %name,
                        error = %err,
                        "Background job failed"
                    );
                    json!({ "error": err.message })
                }
            };
            debug!(session_id = %handle.id(), adapter_id = %target, job = %name, "Job completed");
            handle.submit_synthetic(ClientEvent::new(target, name, payload));
        })
    }

    /// Waits up to `wait` for synthetic events, then processes whatever is
    /// queued as one batch.
    ///
    /// An empty batch still synchronizes model changes made since the last
    /// request.
    pub async fn poll(&self, wait: Duration) -> ResponsePayload {
        let deadline = Instant::now() + wait;
        loop {
            let notified = self.shared.ready.notified();
            tokio::pin!(notified);
            // Register before checking the queue so no wakeup is missed.
            notified.as_mut().enable();
            if self.pending_synthetic() > 0 || self.is_closed() {
                break;
            }
            // A stale permit wakes us with an empty queue; check again.
            if timeout_at(deadline, notified).await.is_err() {
                break;
            }
        }
        let events: Vec<ClientEvent> = self.synthetic().drain(..).collect();
        self.process_request_async(InboundRequest::new(events)).await
    }

    fn synthetic(&self) -> MutexGuard<'_, VecDeque<ClientEvent>> {
        self.shared
            .synthetic
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.shared.id)
            .field("pending_synthetic", &self.pending_synthetic())
            .finish()
    }
}
