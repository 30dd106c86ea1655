//! SessionStore - Registry of live sessions.
//!
//! Maps session ids to [`SessionHandle`]s so many sessions can be served
//! concurrently. Sessions are independent; the store lock is only held to
//! look handles up, never while a session processes a batch.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::info;

use crate::config::SessionConfig;
use crate::domain::foundation::{SessionId, Timestamp};
use crate::domain::sync::{ResponsePayload, Session, SessionLimits};

use super::session_handle::SessionHandle;

/// Concurrent map of live sessions with idle eviction.
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
    idle_timeout: Duration,
    poll_wait: Duration,
    limits: SessionLimits,
}

impl SessionStore {
    /// Store with the given idle timeout and default session settings.
    pub fn new(idle_timeout: Duration) -> Self {
        let defaults = SessionConfig::default();
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout,
            poll_wait: defaults.poll_wait(),
            limits: defaults.limits(),
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout: config.idle_timeout(),
            poll_wait: config.poll_wait(),
            limits: config.limits(),
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    pub fn poll_wait(&self) -> Duration {
        self.poll_wait
    }

    /// Limits applied to sessions opened through this store.
    pub fn limits(&self) -> SessionLimits {
        self.limits
    }

    /// Applies the configured limits to `session` and registers it.
    pub async fn open(&self, session: Session) -> SessionHandle {
        let handle = SessionHandle::new(session.with_limits(self.limits));
        self.register(handle.clone()).await;
        handle
    }

    /// Adds a session and returns its id.
    pub async fn register(&self, handle: SessionHandle) -> SessionId {
        let id = handle.id();
        self.sessions.write().await.insert(id, handle);
        id
    }

    pub async fn get(&self, id: &SessionId) -> Option<SessionHandle> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Long-polls a session with the configured wait.
    ///
    /// Returns `None` for unknown sessions.
    pub async fn poll(&self, id: &SessionId) -> Option<ResponsePayload> {
        let handle = self.get(id).await?;
        Some(handle.poll(self.poll_wait).await)
    }

    /// Removes a session from the store and disposes it.
    pub async fn remove(&self, id: &SessionId) -> Option<SessionHandle> {
        let handle = self.sessions.write().await.remove(id)?;
        handle.dispose_async().await;
        Some(handle)
    }

    /// Disposes and removes every session idle longer than the timeout.
    ///
    /// Sessions already disposed are removed as well.
    pub async fn evict_idle(&self) -> Vec<SessionId> {
        let cutoff = Timestamp::now().minus(self.idle_timeout);
        self.evict_idle_before(cutoff).await
    }

    /// Disposes and removes every session last accessed before `cutoff`.
    ///
    /// Session locks are only taken outside the store lock, so a session busy
    /// with a batch delays its own eviction check and nothing else.
    pub async fn evict_idle_before(&self, cutoff: Timestamp) -> Vec<SessionId> {
        let candidates: Vec<SessionHandle> = self.sessions.read().await.values().cloned().collect();

        let mut expired = Vec::new();
        for handle in candidates {
            let idle = match handle.last_accessed_async().await {
                Some(accessed) => accessed.is_before(&cutoff),
                None => true,
            };
            if idle || handle.is_disposed_async().await {
                expired.push(handle);
            }
        }

        let removed: Vec<SessionHandle> = {
            let mut sessions = self.sessions.write().await;
            expired
                .into_iter()
                .filter_map(|handle| sessions.remove(&handle.id()))
                .collect()
        };
        for handle in &removed {
            handle.dispose_async().await;
        }

        let ids: Vec<SessionId> = removed.iter().map(SessionHandle::id).collect();
        if !ids.is_empty() {
            info!(count = ids.len(), "Evicted idle sessions");
        }
        ids
    }

    /// Disposes every session, e.g. on shutdown.
    pub async fn dispose_all(&self) {
        let drained: Vec<SessionHandle> = self
            .sessions
            .write()
            .await
            .drain()
            .map(|(_, handle)| handle)
            .collect();
        for handle in drained {
            handle.dispose_async().await;
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
