//! Per-session lock.
//!
//! Serializes every operation on one session. The lock is non-reentrant:
//! a facade or listener that calls back into its own session while a batch
//! is running would deadlock, so debug builds panic on same-thread
//! re-acquisition instead.
//!
//! A poisoned lock means a panic unwound through the session mid-batch.
//! The session is recovered, disposed, and answers every later request
//! with a termination response.

use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use tracing::error;

use crate::domain::sync::Session;

/// Exclusive access to one [`Session`].
pub struct SessionLock {
    session: Mutex<Session>,
    holder: Mutex<Option<ThreadId>>,
}

impl SessionLock {
    pub fn new(session: Session) -> Self {
        Self {
            session: Mutex::new(session),
            holder: Mutex::new(None),
        }
    }

    /// Blocks until the session is free.
    ///
    /// # Panics
    ///
    /// In debug builds, panics if the calling thread already holds the lock.
    pub fn lock(&self) -> SessionGuard<'_> {
        if cfg!(debug_assertions) && *self.holder() == Some(thread::current().id()) {
            panic!("session lock re-entered on the thread that holds it");
        }

        let session = match self.session.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                let mut guard = poisoned.into_inner();
                if !guard.is_disposed() {
                    error!(
                        session_id = %guard.id(),
                        "Session lock poisoned, terminating session"
                    );
                    // The panic may have left a batch half-applied.
                    guard.force_terminate();
                }
                guard
            }
        };
        *self.holder() = Some(thread::current().id());

        SessionGuard {
            session,
            holder: &self.holder,
        }
    }

    /// True while some thread holds the lock.
    pub fn is_locked(&self) -> bool {
        self.holder().is_some()
    }

    fn holder(&self) -> MutexGuard<'_, Option<ThreadId>> {
        self.holder.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Held access to a session; releases the lock on drop.
pub struct SessionGuard<'a> {
    session: MutexGuard<'a, Session>,
    holder: &'a Mutex<Option<ThreadId>>,
}

impl Deref for SessionGuard<'_> {
    type Target = Session;

    fn deref(&self) -> &Session {
        &self.session
    }
}

impl DerefMut for SessionGuard<'_> {
    fn deref_mut(&mut self) -> &mut Session {
        &mut self.session
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        *self.holder.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
