//! SessionStatus enum for tracking the processing state of a session.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::SyncError;

/// Processing state of a session.
///
/// `Idle → Processing → Idle` per inbound batch; `Disposed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Idle,
    Processing,
    Disposed,
}

impl SessionStatus {
    /// Returns true if a new batch may start.
    pub fn accepts_batches(&self) -> bool {
        matches!(self, SessionStatus::Idle)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Disposed)
    }

    /// Returns true if moving from `self` to `target` is allowed.
    pub fn can_transition_to(&self, target: SessionStatus) -> bool {
        use SessionStatus::*;
        matches!(
            (self, target),
            (Idle, Processing) | (Processing, Idle) | (Idle, Disposed) | (Processing, Disposed)
        )
    }

    /// Validated transition; a batch nested inside another is rejected here.
    pub fn transition_to(&self, target: SessionStatus) -> Result<SessionStatus, SyncError> {
        if self.can_transition_to(target) {
            Ok(target)
        } else {
            Err(SyncError::InvalidTransition {
                from: self.to_string(),
                to: target.to_string(),
            })
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::Idle => "Idle",
            SessionStatus::Processing => "Processing",
            SessionStatus::Disposed => "Disposed",
        };
        write!(f, "{}", s)
    }
}
