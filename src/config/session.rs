//! Session configuration

use serde::Deserialize;
use std::time::Duration;

use crate::domain::sync::SessionLimits;

use super::error::ValidationError;

/// Session configuration
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SessionConfig {
    /// Longest time a poll request waits for background results
    #[serde(default = "default_poll_wait")]
    pub poll_wait_secs: u64,

    /// Unacknowledged responses kept per session for client retries
    #[serde(default = "default_response_history_size")]
    pub response_history_size: usize,

    /// Largest accepted inbound batch
    #[serde(default = "default_max_events_per_batch")]
    pub max_events_per_batch: usize,

    /// Sessions idle longer than this are evicted
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl SessionConfig {
    /// Limits applied to every session
    pub fn limits(&self) -> SessionLimits {
        SessionLimits {
            response_history_size: self.response_history_size,
            max_events_per_batch: self.max_events_per_batch,
        }
    }

    pub fn poll_wait(&self) -> Duration {
        Duration::from_secs(self.poll_wait_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Validate session configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.poll_wait_secs == 0 || self.poll_wait_secs > 300 {
            return Err(ValidationError::InvalidPollWait);
        }
        if self.response_history_size == 0 {
            return Err(ValidationError::InvalidHistorySize);
        }
        if self.max_events_per_batch == 0 {
            return Err(ValidationError::InvalidBatchLimit);
        }
        if self.idle_timeout_secs == 0 {
            return Err(ValidationError::InvalidIdleTimeout);
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_wait_secs: default_poll_wait(),
            response_history_size: default_response_history_size(),
            max_events_per_batch: default_max_events_per_batch(),
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

fn default_poll_wait() -> u64 {
    60
}

fn default_response_history_size() -> usize {
    10
}

fn default_max_events_per_batch() -> usize {
    1000
}

fn default_idle_timeout() -> u64 {
    1800
}
