//! Runtime configuration.
//!
//! ```
//! use async_runtime::{RejectionCheckTiming, RuntimeConfig, Scheduling};
//!
//! let config = RuntimeConfig::from_json(r#"{ "rejection_check": "same_tick" }"#).unwrap();
//! assert_eq!(config.rejection_check, RejectionCheckTiming::SameTick);
//! assert_eq!(config.scheduling, Scheduling::Microtask);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::RuntimeError;

/// When the unhandled-rejection check runs after a rejection was drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionCheckTiming {
    /// In a later host task, so handlers attached by any microtask of the
    /// current turn still count (browser-like)
    #[default]
    NextTask,
    /// At the end of the current microtask drain, once the queue is empty (process-like)
    SameTick,
}

/// How the bundled [`EventLoop`](crate::EventLoop) schedules microtask flushes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scheduling {
    /// Flush at the checkpoint after the current task
    #[default]
    Microtask,
    /// Decline checkpoints; flushes run as ordinary tasks
    Macrotask,
}

/// Configuration shared by a [`Runtime`](crate::Runtime) and its host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Timing of the unhandled-rejection check
    pub rejection_check: RejectionCheckTiming,
    /// Flush scheduling used by the bundled event loop
    pub scheduling: Scheduling,
}

impl RuntimeConfig {
    /// Parses a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, RuntimeError> {
        serde_json::from_str(json).map_err(|e| RuntimeError::InvalidConfig(e.to_string()))
    }

    /// Serializes the configuration to JSON.
    pub fn to_json(&self) -> Result<String, RuntimeError> {
        serde_json::to_string_pretty(self).map_err(|e| RuntimeError::InvalidConfig(e.to_string()))
    }
}
