//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and implement
//! [`Default`] with production values. `#[serde(default)]` lets a user file
//! set only the fields it cares about.

mod tools;

pub use tools::*;

use std::path::PathBuf;

use costline_core::constants::DEFAULT_MAX_CHECKPOINTS;
use serde::{Deserialize, Serialize};

use crate::loader::costline_home;

/// Root settings type.
///
/// # JSON Format
///
/// ```json
/// {
///   "storage": { "stateDir": "/var/lib/costline" },
///   "ledger": { "maxCheckpoints": 500 },
///   "tools": { "externalCallPrefix": "ext__" }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CostlineSettings {
    /// Where session records live and how saves retry.
    pub storage: StorageSettings,
    /// Checkpoint ledger limits.
    pub ledger: LedgerSettings,
    /// How tool names map to contexts.
    pub tools: ToolSettings,
    /// Log verbosity.
    pub logging: LoggingSettings,
    /// Activity indicator windows.
    pub activity: ActivitySettings,
}

impl CostlineSettings {
    /// Resolved directory for session records.
    ///
    /// Relative paths are taken from `~/.costline`.
    #[must_use]
    pub fn state_dir(&self) -> PathBuf {
        let dir = PathBuf::from(&self.storage.state_dir);
        if dir.is_absolute() {
            dir
        } else {
            costline_home().join(dir)
        }
    }
}

/// Session record storage.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageSettings {
    /// Directory for `<session>.state.json` files (relative to `~/.costline`).
    pub state_dir: String,
    /// Load-mutate-save attempts before a conflicting write is abandoned.
    pub max_save_attempts: u32,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            state_dir: "sessions".to_string(),
            max_save_attempts: 3,
        }
    }
}

/// Checkpoint ledger limits.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LedgerSettings {
    /// Checkpoints retained per session; the oldest are evicted first.
    pub max_checkpoints: usize,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            max_checkpoints: DEFAULT_MAX_CHECKPOINTS,
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Minimum level written to stderr (`RUST_LOG` wins when set).
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

/// Windows for the activity indicator.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActivitySettings {
    /// Updates younger than this are `active`.
    pub active_window_ms: u64,
    /// Updates younger than this (but not active) are `recent`.
    pub recent_window_ms: u64,
}

impl Default for ActivitySettings {
    fn default() -> Self {
        Self {
            active_window_ms: 2000,
            recent_window_ms: 10_000,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
