//! Service configuration.

use costline_core::constants::DEFAULT_MAX_CHECKPOINTS;
use costline_settings::{CostlineSettings, ToolSettings};

/// The slice of settings the attribution service needs.
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    /// Tool-name classification.
    pub tools: ToolSettings,
    /// Checkpoints retained per session.
    pub max_checkpoints: usize,
    /// Load-mutate-save attempts before a conflicting write is abandoned.
    pub max_save_attempts: u32,
    /// Activity window for `active`.
    pub active_window_ms: u64,
    /// Activity window for `recent`.
    pub recent_window_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            tools: ToolSettings::default(),
            max_checkpoints: DEFAULT_MAX_CHECKPOINTS,
            max_save_attempts: 3,
            active_window_ms: 2000,
            recent_window_ms: 10_000,
        }
    }
}

impl From<&CostlineSettings> for ServiceConfig {
    fn from(settings: &CostlineSettings) -> Self {
        Self {
            tools: settings.tools.clone(),
            max_checkpoints: settings.ledger.max_checkpoints,
            max_save_attempts: settings.storage.max_save_attempts.max(1),
            active_window_ms: settings.activity.active_window_ms,
            recent_window_ms: settings.activity.recent_window_ms,
        }
    }
}
