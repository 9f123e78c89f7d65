//! Breakdown payload returned to the status display.
//!
//! The renderer owns formatting, percentages, and icons. This type only
//! carries numbers and the live context.

use serde::{Deserialize, Serialize};

use crate::context::{ContextKind, ContextTotals};
use crate::state::SessionState;

/// How recently the session record was touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activity {
    /// Updated within the active window.
    Active,
    /// Updated within the recent window.
    Recent,
    /// Older than the recent window, or never updated.
    #[default]
    Idle,
}

impl Activity {
    /// Classify the age of `last_updated_ms` at `now_ms`.
    #[must_use]
    pub fn classify(
        last_updated_ms: Option<i64>,
        now_ms: i64,
        active_window_ms: u64,
        recent_window_ms: u64,
    ) -> Self {
        let Some(last) = last_updated_ms else {
            return Self::Idle;
        };
        let age = u64::try_from(now_ms.saturating_sub(last)).unwrap_or(0);
        if age < active_window_ms {
            Self::Active
        } else if age < recent_window_ms {
            Self::Recent
        } else {
            Self::Idle
        }
    }
}

/// Per-context cost totals plus the live context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakdown {
    /// Cumulative cost as reported by the host on this tick.
    pub total: f64,
    /// Cost attributed to the primary agent.
    pub primary: f64,
    /// Cost attributed to sub-agents.
    pub subagent: f64,
    /// Cost attributed to direct external calls.
    pub direct_external_call: f64,
    /// Context active right now.
    pub current_context: ContextKind,
    /// Label of the active sub-agent or external call.
    pub current_label: Option<String>,
    /// When the session record was last mutated.
    pub last_updated_ms: Option<i64>,
    /// Coarse recency of the last mutation.
    pub activity: Activity,
}

impl Breakdown {
    /// Build a breakdown from a session's ledger and live context.
    ///
    /// Attribution is recomputed from the checkpoints; the record's cached
    /// `attributed_totals` is ignored.
    #[must_use]
    pub fn from_state(total: f64, state: &SessionState, activity: Activity) -> Self {
        let ContextTotals {
            primary,
            subagent,
            direct_external_call,
        } = state.ledger.recompute();
        Self {
            total,
            primary,
            subagent,
            direct_external_call,
            current_context: state.tracker.current_context(),
            current_label: state.tracker.current_label().map(str::to_owned),
            last_updated_ms: state.last_updated_ms,
            activity,
        }
    }

    /// Best-effort result when the session could not be read: all-zero
    /// attribution, primary context, `total` passed through.
    #[must_use]
    pub fn fallback(total: f64) -> Self {
        Self {
            total,
            primary: 0.0,
            subagent: 0.0,
            direct_external_call: 0.0,
            current_context: ContextKind::Primary,
            current_label: None,
            last_updated_ms: None,
            activity: Activity::Idle,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
