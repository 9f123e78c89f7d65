//! Persisted per-session record.
//!
//! [`SessionState`] is what the store reads and writes. Tracker and ledger
//! fields are flattened so the JSON document is one flat object:
//!
//! ```json
//! {
//!   "schemaVersion": 1,
//!   "sessionId": "abc",
//!   "currentContext": "subagent",
//!   "subagentDepth": 1,
//!   "activeSubagentLabel": "reviewer",
//!   "lastObservedCost": 1.0,
//!   "checkpoints": [ ... ],
//!   "attributedTotals": { "primary": 1.0, "subagent": 0.0, "directExternalCall": 0.0 },
//!   "revision": 4,
//!   "lastUpdatedMs": 1760000000000
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::constants::SCHEMA_VERSION;
use crate::context::ContextTotals;
use crate::ids::SessionId;
use crate::ledger::CheckpointLedger;
use crate::tracker::ContextTracker;

/// Durable state of one agent session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    /// Record layout version; see [`SCHEMA_VERSION`].
    pub schema_version: u32,
    /// Session this record belongs to.
    pub session_id: SessionId,
    /// Context-tracking fields.
    #[serde(flatten)]
    pub tracker: ContextTracker,
    /// Checkpoint ledger.
    #[serde(flatten)]
    pub ledger: CheckpointLedger,
    /// Cached result of the last [`CheckpointLedger::recompute`]. Never authoritative.
    #[serde(default)]
    pub attributed_totals: ContextTotals,
    /// Number of successful saves; used to detect lost updates.
    #[serde(default)]
    pub revision: u64,
    /// When the record was last mutated (Unix epoch milliseconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_ms: Option<i64>,
}

impl SessionState {
    /// A fresh session: primary context, empty ledger, revision 0.
    #[must_use]
    pub fn new(session_id: SessionId) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            session_id,
            tracker: ContextTracker::new(),
            ledger: CheckpointLedger::new(),
            attributed_totals: ContextTotals::default(),
            revision: 0,
            last_updated_ms: None,
        }
    }

    /// Record a cost observation against the current context and refresh the
    /// cached totals. Returns `false` if the observation was stale.
    pub fn observe(&mut self, cumulative_cost: f64, timestamp_ms: i64, capacity: usize) -> bool {
        let snapshot = self.tracker.snapshot();
        if !self
            .ledger
            .record_observation(cumulative_cost, snapshot, timestamp_ms, capacity)
        {
            return false;
        }
        self.attributed_totals = self.ledger.recompute();
        true
    }

    /// Whether this record was written with the current schema.
    #[must_use]
    pub fn is_current_schema(&self) -> bool {
        self.schema_version == SCHEMA_VERSION
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
