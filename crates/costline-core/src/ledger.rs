//! Checkpoint ledger and attribution recomputation.
//!
//! The ledger is the only source of cost numbers. Each observation of the
//! host's cumulative cost that exceeds the previous one becomes a
//! [`Checkpoint`] tagged with the context active when it was observed.
//! [`CheckpointLedger::recompute`] rebuilds the full per-context breakdown
//! from the retained checkpoints on every call, so nothing is accumulated
//! incrementally and a reordered or dropped update can never make the cached
//! totals drift from the ledger.
//!
//! # Attribution rule
//!
//! The cost between checkpoints `i-1` and `i` is attributed to the context of
//! checkpoint `i-1`: the context that was running when that slice of work
//! started. The first retained checkpoint's absolute value goes to its own
//! context, since it has no predecessor. Together these make the totals sum
//! to the last cumulative cost, even after old checkpoints are evicted.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::context::{ContextKind, ContextTotals};
use crate::tracker::ContextSnapshot;

/// One cumulative-cost observation and the context active when it arrived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    /// Wall-clock time of the observation (Unix epoch milliseconds).
    pub timestamp_ms: i64,
    /// Cumulative session cost reported by the host (USD).
    pub cumulative_cost: f64,
    /// Context active when the observation arrived.
    pub context_at_time: ContextKind,
    /// Sub-agent label, present only for `Subagent` checkpoints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subagent_label_at_time: Option<String>,
    /// External call identifier, present only for `DirectExternalCall` checkpoints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_call_label_at_time: Option<String>,
}

impl Checkpoint {
    /// Build a checkpoint from a tracker snapshot.
    #[must_use]
    pub fn new(timestamp_ms: i64, cumulative_cost: f64, snapshot: ContextSnapshot) -> Self {
        Self {
            timestamp_ms,
            cumulative_cost,
            context_at_time: snapshot.context,
            subagent_label_at_time: snapshot.subagent_label,
            external_call_label_at_time: snapshot.external_call_label,
        }
    }
}

/// Size-bounded, chronological sequence of checkpoints.
///
/// Serialized flat into the session record alongside the tracker fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckpointLedger {
    /// Last cumulative cost recorded. `None` until the first observation.
    last_observed_cost: Option<f64>,
    checkpoints: VecDeque<Checkpoint>,
}

impl CheckpointLedger {
    /// An empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last cumulative cost recorded, if any.
    #[must_use]
    pub fn last_observed_cost(&self) -> Option<f64> {
        self.last_observed_cost
    }

    /// Whether `cumulative_cost` would be recorded.
    ///
    /// The first finite, non-negative observation is always accepted so the
    /// session's starting context anchors the ledger. After that only strictly
    /// greater values are.
    #[must_use]
    pub fn accepts(&self, cumulative_cost: f64) -> bool {
        if !cumulative_cost.is_finite() || cumulative_cost < 0.0 {
            return false;
        }
        self.last_observed_cost.is_none_or(|last| cumulative_cost > last)
    }

    /// Record an observation against the given context.
    ///
    /// Stale, duplicate, negative, or non-finite values are discarded and
    /// `false` is returned. Otherwise a checkpoint is appended and the oldest
    /// entries are evicted down to `capacity` (at least one is always kept).
    pub fn record_observation(
        &mut self,
        cumulative_cost: f64,
        snapshot: ContextSnapshot,
        timestamp_ms: i64,
        capacity: usize,
    ) -> bool {
        if !self.accepts(cumulative_cost) {
            return false;
        }
        self.checkpoints
            .push_back(Checkpoint::new(timestamp_ms, cumulative_cost, snapshot));
        self.last_observed_cost = Some(cumulative_cost);

        let capacity = capacity.max(1);
        while self.checkpoints.len() > capacity {
            let _ = self.checkpoints.pop_front();
        }
        true
    }

    /// Recompute the per-context breakdown from the retained checkpoints.
    ///
    /// Pure: calling it twice on an unchanged ledger yields identical totals.
    #[must_use]
    pub fn recompute(&self) -> ContextTotals {
        let mut totals = ContextTotals::default();

        let Some(first) = self.checkpoints.front() else {
            return totals;
        };
        if first.cumulative_cost > 0.0 {
            totals.add(first.context_at_time, first.cumulative_cost);
        }

        for (prev, curr) in self.checkpoints.iter().zip(self.checkpoints.iter().skip(1)) {
            let delta = curr.cumulative_cost - prev.cumulative_cost;
            // Cannot happen through record_observation; guards hand-edited records.
            if delta <= 0.0 {
                continue;
            }
            totals.add(prev.context_at_time, delta);
        }
        totals
    }

    /// Number of retained checkpoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    /// Whether no checkpoint has been retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    /// Iterate checkpoints oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Checkpoint> {
        self.checkpoints.iter()
    }

    /// Most recent checkpoint.
    #[must_use]
    pub fn last(&self) -> Option<&Checkpoint> {
        self.checkpoints.back()
    }
}

impl FromIterator<Checkpoint> for CheckpointLedger {
    fn from_iter<I: IntoIterator<Item = Checkpoint>>(iter: I) -> Self {
        let checkpoints: VecDeque<Checkpoint> = iter.into_iter().collect();
        let last_observed_cost = checkpoints.back().map(|c| c.cumulative_cost);
        Self {
            last_observed_cost,
            checkpoints,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(context: ContextKind) -> ContextSnapshot {
        ContextSnapshot {
            context,
            ..ContextSnapshot::default()
        }
    }

    fn cp(cost: f64, context: ContextKind) -> Checkpoint {
        Checkpoint::new(0, cost, snap(context))
    }

    // ── record_observation ──────────────────────────────────────────

    #[test]
    fn first_observation_is_always_recorded() {
        let mut ledger = CheckpointLedger::new();
        assert!(ledger.record_observation(0.0, snap(ContextKind::Primary), 1, 1000));
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.last_observed_cost(), Some(0.0));
    }

    #[test]
    fn stale_and_duplicate_observations_rejected() {
        let mut ledger = CheckpointLedger::new();
        assert!(ledger.record_observation(1.0, snap(ContextKind::Primary), 1, 1000));
        assert!(!ledger.record_observation(1.0, snap(ContextKind::Primary), 2, 1000));
        assert!(!ledger.record_observation(0.5, snap(ContextKind::Primary), 3, 1000));
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.last_observed_cost(), Some(1.0));
    }

    #[test]
    fn invalid_values_rejected() {
        let mut ledger = CheckpointLedger::new();
        assert!(!ledger.record_observation(f64::NAN, snap(ContextKind::Primary), 1, 10));
        assert!(!ledger.record_observation(f64::INFINITY, snap(ContextKind::Primary), 1, 10));
        assert!(!ledger.record_observation(-1.0, snap(ContextKind::Primary), 1, 10));
        assert!(ledger.is_empty());
        assert_eq!(ledger.last_observed_cost(), None);
    }

    #[test]
    fn checkpoint_captures_snapshot_labels() {
        let mut ledger = CheckpointLedger::new();
        let snapshot = ContextSnapshot {
            context: ContextKind::Subagent,
            subagent_label: Some("reviewer".into()),
            external_call_label: None,
        };
        let _ = ledger.record_observation(0.3, snapshot, 42, 10);
        let last = ledger.last().unwrap();
        assert_eq!(last.timestamp_ms, 42);
        assert_eq!(last.context_at_time, ContextKind::Subagent);
        assert_eq!(last.subagent_label_at_time.as_deref(), Some("reviewer"));
        assert_eq!(last.external_call_label_at_time, None);
    }

    #[test]
    fn eviction_drops_oldest() {
        let mut ledger = CheckpointLedger::new();
        for i in 1..=5 {
            let _ =
                ledger.record_observation(f64::from(i), snap(ContextKind::Primary), i64::from(i), 3);
        }
        assert_eq!(ledger.len(), 3);
        let costs: Vec<f64> = ledger.iter().map(|c| c.cumulative_cost).collect();
        assert_eq!(costs, vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn zero_capacity_keeps_one() {
        let mut ledger = CheckpointLedger::new();
        let _ = ledger.record_observation(1.0, snap(ContextKind::Primary), 1, 0);
        let _ = ledger.record_observation(2.0, snap(ContextKind::Primary), 2, 0);
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.last().unwrap().cumulative_cost, 2.0);
    }

    // ── recompute ───────────────────────────────────────────────────

    #[test]
    fn empty_ledger_recomputes_to_zero() {
        assert_eq!(CheckpointLedger::new().recompute(), ContextTotals::default());
    }

    #[test]
    fn delta_goes_to_context_at_start_of_interval() {
        let ledger: CheckpointLedger = vec![
            cp(0.0, ContextKind::Primary),
            cp(1.0, ContextKind::Subagent),
            cp(1.5, ContextKind::Primary),
        ]
        .into_iter()
        .collect();
        let totals = ledger.recompute();
        assert_eq!(totals.primary, 1.0);
        assert_eq!(totals.subagent, 0.5);
        assert_eq!(totals.direct_external_call, 0.0);
    }

    #[test]
    fn first_checkpoint_absolute_value_goes_to_its_context() {
        let ledger: CheckpointLedger = vec![
            cp(2.0, ContextKind::DirectExternalCall),
            cp(3.0, ContextKind::Primary),
        ]
        .into_iter()
        .collect();
        let totals = ledger.recompute();
        assert_eq!(totals.direct_external_call, 3.0);
        assert_eq!(totals.primary, 0.0);
    }

    #[test]
    fn non_positive_deltas_skipped() {
        let ledger: CheckpointLedger = vec![
            cp(1.0, ContextKind::Primary),
            cp(0.5, ContextKind::Subagent),
            cp(2.0, ContextKind::Primary),
        ]
        .into_iter()
        .collect();
        let totals = ledger.recompute();
        assert_eq!(totals.primary, 1.0);
        assert_eq!(totals.subagent, 1.5);
    }

    #[test]
    fn from_iter_sets_last_observed_cost() {
        let ledger: CheckpointLedger =
            vec![cp(1.0, ContextKind::Primary), cp(4.0, ContextKind::Primary)]
                .into_iter()
                .collect();
        assert_eq!(ledger.last_observed_cost(), Some(4.0));
        assert!(!ledger.accepts(4.0));
        assert!(ledger.accepts(4.5));
    }

    #[test]
    fn checkpoint_serde_omits_absent_labels() {
        let json = serde_json::to_value(cp(1.0, ContextKind::Primary)).unwrap();
        assert_eq!(json["cumulativeCost"], 1.0);
        assert_eq!(json["contextAtTime"], "primary");
        assert!(json.get("subagentLabelAtTime").is_none());
    }

    // ── Properties ──────────────────────────────────────────────────

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn context_strategy() -> impl Strategy<Value = ContextKind> {
            prop_oneof![
                Just(ContextKind::Primary),
                Just(ContextKind::Subagent),
                Just(ContextKind::DirectExternalCall),
            ]
        }

        fn build(steps: &[(f64, ContextKind)], capacity: usize) -> CheckpointLedger {
            let mut ledger = CheckpointLedger::new();
            let mut total = 0.0;
            for (i, (increment, context)) in steps.iter().enumerate() {
                total += increment;
                let _ = ledger.record_observation(total, snap(*context), i as i64, capacity);
            }
            ledger
        }

        proptest! {
            #[test]
            fn primary_only_sequences_attribute_everything_to_primary(
                increments in proptest::collection::vec(0.0001f64..10.0, 1..64),
            ) {
                let steps: Vec<_> = increments.iter().map(|i| (*i, ContextKind::Primary)).collect();
                let ledger = build(&steps, 1000);
                let totals = ledger.recompute();
                let last = ledger.last().unwrap().cumulative_cost;
                prop_assert_eq!(totals.subagent, 0.0);
                prop_assert_eq!(totals.direct_external_call, 0.0);
                prop_assert!((totals.primary - last).abs() <= 1e-9 * last.max(1.0));
            }

            #[test]
            fn totals_sum_to_last_cumulative_cost(
                steps in proptest::collection::vec((0.0001f64..10.0, context_strategy()), 1..128),
                capacity in 1usize..64,
            ) {
                let ledger = build(&steps, capacity);
                let totals = ledger.recompute();
                let last = ledger.last().unwrap().cumulative_cost;
                prop_assert!((totals.sum() - last).abs() <= 1e-9 * last.max(1.0));
            }

            #[test]
            fn recompute_is_idempotent(
                steps in proptest::collection::vec((0.0001f64..10.0, context_strategy()), 0..64),
            ) {
                let ledger = build(&steps, 1000);
                let a = ledger.recompute();
                let b = ledger.recompute();
                prop_assert_eq!(a.primary.to_bits(), b.primary.to_bits());
                prop_assert_eq!(a.subagent.to_bits(), b.subagent.to_bits());
                prop_assert_eq!(a.direct_external_call.to_bits(), b.direct_external_call.to_bits());
            }
        }
    }
}
