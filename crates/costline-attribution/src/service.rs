//! The attribution façade.
//!
//! Each public operation is one load → mutate → save cycle. Saves are
//! optimistic: a [`StoreError::Conflict`] means another process saved first,
//! so the cycle is replayed against the fresh record, up to
//! [`ServiceConfig::max_save_attempts`] times.

use std::sync::Arc;

use costline_core::{Activity, Breakdown, Clock, SessionId, SessionState, SystemClock};
use costline_store::{StateStore, StoreError};
use tracing::{debug, instrument, warn};

use crate::config::ServiceConfig;
use crate::tools::ToolKind;

/// Result of one load → mutate → save cycle.
struct Applied {
    /// State after the mutation (persisted unless the write was abandoned).
    state: SessionState,
    /// `last_updated_ms` as loaded, before this cycle stamped it.
    previous_update_ms: Option<i64>,
    /// The load failed and `state` is a stand-in fresh record.
    degraded: bool,
}

/// Routes context events and cost observations into per-session state.
///
/// Cheap to construct; every call reads and writes through the store, so
/// any number of services (in any number of processes) may share one store.
pub struct AttributionService {
    store: Arc<dyn StateStore>,
    clock: Arc<dyn Clock>,
    config: ServiceConfig,
}

impl AttributionService {
    /// Service over `store` using the system clock.
    pub fn new(store: Arc<dyn StateStore>, config: ServiceConfig) -> Self {
        Self::with_clock(store, Arc::new(SystemClock), config)
    }

    /// Service with an explicit clock.
    pub fn with_clock(
        store: Arc<dyn StateStore>,
        clock: Arc<dyn Clock>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    // ── Context events ──────────────────────────────────────────────

    /// A tool started. Sub-agent and external-call tools open a context;
    /// other tools are ignored.
    #[instrument(skip(self, session_id), fields(session_id = %session_id))]
    pub fn on_tool_start(&self, session_id: &SessionId, tool: &ToolKind) {
        let Some(kind) = tool.context() else {
            return;
        };
        let label = tool.label();
        let _ = self.update(session_id, |state, _| state.tracker.enter(kind, label));
    }

    /// A tool finished. Closes the matching context, if one is open.
    #[instrument(skip(self, session_id), fields(session_id = %session_id))]
    pub fn on_tool_end(&self, session_id: &SessionId, tool: &ToolKind) {
        let Some(kind) = tool.context() else {
            return;
        };
        let label = tool.label();
        let _ = self.update(session_id, |state, _| state.tracker.exit(kind, label));
    }

    /// A sub-agent terminated. Resets to the primary context regardless of
    /// depth, recovering from lost tool-end events.
    #[instrument(skip(self, session_id), fields(session_id = %session_id))]
    pub fn on_subagent_stop(&self, session_id: &SessionId) {
        let _ = self.update(session_id, |state, _| state.tracker.force_reset());
    }

    // ── Cost observations ───────────────────────────────────────────

    /// Record a cumulative-cost observation and return the breakdown.
    ///
    /// A stale figure (not above the last recorded one) writes nothing but
    /// still reports the persisted attribution and the live context. `total`
    /// is always `cumulative_cost` as given. If the session could not be
    /// loaded the result is [`Breakdown::fallback`].
    #[instrument(skip(self, session_id), fields(session_id = %session_id))]
    pub fn observe_cost(&self, session_id: &SessionId, cumulative_cost: f64) -> Breakdown {
        let capacity = self.config.max_checkpoints;
        let applied = self.update(session_id, |state, now_ms| {
            state.observe(cumulative_cost, now_ms, capacity)
        });
        if applied.degraded {
            return Breakdown::fallback(cumulative_cost);
        }

        let activity = Activity::classify(
            applied.previous_update_ms,
            self.clock.now_ms(),
            self.config.active_window_ms,
            self.config.recent_window_ms,
        );
        let mut breakdown = Breakdown::from_state(cumulative_cost, &applied.state, activity);
        breakdown.last_updated_ms = applied.previous_update_ms;
        breakdown
    }

    // ── Inspection ──────────────────────────────────────────────────

    /// Current persisted state, or a fresh record if it cannot be read.
    pub fn snapshot(&self, session_id: &SessionId) -> SessionState {
        self.load_or_fresh(session_id).0
    }

    // ── Internals ───────────────────────────────────────────────────

    /// Load the session, re-deriving its cached totals from the ledger.
    fn load_or_fresh(&self, session_id: &SessionId) -> (SessionState, bool) {
        match self.store.load(session_id) {
            Ok(mut state) => {
                state.attributed_totals = state.ledger.recompute();
                (state, false)
            }
            Err(error) => {
                warn!(
                    session_id = %session_id,
                    %error,
                    "failed to load session state, using fresh state"
                );
                (SessionState::new(session_id.clone()), true)
            }
        }
    }

    /// Load, apply `mutate`, and save, replaying on conflict.
    ///
    /// `mutate` receives the state and the current time and returns whether
    /// it changed anything; unchanged states are not written. It may run
    /// more than once and must be a pure function of its inputs.
    fn update<F>(&self, session_id: &SessionId, mut mutate: F) -> Applied
    where
        F: FnMut(&mut SessionState, i64) -> bool,
    {
        let max_attempts = self.config.max_save_attempts.max(1);
        let mut attempt = 1;
        loop {
            let now_ms = self.clock.now_ms();
            let (mut state, degraded) = self.load_or_fresh(session_id);
            let previous_update_ms = state.last_updated_ms;

            let changed = mutate(&mut state, now_ms);
            if !changed || degraded {
                if changed {
                    warn!(session_id = %session_id, "session state unavailable, dropping update");
                }
                return Applied {
                    state,
                    previous_update_ms,
                    degraded,
                };
            }

            state.last_updated_ms = Some(now_ms);
            match self.store.save(&mut state) {
                Ok(()) => {}
                Err(StoreError::Conflict { expected, found, .. }) if attempt < max_attempts => {
                    debug!(
                        session_id = %session_id,
                        attempt,
                        expected,
                        found,
                        "save conflict, retrying"
                    );
                    attempt += 1;
                    continue;
                }
                Err(error) if error.is_conflict() => {
                    warn!(
                        session_id = %session_id,
                        attempts = attempt,
                        %error,
                        "save kept conflicting, abandoning write"
                    );
                }
                Err(error) => {
                    warn!(
                        session_id = %session_id,
                        %error,
                        "failed to save session state, abandoning write"
                    );
                }
            }
            return Applied {
                state,
                previous_update_ms,
                degraded: false,
            };
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use costline_core::logging::capture_logs;
    use costline_core::{ContextKind, ManualClock};
    use costline_store::MemoryStateStore;
    use parking_lot::Mutex;
    use proptest::prelude::*;
    use tracing::Level;

    use super::*;

    fn subagent(label: &str) -> ToolKind {
        ToolKind::Subagent {
            subagent_type: label.into(),
        }
    }

    fn external(name: &str) -> ToolKind {
        ToolKind::ExternalCall { name: name.into() }
    }

    struct Harness {
        service: AttributionService,
        store: Arc<MemoryStateStore>,
        clock: Arc<ManualClock>,
        id: SessionId,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryStateStore::new());
        let clock = Arc::new(ManualClock::new(1_000));
        let service = AttributionService::with_clock(
            store.clone(),
            clock.clone(),
            ServiceConfig::default(),
        );
        Harness {
            service,
            store,
            clock,
            id: SessionId::from("session-1"),
        }
    }

    /// Store that fails every call.
    struct BrokenStore;

    impl StateStore for BrokenStore {
        fn load(&self, session_id: &SessionId) -> costline_store::Result<SessionState> {
            Err(StoreError::Lock {
                path: session_id.file_stem().into(),
                source: std::io::Error::other("lock unavailable"),
            })
        }

        fn save(&self, state: &mut SessionState) -> costline_store::Result<()> {
            Err(StoreError::Io {
                path: state.session_id.file_stem().into(),
                source: std::io::Error::other("disk full"),
            })
        }
    }

    /// Loads fine; saves fail.
    #[derive(Default)]
    struct ReadOnlyStore {
        inner: MemoryStateStore,
    }

    impl StateStore for ReadOnlyStore {
        fn load(&self, session_id: &SessionId) -> costline_store::Result<SessionState> {
            self.inner.load(session_id)
        }

        fn save(&self, state: &mut SessionState) -> costline_store::Result<()> {
            Err(StoreError::Io {
                path: state.session_id.file_stem().into(),
                source: std::io::Error::other("read-only"),
            })
        }
    }

    /// Simulates another process saving between our load and save for the
    /// first `interleavings` saves.
    struct RacingStore {
        inner: MemoryStateStore,
        interleavings: AtomicU32,
        competing_cost: Mutex<f64>,
    }

    impl RacingStore {
        fn new(interleavings: u32) -> Self {
            Self {
                inner: MemoryStateStore::new(),
                interleavings: AtomicU32::new(interleavings),
                competing_cost: Mutex::new(0.0),
            }
        }
    }

    impl StateStore for RacingStore {
        fn load(&self, session_id: &SessionId) -> costline_store::Result<SessionState> {
            self.inner.load(session_id)
        }

        fn save(&self, state: &mut SessionState) -> costline_store::Result<()> {
            let remaining = self.interleavings.load(Ordering::SeqCst);
            if remaining > 0 {
                self.interleavings.store(remaining - 1, Ordering::SeqCst);
                let mut rival = self.inner.load(&state.session_id)?;
                let mut cost = self.competing_cost.lock();
                *cost += 0.25;
                let _ = rival.observe(*cost, 0, 1000);
                self.inner.save(&mut rival)?;
            }
            self.inner.save(state)
        }
    }

    // ── Context events ──────────────────────────────────────────────

    #[test]
    fn nested_subagents_unwind_in_order() {
        let h = harness();
        h.service.on_tool_start(&h.id, &subagent("a"));
        h.service.on_tool_start(&h.id, &subagent("b"));
        h.service.on_tool_end(&h.id, &subagent("b"));

        let state = h.service.snapshot(&h.id);
        assert_eq!(state.tracker.current_context(), ContextKind::Subagent);
        assert_eq!(state.tracker.subagent_depth(), 1);
        assert_eq!(state.tracker.active_subagent_label(), Some("a"));

        h.service.on_tool_end(&h.id, &subagent("a"));
        let state = h.service.snapshot(&h.id);
        assert_eq!(state.tracker.current_context(), ContextKind::Primary);
        assert_eq!(state.tracker.subagent_depth(), 0);
    }

    #[test]
    fn external_call_only_opens_from_primary() {
        let h = harness();
        h.service.on_tool_start(&h.id, &subagent("a"));
        h.service.on_tool_start(&h.id, &external("mcp__x"));
        let state = h.service.snapshot(&h.id);
        assert_eq!(state.tracker.current_context(), ContextKind::Subagent);
        assert_eq!(state.tracker.active_external_call_label(), None);
    }

    #[test]
    fn external_call_closes_on_matching_end() {
        let h = harness();
        h.service.on_tool_start(&h.id, &external("mcp__x"));
        h.service.on_tool_end(&h.id, &external("mcp__y"));
        assert_eq!(
            h.service.snapshot(&h.id).tracker.current_context(),
            ContextKind::DirectExternalCall
        );
        h.service.on_tool_end(&h.id, &external("mcp__x"));
        assert_eq!(
            h.service.snapshot(&h.id).tracker.current_context(),
            ContextKind::Primary
        );
    }

    #[test]
    fn other_tools_write_nothing() {
        let h = harness();
        h.service.on_tool_start(&h.id, &ToolKind::Other);
        h.service.on_tool_end(&h.id, &ToolKind::Other);
        h.service.on_subagent_stop(&h.id);
        assert!(h.store.is_empty());
    }

    #[test]
    fn events_stamp_last_updated() {
        let h = harness();
        h.clock.set(42_000);
        h.service.on_tool_start(&h.id, &subagent("a"));
        let state = h.service.snapshot(&h.id);
        assert_eq!(state.last_updated_ms, Some(42_000));
        assert_eq!(state.revision, 1);
    }

    // ── Cost observations ───────────────────────────────────────────

    #[test]
    fn stale_observation_is_rejected() {
        let h = harness();
        let _ = h.service.observe_cost(&h.id, 2.0);
        let before = h.service.snapshot(&h.id);

        let breakdown = h.service.observe_cost(&h.id, 1.5);
        let after = h.service.snapshot(&h.id);
        assert_eq!(after.ledger.len(), before.ledger.len());
        assert_eq!(after.attributed_totals, before.attributed_totals);
        assert_eq!(after.revision, before.revision);
        assert_eq!(breakdown.total, 1.5);
        assert_eq!(breakdown.primary, 2.0);

        let _ = h.service.observe_cost(&h.id, 2.0);
        assert_eq!(h.service.snapshot(&h.id).ledger.len(), 1);
    }

    #[test]
    fn stale_observation_still_reports_live_context() {
        let h = harness();
        let _ = h.service.observe_cost(&h.id, 1.0);
        h.service.on_tool_start(&h.id, &subagent("reviewer"));

        let breakdown = h.service.observe_cost(&h.id, 1.0);
        assert_eq!(breakdown.current_context, ContextKind::Subagent);
        assert_eq!(breakdown.current_label.as_deref(), Some("reviewer"));
    }

    #[test]
    fn subagent_stop_recovers_from_unmatched_enter() {
        let h = harness();
        h.service.on_tool_start(&h.id, &subagent("x"));
        h.service.on_subagent_stop(&h.id);
        let breakdown = h.service.observe_cost(&h.id, 10.0);
        assert_eq!(breakdown.primary, 10.0);
        assert_eq!(breakdown.subagent, 0.0);
        assert_eq!(breakdown.current_context, ContextKind::Primary);
    }

    #[test]
    fn activity_reflects_previous_update() {
        let h = harness();
        h.clock.set(10_000);
        h.service.on_tool_start(&h.id, &subagent("a"));

        h.clock.set(10_500);
        let breakdown = h.service.observe_cost(&h.id, 1.0);
        assert_eq!(breakdown.last_updated_ms, Some(10_000));
        assert_eq!(breakdown.activity, Activity::Active);

        h.clock.set(30_000);
        let breakdown = h.service.observe_cost(&h.id, 1.0);
        assert_eq!(breakdown.last_updated_ms, Some(10_500));
        assert_eq!(breakdown.activity, Activity::Idle);
    }

    #[test]
    fn checkpoint_capacity_follows_config() {
        let store = Arc::new(MemoryStateStore::new());
        let config = ServiceConfig {
            max_checkpoints: 3,
            ..ServiceConfig::default()
        };
        let service = AttributionService::new(store, config);
        let id = SessionId::from("s");
        for i in 1..=10 {
            let _ = service.observe_cost(&id, f64::from(i));
        }
        let state = service.snapshot(&id);
        assert_eq!(state.ledger.len(), 3);
        assert_eq!(state.ledger.last().map(|c| c.cumulative_cost), Some(10.0));
    }

    // ── End-to-end ──────────────────────────────────────────────────

    #[test]
    fn reviewer_scenario_with_base_observation() {
        let h = harness();
        h.clock.set(0);
        let _ = h.service.observe_cost(&h.id, 0.0);
        h.service.on_tool_start(&h.id, &subagent("reviewer"));
        h.clock.set(1);
        let _ = h.service.observe_cost(&h.id, 1.0);
        h.service.on_tool_end(&h.id, &subagent("reviewer"));
        h.clock.set(2);
        let breakdown = h.service.observe_cost(&h.id, 1.5);

        assert_eq!(breakdown.total, 1.5);
        assert_eq!(breakdown.primary, 1.0);
        assert_eq!(breakdown.subagent, 0.5);
        assert_eq!(breakdown.direct_external_call, 0.0);

        let contexts: Vec<_> = h
            .service
            .snapshot(&h.id)
            .ledger
            .iter()
            .map(|c| c.context_at_time)
            .collect();
        assert_eq!(
            contexts,
            [ContextKind::Primary, ContextKind::Subagent, ContextKind::Primary]
        );
    }

    #[test]
    fn reviewer_scenario_without_base_observation() {
        let h = harness();
        h.service.on_tool_start(&h.id, &subagent("reviewer"));
        let _ = h.service.observe_cost(&h.id, 1.0);
        h.service.on_tool_end(&h.id, &subagent("reviewer"));
        let breakdown = h.service.observe_cost(&h.id, 1.5);

        assert_eq!(breakdown.primary, 0.0);
        assert_eq!(breakdown.subagent, 1.5);
        assert_eq!(breakdown.direct_external_call, 0.0);
    }

    // ── Failure handling ────────────────────────────────────────────

    #[test]
    fn unreadable_store_falls_back() {
        let service = AttributionService::new(Arc::new(BrokenStore), ServiceConfig::default());
        let id = SessionId::from("s");
        let (logs, _guard) = capture_logs();

        service.on_tool_start(&id, &subagent("a"));
        let breakdown = service.observe_cost(&id, 3.25);
        assert_eq!(breakdown, Breakdown::fallback(3.25));
        assert_eq!(service.snapshot(&id), SessionState::new(id));
        assert!(logs.has_event(Level::WARN, "failed to load session state"));
    }

    #[test]
    fn unwritable_store_still_reports_this_observation() {
        let service =
            AttributionService::new(Arc::new(ReadOnlyStore::default()), ServiceConfig::default());
        let id = SessionId::from("s");
        let (logs, _guard) = capture_logs();

        let breakdown = service.observe_cost(&id, 2.0);
        assert_eq!(breakdown.total, 2.0);
        assert_eq!(breakdown.primary, 2.0);
        assert!(logs.has_event(Level::WARN, "abandoning write"));
    }

    #[test]
    fn conflict_is_retried_against_fresh_state() {
        let store = Arc::new(RacingStore::new(2));
        let service = AttributionService::new(store.clone(), ServiceConfig::default());
        let id = SessionId::from("s");

        let breakdown = service.observe_cost(&id, 5.0);
        assert_eq!(breakdown.total, 5.0);
        assert_eq!(breakdown.primary, 5.0);
        let state = store.inner.load(&id).unwrap();
        // Two rival writes (0.25, 0.5) landed first; ours replayed on top.
        let costs: Vec<f64> = state.ledger.iter().map(|c| c.cumulative_cost).collect();
        assert_eq!(costs, [0.25, 0.5, 5.0]);
        assert_eq!(state.revision, 3);
    }

    #[test]
    fn persistent_conflict_abandons_write() {
        let store = Arc::new(RacingStore::new(10));
        let config = ServiceConfig {
            max_save_attempts: 2,
            ..ServiceConfig::default()
        };
        let service = AttributionService::new(store.clone(), config);
        let id = SessionId::from("s");
        let (logs, _guard) = capture_logs();

        service.on_tool_start(&id, &subagent("a"));
        let state = store.inner.load(&id).unwrap();
        assert_eq!(state.tracker.current_context(), ContextKind::Primary);
        assert_eq!(state.revision, 2);
        assert!(logs.has_event(Level::WARN, "abandoning write"));
    }

    // ── Properties ──────────────────────────────────────────────────

    #[derive(Debug, Clone)]
    enum Event {
        EnterSubagent,
        ExitSubagent,
        EnterExternal,
        ExitExternal,
        Stop,
        Observe(f64),
    }

    fn event() -> impl Strategy<Value = Event> {
        prop_oneof![
            Just(Event::EnterSubagent),
            Just(Event::ExitSubagent),
            Just(Event::EnterExternal),
            Just(Event::ExitExternal),
            Just(Event::Stop),
            (0.0f64..100.0).prop_map(Event::Observe),
        ]
    }

    proptest! {
        #[test]
        fn attribution_conserves_last_recorded_cost(
            events in prop::collection::vec(event(), 0..60),
        ) {
            let h = harness();
            for e in &events {
                match e {
                    Event::EnterSubagent => h.service.on_tool_start(&h.id, &subagent("a")),
                    Event::ExitSubagent => h.service.on_tool_end(&h.id, &subagent("a")),
                    Event::EnterExternal => h.service.on_tool_start(&h.id, &external("mcp__x")),
                    Event::ExitExternal => h.service.on_tool_end(&h.id, &external("mcp__x")),
                    Event::Stop => h.service.on_subagent_stop(&h.id),
                    Event::Observe(cost) => { let _ = h.service.observe_cost(&h.id, *cost); }
                }
            }
            let state = h.service.snapshot(&h.id);
            let last = state.ledger.last().map_or(0.0, |c| c.cumulative_cost);
            prop_assert!((state.attributed_totals.sum() - last).abs() < 1e-9);
        }
    }
}
