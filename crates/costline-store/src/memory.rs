//! In-process session store.

use std::collections::HashMap;

use costline_core::{SessionId, SessionState};
use parking_lot::Mutex;

use crate::errors::{Result, StoreError};
use crate::traits::StateStore;

/// Map-backed store with the same revision semantics as the file store.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    records: Mutex<HashMap<SessionId, SessionState>>,
}

impl MemoryStateStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions with a persisted record.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether nothing has been saved yet.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self, session_id: &SessionId) -> Result<SessionState> {
        Ok(self
            .records
            .lock()
            .get(session_id)
            .cloned()
            .unwrap_or_else(|| SessionState::new(session_id.clone())))
    }

    fn save(&self, state: &mut SessionState) -> Result<()> {
        let mut records = self.records.lock();
        let found = records.get(&state.session_id).map_or(0, |s| s.revision);
        if found != state.revision {
            return Err(StoreError::Conflict {
                session_id: state.session_id.to_string(),
                expected: state.revision,
                found,
            });
        }
        state.revision += 1;
        let _ = records.insert(state.session_id.clone(), state.clone());
        Ok(())
    }
}
