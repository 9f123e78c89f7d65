//! The storage seam between the attribution service and the disk.

use costline_core::{SessionId, SessionState};

use crate::errors::Result;

/// Per-session key-value store for [`SessionState`].
pub trait StateStore: Send + Sync {
    /// Read the record for `session_id`.
    ///
    /// A missing or unparseable record yields `SessionState::new(session_id)`.
    fn load(&self, session_id: &SessionId) -> Result<SessionState>;

    /// Persist `state`, bumping its revision on success.
    ///
    /// Fails with [`StoreError::Conflict`](crate::StoreError::Conflict) if the
    /// persisted revision no longer matches `state.revision`. Nothing is
    /// written in that case.
    fn save(&self, state: &mut SessionState) -> Result<()>;
}
