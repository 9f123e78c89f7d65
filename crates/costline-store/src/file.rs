//! File-backed session store.
//!
//! Layout inside the state directory, per session stem (see
//! [`SessionId::file_stem`], unique per ID):
//!
//! - `<stem>.state.json`: the record
//! - `<stem>.state.json.tmp`: staging file for the next record
//! - `<stem>.lock`: advisory lock target
//!
//! Locks are taken on the sidecar lock file, never on the record, because the
//! record's inode is replaced by every rename. Readers hold a shared lock
//! while reading; writers hold an exclusive lock across the revision check,
//! the temp write, and the rename.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use costline_core::{SessionId, SessionState};
use fd_lock::RwLock;
use tracing::{debug, warn};

use crate::errors::{Result, StoreError};
use crate::traits::StateStore;

const RECORD_SUFFIX: &str = ".state.json";
const TEMP_SUFFIX: &str = ".state.json.tmp";
const LOCK_SUFFIX: &str = ".lock";

/// One JSON record per session in a directory.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    dir: PathBuf,
}

impl FileStateStore {
    /// Store records under `dir`. The directory is created on first use.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the records.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record for `session_id`.
    pub fn record_path(&self, session_id: &SessionId) -> PathBuf {
        self.dir.join(format!("{}{RECORD_SUFFIX}", session_id.file_stem()))
    }

    fn temp_path(&self, session_id: &SessionId) -> PathBuf {
        self.dir.join(format!("{}{TEMP_SUFFIX}", session_id.file_stem()))
    }

    fn lock_path(&self, session_id: &SessionId) -> PathBuf {
        self.dir.join(format!("{}{LOCK_SUFFIX}", session_id.file_stem()))
    }

    fn open_lock(&self, session_id: &SessionId) -> Result<RwLock<File>> {
        std::fs::create_dir_all(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.lock_path(session_id);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| StoreError::Lock { path, source })?;
        Ok(RwLock::new(file))
    }

    /// Read and parse the persisted record. Caller holds a lock.
    ///
    /// `Ok(None)` covers missing files, bad JSON and foreign schema versions.
    /// The record's owner is not checked here; see [`Self::owned_by`].
    fn read_record(&self, session_id: &SessionId) -> Result<Option<SessionState>> {
        let path = self.record_path(session_id);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        let state: SessionState = match serde_json::from_str(&content) {
            Ok(state) => state,
            Err(error) => {
                warn!(
                    session_id = %session_id,
                    ?path,
                    %error,
                    "unreadable session record, starting fresh"
                );
                return Ok(None);
            }
        };
        if !state.is_current_schema() {
            warn!(
                session_id = %session_id,
                schema_version = state.schema_version,
                "session record has foreign schema version, starting fresh"
            );
            return Ok(None);
        }
        Ok(Some(state))
    }

    /// Whether a persisted record belongs to `session_id`.
    fn owned_by(state: &SessionState, session_id: &SessionId) -> bool {
        state.session_id == *session_id
    }

    fn write_atomically(&self, session_id: &SessionId, bytes: &[u8]) -> Result<()> {
        let temp = self.temp_path(session_id);
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| StoreError::Io { path, source }
        };

        let mut file = File::create(&temp).map_err(io_err(&temp))?;
        file.write_all(bytes).map_err(io_err(&temp))?;
        file.sync_all().map_err(io_err(&temp))?;
        drop(file);

        let record = self.record_path(session_id);
        std::fs::rename(&temp, &record).map_err(io_err(&record))?;
        Ok(())
    }
}

impl StateStore for FileStateStore {
    fn load(&self, session_id: &SessionId) -> Result<SessionState> {
        let lock = self.open_lock(session_id)?;
        let _guard = lock.read().map_err(|source| StoreError::Lock {
            path: self.lock_path(session_id),
            source,
        })?;

        let state = match self.read_record(session_id)? {
            Some(state) if Self::owned_by(&state, session_id) => state,
            Some(state) => {
                warn!(
                    session_id = %session_id,
                    found = %state.session_id,
                    "session record belongs to another session, starting fresh"
                );
                SessionState::new(session_id.clone())
            }
            None => SessionState::new(session_id.clone()),
        };
        debug!(session_id = %session_id, revision = state.revision, "loaded session state");
        Ok(state)
    }

    fn save(&self, state: &mut SessionState) -> Result<()> {
        let session_id = state.session_id.clone();
        let mut lock = self.open_lock(&session_id)?;
        let _guard = lock.write().map_err(|source| StoreError::Lock {
            path: self.lock_path(&session_id),
            source,
        })?;

        let found = match self.read_record(&session_id)? {
            Some(persisted) if !Self::owned_by(&persisted, &session_id) => {
                return Err(StoreError::ForeignRecord {
                    path: self.record_path(&session_id),
                    owner: persisted.session_id.into_inner(),
                });
            }
            Some(persisted) => persisted.revision,
            None => 0,
        };
        if found != state.revision {
            return Err(StoreError::Conflict {
                session_id: session_id.into_inner(),
                expected: state.revision,
                found,
            });
        }

        let mut next = state.clone();
        next.revision += 1;
        let bytes = serde_json::to_vec_pretty(&next)?;
        self.write_atomically(&session_id, &bytes)?;

        state.revision = next.revision;
        debug!(session_id = %session_id, revision = state.revision, "saved session state");
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
