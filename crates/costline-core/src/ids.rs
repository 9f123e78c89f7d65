//! Branded ID newtypes.
//!
//! Session identifiers are opaque strings handed to us by the host runtime.
//! Wrapping them keeps them from being confused with tool names or labels,
//! and gives the store a single place to derive a safe file stem.

use std::fmt::{self, Write as _};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Identifier used when the host omits a session ID.
pub const UNKNOWN_SESSION: &str = "unknown";

/// Bytes of the ID digest appended to every file stem.
const STEM_DIGEST_BYTES: usize = 8;

/// Opaque identifier for one agent session.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Create from an existing string value.
    #[must_use]
    pub fn from_string(s: String) -> Self {
        Self(s)
    }

    /// The placeholder session used when the host sends none.
    #[must_use]
    pub fn unknown() -> Self {
        Self(UNKNOWN_SESSION.to_owned())
    }

    /// Return the inner string as a slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume self and return the inner `String`.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// File-system safe stem for this session, unique per ID.
    ///
    /// The readable part keeps `[A-Za-z0-9_-]` and turns everything else into
    /// `_` (an empty ID reads as [`UNKNOWN_SESSION`]). A SHA-256 prefix of the
    /// raw ID follows, so IDs that sanitise alike still get distinct stems.
    #[must_use]
    pub fn file_stem(&self) -> String {
        let mut stem: String = if self.0.is_empty() {
            UNKNOWN_SESSION.to_owned()
        } else {
            self.0
                .chars()
                .map(|c| {
                    if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                        c
                    } else {
                        '_'
                    }
                })
                .collect()
        };
        stem.push('-');
        let digest = Sha256::digest(self.0.as_bytes());
        for byte in digest.iter().take(STEM_DIGEST_BYTES) {
            let _ = write!(stem, "{byte:02x}");
        }
        stem
    }
}

impl std::ops::Deref for SessionId {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
