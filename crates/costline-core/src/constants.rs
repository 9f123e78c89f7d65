//! Package-level constants.

/// Current version of costline (sourced from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name.
pub const NAME: &str = "costline";

/// Schema version written into every persisted session record.
///
/// Records carrying any other version are treated as unreadable and the
/// session restarts from a fresh state.
pub const SCHEMA_VERSION: u32 = 1;

/// Default number of checkpoints retained per session.
pub const DEFAULT_MAX_CHECKPOINTS: usize = 1000;
