//! # costline-settings
//!
//! Configuration management with layered sources for costline.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`CostlineSettings::default()`]
//! 2. **User file**: `~/.costline/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `COSTLINE_*` overrides (highest priority)
//!
//! Every costline invocation is a separate short-lived process, so there is
//! no global cache: the binary loads once at startup and passes the value
//! down.
//!
//! # Usage
//!
//! ```no_run
//! use costline_settings::load_settings;
//!
//! let settings = load_settings().unwrap_or_default();
//! println!("state dir: {}", settings.state_dir().display());
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_overrides_from, costline_home, deep_merge, load_settings,
    load_settings_from_path, settings_path,
};
pub use types::*;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
