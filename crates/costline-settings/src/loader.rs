//! Resolving [`CostlineSettings`] from three layers, later ones winning:
//!
//! 1. built-in defaults (`sessions` state dir, 1000 checkpoints, `Task` as
//!    the sub-agent tool, `mcp__` as the external-call prefix)
//! 2. `~/.costline/settings.json`, or the file passed with `--settings`
//! 3. `COSTLINE_*` environment variables, see [`apply_overrides_from`]
//!
//! A settings file may name only the keys it changes, e.g.
//! `{"ledger": {"maxCheckpoints": 200}}` keeps every other default.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::CostlineSettings;

/// Root directory for costline data (`~/.costline`).
pub fn costline_home() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".costline")
}

/// Resolve the path to the settings file (`~/.costline/settings.json`).
pub fn settings_path() -> PathBuf {
    costline_home().join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<CostlineSettings> {
    load_settings_from_path(&settings_path())
}

/// Resolve settings with `path` as the file layer.
///
/// A missing file leaves the defaults in place. An unreadable or malformed
/// file is an error; the CLI then runs on defaults and logs a warning.
pub fn load_settings_from_path(path: &Path) -> Result<CostlineSettings> {
    let defaults = serde_json::to_value(CostlineSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: CostlineSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Overlay a partial settings document onto a complete one.
///
/// Nested sections such as `ledger` or `tools` merge key by key. Scalars and
/// arrays in `source` replace what `target` holds; a `null` in `source`
/// keeps the existing value.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `COSTLINE_*` overrides from the process environment.
pub fn apply_env_overrides(settings: &mut CostlineSettings) {
    apply_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Apply `COSTLINE_*` overrides read through `lookup`.
///
/// Invalid values are ignored with a warning and the file/default value
/// stays in effect.
pub fn apply_overrides_from<F>(settings: &mut CostlineSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let read_string = |name: &str| lookup(name).filter(|v| !v.is_empty());
    let read_ranged = |name: &str, min: u64, max: u64| {
        let val = lookup(name)?;
        let result = parse_u64_range(&val, min, max);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid numeric env var, ignoring");
        }
        result
    };

    // ── Storage ─────────────────────────────────────────────────────
    if let Some(v) = read_string("COSTLINE_STATE_DIR") {
        settings.storage.state_dir = v;
    }
    if let Some(v) = read_ranged("COSTLINE_MAX_SAVE_ATTEMPTS", 1, 10) {
        settings.storage.max_save_attempts = u32::try_from(v).unwrap_or(1);
    }

    // ── Ledger ──────────────────────────────────────────────────────
    if let Some(v) = read_ranged("COSTLINE_MAX_CHECKPOINTS", 1, 100_000) {
        settings.ledger.max_checkpoints = usize::try_from(v).unwrap_or(1);
    }

    // ── Tools ───────────────────────────────────────────────────────
    if let Some(v) = read_string("COSTLINE_SUBAGENT_TOOL") {
        settings.tools.subagent_tool = v;
    }
    if let Some(v) = read_string("COSTLINE_EXTERNAL_PREFIX") {
        settings.tools.external_call_prefix = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = read_string("COSTLINE_LOG_LEVEL") {
        settings.logging.level = v;
    }
}

/// Parse a string as a `u64` within an inclusive range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
