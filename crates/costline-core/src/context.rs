//! Execution contexts and per-context cost totals.

use serde::{Deserialize, Serialize};

/// The execution scope believed responsible for cost at a given moment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContextKind {
    /// Work done directly by the primary agent.
    #[default]
    Primary,
    /// Work done inside a delegated sub-agent invocation.
    Subagent,
    /// A direct external-service call made by the primary agent.
    DirectExternalCall,
}

impl ContextKind {
    /// Returns all context variants in display order.
    #[must_use]
    pub fn all() -> &'static [ContextKind] {
        &[Self::Primary, Self::Subagent, Self::DirectExternalCall]
    }

    /// Wire name of this context.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Subagent => "subagent",
            Self::DirectExternalCall => "directExternalCall",
        }
    }
}

impl std::fmt::Display for ContextKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accumulated cost per context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContextTotals {
    /// Cost attributed to the primary agent.
    pub primary: f64,
    /// Cost attributed to sub-agents (including their external calls).
    pub subagent: f64,
    /// Cost attributed to direct external calls from the primary agent.
    pub direct_external_call: f64,
}

impl ContextTotals {
    /// Add `amount` to the bucket for `kind`.
    pub fn add(&mut self, kind: ContextKind, amount: f64) {
        match kind {
            ContextKind::Primary => self.primary += amount,
            ContextKind::Subagent => self.subagent += amount,
            ContextKind::DirectExternalCall => self.direct_external_call += amount,
        }
    }

    /// Sum over all contexts.
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.primary + self.subagent + self.direct_external_call
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
