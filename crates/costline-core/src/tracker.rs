//! Execution-context tracking.
//!
//! [`ContextTracker`] derives the current context, sub-agent nesting depth,
//! and active labels from three event kinds: enter, exit, and force-reset.
//!
//! There are no error conditions. Exits for a context that is not active are
//! no-ops, so a process that crashed between an enter and its exit cannot push
//! the depth negative. The only recovery for a lost exit is [`force_reset`].
//!
//! [`force_reset`]: ContextTracker::force_reset

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::ContextKind;

/// Context-tracking fields of a session.
///
/// Serialized flat into the session record, so field names are part of the
/// persisted layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContextTracker {
    current_context: ContextKind,
    subagent_depth: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    active_subagent_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    active_external_call_label: Option<String>,
}

/// The context in effect at one instant, with only the label that belongs to
/// that context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextSnapshot {
    /// Active context.
    pub context: ContextKind,
    /// Sub-agent label; present only when `context` is `Subagent`.
    pub subagent_label: Option<String>,
    /// External call identifier; present only when `context` is `DirectExternalCall`.
    pub external_call_label: Option<String>,
}

impl ContextTracker {
    /// A tracker in the primary context with nothing open.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The innermost open context.
    #[must_use]
    pub fn current_context(&self) -> ContextKind {
        self.current_context
    }

    /// Number of open sub-agent invocations.
    #[must_use]
    pub fn subagent_depth(&self) -> u32 {
        self.subagent_depth
    }

    /// Label of the outermost open sub-agent, if any.
    #[must_use]
    pub fn active_subagent_label(&self) -> Option<&str> {
        self.active_subagent_label.as_deref()
    }

    /// Identifier of the open external call, if any.
    #[must_use]
    pub fn active_external_call_label(&self) -> Option<&str> {
        self.active_external_call_label.as_deref()
    }

    /// Label describing the current context (`None` in the primary context).
    #[must_use]
    pub fn current_label(&self) -> Option<&str> {
        match self.current_context {
            ContextKind::Primary => None,
            ContextKind::Subagent => self.active_subagent_label(),
            ContextKind::DirectExternalCall => self.active_external_call_label(),
        }
    }

    /// Capture the current context for a checkpoint.
    #[must_use]
    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            context: self.current_context,
            subagent_label: match self.current_context {
                ContextKind::Subagent => self.active_subagent_label.clone(),
                _ => None,
            },
            external_call_label: match self.current_context {
                ContextKind::DirectExternalCall => self.active_external_call_label.clone(),
                _ => None,
            },
        }
    }

    /// Handle a context-enter event. Returns `true` if the state changed.
    ///
    /// - `Subagent`: depth increments and the context becomes `Subagent`. The
    ///   label is only taken at depth 1; nested enters keep the outer label.
    /// - `DirectExternalCall`: honored only from the primary context. Calls
    ///   made inside a sub-agent belong to the sub-agent.
    /// - `Primary`: not an enterable context, ignored.
    pub fn enter(&mut self, kind: ContextKind, label: Option<&str>) -> bool {
        match kind {
            ContextKind::Subagent => {
                self.subagent_depth = self.subagent_depth.saturating_add(1);
                self.current_context = ContextKind::Subagent;
                if self.subagent_depth == 1 {
                    self.active_subagent_label = label.map(str::to_owned);
                }
                debug!(depth = self.subagent_depth, label = ?label, "entered sub-agent context");
                true
            }
            ContextKind::DirectExternalCall => {
                if self.current_context != ContextKind::Primary {
                    debug!(
                        current = %self.current_context,
                        label = ?label,
                        "external call outside primary context, not tracked separately"
                    );
                    return false;
                }
                self.current_context = ContextKind::DirectExternalCall;
                self.active_external_call_label = label.map(str::to_owned);
                debug!(label = ?label, "entered external call context");
                true
            }
            ContextKind::Primary => false,
        }
    }

    /// Handle a context-exit event. Returns `true` if the state changed.
    ///
    /// - `Subagent`: depth decrements; at depth 0 the context reverts to
    ///   `Primary` and the sub-agent label clears. Ignored at depth 0.
    /// - `DirectExternalCall`: closes the context only if it is active and
    ///   `label` matches the open call's identifier.
    pub fn exit(&mut self, kind: ContextKind, label: Option<&str>) -> bool {
        match kind {
            ContextKind::Subagent => {
                if self.subagent_depth == 0 {
                    debug!("unmatched sub-agent exit ignored");
                    return false;
                }
                self.subagent_depth -= 1;
                if self.subagent_depth == 0 {
                    self.current_context = ContextKind::Primary;
                    self.active_subagent_label = None;
                }
                debug!(depth = self.subagent_depth, "exited sub-agent context");
                true
            }
            ContextKind::DirectExternalCall => {
                if self.current_context != ContextKind::DirectExternalCall
                    || self.active_external_call_label.as_deref() != label
                {
                    debug!(label = ?label, "unmatched external call exit ignored");
                    return false;
                }
                self.current_context = ContextKind::Primary;
                self.active_external_call_label = None;
                debug!(label = ?label, "exited external call context");
                true
            }
            ContextKind::Primary => false,
        }
    }

    /// Unconditionally return to the primary context.
    ///
    /// Drops any open sub-agent or external call without side effects.
    /// Returns `true` if anything was open.
    pub fn force_reset(&mut self) -> bool {
        let changed = *self != Self::default();
        if changed {
            debug!(
                previous = %self.current_context,
                depth = self.subagent_depth,
                "force-reset to primary context"
            );
        }
        *self = Self::default();
        changed
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
