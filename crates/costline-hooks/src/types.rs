//! Closed event types decoded from host payloads.
//!
//! Hook payloads use the host's `snake_case` field names:
//!
//! ```json
//! { "session_id": "abc", "tool_name": "Task", "tool_input": { "subagent_type": "reviewer" } }
//! ```
//!
//! and status payloads carry the cumulative cost:
//!
//! ```json
//! { "session_id": "abc", "cost": { "total_cost_usd": 1.25 } }
//! ```

use std::fmt;
use std::str::FromStr;

use costline_core::SessionId;
use serde::Deserialize;
use serde_json::Value;

use crate::errors::{HookError, Result};

/// Hook command argument naming the lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookAction {
    /// A tool is about to run.
    ToolUse,
    /// A tool finished.
    ToolResult,
    /// A sub-agent terminated.
    SubagentStop,
}

impl HookAction {
    /// Every action, in wire-name order.
    #[must_use]
    pub fn all() -> &'static [HookAction] {
        &[Self::ToolUse, Self::ToolResult, Self::SubagentStop]
    }

    /// Wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ToolUse => "tool_use",
            Self::ToolResult => "tool_result",
            Self::SubagentStop => "subagent_stop",
        }
    }
}

impl fmt::Display for HookAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HookAction {
    type Err = HookError;

    fn from_str(s: &str) -> Result<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| HookError::UnknownAction(s.to_owned()))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HookPayload {
    session_id: Option<String>,
    tool_name: Option<String>,
    tool_input: Value,
}

/// A decoded hook event.
#[derive(Debug, Clone, PartialEq)]
pub enum HookEvent {
    /// A tool started.
    ToolStart {
        /// Owning session.
        session_id: SessionId,
        /// Tool name as reported by the host.
        tool_name: String,
        /// Tool arguments; [`Value::Null`] when absent.
        tool_input: Value,
    },
    /// A tool finished.
    ToolEnd {
        /// Owning session.
        session_id: SessionId,
        /// Tool name as reported by the host.
        tool_name: String,
    },
    /// A sub-agent terminated.
    SubagentStop {
        /// Owning session.
        session_id: SessionId,
    },
}

impl HookEvent {
    /// Decode the payload for `action`.
    ///
    /// A missing or empty `session_id` becomes `"unknown"`; a missing
    /// `tool_name` becomes the empty string.
    pub fn decode(action: HookAction, json: &str) -> Result<Self> {
        let payload: HookPayload = serde_json::from_str(json)?;
        let session_id = session_or_unknown(payload.session_id);
        let tool_name = payload.tool_name.unwrap_or_default();
        Ok(match action {
            HookAction::ToolUse => Self::ToolStart {
                session_id,
                tool_name,
                tool_input: payload.tool_input,
            },
            HookAction::ToolResult => Self::ToolEnd {
                session_id,
                tool_name,
            },
            HookAction::SubagentStop => Self::SubagentStop { session_id },
        })
    }

    /// Session the event belongs to.
    pub fn session_id(&self) -> &SessionId {
        match self {
            Self::ToolStart { session_id, .. }
            | Self::ToolEnd { session_id, .. }
            | Self::SubagentStop { session_id } => session_id,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StatusPayload {
    session_id: Option<String>,
    cost: Option<CostPayload>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CostPayload {
    total_cost_usd: Option<f64>,
}

/// A decoded status-render tick.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusInput {
    /// Owning session.
    pub session_id: SessionId,
    /// Cumulative session cost in USD; never negative or non-finite.
    pub total_cost: f64,
}

impl StatusInput {
    /// Decode a status payload. A missing, negative or non-finite cost
    /// becomes `0.0`.
    pub fn decode(json: &str) -> Result<Self> {
        let payload: StatusPayload = serde_json::from_str(json)?;
        let total_cost = payload
            .cost
            .and_then(|cost| cost.total_cost_usd)
            .filter(|cost| cost.is_finite() && *cost >= 0.0)
            .unwrap_or(0.0);
        Ok(Self {
            session_id: session_or_unknown(payload.session_id),
            total_cost,
        })
    }
}

fn session_or_unknown(raw: Option<String>) -> SessionId {
    raw.filter(|s| !s.is_empty())
        .map_or_else(SessionId::unknown, SessionId::from_string)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
