//! Routing decoded events into the attribution service.

use costline_attribution::{AttributionService, ToolKind};
use costline_core::Breakdown;
use serde_json::Value;
use tracing::{debug, warn};

use crate::types::{HookAction, HookEvent, StatusInput};

/// Apply one decoded hook event.
pub fn dispatch(service: &AttributionService, event: &HookEvent) {
    let tools = &service.config().tools;
    let session_id = event.session_id();
    match event {
        HookEvent::ToolStart {
            tool_name,
            tool_input,
            ..
        } => {
            let tool = ToolKind::classify(tool_name, tool_input, tools);
            debug!(session_id = %session_id, tool_name, ?tool, "tool start");
            service.on_tool_start(session_id, &tool);
        }
        HookEvent::ToolEnd { tool_name, .. } => {
            let tool = ToolKind::classify(tool_name, &Value::Null, tools);
            debug!(session_id = %session_id, tool_name, ?tool, "tool end");
            service.on_tool_end(session_id, &tool);
        }
        HookEvent::SubagentStop { .. } => {
            debug!(session_id = %session_id, "sub-agent stop");
            service.on_subagent_stop(session_id);
        }
    }
}

/// Decode and apply a raw hook invocation. Failures are logged, never raised.
pub fn handle_hook(service: &AttributionService, action: &str, json: &str) {
    let action = match action.parse::<HookAction>() {
        Ok(action) => action,
        Err(error) => {
            warn!(%error, "ignoring hook");
            return;
        }
    };
    match HookEvent::decode(action, json) {
        Ok(event) => dispatch(service, &event),
        Err(error) => warn!(%action, %error, "ignoring hook"),
    }
}

/// Decode a status payload and return the session's breakdown.
///
/// An undecodable payload yields [`Breakdown::fallback`] with a zero total.
pub fn handle_status(service: &AttributionService, json: &str) -> Breakdown {
    match StatusInput::decode(json) {
        Ok(input) => service.observe_cost(&input.session_id, input.total_cost),
        Err(error) => {
            warn!(%error, "unreadable status payload");
            Breakdown::fallback(0.0)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
