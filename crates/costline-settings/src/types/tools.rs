//! Tool-name classification settings.
//!
//! The host runtime reports tool invocations by name. These settings say which
//! names open a sub-agent context and which open an external-call context.

use serde::{Deserialize, Serialize};

/// How tool names map to execution contexts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolSettings {
    /// Exact tool name that delegates to a sub-agent.
    pub subagent_tool: String,
    /// Prefix identifying external service tools.
    pub external_call_prefix: String,
    /// Field of the tool input carrying the sub-agent type.
    pub subagent_type_field: String,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            subagent_tool: "Task".to_string(),
            external_call_prefix: "mcp__".to_string(),
            subagent_type_field: "subagent_type".to_string(),
        }
    }
}
