//! Tool-name classification.

use costline_core::ContextKind;
use costline_settings::ToolSettings;
use serde_json::Value;

/// Label used when a sub-agent tool call carries no type.
pub const UNKNOWN_SUBAGENT: &str = "unknown";

/// What a tool invocation means for context tracking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolKind {
    /// Delegates to a sub-agent of the given type.
    Subagent {
        /// Sub-agent type from the tool input.
        subagent_type: String,
    },
    /// Calls an external service; carries the full tool name.
    ExternalCall {
        /// Tool name, used as the call identifier.
        name: String,
    },
    /// Any other tool; does not change context.
    Other,
}

impl ToolKind {
    /// Classify a tool invocation.
    ///
    /// `tool_input` is only consulted for sub-agent tools; pass
    /// [`Value::Null`] when it is not available (for example on tool end).
    #[must_use]
    pub fn classify(tool_name: &str, tool_input: &Value, settings: &ToolSettings) -> Self {
        if tool_name == settings.subagent_tool {
            let subagent_type = tool_input
                .get(&settings.subagent_type_field)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .unwrap_or(UNKNOWN_SUBAGENT)
                .to_owned();
            Self::Subagent { subagent_type }
        } else if !settings.external_call_prefix.is_empty()
            && tool_name.starts_with(&settings.external_call_prefix)
        {
            Self::ExternalCall {
                name: tool_name.to_owned(),
            }
        } else {
            Self::Other
        }
    }

    /// Context this tool opens, if any.
    #[must_use]
    pub fn context(&self) -> Option<ContextKind> {
        match self {
            Self::Subagent { .. } => Some(ContextKind::Subagent),
            Self::ExternalCall { .. } => Some(ContextKind::DirectExternalCall),
            Self::Other => None,
        }
    }

    /// Label recorded with the context.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Subagent { subagent_type } => Some(subagent_type),
            Self::ExternalCall { name } => Some(name),
            Self::Other => None,
        }
    }
}
