use serde::{Deserialize, Serialize};

/// Closed event taxonomy derived from the raw event stream of a chat
/// invocation. Raw events are untyped JSON maps produced while driving the
/// model; this is the only shape downstream consumers see.
///
/// Only `AgentMessage` chunk content is folded into session state; everything
/// else is relayed to the caller and forgotten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NormalizedEvent {
    Thinking { status: String },
    ToolUse { tool_name: String, status: String },
    AgentMessage { content: String, is_chunk: bool },
    Complete { status: String },
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_with_type_tag() {
        let event = NormalizedEvent::AgentMessage {
            content: "hello".to_string(),
            is_chunk: true,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({"type": "agent_message", "content": "hello", "is_chunk": true})
        );
    }

    #[test]
    fn tool_use_round_trips() {
        let event = NormalizedEvent::ToolUse {
            tool_name: "finops_assistant".to_string(),
            status: "Using finops_assistant...".to_string(),
        };
        let text = serde_json::to_string(&event).unwrap();
        let back: NormalizedEvent = serde_json::from_str(&text).unwrap();
        assert_eq!(back, event);
    }
}
