//! Translation of raw agent events into the closed [`NormalizedEvent`] set.
//!
//! Raw events are loosely-typed JSON maps whose keys are mutually exclusive in
//! practice but not by contract, so classification runs in a fixed priority
//! order and the first match wins. Shapes that match nothing are dropped on
//! purpose rather than surfaced as errors.

use futures::{Stream, StreamExt};
use serde_json::Value;

use crate::error::AgentError;
use crate::events::NormalizedEvent;

/// Classify one raw event. Returns `None` for unrecognized shapes (dropped).
///
/// Priority order, first match wins:
/// 1. `data` present -> agent message chunk
/// 2. `current_tool_use` present -> tool use
/// 3. `complete` present and truthy -> completion
/// 4. `start` or `init_event_loop` present -> thinking
pub fn classify(raw: &Value) -> Option<NormalizedEvent> {
    let map = raw.as_object()?;

    if let Some(data) = map.get("data") {
        let content = match data {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        return Some(NormalizedEvent::AgentMessage {
            content,
            is_chunk: true,
        });
    }

    if let Some(tool_info) = map.get("current_tool_use") {
        let tool_name = tool_info
            .as_object()
            .and_then(|info| info.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        let status = format!("Using {tool_name}...");
        return Some(NormalizedEvent::ToolUse { tool_name, status });
    }

    if map.get("complete").is_some_and(is_truthy) {
        return Some(NormalizedEvent::Complete {
            status: "Processing completed".to_string(),
        });
    }

    if map.contains_key("start") || map.contains_key("init_event_loop") {
        return Some(NormalizedEvent::Thinking {
            status: "Analyzing your request...".to_string(),
        });
    }

    None
}

/// Truthiness over JSON values: null, false, zero, and empty containers are
/// falsy, everything else is truthy.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Adapt a raw event stream into a normalized event stream.
///
/// Events are emitted in input order, one at a time; the adapter suspends
/// exactly where the upstream suspends and holds no buffer. Unrecognized raw
/// shapes are skipped. If the upstream fails, exactly one trailing `error`
/// event is emitted and the stream terminates; it does not retry or resume.
pub fn normalize<S>(raw: S) -> impl Stream<Item = NormalizedEvent>
where
    S: Stream<Item = Result<Value, AgentError>> + Send + 'static,
{
    futures::stream::unfold((Box::pin(raw), false), |(mut raw, done)| async move {
        if done {
            return None;
        }
        loop {
            match raw.next().await {
                Some(Ok(event)) => {
                    if let Some(normalized) = classify(&event) {
                        return Some((normalized, (raw, false)));
                    }
                }
                Some(Err(err)) => {
                    let event = NormalizedEvent::Error {
                        message: err.to_string(),
                    };
                    return Some((event, (raw, true)));
                }
                None => return None,
            }
        }
    })
}

/// Drain a normalized stream, concatenating the content of every
/// `agent_message` chunk. Returns the accumulated response text together with
/// all events in arrival order.
pub async fn collect_chat<S>(events: S) -> (String, Vec<NormalizedEvent>)
where
    S: Stream<Item = NormalizedEvent>,
{
    let mut response = String::new();
    let mut collected = Vec::new();

    futures::pin_mut!(events);
    while let Some(event) = events.next().await {
        if let NormalizedEvent::AgentMessage {
            content,
            is_chunk: true,
        } = &event
        {
            response.push_str(content);
        }
        collected.push(event);
    }

    (response, collected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use serde_json::json;

    #[test]
    fn data_becomes_agent_message_chunk() {
        let event = classify(&json!({"data": "hello"})).unwrap();
        assert_eq!(
            event,
            NormalizedEvent::AgentMessage {
                content: "hello".to_string(),
                is_chunk: true,
            }
        );
    }

    #[test]
    fn non_string_data_is_stringified() {
        let event = classify(&json!({"data": 42})).unwrap();
        assert_eq!(
            event,
            NormalizedEvent::AgentMessage {
                content: "42".to_string(),
                is_chunk: true,
            }
        );
    }

    #[test]
    fn tool_use_extracts_name() {
        let event = classify(&json!({"current_tool_use": {"name": "finops_assistant"}})).unwrap();
        assert_eq!(
            event,
            NormalizedEvent::ToolUse {
                tool_name: "finops_assistant".to_string(),
                status: "Using finops_assistant...".to_string(),
            }
        );
    }

    #[test]
    fn malformed_tool_use_defaults_to_unknown() {
        for raw in [
            json!({"current_tool_use": "not-a-mapping"}),
            json!({"current_tool_use": {}}),
            json!({"current_tool_use": {"name": 7}}),
        ] {
            let event = classify(&raw).unwrap();
            assert_eq!(
                event,
                NormalizedEvent::ToolUse {
                    tool_name: "unknown".to_string(),
                    status: "Using unknown...".to_string(),
                }
            );
        }
    }

    #[test]
    fn complete_requires_truthy_value() {
        assert_eq!(
            classify(&json!({"complete": true})),
            Some(NormalizedEvent::Complete {
                status: "Processing completed".to_string(),
            })
        );
        assert_eq!(
            classify(&json!({"complete": 1})),
            Some(NormalizedEvent::Complete {
                status: "Processing completed".to_string(),
            })
        );
        assert_eq!(classify(&json!({"complete": false})), None);
        assert_eq!(classify(&json!({"complete": 0})), None);
        assert_eq!(classify(&json!({"complete": ""})), None);
        assert_eq!(classify(&json!({"complete": null})), None);
    }

    #[test]
    fn start_and_init_event_loop_mean_thinking() {
        let thinking = NormalizedEvent::Thinking {
            status: "Analyzing your request...".to_string(),
        };
        assert_eq!(classify(&json!({"start": true})), Some(thinking.clone()));
        assert_eq!(
            classify(&json!({"init_event_loop": true})),
            Some(thinking.clone())
        );
        // Presence is what matters, not truthiness.
        assert_eq!(classify(&json!({"start": false})), Some(thinking));
    }

    #[test]
    fn data_wins_when_multiple_keys_present() {
        let raw = json!({
            "data": "chunk",
            "current_tool_use": {"name": "x"},
            "complete": true,
            "start": true,
        });
        assert_eq!(
            classify(&raw),
            Some(NormalizedEvent::AgentMessage {
                content: "chunk".to_string(),
                is_chunk: true,
            })
        );
    }

    #[test]
    fn unrecognized_shapes_are_dropped() {
        assert_eq!(classify(&json!({})), None);
        assert_eq!(classify(&json!({"something_else": 1})), None);
        assert_eq!(classify(&json!("not a map")), None);
        assert_eq!(classify(&json!(null)), None);
    }

    #[tokio::test]
    async fn stream_preserves_order_and_drops_unmatched() {
        let raw = stream::iter(vec![
            Ok(json!({"init_event_loop": true})),
            Ok(json!({"unrecognized": true})),
            Ok(json!({"current_tool_use": {"name": "kubernetes_assistant"}})),
            Ok(json!({"data": "a"})),
            Ok(json!({"data": "b"})),
            Ok(json!({"complete": true})),
        ]);

        let events: Vec<_> = normalize(raw).collect().await;
        assert_eq!(events.len(), 5);
        assert!(matches!(events[0], NormalizedEvent::Thinking { .. }));
        assert!(matches!(events[1], NormalizedEvent::ToolUse { .. }));
        assert_eq!(
            events[2],
            NormalizedEvent::AgentMessage {
                content: "a".to_string(),
                is_chunk: true,
            }
        );
        assert_eq!(
            events[3],
            NormalizedEvent::AgentMessage {
                content: "b".to_string(),
                is_chunk: true,
            }
        );
        assert!(matches!(events[4], NormalizedEvent::Complete { .. }));
    }

    #[tokio::test]
    async fn upstream_failure_emits_one_trailing_error() {
        let raw = stream::iter(vec![
            Ok(json!({"data": "one"})),
            Ok(json!({"data": "two"})),
            Err(AgentError::Model("connection reset".to_string())),
        ]);

        let events: Vec<_> = normalize(raw).collect().await;
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], NormalizedEvent::AgentMessage { .. }));
        assert!(matches!(events[1], NormalizedEvent::AgentMessage { .. }));
        match &events[2] {
            NormalizedEvent::Error { message } => {
                assert!(message.contains("connection reset"));
            }
            other => panic!("expected trailing error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn collect_chat_accumulates_chunks() {
        let raw = stream::iter(vec![
            Ok(json!({"start": true})),
            Ok(json!({"data": "hello "})),
            Ok(json!({"data": "world"})),
            Ok(json!({"complete": true})),
        ]);

        let (response, events) = collect_chat(normalize(raw)).await;
        assert_eq!(response, "hello world");
        assert_eq!(events.len(), 4);
    }

    #[tokio::test]
    async fn collect_chat_without_chunks_yields_empty_response() {
        let raw = stream::iter(vec![
            Ok(json!({"init_event_loop": true})),
            Ok(json!({"complete": true})),
        ]);

        let (response, events) = collect_chat(normalize(raw)).await;
        assert_eq!(response, "");
        assert_eq!(events.len(), 2);
    }
}
