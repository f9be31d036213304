//! Thin wrapper around the AWS Bedrock SDK: Converse and ConverseStream for
//! the agents, plus a lightweight connectivity probe for the health endpoint.

use aws_config::{BehaviorVersion, Region};
use aws_sdk_bedrockruntime::error::DisplayErrorContext;
use aws_sdk_bedrockruntime::operation::converse::ConverseOutput;
use aws_sdk_bedrockruntime::primitives::event_stream::EventReceiver;
use aws_sdk_bedrockruntime::types::error::ConverseStreamOutputError;
use aws_sdk_bedrockruntime::types::{
    ConversationRole, ContentBlock, ConverseStreamOutput, Message, SystemContentBlock,
    ToolConfiguration,
};
use aws_smithy_types::{Document, Number};
use serde_json::Value;
use tracing::{error, info};

use crate::config::Settings;
use crate::error::AgentError;

pub struct BedrockModel {
    runtime: aws_sdk_bedrockruntime::Client,
    control: aws_sdk_bedrock::Client,
    pub model_id: String,
    pub region: String,
}

impl BedrockModel {
    pub async fn new(settings: &Settings) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.aws_region.clone()));
        if let Some(profile) = &settings.aws_profile {
            loader = loader.profile_name(profile);
        }
        let shared = loader.load().await;

        info!(
            "initialized Bedrock model {} in region {}",
            settings.bedrock_model_id, settings.aws_region
        );

        Self {
            runtime: aws_sdk_bedrockruntime::Client::new(&shared),
            control: aws_sdk_bedrock::Client::new(&shared),
            model_id: settings.bedrock_model_id.clone(),
            region: settings.aws_region.clone(),
        }
    }

    /// One non-streaming model turn.
    pub async fn converse(
        &self,
        system_prompt: &str,
        messages: Vec<Message>,
        tool_config: Option<ToolConfiguration>,
    ) -> Result<ConverseOutput, AgentError> {
        self.runtime
            .converse()
            .model_id(&self.model_id)
            .system(SystemContentBlock::Text(system_prompt.to_string()))
            .set_messages(Some(messages))
            .set_tool_config(tool_config)
            .send()
            .await
            .map_err(|e| AgentError::Model(DisplayErrorContext(&e).to_string()))
    }

    /// One streaming model turn; the caller drives the returned receiver.
    pub async fn converse_stream(
        &self,
        system_prompt: &str,
        messages: Vec<Message>,
        tool_config: Option<ToolConfiguration>,
    ) -> Result<EventReceiver<ConverseStreamOutput, ConverseStreamOutputError>, AgentError> {
        let response = self
            .runtime
            .converse_stream()
            .model_id(&self.model_id)
            .system(SystemContentBlock::Text(system_prompt.to_string()))
            .set_messages(Some(messages))
            .set_tool_config(tool_config)
            .send()
            .await
            .map_err(|e| AgentError::Model(DisplayErrorContext(&e).to_string()))?;

        Ok(response.stream)
    }

    /// Lightweight reachability check used by `/health`: list foundation
    /// models, filtered to the provider we actually use. Failures are logged
    /// and reported as disconnected, never raised.
    pub async fn check_connectivity(&self) -> bool {
        match self
            .control
            .list_foundation_models()
            .by_provider("anthropic")
            .send()
            .await
        {
            Ok(_) => true,
            Err(e) => {
                error!(
                    "bedrock connectivity check failed: {}",
                    DisplayErrorContext(&e)
                );
                false
            }
        }
    }
}

/// Build a single-text-block message for the given role.
pub fn text_message(role: ConversationRole, text: &str) -> Result<Message, AgentError> {
    Message::builder()
        .role(role)
        .content(ContentBlock::Text(text.to_string()))
        .build()
        .map_err(|e| AgentError::Model(e.to_string()))
}

pub fn json_to_document(value: &Value) -> Document {
    match value {
        Value::Null => Document::Null,
        Value::Bool(b) => Document::Bool(*b),
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Document::Number(Number::PosInt(u))
            } else if let Some(i) = n.as_i64() {
                Document::Number(Number::NegInt(i))
            } else {
                Document::Number(Number::Float(n.as_f64().unwrap_or(0.0)))
            }
        }
        Value::String(s) => Document::String(s.clone()),
        Value::Array(items) => Document::Array(items.iter().map(json_to_document).collect()),
        Value::Object(map) => Document::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), json_to_document(v)))
                .collect(),
        ),
    }
}

pub fn document_to_json(doc: &Document) -> Value {
    match doc {
        Document::Null => Value::Null,
        Document::Bool(b) => Value::Bool(*b),
        Document::Number(n) => match n {
            Number::PosInt(u) => Value::from(*u),
            Number::NegInt(i) => Value::from(*i),
            Number::Float(f) => Value::from(*f),
        },
        Document::String(s) => Value::String(s.clone()),
        Document::Array(items) => Value::Array(items.iter().map(document_to_json).collect()),
        Document::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), document_to_json(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_document_round_trip() {
        let value = json!({
            "name": "finops_assistant",
            "count": 3,
            "offset": -2,
            "ratio": 0.5,
            "flags": [true, false, null],
            "nested": {"query": "costs"},
        });

        let doc = json_to_document(&value);
        assert_eq!(document_to_json(&doc), value);
    }

    #[test]
    fn empty_object_round_trips() {
        let value = json!({});
        assert_eq!(document_to_json(&json_to_document(&value)), value);
    }
}
