//! Coordinator agent: drives Bedrock in a streaming tool-calling loop and
//! emits raw agent events for the normalizer. Routing intelligence lives in
//! the model; this module only wires prompts, tools, and the event plumbing.

use std::sync::Arc;

use aws_sdk_bedrockruntime::error::DisplayErrorContext;
use aws_sdk_bedrockruntime::types::{
    ContentBlock, ContentBlockDelta, ContentBlockStart, ConversationRole, ConverseStreamOutput,
    Message, StopReason, Tool as BedrockTool, ToolConfiguration, ToolInputSchema,
    ToolResultBlock, ToolResultContentBlock, ToolSpecification, ToolUseBlock,
};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::bedrock::{document_to_json, json_to_document, text_message, BedrockModel};
use crate::config::Settings;
use crate::error::AgentError;
use crate::prompts::COORDINATOR_SYSTEM_PROMPT;
use crate::tools::{FinopsAssistant, KubernetesAssistant, Tool};

const MAX_TOOL_ITERATIONS: usize = 10;

/// A raw event stream for one chat invocation: untyped JSON maps, consumed by
/// the normalizer. `Err` ends the stream.
pub type RawEventStream = ReceiverStream<Result<Value, AgentError>>;

pub struct CoordinatorAgent {
    model: Arc<BedrockModel>,
    tools: Vec<Arc<dyn Tool>>,
}

impl CoordinatorAgent {
    pub fn new(model: Arc<BedrockModel>, settings: &Settings) -> Self {
        let tools: Vec<Arc<dyn Tool>> = vec![
            Arc::new(FinopsAssistant::new(Arc::clone(&model), settings.clone())),
            Arc::new(KubernetesAssistant::new(
                Arc::clone(&model),
                settings.kubeconfig.clone(),
            )),
        ];

        info!(
            "initialized coordinator agent with model {}",
            model.model_id
        );

        Self { model, tools }
    }

    /// In-memory configuration hook. Accepts the update and logs it; nothing
    /// is persisted or applied yet.
    pub fn configure(&self, params: &Value) {
        info!("updating coordinator configuration: {params}");
    }

    /// Start one chat turn. Returns a stream of raw agent events produced by a
    /// driver task behind a capacity-1 channel: the producer suspends until
    /// the consumer pulls, and a dropped receiver (client disconnect) unwinds
    /// the driver, releasing any tool subprocesses.
    pub fn chat(self: &Arc<Self>, prompt: &str, user_id: &str) -> RawEventStream {
        info!("coordinator processing request for user {user_id}");

        let (tx, rx) = mpsc::channel(1);
        let agent = Arc::clone(self);
        let prompt = prompt.to_string();
        let user_id = user_id.to_string();

        tokio::spawn(async move {
            if let Err(err) = agent.drive_chat(&prompt, &user_id, &tx).await {
                warn!("error in coordinator for user {user_id}: {err}");
                let _ = tx.send(Err(err)).await;
            }
        });

        ReceiverStream::new(rx)
    }

    async fn drive_chat(
        &self,
        prompt: &str,
        user_id: &str,
        tx: &mpsc::Sender<Result<Value, AgentError>>,
    ) -> Result<(), AgentError> {
        let tool_config = build_tool_config(&self.tools)?;
        let mut messages = vec![text_message(ConversationRole::User, prompt)?];

        if !emit(tx, json!({"init_event_loop": true})).await {
            return Ok(());
        }

        for iteration in 0..MAX_TOOL_ITERATIONS {
            if iteration > 0 && !emit(tx, json!({"start": true})).await {
                return Ok(());
            }

            let mut stream = self
                .model
                .converse_stream(COORDINATOR_SYSTEM_PROMPT, messages.clone(), tool_config.clone())
                .await?;

            let mut text = String::new();
            let mut tool_uses: Vec<PendingToolUse> = Vec::new();
            let mut stop_reason = None;

            loop {
                let event = stream
                    .recv()
                    .await
                    .map_err(|e| AgentError::Stream(DisplayErrorContext(&e).to_string()))?;
                let Some(event) = event else { break };

                match event {
                    ConverseStreamOutput::ContentBlockStart(start) => {
                        if let Some(ContentBlockStart::ToolUse(tool_start)) = start.start() {
                            let raw = json!({
                                "current_tool_use": {
                                    "toolUseId": tool_start.tool_use_id(),
                                    "name": tool_start.name(),
                                }
                            });
                            if !emit(tx, raw).await {
                                return Ok(());
                            }
                            tool_uses.push(PendingToolUse {
                                id: tool_start.tool_use_id().to_string(),
                                name: tool_start.name().to_string(),
                                input: String::new(),
                            });
                        }
                    }
                    ConverseStreamOutput::ContentBlockDelta(delta_event) => {
                        match delta_event.delta() {
                            Some(ContentBlockDelta::Text(chunk)) => {
                                text.push_str(chunk);
                                if !emit(tx, json!({"data": chunk})).await {
                                    return Ok(());
                                }
                            }
                            Some(ContentBlockDelta::ToolUse(tool_delta)) => {
                                if let Some(pending) = tool_uses.last_mut() {
                                    pending.input.push_str(tool_delta.input());
                                }
                            }
                            _ => {}
                        }
                    }
                    ConverseStreamOutput::MessageStop(stop) => {
                        stop_reason = Some(stop.stop_reason().clone());
                    }
                    _ => {}
                }
            }

            if stop_reason != Some(StopReason::ToolUse) {
                if !emit(tx, json!({"complete": true})).await {
                    return Ok(());
                }
                info!("coordinator completed for user {user_id}");
                return Ok(());
            }

            messages.push(assistant_message(&text, &tool_uses)?);

            let mut result_blocks = Vec::new();
            for pending in tool_uses {
                let args = pending.parsed_input();
                info!("coordinator using tool {} for user {user_id}", pending.name);
                let outcome = self.dispatch_tool(&pending.name, args).await;
                let block = ToolResultBlock::builder()
                    .tool_use_id(pending.id)
                    .content(ToolResultContentBlock::Text(outcome))
                    .build()
                    .map_err(|e| AgentError::Model(e.to_string()))?;
                result_blocks.push(ContentBlock::ToolResult(block));
            }

            messages.push(
                Message::builder()
                    .role(ConversationRole::User)
                    .set_content(Some(result_blocks))
                    .build()
                    .map_err(|e| AgentError::Model(e.to_string()))?,
            );
        }

        Err(AgentError::ToolLoopExceeded(MAX_TOOL_ITERATIONS))
    }

    async fn dispatch_tool(&self, name: &str, args: Value) -> String {
        match self.tools.iter().find(|t| t.name() == name) {
            Some(tool) => tool
                .call(args)
                .await
                .unwrap_or_else(|e| format!("Error: {e}")),
            None => format!("Error: unknown tool {name}"),
        }
    }
}

struct PendingToolUse {
    id: String,
    name: String,
    input: String,
}

impl PendingToolUse {
    /// Tool input arrives as accumulated JSON text; an empty accumulation
    /// means a no-argument call.
    fn parsed_input(&self) -> Value {
        if self.input.is_empty() {
            json!({})
        } else {
            serde_json::from_str(&self.input).unwrap_or_else(|_| json!({}))
        }
    }
}

fn assistant_message(text: &str, tool_uses: &[PendingToolUse]) -> Result<Message, AgentError> {
    let mut blocks = Vec::new();
    if !text.is_empty() {
        blocks.push(ContentBlock::Text(text.to_string()));
    }
    for pending in tool_uses {
        let block = ToolUseBlock::builder()
            .tool_use_id(&pending.id)
            .name(&pending.name)
            .input(json_to_document(&pending.parsed_input()))
            .build()
            .map_err(|e| AgentError::Model(e.to_string()))?;
        blocks.push(ContentBlock::ToolUse(block));
    }

    Message::builder()
        .role(ConversationRole::Assistant)
        .set_content(Some(blocks))
        .build()
        .map_err(|e| AgentError::Model(e.to_string()))
}

/// Send one raw event; false means the consumer went away (cancellation).
async fn emit(tx: &mpsc::Sender<Result<Value, AgentError>>, event: Value) -> bool {
    tx.send(Ok(event)).await.is_ok()
}

pub(crate) fn build_tool_config(
    tools: &[Arc<dyn Tool>],
) -> Result<Option<ToolConfiguration>, AgentError> {
    if tools.is_empty() {
        return Ok(None);
    }

    let mut builder = ToolConfiguration::builder();
    for tool in tools {
        let spec = ToolSpecification::builder()
            .name(tool.name())
            .description(tool.description())
            .input_schema(ToolInputSchema::Json(json_to_document(&tool.parameters())))
            .build()
            .map_err(|e| AgentError::Model(e.to_string()))?;
        builder = builder.tools(BedrockTool::ToolSpec(spec));
    }

    builder
        .build()
        .map(Some)
        .map_err(|e| AgentError::Model(e.to_string()))
}

/// Bounded non-streaming tool loop used by the specialist assistants: run the
/// query against the model with the given system prompt and tool set, execute
/// requested tools, and return the model's final text.
pub(crate) async fn run_specialist(
    model: &BedrockModel,
    system_prompt: &str,
    tools: &[Arc<dyn Tool>],
    query: &str,
) -> Result<String, AgentError> {
    let tool_config = build_tool_config(tools)?;
    let mut messages = vec![text_message(ConversationRole::User, query)?];

    for _ in 0..MAX_TOOL_ITERATIONS {
        let output = model
            .converse(system_prompt, messages.clone(), tool_config.clone())
            .await?;

        let message = output
            .output()
            .and_then(|o| o.as_message().ok().cloned())
            .ok_or_else(|| AgentError::Model("model returned no message".to_string()))?;
        messages.push(message.clone());

        if output.stop_reason() != &StopReason::ToolUse {
            let text = message
                .content()
                .iter()
                .filter_map(|block| block.as_text().ok().cloned())
                .collect::<Vec<_>>()
                .join("");
            return Ok(text);
        }

        let mut result_blocks = Vec::new();
        for block in message.content() {
            if let ContentBlock::ToolUse(tool_use) = block {
                let args = document_to_json(tool_use.input());
                let outcome = match tools.iter().find(|t| t.name() == tool_use.name()) {
                    Some(tool) => tool
                        .call(args)
                        .await
                        .unwrap_or_else(|e| format!("Error: {e}")),
                    None => format!("Error: unknown tool {}", tool_use.name()),
                };
                let result = ToolResultBlock::builder()
                    .tool_use_id(tool_use.tool_use_id())
                    .content(ToolResultContentBlock::Text(outcome))
                    .build()
                    .map_err(|e| AgentError::Model(e.to_string()))?;
                result_blocks.push(ContentBlock::ToolResult(result));
            }
        }

        messages.push(
            Message::builder()
                .role(ConversationRole::User)
                .set_content(Some(result_blocks))
                .build()
                .map_err(|e| AgentError::Model(e.to_string()))?,
        );
    }

    Err(AgentError::ToolLoopExceeded(MAX_TOOL_ITERATIONS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> String {
            "echo".to_string()
        }
        fn description(&self) -> String {
            "Echo the input".to_string()
        }
        fn parameters(&self) -> Value {
            json!({"type": "object", "properties": {"text": {"type": "string"}}})
        }
        async fn call(&self, args: Value) -> Result<String, String> {
            Ok(args.to_string())
        }
    }

    #[test]
    fn tool_config_is_none_without_tools() {
        assert!(build_tool_config(&[]).unwrap().is_none());
    }

    #[test]
    fn tool_config_carries_every_spec() {
        let tools: Vec<Arc<dyn Tool>> = vec![Arc::new(EchoTool), Arc::new(EchoTool)];
        let config = build_tool_config(&tools).unwrap().unwrap();
        assert_eq!(config.tools().len(), 2);
    }

    #[test]
    fn empty_tool_input_parses_to_empty_object() {
        let pending = PendingToolUse {
            id: "t1".to_string(),
            name: "echo".to_string(),
            input: String::new(),
        };
        assert_eq!(pending.parsed_input(), json!({}));

        let pending = PendingToolUse {
            id: "t2".to_string(),
            name: "echo".to_string(),
            input: r#"{"text":"hi"}"#.to_string(),
        };
        assert_eq!(pending.parsed_input(), json!({"text": "hi"}));
    }
}
