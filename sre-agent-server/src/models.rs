use serde::{Deserialize, Serialize};
use serde_json::Value;
use sre_agent_core::{NormalizedEvent, SessionMessage};

#[derive(Deserialize, Debug)]
pub struct ChatRequest {
    pub user_id: String,
    pub message: String,
}

#[derive(Serialize, Debug)]
pub struct ChatResponse {
    pub user_id: String,
    pub response: String,
    pub events: Vec<NormalizedEvent>,
    pub metrics: Value,
}

#[derive(Deserialize, Serialize, Debug, Default)]
pub struct ConfigUpdate {
    pub model_id: Option<String>,
    pub system_prompt: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<i64>,
}

#[derive(Serialize, Debug)]
pub struct ConfigResponse {
    pub model_id: String,
    pub system_prompt: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<i64>,
}

#[derive(Serialize, Debug)]
pub struct SessionResponse {
    pub user_id: String,
    pub messages: Vec<SessionMessage>,
    pub message_count: usize,
}

#[derive(Serialize, Debug)]
pub struct HealthResponse {
    pub status: String,
    pub service_mode: String,
    pub bedrock_connected: bool,
    pub details: Value,
}

#[derive(Serialize, Debug)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
}
