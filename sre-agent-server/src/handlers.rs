use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use serde_json::json;
use sre_agent_core::normalizer::{collect_chat, normalize};
use sre_agent_core::{BedrockModel, CoordinatorAgent, SessionStore, Settings};
use tracing::{error, info};

use crate::models::{
    ChatRequest, ChatResponse, ConfigResponse, ConfigUpdate, HealthResponse, SessionResponse,
    StatusResponse,
};

/// Application context built once at startup and injected into handlers. The
/// agent and session store are typed as `Option` so "not yet initialized" is
/// an explicit state answered with 503, not a hidden null.
pub struct AppState {
    pub settings: Settings,
    pub bedrock: Option<Arc<BedrockModel>>,
    pub agent: Option<Arc<CoordinatorAgent>>,
    pub sessions: Option<Arc<SessionStore>>,
}

impl AppState {
    pub fn new(
        settings: Settings,
        bedrock: Arc<BedrockModel>,
        agent: Arc<CoordinatorAgent>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        Self {
            settings,
            bedrock: Some(bedrock),
            agent: Some(agent),
            sessions: Some(sessions),
        }
    }

    pub fn uninitialized(settings: Settings) -> Self {
        Self {
            settings,
            bedrock: None,
            agent: None,
            sessions: None,
        }
    }

    fn agent(&self) -> Result<&Arc<CoordinatorAgent>, ApiError> {
        self.agent
            .as_ref()
            .ok_or(ApiError::ServiceUnavailable("Agent not initialized"))
    }

    fn sessions(&self) -> Result<&Arc<SessionStore>, ApiError> {
        self.sessions
            .as_ref()
            .ok_or(ApiError::ServiceUnavailable("Session manager not initialized"))
    }
}

pub enum ApiError {
    ServiceUnavailable(&'static str),
    Internal(String),
    Validation(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.to_string()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ApiError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
        };
        (status, Json(json!({"detail": detail}))).into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/chat", axum::routing::post(chat))
        .route("/api/config", get(get_config).post(update_config))
        .route(
            "/api/session/{user_id}",
            get(get_session).delete(clear_session),
        )
        .with_state(state)
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let bedrock_connected = match &state.bedrock {
        Some(model) => model.check_connectivity().await,
        None => false,
    };

    Json(HealthResponse {
        status: if bedrock_connected {
            "healthy".to_string()
        } else {
            "degraded".to_string()
        },
        service_mode: state.settings.service_mode.as_str().to_string(),
        bedrock_connected,
        details: json!({
            "region": state.settings.aws_region,
            "model_id": state.settings.bedrock_model_id,
        }),
    })
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    info!("chat request from user: {}", request.user_id);

    let agent = state.agent()?.clone();
    let sessions = state.sessions()?.clone();

    sessions.add_message(&request.user_id, "user", &request.message);

    // In-stream failures surface as a trailing `error` event inside a 200
    // response; only request-level failures become a 500.
    let raw = agent.chat(&request.message, &request.user_id);
    let (response, events) = collect_chat(normalize(raw)).await;

    if !response.is_empty() {
        sessions.add_message(&request.user_id, "assistant", &response);
    }

    let event_count = events.len();
    Ok(Json(ChatResponse {
        user_id: request.user_id,
        response,
        events,
        metrics: json!({"event_count": event_count}),
    }))
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        model_id: state.settings.bedrock_model_id.clone(),
        system_prompt: None,
        temperature: None,
        max_tokens: None,
    })
}

pub async fn update_config(
    State(state): State<Arc<AppState>>,
    Json(update): Json<ConfigUpdate>,
) -> Result<Json<ConfigResponse>, ApiError> {
    if let Some(temperature) = update.temperature {
        if !(0.0..=1.0).contains(&temperature) {
            return Err(ApiError::Validation(
                "temperature must be between 0.0 and 1.0".to_string(),
            ));
        }
    }
    if let Some(max_tokens) = update.max_tokens {
        if max_tokens <= 0 {
            return Err(ApiError::Validation(
                "max_tokens must be greater than 0".to_string(),
            ));
        }
    }

    let agent = state.agent()?;
    let params = serde_json::to_value(&update).unwrap_or_default();
    agent.configure(&params);

    Ok(Json(ConfigResponse {
        model_id: update
            .model_id
            .unwrap_or_else(|| state.settings.bedrock_model_id.clone()),
        system_prompt: update.system_prompt,
        temperature: update.temperature,
        max_tokens: update.max_tokens,
    }))
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let messages = state.sessions()?.get_messages(&user_id);
    let message_count = messages.len();

    Ok(Json(SessionResponse {
        user_id,
        messages,
        message_count,
    }))
}

pub async fn clear_session(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    if state.sessions()?.clear_session(&user_id) {
        Ok(Json(StatusResponse {
            status: "success".to_string(),
            message: format!("Session cleared for user {user_id}"),
        }))
    } else {
        error!("failed to clear session for user {user_id}");
        Err(ApiError::Internal("Failed to clear session".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::util::ServiceExt;

    fn state_with_sessions() -> (tempfile::TempDir, Arc<AppState>) {
        let dir = tempfile::tempdir().unwrap();
        let sessions = Arc::new(SessionStore::new(dir.path()).unwrap());
        let state = Arc::new(AppState {
            settings: Settings::default(),
            bedrock: None,
            agent: None,
            sessions: Some(sessions),
        });
        (dir, state)
    }

    async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = match body {
            Some(json) => Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        };

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn chat_without_agent_returns_503() {
        let (_dir, state) = state_with_sessions();
        let (status, body) = send(
            router(state),
            Method::POST,
            "/api/chat",
            Some(json!({"user_id": "u1", "message": "hi"})),
        )
        .await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["detail"], "Agent not initialized");
    }

    #[tokio::test]
    async fn session_endpoints_without_store_return_503() {
        let state = Arc::new(AppState::uninitialized(Settings::default()));
        let (status, body) = send(router(state), Method::GET, "/api/session/u1", None).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["detail"], "Session manager not initialized");
    }

    #[tokio::test]
    async fn session_round_trip_over_http() {
        let (_dir, state) = state_with_sessions();
        state
            .sessions
            .as_ref()
            .unwrap()
            .add_message("u1", "user", "hi");

        let (status, body) =
            send(router(state.clone()), Method::GET, "/api/session/u1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user_id"], "u1");
        assert_eq!(body["message_count"], 1);
        assert_eq!(body["messages"][0]["content"], "hi");

        let (status, body) =
            send(router(state.clone()), Method::DELETE, "/api/session/u1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");

        let (status, body) = send(router(state), Method::GET, "/api/session/u1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message_count"], 0);
    }

    #[tokio::test]
    async fn clear_never_created_session_is_success() {
        let (_dir, state) = state_with_sessions();
        let (status, body) =
            send(router(state), Method::DELETE, "/api/session/ghost", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
    }

    #[tokio::test]
    async fn get_config_reports_model_id() {
        let (_dir, state) = state_with_sessions();
        let (status, body) = send(router(state), Method::GET, "/api/config", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["model_id"], "anthropic.claude-3-5-sonnet-20241022-v2:0");
        assert_eq!(body["system_prompt"], Value::Null);
        assert_eq!(body["temperature"], Value::Null);
        assert_eq!(body["max_tokens"], Value::Null);
    }

    #[tokio::test]
    async fn config_update_rejects_out_of_range_values() {
        let (_dir, state) = state_with_sessions();

        let (status, _) = send(
            router(state.clone()),
            Method::POST,
            "/api/config",
            Some(json!({"temperature": 1.5})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = send(
            router(state),
            Method::POST,
            "/api/config",
            Some(json!({"max_tokens": 0})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn health_without_bedrock_is_degraded() {
        let state = Arc::new(AppState::uninitialized(Settings::default()));
        let (status, body) = send(router(state), Method::GET, "/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["bedrock_connected"], false);
        assert_eq!(body["service_mode"], "api");
        assert_eq!(body["details"]["region"], "us-east-1");
    }
}
