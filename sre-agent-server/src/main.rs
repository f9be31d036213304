mod handlers;
mod models;

use std::sync::Arc;

use sre_agent_core::{BedrockModel, CoordinatorAgent, ServiceMode, SessionStore, Settings};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::handlers::AppState;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let settings = Settings::from_env();
    sre_agent_core::logger::init_logging(&settings.log_level);

    tracing::info!(
        "starting application in {} mode on port {}",
        settings.service_mode.as_str(),
        settings.port
    );

    let model = Arc::new(BedrockModel::new(&settings).await);
    let agent = Arc::new(CoordinatorAgent::new(Arc::clone(&model), &settings));
    let sessions = Arc::new(
        SessionStore::new(&settings.session_storage_path)
            .expect("failed to create session storage directory"),
    );

    let state = Arc::new(AppState::new(
        settings.clone(),
        model,
        agent,
        sessions,
    ));

    let mut app = handlers::router(state);
    if settings.service_mode == ServiceMode::Web {
        tracing::info!("web mode: enabling permissive CORS");
        app = app.layer(CorsLayer::permissive());
    }

    let addr = format!("0.0.0.0:{}", settings.port);
    let listener = TcpListener::bind(&addr)
        .await
        .expect("failed to bind listener");
    tracing::info!("listening on {}", addr);
    axum::serve(listener, app).await.expect("server error");
}
