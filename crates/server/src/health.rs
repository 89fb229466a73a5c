use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use munchbot_core::ConversationStore;
use serde::Serialize;

pub const BANNER: &str = "munchbot is running";

#[derive(Clone)]
pub struct HealthState {
    store: Arc<dyn ConversationStore>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub active_conversations: usize,
    pub checked_at: String,
}

pub fn router(store: Arc<dyn ConversationStore>) -> Router {
    Router::new()
        .route("/", get(banner))
        .route("/healthz", get(health))
        .with_state(HealthState { store })
}

pub async fn banner() -> &'static str {
    BANNER
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let payload = HealthResponse {
        status: "ready",
        service: HealthCheck {
            status: "ready",
            detail: "munchbot-server accepting webhooks".to_string(),
        },
        active_conversations: state.store.len().await,
        checked_at: Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(payload))
}
