//! HTTP route handlers.

use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::allocation::{PoolSnapshot, RequesterId};
use crate::health::HealthResponse;
use crate::service::{HealthSnapshot, SpotService};
use crate::version::VersionInfo;

#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: HealthResponse,
    pub total_spots: usize,
    pub available_spots: usize,
    pub down_spots: usize,
    pub queue_length: usize,
    pub version: VersionInfo,
}

impl From<HealthSnapshot> for HealthCheckResponse {
    fn from(snapshot: HealthSnapshot) -> Self {
        let status = if snapshot.is_busy() {
            HealthResponse::Busy
        } else {
            snapshot.state.into()
        };

        Self {
            status,
            total_spots: snapshot.total_spots,
            available_spots: snapshot.available_spots,
            down_spots: snapshot.down_spots,
            queue_length: snapshot.queue_length,
            version: snapshot.version,
        }
    }
}

/// Inbound chat message: who said what.
#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    pub user: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub lines: Vec<String>,
}

async fn health_check(State(service): State<Arc<SpotService>>) -> Json<HealthCheckResponse> {
    Json(service.health().await.into())
}

async fn spots(State(service): State<Arc<SpotService>>) -> Json<PoolSnapshot> {
    Json(service.snapshot())
}

async fn command(
    State(service): State<Arc<SpotService>>,
    Json(request): Json<CommandRequest>,
) -> impl IntoResponse {
    let user = request.user.trim();
    if user.is_empty() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({
                "detail": [{
                    "loc": ["body", "user"],
                    "msg": "user must not be empty",
                    "type": "value_error"
                }]
            })),
        );
    }

    // Unrecognized text is ignored: no lines, no state change.
    let lines = service
        .dispatch(RequesterId::new(user), &request.text)
        .await
        .unwrap_or_default();

    (
        StatusCode::OK,
        Json(serde_json::json!(CommandResponse { lines })),
    )
}

async fn shutdown(State(service): State<Arc<SpotService>>) -> impl IntoResponse {
    service.trigger_shutdown();
    StatusCode::OK
}

pub fn routes(service: Arc<SpotService>) -> Router {
    Router::new()
        .route("/health-check", get(health_check))
        .route("/spots", get(spots))
        .route("/commands", post(command))
        .route("/shutdown", post(shutdown))
        .with_state(service)
}
