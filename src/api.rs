use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crate::dead_letter::{DeadLetterError, DeadLetterService};
use crate::models::dead_letter::DeadLetterMessage;
use crate::models::response::ApiResponse;
use crate::queue::PriorityNotificationQueue;

pub struct AppState {
    pub queue: Arc<PriorityNotificationQueue>,
    pub dead_letters: DeadLetterService,
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub queue_depth: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub unprocessed_dead_letters: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub timestamp: DateTime<Utc>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Queue depth plus a dead-letter store probe; a store that cannot answer
/// the unprocessed query marks the service unhealthy.
pub async fn build_health_report(
    queue: &PriorityNotificationQueue,
    dead_letters: &DeadLetterService,
) -> HealthReport {
    match dead_letters.unprocessed().await {
        Ok(unprocessed) => HealthReport {
            status: "healthy",
            queue_depth: queue.len(),
            unprocessed_dead_letters: Some(unprocessed.len()),
            error: None,
            timestamp: Utc::now(),
        },
        Err(e) => HealthReport {
            status: "unhealthy",
            queue_depth: queue.len(),
            unprocessed_dead_letters: None,
            error: Some(e.to_string()),
            timestamp: Utc::now(),
        },
    }
}

impl IntoResponse for DeadLetterError {
    fn into_response(self) -> Response {
        let status = match &self {
            DeadLetterError::NotFound(_) => StatusCode::NOT_FOUND,
            DeadLetterError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = ApiResponse::<()>::error(self.to_string(), "Request failed".to_string());
        (status, Json(body)).into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/dead-letters", get(list_dead_letters))
        .route("/dead-letters/unprocessed", get(list_unprocessed))
        .route("/dead-letters/{id}/process", post(process_dead_letter))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_api_server(state: Arc<AppState>, port: u16) -> anyhow::Result<()> {
    let app = router(state);

    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr).await?;

    info!(address = %addr, "Admin API server started");

    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let report = build_health_report(&state.queue, &state.dead_letters).await;

    let status_code = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(report))
}

async fn list_dead_letters(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<DeadLetterMessage>>>, DeadLetterError> {
    let messages = state.dead_letters.all().await?;

    Ok(Json(ApiResponse::success(
        messages,
        "Dead letters retrieved".to_string(),
    )))
}

async fn list_unprocessed(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<DeadLetterMessage>>>, DeadLetterError> {
    let messages = state.dead_letters.unprocessed().await?;

    Ok(Json(ApiResponse::success(
        messages,
        "Unprocessed dead letters retrieved".to_string(),
    )))
}

async fn process_dead_letter(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<DeadLetterMessage>>, DeadLetterError> {
    let message = state.dead_letters.process(id).await?;

    Ok(Json(ApiResponse::success(
        message,
        "Dead letter marked as processed".to_string(),
    )))
}
