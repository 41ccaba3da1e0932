use axum::{extract::State, http::StatusCode, Json};
use crate::models::HealthResponse;
use crate::state::AppState;
use tracing::{debug, error};

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    debug!("Health check requested");
    Json(HealthResponse {
        status: "ok".to_string(),
        message: format!("{} is running", state.config.service_name),
    })
}

/// Readiness check endpoint. Ready once the document store answers.
pub async fn ready_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    debug!("Readiness check requested");
    match state.store.get(0).await {
        Ok(_) => (StatusCode::OK, Json(HealthResponse {
            status: "ok".to_string(),
            message: "Service is ready".to_string(),
        })),
        Err(e) => {
            error!("Document store not reachable: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, Json(HealthResponse {
                status: "unavailable".to_string(),
                message: "Document store not reachable".to_string(),
            }))
        }
    }
}
