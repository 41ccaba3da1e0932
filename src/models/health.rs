use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Liveness and readiness payload
#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}
