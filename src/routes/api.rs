use crate::handlers::{
    create_document, delete_document, diagnostics, get_document, health_check, list_documents, ready_check,
    update_document,
};
use crate::state::AppState;
use axum::{routing::get, Router};

/// Create API routes
pub fn create_api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .route("/v1/diagnostics", get(diagnostics))
        .route("/documents", get(list_documents).post(create_document))
        .route(
            "/documents/:id",
            get(get_document).put(update_document).delete(delete_document),
        )
}
