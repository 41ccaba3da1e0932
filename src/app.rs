use axum::{http::HeaderValue, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::db::{DocumentStore, MemStore, PgStore};
use crate::docs::ApiDoc;
use crate::routes::create_api_routes;
use crate::state::AppState;
use crate::websocket::websocket_handler;

/// Pick the document store for this configuration. A database that cannot
/// be reached leaves the relay running on the in-memory store.
pub async fn open_store(config: &Config) -> Arc<dyn DocumentStore> {
    match &config.db_url {
        Some(db_url) => match PgStore::connect(db_url).await {
            Ok(store) => {
                info!("Database initialized successfully");
                Arc::new(store)
            }
            Err(e) => {
                error!("Failed to initialize database: {}", e);
                warn!("Documents will be kept in memory and lost on restart");
                Arc::new(MemStore::new())
            }
        },
        None => {
            warn!("No database URL configured - documents will be kept in memory");
            Arc::new(MemStore::new())
        }
    }
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origin_list()
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    if !origins.is_empty() {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    } else if config.is_development() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    }
}

/// The full HTTP surface: CRUD API, WebSocket relay and Swagger UI
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    let app_routes = Router::new()
        .nest("/api", create_api_routes())
        .route("/ws", get(websocket_handler))
        .with_state(state);

    app_routes
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
