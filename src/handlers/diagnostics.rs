use crate::{models::{ApiError, DiagnosticsResponse, ErrorResponse}, state::AppState};
use axum::{extract::State, http::StatusCode, Json};
use std::sync::{Mutex, OnceLock};
use sysinfo::System;
use tracing::{error, info};

static SYSTEM_MONITOR: OnceLock<Mutex<System>> = OnceLock::new();

/// Report live sessions and host load
pub async fn diagnostics(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<DiagnosticsResponse>), ApiError> {
    let sessions = state.registry.stats().await;

    let n_stored_docs = match state.store.count().await {
        Ok(total) => total as u32,
        Err(e) => {
            error!("Failed to count documents for diagnostics: {}", e);
            return Err(ErrorResponse::reply(StatusCode::INTERNAL_SERVER_ERROR, "Failed to collect diagnostics"));
        }
    };

    let (cpu_usage, memory_alloc, memory_free, memory_total) = {
        let sys_lock = SYSTEM_MONITOR.get_or_init(|| Mutex::new(System::new_all()));
        match sys_lock.lock() {
            Ok(mut sys) => {
                sys.refresh_cpu();
                sys.refresh_memory();
                (
                    sys.global_cpu_info().cpu_usage(),
                    sys.used_memory(),
                    sys.free_memory(),
                    sys.total_memory(),
                )
            }
            Err(_) => (0.0, 0, 0, 0),
        }
    };

    info!(
        "Diagnostics: CPU: {:.2}%, Mem: {}/{} MB, Conn: {}, Joined: {}, Docs open: {}",
        cpu_usage,
        memory_alloc / 1024 / 1024,
        memory_total / 1024 / 1024,
        sessions.connections,
        sessions.joined,
        sessions.open_documents
    );

    Ok((
        StatusCode::OK,
        Json(DiagnosticsResponse {
            n_conn: sessions.connections as u32,
            n_joined: sessions.joined as u32,
            n_open_docs: sessions.open_documents as u32,
            n_stored_docs,
            cpu_usage,
            memory_alloc,
            memory_total,
            memory_free,
        }),
    ))
}
