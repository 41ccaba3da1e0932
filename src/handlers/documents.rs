use axum::{
    extract::{rejection::{JsonRejection, PathRejection}, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::models::{ApiError, Document, DocumentPatch, ErrorResponse, NewDocument};
use crate::state::AppState;

#[derive(Deserialize, Debug)]
pub struct ListQuery {
    filename: Option<String>,
}

fn not_found() -> ApiError {
    ErrorResponse::reply(StatusCode::NOT_FOUND, "Document not found")
}

/// Ids that do not parse as integers cannot name a document
fn document_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    match path {
        Ok(Path(id)) => Ok(id),
        Err(rejection) => {
            warn!("Invalid document id: {}", rejection.body_text());
            Err(not_found())
        }
    }
}

fn invalid_body(rejection: JsonRejection) -> ApiError {
    let message = rejection.body_text();
    warn!("Rejected document payload: {}", message);
    ErrorResponse::reply(StatusCode::BAD_REQUEST, message)
}

/// List documents, optionally only those with an exact filename
pub async fn list_documents(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let result = match query.filename {
        Some(filename) => state.store.get_by_filename(&filename).await.map(|doc| doc.into_iter().collect()),
        None => state.store.list().await,
    };
    result.map(Json).map_err(|e| {
        error!("Failed to list documents: {}", e);
        ErrorResponse::reply(StatusCode::INTERNAL_SERVER_ERROR, "Failed to retrieve documents")
    })
}

/// Get a document by id
pub async fn get_document(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Document>, ApiError> {
    let id = document_id(path)?;
    match state.store.get(id).await {
        Ok(Some(doc)) => Ok(Json(doc)),
        Ok(None) => Err(not_found()),
        Err(e) => {
            error!("Failed to load document {}: {}", id, e);
            Err(ErrorResponse::reply(StatusCode::INTERNAL_SERVER_ERROR, "Failed to retrieve document"))
        }
    }
}

/// Create a document
pub async fn create_document(
    State(state): State<AppState>,
    payload: Result<Json<NewDocument>, JsonRejection>,
) -> Result<(StatusCode, Json<Document>), ApiError> {
    let Json(new_doc) = payload.map_err(invalid_body)?;
    match state.store.create(new_doc).await {
        Ok(doc) => {
            info!("Document {} created ({})", doc.id, doc.filename);
            Ok((StatusCode::CREATED, Json(doc)))
        }
        Err(e) => {
            error!("Failed to create document: {}", e);
            Err(ErrorResponse::reply(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create document"))
        }
    }
}

/// Merge the provided fields into a document
pub async fn update_document(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<DocumentPatch>, JsonRejection>,
) -> Result<Json<Document>, ApiError> {
    let id = document_id(path)?;
    let Json(patch) = payload.map_err(invalid_body)?;
    match state.store.update(id, patch).await {
        Ok(Some(doc)) => Ok(Json(doc)),
        Ok(None) => Err(not_found()),
        Err(e) => {
            error!("Failed to update document {}: {}", id, e);
            Err(ErrorResponse::reply(StatusCode::INTERNAL_SERVER_ERROR, "Failed to update document"))
        }
    }
}

/// Delete a document. Sessions joined to it are left alone.
pub async fn delete_document(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let id = document_id(path)?;
    match state.store.delete(id).await {
        Ok(true) => {
            info!("Document {} deleted", id);
            Ok(StatusCode::NO_CONTENT)
        }
        Ok(false) => Err(not_found()),
        Err(e) => {
            error!("Failed to delete document {}: {}", id, e);
            Err(ErrorResponse::reply(StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete document"))
        }
    }
}
