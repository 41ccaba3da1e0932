use utoipa::OpenApi;
use crate::models::*;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// List documents
#[utoipa::path(
    get,
    path = "/api/documents",
    params(
        ("filename" = Option<String>, Query, description = "Only return documents with this exact filename")
    ),
    responses(
        (status = 200, description = "All documents", body = [Document]),
        (status = 500, description = "Store failure", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn list_documents_doc() {}

/// Get a document
#[utoipa::path(
    get,
    path = "/api/documents/{id}",
    params(("id" = i64, Path, description = "Document id")),
    responses(
        (status = 200, description = "The document", body = Document),
        (status = 404, description = "No such document", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn get_document_doc() {}

/// Create a document
#[utoipa::path(
    post,
    path = "/api/documents",
    request_body = NewDocument,
    responses(
        (status = 201, description = "Document created", body = Document),
        (status = 400, description = "Missing or invalid fields", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn create_document_doc() {}

/// Update a document
#[utoipa::path(
    put,
    path = "/api/documents/{id}",
    params(("id" = i64, Path, description = "Document id")),
    request_body = DocumentPatch,
    responses(
        (status = 200, description = "Document updated", body = Document),
        (status = 400, description = "Invalid fields", body = ErrorResponse),
        (status = 404, description = "No such document", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn update_document_doc() {}

/// Delete a document
#[utoipa::path(
    delete,
    path = "/api/documents/{id}",
    params(("id" = i64, Path, description = "Document id")),
    responses(
        (status = 204, description = "Document deleted"),
        (status = 404, description = "No such document", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn delete_document_doc() {}

/// Session and host diagnostics
#[utoipa::path(
    get,
    path = "/api/v1/diagnostics",
    responses(
        (status = 200, description = "Current diagnostics", body = DiagnosticsResponse)
    )
)]
#[allow(dead_code)]
pub async fn diagnostics_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        list_documents_doc,
        get_document_doc,
        create_document_doc,
        update_document_doc,
        delete_document_doc,
        diagnostics_doc,
    ),
    components(
        schemas(HealthResponse, Document, NewDocument, DocumentPatch, ErrorResponse, DiagnosticsResponse)
    ),
    tags(
        (name = "documents", description = "Document CRUD endpoints")
    )
)]
pub struct ApiDoc;
