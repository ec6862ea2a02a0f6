use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use dalma_catalog::CatalogError;
use dalma_core::error::CoreError;
use dalma_meshy::MeshyError;
use dalma_storage::StorageError;

/// Application-level error type for HTTP handlers.
///
/// Wraps the domain error types and implements [`IntoResponse`] to produce
/// consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `dalma_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A catalog service error.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// A generation service error.
    #[error(transparent)]
    Generator(#[from] MeshyError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => classify_core_error(core),

            AppError::Catalog(err) => match err {
                CatalogError::NotFound { id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("Asset with id {id} not found"),
                ),
                CatalogError::Validation(core) => classify_core_error(core),
                CatalogError::Storage(err) => classify_storage_error(err),
                CatalogError::Db(err) => classify_sqlx_error(err),
            },

            AppError::Generator(err) => classify_meshy_error(err),

            AppError::Database(err) => classify_sqlx_error(err),

            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn classify_core_error(err: &CoreError) -> (StatusCode, &'static str, String) {
    match err {
        CoreError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}

/// Classify a generation service error into an HTTP response.
///
/// The distinctions matter to clients:
/// - "not ready yet" and "already linked" are conflicts (409), retryable
///   later,
/// - an unknown format is the caller's error (400),
/// - an exhausted poll budget is a gateway timeout (504), the task may
///   still finish,
/// - a generator-reported failure or unreachable service is a bad
///   gateway (502).
fn classify_meshy_error(err: &MeshyError) -> (StatusCode, &'static str, String) {
    match err {
        MeshyError::ResultNotReady { .. } => {
            (StatusCode::CONFLICT, "RESULT_NOT_READY", err.to_string())
        }
        MeshyError::UnsupportedFormat { .. } => {
            (StatusCode::BAD_REQUEST, "UNSUPPORTED_FORMAT", err.to_string())
        }
        MeshyError::PollTimeout { .. } => {
            (StatusCode::GATEWAY_TIMEOUT, "GENERATION_TIMEOUT", err.to_string())
        }
        MeshyError::TaskFailed { .. } => {
            (StatusCode::BAD_GATEWAY, "GENERATION_FAILED", err.to_string())
        }
        MeshyError::Cancelled { .. } => (
            StatusCode::SERVICE_UNAVAILABLE,
            "SHUTTING_DOWN",
            err.to_string(),
        ),
        MeshyError::Transport(inner) => {
            tracing::error!(error = %inner, "Generation service unreachable");
            (
                StatusCode::BAD_GATEWAY,
                "GENERATOR_UNAVAILABLE",
                "Generation service unreachable".to_string(),
            )
        }
        MeshyError::Api { status, body } => {
            tracing::error!(status, body = %body, "Generation service error");
            (
                StatusCode::BAD_GATEWAY,
                "GENERATOR_ERROR",
                format!("Generation service returned status {status}"),
            )
        }
    }
}

fn classify_storage_error(err: &StorageError) -> (StatusCode, &'static str, String) {
    tracing::error!(error = %err, "Blob storage error");
    (
        StatusCode::BAD_GATEWAY,
        "STORAGE_ERROR",
        "Blob storage operation failed".to_string(),
    )
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations (constraint name starting with `uq_`) map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) => {
            // PostgreSQL unique constraint violation: error code 23505
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return (
                        StatusCode::CONFLICT,
                        "CONFLICT",
                        format!("Duplicate value violates unique constraint: {constraint}"),
                    );
                }
            }
            tracing::error!(error = %db_err, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
        other => {
            tracing::error!(error = %other, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}
