use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use moduleab_core::error::CoreError;
use moduleab_core::signing::SignatureError;
use moduleab_core::vault::VaultError;
use moduleab_db::error::DataError;
use moduleab_db::store::StoreError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps the error of every layer below and maps each to one status code.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `moduleab_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// An engine or catalog failure.
    #[error(transparent)]
    Data(#[from] DataError),

    /// A direct store failure (account records, health).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A rejected request signature.
    #[error("Invalid signature: {0}")]
    Signature(#[from] SignatureError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

type Classified = (StatusCode, &'static str, String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => classify_core(core),
            AppError::Data(data) => classify_data(data),
            AppError::Store(store) => classify_store(store),
            AppError::Signature(err) => {
                tracing::warn!(error = %err, "Rejected signed request");
                (StatusCode::FORBIDDEN, "FORBIDDEN", format!("Invalid signature: {err}"))
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => internal(msg),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn classify_core(err: &CoreError) -> Classified {
    match err {
        CoreError::NotFound { entity, key } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} not found: {key}"),
        ),
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
        CoreError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
        CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
        CoreError::Remote(msg) => remote(msg),
        CoreError::Internal(msg) => internal(msg),
    }
}

fn classify_data(err: &DataError) -> Classified {
    match err {
        DataError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        DataError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string()),
        DataError::Store(store) => classify_store(store),
        // A vault name the archive service does not know is the caller's to fix.
        DataError::Vault(VaultError::NotFound(name)) => (
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            format!("Bad info: vault_name:no archive vault named '{name}'"),
        ),
        DataError::Vault(VaultError::Remote(msg)) => remote(msg),
        DataError::Core(core) => classify_core(core),
    }
}

/// Constraint violations are caller errors; everything else is sanitized.
fn classify_store(err: &StoreError) -> Classified {
    match err {
        StoreError::UniqueViolation(constraint) => (
            StatusCode::CONFLICT,
            "CONFLICT",
            format!("Duplicate value violates unique constraint: {constraint}"),
        ),
        StoreError::MissingReference(constraint) => (
            StatusCode::BAD_REQUEST,
            "MISSING_REFERENCE",
            format!("Referenced entity does not exist: {constraint}"),
        ),
        StoreError::Stale(entity) => (
            StatusCode::CONFLICT,
            "CONFLICT",
            format!("{entity} was modified concurrently, retry the request"),
        ),
        StoreError::Database(_) | StoreError::Unavailable(_) => internal(&err.to_string()),
    }
}

fn remote(msg: &str) -> Classified {
    tracing::error!(error = %msg, "Archive service error");
    (StatusCode::BAD_GATEWAY, "REMOTE_ERROR", msg.to_string())
}

fn internal(msg: &str) -> Classified {
    tracing::error!(error = %msg, "Internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}
