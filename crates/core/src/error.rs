/// Domain-level error shared by every crate in the workspace.
///
/// Store and transport failures have their own error types in the crates
/// that own them; this enum carries the outcomes the domain itself decides.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with key {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Remote service error: {0}")]
    Remote(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
