//! The authenticated caller, as seen by handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use moduleab_core::error::CoreError;
use moduleab_core::roles::RoleFlags;
use moduleab_core::types::EntityId;

use crate::error::AppError;

/// Who the gate let through. Inserted into request extensions by
/// [`authorize`](super::gate::authorize).
///
/// ```ignore
/// async fn my_handler(caller: Caller) -> AppResult<Json<()>> {
///     tracing::info!(?caller, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Caller {
    /// A request signed with the shared API key.
    ApiClient { key: String },
    /// A logged-in user.
    Session {
        user_id: EntityId,
        session_id: EntityId,
        roles: RoleFlags,
    },
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Caller>().cloned().ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized("Authentication required".into()))
        })
    }
}
