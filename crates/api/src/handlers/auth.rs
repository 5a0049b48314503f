//! Handlers for the `/auth` resource (login, logout, me).

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{Duration, Utc};
use moduleab_core::error::CoreError;
use moduleab_core::types::{new_id, Timestamp};
use moduleab_db::models::{Session, User};
use serde::{Deserialize, Serialize};

use crate::auth::jwt::generate_session_token;
use crate::auth::password::verify_password;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::Caller;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Bearer token for the `Authorization` header.
    pub token: String,
    pub expires_at: Timestamp,
    pub user: User,
    pub role: &'static str,
}

/// The caller as reported by `GET /auth/me`.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Identity {
    ApiClient { key: String },
    User { user: User, role: &'static str },
}

/// POST /api/v1/auth/login
///
/// Verify username + password and open a session.
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let invalid =
        || AppError::Core(CoreError::Unauthorized("Invalid username or password".into()));

    let user = state
        .store
        .find_user_by_username(input.username.trim())
        .await?
        .ok_or_else(invalid)?;

    if !user.is_active {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }

    let password_valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !password_valid {
        tracing::warn!(username = %user.username, "Failed login attempt");
        return Err(invalid());
    }

    let now = Utc::now();
    let session = Session {
        id: new_id(),
        user_id: user.id,
        expires_at: now + Duration::minutes(state.config.jwt.session_expiry_mins),
        is_revoked: false,
        created_at: now,
    };
    state.store.create_session(&session).await?;

    let token = generate_session_token(&user, &session, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    tracing::info!(user_id = %user.id, session_id = %session.id, "User logged in");
    Ok(Json(DataResponse {
        data: LoginResponse {
            token,
            expires_at: session.expires_at,
            role: user.roles().name(),
            user,
        },
    }))
}

/// POST /api/v1/auth/logout
///
/// Revoke the caller's session. Returns 204 No Content.
pub async fn logout(caller: Caller, State(state): State<AppState>) -> AppResult<StatusCode> {
    let Caller::Session { session_id, .. } = caller else {
        return Err(AppError::BadRequest(
            "Signed requests have no session to end".into(),
        ));
    };
    state.store.revoke_session(session_id).await?;
    tracing::info!(%session_id, "Session revoked");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/auth/me
pub async fn me(caller: Caller, State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let identity = match caller {
        Caller::ApiClient { key } => Identity::ApiClient { key },
        Caller::Session { user_id, .. } => {
            let user = state.store.find_user(user_id).await?.ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized("User no longer exists".into()))
            })?;
            Identity::User {
                role: user.roles().name(),
                user,
            }
        }
    };
    Ok(Json(DataResponse { data: identity }))
}
