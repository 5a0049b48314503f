//! Handlers for `/users` (admin only) and the bootstrap administrator.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use moduleab_core::error::CoreError;
use moduleab_core::roles::RoleFlags;
use moduleab_core::types::new_id;
use moduleab_core::validation;
use moduleab_db::models::{CreateUser, User};
use moduleab_db::store::Store;

use crate::auth::password::hash_password;
use crate::config::AdminSeed;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::Caller;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/users
pub async fn create_user(
    caller: Caller,
    State(state): State<AppState>,
    Json(input): Json<CreateUser>,
) -> AppResult<impl IntoResponse> {
    validation::check(&input)?;
    let roles = RoleFlags::from_name(&input.role).ok_or_else(|| {
        CoreError::Validation(format!("Bad info: role:unknown role '{}'", input.role))
    })?;

    let user = new_user(input.username.trim(), &input.password, roles)?;
    state.store.create_user(&user).await?;

    tracing::info!(?caller, user_id = %user.id, role = roles.name(), "User created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: user })))
}

/// GET /api/v1/users
pub async fn list_users(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let users = state.store.list_users().await?;
    Ok(Json(DataResponse { data: users }))
}

/// Create the configured administrator unless a user of that name exists.
///
/// Returns `true` when an account was created.
pub async fn seed_admin(store: &dyn Store, seed: &AdminSeed) -> AppResult<bool> {
    if store.find_user_by_username(&seed.username).await?.is_some() {
        return Ok(false);
    }
    let admin = new_user(&seed.username, &seed.password, RoleFlags::ADMIN)?;
    store.create_user(&admin).await?;
    tracing::info!(username = %admin.username, "Bootstrap administrator created");
    Ok(true)
}

fn new_user(username: &str, password: &str, roles: RoleFlags) -> AppResult<User> {
    let password_hash = hash_password(password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;
    Ok(User {
        id: new_id(),
        username: username.to_string(),
        password_hash,
        role_flags: roles.bits(),
        is_active: true,
        created_at: Utc::now(),
    })
}
