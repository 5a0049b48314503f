//! Route definitions for the `/auth` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::auth;
use crate::state::AppState;

/// Routes reachable without authentication, mounted at the API root.
///
/// ```text
/// POST /auth/login    -> login
/// ```
pub fn public_router() -> Router<AppState> {
    Router::new().route("/auth/login", post(auth::login))
}

/// Routes behind the gate, mounted at `/auth`.
///
/// ```text
/// POST /logout   -> logout
/// GET  /me       -> me
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}
