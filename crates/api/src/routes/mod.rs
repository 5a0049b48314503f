pub mod auth;
pub mod health;
pub mod resources;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the gated part of the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/logout                 end the caller's session
/// /auth/me                     the caller's identity
///
/// /users                       list, create (admin only)
///
/// /hosts[/{name}]              hydrated with app set, paths, jobs
/// /appSets[/{name}]            hydrated with hosts, backup sets
/// /oss[/{bucket_name}]
/// /oas[/{vault_name}]
/// /backupSets[/{name}]         hydrated two hops deep
/// /policies[/{name}]
/// /paths[/{pattern}]           hydrated with hosts
/// /client/jobs[/{id}]
/// ```
///
/// `/auth/login` is mounted separately, outside the gate.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/hosts", resources::hosts())
        .nest("/appSets", resources::app_sets())
        .nest("/oss", resources::oss())
        .nest("/oas", resources::oas())
        .nest("/backupSets", resources::backup_sets())
        .nest("/policies", resources::policies())
        .nest("/paths", resources::paths())
        .nest("/client/jobs", resources::client_jobs())
}
