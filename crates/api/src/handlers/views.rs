//! Reads of the resources that are returned hydrated with their relations.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use moduleab_core::pagination::Page;
use moduleab_db::models::{AppSetFilter, BackupSetFilter, HostFilter, PathFilter};

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/hosts
pub async fn list_hosts(
    State(state): State<AppState>,
    Query(filter): Query<HostFilter>,
    Query(page): Query<Page>,
) -> AppResult<impl IntoResponse> {
    let hosts = state.catalog.hosts(&filter, page).await?;
    Ok(Json(DataResponse { data: hosts }))
}

/// GET /api/v1/hosts/{name}
pub async fn get_host(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<impl IntoResponse> {
    let host = state.catalog.host(&name).await?;
    Ok(Json(DataResponse { data: host }))
}

/// GET /api/v1/appSets
pub async fn list_app_sets(
    State(state): State<AppState>,
    Query(filter): Query<AppSetFilter>,
    Query(page): Query<Page>,
) -> AppResult<impl IntoResponse> {
    let app_sets = state.catalog.app_sets(&filter, page).await?;
    Ok(Json(DataResponse { data: app_sets }))
}

/// GET /api/v1/appSets/{name}
pub async fn get_app_set(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<impl IntoResponse> {
    let app_set = state.catalog.app_set(&name).await?;
    Ok(Json(DataResponse { data: app_set }))
}

/// GET /api/v1/backupSets
///
/// Each set comes with its targets, policies and member hosts, and each
/// host with its own paths and jobs.
pub async fn list_backup_sets(
    State(state): State<AppState>,
    Query(filter): Query<BackupSetFilter>,
    Query(page): Query<Page>,
) -> AppResult<impl IntoResponse> {
    let sets = state.catalog.backup_sets(&filter, page).await?;
    Ok(Json(DataResponse { data: sets }))
}

/// GET /api/v1/backupSets/{name}
pub async fn get_backup_set(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<impl IntoResponse> {
    let set = state.catalog.backup_set(&name).await?;
    Ok(Json(DataResponse { data: set }))
}

/// GET /api/v1/paths
pub async fn list_paths(
    State(state): State<AppState>,
    Query(filter): Query<PathFilter>,
    Query(page): Query<Page>,
) -> AppResult<impl IntoResponse> {
    let paths = state.catalog.paths(&filter, page).await?;
    Ok(Json(DataResponse { data: paths }))
}

/// GET /api/v1/paths/{pattern}
///
/// The pattern is percent-encoded into a single segment, `/etc` becoming
/// `%2Fetc`.
pub async fn get_path(
    State(state): State<AppState>,
    Path(pattern): Path<String>,
) -> AppResult<impl IntoResponse> {
    let path = state.catalog.path(&pattern).await?;
    Ok(Json(DataResponse { data: path }))
}
