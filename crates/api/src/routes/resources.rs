//! Route definitions for the metadata resources.
//!
//! Every resource has the same shape, keyed by its lookup field:
//!
//! ```text
//! POST   /         -> create (201)
//! GET    /         -> list (?filter fields, limit, offset)
//! GET    /{key}    -> get
//! PUT    /{key}    -> update (202)
//! DELETE /{key}    -> delete (204)
//! ```

use axum::routing::get;
use axum::Router;
use moduleab_db::models::{
    AppSet, AppSetPayload, BackupPath, BackupSet, BackupSetPayload, ClientJob, ClientJobPayload,
    Host, HostPayload, Oas, OasPayload, Oss, OssPayload, PathPayload, Policy, PolicyPayload,
};

use crate::handlers::{resource, views};
use crate::state::AppState;

/// `/hosts`, keyed by name.
pub fn hosts() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(views::list_hosts).post(resource::create::<HostPayload>),
        )
        .route(
            "/{key}",
            get(views::get_host)
                .put(resource::update::<HostPayload>)
                .delete(resource::delete::<Host>),
        )
}

/// `/appSets`, keyed by name.
pub fn app_sets() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(views::list_app_sets).post(resource::create::<AppSetPayload>),
        )
        .route(
            "/{key}",
            get(views::get_app_set)
                .put(resource::update::<AppSetPayload>)
                .delete(resource::delete::<AppSet>),
        )
}

/// `/oss`, keyed by bucket name.
pub fn oss() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(resource::list::<Oss>).post(resource::create::<OssPayload>),
        )
        .route(
            "/{key}",
            get(resource::get::<Oss>)
                .put(resource::update::<OssPayload>)
                .delete(resource::delete::<Oss>),
        )
}

/// `/oas`, keyed by vault name.
pub fn oas() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(resource::list::<Oas>).post(resource::create::<OasPayload>),
        )
        .route(
            "/{key}",
            get(resource::get::<Oas>)
                .put(resource::update::<OasPayload>)
                .delete(resource::delete::<Oas>),
        )
}

/// `/backupSets`, keyed by name.
pub fn backup_sets() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(views::list_backup_sets).post(resource::create::<BackupSetPayload>),
        )
        .route(
            "/{key}",
            get(views::get_backup_set)
                .put(resource::update::<BackupSetPayload>)
                .delete(resource::delete::<BackupSet>),
        )
}

/// `/policies`, keyed by name.
pub fn policies() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(resource::list::<Policy>).post(resource::create::<PolicyPayload>),
        )
        .route(
            "/{key}",
            get(resource::get::<Policy>)
                .put(resource::update::<PolicyPayload>)
                .delete(resource::delete::<Policy>),
        )
}

/// `/paths`, keyed by the percent-encoded pattern.
pub fn paths() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(views::list_paths).post(resource::create::<PathPayload>),
        )
        .route(
            "/{key}",
            get(views::get_path)
                .put(resource::update::<PathPayload>)
                .delete(resource::delete::<BackupPath>),
        )
}

/// `/client/jobs`, keyed by job id.
pub fn client_jobs() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(resource::list::<ClientJob>).post(resource::create::<ClientJobPayload>),
        )
        .route(
            "/{key}",
            get(resource::get::<ClientJob>)
                .put(resource::update::<ClientJobPayload>)
                .delete(resource::delete::<ClientJob>),
        )
}
