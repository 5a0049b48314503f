//! Handlers shared by every metadata resource.
//!
//! Each handler is generic over the entity (or its payload) and is mounted
//! once per resource by [`routes::resources`](crate::routes::resources).
//! Resources whose listings are hydrated use [`views`](super::views) for
//! their reads instead of [`list`] and [`get`].

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use moduleab_core::pagination::Page;
use moduleab_db::models::{Entity, Payload};
use moduleab_db::store::{Store, Table};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::AppResult;
use crate::middleware::auth::Caller;
use crate::response::{DataResponse, IdResponse};
use crate::state::AppState;

/// POST /api/v1/{resource}
///
/// Create an entity and its initial memberships. Returns 201 with the id.
pub async fn create<P>(
    caller: Caller,
    State(state): State<AppState>,
    Json(payload): Json<P>,
) -> AppResult<impl IntoResponse>
where
    P: Payload + DeserializeOwned + 'static,
    dyn Store: Table<P::Entity>,
{
    let id = state.engine.create(payload).await?;
    tracing::info!(?caller, %id, "Resource created");
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: IdResponse { id },
        }),
    ))
}

/// GET /api/v1/{resource}
///
/// Plain records matching the query-string filter, windowed by
/// `limit`/`offset`.
pub async fn list<E>(
    State(state): State<AppState>,
    Query(filter): Query<E::Filter>,
    Query(page): Query<Page>,
) -> AppResult<impl IntoResponse>
where
    E: Entity + Serialize,
    E::Filter: DeserializeOwned,
    dyn Store: Table<E>,
{
    let rows = state.catalog.find::<E>(&filter, page).await?;
    Ok(Json(DataResponse { data: rows }))
}

/// GET /api/v1/{resource}/{key}
pub async fn get<E>(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<impl IntoResponse>
where
    E: Entity + Serialize,
    dyn Store: Table<E>,
{
    let row = state.catalog.get::<E>(&key).await?;
    Ok(Json(DataResponse { data: row }))
}

/// PUT /api/v1/{resource}/{key}
///
/// Replace the scalar fields, and every relation set the body names.
/// Returns 202 with the (unchanged) id.
pub async fn update<P>(
    caller: Caller,
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(payload): Json<P>,
) -> AppResult<impl IntoResponse>
where
    P: Payload + DeserializeOwned + 'static,
    dyn Store: Table<P::Entity>,
{
    let id = state.engine.update(&key, payload).await?;
    tracing::info!(?caller, %id, %key, "Resource updated");
    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: IdResponse { id },
        }),
    ))
}

/// DELETE /api/v1/{resource}/{key}
pub async fn delete<E>(
    caller: Caller,
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<StatusCode>
where
    E: Entity,
    dyn Store: Table<E>,
{
    let id = state.engine.delete::<E>(&key).await?;
    tracing::info!(?caller, %id, %key, "Resource deleted");
    Ok(StatusCode::NO_CONTENT)
}
