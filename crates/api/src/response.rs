//! Shared response envelope types for API handlers.
//!
//! Every response body uses a `{ "data": ... }` envelope.

use moduleab_core::types::EntityId;
use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

/// Body of create and update responses.
#[derive(Debug, Serialize)]
pub struct IdResponse {
    pub id: EntityId,
}
