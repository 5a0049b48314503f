//! Login identities and their sessions.

use moduleab_core::roles::RoleFlags;
use moduleab_core::types::{EntityId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A user row from the `users` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct User {
    pub id: EntityId,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role_flags: i32,
    pub is_active: bool,
    pub created_at: Timestamp,
}

impl User {
    pub fn roles(&self) -> RoleFlags {
        RoleFlags(self.role_flags)
    }
}

/// Body of `POST /users`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUser {
    #[validate(length(min = 3, max = 64))]
    pub username: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    /// One of `user`, `operator`, `admin`.
    pub role: String,
}

/// A login session from the `user_sessions` table.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Session {
    pub id: EntityId,
    pub user_id: EntityId,
    pub expires_at: Timestamp,
    pub is_revoked: bool,
    pub created_at: Timestamp,
}

impl Session {
    /// Not revoked and not yet expired at `now`.
    pub fn is_active_at(&self, now: Timestamp) -> bool {
        !self.is_revoked && self.expires_at > now
    }
}
