//! The storage seam.
//!
//! [`Store`] is everything the engine, the catalog and the HTTP layer need
//! from a backend: filtered reads per entity ([`Table`]), join-table reads,
//! account records, and [`Store::apply`], which executes a unit of work
//! atomically. [`PgStore`] is the production backend; [`MemoryStore`] keeps
//! everything in process and backs the test suites.

mod memory;
mod postgres;

use async_trait::async_trait;
use moduleab_core::pagination::Page;
use moduleab_core::types::EntityId;

use crate::models::{
    AppSet, BackupPath, BackupSet, ClientJob, Entity, EntityKind, Host, Membership, Oas, Oss,
    Policy, Record, Session, User,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// One step of a unit of work.
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    Insert(Record),
    /// Overwrite every column of the row with the record's id.
    Update(Record),
    /// Make `members` the complete membership of `owner`; duplicates collapse.
    ReplaceMembers {
        membership: Membership,
        owner: EntityId,
        members: Vec<EntityId>,
    },
    ClearMembers {
        membership: Membership,
        owner: EntityId,
    },
    /// Remove a row; nullable foreign keys pointing at it are set to null.
    Delete {
        kind: EntityKind,
        id: EntityId,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Duplicate value violates unique constraint: {0}")]
    UniqueViolation(String),

    #[error("Foreign key violation: {0}")]
    MissingReference(String),

    /// An update or delete matched no row: the target vanished after lookup.
    #[error("{0} row disappeared during the transaction")]
    Stale(&'static str),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let constraint = db_err.constraint().unwrap_or("unknown").to_string();
            match db_err.code().as_deref() {
                Some("23505") => return StoreError::UniqueViolation(constraint),
                Some("23503") => return StoreError::MissingReference(constraint),
                _ => {}
            }
        }
        StoreError::Database(err)
    }
}

/// Filtered reads of one entity type.
#[async_trait]
pub trait Table<E: Entity>: Send + Sync {
    /// Rows matching every set filter field, ordered by lookup key.
    async fn find(&self, filter: &E::Filter, page: Page) -> Result<Vec<E>, StoreError>;

    /// Rows with the given ids, ordered by lookup key; unknown ids are skipped.
    async fn get_many(&self, ids: &[EntityId]) -> Result<Vec<E>, StoreError>;
}

/// Users and their sessions.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn create_user(&self, user: &User) -> Result<(), StoreError>;

    async fn find_user(&self, id: EntityId) -> Result<Option<User>, StoreError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    async fn create_session(&self, session: &Session) -> Result<(), StoreError>;

    /// A session that is neither revoked nor expired.
    async fn find_active_session(&self, id: EntityId) -> Result<Option<Session>, StoreError>;

    /// Revoke a session. Returns `true` if it was active.
    async fn revoke_session(&self, id: EntityId) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait Store:
    Table<Host>
    + Table<AppSet>
    + Table<Oss>
    + Table<Oas>
    + Table<BackupSet>
    + Table<Policy>
    + Table<BackupPath>
    + Table<ClientJob>
    + AccountStore
    + Send
    + Sync
{
    /// Execute every write or none of them.
    async fn apply(&self, writes: Vec<Write>) -> Result<(), StoreError>;

    /// Ids on the member side of `owner`'s membership.
    async fn members(
        &self,
        membership: Membership,
        owner: EntityId,
    ) -> Result<Vec<EntityId>, StoreError>;

    /// Prove the backend is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}
