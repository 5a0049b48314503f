/// Every entity is keyed by a server-generated UUID v4.
pub type EntityId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Generate a fresh entity identifier.
pub fn new_id() -> EntityId {
    uuid::Uuid::new_v4()
}
