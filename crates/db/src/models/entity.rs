//! The contract every stored entity implements.
//!
//! Store backends never see concrete entity types in their write path: the
//! engine hands them [`Record`]s, and each record exposes its column values,
//! outgoing references and unique keys through [`Row`].

use std::fmt::Debug;

pub use moduleab_core::pagination::empty_as_none;
use moduleab_core::types::{EntityId, Timestamp};
use sqlx::postgres::PgRow;
use sqlx::FromRow;
use validator::Validate;

use super::app_set::AppSet;
use super::backup_set::BackupSet;
use super::client_job::ClientJob;
use super::host::Host;
use super::path::BackupPath;
use super::policy::Policy;
use super::target::{Oas, Oss};

/// The eight entity types the service manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Host,
    AppSet,
    Oss,
    Oas,
    BackupSet,
    Policy,
    Path,
    ClientJob,
}

impl EntityKind {
    pub fn table(self) -> &'static str {
        match self {
            EntityKind::Host => "hosts",
            EntityKind::AppSet => "app_sets",
            EntityKind::Oss => "oss_targets",
            EntityKind::Oas => "oas_targets",
            EntityKind::BackupSet => "backup_sets",
            EntityKind::Policy => "policies",
            EntityKind::Path => "paths",
            EntityKind::ClientJob => "client_jobs",
        }
    }

    /// Name used in error messages.
    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Host => "Host",
            EntityKind::AppSet => "AppSet",
            EntityKind::Oss => "Oss",
            EntityKind::Oas => "Oas",
            EntityKind::BackupSet => "BackupSet",
            EntityKind::Policy => "Policy",
            EntityKind::Path => "Path",
            EntityKind::ClientJob => "ClientJob",
        }
    }

    /// Column holding the natural lookup key.
    pub fn lookup_column(self) -> &'static str {
        match self {
            EntityKind::Host
            | EntityKind::AppSet
            | EntityKind::BackupSet
            | EntityKind::Policy => "name",
            EntityKind::Oss => "bucket_name",
            EntityKind::Oas => "vault_name",
            EntityKind::Path => "pattern",
            EntityKind::ClientJob => "id",
        }
    }

    /// ORDER BY clause used for listings.
    pub fn order_by(self) -> &'static str {
        match self {
            EntityKind::ClientJob => "created_at, id",
            other => other.lookup_column(),
        }
    }

    /// Columns carrying a unique constraint besides the primary key.
    pub fn unique_columns(self) -> &'static [&'static str] {
        match self {
            EntityKind::Host => &["name", "ip_addr"],
            EntityKind::AppSet | EntityKind::BackupSet | EntityKind::Policy => &["name"],
            EntityKind::Oss => &["bucket_name"],
            EntityKind::Oas => &["vault_name"],
            EntityKind::Path => &["pattern"],
            EntityKind::ClientJob => &[],
        }
    }

    /// Join-table memberships owned by this kind; cleared before a delete.
    pub fn memberships(self) -> &'static [Membership] {
        match self {
            EntityKind::Host => &[Membership::PathsOfHost, Membership::BackupSetsOfHost],
            EntityKind::BackupSet => &[Membership::HostsOfBackupSet],
            EntityKind::Path => &[Membership::HostsOfPath],
            _ => &[],
        }
    }
}

/// A many-to-many relation seen from one of its two sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Membership {
    PathsOfHost,
    HostsOfPath,
    HostsOfBackupSet,
    BackupSetsOfHost,
}

impl Membership {
    /// Join table backing the relation.
    pub fn table(self) -> &'static str {
        match self {
            Membership::PathsOfHost | Membership::HostsOfPath => "host_paths",
            Membership::HostsOfBackupSet | Membership::BackupSetsOfHost => "backup_set_hosts",
        }
    }

    /// `(left, right)` columns of the join table, in declaration order.
    pub fn columns(self) -> (&'static str, &'static str) {
        match self {
            Membership::PathsOfHost | Membership::HostsOfPath => ("host_id", "path_id"),
            Membership::HostsOfBackupSet | Membership::BackupSetsOfHost => {
                ("backup_set_id", "host_id")
            }
        }
    }

    /// `true` when the owner sits in the left column.
    pub fn owner_is_left(self) -> bool {
        matches!(self, Membership::PathsOfHost | Membership::HostsOfBackupSet)
    }

    pub fn owner_column(self) -> &'static str {
        let (left, right) = self.columns();
        if self.owner_is_left() {
            left
        } else {
            right
        }
    }

    pub fn member_column(self) -> &'static str {
        let (left, right) = self.columns();
        if self.owner_is_left() {
            right
        } else {
            left
        }
    }

    pub fn owner_kind(self) -> EntityKind {
        match self {
            Membership::PathsOfHost | Membership::BackupSetsOfHost => EntityKind::Host,
            Membership::HostsOfPath => EntityKind::Path,
            Membership::HostsOfBackupSet => EntityKind::BackupSet,
        }
    }

    pub fn member_kind(self) -> EntityKind {
        match self {
            Membership::PathsOfHost => EntityKind::Path,
            Membership::HostsOfPath | Membership::HostsOfBackupSet => EntityKind::Host,
            Membership::BackupSetsOfHost => EntityKind::BackupSet,
        }
    }

    /// Order an `(owner, member)` pair as `(left, right)` join columns.
    pub fn orient(self, owner: EntityId, member: EntityId) -> (EntityId, EntityId) {
        if self.owner_is_left() {
            (owner, member)
        } else {
            (member, owner)
        }
    }
}

/// A column value bound into a write or compared by a filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    OptText(Option<String>),
    Id(EntityId),
    OptId(Option<EntityId>),
    Int(i32),
    Time(Timestamp),
    OptTime(Option<Timestamp>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(
            self,
            Value::OptText(None) | Value::OptId(None) | Value::OptTime(None)
        )
    }

    /// Equality that ignores nullability wrappers, the way SQL `=` does.
    ///
    /// `NULL` never matches anything, itself included.
    pub fn matches(&self, other: &Value) -> bool {
        match (self.unwrapped(), other.unwrapped()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    fn unwrapped(&self) -> Option<Value> {
        match self {
            Value::OptText(v) => v.clone().map(Value::Text),
            Value::OptId(v) => v.map(Value::Id),
            Value::OptTime(v) => v.map(Value::Time),
            other => Some(other.clone()),
        }
    }
}

/// One `column = value` predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: &'static str,
    pub value: Value,
}

impl Condition {
    pub fn new(column: &'static str, value: Value) -> Self {
        Self { column, value }
    }
}

/// Equality filter over an entity's columns; unset fields match everything.
pub trait Filter: Default + Debug + Send + Sync {
    fn conditions(&self) -> Vec<Condition>;
}

/// Object-safe view of a stored row.
pub trait Row: Debug + Send + Sync {
    fn kind(&self) -> EntityKind;

    fn id(&self) -> EntityId;

    /// Every column with its value, primary key first.
    fn values(&self) -> Vec<(&'static str, Value)>;

    /// Entities this row points at through nullable foreign keys.
    fn references(&self) -> Vec<(EntityKind, EntityId)> {
        Vec::new()
    }

    /// Null out every foreign key pointing at `target`.
    fn detach(&mut self, _target: EntityId) {}

    /// Key the in-memory store sorts listings by; mirrors [`EntityKind::order_by`].
    fn sort_key(&self) -> String {
        let column = self.kind().lookup_column();
        match self.value(column) {
            Some(Value::Text(text)) => text,
            _ => self.id().to_string(),
        }
    }

    fn value(&self, column: &str) -> Option<Value> {
        self.values()
            .into_iter()
            .find(|(name, _)| *name == column)
            .map(|(_, value)| value)
    }
}

/// A concrete entity type.
pub trait Entity:
    Row + Validate + Clone + Unpin + 'static + for<'r> FromRow<'r, PgRow>
{
    const KIND: EntityKind;

    /// SELECT list matching the struct's fields.
    const COLUMNS: &'static str;

    type Filter: Filter;

    /// Filter selecting the entity named by a lookup key, or `None` when the
    /// key cannot name any entity of this kind.
    fn lookup(key: &str) -> Option<Self::Filter>;

    /// Trim and canonicalize fields before validation.
    fn normalize(&mut self) {}

    /// Carry server-managed state over from the row being replaced.
    fn inherit(&mut self, _previous: &Self) {}

    /// Name of an archive vault whose id still has to be looked up.
    fn unresolved_vault(&self) -> Option<&str> {
        None
    }

    fn set_vault_id(&mut self, _vault_id: String) {}

    fn into_record(self) -> Record;

    fn from_record(record: &Record) -> Option<&Self>;
}

/// A type-erased entity, as carried by writes and kept by the memory store.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Host(Host),
    AppSet(AppSet),
    Oss(Oss),
    Oas(Oas),
    BackupSet(BackupSet),
    Policy(Policy),
    Path(BackupPath),
    ClientJob(ClientJob),
}

impl Record {
    pub fn row(&self) -> &dyn Row {
        match self {
            Record::Host(e) => e,
            Record::AppSet(e) => e,
            Record::Oss(e) => e,
            Record::Oas(e) => e,
            Record::BackupSet(e) => e,
            Record::Policy(e) => e,
            Record::Path(e) => e,
            Record::ClientJob(e) => e,
        }
    }

    pub fn row_mut(&mut self) -> &mut dyn Row {
        match self {
            Record::Host(e) => e,
            Record::AppSet(e) => e,
            Record::Oss(e) => e,
            Record::Oas(e) => e,
            Record::BackupSet(e) => e,
            Record::Policy(e) => e,
            Record::Path(e) => e,
            Record::ClientJob(e) => e,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.row().kind()
    }

    pub fn id(&self) -> EntityId {
        self.row().id()
    }
}

/// Client-supplied body of a create or update.
///
/// Any id the client sends is ignored: the server assigns it on create and
/// keeps the stored one on update.
pub trait Payload: Send {
    type Entity: Entity;

    /// Split into the scalar entity, carrying `id`, and the relation sets
    /// the client specified.
    fn into_parts(self, id: EntityId) -> (Self::Entity, Vec<RelationSet>);
}

/// The full membership of one relation, replacing whatever was stored.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationSet {
    pub membership: Membership,
    pub members: Vec<EntityId>,
}

impl RelationSet {
    /// `Some` set when the payload specified the relation.
    pub(crate) fn specified(
        membership: Membership,
        members: Option<Vec<EntityId>>,
    ) -> Option<RelationSet> {
        members.map(|members| RelationSet {
            membership,
            members,
        })
    }
}

/// Push `Some` filter fields as conditions.
pub(crate) fn push_text(out: &mut Vec<Condition>, column: &'static str, value: &Option<String>) {
    if let Some(text) = value {
        out.push(Condition::new(column, Value::Text(text.clone())));
    }
}

pub(crate) fn push_id(out: &mut Vec<Condition>, column: &'static str, value: &Option<EntityId>) {
    if let Some(id) = value {
        out.push(Condition::new(column, Value::Id(*id)));
    }
}

/// Trim a required text field in place.
pub(crate) fn trim(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}

/// Trim an optional text field, folding blank values to `None`.
pub(crate) fn trim_opt(value: &mut Option<String>) {
    if let Some(text) = value.as_mut() {
        trim(text);
        if text.is_empty() {
            *value = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moduleab_core::types::new_id;

    #[test]
    fn memberships_orient_into_join_columns() {
        let (host, path) = (new_id(), new_id());
        assert_eq!(Membership::PathsOfHost.orient(host, path), (host, path));
        assert_eq!(Membership::HostsOfPath.orient(path, host), (host, path));
        assert_eq!(Membership::HostsOfPath.owner_column(), "path_id");
        assert_eq!(Membership::HostsOfBackupSet.member_column(), "host_id");
        assert_eq!(Membership::BackupSetsOfHost.owner_kind(), EntityKind::Host);
    }

    #[test]
    fn value_matching_ignores_nullability() {
        let id = new_id();
        assert!(Value::Id(id).matches(&Value::OptId(Some(id))));
        assert!(Value::Text("a".into()).matches(&Value::OptText(Some("a".into()))));
        assert!(!Value::OptId(None).matches(&Value::OptId(None)));
        assert!(!Value::Text("a".into()).matches(&Value::Text("b".into())));
    }

    #[test]
    fn trim_opt_folds_blank_to_none() {
        let mut value = Some("  ".to_string());
        trim_opt(&mut value);
        assert_eq!(value, None);

        let mut value = Some(" x ".to_string());
        trim_opt(&mut value);
        assert_eq!(value.as_deref(), Some("x"));
    }
}
