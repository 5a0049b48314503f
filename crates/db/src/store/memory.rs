//! In-process backend with the same constraint semantics as the schema.
//!
//! A unit of work is applied to a private copy of the current snapshot and
//! swapped in only when every write succeeded, so readers never observe a
//! partial unit of work.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use moduleab_core::pagination::Page;
use moduleab_core::types::EntityId;

use super::{AccountStore, Store, StoreError, Table, Write};
use crate::models::{Entity, EntityKind, Filter, Membership, Record, Session, User};

#[derive(Debug, Clone, Default)]
struct Snapshot {
    rows: BTreeMap<(EntityKind, EntityId), Record>,
    /// `(join table, left id, right id)`.
    links: BTreeSet<(&'static str, EntityId, EntityId)>,
    users: BTreeMap<EntityId, User>,
    sessions: BTreeMap<EntityId, Session>,
}

impl Snapshot {
    fn contains(&self, kind: EntityKind, id: EntityId) -> bool {
        self.rows.contains_key(&(kind, id))
    }

    fn apply(&mut self, write: Write) -> Result<(), StoreError> {
        match write {
            Write::Insert(record) => {
                let key = (record.kind(), record.id());
                if self.rows.contains_key(&key) {
                    return Err(StoreError::UniqueViolation(format!(
                        "{}_pkey",
                        key.0.table()
                    )));
                }
                self.check_constraints(&record)?;
                self.rows.insert(key, record);
            }
            Write::Update(record) => {
                let key = (record.kind(), record.id());
                if !self.rows.contains_key(&key) {
                    return Err(StoreError::Stale(key.0.label()));
                }
                self.check_constraints(&record)?;
                self.rows.insert(key, record);
            }
            Write::ReplaceMembers {
                membership,
                owner,
                members,
            } => {
                if !self.contains(membership.owner_kind(), owner) {
                    return Err(missing_reference(membership, membership.owner_column()));
                }
                if members
                    .iter()
                    .any(|member| !self.contains(membership.member_kind(), *member))
                {
                    return Err(missing_reference(membership, membership.member_column()));
                }
                self.clear_members(membership, owner);
                for member in members {
                    let (left, right) = membership.orient(owner, member);
                    self.links.insert((membership.table(), left, right));
                }
            }
            Write::ClearMembers { membership, owner } => {
                self.clear_members(membership, owner);
            }
            Write::Delete { kind, id } => {
                if !self.contains(kind, id) {
                    return Err(StoreError::Stale(kind.label()));
                }
                // Join rows restrict deletion of either side.
                if let Some((table, _, _)) = self
                    .links
                    .iter()
                    .find(|(table, left, right)| {
                        (*left == id || *right == id) && joins_kind(table, kind)
                    })
                {
                    return Err(StoreError::MissingReference(format!(
                        "{table} still references {} {id}",
                        kind.label()
                    )));
                }
                self.rows.remove(&(kind, id));
                for record in self.rows.values_mut() {
                    record.row_mut().detach(id);
                }
            }
        }
        Ok(())
    }

    fn clear_members(&mut self, membership: Membership, owner: EntityId) {
        let table = membership.table();
        let owner_is_left = membership.owner_is_left();
        self.links.retain(|(t, left, right)| {
            let side = if owner_is_left { left } else { right };
            !(*t == table && *side == owner)
        });
    }

    fn check_constraints(&self, record: &Record) -> Result<(), StoreError> {
        let row = record.row();
        let kind = row.kind();

        for column in kind.unique_columns() {
            let Some(value) = row.value(column) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            let clash = self.rows.iter().any(|((k, id), other)| {
                *k == kind
                    && *id != row.id()
                    && other.row().value(column).is_some_and(|v| v.matches(&value))
            });
            if clash {
                return Err(StoreError::UniqueViolation(format!(
                    "uq_{}_{column}",
                    kind.table()
                )));
            }
        }

        for (target_kind, target_id) in row.references() {
            if !self.contains(target_kind, target_id) {
                return Err(StoreError::MissingReference(format!(
                    "{} references missing {} {target_id}",
                    kind.table(),
                    target_kind.label()
                )));
            }
        }
        Ok(())
    }
}

fn missing_reference(membership: Membership, column: &str) -> StoreError {
    StoreError::MissingReference(format!("{}.{column}", membership.table()))
}

/// `true` when `table` has a column referencing entities of `kind`.
fn joins_kind(table: &str, kind: EntityKind) -> bool {
    match table {
        "host_paths" => matches!(kind, EntityKind::Host | EntityKind::Path),
        "backup_set_hosts" => matches!(kind, EntityKind::Host | EntityKind::BackupSet),
        _ => false,
    }
}

/// [`Store`] holding everything in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<Snapshot>,
    /// Fail the write at this index of the next unit of work.
    fail_at: Mutex<Option<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the write at `index` of the next [`Store::apply`] fail with
    /// [`StoreError::Unavailable`]. The writes before it still run against
    /// the private copy, so the failure exercises rollback.
    pub fn fail_write_at(&self, index: usize) {
        if let Ok(mut slot) = self.fail_at.lock() {
            *slot = Some(index);
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Snapshot>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Snapshot>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }

    fn take_fault(&self) -> Option<usize> {
        self.fail_at.lock().ok().and_then(|mut slot| slot.take())
    }

    fn matching<E: Entity>(snapshot: &Snapshot, filter: &E::Filter) -> Vec<E> {
        let conditions = filter.conditions();
        let mut rows: Vec<E> = snapshot
            .rows
            .values()
            .filter_map(E::from_record)
            .filter(|row| {
                conditions.iter().all(|condition| {
                    row.value(condition.column)
                        .is_some_and(|v| v.matches(&condition.value))
                })
            })
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.sort_key());
        rows
    }
}

#[async_trait]
impl<E: Entity> Table<E> for MemoryStore {
    async fn find(&self, filter: &E::Filter, page: Page) -> Result<Vec<E>, StoreError> {
        let snapshot = self.read()?;
        Ok(page.slice(Self::matching::<E>(&snapshot, filter)))
    }

    async fn get_many(&self, ids: &[EntityId]) -> Result<Vec<E>, StoreError> {
        let snapshot = self.read()?;
        let mut rows: Vec<E> = ids
            .iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .filter_map(|id| snapshot.rows.get(&(E::KIND, *id)))
            .filter_map(E::from_record)
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.sort_key());
        Ok(rows)
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn create_user(&self, user: &User) -> Result<(), StoreError> {
        let mut snapshot = self.write()?;
        if snapshot
            .users
            .values()
            .any(|u| u.id == user.id || u.username == user.username)
        {
            return Err(StoreError::UniqueViolation("uq_users_username".into()));
        }
        snapshot.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&self, id: EntityId) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self.read()?.users.values().cloned().collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn create_session(&self, session: &Session) -> Result<(), StoreError> {
        let mut snapshot = self.write()?;
        if !snapshot.users.contains_key(&session.user_id) {
            return Err(StoreError::MissingReference(
                "user_sessions.user_id".into(),
            ));
        }
        snapshot.sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn find_active_session(&self, id: EntityId) -> Result<Option<Session>, StoreError> {
        let now = Utc::now();
        Ok(self
            .read()?
            .sessions
            .get(&id)
            .filter(|s| s.is_active_at(now))
            .cloned())
    }

    async fn revoke_session(&self, id: EntityId) -> Result<bool, StoreError> {
        let mut snapshot = self.write()?;
        match snapshot.sessions.get_mut(&id) {
            Some(session) if !session.is_revoked => {
                session.is_revoked = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn apply(&self, writes: Vec<Write>) -> Result<(), StoreError> {
        let fault = self.take_fault();
        // Holding the write guard for the whole unit of work serializes writers.
        let mut current = self.write()?;
        let mut next = current.clone();
        for (index, write) in writes.into_iter().enumerate() {
            if fault == Some(index) {
                return Err(StoreError::Unavailable(format!(
                    "injected failure at write {index}"
                )));
            }
            next.apply(write)?;
        }
        *current = next;
        Ok(())
    }

    async fn members(
        &self,
        membership: Membership,
        owner: EntityId,
    ) -> Result<Vec<EntityId>, StoreError> {
        let snapshot = self.read()?;
        let table = membership.table();
        let owner_is_left = membership.owner_is_left();
        let ids = snapshot
            .links
            .iter()
            .filter(|(t, _, _)| *t == table)
            .filter_map(|(_, left, right)| {
                if owner_is_left {
                    (*left == owner).then_some(*right)
                } else {
                    (*right == owner).then_some(*left)
                }
            })
            .collect::<BTreeSet<_>>();
        Ok(ids.into_iter().collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.read().map(|_| ())
    }
}
