//! PostgreSQL backend.

use std::collections::HashSet;

use async_trait::async_trait;
use moduleab_core::pagination::Page;
use moduleab_core::types::EntityId;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};

use super::{AccountStore, Store, StoreError, Table, Write};
use crate::models::{Condition, Entity, Filter, Membership, Record, Session, User, Value};

/// Column list for the `users` table.
const USER_COLUMNS: &str = "id, username, password_hash, role_flags, is_active, created_at";

/// Column list for the `user_sessions` table.
const SESSION_COLUMNS: &str = "id, user_id, expires_at, is_revoked, created_at";

/// [`Store`] over a PostgreSQL pool. Each [`Store::apply`] runs in one
/// transaction, rolled back on the first failing write.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn apply_inner(
        tx: &mut Transaction<'_, Postgres>,
        write: Write,
    ) -> Result<(), StoreError> {
        match write {
            Write::Insert(record) => {
                let mut qb = insert_query(&record);
                qb.build().execute(&mut **tx).await?;
            }
            Write::Update(record) => {
                let label = record.kind().label();
                let mut qb = update_query(&record);
                let result = qb.build().execute(&mut **tx).await?;
                if result.rows_affected() == 0 {
                    return Err(StoreError::Stale(label));
                }
            }
            Write::ReplaceMembers {
                membership,
                owner,
                members,
            } => {
                Self::clear_members(tx, membership, owner).await?;

                let mut seen = HashSet::new();
                let pairs: Vec<(EntityId, EntityId)> = members
                    .into_iter()
                    .filter(|member| seen.insert(*member))
                    .map(|member| membership.orient(owner, member))
                    .collect();
                if pairs.is_empty() {
                    return Ok(());
                }

                let (left, right) = membership.columns();
                let mut qb = QueryBuilder::<Postgres>::new(format!(
                    "INSERT INTO {} ({left}, {right}) ",
                    membership.table()
                ));
                qb.push_values(pairs, |mut row, (l, r)| {
                    row.push_bind(l).push_bind(r);
                });
                qb.build().execute(&mut **tx).await?;
            }
            Write::ClearMembers { membership, owner } => {
                Self::clear_members(tx, membership, owner).await?;
            }
            Write::Delete { kind, id } => {
                let query = format!("DELETE FROM {} WHERE id = $1", kind.table());
                let result = sqlx::query(&query).bind(id).execute(&mut **tx).await?;
                if result.rows_affected() == 0 {
                    return Err(StoreError::Stale(kind.label()));
                }
            }
        }
        Ok(())
    }

    async fn clear_members(
        tx: &mut Transaction<'_, Postgres>,
        membership: Membership,
        owner: EntityId,
    ) -> Result<(), StoreError> {
        let query = format!(
            "DELETE FROM {} WHERE {} = $1",
            membership.table(),
            membership.owner_column()
        );
        sqlx::query(&query).bind(owner).execute(&mut **tx).await?;
        Ok(())
    }
}

fn push_value(qb: &mut QueryBuilder<'_, Postgres>, value: Value) {
    match value {
        Value::Text(v) => qb.push_bind(v),
        Value::OptText(v) => qb.push_bind(v),
        Value::Id(v) => qb.push_bind(v),
        Value::OptId(v) => qb.push_bind(v),
        Value::Int(v) => qb.push_bind(v),
        Value::Time(v) => qb.push_bind(v),
        Value::OptTime(v) => qb.push_bind(v),
    };
}

fn push_conditions(qb: &mut QueryBuilder<'_, Postgres>, conditions: Vec<Condition>) {
    for (i, condition) in conditions.into_iter().enumerate() {
        qb.push(if i == 0 { " WHERE " } else { " AND " });
        qb.push(condition.column).push(" = ");
        push_value(qb, condition.value);
    }
}

fn insert_query(record: &Record) -> QueryBuilder<'static, Postgres> {
    let values = record.row().values();
    let columns: Vec<&str> = values.iter().map(|(column, _)| *column).collect();
    let mut qb = QueryBuilder::new(format!(
        "INSERT INTO {} ({}) VALUES (",
        record.kind().table(),
        columns.join(", ")
    ));
    for (i, (_, value)) in values.into_iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        push_value(&mut qb, value);
    }
    qb.push(")");
    qb
}

fn update_query(record: &Record) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("UPDATE {} SET ", record.kind().table()));
    let assignments = record
        .row()
        .values()
        .into_iter()
        .filter(|(column, _)| *column != "id");
    for (i, (column, value)) in assignments.enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push(column).push(" = ");
        push_value(&mut qb, value);
    }
    qb.push(" WHERE id = ").push_bind(record.id());
    qb
}

#[async_trait]
impl<E: Entity> Table<E> for PgStore {
    async fn find(&self, filter: &E::Filter, page: Page) -> Result<Vec<E>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM {}",
            E::COLUMNS,
            E::KIND.table()
        ));
        push_conditions(&mut qb, filter.conditions());
        qb.push(format!(" ORDER BY {}", E::KIND.order_by()));
        if let Some(limit) = page.limit() {
            qb.push(" LIMIT ").push_bind(limit);
        }
        if page.offset() > 0 {
            qb.push(" OFFSET ").push_bind(page.offset());
        }
        let rows = qb.build_query_as::<E>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn get_many(&self, ids: &[EntityId]) -> Result<Vec<E>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "SELECT {} FROM {} WHERE id = ANY($1) ORDER BY {}",
            E::COLUMNS,
            E::KIND.table(),
            E::KIND.order_by()
        );
        let rows = sqlx::query_as::<_, E>(&query)
            .bind(ids.to_vec())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn create_user(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO users (id, username, password_hash, role_flags, is_active, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.role_flags)
        .bind(user.is_active)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_user(&self, id: EntityId) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        let user = sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users ORDER BY username");
        let users = sqlx::query_as::<_, User>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn create_session(&self, session: &Session) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO user_sessions (id, user_id, expires_at, is_revoked, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(session.expires_at)
        .bind(session.is_revoked)
        .bind(session.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_active_session(&self, id: EntityId) -> Result<Option<Session>, StoreError> {
        let query = format!(
            "SELECT {SESSION_COLUMNS} FROM user_sessions
             WHERE id = $1
               AND is_revoked = false
               AND expires_at > NOW()"
        );
        let session = sqlx::query_as::<_, Session>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(session)
    }

    async fn revoke_session(&self, id: EntityId) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE user_sessions SET is_revoked = true WHERE id = $1 AND is_revoked = false",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn apply(&self, writes: Vec<Write>) -> Result<(), StoreError> {
        let count = writes.len();
        let mut tx = self.pool.begin().await?;
        for write in writes {
            // Returning early drops `tx`, which rolls it back.
            Self::apply_inner(&mut tx, write).await?;
        }
        tx.commit().await?;
        tracing::debug!(writes = count, "Committed unit of work");
        Ok(())
    }

    async fn members(
        &self,
        membership: Membership,
        owner: EntityId,
    ) -> Result<Vec<EntityId>, StoreError> {
        let query = format!(
            "SELECT {member} FROM {table} WHERE {owner_col} = $1 ORDER BY {member}",
            member = membership.member_column(),
            table = membership.table(),
            owner_col = membership.owner_column(),
        );
        let ids = sqlx::query_scalar::<_, EntityId>(&query)
            .bind(owner)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        crate::health_check(&self.pool).await?;
        Ok(())
    }
}
