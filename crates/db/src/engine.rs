//! Write side: every create, update and delete goes through the
//! [`MutationEngine`], which turns a request into one unit of work and hands
//! it to [`Store::apply`].
//!
//! Validation and lookups happen before anything is written; once the unit
//! of work is submitted it either commits whole or leaves no trace.

use std::sync::Arc;

use moduleab_core::types::{new_id, EntityId};
use moduleab_core::validation;
use moduleab_core::vault::{resolve_vault_id, VaultError, VaultLister};

use crate::catalog::lookup;
use crate::error::DataError;
use crate::models::{Entity, Payload, RelationSet, Row};
use crate::store::{Store, Table, Write};

/// Field filled in by vault resolution.
const VAULT_ID_FIELD: &str = "vault_id";

pub struct MutationEngine<S: ?Sized> {
    store: Arc<S>,
    vaults: Option<Arc<dyn VaultLister>>,
}

impl<S: Store + ?Sized> MutationEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            vaults: None,
        }
    }

    /// Resolve missing archive vault ids through `vaults`.
    pub fn with_vaults(mut self, vaults: Arc<dyn VaultLister>) -> Self {
        self.vaults = Some(vaults);
        self
    }

    /// Insert a new entity and its initial memberships. Returns the
    /// generated id.
    pub async fn create<P>(&self, payload: P) -> Result<EntityId, DataError>
    where
        P: Payload,
        S: Table<P::Entity>,
    {
        let id = new_id();
        let (mut entity, relations) = payload.into_parts(id);
        self.prepare(&mut entity, None).await?;

        let kind = entity.kind();
        let mut writes = vec![Write::Insert(entity.into_record())];
        writes.extend(
            relations
                .into_iter()
                .filter(|set| !set.members.is_empty())
                .map(|set| replace(id, set)),
        );
        tracing::debug!(kind = kind.label(), %id, writes = writes.len(), "Creating entity");

        self.store.apply(writes).await?;
        tracing::info!(kind = kind.label(), %id, "Entity created");
        Ok(id)
    }

    /// Replace the scalar fields of the entity named by `key`, and every
    /// relation set the payload specifies. The stored id is kept.
    pub async fn update<P>(&self, key: &str, payload: P) -> Result<EntityId, DataError>
    where
        P: Payload,
        S: Table<P::Entity>,
    {
        let existing: P::Entity = lookup(&*self.store, key).await?;
        let id = existing.id();
        let (mut entity, relations) = payload.into_parts(id);
        self.prepare(&mut entity, Some(&existing)).await?;

        let kind = entity.kind();
        let mut writes = vec![Write::Update(entity.into_record())];
        writes.extend(relations.into_iter().map(|set| replace(id, set)));
        tracing::debug!(kind = kind.label(), %id, %key, writes = writes.len(), "Updating entity");

        self.store.apply(writes).await?;
        tracing::info!(kind = kind.label(), %id, "Entity updated");
        Ok(id)
    }

    /// Clear every membership of the entity named by `key`, then remove it.
    pub async fn delete<E>(&self, key: &str) -> Result<EntityId, DataError>
    where
        E: Entity,
        S: Table<E>,
    {
        let existing: E = lookup(&*self.store, key).await?;
        let id = existing.id();

        let mut writes: Vec<Write> = E::KIND
            .memberships()
            .iter()
            .map(|&membership| Write::ClearMembers {
                membership,
                owner: id,
            })
            .collect();
        writes.push(Write::Delete { kind: E::KIND, id });
        tracing::debug!(kind = E::KIND.label(), %id, %key, "Deleting entity");

        self.store.apply(writes).await?;
        tracing::info!(kind = E::KIND.label(), %id, "Entity deleted");
        Ok(id)
    }

    /// Normalize, fill in server-managed fields, validate, and only then
    /// look up a missing archive vault id.
    async fn prepare<E: Entity>(
        &self,
        entity: &mut E,
        previous: Option<&E>,
    ) -> Result<(), DataError> {
        entity.normalize();
        if let Some(previous) = previous {
            entity.inherit(previous);
        }
        let Some(name) = entity.unresolved_vault().map(str::to_string) else {
            validation::check(entity)?;
            return Ok(());
        };

        validation::check_except(entity, &[VAULT_ID_FIELD])?;
        let lister = self
            .vaults
            .as_deref()
            .ok_or_else(|| VaultError::Remote("no archive service is configured".to_string()))?;
        let vault_id = resolve_vault_id(lister, &name).await?;
        tracing::debug!(vault = %name, %vault_id, "Resolved archive vault");
        entity.set_vault_id(vault_id);
        validation::check(entity)?;
        Ok(())
    }
}

fn replace(owner: EntityId, set: RelationSet) -> Write {
    Write::ReplaceMembers {
        membership: set.membership,
        owner,
        members: set.members,
    }
}
