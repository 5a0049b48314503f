//! Backup set model and DTOs.

use moduleab_core::types::EntityId;
use moduleab_core::validation::{non_nil_id, not_blank};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::entity::{
    empty_as_none, push_id, push_text, trim, trim_opt, Condition, Entity, EntityKind, Filter,
    Membership, Payload, Record, RelationSet, Row, Value,
};

/// Which hosts are backed up, and to which targets.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Validate)]
pub struct BackupSet {
    #[validate(custom(function = "non_nil_id"))]
    pub id: EntityId,
    #[validate(length(min = 1, max = 32), custom(function = "not_blank"))]
    pub name: String,
    #[validate(length(max = 128))]
    pub description: Option<String>,
    pub oss_id: Option<EntityId>,
    pub oas_id: Option<EntityId>,
    pub app_set_id: Option<EntityId>,
}

/// Body of a backup set create or update.
///
/// `hosts` replaces the set's whole host membership when present.
#[derive(Debug, Clone, Deserialize)]
pub struct BackupSetPayload {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub oss_id: Option<EntityId>,
    #[serde(default)]
    pub oas_id: Option<EntityId>,
    #[serde(default)]
    pub app_set_id: Option<EntityId>,
    #[serde(default)]
    pub hosts: Option<Vec<EntityId>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackupSetFilter {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub oss_id: Option<EntityId>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub oas_id: Option<EntityId>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub app_set_id: Option<EntityId>,
}

impl Filter for BackupSetFilter {
    fn conditions(&self) -> Vec<Condition> {
        let mut out = Vec::new();
        push_text(&mut out, "name", &self.name);
        push_id(&mut out, "oss_id", &self.oss_id);
        push_id(&mut out, "oas_id", &self.oas_id);
        push_id(&mut out, "app_set_id", &self.app_set_id);
        out
    }
}

impl Row for BackupSet {
    fn kind(&self) -> EntityKind {
        EntityKind::BackupSet
    }

    fn id(&self) -> EntityId {
        self.id
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("id", Value::Id(self.id)),
            ("name", Value::Text(self.name.clone())),
            ("description", Value::OptText(self.description.clone())),
            ("oss_id", Value::OptId(self.oss_id)),
            ("oas_id", Value::OptId(self.oas_id)),
            ("app_set_id", Value::OptId(self.app_set_id)),
        ]
    }

    fn references(&self) -> Vec<(EntityKind, EntityId)> {
        [
            (EntityKind::Oss, self.oss_id),
            (EntityKind::Oas, self.oas_id),
            (EntityKind::AppSet, self.app_set_id),
        ]
        .into_iter()
        .filter_map(|(kind, id)| id.map(|id| (kind, id)))
        .collect()
    }

    fn detach(&mut self, target: EntityId) {
        for slot in [&mut self.oss_id, &mut self.oas_id, &mut self.app_set_id] {
            if *slot == Some(target) {
                *slot = None;
            }
        }
    }
}

impl Entity for BackupSet {
    const KIND: EntityKind = EntityKind::BackupSet;
    const COLUMNS: &'static str = "id, name, description, oss_id, oas_id, app_set_id";
    type Filter = BackupSetFilter;

    fn lookup(key: &str) -> Option<BackupSetFilter> {
        Some(BackupSetFilter {
            name: Some(key.to_string()),
            ..Default::default()
        })
    }

    fn normalize(&mut self) {
        trim(&mut self.name);
        trim_opt(&mut self.description);
    }

    fn into_record(self) -> Record {
        Record::BackupSet(self)
    }

    fn from_record(record: &Record) -> Option<&Self> {
        match record {
            Record::BackupSet(set) => Some(set),
            _ => None,
        }
    }
}

impl Payload for BackupSetPayload {
    type Entity = BackupSet;

    fn into_parts(self, id: EntityId) -> (BackupSet, Vec<RelationSet>) {
        let set = BackupSet {
            id,
            name: self.name,
            description: self.description,
            oss_id: self.oss_id,
            oas_id: self.oas_id,
            app_set_id: self.app_set_id,
        };
        let relations = RelationSet::specified(Membership::HostsOfBackupSet, self.hosts)
            .into_iter()
            .collect();
        (set, relations)
    }
}
