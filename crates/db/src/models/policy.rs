//! Backup policy model and DTOs.

use moduleab_core::types::EntityId;
use moduleab_core::validation::{cron_schedule, non_nil_id, not_blank};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::entity::{
    empty_as_none, push_id, push_text, trim, Condition, Entity, EntityKind, Filter, Payload,
    Record, RelationSet, Row, Value,
};

/// When a backup set runs and how long its copies are kept.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Validate)]
pub struct Policy {
    #[validate(custom(function = "non_nil_id"))]
    pub id: EntityId,
    #[validate(length(min = 1, max = 64), custom(function = "not_blank"))]
    pub name: String,
    #[validate(custom(function = "cron_schedule"))]
    pub schedule: String,
    #[validate(range(min = 1, max = 36500))]
    pub retention_days: i32,
    pub backup_set_id: Option<EntityId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PolicyPayload {
    pub name: String,
    pub schedule: String,
    pub retention_days: i32,
    #[serde(default)]
    pub backup_set_id: Option<EntityId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicyFilter {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub backup_set_id: Option<EntityId>,
}

impl Filter for PolicyFilter {
    fn conditions(&self) -> Vec<Condition> {
        let mut out = Vec::new();
        push_text(&mut out, "name", &self.name);
        push_id(&mut out, "backup_set_id", &self.backup_set_id);
        out
    }
}

impl Row for Policy {
    fn kind(&self) -> EntityKind {
        EntityKind::Policy
    }

    fn id(&self) -> EntityId {
        self.id
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("id", Value::Id(self.id)),
            ("name", Value::Text(self.name.clone())),
            ("schedule", Value::Text(self.schedule.clone())),
            ("retention_days", Value::Int(self.retention_days)),
            ("backup_set_id", Value::OptId(self.backup_set_id)),
        ]
    }

    fn references(&self) -> Vec<(EntityKind, EntityId)> {
        self.backup_set_id
            .map(|id| (EntityKind::BackupSet, id))
            .into_iter()
            .collect()
    }

    fn detach(&mut self, target: EntityId) {
        if self.backup_set_id == Some(target) {
            self.backup_set_id = None;
        }
    }
}

impl Entity for Policy {
    const KIND: EntityKind = EntityKind::Policy;
    const COLUMNS: &'static str = "id, name, schedule, retention_days, backup_set_id";
    type Filter = PolicyFilter;

    fn lookup(key: &str) -> Option<PolicyFilter> {
        Some(PolicyFilter {
            name: Some(key.to_string()),
            ..Default::default()
        })
    }

    fn normalize(&mut self) {
        trim(&mut self.name);
        // Collapse runs of whitespace between cron fields.
        self.schedule = self.schedule.split_whitespace().collect::<Vec<_>>().join(" ");
    }

    fn into_record(self) -> Record {
        Record::Policy(self)
    }

    fn from_record(record: &Record) -> Option<&Self> {
        match record {
            Record::Policy(policy) => Some(policy),
            _ => None,
        }
    }
}

impl Payload for PolicyPayload {
    type Entity = Policy;

    fn into_parts(self, id: EntityId) -> (Policy, Vec<RelationSet>) {
        let policy = Policy {
            id,
            name: self.name,
            schedule: self.schedule,
            retention_days: self.retention_days,
            backup_set_id: self.backup_set_id,
        };
        (policy, Vec::new())
    }
}
