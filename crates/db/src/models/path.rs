//! Backup path model and DTOs.

use moduleab_core::types::EntityId;
use moduleab_core::validation::{non_nil_id, path_pattern};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::entity::{
    empty_as_none, push_text, trim, trim_opt, Condition, Entity, EntityKind, Filter, Membership,
    Payload, Record, RelationSet, Row, Value,
};

/// A file system path or glob selected for backup on its hosts.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Validate)]
pub struct BackupPath {
    #[validate(custom(function = "non_nil_id"))]
    pub id: EntityId,
    #[validate(length(min = 1, max = 255), custom(function = "path_pattern"))]
    pub pattern: String,
    #[validate(length(max = 128))]
    pub description: Option<String>,
}

/// Body of a path create or update.
///
/// `hosts` replaces the set of hosts the path applies to when present.
#[derive(Debug, Clone, Deserialize)]
pub struct PathPayload {
    pub pattern: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub hosts: Option<Vec<EntityId>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathFilter {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub pattern: Option<String>,
}

impl Filter for PathFilter {
    fn conditions(&self) -> Vec<Condition> {
        let mut out = Vec::new();
        push_text(&mut out, "pattern", &self.pattern);
        out
    }
}

impl Row for BackupPath {
    fn kind(&self) -> EntityKind {
        EntityKind::Path
    }

    fn id(&self) -> EntityId {
        self.id
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("id", Value::Id(self.id)),
            ("pattern", Value::Text(self.pattern.clone())),
            ("description", Value::OptText(self.description.clone())),
        ]
    }
}

impl Entity for BackupPath {
    const KIND: EntityKind = EntityKind::Path;
    const COLUMNS: &'static str = "id, pattern, description";
    type Filter = PathFilter;

    fn lookup(key: &str) -> Option<PathFilter> {
        Some(PathFilter {
            pattern: Some(key.to_string()),
        })
    }

    fn normalize(&mut self) {
        trim(&mut self.pattern);
        trim_opt(&mut self.description);
    }

    fn into_record(self) -> Record {
        Record::Path(self)
    }

    fn from_record(record: &Record) -> Option<&Self> {
        match record {
            Record::Path(path) => Some(path),
            _ => None,
        }
    }
}

impl Payload for PathPayload {
    type Entity = BackupPath;

    fn into_parts(self, id: EntityId) -> (BackupPath, Vec<RelationSet>) {
        let path = BackupPath {
            id,
            pattern: self.pattern,
            description: self.description,
        };
        let relations = RelationSet::specified(Membership::HostsOfPath, self.hosts)
            .into_iter()
            .collect();
        (path, relations)
    }
}
