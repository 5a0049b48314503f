//! Application set model and DTOs.

use moduleab_core::types::EntityId;
use moduleab_core::validation::{non_nil_id, not_blank};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::entity::{
    empty_as_none, push_text, trim, trim_opt, Condition, Entity, EntityKind, Filter, Payload,
    Record, RelationSet, Row, Value,
};

/// A named group of hosts running the same application.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Validate)]
pub struct AppSet {
    #[validate(custom(function = "non_nil_id"))]
    pub id: EntityId,
    #[validate(length(min = 1, max = 64), custom(function = "not_blank"))]
    pub name: String,
    #[validate(length(max = 128))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppSetPayload {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppSetFilter {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub name: Option<String>,
}

impl Filter for AppSetFilter {
    fn conditions(&self) -> Vec<Condition> {
        let mut out = Vec::new();
        push_text(&mut out, "name", &self.name);
        out
    }
}

impl Row for AppSet {
    fn kind(&self) -> EntityKind {
        EntityKind::AppSet
    }

    fn id(&self) -> EntityId {
        self.id
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("id", Value::Id(self.id)),
            ("name", Value::Text(self.name.clone())),
            ("description", Value::OptText(self.description.clone())),
        ]
    }
}

impl Entity for AppSet {
    const KIND: EntityKind = EntityKind::AppSet;
    const COLUMNS: &'static str = "id, name, description";
    type Filter = AppSetFilter;

    fn lookup(key: &str) -> Option<AppSetFilter> {
        Some(AppSetFilter {
            name: Some(key.to_string()),
        })
    }

    fn normalize(&mut self) {
        trim(&mut self.name);
        trim_opt(&mut self.description);
    }

    fn into_record(self) -> Record {
        Record::AppSet(self)
    }

    fn from_record(record: &Record) -> Option<&Self> {
        match record {
            Record::AppSet(app_set) => Some(app_set),
            _ => None,
        }
    }
}

impl Payload for AppSetPayload {
    type Entity = AppSet;

    fn into_parts(self, id: EntityId) -> (AppSet, Vec<RelationSet>) {
        let app_set = AppSet {
            id,
            name: self.name,
            description: self.description,
        };
        (app_set, Vec::new())
    }
}
