//! Host entity model and DTOs.

use moduleab_core::types::EntityId;
use moduleab_core::validation::{non_nil_id, not_blank};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::entity::{
    empty_as_none, push_id, push_text, trim, Condition, Entity, EntityKind, Filter, Membership,
    Payload, Record, RelationSet, Row, Value,
};

/// A machine whose files are backed up, from the `hosts` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Validate)]
pub struct Host {
    #[validate(custom(function = "non_nil_id"))]
    pub id: EntityId,
    #[validate(length(min = 1, max = 64), custom(function = "not_blank"))]
    pub name: String,
    #[serde(rename = "ip")]
    #[validate(ip)]
    pub ip_addr: String,
    pub app_set_id: Option<EntityId>,
}

/// Body of a host create or update.
///
/// `paths` replaces the host's whole path set when present.
#[derive(Debug, Clone, Deserialize)]
pub struct HostPayload {
    pub name: String,
    #[serde(rename = "ip")]
    pub ip_addr: String,
    #[serde(default)]
    pub app_set_id: Option<EntityId>,
    #[serde(default)]
    pub paths: Option<Vec<EntityId>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HostFilter {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub name: Option<String>,
    #[serde(default, rename = "ip", deserialize_with = "empty_as_none")]
    pub ip_addr: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub app_set_id: Option<EntityId>,
}

impl Filter for HostFilter {
    fn conditions(&self) -> Vec<Condition> {
        let mut out = Vec::new();
        push_text(&mut out, "name", &self.name);
        push_text(&mut out, "ip_addr", &self.ip_addr);
        push_id(&mut out, "app_set_id", &self.app_set_id);
        out
    }
}

impl Row for Host {
    fn kind(&self) -> EntityKind {
        EntityKind::Host
    }

    fn id(&self) -> EntityId {
        self.id
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("id", Value::Id(self.id)),
            ("name", Value::Text(self.name.clone())),
            ("ip_addr", Value::Text(self.ip_addr.clone())),
            ("app_set_id", Value::OptId(self.app_set_id)),
        ]
    }

    fn references(&self) -> Vec<(EntityKind, EntityId)> {
        self.app_set_id
            .map(|id| (EntityKind::AppSet, id))
            .into_iter()
            .collect()
    }

    fn detach(&mut self, target: EntityId) {
        if self.app_set_id == Some(target) {
            self.app_set_id = None;
        }
    }
}

impl Entity for Host {
    const KIND: EntityKind = EntityKind::Host;
    const COLUMNS: &'static str = "id, name, ip_addr, app_set_id";
    type Filter = HostFilter;

    fn lookup(key: &str) -> Option<HostFilter> {
        Some(HostFilter {
            name: Some(key.to_string()),
            ..Default::default()
        })
    }

    fn normalize(&mut self) {
        trim(&mut self.name);
        trim(&mut self.ip_addr);
    }

    fn into_record(self) -> Record {
        Record::Host(self)
    }

    fn from_record(record: &Record) -> Option<&Self> {
        match record {
            Record::Host(host) => Some(host),
            _ => None,
        }
    }
}

impl Payload for HostPayload {
    type Entity = Host;

    fn into_parts(self, id: EntityId) -> (Host, Vec<RelationSet>) {
        let host = Host {
            id,
            name: self.name,
            ip_addr: self.ip_addr,
            app_set_id: self.app_set_id,
        };
        let relations = RelationSet::specified(Membership::PathsOfHost, self.paths)
            .into_iter()
            .collect();
        (host, relations)
    }
}
