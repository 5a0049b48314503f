//! Backup targets: object storage buckets (Oss) and archive vaults (Oas).

use moduleab_core::types::EntityId;
use moduleab_core::validation::{non_nil_id, not_blank};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::entity::{
    empty_as_none, push_text, trim, trim_opt, Condition, Entity, EntityKind, Filter, Payload,
    Record, RelationSet, Row, Value,
};

// ---------------------------------------------------------------------------
// Oss
// ---------------------------------------------------------------------------

/// An object storage bucket receiving hot backups.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Validate)]
pub struct Oss {
    #[validate(custom(function = "non_nil_id"))]
    pub id: EntityId,
    #[validate(length(min = 1, max = 64), custom(function = "not_blank"))]
    pub bucket_name: String,
    #[validate(length(min = 1, max = 255), custom(function = "not_blank"))]
    pub endpoint: String,
    #[validate(length(min = 1, max = 128), custom(function = "not_blank"))]
    pub credential_ref: String,
    #[validate(length(max = 128))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OssPayload {
    pub bucket_name: String,
    pub endpoint: String,
    pub credential_ref: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OssFilter {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub bucket_name: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub endpoint: Option<String>,
}

impl Filter for OssFilter {
    fn conditions(&self) -> Vec<Condition> {
        let mut out = Vec::new();
        push_text(&mut out, "bucket_name", &self.bucket_name);
        push_text(&mut out, "endpoint", &self.endpoint);
        out
    }
}

impl Row for Oss {
    fn kind(&self) -> EntityKind {
        EntityKind::Oss
    }

    fn id(&self) -> EntityId {
        self.id
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("id", Value::Id(self.id)),
            ("bucket_name", Value::Text(self.bucket_name.clone())),
            ("endpoint", Value::Text(self.endpoint.clone())),
            ("credential_ref", Value::Text(self.credential_ref.clone())),
            ("description", Value::OptText(self.description.clone())),
        ]
    }
}

impl Entity for Oss {
    const KIND: EntityKind = EntityKind::Oss;
    const COLUMNS: &'static str = "id, bucket_name, endpoint, credential_ref, description";
    type Filter = OssFilter;

    fn lookup(key: &str) -> Option<OssFilter> {
        Some(OssFilter {
            bucket_name: Some(key.to_string()),
            ..Default::default()
        })
    }

    fn normalize(&mut self) {
        trim(&mut self.bucket_name);
        trim(&mut self.endpoint);
        trim(&mut self.credential_ref);
        trim_opt(&mut self.description);
    }

    fn into_record(self) -> Record {
        Record::Oss(self)
    }

    fn from_record(record: &Record) -> Option<&Self> {
        match record {
            Record::Oss(oss) => Some(oss),
            _ => None,
        }
    }
}

impl Payload for OssPayload {
    type Entity = Oss;

    fn into_parts(self, id: EntityId) -> (Oss, Vec<RelationSet>) {
        let oss = Oss {
            id,
            bucket_name: self.bucket_name,
            endpoint: self.endpoint,
            credential_ref: self.credential_ref,
            description: self.description,
        };
        (oss, Vec::new())
    }
}

// ---------------------------------------------------------------------------
// Oas
// ---------------------------------------------------------------------------

/// An archive vault receiving cold backups.
///
/// `vault_id` is the archive service's opaque id for `vault_name`; when a
/// payload leaves it out it is resolved through the service's listing.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Validate)]
pub struct Oas {
    #[validate(custom(function = "non_nil_id"))]
    pub id: EntityId,
    #[validate(length(min = 1, max = 64), custom(function = "not_blank"))]
    pub vault_name: String,
    #[validate(length(min = 1, max = 128), custom(function = "not_blank"))]
    pub vault_id: String,
    #[validate(length(min = 1, max = 255), custom(function = "not_blank"))]
    pub endpoint: String,
    #[validate(length(min = 1, max = 128), custom(function = "not_blank"))]
    pub credential_ref: String,
    #[validate(length(max = 128))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OasPayload {
    pub vault_name: String,
    #[serde(default)]
    pub vault_id: Option<String>,
    pub endpoint: String,
    pub credential_ref: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OasFilter {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub vault_name: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub vault_id: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub endpoint: Option<String>,
}

impl Filter for OasFilter {
    fn conditions(&self) -> Vec<Condition> {
        let mut out = Vec::new();
        push_text(&mut out, "vault_name", &self.vault_name);
        push_text(&mut out, "vault_id", &self.vault_id);
        push_text(&mut out, "endpoint", &self.endpoint);
        out
    }
}

impl Row for Oas {
    fn kind(&self) -> EntityKind {
        EntityKind::Oas
    }

    fn id(&self) -> EntityId {
        self.id
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("id", Value::Id(self.id)),
            ("vault_name", Value::Text(self.vault_name.clone())),
            ("vault_id", Value::Text(self.vault_id.clone())),
            ("endpoint", Value::Text(self.endpoint.clone())),
            ("credential_ref", Value::Text(self.credential_ref.clone())),
            ("description", Value::OptText(self.description.clone())),
        ]
    }
}

impl Entity for Oas {
    const KIND: EntityKind = EntityKind::Oas;
    const COLUMNS: &'static str =
        "id, vault_name, vault_id, endpoint, credential_ref, description";
    type Filter = OasFilter;

    fn lookup(key: &str) -> Option<OasFilter> {
        Some(OasFilter {
            vault_name: Some(key.to_string()),
            ..Default::default()
        })
    }

    fn normalize(&mut self) {
        trim(&mut self.vault_name);
        trim(&mut self.vault_id);
        trim(&mut self.endpoint);
        trim(&mut self.credential_ref);
        trim_opt(&mut self.description);
    }

    /// Keep the known vault id when the vault name did not change.
    fn inherit(&mut self, previous: &Self) {
        if self.vault_id.is_empty() && self.vault_name == previous.vault_name {
            self.vault_id = previous.vault_id.clone();
        }
    }

    fn unresolved_vault(&self) -> Option<&str> {
        if self.vault_id.is_empty() && !self.vault_name.is_empty() {
            Some(&self.vault_name)
        } else {
            None
        }
    }

    fn set_vault_id(&mut self, vault_id: String) {
        self.vault_id = vault_id;
    }

    fn into_record(self) -> Record {
        Record::Oas(self)
    }

    fn from_record(record: &Record) -> Option<&Self> {
        match record {
            Record::Oas(oas) => Some(oas),
            _ => None,
        }
    }
}

impl Payload for OasPayload {
    type Entity = Oas;

    fn into_parts(self, id: EntityId) -> (Oas, Vec<RelationSet>) {
        let oas = Oas {
            id,
            vault_name: self.vault_name,
            vault_id: self.vault_id.unwrap_or_default(),
            endpoint: self.endpoint,
            credential_ref: self.credential_ref,
            description: self.description,
        };
        (oas, Vec::new())
    }
}
