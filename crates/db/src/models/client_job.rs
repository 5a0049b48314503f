//! Client job model and DTOs.
//!
//! Backup agents report the jobs they run on a host; jobs have no natural
//! name and are addressed by id.

use chrono::{SecondsFormat, Utc};
use moduleab_core::types::{EntityId, Timestamp};
use moduleab_core::validation::{job_status, non_nil_id, parse_entity_id};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

use super::entity::{
    empty_as_none, push_id, push_text, trim, trim_opt, Condition, Entity, EntityKind, Filter,
    Payload, Record, RelationSet, Row, Value,
};

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Validate)]
#[validate(schema(function = "finished_after_start"))]
pub struct ClientJob {
    #[validate(custom(function = "non_nil_id"))]
    pub id: EntityId,
    #[validate(custom(function = "job_status"))]
    pub status: String,
    #[validate(length(max = 1024))]
    pub message: Option<String>,
    pub host_id: Option<EntityId>,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub finished_at: Option<Timestamp>,
}

fn finished_after_start(job: &ClientJob) -> Result<(), ValidationError> {
    if let (Some(started), Some(finished)) = (job.started_at, job.finished_at) {
        if finished < started {
            return Err(ValidationError::new("finished_after_start")
                .with_message("finished_at must not precede started_at".into()));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientJobPayload {
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub host_id: Option<EntityId>,
    #[serde(default)]
    pub started_at: Option<Timestamp>,
    #[serde(default)]
    pub finished_at: Option<Timestamp>,
}

fn default_status() -> String {
    "pending".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientJobFilter {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub id: Option<EntityId>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub host_id: Option<EntityId>,
}

impl Filter for ClientJobFilter {
    fn conditions(&self) -> Vec<Condition> {
        let mut out = Vec::new();
        push_id(&mut out, "id", &self.id);
        // Stored statuses are lowercase.
        let status = self.status.as_deref().map(str::to_ascii_lowercase);
        push_text(&mut out, "status", &status);
        push_id(&mut out, "host_id", &self.host_id);
        out
    }
}

impl Row for ClientJob {
    fn kind(&self) -> EntityKind {
        EntityKind::ClientJob
    }

    fn id(&self) -> EntityId {
        self.id
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("id", Value::Id(self.id)),
            ("status", Value::Text(self.status.clone())),
            ("message", Value::OptText(self.message.clone())),
            ("host_id", Value::OptId(self.host_id)),
            ("created_at", Value::Time(self.created_at)),
            ("started_at", Value::OptTime(self.started_at)),
            ("finished_at", Value::OptTime(self.finished_at)),
        ]
    }

    fn references(&self) -> Vec<(EntityKind, EntityId)> {
        self.host_id
            .map(|id| (EntityKind::Host, id))
            .into_iter()
            .collect()
    }

    fn detach(&mut self, target: EntityId) {
        if self.host_id == Some(target) {
            self.host_id = None;
        }
    }

    fn sort_key(&self) -> String {
        format!(
            "{} {}",
            self.created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            self.id
        )
    }
}

impl Entity for ClientJob {
    const KIND: EntityKind = EntityKind::ClientJob;
    const COLUMNS: &'static str =
        "id, status, message, host_id, created_at, started_at, finished_at";
    type Filter = ClientJobFilter;

    fn lookup(key: &str) -> Option<ClientJobFilter> {
        parse_entity_id(key).map(|id| ClientJobFilter {
            id: Some(id),
            ..Default::default()
        })
    }

    fn normalize(&mut self) {
        trim(&mut self.status);
        self.status.make_ascii_lowercase();
        trim_opt(&mut self.message);
    }

    fn inherit(&mut self, previous: &Self) {
        self.created_at = previous.created_at;
    }

    fn into_record(self) -> Record {
        Record::ClientJob(self)
    }

    fn from_record(record: &Record) -> Option<&Self> {
        match record {
            Record::ClientJob(job) => Some(job),
            _ => None,
        }
    }
}

impl Payload for ClientJobPayload {
    type Entity = ClientJob;

    fn into_parts(self, id: EntityId) -> (ClientJob, Vec<RelationSet>) {
        let job = ClientJob {
            id,
            status: self.status,
            message: self.message,
            host_id: self.host_id,
            created_at: Utc::now(),
            started_at: self.started_at,
            finished_at: self.finished_at,
        };
        (job, Vec::new())
    }
}
