pub mod account;
pub mod app_set;
pub mod backup_set;
pub mod client_job;
pub mod entity;
pub mod host;
pub mod path;
pub mod policy;
pub mod target;

pub use account::{CreateUser, Session, User};
pub use app_set::{AppSet, AppSetFilter, AppSetPayload};
pub use backup_set::{BackupSet, BackupSetFilter, BackupSetPayload};
pub use client_job::{ClientJob, ClientJobFilter, ClientJobPayload};
pub use entity::{
    Condition, Entity, EntityKind, Filter, Membership, Payload, Record, RelationSet, Row, Value,
};
pub use host::{Host, HostFilter, HostPayload};
pub use path::{BackupPath, PathFilter, PathPayload};
pub use policy::{Policy, PolicyFilter, PolicyPayload};
pub use target::{Oas, OasFilter, OasPayload, Oss, OssFilter, OssPayload};
