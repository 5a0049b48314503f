//! The same engine and catalog flows against PostgreSQL, checking that the
//! schema's constraints agree with the in-memory store.
//!
//! Each test gets a fresh database from `DATABASE_URL`.

use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use moduleab_core::pagination::Page;
use moduleab_core::types::new_id;
use moduleab_db::catalog::Catalog;
use moduleab_db::engine::MutationEngine;
use moduleab_db::error::DataError;
use moduleab_db::models::{
    AppSet, AppSetPayload, Host, HostFilter, HostPayload, Membership, PathPayload, Session, User,
};
use moduleab_db::store::{AccountStore, PgStore, Store, StoreError};
use sqlx::PgPool;

fn host(name: &str, ip: &str) -> HostPayload {
    HostPayload {
        name: name.to_string(),
        ip_addr: ip.to_string(),
        app_set_id: None,
        paths: None,
    }
}

fn path(pattern: &str) -> PathPayload {
    PathPayload {
        pattern: pattern.to_string(),
        description: None,
        hosts: None,
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_host_lifecycle(pool: PgPool) {
    let store = Arc::new(PgStore::new(pool));
    let engine = MutationEngine::new(store.clone());
    let catalog = Catalog::new(store.clone());

    let etc = engine.create(path("/etc")).await.unwrap();
    let mut payload = host("web-01", "10.0.0.1");
    payload.paths = Some(vec![etc]);
    let id = engine.create(payload).await.unwrap();

    let view = catalog.host("web-01").await.unwrap();
    assert_eq!(view.host.id, id);
    assert_eq!(view.paths.len(), 1);

    let mut payload = host("web-01", "10.0.0.2");
    payload.paths = Some(vec![]);
    assert_eq!(engine.update("web-01", payload).await.unwrap(), id);
    assert!(store
        .members(Membership::PathsOfHost, id)
        .await
        .unwrap()
        .is_empty());

    engine.delete::<Host>("web-01").await.unwrap();
    assert_matches!(
        catalog.host("web-01").await,
        Err(DataError::NotFound { .. })
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_constraint_violations_are_classified(pool: PgPool) {
    let store = Arc::new(PgStore::new(pool));
    let engine = MutationEngine::new(store.clone());

    engine.create(host("web-01", "10.0.0.1")).await.unwrap();
    assert_matches!(
        engine.create(host("web-01", "10.0.0.9")).await,
        Err(DataError::Store(StoreError::UniqueViolation(c))) if c == "uq_hosts_name"
    );

    let mut payload = host("web-02", "10.0.0.2");
    payload.app_set_id = Some(new_id());
    assert_matches!(
        engine.create(payload).await,
        Err(DataError::Store(StoreError::MissingReference(_)))
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_failed_unit_of_work_rolls_back(pool: PgPool) {
    let store = Arc::new(PgStore::new(pool));
    let engine = MutationEngine::new(store.clone());

    let mut payload = host("web-01", "10.0.0.1");
    payload.paths = Some(vec![new_id()]);
    assert!(engine.create(payload).await.is_err());

    let hosts = Catalog::new(store)
        .find::<Host>(&HostFilter::default(), Page::ALL)
        .await
        .unwrap();
    assert!(hosts.is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_delete_sets_references_to_null(pool: PgPool) {
    let store = Arc::new(PgStore::new(pool));
    let engine = MutationEngine::new(store.clone());
    let catalog = Catalog::new(store);

    let apps = engine
        .create(AppSetPayload {
            name: "apps".into(),
            description: None,
        })
        .await
        .unwrap();
    let mut payload = host("web-01", "10.0.0.1");
    payload.app_set_id = Some(apps);
    engine.create(payload).await.unwrap();

    engine.delete::<AppSet>("apps").await.unwrap();
    let view = catalog.host("web-01").await.unwrap();
    assert_eq!(view.host.app_set_id, None);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_sessions_expire_and_revoke(pool: PgPool) {
    let store = PgStore::new(pool);
    let user = User {
        id: new_id(),
        username: "ops".into(),
        password_hash: "$argon2id$placeholder".into(),
        role_flags: 0b011,
        is_active: true,
        created_at: Utc::now(),
    };
    store.create_user(&user).await.unwrap();

    let live = Session {
        id: new_id(),
        user_id: user.id,
        expires_at: Utc::now() + Duration::hours(1),
        is_revoked: false,
        created_at: Utc::now(),
    };
    let expired = Session {
        id: new_id(),
        expires_at: Utc::now() - Duration::hours(1),
        ..live.clone()
    };
    store.create_session(&live).await.unwrap();
    store.create_session(&expired).await.unwrap();

    assert!(store.find_active_session(live.id).await.unwrap().is_some());
    assert!(store.find_active_session(expired.id).await.unwrap().is_none());

    assert!(store.revoke_session(live.id).await.unwrap());
    assert!(!store.revoke_session(live.id).await.unwrap());
    assert!(store.find_active_session(live.id).await.unwrap().is_none());
}
