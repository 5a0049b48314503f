//! Mutation engine behaviour against the in-memory store:
//! - create assigns ids, normalizes, validates and writes initial memberships
//! - update keeps the id and replaces relation sets wholesale
//! - delete clears memberships and nulls references
//! - every operation is all-or-nothing

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use moduleab_core::pagination::Page;
use moduleab_core::vault::{VaultError, VaultLister, VaultPage, VaultSummary};
use moduleab_db::engine::MutationEngine;
use moduleab_db::error::DataError;
use moduleab_db::models::{
    AppSet, AppSetPayload, BackupPath, BackupSetPayload, ClientJob, ClientJobPayload, Host,
    HostFilter, HostPayload, Membership, Oas, OasPayload, PathPayload,
};
use moduleab_db::store::{MemoryStore, Store, StoreError, Table};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn engine() -> (Arc<MemoryStore>, MutationEngine<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (store.clone(), MutationEngine::new(store))
}

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

fn app_set(name: &str) -> AppSetPayload {
    AppSetPayload {
        name: name.to_string(),
        description: None,
    }
}

async fn hosts(store: &MemoryStore) -> Vec<Host> {
    Table::<Host>::find(store, &HostFilter::default(), Page::ALL)
        .await
        .unwrap()
}

/// Two pages: `alpha` on the first, `beta` on the second.
struct TwoPageArchive;

#[async_trait]
impl VaultLister for TwoPageArchive {
    async fn list_vaults(&self, marker: &str) -> Result<VaultPage, VaultError> {
        let (name, id, next) = match marker {
            "" => ("alpha", "vault-a", "page-2"),
            "page-2" => ("beta", "vault-b", ""),
            other => return Err(VaultError::Remote(format!("bad marker {other}"))),
        };
        Ok(VaultPage {
            vaults: vec![VaultSummary {
                id: id.to_string(),
                name: name.to_string(),
            }],
            next_marker: next.to_string(),
        })
    }
}

/// Counts its calls and always fails like an unreachable service.
#[derive(Default)]
struct DownArchive {
    calls: AtomicUsize,
}

#[async_trait]
impl VaultLister for DownArchive {
    async fn list_vaults(&self, _marker: &str) -> Result<VaultPage, VaultError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(VaultError::Remote("connection refused".to_string()))
    }
}

fn oas(vault_name: &str, vault_id: Option<&str>) -> OasPayload {
    OasPayload {
        vault_name: vault_name.to_string(),
        vault_id: vault_id.map(str::to_string),
        endpoint: "https://archive.example.com".to_string(),
        credential_ref: "cold".to_string(),
        description: None,
    }
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_assigns_a_fresh_id_and_trims_fields() {
    let (store, engine) = engine();
    let first = engine.create(host("  web-01 ", "10.0.0.1")).await.unwrap();
    let second = engine.create(host("web-02", "10.0.0.2")).await.unwrap();
    assert_ne!(first, second);

    let stored = hosts(&store).await;
    assert_eq!(stored[0].id, first);
    assert_eq!(stored[0].name, "web-01");
}

#[tokio::test]
async fn create_rejects_invalid_payload_without_writing() {
    let (store, engine) = engine();
    let err = engine.create(host("web-01", "not-an-ip")).await.unwrap_err();
    assert_matches!(err, DataError::Validation(msg) => {
        assert!(msg.starts_with("Bad info: "), "{msg}");
        assert!(msg.contains("ip"), "{msg}");
    });
    assert!(hosts(&store).await.is_empty());
}

#[tokio::test]
async fn create_with_initial_paths_writes_memberships() {
    let (store, engine) = engine();
    let etc = engine.create(path("/etc")).await.unwrap();
    let var = engine.create(path("/var/lib/*")).await.unwrap();

    let mut payload = host("web-01", "10.0.0.1");
    payload.paths = Some(vec![etc, var, etc]);
    let id = engine.create(payload).await.unwrap();

    let mut members = store.members(Membership::PathsOfHost, id).await.unwrap();
    members.sort();
    let mut expected = vec![etc, var];
    expected.sort();
    assert_eq!(members, expected);
}

#[tokio::test]
async fn create_with_unknown_member_rolls_back_the_insert() {
    let (store, engine) = engine();
    let mut payload = host("web-01", "10.0.0.1");
    payload.paths = Some(vec![moduleab_core::types::new_id()]);

    let err = engine.create(payload).await.unwrap_err();
    assert_matches!(err, DataError::Store(StoreError::MissingReference(_)));
    assert!(hosts(&store).await.is_empty());
}

#[tokio::test]
async fn duplicate_names_surface_as_unique_violations() {
    let (_, engine) = engine();
    engine.create(host("web-01", "10.0.0.1")).await.unwrap();
    let err = engine.create(host("web-01", "10.0.0.2")).await.unwrap_err();
    assert_matches!(err, DataError::Store(StoreError::UniqueViolation(c)) if c == "uq_hosts_name");
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

#[tokio::test]
async fn update_keeps_the_stored_id() {
    let (store, engine) = engine();
    let id = engine.create(host("web-01", "10.0.0.1")).await.unwrap();

    let updated = engine
        .update("web-01", host("web-01-renamed", "10.0.0.9"))
        .await
        .unwrap();
    assert_eq!(updated, id);

    let stored = hosts(&store).await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, id);
    assert_eq!(stored[0].name, "web-01-renamed");
    assert_eq!(stored[0].ip_addr, "10.0.0.9");
}

#[tokio::test]
async fn update_of_missing_entity_is_not_found() {
    let (_, engine) = engine();
    let err = engine
        .update("ghost", host("ghost", "10.0.0.1"))
        .await
        .unwrap_err();
    assert_matches!(err, DataError::NotFound { entity: "Host", key } if key == "ghost");
}

#[tokio::test]
async fn update_replaces_relation_sets_wholesale() {
    let (store, engine) = engine();
    let a = engine.create(path("/a")).await.unwrap();
    let b = engine.create(path("/b")).await.unwrap();
    let c = engine.create(path("/c")).await.unwrap();

    let mut payload = host("web-01", "10.0.0.1");
    payload.paths = Some(vec![a, b]);
    let id = engine.create(payload).await.unwrap();

    let mut payload = host("web-01", "10.0.0.1");
    payload.paths = Some(vec![c]);
    engine.update("web-01", payload).await.unwrap();
    assert_eq!(
        store.members(Membership::PathsOfHost, id).await.unwrap(),
        vec![c]
    );

    // An omitted relation set is left alone.
    engine
        .update("web-01", host("web-01", "10.0.0.1"))
        .await
        .unwrap();
    assert_eq!(
        store.members(Membership::PathsOfHost, id).await.unwrap(),
        vec![c]
    );

    // An explicit empty set clears it.
    let mut payload = host("web-01", "10.0.0.1");
    payload.paths = Some(vec![]);
    engine.update("web-01", payload).await.unwrap();
    assert!(store
        .members(Membership::PathsOfHost, id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn failed_update_leaves_previous_state_intact() {
    let (store, engine) = engine();
    let a = engine.create(path("/a")).await.unwrap();
    let mut payload = host("web-01", "10.0.0.1");
    payload.paths = Some(vec![a]);
    let id = engine.create(payload).await.unwrap();

    // Scalar update succeeds inside the unit of work, then the membership
    // replacement fails.
    store.fail_write_at(1);
    let mut payload = host("web-01", "10.0.0.7");
    payload.paths = Some(vec![]);
    let err = engine.update("web-01", payload).await.unwrap_err();
    assert_matches!(err, DataError::Store(StoreError::Unavailable(_)));

    assert_eq!(hosts(&store).await[0].ip_addr, "10.0.0.1");
    assert_eq!(
        store.members(Membership::PathsOfHost, id).await.unwrap(),
        vec![a]
    );
}

#[tokio::test]
async fn client_job_update_keeps_creation_time() {
    let (store, engine) = engine();
    let id = engine
        .create(ClientJobPayload {
            status: "pending".into(),
            message: None,
            host_id: None,
            started_at: None,
            finished_at: None,
        })
        .await
        .unwrap();
    let created: Vec<ClientJob> = Table::<ClientJob>::get_many(&*store, &[id]).await.unwrap();

    engine
        .update(
            &id.to_string(),
            ClientJobPayload {
                status: "running".into(),
                message: Some("copying".into()),
                host_id: None,
                started_at: Some(chrono::Utc::now()),
                finished_at: None,
            },
        )
        .await
        .unwrap();
    let updated: Vec<ClientJob> = Table::<ClientJob>::get_many(&*store, &[id]).await.unwrap();
    assert_eq!(updated[0].status, "running");
    assert_eq!(updated[0].created_at, created[0].created_at);
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

#[tokio::test]
async fn delete_clears_memberships_but_keeps_related_entities() {
    let (store, engine) = engine();
    let etc = engine.create(path("/etc")).await.unwrap();
    let mut payload = host("web-01", "10.0.0.1");
    payload.paths = Some(vec![etc]);
    let host_id = engine.create(payload).await.unwrap();
    let set_id = engine
        .create(BackupSetPayload {
            name: "nightly".into(),
            description: None,
            oss_id: None,
            oas_id: None,
            app_set_id: None,
            hosts: Some(vec![host_id]),
        })
        .await
        .unwrap();

    engine.delete::<Host>("web-01").await.unwrap();

    assert!(hosts(&store).await.is_empty());
    assert!(store
        .members(Membership::HostsOfPath, etc)
        .await
        .unwrap()
        .is_empty());
    assert!(store
        .members(Membership::HostsOfBackupSet, set_id)
        .await
        .unwrap()
        .is_empty());
    let paths: Vec<BackupPath> = Table::<BackupPath>::get_many(&*store, &[etc]).await.unwrap();
    assert_eq!(paths.len(), 1);
}

#[tokio::test]
async fn delete_nulls_references_to_the_deleted_entity() {
    let (store, engine) = engine();
    let apps = engine.create(app_set("apps")).await.unwrap();
    let mut payload = host("web-01", "10.0.0.1");
    payload.app_set_id = Some(apps);
    engine.create(payload).await.unwrap();

    engine.delete::<AppSet>("apps").await.unwrap();
    assert_eq!(hosts(&store).await[0].app_set_id, None);
}

#[tokio::test]
async fn delete_of_missing_entity_is_not_found() {
    let (_, engine) = engine();
    assert_matches!(
        engine.delete::<Host>("ghost").await,
        Err(DataError::NotFound { .. })
    );
    assert_matches!(
        engine.delete::<ClientJob>("not-a-uuid").await,
        Err(DataError::NotFound { entity: "ClientJob", .. })
    );
}

#[tokio::test]
async fn failed_delete_keeps_row_and_memberships() {
    let (store, engine) = engine();
    let etc = engine.create(path("/etc")).await.unwrap();
    let mut payload = host("web-01", "10.0.0.1");
    payload.paths = Some(vec![etc]);
    let id = engine.create(payload).await.unwrap();

    // First membership cleared, then the second clear fails.
    store.fail_write_at(1);
    assert!(engine.delete::<Host>("web-01").await.is_err());

    assert_eq!(hosts(&store).await.len(), 1);
    assert_eq!(
        store.members(Membership::PathsOfHost, id).await.unwrap(),
        vec![etc]
    );
}

// ---------------------------------------------------------------------------
// Vault resolution
// ---------------------------------------------------------------------------

#[tokio::test]
async fn oas_without_vault_id_is_resolved_by_name() {
    let store = Arc::new(MemoryStore::new());
    let engine = MutationEngine::new(store.clone()).with_vaults(Arc::new(TwoPageArchive));

    let id = engine.create(oas("beta", None)).await.unwrap();
    let stored: Vec<Oas> = Table::<Oas>::get_many(&*store, &[id]).await.unwrap();
    assert_eq!(stored[0].vault_id, "vault-b");

    // An explicit id skips the lookup.
    let id = engine.create(oas("gamma", Some("vault-g"))).await.unwrap();
    let stored: Vec<Oas> = Table::<Oas>::get_many(&*store, &[id]).await.unwrap();
    assert_eq!(stored[0].vault_id, "vault-g");
}

#[tokio::test]
async fn unknown_vault_fails_the_create() {
    let store = Arc::new(MemoryStore::new());
    let engine = MutationEngine::new(store.clone()).with_vaults(Arc::new(TwoPageArchive));

    let err = engine.create(oas("delta", None)).await.unwrap_err();
    assert_matches!(err, DataError::Vault(VaultError::NotFound(name)) if name == "delta");
}

#[tokio::test]
async fn vault_resolution_without_archive_service_is_a_remote_error() {
    let (_, engine) = engine();
    assert_matches!(
        engine.create(oas("alpha", None)).await,
        Err(DataError::Vault(VaultError::Remote(_)))
    );
}

#[tokio::test]
async fn invalid_oas_is_rejected_before_any_vault_lookup() {
    let store = Arc::new(MemoryStore::new());
    let archive = Arc::new(DownArchive::default());
    let engine = MutationEngine::new(store.clone()).with_vaults(archive.clone());

    let payload = OasPayload {
        endpoint: "   ".to_string(),
        credential_ref: String::new(),
        ..oas("cold", None)
    };
    let err = engine.create(payload).await.unwrap_err();
    assert_matches!(err, DataError::Validation(msg) => {
        assert!(msg.contains("endpoint:"), "{msg}");
        assert!(!msg.contains("vault_id:"), "{msg}");
    });
    assert_eq!(archive.calls.load(Ordering::SeqCst), 0);

    // A valid payload does reach the archive service.
    assert_matches!(
        engine.create(oas("cold", None)).await,
        Err(DataError::Vault(VaultError::Remote(_)))
    );
    assert_eq!(archive.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn engine_works_over_a_store_trait_object() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let engine = MutationEngine::new(store.clone());
    let id = engine.create(app_set("apps")).await.unwrap();
    let found: Vec<AppSet> = Table::<AppSet>::get_many(&*store, &[id]).await.unwrap();
    assert_eq!(found[0].name, "apps");
}
