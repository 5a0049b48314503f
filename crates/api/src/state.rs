use std::sync::Arc;

use moduleab_core::roles::PrivilegeTable;
use moduleab_core::vault::VaultLister;
use moduleab_db::catalog::Catalog;
use moduleab_db::engine::MutationEngine;
use moduleab_db::store::Store;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (everything is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Backing store, used directly for accounts and health.
    pub store: Arc<dyn Store>,
    pub config: Arc<ServerConfig>,
    /// Minimum role per route, consulted by the gate.
    pub privileges: Arc<PrivilegeTable>,
    pub engine: Arc<MutationEngine<dyn Store>>,
    pub catalog: Arc<Catalog<dyn Store>>,
}

impl AppState {
    /// Wire the engine and catalog over `store`. `vaults` resolves archive
    /// vault names; without it archive targets must carry their vault id.
    pub fn new(
        store: Arc<dyn Store>,
        config: ServerConfig,
        vaults: Option<Arc<dyn VaultLister>>,
    ) -> Self {
        let mut engine = MutationEngine::new(Arc::clone(&store));
        if let Some(vaults) = vaults {
            engine = engine.with_vaults(vaults);
        }
        Self {
            catalog: Arc::new(Catalog::new(Arc::clone(&store))),
            engine: Arc::new(engine),
            privileges: Arc::new(PrivilegeTable::standard()),
            config: Arc::new(config),
            store,
        }
    }
}
