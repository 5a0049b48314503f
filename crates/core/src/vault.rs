//! Resolution of archive vault names to opaque vault ids.
//!
//! The archive service only lists vaults page by page; each page carries a
//! marker naming where the next one starts, and an empty marker ends the
//! listing.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One vault as reported by the archive service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultSummary {
    pub id: String,
    pub name: String,
}

/// One page of the remote listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VaultPage {
    pub vaults: Vec<VaultSummary>,
    /// Marker of the next page; empty on the last page.
    pub next_marker: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VaultError {
    #[error("Vault not found: {0}")]
    NotFound(String),

    #[error("Archive service error: {0}")]
    Remote(String),
}

/// Paginated vault listing of a remote archive service.
#[async_trait]
pub trait VaultLister: Send + Sync {
    /// Fetch the page starting at `marker` (empty for the first page).
    async fn list_vaults(&self, marker: &str) -> Result<VaultPage, VaultError>;
}

/// Walk the listing until a vault named exactly `name` shows up.
///
/// The first match wins. A failed page fetch aborts the walk and its error
/// is returned as-is.
pub async fn resolve_vault_id<L>(lister: &L, name: &str) -> Result<String, VaultError>
where
    L: VaultLister + ?Sized,
{
    let mut marker = String::new();
    let mut pages = 0usize;
    loop {
        let page = lister.list_vaults(&marker).await?;
        pages += 1;
        tracing::debug!(%name, %marker, pages, vaults = page.vaults.len(), "Scanning vault page");

        if let Some(vault) = page.vaults.into_iter().find(|v| v.name == name) {
            return Ok(vault.id);
        }
        if page.next_marker.is_empty() {
            return Err(VaultError::NotFound(name.to_string()));
        }
        marker = page.next_marker;
    }
}
