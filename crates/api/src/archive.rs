//! HTTP client for the remote archive service's vault listing.
//!
//! Requests are signed with the same canonical-request HMAC scheme the
//! gate accepts inbound.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use moduleab_core::signing::{
    sign, ApiCredentials, SignedRequest, API_KEY_HEADER, DATE_HEADER, SIGNATURE_HEADER,
};
use moduleab_core::vault::{VaultError, VaultLister, VaultPage, VaultSummary};
use reqwest::Url;
use serde::Deserialize;

/// Vaults requested per page unless `OAS_PAGE_SIZE` says otherwise.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Where the archive service lives and how to sign requests to it.
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    /// Base URL without a trailing slash.
    pub endpoint: String,
    pub credentials: ApiCredentials,
    pub page_size: u32,
}

/// Wire shape of `GET /vaults`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListVaultsResponse {
    #[serde(default)]
    vault_list: Vec<VaultEntry>,
    #[serde(default)]
    marker: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct VaultEntry {
    vault_id: String,
    vault_name: String,
}

impl From<ListVaultsResponse> for VaultPage {
    fn from(response: ListVaultsResponse) -> Self {
        VaultPage {
            vaults: response
                .vault_list
                .into_iter()
                .map(|entry| VaultSummary {
                    id: entry.vault_id,
                    name: entry.vault_name,
                })
                .collect(),
            next_marker: response.marker.unwrap_or_default(),
        }
    }
}

pub struct ArchiveClient {
    http: reqwest::Client,
    config: ArchiveConfig,
}

impl ArchiveClient {
    pub fn new(config: ArchiveConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { http, config })
    }

    /// URL of the page starting at `marker`.
    fn page_url(&self, marker: &str) -> Result<Url, VaultError> {
        let limit = self.config.page_size.to_string();
        Url::parse_with_params(
            &format!("{}/vaults", self.config.endpoint),
            [("marker", marker), ("limit", limit.as_str())],
        )
        .map_err(|e| VaultError::Remote(format!("invalid archive endpoint: {e}")))
    }
}

/// Path plus query exactly as sent, which is what the signature covers.
fn path_and_query(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{query}", url.path()),
        None => url.path().to_string(),
    }
}

#[async_trait]
impl VaultLister for ArchiveClient {
    async fn list_vaults(&self, marker: &str) -> Result<VaultPage, VaultError> {
        let url = self.page_url(marker)?;
        let date = Utc::now().to_rfc2822();
        let target = path_and_query(&url);
        let signature = sign(
            &self.config.credentials.secret,
            &SignedRequest {
                method: "GET",
                path_and_query: &target,
                date: &date,
                body: b"",
            },
        );

        let response = self
            .http
            .get(url)
            .header(API_KEY_HEADER, &self.config.credentials.key)
            .header(DATE_HEADER, &date)
            .header(SIGNATURE_HEADER, signature)
            .send()
            .await
            .map_err(|e| VaultError::Remote(format!("archive request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(VaultError::Remote(format!(
                "archive service returned {status}"
            )));
        }

        let body: ListVaultsResponse = response
            .json()
            .await
            .map_err(|e| VaultError::Remote(format!("unreadable vault listing: {e}")))?;
        Ok(body.into())
    }
}
