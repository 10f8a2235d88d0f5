//! Remote service client
//!
//! Minimal bearer-token request surface consumed by the sync engine. The
//! `RemoteService` trait is the seam the engine is generic over; the HTTP
//! implementation is a thin reqwest wrapper with no retry logic of its own
//! (retry and scheduling policy live in the sync layer).

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{
    AuditStatus, PulledFinding, PulledItem, PulledLocation, PulledReport,
};
use crate::util::{compact_text, is_http_url, normalize_text_option};

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

/// Connection settings for the remote audit service
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Base URL, e.g. `https://audit.example.com/api`
    pub base_url: String,
    /// Opaque bearer token issued by the auth layer
    pub auth_token: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl RemoteConfig {
    /// Create a configuration with the default request timeout
    pub fn new(base_url: impl Into<String>, auth_token: impl Into<String>) -> Result<Self> {
        Ok(Self {
            base_url: normalize_base_url(base_url.into())?,
            auth_token: auth_token.into(),
            timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        })
    }

    /// Override the per-request timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Location record as served by `GET /locations`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteLocation {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub path: String,
    pub depth: i64,
    #[serde(default)]
    pub parent_id: Option<i64>,
}

impl RemoteLocation {
    /// Convert into the store-facing merge view
    #[must_use]
    pub fn into_pulled(self) -> PulledLocation {
        PulledLocation {
            server_id: self.id,
            code: self.code,
            name: self.name,
            path: self.path,
            depth: self.depth,
            parent_server_id: self.parent_id,
        }
    }
}

/// Inventory item record as served by `GET /inventory?locationId=...`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteInventoryItem {
    pub id: i64,
    pub location_id: i64,
    pub sku: String,
    pub name: String,
    pub system_qty: i64,
    #[serde(default)]
    pub physical_qty: Option<i64>,
    #[serde(default)]
    pub biometric_tag: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
}

impl RemoteInventoryItem {
    /// Convert into the store-facing merge view
    #[must_use]
    pub fn into_pulled(self) -> PulledItem {
        PulledItem {
            server_id: self.id,
            location_server_id: self.location_id,
            sku: self.sku,
            name: self.name,
            system_qty: self.system_qty,
            physical_qty: self.physical_qty,
            biometric_tag: self.biometric_tag,
            remarks: self.remarks,
        }
    }
}

/// Audit report record as served by `GET /audits` and `GET /audits/:id`
///
/// The single-report endpoint embeds findings; the list endpoint omits them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteAuditReport {
    pub id: i64,
    pub location_id: i64,
    pub auditor_id: i64,
    pub status: AuditStatus,
    #[serde(default)]
    pub findings: Vec<RemoteFinding>,
}

impl RemoteAuditReport {
    /// Convert into the store-facing merge view (findings handled separately)
    #[must_use]
    pub fn to_pulled(&self) -> PulledReport {
        PulledReport {
            server_id: self.id,
            location_server_id: self.location_id,
            auditor_id: self.auditor_id,
            status: self.status,
        }
    }
}

/// Audit finding record embedded in `GET /audits/:id`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFinding {
    pub id: i64,
    pub report_id: i64,
    pub item_id: i64,
    pub counted_qty: i64,
    pub difference: i64,
    #[serde(default)]
    pub biometric_tag: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
}

impl RemoteFinding {
    /// Convert into the store-facing merge view
    #[must_use]
    pub fn into_pulled(self) -> PulledFinding {
        PulledFinding {
            server_id: self.id,
            report_server_id: self.report_id,
            item_server_id: self.item_id,
            counted_qty: self.counted_qty,
            difference: self.difference,
            biometric_tag: self.biometric_tag,
            remarks: self.remarks,
        }
    }
}

/// Body for `POST /audits`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAuditRequest {
    pub location_id: i64,
}

/// Body for `POST /audits/:reportId/findings` (create-or-update, keyed by
/// report + item on the server side)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FindingPayload {
    pub item_id: i64,
    pub counted_qty: i64,
    pub difference: i64,
    pub biometric_tag: Option<String>,
    pub remarks: Option<String>,
}

/// Body for the inventory item PATCH: only the auditor-editable subset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemAuditPatch {
    pub physical_qty: Option<i64>,
    pub difference: Option<i64>,
    pub biometric_tag: Option<String>,
    pub remarks: Option<String>,
}

/// The remote request surface the sync engine is written against.
#[allow(async_fn_in_trait)]
pub trait RemoteService {
    /// `GET /locations` — all locations visible to the identity
    async fn fetch_locations(&self) -> Result<Vec<RemoteLocation>>;

    /// `GET /inventory?locationId=<id>` — items scoped to one location
    async fn fetch_inventory(&self, location_id: i64) -> Result<Vec<RemoteInventoryItem>>;

    /// `GET /audits?auditorId=<id>` — reports assigned to the identity
    async fn fetch_audits(&self, auditor_id: i64) -> Result<Vec<RemoteAuditReport>>;

    /// `GET /audits/:id` — one report with embedded findings
    async fn fetch_audit(&self, report_id: i64) -> Result<RemoteAuditReport>;

    /// `POST /audits` — create a report, returns the server-assigned record
    async fn create_audit(&self, location_id: i64) -> Result<RemoteAuditReport>;

    /// `POST /audits/:reportId/findings` — create-or-update one finding
    async fn push_finding(&self, report_id: i64, payload: &FindingPayload)
        -> Result<RemoteFinding>;

    /// `PATCH` the auditor-editable fields of an inventory item
    async fn update_item(&self, item_id: i64, patch: &ItemAuditPatch) -> Result<()>;

    /// `GET /health` — liveness probe for the connectivity monitor
    async fn health(&self) -> Result<()>;
}

/// HTTP implementation of `RemoteService`
#[derive(Clone)]
pub struct HttpRemoteService {
    base_url: String,
    auth_token: String,
    client: reqwest::Client,
}

impl HttpRemoteService {
    /// Build a client from the given configuration
    pub fn new(config: RemoteConfig) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            base_url: config.base_url,
            auth_token: config.auth_token,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(&self.auth_token)
            .header("Accept", "application/json")
            .send()
            .await?;
        let response = check_status(response).await?;
        read_json(response).await
    }

    async fn post_json<B: Serialize, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.auth_token)
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await?;
        let response = check_status(response).await?;
        read_json(response).await
    }
}

/// Decode a success response body, separating a malformed payload from a
/// transport fault: the former is not retryable and must not be classified
/// as transient.
async fn read_json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    response.json::<T>().await.map_err(|error| {
        if error.is_decode() {
            Error::InvalidPayload(error.to_string())
        } else {
            Error::Http(error)
        }
    })
}

impl RemoteService for HttpRemoteService {
    async fn fetch_locations(&self) -> Result<Vec<RemoteLocation>> {
        self.get_json("/locations").await
    }

    async fn fetch_inventory(&self, location_id: i64) -> Result<Vec<RemoteInventoryItem>> {
        self.get_json(&format!("/inventory?locationId={location_id}"))
            .await
    }

    async fn fetch_audits(&self, auditor_id: i64) -> Result<Vec<RemoteAuditReport>> {
        self.get_json(&format!("/audits?auditorId={auditor_id}"))
            .await
    }

    async fn fetch_audit(&self, report_id: i64) -> Result<RemoteAuditReport> {
        self.get_json(&format!("/audits/{report_id}")).await
    }

    async fn create_audit(&self, location_id: i64) -> Result<RemoteAuditReport> {
        self.post_json("/audits", &CreateAuditRequest { location_id })
            .await
    }

    async fn push_finding(
        &self,
        report_id: i64,
        payload: &FindingPayload,
    ) -> Result<RemoteFinding> {
        self.post_json(&format!("/audits/{report_id}/findings"), payload)
            .await
    }

    async fn update_item(&self, item_id: i64, patch: &ItemAuditPatch) -> Result<()> {
        let response = self
            .client
            .patch(self.url(&format!("/inventory/{item_id}")))
            .bearer_auth(&self.auth_token)
            .header("Accept", "application/json")
            .json(patch)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn health(&self) -> Result<()> {
        let response = self
            .client
            .get(self.url("/health"))
            .bearer_auth(&self.auth_token)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

/// Turn non-success responses into `Error::Api` with a readable message
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(Error::Api {
        status: status.as_u16(),
        message: parse_api_error(status, &body),
    })
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return message.trim().to_string();
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        compact_text(trimmed)
    }
}

fn normalize_base_url(raw: String) -> Result<String> {
    let url = normalize_text_option(Some(raw))
        .ok_or_else(|| Error::InvalidInput("base URL must not be empty".to_string()))?;
    if is_http_url(&url) {
        Ok(url.trim_end_matches('/').to_string())
    } else {
        Err(Error::InvalidInput(
            "base URL must include http:// or https://".to_string(),
        ))
    }
}
