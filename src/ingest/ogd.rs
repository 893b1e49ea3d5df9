/// data.gov.in (Open Government Data platform) resource API client.
///
/// Handles URL construction, the blocking fetch and JSON envelope parsing
/// for the resource endpoint:
///   https://api.data.gov.in/resource/{resource_id}?api-key=...&format=json&limit=N
///
/// The envelope carries a `total` count and a `records` array of flat
/// objects whose field names depend on the resource. Records are kept
/// untyped here; `ingest::schema` reads them. See `fixtures.rs` for sample
/// payloads.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::ingest::schema::parse_number;
use crate::model::{AqiError, ProviderRecord};

pub const OGD_BASE_URL: &str = "https://api.data.gov.in/resource/";
pub const DEFAULT_RESOURCE_ID: &str = "579b464db66ec23bdd000001692be7fdbc4c4e5e5142b59bd3f812f1";

/// Records requested when refreshing the cache.
pub const CACHE_FETCH_LIMIT: u32 = 1000;
/// Records requested by the debug introspection.
pub const DEBUG_FETCH_LIMIT: u32 = 5;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(8);

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct OgdResponse {
    // reported as a number by most resources, as a string by some
    #[serde(default)]
    total: Option<Value>,
    #[serde(default)]
    records: Option<Vec<ProviderRecord>>,
}

/// One page of records plus the provider's reported total.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordBatch {
    pub total: Option<u64>,
    pub records: Vec<ProviderRecord>,
}

// ---------------------------------------------------------------------------
// URL construction
// ---------------------------------------------------------------------------

/// Builds a resource URL requesting JSON and at most `limit` records.
///
/// The resource id and key are percent-encoded; `base_url` is used as given
/// and must end with a slash.
pub fn build_records_url(base_url: &str, resource_id: &str, api_key: &str, limit: u32) -> String {
    format!(
        "{}{}?api-key={}&format=json&limit={}",
        base_url,
        urlencoding::encode(resource_id),
        urlencoding::encode(api_key),
        limit
    )
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Parses a resource response body.
///
/// A missing `records` array reads as an empty batch; whether that is an
/// error is the caller's decision.
///
/// # Errors
/// - `AqiError::UpstreamUnavailable` for malformed JSON or a `records`
///   array holding something other than objects.
pub fn parse_records_response(json: &str) -> Result<RecordBatch, AqiError> {
    let response: OgdResponse = serde_json::from_str(json)
        .map_err(|e| AqiError::UpstreamUnavailable(format!("malformed provider response: {}", e)))?;

    let total = response
        .total
        .as_ref()
        .and_then(parse_number)
        .filter(|t| *t >= 0.0)
        .map(|t| t as u64);

    Ok(RecordBatch {
        total,
        records: response.records.unwrap_or_default(),
    })
}

// ---------------------------------------------------------------------------
// Record sources
// ---------------------------------------------------------------------------

/// Anything that can hand back a page of provider records.
///
/// The live implementation is `OgdClient`; tests substitute in-memory
/// sources.
pub trait RecordSource: Send + Sync {
    fn fetch_records(&self, limit: u32) -> Result<RecordBatch, AqiError>;
}

/// Blocking client for one data.gov.in resource.
pub struct OgdClient {
    http: reqwest::blocking::Client,
    base_url: String,
    resource_id: String,
    api_key: String,
}

impl OgdClient {
    pub fn new(
        base_url: &str,
        resource_id: &str,
        api_key: &str,
        timeout: Duration,
    ) -> Result<Self, AqiError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AqiError::UpstreamUnavailable(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.to_string(),
            resource_id: resource_id.to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }
}

impl RecordSource for OgdClient {
    fn fetch_records(&self, limit: u32) -> Result<RecordBatch, AqiError> {
        let url = build_records_url(&self.base_url, &self.resource_id, &self.api_key, limit);
        debug!(resource_id = %self.resource_id, limit, "fetching provider records");

        let response = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .map_err(|e| {
                // reqwest errors embed the URL, which carries the key
                let e = e.without_url();
                warn!(error = %e, "provider request failed");
                AqiError::UpstreamUnavailable(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "provider returned an error status");
            return Err(AqiError::UpstreamUnavailable(format!(
                "provider returned HTTP {}",
                status
            )));
        }

        let body = response
            .text()
            .map_err(|e| AqiError::UpstreamUnavailable(e.without_url().to_string()))?;

        let batch = parse_records_response(&body)?;
        debug!(records = batch.records.len(), total = ?batch.total, "provider records received");
        Ok(batch)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
