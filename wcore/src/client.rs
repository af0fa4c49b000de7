// Winefind — client.rs
// Search client for the hosted vector index: session set-up plus the two
// query modes (exact metadata filter, similar-to-id).
// Author: d65v <https://github.com/d65v>
//
// Timeouts, retries and connection pooling belong to the HTTP client; this
// module adds none of its own.

use std::collections::HashMap;

use log::{debug, info, warn};
use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::filter::QueryFilter;
use crate::schema::SchemaMapping;
use crate::{Result, ResultSet, WineFindConfig, WineFindError};

/// Placeholder vector length when the index reports no dimension.
pub const FALLBACK_DIMENSION: usize = 384;

// ── Wire Types ────────────────────────────────────────────────────────────────

/// Control-plane description of one index.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IndexDescription {
    pub name: String,
    #[serde(default)]
    pub dimension: Option<usize>,
    #[serde(default)]
    pub metric: Option<String>,
    /// Data-plane host, usually without a scheme
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub status: Option<IndexStatus>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IndexStatus {
    #[serde(default)]
    pub ready: bool,
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Deserialize)]
struct IndexList {
    #[serde(default)]
    indexes: Vec<IndexDescription>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    #[serde(default)]
    pub dimension: Option<usize>,
    #[serde(default)]
    pub total_vector_count: u64,
    #[serde(default)]
    pub index_fullness: f64,
    #[serde(default)]
    pub namespaces: HashMap<String, NamespaceSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceSummary {
    #[serde(default)]
    pub vector_count: u64,
}

/// Body of a data-plane query. Exactly one of `vector` / `id` is set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub top_k: usize,
    pub include_metadata: bool,
    pub include_values: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

// ── Transport ─────────────────────────────────────────────────────────────────

/// Operations consumed from the hosted index service.
#[cfg_attr(test, mockall::automock)]
pub trait IndexService {
    /// List every index visible to the credential.
    fn list_indexes(&self) -> Result<Vec<IndexDescription>>;

    fn describe_index_stats(&self, index: &IndexDescription) -> Result<IndexStats>;

    /// Run one query. A 404 for an id query surfaces as `NotFound`.
    fn query(&self, index: &IndexDescription, request: &QueryRequest) -> Result<ResultSet>;
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Connect,
    Query,
}

impl Phase {
    fn error(self, message: String) -> WineFindError {
        match self {
            Phase::Connect => WineFindError::ConnectionError(message),
            Phase::Query => WineFindError::QueryError(message),
        }
    }
}

/// HTTP implementation against the Pinecone REST API.
pub struct PineconeService {
    http: Client,
    api_key: String,
    control_url: String,
    api_version: String,
}

impl PineconeService {
    pub fn new(config: &WineFindConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("winefind/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                WineFindError::ConnectionError(format!("cannot build HTTP client: {}", e))
            })?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            control_url: config.control_url.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
        })
    }

    /// Data-plane URL for `path` on an index host that may lack a scheme.
    pub fn data_url(host: &str, path: &str) -> String {
        let host = host.trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            format!("{}/{}", host, path)
        } else {
            format!("https://{}/{}", host, path)
        }
    }

    fn get(&self, url: &str, phase: Phase) -> Result<Response> {
        self.http
            .get(url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", &self.api_version)
            .send()
            .map_err(|e| phase.error(format!("request to {} failed: {}", url, e)))
    }

    fn post<B: Serialize + ?Sized>(&self, url: &str, body: &B, phase: Phase) -> Result<Response> {
        self.http
            .post(url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", &self.api_version)
            .json(body)
            .send()
            .map_err(|e| phase.error(format!("request to {} failed: {}", url, e)))
    }
}

/// Decode a successful response; map failures by status and phase.
fn read_json<T: DeserializeOwned>(response: Response, phase: Phase) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => WineFindError::ConnectionError(
                format!("service rejected the credential ({})", status),
            ),
            _ => phase.error(format!("service returned {}: {}", status, body.trim())),
        });
    }

    response
        .json::<T>()
        .map_err(|e| phase.error(format!("unexpected response body: {}", e)))
}

impl IndexService for PineconeService {
    fn list_indexes(&self) -> Result<Vec<IndexDescription>> {
        let url = format!("{}/indexes", self.control_url);
        let response = self.get(&url, Phase::Connect)?;
        let list: IndexList = read_json(response, Phase::Connect)?;
        Ok(list.indexes)
    }

    fn describe_index_stats(&self, index: &IndexDescription) -> Result<IndexStats> {
        let url = Self::data_url(&index.host, "describe_index_stats");
        let response = self.post(&url, &serde_json::json!({}), Phase::Connect)?;
        read_json(response, Phase::Connect)
    }

    fn query(&self, index: &IndexDescription, request: &QueryRequest) -> Result<ResultSet> {
        let url = Self::data_url(&index.host, "query");
        let response = self.post(&url, request, Phase::Query)?;
        if response.status() == StatusCode::NOT_FOUND {
            if let Some(id) = &request.id {
                return Err(WineFindError::NotFound { id: id.clone() });
            }
        }
        read_json(response, Phase::Query)
    }
}

// ── Session ───────────────────────────────────────────────────────────────────

/// A session bound to exactly one named index.
pub struct IndexHandle<S = PineconeService> {
    service: S,
    index: IndexDescription,
    stats: IndexStats,
    schema: SchemaMapping,
    namespace: Option<String>,
}

/// Open a session over HTTP using the configured credential.
///
/// # Errors
/// `ConnectionError` for transport or auth failures, `IndexNotFound` when the
/// configured index is not listed.
pub fn connect(config: &WineFindConfig) -> Result<IndexHandle<PineconeService>> {
    let service = PineconeService::new(config)?;
    connect_with(service, config)
}

/// Open a session over any [`IndexService`].
pub fn connect_with<S: IndexService>(service: S, config: &WineFindConfig) -> Result<IndexHandle<S>> {
    info!("Fetching available indexes...");
    let indexes = service.list_indexes()?;
    let available: Vec<String> = indexes.iter().map(|i| i.name.clone()).collect();
    debug!("Available indexes: {:?}", available);

    let index = indexes
        .into_iter()
        .find(|i| i.name == config.index_name)
        .ok_or_else(|| WineFindError::IndexNotFound {
            name: config.index_name.clone(),
            available,
        })?;

    if index.host.trim().is_empty() {
        return Err(WineFindError::ConnectionError(format!(
            "index '{}' has no data-plane host",
            index.name
        )));
    }
    if let Some(status) = index.status.as_ref().filter(|s| !s.ready) {
        warn!("Index '{}' is not ready (state: {})", index.name, status.state);
    }

    info!("Attempting to connect to index: {}", index.name);
    let stats = service.describe_index_stats(&index).map_err(|e| match e {
        WineFindError::ConnectionError(_) => e,
        other => WineFindError::ConnectionError(format!(
            "cannot read statistics for index '{}': {}",
            index.name, other
        )),
    })?;
    info!(
        "Connected to index '{}' ({} vectors, dimension {:?})",
        index.name, stats.total_vector_count, stats.dimension
    );

    Ok(IndexHandle {
        service,
        index,
        stats,
        schema: config.schema.clone(),
        namespace: config.namespace.clone(),
    })
}

fn check_limit(limit: usize) -> Result<()> {
    if limit == 0 {
        return Err(WineFindError::InvalidLimit { got: limit });
    }
    Ok(())
}

impl<S: IndexService> IndexHandle<S> {
    pub fn index(&self) -> &IndexDescription {
        &self.index
    }

    /// Statistics captured when the session opened.
    pub fn stats(&self) -> &IndexStats {
        &self.stats
    }

    pub fn schema(&self) -> &SchemaMapping {
        &self.schema
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Fresh statistics from the service.
    pub fn describe_stats(&self) -> Result<IndexStats> {
        self.service.describe_index_stats(&self.index)
    }

    pub fn list_indexes(&self) -> Result<Vec<IndexDescription>> {
        self.service.list_indexes()
    }

    /// Length of the placeholder vector sent with filter queries.
    pub fn dimension(&self) -> usize {
        self.index
            .dimension
            .or(self.stats.dimension)
            .unwrap_or(FALLBACK_DIMENSION)
    }

    /// Exact-match metadata lookup. The probe vector is all zeros; ranking
    /// by embedding is not requested in this mode.
    ///
    /// # Errors
    /// `EmptyFilter` (before any remote call) when no criterion is set,
    /// `InvalidLimit` for `limit == 0`, `QueryError` for service failures.
    pub fn query_by_filter(&self, filter: &QueryFilter, limit: usize) -> Result<ResultSet> {
        let remote_filter = filter.to_remote_filter(&self.schema)?;
        check_limit(limit)?;
        debug!("Applying metadata filter: {}", remote_filter);

        let request = QueryRequest {
            vector: Some(vec![0.0; self.dimension()]),
            id: None,
            top_k: limit,
            include_metadata: true,
            include_values: false,
            filter: Some(remote_filter),
            namespace: self.namespace.clone(),
        };
        let results = self.service.query(&self.index, &request)?;
        log_results(&results);
        Ok(results)
    }

    /// Nearest neighbours of a stored item by the index's own metric.
    ///
    /// # Errors
    /// `NotFound` when `id` is blank or absent from the index. A stored
    /// vector always matches itself, so an empty answer means absent.
    pub fn query_by_id(&self, id: &str, limit: usize) -> Result<ResultSet> {
        let id = id.trim();
        if id.is_empty() {
            return Err(WineFindError::NotFound { id: String::new() });
        }
        check_limit(limit)?;
        debug!("Querying neighbours of '{}' (top {})", id, limit);

        let request = QueryRequest {
            vector: None,
            id: Some(id.to_string()),
            top_k: limit,
            include_metadata: true,
            include_values: false,
            filter: None,
            namespace: self.namespace.clone(),
        };
        let results = self.service.query(&self.index, &request)?;
        log_results(&results);
        if results.is_empty() {
            return Err(WineFindError::NotFound { id: id.to_string() });
        }
        Ok(results)
    }
}

fn log_results(results: &ResultSet) {
    debug!("Number of matches: {}", results.len());
    if let Some(first) = results.matches.first() {
        debug!("First match metadata: {:?}", first.metadata);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
