// Winefind — lib.rs
// Public API, error taxonomy, configuration, result types, re-exports.
// Author: d65v <https://github.com/d65v>

pub mod chart;
pub mod client;
pub mod filter;
pub mod format;
pub mod present;
pub mod schema;

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

pub use crate::chart::{build_radar_chart, ChartSpec};
pub use crate::client::{connect, connect_with, IndexHandle, IndexService, PineconeService};
pub use crate::filter::{QueryFilter, WineColor, WineType};
pub use crate::format::{format, format_match, DisplayRecord};
pub use crate::schema::{Attribute, SchemaMapping};

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum WineFindError {
    #[error("Missing credential: environment variable {var} is not set")]
    MissingCredential { var: &'static str },

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Index '{name}' not found. Available indexes: {}", list_or_none(.available))]
    IndexNotFound { name: String, available: Vec<String> },

    #[error("Please enter at least one search criterion")]
    EmptyFilter,

    #[error("Result limit must be a positive integer, got {got}")]
    InvalidLimit { got: usize },

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Record not found: {id}")]
    NotFound { id: String },

    #[error("Malformed metadata: expected a key-value mapping, got {0}")]
    MalformedMetadata(String),

    #[error("Cannot build a chart from an empty score sequence")]
    EmptyInput,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl WineFindError {
    /// True for failures that happen while opening the session. These halt
    /// the front-end instead of degrading to an empty result.
    pub fn is_initialization(&self) -> bool {
        matches!(
            self,
            WineFindError::MissingCredential { .. }
                | WineFindError::ConnectionError(_)
                | WineFindError::IndexNotFound { .. }
                | WineFindError::ConfigError(_)
        )
    }
}

fn list_or_none(names: &[String]) -> String {
    if names.is_empty() {
        "(none)".to_string()
    } else {
        names.join(", ")
    }
}

pub type Result<T> = std::result::Result<T, WineFindError>;

// ── Config ────────────────────────────────────────────────────────────────────

pub const API_KEY_VAR: &str = "PINECONE_API_KEY";
pub const DEFAULT_INDEX: &str = "wine-embeddings";
pub const DEFAULT_CONTROL_URL: &str = "https://api.pinecone.io";
pub const DEFAULT_API_VERSION: &str = "2024-07";

/// Which input shape the front-end accepts. One per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    /// Exact-match metadata filter over name/region/country/type/color.
    #[default]
    Filter,
    /// Nearest neighbours of a stored wine id.
    Similar,
}

impl SearchMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SearchMode::Filter => "filter",
            SearchMode::Similar => "similar",
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchMode {
    type Err = WineFindError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "filter" | "metadata" => Ok(SearchMode::Filter),
            "similar" | "id" => Ok(SearchMode::Similar),
            other => Err(WineFindError::ConfigError(format!(
                "unknown search mode '{}' (expected filter | similar)",
                other
            ))),
        }
    }
}

#[derive(Clone)]
pub struct WineFindConfig {
    /// Service credential; never logged
    pub api_key: String,
    /// Name of the index the session binds to
    pub index_name: String,
    /// Control-plane base URL (index listing)
    pub control_url: String,
    /// Value sent as `X-Pinecone-API-Version`
    pub api_version: String,
    /// Namespace queried; `None` is the default namespace
    pub namespace: Option<String>,
    pub mode: SearchMode,
    /// Metadata naming convention of the index
    pub schema: SchemaMapping,
}

impl fmt::Debug for WineFindConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WineFindConfig")
            .field("api_key", &"<redacted>")
            .field("index_name", &self.index_name)
            .field("control_url", &self.control_url)
            .field("api_version", &self.api_version)
            .field("namespace", &self.namespace)
            .field("mode", &self.mode)
            .field("schema", &self.schema.name)
            .finish()
    }
}

impl WineFindConfig {
    /// Config with every optional setting at its default.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            index_name: DEFAULT_INDEX.to_string(),
            control_url: DEFAULT_CONTROL_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            namespace: None,
            mode: SearchMode::default(),
            schema: SchemaMapping::semantic(),
        }
    }

    /// Load config from environment variables, falling back to defaults.
    ///
    /// # Errors
    /// `MissingCredential` when `PINECONE_API_KEY` is unset or blank,
    /// `ConfigError` for an unknown mode or schema, or an unreadable schema file.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_key = var(API_KEY_VAR).ok_or(WineFindError::MissingCredential { var: API_KEY_VAR })?;

        let mode = match var("WINEFIND_MODE") {
            Some(v) => v.parse()?,
            None => SearchMode::default(),
        };

        let schema = match (var("WINEFIND_SCHEMA_FILE"), var("WINEFIND_SCHEMA")) {
            (Some(path), _) => SchemaMapping::from_json_file(path)?,
            (None, Some(name)) => SchemaMapping::builtin(&name)?,
            (None, None) => SchemaMapping::semantic(),
        };

        Ok(Self {
            api_key,
            index_name: var("WINEFIND_INDEX").unwrap_or_else(|| DEFAULT_INDEX.to_string()),
            control_url: var("WINEFIND_CONTROL_URL")
                .unwrap_or_else(|| DEFAULT_CONTROL_URL.to_string()),
            api_version: var("WINEFIND_API_VERSION")
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            namespace: var("WINEFIND_NAMESPACE"),
            mode,
            schema,
        })
    }
}

// ── Core Data Types ───────────────────────────────────────────────────────────

/// A single record returned by the index service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Match {
    pub id: String,
    #[serde(default)]
    pub score: f64,
    /// Raw stored attributes. Key names depend on how the index was populated.
    #[serde(default)]
    pub metadata: Option<Value>,
}

/// Matches in the order the service ranked them. Never re-sorted locally.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ResultSet {
    #[serde(default)]
    pub matches: Vec<Match>,
    #[serde(default)]
    pub namespace: String,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn scores(&self) -> Vec<f64> {
        self.matches.iter().map(|m| m.score).collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_missing_credential() {
        let err = WineFindConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, WineFindError::MissingCredential { var: API_KEY_VAR }));
    }

    #[test]
    fn test_config_blank_credential_is_missing() {
        let err = WineFindConfig::from_lookup(lookup(&[(API_KEY_VAR, "   ")])).unwrap_err();
        assert!(matches!(err, WineFindError::MissingCredential { .. }));
    }

    #[test]
    fn test_config_defaults() {
        let cfg = WineFindConfig::from_lookup(lookup(&[(API_KEY_VAR, "pk-test")])).unwrap();
        assert_eq!(cfg.api_key, "pk-test");
        assert_eq!(cfg.index_name, DEFAULT_INDEX);
        assert_eq!(cfg.control_url, DEFAULT_CONTROL_URL);
        assert_eq!(cfg.mode, SearchMode::Filter);
        assert_eq!(cfg.schema, SchemaMapping::semantic());
        assert!(cfg.namespace.is_none());
    }

    #[test]
    fn test_config_overrides() {
        let cfg = WineFindConfig::from_lookup(lookup(&[
            (API_KEY_VAR, "pk-test"),
            ("WINEFIND_INDEX", "wine-embeddings-1eowpvt"),
            ("WINEFIND_MODE", "similar"),
            ("WINEFIND_SCHEMA", "source"),
            ("WINEFIND_NAMESPACE", "reviews"),
        ]))
        .unwrap();
        assert_eq!(cfg.index_name, "wine-embeddings-1eowpvt");
        assert_eq!(cfg.mode, SearchMode::Similar);
        assert_eq!(cfg.schema, SchemaMapping::source());
        assert_eq!(cfg.namespace.as_deref(), Some("reviews"));
    }

    #[test]
    fn test_config_unknown_mode() {
        let err = WineFindConfig::from_lookup(lookup(&[
            (API_KEY_VAR, "pk-test"),
            ("WINEFIND_MODE", "both"),
        ]))
        .unwrap_err();
        assert!(matches!(err, WineFindError::ConfigError(_)));
        assert!(err.is_initialization());
    }

    #[test]
    fn test_config_debug_redacts_key() {
        let cfg = WineFindConfig::new("pk-very-secret");
        let dbg = format!("{:?}", cfg);
        assert!(!dbg.contains("pk-very-secret"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn test_index_not_found_lists_available() {
        let err = WineFindError::IndexNotFound {
            name: "wine-embeddings".into(),
            available: vec!["a".into(), "b".into()],
        };
        assert_eq!(
            err.to_string(),
            "Index 'wine-embeddings' not found. Available indexes: a, b"
        );

        let err = WineFindError::IndexNotFound {
            name: "x".into(),
            available: vec![],
        };
        assert!(err.to_string().ends_with("(none)"));
    }

    #[test]
    fn test_result_set_keeps_service_order() {
        let body = r#"{
            "matches": [
                {"id": "wine_7", "score": 0.42, "metadata": {"wine_name": "b"}},
                {"id": "wine_3", "score": 0.91}
            ],
            "namespace": "",
            "usage": {"readUnits": 5}
        }"#;
        let rs: ResultSet = serde_json::from_str(body).unwrap();
        assert_eq!(rs.len(), 2);
        assert_eq!(rs.matches[0].id, "wine_7");
        assert_eq!(rs.scores(), vec![0.42, 0.91]);
        assert!(rs.matches[1].metadata.is_none());
    }

    #[test]
    fn test_query_errors_are_not_initialization() {
        assert!(!WineFindError::EmptyFilter.is_initialization());
        assert!(!WineFindError::NotFound { id: "wine_123".into() }.is_initialization());
        assert!(!WineFindError::QueryError("boom".into()).is_initialization());
    }
}
