// Winefind — present.rs
// Presentation core shared by the binaries: one user request in, one rendered
// outcome out. Query-time failures degrade to a "no matches" message.
// Author: d65v <https://github.com/d65v>

use std::fmt::Write as _;

use log::{error, warn};

use crate::chart::{build_radar_chart, ChartSpec};
use crate::client::{IndexDescription, IndexHandle, IndexService, IndexStats};
use crate::filter::{QueryFilter, WineColor, WineType};
use crate::format::{format_match, DisplayRecord};
use crate::schema::SchemaMapping;
use crate::{ResultSet, SearchMode, WineFindError};

pub const DEFAULT_TOP_K: usize = 5;
pub const MAX_TOP_K: usize = 10;
pub const CHART_WIDTH: usize = 30;

/// Parse a result count from user input, bounded to `1..=MAX_TOP_K`.
pub fn parse_top_k(s: &str) -> Result<usize, String> {
    let n: usize = s
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", s.trim()))?;
    if (1..=MAX_TOP_K).contains(&n) {
        Ok(n)
    } else {
        Err(format!("number of results must be between 1 and {}", MAX_TOP_K))
    }
}

// ── Requests & Outcomes ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchInput {
    Filter(QueryFilter),
    Similar(String),
}

impl SearchInput {
    pub fn mode(&self) -> SearchMode {
        match self {
            SearchInput::Filter(_) => SearchMode::Filter,
            SearchInput::Similar(_) => SearchMode::Similar,
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            SearchInput::Filter(filter) => filter.is_empty(),
            SearchInput::Similar(id) => id.trim().is_empty(),
        }
    }

    /// Status line shown while the remote call blocks. `None` when the
    /// input makes no call.
    pub fn progress(&self) -> Option<&'static str> {
        (!self.is_blank()).then_some("Finding wines...")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedRecord {
    pub rank: usize,
    pub id: String,
    pub score: f64,
    pub record: DisplayRecord,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Nothing was asked yet.
    Guidance(String),
    /// Zero matches, or the query failed.
    NoMatches(String),
    Matches {
        mode: SearchMode,
        records: Vec<RankedRecord>,
        chart: Option<ChartSpec>,
    },
}

/// Run one request: at most one remote call.
pub fn search<S: IndexService>(handle: &IndexHandle<S>, input: &SearchInput, limit: usize) -> Outcome {
    let mode = input.mode();
    if input.is_blank() {
        return Outcome::Guidance(guidance(mode));
    }

    let results = match input {
        SearchInput::Filter(filter) => handle.query_by_filter(filter, limit),
        SearchInput::Similar(id) => handle.query_by_id(id, limit),
    };

    match results {
        Ok(results) if results.is_empty() => Outcome::NoMatches(no_matches(mode, None)),
        Ok(results) => collect(handle.schema(), mode, results),
        Err(err) => {
            if err.is_initialization() {
                error!("Session failure during search: {}", err);
            } else {
                warn!("Search failed: {}", err);
            }
            Outcome::NoMatches(no_matches(mode, Some(&err)))
        }
    }
}

fn collect(schema: &SchemaMapping, mode: SearchMode, results: ResultSet) -> Outcome {
    let scores = results.scores();
    let mut records = Vec::with_capacity(results.len());
    for (i, m) in results.matches.into_iter().enumerate() {
        let record = match format_match(&m, schema) {
            Ok(record) => record,
            Err(err) => {
                warn!("Cannot format match '{}': {}", m.id, err);
                return Outcome::NoMatches(no_matches(mode, Some(&err)));
            }
        };
        records.push(RankedRecord {
            rank: i + 1,
            id: m.id,
            score: m.score,
            record,
        });
    }

    Outcome::Matches {
        mode,
        records,
        chart: build_radar_chart(&scores).ok(),
    }
}

// ── Messages ──────────────────────────────────────────────────────────────────

pub fn guidance(mode: SearchMode) -> String {
    match mode {
        SearchMode::Filter => format!(
            "Enter search criteria to find wines.\n\
             Try searching with these example criteria:\n  \
             - Type: Red\n  \
             - Country: France\n  \
             - Region: Burgundy\n\
             Or just enter a wine name to search by name only!\n\
             Types: {}   Colors: {}",
            join(WineType::ALL.iter()),
            join(WineColor::ALL.iter()),
        ),
        SearchMode::Similar => "Enter a wine ID to find similar wines.\n\
             Try using one of these example wine IDs:\n  \
             - wine_123\n  \
             - wine_456\n  \
             - wine_789"
            .to_string(),
    }
}

fn join<T: std::fmt::Display>(items: impl Iterator<Item = T>) -> String {
    items.map(|i| i.to_string()).collect::<Vec<_>>().join(" | ")
}

fn no_matches(mode: SearchMode, cause: Option<&WineFindError>) -> String {
    let base = match mode {
        SearchMode::Filter => "No matching wines found. Please try different search criteria.",
        SearchMode::Similar => "No similar wines found. Please try a different wine ID.",
    };
    match cause {
        Some(err) => format!("{}\n({})", base, err),
        None => base.to_string(),
    }
}

// ── Rendering ─────────────────────────────────────────────────────────────────

pub fn render(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Guidance(text) | Outcome::NoMatches(text) => format!("{}\n", text),
        Outcome::Matches {
            mode,
            records,
            chart,
        } => {
            let (noun, score_label, chart_title) = match mode {
                SearchMode::Filter => ("matching", "Match Score", "Match Score Visualization"),
                SearchMode::Similar => ("similar", "Similarity", "Similarity Visualization"),
            };

            let mut out = String::new();
            let _ = writeln!(out, "Found {} {} wines!\n", records.len(), noun);
            for r in records {
                let _ = writeln!(
                    out,
                    "{}. {}  [{}]  {}: {:.2}",
                    r.rank,
                    r.record.title(),
                    r.id,
                    score_label,
                    r.score
                );
                for field in r.record.fields() {
                    let _ = writeln!(out, "   {}: {}", field.label, field.value);
                }
                out.push('\n');
            }

            if let Some(chart) = chart {
                let _ = writeln!(out, "{}", chart_title);
                out.push_str(&chart.render_text(CHART_WIDTH));
            }
            out
        }
    }
}

pub fn render_indexes(indexes: &[IndexDescription], active: &str) -> String {
    if indexes.is_empty() {
        return "No indexes found for this API key.\n".to_string();
    }
    let mut out = String::new();
    for idx in indexes {
        let marker = if idx.name == active { '*' } else { ' ' };
        let _ = writeln!(
            out,
            "{} {:<32} dim={:<6} metric={:<10} state={}",
            marker,
            idx.name,
            idx.dimension.map(|d| d.to_string()).unwrap_or_else(|| "?".into()),
            idx.metric.as_deref().unwrap_or("?"),
            idx.status.as_ref().map(|s| s.state.as_str()).unwrap_or("?"),
        );
    }
    out
}

pub fn render_stats(index: &IndexDescription, stats: &IndexStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "index          : {}", index.name);
    let _ = writeln!(out, "host           : {}", index.host);
    let _ = writeln!(
        out,
        "dimension      : {}",
        stats
            .dimension
            .or(index.dimension)
            .map(|d| d.to_string())
            .unwrap_or_else(|| "?".into())
    );
    let _ = writeln!(out, "total vectors  : {}", stats.total_vector_count);
    let _ = writeln!(out, "fullness       : {:.4}", stats.index_fullness);

    let mut namespaces: Vec<_> = stats.namespaces.iter().collect();
    namespaces.sort_by(|a, b| a.0.cmp(b.0));
    for (name, summary) in namespaces {
        let name = if name.is_empty() { "(default)" } else { name.as_str() };
        let _ = writeln!(out, "  namespace {:<12} {} vectors", name, summary.vector_count);
    }
    out
}

pub fn render_schema(schema: &SchemaMapping) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "schema '{}' (lower-case filter values: {})",
        schema.name, schema.lowercase_filter_values
    );
    for f in schema.fields() {
        let _ = writeln!(out, "  {:<9} <- {:<12} shown as '{}'", f.attribute, f.key, f.label);
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
