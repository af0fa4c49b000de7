// Winefind — format.rs
// Projects raw match metadata onto the fixed display attribute set.
// Author: d65v <https://github.com/d65v>

use serde::Serialize;
use serde_json::Value;

use crate::schema::{Attribute, SchemaMapping};
use crate::{Match, Result, WineFindError};

/// One labelled attribute of a displayed wine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayField {
    pub attribute: Attribute,
    pub label: String,
    pub value: String,
}

/// Every attribute the schema maps, each holding either the stored value or
/// the attribute's sentinel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DisplayRecord {
    fields: Vec<DisplayField>,
}

impl DisplayRecord {
    pub fn fields(&self) -> &[DisplayField] {
        &self.fields
    }

    pub fn get(&self, attribute: Attribute) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.attribute == attribute)
            .map(|f| f.value.as_str())
    }

    /// Heading for the record; the wine name or its sentinel.
    pub fn title(&self) -> &str {
        self.get(Attribute::Name)
            .unwrap_or_else(|| Attribute::Name.sentinel())
    }
}

/// Pure projection of `metadata` through `schema`.
///
/// Missing keys, `null` values and blank strings fall back to the sentinel.
/// A `null` document is treated as a record without metadata.
///
/// # Errors
/// `MalformedMetadata` if `metadata` is neither an object nor `null`.
pub fn format(metadata: &Value, schema: &SchemaMapping) -> Result<DisplayRecord> {
    let map = match metadata {
        Value::Object(map) => Some(map),
        Value::Null => None,
        other => return Err(WineFindError::MalformedMetadata(json_kind(other).to_string())),
    };

    let fields = schema
        .fields()
        .iter()
        .map(|mapping| DisplayField {
            attribute: mapping.attribute,
            label: mapping.label.clone(),
            value: map
                .and_then(|m| m.get(&mapping.key))
                .and_then(render_value)
                .unwrap_or_else(|| mapping.attribute.sentinel().to_string()),
        })
        .collect();

    Ok(DisplayRecord { fields })
}

/// [`format`] applied to a match, absent metadata included.
pub fn format_match(m: &Match, schema: &SchemaMapping) -> Result<DisplayRecord> {
    format(m.metadata.as_ref().unwrap_or(&Value::Null), schema)
}

fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        // blank means absent; otherwise shown as stored
        Value::String(s) => (!s.trim().is_empty()).then(|| s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        // list metadata (e.g. several grape varieties)
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(render_value).collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        Value::Object(_) => Some(value.to_string()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
