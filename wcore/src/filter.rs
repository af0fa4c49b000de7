// Winefind — filter.rs
// Metadata query filter and its translation into the remote filter language.
// Author: d65v <https://github.com/d65v>

use std::fmt;
use std::str::FromStr;

use serde_json::{json, Map, Value};

use crate::schema::{Attribute, SchemaMapping};
use crate::{Result, WineFindError};

// ── Enumerated Inputs ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WineType {
    Red,
    White,
    Rose,
    Sparkling,
}

impl WineType {
    pub const ALL: [WineType; 4] = [
        WineType::Red,
        WineType::White,
        WineType::Rose,
        WineType::Sparkling,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WineType::Red => "Red",
            WineType::White => "White",
            WineType::Rose => "Rosé",
            WineType::Sparkling => "Sparkling",
        }
    }
}

impl fmt::Display for WineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WineType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "red" => Ok(WineType::Red),
            "white" => Ok(WineType::White),
            "rosé" | "rose" => Ok(WineType::Rose),
            "sparkling" => Ok(WineType::Sparkling),
            other => Err(format!(
                "unknown wine type '{}' (expected Red | White | Rosé | Sparkling)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WineColor {
    Red,
    White,
    Rose,
    Gold,
}

impl WineColor {
    pub const ALL: [WineColor; 4] = [
        WineColor::Red,
        WineColor::White,
        WineColor::Rose,
        WineColor::Gold,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WineColor::Red => "Red",
            WineColor::White => "White",
            WineColor::Rose => "Rosé",
            WineColor::Gold => "Gold",
        }
    }
}

impl fmt::Display for WineColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WineColor {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "red" => Ok(WineColor::Red),
            "white" => Ok(WineColor::White),
            "rosé" | "rose" => Ok(WineColor::Rose),
            "gold" => Ok(WineColor::Gold),
            other => Err(format!(
                "unknown wine color '{}' (expected Red | White | Rosé | Gold)",
                other
            )),
        }
    }
}

// ── Query Filter ──────────────────────────────────────────────────────────────

/// Exact-match criteria. Unset or blank values are omitted from the query,
/// never sent as wildcards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryFilter {
    pub name: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub kind: Option<WineType>,
    pub color: Option<WineColor>,
}

impl QueryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn with_type(mut self, kind: WineType) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_color(mut self, color: WineColor) -> Self {
        self.color = Some(color);
        self
    }

    /// Set one criterion from text input, e.g. `region=Burgundy`.
    ///
    /// # Errors
    /// Returns a message when the attribute is not filterable or an
    /// enumerated value is unknown.
    pub fn set(&mut self, attribute: Attribute, value: &str) -> std::result::Result<(), String> {
        if !attribute.is_filterable() {
            return Err(format!("cannot filter on '{}'", attribute));
        }
        let value = value.trim();
        let text = (!value.is_empty()).then(|| value.to_string());
        match attribute {
            Attribute::Name => self.name = text,
            Attribute::Region => self.region = text,
            Attribute::Country => self.country = text,
            Attribute::Type => {
                self.kind = text.as_deref().map(str::parse::<WineType>).transpose()?;
            }
            Attribute::Color => {
                self.color = text.as_deref().map(str::parse::<WineColor>).transpose()?;
            }
            Attribute::Producer | Attribute::Price | Attribute::Points => {}
        }
        Ok(())
    }

    /// Non-blank criteria in a fixed attribute order.
    pub fn conditions(&self) -> Vec<(Attribute, String)> {
        let text = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let mut out = Vec::new();
        if let Some(v) = text(&self.name) {
            out.push((Attribute::Name, v));
        }
        if let Some(v) = text(&self.region) {
            out.push((Attribute::Region, v));
        }
        if let Some(v) = text(&self.country) {
            out.push((Attribute::Country, v));
        }
        if let Some(kind) = self.kind {
            out.push((Attribute::Type, kind.as_str().to_string()));
        }
        if let Some(color) = self.color {
            out.push((Attribute::Color, color.as_str().to_string()));
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.conditions().is_empty()
    }

    /// Conjunction of `$eq` conditions keyed by the schema's metadata keys.
    ///
    /// # Errors
    /// `EmptyFilter` when no criterion is set.
    pub fn to_remote_filter(&self, schema: &SchemaMapping) -> Result<Value> {
        let conditions = self.conditions();
        if conditions.is_empty() {
            return Err(WineFindError::EmptyFilter);
        }

        let mut filter = Map::new();
        for (attribute, value) in conditions {
            let key = schema.key(attribute).ok_or_else(|| {
                WineFindError::ConfigError(format!(
                    "schema '{}' has no key for filter attribute '{}'",
                    schema.name, attribute
                ))
            })?;
            let value = if schema.lowercase_filter_values {
                value.to_lowercase()
            } else {
                value
            };
            filter.insert(key.to_string(), json!({ "$eq": value }));
        }
        Ok(Value::Object(filter))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
