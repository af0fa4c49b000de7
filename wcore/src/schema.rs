// Winefind — schema.rs
// Metadata naming-convention tables: which stored key feeds which attribute,
// and the label each attribute is displayed under.
// Author: d65v <https://github.com/d65v>

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Result, WineFindError};

// ── Attributes ────────────────────────────────────────────────────────────────

/// Displayed wine attributes, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Name,
    Producer,
    Type,
    Color,
    Region,
    Country,
    Price,
    Points,
}

impl Attribute {
    pub const ALL: [Attribute; 8] = [
        Attribute::Name,
        Attribute::Producer,
        Attribute::Type,
        Attribute::Color,
        Attribute::Region,
        Attribute::Country,
        Attribute::Price,
        Attribute::Points,
    ];

    /// Every table must map these; price and points are optional.
    pub fn is_required(self) -> bool {
        !matches!(self, Attribute::Price | Attribute::Points)
    }

    /// Attributes a metadata filter may constrain.
    pub fn is_filterable(self) -> bool {
        matches!(
            self,
            Attribute::Name
                | Attribute::Region
                | Attribute::Country
                | Attribute::Type
                | Attribute::Color
        )
    }

    /// Placeholder shown when the metadata lacks this attribute.
    pub fn sentinel(self) -> &'static str {
        match self {
            Attribute::Price | Attribute::Points => "N/A",
            _ => "Unknown",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Attribute::Name => "name",
            Attribute::Producer => "producer",
            Attribute::Type => "type",
            Attribute::Color => "color",
            Attribute::Region => "region",
            Attribute::Country => "country",
            Attribute::Price => "price",
            Attribute::Points => "points",
        }
    }

    /// Parse a user-facing attribute name (`wine_name`, `winery`, `variety` accepted).
    pub fn parse(s: &str) -> Option<Attribute> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" | "wine_name" => Some(Attribute::Name),
            "producer" | "winery" => Some(Attribute::Producer),
            "type" => Some(Attribute::Type),
            "color" | "colour" | "variety" => Some(Attribute::Color),
            "region" => Some(Attribute::Region),
            "country" => Some(Attribute::Country),
            "price" => Some(Attribute::Price),
            "points" => Some(Attribute::Points),
            _ => None,
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Mapping Table ─────────────────────────────────────────────────────────────

/// One row of a naming table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub attribute: Attribute,
    /// Metadata key as stored in the index
    pub key: String,
    /// Label shown next to the value
    pub label: String,
}

impl FieldMapping {
    pub fn new(attribute: Attribute, key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            attribute,
            key: key.into(),
            label: label.into(),
        }
    }
}

/// A complete naming convention. Drives both the remote filter keys and the
/// formatter's projection, so a re-populated index only needs a new table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaMapping {
    pub name: String,
    /// Lower-case filter values before sending them (the upload script stored
    /// lower-cased values under the semantic convention).
    #[serde(default)]
    pub lowercase_filter_values: bool,
    fields: Vec<FieldMapping>,
}

impl SchemaMapping {
    /// Build and validate a table. Rows are kept in display order.
    ///
    /// # Errors
    /// `ConfigError` if a required attribute is unmapped, an attribute is
    /// mapped twice, or a key is blank.
    pub fn new(
        name: impl Into<String>,
        lowercase_filter_values: bool,
        mut fields: Vec<FieldMapping>,
    ) -> Result<Self> {
        fields.sort_by_key(|f| f.attribute);
        let schema = Self {
            name: name.into(),
            lowercase_filter_values,
            fields,
        };
        schema.validate()?;
        Ok(schema)
    }

    /// Lower-case semantic keys written by the metadata upload script.
    pub fn semantic() -> Self {
        Self::table(
            "semantic",
            true,
            &[
                (Attribute::Name, "wine_name", "Name"),
                (Attribute::Producer, "producer", "Producer"),
                (Attribute::Type, "type", "Type"),
                (Attribute::Color, "color", "Color"),
                (Attribute::Region, "region", "Region"),
                (Attribute::Country, "country", "Country"),
            ],
        )
    }

    /// Upper-case keys carried over from the source review dataset.
    pub fn source() -> Self {
        Self::table(
            "source",
            false,
            &[
                (Attribute::Name, "NAME", "Name"),
                (Attribute::Producer, "WINERY", "Winery"),
                (Attribute::Type, "TYPE", "Type"),
                (Attribute::Color, "VARIETY", "Variety"),
                (Attribute::Region, "REGION", "Region"),
                (Attribute::Country, "COUNTRY", "Country"),
                (Attribute::Price, "PRICE", "Price"),
                (Attribute::Points, "POINTS", "Points"),
            ],
        )
    }

    fn table(name: &str, lowercase: bool, rows: &[(Attribute, &str, &str)]) -> Self {
        Self {
            name: name.to_string(),
            lowercase_filter_values: lowercase,
            fields: rows
                .iter()
                .map(|(attribute, key, label)| FieldMapping::new(*attribute, *key, *label))
                .collect(),
        }
    }

    /// Look up a built-in table by name.
    pub fn builtin(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "semantic" | "lower" => Ok(Self::semantic()),
            "source" | "upper" => Ok(Self::source()),
            other => Err(WineFindError::ConfigError(format!(
                "unknown schema '{}' (expected semantic | source, or set WINEFIND_SCHEMA_FILE)",
                other
            ))),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: SchemaMapping = serde_json::from_str(json)
            .map_err(|e| WineFindError::ConfigError(format!("invalid schema table: {}", e)))?;
        Self::new(raw.name, raw.lowercase_filter_values, raw.fields)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| {
            WineFindError::ConfigError(format!(
                "cannot read schema file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json_str(&json)
    }

    /// Rows in display order.
    pub fn fields(&self) -> &[FieldMapping] {
        &self.fields
    }

    pub fn mapping(&self, attribute: Attribute) -> Option<&FieldMapping> {
        self.fields.iter().find(|f| f.attribute == attribute)
    }

    pub fn key(&self, attribute: Attribute) -> Option<&str> {
        self.mapping(attribute).map(|f| f.key.as_str())
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.attribute) {
                return Err(WineFindError::ConfigError(format!(
                    "schema '{}' maps attribute '{}' more than once",
                    self.name, field.attribute
                )));
            }
            if field.key.trim().is_empty() {
                return Err(WineFindError::ConfigError(format!(
                    "schema '{}' has a blank key for attribute '{}'",
                    self.name, field.attribute
                )));
            }
        }

        if let Some(missing) = Attribute::ALL
            .iter()
            .find(|a| a.is_required() && !seen.contains(*a))
        {
            return Err(WineFindError::ConfigError(format!(
                "schema '{}' does not map required attribute '{}'",
                self.name, missing
            )));
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_are_valid() {
        for schema in [SchemaMapping::semantic(), SchemaMapping::source()] {
            let rebuilt = SchemaMapping::new(
                schema.name.clone(),
                schema.lowercase_filter_values,
                schema.fields().to_vec(),
            )
            .unwrap();
            assert_eq!(rebuilt, schema);
        }
    }

    #[test]
    fn test_semantic_keys() {
        let s = SchemaMapping::semantic();
        assert_eq!(s.key(Attribute::Name), Some("wine_name"));
        assert_eq!(s.key(Attribute::Price), None);
        assert!(s.lowercase_filter_values);
    }

    #[test]
    fn test_source_keys_and_labels() {
        let s = SchemaMapping::source();
        assert_eq!(s.key(Attribute::Producer), Some("WINERY"));
        assert_eq!(s.mapping(Attribute::Color).unwrap().label, "Variety");
        assert_eq!(s.key(Attribute::Points), Some("POINTS"));
    }

    #[test]
    fn test_builtin_lookup() {
        assert_eq!(SchemaMapping::builtin("SOURCE").unwrap(), SchemaMapping::source());
        assert!(matches!(
            SchemaMapping::builtin("mixed"),
            Err(WineFindError::ConfigError(_))
        ));
    }

    #[test]
    fn test_json_table_sorted_into_display_order() {
        let json = r#"{
            "name": "custom",
            "fields": [
                {"attribute": "country", "key": "c", "label": "Country"},
                {"attribute": "name", "key": "title", "label": "Wine"},
                {"attribute": "producer", "key": "p", "label": "Producer"},
                {"attribute": "type", "key": "t", "label": "Type"},
                {"attribute": "color", "key": "col", "label": "Color"},
                {"attribute": "region", "key": "r", "label": "Region"}
            ]
        }"#;
        let s = SchemaMapping::from_json_str(json).unwrap();
        assert!(!s.lowercase_filter_values);
        assert_eq!(s.fields()[0].attribute, Attribute::Name);
        assert_eq!(s.fields()[5].attribute, Attribute::Country);
        assert_eq!(s.key(Attribute::Name), Some("title"));
    }

    #[test]
    fn test_missing_required_attribute_rejected() {
        let err = SchemaMapping::new(
            "partial",
            false,
            vec![FieldMapping::new(Attribute::Name, "name", "Name")],
        )
        .unwrap_err();
        assert!(err.to_string().contains("producer"));
    }

    #[test]
    fn test_duplicate_attribute_rejected() {
        let mut fields = SchemaMapping::semantic().fields().to_vec();
        fields.push(FieldMapping::new(Attribute::Region, "area", "Area"));
        assert!(matches!(
            SchemaMapping::new("dup", true, fields),
            Err(WineFindError::ConfigError(_))
        ));
    }

    #[test]
    fn test_blank_key_rejected() {
        let mut fields = SchemaMapping::semantic().fields().to_vec();
        fields[0].key = "  ".into();
        assert!(SchemaMapping::new("blank", true, fields).is_err());
    }

    #[test]
    fn test_missing_schema_file() {
        let err = SchemaMapping::from_json_file("/nonexistent/winefind-schema.json").unwrap_err();
        assert!(matches!(err, WineFindError::ConfigError(_)));
    }

    #[test]
    fn test_attribute_parse_aliases() {
        assert_eq!(Attribute::parse("wine_name"), Some(Attribute::Name));
        assert_eq!(Attribute::parse("Winery"), Some(Attribute::Producer));
        assert_eq!(Attribute::parse("vintage"), None);
    }
}
