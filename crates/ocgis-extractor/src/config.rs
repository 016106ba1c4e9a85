//! Configuration for the Extractor

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use ocgis_domain::ticket::TICKET_NUMBER;

/// Logical field name → extraction rule
pub type SelectorMap = BTreeMap<String, FieldRule>;

/// How to read one field from a notice
///
/// Either a bare CSS selector, or a table with extra options:
///
/// ```toml
/// [selectors]
/// ticketNumber = "td.ticket-number"
/// county = { selector = "td.county", strip_prefix = "County:" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldRule {
    /// Text of the first element matching the selector
    Selector(String),

    /// Selector with an attribute to read or a label prefix to drop
    Detailed {
        /// CSS selector
        selector: String,
        /// Read this attribute instead of the element text
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attribute: Option<String>,
        /// Remove this leading label from the value
        #[serde(default, skip_serializing_if = "Option::is_none")]
        strip_prefix: Option<String>,
    },
}

impl FieldRule {
    /// The selector expression
    pub fn selector(&self) -> &str {
        match self {
            FieldRule::Selector(s) => s,
            FieldRule::Detailed { selector, .. } => selector,
        }
    }

    /// Attribute to read, if any
    pub fn attribute(&self) -> Option<&str> {
        match self {
            FieldRule::Selector(_) => None,
            FieldRule::Detailed { attribute, .. } => attribute.as_deref(),
        }
    }

    /// Label prefix to strip, if any
    pub fn strip_prefix(&self) -> Option<&str> {
        match self {
            FieldRule::Selector(_) => None,
            FieldRule::Detailed { strip_prefix, .. } => strip_prefix.as_deref(),
        }
    }

    /// An empty selector means the field is intentionally unmapped
    pub fn is_unmapped(&self) -> bool {
        self.selector().trim().is_empty()
    }
}

impl From<&str> for FieldRule {
    fn from(selector: &str) -> Self {
        FieldRule::Selector(selector.to_string())
    }
}

/// Order of the two numbers in a coordinate block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateOrder {
    /// "(lat, lon)", as printed on notices
    #[default]
    LatLon,
    /// "(lon, lat)" / "(x, y)"
    LonLat,
}

/// What to do when no table carries the required status headers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MissingStatusTablePolicy {
    /// Fail the document with `StatusTableMissing`
    #[default]
    Reject,
    /// Build the record as OPEN and attach a diagnostic for review
    FlagOpen,
}

/// Locating and reading the per-district status table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTableConfig {
    /// Headers the status table must carry (order-independent, exact match)
    pub required_headers: Vec<String>,

    /// Header of the district column
    pub district_column: String,

    /// Header of the company column
    pub company_column: String,

    /// Header of the status column
    pub status_column: String,
}

impl Default for StatusTableConfig {
    fn default() -> Self {
        Self {
            required_headers: vec![
                "District".to_string(),
                "Company Name".to_string(),
                "Status".to_string(),
            ],
            district_column: "District".to_string(),
            company_column: "Company Name".to_string(),
            status_column: "Status".to_string(),
        }
    }
}

/// Locating polygon rings in the notice layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeometryConfig {
    /// Selector for layout blocks; ring labels and coordinates are both blocks
    pub block_selector: String,

    /// Axis order of coordinate blocks
    #[serde(default)]
    pub coordinate_order: CoordinateOrder,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            block_selector: "div, p".to_string(),
            coordinate_order: CoordinateOrder::LatLon,
        }
    }
}

/// Configuration for the Extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Districts whose status is copied onto the record (case-insensitive)
    #[serde(default)]
    pub tracked_districts: Vec<String>,

    /// Statuses that count as closed; anything else keeps the ticket open
    pub closed_statuses: Vec<String>,

    /// Policy for notices without a status table
    #[serde(default)]
    pub missing_status_table: MissingStatusTablePolicy,

    /// Spatial reference of coordinates printed on notices
    pub source_wkid: u32,

    /// Spatial reference of the feature store
    pub target_wkid: u32,

    /// Field extraction rules
    #[serde(default = "default_selectors")]
    pub selectors: SelectorMap,

    /// Status table layout
    #[serde(default)]
    pub status_table: StatusTableConfig,

    /// Ring layout
    #[serde(default)]
    pub geometry: GeometryConfig,

    /// Proj definitions by WKID, overriding the built-in ones
    #[serde(default)]
    pub proj_overrides: BTreeMap<String, String>,
}

impl ExtractorConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        match self.selectors.get(TICKET_NUMBER) {
            Some(rule) if !rule.is_unmapped() => {}
            _ => return Err(format!("selectors must map '{}'", TICKET_NUMBER)),
        }
        if self.closed_statuses.is_empty() {
            return Err("closed_statuses must not be empty".to_string());
        }
        let table = &self.status_table;
        for column in [&table.district_column, &table.status_column] {
            if !table.required_headers.contains(column) {
                return Err(format!(
                    "status_table.required_headers must include '{}'",
                    column
                ));
            }
        }
        if self.geometry.block_selector.trim().is_empty() {
            return Err("geometry.block_selector must not be empty".to_string());
        }
        if self.source_wkid == 0 || self.target_wkid == 0 {
            return Err("source_wkid and target_wkid must be set".to_string());
        }
        for key in self.proj_overrides.keys() {
            if key.parse::<u32>().is_err() {
                return Err(format!("proj_overrides key '{}' is not a WKID", key));
            }
        }
        Ok(())
    }

    /// Tracked districts, lower-cased
    pub fn tracked_set(&self) -> HashSet<String> {
        self.tracked_districts
            .iter()
            .map(|d| d.trim().to_lowercase())
            .collect()
    }

    /// Closed statuses as a set (exact strings)
    pub fn closed_set(&self) -> HashSet<String> {
        self.closed_statuses.iter().cloned().collect()
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

impl Default for ExtractorConfig {
    /// Iowa One Call notices: lat/lon on WGS84, store in Web Mercator
    fn default() -> Self {
        Self {
            tracked_districts: Vec::new(),
            closed_statuses: vec![
                "Clear/No Conflict".to_string(),
                "Marked".to_string(),
                "Closed, Marked".to_string(),
                "Closed, Clear".to_string(),
            ],
            missing_status_table: MissingStatusTablePolicy::Reject,
            source_wkid: 4326,
            target_wkid: 3857,
            selectors: default_selectors(),
            status_table: StatusTableConfig::default(),
            geometry: GeometryConfig::default(),
            proj_overrides: BTreeMap::new(),
        }
    }
}

fn default_selectors() -> SelectorMap {
    [
        (TICKET_NUMBER, "td.ticket-number"),
        ("ticketType", "td.ticket-type"),
        ("workType", "td.work-type"),
        ("excavator", "td.excavator"),
        ("county", "td.county"),
        ("place", "td.place"),
        ("street", "td.street"),
        ("workDate", "td.work-date"),
        ("remarks", ""),
    ]
    .into_iter()
    .map(|(field, selector)| (field.to_string(), FieldRule::from(selector)))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ExtractorConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.selectors["remarks"].is_unmapped());
    }

    #[test]
    fn test_ticket_number_must_be_mapped() {
        let mut config = ExtractorConfig::default();
        config
            .selectors
            .insert(TICKET_NUMBER.to_string(), FieldRule::from(""));
        assert!(config.validate().is_err());

        config.selectors.remove(TICKET_NUMBER);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_required_headers_must_cover_columns() {
        let mut config = ExtractorConfig::default();
        config.status_table.required_headers = vec!["District".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_override_key() {
        let mut config = ExtractorConfig::default();
        config
            .proj_overrides
            .insert("utm".to_string(), "+proj=utm +zone=15".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tracked_set_is_lowercase() {
        let config = ExtractorConfig {
            tracked_districts: vec!["North ".to_string(), "CITY OF AMES".to_string()],
            ..Default::default()
        };
        let tracked = config.tracked_set();
        assert!(tracked.contains("north"));
        assert!(tracked.contains("city of ames"));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ExtractorConfig::default();
        let toml_str = config.to_toml().unwrap();
        let parsed = ExtractorConfig::from_toml(&toml_str).unwrap();

        assert_eq!(config, parsed);
    }

    #[test]
    fn test_detailed_rule_from_toml() {
        let toml_str = r#"
            closed_statuses = ["Marked"]
            source_wkid = 4326
            target_wkid = 102100

            [selectors]
            ticketNumber = "span.ticket"
            county = { selector = "td.county", strip_prefix = "County:" }
            mapLink = { selector = "a.map", attribute = "href" }
        "#;
        let config = ExtractorConfig::from_toml(toml_str).unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.selectors["ticketNumber"].selector(), "span.ticket");
        assert_eq!(config.selectors["county"].strip_prefix(), Some("County:"));
        assert_eq!(config.selectors["mapLink"].attribute(), Some("href"));
        assert_eq!(config.geometry.coordinate_order, CoordinateOrder::LatLon);
    }
}
