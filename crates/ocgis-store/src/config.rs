//! Feature layer connection settings

use serde::{Deserialize, Serialize};

/// Environment variable consulted when no token is configured
pub const TOKEN_ENV: &str = "OCGIS_ARCGIS_TOKEN";

/// Settings for an ArcGIS feature layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Layer URL, e.g. `https://host/arcgis/rest/services/Tickets/FeatureServer/0`
    pub layer_url: String,

    /// Layer field holding the ticket number
    pub ticket_field: String,

    /// Layer field holding the overall status
    pub status_field: String,

    /// Layer object id field
    pub object_id_field: String,

    /// Access token; falls back to `OCGIS_ARCGIS_TOKEN`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Attempts per request before giving up
    pub max_retries: u32,

    /// Use one `IN (...)` query per chunk instead of a query per ticket
    pub bulk_lookup: bool,

    /// Page size for open-ticket queries
    pub page_size: usize,

    /// The ticket field is numeric; where clauses compare it unquoted
    #[serde(default)]
    pub numeric_ticket_field: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            layer_url: String::new(),
            ticket_field: "ticketNumber".to_string(),
            status_field: "status".to_string(),
            object_id_field: "OBJECTID".to_string(),
            token: None,
            timeout_secs: 30,
            max_retries: 3,
            bulk_lookup: true,
            page_size: 1000,
            numeric_ticket_field: false,
        }
    }
}

impl StoreConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(self.layer_url.starts_with("http://") || self.layer_url.starts_with("https://")) {
            return Err(format!("layer_url '{}' is not an http(s) URL", self.layer_url));
        }
        for (name, value) in [
            ("ticket_field", &self.ticket_field),
            ("status_field", &self.status_field),
            ("object_id_field", &self.object_id_field),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{} must not be empty", name));
            }
        }
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than 0".to_string());
        }
        if self.max_retries == 0 {
            return Err("max_retries must be at least 1".to_string());
        }
        if self.page_size == 0 {
            return Err("page_size must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Configured token, or the one from the environment
    pub fn resolve_token(&self) -> Option<String> {
        self.token
            .clone()
            .filter(|t| !t.is_empty())
            .or_else(|| std::env::var(TOKEN_ENV).ok().filter(|t| !t.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> StoreConfig {
        StoreConfig {
            layer_url: "https://gis.example.com/arcgis/rest/services/Tickets/FeatureServer/0"
                .to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate() {
        assert!(config().validate().is_ok());
        assert!(StoreConfig::default().validate().is_err());

        let mut c = config();
        c.ticket_field = " ".to_string();
        assert!(c.validate().is_err());

        let mut c = config();
        c.max_retries = 0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_configured_token_wins() {
        let c = StoreConfig {
            token: Some("abc".to_string()),
            ..config()
        };
        assert_eq!(c.resolve_token().as_deref(), Some("abc"));
    }

    #[test]
    fn test_toml_defaults() {
        let c: StoreConfig = toml::from_str(
            r#"
            layer_url = "https://gis.example.com/0"
            ticket_field = "TICKET_NO"
            status_field = "STATUS"
            object_id_field = "OBJECTID"
            timeout_secs = 10
            max_retries = 2
            bulk_lookup = false
            page_size = 500
            "#,
        )
        .unwrap();
        assert_eq!(c.token, None);
        assert!(!c.bulk_lookup);
        assert!(!c.numeric_ticket_field);
        assert!(c.validate().is_ok());
    }
}
