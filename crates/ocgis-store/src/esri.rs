//! Esri JSON payloads for the feature service REST API

use crate::config::StoreConfig;
use crate::error::StoreError;
use ocgis_domain::ticket::{STATUS, TICKET_NUMBER};
use ocgis_domain::{EditFailure, Geometry, TicketRecord};
use serde::Deserialize;
use serde_json::{json, Map, Value};

/// Polygon geometry as Esri JSON
pub fn geometry_json(geometry: &Geometry) -> Value {
    json!({
        "rings": geometry.rings.iter().map(|r| r.to_pairs()).collect::<Vec<_>>(),
        "spatialReference": { "wkid": geometry.spatial_reference.wkid },
    })
}

/// A record as an Esri JSON feature.
///
/// Record attribute names are mapped to the layer's ticket and status field
/// names; `object_id` is set for updates.
pub fn feature_json(record: &TicketRecord, object_id: Option<i64>, config: &StoreConfig) -> Value {
    let mut attributes = Map::new();
    for (name, value) in record.attributes() {
        let field = match name.as_str() {
            TICKET_NUMBER => config.ticket_field.as_str(),
            STATUS => config.status_field.as_str(),
            other => other,
        };
        attributes.insert(field.to_string(), Value::String(value.clone()));
    }
    if let Some(id) = object_id {
        attributes.insert(config.object_id_field.clone(), json!(id));
    }

    json!({
        "attributes": attributes,
        "geometry": geometry_json(record.geometry()),
    })
}

/// Quote a string literal for a where clause
pub fn sql_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// A ticket number as a where-clause literal.
///
/// String fields get a quoted literal. Numeric fields take the number as is,
/// so anything but an integer is refused.
pub fn ticket_literal(ticket_number: &str, numeric: bool) -> Result<String, StoreError> {
    if !numeric {
        return Ok(sql_quote(ticket_number));
    }
    let trimmed = ticket_number.trim();
    trimmed
        .parse::<i64>()
        .map(|_| trimmed.to_string())
        .map_err(|_| StoreError::InvalidTicket(ticket_number.to_string()))
}

/// Error object embedded in a 200 response
#[derive(Debug, Deserialize)]
pub(crate) struct ServiceError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Fail on `{"error": {...}}` bodies
pub(crate) fn check_service_error(body: &Value) -> Result<(), StoreError> {
    match body.get("error") {
        Some(error) => {
            let error: ServiceError = serde_json::from_value(error.clone())?;
            Err(StoreError::Service {
                code: error.code,
                message: error.description.unwrap_or(error.message),
            })
        }
        None => Ok(()),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CountResponse {
    pub count: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueryResponse {
    #[serde(default)]
    pub features: Vec<QueryFeature>,
    #[serde(default, rename = "exceededTransferLimit")]
    pub exceeded_transfer_limit: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueryFeature {
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl QueryFeature {
    pub fn string(&self, field: &str) -> Option<String> {
        match self.attributes.get(field)? {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn int(&self, field: &str) -> Option<i64> {
        self.attributes.get(field)?.as_i64()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct EditResult {
    #[serde(default, rename = "objectId")]
    pub object_id: Option<i64>,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<ServiceError>,
}

impl EditResult {
    pub fn failure(&self, ticket_number: Option<String>) -> EditFailure {
        let reason = self
            .error
            .as_ref()
            .map(|e| {
                let text = e.description.clone().unwrap_or_else(|| e.message.clone());
                format!("{} (code {})", text, e.code)
            })
            .unwrap_or_else(|| "rejected without detail".to_string());
        EditFailure {
            ticket_number,
            object_id: self.object_id,
            reason,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApplyEditsResponse {
    #[serde(default, rename = "addResults")]
    pub add_results: Vec<EditResult>,
    #[serde(default, rename = "updateResults")]
    pub update_results: Vec<EditResult>,
    #[serde(default, rename = "deleteResults")]
    pub delete_results: Vec<EditResult>,
}
