//! ArcGIS feature layer client
//!
//! Talks to the `query` and `applyEdits` operations of a feature layer over
//! the REST API.
//!
//! # Examples
//!
//! ```no_run
//! use ocgis_store::{FeatureLayerClient, StoreConfig};
//!
//! let config = StoreConfig {
//!     layer_url: "https://gis.example.com/arcgis/rest/services/Tickets/FeatureServer/0".into(),
//!     ..Default::default()
//! };
//! let client = FeatureLayerClient::new(config).unwrap();
//!
//! // The async methods are used from async code; the `FeatureStore` impl
//! // blocks and is meant for worker threads.
//! ```

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::esri::{
    check_service_error, feature_json, sql_quote, ticket_literal, ApplyEditsResponse,
    CountResponse, QueryResponse,
};
use ocgis_domain::traits::FeatureStore;
use ocgis_domain::{ChangeSet, EditFailure, RemoteMatch, RemoteTicket, SubmitResult, TicketStatus};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Feature store backed by an ArcGIS feature layer
pub struct FeatureLayerClient {
    config: StoreConfig,
    token: Option<String>,
    client: reqwest::Client,
}

impl FeatureLayerClient {
    /// Create a client; the token falls back to `OCGIS_ARCGIS_TOKEN`
    pub fn new(config: StoreConfig) -> Result<Self, StoreError> {
        config.validate().map_err(StoreError::Config)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StoreError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            token: config.resolve_token(),
            config,
            client,
        })
    }

    /// Connection settings
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn url(&self, operation: &str) -> String {
        format!("{}/{}", self.config.layer_url.trim_end_matches('/'), operation)
    }

    fn with_common(&self, mut params: Vec<(String, String)>) -> Vec<(String, String)> {
        params.push(("f".to_string(), "json".to_string()));
        if let Some(token) = &self.token {
            params.push(("token".to_string(), token.clone()));
        }
        params
    }

    /// POST a form to the layer, retrying with exponential backoff
    async fn post(&self, operation: &str, params: Vec<(String, String)>) -> Result<Value, StoreError> {
        let url = self.url(operation);
        let params = self.with_common(params);

        let mut attempts = 0;
        let mut last_error = None;

        while attempts < self.config.max_retries {
            match self.client.post(&url).form(&params).send().await {
                Ok(response) if response.status().is_success() => {
                    let body: Value = response.json().await?;
                    check_service_error(&body)?;
                    return Ok(body);
                }
                Ok(response) => {
                    let status = response.status();
                    let text = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    last_error = Some(StoreError::Communication(format!("HTTP {}: {}", status, text)));
                    if status.is_client_error() {
                        break;
                    }
                }
                Err(e) => last_error = Some(StoreError::from(e)),
            }

            attempts += 1;
            if attempts < self.config.max_retries {
                let delay = Duration::from_secs(2u64.pow(attempts - 1));
                warn!(operation, attempt = attempts, "Request failed, retrying in {:?}", delay);
                tokio::time::sleep(delay).await;
            }
        }

        Err(last_error
            .unwrap_or_else(|| StoreError::Communication("Max retries exceeded".to_string())))
    }

    fn ticket_where(&self, ticket_number: &str) -> Result<String, StoreError> {
        let literal = ticket_literal(ticket_number, self.config.numeric_ticket_field)?;
        Ok(format!("{} = {}", self.config.ticket_field, literal))
    }

    /// Number of features matching a where clause
    pub async fn count(&self, where_clause: &str) -> Result<u64, StoreError> {
        let body = self
            .post(
                "query",
                vec![
                    ("where".to_string(), where_clause.to_string()),
                    ("returnCountOnly".to_string(), "true".to_string()),
                ],
            )
            .await?;
        Ok(serde_json::from_value::<CountResponse>(body)?.count)
    }

    /// (ticket number, object id) of every feature matching a where clause
    pub async fn query_tickets(&self, where_clause: &str) -> Result<Vec<RemoteTicket>, StoreError> {
        let out_fields = format!("{},{}", self.config.object_id_field, self.config.ticket_field);
        let mut tickets = Vec::new();
        let mut offset = 0usize;

        loop {
            let body = self
                .post(
                    "query",
                    vec![
                        ("where".to_string(), where_clause.to_string()),
                        ("outFields".to_string(), out_fields.clone()),
                        ("returnGeometry".to_string(), "false".to_string()),
                        ("orderByFields".to_string(), self.config.object_id_field.clone()),
                        ("resultOffset".to_string(), offset.to_string()),
                        ("resultRecordCount".to_string(), self.config.page_size.to_string()),
                    ],
                )
                .await?;
            let page: QueryResponse = serde_json::from_value(body)?;
            let received = page.features.len();

            tickets.extend(page.features.iter().filter_map(|f| {
                Some(RemoteTicket {
                    ticket_number: f.string(&self.config.ticket_field)?,
                    object_id: f.int(&self.config.object_id_field),
                })
            }));

            if !page.exceeded_transfer_limit || received == 0 {
                break;
            }
            offset += received;
        }

        Ok(tickets)
    }

    /// Whether a ticket exists, with its object id
    pub async fn lookup_async(&self, ticket_number: &str) -> Result<RemoteMatch, StoreError> {
        let where_clause = self.ticket_where(ticket_number)?;
        if self.count(&where_clause).await? == 0 {
            return Ok(RemoteMatch::missing());
        }

        let ids = self.query_tickets(&where_clause).await?;
        if ids.len() > 1 {
            warn!(ticket = ticket_number, features = ids.len(), "Ticket matches several features");
        }
        Ok(RemoteMatch::found(ids.first().and_then(|t| t.object_id)))
    }

    /// Existence of many tickets in one `IN (...)` query
    pub async fn bulk_lookup_async(
        &self,
        ticket_numbers: &[String],
    ) -> Result<HashMap<String, RemoteMatch>, StoreError> {
        if ticket_numbers.is_empty() {
            return Ok(HashMap::new());
        }
        let list = ticket_numbers
            .iter()
            .map(|t| ticket_literal(t, self.config.numeric_ticket_field))
            .collect::<Result<Vec<_>, _>>()?
            .join(",");
        let where_clause = format!("{} IN ({})", self.config.ticket_field, list);

        let mut found = HashMap::new();
        for ticket in self.query_tickets(&where_clause).await? {
            found
                .entry(ticket.ticket_number)
                .or_insert(RemoteMatch::found(ticket.object_id));
        }
        debug!(asked = ticket_numbers.len(), found = found.len(), "Bulk lookup");
        Ok(found)
    }

    /// Tickets the layer marks OPEN
    pub async fn query_open_async(&self) -> Result<Vec<RemoteTicket>, StoreError> {
        let where_clause = format!(
            "{} = {}",
            self.config.status_field,
            sql_quote(TicketStatus::Open.as_str())
        );
        self.query_tickets(&where_clause).await
    }

    /// Send adds, updates and deletes in one `applyEdits` call
    pub async fn submit_async(&self, changes: &ChangeSet) -> Result<SubmitResult, StoreError> {
        let mut result = SubmitResult::default();

        let adds: Vec<Value> = changes
            .adds
            .iter()
            .map(|r| feature_json(r, None, &self.config))
            .collect();

        // Features can only be addressed by object id
        let mut update_tickets = Vec::new();
        let mut updates = Vec::new();
        for update in &changes.updates {
            match update.object_id {
                Some(id) => {
                    update_tickets.push(update.record.ticket_number().to_string());
                    updates.push(feature_json(&update.record, Some(id), &self.config));
                }
                None => result.rejected.push(EditFailure {
                    ticket_number: Some(update.record.ticket_number().to_string()),
                    object_id: None,
                    reason: "update without object id".to_string(),
                }),
            }
        }
        let mut delete_tickets = Vec::new();
        let mut delete_ids = Vec::new();
        for delete in &changes.deletes {
            match delete.object_id {
                Some(id) => {
                    delete_tickets.push(delete.ticket_number.clone());
                    delete_ids.push(id.to_string());
                }
                None => result.rejected.push(EditFailure {
                    ticket_number: Some(delete.ticket_number.clone()),
                    object_id: None,
                    reason: "delete without object id".to_string(),
                }),
            }
        }

        if adds.is_empty() && updates.is_empty() && delete_ids.is_empty() {
            return Ok(result);
        }

        let mut params = Vec::new();
        if !adds.is_empty() {
            params.push(("adds".to_string(), Value::Array(adds).to_string()));
        }
        if !updates.is_empty() {
            params.push(("updates".to_string(), Value::Array(updates).to_string()));
        }
        if !delete_ids.is_empty() {
            params.push(("deletes".to_string(), delete_ids.join(",")));
        }

        let body = self.post("applyEdits", params).await?;
        let response: ApplyEditsResponse = serde_json::from_value(body)?;

        let add_tickets: Vec<String> = changes
            .adds
            .iter()
            .map(|r| r.ticket_number().to_string())
            .collect();
        tally(&response.add_results, &add_tickets, &mut result.added, &mut result.rejected);
        tally(&response.update_results, &update_tickets, &mut result.updated, &mut result.rejected);
        tally(&response.delete_results, &delete_tickets, &mut result.deleted, &mut result.rejected);

        Ok(result)
    }

    /// Run a future to completion from synchronous code
    fn block_on<F: Future>(&self, future: F) -> Result<F::Output, StoreError> {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => Ok(handle.block_on(future)),
            Err(_) => tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map(|rt| rt.block_on(future))
                .map_err(|e| StoreError::Communication(format!("Failed to start runtime: {}", e))),
        }
    }
}

/// Results come back in request order
fn tally(
    results: &[crate::esri::EditResult],
    tickets: &[String],
    applied: &mut usize,
    rejected: &mut Vec<EditFailure>,
) {
    for (idx, edit) in results.iter().enumerate() {
        if edit.success {
            *applied += 1;
        } else {
            rejected.push(edit.failure(tickets.get(idx).cloned()));
        }
    }
}

/// Blocking adapter; call from worker threads (e.g. `spawn_blocking`),
/// never from an async task.
impl FeatureStore for FeatureLayerClient {
    type Error = StoreError;

    fn lookup(&self, ticket_number: &str) -> Result<RemoteMatch, Self::Error> {
        self.block_on(self.lookup_async(ticket_number))?
    }

    fn bulk_lookup(
        &self,
        ticket_numbers: &[String],
    ) -> Option<Result<HashMap<String, RemoteMatch>, Self::Error>> {
        if !self.config.bulk_lookup {
            return None;
        }
        Some(
            self.block_on(self.bulk_lookup_async(ticket_numbers))
                .and_then(|r| r),
        )
    }

    fn query_open(&self) -> Result<Vec<RemoteTicket>, Self::Error> {
        self.block_on(self.query_open_async())?
    }

    fn submit(&self, changes: &ChangeSet) -> Result<SubmitResult, Self::Error> {
        self.block_on(self.submit_async(changes))?
    }
}
