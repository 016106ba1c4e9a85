//! In-memory feature store
//!
//! Deterministic store for tests and dry runs. Features live in a shared map
//! keyed by ticket number; clones share the same state.

use crate::error::StoreError;
use ocgis_domain::traits::FeatureStore;
use ocgis_domain::{
    ChangeSet, EditFailure, RemoteMatch, RemoteTicket, SubmitResult, TicketRecord, TicketStatus,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

/// One stored feature
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFeature {
    /// Object id assigned by the store
    pub object_id: i64,

    /// Overall status at the time of the last write
    pub status: TicketStatus,

    /// Last record written, if the feature was written through `submit`
    pub record: Option<TicketRecord>,
}

#[derive(Debug, Default)]
struct State {
    features: BTreeMap<String, StoredFeature>,
    next_object_id: i64,
    failing_lookups: HashSet<String>,
    fail_submit: bool,
    lookup_calls: usize,
    bulk_calls: usize,
    submissions: Vec<ChangeSet>,
}

/// Feature store held in memory
///
/// # Examples
///
/// ```
/// use ocgis_domain::traits::FeatureStore;
/// use ocgis_domain::TicketStatus;
/// use ocgis_store::MemoryFeatureStore;
///
/// let store = MemoryFeatureStore::new();
/// store.insert("A1", TicketStatus::Open);
///
/// assert!(store.lookup("A1").unwrap().exists);
/// assert!(!store.lookup("B2").unwrap().exists);
/// assert_eq!(store.query_open().unwrap().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct MemoryFeatureStore {
    state: Arc<Mutex<State>>,
    bulk: bool,
}

impl MemoryFeatureStore {
    /// Create an empty store without bulk lookups
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                next_object_id: 1,
                ..Default::default()
            })),
            bulk: false,
        }
    }

    /// Answer `bulk_lookup` instead of returning `None`
    pub fn with_bulk_lookup(mut self) -> Self {
        self.bulk = true;
        self
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // A panic while holding the lock leaves the map consistent
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Seed a feature, returning its object id
    pub fn insert(&self, ticket_number: &str, status: TicketStatus) -> i64 {
        let mut state = self.state();
        let object_id = state.next_object_id;
        state.next_object_id += 1;
        state.features.insert(
            ticket_number.to_string(),
            StoredFeature {
                object_id,
                status,
                record: None,
            },
        );
        object_id
    }

    /// Make lookups of this ticket fail (single and bulk)
    pub fn fail_lookup(&self, ticket_number: &str) {
        self.state().failing_lookups.insert(ticket_number.to_string());
    }

    /// Make every submission fail
    pub fn fail_submit(&self, fail: bool) {
        self.state().fail_submit = fail;
    }

    /// Feature for a ticket number
    pub fn get(&self, ticket_number: &str) -> Option<StoredFeature> {
        self.state().features.get(ticket_number).cloned()
    }

    /// Number of stored features
    pub fn len(&self) -> usize {
        self.state().features.len()
    }

    /// Whether the store holds no features
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of single lookups served
    pub fn lookup_calls(&self) -> usize {
        self.state().lookup_calls
    }

    /// Number of bulk lookups served
    pub fn bulk_calls(&self) -> usize {
        self.state().bulk_calls
    }

    /// Every change set received, in order
    pub fn submissions(&self) -> Vec<ChangeSet> {
        self.state().submissions.clone()
    }
}

impl Default for MemoryFeatureStore {
    fn default() -> Self {
        Self::new()
    }
}

fn remote_match(state: &State, ticket_number: &str) -> RemoteMatch {
    state
        .features
        .get(ticket_number)
        .map(|f| RemoteMatch::found(Some(f.object_id)))
        .unwrap_or_else(RemoteMatch::missing)
}

fn record_status(record: &TicketRecord) -> TicketStatus {
    record.status().unwrap_or(TicketStatus::Open)
}

impl FeatureStore for MemoryFeatureStore {
    type Error = StoreError;

    fn lookup(&self, ticket_number: &str) -> Result<RemoteMatch, Self::Error> {
        let mut state = self.state();
        state.lookup_calls += 1;
        if state.failing_lookups.contains(ticket_number) {
            return Err(StoreError::Unavailable(format!("lookup of {}", ticket_number)));
        }
        Ok(remote_match(&state, ticket_number))
    }

    fn bulk_lookup(
        &self,
        ticket_numbers: &[String],
    ) -> Option<Result<HashMap<String, RemoteMatch>, Self::Error>> {
        if !self.bulk {
            return None;
        }
        let mut state = self.state();
        state.bulk_calls += 1;
        if let Some(failing) = ticket_numbers
            .iter()
            .find(|t| state.failing_lookups.contains(*t))
        {
            return Some(Err(StoreError::Unavailable(format!(
                "bulk lookup including {}",
                failing
            ))));
        }
        Some(Ok(ticket_numbers
            .iter()
            .filter(|t| state.features.contains_key(*t))
            .map(|t| (t.clone(), remote_match(&state, t)))
            .collect()))
    }

    fn query_open(&self) -> Result<Vec<RemoteTicket>, Self::Error> {
        Ok(self
            .state()
            .features
            .iter()
            .filter(|(_, f)| f.status == TicketStatus::Open)
            .map(|(ticket_number, f)| RemoteTicket {
                ticket_number: ticket_number.clone(),
                object_id: Some(f.object_id),
            })
            .collect())
    }

    fn submit(&self, changes: &ChangeSet) -> Result<SubmitResult, Self::Error> {
        let mut state = self.state();
        if state.fail_submit {
            return Err(StoreError::Unavailable("submission refused".to_string()));
        }
        state.submissions.push(changes.clone());

        let mut result = SubmitResult::default();

        for record in &changes.adds {
            let ticket_number = record.ticket_number().to_string();
            if state.features.contains_key(&ticket_number) {
                result.rejected.push(EditFailure {
                    ticket_number: Some(ticket_number),
                    object_id: None,
                    reason: "ticket already exists".to_string(),
                });
                continue;
            }
            let object_id = state.next_object_id;
            state.next_object_id += 1;
            state.features.insert(
                ticket_number,
                StoredFeature {
                    object_id,
                    status: record_status(record),
                    record: Some(record.clone()),
                },
            );
            result.added += 1;
        }

        for update in &changes.updates {
            let ticket_number = update.record.ticket_number();
            match state.features.get_mut(ticket_number) {
                Some(feature) if update.object_id.is_none_or(|id| id == feature.object_id) => {
                    feature.status = record_status(&update.record);
                    feature.record = Some(update.record.clone());
                    result.updated += 1;
                }
                _ => result.rejected.push(EditFailure {
                    ticket_number: Some(ticket_number.to_string()),
                    object_id: update.object_id,
                    reason: "no matching feature".to_string(),
                }),
            }
        }

        for delete in &changes.deletes {
            let matches = state
                .features
                .get(&delete.ticket_number)
                .is_some_and(|f| delete.object_id.is_none_or(|id| id == f.object_id));
            if matches {
                state.features.remove(&delete.ticket_number);
                result.deleted += 1;
            } else {
                result.rejected.push(EditFailure {
                    ticket_number: Some(delete.ticket_number.clone()),
                    object_id: delete.object_id,
                    reason: "no matching feature".to_string(),
                });
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocgis_domain::{Geometry, SpatialReference, TicketUpdate};

    fn record(ticket: &str, status: &str) -> TicketRecord {
        let attributes = [("ticketNumber", ticket), ("status", status)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        TicketRecord::new(attributes, Geometry::empty(SpatialReference::WEB_MERCATOR)).unwrap()
    }

    #[test]
    fn test_lookup_reports_object_id() {
        let store = MemoryFeatureStore::new();
        let id = store.insert("A1", TicketStatus::Open);

        assert_eq!(store.lookup("A1").unwrap(), RemoteMatch::found(Some(id)));
        assert_eq!(store.lookup("Z9").unwrap(), RemoteMatch::missing());
        assert_eq!(store.lookup_calls(), 2);
    }

    #[test]
    fn test_injected_lookup_failure() {
        let store = MemoryFeatureStore::new().with_bulk_lookup();
        store.fail_lookup("B2");

        assert!(store.lookup("B2").is_err());
        let bulk = store.bulk_lookup(&["A1".to_string(), "B2".to_string()]);
        assert!(matches!(bulk, Some(Err(StoreError::Unavailable(_)))));
    }

    #[test]
    fn test_bulk_lists_only_existing() {
        let plain = MemoryFeatureStore::new();
        assert!(plain.bulk_lookup(&["A1".to_string()]).is_none());

        let store = MemoryFeatureStore::new().with_bulk_lookup();
        store.insert("A1", TicketStatus::Closed);
        let found = store
            .bulk_lookup(&["A1".to_string(), "B2".to_string()])
            .unwrap()
            .unwrap();

        assert_eq!(found.len(), 1);
        assert!(found["A1"].exists);
        assert_eq!(store.bulk_calls(), 1);
    }

    #[test]
    fn test_submit_applies_edits() {
        let store = MemoryFeatureStore::new();
        let a1 = store.insert("A1", TicketStatus::Open);
        let c3 = store.insert("C3", TicketStatus::Open);

        let changes = ChangeSet {
            adds: vec![record("B2", "OPEN")],
            updates: vec![TicketUpdate {
                record: record("A1", "CLOSED"),
                object_id: Some(a1),
            }],
            deletes: vec![RemoteTicket {
                ticket_number: "C3".to_string(),
                object_id: Some(c3),
            }],
        };
        let result = store.submit(&changes).unwrap();

        assert_eq!((result.added, result.updated, result.deleted), (1, 1, 1));
        assert!(result.fully_applied());
        assert_eq!(store.get("A1").unwrap().status, TicketStatus::Closed);
        assert!(store.get("C3").is_none());
        assert_eq!(store.query_open().unwrap().len(), 1);
        assert_eq!(store.submissions().len(), 1);
    }

    #[test]
    fn test_submit_rejects_conflicts() {
        let store = MemoryFeatureStore::new();
        store.insert("A1", TicketStatus::Open);

        let changes = ChangeSet {
            adds: vec![record("A1", "OPEN")],
            updates: vec![TicketUpdate {
                record: record("Z9", "OPEN"),
                object_id: None,
            }],
            deletes: Vec::new(),
        };
        let result = store.submit(&changes).unwrap();
        assert_eq!(result.rejected.len(), 2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_failing_submit() {
        let store = MemoryFeatureStore::new();
        store.fail_submit(true);
        assert!(store.submit(&ChangeSet::default()).is_err());
        assert!(store.submissions().is_empty());
    }

    #[test]
    fn test_clones_share_state() {
        let store = MemoryFeatureStore::new();
        let clone = store.clone();
        clone.insert("A1", TicketStatus::Open);
        assert_eq!(store.len(), 1);
    }
}
