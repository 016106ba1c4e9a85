//! Reconciliation of a ticket batch against the feature store
//!
//! Lookups run in parallel (bulk chunks when the store supports them, single
//! lookups otherwise), but classification is one sequential pass over the
//! batch in sequence order. That pass is the only place where duplicates are
//! resolved, so "first occurrence wins" holds no matter how lookups finish.

use crate::config::SyncConfig;
use ocgis_domain::traits::FeatureStore;
use ocgis_domain::{ChangeSet, RemoteMatch, RemoteTicket, TicketRecord, TicketUpdate};
use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Answer of one lookup; errors are kept as text
pub type LookupOutcome = Result<RemoteMatch, String>;

/// A later occurrence of a ticket number already classified in this batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Duplicate {
    /// Repeated ticket number
    pub ticket_number: String,
    /// Position of the dropped record in the batch
    pub position: usize,
}

/// A record that could not be classified because its lookup failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupFailure {
    /// Ticket number
    pub ticket_number: String,
    /// Error reported by the store
    pub reason: String,
}

/// Outcome of reconciling one batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconciliationResult {
    /// Adds, updates and deletes; disjoint by ticket number
    pub changes: ChangeSet,

    /// Dropped repeats, in batch order
    pub duplicates: Vec<Duplicate>,

    /// Records excluded because their lookup failed
    pub failures: Vec<LookupFailure>,

    /// Records not looked up before the run deadline
    pub unresolved: Vec<String>,
}

impl ReconciliationResult {
    /// Whether the deadline cut lookups short
    pub fn timed_out(&self) -> bool {
        !self.unresolved.is_empty()
    }

    /// Whether every unique record was classified
    pub fn complete(&self) -> bool {
        self.failures.is_empty() && self.unresolved.is_empty()
    }
}

/// Partition a batch using already known lookup answers.
///
/// Records are visited in batch order. A ticket number seen before is a
/// duplicate; otherwise an existing ticket becomes an update, a missing one
/// an add, and a failed lookup a [`LookupFailure`]. Tickets without an answer
/// are reported as unresolved. Deletes are never derived here.
pub fn classify(
    batch: Vec<TicketRecord>,
    lookups: &HashMap<String, LookupOutcome>,
) -> ReconciliationResult {
    let mut result = ReconciliationResult::default();
    let mut seen: HashSet<String> = HashSet::with_capacity(batch.len());

    for (position, record) in batch.into_iter().enumerate() {
        let ticket_number = record.ticket_number().to_string();
        if !seen.insert(ticket_number.clone()) {
            debug!(ticket = %ticket_number, position, "Duplicate ticket in batch, skipping");
            result.duplicates.push(Duplicate {
                ticket_number,
                position,
            });
            continue;
        }

        match lookups.get(&ticket_number) {
            Some(Ok(remote)) if remote.exists => result.changes.updates.push(TicketUpdate {
                record,
                object_id: remote.object_id,
            }),
            Some(Ok(_)) => result.changes.adds.push(record),
            Some(Err(reason)) => result.failures.push(LookupFailure {
                ticket_number,
                reason: reason.clone(),
            }),
            None => result.unresolved.push(ticket_number),
        }
    }

    result
}

/// Reconciles ticket batches against a feature store
#[derive(Debug, Clone)]
pub struct Reconciler {
    lookup_concurrency: usize,
    bulk_chunk: usize,
}

impl Reconciler {
    /// Create a reconciler; both limits are raised to at least 1
    pub fn new(lookup_concurrency: usize, bulk_chunk: usize) -> Self {
        Self {
            lookup_concurrency: lookup_concurrency.max(1),
            bulk_chunk: bulk_chunk.max(1),
        }
    }

    /// Create a reconciler from the sync configuration
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.lookup_concurrency, config.bulk_lookup_chunk)
    }

    /// Look up every unique ticket and classify the batch.
    ///
    /// Lookups not started by `deadline` are abandoned; their records come
    /// back as unresolved while everything already answered is kept.
    pub async fn reconcile<S>(
        &self,
        batch: Vec<TicketRecord>,
        store: Arc<S>,
        deadline: Option<Instant>,
    ) -> ReconciliationResult
    where
        S: FeatureStore + Send + Sync + 'static,
        S::Error: Display,
    {
        let mut seen = HashSet::new();
        let unique: Vec<String> = batch
            .iter()
            .map(|r| r.ticket_number().to_string())
            .filter(|t| seen.insert(t.clone()))
            .collect();

        let lookups = self.lookup_all(unique, store, deadline).await;
        let result = classify(batch, &lookups);

        info!(
            adds = result.changes.adds.len(),
            updates = result.changes.updates.len(),
            duplicates = result.duplicates.len(),
            lookup_failures = result.failures.len(),
            unresolved = result.unresolved.len(),
            "Reconciled batch"
        );
        result
    }

    /// Store tickets marked OPEN whose ticket numbers are not in `present`
    pub fn stale_tickets(open: &[RemoteTicket], present: &HashSet<String>) -> Vec<RemoteTicket> {
        let mut seen = HashSet::new();
        open.iter()
            .filter(|t| !present.contains(&t.ticket_number))
            .filter(|t| seen.insert(t.ticket_number.clone()))
            .cloned()
            .collect()
    }

    async fn lookup_all<S>(
        &self,
        tickets: Vec<String>,
        store: Arc<S>,
        deadline: Option<Instant>,
    ) -> HashMap<String, LookupOutcome>
    where
        S: FeatureStore + Send + Sync + 'static,
        S::Error: Display,
    {
        let mut answers = HashMap::new();
        let mut chunks: Vec<Vec<String>> = tickets
            .chunks(self.bulk_chunk)
            .map(<[String]>::to_vec)
            .collect();
        if chunks.is_empty() || deadline.is_some_and(|d| Instant::now() >= d) {
            return answers;
        }

        // The first chunk also tells whether the store has a bulk query
        let first = chunks.remove(0);
        let probe = {
            let store = Arc::clone(&store);
            let chunk = first.clone();
            let task = tokio::task::spawn_blocking(move || {
                store
                    .bulk_lookup(&chunk)
                    .map(|r| r.map_err(|e| e.to_string()))
            });
            match deadline {
                Some(d) => match tokio::time::timeout_at(d, task).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        warn!("Run deadline reached before any lookup completed");
                        return answers;
                    }
                },
                None => task.await,
            }
        };

        let jobs: Vec<Job> = match probe {
            Ok(None) => {
                debug!("Store has no bulk lookup, using single lookups");
                tickets.into_iter().map(Job::Single).collect()
            }
            Ok(Some(found)) => {
                answers.extend(bulk_answers(first, found));
                chunks.into_iter().map(Job::Bulk).collect()
            }
            Err(e) => {
                answers.extend(bulk_answers(first, Err(format!("lookup task failed: {}", e))));
                chunks.into_iter().map(Job::Bulk).collect()
            }
        };

        answers.extend(self.run_bounded(jobs, store, deadline).await);
        answers
    }

    async fn run_bounded<S>(
        &self,
        jobs: Vec<Job>,
        store: Arc<S>,
        deadline: Option<Instant>,
    ) -> Vec<(String, LookupOutcome)>
    where
        S: FeatureStore + Send + Sync + 'static,
        S::Error: Display,
    {
        let semaphore = Arc::new(Semaphore::new(self.lookup_concurrency));
        let mut set = JoinSet::new();

        for job in jobs {
            let semaphore = Arc::clone(&semaphore);
            let store = Arc::clone(&store);
            set.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return Vec::new();
                };
                if deadline.is_some_and(|d| Instant::now() >= d) {
                    return Vec::new();
                }
                let tickets = job.tickets();
                match tokio::task::spawn_blocking(move || run_job(store.as_ref(), job)).await {
                    Ok(answers) => answers,
                    Err(e) => {
                        let reason = format!("lookup task failed: {}", e);
                        tickets.into_iter().map(|t| (t, Err(reason.clone()))).collect()
                    }
                }
            });
        }

        let mut answers = Vec::new();
        loop {
            let next = match deadline {
                Some(d) => match tokio::time::timeout_at(d, set.join_next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        warn!(pending = set.len(), "Run deadline reached, abandoning lookups");
                        set.abort_all();
                        break;
                    }
                },
                None => set.join_next().await,
            };
            match next {
                Some(Ok(batch)) => answers.extend(batch),
                Some(Err(e)) if e.is_cancelled() => {}
                Some(Err(e)) => warn!(error = %e, "Lookup task panicked"),
                None => break,
            }
        }
        answers
    }
}

enum Job {
    Bulk(Vec<String>),
    Single(String),
}

impl Job {
    fn tickets(&self) -> Vec<String> {
        match self {
            Job::Bulk(chunk) => chunk.clone(),
            Job::Single(ticket) => vec![ticket.clone()],
        }
    }
}

fn run_job<S>(store: &S, job: Job) -> Vec<(String, LookupOutcome)>
where
    S: FeatureStore,
    S::Error: Display,
{
    match job {
        Job::Single(ticket) => {
            let outcome = store.lookup(&ticket).map_err(|e| e.to_string());
            vec![(ticket, outcome)]
        }
        Job::Bulk(chunk) => {
            let found = match store.bulk_lookup(&chunk) {
                Some(found) => found.map_err(|e| e.to_string()),
                None => Err("bulk lookup no longer available".to_string()),
            };
            bulk_answers(chunk, found)
        }
    }
}

/// Expand a bulk answer: tickets absent from a successful answer do not exist
fn bulk_answers(
    chunk: Vec<String>,
    found: Result<HashMap<String, RemoteMatch>, String>,
) -> Vec<(String, LookupOutcome)> {
    match found {
        Ok(found) => chunk
            .into_iter()
            .map(|t| {
                let remote = found.get(&t).copied().unwrap_or_else(RemoteMatch::missing);
                (t, Ok(remote))
            })
            .collect(),
        Err(reason) => {
            warn!(tickets = chunk.len(), reason = %reason, "Bulk lookup failed");
            chunk.into_iter().map(|t| (t, Err(reason.clone()))).collect()
        }
    }
}
