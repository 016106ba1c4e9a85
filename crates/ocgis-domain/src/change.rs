//! Change module - what gets sent to and returned from the feature store

use crate::ticket::TicketRecord;

/// Answer to "does this ticket already exist in the store?"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteMatch {
    /// Whether a feature with the ticket number exists
    pub exists: bool,

    /// Store-internal identifier of the matching feature, when known
    pub object_id: Option<i64>,
}

impl RemoteMatch {
    /// The ticket is not in the store
    pub fn missing() -> Self {
        Self {
            exists: false,
            object_id: None,
        }
    }

    /// The ticket is in the store, optionally with its object id
    pub fn found(object_id: Option<i64>) -> Self {
        Self {
            exists: true,
            object_id,
        }
    }
}

/// Identity of a feature already held by the store
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteTicket {
    /// Ticket number of the feature
    pub ticket_number: String,

    /// Store-internal identifier
    pub object_id: Option<i64>,
}

/// A record that replaces an existing feature
#[derive(Debug, Clone, PartialEq)]
pub struct TicketUpdate {
    /// Freshly built record
    pub record: TicketRecord,

    /// Identifier of the feature being replaced, when the store reported one
    pub object_id: Option<i64>,
}

/// Edits bound for the feature store in one submission
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    /// Tickets new to the store
    pub adds: Vec<TicketRecord>,

    /// Tickets already in the store
    pub updates: Vec<TicketUpdate>,

    /// Store features to remove
    pub deletes: Vec<RemoteTicket>,
}

impl ChangeSet {
    /// Whether there is nothing to submit
    pub fn is_empty(&self) -> bool {
        self.adds.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }

    /// Total number of edits
    pub fn len(&self) -> usize {
        self.adds.len() + self.updates.len() + self.deletes.len()
    }
}

/// One edit the store refused
#[derive(Debug, Clone, PartialEq)]
pub struct EditFailure {
    /// Ticket number, when the edit can be traced back to one
    pub ticket_number: Option<String>,

    /// Object id the store reported for the edit
    pub object_id: Option<i64>,

    /// Reason given by the store
    pub reason: String,
}

/// Outcome of a submission
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmitResult {
    /// Features added
    pub added: usize,

    /// Features updated
    pub updated: usize,

    /// Features deleted
    pub deleted: usize,

    /// Edits the store rejected individually
    pub rejected: Vec<EditFailure>,
}

impl SubmitResult {
    /// Whether every edit was applied
    pub fn fully_applied(&self) -> bool {
        self.rejected.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_change_set() {
        let changes = ChangeSet::default();
        assert!(changes.is_empty());
        assert_eq!(changes.len(), 0);
    }

    #[test]
    fn test_change_set_len_counts_deletes() {
        let changes = ChangeSet {
            deletes: vec![RemoteTicket {
                ticket_number: "A".to_string(),
                object_id: Some(7),
            }],
            ..Default::default()
        };
        assert!(!changes.is_empty());
        assert_eq!(changes.len(), 1);
    }

    #[test]
    fn test_remote_match_constructors() {
        assert!(!RemoteMatch::missing().exists);
        assert_eq!(RemoteMatch::found(Some(3)).object_id, Some(3));
    }
}
