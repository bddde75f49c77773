//! # Review Ledger
//!
//! Append-only audit trail of review decisions, keyed by resource id. The
//! ledger has no update or delete operation; deleting a resource leaves its
//! history in place.
//!
//! Entries are written through the persistence collaborator's guarded write
//! so that the status change and the append commit together. The ledger's
//! job is to draft the next entry: its sequence number and a review time
//! that never precedes the previous entry's.

use std::sync::Arc;

use campus_core::{Phone, ResourceId, Timestamp};
use campus_state::{monotonic_after, ResourceStatus, ReviewDecision, ReviewRecord};

use crate::persistence::{Persistence, PersistenceError};

/// Read and draft access to review history.
#[derive(Clone)]
pub struct ReviewLedger {
    store: Arc<dyn Persistence>,
}

impl std::fmt::Debug for ReviewLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReviewLedger").finish_non_exhaustive()
    }
}

/// Inputs for the next ledger entry.
#[derive(Debug, Clone)]
pub struct DecisionDraft {
    /// The reviewed resource.
    pub resource_id: ResourceId,
    /// Approve or reject.
    pub decision: ReviewDecision,
    /// The deciding admin.
    pub reviewer_phone: Phone,
    /// Normalized comment.
    pub comment: Option<String>,
    /// Status after the decision.
    pub to_status: ResourceStatus,
}

impl ReviewLedger {
    /// Wrap a persistence backend.
    pub fn new(store: Arc<dyn Persistence>) -> Self {
        Self { store }
    }

    /// Full ordered history of `id`, oldest first.
    pub async fn history(&self, id: &ResourceId) -> Result<Vec<ReviewRecord>, PersistenceError> {
        self.store.review_history(id).await
    }

    /// Sequence number and review time for a new decision on `id` made at
    /// `now`.
    pub async fn next_slot(
        &self,
        id: &ResourceId,
        now: Timestamp,
    ) -> Result<(u32, Timestamp), PersistenceError> {
        let history = self.store.review_history(id).await?;
        let last = history.last().map(|r| r.reviewed_at);
        let sequence = u32::try_from(history.len())
            .map_err(|_| PersistenceError::Corrupt(format!("review history of {id} overflows")))?
            + 1;
        Ok((sequence, monotonic_after(last, now)))
    }

    /// Build the entry for `draft` at the given sequence and time.
    pub fn entry(draft: DecisionDraft, sequence: u32, reviewed_at: Timestamp) -> ReviewRecord {
        ReviewRecord {
            resource_id: draft.resource_id,
            sequence,
            decision: draft.decision,
            reviewer_phone: draft.reviewer_phone,
            comment: draft.comment,
            reviewed_at,
            from_status: ResourceStatus::Pending,
            to_status: draft.to_status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryPersistence;
    use campus_state::{Resource, ResourceFields, WorkflowPolicy};

    fn ts(secs: i64) -> Timestamp {
        Timestamp::from_unix_seconds(secs).unwrap()
    }

    #[tokio::test]
    async fn next_slot_is_monotonic_and_sequenced() {
        let store = Arc::new(MemoryPersistence::new());
        let ledger = ReviewLedger::new(store.clone());
        let id = ResourceId::new("R1").unwrap();
        let admin = Phone::new("13900000000").unwrap();

        assert_eq!(ledger.next_slot(&id, ts(50)).await.unwrap(), (1, ts(50)));

        let mut r = Resource::new_draft(
            id.clone(),
            Phone::new("13800000001").unwrap(),
            ResourceFields {
                resource_name: "R1".into(),
                ..Default::default()
            },
            ts(1),
        )
        .unwrap();
        store.insert_resource(&r).await.unwrap();
        let original = r.clone();
        r.submit_for_review(&WorkflowPolicy::default(), ts(2)).unwrap();
        let submitted = r.clone();
        store
            .update_with_guard(&original, &submitted, None)
            .await
            .unwrap();
        r.apply_review(ReviewDecision::Reject, admin.clone(), None, ts(100))
            .unwrap();
        let record = ReviewLedger::entry(
            DecisionDraft {
                resource_id: id.clone(),
                decision: ReviewDecision::Reject,
                reviewer_phone: admin,
                comment: None,
                to_status: ResourceStatus::Rejected,
            },
            1,
            ts(100),
        );
        store
            .update_with_guard(&submitted, &r, Some(&record))
            .await
            .unwrap();

        // A clock reading earlier than the last entry is lifted.
        assert_eq!(ledger.next_slot(&id, ts(90)).await.unwrap(), (2, ts(100)));
        assert_eq!(ledger.history(&id).await.unwrap(), vec![record]);
    }
}
