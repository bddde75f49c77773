//! # Persistence Collaborator
//!
//! The [`Persistence`] trait is the only way the lifecycle manager reads or
//! writes resources and review records. Two implementations exist:
//!
//! - [`MemoryPersistence`]: the default, used when `DATABASE_URL` is unset
//!   and in tests.
//! - [`crate::db::PgPersistence`]: PostgreSQL via SQLx.
//!
//! ## Guarded writes
//!
//! Every state change goes through [`Persistence::update_with_guard`]. The
//! write is applied only if the stored resource still equals the snapshot
//! the caller evaluated its guard against, so a field edit committed in
//! between is never overwritten. When the write carries a review record,
//! the status change and the ledger append commit together or not at all.
//!
//! Review history outlives its resource, so an id with retained history is
//! retired: inserting it again fails with [`PersistenceError::Retired`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use thiserror::Error;

use campus_core::{Phone, ResourceId};
use campus_state::{Resource, ResourceStatus, ReviewRecord};

/// Errors surfaced by a persistence backend.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// A resource with this id is already stored.
    #[error("resource {0} already exists")]
    Duplicate(ResourceId),

    /// The id belonged to a deleted resource whose review history is kept.
    #[error("resource id {0} is retired")]
    Retired(ResourceId),

    /// The backend cannot be reached.
    #[error("persistence backend unavailable: {0}")]
    Unavailable(String),

    /// A stored row could not be turned back into a domain value.
    #[error("corrupt stored record: {0}")]
    Corrupt(String),

    /// Any other backend failure.
    #[error("persistence backend error: {0}")]
    Backend(String),
}

/// Result of a guarded write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOutcome {
    /// The guard held and the write (plus any review append) committed.
    Applied,
    /// The stored resource changed since the snapshot was taken; nothing
    /// was written. Carries the status now stored.
    Stale(ResourceStatus),
    /// The resource no longer exists; nothing was written.
    Missing,
}

/// Storage for resources and their review ledger.
#[async_trait]
pub trait Persistence: Send + Sync {
    /// Insert a new resource. Fails with [`PersistenceError::Duplicate`]
    /// rather than overwriting, and with [`PersistenceError::Retired`] if
    /// review history exists for the id.
    async fn insert_resource(&self, resource: &Resource) -> Result<(), PersistenceError>;

    /// Fetch a resource by id.
    async fn get_resource(&self, id: &ResourceId) -> Result<Option<Resource>, PersistenceError>;

    /// Replace the stored resource with `next` if it still equals
    /// `expected`. When `review` is present it is appended to the ledger in
    /// the same atomic step.
    async fn update_with_guard(
        &self,
        expected: &Resource,
        next: &Resource,
        review: Option<&ReviewRecord>,
    ) -> Result<GuardOutcome, PersistenceError>;

    /// Remove a resource. Returns `false` if it was absent. Review records
    /// are kept.
    async fn delete_resource(&self, id: &ResourceId) -> Result<bool, PersistenceError>;

    /// Resources owned by `publisher`, newest first (ties by id).
    async fn list_by_publisher(
        &self,
        publisher: &Phone,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Resource>, PersistenceError>;

    /// Number of resources owned by `publisher`.
    async fn count_by_publisher(&self, publisher: &Phone) -> Result<u64, PersistenceError>;

    /// Resources in `status`, oldest first (ties by id).
    async fn list_by_status(
        &self,
        status: ResourceStatus,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Resource>, PersistenceError>;

    /// Number of resources in `status`.
    async fn count_by_status(&self, status: ResourceStatus) -> Result<u64, PersistenceError>;

    /// Full review history for `id`, oldest first.
    async fn review_history(&self, id: &ResourceId)
        -> Result<Vec<ReviewRecord>, PersistenceError>;

    /// Cheap liveness check of the backend, used by the readiness probe.
    async fn ping(&self) -> Result<(), PersistenceError> {
        Ok(())
    }
}

// ── In-memory backend ───────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Tables {
    resources: HashMap<ResourceId, Resource>,
    reviews: HashMap<ResourceId, Vec<ReviewRecord>>,
}

/// Thread-safe, cloneable in-memory backend.
///
/// Resources and reviews sit behind a single `parking_lot::RwLock`, so a
/// guarded write and its ledger append happen under one write lock. The lock
/// is never held across an `.await`.
#[derive(Debug, Clone, Default)]
pub struct MemoryPersistence {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryPersistence {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn page(mut items: Vec<Resource>, offset: u64, limit: u64) -> Vec<Resource> {
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        if offset >= items.len() {
            return Vec::new();
        }
        items.drain(..offset);
        items.truncate(limit);
        items
    }
}

#[async_trait]
impl Persistence for MemoryPersistence {
    async fn insert_resource(&self, resource: &Resource) -> Result<(), PersistenceError> {
        let mut tables = self.tables.write();
        if tables.resources.contains_key(resource.id()) {
            return Err(PersistenceError::Duplicate(resource.id().clone()));
        }
        if tables.reviews.contains_key(resource.id()) {
            return Err(PersistenceError::Retired(resource.id().clone()));
        }
        tables
            .resources
            .insert(resource.id().clone(), resource.clone());
        Ok(())
    }

    async fn get_resource(&self, id: &ResourceId) -> Result<Option<Resource>, PersistenceError> {
        Ok(self.tables.read().resources.get(id).cloned())
    }

    async fn update_with_guard(
        &self,
        expected: &Resource,
        next: &Resource,
        review: Option<&ReviewRecord>,
    ) -> Result<GuardOutcome, PersistenceError> {
        let mut guard = self.tables.write();
        let tables = &mut *guard;
        let Some(stored) = tables.resources.get_mut(next.id()) else {
            return Ok(GuardOutcome::Missing);
        };
        if *stored != *expected {
            return Ok(GuardOutcome::Stale(stored.status()));
        }
        *stored = next.clone();
        if let Some(record) = review {
            tables
                .reviews
                .entry(record.resource_id.clone())
                .or_default()
                .push(record.clone());
        }
        Ok(GuardOutcome::Applied)
    }

    async fn delete_resource(&self, id: &ResourceId) -> Result<bool, PersistenceError> {
        Ok(self.tables.write().resources.remove(id).is_some())
    }

    async fn list_by_publisher(
        &self,
        publisher: &Phone,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Resource>, PersistenceError> {
        let mut mine: Vec<Resource> = self
            .tables
            .read()
            .resources
            .values()
            .filter(|r| r.is_owned_by(publisher))
            .cloned()
            .collect();
        mine.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| a.id().cmp(b.id()))
        });
        Ok(Self::page(mine, offset, limit))
    }

    async fn count_by_publisher(&self, publisher: &Phone) -> Result<u64, PersistenceError> {
        let n = self
            .tables
            .read()
            .resources
            .values()
            .filter(|r| r.is_owned_by(publisher))
            .count();
        Ok(n as u64)
    }

    async fn list_by_status(
        &self,
        status: ResourceStatus,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Resource>, PersistenceError> {
        let mut matching: Vec<Resource> = self
            .tables
            .read()
            .resources
            .values()
            .filter(|r| r.status() == status)
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id().cmp(b.id()))
        });
        Ok(Self::page(matching, offset, limit))
    }

    async fn count_by_status(&self, status: ResourceStatus) -> Result<u64, PersistenceError> {
        let n = self
            .tables
            .read()
            .resources
            .values()
            .filter(|r| r.status() == status)
            .count();
        Ok(n as u64)
    }

    async fn review_history(
        &self,
        id: &ResourceId,
    ) -> Result<Vec<ReviewRecord>, PersistenceError> {
        Ok(self
            .tables
            .read()
            .reviews
            .get(id)
            .cloned()
            .unwrap_or_default())
    }
}
