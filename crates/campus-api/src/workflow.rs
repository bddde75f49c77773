//! # Resource Lifecycle Manager
//!
//! Orchestrates every resource operation against the authorization gate,
//! the state machine in `campus-state`, the persistence collaborator, and
//! the review ledger.
//!
//! ## Check order
//!
//! ```text
//! role capability ─▶ load (NotFound) ─▶ ownership (Forbidden)
//!                 ─▶ state guard (InvalidState) ─▶ guarded write
//! ```
//!
//! Authentication happens before any of this, in the auth middleware. A
//! guarded write that loses a race reports `InvalidState`, the same as a
//! request that arrived after the winner had committed.

use std::sync::Arc;

use thiserror::Error;

use campus_core::{ResourceId, Timestamp, ValidationError};
use campus_state::{
    Resource, ResourceError, ResourceFields, ResourceStatus, ResourceUpdate, ReviewDecision,
    ReviewRecord, WorkflowPolicy,
};

use crate::auth::{AccessPolicy, Action, AuthError, Session};
use crate::ledger::{DecisionDraft, ReviewLedger};
use crate::persistence::{GuardOutcome, Persistence, PersistenceError};

// ── Errors ──────────────────────────────────────────────────────────────────

/// Outcome kinds of a failed lifecycle operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    /// Malformed input.
    #[error("{0}")]
    Validation(String),
    /// No valid session.
    #[error("{0}")]
    Unauthenticated(String),
    /// The session may not perform the action.
    #[error("{0}")]
    Forbidden(String),
    /// The resource does not exist.
    #[error("{0}")]
    NotFound(String),
    /// The resource id is already taken.
    #[error("{0}")]
    Conflict(String),
    /// The resource's status does not admit the action.
    #[error("{0}")]
    InvalidState(String),
    /// An unexpected failure; nothing was committed.
    #[error("{0}")]
    Internal(String),
    /// The persistence backend is unreachable; nothing was committed.
    #[error("{0}")]
    Unavailable(String),
}

impl From<ValidationError> for WorkflowError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<AuthError> for WorkflowError {
    fn from(err: AuthError) -> Self {
        if err.is_unauthenticated() {
            Self::Unauthenticated(err.to_string())
        } else {
            Self::Forbidden(err.to_string())
        }
    }
}

impl From<ResourceError> for WorkflowError {
    fn from(err: ResourceError) -> Self {
        match err {
            ResourceError::Validation(v) => Self::Validation(v.to_string()),
            e @ (ResourceError::InvalidTransition { .. } | ResourceError::TerminalState { .. }) => {
                Self::InvalidState(e.to_string())
            }
            e @ ResourceError::InconsistentReview { .. } => Self::Internal(e.to_string()),
        }
    }
}

impl From<PersistenceError> for WorkflowError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::Duplicate(id) => Self::Conflict(format!("resource {id} already exists")),
            PersistenceError::Retired(id) => Self::Conflict(format!(
                "resource id {id} belonged to a deleted resource and cannot be reused"
            )),
            PersistenceError::Unavailable(m) => {
                tracing::error!(error = %m, "persistence backend unavailable");
                Self::Unavailable("storage is temporarily unavailable".to_string())
            }
            e @ (PersistenceError::Corrupt(_) | PersistenceError::Backend(_)) => {
                Self::Internal(e.to_string())
            }
        }
    }
}

fn not_found(id: &str) -> WorkflowError {
    WorkflowError::NotFound(format!("resource {id} not found"))
}

// ── Clock ───────────────────────────────────────────────────────────────────

/// Source of server time.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

// ── Paging ──────────────────────────────────────────────────────────────────

/// Page-size defaults and limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingConfig {
    /// Used when the caller gives no page size.
    pub default_page_size: u32,
    /// Larger requested sizes are clamped to this.
    pub max_page_size: u32,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            max_page_size: 100,
        }
    }
}

impl PagingConfig {
    /// Resolve a request into a concrete `(page, page_size)`.
    ///
    /// Page defaults to 1. A page size of 0 is rejected.
    pub fn resolve(&self, req: PageRequest) -> Result<(u32, u32), WorkflowError> {
        let page = req.page.unwrap_or(1);
        let size = match req.page_size {
            Some(0) => {
                return Err(ValidationError::OutOfRange {
                    field: "page_size",
                    reason: "must be at least 1".to_string(),
                }
                .into())
            }
            Some(n) => n.min(self.max_page_size),
            None => self.default_page_size,
        };
        Ok((page, size))
    }
}

/// Requested page; `None` fields take defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: Option<u32>,
    /// Items per page.
    pub page_size: Option<u32>,
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// 1-based page number as requested.
    pub page: u32,
    /// Effective page size after clamping.
    pub page_size: u32,
    /// Total items across all pages.
    pub total: u64,
}

impl<T> Page<T> {
    fn empty(page: u32, page_size: u32, total: u64) -> Self {
        Self {
            items: Vec::new(),
            page,
            page_size,
            total,
        }
    }

    /// Whether a later page holds more items.
    pub fn has_more(&self) -> bool {
        self.page >= 1 && u64::from(self.page) * u64::from(self.page_size) < self.total
    }

    /// Transform each item, keeping paging metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            total: self.total,
        }
    }
}

fn offset_of(page: u32, page_size: u32) -> u64 {
    u64::from(page.saturating_sub(1)) * u64::from(page_size)
}

// ── Lifecycle manager ───────────────────────────────────────────────────────

/// Input to [`ResourceLifecycle::create`].
#[derive(Debug, Clone, Default)]
pub struct NewResource {
    /// Caller-supplied id; generated when absent or blank.
    pub resource_id: Option<String>,
    /// Descriptive fields.
    pub fields: ResourceFields,
}

/// The resource lifecycle manager.
///
/// Cheap to clone; all state lives behind the persistence collaborator.
#[derive(Clone)]
pub struct ResourceLifecycle {
    store: Arc<dyn Persistence>,
    ledger: ReviewLedger,
    clock: Arc<dyn Clock>,
    policy: WorkflowPolicy,
    access: AccessPolicy,
    paging: PagingConfig,
}

impl std::fmt::Debug for ResourceLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceLifecycle")
            .field("policy", &self.policy)
            .field("access", &self.access)
            .field("paging", &self.paging)
            .finish_non_exhaustive()
    }
}

impl ResourceLifecycle {
    /// Build a manager over `store` with default policies and the system clock.
    pub fn new(store: Arc<dyn Persistence>) -> Self {
        Self {
            ledger: ReviewLedger::new(Arc::clone(&store)),
            store,
            clock: Arc::new(SystemClock),
            policy: WorkflowPolicy::default(),
            access: AccessPolicy::default(),
            paging: PagingConfig::default(),
        }
    }

    /// Replace the workflow policy.
    pub fn with_policy(mut self, policy: WorkflowPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the access policy.
    pub fn with_access_policy(mut self, access: AccessPolicy) -> Self {
        self.access = access;
        self
    }

    /// Replace the paging limits.
    pub fn with_paging(mut self, paging: PagingConfig) -> Self {
        self.paging = paging;
        self
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The review ledger.
    pub fn ledger(&self) -> &ReviewLedger {
        &self.ledger
    }

    /// The persistence backend.
    pub fn store(&self) -> &Arc<dyn Persistence> {
        &self.store
    }

    /// Check the caller's role for `action` without touching storage.
    pub fn authorize(&self, session: &Session, action: Action) -> Result<(), WorkflowError> {
        Ok(session.require_role(action, &self.access)?)
    }

    /// Create a resource in `draft` owned by the caller.
    pub async fn create(
        &self,
        session: &Session,
        new: NewResource,
    ) -> Result<Resource, WorkflowError> {
        session.require_role(Action::Create, &self.access)?;
        let id = match new.resource_id.as_deref().map(str::trim) {
            None | Some("") => ResourceId::generate(),
            Some(raw) => ResourceId::new(raw)?,
        };
        let resource =
            Resource::new_draft(id, session.identity.clone(), new.fields, self.clock.now())?;
        self.store.insert_resource(&resource).await?;
        tracing::info!(
            resource_id = %resource.id(),
            caller = %session.identity,
            action = Action::Create.as_str(),
            "resource created"
        );
        Ok(resource)
    }

    /// Read one resource. Published resources are visible to every
    /// session; others only to the owner or an admin.
    pub async fn get(&self, session: &Session, id: &str) -> Result<Resource, WorkflowError> {
        session.require_role(Action::Read, &self.access)?;
        let resource = self.load(id).await?;
        if resource.status() != ResourceStatus::Published {
            session.require_access(Action::Read, resource.publisher_phone(), &self.access)?;
        }
        Ok(resource)
    }

    /// Submit for review: `draft → pending`, or `rejected → pending` when
    /// resubmission is enabled.
    pub async fn submit_for_review(
        &self,
        session: &Session,
        id: &str,
    ) -> Result<Resource, WorkflowError> {
        session.require_role(Action::SubmitReview, &self.access)?;
        let current = self.load(id).await?;
        session.require_access(Action::SubmitReview, current.publisher_phone(), &self.access)?;

        let mut next = current.clone();
        next.submit_for_review(&self.policy, self.clock.now())?;
        self.commit(session, Action::SubmitReview, &current, &next, None)
            .await?;
        Ok(next)
    }

    /// Record an admin decision on a pending resource and append it to the
    /// review ledger.
    pub async fn review(
        &self,
        session: &Session,
        id: &str,
        decision: ReviewDecision,
        comment: Option<String>,
    ) -> Result<(Resource, ReviewRecord), WorkflowError> {
        session.require_role(Action::Review, &self.access)?;
        let current = self.load(id).await?;

        let (sequence, reviewed_at) = self
            .ledger
            .next_slot(current.id(), self.clock.now())
            .await?;
        let mut next = current.clone();
        next.apply_review(decision, session.identity.clone(), comment, reviewed_at)?;

        let record = ReviewLedger::entry(
            DecisionDraft {
                resource_id: current.id().clone(),
                decision,
                reviewer_phone: session.identity.clone(),
                comment: next.review().and_then(|s| s.review_comment.clone()),
                to_status: next.status(),
            },
            sequence,
            reviewed_at,
        );
        self.commit(session, Action::Review, &current, &next, Some(&record))
            .await?;
        Ok((next, record))
    }

    /// Edit descriptive fields of a `draft` or `rejected` resource.
    pub async fn update(
        &self,
        session: &Session,
        id: &str,
        update: ResourceUpdate,
    ) -> Result<Resource, WorkflowError> {
        session.require_role(Action::Update, &self.access)?;
        if update.is_empty() {
            return Err(WorkflowError::Validation(
                "at least one of resource_name, description, category must be given".to_string(),
            ));
        }
        let current = self.load(id).await?;
        session.require_access(Action::Update, current.publisher_phone(), &self.access)?;

        let mut next = current.clone();
        next.apply_update(update, self.clock.now())?;
        self.commit(session, Action::Update, &current, &next, None)
            .await?;
        Ok(next)
    }

    /// Archive a non-terminal resource.
    pub async fn archive(&self, session: &Session, id: &str) -> Result<Resource, WorkflowError> {
        session.require_role(Action::Archive, &self.access)?;
        let current = self.load(id).await?;
        session.require_access(Action::Archive, current.publisher_phone(), &self.access)?;

        let mut next = current.clone();
        next.archive(self.clock.now())?;
        self.commit(session, Action::Archive, &current, &next, None)
            .await?;
        Ok(next)
    }

    /// Remove a resource. Its review history is kept.
    pub async fn delete(&self, session: &Session, id: &str) -> Result<(), WorkflowError> {
        session.require_role(Action::Delete, &self.access)?;
        let current = self.load(id).await?;
        session.require_access(Action::Delete, current.publisher_phone(), &self.access)?;

        if !self.store.delete_resource(current.id()).await? {
            return Err(not_found(id));
        }
        tracing::info!(
            resource_id = %current.id(),
            caller = %session.identity,
            action = Action::Delete.as_str(),
            from = %current.status(),
            "resource deleted"
        );
        Ok(())
    }

    /// The review history of a resource, oldest first.
    ///
    /// Owner or admin while the resource exists. After deletion the retained
    /// history is readable by admins only.
    pub async fn history(
        &self,
        session: &Session,
        id: &str,
    ) -> Result<Vec<ReviewRecord>, WorkflowError> {
        session.require_role(Action::ReadHistory, &self.access)?;
        let rid = ResourceId::new(id).map_err(|_| not_found(id))?;
        match self.store.get_resource(&rid).await? {
            Some(resource) => {
                session.require_access(
                    Action::ReadHistory,
                    resource.publisher_phone(),
                    &self.access,
                )?;
                Ok(self.ledger.history(&rid).await?)
            }
            None if session.is_admin() => {
                let history = self.ledger.history(&rid).await?;
                if history.is_empty() {
                    return Err(not_found(id));
                }
                Ok(history)
            }
            None => Err(not_found(id)),
        }
    }

    /// The caller's own resources, newest first.
    ///
    /// Page 0 and pages past the end are empty, not errors.
    pub async fn list_mine(
        &self,
        session: &Session,
        req: PageRequest,
    ) -> Result<Page<Resource>, WorkflowError> {
        session.require_role(Action::ListMine, &self.access)?;
        let (page, page_size) = self.paging.resolve(req)?;
        let total = self.store.count_by_publisher(&session.identity).await?;
        let offset = offset_of(page, page_size);
        if page == 0 || offset >= total {
            return Ok(Page::empty(page, page_size, total));
        }
        let items = self
            .store
            .list_by_publisher(&session.identity, offset, u64::from(page_size))
            .await?;
        Ok(Page {
            items,
            page,
            page_size,
            total,
        })
    }

    /// The moderation queue, oldest submission first. Admin only.
    pub async fn list_pending(
        &self,
        session: &Session,
        req: PageRequest,
    ) -> Result<Page<Resource>, WorkflowError> {
        session.require_role(Action::ListPending, &self.access)?;
        let (page, page_size) = self.paging.resolve(req)?;
        let total = self.store.count_by_status(ResourceStatus::Pending).await?;
        let offset = offset_of(page, page_size);
        if page == 0 || offset >= total {
            return Ok(Page::empty(page, page_size, total));
        }
        let items = self
            .store
            .list_by_status(ResourceStatus::Pending, offset, u64::from(page_size))
            .await?;
        Ok(Page {
            items,
            page,
            page_size,
            total,
        })
    }

    /// A lazy cursor over the caller's resources, one page per call.
    pub fn mine_pages(
        &self,
        session: &Session,
        page_size: Option<u32>,
    ) -> Result<MinePages, WorkflowError> {
        session.require_role(Action::ListMine, &self.access)?;
        let (_, page_size) = self.paging.resolve(PageRequest {
            page: None,
            page_size,
        })?;
        Ok(MinePages {
            lifecycle: self.clone(),
            session: session.clone(),
            page_size,
            next: 1,
            done: false,
        })
    }

    async fn load(&self, id: &str) -> Result<Resource, WorkflowError> {
        let rid = ResourceId::new(id).map_err(|_| not_found(id))?;
        self.store
            .get_resource(&rid)
            .await?
            .ok_or_else(|| not_found(id))
    }

    async fn commit(
        &self,
        session: &Session,
        action: Action,
        current: &Resource,
        next: &Resource,
        review: Option<&ReviewRecord>,
    ) -> Result<(), WorkflowError> {
        match self
            .store
            .update_with_guard(current, next, review)
            .await?
        {
            GuardOutcome::Applied => {
                tracing::info!(
                    resource_id = %next.id(),
                    caller = %session.identity,
                    action = action.as_str(),
                    from = %current.status(),
                    to = %next.status(),
                    "resource transitioned"
                );
                Ok(())
            }
            GuardOutcome::Stale(found) => {
                tracing::info!(
                    resource_id = %next.id(),
                    caller = %session.identity,
                    action = action.as_str(),
                    expected = %current.status(),
                    found = %found,
                    "guarded write lost a race"
                );
                if found == current.status() {
                    Err(WorkflowError::InvalidState(format!(
                        "cannot {action}: resource was modified concurrently, reload and retry"
                    )))
                } else {
                    Err(WorkflowError::InvalidState(format!(
                        "cannot {action} a resource in state {found}"
                    )))
                }
            }
            GuardOutcome::Missing => Err(not_found(next.id().as_str())),
        }
    }
}

// ── Page cursor ─────────────────────────────────────────────────────────────

/// Finite, restartable cursor over [`ResourceLifecycle::list_mine`].
///
/// Each [`MinePages::next_page`] call issues one list query. The cursor
/// stops at the first empty page or once the reported total is covered.
#[derive(Debug, Clone)]
pub struct MinePages {
    lifecycle: ResourceLifecycle,
    session: Session,
    page_size: u32,
    next: u32,
    done: bool,
}

impl MinePages {
    /// Fetch the next page, or `None` once exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Page<Resource>>, WorkflowError> {
        if self.done {
            return Ok(None);
        }
        let page = self
            .lifecycle
            .list_mine(
                &self.session,
                PageRequest {
                    page: Some(self.next),
                    page_size: Some(self.page_size),
                },
            )
            .await?;
        if page.items.is_empty() {
            self.done = true;
            return Ok(None);
        }
        self.next = self.next.saturating_add(1);
        if !page.has_more() {
            self.done = true;
        }
        Ok(Some(page))
    }

    /// Start again from page 1.
    pub fn restart(&mut self) {
        self.next = 1;
        self.done = false;
    }

    /// Effective page size.
    pub fn page_size(&self) -> u32 {
        self.page_size
    }
}
