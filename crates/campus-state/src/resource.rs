//! # Resource Lifecycle State Machine
//!
//! Models a shared learning resource from its first draft through review
//! to publication, rejection, or archival.
//!
//! ## States
//!
//! ```text
//! Draft ──▶ Pending ──▶ Published
//!              │
//!              └──▶ Rejected ┄┄▶ Pending   (resubmission, policy-gated)
//!
//! Draft | Pending | Published | Rejected ──▶ Archived (terminal)
//! ```
//!
//! ## Review fields
//!
//! A resource carries a [`ReviewStamp`] exactly when its status is
//! `Published` or `Rejected`. Submitting (or resubmitting) and archiving
//! clear the stamp; the full history stays in the review ledger.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use campus_core::{Phone, ResourceId, Timestamp, ValidationError};

use crate::policy::WorkflowPolicy;
use crate::review::{ReviewDecision, ReviewStamp, COMMENT_MAX_LEN};

/// Maximum length of `resource_name` in characters.
pub const NAME_MAX_LEN: usize = 200;
/// Maximum length of `description` in characters.
pub const DESCRIPTION_MAX_LEN: usize = 5000;
/// Maximum length of `category` in characters.
pub const CATEGORY_MAX_LEN: usize = 64;

// ─── Resource Status ─────────────────────────────────────────────────

/// The moderation status of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceStatus {
    /// Being edited by its publisher; not visible to others.
    Draft,
    /// Submitted and waiting for an admin decision.
    Pending,
    /// Approved and publicly visible.
    Published,
    /// Rejected by an admin.
    Rejected,
    /// Withdrawn from circulation (terminal).
    Archived,
}

/// A state-machine edge label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    /// Owner submits for review.
    Submit,
    /// Admin approves.
    Approve,
    /// Admin rejects.
    Reject,
    /// Owner or admin archives.
    Archive,
}

impl Transition {
    /// Verb used in error messages and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submit => "submit-review",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Archive => "archive",
        }
    }
}

impl ResourceStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [ResourceStatus; 5] = [
        Self::Draft,
        Self::Pending,
        Self::Published,
        Self::Rejected,
        Self::Archived,
    ];

    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Published => "published",
            Self::Rejected => "rejected",
            Self::Archived => "archived",
        }
    }

    /// Parse a canonical name. Returns `None` for anything else.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "draft" => Some(Self::Draft),
            "pending" => Some(Self::Pending),
            "published" => Some(Self::Published),
            "rejected" => Some(Self::Rejected),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }

    /// Whether this state admits no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Archived)
    }

    /// Whether a resource in this state carries review fields.
    pub fn carries_review(&self) -> bool {
        matches!(self, Self::Published | Self::Rejected)
    }

    /// Whether the descriptive fields may be edited in this state.
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Draft | Self::Rejected)
    }

    /// The transition table.
    ///
    /// Returns the target state for `transition` from `self`, or `None` if
    /// the edge does not exist under `policy`.
    pub fn next(self, transition: Transition, policy: &WorkflowPolicy) -> Option<ResourceStatus> {
        match (self, transition) {
            (Self::Draft, Transition::Submit) => Some(Self::Pending),
            (Self::Rejected, Transition::Submit) if policy.allow_resubmit_rejected => {
                Some(Self::Pending)
            }
            (Self::Pending, Transition::Approve) => Some(Self::Published),
            (Self::Pending, Transition::Reject) => Some(Self::Rejected),
            (s, Transition::Archive) if !s.is_terminal() => Some(Self::Archived),
            _ => None,
        }
    }
}

impl std::fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors raised by resource lifecycle operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// The requested edge does not exist from the current state.
    #[error("cannot {action} a resource in state {from}")]
    InvalidTransition {
        /// Current state.
        from: ResourceStatus,
        /// Requested action.
        action: &'static str,
    },

    /// The resource is archived; nothing further is permitted.
    #[error("resource is in terminal state {state}")]
    TerminalState {
        /// The terminal state.
        state: ResourceStatus,
    },

    /// A descriptive field or comment failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Stored review fields do not agree with the stored status.
    #[error("inconsistent review fields for status {status}")]
    InconsistentReview {
        /// The stored status.
        status: ResourceStatus,
    },
}

impl ResourceError {
    /// Whether this error is a state-guard failure (as opposed to bad input).
    pub fn is_state_guard(&self) -> bool {
        matches!(
            self,
            Self::InvalidTransition { .. } | Self::TerminalState { .. }
        )
    }
}

// ─── Field sets ──────────────────────────────────────────────────────

/// Descriptive fields supplied at creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceFields {
    /// Display name; required.
    pub resource_name: String,
    /// Free-text description.
    pub description: String,
    /// Optional category tag.
    pub category: Option<String>,
}

/// Partial update of the descriptive fields. `None` leaves a field as is.
/// A blank `category` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceUpdate {
    /// New display name.
    pub resource_name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New category; blank clears.
    pub category: Option<String>,
}

impl ResourceUpdate {
    /// Whether the update changes nothing.
    pub fn is_empty(&self) -> bool {
        self.resource_name.is_none() && self.description.is_none() && self.category.is_none()
    }
}

fn normalize_category(raw: Option<&str>) -> Result<Option<String>, ValidationError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(c) => {
            ValidationError::check_len("category", c, CATEGORY_MAX_LEN)?;
            Ok(Some(c.to_string()))
        }
    }
}

// ─── Resource ────────────────────────────────────────────────────────

/// Every stored field of a resource, used to rehydrate from persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceParts {
    /// Identifier.
    pub id: ResourceId,
    /// Owner identity.
    pub publisher_phone: Phone,
    /// Display name.
    pub resource_name: String,
    /// Description.
    pub description: String,
    /// Category tag.
    pub category: Option<String>,
    /// Moderation status.
    pub status: ResourceStatus,
    /// Current review fields.
    pub review: Option<ReviewStamp>,
    /// Creation time.
    pub created_at: Timestamp,
    /// Last mutation time.
    pub updated_at: Timestamp,
}

/// A shared resource with its moderation status.
///
/// Identity fields (`id`, `publisher_phone`, `created_at`) have no setters.
/// `status` and the review fields change only through the transition
/// methods below, each of which consults [`ResourceStatus::next`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    id: ResourceId,
    publisher_phone: Phone,
    resource_name: String,
    description: String,
    category: Option<String>,
    status: ResourceStatus,
    review: Option<ReviewStamp>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl Resource {
    /// Create a new resource in `Draft`.
    pub fn new_draft(
        id: ResourceId,
        publisher_phone: Phone,
        fields: ResourceFields,
        now: Timestamp,
    ) -> Result<Self, ResourceError> {
        let resource_name =
            ValidationError::require_text("resource_name", &fields.resource_name, NAME_MAX_LEN)?;
        let description = fields.description.trim().to_string();
        ValidationError::check_len("description", &description, DESCRIPTION_MAX_LEN)?;
        let category = normalize_category(fields.category.as_deref())?;

        Ok(Self {
            id,
            publisher_phone,
            resource_name,
            description,
            category,
            status: ResourceStatus::Draft,
            review: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Rehydrate a stored resource, checking the review-field invariant.
    pub fn from_parts(parts: ResourceParts) -> Result<Self, ResourceError> {
        if parts.status.carries_review() != parts.review.is_some() {
            return Err(ResourceError::InconsistentReview {
                status: parts.status,
            });
        }
        Ok(Self {
            id: parts.id,
            publisher_phone: parts.publisher_phone,
            resource_name: parts.resource_name,
            description: parts.description,
            category: parts.category,
            status: parts.status,
            review: parts.review,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
        })
    }

    /// Decompose into stored fields.
    pub fn to_parts(&self) -> ResourceParts {
        ResourceParts {
            id: self.id.clone(),
            publisher_phone: self.publisher_phone.clone(),
            resource_name: self.resource_name.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            status: self.status,
            review: self.review.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Identifier.
    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    /// Owner identity.
    pub fn publisher_phone(&self) -> &Phone {
        &self.publisher_phone
    }

    /// Display name.
    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }

    /// Description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Category tag.
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    /// Current status.
    pub fn status(&self) -> ResourceStatus {
        self.status
    }

    /// Current review fields, present only when published or rejected.
    pub fn review(&self) -> Option<&ReviewStamp> {
        self.review.as_ref()
    }

    /// Creation time.
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Last mutation time.
    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// Whether `phone` owns this resource.
    pub fn is_owned_by(&self, phone: &Phone) -> bool {
        &self.publisher_phone == phone
    }

    /// Submit for review (DRAFT → PENDING, or REJECTED → PENDING under policy).
    pub fn submit_for_review(
        &mut self,
        policy: &WorkflowPolicy,
        now: Timestamp,
    ) -> Result<(), ResourceError> {
        let to = self.require_edge(Transition::Submit, policy)?;
        self.review = None;
        self.move_to(to, now);
        Ok(())
    }

    /// Apply an admin decision (PENDING → PUBLISHED | REJECTED).
    ///
    /// A blank comment is stored as `None`.
    pub fn apply_review(
        &mut self,
        decision: ReviewDecision,
        reviewer_phone: Phone,
        comment: Option<String>,
        reviewed_at: Timestamp,
    ) -> Result<(), ResourceError> {
        let to = self.require_edge(decision.transition(), &WorkflowPolicy::default())?;
        let review_comment = match comment.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(c) => {
                ValidationError::check_len("review_comment", c, COMMENT_MAX_LEN)?;
                Some(c.to_string())
            }
        };
        self.review = Some(ReviewStamp {
            reviewer_phone,
            review_comment,
            reviewed_at,
        });
        self.move_to(to, reviewed_at);
        Ok(())
    }

    /// Archive the resource (any non-terminal state → ARCHIVED).
    pub fn archive(&mut self, now: Timestamp) -> Result<(), ResourceError> {
        let to = self.require_edge(Transition::Archive, &WorkflowPolicy::default())?;
        self.review = None;
        self.move_to(to, now);
        Ok(())
    }

    /// Edit descriptive fields. Permitted in `Draft` and `Rejected` only.
    ///
    /// All fields are validated before any is applied.
    pub fn apply_update(
        &mut self,
        update: ResourceUpdate,
        now: Timestamp,
    ) -> Result<(), ResourceError> {
        if self.status.is_terminal() {
            return Err(ResourceError::TerminalState { state: self.status });
        }
        if !self.status.is_editable() {
            return Err(ResourceError::InvalidTransition {
                from: self.status,
                action: "update",
            });
        }

        let name = update
            .resource_name
            .as_deref()
            .map(|n| ValidationError::require_text("resource_name", n, NAME_MAX_LEN))
            .transpose()?;
        let description = match update.description.as_deref().map(str::trim) {
            Some(d) => {
                ValidationError::check_len("description", d, DESCRIPTION_MAX_LEN)?;
                Some(d.to_string())
            }
            None => None,
        };
        let category = match update.category.as_deref() {
            Some(raw) => Some(normalize_category(Some(raw))?),
            None => None,
        };

        if let Some(name) = name {
            self.resource_name = name;
        }
        if let Some(description) = description {
            self.description = description;
        }
        if let Some(category) = category {
            self.category = category;
        }
        self.updated_at = std::cmp::max(self.updated_at, now);
        Ok(())
    }

    /// Look up the edge for `transition` or report why it is missing.
    fn require_edge(
        &self,
        transition: Transition,
        policy: &WorkflowPolicy,
    ) -> Result<ResourceStatus, ResourceError> {
        if self.status.is_terminal() {
            return Err(ResourceError::TerminalState { state: self.status });
        }
        self.status
            .next(transition, policy)
            .ok_or(ResourceError::InvalidTransition {
                from: self.status,
                action: transition.as_str(),
            })
    }

    fn move_to(&mut self, to: ResourceStatus, now: Timestamp) {
        self.status = to;
        self.updated_at = std::cmp::max(self.updated_at, now);
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: i64) -> Timestamp {
        Timestamp::from_unix_seconds(secs).unwrap()
    }

    fn owner() -> Phone {
        Phone::new("13800000001").unwrap()
    }

    fn admin() -> Phone {
        Phone::new("13900000000").unwrap()
    }

    fn make_draft() -> Resource {
        Resource::new_draft(
            ResourceId::new("R1").unwrap(),
            owner(),
            ResourceFields {
                resource_name: "R1".to_string(),
                description: "Linear algebra notes".to_string(),
                category: Some("math".to_string()),
            },
            ts(100),
        )
        .unwrap()
    }

    fn make_pending() -> Resource {
        let mut r = make_draft();
        r.submit_for_review(&WorkflowPolicy::default(), ts(110)).unwrap();
        r
    }

    // ── Creation ─────────────────────────────────────────────────────

    #[test]
    fn new_draft_has_no_review() {
        let r = make_draft();
        assert_eq!(r.status(), ResourceStatus::Draft);
        assert!(r.review().is_none());
        assert_eq!(r.created_at(), ts(100));
        assert_eq!(r.category(), Some("math"));
        assert!(r.is_owned_by(&owner()));
        assert!(!r.is_owned_by(&admin()));
    }

    #[test]
    fn new_draft_rejects_blank_name() {
        let err = Resource::new_draft(
            ResourceId::generate(),
            owner(),
            ResourceFields {
                resource_name: "  ".to_string(),
                ..Default::default()
            },
            ts(1),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ResourceError::Validation(ValidationError::EmptyField {
                field: "resource_name"
            })
        ));
    }

    #[test]
    fn new_draft_rejects_long_description() {
        let err = Resource::new_draft(
            ResourceId::generate(),
            owner(),
            ResourceFields {
                resource_name: "ok".to_string(),
                description: "x".repeat(DESCRIPTION_MAX_LEN + 1),
                category: None,
            },
            ts(1),
        )
        .unwrap_err();
        assert!(matches!(err, ResourceError::Validation(ValidationError::TooLong { .. })));
    }

    // ── Happy paths ──────────────────────────────────────────────────

    #[test]
    fn draft_to_pending() {
        let r = make_pending();
        assert_eq!(r.status(), ResourceStatus::Pending);
        assert_eq!(r.updated_at(), ts(110));
    }

    #[test]
    fn pending_to_published_sets_review() {
        let mut r = make_pending();
        r.apply_review(ReviewDecision::Approve, admin(), Some("good".into()), ts(120))
            .unwrap();
        assert_eq!(r.status(), ResourceStatus::Published);
        let stamp = r.review().unwrap();
        assert_eq!(stamp.reviewer_phone, admin());
        assert_eq!(stamp.review_comment.as_deref(), Some("good"));
        assert_eq!(stamp.reviewed_at, ts(120));
    }

    #[test]
    fn pending_to_rejected_blank_comment_is_none() {
        let mut r = make_pending();
        r.apply_review(ReviewDecision::Reject, admin(), Some("   ".into()), ts(120))
            .unwrap();
        assert_eq!(r.status(), ResourceStatus::Rejected);
        assert!(r.review().unwrap().review_comment.is_none());
    }

    #[test]
    fn archive_clears_review() {
        let mut r = make_pending();
        r.apply_review(ReviewDecision::Approve, admin(), None, ts(120))
            .unwrap();
        r.archive(ts(130)).unwrap();
        assert_eq!(r.status(), ResourceStatus::Archived);
        assert!(r.review().is_none());
        assert!(r.status().is_terminal());
    }

    // ── Guards ───────────────────────────────────────────────────────

    #[test]
    fn cannot_submit_twice() {
        let mut r = make_pending();
        let err = r
            .submit_for_review(&WorkflowPolicy::default(), ts(111))
            .unwrap_err();
        assert_eq!(
            err,
            ResourceError::InvalidTransition {
                from: ResourceStatus::Pending,
                action: "submit-review"
            }
        );
        assert!(err.is_state_guard());
    }

    #[test]
    fn cannot_review_draft() {
        let mut r = make_draft();
        let err = r
            .apply_review(ReviewDecision::Approve, admin(), None, ts(120))
            .unwrap_err();
        assert!(err.is_state_guard());
        assert_eq!(r.status(), ResourceStatus::Draft);
        assert!(r.review().is_none());
    }

    #[test]
    fn cannot_review_published_again() {
        let mut r = make_pending();
        r.apply_review(ReviewDecision::Approve, admin(), None, ts(120))
            .unwrap();
        let err = r
            .apply_review(ReviewDecision::Reject, admin(), None, ts(121))
            .unwrap_err();
        assert!(err.is_state_guard());
        assert_eq!(r.status(), ResourceStatus::Published);
    }

    #[test]
    fn rejected_resubmission_requires_policy() {
        let mut r = make_pending();
        r.apply_review(ReviewDecision::Reject, admin(), Some("fix".into()), ts(120))
            .unwrap();

        let err = r
            .submit_for_review(&WorkflowPolicy::default(), ts(130))
            .unwrap_err();
        assert!(err.is_state_guard());

        r.submit_for_review(&WorkflowPolicy::with_resubmission(), ts(130))
            .unwrap();
        assert_eq!(r.status(), ResourceStatus::Pending);
        assert!(r.review().is_none(), "resubmission clears review fields");
    }

    #[test]
    fn published_never_resubmits_even_under_policy() {
        let mut r = make_pending();
        r.apply_review(ReviewDecision::Approve, admin(), None, ts(120))
            .unwrap();
        assert!(r
            .submit_for_review(&WorkflowPolicy::with_resubmission(), ts(130))
            .is_err());
    }

    #[test]
    fn archived_is_terminal() {
        let mut r = make_draft();
        r.archive(ts(101)).unwrap();
        assert!(matches!(
            r.archive(ts(102)),
            Err(ResourceError::TerminalState { .. })
        ));
        assert!(matches!(
            r.submit_for_review(&WorkflowPolicy::with_resubmission(), ts(102)),
            Err(ResourceError::TerminalState { .. })
        ));
    }

    // ── Updates ──────────────────────────────────────────────────────

    #[test]
    fn update_in_draft_applies_fields() {
        let mut r = make_draft();
        r.apply_update(
            ResourceUpdate {
                resource_name: Some(" R1 v2 ".into()),
                description: None,
                category: Some("".into()),
            },
            ts(105),
        )
        .unwrap();
        assert_eq!(r.resource_name(), "R1 v2");
        assert_eq!(r.description(), "Linear algebra notes");
        assert_eq!(r.category(), None);
        assert_eq!(r.updated_at(), ts(105));
    }

    #[test]
    fn update_validates_before_applying() {
        let mut r = make_draft();
        let err = r
            .apply_update(
                ResourceUpdate {
                    resource_name: Some("new".into()),
                    description: Some("y".repeat(DESCRIPTION_MAX_LEN + 1)),
                    category: None,
                },
                ts(105),
            )
            .unwrap_err();
        assert!(matches!(err, ResourceError::Validation(_)));
        assert_eq!(r.resource_name(), "R1", "no partial update");
    }

    #[test]
    fn update_refused_while_pending() {
        let mut r = make_pending();
        let err = r
            .apply_update(
                ResourceUpdate {
                    description: Some("sneaky".into()),
                    ..Default::default()
                },
                ts(115),
            )
            .unwrap_err();
        assert!(err.is_state_guard());
    }

    // ── Rehydration ──────────────────────────────────────────────────

    #[test]
    fn from_parts_roundtrip() {
        let mut r = make_pending();
        r.apply_review(ReviewDecision::Approve, admin(), None, ts(120))
            .unwrap();
        let back = Resource::from_parts(r.to_parts()).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn from_parts_rejects_review_on_draft() {
        let mut parts = make_draft().to_parts();
        parts.review = Some(ReviewStamp {
            reviewer_phone: admin(),
            review_comment: None,
            reviewed_at: ts(1),
        });
        assert!(matches!(
            Resource::from_parts(parts),
            Err(ResourceError::InconsistentReview { .. })
        ));
    }

    #[test]
    fn status_names_roundtrip() {
        for s in ResourceStatus::ALL {
            assert_eq!(ResourceStatus::from_name(s.as_str()), Some(s));
        }
        assert_eq!(ResourceStatus::from_name("DRAFT"), None);
        assert_eq!(
            serde_json::to_string(&ResourceStatus::Published).unwrap(),
            "\"published\""
        );
    }

    // ── Property: only table edges are ever taken ────────────────────

    mod properties {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone, Copy)]
        enum Op {
            Submit,
            Approve,
            Reject,
            Archive,
            Update,
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                Just(Op::Submit),
                Just(Op::Approve),
                Just(Op::Reject),
                Just(Op::Archive),
                Just(Op::Update),
            ]
        }

        fn allowed(from: ResourceStatus, to: ResourceStatus, resubmit: bool) -> bool {
            use ResourceStatus::*;
            matches!(
                (from, to),
                (Draft, Pending)
                    | (Pending, Published)
                    | (Pending, Rejected)
                    | (Draft | Pending | Published | Rejected, Archived)
            ) || (resubmit && from == Rejected && to == Pending)
        }

        proptest! {
            #[test]
            fn status_follows_table(ops in prop::collection::vec(op(), 0..24), resubmit in any::<bool>()) {
                let policy = WorkflowPolicy { allow_resubmit_rejected: resubmit };
                let mut r = make_draft();
                let mut clock = 200;
                for op in ops {
                    clock += 1;
                    let before = r.clone();
                    let result = match op {
                        Op::Submit => r.submit_for_review(&policy, ts(clock)),
                        Op::Approve => r.apply_review(ReviewDecision::Approve, admin(), None, ts(clock)),
                        Op::Reject => r.apply_review(ReviewDecision::Reject, admin(), None, ts(clock)),
                        Op::Archive => r.archive(ts(clock)),
                        Op::Update => r.apply_update(
                            ResourceUpdate { description: Some(format!("rev {clock}")), ..Default::default() },
                            ts(clock),
                        ),
                    };
                    match result {
                        Ok(()) if before.status() != r.status() => {
                            prop_assert!(allowed(before.status(), r.status(), resubmit),
                                "illegal edge {} -> {}", before.status(), r.status());
                        }
                        Ok(()) => prop_assert!(matches!(op, Op::Update)),
                        Err(_) => prop_assert_eq!(&before, &r),
                    }
                    prop_assert_eq!(r.status().carries_review(), r.review().is_some());
                    prop_assert_eq!(r.id(), before.id());
                    prop_assert_eq!(r.publisher_phone(), before.publisher_phone());
                    prop_assert_eq!(r.created_at(), before.created_at());
                }
            }
        }
    }
}
