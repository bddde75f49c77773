//! # Review Decisions and Records
//!
//! A review decision moves a `pending` resource to `published` or
//! `rejected`. Each decision produces two artefacts:
//!
//! - a [`ReviewStamp`] on the resource itself (the mutable "current review"
//!   fields, cleared on resubmission or archival), and
//! - a [`ReviewRecord`] appended to the review ledger, which is never
//!   mutated or deleted.

use serde::{Deserialize, Serialize};

use campus_core::{Phone, ResourceId, Timestamp};

use crate::resource::{ResourceStatus, Transition};

/// Maximum length of a review comment in characters.
pub const COMMENT_MAX_LEN: usize = 500;

/// An admin's decision on a pending resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    /// Publish the resource.
    Approve,
    /// Reject the resource.
    Reject,
}

impl ReviewDecision {
    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }

    /// Parse a canonical name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "approve" => Some(Self::Approve),
            "reject" => Some(Self::Reject),
            _ => None,
        }
    }

    /// The state-machine edge this decision drives.
    pub fn transition(&self) -> Transition {
        match self {
            Self::Approve => Transition::Approve,
            Self::Reject => Transition::Reject,
        }
    }
}

impl std::fmt::Display for ReviewDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The review fields carried by a `published` or `rejected` resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewStamp {
    /// Admin who made the decision.
    pub reviewer_phone: Phone,
    /// Free-text comment, if any.
    pub review_comment: Option<String>,
    /// When the decision was made.
    pub reviewed_at: Timestamp,
}

/// Immutable audit entry for one review decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRecord {
    /// The reviewed resource.
    pub resource_id: ResourceId,
    /// 1-based position in the resource's review history.
    pub sequence: u32,
    /// Approve or reject.
    pub decision: ReviewDecision,
    /// Admin who made the decision.
    pub reviewer_phone: Phone,
    /// Free-text comment, if any.
    pub comment: Option<String>,
    /// Server time of the decision; non-decreasing within one resource.
    pub reviewed_at: Timestamp,
    /// Status before the decision (always `pending`).
    pub from_status: ResourceStatus,
    /// Status after the decision.
    pub to_status: ResourceStatus,
}

/// Clamp `now` so it never precedes `previous`.
///
/// Wall clocks can step backwards; the ledger promises non-decreasing
/// review times per resource, so an earlier `now` is lifted to the last
/// recorded instant.
pub fn monotonic_after(previous: Option<Timestamp>, now: Timestamp) -> Timestamp {
    match previous {
        Some(prev) if prev > now => prev,
        _ => now,
    }
}
