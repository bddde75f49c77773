//! # campus-state: Resource Moderation State Machine
//!
//! Implements the lifecycle of a shared learning resource:
//!
//! ```text
//! DRAFT ─submit──▶ PENDING ─approve──▶ PUBLISHED
//!   ▲                 │
//!   │              reject
//!   │                 ▼
//!   └ ─ ─ ─ ─ ─ ─ REJECTED      (rejected → pending only under policy)
//!
//! any non-terminal ─archive──▶ ARCHIVED (terminal)
//! ```
//!
//! The transition table lives in exactly one place,
//! [`ResourceStatus::next`]. Every mutating method on [`Resource`] consults
//! it, so no code path can move a resource along an edge the table does not
//! contain.
//!
//! This crate is synchronous and performs no I/O. Authorization (who may
//! request a transition) and persistence (how a transition is committed)
//! belong to the service layer in `campus-api`.

pub mod policy;
pub mod resource;
pub mod review;

pub use policy::WorkflowPolicy;
pub use resource::{
    Resource, ResourceError, ResourceFields, ResourceParts, ResourceStatus, ResourceUpdate,
    Transition, CATEGORY_MAX_LEN, DESCRIPTION_MAX_LEN, NAME_MAX_LEN,
};
pub use review::{
    monotonic_after, ReviewDecision, ReviewRecord, ReviewStamp, COMMENT_MAX_LEN,
};
