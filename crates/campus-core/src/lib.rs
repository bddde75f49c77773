#![deny(missing_docs)]

//! # campus-core: Foundational Types for the Campus Moderation Service
//!
//! Defines the identifiers and value types every other crate in the
//! workspace depends on. It has no internal crate dependencies; only
//! `serde`, `thiserror`, `chrono`, and `uuid` from the external ecosystem.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** A [`ResourceId`] cannot be
//!    passed where a [`Phone`] is expected, and both validate their format at
//!    construction time.
//!
//! 2. **UTC-only time.** [`Timestamp`] is the single time type used for
//!    creation, review, and expiry instants.
//!
//! 3. **Structured validation errors.** [`ValidationError`] carries the
//!    offending field and the constraint that failed.

pub mod error;
pub mod identity;
pub mod temporal;

pub use error::ValidationError;
pub use identity::{Phone, ResourceId};
pub use temporal::Timestamp;
