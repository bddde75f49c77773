//! # API Route Modules
//!
//! - `resources`: resource lifecycle, moderation queue, and review history
//!   under `/api/resources`.
//!
//! Every successful response uses the [`ApiResponse`] envelope; failures
//! use [`crate::error::ErrorBody`].

pub mod resources;

use serde::Serialize;
use utoipa::ToSchema;

use resources::{DeletedView, ResourcePageView, ResourceView, ReviewOutcomeView, ReviewRecordView};

/// Success envelope: `{success: true, message, data}`.
#[derive(Debug, Serialize, ToSchema)]
#[aliases(
    ResourceEnvelope = ApiResponse<ResourceView>,
    ResourcePageEnvelope = ApiResponse<ResourcePageView>,
    ReviewOutcomeEnvelope = ApiResponse<ReviewOutcomeView>,
    HistoryEnvelope = ApiResponse<Vec<ReviewRecordView>>,
    DeletedEnvelope = ApiResponse<DeletedView>
)]
pub struct ApiResponse<T> {
    /// Always `true`.
    pub success: bool,
    /// Human-readable outcome.
    pub message: String,
    /// Operation payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// A successful response carrying `data`.
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}
