//! # Resource Routes
//!
//! HTTP surface of the resource lifecycle manager. Handlers parse input,
//! delegate to [`crate::workflow::ResourceLifecycle`], and wrap the result
//! in [`ApiResponse`].
//!
//! ## Endpoints
//!
//! - `POST /api/resources`: create a draft
//! - `GET /api/resources/mine`: the caller's resources, newest first
//! - `GET /api/resources/pending`: moderation queue (admin)
//! - `GET /api/resources/:id`: get
//! - `PUT /api/resources/:id`: update descriptive fields
//! - `DELETE /api/resources/:id`: delete
//! - `POST /api/resources/:id/submit-review`: `draft → pending`
//! - `POST /api/resources/:id/review`: approve or reject (admin)
//! - `POST /api/resources/:id/archive`: archive
//! - `GET /api/resources/:id/reviews`: review history

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use campus_state::{Resource, ResourceFields, ResourceUpdate, ReviewDecision, ReviewRecord};

use crate::auth::{Action, Session};
use crate::error::AppError;
use crate::extractors::{extract_json, extract_query};
use crate::routes::{
    ApiResponse, DeletedEnvelope, HistoryEnvelope, ResourceEnvelope, ResourcePageEnvelope,
    ReviewOutcomeEnvelope,
};
use crate::state::AppState;
use crate::workflow::{NewResource, Page, PageRequest};

// ── Request DTOs ────────────────────────────────────────────────────

/// Request to create a resource.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateResourceRequest {
    /// Caller-chosen id; generated when absent or blank.
    #[serde(default)]
    pub resource_id: Option<String>,
    /// Display name; required.
    #[serde(default, alias = "name")]
    pub resource_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
}

/// Request to edit descriptive fields. Absent fields are left unchanged.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateResourceRequest {
    #[serde(default, alias = "name")]
    pub resource_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Blank clears the category.
    #[serde(default)]
    pub category: Option<String>,
}

/// An admin decision on a pending resource.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReviewRequest {
    /// "approve" or "reject".
    #[schema(value_type = String, example = "approve")]
    pub decision: ReviewDecision,
    /// Reviewer's note, kept in the ledger.
    #[serde(default)]
    pub comment: Option<String>,
}

/// Pagination parameters. Pages are 1-based.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// Page number; defaults to 1.
    pub page: Option<u32>,
    /// Items per page; defaults to the configured page size.
    pub page_size: Option<u32>,
}

impl From<PageQuery> for PageRequest {
    fn from(q: PageQuery) -> Self {
        PageRequest {
            page: q.page,
            page_size: q.page_size,
        }
    }
}

// ── Response DTOs ───────────────────────────────────────────────────

/// A resource as returned by the API.
#[derive(Debug, Serialize, ToSchema)]
pub struct ResourceView {
    /// Unique resource id.
    pub resource_id: String,
    /// Phone identity of the owner.
    pub publisher_phone: String,
    /// Display name.
    pub resource_name: String,
    /// Free-text description; may be empty.
    pub description: String,
    /// Optional category tag.
    pub category: Option<String>,
    /// One of draft, pending, published, rejected, archived.
    pub status: String,
    /// Admin who made the latest decision; set only while published or rejected.
    pub reviewer_phone: Option<String>,
    /// Comment attached to the latest decision.
    pub review_comment: Option<String>,
    /// When the latest decision was made (RFC 3339, UTC).
    pub reviewed_at: Option<String>,
    /// Creation time (RFC 3339, UTC).
    pub created_at: String,
    /// Time of the last change (RFC 3339, UTC).
    pub updated_at: String,
}

impl From<&Resource> for ResourceView {
    fn from(r: &Resource) -> Self {
        let review = r.review();
        Self {
            resource_id: r.id().to_string(),
            publisher_phone: r.publisher_phone().to_string(),
            resource_name: r.resource_name().to_string(),
            description: r.description().to_string(),
            category: r.category().map(String::from),
            status: r.status().as_str().to_string(),
            reviewer_phone: review.map(|s| s.reviewer_phone.to_string()),
            review_comment: review.and_then(|s| s.review_comment.clone()),
            reviewed_at: review.map(|s| s.reviewed_at.to_string()),
            created_at: r.created_at().to_string(),
            updated_at: r.updated_at().to_string(),
        }
    }
}

/// One entry of a resource's review history.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewRecordView {
    /// Resource the decision applies to.
    pub resource_id: String,
    /// 1-based position in the history.
    pub sequence: u32,
    /// "approve" or "reject".
    pub decision: String,
    /// Admin who decided.
    pub reviewer_phone: String,
    /// Reviewer's note.
    pub comment: Option<String>,
    /// Decision time (RFC 3339, UTC).
    pub reviewed_at: String,
    /// Status before the decision; always pending.
    pub from_status: String,
    /// Status after the decision: published or rejected.
    pub to_status: String,
}

impl From<&ReviewRecord> for ReviewRecordView {
    fn from(r: &ReviewRecord) -> Self {
        Self {
            resource_id: r.resource_id.to_string(),
            sequence: r.sequence,
            decision: r.decision.as_str().to_string(),
            reviewer_phone: r.reviewer_phone.to_string(),
            comment: r.comment.clone(),
            reviewed_at: r.reviewed_at.to_string(),
            from_status: r.from_status.as_str().to_string(),
            to_status: r.to_status.as_str().to_string(),
        }
    }
}

/// One page of resources.
#[derive(Debug, Serialize, ToSchema)]
pub struct ResourcePageView {
    /// Resources on this page.
    pub items: Vec<ResourceView>,
    /// 1-based page number.
    pub page: u32,
    /// Effective page size.
    pub page_size: u32,
    /// Total matching resources across all pages.
    pub total: u64,
    /// Whether a later page has items.
    pub has_more: bool,
}

impl From<Page<Resource>> for ResourcePageView {
    fn from(page: Page<Resource>) -> Self {
        let has_more = page.has_more();
        let page = page.map(|r| ResourceView::from(&r));
        Self {
            items: page.items,
            page: page.page,
            page_size: page.page_size,
            total: page.total,
            has_more,
        }
    }
}

/// Result of a review: the updated resource and the appended record.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewOutcomeView {
    /// The resource after the decision.
    pub resource: ResourceView,
    /// The ledger entry just appended.
    pub record: ReviewRecordView,
}

/// Acknowledgement of a deletion.
#[derive(Debug, Serialize, ToSchema)]
pub struct DeletedView {
    /// Id of the removed resource.
    pub resource_id: String,
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the resources router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/resources", post(create_resource))
        .route("/api/resources/mine", get(list_mine))
        .route("/api/resources/pending", get(list_pending))
        .route(
            "/api/resources/:id",
            get(get_resource).put(update_resource).delete(delete_resource),
        )
        .route("/api/resources/:id/submit-review", post(submit_review))
        .route("/api/resources/:id/review", post(review_resource))
        .route("/api/resources/:id/archive", post(archive_resource))
        .route("/api/resources/:id/reviews", get(review_history))
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /api/resources: Create a draft owned by the caller.
#[utoipa::path(
    post,
    path = "/api/resources",
    request_body = CreateResourceRequest,
    responses(
        (status = 201, description = "Resource created in draft", body = ResourceEnvelope),
        (status = 400, description = "Validation error", body = crate::error::ErrorBody),
        (status = 409, description = "Resource id already taken", body = crate::error::ErrorBody),
    ),
    tag = "resources"
)]
pub(crate) async fn create_resource(
    State(state): State<AppState>,
    session: Session,
    body: Result<Json<CreateResourceRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<ResourceView>>), AppError> {
    let req = extract_json(body)?;
    let resource = state
        .lifecycle
        .create(
            &session,
            NewResource {
                resource_id: req.resource_id,
                fields: ResourceFields {
                    resource_name: req.resource_name,
                    description: req.description,
                    category: req.category,
                },
            },
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("resource created", ResourceView::from(&resource))),
    ))
}

/// GET /api/resources/mine: The caller's resources.
#[utoipa::path(
    get,
    path = "/api/resources/mine",
    params(PageQuery),
    responses(
        (status = 200, description = "One page of the caller's resources", body = ResourcePageEnvelope),
        (status = 400, description = "Invalid page parameters", body = crate::error::ErrorBody),
    ),
    tag = "resources"
)]
pub(crate) async fn list_mine(
    State(state): State<AppState>,
    session: Session,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<ResourcePageView>>, AppError> {
    let query = extract_query(query)?;
    let page = state.lifecycle.list_mine(&session, query.into()).await?;
    Ok(Json(ApiResponse::ok("ok", ResourcePageView::from(page))))
}

/// GET /api/resources/pending: Resources awaiting review, oldest first.
#[utoipa::path(
    get,
    path = "/api/resources/pending",
    params(PageQuery),
    responses(
        (status = 200, description = "One page of the moderation queue", body = ResourcePageEnvelope),
        (status = 403, description = "Caller is not an admin", body = crate::error::ErrorBody),
    ),
    tag = "resources"
)]
pub(crate) async fn list_pending(
    State(state): State<AppState>,
    session: Session,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<ResourcePageView>>, AppError> {
    let query = extract_query(query)?;
    let page = state.lifecycle.list_pending(&session, query.into()).await?;
    Ok(Json(ApiResponse::ok("ok", ResourcePageView::from(page))))
}

/// GET /api/resources/:id: Get one resource.
#[utoipa::path(
    get,
    path = "/api/resources/{id}",
    params(("id" = String, Path, description = "Resource ID")),
    responses(
        (status = 200, description = "Resource found", body = ResourceEnvelope),
        (status = 403, description = "Not visible to the caller", body = crate::error::ErrorBody),
        (status = 404, description = "Resource not found", body = crate::error::ErrorBody),
    ),
    tag = "resources"
)]
pub(crate) async fn get_resource(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ResourceView>>, AppError> {
    let resource = state.lifecycle.get(&session, &id).await?;
    Ok(Json(ApiResponse::ok("ok", ResourceView::from(&resource))))
}

/// PUT /api/resources/:id: Edit a draft or rejected resource.
#[utoipa::path(
    put,
    path = "/api/resources/{id}",
    params(("id" = String, Path, description = "Resource ID")),
    request_body = UpdateResourceRequest,
    responses(
        (status = 200, description = "Resource updated", body = ResourceEnvelope),
        (status = 400, description = "Validation error or status does not allow edits", body = crate::error::ErrorBody),
        (status = 403, description = "Caller is not the owner", body = crate::error::ErrorBody),
        (status = 404, description = "Resource not found", body = crate::error::ErrorBody),
    ),
    tag = "resources"
)]
pub(crate) async fn update_resource(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    body: Result<Json<UpdateResourceRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ResourceView>>, AppError> {
    let req = extract_json(body)?;
    let resource = state
        .lifecycle
        .update(
            &session,
            &id,
            ResourceUpdate {
                resource_name: req.resource_name,
                description: req.description,
                category: req.category,
            },
        )
        .await?;
    Ok(Json(ApiResponse::ok(
        "resource updated",
        ResourceView::from(&resource),
    )))
}

/// DELETE /api/resources/:id: Delete a resource. Its review history is kept.
#[utoipa::path(
    delete,
    path = "/api/resources/{id}",
    params(("id" = String, Path, description = "Resource ID")),
    responses(
        (status = 200, description = "Resource deleted", body = DeletedEnvelope),
        (status = 403, description = "Caller is neither owner nor admin", body = crate::error::ErrorBody),
        (status = 404, description = "Resource not found", body = crate::error::ErrorBody),
    ),
    tag = "resources"
)]
pub(crate) async fn delete_resource(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<DeletedView>>, AppError> {
    state.lifecycle.delete(&session, &id).await?;
    Ok(Json(ApiResponse::ok(
        "resource deleted",
        DeletedView { resource_id: id },
    )))
}

/// POST /api/resources/:id/submit-review: Submit for moderation.
#[utoipa::path(
    post,
    path = "/api/resources/{id}/submit-review",
    params(("id" = String, Path, description = "Resource ID")),
    responses(
        (status = 200, description = "Resource is pending review", body = ResourceEnvelope),
        (status = 400, description = "Status does not allow submission", body = crate::error::ErrorBody),
        (status = 403, description = "Caller is not the owner", body = crate::error::ErrorBody),
        (status = 404, description = "Resource not found", body = crate::error::ErrorBody),
    ),
    tag = "resources"
)]
pub(crate) async fn submit_review(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ResourceView>>, AppError> {
    let resource = state.lifecycle.submit_for_review(&session, &id).await?;
    Ok(Json(ApiResponse::ok(
        "resource submitted for review",
        ResourceView::from(&resource),
    )))
}

/// POST /api/resources/:id/review: Approve or reject a pending resource.
#[utoipa::path(
    post,
    path = "/api/resources/{id}/review",
    params(("id" = String, Path, description = "Resource ID")),
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Decision recorded", body = ReviewOutcomeEnvelope),
        (status = 400, description = "Invalid decision or resource is not pending", body = crate::error::ErrorBody),
        (status = 403, description = "Caller is not an admin", body = crate::error::ErrorBody),
        (status = 404, description = "Resource not found", body = crate::error::ErrorBody),
    ),
    tag = "resources"
)]
pub(crate) async fn review_resource(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    body: Result<Json<ReviewRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ReviewOutcomeView>>, AppError> {
    state.lifecycle.authorize(&session, Action::Review)?;
    let req = extract_json(body)?;
    let (resource, record) = state
        .lifecycle
        .review(&session, &id, req.decision, req.comment)
        .await?;
    Ok(Json(ApiResponse::ok(
        format!("resource {}", resource.status()),
        ReviewOutcomeView {
            resource: ResourceView::from(&resource),
            record: ReviewRecordView::from(&record),
        },
    )))
}

/// POST /api/resources/:id/archive: Archive a resource.
#[utoipa::path(
    post,
    path = "/api/resources/{id}/archive",
    params(("id" = String, Path, description = "Resource ID")),
    responses(
        (status = 200, description = "Resource archived", body = ResourceEnvelope),
        (status = 400, description = "Resource is already archived", body = crate::error::ErrorBody),
        (status = 403, description = "Caller is neither owner nor admin", body = crate::error::ErrorBody),
        (status = 404, description = "Resource not found", body = crate::error::ErrorBody),
    ),
    tag = "resources"
)]
pub(crate) async fn archive_resource(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ResourceView>>, AppError> {
    let resource = state.lifecycle.archive(&session, &id).await?;
    Ok(Json(ApiResponse::ok(
        "resource archived",
        ResourceView::from(&resource),
    )))
}

/// GET /api/resources/:id/reviews: Review history, oldest first.
#[utoipa::path(
    get,
    path = "/api/resources/{id}/reviews",
    params(("id" = String, Path, description = "Resource ID")),
    responses(
        (status = 200, description = "Review history", body = HistoryEnvelope),
        (status = 403, description = "Caller is neither owner nor admin", body = crate::error::ErrorBody),
        (status = 404, description = "Resource not found", body = crate::error::ErrorBody),
    ),
    tag = "resources"
)]
pub(crate) async fn review_history(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<ReviewRecordView>>>, AppError> {
    let history = state.lifecycle.history(&session, &id).await?;
    Ok(Json(ApiResponse::ok(
        "ok",
        history.iter().map(ReviewRecordView::from).collect(),
    )))
}
