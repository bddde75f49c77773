//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI 3 document,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Campus Resource Moderation API",
        version = "0.1.0",
        description = "Publish, moderate, and archive shared campus learning resources.",
        license(name = "BUSL-1.1")
    ),
    paths(
        crate::routes::resources::create_resource,
        crate::routes::resources::list_mine,
        crate::routes::resources::list_pending,
        crate::routes::resources::get_resource,
        crate::routes::resources::update_resource,
        crate::routes::resources::delete_resource,
        crate::routes::resources::submit_review,
        crate::routes::resources::review_resource,
        crate::routes::resources::archive_resource,
        crate::routes::resources::review_history,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::auth::Role,
        crate::routes::resources::CreateResourceRequest,
        crate::routes::resources::UpdateResourceRequest,
        crate::routes::resources::ReviewRequest,
        crate::routes::resources::ResourceView,
        crate::routes::resources::ReviewRecordView,
        crate::routes::resources::ResourcePageView,
        crate::routes::resources::ReviewOutcomeView,
        crate::routes::resources::DeletedView,
        crate::routes::ResourceEnvelope,
        crate::routes::ResourcePageEnvelope,
        crate::routes::ReviewOutcomeEnvelope,
        crate::routes::HistoryEnvelope,
        crate::routes::DeletedEnvelope,
    )),
    modifiers(&BearerAuth),
    security(("bearer" = [])),
    tags(
        (name = "resources", description = "Resource lifecycle, moderation queue, and review history"),
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

/// Build the OpenAPI router.
pub fn router<S: Clone + Send + Sync + 'static>() -> Router<S> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json: Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
