//! # Integration Tests for campus-api
//!
//! Drives the full router (auth middleware included) through the
//! moderation workflow: publish, review, update, archive, history, listing,
//! plus authentication failures, probes, metrics, and the OpenAPI document.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use campus_api::auth::Role;
use campus_api::state::{AppConfig, AppState};
use campus_core::{Phone, Timestamp};

const USER_A: &str = "13800000001";
const USER_B: &str = "13800000002";
const ADMIN: &str = "13900000000";

struct TestApp {
    state: AppState,
    router: axum::Router,
}

impl TestApp {
    fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    fn with_config(config: AppConfig) -> Self {
        let state = AppState::with_config(
            config,
            std::sync::Arc::new(campus_api::persistence::MemoryPersistence::new()),
        );
        let router = campus_api::app(state.clone());
        Self { state, router }
    }

    /// A valid bearer token for `phone` in `role`.
    fn token(&self, phone: &str, role: Role) -> String {
        self.state
            .tokens
            .issue(role, &Phone::new(phone).unwrap(), Timestamp::now().plus_seconds(3600))
            .unwrap()
    }

    async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }

    async fn call(
        &self,
        who: (&str, Role),
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {}", self.token(who.0, who.1)));
        let body = match body {
            Some(json) => {
                req = req.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.send(req.body(body).unwrap()).await
    }

    async fn create(&self, owner: &str, id: &str) {
        let (status, _) = self
            .call(
                (owner, Role::User),
                "POST",
                "/api/resources",
                Some(serde_json::json!({"resource_id": id, "resource_name": id})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }
}

fn user(phone: &str) -> (&str, Role) {
    (phone, Role::User)
}

fn admin() -> (&'static str, Role) {
    (ADMIN, Role::Admin)
}

// -- Probes, metrics, documents ----------------------------------------------

#[tokio::test]
async fn test_liveness_probe() {
    let app = TestApp::new();
    let req = Request::get("/health/liveness").body(Body::empty()).unwrap();
    let (status, body) = app.send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".into()));
}

#[tokio::test]
async fn test_readiness_probe() {
    let app = TestApp::new();
    let req = Request::get("/health/readiness").body(Body::empty()).unwrap();
    let (status, body) = app.send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ready".into()));
}

#[tokio::test]
async fn test_openapi_served_without_auth() {
    let app = TestApp::new();
    let req = Request::get("/openapi.json").body(Body::empty()).unwrap();
    let (status, body) = app.send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/resources/{id}/review"].is_object());
}

#[tokio::test]
async fn test_metrics_count_api_requests() {
    let app = TestApp::new();
    app.create(USER_A, "R1").await;
    let req = Request::get("/api/resources/R1").body(Body::empty()).unwrap();
    let (status, _) = app.send(req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = Request::get("/metrics").body(Body::empty()).unwrap();
    let (status, body) = app.send(req).await;
    assert_eq!(status, StatusCode::OK);
    let text = body.as_str().unwrap();
    assert!(text.contains("campus_http_requests_total 2"), "{text}");
    assert!(text.contains("campus_http_client_errors_total 1"), "{text}");
}

// -- Authentication -----------------------------------------------------------

#[tokio::test]
async fn test_missing_token_is_401() {
    let app = TestApp::new();
    let req = Request::get("/api/resources/mine").body(Body::empty()).unwrap();
    let (status, body) = app.send(req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_expired_token_is_401() {
    let app = TestApp::new();
    let expired = app
        .state
        .tokens
        .issue(
            Role::User,
            &Phone::new(USER_A).unwrap(),
            Timestamp::now().plus_seconds(-10),
        )
        .unwrap();
    let req = Request::get("/api/resources/mine")
        .header("authorization", format!("Bearer {expired}"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.send(req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_from_other_secret_is_401() {
    let app = TestApp::new();
    let other = TestApp::new();
    let foreign = other.token(ADMIN, Role::Admin);
    let req = Request::get("/api/resources/pending")
        .header("authorization", format!("Bearer {foreign}"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.send(req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let app = TestApp::new();
    let req = Request::post("/api/resources")
        .header("authorization", format!("Bearer {}", app.token(USER_A, Role::User)))
        .header("content-type", "application/json")
        .body(Body::from("{\"resource_name\": "))
        .unwrap();
    let (status, body) = app.send(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

// -- Workflow scenarios -------------------------------------------------------

#[tokio::test]
async fn test_publish_flow() {
    let app = TestApp::new();
    let (status, body) = app
        .call(
            user(USER_A),
            "POST",
            "/api/resources",
            Some(serde_json::json!({"name": "R1"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "draft");
    let id = body["data"]["resource_id"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(user(USER_A), "POST", &format!("/api/resources/{id}/submit-review"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "pending");

    let (status, body) = app
        .call(
            admin(),
            "POST",
            &format!("/api/resources/{id}/review"),
            Some(serde_json::json!({"decision": "approve", "comment": "clear and useful"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["resource"]["status"], "published");
    assert_eq!(body["data"]["resource"]["reviewer_phone"], ADMIN);
    assert_eq!(body["data"]["record"]["decision"], "approve");
    assert_eq!(body["data"]["record"]["sequence"], 1);

    let (status, body) = app
        .call(user(USER_A), "GET", &format!("/api/resources/{id}/reviews"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let history = body["data"].as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["decision"], "approve");
    assert_eq!(history[0]["from_status"], "pending");
    assert_eq!(history[0]["to_status"], "published");

    // Published resources are visible to everyone.
    let (status, _) = app
        .call(user(USER_B), "GET", &format!("/api/resources/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_double_submit_is_invalid_state() {
    let app = TestApp::new();
    app.create(USER_A, "R1").await;
    let (status, _) = app
        .call(user(USER_A), "POST", "/api/resources/R1/submit-review", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app
        .call(user(USER_A), "POST", "/api/resources/R1/submit-review", None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_STATE");
}

#[tokio::test]
async fn test_update_by_other_user_is_forbidden() {
    let app = TestApp::new();
    app.create(USER_A, "R1").await;
    let (status, body) = app
        .call(
            user(USER_B),
            "PUT",
            "/api/resources/R1",
            Some(serde_json::json!({"resource_name": "hijacked"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let (_, body) = app.call(user(USER_A), "GET", "/api/resources/R1", None).await;
    assert_eq!(body["data"]["resource_name"], "R1");
}

#[tokio::test]
async fn test_review_missing_is_not_found() {
    let app = TestApp::new();
    let (status, body) = app
        .call(
            admin(),
            "POST",
            "/api/resources/NOT_EXIST_ID/review",
            Some(serde_json::json!({"decision": "approve"})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_user_cannot_review() {
    let app = TestApp::new();
    app.create(USER_A, "R1").await;
    app.call(user(USER_A), "POST", "/api/resources/R1/submit-review", None)
        .await;
    let (status, _) = app
        .call(
            user(USER_A),
            "POST",
            "/api/resources/R1/review",
            Some(serde_json::json!({"decision": "approve"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_reject_then_edit_then_archive() {
    let app = TestApp::new();
    app.create(USER_A, "R1").await;
    app.call(user(USER_A), "POST", "/api/resources/R1/submit-review", None)
        .await;
    let (status, body) = app
        .call(
            admin(),
            "POST",
            "/api/resources/R1/review",
            Some(serde_json::json!({"decision": "reject", "comment": "needs sources"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["resource"]["status"], "rejected");
    assert_eq!(body["data"]["resource"]["review_comment"], "needs sources");

    // Rejected resources are editable but not resubmittable by default.
    let (status, _) = app
        .call(
            user(USER_A),
            "PUT",
            "/api/resources/R1",
            Some(serde_json::json!({"description": "now with sources"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .call(user(USER_A), "POST", "/api/resources/R1/submit-review", None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .call(user(USER_A), "POST", "/api/resources/R1/archive", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "archived");
    assert!(body["data"]["reviewer_phone"].is_null());

    let (status, body) = app
        .call(user(USER_A), "POST", "/api/resources/R1/archive", None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_STATE");
}

#[tokio::test]
async fn test_resubmit_rejected_when_enabled() {
    let mut config = AppConfig::default();
    config.policy.allow_resubmit_rejected = true;
    let app = TestApp::with_config(config);
    app.create(USER_A, "R1").await;
    app.call(user(USER_A), "POST", "/api/resources/R1/submit-review", None)
        .await;
    app.call(
        admin(),
        "POST",
        "/api/resources/R1/review",
        Some(serde_json::json!({"decision": "reject"})),
    )
    .await;

    let (status, body) = app
        .call(user(USER_A), "POST", "/api/resources/R1/submit-review", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "pending");
    assert!(body["data"]["reviewer_phone"].is_null());

    app.call(
        admin(),
        "POST",
        "/api/resources/R1/review",
        Some(serde_json::json!({"decision": "approve"})),
    )
    .await;
    let (_, body) = app
        .call(admin(), "GET", "/api/resources/R1/reviews", None)
        .await;
    let history = body["data"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["decision"], "reject");
    assert_eq!(history[1]["decision"], "approve");
    assert_eq!(history[1]["sequence"], 2);
}

// -- Listing ------------------------------------------------------------------

#[tokio::test]
async fn test_list_mine_pages_and_beyond_range() {
    let app = TestApp::new();
    for id in ["R1", "R2", "R3"] {
        app.create(USER_A, id).await;
    }
    app.create(USER_B, "OTHER").await;

    let (status, body) = app
        .call(user(USER_A), "GET", "/api/resources/mine?page=1&page_size=2", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 3);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["has_more"], true);

    let (status, body) = app
        .call(user(USER_A), "GET", "/api/resources/mine?page=9&page_size=2", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body["data"]["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_pending_queue_for_admin() {
    let app = TestApp::new();
    app.create(USER_A, "R1").await;
    app.create(USER_B, "R2").await;
    app.call(user(USER_B), "POST", "/api/resources/R2/submit-review", None)
        .await;

    let (status, body) = app
        .call(admin(), "GET", "/api/resources/pending", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["resource_id"], "R2");
}

#[tokio::test]
async fn test_history_survives_delete_for_admin() {
    let app = TestApp::new();
    app.create(USER_A, "R1").await;
    app.call(user(USER_A), "POST", "/api/resources/R1/submit-review", None)
        .await;
    app.call(
        admin(),
        "POST",
        "/api/resources/R1/review",
        Some(serde_json::json!({"decision": "approve"})),
    )
    .await;

    let (status, _) = app
        .call(user(USER_A), "DELETE", "/api/resources/R1", None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .call(user(USER_A), "GET", "/api/resources/R1/reviews", None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = app
        .call(admin(), "GET", "/api/resources/R1/reviews", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}
