//! In-process router checks that never reach the database: input is rejected
//! before any query runs, so a lazy pool to nowhere is enough.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    routing::{get as get_route, post},
    Router,
};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

use venue_admin_api::services::{ChromeRenderer, LocalMediaStore};
use venue_admin_api::state::AppState;
use venue_admin_api::validation::{AddSlotTimeRequest, IdQuery, ValidJson, ValidQuery};

fn router(dir: &tempfile::TempDir) -> Router {
    let pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_secs(1))
        .connect_lazy("postgres://postgres@127.0.0.1:1/unused")
        .expect("lazy pool");
    let state = AppState::new(
        pool,
        Arc::new(LocalMediaStore::new(dir.path().join("media"), 1024)),
        Arc::new(ChromeRenderer::new(dir.path().join("reports"), "no-such-browser")),
    );
    venue_admin_api::app(state)
}

async fn call(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.expect("router response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    (status, serde_json::from_slice(&bytes).expect("json body"))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).expect("request")
}

#[tokio::test]
async fn missing_query_field_is_named() {
    let dir = tempfile::tempdir().unwrap();
    let ground = uuid::Uuid::new_v4();

    let (status, body) = call(router(&dir), get(&format!("/get-available-slots?ground={}", ground))).await;
    assert_eq!(status, StatusCode::NOT_ACCEPTABLE);
    assert_eq!(body["success"], false);
    assert_eq!(body["data"]["field"], "date");
}

#[tokio::test]
async fn reversed_event_range_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let uri = format!(
        "/available-slots-for-event?ground={}&start_date=2024-05-10&end_date=2024-05-01",
        uuid::Uuid::new_v4()
    );

    let (status, body) = call(router(&dir), get(&uri)).await;
    assert_eq!(status, StatusCode::NOT_ACCEPTABLE);
    assert_eq!(body["data"]["field"], "end_date");
}

#[tokio::test]
async fn public_listing_checks_parameters_first() {
    let dir = tempfile::tempdir().unwrap();

    let (status, body) = call(router(&dir), get("/venues?limit=-5")).await;
    assert_eq!(status, StatusCode::NOT_ACCEPTABLE);
    assert_eq!(body["data"]["field"], "limit");

    let (status, body) = call(router(&dir), get("/venues?is_active=maybe")).await;
    assert_eq!(status, StatusCode::NOT_ACCEPTABLE);
    assert_eq!(body["data"]["field"], "is_active");

    let (status, body) = call(router(&dir), get("/venues?sort_by=password")).await;
    assert_eq!(status, StatusCode::NOT_ACCEPTABLE);
    assert_eq!(body["data"]["field"], "sort_by");
}

#[tokio::test]
async fn protected_routes_answer_401_before_anything_else() {
    let dir = tempfile::tempdir().unwrap();
    let request = Request::builder()
        .method("POST")
        .uri("/add-role")
        .header("content-type", "application/json")
        .body(Body::from("{}"))
        .unwrap();

    let (status, body) = call(router(&dir), request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Missing Authorization header");
}

#[tokio::test]
async fn health_reports_unreachable_database() {
    let dir = tempfile::tempdir().unwrap();
    let (status, body) = call(router(&dir), get("/health")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["data"]["status"], "degraded");
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

/// Extractor-only routes, so protected payload types can be checked without auth or a database
fn extractor_router() -> Router {
    Router::new()
        .route("/slot", post(|ValidJson(req): ValidJson<AddSlotTimeRequest>| async move { req.slot }))
        .route("/record", get_route(|ValidQuery(q): ValidQuery<IdQuery>| async move { q.id.to_string() }))
}

fn slot_body(ground: Value) -> Value {
    let day = json!(100);
    json!({
        "city": uuid::Uuid::new_v4(),
        "venue": uuid::Uuid::new_v4(),
        "ground": ground,
        "slot": "06:00-07:00",
        "price": {
            "monday": day, "tuesday": day, "wednesday": day, "thursday": day,
            "friday": day, "saturday": day, "sunday": day
        }
    })
}

#[tokio::test]
async fn malformed_body_id_names_its_field() {
    let (status, body) = call(extractor_router(), post_json("/slot", slot_body(json!("not-a-uuid")))).await;
    assert_eq!(status, StatusCode::NOT_ACCEPTABLE);
    assert_eq!(body["data"]["field"], "ground");

    let response = extractor_router()
        .oneshot(post_json("/slot", slot_body(json!(uuid::Uuid::new_v4()))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn malformed_query_id_names_its_parameter() {
    let (status, body) = call(extractor_router(), get("/record?id=nope")).await;
    assert_eq!(status, StatusCode::NOT_ACCEPTABLE);
    assert_eq!(body["data"]["field"], "id");

    let (status, body) = call(extractor_router(), get("/record")).await;
    assert_eq!(status, StatusCode::NOT_ACCEPTABLE);
    assert_eq!(body["data"]["field"], "id");
}

#[tokio::test]
async fn malformed_public_query_values_are_named() {
    let dir = tempfile::tempdir().unwrap();

    let (status, body) = call(router(&dir), get("/get-available-slots?ground=nope&date=2024-05-01")).await;
    assert_eq!(status, StatusCode::NOT_ACCEPTABLE);
    assert_eq!(body["data"]["field"], "ground");

    let uri = format!("/get-available-slots?ground={}&date=01-05-2024", uuid::Uuid::new_v4());
    let (status, body) = call(router(&dir), get(&uri)).await;
    assert_eq!(status, StatusCode::NOT_ACCEPTABLE);
    assert_eq!(body["data"]["field"], "date");

    let (status, body) = call(router(&dir), get("/venues?id=nope")).await;
    assert_eq!(status, StatusCode::NOT_ACCEPTABLE);
    assert_eq!(body["data"]["field"], "id");
}
