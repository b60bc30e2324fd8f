use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use tower::util::ServiceExt;

use super::harness::{TestHarness, header_value, sample_report};

async fn preflight(harness: &TestHarness, uri: &str, origin: Option<&str>, method: Option<&str>) -> axum::response::Response {
    let mut request = Request::builder().method("OPTIONS").uri(uri);
    if let Some(origin) = origin {
        request = request.header("origin", origin);
    }
    if let Some(method) = method {
        request = request.header("access-control-request-method", method);
    }
    harness
        .router
        .clone()
        .oneshot(request.body(Body::empty()).expect("preflight request"))
        .await
        .expect("preflight response")
}

#[tokio::test]
async fn get_preflight_echoes_origin_and_allows_range_header() {
    let harness = TestHarness::setup();
    let response = preflight(
        &harness,
        "/api/reports",
        Some("https://dashboard.example"),
        Some("GET"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        header_value(response.headers(), "access-control-allow-origin"),
        Some("https://dashboard.example")
    );
    assert_eq!(
        header_value(response.headers(), "access-control-allow-methods"),
        Some("GET")
    );
    assert_eq!(
        header_value(response.headers(), "access-control-allow-headers"),
        Some("range")
    );
}

#[tokio::test]
async fn post_preflight_allows_content_type() {
    let harness = TestHarness::setup();
    let response = preflight(
        &harness,
        "/api/reports",
        Some("https://dashboard.example"),
        Some("POST"),
    )
    .await;

    assert_eq!(
        header_value(response.headers(), "access-control-allow-methods"),
        Some("POST")
    );
    assert_eq!(
        header_value(response.headers(), "access-control-allow-headers"),
        Some("content-type")
    );
}

#[tokio::test]
async fn missing_origin_falls_back_to_the_configured_host() {
    let harness = TestHarness::setup();
    let response = preflight(&harness, "/api/plugins", None, Some("GET")).await;

    assert_eq!(
        header_value(response.headers(), "access-control-allow-origin"),
        Some("http://localhost")
    );
}

#[tokio::test]
async fn unknown_path_preflight_is_permissive() {
    let harness = TestHarness::setup();
    let response = preflight(&harness, "/api/anything/else", Some("https://x"), None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        header_value(response.headers(), "access-control-allow-origin"),
        Some("*")
    );
    assert_eq!(
        header_value(response.headers(), "access-control-expose-headers"),
        Some("Content-Range")
    );
}

#[tokio::test]
async fn list_responses_carry_cors_headers() {
    let harness = TestHarness::setup();
    harness.upload(&sample_report("P1", "1.0", 1000)).await;

    let response = harness
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/reports")
                .header("origin", "https://dashboard.example")
                .body(Body::empty())
                .expect("list request"),
        )
        .await
        .expect("list response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        header_value(response.headers(), "access-control-allow-origin"),
        Some("https://dashboard.example")
    );
    assert_eq!(
        header_value(response.headers(), "access-control-expose-headers"),
        Some("Content-Range")
    );
}
