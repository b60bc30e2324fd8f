use axum::http::StatusCode;
use serde_json::Value;

use super::harness::{TestHarness, decode_json, encode_param, header_value};

fn report_with_scripts() -> String {
    serde_json::json!({
        "Plugin": "P1",
        "Version": "1.0",
        "Title": "nightly",
        "Runtime": { "Start": 1000, "Finish": 1010 },
        "Data": [
            { "Name": "cpu-load", "Version": "1.0", "Author": "QA", "Category": "perf" },
            { "Name": "battery-drain", "Version": "1.0", "Author": "HW", "Category": "power" },
            { "Name": "ac-adapter", "Version": "2.0", "Author": "HW", "Category": "power" },
        ],
        "ScriptList": ["cpu-load", "battery-drain", "ac-adapter"],
    })
    .to_string()
}

#[tokio::test]
async fn every_script_in_a_report_is_registered() {
    let harness = TestHarness::setup();
    let upload = harness.upload(&report_with_scripts()).await;
    let payload: Value = decode_json(upload).await;
    let report_id = payload["data"]["id"].as_str().expect("id").to_string();

    let response = harness.get("/api/scripts").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        header_value(response.headers(), "content-range"),
        Some("scripts 0-9/3")
    );

    let body: Vec<Value> = decode_json(response).await;
    assert_eq!(body.len(), 3);
    for script in &body {
        assert_eq!(script["ids"], serde_json::json!([report_id]));
    }

    // Default listing order is by name.
    let names: Vec<&str> = body
        .iter()
        .map(|script| script["Name"].as_str().expect("Name"))
        .collect();
    assert_eq!(names, vec!["ac-adapter", "battery-drain", "cpu-load"]);
}

#[tokio::test]
async fn free_text_filter_searches_name_author_and_category() {
    let harness = TestHarness::setup();
    harness.upload(&report_with_scripts()).await;

    let response = harness
        .get(&format!(
            "/api/scripts?filter={}",
            encode_param(r#"{"q":"power"}"#)
        ))
        .await;
    let body: Vec<Value> = decode_json(response).await;
    assert_eq!(body.len(), 2);

    let response = harness
        .get(&format!(
            "/api/scripts?filter={}",
            encode_param(r#"{"q":"qa"}"#)
        ))
        .await;
    let body: Vec<Value> = decode_json(response).await;
    assert_eq!(body.len(), 1);
    assert_eq!(body[0]["Name"], "cpu-load");
}

#[tokio::test]
async fn show_returns_a_script_by_external_id() {
    let harness = TestHarness::setup();
    harness.upload(&report_with_scripts()).await;

    let listing = harness.get("/api/scripts").await;
    let body: Vec<Value> = decode_json(listing).await;
    let id = body[0]["id"].as_str().expect("script id").to_string();

    let response = harness.get(&format!("/api/scripts/{id}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let script: Value = decode_json(response).await;
    assert_eq!(script["id"], id.as_str());
    assert_eq!(script["Name"], "ac-adapter");
}

#[tokio::test]
async fn show_unknown_script_returns_null_body() {
    let harness = TestHarness::setup();
    let response = harness
        .get("/api/scripts/0123456789abcdef01234567")
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = decode_json(response).await;
    assert!(body.is_null());
}
