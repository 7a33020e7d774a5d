//! Integration tests for the activity log listing.
//!
//! Entries are written in the background, so assertions poll briefly.
//! These tests require a running PostgreSQL instance.

mod common;

use axum::http::{Method, StatusCode};
use common::{get_request, json_request, TestApp, TestUser};
use domain::models::Role;
use serde_json::{json, Value};
use std::time::Duration;

/// Polls `uri` until the page holds at least `min` entries.
async fn wait_for_logs(app: &TestApp, user: &TestUser, uri: &str, min: usize) -> Value {
    let mut body = Value::Null;
    for _ in 0..50 {
        let (status, page) = app.send(get_request(uri, Some(&user.token))).await;
        assert_eq!(status, StatusCode::OK, "{}", page);
        body = page;
        if body["data"].as_array().map_or(0, Vec::len) >= min {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    body
}

fn actions(page: &Value) -> Vec<String> {
    page["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["action"].as_str().map(str::to_string))
        .collect()
}

#[tokio::test]
async fn test_ticket_lifecycle_is_logged() {
    let app = TestApp::new().await;
    let support = app.user(Role::Support).await;
    let ticket = app.ticket(&support, json!({})).await;

    let (status, _) = app
        .send(json_request(
            Method::PUT,
            &format!("/api/tickets/{}", ticket["id"]),
            json!({ "status": "resolvido" }),
            Some(&support.token),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let uri = format!("/api/tickets/{}/activity-logs", ticket["id"]);
    let page = wait_for_logs(&app, &support, &uri, 4).await;
    let actions = actions(&page);

    // created + assigned on creation, updated + status_changed on resolve
    assert!(actions.contains(&"created".to_string()), "{:?}", actions);
    assert!(actions.contains(&"assigned".to_string()), "{:?}", actions);
    assert!(actions.contains(&"updated".to_string()), "{:?}", actions);
    assert!(actions.contains(&"status_changed".to_string()), "{:?}", actions);

    let entry = &page["data"][0];
    assert_eq!(entry["model_type"], "ticket");
    assert_eq!(entry["model_id"], ticket["id"].to_string());
    assert_eq!(entry["user_id"], support.id.to_string());
    assert!(entry["metadata"]["request_id"].is_string());
}

#[tokio::test]
async fn test_ticket_logs_require_ticket_access() {
    let app = TestApp::new().await;
    let support = app.user(Role::Support).await;
    let outsider = app.user(Role::Cliente).await;
    let ticket = app.ticket(&support, json!({})).await;

    let (status, _) = app
        .send(get_request(
            &format!("/api/tickets/{}/activity-logs", ticket["id"]),
            Some(&outsider.token),
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_client_sees_only_own_entries() {
    let app = TestApp::new().await;
    let support = app.user(Role::Support).await;
    let cliente = app.user(Role::Cliente).await;
    app.ticket(&cliente, json!({})).await;
    app.ticket(&support, json!({})).await;

    let page = wait_for_logs(&app, &cliente, "/api/activity-logs?period=day", 1).await;
    let entries = page["data"].as_array().unwrap();
    assert!(!entries.is_empty());
    assert!(entries
        .iter()
        .all(|e| e["user_id"] == cliente.id.to_string()));

    // Asking for somebody else's entries is narrowed back to the caller.
    let uri = format!("/api/activity-logs?user_id={}", support.id);
    let (_, page) = app.send(get_request(&uri, Some(&cliente.token))).await;
    assert!(page["data"]
        .as_array()
        .unwrap()
        .iter()
        .all(|e| e["user_id"] == cliente.id.to_string()));
}

#[tokio::test]
async fn test_filters_by_user_and_action() {
    let app = TestApp::new().await;
    let admin = app.user(Role::Admin).await;
    let support = app.user(Role::Support).await;
    app.ticket(&support, json!({})).await;

    let uri = format!(
        "/api/activity-logs?user_id={}&action=created&model_type=ticket",
        support.id
    );
    let page = wait_for_logs(&app, &admin, &uri, 1).await;

    assert_eq!(page["total"], 1);
    assert_eq!(page["data"][0]["action"], "created");
    assert_eq!(page["data"][0]["user_id"], support.id.to_string());
}

#[tokio::test]
async fn test_date_range_excludes_other_days() {
    let app = TestApp::new().await;
    let admin = app.user(Role::Admin).await;
    let support = app.user(Role::Support).await;
    app.ticket(&support, json!({})).await;
    wait_for_logs(
        &app,
        &admin,
        &format!("/api/activity-logs?user_id={}", support.id),
        1,
    )
    .await;

    let uri = format!(
        "/api/activity-logs?user_id={}&from=2001-01-01&to=2001-01-31",
        support.id
    );
    let (status, page) = app.send(get_request(&uri, Some(&admin.token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 0);
}

#[tokio::test]
async fn test_activity_log_pagination_caps_per_page() {
    let app = TestApp::new().await;
    let admin = app.user(Role::Admin).await;

    let (status, page) = app
        .send(get_request("/api/activity-logs?per_page=500", Some(&admin.token)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["per_page"], 100);
}

#[tokio::test]
async fn test_message_activity_is_logged() {
    let app = TestApp::new().await;
    let support = app.user(Role::Support).await;
    let admin = app.user(Role::Admin).await;
    let ticket = app.ticket(&support, json!({})).await;

    let (status, _) = app
        .send(json_request(
            Method::POST,
            &format!("/api/tickets/{}/messages-internal", ticket["id"]),
            json!({ "message": "Checked the logs" }),
            Some(&support.token),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let uri = format!(
        "/api/activity-logs?user_id={}&model_type=ticket_message",
        support.id
    );
    let page = wait_for_logs(&app, &admin, &uri, 1).await;
    assert_eq!(page["data"][0]["action"], "created");
}
