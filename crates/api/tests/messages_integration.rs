//! Integration tests for ticket conversation and WhatsApp channel messages.
//!
//! These tests require a running PostgreSQL instance.

mod common;

use async_trait::async_trait;
use axum::http::{Method, StatusCode};
use bytes::Bytes;
use common::{delete_request, get_request, json_request, multipart_request, TestApp};
use domain::models::Role;
use helpdesk_api::services::{FileStore, FilesystemStore};
use serde_json::json;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Filesystem storage that refuses every write after the first `ok_writes`.
struct FailingStore {
    inner: FilesystemStore,
    ok_writes: usize,
    writes: AtomicUsize,
}

#[async_trait]
impl FileStore for FailingStore {
    async fn put(&self, key: &str, bytes: Bytes) -> io::Result<()> {
        if self.writes.fetch_add(1, Ordering::SeqCst) >= self.ok_writes {
            return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
        }
        self.inner.put(key, bytes).await
    }

    async fn open(&self, key: &str) -> io::Result<tokio::fs::File> {
        self.inner.open(key).await
    }

    async fn delete(&self, key: &str) -> io::Result<()> {
        self.inner.delete(key).await
    }
}

fn stored_files(dir: &std::path::Path) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    entries
        .flatten()
        .map(|entry| {
            let path = entry.path();
            if path.is_dir() {
                stored_files(&path)
            } else {
                1
            }
        })
        .sum()
}

// ============================================================================
// Conversation messages
// ============================================================================

#[tokio::test]
async fn test_staff_message_notifies_client_only() {
    let app = TestApp::new().await;
    let support = app.user(Role::Support).await;
    let cliente = app.user(Role::Cliente).await;
    let ticket = app
        .ticket(&support, json!({ "cliente_id": cliente.id }))
        .await;
    let before_client = app.notification_count(&cliente).await;
    let before_support = app.notification_count(&support).await;

    let (status, body) = app
        .send(json_request(
            Method::POST,
            &format!("/api/tickets/{}/messages-internal", ticket["id"]),
            json!({ "message": "We are looking into it" }),
            Some(&support.token),
        ))
        .await;

    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["message"], "We are looking into it");
    assert_eq!(body["is_internal"], false);
    assert_eq!(body["author"]["id"], support.id.to_string());
    assert_eq!(app.notification_count(&cliente).await, before_client + 1);
    assert_eq!(app.notification_count(&support).await, before_support);

    let (_, notifications) = app
        .send(get_request("/api/notifications/unread", Some(&cliente.token)))
        .await;
    let latest = &notifications["data"][0];
    assert_eq!(latest["kind"], "new_message");
    assert_eq!(latest["data"]["recipient_role"], "cliente");
    assert_eq!(latest["data"]["sender_id"], support.id.to_string());
}

#[tokio::test]
async fn test_client_message_notifies_assignee() {
    let app = TestApp::new().await;
    let support = app.user(Role::Support).await;
    let assistant = app.user(Role::Assistant).await;
    let cliente = app.user(Role::Cliente).await;
    let ticket = app
        .ticket(
            &support,
            json!({ "user_id": assistant.id, "cliente_id": cliente.id }),
        )
        .await;
    let before = app.notification_count(&assistant).await;

    let (status, _) = app
        .send(json_request(
            Method::POST,
            &format!("/api/tickets/{}/messages-internal", ticket["id"]),
            json!({ "message": "Any news?" }),
            Some(&cliente.token),
        ))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(app.notification_count(&assistant).await, before + 1);
    assert_eq!(app.notification_count(&cliente).await, 1);
}

#[tokio::test]
async fn test_internal_message_hidden_from_client_and_silent() {
    let app = TestApp::new().await;
    let support = app.user(Role::Support).await;
    let cliente = app.user(Role::Cliente).await;
    let ticket = app
        .ticket(&support, json!({ "cliente_id": cliente.id }))
        .await;
    let uri = format!("/api/tickets/{}/messages-internal", ticket["id"]);
    let before = app.notification_count(&cliente).await;

    let (status, _) = app
        .send(json_request(
            Method::POST,
            &uri,
            json!({ "message": "Customer seems confused", "is_internal": true }),
            Some(&support.token),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(app.notification_count(&cliente).await, before);

    let (_, staff_view) = app.send(get_request(&uri, Some(&support.token))).await;
    assert_eq!(staff_view.as_array().unwrap().len(), 1);

    let (status, client_view) = app.send(get_request(&uri, Some(&cliente.token))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(client_view.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_client_cannot_post_internal_message() {
    let app = TestApp::new().await;
    let cliente = app.user(Role::Cliente).await;
    let ticket = app.ticket(&cliente, json!({})).await;

    let (status, _) = app
        .send(json_request(
            Method::POST,
            &format!("/api/tickets/{}/messages-internal", ticket["id"]),
            json!({ "message": "secret", "is_internal": true }),
            Some(&cliente.token),
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_message_validation_rejects_blank_and_long_text() {
    let app = TestApp::new().await;
    let support = app.user(Role::Support).await;
    let ticket = app.ticket(&support, json!({})).await;
    let uri = format!("/api/tickets/{}/messages-internal", ticket["id"]);

    for text in ["   ".to_string(), "a".repeat(5001)] {
        let (status, _) = app
            .send(json_request(
                Method::POST,
                &uri,
                json!({ "message": text }),
                Some(&support.token),
            ))
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    let (_, listed) = app.send(get_request(&uri, Some(&support.token))).await;
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_message_with_attachment_via_multipart() {
    let app = TestApp::new().await;
    let support = app.user(Role::Support).await;
    let ticket = app.ticket(&support, json!({})).await;
    let uri = format!("/api/tickets/{}/messages-internal", ticket["id"]);

    let (status, body) = app
        .send(multipart_request(
            &uri,
            &[
                ("message", None, b"See the log"),
                ("attachments[]", Some("server.pdf"), b"%PDF-1.4 test"),
            ],
            &support.token,
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let attachment = &body["attachments"][0];
    assert_eq!(attachment["original_name"], "server.pdf");
    assert_eq!(attachment["mime_type"], "application/pdf");
    assert!(attachment.get("stored_path").is_none());

    // Ticket-level listing excludes message files.
    let (_, ticket_files) = app
        .send(get_request(
            &format!("/api/tickets/{}/attachments", ticket["id"]),
            Some(&support.token),
        ))
        .await;
    assert!(ticket_files.as_array().unwrap().is_empty());

    let (_, listed) = app.send(get_request(&uri, Some(&support.token))).await;
    assert_eq!(listed[0]["attachments"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_rejected_attachment_stores_nothing() {
    let app = TestApp::new().await;
    let support = app.user(Role::Support).await;
    let ticket = app.ticket(&support, json!({})).await;
    let uri = format!("/api/tickets/{}/messages-internal", ticket["id"]);

    let (status, _) = app
        .send(multipart_request(
            &uri,
            &[
                ("message", None, b"Run this"),
                ("attachments[]", Some("installer.exe"), b"MZ"),
            ],
            &support.token,
        ))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, listed) = app.send(get_request(&uri, Some(&support.token))).await;
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_message_permissions() {
    let app = TestApp::new().await;
    let support = app.user(Role::Support).await;
    let assistant = app.user(Role::Assistant).await;
    let ticket = app
        .ticket(&support, json!({ "user_id": assistant.id }))
        .await;
    let uri = format!("/api/tickets/{}/messages-internal", ticket["id"]);

    let (_, message) = app
        .send(json_request(
            Method::POST,
            &uri,
            json!({ "message": "from support" }),
            Some(&support.token),
        ))
        .await;
    let message_uri = format!("{}/{}", uri, message["id"]);

    let (status, _) = app
        .send(delete_request(&message_uri, Some(&assistant.token)))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(delete_request(&message_uri, Some(&support.token)))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .send(delete_request(&message_uri, Some(&support.token)))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_message_must_belong_to_ticket() {
    let app = TestApp::new().await;
    let support = app.user(Role::Support).await;
    let first = app.ticket(&support, json!({})).await;
    let second = app.ticket(&support, json!({})).await;

    let (_, message) = app
        .send(json_request(
            Method::POST,
            &format!("/api/tickets/{}/messages-internal", first["id"]),
            json!({ "message": "hello" }),
            Some(&support.token),
        ))
        .await;

    let (status, _) = app
        .send(delete_request(
            &format!(
                "/api/tickets/{}/messages-internal/{}",
                second["id"], message["id"]
            ),
            Some(&support.token),
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_failed_upload_discards_message_and_files() {
    let app = TestApp::with_state(|state| {
        let store = FailingStore {
            inner: FilesystemStore::new(state.config.uploads.storage_root.clone()),
            ok_writes: 1,
            writes: AtomicUsize::new(0),
        };
        state.with_storage(Arc::new(store))
    })
    .await;
    let support = app.user(Role::Support).await;
    let cliente = app.user(Role::Cliente).await;
    let ticket = app
        .ticket(&support, json!({ "cliente_id": cliente.id }))
        .await;
    let before_client = app.notification_count(&cliente).await;
    let uri = format!("/api/tickets/{}/messages-internal", ticket["id"]);

    let (status, _) = app
        .send(multipart_request(
            &uri,
            &[
                ("message", None, b"Two files attached"),
                ("attachments[]", Some("first.pdf"), b"%PDF-1.4 one"),
                ("attachments[]", Some("second.pdf"), b"%PDF-1.4 two"),
            ],
            &support.token,
        ))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (_, listed) = app.send(get_request(&uri, Some(&support.token))).await;
    assert!(listed.as_array().unwrap().is_empty(), "{}", listed);
    assert_eq!(stored_files(app.storage.path()), 0);
    assert_eq!(app.notification_count(&cliente).await, before_client);
}

// ============================================================================
// WhatsApp channel
// ============================================================================

#[tokio::test]
async fn test_whatsapp_send_and_list() {
    let app = TestApp::new().await;
    let support = app.user(Role::Support).await;
    let ticket = app
        .ticket(&support, json!({ "whatsapp_number": "5511999990000" }))
        .await;
    let uri = format!("/api/tickets/{}/messages", ticket["id"]);

    let (status, sent) = app
        .send(json_request(
            Method::POST,
            &uri,
            json!({ "message": "Olá, como podemos ajudar?" }),
            Some(&support.token),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sent["kind"], "enviado");

    let (status, listed) = app.send(get_request(&uri, Some(&support.token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["body"], "Olá, como podemos ajudar?");
}

#[tokio::test]
async fn test_whatsapp_requires_ticket_access() {
    let app = TestApp::new().await;
    let support = app.user(Role::Support).await;
    let stranger = app.user(Role::Cliente).await;
    let ticket = app.ticket(&support, json!({})).await;

    let (status, _) = app
        .send(get_request(
            &format!("/api/tickets/{}/messages", ticket["id"]),
            Some(&stranger.token),
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
