// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP-level tests of the Gmail adapter against a mock Gmail API.

use base64::Engine;
use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use pressdesk_config::model::{DeliveryConfig, FilterConfig, GmailConfig};
use pressdesk_core::{MailboxAdapter, OutboundEmail, PressdeskError, Provider};
use pressdesk_gmail::GmailMailbox;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gmail_config(server: &MockServer) -> GmailConfig {
    GmailConfig {
        label: "PR/Requests".into(),
        client_id: Some("client-id".into()),
        client_secret: Some("client-secret".into()),
        refresh_token: Some("refresh-token".into()),
        api_base: server.uri(),
        token_url: format!("{}/token", server.uri()),
        ..GmailConfig::default()
    }
}

fn mailbox(server: &MockServer) -> GmailMailbox {
    mailbox_with(server, FilterConfig::default(), DeliveryConfig::default())
}

fn mailbox_with(server: &MockServer, filter: FilterConfig, delivery: DeliveryConfig) -> GmailMailbox {
    GmailMailbox::new(&gmail_config(server), &filter, &delivery).unwrap()
}

async fn mount_token(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "access-1",
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

async fn mount_labels(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/users/me/labels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "labels": [
                {"id": "INBOX", "name": "INBOX"},
                {"id": "Label_7", "name": "PR/Requests"}
            ]
        })))
        .mount(server)
        .await;
}

async fn mount_listing(server: &MockServer, ids: &[&str]) {
    let messages: Vec<_> = ids
        .iter()
        .map(|id| serde_json::json!({"id": id, "threadId": format!("t-{id}")}))
        .collect();
    Mock::given(method("GET"))
        .and(path("/users/me/messages"))
        .and(query_param("labelIds", "Label_7"))
        .and(query_param("q", "is:unread"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"messages": messages})),
        )
        .mount(server)
        .await;
}

async fn mount_message(server: &MockServer, id: &str, headers: serde_json::Value, body: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/users/me/messages/{id}")))
        .and(query_param("format", "full"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": id,
            "threadId": format!("t-{id}"),
            "internalDate": "1767225600000",
            "payload": {
                "mimeType": "multipart/alternative",
                "headers": headers,
                "parts": [
                    {"mimeType": "text/plain", "body": {"data": URL_SAFE_NO_PAD.encode(body)}},
                    {"mimeType": "text/html", "body": {"data": URL_SAFE_NO_PAD.encode("<p>html</p>")}}
                ]
            }
        })))
        .mount(server)
        .await;
}

fn reply() -> OutboundEmail {
    OutboundEmail {
        to: "jo@outlet.example".into(),
        subject: "Quote request".into(),
        body: "Glad to help.".into(),
        thread_id: Some("t-g1".into()),
        in_reply_to: Some("<g1@outlet.example>".into()),
    }
}

#[tokio::test]
async fn lists_and_parses_labeled_messages() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    mount_labels(&server).await;
    mount_listing(&server, &["g1"]).await;
    mount_message(
        &server,
        "g1",
        serde_json::json!([
            {"name": "From", "value": "Jo Editor <jo@outlet.example>"},
            {"name": "Subject", "value": "Quote request"},
            {"name": "Message-ID", "value": "<g1@outlet.example>"}
        ]),
        "Deadline: Friday\nTwo sentences on hiring.",
    )
    .await;

    let mailbox = mailbox(&server);
    let first = mailbox.list_new_labeled_messages().await.unwrap();
    // Second poll reuses the cached token and label id.
    let second = mailbox.list_new_labeled_messages().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.len(), 1);
    let raw = &first[0];
    assert_eq!(raw.source_id, "g1");
    assert_eq!(raw.mailbox_message_id, "g1");
    assert_eq!(raw.provider, Provider::Generic);
    assert_eq!(raw.sender_email, "jo@outlet.example");
    assert_eq!(raw.thread_id, "t-g1");
    assert_eq!(raw.message_id.as_deref(), Some("<g1@outlet.example>"));
    assert_eq!(raw.deadline.as_deref(), Some("Friday"));
}

#[tokio::test]
async fn requests_carry_bearer_token() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/users/me/labels"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "labels": [{"id": "Label_7", "name": "PR/Requests"}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_listing(&server, &[]).await;

    let messages = mailbox(&server).list_new_labeled_messages().await.unwrap();
    assert!(messages.is_empty());
}

#[tokio::test]
async fn fully_filtered_digest_is_marked_read() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    mount_labels(&server).await;
    mount_listing(&server, &["d1"]).await;
    mount_message(
        &server,
        "d1",
        serde_json::json!([
            {"name": "From", "value": "HARO <haro@helpareporter.com>"},
            {"name": "Subject", "value": "[HARO] Tuesday"}
        ]),
        "1) Summary: Dog grooming tips\nName: Lee\nCategory: Lifestyle\nEmail: q-1@helpareporter.com\nMedia Outlet: Pet Life\nDeadline: Today\n\nQuery:\n\nBest grooming tip?\n",
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/users/me/messages/d1/modify"))
        .and(body_partial_json(serde_json::json!({"removeLabelIds": ["UNREAD"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "d1"})))
        .expect(1)
        .mount(&server)
        .await;

    let filter = FilterConfig {
        include_keywords: vec!["fintech".into()],
        ..FilterConfig::default()
    };
    let mailbox = mailbox_with(&server, filter, DeliveryConfig::default());
    let messages = mailbox.list_new_labeled_messages().await.unwrap();
    assert!(messages.is_empty());
}

#[tokio::test]
async fn missing_label_is_a_config_error() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/users/me/labels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"labels": []})))
        .mount(&server)
        .await;

    let err = mailbox(&server).list_new_labeled_messages().await.unwrap_err();
    assert!(matches!(err, PressdeskError::Config(_)), "got: {err}");
}

#[tokio::test]
async fn unauthorized_listing_is_auth_error() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/users/me/labels"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": {"code": 401, "message": "Invalid Credentials", "status": "UNAUTHENTICATED"}
        })))
        .mount(&server)
        .await;

    let err = mailbox(&server).list_new_labeled_messages().await.unwrap_err();
    assert!(matches!(err, PressdeskError::Auth { .. }), "got: {err}");
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn revoked_refresh_token_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "Token has been expired or revoked."
        })))
        .mount(&server)
        .await;

    let err = mailbox(&server).list_new_labeled_messages().await.unwrap_err();
    assert!(matches!(err, PressdeskError::Auth { .. }), "got: {err}");
    assert!(err.to_string().contains("invalid_grant"), "got: {err}");
}

#[tokio::test]
async fn server_error_on_send_is_transient() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/users/me/messages/send"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let delivery = DeliveryConfig {
        from_address: Some("press@company.example".into()),
        ..DeliveryConfig::default()
    };
    let mailbox = mailbox_with(&server, FilterConfig::default(), delivery);
    let err = mailbox.send(&reply()).await.unwrap_err();
    assert!(err.is_retryable(), "got: {err}");
}

#[tokio::test]
async fn send_posts_threaded_reply() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/users/me/messages/send"))
        .and(body_partial_json(serde_json::json!({"threadId": "t-g1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "out-1",
            "threadId": "t-g1",
            "labelIds": ["SENT"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let delivery = DeliveryConfig {
        from_address: Some("press@company.example".into()),
        ..DeliveryConfig::default()
    };
    let mailbox = mailbox_with(&server, FilterConfig::default(), delivery);
    let sent = mailbox.send(&reply()).await.unwrap();
    assert_eq!(sent.outbound_message_id, "out-1");
    assert_eq!(sent.thread_id, "t-g1");

    let requests = server.received_requests().await.unwrap();
    let send = requests
        .iter()
        .find(|r| r.url.path() == "/users/me/messages/send")
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&send.body).unwrap();
    let raw = URL_SAFE.decode(body["raw"].as_str().unwrap()).unwrap();
    let raw = String::from_utf8(raw).unwrap();
    assert!(raw.contains("From: press@company.example"), "{raw}");
    assert!(raw.contains("Subject: Re: Quote request"), "{raw}");
    assert!(raw.contains("In-Reply-To: <g1@outlet.example>"), "{raw}");
}

#[tokio::test]
async fn send_defaults_to_account_address() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/users/me/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "emailAddress": "owner@company.example",
            "messagesTotal": 10
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/users/me/messages/send"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "out-2",
            "threadId": "t-g1"
        })))
        .mount(&server)
        .await;

    let mailbox = mailbox(&server);
    mailbox.send(&reply()).await.unwrap();
    mailbox.send(&reply()).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let send = requests
        .iter()
        .find(|r| r.url.path() == "/users/me/messages/send")
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&send.body).unwrap();
    let raw = String::from_utf8(URL_SAFE.decode(body["raw"].as_str().unwrap()).unwrap()).unwrap();
    assert!(raw.contains("From: owner@company.example"), "{raw}");
}
