#![allow(
    clippy::unwrap_used,
    clippy::panic,
    clippy::todo,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    missing_debug_implementations,
    clippy::cast_precision_loss,
    clippy::clone_on_ref_ptr,
    clippy::match_same_arms,
    clippy::items_after_statements,
    unreachable_pub,
    clippy::print_stdout,
    clippy::similar_names
)]
mod common;

use axum::http::StatusCode;
use common::TestApp;
use std::time::Duration;
use uuid::Uuid;

#[tokio::test]
async fn test_start_conversation_creates_then_returns_existing() {
    let app = TestApp::spawn().await;
    let mentor = common::unique_id("mentor");
    let student = common::unique_id("student");
    let token = app.mint_token(&mentor);

    let resp = app.start_conversation(&token, &mentor, &student).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let created: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(created["mentorId"], mentor);
    assert_eq!(created["studentId"], student);
    assert_eq!(created["isActive"], true);
    assert_eq!(created["messages"], serde_json::json!([]));

    // Same pair again resolves to the same conversation
    let resp = app.start_conversation(&token, &mentor, &student).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let existing: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(existing["id"], created["id"]);
}

#[tokio::test]
async fn test_start_conversation_pair_is_unordered() {
    let app = TestApp::spawn().await;
    let mentor = common::unique_id("mentor");
    let student = common::unique_id("student");
    let token = app.mint_token(&mentor);

    let resp = app.start_conversation(&token, &mentor, &student).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let first: serde_json::Value = resp.json().await.unwrap();

    // Swapping the roles must not open a second channel for the pair
    let resp = app.start_conversation(&token, &student, &mentor).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let second: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(second["id"], first["id"]);
}

#[tokio::test]
async fn test_start_conversation_concurrent_requests_converge() {
    let app = TestApp::spawn().await;
    let mentor = common::unique_id("mentor");
    let student = common::unique_id("student");
    let token = app.mint_token(&mentor);

    let (a, b) = tokio::join!(
        app.start_conversation(&token, &mentor, &student),
        app.start_conversation(&token, &mentor, &student)
    );

    let status_a = a.status();
    let status_b = b.status();
    let body_a: serde_json::Value = a.json().await.unwrap();
    let body_b: serde_json::Value = b.json().await.unwrap();

    assert_eq!(body_a["id"], body_b["id"], "Racing starts must converge on one conversation");
    assert!(
        status_a == StatusCode::CREATED || status_b == StatusCode::CREATED,
        "One of the racing requests should have created the row"
    );

    let resp = app.list_conversations(&token, &mentor).await;
    let list: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_start_conversation_missing_participant() {
    let app = TestApp::spawn().await;
    let mentor = common::unique_id("mentor");
    let token = app.mint_token(&mentor);

    let resp = app
        .client
        .post(format!("{}/v1/conversations", app.server_url))
        .header("Authorization", format!("Bearer {token}"))
        .json(&serde_json::json!({ "mentorId": mentor }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "studentId is required");
}

#[tokio::test]
async fn test_list_conversations_most_recent_first() {
    let app = TestApp::spawn().await;
    let mentor = common::unique_id("mentor");
    let student_a = common::unique_id("student_a");
    let student_b = common::unique_id("student_b");
    let token = app.mint_token(&mentor);

    let resp = app.start_conversation(&token, &mentor, &student_a).await;
    let convo_a: serde_json::Value = resp.json().await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    let resp = app.start_conversation(&token, &mentor, &student_b).await;
    let convo_b: serde_json::Value = resp.json().await.unwrap();

    // A message in the older conversation moves it back to the top
    let resp = app.send_message(&token, convo_a["id"].as_str().unwrap(), &mentor, "hello").await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = app.list_conversations(&token, &mentor).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let list: serde_json::Value = resp.json().await.unwrap();
    let list = list.as_array().unwrap();

    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["id"], convo_a["id"]);
    assert_eq!(list[1]["id"], convo_b["id"]);
    assert!(list[0].get("messages").is_none(), "Listing must not inline message history");
}

#[tokio::test]
async fn test_list_conversations_unknown_user_is_empty() {
    let app = TestApp::spawn().await;
    let nobody = common::unique_id("nobody");
    let token = app.mint_token(&nobody);

    let resp = app.list_conversations(&token, &nobody).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let list: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(list, serde_json::json!([]));
}

#[tokio::test]
async fn test_get_conversation_not_found() {
    let app = TestApp::spawn().await;
    let token = app.mint_token(&common::unique_id("reader"));

    let resp = app.get_conversation(&token, &Uuid::new_v4().to_string()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Not found");
}

#[tokio::test]
async fn test_message_history_preserves_send_order() {
    let app = TestApp::spawn().await;
    let mentor = common::unique_id("mentor");
    let student = common::unique_id("student");
    let token = app.mint_token(&mentor);

    let resp = app.start_conversation(&token, &mentor, &student).await;
    let convo: serde_json::Value = resp.json().await.unwrap();
    let convo_id = convo["id"].as_str().unwrap();

    for content in ["first", "second", "third"] {
        let resp = app.send_message(&token, convo_id, &mentor, content).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let resp = app.get_conversation(&token, convo_id).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = resp.json().await.unwrap();
    let messages = body["messages"].as_array().unwrap();

    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0]["content"], "first");
    assert_eq!(messages[1]["content"], "second");
    assert_eq!(messages[2]["content"], "third");
    assert!(messages.iter().all(|m| m["sender"] == mentor));
}

#[tokio::test]
async fn test_send_message_redacts_contact_info() {
    let app = TestApp::spawn().await;
    let mentor = common::unique_id("mentor");
    let student = common::unique_id("student");
    let token = app.mint_token(&mentor);

    let resp = app.start_conversation(&token, &mentor, &student).await;
    let convo: serde_json::Value = resp.json().await.unwrap();
    let convo_id = convo["id"].as_str().unwrap();

    let resp = app.send_message(&token, convo_id, &mentor, "contact me at a@b.com").await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: serde_json::Value = resp.json().await.unwrap();
    let message = &body["messages"].as_array().unwrap()[0];
    assert_eq!(message["content"], "contact me at [EMAIL REDACTED]");
    assert_eq!(message["wasRedacted"], true);

    let resp = app.send_message(&token, convo_id, &student, "call 555-123-4567").await;
    let body: serde_json::Value = resp.json().await.unwrap();
    let message = &body["messages"].as_array().unwrap()[1];
    assert_eq!(message["content"], "call [PHONE NUMBER REDACTED]");
    assert_eq!(message["wasRedacted"], true);

    let resp = app.send_message(&token, convo_id, &mentor, "see you at the career fair").await;
    let body: serde_json::Value = resp.json().await.unwrap();
    let message = &body["messages"].as_array().unwrap()[2];
    assert_eq!(message["content"], "see you at the career fair");
    assert_eq!(message["wasRedacted"], false);
}

#[tokio::test]
async fn test_send_message_rejects_non_participant() {
    let app = TestApp::spawn().await;
    let mentor = common::unique_id("mentor");
    let student = common::unique_id("student");
    let outsider = common::unique_id("outsider");
    let token = app.mint_token(&mentor);

    let resp = app.start_conversation(&token, &mentor, &student).await;
    let convo: serde_json::Value = resp.json().await.unwrap();
    let convo_id = convo["id"].as_str().unwrap();

    let resp = app.send_message(&token, convo_id, &outsider, "let me in").await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Not a participant of this conversation");

    // The rejected message must not appear in the history
    let resp = app.get_conversation(&token, convo_id).await;
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["messages"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_send_message_requires_content() {
    let app = TestApp::spawn().await;
    let mentor = common::unique_id("mentor");
    let student = common::unique_id("student");
    let token = app.mint_token(&mentor);

    let resp = app.start_conversation(&token, &mentor, &student).await;
    let convo: serde_json::Value = resp.json().await.unwrap();
    let convo_id = convo["id"].as_str().unwrap();

    let resp = app
        .client
        .post(format!("{}/v1/conversations/{}/messages", app.server_url, convo_id))
        .header("Authorization", format!("Bearer {token}"))
        .json(&serde_json::json!({ "senderId": mentor }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app.send_message(&token, convo_id, &mentor, "   ").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "content is required");
}

#[tokio::test]
async fn test_send_message_conversation_not_found() {
    let app = TestApp::spawn().await;
    let sender = common::unique_id("sender");
    let token = app.mint_token(&sender);

    let resp = app.send_message(&token, &Uuid::new_v4().to_string(), &sender, "anyone there?").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_requests_require_bearer_token() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .post(format!("{}/v1/conversations", app.server_url))
        .json(&serde_json::json!({ "mentorId": "m", "studentId": "s" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app
        .client
        .get(format!("{}/v1/conversations/user/anyone", app.server_url))
        .header("Authorization", "Bearer not-a-real-token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
