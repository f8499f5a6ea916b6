// ============================================================================
// Real-Time Channel Tests
// ============================================================================
//
// Drives the WebSocket listener with real client connections:
// - presence announce/dedup/disconnect semantics
// - room-scoped typing and message relays, sender excluded
// - REST sends mirrored to room subscribers
//
// ============================================================================

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use serial_test::serial;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{
    connect_async, tungstenite::Message as WsMessage, MaybeTlsStream, WebSocketStream,
};

use test_utils::{spawn_app, token};

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect(addr: &str) -> WsClient {
    let (stream, _) = connect_async(format!("ws://{}", addr)).await.unwrap();
    stream
}

async fn emit(client: &mut WsClient, event: Value) {
    client
        .send(WsMessage::Text(event.to_string()))
        .await
        .unwrap();
}

async fn next_event(client: &mut WsClient) -> Value {
    loop {
        let frame = timeout(Duration::from_secs(2), client.next())
            .await
            .expect("timed out waiting for event")
            .expect("stream closed")
            .expect("websocket error");
        if let WsMessage::Text(text) = frame {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

/// Reads events until one with the given name arrives.
async fn wait_for(client: &mut WsClient, name: &str) -> Value {
    for _ in 0..10 {
        let event = next_event(client).await;
        if event["event"] == json!(name) {
            return event;
        }
    }
    panic!("event {} never arrived", name);
}

async fn assert_silent(client: &mut WsClient, millis: u64) {
    let result = timeout(Duration::from_millis(millis), client.next()).await;
    assert!(result.is_err(), "expected silence, got {:?}", result);
}

#[tokio::test]
#[serial]
async fn announce_broadcasts_online_list_without_duplicates() {
    let app = spawn_app().await;

    let mut first = connect(&app.ws_address).await;
    emit(&mut first, json!({"event": "user_online", "data": "u1"})).await;
    let event = wait_for(&mut first, "users_online").await;
    assert_eq!(event["data"], json!(["u1"]));

    // A second browser session for the same user: still exactly one entry.
    let mut second = connect(&app.ws_address).await;
    emit(&mut second, json!({"event": "user_online", "data": "u1"})).await;
    let event = wait_for(&mut second, "users_online").await;
    assert_eq!(event["data"], json!(["u1"]));
    let event = wait_for(&mut first, "users_online").await;
    assert_eq!(event["data"], json!(["u1"]));
}

#[tokio::test]
#[serial]
async fn closing_a_stale_session_keeps_the_user_online() {
    let app = spawn_app().await;

    let mut old_session = connect(&app.ws_address).await;
    emit(&mut old_session, json!({"event": "user_online", "data": "u1"})).await;
    wait_for(&mut old_session, "users_online").await;

    let mut new_session = connect(&app.ws_address).await;
    emit(&mut new_session, json!({"event": "user_online", "data": "u1"})).await;
    wait_for(&mut new_session, "users_online").await;

    old_session.close(None).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // A third user announcing triggers a fresh broadcast; u1 must still be
    // present because the newer session owns the presence entry.
    let mut observer = connect(&app.ws_address).await;
    emit(&mut observer, json!({"event": "user_online", "data": "u2"})).await;
    let event = wait_for(&mut observer, "users_online").await;
    let mut online: Vec<String> = event["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect();
    online.sort();
    assert_eq!(online, vec!["u1".to_string(), "u2".to_string()]);
}

#[tokio::test]
#[serial]
async fn typing_relays_to_other_room_members_only() {
    let app = spawn_app().await;

    let mut typist = connect(&app.ws_address).await;
    let mut peer = connect(&app.ws_address).await;
    let mut outsider = connect(&app.ws_address).await;

    emit(&mut typist, json!({"event": "join_conversation", "data": "c1"})).await;
    emit(&mut peer, json!({"event": "join_conversation", "data": "c1"})).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    emit(
        &mut typist,
        json!({"event": "typing", "data": {"conversationId": "c1"}}),
    )
    .await;

    let event = wait_for(&mut peer, "user_typing").await;
    assert_eq!(event["data"]["conversationId"], json!("c1"));

    // No echo to the typist, nothing for connections outside the room.
    assert_silent(&mut typist, 300).await;
    assert_silent(&mut outsider, 300).await;

    emit(
        &mut typist,
        json!({"event": "stop_typing", "data": {"conversationId": "c1"}}),
    )
    .await;
    let event = wait_for(&mut peer, "user_stop_typing").await;
    assert_eq!(event["data"]["conversationId"], json!("c1"));
}

#[tokio::test]
#[serial]
async fn ws_message_relay_excludes_the_sender() {
    let app = spawn_app().await;

    let mut sender = connect(&app.ws_address).await;
    let mut peer = connect(&app.ws_address).await;

    emit(&mut sender, json!({"event": "join_conversation", "data": "c9"})).await;
    emit(&mut peer, json!({"event": "join_conversation", "data": "c9"})).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    emit(
        &mut sender,
        json!({
            "event": "send_message",
            "data": {"conversationId": "c9", "message": {"text": "yo"}},
        }),
    )
    .await;

    let event = wait_for(&mut peer, "new_message").await;
    assert_eq!(event["data"]["conversationId"], json!("c9"));
    assert_eq!(event["data"]["message"]["text"], json!("yo"));

    assert_silent(&mut sender, 300).await;
}

#[tokio::test]
#[serial]
async fn rest_send_is_mirrored_to_room_subscribers() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let alice = app.seed_user("Alice").await;
    let bob = app.seed_user("Bob").await;
    let created = app.create_conversation(&client, &alice, &bob, None).await;
    let conversation_id = created["conversation"]["id"].as_str().unwrap().to_string();

    // Bob has the chat window open: announced and subscribed to the room.
    let mut bob_session = connect(&app.ws_address).await;
    emit(
        &mut bob_session,
        json!({"event": "user_online", "data": bob.clone()}),
    )
    .await;
    wait_for(&mut bob_session, "users_online").await;
    emit(
        &mut bob_session,
        json!({"event": "join_conversation", "data": conversation_id.clone()}),
    )
    .await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let response = client
        .post(format!(
            "http://{}/api/v1/messages/{}",
            app.address, conversation_id
        ))
        .bearer_auth(token(&alice))
        .json(&json!({"text": "Hi"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::CREATED);

    let event = wait_for(&mut bob_session, "new_message").await;
    assert_eq!(event["data"]["conversationId"], json!(conversation_id));
    assert_eq!(event["data"]["message"]["text"], json!("Hi"));
    assert_eq!(event["data"]["message"]["sender"]["name"], json!("Alice"));
}
