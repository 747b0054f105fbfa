use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use jsonwebtoken::Algorithm;
use serde_json::{Value, json};
use tower::util::ServiceExt;

use parley_api::password::hash_password;
use parley_api::state::{AppState, AppStateInner};
use parley_gateway::RoomRegistry;
use parley_store::{ConversationStore, UserRecord, UserStore};
use parley_types::events::RoomEvent;

const SECRET: &str = "endpoint-test-secret-key";

fn test_state() -> AppState {
    let users = UserStore::new(["admin", "aasim", "dummy"].map(|username| UserRecord {
        username: username.to_string(),
        password_hash: hash_password("123").unwrap(),
    }));
    Arc::new(AppStateInner {
        users,
        conversations: Arc::new(ConversationStore::new()),
        registry: RoomRegistry::new(),
        assistant: None,
        secret_key: SECRET.to_string(),
        algorithm: Algorithm::HS256,
        token_ttl_minutes: 60,
    })
}

fn app() -> (Router, AppState) {
    let state = test_state();
    (parley_api::routes(state.clone()), state)
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn login(app: &Router, username: &str, password: &str) -> String {
    let req = Request::builder()
        .method("POST")
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!(
            "username={username}&password={password}"
        )))
        .unwrap();
    let (status, body) = send(app, req).await;
    assert_eq!(status, StatusCode::OK);
    body["access_token"].as_str().unwrap().to_string()
}

fn get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, token: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn create_conversation(app: &Router, token: &str, title: &str, participants: &[&str]) -> Value {
    let (status, body) = send(
        app,
        post_json(
            "/conversations/",
            token,
            &json!({ "title": title, "participant_ids": participants }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

#[tokio::test]
async fn login_issues_bearer_token() {
    let (app, _) = app();
    let req = Request::builder()
        .method("POST")
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("username=admin&password=123"))
        .unwrap();
    let (status, body) = send(&app, req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");
    assert!(!body["access_token"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn login_rejects_bad_credentials() {
    let (app, _) = app();
    for body in ["username=admin&password=wrong", "username=ghost&password=123"] {
        let req = Request::builder()
            .method("POST")
            .uri("/login")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn protected_route_requires_valid_token() {
    let (app, _) = app();

    let bare = Request::builder()
        .method("GET")
        .uri("/protected-route")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, bare).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, get("/protected-route", "not-a-token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = login(&app, "admin", "123").await;
    let (status, body) = send(&app, get("/protected-route", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("admin"));
}

#[tokio::test]
async fn conversation_defaults_to_creator_as_sole_participant() {
    let (app, _) = app();
    let token = login(&app, "admin", "123").await;

    let conversation = create_conversation(&app, &token, "t", &[]).await;
    assert_eq!(conversation["id"], 1);
    assert_eq!(conversation["participants"], json!(["admin"]));
    assert_eq!(conversation["messages"], json!([]));
}

#[tokio::test]
async fn known_participants_are_added_once_and_unknowns_dropped() {
    let (app, _) = app();
    let token = login(&app, "admin", "123").await;

    let conversation =
        create_conversation(&app, &token, "group", &["dummy", "ghost", "dummy"]).await;
    assert_eq!(conversation["participants"], json!(["admin", "dummy"]));
}

#[tokio::test]
async fn non_participant_is_forbidden_everywhere() {
    let (app, _) = app();
    let admin = login(&app, "admin", "123").await;
    let aasim = login(&app, "aasim", "123").await;

    let conversation = create_conversation(&app, &admin, "private", &[]).await;
    let id = conversation["id"].as_u64().unwrap();

    let (status, _) = send(&app, get(&format!("/conversations/{id}"), &aasim)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, get(&format!("/conversations/{id}/messages/"), &aasim)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        post_json(
            &format!("/conversations/{id}/messages/"),
            &aasim,
            &json!({ "content": "let me in" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        post_json(
            &format!("/conversations/{id}/participants"),
            &aasim,
            &json!({ "username": "aasim" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_conversation_is_not_found() {
    let (app, _) = app();
    let token = login(&app, "admin", "123").await;

    let (status, _) = send(&app, get("/conversations/99", &token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        post_json(
            "/conversations/99/messages/",
            &token,
            &json!({ "content": "hi" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn posting_messages_grows_history_with_increasing_ids() {
    let (app, _) = app();
    let token = login(&app, "admin", "123").await;
    let conversation = create_conversation(&app, &token, "t", &[]).await;
    let id = conversation["id"].as_u64().unwrap();
    let uri = format!("/conversations/{id}/messages/");

    let (status, first) = send(&app, post_json(&uri, &token, &json!({ "content": "one" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, second) = send(&app, post_json(&uri, &token, &json!({ "content": "two" }))).await;
    assert_eq!(status, StatusCode::CREATED);

    assert!(first["id"].as_u64().unwrap() < second["id"].as_u64().unwrap());
    assert_eq!(first["sender"], "admin");

    let (status, history) = send(&app, get(&uri, &token)).await;
    assert_eq!(status, StatusCode::OK);
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["content"], "one");
    assert_eq!(history[1]["content"], "two");
}

#[tokio::test]
async fn added_participant_gains_access() {
    let (app, _) = app();
    let admin = login(&app, "admin", "123").await;
    let dummy = login(&app, "dummy", "123").await;

    let conversation = create_conversation(&app, &admin, "t", &[]).await;
    let id = conversation["id"].as_u64().unwrap();

    let (status, _) = send(&app, get(&format!("/conversations/{id}"), &dummy)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = send(
        &app,
        post_json(
            &format!("/conversations/{id}/participants"),
            &admin,
            &json!({ "username": "dummy" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["participants"], json!(["admin", "dummy"]));

    let (status, _) = send(&app, get(&format!("/conversations/{id}"), &dummy)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        post_json(
            &format!("/conversations/{id}/participants"),
            &admin,
            &json!({ "username": "ghost" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn conversation_list_is_scoped_to_caller() {
    let (app, _) = app();
    let admin = login(&app, "admin", "123").await;
    let aasim = login(&app, "aasim", "123").await;

    create_conversation(&app, &admin, "admin only", &[]).await;

    let (status, list) = send(&app, get("/conversations/", &admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, list) = send(&app, get("/conversations/", &aasim)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn posted_message_is_fanned_out_to_the_room() {
    let (app, state) = app();
    let token = login(&app, "admin", "123").await;
    let conversation = create_conversation(&app, &token, "t", &[]).await;
    let id = conversation["id"].as_u64().unwrap();

    let (_conn, mut rx) = state.registry.join(id, "admin").await;

    let (status, _) = send(
        &app,
        post_json(
            &format!("/conversations/{id}/messages/"),
            &token,
            &json!({ "content": "hello room" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    match rx.recv().await.unwrap() {
        RoomEvent::Message { sender, content } => {
            assert_eq!(sender, "admin");
            assert_eq!(content, "hello room");
        }
        other => panic!("unexpected event: {other:?}"),
    }
}
