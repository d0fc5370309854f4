use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use kadda_connect::AppState;
use kadda_connect::auth::{InMemoryStore, KeyValueStore};
use kadda_connect::bible::BibleClient;
use kadda_connect::config::AppConfig;
use kadda_connect::llm::{ChatMessage, ModelClient, ModelError};
use kadda_connect::server::build_router;
use kadda_connect::sermons::placeholder_catalog;
use kadda_connect::workspace::WorkspaceRegistry;
use serde_json::{Value, json};

/// Answers every prompt with the same JSON object, or fails with a status.
#[derive(Debug)]
struct FixedModel(Result<Value, u16>);

#[async_trait]
impl ModelClient for FixedModel {
    async fn complete_json(&self, _messages: Vec<ChatMessage>) -> Result<Value, ModelError> {
        match &self.0 {
            Ok(v) => Ok(v.clone()),
            Err(status) => Err(ModelError::Status {
                status: *status,
                body: "unavailable".to_string(),
            }),
        }
    }
}

fn server_with(model: FixedModel) -> TestServer {
    let config = AppConfig::load_from_args(["kadda-connect"]).unwrap();
    let sermons = Arc::new(placeholder_catalog());
    let auth_backend: Arc<dyn KeyValueStore> = Arc::new(InMemoryStore::default());
    let state = AppState {
        workspaces: WorkspaceRegistry::new(Arc::clone(&sermons), auth_backend),
        model: Arc::new(model),
        memory: None,
        // Unroutable; no test here reaches the Bible service.
        bible: Arc::new(BibleClient::new("http://127.0.0.1:9")),
        sermons,
        config: Arc::new(config),
    };
    TestServer::new(build_router(state)).unwrap()
}

fn server() -> TestServer {
    server_with(FixedModel(Ok(json!({ "reply": "Blessings!" }))))
}

fn session_header() -> HeaderName {
    HeaderName::from_static("x-session-id")
}

fn session(id: &'static str) -> HeaderValue {
    HeaderValue::from_static(id)
}

async fn login_as_grace(server: &TestServer, sid: &'static str) {
    server
        .post("/api/auth/login")
        .add_header(session_header(), session(sid))
        .json(&json!({ "email": "grace@kadda.church", "password": "secret" }))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_health_needs_no_session() {
    let server = server();
    let response = server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.text(), "ok");
}

#[tokio::test]
async fn test_missing_session_header_is_rejected() {
    let server = server();
    server
        .get("/api/posts")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_chat_then_save_conversation() {
    let server = server();

    let response = server
        .post("/api/chat")
        .add_header(session_header(), session("chat"))
        .json(&json!({ "message": "What time is service?" }))
        .await;
    response.assert_status_ok();
    let exchange: Value = response.json();
    assert_eq!(exchange["reply"]["text"], "Blessings!");
    assert_eq!(exchange["reply"]["sender"], "bot");
    assert!(exchange["reply"].get("status").is_none());
    assert!(exchange["conversationId"].is_null());

    let saved = server
        .post("/api/conversations")
        .add_header(session_header(), session("chat"))
        .json(&json!({}))
        .await;
    saved.assert_status(StatusCode::CREATED);
    let thread: Value = saved.json();
    assert_eq!(thread["title"], "What time is service?");
    assert_eq!(thread["messages"].as_array().unwrap().len(), 2);

    let list: Value = server
        .get("/api/conversations")
        .add_header(session_header(), session("chat"))
        .await
        .json();
    assert_eq!(list["activeId"], thread["id"]);
    assert_eq!(list["conversations"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_chat_model_failure_becomes_error_message() {
    let server = server_with(FixedModel(Err(503)));
    let response = server
        .post("/api/chat")
        .add_header(session_header(), session("err"))
        .json(&json!({ "message": "Hello" }))
        .await;
    response.assert_status_ok();
    let exchange: Value = response.json();
    assert_eq!(exchange["reply"]["status"], "error");

    let active: Value = server
        .get("/api/conversations/active")
        .add_header(session_header(), session("err"))
        .await
        .json();
    let messages = active["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1]["status"], "error");
}

#[tokio::test]
async fn test_blank_chat_message_is_rejected() {
    let server = server();
    server
        .post("/api/chat")
        .add_header(session_header(), session("blank"))
        .json(&json!({ "message": "   " }))
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_rename_and_delete_conversation() {
    let server = server();
    let sid = "rename";
    server
        .post("/api/chat")
        .add_header(session_header(), session(sid))
        .json(&json!({ "message": "Hi" }))
        .await
        .assert_status_ok();
    let thread: Value = server
        .post("/api/conversations")
        .add_header(session_header(), session(sid))
        .json(&json!({ "title": "Greetings" }))
        .await
        .json();
    let id = thread["id"].as_str().unwrap().to_string();

    server
        .patch(&format!("/api/conversations/{id}"))
        .add_header(session_header(), session(sid))
        .json(&json!({ "title": "  " }))
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    server
        .delete(&format!("/api/conversations/{id}"))
        .add_header(session_header(), session(sid))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let active: Value = server
        .get("/api/conversations/active")
        .add_header(session_header(), session(sid))
        .await
        .json();
    assert!(active["activeId"].is_null());
    assert!(active["messages"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_select_unknown_conversation_resets() {
    let server = server();
    let response: Value = server
        .post("/api/conversations/nope/select")
        .add_header(session_header(), session("select"))
        .await
        .json();
    assert_eq!(response["found"], false);
    assert!(response["activeId"].is_null());
}

#[tokio::test]
async fn test_posting_requires_sign_in() {
    let server = server();
    server
        .post("/api/posts")
        .add_header(session_header(), session("anon"))
        .json(&json!({ "content": "Hello church" }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_profile_update_rewrites_post_authors() {
    let server = server();
    let sid = "profile";
    login_as_grace(&server, sid).await;

    server
        .patch("/api/profile")
        .add_header(session_header(), session(sid))
        .json(&json!({ "displayName": "Grace A." }))
        .await
        .assert_status_ok();

    let posts: Vec<Value> = server
        .get("/api/posts")
        .add_header(session_header(), session(sid))
        .await
        .json();
    let graces: Vec<&Value> = posts
        .iter()
        .filter(|p| p["author"]["id"] == "member-1")
        .collect();
    assert!(!graces.is_empty());
    assert!(graces.iter().all(|p| p["author"]["displayName"] == "Grace A."));
    assert!(
        posts
            .iter()
            .filter(|p| p["author"]["id"] != "member-1")
            .all(|p| p["author"]["displayName"] != "Grace A.")
    );
}

#[tokio::test]
async fn test_like_toggle_round_trip() {
    let server = server();
    let sid = "likes";
    let posts: Vec<Value> = server
        .get("/api/posts")
        .add_header(session_header(), session(sid))
        .await
        .json();
    let id = posts[0]["id"].as_str().unwrap().to_string();
    let before = posts[0]["likes"].as_u64().unwrap();

    let liked: Value = server
        .post(&format!("/api/posts/{id}/like"))
        .add_header(session_header(), session(sid))
        .await
        .json();
    assert_eq!(liked["likedByMe"], true);
    assert_eq!(liked["likes"].as_u64().unwrap(), before + 1);

    let unliked: Value = server
        .post(&format!("/api/posts/{id}/like"))
        .add_header(session_header(), session(sid))
        .await
        .json();
    assert_eq!(unliked["likedByMe"], false);
    assert_eq!(unliked["likes"].as_u64().unwrap(), before);
}

#[tokio::test]
async fn test_sessions_do_not_share_state() {
    let server = server();
    login_as_grace(&server, "one").await;
    server
        .post("/api/posts")
        .add_header(session_header(), session("one"))
        .json(&json!({ "content": "Only in session one" }))
        .await
        .assert_status(StatusCode::CREATED);

    let other: Vec<Value> = server
        .get("/api/posts")
        .add_header(session_header(), session("two"))
        .await
        .json();
    assert!(other.iter().all(|p| p["content"] != "Only in session one"));
}

#[tokio::test]
async fn test_sermon_search_topics() {
    let server = server();
    let none: Vec<Value> = server
        .post("/api/sermons/search")
        .json(&json!({ "topics": ["Faith", "Grace"] }))
        .await
        .json();
    assert!(none.is_empty());

    let limited: Vec<Value> = server
        .post("/api/sermons/search")
        .json(&json!({ "limit": 2 }))
        .await
        .json();
    assert_eq!(limited.len(), 2);
}

#[tokio::test]
async fn test_summarize_archived_sermon() {
    let server = server_with(FixedModel(Ok(json!({
        "summary": "Faith sees beyond sight.",
        "keyPoints": ["Trust", "Obey"]
    }))));
    let response = server
        .post("/api/sermons/summarize")
        .json(&json!({ "sermonId": "sermon-1" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["keyPoints"].as_array().unwrap().len(), 2);

    server
        .post("/api/sermons/summarize")
        .json(&json!({ "sermonId": "sermon-404" }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_summarize_schema_mismatch_is_bad_gateway() {
    let server = server_with(FixedModel(Ok(json!({ "unexpected": true }))));
    server
        .post("/api/sermons/summarize")
        .json(&json!({ "title": "Grace", "content": "By grace you have been saved." }))
        .await
        .assert_status(StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_explain_inline_verse() {
    let server = server_with(FixedModel(Ok(json!({ "explanation": "God's love is for everyone." }))));
    let body: Value = server
        .post("/api/verses/explain")
        .json(&json!({ "reference": "John 3:16", "text": "For God so loved the world" }))
        .await
        .json();
    assert_eq!(body["explanation"], "God's love is for everyone.");
}

#[tokio::test]
async fn test_sermon_note_upsert_and_delete() {
    let server = server();
    let sid = "notes";
    let saved: Value = server
        .put("/api/sermons/sermon-2/note")
        .add_header(session_header(), session(sid))
        .json(&json!({ "text": "Grace is a gift" }))
        .await
        .json();
    assert_eq!(saved["sermonId"], "sermon-2");

    server
        .put("/api/sermons/sermon-2/note")
        .add_header(session_header(), session(sid))
        .json(&json!({ "text": "" }))
        .await
        .assert_status(StatusCode::NO_CONTENT);
    server
        .get("/api/sermons/sermon-2/note")
        .add_header(session_header(), session(sid))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_memory_disabled() {
    let server = server();
    login_as_grace(&server, "mem").await;
    server
        .get("/api/memory")
        .add_query_param("q", "choir")
        .add_header(session_header(), session("mem"))
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_signup_conflict_and_logout() {
    let server = server();
    let sid = "signup";
    server
        .post("/api/auth/signup")
        .add_header(session_header(), session(sid))
        .json(&json!({
            "displayName": "Grace Again",
            "email": "grace@kadda.church",
            "password": "longenough"
        }))
        .await
        .assert_status(StatusCode::CONFLICT);

    let created: Value = server
        .post("/api/auth/signup")
        .add_header(session_header(), session(sid))
        .json(&json!({
            "displayName": "Joy Bello",
            "email": "joy@example.com",
            "password": "longenough"
        }))
        .await
        .json();
    assert_eq!(created["isAuthenticated"], true);

    let profile: Value = server
        .get("/api/profile")
        .add_header(session_header(), session(sid))
        .await
        .json();
    assert_eq!(profile["displayName"], "Joy Bello");

    server
        .post("/api/auth/logout")
        .add_header(session_header(), session(sid))
        .await
        .assert_status(StatusCode::NO_CONTENT);
    let state: Value = server
        .get("/api/auth")
        .add_header(session_header(), session(sid))
        .await
        .json();
    assert_eq!(state, json!({ "isAuthenticated": false }));
}

#[tokio::test]
async fn test_member_directory_hides_emails() {
    let server = server();

    let members: Value = server
        .get("/api/members")
        .add_header(session_header(), session("dir-1"))
        .await
        .json();
    let members = members.as_array().unwrap();
    assert!(!members.is_empty());
    assert!(members.iter().all(|m| m.get("email").is_none()));
    assert!(!members.iter().any(|m| m.to_string().contains("grace@kadda.church")));

    let grace: Value = server
        .get("/api/members/member-1")
        .add_header(session_header(), session("dir-1"))
        .await
        .json();
    assert_eq!(grace["displayName"], "Grace Adeyemi");
    assert!(grace.get("email").is_none());

    // Members still see their own email.
    login_as_grace(&server, "dir-1").await;
    let own: Value = server
        .get("/api/profile")
        .add_header(session_header(), session("dir-1"))
        .await
        .json();
    assert_eq!(own["email"], "grace@kadda.church");
}

#[tokio::test]
async fn test_auth_state_follows_display_name_change() {
    let server = server();
    login_as_grace(&server, "rename-1").await;

    server
        .patch("/api/profile")
        .add_header(session_header(), session("rename-1"))
        .json(&json!({ "displayName": "Grace A." }))
        .await
        .assert_status_ok();

    let state: Value = server
        .get("/api/auth")
        .add_header(session_header(), session("rename-1"))
        .await
        .json();
    assert_eq!(state["user"]["displayName"], "Grace A.");
}
