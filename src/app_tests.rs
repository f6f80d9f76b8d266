use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::{
    app::build_app,
    config::AppConfig,
    state::AppState,
    store::{Document, DocumentStore, Filter, OrderBy, StoreError, Write, CREDENTIALS, PROJECTS, USERS},
};

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(b) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let res = app.clone().oneshot(req).await.expect("request");
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .expect("body");
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn register(app: &Router, email: &str, name: &str) -> Value {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/register",
        Some(json!({ "email": email, "password": "secret123", "name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body
}

async fn create_project(app: &Router, user_id: &str, name: &str) -> (StatusCode, Value) {
    call(
        app,
        Method::POST,
        "/api/projects",
        Some(json!({ "userId": user_id, "name": name, "type": "web" })),
    )
    .await
}

#[tokio::test]
async fn health_reports_store_and_endpoints() {
    let app = build_app(AppState::fake());
    let (status, body) = call(&app, Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["status"], json!("Server is running"));
    assert_eq!(body["storeAvailable"], json!(true));
    assert!(body["endpoints"].as_array().unwrap().len() >= 9);
    assert!(body["timestamp"].is_string());

    let offline = build_app(AppState::fake_offline());
    let (_, body) = call(&offline, Method::GET, "/", None).await;
    assert_eq!(body["storeAvailable"], json!(false));
}

#[tokio::test]
async fn register_with_missing_fields_writes_nothing() {
    let state = AppState::fake();
    let app = build_app(state.clone());

    for payload in [
        json!({ "password": "secret123", "name": "Ada" }),
        json!({ "email": "ada@example.com", "name": "Ada" }),
        json!({ "email": "ada@example.com", "password": "secret123" }),
    ] {
        let (status, body) = call(&app, Method::POST, "/api/register", Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["error"], json!("Missing required fields: email, password, name"));
    }

    assert!(state.store.list(USERS).await.unwrap().is_empty());
    assert!(state.store.list(CREDENTIALS).await.unwrap().is_empty());
}

#[tokio::test]
async fn register_creates_user_record_and_token() {
    let state = AppState::fake();
    let app = build_app(state.clone());

    let body = register(&app, "ada@example.com", "Ada").await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["user"]["email"], json!("ada@example.com"));
    assert_eq!(body["user"]["displayName"], json!("Ada"));
    let token = body["token"].as_str().unwrap();
    let uid = body["user"]["uid"].as_str().unwrap();
    assert_eq!(state.identity.verify_token(token).unwrap(), uid);

    let stored = state.store.get(USERS, uid).await.unwrap().expect("user stored");
    assert_eq!(stored["totalProjects"], json!(0));
    assert_eq!(stored["projects"], json!([]));
    assert_eq!(stored["role"], json!("user"));
}

#[tokio::test]
async fn registered_email_is_returned_as_sent() {
    let state = AppState::fake();
    let app = build_app(state.clone());

    let body = register(&app, " Ada@Example.com ", "Ada").await;
    assert_eq!(body["user"]["email"], json!(" Ada@Example.com "));
    let uid = body["user"]["uid"].as_str().unwrap();
    let stored = state.store.get(USERS, uid).await.unwrap().unwrap();
    assert_eq!(stored["email"], json!(" Ada@Example.com "));

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/login",
        Some(json!({ "email": "ada@example.com", "password": "secret123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["user"]["uid"], json!(uid));
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let app = build_app(AppState::fake());
    register(&app, "ada@example.com", "Ada").await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/register",
        Some(json!({ "email": "ada@example.com", "password": "another1", "name": "Ada 2" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert!(body["error"].as_str().unwrap().contains("already in use"));
}

#[tokio::test]
async fn get_user_hides_credentials_and_404s_when_absent() {
    let app = build_app(AppState::fake());
    let reg = register(&app, "ada@example.com", "Ada").await;
    let uid = reg["user"]["uid"].as_str().unwrap();

    let (status, body) = call(&app, Method::GET, &format!("/api/user/{uid}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["uid"], json!(uid));
    let text = body.to_string();
    assert!(!text.contains("password"));
    assert!(!text.contains("secret123"));

    let (status, body) = call(&app, Method::GET, "/api/user/nobody", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("User not found"));
}

#[tokio::test]
async fn create_project_for_unknown_user_is_404() {
    let state = AppState::fake();
    let app = build_app(state.clone());

    let (status, body) = create_project(&app, "ghost", "Site").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], json!(false));
    assert!(state.store.list(PROJECTS).await.unwrap().is_empty());
}

#[tokio::test]
async fn create_project_requires_fields() {
    let app = build_app(AppState::fake());
    let (status, _) = call(
        &app,
        Method::POST,
        "/api/projects",
        Some(json!({ "userId": "u1", "type": "web" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_project_updates_owner_counters() {
    let state = AppState::fake();
    let app = build_app(state.clone());
    let reg = register(&app, "ada@example.com", "Ada").await;
    let uid = reg["user"]["uid"].as_str().unwrap();

    let (status, body) = create_project(&app, uid, "Site").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let project = &body["project"];
    assert_eq!(project["userId"], json!(uid));
    assert_eq!(project["status"], json!("active"));
    assert_eq!(project["description"], json!(""));
    let project_id = project["id"].as_str().unwrap();
    assert!(project_id.starts_with("project_"));

    let (_, body) = call(&app, Method::GET, &format!("/api/user/{uid}"), None).await;
    assert_eq!(body["user"]["totalProjects"], json!(1));
    assert_eq!(body["user"]["projects"], json!([project_id]));
}

#[tokio::test]
async fn list_projects_is_scoped_and_newest_first() {
    let app = build_app(AppState::fake());
    let ada = register(&app, "ada@example.com", "Ada").await;
    let bob = register(&app, "bob@example.com", "Bob").await;
    let ada_id = ada["user"]["uid"].as_str().unwrap();
    let bob_id = bob["user"]["uid"].as_str().unwrap();

    let mut created = Vec::new();
    for (owner, name) in [(ada_id, "first"), (bob_id, "other"), (ada_id, "second")] {
        let (status, body) = create_project(&app, owner, name).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        if owner == ada_id {
            created.push(body["project"]["id"].clone());
        }
        // ids and ordering are millisecond based
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let (status, body) = call(&app, Method::GET, &format!("/api/user/{ada_id}/projects"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], json!(2));
    let ids: Vec<Value> = body["projects"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].clone())
        .collect();
    created.reverse();
    assert_eq!(ids, created);
    assert!(body["projects"]
        .as_array()
        .unwrap()
        .iter()
        .all(|p| p["userId"] == json!(ada_id)));

    let (_, body) = call(&app, Method::GET, "/api/user/nobody/projects", None).await;
    assert_eq!(body["count"], json!(0));
}

#[tokio::test]
async fn list_users_returns_public_subsets() {
    let app = build_app(AppState::fake());
    register(&app, "ada@example.com", "Ada").await;
    register(&app, "bob@example.com", "Bob").await;

    let (status, body) = call(&app, Method::GET, "/api/users", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], json!(2));
    assert_eq!(body["users"].as_array().unwrap().len(), 2);
    assert!(!body.to_string().contains("password"));
}

#[tokio::test]
async fn update_strips_protected_fields_and_merges() {
    let app = build_app(AppState::fake());
    let reg = register(&app, "ada@example.com", "Ada").await;
    let uid = reg["user"]["uid"].as_str().unwrap();
    let created_at = reg["user"]["createdAt"].clone();

    let (status, body) = call(
        &app,
        Method::PUT,
        &format!("/api/user/{uid}"),
        Some(json!({
            "uid": "hijack",
            "id": "hijack",
            "email": "evil@example.com",
            "createdAt": "1999-01-01T00:00:00.000Z",
            "displayName": "Ada Lovelace",
            "settings": { "theme": "dark", "notifications": false },
            "bio": "mathematician"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let user = &body["user"];
    assert_eq!(user["uid"], json!(uid));
    assert_eq!(user["email"], json!("ada@example.com"));
    assert_eq!(user["createdAt"], created_at);
    assert!(user.get("id").is_none());
    assert_eq!(user["displayName"], json!("Ada Lovelace"));
    assert_eq!(user["settings"]["theme"], json!("dark"));
    assert_eq!(user["bio"], json!("mathematician"));
    assert_eq!(user["totalProjects"], json!(0));
    assert!(user["updatedAt"].is_string());
}

#[tokio::test]
async fn partial_settings_update_keeps_user_readable() {
    let app = build_app(AppState::fake());
    let ada = register(&app, "ada@example.com", "Ada").await;
    register(&app, "bob@example.com", "Bob").await;
    let uid = ada["user"]["uid"].as_str().unwrap();

    let (status, body) = call(
        &app,
        Method::PUT,
        &format!("/api/user/{uid}"),
        Some(json!({ "settings": { "theme": "dark" }, "role": "moderator" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["user"]["settings"], json!({ "theme": "dark", "notifications": true }));

    let (status, body) = call(&app, Method::GET, &format!("/api/user/{uid}"), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["user"]["settings"]["theme"], json!("dark"));
    assert_eq!(body["user"]["settings"]["notifications"], json!(true));
    assert_eq!(body["user"]["role"], json!("moderator"));

    let (status, body) = call(&app, Method::GET, "/api/users", None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["count"], json!(2));

    let (status, body) = create_project(&app, uid, "Engine").await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/login",
        Some(json!({ "email": "ada@example.com", "password": "secret123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

#[tokio::test]
async fn wrongly_typed_update_is_rejected_and_writes_nothing() {
    let state = AppState::fake();
    let app = build_app(state.clone());
    let ada = register(&app, "ada@example.com", "Ada").await;
    let uid = ada["user"]["uid"].as_str().unwrap();

    for patch in [
        json!({ "displayName": 7 }),
        json!({ "totalProjects": "many" }),
        json!({ "lastLogin": false }),
        json!({ "settings": { "notifications": "off" } }),
    ] {
        let (status, body) = call(&app, Method::PUT, &format!("/api/user/{uid}"), Some(patch)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(body["success"], json!(false));
    }

    let stored = state.store.get(USERS, uid).await.unwrap().unwrap();
    assert!(stored.get("updatedAt").is_none());
    let (status, _) = call(&app, Method::GET, &format!("/api/user/{uid}"), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn update_of_unknown_user_is_500() {
    let app = build_app(AppState::fake());
    let (status, body) = call(
        &app,
        Method::PUT,
        "/api/user/ghost",
        Some(json!({ "displayName": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], json!("no document to update: users/ghost"));
}

#[tokio::test]
async fn login_checks_password() {
    let state = AppState::fake();
    let app = build_app(state.clone());
    let reg = register(&app, "ada@example.com", "Ada").await;
    let uid = reg["user"]["uid"].as_str().unwrap();

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/login",
        Some(json!({ "email": "ada@example.com", "password": "secret123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["user"]["uid"], json!(uid));
    let token = body["token"].as_str().unwrap();
    assert_eq!(state.identity.verify_token(token).unwrap(), uid);
    assert!(body["user"]["lastLogin"].as_str() >= reg["user"]["lastLogin"].as_str());

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/login",
        Some(json!({ "email": "ada@example.com", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], json!("Invalid credentials"));

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/login",
        Some(json!({ "email": "ada@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn verify_token_paths() {
    let state = AppState::fake();
    let app = build_app(state.clone());
    let reg = register(&app, "ada@example.com", "Ada").await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/verify",
        Some(json!({ "token": reg["token"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], json!("ada@example.com"));

    let (status, body) = call(&app, Method::POST, "/api/verify", Some(json!({}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], json!("No token provided"));

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/verify",
        Some(json!({ "token": "not-a-token" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], json!("Invalid or expired token"));

    let orphan = state.identity.issue_token("ghost").unwrap();
    let (status, _) = call(&app, Method::POST, "/api/verify", Some(json!({ "token": orphan }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

/// Fails every call and counts how many were attempted.
#[derive(Default)]
struct CountingStore {
    calls: AtomicUsize,
}

impl CountingStore {
    fn hit(&self) -> StoreError {
        self.calls.fetch_add(1, Ordering::SeqCst);
        StoreError::Unavailable
    }
}

#[async_trait]
impl DocumentStore for CountingStore {
    async fn get(&self, _c: &str, _id: &str) -> Result<Option<Document>, StoreError> {
        Err(self.hit())
    }

    async fn query(
        &self,
        _c: &str,
        _f: &Filter,
        _o: Option<&OrderBy>,
    ) -> Result<Vec<Document>, StoreError> {
        Err(self.hit())
    }

    async fn list(&self, _c: &str) -> Result<Vec<Document>, StoreError> {
        Err(self.hit())
    }

    async fn commit(&self, _w: Vec<Write>) -> Result<(), StoreError> {
        Err(self.hit())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(self.hit())
    }
}

#[tokio::test]
async fn mock_mode_register_and_login_touch_no_store() {
    let store = Arc::new(CountingStore::default());
    let state = AppState::from_parts(Arc::new(AppConfig::test()), store.clone(), false);
    let app = build_app(state);

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/register",
        Some(json!({ "email": "ada@example.com", "password": "secret123", "name": "Ada" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert!(body["user"]["uid"].as_str().unwrap().starts_with("user_"));
    assert!(body["token"].as_str().unwrap().starts_with("mock_token_"));
    assert_eq!(body["user"]["email"], json!("ada@example.com"));

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/login",
        Some(json!({ "email": "ada@example.com", "password": "anything" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].as_str().unwrap().starts_with("mock_token_"));
    assert_eq!(body["user"]["displayName"], json!("ada"));

    assert_eq!(store.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn offline_reads_surface_store_error() {
    let app = build_app(AppState::fake_offline());
    let (status, body) = call(&app, Method::GET, "/api/users", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], json!("document store unavailable"));
}

#[tokio::test]
async fn unknown_route_and_bad_json_use_error_body() {
    let app = build_app(AppState::fake());
    let (status, body) = call(&app, Method::GET, "/api/nothing-here", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "success": false, "error": "Route not found" }));

    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/register")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], json!(false));
}
