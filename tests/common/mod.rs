// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{Request, StatusCode};
use runlog::config::Config;
use runlog::db::{FirestoreDb, LocalStorage};
use runlog::middleware::auth::create_jwt;
use runlog::models::Identity;
use runlog::routes::create_router;
use runlog::AppState;
use std::sync::Arc;
use tower::ServiceExt;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a test app with an offline database and in-memory guest storage.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with_storage(LocalStorage::in_memory())
}

#[allow(dead_code)]
pub fn create_test_app_with_storage(storage: LocalStorage) -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(
        Config::test_default(),
        FirestoreDb::new_mock(),
        storage,
    ));
    (create_router(state.clone()), state)
}

/// Create a session token for `owner_id`.
#[allow(dead_code)]
pub fn create_test_jwt(owner_id: &str, signing_key: &[u8]) -> String {
    let identity = Identity {
        owner_id: owner_id.to_string(),
        email: Some(format!("{}@example.com", owner_id)),
        display_name: Some("Test Runner".to_string()),
    };
    create_jwt(&identity, signing_key).expect("Failed to create JWT")
}

/// Send a request and decode the JSON body (Null for an empty body).
#[allow(dead_code)]
pub async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

/// JSON request with an optional bearer token.
#[allow(dead_code)]
pub fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Body-less request with an optional bearer token.
#[allow(dead_code)]
pub fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}
