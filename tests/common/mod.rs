//! Shared setup for the HTTP-level tests.
//!
//! The router runs against the in-memory credential store; the Postgres pool
//! is lazy and never connected.

#![allow(dead_code)]
#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use signed_ops::{
    app::{self, AppState, Settings},
    auth::signed_header,
    db::create_lazy_pool,
    logger::TracingLogger,
    models::credential::{Credential, NewCredential},
    store::InMemoryCredentialStore,
};
use tower::util::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub store: InMemoryCredentialStore,
    pub state: AppState,
}

pub fn test_app() -> TestApp {
    test_app_with(Settings::default())
}

pub fn test_app_with(settings: Settings) -> TestApp {
    let store = InMemoryCredentialStore::new();
    let state = AppState::new(
        create_lazy_pool("postgres://localhost/unused").expect("lazy pool"),
        Arc::new(store.clone()),
        Arc::new(TracingLogger),
        settings,
    );

    TestApp {
        router: app::router(state.clone()),
        store,
        state,
    }
}

impl TestApp {
    /// Seeds the `K1` / `AppTest` / `S1` credential.
    pub fn with_app_test(self, active: bool) -> Self {
        self.seed("K1", "AppTest", "S1", active);
        self
    }

    pub fn seed(&self, key: &str, name: &str, secret: &str, active: bool) -> Credential {
        self.store.seed(NewCredential {
            application_key: key.into(),
            application_name: name.into(),
            application_token: secret.into(),
            is_active: active,
        })
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.expect("router is infallible");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("JSON body")
        };
        (status, body)
    }
}

pub fn stamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn signed(key: &str, name: &str, secret: &str, at: DateTime<Utc>) -> String {
    signed_header(key, name, secret, &stamp(at))
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn get_signed(uri: &str, authorization: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, authorization)
        .body(Body::empty())
        .unwrap()
}

pub fn json(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// A request with an arbitrary body, and a content type only when given.
pub fn raw(method: &str, uri: &str, content_type: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn malformed_body() -> Value {
    serde_json::json!({
        "success": false,
        "errors": [{ "code": "51", "message": "Request could not be parsed." }]
    })
}

pub fn unauthorized_body() -> Value {
    serde_json::json!({
        "success": false,
        "errors": [{ "code": "52", "message": "Unauthorized." }]
    })
}
