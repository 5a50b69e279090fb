/// Common test utilities for integration tests
///
/// Every test gets its own router over a fresh in-memory store, so tests run
/// in parallel without a database. The store handle is kept so tests can
/// inspect committed state directly.
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use pingcrm_api::{
    app::{build_router, AppState},
    config::Config,
};
use pingcrm_shared::{jsonapi::MEDIA_TYPE, store::memory::MemoryStore};
use serde_json::{json, Value};
use tower::ServiceExt;

/// Response status, headers and parsed body
pub struct TestResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub location: Option<String>,
    pub body: Value,
}

/// Test context containing the router and its store
pub struct TestContext {
    pub app: Router,
    pub store: MemoryStore,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(Config::in_memory())
    }

    pub fn with_config(config: Config) -> Self {
        let store = MemoryStore::new();
        let app = build_router(AppState::new(Arc::new(store.clone()), config));
        Self { app, store }
    }

    /// Sends a request with an optional JSON body
    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let request = builder.body(body).unwrap();
        let response = self.app.clone().oneshot(request).await.unwrap();
        TestResponse::read(response).await
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> TestResponse {
        self.send(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> TestResponse {
        self.send(Method::PUT, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> TestResponse {
        self.send(Method::DELETE, uri, None).await
    }

    /// Creates a record and returns its id, panicking on failure
    pub async fn create(&self, kind: &str, attributes: Value) -> i64 {
        let response = self
            .post(&format!("/api/v1/{}", kind), document(kind, attributes))
            .await;
        assert_eq!(
            response.status,
            StatusCode::CREATED,
            "creating {} failed: {}",
            kind,
            response.body
        );
        response.id()
    }

    pub async fn create_account(&self, name: &str) -> i64 {
        self.create("accounts", json!({ "name": name })).await
    }

    pub async fn create_user(&self, account_id: i64, email: &str) -> i64 {
        self.create("users", user_attributes(account_id, email)).await
    }

    pub async fn create_organization(&self, account_id: i64, name: &str) -> i64 {
        self.create(
            "organizations",
            json!({ "account_id": account_id, "name": name }),
        )
        .await
    }

    pub async fn create_contact(&self, account_id: i64, first_name: &str) -> i64 {
        self.create(
            "contacts",
            json!({
                "account_id": account_id,
                "first_name": first_name,
                "last_name": "Doe",
                "city": "Ottawa",
            }),
        )
        .await
    }
}

impl TestResponse {
    async fn read(response: Response) -> Self {
        let status = response.status();
        let header_value = |name: header::HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string())
        };
        let content_type = header_value(header::CONTENT_TYPE);
        let location = header_value(header::LOCATION);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                panic!("response body is not JSON: {}", String::from_utf8_lossy(&bytes))
            })
        };

        Self {
            status,
            content_type,
            location,
            body,
        }
    }

    /// Numeric id of the primary resource
    pub fn id(&self) -> i64 {
        self.body["data"]["id"]
            .as_str()
            .and_then(|id| id.parse().ok())
            .unwrap_or_else(|| panic!("no resource id in {}", self.body))
    }

    /// The single error entry, asserting the envelope shape
    pub fn error(&self) -> &Value {
        let errors = self.body["errors"]
            .as_array()
            .unwrap_or_else(|| panic!("no errors array in {}", self.body));
        assert_eq!(errors.len(), 1, "expected exactly one error: {}", self.body);
        assert_eq!(errors[0]["status"], self.status.as_u16().to_string());
        &errors[0]
    }

    pub fn is_jsonapi(&self) -> bool {
        self.content_type.as_deref() == Some(MEDIA_TYPE)
    }
}

/// Wraps attributes in a request document
pub fn document(kind: &str, attributes: Value) -> Value {
    json!({ "data": { "type": kind, "attributes": attributes } })
}

pub fn user_attributes(account_id: i64, email: &str) -> Value {
    json!({
        "account_id": account_id,
        "first_name": "Jane",
        "last_name": "Doe",
        "email": email,
        "password": "secret",
        "owner": true,
    })
}
