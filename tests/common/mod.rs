use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use tenantry::auth::issue_token;
use tenantry::server::{AppState, create_router};
use tenantry::storage::FsStorage;
use tenantry::store::{SqliteStore, Store};
use tenantry::types::RoleTables;

/// An in-process server backed by a temp data directory.
pub struct TestApp {
    pub temp_dir: TempDir,
    pub admin_token: String,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let store = SqliteStore::new(temp_dir.path().join("tenantry.db")).expect("open store");
        store.initialize().expect("initialize store");

        let (_, admin_token) = issue_token(&store, None, None).expect("issue admin token");

        let state = Arc::new(AppState::new(
            Arc::new(store),
            Arc::new(FsStorage::new(temp_dir.path().join("storage"))),
            Arc::new(RoleTables::default()),
        ));

        Self {
            router: create_router(state),
            temp_dir,
            admin_token,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("send request");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, json)
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, path, token, None).await
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, path, Some(token), Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, path, Some(token), None).await
    }

    /// Provisions a user through the admin API and returns a token for them.
    pub async fn create_user(&self, uid: &str, global_role: &str) -> String {
        let (status, _) = self
            .post(
                "/api/v1/admin/users",
                &self.admin_token,
                serde_json::json!({
                    "uid": uid,
                    "email": format!("{uid}@example.com"),
                    "username": uid,
                    "global_role": global_role,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create user {uid}");

        let (status, body) = self
            .post(
                &format!("/api/v1/admin/users/{uid}/tokens"),
                &self.admin_token,
                serde_json::json!({}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create token for {uid}");

        body["data"]["token"]
            .as_str()
            .expect("token in response")
            .to_string()
    }
}
