#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use formdesk_api::auth::{AppState, AppStateInner, create_token};
use formdesk_db::Database;

pub const SECRET: &str = "test-secret";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        let state: AppState = Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            jwt_secret: SECRET.into(),
            token_ttl: chrono::Duration::hours(1),
        });
        Self {
            router: formdesk_api::router(state.clone()),
            state,
        }
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    /// Inserts a user directly and signs a token for it, skipping the
    /// (slow) password hashing of the register route.
    pub fn user(&self, name: &str, email: &str) -> String {
        let id = self
            .state
            .db
            .create_user(name, email, "not-a-real-hash")
            .unwrap()
            .unwrap();
        create_token(SECRET, chrono::Duration::hours(1), id, email, 0).unwrap()
    }

    pub async fn create_form(&self, token: &str, body: Value) -> Value {
        let (status, json) = self.call(Method::POST, "/v1/forms", Some(token), Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "{json}");
        json["form"].clone()
    }

    pub async fn add_question(&self, token: &str, slug: &str, body: Value) -> i64 {
        let uri = format!("/v1/forms/{slug}/questions");
        let (status, json) = self.call(Method::POST, &uri, Some(token), Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "{json}");
        json["question"]["id"].as_i64().unwrap()
    }

    pub async fn submit(&self, token: &str, slug: &str, answers: Value) -> (StatusCode, Value) {
        let uri = format!("/v1/forms/{slug}/responses");
        self.call(Method::POST, &uri, Some(token), Some(json!({ "answers": answers })))
            .await
    }

    pub async fn responses(&self, token: &str, slug: &str) -> (StatusCode, Value) {
        let uri = format!("/v1/forms/{slug}/responses");
        self.call(Method::GET, &uri, Some(token), None).await
    }
}
