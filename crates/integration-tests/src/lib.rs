//! Integration tests for the Chosen One retail console.
//!
//! # Running Tests
//!
//! ```bash
//! # In-memory backend, no setup needed
//! cargo test -p chosen-one-integration-tests
//!
//! # Include the tests against a real Firebase project
//! CONSOLE_BACKEND=firebase FIREBASE_PROJECT_ID=... FIREBASE_API_KEY=... \
//!     cargo test -p chosen-one-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `pipeline` - live views and services over one in-memory store
//! - `http_api` - the router driven through `tower::ServiceExt::oneshot`
//! - `firebase` - Firestore and Identity Toolkit (ignored by default)

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use chosen_one_admin::backend::{Backend, InMemoryIdentity, InMemoryStore};
use chosen_one_admin::config::AdminConfig;
use chosen_one_admin::middleware::SESSION_COOKIE_NAME;
use chosen_one_admin::state::AppState;

/// Password given to every account made by [`TestApp::account`].
pub const PASSWORD: &str = "Correct-Horse-9";

/// Console router over a fresh in-memory backend.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
    pub identity: Arc<InMemoryIdentity>,
}

/// A response with its body decoded as JSON (`Null` when empty or not JSON).
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub cookie: Option<String>,
    pub content_type: Option<String>,
    pub json: Value,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    /// # Panics
    ///
    /// Panics if the test configuration is rejected.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let identity = Arc::new(InMemoryIdentity::new());
        let backend = Backend {
            store: store.clone(),
            identity: identity.clone(),
        };
        let config = AdminConfig::from_lookup(|key| {
            (key == "ADMIN_BASE_URL").then(|| "http://localhost:3001".to_string())
        })
        .unwrap();

        Self {
            router: chosen_one_admin::app(AppState::new(config, backend)),
            store,
            identity,
        }
    }

    /// Register an account with [`PASSWORD`].
    ///
    /// # Panics
    ///
    /// Panics if the email is invalid or taken.
    #[allow(clippy::unwrap_used)]
    pub fn account(&self, email: &str, display_name: Option<&str>) {
        self.identity
            .add_account(email, PASSWORD, display_name)
            .unwrap();
    }

    /// Send one request. `cookie` is the `name=value` pair from a previous
    /// response.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body cannot be read.
    #[allow(clippy::unwrap_used)]
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<&Value>,
        cookie: Option<&str>,
    ) -> TestResponse {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let cookie = session_cookie(response.headers());
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let json = if content_type.as_deref() == Some("application/json") {
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        } else {
            Value::Null
        };

        TestResponse {
            status,
            cookie,
            content_type,
            json,
        }
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
        self.send(Method::GET, uri, None, cookie).await
    }

    pub async fn post(&self, uri: &str, body: &Value, cookie: Option<&str>) -> TestResponse {
        self.send(Method::POST, uri, Some(body), cookie).await
    }

    /// Sign in and return the session cookie.
    ///
    /// # Panics
    ///
    /// Panics if sign-in fails or no cookie is set.
    #[allow(clippy::unwrap_used)]
    pub async fn sign_in(&self, email: &str) -> String {
        let response = self
            .post(
                "/auth/login",
                &serde_json::json!({ "email": email, "password": PASSWORD }),
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.json);
        response.cookie.unwrap()
    }
}

/// The console session cookie as a `name=value` pair.
fn session_cookie(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .find(|pair| pair.starts_with(SESSION_COOKIE_NAME))
        .map(String::from)
}
