//! HTTP route handlers for the console.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                     - Liveness check
//! GET  /health/ready               - Backend reachability check
//!
//! # Auth
//! POST /auth/login                 - Email/password sign-in
//! POST /auth/register              - Create account and sign in
//! POST /auth/logout                - Sign out and clear session
//! GET  /auth/me                    - Current principal, if any
//! POST /auth/password-strength     - Strength meter reading
//!
//! # Dashboard (user scoped)
//! GET  /dashboard                  - Summary for the signed-in user
//! GET  /dashboard/stream           - Same, pushed on every orders snapshot (SSE)
//!
//! # Orders (user scoped)
//! GET  /orders                     - User's orders, newest first, plus counts
//! POST /orders                     - Add a manual order
//!
//! # Products
//! GET  /products                   - Catalog (tops up the demo catalog)
//! POST /products                   - Add a product
//! POST /products/reset             - Replace everything with the demo catalog
//! POST /products/{id}/order        - Place an order for one unit
//! POST /products/{id}/stock        - Adjust stock, floored at zero
//!
//! # Customer inquiries
//! GET  /queries                    - Inbox plus counts
//! POST /queries                    - Add an inquiry
//!
//! # Settings
//! GET  /settings                   - Profile, theme, notifications
//! POST /settings/profile           - Change display name
//! POST /settings/password          - Change password
//! POST /settings/theme             - Toggle theme
//! POST /settings/notifications     - Toggle notifications
//! POST /settings/delete-account    - Not supported
//!
//! # Analytics (store wide)
//! GET  /analytics                  - Chart series and totals
//! GET  /analytics/stream           - Same, pushed on every snapshot (SSE)
//! ```
//!
//! Every list endpoint accepts `?search=` and applies it the same way the
//! matching live view does.

use axum::Router;
use axum::response::sse::Event;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

pub mod analytics;
pub mod auth;
pub mod dashboard;
pub mod health;
pub mod orders;
pub mod products;
pub mod queries;
pub mod settings;

/// Build the complete console router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(dashboard::router())
        .merge(orders::router())
        .merge(products::router())
        .merge(queries::router())
        .merge(settings::router())
        .merge(analytics::router())
}

/// `?search=` query parameter.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub search: String,
}

/// Message-only response.
#[derive(Debug, Serialize)]
pub struct Notice {
    pub message: String,
}

impl Notice {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Serialize a payload as a named SSE event.
fn sse_event(name: &'static str, payload: &impl Serialize) -> Event {
    let json = serde_json::to_string(payload).unwrap_or_else(|_| {
        r#"{"type":"error","message":"Failed to serialize event"}"#.to_string()
    });
    Event::default().event(name).data(json)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::backend::Backend;
    use crate::config::AdminConfig;
    use crate::state::AppState;

    fn test_app() -> axum::Router {
        let config = AdminConfig::from_lookup(|key| {
            (key == "ADMIN_BASE_URL").then(|| "http://localhost:3001".to_string())
        })
        .unwrap();
        crate::app(AppState::new(config, Backend::in_memory()))
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let response = test_app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn test_console_routes_require_sign_in() {
        for uri in ["/dashboard", "/orders", "/products", "/queries", "/settings", "/analytics"] {
            let response = test_app()
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_password_strength_is_public() {
        let response = test_app()
            .oneshot(
                Request::post("/auth/password-strength")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"password":"Abcdefgh1!"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["score"], 4);
        assert_eq!(json["level"], "Strong");
    }
}
