//! The console router driven end to end over an in-memory backend.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::StatusCode;
use chosen_one_integration_tests::{PASSWORD, TestApp};
use serde_json::json;

#[tokio::test]
async fn test_login_sets_session_and_logout_clears_it() {
    let app = TestApp::new();
    app.account("ava@example.com", Some("Ava"));

    let me = app.get("/auth/me", None).await;
    assert_eq!(me.json["user"], serde_json::Value::Null);

    let cookie = app.sign_in("ava@example.com").await;
    let me = app.get("/auth/me", Some(&cookie)).await;
    assert_eq!(me.json["user"]["email"], "ava@example.com");
    assert_eq!(me.json["user"]["displayName"], "Ava");

    let out = app.post("/auth/logout", &json!({}), Some(&cookie)).await;
    assert_eq!(out.status, StatusCode::OK);
    let orders = app.get("/orders", Some(&cookie)).await;
    assert_eq!(orders.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_failures_use_form_messages() {
    let app = TestApp::new();
    app.account("ava@example.com", None);

    let wrong = app
        .post(
            "/auth/login",
            &json!({"email": "ava@example.com", "password": "nope"}),
            None,
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.json["error"], "Incorrect password. Please try again.");
    assert!(wrong.cookie.is_none());

    let unknown = app
        .post(
            "/auth/login",
            &json!({"email": "who@example.com", "password": PASSWORD}),
            None,
        )
        .await;
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_registration_validates_before_provider() {
    let app = TestApp::new();
    let mismatch = app
        .post(
            "/auth/register",
            &json!({
                "email": "new@example.com",
                "password": "long-enough-1",
                "confirmPassword": "different",
                "termsAccepted": true
            }),
            None,
        )
        .await;
    assert_eq!(mismatch.status, StatusCode::BAD_REQUEST);
    assert_eq!(mismatch.json["error"], "Passwords don't match!");

    let ok = app
        .post(
            "/auth/register",
            &json!({
                "email": "new@example.com",
                "password": "long-enough-1",
                "confirmPassword": "long-enough-1",
                "termsAccepted": true
            }),
            None,
        )
        .await;
    assert_eq!(ok.status, StatusCode::OK);
    assert_eq!(ok.json["message"], "Registration successful! Redirecting...");
    let cookie = ok.cookie.unwrap();
    assert_eq!(app.get("/orders", Some(&cookie)).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_products_seed_order_and_dashboard() {
    let app = TestApp::new();
    app.account("ava@example.com", Some("Ava"));
    let cookie = app.sign_in("ava@example.com").await;

    let products = app.get("/products", Some(&cookie)).await;
    assert_eq!(products.status, StatusCode::OK);
    assert_eq!(products.json["stored"], 10);
    let list = products.json["products"].as_array().unwrap();
    assert_eq!(list.len(), 10);
    assert_eq!(list[0]["name"], "Cashmere Sweater");

    let ring = list.iter().find(|p| p["name"] == "Diamond Ring").unwrap();
    let ring_id = ring["id"].as_str().unwrap();
    let placed = app
        .post(&format!("/products/{ring_id}/order"), &json!({}), Some(&cookie))
        .await;
    assert_eq!(placed.status, StatusCode::OK);
    assert_eq!(placed.json["message"], "Order placed for Diamond Ring!");
    assert_eq!(placed.json["stock"], 7);

    let orders = app.get("/orders", Some(&cookie)).await;
    assert_eq!(orders.json["counts"]["total"], 1);
    assert_eq!(orders.json["counts"]["pending"], 1);
    assert_eq!(orders.json["orders"][0]["productName"], "Diamond Ring");

    let dashboard = app.get("/dashboard", Some(&cookie)).await;
    assert_eq!(dashboard.status, StatusCode::OK);
    assert_eq!(dashboard.json["totalOrders"], 1);
    assert_eq!(dashboard.json["totalQueries"], 6);
    assert_eq!(dashboard.json["metrics"]["totalSpent"], "$3,500.00");

    let analytics = app.get("/analytics?search=ring", Some(&cookie)).await;
    assert_eq!(analytics.json["totalOrders"], 1);
    assert_eq!(analytics.json["totalProducts"], 10);
    assert_eq!(analytics.json["topProducts"][0]["label"], "Diamond Ring");
}

#[tokio::test]
async fn test_order_for_unknown_product_is_not_found() {
    let app = TestApp::new();
    app.account("ava@example.com", None);
    let cookie = app.sign_in("ava@example.com").await;

    let response = app
        .post("/products/missing/order", &json!({}), Some(&cookie))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stock_adjustments_saturate() {
    let app = TestApp::new();
    app.account("ava@example.com", None);
    let cookie = app.sign_in("ava@example.com").await;

    let products = app.get("/products", Some(&cookie)).await;
    let ring = products.json["products"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["name"] == "Diamond Ring")
        .unwrap();
    let uri = format!("/products/{}/stock", ring["id"].as_str().unwrap());

    let up = app.post(&uri, &json!({"change": 2}), Some(&cookie)).await;
    assert_eq!(up.status, StatusCode::OK);
    assert_eq!(up.json["stock"], 10);

    let max = app.post(&uri, &json!({"change": i64::MAX}), Some(&cookie)).await;
    assert_eq!(max.status, StatusCode::OK);
    assert_eq!(max.json["stock"], u32::MAX);

    let min = app.post(&uri, &json!({"change": i64::MIN}), Some(&cookie)).await;
    assert_eq!(min.status, StatusCode::OK);
    assert_eq!(min.json["stock"], 0);

    let gone = app
        .post("/products/missing/stock", &json!({"change": 1}), Some(&cookie))
        .await;
    assert_eq!(gone.status, StatusCode::OK);
    assert!(gone.json["stock"].is_null());
}

#[tokio::test]
async fn test_orders_are_scoped_to_the_signed_in_user() {
    let app = TestApp::new();
    app.account("ava@example.com", None);
    app.account("ben@example.com", None);
    let ava = app.sign_in("ava@example.com").await;
    let ben = app.sign_in("ben@example.com").await;

    let added = app
        .post(
            "/orders",
            &json!({
                "customer": "Ava",
                "email": "ava@example.com",
                "status": "Delivered",
                "date": "2023-05-15",
                "amount": "$1,200"
            }),
            Some(&ben),
        )
        .await;
    assert_eq!(added.status, StatusCode::OK);

    let mine = app.get("/orders", Some(&ava)).await;
    assert_eq!(mine.json["counts"]["delivered"], 1);
    assert_eq!(mine.json["orders"][0]["productName"], "Manual Entry");
    let theirs = app.get("/orders", Some(&ben)).await;
    assert_eq!(theirs.json["counts"]["total"], 0);

    let bad_date = app
        .post(
            "/orders",
            &json!({"customer": "Ava", "email": "ava@example.com", "date": "soon", "amount": "$1"}),
            Some(&ben),
        )
        .await;
    assert_eq!(bad_date.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_queries_inbox() {
    let app = TestApp::new();
    app.account("ava@example.com", None);
    let cookie = app.sign_in("ava@example.com").await;

    let inbox = app.get("/queries", Some(&cookie)).await;
    assert_eq!(inbox.json["counts"]["total"], 6);

    let added = app
        .post(
            "/queries",
            &json!({
                "customer": "Zoe",
                "email": "zoe@example.com",
                "subject": "Gift wrapping",
                "message": "Do you gift wrap?"
            }),
            Some(&cookie),
        )
        .await;
    assert_eq!(added.json["id"], 7);
    assert_eq!(added.json["status"], "New");
    assert_eq!(added.json["priority"], "Medium");

    let found = app.get("/queries?search=gift", Some(&cookie)).await;
    assert_eq!(found.json["queries"].as_array().unwrap().len(), 1);
    assert_eq!(found.json["counts"]["total"], 7);
}

#[tokio::test]
async fn test_settings_theme_and_notifications() {
    let app = TestApp::new();
    app.account("ava@example.com", Some("Ava"));
    let cookie = app.sign_in("ava@example.com").await;

    let settings = app.get("/settings", Some(&cookie)).await;
    assert_eq!(settings.json["theme"], "dark");
    assert_eq!(settings.json["notifications"], true);
    assert_eq!(settings.json["displayName"], "Ava");

    let theme = app.post("/settings/theme", &json!({}), Some(&cookie)).await;
    assert_eq!(theme.json["value"], "light");
    assert_eq!(theme.json["message"], "Theme set to light");
    let theme = app.post("/settings/theme", &json!({}), Some(&cookie)).await;
    assert_eq!(theme.json["value"], "dark");

    let notifications = app
        .post("/settings/notifications", &json!({}), Some(&cookie))
        .await;
    assert_eq!(notifications.json["value"], false);
    assert_eq!(notifications.json["message"], "Notifications disabled");

    let empty = app
        .post("/settings/password", &json!({"newPassword": ""}), Some(&cookie))
        .await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);
    assert_eq!(empty.json["error"], "Please enter a new password.");

    let profile = app
        .post("/settings/profile", &json!({"displayName": "Ava B"}), Some(&cookie))
        .await;
    assert_eq!(profile.json["message"], "Profile updated successfully!");
    let me = app.get("/auth/me", Some(&cookie)).await;
    assert_eq!(me.json["user"]["displayName"], "Ava B");
}

#[tokio::test]
async fn test_offline_backend_is_service_unavailable() {
    let app = TestApp::new();
    app.account("ava@example.com", None);
    let cookie = app.sign_in("ava@example.com").await;

    app.store.set_offline(true);
    let orders = app.get("/orders", Some(&cookie)).await;
    assert_eq!(orders.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(app.get("/health/ready", None).await.status, StatusCode::SERVICE_UNAVAILABLE);

    let settings = app.get("/settings", Some(&cookie)).await;
    assert_eq!(settings.status, StatusCode::OK);
    assert_eq!(settings.json["offline"], true);
}

#[tokio::test]
async fn test_streams_answer_with_event_stream() {
    let app = TestApp::new();
    app.account("ava@example.com", None);
    let cookie = app.sign_in("ava@example.com").await;

    for uri in ["/analytics/stream", "/dashboard/stream"] {
        let response = app.get(uri, Some(&cookie)).await;
        assert_eq!(response.status, StatusCode::OK, "{uri}");
        assert_eq!(response.content_type.as_deref(), Some("text/event-stream"));
    }
}
