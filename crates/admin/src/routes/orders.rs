//! Order list route handlers.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use chosen_one_core::OrderId;
use chrono::Utc;
use serde::Serialize;

use super::SearchParams;
use crate::error::AppError;
use crate::live::OrdersPage;
use crate::middleware::RequireAuth;
use crate::models::ManualOrder;
use crate::services::OrderService;
use crate::services::orders::{OrderCounts, search, user_orders};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/orders", get(list).post(add_manual))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAdded {
    pub order_id: OrderId,
    pub message: &'static str,
}

/// GET /orders
///
/// The signed-in user's orders, newest first. Counts ignore the search.
///
/// # Errors
///
/// Returns `AppError::Orders` if the orders cannot be read.
pub async fn list(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<OrdersPage>, AppError> {
    let orders = OrderService::new(state.store()).list().await?;
    let mine = user_orders(&orders, &user.email);

    Ok(Json(OrdersPage {
        counts: OrderCounts::of(&mine),
        orders: search(&mine, &params.search),
    }))
}

/// POST /orders
///
/// # Errors
///
/// Returns `AppError::Orders` for an unreadable date or a failed write.
pub async fn add_manual(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Json(entry): Json<ManualOrder>,
) -> Result<Json<OrderAdded>, AppError> {
    let order_id = OrderService::new(state.store())
        .add_manual(entry, Utc::now())
        .await?;
    Ok(Json(OrderAdded {
        order_id,
        message: "Order added successfully!",
    }))
}
