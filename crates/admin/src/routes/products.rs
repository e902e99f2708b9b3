//! Product catalog route handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use chosen_one_core::ProductId;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::SearchParams;
use crate::error::AppError;
use crate::live::ProductsPage;
use crate::middleware::RequireAuth;
use crate::models::NewProduct;
use crate::services::products::{catalog, search};
use crate::services::{OrderService, PlacedOrder, ProductService};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(list).post(add))
        .route("/products/reset", post(reset))
        .route("/products/{id}/order", post(order))
        .route("/products/{id}/stock", post(adjust_stock))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductAdded {
    pub product_id: ProductId,
}

#[derive(Debug, Serialize)]
pub struct ResetDone {
    pub added: usize,
    pub message: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct StockChange {
    pub change: i64,
}

#[derive(Debug, Serialize)]
pub struct StockLevel {
    /// `None` when the product no longer exists.
    pub stock: Option<u32>,
}

/// GET /products
///
/// Tops the store up to the demo catalog before answering.
///
/// # Errors
///
/// Returns `AppError::Products` if the catalog cannot be read or seeded.
pub async fn list(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<ProductsPage>, AppError> {
    let service = ProductService::new(state.store());
    let mut stored = service.list().await?;
    if service.seed_missing(&stored).await? > 0 {
        stored = service.list().await?;
    }

    let count = stored.len();
    let unique = catalog(stored);
    Ok(Json(ProductsPage {
        products: search(&unique, &params.search),
        stored: count,
    }))
}

/// POST /products
///
/// # Errors
///
/// Returns `AppError::Products` if the write fails.
pub async fn add(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Json(product): Json<NewProduct>,
) -> Result<Json<ProductAdded>, AppError> {
    let product_id = ProductService::new(state.store()).add(product).await?;
    Ok(Json(ProductAdded { product_id }))
}

/// POST /products/reset
///
/// # Errors
///
/// Returns `AppError::Products` on the first failed delete or write.
pub async fn reset(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<ResetDone>, AppError> {
    let added = ProductService::new(state.store()).reset_demo().await?;
    Ok(Json(ResetDone {
        added,
        message: "Demo products have been reset.",
    }))
}

/// POST /products/{id}/order
///
/// # Errors
///
/// Returns `AppError::Orders`; see [`OrderService::place_order`].
pub async fn order(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PlacedOrder>, AppError> {
    let placed = OrderService::new(state.store())
        .place_order(&user, &ProductId::new(id), Utc::now())
        .await?;
    Ok(Json(placed))
}

/// POST /products/{id}/stock
///
/// # Errors
///
/// Returns `AppError::Products` if the read or write fails.
pub async fn adjust_stock(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<StockChange>,
) -> Result<Json<StockLevel>, AppError> {
    let stock = ProductService::new(state.store())
        .adjust_stock(&ProductId::new(id), req.change)
        .await?;
    Ok(Json(StockLevel { stock }))
}
