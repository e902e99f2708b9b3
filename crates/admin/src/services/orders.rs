//! Order placement and the per-user order list.
//!
//! Placing an order is two independent writes: the order record, then the
//! product's stock. There is no transaction; if the stock write fails the
//! order stays in place.

use chosen_one_core::{DocumentId, Email, OrderId, OrderStatus, ProductId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use super::products::ProductService;
use crate::aggregation::OrderDate;
use crate::backend::{AuthUser, BackendError, Collection, DocumentStore};
use crate::models::{InvalidOrderDate, ManualOrder, NewOrder, Order, Product};

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Failed to load orders: {0}")]
    Load(#[source] BackendError),

    #[error("Failed to place order: product {0} not found")]
    ProductNotFound(ProductId),

    #[error("Failed to place order: {0}")]
    Create(#[source] BackendError),

    /// The order was written but the stock update failed.
    #[error("Failed to place order: {source}")]
    StockNotUpdated {
        order_id: OrderId,
        #[source]
        source: BackendError,
    },

    #[error("Failed to add order: {0}")]
    Manual(#[source] BackendError),

    #[error("Failed to add order: {0}")]
    InvalidDate(#[from] InvalidOrderDate),
}

impl OrderError {
    /// The backend failure underneath, if any.
    #[must_use]
    pub const fn backend(&self) -> Option<&BackendError> {
        match self {
            Self::Load(e) | Self::Create(e) | Self::Manual(e) => Some(e),
            Self::StockNotUpdated { source, .. } => Some(source),
            Self::ProductNotFound(_) | Self::InvalidDate(_) => None,
        }
    }
}

/// A successfully placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedOrder {
    pub order_id: OrderId,
    pub product_id: ProductId,
    /// Stock after the decrement; `None` if the product vanished meanwhile.
    pub stock: Option<u32>,
    pub message: String,
}

/// Order counts shown above the order list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OrderCounts {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub delivered: usize,
}

impl OrderCounts {
    #[must_use]
    pub fn of(orders: &[Order]) -> Self {
        let count = |status| orders.iter().filter(|o| o.status == Some(status)).count();
        Self {
            total: orders.len(),
            pending: count(OrderStatus::Pending),
            processing: count(OrderStatus::Processing),
            delivered: count(OrderStatus::Delivered),
        }
    }
}

/// The principal's orders, newest first. Undated orders go last.
#[must_use]
pub fn user_orders(orders: &[Order], email: &Email) -> Vec<Order> {
    let mut mine: Vec<(Option<_>, Order)> = orders
        .iter()
        .filter(|o| o.belongs_to(email))
        .map(|o| {
            let key = o.order_date.as_deref().and_then(OrderDate::parse).map(|d| d.sort_key());
            (key, o.clone())
        })
        .collect();
    // None < Some, so reversing the comparison puts undated orders last.
    mine.sort_by(|(a, _), (b, _)| b.cmp(a));
    mine.into_iter().map(|(_, o)| o).collect()
}

/// Orders whose buyer name, buyer email or product name contains `needle`.
#[must_use]
pub fn search(orders: &[Order], needle: &str) -> Vec<Order> {
    orders.iter().filter(|o| o.matches(needle)).cloned().collect()
}

/// Order service over a document store.
pub struct OrderService<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Every stored order, in store order.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Load` if the store cannot be read.
    pub async fn list(&self) -> Result<Vec<Order>, OrderError> {
        let docs = self
            .store
            .list(Collection::Orders)
            .await
            .map_err(OrderError::Load)?;
        Ok(docs.iter().map(Order::from_document).collect())
    }

    /// Place an order for one unit of a product, then decrement its stock.
    ///
    /// # Errors
    ///
    /// Returns `ProductNotFound` or `Create` if nothing was written, and
    /// `StockNotUpdated` if the order exists but the stock write failed.
    #[instrument(skip(self, buyer), fields(uid = %buyer.uid, product_id = %product_id))]
    pub async fn place_order(
        &self,
        buyer: &AuthUser,
        product_id: &ProductId,
        now: DateTime<Utc>,
    ) -> Result<PlacedOrder, OrderError> {
        let doc = self
            .store
            .get(Collection::Products, &DocumentId::from(product_id.clone()))
            .await
            .map_err(OrderError::Create)?
            .ok_or_else(|| OrderError::ProductNotFound(product_id.clone()))?;
        let product = Product::from_document(&doc);

        let order = NewOrder::for_product(buyer, &product, now);
        let order_id: OrderId = self
            .store
            .create(Collection::Orders, order.into_fields())
            .await
            .map_err(OrderError::Create)?
            .into();

        let stock = match ProductService::new(self.store)
            .adjust_stock(product_id, -1)
            .await
        {
            Ok(stock) => stock,
            Err(e) => {
                tracing::warn!(order_id = %order_id, error = %e, "Order written but stock not updated");
                return Err(OrderError::StockNotUpdated {
                    order_id,
                    source: e.into_backend(),
                });
            }
        };

        tracing::info!(order_id = %order_id, ?stock, "Order placed");
        Ok(PlacedOrder {
            order_id,
            product_id: product_id.clone(),
            stock,
            message: format!("Order placed for {}!", product.name),
        })
    }

    /// Record an order typed in by hand. Stock is not touched.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDate` for an unreadable date and `Manual` if the write
    /// fails.
    #[instrument(skip(self, entry), fields(email = %entry.email))]
    pub async fn add_manual(
        &self,
        entry: ManualOrder,
        now: DateTime<Utc>,
    ) -> Result<OrderId, OrderError> {
        let order = NewOrder::manual(entry, now)?;
        let id = self
            .store
            .create(Collection::Orders, order.into_fields())
            .await
            .map_err(OrderError::Manual)?;
        tracing::info!(order_id = %id, "Manual order added");
        Ok(id.into())
    }
}
