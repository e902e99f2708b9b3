//! Store-wide analytics. Not filtered by user.

use chrono::Local;

use super::{Feed, LiveError};
use crate::aggregation::{AnalyticsReport, orders_in, products_in};
use crate::backend::{Collection, DocumentStore};

#[derive(Debug)]
pub struct AnalyticsView {
    orders: Feed,
    products: Feed,
    search: String,
    report: AnalyticsReport,
}

impl AnalyticsView {
    /// Subscribe to orders and products.
    ///
    /// # Errors
    ///
    /// Returns `LiveError` if either subscription cannot be opened.
    pub async fn open(store: &dyn DocumentStore) -> Result<Self, LiveError> {
        let orders = Feed::open(store, Collection::Orders).await?;
        let products = Feed::open(store, Collection::Products).await?;
        let report = compute(&orders, &products, "");
        Ok(Self {
            orders,
            products,
            search: String::new(),
            report,
        })
    }

    /// Wait for a snapshot on either feed and recompute. `None` once a feed
    /// closed.
    pub async fn next(&mut self) -> Option<&AnalyticsReport> {
        let delivered = tokio::select! {
            delivered = self.orders.advance() => delivered,
            delivered = self.products.advance() => delivered,
        };
        if !delivered {
            return None;
        }
        self.report = compute(&self.orders, &self.products, &self.search);
        Some(&self.report)
    }

    /// Narrow the top-products series by product name.
    pub fn set_search(&mut self, search: &str) -> &AnalyticsReport {
        search.clone_into(&mut self.search);
        self.report = compute(&self.orders, &self.products, &self.search);
        &self.report
    }

    #[must_use]
    pub const fn report(&self) -> &AnalyticsReport {
        &self.report
    }
}

fn compute(orders: &Feed, products: &Feed, search: &str) -> AnalyticsReport {
    let mut report = AnalyticsReport::compute(
        &orders_in(&orders.latest),
        &products_in(&products.latest),
        &Local,
    );
    if !search.is_empty() {
        report.top_products = report.top_products.search(search);
    }
    report
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::backend::{Fields, InMemoryStore};

    fn fields(value: serde_json::Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_unfiltered_and_recomputed_per_snapshot() {
        let store = InMemoryStore::new();
        let mut view = AnalyticsView::open(&store).await.unwrap();
        assert_eq!(view.report().total_orders, 0);
        assert_eq!(view.report().conversion_rate.percent, "0.00");

        for (email, product) in [("a@x.com", "Bag"), ("b@x.com", "Bag"), ("a@x.com", "Ring")] {
            store
                .create(
                    Collection::Orders,
                    fields(json!({"userEmail": email, "productName": product, "orderDate": "2023-05-02", "productPrice": "$10"})),
                )
                .await
                .unwrap();
        }

        let mut totals = Vec::new();
        for _ in 0..3 {
            totals.push(view.next().await.unwrap().total_orders);
        }
        assert_eq!(totals, [1, 2, 3]);

        let report = view.report();
        assert_eq!(report.top_products.labels(), ["Bag", "Ring"]);
        assert_eq!(report.new_customers_by_month.get("2023-5"), Some(&2));
        assert_eq!(report.conversion_rate.percent, "0.30");
    }

    #[tokio::test]
    async fn test_products_feed_and_search() {
        let store = InMemoryStore::new();
        store
            .create(Collection::Orders, fields(json!({"productName": "Silk Scarf"})))
            .await
            .unwrap();
        store
            .create(Collection::Orders, fields(json!({"productName": "Diamond Ring"})))
            .await
            .unwrap();
        let mut view = AnalyticsView::open(&store).await.unwrap();

        store
            .create(Collection::Products, fields(json!({"name": "Silk Scarf"})))
            .await
            .unwrap();
        assert_eq!(view.next().await.unwrap().total_products, 1);

        let report = view.set_search("scarf");
        assert_eq!(report.top_products.labels(), ["Silk Scarf"]);
        assert_eq!(report.total_orders, 2);
    }
}
