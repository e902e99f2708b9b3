//! Dashboard summary for the signed-in user.

use chrono::{NaiveDate, TimeZone};
use serde::Serialize;

use crate::aggregation::{Series, UserMetrics, orders_for};
use crate::backend::AuthUser;
use crate::models::Order;

/// Everything the dashboard shows, derived from one orders snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    /// e.g. `Monday, May 1, 2023`.
    pub current_date: String,
    pub total_orders: usize,
    pub total_queries: usize,
    pub metrics: UserMetrics,
    /// User's top products, narrowed by the search text.
    pub top_products: Series<u32>,
    /// User's orders whose buyer name or ID contains the search text.
    pub recent_orders: Vec<Order>,
}

impl DashboardSummary {
    /// Filter to the user's orders, then compute.
    #[must_use]
    pub fn compute<Tz: TimeZone>(
        user: &AuthUser,
        orders: &[Order],
        total_queries: usize,
        search: &str,
        today: NaiveDate,
        tz: &Tz,
    ) -> Self {
        let mine = orders_for(orders, &user.email);
        let metrics = UserMetrics::compute(&mine, tz);
        let needle = search.to_lowercase();

        let recent_orders = mine
            .iter()
            .filter(|o| {
                o.user_name
                    .as_deref()
                    .is_some_and(|name| name.to_lowercase().contains(&needle))
                    || o.id.as_str().to_lowercase().contains(&needle)
            })
            .cloned()
            .collect();

        Self {
            current_date: today.format("%A, %B %-d, %Y").to_string(),
            total_orders: mine.len(),
            total_queries,
            top_products: metrics.top_products.search(search),
            metrics,
            recent_orders,
        }
    }
}
