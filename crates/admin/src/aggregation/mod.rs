//! Live aggregation pipeline.
//!
//! ```text
//! Subscription ──► normalize ──► engine ──► metrics ──► views / routes
//!  (snapshots)    (dates,       (group,     (metric
//!                  prices)       reduce)     sets)
//! ```
//!
//! The pipeline owns no state. Each stage is a pure function of the latest
//! snapshot, so recomputing after every delivery is always correct.
//!
//! Months are bucketed in the server's local time zone by default;
//! [`AnalyticsReport::compute`] and [`UserMetrics::compute`] take an
//! explicit zone.

pub mod engine;
pub mod metrics;
pub mod normalize;

pub use engine::{Point, Series, TOP_PRODUCTS_LIMIT, conversion_rate};
pub use metrics::{AnalyticsReport, ConversionRate, UserMetrics, orders_for, orders_in, products_in};
pub use normalize::{MonthKey, OrderDate, month_key};

use chrono::Local;

use crate::models::{Order, Product};

/// Store-wide analytics with months in local time.
#[must_use]
pub fn analytics(orders: &[Order], products: &[Product]) -> AnalyticsReport {
    AnalyticsReport::compute(orders, products, &Local)
}

/// Per-user metrics with months in local time.
#[must_use]
pub fn user_metrics(user_orders: &[Order]) -> UserMetrics {
    UserMetrics::compute(user_orders, &Local)
}
