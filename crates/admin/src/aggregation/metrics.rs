//! Derived metric sets.
//!
//! A metric set is recomputed from scratch for every snapshot and never
//! mutated afterwards.

use chosen_one_core::{Email, Price};
use chrono::TimeZone;
use serde::Serialize;

use super::engine::{
    ASSUMED_VISITS, Series, TOP_PRODUCTS_LIMIT, conversion_rate, new_customers_by_month,
    revenue_by_month, top_products,
};
use crate::backend::Snapshot;
use crate::models::{Order, Product};

/// Read every order in a snapshot.
#[must_use]
pub fn orders_in(snapshot: &Snapshot) -> Vec<Order> {
    snapshot.documents.iter().map(Order::from_document).collect()
}

/// Read every product in a snapshot.
#[must_use]
pub fn products_in(snapshot: &Snapshot) -> Vec<Product> {
    snapshot.documents.iter().map(Product::from_document).collect()
}

/// Orders placed by one principal, in snapshot order.
#[must_use]
pub fn orders_for(orders: &[Order], email: &Email) -> Vec<Order> {
    orders.iter().filter(|o| o.belongs_to(email)).cloned().collect()
}

/// Conversion rate placeholder.
///
/// There is no visit tracking, so the rate divides by a fixed visit count.
/// `stub` is always `true` so consumers can label it as such.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionRate {
    pub percent: String,
    pub assumed_visits: f64,
    pub stub: bool,
}

impl ConversionRate {
    #[must_use]
    pub fn for_orders(order_count: usize) -> Self {
        Self {
            percent: conversion_rate(order_count),
            assumed_visits: ASSUMED_VISITS,
            stub: true,
        }
    }
}

/// Store-wide analytics over all orders and products.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub revenue_by_month: Series<f64>,
    pub top_products: Series<u32>,
    pub new_customers_by_month: Series<usize>,
    pub conversion_rate: ConversionRate,
    pub total_orders: usize,
    pub total_products: usize,
    pub total_revenue: String,
}

impl AnalyticsReport {
    /// Compute every metric, bucketing months in `tz`.
    #[must_use]
    pub fn compute<Tz: TimeZone>(orders: &[Order], products: &[Product], tz: &Tz) -> Self {
        let total: Price = orders.iter().map(Order::price).sum();
        Self {
            revenue_by_month: revenue_by_month(orders, tz),
            top_products: top_products(orders, TOP_PRODUCTS_LIMIT),
            new_customers_by_month: new_customers_by_month(orders, tz),
            conversion_rate: ConversionRate::for_orders(orders.len()),
            total_orders: orders.len(),
            total_products: products.len(),
            total_revenue: total.display(),
        }
    }
}

/// Per-user metrics shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserMetrics {
    pub total_orders: usize,
    pub revenue_by_month: Series<f64>,
    pub top_products: Series<u32>,
    pub total_spent: String,
}

impl UserMetrics {
    /// Compute metrics over orders already filtered to one user.
    #[must_use]
    pub fn compute<Tz: TimeZone>(user_orders: &[Order], tz: &Tz) -> Self {
        let spent: Price = user_orders.iter().map(Order::price).sum();
        Self {
            total_orders: user_orders.len(),
            revenue_by_month: revenue_by_month(user_orders, tz),
            top_products: top_products(user_orders, TOP_PRODUCTS_LIMIT),
            total_spent: spent.display(),
        }
    }
}
