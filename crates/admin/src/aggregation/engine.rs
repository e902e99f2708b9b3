//! Grouping and reduction over order snapshots.
//!
//! Every function is a pure function of its input slice: the same orders
//! always produce the same series, and nothing is cached between calls.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::TimeZone;
use serde::Serialize;

use super::normalize::{MonthKey, month_key};
use crate::models::Order;

/// How many products the top-products ranking keeps.
pub const TOP_PRODUCTS_LIMIT: usize = 5;

/// Visits assumed per conversion-rate calculation.
pub const ASSUMED_VISITS: f64 = 1000.0;

/// One labelled value in a series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point<V> {
    pub label: String,
    pub value: V,
}

/// Ordered label/value pairs, ready for a chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Series<V>(Vec<Point<V>>);

impl<V> Series<V> {
    #[must_use]
    pub fn points(&self) -> &[Point<V>] {
        &self.0
    }

    #[must_use]
    pub fn labels(&self) -> Vec<&str> {
        self.0.iter().map(|p| p.label.as_str()).collect()
    }

    #[must_use]
    pub fn values(&self) -> Vec<&V> {
        self.0.iter().map(|p| &p.value).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Value for a label, if present.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&V> {
        self.0.iter().find(|p| p.label == label).map(|p| &p.value)
    }

    /// Points whose label contains `needle`, ignoring case.
    #[must_use]
    pub fn search(&self, needle: &str) -> Self
    where
        V: Clone,
    {
        let needle = needle.to_lowercase();
        Self(
            self.0
                .iter()
                .filter(|p| p.label.to_lowercase().contains(&needle))
                .cloned()
                .collect(),
        )
    }
}

impl<K: ToString, V> FromIterator<(K, V)> for Series<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, value)| Point {
                    label: k.to_string(),
                    value,
                })
                .collect(),
        )
    }
}

/// Group items by an ordered key and fold each bucket.
///
/// Items whose key is `None` are skipped. Buckets come out in key order.
pub fn group_by_ordered<'a, T, K, A>(
    items: impl IntoIterator<Item = &'a T>,
    key: impl Fn(&T) -> Option<K>,
    mut fold: impl FnMut(&mut A, &T),
) -> BTreeMap<K, A>
where
    T: 'a,
    K: Ord,
    A: Default,
{
    let mut buckets: BTreeMap<K, A> = BTreeMap::new();
    for item in items {
        if let Some(k) = key(item) {
            fold(buckets.entry(k).or_default(), item);
        }
    }
    buckets
}

/// Sum of parsed order prices per month, in chronological order.
///
/// Orders without a readable date are skipped; unreadable prices add zero.
#[must_use]
pub fn revenue_by_month<Tz: TimeZone>(orders: &[Order], tz: &Tz) -> Series<f64> {
    group_by_ordered(
        orders,
        |o| month_key(o.order_date.as_deref(), tz),
        |total: &mut f64, o| *total += o.price().amount(),
    )
    .into_iter()
    .collect()
}

/// Order count per product name, highest first, at most `limit` entries.
///
/// Orders without a product name are skipped. Ties keep the order in which
/// the names were first seen.
#[must_use]
pub fn top_products(orders: &[Order], limit: usize) -> Series<u32> {
    let mut counts: Vec<(&str, u32)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for name in orders.iter().filter_map(|o| o.product_name.as_deref()) {
        match index.get(name) {
            Some(&i) => {
                if let Some(entry) = counts.get_mut(i) {
                    entry.1 += 1;
                }
            }
            None => {
                index.insert(name, counts.len());
                counts.push((name, 1));
            }
        }
    }

    // Stable sort keeps first-seen order among equal counts.
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(limit);
    counts.into_iter().collect()
}

/// Distinct buyer emails per month, in chronological order.
///
/// Orders without a readable date or without an email are skipped.
#[must_use]
pub fn new_customers_by_month<Tz: TimeZone>(orders: &[Order], tz: &Tz) -> Series<usize> {
    group_by_ordered(
        orders.iter().filter(|o| o.user_email.is_some()),
        |o| month_key(o.order_date.as_deref(), tz),
        |emails: &mut BTreeSet<String>, o| {
            if let Some(email) = &o.user_email {
                emails.insert(email.clone());
            }
        },
    )
    .into_iter()
    .map(|(month, emails): (MonthKey, BTreeSet<String>)| (month, emails.len()))
    .collect()
}

/// Orders per assumed visits, as a percentage with two decimals.
///
/// There is no visit tracking; [`ASSUMED_VISITS`] stands in for it.
#[must_use]
pub fn conversion_rate(order_count: usize) -> String {
    if order_count == 0 {
        return "0.00".to_string();
    }
    #[allow(clippy::cast_precision_loss)] // order counts stay far below 2^52
    let rate = order_count as f64 / ASSUMED_VISITS * 100.0;
    format!("{rate:.2}")
}
