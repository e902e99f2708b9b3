//! Analytics reports from the backend or from an export file.
//!
//! Export files hold raw document fields, the same shape the document store
//! returns:
//!
//! ```yaml
//! orders:
//!   - id: o1
//!     userEmail: ava@example.com
//!     productName: Silk Scarf
//!     productPrice: "$180"
//!     orderDate: "2023-05-02"
//! products:
//!   - name: Silk Scarf
//!     category: Fashion
//! ```
//!
//! Files ending in `.yaml` or `.yml` are read as YAML, anything else as JSON.

use std::fmt::Display;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use chosen_one_admin::aggregation::{self, AnalyticsReport, Series, UserMetrics, orders_for};
use chosen_one_admin::backend::{Backend, Document, Fields};
use chosen_one_admin::config::BackendConfig;
use chosen_one_admin::models::{Order, Product};
use chosen_one_admin::services::{OrderService, ProductService};
use chosen_one_core::Email;

/// Errors reading a report source.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid JSON export: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid YAML export: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid user email {0}: {1}")]
    InvalidEmail(String, chosen_one_core::EmailError),
}

/// Orders and products exported from the document store.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Export {
    pub orders: Vec<Fields>,
    pub products: Vec<Fields>,
}

impl Export {
    /// Parse an export, picking the format from the file extension.
    ///
    /// # Errors
    ///
    /// Returns `ReportError` if the content does not parse.
    pub fn parse(path: &str, content: &str) -> Result<Self, ReportError> {
        let yaml = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
        if yaml {
            Ok(serde_yaml::from_str(content)?)
        } else {
            Ok(serde_json::from_str(content)?)
        }
    }

    #[must_use]
    pub fn orders(&self) -> Vec<Order> {
        documents(&self.orders)
            .iter()
            .map(Order::from_document)
            .collect()
    }

    #[must_use]
    pub fn products(&self) -> Vec<Product> {
        documents(&self.products)
            .iter()
            .map(Product::from_document)
            .collect()
    }
}

/// Documents keyed by their `id` field, or by position when it is missing.
fn documents(records: &[Fields]) -> Vec<Document> {
    records
        .iter()
        .enumerate()
        .map(|(index, fields)| {
            let id = fields
                .get("id")
                .and_then(|v| v.as_str())
                .map_or_else(|| format!("row-{index}"), str::to_string);
            Document::new(id, fields.clone())
        })
        .collect()
}

/// Print analytics for the whole store, or one user's dashboard metrics.
///
/// # Errors
///
/// Returns an error if the source cannot be read or the email is invalid.
pub async fn run(file: Option<&str>, user: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let (orders, products) = match file {
        Some(path) => {
            let content =
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| ReportError::Read {
                        path: path.to_string(),
                        source,
                    })?;
            let export = Export::parse(path, &content)?;
            info!(path, "Loaded export");
            (export.orders(), export.products())
        }
        None => {
            let backend = Backend::connect(&BackendConfig::from_process_env()?)?;
            let store = backend.store.as_ref();
            (
                OrderService::new(store).list().await?,
                ProductService::new(store).list().await?,
            )
        }
    };

    match user {
        Some(email) => {
            let email = Email::parse(email)
                .map_err(|e| ReportError::InvalidEmail(email.to_string(), e))?;
            let metrics = aggregation::user_metrics(&orders_for(&orders, &email));
            log_user_metrics(&email, &metrics);
        }
        None => log_analytics(&aggregation::analytics(&orders, &products)),
    }
    Ok(())
}

fn log_series<V: Display>(title: &str, series: &Series<V>) {
    info!("{title}:");
    for point in series.points() {
        info!("  {}: {}", point.label, point.value);
    }
}

fn log_analytics(report: &AnalyticsReport) {
    info!("Store Analytics");
    info!("===============");
    info!("Total orders: {}", report.total_orders);
    info!("Total products: {}", report.total_products);
    info!("Total revenue: {}", report.total_revenue);
    info!(
        "Conversion rate: {}% (assuming {} visits)",
        report.conversion_rate.percent, report.conversion_rate.assumed_visits
    );
    log_series("Revenue by month", &report.revenue_by_month);
    log_series("Top products", &report.top_products);
    log_series("New customers by month", &report.new_customers_by_month);
}

fn log_user_metrics(email: &Email, metrics: &UserMetrics) {
    info!("Dashboard for {email}");
    info!("Total orders: {}", metrics.total_orders);
    info!("Total spent: {}", metrics.total_spent);
    log_series("Revenue by month", &metrics.revenue_by_month);
    log_series("Top products", &metrics.top_products);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_export() {
        let export = Export::parse(
            "export.json",
            r#"{"orders": [{"id": "o1", "productName": "Bag", "productPrice": "$850"}]}"#,
        )
        .unwrap();
        let orders = export.orders();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders.first().unwrap().id.as_str(), "o1");
        assert!(export.products().is_empty());
    }

    #[test]
    fn test_parse_yaml_export_without_ids() {
        let content = "products:\n  - name: Silk Scarf\n    category: Fashion\n  - name: Bag\n";
        let export = Export::parse("export.YML", content).unwrap();
        let products = export.products();
        assert_eq!(products.len(), 2);
        assert_eq!(products.get(1).unwrap().id.as_str(), "row-1");
    }

    #[test]
    fn test_report_from_export() {
        let export = Export::parse(
            "export.json",
            r#"{"orders": [
                {"userEmail": "a@x.com", "productName": "Bag", "productPrice": "$100", "orderDate": "2023-05-02"},
                {"userEmail": "b@x.com", "productName": "Bag", "productPrice": "$50", "orderDate": "2023-06-02"}
            ]}"#,
        )
        .unwrap();
        let orders = export.orders();
        let report = aggregation::analytics(&orders, &export.products());
        assert_eq!(report.total_orders, 2);
        assert_eq!(report.top_products.get("Bag"), Some(&2));

        let mine = orders_for(&orders, &Email::parse("a@x.com").unwrap());
        assert_eq!(aggregation::user_metrics(&mine).total_orders, 1);
    }

    #[test]
    fn test_invalid_export_is_reported() {
        assert!(matches!(
            Export::parse("export.json", "{not json"),
            Err(ReportError::Json(_))
        ));
    }
}
