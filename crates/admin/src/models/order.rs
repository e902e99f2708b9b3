//! Order records.

use chosen_one_core::{Email, OrderId, OrderStatus, Price, ProductId};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::lenient;
use super::product::Product;
use crate::backend::{AuthUser, Document, Fields};

/// Product name recorded on orders typed in by hand.
pub const MANUAL_ENTRY: &str = "Manual Entry";

/// An order as read from the store.
///
/// Every field except the ID is optional on the wire; absent or malformed
/// values are kept as `None` and skipped by whichever metric needs them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_email: Option<String>,
    pub user_name: Option<String>,
    pub product_id: Option<ProductId>,
    pub product_name: Option<String>,
    pub product_price: Option<String>,
    pub product_image: Option<String>,
    pub product_category: Option<String>,
    pub status: Option<OrderStatus>,
    pub order_date: Option<String>,
    pub items: u32,
}

impl Order {
    /// Read an order from a stored document. Never fails.
    #[must_use]
    pub fn from_document(doc: &Document) -> Self {
        let f = &doc.fields;
        Self {
            id: doc.id.clone().into(),
            user_email: lenient::text(f, "userEmail"),
            user_name: lenient::text(f, "userName"),
            product_id: lenient::text(f, "productId").map(ProductId::from),
            product_name: lenient::text(f, "productName"),
            product_price: lenient::text(f, "productPrice"),
            product_image: lenient::text(f, "productImage"),
            product_category: lenient::text(f, "productCategory"),
            status: lenient::parsed(f, "status"),
            order_date: lenient::text(f, "orderDate"),
            items: lenient::count(f, "items").unwrap_or(1),
        }
    }

    /// Parsed price; missing or unparseable prices are zero.
    #[must_use]
    pub fn price(&self) -> Price {
        Price::from_field(self.product_price.as_deref())
    }

    /// Whether this order was placed by the given principal.
    #[must_use]
    pub fn belongs_to(&self, email: &Email) -> bool {
        self.user_email.as_deref().is_some_and(|e| email.owns(e))
    }

    /// Case-insensitive search over buyer name, buyer email and product name.
    #[must_use]
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        [&self.user_name, &self.user_email, &self.product_name]
            .into_iter()
            .any(|field| field.as_deref().unwrap_or("").to_lowercase().contains(&needle))
    }
}

/// An order about to be written.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub user_name: String,
    pub user_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<ProductId>,
    pub product_name: String,
    pub product_price: String,
    pub product_image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_category: Option<String>,
    pub order_date: String,
    pub status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Hand-entered order details.
#[derive(Debug, Clone, Deserialize)]
pub struct ManualOrder {
    pub customer: String,
    pub email: String,
    #[serde(default)]
    pub status: OrderStatus,
    /// `YYYY-MM-DD` or a full ISO-8601 timestamp; empty means now.
    #[serde(default)]
    pub date: String,
    pub amount: String,
    #[serde(default = "default_items")]
    pub items: u32,
}

const fn default_items() -> u32 {
    1
}

/// A manual order date that could not be read.
#[derive(Debug, thiserror::Error)]
#[error("Invalid order date: {0}")]
pub struct InvalidOrderDate(pub String);

/// ISO-8601 UTC with milliseconds, e.g. `2024-05-01T09:30:00.000Z`.
#[must_use]
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl NewOrder {
    /// Order for one unit of a catalog product, placed now.
    #[must_use]
    pub fn for_product(buyer: &AuthUser, product: &Product, now: DateTime<Utc>) -> Self {
        Self {
            user_name: buyer.name_or_email().to_string(),
            user_email: buyer.email.to_string(),
            product_id: Some(product.id.clone()),
            product_name: product.name.clone(),
            product_price: product.price.clone(),
            product_image: product.image.clone(),
            product_category: Some(product.category.clone()),
            order_date: iso_timestamp(now),
            status: OrderStatus::Pending,
            items: None,
            created_at: None,
        }
    }

    /// Order typed in by hand, not linked to a product.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOrderDate` if a date was given but cannot be parsed.
    pub fn manual(entry: ManualOrder, now: DateTime<Utc>) -> Result<Self, InvalidOrderDate> {
        let order_date = match entry.date.trim() {
            "" => iso_timestamp(now),
            date => manual_date(date).ok_or_else(|| InvalidOrderDate(date.to_string()))?,
        };

        Ok(Self {
            user_name: entry.customer,
            user_email: entry.email,
            product_id: None,
            product_name: MANUAL_ENTRY.to_string(),
            product_price: entry.amount,
            product_image: String::new(),
            product_category: None,
            order_date,
            status: entry.status,
            items: Some(entry.items),
            created_at: Some(iso_timestamp(now)),
        })
    }

    /// Field map for the document store.
    #[must_use]
    pub fn into_fields(self) -> Fields {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => Fields::new(),
        }
    }
}

/// Normalise a typed-in date. Calendar dates become UTC midnight.
fn manual_date(date: &str) -> Option<String> {
    if let Ok(day) = NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        return Some(iso_timestamp(day.and_hms_opt(0, 0, 0)?.and_utc()));
    }
    DateTime::parse_from_rfc3339(date)
        .ok()
        .map(|at| iso_timestamp(at.with_timezone(&Utc)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn doc(value: serde_json::Value) -> Document {
        Document::new("o1", value.as_object().cloned().unwrap_or_default())
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_from_document_reads_all_fields() {
        let order = Order::from_document(&doc(json!({
            "userEmail": "u@x.com",
            "userName": "Una",
            "productId": "p1",
            "productName": "Silk Scarf",
            "productPrice": "$180",
            "status": "Shipped",
            "orderDate": "2023-05-01T10:00:00.000Z",
            "items": 2
        })));
        assert_eq!(order.id.as_str(), "o1");
        assert_eq!(order.product_id.as_ref().map(ProductId::as_str), Some("p1"));
        assert_eq!(order.status, Some(OrderStatus::Shipped));
        assert_eq!(order.items, 2);
        assert!((order.price().amount() - 180.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_from_document_tolerates_garbage() {
        let order = Order::from_document(&doc(json!({
            "productPrice": null,
            "status": "Lost in transit",
            "orderDate": 17
        })));
        assert_eq!(order.status, None);
        assert_eq!(order.user_email, None);
        assert_eq!(order.items, 1);
        assert!((order.price().amount()).abs() < f64::EPSILON);
    }

    #[test]
    fn test_belongs_to_and_matches() {
        let order = Order::from_document(&doc(json!({
            "userEmail": "u@x.com",
            "userName": "Una Smith",
            "productName": "Pearl Earrings"
        })));
        assert!(order.belongs_to(&Email::parse("u@x.com").unwrap()));
        assert!(!order.belongs_to(&Email::parse("v@x.com").unwrap()));
        assert!(order.matches("smith"));
        assert!(order.matches("PEARL"));
        assert!(order.matches("u@x"));
        assert!(!order.matches("watch"));
    }

    #[test]
    fn test_for_product() {
        let buyer = AuthUser {
            uid: chosen_one_core::UserId::new("u1"),
            email: Email::parse("u@x.com").unwrap(),
            display_name: None,
        };
        let product = Product::from_document(&Document::new(
            "p1",
            json!({"name": "Sunglasses", "category": "Accessories", "price": "$320", "stock": 40, "image": "Sunglasses.jpeg"})
                .as_object()
                .cloned()
                .unwrap(),
        ));

        let fields = NewOrder::for_product(&buyer, &product, now()).into_fields();
        assert_eq!(fields["userName"], "u@x.com");
        assert_eq!(fields["productId"], "p1");
        assert_eq!(fields["productPrice"], "$320");
        assert_eq!(fields["productCategory"], "Accessories");
        assert_eq!(fields["status"], "Pending");
        assert_eq!(fields["orderDate"], "2024-05-01T09:30:00.000Z");
        assert!(fields.get("items").is_none());
    }

    #[test]
    fn test_manual_entry() {
        let entry = ManualOrder {
            customer: "Walk-in".to_string(),
            email: "walkin@x.com".to_string(),
            status: OrderStatus::Delivered,
            date: "2023-05-15".to_string(),
            amount: "$99".to_string(),
            items: 3,
        };
        let order = NewOrder::manual(entry, now()).unwrap();
        assert_eq!(order.product_name, MANUAL_ENTRY);
        assert_eq!(order.product_image, "");
        assert_eq!(order.order_date, "2023-05-15T00:00:00.000Z");
        assert_eq!(order.items, Some(3));
        assert_eq!(order.created_at.as_deref(), Some("2024-05-01T09:30:00.000Z"));
    }

    #[test]
    fn test_manual_entry_dates() {
        let entry = |date: &str| ManualOrder {
            customer: "c".to_string(),
            email: "c@x.com".to_string(),
            status: OrderStatus::Pending,
            date: date.to_string(),
            amount: "1".to_string(),
            items: 1,
        };
        assert_eq!(
            NewOrder::manual(entry(""), now()).unwrap().order_date,
            "2024-05-01T09:30:00.000Z"
        );
        assert_eq!(
            NewOrder::manual(entry("2023-06-01T12:00:00+02:00"), now())
                .unwrap()
                .order_date,
            "2023-06-01T10:00:00.000Z"
        );
        assert!(NewOrder::manual(entry("yesterday"), now()).is_err());
    }
}
