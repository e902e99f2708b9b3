//! Catalog products and the demo catalog.

use chosen_one_core::{Price, ProductId, ProductStatus};
use serde::{Deserialize, Serialize};

use super::lenient;
use crate::backend::{Document, Fields};

/// A product as read from the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub category: String,
    pub price: String,
    pub stock: u32,
    pub status: Option<ProductStatus>,
    pub image: String,
}

impl Product {
    /// Read a product from a stored document. Never fails.
    #[must_use]
    pub fn from_document(doc: &Document) -> Self {
        let f = &doc.fields;
        Self {
            id: doc.id.clone().into(),
            name: lenient::text(f, "name").unwrap_or_default(),
            category: lenient::text(f, "category").unwrap_or_default(),
            price: lenient::text(f, "price").unwrap_or_default(),
            stock: lenient::count(f, "stock").unwrap_or(0),
            status: lenient::parsed(f, "status"),
            image: lenient::text(f, "image").unwrap_or_default(),
        }
    }

    #[must_use]
    pub fn unit_price(&self) -> Price {
        Price::parse_lenient(&self.price)
    }

    /// Case-insensitive search over name and category.
    #[must_use]
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.name.to_lowercase().contains(&needle) || self.category.to_lowercase().contains(&needle)
    }
}

/// A product about to be written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub category: String,
    pub price: String,
    pub stock: u32,
    #[serde(default)]
    pub status: ProductStatus,
    #[serde(default)]
    pub image: String,
}

impl NewProduct {
    /// Field map for the document store.
    #[must_use]
    pub fn into_fields(self) -> Fields {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => Fields::new(),
        }
    }
}

/// Demo catalog: name, category, price, stock, status.
const DEMO_CATALOG: [(&str, &str, &str, u32, ProductStatus); 10] = [
    ("Luxury Watch", "Accessories", "$1,200", 45, ProductStatus::InStock),
    ("Designer Bag", "Fashion", "$850", 23, ProductStatus::LowStock),
    ("Premium Perfume", "Beauty", "$450", 67, ProductStatus::InStock),
    ("Gold Necklace", "Jewelry", "$2,100", 12, ProductStatus::LowStock),
    ("Diamond Ring", "Jewelry", "$3,500", 8, ProductStatus::OutOfStock),
    ("Silk Scarf", "Fashion", "$180", 34, ProductStatus::InStock),
    ("Leather Wallet", "Accessories", "$220", 50, ProductStatus::InStock),
    ("Sunglasses", "Accessories", "$320", 40, ProductStatus::InStock),
    ("Cashmere Sweater", "Fashion", "$1,100", 15, ProductStatus::LowStock),
    ("Pearl Earrings", "Jewelry", "$900", 20, ProductStatus::InStock),
];

/// The ten demo products, in catalog order.
///
/// Images are file names such as `Luxury-Watch.jpeg`, resolved by the
/// presentation layer.
#[must_use]
pub fn demo_products() -> Vec<NewProduct> {
    DEMO_CATALOG
        .iter()
        .map(|&(name, category, price, stock, status)| NewProduct {
            name: name.to_string(),
            category: category.to_string(),
            price: price.to_string(),
            stock,
            status,
            image: format!("{}.jpeg", name.replace(' ', "-")),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_demo_catalog() {
        let demo = demo_products();
        assert_eq!(demo.len(), 10);
        assert_eq!(demo[0].image, "Luxury-Watch.jpeg");
        assert_eq!(demo[8].image, "Cashmere-Sweater.jpeg");
        assert_eq!(demo[4].status, ProductStatus::OutOfStock);
    }

    #[test]
    fn test_new_product_fields() {
        let fields = demo_products().remove(1).into_fields();
        assert_eq!(fields["name"], "Designer Bag");
        assert_eq!(fields["stock"], 23);
        assert_eq!(fields["status"], "Low Stock");
    }

    #[test]
    fn test_from_document_defaults() {
        let doc = Document::new(
            "p1",
            json!({"name": "Mystery", "stock": -4, "status": "Discontinued"})
                .as_object()
                .cloned()
                .unwrap_or_default(),
        );
        let product = Product::from_document(&doc);
        assert_eq!(product.stock, 0);
        assert_eq!(product.status, None);
        assert_eq!(product.category, "");
        assert!(product.unit_price().amount().abs() < f64::EPSILON);
    }

    #[test]
    fn test_matches_name_or_category() {
        let product = Product::from_document(&Document::new(
            "p1",
            json!({"name": "Gold Necklace", "category": "Jewelry"})
                .as_object()
                .cloned()
                .unwrap_or_default(),
        ));
        assert!(product.matches("gold"));
        assert!(product.matches("JEWEL"));
        assert!(!product.matches("watch"));
    }
}
