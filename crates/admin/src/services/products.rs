//! Product catalog management.

use std::collections::HashSet;

use chosen_one_core::{DocumentId, ProductId};
use serde_json::json;
use thiserror::Error;
use tracing::instrument;

use crate::backend::{BackendError, Collection, DocumentStore, Fields};
use crate::models::{NewProduct, Product, demo_products};

/// Below this many stored products the demo catalog is topped up.
pub const DEMO_CATALOG_SIZE: usize = 10;

#[derive(Debug, Error)]
pub enum ProductError {
    #[error("Failed to load products: {0}")]
    Load(#[source] BackendError),

    #[error("Failed to add product: {0}")]
    Add(#[source] BackendError),

    #[error("Failed to reset demo products: {0}")]
    Reset(#[source] BackendError),

    #[error("Failed to update stock: {0}")]
    Stock(#[source] BackendError),
}

impl ProductError {
    /// The backend failure underneath.
    #[must_use]
    pub const fn backend(&self) -> &BackendError {
        match self {
            Self::Load(e) | Self::Add(e) | Self::Reset(e) | Self::Stock(e) => e,
        }
    }

    #[must_use]
    pub fn into_backend(self) -> BackendError {
        match self {
            Self::Load(e) | Self::Add(e) | Self::Reset(e) | Self::Stock(e) => e,
        }
    }
}

/// Catalog view of a snapshot: sorted by name, one entry per name.
///
/// The first product seen under a name wins.
#[must_use]
pub fn catalog(mut products: Vec<Product>) -> Vec<Product> {
    products.sort_by(|a, b| a.name.cmp(&b.name));
    let mut seen = HashSet::new();
    products.retain(|p| seen.insert(p.name.clone()));
    products
}

/// Products whose name or category contains `needle`.
#[must_use]
pub fn search(products: &[Product], needle: &str) -> Vec<Product> {
    products.iter().filter(|p| p.matches(needle)).cloned().collect()
}

/// Product service over a document store.
pub struct ProductService<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> ProductService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Every stored product, in store order.
    ///
    /// # Errors
    ///
    /// Returns `ProductError::Load` if the store cannot be read.
    pub async fn list(&self) -> Result<Vec<Product>, ProductError> {
        let docs = self
            .store
            .list(Collection::Products)
            .await
            .map_err(ProductError::Load)?;
        Ok(docs.iter().map(Product::from_document).collect())
    }

    /// Add a product.
    ///
    /// # Errors
    ///
    /// Returns `ProductError::Add` if the write fails.
    #[instrument(skip(self, product), fields(name = %product.name))]
    pub async fn add(&self, product: NewProduct) -> Result<ProductId, ProductError> {
        let id = self
            .store
            .create(Collection::Products, product.into_fields())
            .await
            .map_err(ProductError::Add)?;
        tracing::info!(product_id = %id, "Product added");
        Ok(id.into())
    }

    /// Add the demo products missing by name, if fewer than
    /// [`DEMO_CATALOG_SIZE`] products exist. Returns how many were added.
    ///
    /// # Errors
    ///
    /// Returns `ProductError::Add` on the first failed write. Products added
    /// before the failure stay.
    #[instrument(skip_all, fields(existing = existing.len()))]
    pub async fn seed_missing(&self, existing: &[Product]) -> Result<usize, ProductError> {
        if existing.len() >= DEMO_CATALOG_SIZE {
            return Ok(0);
        }
        let names: HashSet<&str> = existing.iter().map(|p| p.name.as_str()).collect();
        let missing: Vec<NewProduct> = demo_products()
            .into_iter()
            .filter(|p| !names.contains(p.name.as_str()))
            .collect();

        let added = missing.len();
        for product in missing {
            self.store
                .create(Collection::Products, product.into_fields())
                .await
                .map_err(ProductError::Add)?;
        }
        if added > 0 {
            tracing::info!(added, "Seeded demo products");
        }
        Ok(added)
    }

    /// Delete every product, then add the full demo catalog.
    ///
    /// # Errors
    ///
    /// Returns `ProductError::Reset` on the first failed read or write.
    #[instrument(skip(self))]
    pub async fn reset_demo(&self) -> Result<usize, ProductError> {
        let docs = self
            .store
            .list(Collection::Products)
            .await
            .map_err(ProductError::Reset)?;
        let deletes = docs
            .iter()
            .map(|doc| self.store.delete(Collection::Products, &doc.id));
        for result in futures::future::join_all(deletes).await {
            result.map_err(ProductError::Reset)?;
        }

        let demo = demo_products();
        let added = demo.len();
        for product in demo {
            self.store
                .create(Collection::Products, product.into_fields())
                .await
                .map_err(ProductError::Reset)?;
        }
        tracing::info!(removed = docs.len(), added, "Reset demo products");
        Ok(added)
    }

    /// Read the product and write `stock = max(stock + change, 0)`.
    ///
    /// Returns the new stock, or `None` if the product does not exist.
    ///
    /// # Errors
    ///
    /// Returns `ProductError::Stock` if the read or the write fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn adjust_stock(
        &self,
        id: &ProductId,
        change: i64,
    ) -> Result<Option<u32>, ProductError> {
        let doc_id = DocumentId::from(id.clone());
        let Some(doc) = self
            .store
            .get(Collection::Products, &doc_id)
            .await
            .map_err(ProductError::Stock)?
        else {
            tracing::debug!("Product gone, stock left alone");
            return Ok(None);
        };

        let stock = stock_after(Product::from_document(&doc).stock, change);

        let mut fields = Fields::new();
        fields.insert("stock".to_string(), json!(stock));
        self.store
            .update(Collection::Products, &doc_id, fields)
            .await
            .map_err(ProductError::Stock)?;
        Ok(Some(stock))
    }
}

/// Apply a signed stock change, saturating at zero and `u32::MAX`.
fn stock_after(current: u32, change: i64) -> u32 {
    let magnitude = u32::try_from(change.unsigned_abs()).unwrap_or(u32::MAX);
    if change < 0 {
        current.saturating_sub(magnitude)
    } else {
        current.saturating_add(magnitude)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chosen_one_core::ProductStatus;

    use super::*;
    use crate::backend::{Document, InMemoryStore};

    fn product(id: &str, name: &str, category: &str) -> Product {
        Product {
            id: ProductId::new(id),
            name: name.to_string(),
            category: category.to_string(),
            price: "$10".to_string(),
            stock: 1,
            status: Some(ProductStatus::InStock),
            image: String::new(),
        }
    }

    fn new_product(name: &str, stock: u32) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            category: "Fashion".to_string(),
            price: "$10".to_string(),
            stock,
            status: ProductStatus::InStock,
            image: String::new(),
        }
    }

    #[test]
    fn test_catalog_sorts_and_dedupes_first_wins() {
        let list = catalog(vec![
            product("1", "Silk Scarf", "Fashion"),
            product("2", "Diamond Ring", "Jewelry"),
            product("3", "Silk Scarf", "Fashion"),
        ]);
        let ids: Vec<&str> = list.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["2", "1"]);
    }

    #[test]
    fn test_search_name_or_category() {
        let list = [
            product("1", "Silk Scarf", "Fashion"),
            product("2", "Diamond Ring", "Jewelry"),
        ];
        assert_eq!(search(&list, "JEWEL").len(), 1);
        assert_eq!(search(&list, "scarf")[0].id.as_str(), "1");
        assert_eq!(search(&list, "").len(), 2);
    }

    #[tokio::test]
    async fn test_seed_missing_tops_up_by_name() {
        let store = InMemoryStore::new();
        let svc = ProductService::new(&store);
        svc.add(new_product("Silk Scarf", 3)).await.unwrap();

        let existing = svc.list().await.unwrap();
        assert_eq!(svc.seed_missing(&existing).await.unwrap(), 9);

        let all = svc.list().await.unwrap();
        assert_eq!(all.len(), 10);
        assert_eq!(svc.seed_missing(&all).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reset_demo() {
        let store = InMemoryStore::new();
        let svc = ProductService::new(&store);
        svc.add(new_product("Custom Hat", 3)).await.unwrap();

        assert_eq!(svc.reset_demo().await.unwrap(), 10);
        let names: Vec<String> = svc.list().await.unwrap().into_iter().map(|p| p.name).collect();
        assert!(!names.contains(&"Custom Hat".to_string()));
        assert_eq!(names.len(), 10);
    }

    #[tokio::test]
    async fn test_adjust_stock_floors_at_zero() {
        let store = InMemoryStore::new();
        let svc = ProductService::new(&store);
        let id = svc.add(new_product("Silk Scarf", 1)).await.unwrap();

        assert_eq!(svc.adjust_stock(&id, -1).await.unwrap(), Some(0));
        assert_eq!(svc.adjust_stock(&id, -1).await.unwrap(), Some(0));
        assert_eq!(svc.adjust_stock(&id, 4).await.unwrap(), Some(4));
        assert_eq!(svc.adjust_stock(&ProductId::new("gone"), -1).await.unwrap(), None);
    }

    #[test]
    fn test_stock_after_saturates() {
        assert_eq!(stock_after(5, 3), 8);
        assert_eq!(stock_after(5, -7), 0);
        assert_eq!(stock_after(5, i64::MAX), u32::MAX);
        assert_eq!(stock_after(5, i64::MIN), 0);
        assert_eq!(stock_after(u32::MAX, 1), u32::MAX);
        assert_eq!(stock_after(0, i64::from(u32::MAX) + 1), u32::MAX);
    }

    #[tokio::test]
    async fn test_adjust_stock_extreme_changes() {
        let store = InMemoryStore::new();
        let svc = ProductService::new(&store);
        let id = svc.add(new_product("Silk Scarf", 5)).await.unwrap();

        assert_eq!(svc.adjust_stock(&id, i64::MAX).await.unwrap(), Some(u32::MAX));
        assert_eq!(svc.adjust_stock(&id, i64::MIN).await.unwrap(), Some(0));
        assert_eq!(svc.adjust_stock(&id, 12).await.unwrap(), Some(12));
    }

    #[tokio::test]
    async fn test_adjust_stock_reads_lenient_stock() {
        let store = InMemoryStore::new();
        let id = store
            .create(
                Collection::Products,
                json!({"name": "Odd", "stock": "7"}).as_object().cloned().unwrap(),
            )
            .await
            .unwrap();
        let svc = ProductService::new(&store);
        assert_eq!(svc.adjust_stock(&id.clone().into(), -1).await.unwrap(), Some(6));

        let doc: Document = store.get(Collection::Products, &id).await.unwrap().unwrap();
        assert_eq!(doc.field("stock"), Some(&json!(6)));
    }

    #[tokio::test]
    async fn test_add_failure_message() {
        let store = InMemoryStore::new();
        store.deny_writes(Collection::Products);
        let err = ProductService::new(&store)
            .add(new_product("Silk Scarf", 1))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Failed to add product: "));
    }
}
