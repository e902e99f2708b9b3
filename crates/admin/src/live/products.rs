//! The product catalog.

use serde::Serialize;

use super::{Feed, LiveError};
use crate::aggregation::products_in;
use crate::backend::{Collection, DocumentStore};
use crate::models::Product;
use crate::services::products::{catalog, search};

/// Catalog state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductsPage {
    /// Unique products matching the search text, sorted by name.
    pub products: Vec<Product>,
    /// Documents in the latest snapshot, duplicates included.
    pub stored: usize,
}

#[derive(Debug)]
pub struct ProductsView {
    feed: Feed,
    search: String,
    page: ProductsPage,
}

impl ProductsView {
    /// # Errors
    ///
    /// Returns `LiveError` if the subscription cannot be opened.
    pub async fn open(store: &dyn DocumentStore) -> Result<Self, LiveError> {
        let mut view = Self {
            feed: Feed::open(store, Collection::Products).await?,
            search: String::new(),
            page: ProductsPage::default(),
        };
        view.recompute();
        Ok(view)
    }

    /// Wait for the next snapshot and recompute. `None` once the feed closed.
    pub async fn next(&mut self) -> Option<&ProductsPage> {
        if !self.feed.advance().await {
            return None;
        }
        self.recompute();
        Some(&self.page)
    }

    pub fn set_search(&mut self, search: &str) -> &ProductsPage {
        search.clone_into(&mut self.search);
        self.recompute();
        &self.page
    }

    #[must_use]
    pub const fn page(&self) -> &ProductsPage {
        &self.page
    }

    /// Every product in the latest snapshot, in store order.
    #[must_use]
    pub fn stored_products(&self) -> Vec<Product> {
        products_in(&self.feed.latest)
    }

    fn recompute(&mut self) {
        let unique = catalog(products_in(&self.feed.latest));
        self.page = ProductsPage {
            products: search(&unique, &self.search),
            stored: self.feed.latest.len(),
        };
    }
}
