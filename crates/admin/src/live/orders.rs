//! The signed-in user's order list.

use serde::Serialize;
use tokio::sync::watch;

use super::{Feed, LiveError, Principal, Wake, wake};
use crate::aggregation::orders_in;
use crate::backend::{AuthUser, Collection, DocumentStore};
use crate::models::Order;
use crate::services::orders::{OrderCounts, search, user_orders};

/// Order list state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrdersPage {
    /// User's orders matching the search text, newest first.
    pub orders: Vec<Order>,
    /// Counts over all of the user's orders, ignoring the search text.
    pub counts: OrderCounts,
}

#[derive(Debug)]
pub struct OrdersView {
    feed: Feed,
    principal: Principal,
    search: String,
    page: OrdersPage,
}

impl OrdersView {
    /// Subscribe to orders for whoever `auth` reports as signed in.
    ///
    /// # Errors
    ///
    /// Returns `LiveError` if the subscription cannot be opened.
    pub async fn open(
        store: &dyn DocumentStore,
        auth: watch::Receiver<Option<AuthUser>>,
    ) -> Result<Self, LiveError> {
        let mut view = Self {
            feed: Feed::open(store, Collection::Orders).await?,
            principal: Principal::new(auth),
            search: String::new(),
            page: OrdersPage::default(),
        };
        view.recompute();
        Ok(view)
    }

    /// Wait for the next delivery and recompute. `None` once the feed closed.
    pub async fn next(&mut self) -> Option<&OrdersPage> {
        if let Wake::Snapshot(false) = wake(&mut self.feed, &mut self.principal).await {
            return None;
        }
        self.recompute();
        Some(&self.page)
    }

    pub fn set_search(&mut self, search: &str) -> &OrdersPage {
        search.clone_into(&mut self.search);
        self.recompute();
        &self.page
    }

    #[must_use]
    pub const fn page(&self) -> &OrdersPage {
        &self.page
    }

    fn recompute(&mut self) {
        let Some(user) = self.principal.current() else {
            self.page = OrdersPage::default();
            return;
        };
        let mine = user_orders(&orders_in(&self.feed.latest), &user.email);
        self.page = OrdersPage {
            counts: OrderCounts::of(&mine),
            orders: search(&mine, &self.search),
        };
    }
}
