//! The signed-in user's dashboard.

use chrono::Local;
use tokio::sync::watch;

use super::{Feed, LiveError, Principal, Wake, wake};
use crate::aggregation::orders_in;
use crate::backend::{AuthUser, Collection, DocumentStore};
use crate::services::DashboardSummary;

#[derive(Debug)]
pub struct DashboardView {
    feed: Feed,
    principal: Principal,
    total_queries: usize,
    search: String,
    summary: Option<DashboardSummary>,
}

impl DashboardView {
    /// Subscribe to orders for whoever `auth` reports as signed in.
    ///
    /// # Errors
    ///
    /// Returns `LiveError` if the subscription cannot be opened.
    pub async fn open(
        store: &dyn DocumentStore,
        auth: watch::Receiver<Option<AuthUser>>,
        total_queries: usize,
    ) -> Result<Self, LiveError> {
        let mut view = Self {
            feed: Feed::open(store, Collection::Orders).await?,
            principal: Principal::new(auth),
            total_queries,
            search: String::new(),
            summary: None,
        };
        view.recompute();
        Ok(view)
    }

    /// Wait for the next delivery and recompute. The outer `None` means the
    /// feed closed; the inner `None` means nobody is signed in.
    pub async fn next(&mut self) -> Option<Option<&DashboardSummary>> {
        if let Wake::Snapshot(false) = wake(&mut self.feed, &mut self.principal).await {
            return None;
        }
        self.recompute();
        Some(self.summary.as_ref())
    }

    pub fn set_search(&mut self, search: &str) -> Option<&DashboardSummary> {
        search.clone_into(&mut self.search);
        self.recompute();
        self.summary.as_ref()
    }

    pub fn set_total_queries(&mut self, total: usize) {
        self.total_queries = total;
        self.recompute();
    }

    #[must_use]
    pub const fn summary(&self) -> Option<&DashboardSummary> {
        self.summary.as_ref()
    }

    fn recompute(&mut self) {
        self.summary = self.principal.current().map(|user| {
            DashboardSummary::compute(
                &user,
                &orders_in(&self.feed.latest),
                self.total_queries,
                &self.search,
                Local::now().date_naive(),
                &Local,
            )
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chosen_one_core::{Email, UserId};
    use serde_json::json;

    use super::*;
    use crate::backend::InMemoryStore;
    use crate::services::AuthState;

    #[tokio::test]
    async fn test_dashboard_tracks_orders() {
        let store = InMemoryStore::new();
        let auth = AuthState::new();
        let mut view = DashboardView::open(&store, auth.subscribe(), 6).await.unwrap();
        assert!(view.summary().is_none());

        auth.set(Some(AuthUser {
            uid: UserId::new("u1"),
            email: Email::parse("u@x.com").unwrap(),
            display_name: None,
        }));
        let summary = view.next().await.unwrap().unwrap();
        assert_eq!(summary.total_orders, 0);
        assert_eq!(summary.total_queries, 6);

        store
            .create(
                Collection::Orders,
                json!({"userEmail": "u@x.com", "orderDate": "2023-05-01", "productPrice": "$100", "productName": "Bag"})
                    .as_object()
                    .cloned()
                    .unwrap(),
            )
            .await
            .unwrap();
        let summary = view.next().await.unwrap().unwrap();
        assert_eq!(summary.total_orders, 1);
        assert_eq!(summary.metrics.revenue_by_month.get("2023-5"), Some(&100.0));

        view.set_total_queries(7);
        assert_eq!(view.summary().unwrap().total_queries, 7);
    }
}
