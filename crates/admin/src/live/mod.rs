//! Live views.
//!
//! A view owns its subscriptions and a private copy of the latest snapshot
//! from each. Every call to `next()` waits for one delivery (a snapshot, or a
//! change of principal), recomputes the view's state from scratch and hands
//! it back. Search text changes recompute immediately from the held
//! snapshots. Dropping a view drops its subscriptions, which unsubscribes.
//!
//! ```text
//! store.subscribe ──► Feed ──► view.next() ──► state ──► SSE / CLI
//!                       ▲
//! AuthState ────────────┘ (per-user views only)
//! ```

mod analytics;
mod dashboard;
mod orders;
mod products;

pub use analytics::AnalyticsView;
pub use dashboard::DashboardView;
pub use orders::{OrdersPage, OrdersView};
pub use products::{ProductsPage, ProductsView};

use thiserror::Error;
use tokio::sync::watch;

use crate::backend::{AuthUser, BackendError, Collection, DocumentStore, Snapshot, Subscription};

/// A view could not open its subscriptions.
#[derive(Debug, Error)]
#[error("Failed to load {collection}: {source}")]
pub struct LiveError {
    pub collection: Collection,
    #[source]
    pub source: BackendError,
}

/// One subscription plus the latest snapshot it delivered.
#[derive(Debug)]
struct Feed {
    subscription: Subscription,
    latest: Snapshot,
}

impl Feed {
    async fn open(store: &dyn DocumentStore, collection: Collection) -> Result<Self, LiveError> {
        let mut subscription = store
            .subscribe(collection)
            .await
            .map_err(|source| LiveError { collection, source })?;
        let latest = subscription
            .try_next()
            .unwrap_or_else(|| Snapshot::empty(collection));
        Ok(Self {
            subscription,
            latest,
        })
    }

    /// Wait for the next snapshot and keep it. `false` once the source closed.
    async fn advance(&mut self) -> bool {
        match self.subscription.next().await {
            Some(snapshot) => {
                tracing::trace!(
                    collection = %snapshot.collection,
                    documents = snapshot.len(),
                    "Snapshot received"
                );
                self.latest = snapshot;
                true
            }
            None => false,
        }
    }
}

/// Follows the signed-in principal.
///
/// If the sending side goes away the last principal is kept.
#[derive(Debug)]
struct Principal {
    rx: watch::Receiver<Option<AuthUser>>,
    open: bool,
}

impl Principal {
    fn new(mut rx: watch::Receiver<Option<AuthUser>>) -> Self {
        rx.mark_unchanged();
        Self { rx, open: true }
    }

    fn current(&self) -> Option<AuthUser> {
        self.rx.borrow().clone()
    }

    async fn changed(&mut self) {
        if self.rx.changed().await.is_err() {
            self.open = false;
        }
    }
}

/// What woke a per-user view.
enum Wake {
    Snapshot(bool),
    Principal,
}

/// Wait for whichever comes first: a snapshot on `feed` or a principal change.
async fn wake(feed: &mut Feed, principal: &mut Principal) -> Wake {
    tokio::select! {
        delivered = feed.advance() => Wake::Snapshot(delivered),
        () = principal.changed(), if principal.open => Wake::Principal,
    }
}
