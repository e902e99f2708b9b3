//! Application state shared across handlers.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::backend::{Backend, DocumentStore, IdentityProvider};
use crate::config::AdminConfig;
use crate::services::QueryInbox;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    backend: Backend,
    queries: RwLock<QueryInbox>,
}

impl AppState {
    /// Build state over an already connected backend.
    #[must_use]
    pub fn new(config: AdminConfig, backend: Backend) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                backend,
                queries: RwLock::new(QueryInbox::new()),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn backend(&self) -> &Backend {
        &self.inner.backend
    }

    #[must_use]
    pub fn store(&self) -> &dyn DocumentStore {
        self.inner.backend.store.as_ref()
    }

    #[must_use]
    pub fn identity(&self) -> &dyn IdentityProvider {
        self.inner.backend.identity.as_ref()
    }

    /// The shared inquiry inbox.
    #[must_use]
    pub fn queries(&self) -> &RwLock<QueryInbox> {
        &self.inner.queries
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.inner.config)
            .field("backend", &self.inner.backend)
            .finish_non_exhaustive()
    }
}
