//! Hosted backend collaborators.
//!
//! The console delegates persistence and authentication to a hosted backend.
//! Two seams describe what it needs:
//!
//! - [`DocumentStore`]: named collections of JSON documents with independent
//!   read/write round-trips and live subscriptions that push the *full*
//!   current result set on every change.
//! - [`IdentityProvider`]: email/password accounts. Failures carry a
//!   provider code such as `auth/user-not-found`.
//!
//! Implementations:
//!
//! - [`memory`]: in-process store and identity provider (development, tests)
//! - [`firestore`]: Firestore REST API, subscriptions driven by polling
//! - [`identity_toolkit`]: Identity Toolkit REST API

pub mod firestore;
pub mod identity_toolkit;
pub mod memory;

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use chosen_one_core::{DocumentId, Email, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::BackendConfig;

pub use firestore::FirestoreStore;
pub use identity_toolkit::IdentityToolkit;
pub use memory::{InMemoryIdentity, InMemoryStore};

/// Field map of a stored document.
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// Provider error codes surfaced by [`IdentityProvider`] implementations.
pub mod codes {
    pub const USER_NOT_FOUND: &str = "auth/user-not-found";
    pub const WRONG_PASSWORD: &str = "auth/wrong-password";
    pub const INVALID_CREDENTIAL: &str = "auth/invalid-credential";
    pub const INVALID_EMAIL: &str = "auth/invalid-email";
    pub const USER_DISABLED: &str = "auth/user-disabled";
    pub const TOO_MANY_REQUESTS: &str = "auth/too-many-requests";
    pub const EMAIL_IN_USE: &str = "auth/email-already-in-use";
    pub const WEAK_PASSWORD: &str = "auth/weak-password";
    pub const REQUIRES_RECENT_LOGIN: &str = "auth/requires-recent-login";
    pub const TOKEN_EXPIRED: &str = "auth/user-token-expired";
    pub const INTERNAL: &str = "auth/internal-error";
}

/// Errors returned by backend collaborators.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend could not be reached.
    #[error("{0}")]
    Unavailable(String),

    /// A document addressed by ID does not exist.
    #[error("No document to update: {collection}/{id}")]
    NotFound { collection: Collection, id: DocumentId },

    /// Security rules rejected the request.
    #[error("Missing or insufficient permissions: {0}")]
    PermissionDenied(String),

    /// The provider rejected the request with a coded error.
    #[error("{message}")]
    Provider { code: String, message: String },

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Failed to parse a response.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl BackendError {
    /// Build a provider error whose message embeds the code.
    #[must_use]
    pub fn provider(code: &str) -> Self {
        Self::Provider {
            code: code.to_string(),
            message: format!("Error ({code})."),
        }
    }

    /// Machine-readable code, in the provider's vocabulary.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::Unavailable(_) => "unavailable",
            Self::NotFound { .. } => "not-found",
            Self::PermissionDenied(_) => "permission-denied",
            Self::Provider { code, .. } => code,
            Self::Http(e) if e.is_connect() || e.is_timeout() => "unavailable",
            Self::Http(_) | Self::Parse(_) => "internal",
        }
    }

    /// Whether the failure looks like lost connectivity.
    #[must_use]
    pub fn is_offline(&self) -> bool {
        self.code() == "unavailable" || self.to_string().contains("offline")
    }
}

/// Named collections used by the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Orders,
    Products,
    Users,
}

impl Collection {
    /// Collection path segment.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Orders => "orders",
            Self::Products => "products",
            Self::Users => "users",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A stored document: its ID plus raw fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub fields: Fields,
}

impl Document {
    #[must_use]
    pub fn new(id: impl Into<DocumentId>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Field lookup.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.fields.get(name)
    }
}

/// Complete current contents of a collection at one point in time.
///
/// Snapshots are immutable and cheap to clone; every consumer sees the same
/// documents without copying them.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub collection: Collection,
    pub documents: Arc<[Document]>,
}

impl Snapshot {
    #[must_use]
    pub fn new(collection: Collection, documents: Vec<Document>) -> Self {
        Self {
            collection,
            documents: documents.into(),
        }
    }

    /// Empty snapshot, used before the first delivery.
    #[must_use]
    pub fn empty(collection: Collection) -> Self {
        Self::new(collection, Vec::new())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Live feed of snapshots for one collection.
///
/// Snapshots arrive in delivery order and are never coalesced. Dropping the
/// subscription unsubscribes: the sender side notices the closed channel, and
/// any producer task owned by the subscription is aborted.
#[derive(Debug)]
pub struct Subscription {
    collection: Collection,
    rx: mpsc::UnboundedReceiver<Snapshot>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Subscription fed by an external sender.
    #[must_use]
    pub const fn new(collection: Collection, rx: mpsc::UnboundedReceiver<Snapshot>) -> Self {
        Self {
            collection,
            rx,
            task: None,
        }
    }

    /// Subscription fed by a task it owns.
    #[must_use]
    pub const fn with_task(
        collection: Collection,
        rx: mpsc::UnboundedReceiver<Snapshot>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            collection,
            rx,
            task: Some(task),
        }
    }

    #[must_use]
    pub const fn collection(&self) -> Collection {
        self.collection
    }

    /// Wait for the next snapshot. `None` once the source has shut down.
    pub async fn next(&mut self) -> Option<Snapshot> {
        self.rx.recv().await
    }

    /// Take a snapshot if one is already queued.
    pub fn try_next(&mut self) -> Option<Snapshot> {
        self.rx.try_recv().ok()
    }
}

impl futures::Stream for Subscription {
    type Item = Snapshot;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Document storage with live subscriptions.
///
/// Every method is an independent round-trip; there are no multi-document
/// transactions.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read every document in a collection.
    async fn list(&self, collection: Collection) -> Result<Vec<Document>, BackendError>;

    /// Read one document. `Ok(None)` when it does not exist.
    async fn get(
        &self,
        collection: Collection,
        id: &DocumentId,
    ) -> Result<Option<Document>, BackendError>;

    /// Add a document under a generated ID.
    async fn create(&self, collection: Collection, fields: Fields)
    -> Result<DocumentId, BackendError>;

    /// Merge fields into an existing document. Fails with `NotFound` if absent.
    async fn update(
        &self,
        collection: Collection,
        id: &DocumentId,
        fields: Fields,
    ) -> Result<(), BackendError>;

    /// Merge fields into a document, creating it if absent.
    async fn set_merge(
        &self,
        collection: Collection,
        id: &DocumentId,
        fields: Fields,
    ) -> Result<(), BackendError>;

    /// Remove a document. Removing a missing document succeeds.
    async fn delete(&self, collection: Collection, id: &DocumentId) -> Result<(), BackendError>;

    /// Open a live feed. The current contents are delivered first.
    async fn subscribe(&self, collection: Collection) -> Result<Subscription, BackendError>;
}

/// The signed-in principal as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub uid: UserId,
    pub email: Email,
    pub display_name: Option<String>,
}

impl AuthUser {
    /// Name shown on orders: display name, falling back to the email.
    #[must_use]
    pub fn name_or_email(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| self.email.as_str())
    }
}

/// Email/password identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Sign in with existing credentials.
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, BackendError>;

    /// Create an account and sign it in.
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, BackendError>;

    /// Change the display name of a signed-in user.
    async fn update_profile(
        &self,
        uid: &UserId,
        display_name: &str,
    ) -> Result<AuthUser, BackendError>;

    /// Change the password of a signed-in user.
    async fn update_password(&self, uid: &UserId, new_password: &str) -> Result<(), BackendError>;

    /// End the user's provider session.
    async fn sign_out(&self, uid: &UserId) -> Result<(), BackendError>;
}

/// Shared handles to the configured backend.
#[derive(Clone)]
pub struct Backend {
    pub store: Arc<dyn DocumentStore>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend").finish_non_exhaustive()
    }
}

impl Backend {
    /// Connect to the backend selected in configuration.
    ///
    /// # Errors
    ///
    /// Returns error if an HTTP client fails to build.
    pub fn connect(config: &BackendConfig) -> Result<Self, BackendError> {
        match config {
            BackendConfig::Memory => {
                tracing::info!("Using in-memory backend");
                Ok(Self::in_memory())
            }
            BackendConfig::Firebase(firebase) => {
                tracing::info!(project_id = %firebase.project_id, "Using Firebase backend");
                Ok(Self {
                    store: Arc::new(FirestoreStore::new(firebase)?),
                    identity: Arc::new(IdentityToolkit::new(firebase)?),
                })
            }
        }
    }

    /// Fresh in-memory store and identity provider.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(InMemoryStore::new()),
            identity: Arc::new(InMemoryIdentity::new()),
        }
    }
}
