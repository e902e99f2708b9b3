//! In-process backend.
//!
//! [`InMemoryStore`] keeps collections in insertion order and pushes the full
//! collection to every live subscriber after each write, which is the same
//! contract the hosted store offers. Connectivity faults can be simulated
//! with [`InMemoryStore::set_offline`] and [`InMemoryStore::deny_writes`].
//!
//! [`InMemoryIdentity`] holds email/password accounts and reproduces the
//! provider's error codes, including lockout after repeated failures and the
//! recent-login requirement for password changes.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chosen_one_core::{DocumentId, Email, UserId};
use tokio::sync::mpsc;

use super::{
    AuthUser, BackendError, Collection, Document, DocumentStore, Fields, IdentityProvider,
    Snapshot, Subscription, codes,
};

const OFFLINE_MESSAGE: &str = "Failed to reach the backend because the client is offline.";

/// Consecutive failed sign-ins before the account is throttled.
const MAX_FAILED_ATTEMPTS: u32 = 5;

/// Minimum password length enforced by the provider.
const MIN_PASSWORD_LEN: usize = 6;

/// How long after sign-in a password change is still allowed.
const RECENT_LOGIN_WINDOW: Duration = Duration::from_secs(5 * 60);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// Document store
// =============================================================================

/// In-process document store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: Mutex<StoreInner>,
}

#[derive(Debug, Default)]
struct StoreInner {
    collections: HashMap<Collection, Vec<Document>>,
    subscribers: HashMap<Collection, Vec<mpsc::UnboundedSender<Snapshot>>>,
    read_only: HashSet<Collection>,
    offline: bool,
}

impl StoreInner {
    fn check_online(&self) -> Result<(), BackendError> {
        if self.offline {
            return Err(BackendError::Unavailable(OFFLINE_MESSAGE.to_string()));
        }
        Ok(())
    }

    fn check_writable(&self, collection: Collection) -> Result<(), BackendError> {
        self.check_online()?;
        if self.read_only.contains(&collection) {
            return Err(BackendError::PermissionDenied(format!(
                "writes to {collection} are not allowed"
            )));
        }
        Ok(())
    }

    fn snapshot(&self, collection: Collection) -> Snapshot {
        Snapshot::new(
            collection,
            self.collections.get(&collection).cloned().unwrap_or_default(),
        )
    }

    /// Push the current contents to every subscriber, dropping closed ones.
    fn publish(&mut self, collection: Collection) {
        let snapshot = self.snapshot(collection);
        if let Some(subscribers) = self.subscribers.get_mut(&collection) {
            subscribers.retain(|tx| tx.send(snapshot.clone()).is_ok());
            tracing::trace!(
                %collection,
                subscribers = subscribers.len(),
                documents = snapshot.len(),
                "Published snapshot"
            );
        }
    }
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate losing (or regaining) connectivity.
    pub fn set_offline(&self, offline: bool) {
        lock(&self.inner).offline = offline;
    }

    /// Reject every write to a collection with `PermissionDenied`.
    pub fn deny_writes(&self, collection: Collection) {
        lock(&self.inner).read_only.insert(collection);
    }

    /// Undo [`Self::deny_writes`].
    pub fn allow_writes(&self, collection: Collection) {
        lock(&self.inner).read_only.remove(&collection);
    }

    /// Number of live subscribers on a collection.
    #[must_use]
    pub fn subscriber_count(&self, collection: Collection) -> usize {
        let mut inner = lock(&self.inner);
        inner.subscribers.get_mut(&collection).map_or(0, |subs| {
            subs.retain(|tx| !tx.is_closed());
            subs.len()
        })
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn list(&self, collection: Collection) -> Result<Vec<Document>, BackendError> {
        let inner = lock(&self.inner);
        inner.check_online()?;
        Ok(inner.collections.get(&collection).cloned().unwrap_or_default())
    }

    async fn get(
        &self,
        collection: Collection,
        id: &DocumentId,
    ) -> Result<Option<Document>, BackendError> {
        let inner = lock(&self.inner);
        inner.check_online()?;
        Ok(inner
            .collections
            .get(&collection)
            .and_then(|docs| docs.iter().find(|d| &d.id == id))
            .cloned())
    }

    async fn create(
        &self,
        collection: Collection,
        fields: Fields,
    ) -> Result<DocumentId, BackendError> {
        let mut inner = lock(&self.inner);
        inner.check_writable(collection)?;

        let id = DocumentId::new(uuid::Uuid::new_v4().simple().to_string());
        inner
            .collections
            .entry(collection)
            .or_default()
            .push(Document::new(id.clone(), fields));
        inner.publish(collection);
        Ok(id)
    }

    async fn update(
        &self,
        collection: Collection,
        id: &DocumentId,
        fields: Fields,
    ) -> Result<(), BackendError> {
        let mut inner = lock(&self.inner);
        inner.check_writable(collection)?;

        let doc = inner
            .collections
            .get_mut(&collection)
            .and_then(|docs| docs.iter_mut().find(|d| &d.id == id))
            .ok_or_else(|| BackendError::NotFound {
                collection,
                id: id.clone(),
            })?;
        doc.fields.extend(fields);
        inner.publish(collection);
        Ok(())
    }

    async fn set_merge(
        &self,
        collection: Collection,
        id: &DocumentId,
        fields: Fields,
    ) -> Result<(), BackendError> {
        let mut inner = lock(&self.inner);
        inner.check_writable(collection)?;

        let docs = inner.collections.entry(collection).or_default();
        match docs.iter_mut().find(|d| &d.id == id) {
            Some(doc) => doc.fields.extend(fields),
            None => docs.push(Document::new(id.clone(), fields)),
        }
        inner.publish(collection);
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &DocumentId) -> Result<(), BackendError> {
        let mut inner = lock(&self.inner);
        inner.check_writable(collection)?;

        if let Some(docs) = inner.collections.get_mut(&collection) {
            docs.retain(|d| &d.id != id);
        }
        inner.publish(collection);
        Ok(())
    }

    async fn subscribe(&self, collection: Collection) -> Result<Subscription, BackendError> {
        let mut inner = lock(&self.inner);
        inner.check_online()?;

        let (tx, rx) = mpsc::unbounded_channel();
        // Receiver is alive, so the initial send cannot fail.
        let _ = tx.send(inner.snapshot(collection));
        inner.subscribers.entry(collection).or_default().push(tx);
        tracing::debug!(%collection, "Subscribed");
        Ok(Subscription::new(collection, rx))
    }
}

// =============================================================================
// Identity provider
// =============================================================================

#[derive(Debug, Clone)]
struct Account {
    user: AuthUser,
    password: String,
    disabled: bool,
    failed_attempts: u32,
    signed_in_at: Option<Instant>,
}

/// In-process email/password identity provider.
#[derive(Debug)]
pub struct InMemoryIdentity {
    accounts: Mutex<HashMap<Email, Account>>,
    recent_login_window: Duration,
}

impl Default for InMemoryIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryIdentity {
    #[must_use]
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            recent_login_window: RECENT_LOGIN_WINDOW,
        }
    }

    /// Override how long a sign-in counts as recent.
    #[must_use]
    pub const fn with_recent_login_window(mut self, window: Duration) -> Self {
        self.recent_login_window = window;
        self
    }

    /// Register an account directly, bypassing password rules.
    ///
    /// # Errors
    ///
    /// Returns `auth/invalid-email` or `auth/email-already-in-use`.
    pub fn add_account(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<AuthUser, BackendError> {
        let email = parse_email(email)?;
        let mut accounts = lock(&self.accounts);
        if accounts.contains_key(&email) {
            return Err(BackendError::provider(codes::EMAIL_IN_USE));
        }

        let user = AuthUser {
            uid: UserId::new(uuid::Uuid::new_v4().simple().to_string()),
            email: email.clone(),
            display_name: display_name.map(String::from),
        };
        accounts.insert(
            email,
            Account {
                user: user.clone(),
                password: password.to_string(),
                disabled: false,
                failed_attempts: 0,
                signed_in_at: None,
            },
        );
        Ok(user)
    }

    /// Disable an account; later sign-ins fail with `auth/user-disabled`.
    pub fn disable(&self, email: &str) {
        let Ok(email) = Email::parse(email) else {
            return;
        };
        if let Some(account) = lock(&self.accounts).get_mut(&email) {
            account.disabled = true;
        }
    }

    fn with_account<T>(
        &self,
        uid: &UserId,
        f: impl FnOnce(&mut Account) -> Result<T, BackendError>,
    ) -> Result<T, BackendError> {
        let mut accounts = lock(&self.accounts);
        let account = accounts
            .values_mut()
            .find(|a| &a.user.uid == uid)
            .ok_or_else(|| BackendError::provider(codes::USER_NOT_FOUND))?;
        f(account)
    }
}

fn parse_email(email: &str) -> Result<Email, BackendError> {
    Email::parse(email).map_err(|_| BackendError::provider(codes::INVALID_EMAIL))
}

fn check_password_rules(password: &str) -> Result<(), BackendError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(BackendError::Provider {
            code: codes::WEAK_PASSWORD.to_string(),
            message: "Password should be at least 6 characters (auth/weak-password).".to_string(),
        });
    }
    Ok(())
}

#[async_trait]
impl IdentityProvider for InMemoryIdentity {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, BackendError> {
        let email = parse_email(email)?;
        let mut accounts = lock(&self.accounts);
        let account = accounts
            .get_mut(&email)
            .ok_or_else(|| BackendError::provider(codes::USER_NOT_FOUND))?;

        if account.disabled {
            return Err(BackendError::provider(codes::USER_DISABLED));
        }
        if account.failed_attempts >= MAX_FAILED_ATTEMPTS {
            return Err(BackendError::provider(codes::TOO_MANY_REQUESTS));
        }
        if account.password != password {
            account.failed_attempts += 1;
            return Err(BackendError::provider(codes::WRONG_PASSWORD));
        }

        account.failed_attempts = 0;
        account.signed_in_at = Some(Instant::now());
        Ok(account.user.clone())
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, BackendError> {
        parse_email(email)?;
        check_password_rules(password)?;
        let user = self.add_account(email, password, None)?;
        self.with_account(&user.uid, |account| {
            account.signed_in_at = Some(Instant::now());
            Ok(())
        })?;
        Ok(user)
    }

    async fn update_profile(
        &self,
        uid: &UserId,
        display_name: &str,
    ) -> Result<AuthUser, BackendError> {
        self.with_account(uid, |account| {
            account.user.display_name =
                Some(display_name.to_string()).filter(|name| !name.is_empty());
            Ok(account.user.clone())
        })
    }

    async fn update_password(&self, uid: &UserId, new_password: &str) -> Result<(), BackendError> {
        let window = self.recent_login_window;
        self.with_account(uid, |account| {
            let recent = account
                .signed_in_at
                .is_some_and(|at| at.elapsed() <= window);
            if !recent {
                return Err(BackendError::provider(codes::REQUIRES_RECENT_LOGIN));
            }
            check_password_rules(new_password)?;
            account.password = new_password.to_string();
            Ok(())
        })
    }

    async fn sign_out(&self, uid: &UserId) -> Result<(), BackendError> {
        self.with_account(uid, |account| {
            account.signed_in_at = None;
            Ok(())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fields(value: serde_json::Value) -> Fields {
        match value {
            serde_json::Value::Object(map) => map,
            _ => Fields::new(),
        }
    }

    #[tokio::test]
    async fn test_subscribe_delivers_initial_snapshot() {
        let store = InMemoryStore::new();
        store
            .create(Collection::Products, fields(json!({"name": "Silk Scarf"})))
            .await
            .unwrap();

        let mut sub = store.subscribe(Collection::Products).await.unwrap();
        let snapshot = sub.next().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.collection, Collection::Products);
    }

    #[tokio::test]
    async fn test_every_write_pushes_full_snapshot() {
        let store = InMemoryStore::new();
        let mut sub = store.subscribe(Collection::Orders).await.unwrap();
        assert!(sub.next().await.unwrap().is_empty());

        let id = store
            .create(Collection::Orders, fields(json!({"status": "Pending"})))
            .await
            .unwrap();
        store
            .create(Collection::Orders, fields(json!({"status": "Pending"})))
            .await
            .unwrap();
        store
            .update(Collection::Orders, &id, fields(json!({"status": "Shipped"})))
            .await
            .unwrap();

        assert_eq!(sub.next().await.unwrap().len(), 1);
        assert_eq!(sub.next().await.unwrap().len(), 2);
        let latest = sub.next().await.unwrap();
        assert_eq!(latest.documents[0].field("status"), Some(&json!("Shipped")));
        assert!(sub.try_next().is_none());
    }

    #[tokio::test]
    async fn test_other_collections_do_not_notify() {
        let store = InMemoryStore::new();
        let mut sub = store.subscribe(Collection::Orders).await.unwrap();
        sub.next().await.unwrap();

        store
            .create(Collection::Products, fields(json!({"name": "x"})))
            .await
            .unwrap();
        assert!(sub.try_next().is_none());
    }

    #[tokio::test]
    async fn test_dropped_subscriber_is_pruned() {
        let store = InMemoryStore::new();
        let sub = store.subscribe(Collection::Orders).await.unwrap();
        assert_eq!(store.subscriber_count(Collection::Orders), 1);
        drop(sub);
        store.create(Collection::Orders, Fields::new()).await.unwrap();
        assert_eq!(store.subscriber_count(Collection::Orders), 0);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = InMemoryStore::new();
        let err = store
            .update(Collection::Products, &DocumentId::new("nope"), Fields::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_set_merge_creates_then_merges() {
        let store = InMemoryStore::new();
        let id = DocumentId::new("uid-1");
        store
            .set_merge(Collection::Users, &id, fields(json!({"theme": "light"})))
            .await
            .unwrap();
        store
            .set_merge(Collection::Users, &id, fields(json!({"name": "Ana"})))
            .await
            .unwrap();

        let doc = store.get(Collection::Users, &id).await.unwrap().unwrap();
        assert_eq!(doc.field("theme"), Some(&json!("light")));
        assert_eq!(doc.field("name"), Some(&json!("Ana")));
    }

    #[tokio::test]
    async fn test_offline_and_denied_writes() {
        let store = InMemoryStore::new();
        store.set_offline(true);
        let err = store.list(Collection::Orders).await.unwrap_err();
        assert!(err.is_offline());
        store.set_offline(false);

        store.deny_writes(Collection::Products);
        let err = store
            .create(Collection::Products, Fields::new())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "permission-denied");
        store.allow_writes(Collection::Products);
        assert!(store.create(Collection::Products, Fields::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_sign_in_error_codes() {
        let identity = InMemoryIdentity::new();
        identity.add_account("u@x.com", "secret-pass", None).unwrap();

        let code = |r: Result<AuthUser, BackendError>| r.unwrap_err().code().to_string();
        assert_eq!(code(identity.sign_in("bad", "x").await), codes::INVALID_EMAIL);
        assert_eq!(
            code(identity.sign_in("nobody@x.com", "x").await),
            codes::USER_NOT_FOUND
        );
        assert_eq!(
            code(identity.sign_in("u@x.com", "wrong").await),
            codes::WRONG_PASSWORD
        );

        let user = identity.sign_in("u@x.com", "secret-pass").await.unwrap();
        assert_eq!(user.email.as_str(), "u@x.com");

        identity.disable("u@x.com");
        assert_eq!(
            code(identity.sign_in("u@x.com", "secret-pass").await),
            codes::USER_DISABLED
        );
    }

    #[tokio::test]
    async fn test_repeated_failures_throttle() {
        let identity = InMemoryIdentity::new();
        identity.add_account("u@x.com", "secret-pass", None).unwrap();
        for _ in 0..MAX_FAILED_ATTEMPTS {
            identity.sign_in("u@x.com", "wrong").await.unwrap_err();
        }
        let err = identity.sign_in("u@x.com", "secret-pass").await.unwrap_err();
        assert_eq!(err.code(), codes::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_sign_up_rules() {
        let identity = InMemoryIdentity::new();
        let err = identity.sign_up("u@x.com", "12345").await.unwrap_err();
        assert_eq!(err.code(), codes::WEAK_PASSWORD);

        identity.sign_up("u@x.com", "123456").await.unwrap();
        let err = identity.sign_up("u@x.com", "1234567").await.unwrap_err();
        assert_eq!(err.code(), codes::EMAIL_IN_USE);
    }

    #[tokio::test]
    async fn test_update_password_requires_recent_login() {
        let identity = InMemoryIdentity::new().with_recent_login_window(Duration::ZERO);
        let user = identity.add_account("u@x.com", "secret-pass", None).unwrap();
        let err = identity
            .update_password(&user.uid, "another-pass")
            .await
            .unwrap_err();
        assert_eq!(err.code(), codes::REQUIRES_RECENT_LOGIN);

        let identity = InMemoryIdentity::new();
        let user = identity.sign_up("v@x.com", "secret-pass").await.unwrap();
        let err = identity.update_password(&user.uid, "abc").await.unwrap_err();
        assert_eq!(err.code(), codes::WEAK_PASSWORD);
        identity
            .update_password(&user.uid, "another-pass")
            .await
            .unwrap();
        identity.sign_in("v@x.com", "another-pass").await.unwrap();
    }

    #[tokio::test]
    async fn test_update_profile() {
        let identity = InMemoryIdentity::new();
        let user = identity.sign_up("u@x.com", "secret-pass").await.unwrap();
        let updated = identity.update_profile(&user.uid, "Una").await.unwrap();
        assert_eq!(updated.display_name.as_deref(), Some("Una"));

        let err = identity
            .update_profile(&UserId::new("ghost"), "x")
            .await
            .unwrap_err();
        assert_eq!(err.code(), codes::USER_NOT_FOUND);
    }
}
