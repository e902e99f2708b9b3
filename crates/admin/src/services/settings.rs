//! Account settings: profile, password, theme and notifications.

use chosen_one_core::{DocumentId, Theme};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::instrument;

use crate::backend::{AuthUser, Backend, BackendError, Collection, Fields, codes};

pub const PROFILE_UPDATED: &str = "Profile updated successfully!";
pub const PASSWORD_UPDATED: &str = "Password updated successfully!";
pub const OFFLINE_NOTICE: &str =
    "You are offline. Some settings may not be available until you reconnect.";
pub const DELETE_NOT_SUPPORTED: &str = "Account deletion is not implemented in this demo.";

/// Settings update failures. `Display` is the message shown to the user.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Error updating profile.")]
    Profile(#[source] BackendError),

    #[error("Please enter a new password.")]
    EmptyPassword,

    #[error("For security, please log out and log in again, then try changing your password.")]
    RecentLoginRequired,

    #[error("Password should be at least 6 characters.")]
    WeakPassword,

    #[error("{0}")]
    Password(String),
}

impl SettingsError {
    fn password(err: &BackendError) -> Self {
        match err.code() {
            codes::REQUIRES_RECENT_LOGIN => Self::RecentLoginRequired,
            codes::WEAK_PASSWORD => Self::WeakPassword,
            _ => {
                let message = err.to_string();
                if message.is_empty() {
                    Self::Password("Error updating password.".to_string())
                } else {
                    Self::Password(message)
                }
            }
        }
    }
}

/// What the settings page shows on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub display_name: String,
    pub email: String,
    pub theme: Theme,
    /// Inline notice when the stored preferences could not be read.
    pub message: Option<String>,
    pub offline: bool,
}

/// Result of a theme or notifications toggle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toggled<T> {
    pub value: T,
    pub message: String,
}

/// Flip the notifications preference.
#[must_use]
pub fn toggle_notifications(enabled: bool) -> Toggled<bool> {
    let value = !enabled;
    Toggled {
        value,
        message: format!(
            "Notifications {}",
            if value { "enabled" } else { "disabled" }
        ),
    }
}

/// Settings service over the configured backend.
pub struct SettingsService<'a> {
    backend: &'a Backend,
}

impl<'a> SettingsService<'a> {
    #[must_use]
    pub const fn new(backend: &'a Backend) -> Self {
        Self { backend }
    }

    /// Profile fields plus the persisted theme from `users/{uid}`.
    ///
    /// A failed read keeps the default theme and reports an inline message;
    /// calling again is the retry.
    #[instrument(skip(self, user), fields(uid = %user.uid))]
    pub async fn load(&self, user: &AuthUser) -> UserSettings {
        let mut settings = UserSettings {
            display_name: user.display_name.clone().unwrap_or_default(),
            email: user.email.to_string(),
            theme: Theme::default(),
            message: None,
            offline: false,
        };

        let id = DocumentId::new(user.uid.as_str());
        match self.backend.store.get(Collection::Users, &id).await {
            Ok(doc) => {
                if let Some(theme) = doc
                    .as_ref()
                    .and_then(|d| d.field("theme"))
                    .and_then(|v| v.as_str())
                    .and_then(|s| s.parse().ok())
                {
                    settings.theme = theme;
                }
            }
            Err(e) if e.is_offline() => {
                tracing::warn!(error = %e, "Settings unavailable offline");
                settings.offline = true;
                settings.message = Some(OFFLINE_NOTICE.to_string());
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load user settings");
                settings.message = Some(format!("Failed to load user settings: {e}"));
            }
        }
        settings
    }

    /// Change the display name.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::Profile` if the provider rejects the update.
    #[instrument(skip(self, user), fields(uid = %user.uid))]
    pub async fn update_profile(
        &self,
        user: &AuthUser,
        display_name: &str,
    ) -> Result<AuthUser, SettingsError> {
        self.backend
            .identity
            .update_profile(&user.uid, display_name)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Error updating profile");
                SettingsError::Profile(e)
            })
    }

    /// Change the password.
    ///
    /// # Errors
    ///
    /// Returns the password form message for the provider's failure code.
    #[instrument(skip(self, user, new_password), fields(uid = %user.uid))]
    pub async fn update_password(
        &self,
        user: &AuthUser,
        new_password: &str,
    ) -> Result<(), SettingsError> {
        if new_password.is_empty() {
            return Err(SettingsError::EmptyPassword);
        }
        self.backend
            .identity
            .update_password(&user.uid, new_password)
            .await
            .map_err(|e| {
                tracing::info!(code = e.code(), "Password update rejected");
                SettingsError::password(&e)
            })
    }

    /// Switch to the other theme and persist it with a merge write.
    ///
    /// The new theme is returned even if the write fails; the failure is
    /// only logged.
    #[instrument(skip(self, user), fields(uid = %user.uid))]
    pub async fn toggle_theme(&self, user: &AuthUser, current: Theme) -> Toggled<Theme> {
        let theme = current.toggled();
        let mut fields = Fields::new();
        fields.insert("theme".to_string(), json!(theme));

        let id = DocumentId::new(user.uid.as_str());
        if let Err(e) = self
            .backend
            .store
            .set_merge(Collection::Users, &id, fields)
            .await
        {
            tracing::warn!(error = %e, "Failed to persist theme");
        }

        Toggled {
            value: theme,
            message: format!("Theme set to {theme}"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::backend::{IdentityProvider, InMemoryIdentity, InMemoryStore};

    struct Fixture {
        store: Arc<InMemoryStore>,
        identity: Arc<InMemoryIdentity>,
        backend: Backend,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let identity = Arc::new(InMemoryIdentity::new());
        let backend = Backend {
            store: store.clone(),
            identity: identity.clone(),
        };
        Fixture {
            store,
            identity,
            backend,
        }
    }

    async fn signed_in(f: &Fixture) -> AuthUser {
        f.identity
            .add_account("u@x.com", "secret-pass", Some("Una"))
            .unwrap();
        f.identity.sign_in("u@x.com", "secret-pass").await.unwrap()
    }

    #[tokio::test]
    async fn test_load_defaults_and_persisted_theme() {
        let f = fixture();
        let user = signed_in(&f).await;
        let svc = SettingsService::new(&f.backend);

        let loaded = svc.load(&user).await;
        assert_eq!(loaded.display_name, "Una");
        assert_eq!(loaded.theme, Theme::Dark);
        assert_eq!(loaded.message, None);

        let toggled = svc.toggle_theme(&user, loaded.theme).await;
        assert_eq!(toggled.value, Theme::Light);
        assert_eq!(toggled.message, "Theme set to light");
        assert_eq!(svc.load(&user).await.theme, Theme::Light);
    }

    #[tokio::test]
    async fn test_load_offline_then_retry() {
        let f = fixture();
        let user = signed_in(&f).await;
        let svc = SettingsService::new(&f.backend);

        f.store.set_offline(true);
        let loaded = svc.load(&user).await;
        assert!(loaded.offline);
        assert_eq!(loaded.message.as_deref(), Some(OFFLINE_NOTICE));
        assert_eq!(loaded.email, "u@x.com");

        f.store.set_offline(false);
        assert_eq!(svc.load(&user).await.message, None);
    }

    #[tokio::test]
    async fn test_theme_toggle_survives_failed_write() {
        let f = fixture();
        let user = signed_in(&f).await;
        f.store.deny_writes(Collection::Users);

        let toggled = SettingsService::new(&f.backend)
            .toggle_theme(&user, Theme::Light)
            .await;
        assert_eq!(toggled.value, Theme::Dark);
    }

    #[tokio::test]
    async fn test_update_profile() {
        let f = fixture();
        let user = signed_in(&f).await;
        let updated = SettingsService::new(&f.backend)
            .update_profile(&user, "Una Lee")
            .await
            .unwrap();
        assert_eq!(updated.display_name.as_deref(), Some("Una Lee"));
    }

    #[tokio::test]
    async fn test_update_password_messages() {
        let f = fixture();
        let user = signed_in(&f).await;
        let svc = SettingsService::new(&f.backend);

        let err = svc.update_password(&user, "123").await.unwrap_err();
        assert_eq!(err.to_string(), "Password should be at least 6 characters.");
        assert!(matches!(
            svc.update_password(&user, "").await,
            Err(SettingsError::EmptyPassword)
        ));
        svc.update_password(&user, "new-secret").await.unwrap();
    }

    #[tokio::test]
    async fn test_update_password_requires_recent_login() {
        let f = fixture();
        let user = signed_in(&f).await;
        f.identity.sign_out(&user.uid).await.unwrap();

        let err = SettingsService::new(&f.backend)
            .update_password(&user, "new-secret")
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "For security, please log out and log in again, then try changing your password."
        );
    }

    #[test]
    fn test_toggle_notifications() {
        let on = toggle_notifications(false);
        assert!(on.value);
        assert_eq!(on.message, "Notifications enabled");
        assert_eq!(toggle_notifications(true).message, "Notifications disabled");
    }
}
