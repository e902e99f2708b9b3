//! Console authentication service.
//!
//! Email/password sign-in, registration and sign-out against the configured
//! [`IdentityProvider`]. Provider failures are translated into the messages
//! shown on the login and registration forms.
//!
//! [`AuthState`] broadcasts the signed-in principal to anything that follows
//! the current user (live views, the CLI). HTTP handlers keep the principal
//! in the session instead.

mod error;

pub use error::AuthError;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::instrument;

use crate::backend::{AuthUser, IdentityProvider};

/// Minimum password length accepted by the registration form.
pub const MIN_REGISTRATION_PASSWORD_LEN: usize = 8;

/// Shown after a successful sign-in.
pub const LOGIN_SUCCESS: &str = "Login successful! Redirecting...";

/// Shown after a successful registration.
pub const REGISTRATION_SUCCESS: &str = "Registration successful! Redirecting...";

/// Current principal, observable through a `watch` channel.
#[derive(Debug, Clone)]
pub struct AuthState {
    tx: watch::Sender<Option<AuthUser>>,
}

impl Default for AuthState {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthState {
    /// Signed out.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    /// Receiver that observes every change of principal.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<AuthUser>> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn current(&self) -> Option<AuthUser> {
        self.tx.borrow().clone()
    }

    /// Replace the principal, notifying observers.
    pub fn set(&self, user: Option<AuthUser>) {
        self.tx.send_replace(user);
    }
}

/// Registration form input.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    #[serde(default)]
    pub terms_accepted: bool,
}

impl Registration {
    /// Local checks, in the order the form reports them.
    ///
    /// # Errors
    ///
    /// Returns the first failed check as `AuthError::Validation`.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.password != self.confirm_password {
            return Err(AuthError::Validation("Passwords don't match!"));
        }
        if !self.terms_accepted {
            return Err(AuthError::Validation(
                "You must accept the terms and conditions",
            ));
        }
        if self.password.chars().count() < MIN_REGISTRATION_PASSWORD_LEN {
            return Err(AuthError::Validation(
                "Password must be at least 8 characters",
            ));
        }
        Ok(())
    }
}

/// Strength rating of a candidate password.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StrengthLevel {
    Weak,
    Moderate,
    Strong,
}

/// Password strength meter reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordStrength {
    /// Points scored, 0 to 5.
    pub score: u8,
    /// Meter fill, percent.
    pub width: u8,
    pub level: StrengthLevel,
    pub text: &'static str,
}

impl PasswordStrength {
    /// One point each for length >= 8, length >= 12, an uppercase letter,
    /// a digit and a character that is neither letter nor digit.
    #[must_use]
    pub fn measure(password: &str) -> Self {
        let len = password.chars().count();
        let checks = [
            len >= 8,
            len >= 12,
            password.chars().any(|c| c.is_ascii_uppercase()),
            password.chars().any(|c| c.is_ascii_digit()),
            password.chars().any(|c| !c.is_ascii_alphanumeric()),
        ];
        #[allow(clippy::cast_possible_truncation)] // at most 5
        let score = checks.iter().filter(|&&passed| passed).count() as u8;

        let (level, text) = match score {
            0 | 1 => (StrengthLevel::Weak, "Weak password"),
            2 | 3 => (StrengthLevel::Moderate, "Moderate password"),
            _ => (StrengthLevel::Strong, "Strong password"),
        };

        Self {
            score,
            width: score * 20,
            level,
            text,
        }
    }
}

/// Authentication service.
pub struct AuthService<'a> {
    identity: &'a dyn IdentityProvider,
    state: Option<&'a AuthState>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(identity: &'a dyn IdentityProvider) -> Self {
        Self {
            identity,
            state: None,
        }
    }

    /// Publish sign-in and sign-out on an [`AuthState`].
    #[must_use]
    pub const fn with_state(mut self, state: &'a AuthState) -> Self {
        self.state = Some(state);
        self
    }

    fn publish(&self, user: Option<AuthUser>) {
        if let Some(state) = self.state {
            state.set(user);
        }
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Rejected` with the login form message.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        match self.identity.sign_in(email, password).await {
            Ok(user) => {
                tracing::info!(uid = %user.uid, "Signed in");
                self.publish(Some(user.clone()));
                Ok(user)
            }
            Err(e) => {
                tracing::info!(code = e.code(), "Sign-in rejected");
                Err(AuthError::sign_in(&e))
            }
        }
    }

    /// Validate the form, then create the account and sign it in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` for form problems and
    /// `AuthError::Rejected` with the provider's message otherwise.
    #[instrument(skip(self, form), fields(email = %form.email))]
    pub async fn register(&self, form: &Registration) -> Result<AuthUser, AuthError> {
        form.validate()?;
        let user = self
            .identity
            .sign_up(&form.email, &form.password)
            .await
            .map_err(|e| {
                tracing::info!(code = e.code(), "Registration rejected");
                AuthError::provider(&e)
            })?;

        tracing::info!(uid = %user.uid, "Registered");
        self.publish(Some(user.clone()));
        Ok(user)
    }

    /// End the provider session. The principal is cleared even if the
    /// provider call fails.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Rejected` if the provider reports a failure.
    #[instrument(skip(self, user), fields(uid = %user.uid))]
    pub async fn sign_out(&self, user: &AuthUser) -> Result<(), AuthError> {
        self.publish(None);
        self.identity.sign_out(&user.uid).await.map_err(|e| {
            tracing::warn!(error = %e, "Error signing out");
            AuthError::provider(&e)
        })
    }
}
