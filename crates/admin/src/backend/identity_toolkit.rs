//! Identity Toolkit REST client (Firebase Authentication).
//!
//! Email/password accounts are managed through the `accounts:*` endpoints.
//! The REST API returns error *messages* such as `EMAIL_NOT_FOUND`; these are
//! mapped onto the same `auth/...` codes the in-memory provider produces so
//! callers handle one vocabulary.
//!
//! ID tokens returned at sign-in are kept per user for later profile and
//! password updates. They never leave this module.
//!
//! # API Reference
//!
//! - Base URL: `https://identitytoolkit.googleapis.com/v1`
//! - Authentication: Web API key via the `key` query parameter

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chosen_one_core::{Email, UserId};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::{AuthUser, BackendError, IdentityProvider, codes};
use crate::config::FirebaseConfig;

/// Identity Toolkit base URL.
const BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";

/// Identity Toolkit client.
#[derive(Clone)]
pub struct IdentityToolkit {
    inner: Arc<IdentityToolkitInner>,
}

struct IdentityToolkitInner {
    client: reqwest::Client,
    api_key: SecretString,
    id_tokens: RwLock<HashMap<UserId, SecretString>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest<'a> {
    id_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    email: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl IdentityToolkit {
    /// Create a new Identity Toolkit client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &FirebaseConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            inner: Arc::new(IdentityToolkitInner {
                client,
                api_key: config.api_key.clone(),
                id_tokens: RwLock::new(HashMap::new()),
            }),
        })
    }

    /// POST to an `accounts:*` endpoint.
    async fn call<B: Serialize + Sync>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<AccountResponse, BackendError> {
        let url = format!("{BASE_URL}/accounts:{endpoint}");
        let response = self
            .inner
            .client
            .post(&url)
            .query(&[("key", self.inner.api_key.expose_secret())])
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    BackendError::Provider {
                        code: "auth/network-request-failed".to_string(),
                        message: format!("Network request failed: {e}"),
                    }
                } else {
                    BackendError::Http(e)
                }
            })?;

        if response.status().is_success() {
            return response
                .json()
                .await
                .map_err(|e| BackendError::Parse(format!("Failed to parse response: {e}")));
        }

        let text = response.text().await.unwrap_or_default();
        Err(error_from_body(&text))
    }

    /// Turn a successful account response into a principal, remembering its token.
    async fn remember(&self, account: AccountResponse) -> Result<AuthUser, BackendError> {
        let email = Email::parse(&account.email)
            .map_err(|e| BackendError::Parse(format!("Provider returned invalid email: {e}")))?;
        let user = AuthUser {
            uid: UserId::new(account.local_id),
            email,
            display_name: account.display_name.filter(|n| !n.is_empty()),
        };

        if let Some(token) = account.id_token {
            self.inner
                .id_tokens
                .write()
                .await
                .insert(user.uid.clone(), SecretString::from(token));
        }
        Ok(user)
    }

    async fn id_token(&self, uid: &UserId) -> Result<SecretString, BackendError> {
        self.inner
            .id_tokens
            .read()
            .await
            .get(uid)
            .cloned()
            .ok_or_else(|| BackendError::provider(codes::TOKEN_EXPIRED))
    }
}

#[async_trait]
impl IdentityProvider for IdentityToolkit {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, BackendError> {
        let account = self
            .call(
                "signInWithPassword",
                &PasswordRequest {
                    email,
                    password,
                    return_secure_token: true,
                },
            )
            .await?;
        self.remember(account).await
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, BackendError> {
        let account = self
            .call(
                "signUp",
                &PasswordRequest {
                    email,
                    password,
                    return_secure_token: true,
                },
            )
            .await?;
        self.remember(account).await
    }

    async fn update_profile(
        &self,
        uid: &UserId,
        display_name: &str,
    ) -> Result<AuthUser, BackendError> {
        let token = self.id_token(uid).await?;
        let account = self
            .call(
                "update",
                &UpdateRequest {
                    id_token: token.expose_secret(),
                    display_name: Some(display_name),
                    password: None,
                    return_secure_token: true,
                },
            )
            .await?;
        self.remember(account).await
    }

    async fn update_password(&self, uid: &UserId, new_password: &str) -> Result<(), BackendError> {
        let token = self.id_token(uid).await?;
        let account = self
            .call(
                "update",
                &UpdateRequest {
                    id_token: token.expose_secret(),
                    display_name: None,
                    password: Some(new_password),
                    return_secure_token: true,
                },
            )
            .await?;
        // A password change revokes the old token and issues a new one.
        self.remember(account).await?;
        Ok(())
    }

    async fn sign_out(&self, uid: &UserId) -> Result<(), BackendError> {
        self.inner.id_tokens.write().await.remove(uid);
        Ok(())
    }
}

impl std::fmt::Debug for IdentityToolkit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityToolkit").finish_non_exhaustive()
    }
}

/// Map an Identity Toolkit error body onto a provider error.
///
/// Messages look like `EMAIL_NOT_FOUND` or
/// `WEAK_PASSWORD : Password should be at least 6 characters`.
fn error_from_body(body: &str) -> BackendError {
    let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) else {
        return BackendError::Provider {
            code: codes::INTERNAL.to_string(),
            message: format!("Error ({}): {body}", codes::INTERNAL),
        };
    };

    let raw = envelope.error.message;
    let (reason, detail) = raw
        .split_once(" : ")
        .map_or((raw.as_str(), None), |(r, d)| (r, Some(d)));

    let code = match reason {
        "EMAIL_NOT_FOUND" => codes::USER_NOT_FOUND,
        "INVALID_PASSWORD" => codes::WRONG_PASSWORD,
        "INVALID_LOGIN_CREDENTIALS" => codes::INVALID_CREDENTIAL,
        "INVALID_EMAIL" | "MISSING_EMAIL" => codes::INVALID_EMAIL,
        "USER_DISABLED" => codes::USER_DISABLED,
        "TOO_MANY_ATTEMPTS_TRY_LATER" => codes::TOO_MANY_REQUESTS,
        "EMAIL_EXISTS" => codes::EMAIL_IN_USE,
        "WEAK_PASSWORD" => codes::WEAK_PASSWORD,
        "CREDENTIAL_TOO_OLD_LOGIN_AGAIN" => codes::REQUIRES_RECENT_LOGIN,
        "TOKEN_EXPIRED" | "INVALID_ID_TOKEN" | "USER_NOT_FOUND" => codes::TOKEN_EXPIRED,
        _ => codes::INTERNAL,
    };

    let message = detail.map_or_else(
        || format!("Error ({code})."),
        |d| format!("{d} ({code})."),
    );
    BackendError::Provider {
        code: code.to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(message: &str) -> String {
        serde_json::json!({"error": {"code": 400, "message": message}}).to_string()
    }

    #[test]
    fn test_error_codes_map_to_provider_vocabulary() {
        let cases = [
            ("EMAIL_NOT_FOUND", codes::USER_NOT_FOUND),
            ("INVALID_PASSWORD", codes::WRONG_PASSWORD),
            ("INVALID_LOGIN_CREDENTIALS", codes::INVALID_CREDENTIAL),
            ("INVALID_EMAIL", codes::INVALID_EMAIL),
            ("USER_DISABLED", codes::USER_DISABLED),
            (
                "TOO_MANY_ATTEMPTS_TRY_LATER : Access temporarily disabled",
                codes::TOO_MANY_REQUESTS,
            ),
            ("EMAIL_EXISTS", codes::EMAIL_IN_USE),
            ("CREDENTIAL_TOO_OLD_LOGIN_AGAIN", codes::REQUIRES_RECENT_LOGIN),
            ("SOMETHING_NEW", codes::INTERNAL),
        ];
        for (message, expected) in cases {
            assert_eq!(error_from_body(&body(message)).code(), expected, "{message}");
        }
    }

    #[test]
    fn test_error_detail_kept_in_message() {
        let err = error_from_body(&body(
            "WEAK_PASSWORD : Password should be at least 6 characters",
        ));
        assert_eq!(err.code(), codes::WEAK_PASSWORD);
        assert_eq!(
            err.to_string(),
            "Password should be at least 6 characters (auth/weak-password)."
        );
    }

    #[test]
    fn test_unparseable_error_body() {
        let err = error_from_body("<html>bad gateway</html>");
        assert_eq!(err.code(), codes::INTERNAL);
    }

    #[test]
    fn test_update_request_skips_unset_fields() {
        let json = serde_json::to_value(UpdateRequest {
            id_token: "t",
            display_name: Some("Una"),
            password: None,
            return_secure_token: true,
        })
        .unwrap_or_default();
        assert_eq!(json["displayName"], "Una");
        assert!(json.get("password").is_none());
        assert_eq!(json["returnSecureToken"], true);
    }
}
