//! Authentication error types.

use thiserror::Error;

use crate::backend::{BackendError, codes};

/// Errors that can occur during sign-in, sign-up and sign-out.
///
/// `Display` is the message shown to the user.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Registration form failed a local check before reaching the provider.
    #[error("{0}")]
    Validation(&'static str),

    /// The identity provider rejected the request.
    #[error("{message}")]
    Rejected { code: String, message: String },
}

impl AuthError {
    /// Provider code, if the provider was involved.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Validation(_) => None,
            Self::Rejected { code, .. } => Some(code),
        }
    }

    /// Sign-in failure with the fixed message for known codes.
    ///
    /// Unknown codes fall back to the provider's own message.
    #[must_use]
    pub fn sign_in(err: &BackendError) -> Self {
        let code = err.code();
        let message = match code {
            codes::USER_NOT_FOUND => "No user found with this email. Please register first.",
            codes::WRONG_PASSWORD => "Incorrect password. Please try again.",
            codes::INVALID_EMAIL => "Invalid email address format.",
            codes::USER_DISABLED => "This user account has been disabled.",
            codes::TOO_MANY_REQUESTS => {
                "Too many failed attempts. Please try again later or reset your password."
            }
            _ => {
                return Self::Rejected {
                    code: code.to_string(),
                    message: err.to_string(),
                };
            }
        };
        Self::Rejected {
            code: code.to_string(),
            message: message.to_string(),
        }
    }

    /// Any other provider failure, shown verbatim.
    #[must_use]
    pub fn provider(err: &BackendError) -> Self {
        Self::Rejected {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_in_message_table() {
        let cases = [
            (
                codes::USER_NOT_FOUND,
                "No user found with this email. Please register first.",
            ),
            (codes::WRONG_PASSWORD, "Incorrect password. Please try again."),
            (codes::INVALID_EMAIL, "Invalid email address format."),
            (codes::USER_DISABLED, "This user account has been disabled."),
            (
                codes::TOO_MANY_REQUESTS,
                "Too many failed attempts. Please try again later or reset your password.",
            ),
        ];
        for (code, expected) in cases {
            let err = AuthError::sign_in(&BackendError::provider(code));
            assert_eq!(err.to_string(), expected);
            assert_eq!(err.code(), Some(code));
        }
    }

    #[test]
    fn test_unmapped_code_uses_raw_message() {
        let err = AuthError::sign_in(&BackendError::Provider {
            code: "auth/network-request-failed".to_string(),
            message: "Network request failed: connection refused".to_string(),
        });
        assert_eq!(err.to_string(), "Network request failed: connection refused");
        assert_eq!(err.code(), Some("auth/network-request-failed"));
    }

    #[test]
    fn test_validation_has_no_code() {
        let err = AuthError::Validation("Passwords don't match!");
        assert_eq!(err.code(), None);
        assert_eq!(err.to_string(), "Passwords don't match!");
    }
}
