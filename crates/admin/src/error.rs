//! Unified error handling for the console.
//!
//! Handlers return `Result<_, AppError>`. The response body is JSON
//! `{"error": "<message>"}` where the message is safe to show in the UI;
//! internal details stay in the logs and in Sentry.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::backend::BackendError;
use crate::live::LiveError;
use crate::services::{AuthError, OrderError, ProductError, SettingsError};

/// Application-level error type for the console.
#[derive(Debug, Error)]
pub enum AppError {
    /// Backend operation failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Sign-in, registration or sign-out was refused.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Product operation failed.
    #[error(transparent)]
    Products(#[from] ProductError),

    /// Order operation failed.
    #[error(transparent)]
    Orders(#[from] OrderError),

    /// Settings update was refused.
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// A live view could not subscribe.
    #[error(transparent)]
    Live(#[from] LiveError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Internal(format!("Session error: {err}"))
    }
}

/// Status for a failure that came from the backend.
fn backend_status(err: &BackendError) -> StatusCode {
    match err {
        BackendError::NotFound { .. } => StatusCode::NOT_FOUND,
        BackendError::PermissionDenied(_) => StatusCode::FORBIDDEN,
        e if e.is_offline() => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::BAD_GATEWAY,
    }
}

impl AppError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Backend(e) | Self::Live(LiveError { source: e, .. }) => backend_status(e),
            Self::Products(e) => backend_status(e.backend()),
            Self::Orders(OrderError::ProductNotFound(_)) => StatusCode::NOT_FOUND,
            Self::Orders(OrderError::InvalidDate(_)) => StatusCode::BAD_REQUEST,
            Self::Orders(e) => e.backend().map_or(StatusCode::BAD_GATEWAY, backend_status),
            Self::Auth(AuthError::Validation(_)) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Auth(AuthError::Rejected { .. }) | Self::Unauthorized(_) => {
                StatusCode::UNAUTHORIZED
            }
            Self::Settings(SettingsError::Profile(e)) => backend_status(e),
            Self::Settings(SettingsError::EmptyPassword) => StatusCode::BAD_REQUEST,
            Self::Settings(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server errors with Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Console request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Internal(_) => "Internal server error".to_string(),
            Self::Backend(e) if e.is_offline() => {
                "You are offline. Please check your connection and try again.".to_string()
            }
            Self::Backend(_) => "External service error".to_string(),
            _ => self.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Set the Sentry user context from the signed-in principal.
pub fn set_sentry_user(uid: &str, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(uid.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
