//! Sign-in, registration and sign-out.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use super::Notice;
use crate::backend::AuthUser;
use crate::error::AppError;
use crate::middleware::{OptionalAuth, clear_current_user, set_current_user};
use crate::services::auth::{LOGIN_SUCCESS, REGISTRATION_SUCCESS};
use crate::services::{AuthService, PasswordStrength, Registration};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .route("/auth/password-strength", post(password_strength))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response from sign-in or registration.
#[derive(Debug, Serialize)]
pub struct SignedIn {
    pub user: AuthUser,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct Me {
    pub user: Option<AuthUser>,
}

#[derive(Debug, Deserialize)]
pub struct StrengthRequest {
    pub password: String,
}

/// POST /auth/login
///
/// # Errors
///
/// Returns `AppError::Auth` with the login form message.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<LoginRequest>,
) -> Result<Json<SignedIn>, AppError> {
    let user = AuthService::new(state.identity())
        .sign_in(&req.email, &req.password)
        .await?;
    set_current_user(&session, &user).await?;

    Ok(Json(SignedIn {
        user,
        message: LOGIN_SUCCESS,
    }))
}

/// POST /auth/register
///
/// # Errors
///
/// Returns `AppError::Auth` for form problems or provider refusals.
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<Registration>,
) -> Result<Json<SignedIn>, AppError> {
    let user = AuthService::new(state.identity()).register(&form).await?;
    set_current_user(&session, &user).await?;

    Ok(Json(SignedIn {
        user,
        message: REGISTRATION_SUCCESS,
    }))
}

/// POST /auth/logout
///
/// The session is cleared even when the provider refuses the sign-out.
///
/// # Errors
///
/// Returns `AppError::Internal` if the session cannot be flushed.
pub async fn logout(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
) -> Result<Json<Notice>, AppError> {
    if let Some(user) = user {
        // Provider failures are logged by the service
        let _ = AuthService::new(state.identity()).sign_out(&user).await;
    }
    clear_current_user(&session).await?;
    Ok(Json(Notice::new("Signed out")))
}

/// GET /auth/me
pub async fn me(OptionalAuth(user): OptionalAuth) -> Json<Me> {
    Json(Me { user })
}

/// POST /auth/password-strength
pub async fn password_strength(Json(req): Json<StrengthRequest>) -> Json<PasswordStrength> {
    Json(PasswordStrength::measure(&req.password))
}
