//! Account settings route handlers.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use chosen_one_core::Theme;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use super::Notice;
use crate::backend::AuthUser;
use crate::error::AppError;
use crate::middleware::RequireAuth;
use crate::models::session::keys;
use crate::services::settings::{
    DELETE_NOT_SUPPORTED, PASSWORD_UPDATED, PROFILE_UPDATED, toggle_notifications,
};
use crate::services::{SettingsService, Toggled, UserSettings};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/settings", get(show))
        .route("/settings/profile", post(update_profile))
        .route("/settings/password", post(update_password))
        .route("/settings/theme", post(toggle_theme))
        .route("/settings/notifications", post(notifications))
        .route("/settings/delete-account", post(delete_account))
}

#[derive(Debug, Serialize)]
pub struct SettingsPage {
    #[serde(flatten)]
    pub settings: UserSettings,
    pub notifications: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub display_name: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileUpdated {
    pub user: AuthUser,
    pub message: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordUpdate {
    #[serde(default)]
    pub new_password: String,
}

/// Notifications default to on and live only in the session.
async fn notifications_enabled(session: &Session) -> Result<bool, AppError> {
    Ok(session
        .get::<bool>(keys::NOTIFICATIONS)
        .await?
        .unwrap_or(true))
}

/// GET /settings
///
/// # Errors
///
/// Returns `AppError::Internal` if the session cannot be read. Store
/// failures are reported inline in the page.
pub async fn show(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<SettingsPage>, AppError> {
    let settings = SettingsService::new(state.backend()).load(&user).await;
    if !settings.offline && settings.message.is_none() {
        session.insert(keys::THEME, settings.theme).await?;
    }

    Ok(Json(SettingsPage {
        settings,
        notifications: notifications_enabled(&session).await?,
    }))
}

/// POST /settings/profile
///
/// # Errors
///
/// Returns `AppError::Settings` if the provider rejects the update.
pub async fn update_profile(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<ProfileUpdate>,
) -> Result<Json<ProfileUpdated>, AppError> {
    let user = SettingsService::new(state.backend())
        .update_profile(&user, &req.display_name)
        .await?;
    session.insert(keys::CURRENT_USER, &user).await?;

    Ok(Json(ProfileUpdated {
        user,
        message: PROFILE_UPDATED,
    }))
}

/// POST /settings/password
///
/// # Errors
///
/// Returns `AppError::Settings` with the password form message.
pub async fn update_password(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Json(req): Json<PasswordUpdate>,
) -> Result<Json<Notice>, AppError> {
    SettingsService::new(state.backend())
        .update_password(&user, &req.new_password)
        .await?;
    Ok(Json(Notice::new(PASSWORD_UPDATED)))
}

/// POST /settings/theme
///
/// # Errors
///
/// Returns `AppError::Internal` if the session cannot be used.
pub async fn toggle_theme(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Toggled<Theme>>, AppError> {
    let service = SettingsService::new(state.backend());
    let current = match session.get::<Theme>(keys::THEME).await? {
        Some(theme) => theme,
        None => service.load(&user).await.theme,
    };

    let toggled = service.toggle_theme(&user, current).await;
    session.insert(keys::THEME, toggled.value).await?;
    Ok(Json(toggled))
}

/// POST /settings/notifications
///
/// # Errors
///
/// Returns `AppError::Internal` if the session cannot be used.
pub async fn notifications(
    RequireAuth(_user): RequireAuth,
    session: Session,
) -> Result<Json<Toggled<bool>>, AppError> {
    let toggled = toggle_notifications(notifications_enabled(&session).await?);
    session.insert(keys::NOTIFICATIONS, toggled.value).await?;
    Ok(Json(toggled))
}

/// POST /settings/delete-account
pub async fn delete_account(RequireAuth(_user): RequireAuth) -> Json<Notice> {
    Json(Notice::new(DELETE_NOT_SUPPORTED))
}
