//! Session-related types for console authentication.
//!
//! The signed-in principal is stored in the session as an
//! [`AuthUser`](crate::backend::AuthUser) under [`keys::CURRENT_USER`].

/// Session keys for console state.
pub mod keys {
    /// Key for storing the signed-in principal.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the notifications toggle (not persisted to the store).
    pub const NOTIFICATIONS: &str = "notifications";

    /// Key for the theme last chosen in this session.
    pub const THEME: &str = "theme";
}
