//! HTTP middleware for the console.
//!
//! - `session` - in-memory `tower-sessions` layer
//! - `auth` - extractors that read the signed-in principal from the session

pub mod auth;
pub mod session;

pub use auth::{
    AuthRejection, OptionalAuth, RequireAuth, clear_current_user, set_current_user,
};
pub use session::{SESSION_COOKIE_NAME, create_session_layer};
