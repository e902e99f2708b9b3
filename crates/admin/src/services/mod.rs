//! Business logic services for the console.
//!
//! # Services
//!
//! - `auth` - Email/password sign-in, registration and sign-out
//! - `dashboard` - Per-user dashboard summary
//! - `orders` - Order placement, manual entry and the per-user list
//! - `products` - Catalog listing, demo seeding and stock adjustment
//! - `queries` - Customer inquiry inbox
//! - `settings` - Profile, password and preference updates

pub mod auth;
pub mod dashboard;
pub mod orders;
pub mod products;
pub mod queries;
pub mod settings;

pub use auth::{AuthError, AuthService, AuthState, PasswordStrength, Registration};
pub use dashboard::DashboardSummary;
pub use orders::{OrderCounts, OrderError, OrderService, PlacedOrder};
pub use products::{ProductError, ProductService};
pub use queries::{QueryCounts, QueryInbox};
pub use settings::{SettingsError, SettingsService, Toggled, UserSettings};
