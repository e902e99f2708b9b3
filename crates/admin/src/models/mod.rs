//! Domain models for the console.
//!
//! Stored records are read leniently: a document with missing or oddly typed
//! fields still becomes a model, and each consumer decides what to skip.

mod lenient;
pub mod order;
pub mod product;
pub mod query;
pub mod session;

pub use order::{InvalidOrderDate, MANUAL_ENTRY, ManualOrder, NewOrder, Order, iso_timestamp};
pub use product::{NewProduct, Product, demo_products};
pub use query::{CustomerQuery, NewQuery, demo_queries};
