//! Chosen One Core - Shared domain types.
//!
//! This crate provides the types shared by every Chosen One component:
//! - `admin` - The retail console (live aggregation, services, HTTP API)
//! - `cli` - Command-line tools for seeding and reporting
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no network clients, no
//! document store access. Records coming from the hosted backend are loosely
//! typed, so the types here favour lenient parsing over rejection.
//!
//! # Modules
//!
//! - [`types`] - Document IDs, emails, currency amounts and status enums

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
