//! Threadline Core - Shared domain types.
//!
//! This crate provides the types shared by every Threadline component:
//! - `storefront` - JSON API for shoppers and store administrators
//! - `cli` - Command-line tools for migrations, seeding and user management
//!
//! # Architecture
//!
//! The core crate contains only types and pure helpers - no I/O, no database
//! access, no HTTP. Database encoding is opt-in through the `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, prices, emails, sizes, statuses and catalog helpers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
