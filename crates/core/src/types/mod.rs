//! Core types for Threadline.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod catalog;
pub mod email;
pub mod id;
pub mod price;
pub mod size;
pub mod status;

pub use catalog::{seo_slug, sku_prefix};
pub use email::{Email, EmailError};
pub use id::*;
pub use price::{Price, PriceError};
pub use size::{Size, SizeError};
pub use status::*;
