//! # Adknowledge Domain
//!
//! Business domain types for the Adknowledge publisher APIs.
//!
//! This crate contains:
//! - Reporting vocabularies (measures, dimensions, filter keys, pivots)
//! - Recipient records for the integrated content-mapping API
//! - Domain error types and Result definitions
//!
//! ## Architecture
//! - No dependencies on other workspace crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod errors;
pub mod types;

// Re-export commonly used items
pub use errors::*;
pub use types::*;
