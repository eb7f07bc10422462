//! Common data types used throughout the library

pub mod recipient;
pub mod reporting;

pub use recipient::{MappingError, Recipient};
pub use reporting::{Dimension, FilterKey, Measure, Pivot};
