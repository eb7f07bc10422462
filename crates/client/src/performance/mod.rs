//! Performance reporting API

pub mod query;

pub use query::{Performance, Record};
