//! Error types used throughout the library

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the Adknowledge client.
///
/// Validation variants are raised synchronously during builder calls,
/// before any network activity, and leave the builder in its prior
/// valid state. `RemoteApi` and `Transport` come back from a single
/// round trip; no retries are attempted internally.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum AdknowledgeError {
    #[error("Adknowledge token required to perform queries")]
    MissingToken,

    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("Invalid filter criteria: {0}")]
    InvalidFilter(String),

    #[error("Invalid pivot: {0}")]
    InvalidPivot(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Missing mandatory field: {0}")]
    MissingMandatoryField(String),

    #[error("Remote API error: {0}")]
    RemoteApi(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Result type alias for Adknowledge operations
pub type Result<T> = std::result::Result<T, AdknowledgeError>;
