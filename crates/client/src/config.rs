//! Client configuration
//!
//! The upstream service used a process-global token slot; here the token
//! and endpoint URLs are an explicit value handed to each builder, so
//! there is no hidden global state. "Token required" semantics are
//! preserved: builders fail with `MissingToken` at call time when the
//! config carries none.
//!
//! ## Environment Variables
//! - `ADKNOWLEDGE_TOKEN`: API token (optional at load time)
//! - `ADKNOWLEDGE_PERFORMANCE_URL`: performance endpoint base URL override
//! - `ADKNOWLEDGE_INTEGRATED_URL`: integrated endpoint base URL override

use adknowledge_domain::{AdknowledgeError, Result};
use url::Url;

/// Production base URL of the performance reporting API.
pub const PERFORMANCE_URL: &str = "http://api.publisher.adknowledge.com";

/// Production base URL of the integrated content-mapping API.
pub const INTEGRATED_URL: &str = "http://integrated.adstation.com";

/// Explicit configuration consumed by both query builders.
#[derive(Debug, Clone)]
pub struct Config {
    token: Option<String>,
    performance_url: Url,
    integrated_url: Url,
}

impl Config {
    /// Configuration with the given token and production endpoints.
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: Some(token.into()), ..Self::default() }
    }

    /// Configuration with no token; execution calls will fail with
    /// [`AdknowledgeError::MissingToken`].
    pub fn without_token() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// A missing token is not an error here; it is only enforced when a
    /// query is executed.
    ///
    /// # Errors
    /// Returns `AdknowledgeError::InvalidArgument` if a URL override is
    /// present but malformed.
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var("ADKNOWLEDGE_TOKEN") {
            Ok(token) => Self::new(token),
            Err(_) => Self::without_token(),
        };
        if let Ok(raw) = std::env::var("ADKNOWLEDGE_PERFORMANCE_URL") {
            config = config.with_performance_url(&raw)?;
        }
        if let Ok(raw) = std::env::var("ADKNOWLEDGE_INTEGRATED_URL") {
            config = config.with_integrated_url(&raw)?;
        }
        tracing::debug!(
            has_token = config.token.is_some(),
            performance_url = %config.performance_url,
            integrated_url = %config.integrated_url,
            "configuration loaded from environment"
        );
        Ok(config)
    }

    /// Override the performance endpoint base URL (tests point this at a
    /// mock server).
    pub fn with_performance_url(mut self, url: &str) -> Result<Self> {
        self.performance_url = parse_url(url)?;
        Ok(self)
    }

    /// Override the integrated endpoint base URL.
    pub fn with_integrated_url(mut self, url: &str) -> Result<Self> {
        self.integrated_url = parse_url(url)?;
        Ok(self)
    }

    /// The configured token, or `MissingToken` when absent.
    pub fn require_token(&self) -> Result<&str> {
        self.token.as_deref().ok_or(AdknowledgeError::MissingToken)
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn performance_url(&self) -> &Url {
        &self.performance_url
    }

    pub fn integrated_url(&self) -> &Url {
        &self.integrated_url
    }
}

impl Default for Config {
    // Compile-time constants; parse cannot fail.
    #[allow(clippy::unwrap_used)]
    fn default() -> Self {
        Self {
            token: None,
            performance_url: Url::parse(PERFORMANCE_URL).unwrap(),
            integrated_url: Url::parse(INTEGRATED_URL).unwrap(),
        }
    }
}

fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw)
        .map_err(|e| AdknowledgeError::InvalidArgument(format!("invalid base URL {raw:?}: {e}")))
}
