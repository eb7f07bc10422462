//! # Adknowledge Client
//!
//! HTTP client implementations for the Adknowledge publisher APIs.
//!
//! This crate contains:
//! - Configuration (explicit token + endpoint URLs, env loading)
//! - HTTP transport wrapper around reqwest
//! - The performance reporting query builder
//! - The integrated recipient-mapping request builder and XML codec
//!
//! ## Architecture
//! - Depends on `adknowledge-domain` for vocabularies and errors
//! - Contains all "impure" code (network I/O, wire codecs)
//!
//! ## Example
//!
//! ```no_run
//! use adknowledge_client::{Config, Performance};
//! use adknowledge_domain::Pivot;
//!
//! # async fn run() -> adknowledge_domain::Result<()> {
//! let config = Config::new("9befb0d563b499cbe705f4110d472c85");
//! let mut query = Performance::new(config);
//! query
//!     .select(["revenue", "paid_clicks"])?
//!     .group_by(["subid", "report_date"])?
//!     .filter([("start_date", "2013-04-01")])?
//!     .pivot(Pivot::field("report_date")?)?
//!     .limit(20);
//! for row in query.records().await? {
//!     println!("{row:?}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod http;
pub mod integrated;
pub mod performance;

// Re-export commonly used items
pub use config::Config;
pub use http::HttpClient;
pub use integrated::Integrated;
pub use performance::Performance;
