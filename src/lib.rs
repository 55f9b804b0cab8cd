//! esdump library
//!
//! This library provides the core functionality of the `esdump` tool: it
//! retrieves every document matching a search query from an
//! Elasticsearch-compatible store and streams the hits as JSON lines.
//!
//! # Modules
//!
//! - `cli`: Command-line interface and argument parsing
//! - `config`: Configuration management
//! - `connection`: HTTP transport to the store
//! - `error`: Error types and handling
//! - `export`: Scroll pagination, slicing and output
//! - `search`: Query augmentation, response parsing and page requests
//!
//! # Example
//!
//! ```no_run
//! use esdump::{FetchRequest, connection::Credentials};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let request = FetchRequest {
//!         index: "logs".to_string(),
//!         query: String::new(),
//!         fetch_all: true,
//!         slices: 1,
//!     };
//!     let creds = Credentials::from_parts(Some("elastic".into()), Some("changeme".into()));
//!
//!     esdump::fetch("http://localhost:9200", creds, &request, tokio::io::stdout()).await?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod connection;
pub mod error;
pub mod export;
pub mod search;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use config::Config;
pub use error::{EsdumpError, Result};
pub use export::{FetchRequest, FetchSummary, SliceCoordinator, fetch};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string
///
/// # Returns
/// * `&str` - Version string
pub fn version() -> &'static str {
    VERSION
}
