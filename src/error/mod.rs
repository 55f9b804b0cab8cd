//! Error handling for esdump.
//!
//! This module provides:
//! - A crate-wide error type covering transport, query, response, shard and
//!   output failures
//! - Structured shard-failure reports parsed from the store's `_shards` block
//! - Configuration errors raised while loading the TOML config file
//!
//! # Example
//!
//! ```rust,no_run
//! use esdump::error::{EsdumpError, Result};
//!
//! fn check_slices(slices: usize) -> Result<usize> {
//!     if slices == 0 {
//!         return Err(EsdumpError::Usage("--slices must be at least 1".to_string()));
//!     }
//!     Ok(slices)
//! }
//! ```

pub mod kinds;
pub mod shard;

// Re-export commonly used types
pub use kinds::{ConfigError, EsdumpError, Result, TransportError};
pub use shard::{FailureReason, ShardFailure, ShardFailureReport, ShardsSummary};
