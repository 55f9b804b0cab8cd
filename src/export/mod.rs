//! Export module for streaming search results as JSON lines
//!
//! This module provides the fetch-and-stream engine:
//! - Scroll pagination with guaranteed scroll release
//! - Optional sliced scrolls fetched concurrently
//! - Shared progress counters with progress logging
//! - JSON lines output, safe for concurrent slices
//!
//! # Architecture
//!
//! 1. **ScrollDriver**: pages through one search until the store returns an
//!    empty batch
//! 2. **ProgressCounters**: fetched/total counters shared by all slices
//! 3. **HitSink**: writes hit documents to the output
//!
//! These components are orchestrated by the **SliceCoordinator**, which runs
//! one driver inline or one driver per slice.
//!
//! # Example
//!
//! ```no_run
//! use esdump::export::{FetchRequest, fetch};
//!
//! # async fn example() -> esdump::Result<()> {
//! let request = FetchRequest {
//!     index: "logs".to_string(),
//!     query: r#"{"query":{"match_all":{}}}"#.to_string(),
//!     fetch_all: true,
//!     slices: 4,
//! };
//! let summary = fetch("http://localhost:9200", None, &request, tokio::io::stdout()).await?;
//! eprintln!("{} documents", summary.documents);
//! # Ok(())
//! # }
//! ```

pub mod coordinator;
pub mod progress;
pub mod scroll;
pub mod writers;

use std::sync::Arc;

use tokio::io::AsyncWrite;

use crate::config::Config;
use crate::connection::{Credentials, HttpTransport};
use crate::error::Result;
use crate::search::PageFetcher;

pub use coordinator::{FetchRequest, FetchSummary, SliceCoordinator};
pub use progress::{ProgressCounters, ProgressSnapshot};
pub use scroll::{ScrollDriver, ScrollGuard};
pub use writers::{HitSink, JsonLinesSink, SharedSink};

/// Fetch every document matching `request` from the store at `store_url`
/// using the default configuration
///
/// # Arguments
/// * `store_url` - Base URL of the store
/// * `credentials` - Basic-auth credentials, if any
/// * `request` - What to fetch
/// * `output` - Destination for the JSON lines
///
/// # Returns
/// * `Result<FetchSummary>` - Statistics, or the first error encountered
pub async fn fetch<W>(
    store_url: &str,
    credentials: Option<Credentials>,
    request: &FetchRequest,
    output: W,
) -> Result<FetchSummary>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let config = Config::default();
    coordinator_for(store_url, credentials, &config)?
        .run(request, output)
        .await
}

/// Build a coordinator talking HTTP to `store_url` with `config`
pub fn coordinator_for(
    store_url: &str,
    credentials: Option<Credentials>,
    config: &Config,
) -> Result<SliceCoordinator> {
    let transport = HttpTransport::new(store_url, credentials, &config.connection)?;
    let fetcher = PageFetcher::new(
        Arc::new(transport),
        config.connection.scroll_keep_alive.clone(),
        config.release_timeout(),
    );
    Ok(SliceCoordinator::new(fetcher).with_progress_bar(config.output.progress_bar))
}
