//! Scroll driver: pages through one search from first page to exhaustion
//!
//! States: `Start → Paginating → Done`, with `Start → Failed` and
//! `Paginating → Failed` on any page error. The scroll opened by the first
//! page is owned by a [`ScrollGuard`] which releases it exactly once on every
//! exit path.

use serde_json::value::RawValue;
use tracing::{debug, warn};

use crate::error::Result;
use crate::search::{PageFetcher, SearchResponse};

use super::progress::ProgressCounters;
use super::writers::HitSink;

/// Owns a live scroll id and guarantees its release.
///
/// [`release`](Self::release) is the normal path. If the guard is dropped
/// while still holding an id (for example because the task running the
/// pipeline was aborted), a detached release is spawned on the current Tokio
/// runtime.
pub struct ScrollGuard {
    fetcher: PageFetcher,
    scroll_id: Option<String>,
}

impl ScrollGuard {
    /// Take ownership of a freshly opened scroll
    pub fn new(fetcher: PageFetcher, scroll_id: String) -> Self {
        Self {
            fetcher,
            scroll_id: Some(scroll_id),
        }
    }

    /// The id to send with the next advance
    pub fn scroll_id(&self) -> Option<&str> {
        self.scroll_id.as_deref()
    }

    /// Record the id returned by an advance; the previous id is superseded
    pub fn advance_to(&mut self, scroll_id: Option<String>) {
        if let Some(id) = scroll_id {
            self.scroll_id = Some(id);
        }
    }

    /// Release the scroll now
    pub async fn release(mut self) {
        if let Some(id) = self.scroll_id.take() {
            self.fetcher.release_cursor(&id).await;
        }
    }
}

impl Drop for ScrollGuard {
    fn drop(&mut self) {
        let Some(id) = self.scroll_id.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!("scroll guard dropped, releasing in background");
                let fetcher = self.fetcher.clone();
                handle.spawn(async move {
                    fetcher.release_cursor(&id).await;
                });
            }
            Err(_) => warn!("scroll guard dropped outside a runtime; scroll left to expire"),
        }
    }
}

/// Where the driver currently is
enum ScrollState {
    Start,
    Paginating(ScrollGuard),
    Done(Option<ScrollGuard>),
}

/// Drives one search through its whole scroll sequence
pub struct ScrollDriver<'a, S: HitSink> {
    fetcher: &'a PageFetcher,
    progress: &'a ProgressCounters,
    sink: &'a mut S,
}

impl<'a, S: HitSink> ScrollDriver<'a, S> {
    /// Create a new driver
    ///
    /// # Arguments
    /// * `fetcher` - Page fetcher, carrying the pipeline's cancellation token
    /// * `progress` - Counters shared with sibling pipelines
    /// * `sink` - Destination for every fetched batch
    pub fn new(
        fetcher: &'a PageFetcher,
        progress: &'a ProgressCounters,
        sink: &'a mut S,
    ) -> Self {
        Self {
            fetcher,
            progress,
            sink,
        }
    }

    /// Run the search, paginating when `fetch_all` is set
    ///
    /// # Arguments
    /// * `index` - Index to search
    /// * `query` - Query text, already augmented with its slice
    /// * `fetch_all` - Follow the scroll until the store returns an empty batch
    ///
    /// # Returns
    /// * `Result<u64>` - Number of documents this pipeline emitted
    pub async fn run(&mut self, index: &str, query: &str, fetch_all: bool) -> Result<u64> {
        let mut emitted = 0u64;
        let mut state = ScrollState::Start;

        loop {
            state = match state {
                ScrollState::Start => {
                    let page = self.fetcher.fetch_first_page(index, query, fetch_all).await?;
                    self.progress.add_total(page.total_hits().value);

                    // Owned from here on, so a failed write still releases it
                    let guard = match (fetch_all, page.scroll_id.clone()) {
                        (true, Some(id)) => Some(ScrollGuard::new(self.fetcher.clone(), id)),
                        (true, None) => {
                            warn!(index, "store returned no scroll id; stopping after first page");
                            None
                        }
                        (false, _) => None,
                    };

                    let outcome = self.emit(&page).await;
                    let batch = match outcome {
                        Ok(n) => n,
                        Err(e) => {
                            release(guard).await;
                            return Err(e);
                        }
                    };
                    emitted += batch;

                    match guard {
                        Some(guard) if batch > 0 => ScrollState::Paginating(guard),
                        other => ScrollState::Done(other),
                    }
                }
                ScrollState::Paginating(mut guard) => match self.advance(&mut guard).await {
                    Ok(0) => ScrollState::Done(Some(guard)),
                    Ok(batch) => {
                        emitted += batch;
                        ScrollState::Paginating(guard)
                    }
                    Err(e) => {
                        guard.release().await;
                        return Err(e);
                    }
                },
                ScrollState::Done(guard) => {
                    release(guard).await;
                    return Ok(emitted);
                }
            };
        }
    }

    /// Fetch and emit one more page of the scroll
    async fn advance(&mut self, guard: &mut ScrollGuard) -> Result<u64> {
        let Some(scroll_id) = guard.scroll_id().map(str::to_string) else {
            return Ok(0);
        };

        let page = self.fetcher.fetch_next_page(&scroll_id).await?;
        guard.advance_to(page.scroll_id.clone());
        self.emit(&page).await
    }

    /// Write a page to the sink and account for it
    async fn emit(&mut self, page: &SearchResponse) -> Result<u64> {
        let hits: &[Box<RawValue>] = page.hits();
        self.sink.write_batch(hits).await?;

        let count = hits.len() as u64;
        self.progress.add_fetched(count);
        self.progress.log();
        Ok(count)
    }
}

async fn release(guard: Option<ScrollGuard>) {
    if let Some(guard) = guard {
        guard.release().await;
    }
}
