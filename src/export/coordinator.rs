//! Slice coordinator for orchestrating fetch operations
//!
//! This module brings together the page fetcher, scroll driver, progress
//! counters and output sink. A single slice runs inline; several slices run
//! as one Tokio task each, sharing the counters, the sink and a cancellation
//! token that the first failing slice triggers.

use std::sync::Arc;

use tokio::io::AsyncWrite;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::{EsdumpError, Result};
use crate::search::{PageFetcher, SliceDescriptor, augment};

use super::progress::ProgressCounters;
use super::scroll::ScrollDriver;
use super::writers::{HitSink, JsonLinesSink, SharedSink};

/// What to fetch
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Index to search
    pub index: String,
    /// Query document as text; empty means the store's match-all default
    pub query: String,
    /// Follow the scroll to exhaustion instead of stopping after one page
    pub fetch_all: bool,
    /// Number of slices; values below 1 behave like 1
    pub slices: usize,
}

/// Result of a successful fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSummary {
    /// Number of documents written
    pub documents: u64,
    /// Sum of the totals reported by the store across slices
    pub total_hits: u64,
    /// Number of slices that ran
    pub slices: usize,
    /// Time taken in milliseconds
    pub elapsed_ms: u64,
}

/// Coordinator for fetch operations
///
/// Each call to [`run`](Self::run) starts from fresh progress counters, so a
/// coordinator can be reused for several fetches.
pub struct SliceCoordinator {
    /// Page fetcher shared by every pipeline
    fetcher: PageFetcher,
    /// Draw a progress bar for each run
    progress_bar: bool,
    /// Cancellation token for aborting the whole fetch
    cancel_token: CancellationToken,
}

impl SliceCoordinator {
    /// Create a new coordinator without a progress bar
    pub fn new(fetcher: PageFetcher) -> Self {
        Self {
            fetcher,
            progress_bar: false,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Enable or disable the stderr progress bar
    pub fn with_progress_bar(mut self, enabled: bool) -> Self {
        self.progress_bar = enabled;
        self
    }

    /// Set cancellation token for this fetch operation
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    /// Execute the fetch
    ///
    /// # Arguments
    /// * `request` - What to fetch
    /// * `output` - Destination for the JSON lines
    ///
    /// # Returns
    /// * `Result<FetchSummary>` - Statistics, or the first error of any slice
    pub async fn run<W>(&self, request: &FetchRequest, output: W) -> Result<FetchSummary>
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let slices = request.slices.max(1);
        info!(
            index = %request.index,
            fetch_all = request.fetch_all,
            slices,
            "Starting fetch"
        );

        let progress = Arc::new(ProgressCounters::new(self.progress_bar));
        let outcome = if slices == 1 {
            self.run_single(request, &progress, output).await
        } else {
            self.run_sliced(request, slices, &progress, output).await
        };
        progress.finish();

        let documents = outcome?;
        let summary = FetchSummary {
            documents,
            total_hits: progress.snapshot().total,
            slices,
            elapsed_ms: progress.elapsed_ms(),
        };

        info!(
            "Fetch completed: {} documents, {} ms",
            summary.documents, summary.elapsed_ms
        );
        Ok(summary)
    }

    /// One pipeline, inline, over an unshared sink
    async fn run_single<W>(
        &self,
        request: &FetchRequest,
        progress: &ProgressCounters,
        output: W,
    ) -> Result<u64>
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let fetcher = self.fetcher.with_cancellation(self.cancel_token.child_token());
        let mut sink = JsonLinesSink::new(output);

        let result = ScrollDriver::new(&fetcher, progress, &mut sink)
            .run(&request.index, &request.query, request.fetch_all)
            .await;

        finish_sink(&mut sink, result).await
    }

    /// One task per slice, first error wins
    async fn run_sliced<W>(
        &self,
        request: &FetchRequest,
        slices: usize,
        progress: &Arc<ProgressCounters>,
        output: W,
    ) -> Result<u64>
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let cancel = self.cancel_token.child_token();
        let mut sink = SharedSink::new(JsonLinesSink::new(output));
        let mut join_set = JoinSet::new();

        for slice in SliceDescriptor::all(slices) {
            let fetcher = self.fetcher.with_cancellation(cancel.clone());
            let progress = Arc::clone(progress);
            let mut sink = sink.clone();
            let request = request.clone();

            join_set.spawn(async move {
                let query = augment(&request.query, slice)?;
                debug!(slice = slice.id, max = slice.max, "starting slice");

                let emitted = ScrollDriver::new(&fetcher, &progress, &mut sink)
                    .run(&request.index, &query, request.fetch_all)
                    .await?;

                debug!(slice = slice.id, emitted, "slice finished");
                Ok::<u64, EsdumpError>(emitted)
            });
        }

        let mut emitted = 0u64;
        let mut first_error: Option<EsdumpError> = None;

        while let Some(joined) = join_set.join_next().await {
            let result = joined.map_err(to_join_error).and_then(|r| r);
            match result {
                Ok(count) => emitted += count,
                Err(err) if first_error.is_none() => {
                    if !err.is_cancelled() {
                        error!(error = %err, "slice failed, cancelling remaining slices");
                    }
                    cancel.cancel();
                    first_error = Some(err);
                }
                Err(err) => debug!(error = %err, "discarding error from sibling slice"),
            }
        }

        let result = match first_error {
            Some(err) => Err(err),
            None => Ok(emitted),
        };
        finish_sink(&mut sink, result).await
    }
}

/// Flush the sink; a flush failure only surfaces when nothing failed before
async fn finish_sink<S: HitSink>(sink: &mut S, result: Result<u64>) -> Result<u64> {
    let flushed = sink.finalize().await;
    let emitted = result?;
    flushed?;
    Ok(emitted)
}

fn to_join_error(err: tokio::task::JoinError) -> EsdumpError {
    if err.is_cancelled() {
        EsdumpError::TaskFailed("slice task cancelled".to_string())
    } else if err.is_panic() {
        EsdumpError::TaskFailed("slice task panicked".to_string())
    } else {
        EsdumpError::TaskFailed("slice task aborted unexpectedly".to_string())
    }
}
