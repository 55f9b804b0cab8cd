//! Page fetcher: one search, scroll-advance or scroll-release request at a time

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::connection::Transport;
use crate::error::{EsdumpError, Result, TransportError};

use super::response::SearchResponse;

/// Path of the scroll endpoint
pub const SCROLL_PATH: &str = "_search/scroll";

/// Issues page requests against the store
///
/// Every request races the fetcher's cancellation token. The release call is
/// bounded by its own timeout instead, so a cancelled pipeline still gets a
/// chance to free its scroll.
#[derive(Clone)]
pub struct PageFetcher {
    transport: Arc<dyn Transport>,
    keep_alive: String,
    release_timeout: Duration,
    cancel: CancellationToken,
}

impl PageFetcher {
    /// Create a new page fetcher
    ///
    /// # Arguments
    /// * `transport` - Transport used for every request
    /// * `keep_alive` - Scroll lifetime, e.g. `1m`
    /// * `release_timeout` - Upper bound for the scroll release call
    pub fn new(
        transport: Arc<dyn Transport>,
        keep_alive: impl Into<String>,
        release_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            keep_alive: keep_alive.into(),
            release_timeout,
            cancel: CancellationToken::new(),
        }
    }

    /// Return a copy of this fetcher observing `token`
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self {
            cancel: token,
            ..self.clone()
        }
    }

    /// Run the initial search
    ///
    /// # Arguments
    /// * `index` - Index to search
    /// * `query` - Query document as text (may be empty)
    /// * `open_scroll` - Ask the store to open a scroll
    ///
    /// # Returns
    /// * `Result<SearchResponse>` - First page, or an error when any shard failed
    pub async fn fetch_first_page(
        &self,
        index: &str,
        query: &str,
        open_scroll: bool,
    ) -> Result<SearchResponse> {
        let path = self.search_path(index, open_scroll);
        debug!(index, scroll = open_scroll, "running initial search");
        self.request(Method::GET, &path, query.to_string()).await
    }

    /// Advance a scroll by one page
    pub async fn fetch_next_page(&self, scroll_id: &str) -> Result<SearchResponse> {
        let body = json!({ "scroll": self.keep_alive, "scroll_id": scroll_id }).to_string();
        self.request(Method::POST, SCROLL_PATH, body).await
    }

    /// Release a scroll
    ///
    /// Failures are logged and swallowed: the scroll expires on its own once
    /// its keep-alive elapses.
    ///
    /// # Returns
    /// * `bool` - Whether the store acknowledged the release
    pub async fn release_cursor(&self, scroll_id: &str) -> bool {
        let body = json!({ "scroll_id": scroll_id }).to_string();
        let release = self.transport.send(Method::DELETE, SCROLL_PATH, body);

        match tokio::time::timeout(self.release_timeout, release).await {
            Ok(Ok(_)) => {
                debug!("cleared scroll");
                true
            }
            Ok(Err(e)) => {
                warn!(error = %e, "failed to clear scroll");
                false
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.release_timeout.as_millis() as u64,
                    "timed out clearing scroll"
                );
                false
            }
        }
    }

    fn search_path(&self, index: &str, open_scroll: bool) -> String {
        let mut path = format!("{}/_search?_source=true", index.trim_matches('/'));
        if open_scroll {
            path.push_str("&scroll=");
            path.push_str(&self.keep_alive);
        }
        path
    }

    async fn request(&self, method: Method, path: &str, body: String) -> Result<SearchResponse> {
        if self.cancel.is_cancelled() {
            return Err(EsdumpError::Cancelled);
        }

        let outcome = tokio::select! {
            result = self.transport.send(method, path, body) => result,
            _ = self.cancel.cancelled() => return Err(EsdumpError::Cancelled),
        };

        let data = match outcome {
            Ok(data) => data,
            Err(EsdumpError::Transport(TransportError::Status { status, reason, body })) => {
                // Degraded stores report shard failures with a non-2xx status
                if let Ok(response) = SearchResponse::from_slice(&body) {
                    response.ensure_shards_succeeded()?;
                }
                return Err(TransportError::Status { status, reason, body }.into());
            }
            Err(e) => return Err(e),
        };

        let response = SearchResponse::from_slice(&data)?;
        response.ensure_shards_succeeded()?;
        Ok(response)
    }
}
