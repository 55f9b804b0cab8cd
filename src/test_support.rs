//! Test doubles shared by the unit tests: an in-memory scroll-capable store
//! and in-memory output destinations.

use std::collections::HashSet;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{Value, json};
use tokio::io::AsyncWrite;

use crate::connection::Transport;
use crate::error::{Result, TransportError};

/// Classification of a recorded request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RequestKind {
    Search,
    Advance,
    Release,
}

/// A request received by [`MockStore`]
#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub body: String,
}

impl RecordedCall {
    pub fn kind(&self) -> RequestKind {
        if self.method == Method::POST {
            RequestKind::Advance
        } else if self.method == Method::DELETE {
            RequestKind::Release
        } else {
            RequestKind::Search
        }
    }

    /// `slice.id` carried by a search body, if any
    pub fn slice_id(&self) -> Option<u64> {
        let body: Value = serde_json::from_str(&self.body).ok()?;
        body.get("slice")?.get("id")?.as_u64()
    }

    /// `slice.max` carried by a search body, if any
    pub fn slice_max(&self) -> Option<u64> {
        let body: Value = serde_json::from_str(&self.body).ok()?;
        body.get("slice")?.get("max")?.as_u64()
    }

    /// `scroll_id` carried by an advance or release body
    pub fn scroll_id(&self) -> Option<String> {
        let body: Value = serde_json::from_str(&self.body).ok()?;
        body.get("scroll_id")?.as_str().map(str::to_string)
    }
}

/// In-memory store serving scripted pages per slice.
///
/// `pages[slice]` lists the batch size of every page of that slice, first
/// page included. Advancing past the script yields empty batches. Scroll ids
/// are `scroll-<slice>-<page>`, so every advance issues a fresh token.
pub(crate) struct MockStore {
    pages: Vec<Vec<usize>>,
    failing_pages: HashSet<(usize, usize)>,
    status_on_failure: bool,
    rejected_status: Option<String>,
    failing_releases: bool,
    stalled_slices: HashSet<usize>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockStore {
    pub fn new(pages: Vec<Vec<usize>>) -> Self {
        Self {
            pages,
            failing_pages: HashSet::new(),
            status_on_failure: false,
            rejected_status: None,
            failing_releases: false,
            stalled_slices: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Report a failed shard when serving `page` of `slice`
    pub fn fail_page(mut self, slice: usize, page: usize) -> Self {
        self.failing_pages.insert((slice, page));
        self
    }

    /// Like [`fail_page`](Self::fail_page), with a 500 status around the envelope
    pub fn fail_page_with_status(mut self, slice: usize, page: usize) -> Self {
        self.status_on_failure = true;
        self.fail_page(slice, page)
    }

    /// Answer every search with the given status and a non-envelope body
    pub fn reject_searches(mut self, status: &str) -> Self {
        self.rejected_status = Some(status.to_string());
        self
    }

    /// Answer every scroll release with an error status
    pub fn fail_releases(mut self) -> Self {
        self.failing_releases = true;
        self
    }

    /// Never answer scroll advances of `slice`
    pub fn stall_advances(mut self, slice: usize) -> Self {
        self.stalled_slices.insert(slice);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn count(&self, kind: RequestKind) -> usize {
        self.calls().iter().filter(|c| c.kind() == kind).count()
    }

    pub fn search_count(&self) -> usize {
        self.count(RequestKind::Search)
    }

    pub fn advance_count(&self) -> usize {
        self.count(RequestKind::Advance)
    }

    pub fn release_count(&self) -> usize {
        self.count(RequestKind::Release)
    }

    /// Scroll ids passed to release calls
    pub fn released_ids(&self) -> Vec<String> {
        self.calls()
            .iter()
            .filter(|c| c.kind() == RequestKind::Release)
            .filter_map(RecordedCall::scroll_id)
            .collect()
    }

    fn page_body(&self, slice: usize, page: usize, open_scroll: bool) -> Result<Vec<u8>> {
        let script = self.pages.get(slice).cloned().unwrap_or_default();
        let size = script.get(page).copied().unwrap_or(0);
        let total: usize = script.iter().sum();
        let failed = self.failing_pages.contains(&(slice, page));

        let hits: Vec<Value> = (0..size)
            .map(|n| {
                json!({
                    "_index": "logs",
                    "_id": format!("s{slice}-p{page}-{n}"),
                    "_source": {"slice": slice, "n": n}
                })
            })
            .collect();

        let shards = if failed {
            json!({
                "total": 2, "successful": 1, "skipped": 0, "failed": 1,
                "failures": [{
                    "shard": 1, "index": "logs", "node": "node-1",
                    "reason": {"type": "search_context_missing_exception", "reason": "No search context found"}
                }]
            })
        } else {
            json!({"total": 2, "successful": 2, "skipped": 0, "failed": 0})
        };

        let mut body = json!({
            "_shards": shards,
            "hits": {"total": {"value": total, "relation": "eq"}, "hits": hits},
        });
        if open_scroll {
            body["_scroll_id"] = json!(format!("scroll-{slice}-{page}"));
        }

        let data = body.to_string().into_bytes();
        if failed && self.status_on_failure {
            return Err(TransportError::Status {
                status: "500 Internal Server Error".to_string(),
                reason: None,
                body: data,
            }
            .into());
        }
        Ok(data)
    }
}

fn parse_scroll_id(id: &str) -> Option<(usize, usize)> {
    let mut parts = id.strip_prefix("scroll-")?.split('-');
    let slice = parts.next()?.parse().ok()?;
    let page = parts.next()?.parse().ok()?;
    Some((slice, page))
}

#[async_trait]
impl Transport for MockStore {
    async fn send(&self, method: Method, path: &str, body: String) -> Result<Vec<u8>> {
        let call = RecordedCall {
            method: method.clone(),
            path: path.to_string(),
            body,
        };
        self.calls.lock().unwrap().push(call.clone());

        match call.kind() {
            RequestKind::Search => {
                if let Some(status) = &self.rejected_status {
                    return Err(TransportError::Status {
                        status: status.clone(),
                        reason: None,
                        body: br#"{"status":404}"#.to_vec(),
                    }
                    .into());
                }
                let slice = call.slice_id().unwrap_or(0) as usize;
                let open_scroll = call.path.contains("scroll=");
                self.page_body(slice, 0, open_scroll)
            }
            RequestKind::Advance => {
                let (slice, page) = call
                    .scroll_id()
                    .as_deref()
                    .and_then(parse_scroll_id)
                    .expect("advance with unknown scroll id");
                if self.stalled_slices.contains(&slice) {
                    std::future::pending::<()>().await;
                }
                self.page_body(slice, page + 1, true)
            }
            RequestKind::Release => {
                if self.failing_releases {
                    return Err(TransportError::Status {
                        status: "404 Not Found".to_string(),
                        reason: None,
                        body: br#"{"succeeded":false,"num_freed":0}"#.to_vec(),
                    }
                    .into());
                }
                Ok(br#"{"succeeded":true,"num_freed":1}"#.to_vec())
            }
        }
    }
}

/// Cloneable in-memory output destination
#[derive(Clone, Default)]
pub(crate) struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl AsyncWrite for SharedBuffer {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Destination whose every write fails
pub(crate) struct BrokenPipe;

impl AsyncWrite for BrokenPipe {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, _buf: &[u8]) -> Poll<io::Result<usize>> {
        Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe")))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
