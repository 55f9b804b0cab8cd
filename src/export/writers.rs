//! Output sinks for hit documents
//!
//! Each hit is written verbatim followed by a newline. [`SharedSink`] lets
//! several slice pipelines write to one destination; it holds its lock for
//! one whole batch so lines of different slices interleave only at batch
//! boundaries.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::value::RawValue;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::trace;

use crate::error::{EsdumpError, Result};

/// Destination for batches of hit documents
#[async_trait]
pub trait HitSink: Send {
    /// Write a batch of hits, one per line
    ///
    /// # Arguments
    /// * `hits` - Raw hit documents, in store order
    ///
    /// # Returns
    /// * `Result<usize>` - Number of hits written
    async fn write_batch(&mut self, hits: &[Box<RawValue>]) -> Result<usize>;

    /// Flush buffered output
    async fn finalize(&mut self) -> Result<()>;
}

/// Writes hits as JSON lines to an async writer
pub struct JsonLinesSink<W> {
    writer: W,
    written: u64,
}

impl<W> JsonLinesSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// Create a new JSON lines sink
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Number of lines written so far
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Recover the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W> HitSink for JsonLinesSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn write_batch(&mut self, hits: &[Box<RawValue>]) -> Result<usize> {
        for hit in hits {
            self.writer
                .write_all(hit.get().as_bytes())
                .await
                .map_err(EsdumpError::SinkWrite)?;
            self.writer
                .write_all(b"\n")
                .await
                .map_err(EsdumpError::SinkWrite)?;
        }

        self.written += hits.len() as u64;
        trace!(batch = hits.len(), total = self.written, "wrote batch");
        Ok(hits.len())
    }

    async fn finalize(&mut self) -> Result<()> {
        self.writer.flush().await.map_err(EsdumpError::SinkWrite)
    }
}

/// A [`JsonLinesSink`] shared between concurrent pipelines
pub struct SharedSink<W> {
    inner: Arc<Mutex<JsonLinesSink<W>>>,
}

impl<W> Clone for SharedSink<W> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<W> SharedSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// Wrap a sink for shared use
    pub fn new(sink: JsonLinesSink<W>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(sink)),
        }
    }

    /// Number of lines written so far by all holders
    pub async fn written(&self) -> u64 {
        self.inner.lock().await.written()
    }
}

#[async_trait]
impl<W> HitSink for SharedSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn write_batch(&mut self, hits: &[Box<RawValue>]) -> Result<usize> {
        // Held for the whole batch, released before the next one
        let mut sink = self.inner.lock().await;
        sink.write_batch(hits).await
    }

    async fn finalize(&mut self) -> Result<()> {
        self.inner.lock().await.finalize().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{BrokenPipe, SharedBuffer};

    fn raw(json: &str) -> Box<RawValue> {
        RawValue::from_string(json.to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_writes_hits_verbatim() {
        let mut sink = JsonLinesSink::new(Vec::new());
        let batch = vec![raw(r#"{"_id":"1", "n": 1.50}"#), raw(r#"{"_id":"2"}"#)];

        let written = sink.write_batch(&batch).await.unwrap();
        sink.finalize().await.unwrap();

        assert_eq!(written, 2);
        assert_eq!(sink.written(), 2);
        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(output, "{\"_id\":\"1\", \"n\": 1.50}\n{\"_id\":\"2\"}\n");
    }

    #[tokio::test]
    async fn test_empty_batch_writes_nothing() {
        let mut sink = JsonLinesSink::new(Vec::new());
        assert_eq!(sink.write_batch(&[]).await.unwrap(), 0);
        assert!(sink.into_inner().is_empty());
    }

    #[tokio::test]
    async fn test_write_failure_is_sink_error() {
        let mut sink = JsonLinesSink::new(BrokenPipe);
        let result = sink.write_batch(&[raw("{}")]).await;
        assert!(matches!(result, Err(EsdumpError::SinkWrite(_))));
    }

    #[tokio::test]
    async fn test_shared_sink_keeps_batches_contiguous() {
        let buffer = SharedBuffer::default();
        let sink = SharedSink::new(JsonLinesSink::new(buffer.clone()));

        let mut handles = Vec::new();
        for task in 0..4 {
            let mut sink = sink.clone();
            handles.push(tokio::spawn(async move {
                for batch in 0..5 {
                    let hits: Vec<_> = (0..10)
                        .map(|n| raw(&format!(r#"{{"task":{task},"batch":{batch},"n":{n}}}"#)))
                        .collect();
                    sink.write_batch(&hits).await.unwrap();
                    tokio::task::yield_now().await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(sink.written().await, 200);
        let lines = buffer.lines();
        assert_eq!(lines.len(), 200);

        // Every run of 10 lines belongs to a single batch, in order
        for chunk in lines.chunks(10) {
            let first: serde_json::Value = serde_json::from_str(&chunk[0]).unwrap();
            for (n, line) in chunk.iter().enumerate() {
                let value: serde_json::Value = serde_json::from_str(line).unwrap();
                assert_eq!(value["task"], first["task"]);
                assert_eq!(value["batch"], first["batch"]);
                assert_eq!(value["n"], n);
            }
        }
    }
}
