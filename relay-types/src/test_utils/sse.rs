//! Event-stream payload builders and instrumented byte streams.

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use tokio::sync::mpsc;

use crate::api::ByteStream;
use crate::error::ApiError;

/// One complete SSE unit: `event:` line, `data:` line, blank line.
pub fn sse_unit(kind: &str, data: &serde_json::Value) -> String {
    format!("event: {kind}\ndata: {data}\n\n")
}

/// A `thread.message.delta` unit carrying `text`.
pub fn delta_unit(text: &str) -> String {
    sse_unit(
        "thread.message.delta",
        &serde_json::json!({
            "id": "msg_stream",
            "object": "thread.message.delta",
            "delta": {
                "content": [{"index": 0, "type": "text", "text": {"value": text}}]
            }
        }),
    )
}

/// A `thread.run.completed` unit.
pub fn completed_unit() -> String {
    sse_unit(
        "thread.run.completed",
        &serde_json::json!({"id": "run_1", "object": "thread.run", "status": "completed"}),
    )
}

/// A stream that yields each chunk then ends.
pub fn byte_stream<I, B>(chunks: I) -> ByteStream
where
    I: IntoIterator<Item = B>,
    B: Into<Bytes>,
{
    let items: Vec<Result<Bytes, ApiError>> = chunks.into_iter().map(|c| Ok(c.into())).collect();
    Box::pin(futures::stream::iter(items))
}

/// A stream that yields each chunk, then `error`, then ends.
pub fn failing_stream<I, B>(chunks: I, error: ApiError) -> ByteStream
where
    I: IntoIterator<Item = B>,
    B: Into<Bytes>,
{
    let mut items: Vec<Result<Bytes, ApiError>> =
        chunks.into_iter().map(|c| Ok(c.into())).collect();
    items.push(Err(error));
    Box::pin(futures::stream::iter(items))
}

/// Sending half of a [`channel_stream`].
#[derive(Clone)]
pub struct StreamFeed {
    tx: mpsc::UnboundedSender<Result<Bytes, ApiError>>,
}

impl StreamFeed {
    /// Deliver a chunk. Returns false once the stream has been dropped.
    pub fn send(&self, chunk: impl Into<Bytes>) -> bool {
        self.tx.send(Ok(chunk.into())).is_ok()
    }

    /// Deliver an error. Returns false once the stream has been dropped.
    pub fn fail(&self, error: ApiError) -> bool {
        self.tx.send(Err(error)).is_ok()
    }

    /// Whether the receiving stream has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// A stream fed by hand; it stays pending until chunks arrive and ends when
/// every [`StreamFeed`] is dropped.
pub fn channel_stream() -> (StreamFeed, ByteStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    let stream = futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    });
    (StreamFeed { tx }, Box::pin(stream))
}

/// Observes whether a [`tracked`] stream has been dropped.
#[derive(Clone, Default)]
pub struct ReleaseFlag(Arc<AtomicBool>);

impl ReleaseFlag {
    /// True once the wrapped stream has been dropped.
    pub fn is_released(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

struct Tracked {
    inner: ByteStream,
    flag: ReleaseFlag,
}

impl Stream for Tracked {
    type Item = Result<Bytes, ApiError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.flag.0.store(true, Ordering::SeqCst);
    }
}

/// Wrap `inner` so its release can be observed.
pub fn tracked(inner: ByteStream) -> (ByteStream, ReleaseFlag) {
    let flag = ReleaseFlag::default();
    let stream = Tracked {
        inner,
        flag: flag.clone(),
    };
    (Box::pin(stream), flag)
}
