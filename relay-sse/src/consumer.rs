//! Byte-stream adapters: raw response bytes → text chunks → events.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use relay_types::{ApiError, ByteStream};

use crate::parser::{EventParser, StreamEvent};

/// Decodes a [`ByteStream`] into UTF-8 text chunks, one per delivered
/// byte chunk.
///
/// A multi-byte character split across two byte chunks is held back (at
/// most three bytes) and emitted with the next chunk. Invalid UTF-8 ends the
/// stream with [`ApiError::Stream`]. The underlying stream is dropped as soon
/// as it ends or fails, and with the adapter otherwise.
pub struct TextChunks {
    inner: Option<ByteStream>,
    pending: Vec<u8>,
}

impl TextChunks {
    /// Wrap a byte stream.
    pub fn new(inner: ByteStream) -> Self {
        Self {
            inner: Some(inner),
            pending: Vec::new(),
        }
    }

    /// Whether the underlying stream has been released.
    pub fn is_released(&self) -> bool {
        self.inner.is_none()
    }

    fn release(&mut self) {
        self.inner = None;
        self.pending.clear();
    }

    /// Append `bytes` to the held-back tail and decode the longest valid prefix.
    fn decode(&mut self, bytes: &[u8]) -> Result<String, ApiError> {
        self.pending.extend_from_slice(bytes);
        match std::str::from_utf8(&self.pending) {
            Ok(text) => {
                let text = text.to_string();
                self.pending.clear();
                Ok(text)
            }
            Err(e) if e.error_len().is_none() => {
                let valid = e.valid_up_to();
                let tail = self.pending.split_off(valid);
                let text = String::from_utf8(std::mem::replace(&mut self.pending, tail))
                    .map_err(|e| ApiError::Stream(format!("UTF-8 decode error: {e}")))?;
                Ok(text)
            }
            Err(e) => Err(ApiError::Stream(format!("UTF-8 decode error: {e}"))),
        }
    }
}

impl Stream for TextChunks {
    type Item = Result<String, ApiError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            let Some(inner) = self.inner.as_mut() else {
                return Poll::Ready(None);
            };
            match inner.poll_next_unpin(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(Ok(bytes))) => match self.decode(&bytes) {
                    // a chunk holding only part of a character yields nothing yet
                    Ok(text) if text.is_empty() => continue,
                    Ok(text) => return Poll::Ready(Some(Ok(text))),
                    Err(e) => {
                        self.release();
                        return Poll::Ready(Some(Err(e)));
                    }
                },
                Poll::Ready(Some(Err(e))) => {
                    self.release();
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(None) => {
                    let truncated = !self.pending.is_empty();
                    self.release();
                    if truncated {
                        return Poll::Ready(Some(Err(ApiError::Stream(
                            "stream ended inside a UTF-8 sequence".into(),
                        ))));
                    }
                    return Poll::Ready(None);
                }
            }
        }
    }
}

/// Decode and parse a run's byte stream into [`StreamEvent`]s.
///
/// The stream ends after the first error. An unterminated unit left over
/// when the bytes run out is discarded.
pub fn event_stream(
    bytes: ByteStream,
) -> impl Stream<Item = Result<StreamEvent, ApiError>> + Send {
    async_stream::stream! {
        let mut chunks = TextChunks::new(bytes);
        let mut parser = EventParser::new();

        while let Some(chunk) = chunks.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            for event in parser.push(&chunk) {
                yield Ok(event);
            }
        }

        let tail = parser.finish();
        if !tail.trim().is_empty() {
            tracing::debug!(bytes = tail.len(), "discarding unterminated trailing stream unit");
        }
    }
}
