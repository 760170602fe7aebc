// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Stream wrapper that injects a `StreamItem::Error` at a chosen position.

use coflux_core::{CofluxError, StreamItem};
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Wraps plain values in `StreamItem::Value`, emitting one injected error at
/// position `inject_error_at` (0-indexed, counting the error itself).
///
/// ```rust
/// use coflux_test_utils::ErrorInjectingStream;
/// use coflux_core::StreamItem;
/// use futures::{stream, StreamExt};
///
/// # #[tokio::main]
/// # async fn main() {
/// let mut s = ErrorInjectingStream::new(stream::iter([1, 2]), 1);
///
/// assert_eq!(s.next().await, Some(StreamItem::Value(1)));
/// assert!(matches!(s.next().await, Some(StreamItem::Error(_))));
/// assert_eq!(s.next().await, Some(StreamItem::Value(2)));
/// # }
/// ```
pub struct ErrorInjectingStream<S> {
    inner: S,
    inject_error_at: Option<usize>,
    count: usize,
}

impl<S> ErrorInjectingStream<S> {
    pub fn new(inner: S, inject_error_at: usize) -> Self {
        Self {
            inner,
            inject_error_at: Some(inject_error_at),
            count: 0,
        }
    }
}

impl<S> Stream for ErrorInjectingStream<S>
where
    S: Stream + Unpin,
{
    type Item = StreamItem<S::Item>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.inject_error_at == Some(self.count) {
            self.inject_error_at = None;
            self.count += 1;
            return Poll::Ready(Some(StreamItem::Error(CofluxError::stream_error(
                "Injected test error",
            ))));
        }

        match Pin::new(&mut self.inner).poll_next(cx) {
            Poll::Ready(Some(item)) => {
                self.count += 1;
                Poll::Ready(Some(StreamItem::Value(item)))
            }
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}
