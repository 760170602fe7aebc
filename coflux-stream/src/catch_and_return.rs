// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use coflux_core::{CofluxError, StreamItem};
use core::pin::Pin;
use core::task::{Context, Poll};
use futures::Stream;
use pin_project::pin_project;

/// Extension trait replacing a terminal error with a fallback value.
pub trait CatchAndReturnExt<T>: Stream<Item = StreamItem<T>> + Sized {
    /// On error, emits `fallback` and completes.
    fn catch_and_return(self, fallback: T) -> CatchAndReturn<Self, Box<dyn FnOnce(CofluxError) -> T + Send>>
    where
        T: Send + 'static,
    {
        self.catch_and_return_with(Box::new(move |_| fallback))
    }

    /// On error, emits `handler(error)` and completes.
    fn catch_and_return_with<F>(self, handler: F) -> CatchAndReturn<Self, F>
    where
        F: FnOnce(CofluxError) -> T,
    {
        CatchAndReturn {
            source: self,
            handler: Some(handler),
            done: false,
        }
    }
}

impl<S, T> CatchAndReturnExt<T> for S where S: Stream<Item = StreamItem<T>> {}

/// Output of [`CatchAndReturnExt`].
#[pin_project]
#[must_use = "streams do nothing unless polled"]
pub struct CatchAndReturn<S, F> {
    #[pin]
    source: S,
    handler: Option<F>,
    done: bool,
}

impl<S, F, T> Stream for CatchAndReturn<S, F>
where
    S: Stream<Item = StreamItem<T>>,
    F: FnOnce(CofluxError) -> T,
{
    type Item = StreamItem<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        if *this.done {
            return Poll::Ready(None);
        }

        match this.source.poll_next(cx) {
            Poll::Ready(Some(StreamItem::Error(err))) => {
                *this.done = true;
                coflux_core::debug!("catch_and_return: replacing error {}", err);
                Poll::Ready(
                    this.handler
                        .take()
                        .map(|handler| StreamItem::Value(handler(err))),
                )
            }
            Poll::Ready(None) => {
                *this.done = true;
                Poll::Ready(None)
            }
            other => other,
        }
    }
}
