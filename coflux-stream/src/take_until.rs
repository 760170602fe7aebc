// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use coflux_core::StreamItem;
use core::pin::Pin;
use core::task::{Context, Poll};
use futures::Stream;
use pin_project::pin_project;

/// Extension trait providing [`take_until_signal`](TakeUntilExt::take_until_signal).
pub trait TakeUntilExt<T>: Stream<Item = StreamItem<T>> + Sized {
    /// Relays this stream until `other` emits a value or completes.
    ///
    /// The stop signal is checked before every item of the main stream, so
    /// once `other` fired nothing else is relayed. An error on `other` is
    /// forwarded and ends the output.
    fn take_until_signal<U, O>(self, other: O) -> TakeUntil<Self, O>
    where
        O: Stream<Item = StreamItem<U>>,
    {
        TakeUntil {
            source: self,
            other,
            done: false,
        }
    }
}

impl<S, T> TakeUntilExt<T> for S where S: Stream<Item = StreamItem<T>> {}

/// Output of [`TakeUntilExt::take_until_signal`].
#[pin_project]
#[must_use = "streams do nothing unless polled"]
pub struct TakeUntil<S, O> {
    #[pin]
    source: S,
    #[pin]
    other: O,
    done: bool,
}

impl<S, O, T, U> Stream for TakeUntil<S, O>
where
    S: Stream<Item = StreamItem<T>>,
    O: Stream<Item = StreamItem<U>>,
{
    type Item = StreamItem<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        if *this.done {
            return Poll::Ready(None);
        }

        match this.other.poll_next(cx) {
            Poll::Ready(Some(StreamItem::Value(_)) | None) => {
                *this.done = true;
                return Poll::Ready(None);
            }
            Poll::Ready(Some(StreamItem::Error(err))) => {
                *this.done = true;
                return Poll::Ready(Some(StreamItem::Error(err)));
            }
            Poll::Pending => {}
        }

        match this.source.poll_next(cx) {
            Poll::Ready(None) => {
                *this.done = true;
                Poll::Ready(None)
            }
            Poll::Ready(Some(StreamItem::Error(err))) => {
                *this.done = true;
                Poll::Ready(Some(StreamItem::Error(err)))
            }
            other => other,
        }
    }
}
