// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use coflux_core::StreamItem;
use core::pin::Pin;
use core::task::{Context, Poll};
use futures::Stream;
use pin_project::pin_project;

/// Extension trait providing [`flat_map_drop`](FlatMapDropExt::flat_map_drop).
pub trait FlatMapDropExt<T>: Stream<Item = StreamItem<T>> + Sized {
    /// Maps each item to an inner stream and relays it, ignoring upstream
    /// items that arrive while an inner stream is still running.
    ///
    /// The upstream keeps being drained while an inner stream is active, so
    /// a fast source is not held back by a slow inner stream. An error from
    /// either side ends the output.
    fn flat_map_drop<R, I, F>(self, mapper: F) -> FlatMapDrop<Self, I, F>
    where
        F: FnMut(T) -> I,
        I: Stream<Item = StreamItem<R>>,
    {
        FlatMapDrop {
            source: self,
            mapper,
            active: None,
            upstream_done: false,
        }
    }
}

impl<S, T> FlatMapDropExt<T> for S where S: Stream<Item = StreamItem<T>> {}

/// Output of [`FlatMapDropExt::flat_map_drop`].
#[pin_project]
#[must_use = "streams do nothing unless polled"]
pub struct FlatMapDrop<S, I, F> {
    #[pin]
    source: S,
    mapper: F,
    #[pin]
    active: Option<I>,
    upstream_done: bool,
}

impl<S, I, F, T, R> Stream for FlatMapDrop<S, I, F>
where
    S: Stream<Item = StreamItem<T>>,
    I: Stream<Item = StreamItem<R>>,
    F: FnMut(T) -> I,
{
    type Item = StreamItem<R>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            // Drain upstream first: whatever arrives while busy is dropped.
            if !*this.upstream_done {
                match this.source.as_mut().poll_next(cx) {
                    Poll::Ready(Some(StreamItem::Value(value))) => {
                        if this.active.is_none() {
                            let inner = (this.mapper)(value);
                            this.active.set(Some(inner));
                        } else {
                            coflux_core::trace!("flat_map_drop: inner busy, item dropped");
                        }
                        continue;
                    }
                    Poll::Ready(Some(StreamItem::Error(err))) => {
                        *this.upstream_done = true;
                        this.active.set(None);
                        return Poll::Ready(Some(StreamItem::Error(err)));
                    }
                    Poll::Ready(None) => *this.upstream_done = true,
                    Poll::Pending => {}
                }
            }

            match this.active.as_mut().as_pin_mut() {
                Some(inner) => match inner.poll_next(cx) {
                    Poll::Ready(Some(StreamItem::Error(err))) => {
                        *this.upstream_done = true;
                        this.active.set(None);
                        return Poll::Ready(Some(StreamItem::Error(err)));
                    }
                    Poll::Ready(Some(item)) => return Poll::Ready(Some(item)),
                    Poll::Ready(None) => {
                        this.active.set(None);
                        if *this.upstream_done {
                            return Poll::Ready(None);
                        }
                    }
                    Poll::Pending => return Poll::Pending,
                },
                None if *this.upstream_done => return Poll::Ready(None),
                None => return Poll::Pending,
            }
        }
    }
}
