// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use coflux_core::{Event, StreamItem};
use core::pin::Pin;
use core::task::{Context, Poll};
use futures::Stream;
use pin_project::pin_project;

/// Extension trait turning terminal signals into ordinary [`Event`]s.
pub trait MaterializeExt<T>: Stream<Item = StreamItem<T>> + Sized {
    /// Emits every item as an [`Event`], ending with exactly one
    /// `Complete` or `Error` event.
    fn materialize(self) -> Materialize<Self> {
        Materialize {
            source: self,
            done: false,
        }
    }
}

impl<S, T> MaterializeExt<T> for S where S: Stream<Item = StreamItem<T>> {}

/// Extension trait restoring a stream from its [`Event`]s.
pub trait DematerializeExt<T>: Stream<Item = Event<T>> + Sized {
    /// Stops at the first terminal event; an `Error` event becomes the
    /// output's error.
    fn dematerialize(self) -> Dematerialize<Self> {
        Dematerialize {
            source: self,
            done: false,
        }
    }
}

impl<S, T> DematerializeExt<T> for S where S: Stream<Item = Event<T>> {}

#[pin_project]
#[must_use = "streams do nothing unless polled"]
pub struct Materialize<S> {
    #[pin]
    source: S,
    done: bool,
}

impl<S, T> Stream for Materialize<S>
where
    S: Stream<Item = StreamItem<T>>,
{
    type Item = Event<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        if *this.done {
            return Poll::Ready(None);
        }
        this.source.poll_next(cx).map(|item| {
            let event = Event::from(item);
            *this.done = event.is_terminal();
            Some(event)
        })
    }
}

#[pin_project]
#[must_use = "streams do nothing unless polled"]
pub struct Dematerialize<S> {
    #[pin]
    source: S,
    done: bool,
}

impl<S, T> Stream for Dematerialize<S>
where
    S: Stream<Item = Event<T>>,
{
    type Item = StreamItem<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        if *this.done {
            return Poll::Ready(None);
        }
        this.source.poll_next(cx).map(|event| {
            let item = event.and_then(Event::into_item);
            *this.done = !matches!(item, Some(StreamItem::Value(_)));
            item
        })
    }
}
