// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Eager concatenation.
//!
//! [`concat_eager`] subscribes to every source at once and buffers what each
//! one produces, but relays the sources strictly one after the other: all
//! items of the first source, then all items of the second, and so on.
//! [`concat_map_eager`](ConcatMapEagerExt::concat_map_eager) does the same
//! for inner streams created from upstream items, launching each one as soon
//! as its item arrives.
//!
//! Buffers are unbounded, so a fast later source may retain many items while
//! an earlier one is still running.
//!
//! An error is delivered at its position in the concatenated order. It ends
//! the output and drops every source still running.
//!
//! ```rust
//! use coflux_stream::concat_eager;
//! use coflux_core::StreamItem;
//! use futures::{stream, StreamExt};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let first = stream::iter([StreamItem::Value(1), StreamItem::Value(2)]).boxed();
//! let second = stream::iter([StreamItem::Value(3)]).boxed();
//!
//! let all: Vec<_> = concat_eager(vec![first, second]).collect().await;
//! assert_eq!(all, (1..=3).map(StreamItem::Value).collect::<Vec<_>>());
//! # }
//! ```

use coflux_core::{CofluxError, StreamItem};
use core::pin::Pin;
use core::task::{Context, Poll};
use futures::Stream;
use pin_project::pin_project;
use std::collections::VecDeque;

// Items pulled from one source per drive; a source that is always ready
// would otherwise keep the drive loop spinning.
const DRIVE_BUDGET: usize = 32;

type BoxedSource<R> = Pin<Box<dyn Stream<Item = StreamItem<R>> + Send + 'static>>;

struct EagerSource<S, R> {
    stream: Option<S>,
    buffer: VecDeque<StreamItem<R>>,
}

/// Ordered set of running sources with their buffered items.
struct EagerQueue<S, R> {
    sources: VecDeque<EagerSource<S, R>>,
}

impl<S, R> EagerQueue<S, R>
where
    S: Stream<Item = StreamItem<R>> + Unpin,
{
    fn new() -> Self {
        Self {
            sources: VecDeque::new(),
        }
    }

    fn push(&mut self, stream: S) {
        self.sources.push_back(EagerSource {
            stream: Some(stream),
            buffer: VecDeque::new(),
        });
    }

    fn push_error(&mut self, error: CofluxError) {
        self.sources.push_back(EagerSource {
            stream: None,
            buffer: VecDeque::from([StreamItem::Error(error)]),
        });
    }

    fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    fn clear(&mut self) {
        self.sources.clear();
    }

    /// Pulls every running source into its buffer.
    ///
    /// Returns `true` if a source ran out of budget while still ready.
    fn drive(&mut self, cx: &mut Context<'_>) -> bool {
        let mut exhausted = false;
        for source in &mut self.sources {
            let mut budget = DRIVE_BUDGET;
            while let Some(stream) = source.stream.as_mut() {
                if budget == 0 {
                    exhausted = true;
                    break;
                }
                budget -= 1;
                match Pin::new(stream).poll_next(cx) {
                    Poll::Ready(Some(StreamItem::Value(value))) => {
                        source.buffer.push_back(StreamItem::Value(value));
                    }
                    Poll::Ready(Some(StreamItem::Error(err))) => {
                        source.buffer.push_back(StreamItem::Error(err));
                        source.stream = None;
                    }
                    Poll::Ready(None) => source.stream = None,
                    Poll::Pending => break,
                }
            }
        }
        exhausted
    }

    /// Next item of the front source, retiring sources that are drained.
    fn pop(&mut self) -> Option<StreamItem<R>> {
        while let Some(front) = self.sources.front_mut() {
            if let Some(item) = front.buffer.pop_front() {
                return Some(item);
            }
            if front.stream.is_some() {
                return None;
            }
            self.sources.pop_front();
        }
        None
    }

    fn poll_next(
        &mut self,
        cx: &mut Context<'_>,
        upstream_done: bool,
    ) -> Poll<Option<StreamItem<R>>> {
        let exhausted = self.drive(cx);
        match self.pop() {
            Some(StreamItem::Error(err)) => {
                self.clear();
                Poll::Ready(Some(StreamItem::Error(err)))
            }
            Some(item) => Poll::Ready(Some(item)),
            None if upstream_done && self.is_empty() => Poll::Ready(None),
            None => {
                if exhausted {
                    cx.waker().wake_by_ref();
                }
                Poll::Pending
            }
        }
    }
}

/// Concatenates `streams` in order while running all of them at once.
pub fn concat_eager<I, S, T>(streams: I) -> ConcatEager<S, T>
where
    I: IntoIterator<Item = S>,
    S: Stream<Item = StreamItem<T>> + Unpin,
{
    let mut queue = EagerQueue::new();
    for stream in streams {
        queue.push(stream);
    }
    ConcatEager {
        queue,
        done: false,
    }
}

/// Extension trait for eagerly concatenating a vector of streams.
pub trait ConcatEagerExt {
    type Stream;
    type Item;

    /// Concatenates every stream of the vector; see [`concat_eager`].
    fn concat_eager(self) -> ConcatEager<Self::Stream, Self::Item>;
}

impl<S, T> ConcatEagerExt for Vec<S>
where
    S: Stream<Item = StreamItem<T>> + Unpin,
{
    type Stream = S;
    type Item = T;

    fn concat_eager(self) -> ConcatEager<S, T> {
        concat_eager(self)
    }
}

/// Output of [`concat_eager`].
#[must_use = "streams do nothing unless polled"]
pub struct ConcatEager<S, T> {
    queue: EagerQueue<S, T>,
    done: bool,
}

// Buffered items are never pinned.
impl<S: Unpin, T> Unpin for ConcatEager<S, T> {}

impl<S, T> Stream for ConcatEager<S, T>
where
    S: Stream<Item = StreamItem<T>> + Unpin,
{
    type Item = StreamItem<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        if this.done {
            return Poll::Ready(None);
        }
        let polled = this.queue.poll_next(cx, true);
        if matches!(polled, Poll::Ready(None | Some(StreamItem::Error(_)))) {
            this.done = true;
        }
        polled
    }
}

/// Extension trait providing [`concat_map_eager`](ConcatMapEagerExt::concat_map_eager).
pub trait ConcatMapEagerExt<T>: Stream<Item = StreamItem<T>> + Sized {
    /// Maps every item to an inner stream, runs the inner streams
    /// concurrently and relays them in upstream order.
    ///
    /// The upstream is drained eagerly. An upstream error is delivered after
    /// the inner streams created before it.
    fn concat_map_eager<R, I, F>(self, mapper: F) -> ConcatMapEager<Self, F, R>
    where
        F: FnMut(T) -> I,
        I: Stream<Item = StreamItem<R>> + Send + 'static,
    {
        ConcatMapEager {
            source: self,
            mapper,
            queue: EagerQueue::new(),
            upstream_done: false,
            done: false,
        }
    }
}

impl<S, T> ConcatMapEagerExt<T> for S where S: Stream<Item = StreamItem<T>> {}

/// Output of [`ConcatMapEagerExt::concat_map_eager`].
#[pin_project]
#[must_use = "streams do nothing unless polled"]
pub struct ConcatMapEager<S, F, R> {
    #[pin]
    source: S,
    mapper: F,
    queue: EagerQueue<BoxedSource<R>, R>,
    upstream_done: bool,
    done: bool,
}

impl<S, F, I, T, R> Stream for ConcatMapEager<S, F, R>
where
    S: Stream<Item = StreamItem<T>>,
    F: FnMut(T) -> I,
    I: Stream<Item = StreamItem<R>> + Send + 'static,
{
    type Item = StreamItem<R>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        if *this.done {
            return Poll::Ready(None);
        }

        let mut budget = DRIVE_BUDGET;
        while !*this.upstream_done && budget > 0 {
            budget -= 1;
            match this.source.as_mut().poll_next(cx) {
                Poll::Ready(Some(StreamItem::Value(value))) => {
                    let inner = (this.mapper)(value);
                    this.queue.push(Box::pin(inner));
                }
                Poll::Ready(Some(StreamItem::Error(err))) => {
                    this.queue.push_error(err);
                    *this.upstream_done = true;
                }
                Poll::Ready(None) => *this.upstream_done = true,
                Poll::Pending => break,
            }
        }
        if !*this.upstream_done && budget == 0 {
            cx.waker().wake_by_ref();
        }

        let polled = this.queue.poll_next(cx, *this.upstream_done);
        if matches!(polled, Poll::Ready(None | Some(StreamItem::Error(_)))) {
            *this.done = true;
            this.queue.clear();
        }
        polled
    }
}
