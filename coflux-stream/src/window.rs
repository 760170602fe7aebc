// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Count-based windowing.
//!
//! All operators here are pure sequencing transforms: they run inside the
//! consumer's poll and never spawn.
//!
//! | operator                        | `1, 2, 3, 4, 5`                                  |
//! |---------------------------------|--------------------------------------------------|
//! | `chunked(2)`                    | `[1,2] [3,4] [5]`                                |
//! | `sliding(3)`                    | `[1,2,3] [2,3,4] [3,4,5] [4,5] [5]`              |
//! | `windowed(3, 2)`                | `[1,2,3] [3,4,5] [5]`                            |
//! | `buffered_sliding(3)`           | `[1] [1,2] [1,2,3] [2,3,4] [3,4,5]`              |
//! | `pairwise()`                    | `(1,2) (2,3) (3,4) (4,5)`                        |
//!
//! An upstream error discards whatever is buffered and is forwarded as the
//! last item.

use coflux_core::StreamItem;
use core::pin::Pin;
use core::task::{Context, Poll};
use futures::{ready, Stream};
use pin_project::pin_project;
use std::collections::VecDeque;

/// Extension trait providing the windowing operators.
pub trait WindowedExt<T>: Stream<Item = StreamItem<T>> + Sized
where
    T: Clone,
{
    /// Non-overlapping windows of `size` items; the last one may be shorter.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero.
    fn chunked(self, size: usize) -> WindowedStream<Self, T> {
        self.windowed(size, size)
    }

    /// Windows of `size` items advancing by one; trailing windows shrink.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero.
    fn sliding(self, size: usize) -> WindowedStream<Self, T> {
        self.windowed(size, 1)
    }

    /// Windows of `size` items, each starting `step` items after the previous.
    ///
    /// When the upstream completes, the remaining partial windows are
    /// flushed with decreasing size.
    ///
    /// # Panics
    ///
    /// Panics unless `size > 0`, `step > 0` and `size >= step`.
    fn windowed(self, size: usize, step: usize) -> WindowedStream<Self, T> {
        assert!(size > 0, "windowed: size must be positive");
        assert!(step > 0, "windowed: step must be positive");
        assert!(size >= step, "windowed: step must not exceed size");
        WindowedStream::new(self, WindowKind::Windowed { size, step })
    }

    /// Growing windows up to `size`, then sliding by one; no tail flush.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero.
    fn buffered_sliding(self, size: usize) -> WindowedStream<Self, T> {
        assert!(size > 0, "buffered_sliding: size must be positive");
        WindowedStream::new(self, WindowKind::BufferedSliding { size })
    }

    /// Consecutive pairs; a lone trailing item is not emitted.
    fn pairwise(self) -> Pairwise<Self, T> {
        Pairwise {
            windows: self.sliding(2),
        }
    }

    /// Groups runs of consecutive items sharing the same `selector` key.
    fn buffer_until_changed<K, F>(self, selector: F) -> BufferUntilChanged<Self, T, K, F>
    where
        K: PartialEq,
        F: FnMut(&T) -> K,
    {
        BufferUntilChanged {
            source: self,
            selector,
            buffer: Vec::new(),
            current: None,
            done: false,
        }
    }
}

impl<S, T> WindowedExt<T> for S
where
    S: Stream<Item = StreamItem<T>>,
    T: Clone,
{
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WindowKind {
    Windowed { size: usize, step: usize },
    BufferedSliding { size: usize },
}

/// Output of the count-based windowing operators.
#[pin_project]
#[must_use = "streams do nothing unless polled"]
pub struct WindowedStream<S, T> {
    #[pin]
    source: S,
    buffer: VecDeque<T>,
    kind: WindowKind,
    flushing: bool,
    done: bool,
}

impl<S, T> WindowedStream<S, T> {
    fn new(source: S, kind: WindowKind) -> Self {
        Self {
            source,
            buffer: VecDeque::new(),
            kind,
            flushing: false,
            done: false,
        }
    }
}

fn snapshot<T: Clone>(buffer: &VecDeque<T>) -> Vec<T> {
    buffer.iter().cloned().collect()
}

impl<S, T> Stream for WindowedStream<S, T>
where
    S: Stream<Item = StreamItem<T>>,
    T: Clone,
{
    type Item = StreamItem<Vec<T>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if *this.done {
                return Poll::Ready(None);
            }

            if *this.flushing {
                let WindowKind::Windowed { step, .. } = *this.kind else {
                    *this.done = true;
                    continue;
                };
                if this.buffer.is_empty() {
                    *this.done = true;
                    continue;
                }
                let window = snapshot(this.buffer);
                let drop_count = step.min(this.buffer.len());
                this.buffer.drain(..drop_count);
                return Poll::Ready(Some(StreamItem::Value(window)));
            }

            match this.source.as_mut().poll_next(cx) {
                Poll::Ready(Some(StreamItem::Value(value))) => {
                    this.buffer.push_back(value);
                    match *this.kind {
                        WindowKind::Windowed { size, step } => {
                            if this.buffer.len() == size {
                                let window = snapshot(this.buffer);
                                this.buffer.drain(..step);
                                return Poll::Ready(Some(StreamItem::Value(window)));
                            }
                        }
                        WindowKind::BufferedSliding { size } => {
                            if this.buffer.len() > size {
                                this.buffer.pop_front();
                            }
                            return Poll::Ready(Some(StreamItem::Value(snapshot(this.buffer))));
                        }
                    }
                }
                Poll::Ready(Some(StreamItem::Error(err))) => {
                    this.buffer.clear();
                    *this.done = true;
                    return Poll::Ready(Some(StreamItem::Error(err)));
                }
                Poll::Ready(None) => *this.flushing = true,
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Output of [`WindowedExt::pairwise`].
#[pin_project]
#[must_use = "streams do nothing unless polled"]
pub struct Pairwise<S, T> {
    #[pin]
    windows: WindowedStream<S, T>,
}

impl<S, T> Stream for Pairwise<S, T>
where
    S: Stream<Item = StreamItem<T>>,
    T: Clone,
{
    type Item = StreamItem<(T, T)>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        loop {
            return Poll::Ready(match ready!(this.windows.as_mut().poll_next(cx)) {
                Some(StreamItem::Value(window)) => match <[T; 2]>::try_from(window) {
                    Ok([first, second]) => Some(StreamItem::Value((first, second))),
                    // The trailing single-element window.
                    Err(_) => continue,
                },
                Some(StreamItem::Error(err)) => Some(StreamItem::Error(err)),
                None => None,
            });
        }
    }
}

/// Output of [`WindowedExt::buffer_until_changed`].
#[pin_project]
#[must_use = "streams do nothing unless polled"]
pub struct BufferUntilChanged<S, T, K, F> {
    #[pin]
    source: S,
    selector: F,
    buffer: Vec<T>,
    current: Option<K>,
    done: bool,
}

impl<S, T, K, F> Stream for BufferUntilChanged<S, T, K, F>
where
    S: Stream<Item = StreamItem<T>>,
    K: PartialEq,
    F: FnMut(&T) -> K,
{
    type Item = StreamItem<Vec<T>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        if *this.done {
            return Poll::Ready(None);
        }

        loop {
            match this.source.as_mut().poll_next(cx) {
                Poll::Ready(Some(StreamItem::Value(value))) => {
                    let key = (this.selector)(&value);
                    let changed = this.current.as_ref().is_some_and(|current| *current != key);
                    *this.current = Some(key);
                    if changed {
                        let run = core::mem::replace(this.buffer, vec![value]);
                        return Poll::Ready(Some(StreamItem::Value(run)));
                    }
                    this.buffer.push(value);
                }
                Poll::Ready(Some(StreamItem::Error(err))) => {
                    this.buffer.clear();
                    *this.done = true;
                    return Poll::Ready(Some(StreamItem::Error(err)));
                }
                Poll::Ready(None) => {
                    *this.done = true;
                    if this.buffer.is_empty() {
                        return Poll::Ready(None);
                    }
                    return Poll::Ready(Some(StreamItem::Value(core::mem::take(this.buffer))));
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
