// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Selector-style multicasting.
//!
//! [`multicast`](MulticastExt::multicast) shares one upstream subscription
//! between any number of consumers built inside a `transform` closure. The
//! closure receives a [`Hub`] it may subscribe to as often as it likes and
//! returns the output stream:
//!
//! ```rust
//! use coflux_stream::MulticastExt;
//! use coflux_core::StreamItem;
//! use futures::{stream, StreamExt};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let source = stream::iter((1..=3).map(StreamItem::Value));
//!
//! // Two consumers of the same upstream, merged back together.
//! let output = source.publish_with(2, |hub| {
//!     let doubled = hub.subscribe().map(|item| item.map(|x: i32| x * 10));
//!     futures::stream::select(hub.subscribe(), doubled)
//! });
//!
//! let mut values: Vec<i32> = output.filter_map(|i| async move { i.ok() }).collect().await;
//! values.sort_unstable();
//! assert_eq!(values, vec![1, 2, 3, 10, 20, 30]);
//! # }
//! ```
//!
//! ## Characteristics
//!
//! - **Lazy**: nothing happens until the output stream is polled; every
//!   output subscription builds its own hub and pump
//! - **Spawns task**: the upstream is pumped into the hub by a background task
//! - **Owned lifecycle**: dropping the output cancels the pump and, with it,
//!   the upstream subscription
//! - **Error propagation**: upstream errors terminate the hub; consumers
//!   built from it see the error
//!
//! With a plain [`PublishSubject`] nothing guarantees that `transform` has
//! attached its consumers before the pump starts emitting, so early items
//! may be lost. [`publish_with`](MulticastExt::publish_with) holds the pump
//! back until the given number of consumers exist.

use crate::subject::{
    MulticastSubject, PublishSubject, ReplayBounds, ReplaySubject, Subject, SubjectStream,
};
use crate::util::until_cancelled;
use coflux_core::{CofluxTask, StreamItem};
use coflux_runtime::time_source::SharedTimeSource;
use core::fmt;
use core::pin::Pin;
use core::task::{Context, Poll};
use core::time::Duration;
use futures::{Stream, StreamExt};
use std::sync::Arc;

/// Handle passed to a multicast `transform`; every call to
/// [`subscribe`](Hub::subscribe) attaches another consumer of the shared
/// upstream.
pub struct Hub<T> {
    subject: Arc<dyn Subject<T>>,
}

impl<T> Hub<T>
where
    T: Send + 'static,
{
    pub fn new(subject: Arc<dyn Subject<T>>) -> Self {
        Self { subject }
    }

    pub fn subscribe(&self) -> SubjectStream<T> {
        self.subject.subscribe()
    }

    pub fn collector_count(&self) -> usize {
        self.subject.collector_count()
    }
}

impl<T> Clone for Hub<T> {
    fn clone(&self) -> Self {
        Self {
            subject: Arc::clone(&self.subject),
        }
    }
}

impl<T> fmt::Debug for Hub<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hub").finish_non_exhaustive()
    }
}

type OutputStream<R> = Pin<Box<dyn Stream<Item = StreamItem<R>> + Send + 'static>>;
type Recipe<R> = Box<dyn FnOnce() -> (OutputStream<R>, CofluxTask) + Send + 'static>;

enum State<R> {
    Idle(Recipe<R>),
    Running {
        output: OutputStream<R>,
        _pump: CofluxTask,
    },
    Done,
}

/// Output of the [`MulticastExt`] operators.
pub struct MulticastStream<R> {
    state: State<R>,
}

impl<R> fmt::Debug for MulticastStream<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            State::Idle(_) => "idle",
            State::Running { .. } => "running",
            State::Done => "done",
        };
        f.debug_struct("MulticastStream")
            .field("state", &state)
            .finish()
    }
}

impl<R> Stream for MulticastStream<R> {
    type Item = StreamItem<R>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        if let State::Idle(_) = this.state {
            if let State::Idle(recipe) = core::mem::replace(&mut this.state, State::Done) {
                let (output, pump) = recipe();
                this.state = State::Running {
                    output,
                    _pump: pump,
                };
            }
        }

        match &mut this.state {
            State::Running { output, .. } => match output.as_mut().poll_next(cx) {
                Poll::Ready(None) => {
                    // Output finished: dropping the pump releases the upstream.
                    this.state = State::Done;
                    Poll::Ready(None)
                }
                other => other,
            },
            _ => Poll::Ready(None),
        }
    }
}

fn spawn_pump<S, T>(source: S, subject: Arc<dyn Subject<T>>) -> CofluxTask
where
    S: Stream<Item = StreamItem<T>> + Send + 'static,
    T: Send + 'static,
{
    CofluxTask::spawn(move |cancel| async move {
        coflux_core::debug!("multicast pump started");
        let mut source = Box::pin(source);
        loop {
            let Some(item) = until_cancelled(&cancel, source.next()).await else {
                coflux_core::debug!("multicast pump cancelled");
                return;
            };
            let delivered = match item {
                Some(StreamItem::Value(value)) => {
                    until_cancelled(&cancel, subject.emit(value)).await
                }
                Some(StreamItem::Error(err)) => {
                    let _ = subject.emit_error(err).await;
                    break;
                }
                None => {
                    let _ = subject.complete().await;
                    break;
                }
            };
            match delivered {
                Some(Ok(())) => {}
                Some(Err(err)) => {
                    coflux_core::debug!("multicast pump stopped: {}", err);
                    return;
                }
                None => return,
            }
        }
        coflux_core::debug!("multicast upstream finished");
    })
}

/// Extension trait providing the multicast family of operators.
pub trait MulticastExt<T>: Stream<Item = StreamItem<T>> + Sized
where
    T: Clone + Send + Sync + 'static,
{
    /// Shares this stream through the subject built by `factory`.
    ///
    /// `factory` runs once per output subscription.
    fn multicast<F, Sub, X, S2, R>(self, factory: F, transform: X) -> MulticastStream<R>
    where
        Self: Send + 'static,
        F: FnOnce() -> Sub + Send + 'static,
        Sub: Subject<T>,
        X: FnOnce(Hub<T>) -> S2 + Send + 'static,
        S2: Stream<Item = StreamItem<R>> + Send + 'static,
        R: 'static,
    {
        let recipe: Recipe<R> = Box::new(move || {
            let subject: Arc<dyn Subject<T>> = Arc::new(factory());
            let output: OutputStream<R> = Box::pin(transform(Hub::new(Arc::clone(&subject))));
            let pump = spawn_pump(self, subject);
            (output, pump)
        });
        MulticastStream {
            state: State::Idle(recipe),
        }
    }

    /// Shares through a [`PublishSubject`].
    fn publish<X, S2, R>(self, transform: X) -> MulticastStream<R>
    where
        Self: Send + 'static,
        X: FnOnce(Hub<T>) -> S2 + Send + 'static,
        S2: Stream<Item = StreamItem<R>> + Send + 'static,
        R: 'static,
    {
        self.multicast(PublishSubject::new, transform)
    }

    /// Shares through a [`MulticastSubject`] that releases the upstream once
    /// `expected_collectors` consumers have attached (at least one).
    fn publish_with<X, S2, R>(self, expected_collectors: usize, transform: X) -> MulticastStream<R>
    where
        Self: Send + 'static,
        X: FnOnce(Hub<T>) -> S2 + Send + 'static,
        S2: Stream<Item = StreamItem<R>> + Send + 'static,
        R: 'static,
    {
        let expected = expected_collectors.max(1);
        self.multicast(move || MulticastSubject::new(expected), transform)
    }

    /// Shares through an unbounded [`ReplaySubject`].
    fn replay<X, S2, R>(self, transform: X) -> MulticastStream<R>
    where
        Self: Send + 'static,
        X: FnOnce(Hub<T>) -> S2 + Send + 'static,
        S2: Stream<Item = StreamItem<R>> + Send + 'static,
        R: 'static,
    {
        self.multicast(ReplaySubject::unbounded, transform)
    }

    /// Shares through a [`ReplaySubject`] retaining the last `max_size` items.
    fn replay_sized<X, S2, R>(self, max_size: usize, transform: X) -> MulticastStream<R>
    where
        Self: Send + 'static,
        X: FnOnce(Hub<T>) -> S2 + Send + 'static,
        S2: Stream<Item = StreamItem<R>> + Send + 'static,
        R: 'static,
    {
        let bounds = ReplayBounds::sized(max_size);
        self.multicast(move || ReplaySubject::with_bounds(bounds), transform)
    }

    /// Shares through a [`ReplaySubject`] retaining items younger than `max_age`.
    fn replay_timed<X, S2, R>(self, max_age: Duration, transform: X) -> MulticastStream<R>
    where
        Self: Send + 'static,
        X: FnOnce(Hub<T>) -> S2 + Send + 'static,
        S2: Stream<Item = StreamItem<R>> + Send + 'static,
        R: 'static,
    {
        self.multicast(move || ReplaySubject::timed(max_age), transform)
    }

    /// Shares through a [`ReplaySubject`] bounded by both size and age.
    fn replay_bounded<X, S2, R>(
        self,
        max_size: usize,
        max_age: Duration,
        transform: X,
    ) -> MulticastStream<R>
    where
        Self: Send + 'static,
        X: FnOnce(Hub<T>) -> S2 + Send + 'static,
        S2: Stream<Item = StreamItem<R>> + Send + 'static,
        R: 'static,
    {
        let bounds = ReplayBounds::bounded(max_size, max_age);
        self.multicast(move || ReplaySubject::with_bounds(bounds), transform)
    }

    /// Like [`replay_bounded`](Self::replay_bounded), ageing items with
    /// `time_source` instead of the runtime clock.
    fn replay_with_time_source<X, S2, R>(
        self,
        max_size: usize,
        max_age: Duration,
        time_source: SharedTimeSource,
        transform: X,
    ) -> MulticastStream<R>
    where
        Self: Send + 'static,
        X: FnOnce(Hub<T>) -> S2 + Send + 'static,
        S2: Stream<Item = StreamItem<R>> + Send + 'static,
        R: 'static,
    {
        let bounds = ReplayBounds::bounded(max_size, max_age);
        self.multicast(
            move || ReplaySubject::new(bounds, time_source),
            transform,
        )
    }
}

impl<S, T> MulticastExt<T> for S
where
    S: Stream<Item = StreamItem<T>>,
    T: Clone + Send + Sync + 'static,
{
}
