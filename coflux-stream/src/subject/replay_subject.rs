// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Subject retaining a bounded backlog for late consumers.
//!
//! Items live in a singly linked list of reference-counted nodes. The
//! subject keeps a `head` marker whose successors form the retained
//! backlog; every consumer keeps its own cursor node and walks forward from
//! it. Trimming only moves `head`, so a slow consumer still holding an older
//! cursor keeps reading the items it already had in reach.
//!
//! Emission never waits for consumers: the item is appended and every
//! parked consumer is woken through its own [`Signal`].

use super::{terminated_error, Subject, SubjectStream, Terminal};
use async_trait::async_trait;
use coflux_core::{CofluxError, Result, Signal, StreamItem, Wait};
use coflux_runtime::time_source::SharedTimeSource;
use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};
use core::time::Duration;
use futures::Stream;
use parking_lot::Mutex;
use std::sync::{Arc, OnceLock};

/// Retention limits of a [`ReplaySubject`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplayBounds {
    /// Maximum number of retained items.
    pub max_size: Option<usize>,
    /// Items older than this are no longer replayed.
    pub max_age: Option<Duration>,
}

impl ReplayBounds {
    pub const fn unbounded() -> Self {
        Self {
            max_size: None,
            max_age: None,
        }
    }

    /// # Panics
    ///
    /// Panics if `max_size` is zero.
    pub fn sized(max_size: usize) -> Self {
        assert!(max_size > 0, "max_size must be positive");
        Self {
            max_size: Some(max_size),
            max_age: None,
        }
    }

    pub const fn timed(max_age: Duration) -> Self {
        Self {
            max_size: None,
            max_age: Some(max_age),
        }
    }

    /// # Panics
    ///
    /// Panics if `max_size` is zero.
    pub fn bounded(max_size: usize, max_age: Duration) -> Self {
        assert!(max_size > 0, "max_size must be positive");
        Self {
            max_size: Some(max_size),
            max_age: Some(max_age),
        }
    }

    fn is_stale(&self, timestamp: Duration, now: Duration) -> bool {
        match self.max_age {
            Some(max_age) => now
                .checked_sub(max_age)
                .is_some_and(|limit| timestamp <= limit),
            None => false,
        }
    }
}

struct Node<T> {
    entry: Option<(T, Duration)>,
    next: OnceLock<Arc<Node<T>>>,
}

impl<T> Node<T> {
    fn sentinel() -> Arc<Self> {
        Arc::new(Self {
            entry: None,
            next: OnceLock::new(),
        })
    }
}

impl<T> Drop for Node<T> {
    // Unlink iteratively so a long backlog cannot overflow the stack.
    fn drop(&mut self) {
        let mut next = self.next.take();
        while let Some(node) = next {
            match Arc::try_unwrap(node) {
                Ok(mut node) => next = node.next.take(),
                Err(_) => break,
            }
        }
    }
}

struct ReplayState<T> {
    head: Arc<Node<T>>,
    tail: Arc<Node<T>>,
    size: usize,
    terminal: Terminal,
    consumers: Vec<(u64, Signal)>,
    next_id: u64,
}

struct Shared<T> {
    bounds: ReplayBounds,
    time_source: SharedTimeSource,
    state: Mutex<ReplayState<T>>,
}

/// Hot subject replaying up to [`ReplayBounds`] worth of history to every
/// new consumer before switching it to live items.
///
/// # Example
///
/// ```
/// use coflux_stream::subject::{ReplaySubject, Subject};
/// use coflux_core::StreamItem;
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() {
/// let subject = ReplaySubject::sized(2);
/// for i in 1..=5 {
///     subject.emit(i).await.unwrap();
/// }
/// subject.complete().await.unwrap();
///
/// let late: Vec<_> = subject.subscribe().collect().await;
/// assert_eq!(late, vec![StreamItem::Value(4), StreamItem::Value(5)]);
/// # }
/// ```
pub struct ReplaySubject<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for ReplaySubject<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> ReplaySubject<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a subject with explicit bounds and clock.
    pub fn new(bounds: ReplayBounds, time_source: SharedTimeSource) -> Self {
        let sentinel = Node::sentinel();
        Self {
            shared: Arc::new(Shared {
                bounds,
                time_source,
                state: Mutex::new(ReplayState {
                    head: Arc::clone(&sentinel),
                    tail: sentinel,
                    size: 0,
                    terminal: Terminal::Open,
                    consumers: Vec::new(),
                    next_id: 0,
                }),
            }),
        }
    }

    pub fn with_bounds(bounds: ReplayBounds) -> Self {
        Self::new(bounds, default_time_source())
    }

    pub fn unbounded() -> Self {
        Self::with_bounds(ReplayBounds::unbounded())
    }

    pub fn sized(max_size: usize) -> Self {
        Self::with_bounds(ReplayBounds::sized(max_size))
    }

    pub fn timed(max_age: Duration) -> Self {
        Self::with_bounds(ReplayBounds::timed(max_age))
    }

    pub fn bounded(max_size: usize, max_age: Duration) -> Self {
        Self::with_bounds(ReplayBounds::bounded(max_size, max_age))
    }

    pub fn bounds(&self) -> ReplayBounds {
        self.shared.bounds
    }

    /// Appends `value` without suspending.
    ///
    /// # Errors
    ///
    /// A protocol violation if the subject already terminated.
    pub fn try_emit(&self, value: T) -> Result<()> {
        let now = self.shared.time_source.now();
        let node = Arc::new(Node {
            entry: Some((value, now)),
            next: OnceLock::new(),
        });

        let consumers: Vec<Signal> = {
            let mut state = self.shared.state.lock();
            if !state.terminal.is_open() {
                return Err(terminated_error());
            }
            // The tail is always the last linked node, so its slot is free.
            let _ = state.tail.next.set(Arc::clone(&node));
            state.tail = node;
            state.size += 1;
            self.trim(&mut state, now);
            state.consumers.iter().map(|(_, s)| s.clone()).collect()
        };

        for consumer in consumers {
            consumer.signal();
        }
        Ok(())
    }

    /// Most recent retained item, if any.
    pub fn latest(&self) -> Option<T> {
        let state = self.shared.state.lock();
        if state.size == 0 {
            return None;
        }
        state.tail.entry.as_ref().map(|(value, _)| value.clone())
    }

    /// Number of retained items, ignoring age.
    pub fn len(&self) -> usize {
        self.shared.state.lock().size
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn trim(&self, state: &mut ReplayState<T>, now: Duration) {
        if let Some(max_size) = self.shared.bounds.max_size {
            while state.size > max_size {
                Self::advance_head(state);
            }
        }
        while state.size > 0 {
            let stale = match state.head.next.get().and_then(|n| n.entry.as_ref()) {
                Some((_, timestamp)) => self.shared.bounds.is_stale(*timestamp, now),
                None => false,
            };
            if !stale {
                break;
            }
            Self::advance_head(state);
        }
    }

    fn advance_head(state: &mut ReplayState<T>) {
        if let Some(next) = state.head.next.get().cloned() {
            state.head = next;
            state.size -= 1;
        }
    }

    fn terminate(&self, terminal: Terminal) -> Result<()> {
        let consumers: Vec<Signal> = {
            let mut state = self.shared.state.lock();
            if !state.terminal.is_open() {
                return Err(terminated_error());
            }
            state.terminal = terminal;
            state.consumers.iter().map(|(_, s)| s.clone()).collect()
        };
        for consumer in consumers {
            consumer.signal();
        }
        Ok(())
    }
}

fn default_time_source() -> SharedTimeSource {
    #[cfg(feature = "runtime-tokio")]
    {
        use coflux_runtime::impls::tokio::TokioRuntime;
        use coflux_runtime::runtime::Runtime;
        Arc::new(<TokioRuntime as Runtime>::Clock::default())
    }
    #[cfg(not(feature = "runtime-tokio"))]
    {
        Arc::new(coflux_runtime::time_source::MonotonicClock::new())
    }
}

#[async_trait]
impl<T> Subject<T> for ReplaySubject<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn emit(&self, value: T) -> Result<()> {
        self.try_emit(value)
    }

    async fn emit_error(&self, error: CofluxError) -> Result<()> {
        self.terminate(Terminal::Failed(error))
    }

    async fn complete(&self) -> Result<()> {
        self.terminate(Terminal::Completed)
    }

    fn subscribe(&self) -> SubjectStream<T> {
        let now = self.shared.time_source.now();
        let signal = Signal::new();
        let (cursor, id) = {
            let mut state = self.shared.state.lock();
            // Stale entries are skipped lazily, at read time.
            let mut cursor = Arc::clone(&state.head);
            while let Some(next) = cursor.next.get() {
                match next.entry.as_ref() {
                    Some((_, timestamp)) if self.shared.bounds.is_stale(*timestamp, now) => {
                        cursor = Arc::clone(next);
                    }
                    _ => break,
                }
            }
            let id = state.next_id;
            state.next_id += 1;
            state.consumers.push((id, signal.clone()));
            (cursor, id)
        };

        Box::pin(ReplayConsumer {
            shared: Arc::clone(&self.shared),
            cursor,
            id,
            signal,
            wait: None,
            done: false,
        })
    }

    fn collector_count(&self) -> usize {
        self.shared.state.lock().consumers.len()
    }
}

struct ReplayConsumer<T> {
    shared: Arc<Shared<T>>,
    cursor: Arc<Node<T>>,
    id: u64,
    signal: Signal,
    wait: Option<Wait>,
    done: bool,
}

impl<T: Clone> ReplayConsumer<T> {
    fn step(&mut self) -> Option<T> {
        let next = Arc::clone(self.cursor.next.get()?);
        self.cursor = next;
        self.cursor.entry.as_ref().map(|(value, _)| value.clone())
    }
}

impl<T: Clone> Stream for ReplayConsumer<T> {
    type Item = StreamItem<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        if this.done {
            return Poll::Ready(None);
        }

        loop {
            if let Some(value) = this.step() {
                return Poll::Ready(Some(StreamItem::Value(value)));
            }

            let terminal = this.shared.state.lock().terminal.clone();
            match terminal {
                Terminal::Open => {}
                terminal => {
                    // An emission may have slipped in before termination.
                    if let Some(value) = this.step() {
                        return Poll::Ready(Some(StreamItem::Value(value)));
                    }
                    this.done = true;
                    this.wait = None;
                    return Poll::Ready(match terminal {
                        Terminal::Failed(err) => Some(StreamItem::Error(err)),
                        _ => None,
                    });
                }
            }

            let wait = this.wait.get_or_insert_with(|| this.signal.wait());
            match Pin::new(wait).poll(cx) {
                Poll::Ready(Ok(())) => this.wait = None,
                Poll::Ready(Err(err)) => {
                    this.done = true;
                    this.wait = None;
                    return Poll::Ready(Some(StreamItem::Error(err)));
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl<T> Drop for ReplayConsumer<T> {
    fn drop(&mut self) {
        let id = self.id;
        self.shared
            .state
            .lock()
            .consumers
            .retain(|(cid, _)| *cid != id);
    }
}
