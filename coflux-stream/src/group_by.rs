// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Keyed partitioning of a stream.
//!
//! [`group_by`](GroupByExt::group_by) splits one upstream into one
//! [`GroupedStream`] per distinct key. The outer stream yields each group the
//! first time its key shows up; the group then receives every value with
//! that key, in upstream order.
//!
//! ## Characteristics
//!
//! - **Spawns task**: routing runs in a background task started on the
//!   first poll of the outer stream
//! - **Pull-based**: each partition is fed through its own
//!   [`SlotHandoff`], so a partition
//!   that is not being read holds back the whole upstream
//! - **Single consumer**: a group can be subscribed once; a second
//!   [`subscribe`](GroupedStream::subscribe) is a protocol violation
//! - **Outlives the outer stream**: once the outer consumer is gone no new
//!   groups are opened, but the live partitions keep receiving values until
//!   the last of them is dropped
//! - **Error propagation**: upstream errors go to every live partition and
//!   the outer stream completes; a failing selector terminates the
//!   partitions and the outer stream with the selector's error
//!
//! ## Example
//!
//! ```rust
//! use coflux_stream::GroupByExt;
//! use coflux_core::StreamItem;
//! use futures::{stream, StreamExt};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let source = stream::iter((1..=6).map(StreamItem::Value));
//!
//! let groups = source
//!     .group_by(|n: &i32| Ok(n % 2))
//!     .into_group_map()
//!     .await
//!     .unwrap();
//!
//! assert_eq!(groups[&0], vec![2, 4, 6]);
//! assert_eq!(groups[&1], vec![1, 3, 5]);
//! # }
//! ```

use crate::util::until_cancelled;
use coflux_core::{
    CofluxError, CofluxTask, HandoffReceiver, HandoffSender, Result, SlotHandoff, StreamItem,
};
use core::fmt::{self, Debug};
use core::hash::Hash;
use core::pin::Pin;
use core::sync::atomic::{AtomicBool, Ordering};
use core::task::{Context, Poll};
use futures::future::Either;
use futures::{stream, Stream, StreamExt};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Extension trait providing the `group_by` operators.
pub trait GroupByExt<T>: Stream<Item = StreamItem<T>> + Sized
where
    T: Send + 'static,
{
    /// Partitions the stream by `key_selector`.
    ///
    /// # Errors
    ///
    /// An `Err` from `key_selector` terminates the operator; every live
    /// partition and the outer stream receive it.
    fn group_by<K, KF>(self, key_selector: KF) -> GroupByStream<K, T>
    where
        Self: Send + 'static,
        K: Eq + Hash + Clone + Send + Sync + 'static,
        KF: FnMut(&T) -> Result<K> + Send + 'static,
    {
        self.group_by_with(key_selector, Ok)
    }

    /// Partitions the stream by `key_selector`, storing `value_selector(item)`
    /// in the partitions.
    fn group_by_with<K, V, KF, VF>(self, key_selector: KF, value_selector: VF) -> GroupByStream<K, V>
    where
        Self: Send + 'static,
        K: Eq + Hash + Clone + Send + Sync + 'static,
        V: Send + 'static,
        KF: FnMut(&T) -> Result<K> + Send + 'static,
        VF: FnMut(T) -> Result<V> + Send + 'static,
    {
        let recipe: GroupRecipe<K, V> = Box::new(move || {
            let registry = Arc::new(Mutex::new(Registry {
                partitions: HashMap::new(),
                next_id: 0,
            }));
            let (outer_tx, outer_rx) = SlotHandoff::channel();
            let task = CofluxTask::spawn(move |cancel| {
                route(
                    self,
                    key_selector,
                    value_selector,
                    registry,
                    outer_tx,
                    cancel,
                )
            });
            (outer_rx, Arc::new(task))
        });

        GroupByStream {
            state: GroupState::Idle(recipe),
        }
    }
}

impl<S, T> GroupByExt<T> for S
where
    S: Stream<Item = StreamItem<T>>,
    T: Send + 'static,
{
}

struct Registry<K, V> {
    partitions: HashMap<K, (u64, HandoffSender<V>)>,
    next_id: u64,
}

type SharedRegistry<K, V> = Arc<Mutex<Registry<K, V>>>;

impl<K, V> Registry<K, V>
where
    K: Eq + Hash,
{
    fn remove_if(&mut self, key: &K, id: u64) {
        if self.partitions.get(key).is_some_and(|(pid, _)| *pid == id) {
            self.partitions.remove(key);
        }
    }
}

/// Group as handed from the routing task to the outer stream.
struct RawGroup<K, V> {
    key: K,
    id: u64,
    receiver: HandoffReceiver<V>,
    registry: SharedRegistry<K, V>,
}

enum Flow {
    Continue,
    Stop,
}

async fn route<S, T, K, V, KF, VF>(
    source: S,
    mut key_selector: KF,
    mut value_selector: VF,
    registry: SharedRegistry<K, V>,
    outer: HandoffSender<RawGroup<K, V>>,
    cancel: coflux_core::CancellationToken,
) where
    S: Stream<Item = StreamItem<T>> + Send,
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Send + 'static,
    KF: FnMut(&T) -> Result<K>,
    VF: FnMut(T) -> Result<V>,
{
    coflux_core::debug!("group_by routing started");
    let mut source = Box::pin(source);
    let mut main_stopped = false;

    loop {
        let Some(item) = until_cancelled(&cancel, source.next()).await else {
            coflux_core::debug!("group_by routing cancelled");
            return;
        };

        let value = match item {
            Some(StreamItem::Value(value)) => value,
            Some(StreamItem::Error(err)) => {
                for (_, sender) in drain(&registry) {
                    sender.fail_now(err.clone());
                }
                outer.finish_now();
                return;
            }
            None => {
                for (_, sender) in drain(&registry) {
                    sender.finish_now();
                }
                outer.finish_now();
                coflux_core::debug!("group_by upstream completed");
                return;
            }
        };

        let selected = key_selector(&value).and_then(|key| Ok((key, value_selector(value)?)));
        let (key, mapped) = match selected {
            Ok(selected) => selected,
            Err(err) => {
                coflux_core::warn!("group_by selector failed: {}", err);
                for (_, sender) in drain(&registry) {
                    sender.fail_now(err.clone());
                }
                outer.fail_now(err);
                return;
            }
        };

        let existing = registry
            .lock()
            .partitions
            .get(&key)
            .map(|(id, sender)| (*id, sender.clone()));

        let (id, sender) = match existing {
            Some(entry) => entry,
            None => {
                main_stopped |= outer.is_closed();
                if main_stopped {
                    // No one can receive a new group any more.
                    match stop_if_idle(&registry) {
                        Flow::Continue => continue,
                        Flow::Stop => return,
                    }
                }

                let (sender, receiver) = SlotHandoff::channel();
                let id = {
                    let mut reg = registry.lock();
                    let id = reg.next_id;
                    reg.next_id += 1;
                    reg.partitions.insert(key.clone(), (id, sender.clone()));
                    id
                };
                let group = RawGroup {
                    key: key.clone(),
                    id,
                    receiver,
                    registry: Arc::clone(&registry),
                };

                match until_cancelled(&cancel, outer.publish(group)).await {
                    None => return,
                    Some(Ok(())) => {}
                    Some(Err(_)) => {
                        main_stopped = true;
                        registry.lock().remove_if(&key, id);
                        match stop_if_idle(&registry) {
                            Flow::Continue => continue,
                            Flow::Stop => return,
                        }
                    }
                }
                (id, sender)
            }
        };

        match until_cancelled(&cancel, sender.publish(mapped)).await {
            None => return,
            Some(Ok(())) => {}
            Some(Err(_)) => {
                coflux_core::trace!("group_by partition {} dropped", id);
                registry.lock().remove_if(&key, id);
                if main_stopped || outer.is_closed() {
                    main_stopped = true;
                    if let Flow::Stop = stop_if_idle(&registry) {
                        return;
                    }
                }
            }
        }
    }
}

fn drain<K, V>(registry: &SharedRegistry<K, V>) -> Vec<(K, HandoffSender<V>)> {
    registry
        .lock()
        .partitions
        .drain()
        .map(|(key, (_, sender))| (key, sender))
        .collect()
}

fn stop_if_idle<K, V>(registry: &SharedRegistry<K, V>) -> Flow {
    if registry.lock().partitions.is_empty() {
        coflux_core::debug!("group_by: outer and every partition gone, stopping upstream");
        Flow::Stop
    } else {
        Flow::Continue
    }
}

type GroupRecipe<K, V> =
    Box<dyn FnOnce() -> (HandoffReceiver<RawGroup<K, V>>, Arc<CofluxTask>) + Send + 'static>;

enum GroupState<K, V> {
    Idle(GroupRecipe<K, V>),
    Running {
        groups: HandoffReceiver<RawGroup<K, V>>,
        guard: Arc<CofluxTask>,
    },
    Done,
}

/// Outer stream of [`GroupByExt::group_by`], yielding one [`GroupedStream`]
/// per distinct key.
pub struct GroupByStream<K, V> {
    state: GroupState<K, V>,
}

impl<K, V> Debug for GroupByStream<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            GroupState::Idle(_) => "idle",
            GroupState::Running { .. } => "running",
            GroupState::Done => "done",
        };
        f.debug_struct("GroupByStream")
            .field("state", &state)
            .finish()
    }
}

impl<K, V> Stream for GroupByStream<K, V>
where
    K: Eq + Hash,
{
    type Item = StreamItem<GroupedStream<K, V>>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        if let GroupState::Idle(_) = this.state {
            if let GroupState::Idle(recipe) = core::mem::replace(&mut this.state, GroupState::Done)
            {
                let (groups, guard) = recipe();
                this.state = GroupState::Running { groups, guard };
            }
        }

        let GroupState::Running { groups, guard } = &mut this.state else {
            return Poll::Ready(None);
        };

        match Pin::new(groups).poll_next(cx) {
            Poll::Ready(Some(StreamItem::Value(raw))) => Poll::Ready(Some(StreamItem::Value(
                GroupedStream::new(raw, Arc::clone(guard)),
            ))),
            Poll::Ready(Some(StreamItem::Error(err))) => {
                this.state = GroupState::Done;
                Poll::Ready(Some(StreamItem::Error(err)))
            }
            Poll::Ready(None) => {
                this.state = GroupState::Done;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<K, V> GroupByStream<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Send + 'static,
{
    /// Collects every partition concurrently into a map of key to values.
    ///
    /// # Errors
    ///
    /// The first error observed on the outer stream or on any partition.
    pub async fn into_group_map(self) -> Result<HashMap<K, Vec<V>>> {
        let collected: Arc<Mutex<(HashMap<K, Vec<V>>, Option<CofluxError>)>> =
            Arc::new(Mutex::new((HashMap::new(), None)));

        self.for_each_concurrent(None, |item| {
            let collected = Arc::clone(&collected);
            async move {
                let group = match item {
                    StreamItem::Value(group) => group,
                    StreamItem::Error(err) => {
                        collected.lock().1.get_or_insert(err);
                        return;
                    }
                };
                let key = group.key().clone();
                let mut values = group.into_values();
                let mut out = Vec::new();
                while let Some(item) = values.next().await {
                    match item {
                        StreamItem::Value(value) => out.push(value),
                        StreamItem::Error(err) => {
                            collected.lock().1.get_or_insert(err);
                            break;
                        }
                    }
                }
                collected.lock().0.insert(key, out);
            }
        })
        .await;

        let mut guard = collected.lock();
        match guard.1.take() {
            Some(err) => Err(err),
            None => Ok(core::mem::take(&mut guard.0)),
        }
    }
}

struct GroupInner<K, V>
where
    K: Eq + Hash,
{
    key: K,
    id: u64,
    subscribed: AtomicBool,
    receiver: Mutex<Option<HandoffReceiver<V>>>,
    registry: SharedRegistry<K, V>,
    guard: Arc<CofluxTask>,
}

impl<K: Eq + Hash, V> Drop for GroupInner<K, V> {
    fn drop(&mut self) {
        // A group dropped without being subscribed releases its key.
        if self.receiver.get_mut().is_some() {
            self.registry.lock().remove_if(&self.key, self.id);
        }
    }
}

/// One partition of a [`GroupByStream`].
///
/// Cloning shares the same partition; only one clone may subscribe.
pub struct GroupedStream<K, V>
where
    K: Eq + Hash,
{
    inner: Arc<GroupInner<K, V>>,
}

impl<K: Eq + Hash, V> Clone for GroupedStream<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K: Eq + Hash + Debug, V> Debug for GroupedStream<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupedStream")
            .field("key", &self.inner.key)
            .field("subscribed", &self.inner.subscribed.load(Ordering::Acquire))
            .finish()
    }
}

impl<K, V> GroupedStream<K, V>
where
    K: Eq + Hash,
{
    fn new(raw: RawGroup<K, V>, guard: Arc<CofluxTask>) -> Self {
        Self {
            inner: Arc::new(GroupInner {
                key: raw.key,
                id: raw.id,
                subscribed: AtomicBool::new(false),
                receiver: Mutex::new(Some(raw.receiver)),
                registry: raw.registry,
                guard,
            }),
        }
    }

    pub fn key(&self) -> &K {
        &self.inner.key
    }

    /// Takes the single subscription of this partition.
    ///
    /// # Errors
    ///
    /// [`CofluxError::ProtocolViolation`] if the partition was already
    /// subscribed.
    pub fn subscribe(&self) -> Result<PartitionStream<K, V>>
    where
        K: Clone,
    {
        if self
            .inner
            .subscribed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(CofluxError::protocol_violation(
                "A grouped stream can only be subscribed once",
            ));
        }
        let receiver = self.inner.receiver.lock().take().ok_or_else(|| {
            CofluxError::protocol_violation("A grouped stream can only be subscribed once")
        })?;

        Ok(PartitionStream {
            receiver,
            key: self.inner.key.clone(),
            id: self.inner.id,
            registry: Arc::clone(&self.inner.registry),
            _guard: Arc::clone(&self.inner.guard),
        })
    }

    /// Values of this partition; a second subscription yields the
    /// protocol violation as its only item.
    pub fn into_values(self) -> impl Stream<Item = StreamItem<V>> + Send + 'static
    where
        K: Clone + Send + Sync + 'static,
        V: Send + 'static,
    {
        match self.subscribe() {
            Ok(partition) => Either::Left(partition),
            Err(err) => Either::Right(stream::iter([StreamItem::Error(err)])),
        }
    }
}

/// The subscribed side of a [`GroupedStream`].
pub struct PartitionStream<K, V>
where
    K: Eq + Hash,
{
    receiver: HandoffReceiver<V>,
    key: K,
    id: u64,
    registry: SharedRegistry<K, V>,
    _guard: Arc<CofluxTask>,
}

impl<K, V> PartitionStream<K, V>
where
    K: Eq + Hash,
{
    pub fn key(&self) -> &K {
        &self.key
    }
}

impl<K: Eq + Hash, V> Unpin for PartitionStream<K, V> {}

impl<K: Eq + Hash, V> Stream for PartitionStream<K, V> {
    type Item = StreamItem<V>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.receiver).poll_next(cx)
    }
}

impl<K: Eq + Hash, V> Drop for PartitionStream<K, V> {
    fn drop(&mut self) {
        self.registry.lock().remove_if(&self.key, self.id);
    }
}
