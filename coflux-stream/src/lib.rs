// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Concurrent stream operators.
//!
//! Every operator is an extension trait over
//! `Stream<Item = StreamItem<T>>` and returns a new lazy stream: no state is
//! allocated and no task is spawned until the result is first polled, so two
//! subscriptions to the same composed stream never share anything.
//!
//! ## Operator Categories
//!
//! ### Sharing
//!
//! - **[`subject`]**: publish, bounded-wait, replay and behavior hubs
//! - **[`multicast`](MulticastExt::multicast)**: share one upstream between
//!   consumers built in a selector closure
//!
//! ### Routing
//!
//! - **[`group_by`](GroupByExt::group_by)**: one sub-stream per key, each
//!   independently backpressured
//! - **[`amb`]**: the first input to signal wins, the rest are cancelled
//! - **[`take_until_signal`](TakeUntilExt::take_until_signal)**: relay until another stream fires
//! - **[`flat_map_drop`](FlatMapDropExt::flat_map_drop)**: one inner stream at
//!   a time, dropping upstream items meanwhile
//!
//! ### Combining
//!
//! - **[`merge_all`]**: interleave several streams in arrival order
//! - **[`concat_eager`]** / **[`concat_map_eager`](ConcatMapEagerExt::concat_map_eager)**:
//!   run every source at once, relay them one after the other
//! - **[`select_state`](SelectStateExt::select_state)** /
//!   **[`select_projected`](SelectStateExt::select_projected)**: memoized
//!   sub-state selection
//!
//! ### Flow control
//!
//! - **[`on_backpressure_drop`](BackpressureExt::on_backpressure_drop)**: never
//!   block the producer, drop what arrives while the consumer is busy
//!
//! ### Windowing
//!
//! - **[`chunked`](WindowedExt::chunked)**, **[`sliding`](WindowedExt::sliding)**,
//!   **[`windowed`](WindowedExt::windowed)**, **[`buffered_sliding`](WindowedExt::buffered_sliding)**,
//!   **[`pairwise`](WindowedExt::pairwise)**,
//!   **[`buffer_until_changed`](WindowedExt::buffer_until_changed)**
//!
//! ### Errors and diagnostics
//!
//! - **[`catch_and_return`](CatchAndReturnExt::catch_and_return)**: turn a
//!   terminal error into a last value
//! - **[`materialize`](MaterializeExt::materialize)** /
//!   **[`dematerialize`](DematerializeExt::dematerialize)**
//! - **[`log`](LogExt::log)**: lifecycle records under a tag
//!
//! # Runtime Requirements
//!
//! `multicast`, `group_by` and `on_backpressure_drop` run a background task
//! and need the `runtime-tokio` feature (enabled by default).

#![allow(clippy::multiple_crate_versions, clippy::doc_markdown)]

pub mod amb;
pub mod catch_and_return;
pub mod concat_eager;
pub mod flat_map_drop;
#[cfg(feature = "runtime-tokio")]
pub mod group_by;
pub mod log;
pub mod materialize;
pub mod merge;
#[cfg(feature = "runtime-tokio")]
pub mod multicast;
#[cfg(feature = "runtime-tokio")]
pub mod on_backpressure_drop;
pub mod prelude;
pub mod select_state;
pub mod subject;
pub mod take_until;
#[cfg(feature = "runtime-tokio")]
pub(crate) mod util;
pub mod window;

pub use self::amb::{amb, AmbExt, AmbStream};
pub use self::catch_and_return::{CatchAndReturn, CatchAndReturnExt};
pub use self::concat_eager::{
    concat_eager, ConcatEager, ConcatEagerExt, ConcatMapEager, ConcatMapEagerExt,
};
pub use self::flat_map_drop::{FlatMapDrop, FlatMapDropExt};
#[cfg(feature = "runtime-tokio")]
pub use self::group_by::{GroupByExt, GroupByStream, GroupedStream, PartitionStream};
pub use self::log::{Log, LogEvent, LogExt};
pub use self::materialize::{Dematerialize, DematerializeExt, Materialize, MaterializeExt};
pub use self::merge::{merge_all, MergeAll, MergeAllExt};
#[cfg(feature = "runtime-tokio")]
pub use self::multicast::{Hub, MulticastExt, MulticastStream};
#[cfg(feature = "runtime-tokio")]
pub use self::on_backpressure_drop::{BackpressureExt, OnBackpressureDrop};
pub use self::select_state::{SelectProjected, SelectState, SelectStateExt};
pub use self::subject::{
    BehaviorSubject, MulticastSubject, PublishSubject, ReplayBounds, ReplaySubject, Subject,
    SubjectStream,
};
pub use self::take_until::{TakeUntil, TakeUntilExt};
pub use self::window::{BufferUntilChanged, Pairwise, WindowedExt, WindowedStream};
