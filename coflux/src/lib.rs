// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! # Coflux
//!
//! Concurrent stream operators with consumer-driven backpressure.
//!
//! Every operator is an extension method on
//! `Stream<Item = StreamItem<T>>` returning a new lazy stream: nothing is
//! subscribed or spawned until the result is first polled, and dropping it
//! cancels every task it started.
//!
//! ## Crates
//!
//! - `coflux-core`: [`StreamItem`], [`CofluxError`], the [`Signal`] and
//!   [`SlotHandoff`] rendezvous primitives and [`CofluxTask`].
//! - `coflux-runtime`: timer and [`TimeSource`] abstractions.
//! - `coflux-stream`: subjects, multicast, `group_by`, `amb`, backpressure
//!   dropping, windowing and a few error-handling helpers.
//! - `coflux-stream-time`: throttle and debounce.
//!
//! ## Quick Start
//!
//! ```
//! use coflux::prelude::*;
//! use futures::{stream, StreamExt};
//!
//! # #[tokio::main]
//! # async fn main() -> coflux::Result<()> {
//! let numbers = stream::iter(1..=6).map(StreamItem::Value);
//!
//! let groups = numbers.group_by(|n: &i32| Ok(n % 2)).into_group_map().await?;
//!
//! assert_eq!(groups[&0], vec![2, 4, 6]);
//! assert_eq!(groups[&1], vec![1, 3, 5]);
//! # Ok(())
//! # }
//! ```

pub use coflux_core::{
    CancellationToken, CofluxError, CofluxTask, Event, HandoffReceiver, HandoffSender,
    IntoCofluxError, Result, ResultExt, Signal, SlotHandoff, StreamItem, Wait,
};
pub use coflux_runtime::time_source::{MonotonicClock, SharedTimeSource, TimeSource};
pub use coflux_runtime::timer::Timer;

pub use coflux_stream::{
    amb, concat_eager, merge_all, AmbExt, BehaviorSubject, CatchAndReturnExt, ConcatEagerExt,
    ConcatMapEagerExt, DematerializeExt, FlatMapDropExt, LogEvent, LogExt, MaterializeExt,
    MergeAllExt, MulticastSubject, PublishSubject, ReplayBounds, ReplaySubject, SelectStateExt,
    Subject, SubjectStream, TakeUntilExt, WindowedExt,
};
#[cfg(feature = "runtime-tokio")]
pub use coflux_stream::{
    BackpressureExt, GroupByExt, GroupedStream, Hub, MulticastExt, PartitionStream,
};
pub use coflux_stream_time::{DebounceExt, PendingTimer, ThrottleBehavior, ThrottleExt};

#[cfg(feature = "runtime-tokio")]
pub use coflux_runtime::impls::tokio::{TokioClock, TokioTimer};

/// Everything needed to compose operators.
pub mod prelude {
    pub use coflux_core::{CofluxError, Event, StreamItem};
    pub use coflux_stream::prelude::*;
    pub use coflux_stream_time::prelude::*;
}
