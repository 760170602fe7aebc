// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Prelude re-exporting every operator trait.
//!
//! ```ignore
//! use coflux_stream::prelude::*;
//!
//! let windows = source.take_until_signal(stop).sliding(3).log("windows");
//! ```

pub use crate::amb::{amb, AmbExt};
pub use crate::catch_and_return::CatchAndReturnExt;
pub use crate::concat_eager::{concat_eager, ConcatEagerExt, ConcatMapEagerExt};
pub use crate::flat_map_drop::FlatMapDropExt;
#[cfg(feature = "runtime-tokio")]
pub use crate::group_by::{GroupByExt, GroupedStream};
pub use crate::log::{LogEvent, LogExt};
pub use crate::materialize::{DematerializeExt, MaterializeExt};
pub use crate::merge::{merge_all, MergeAllExt};
#[cfg(feature = "runtime-tokio")]
pub use crate::multicast::{Hub, MulticastExt};
#[cfg(feature = "runtime-tokio")]
pub use crate::on_backpressure_drop::BackpressureExt;
pub use crate::select_state::SelectStateExt;
pub use crate::subject::{
    BehaviorSubject, MulticastSubject, PublishSubject, ReplayBounds, ReplaySubject, Subject,
};
pub use crate::take_until::TakeUntilExt;
pub use crate::window::WindowedExt;
