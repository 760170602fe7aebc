// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Time-based gating operators for coflux streams.
//!
//! Operators in this crate own at most one pending sleep at a time
//! ([`PendingTimer`]) and are generic over the
//! [`Timer`](coflux_runtime::timer::Timer) that produces it. With the
//! default `runtime-tokio` feature the convenience methods use tokio's
//! clock, so `tokio::time::pause` drives them deterministically in tests.
//!
//! - [`ThrottleExt`]: leading, trailing or both-ends throttling with a fixed
//!   or per-item window.
//! - [`DebounceExt`]: emit the latest item after a quiet period.

mod debounce;
mod pending_timer;
mod throttle;

pub mod prelude;

pub use debounce::{Debounce, DebounceExt};
pub use pending_timer::PendingTimer;
pub use throttle::{Throttle, ThrottleBehavior, ThrottleExt, WindowSelector};

#[cfg(feature = "runtime-tokio")]
pub use coflux_runtime::impls::tokio::TokioTimer;

/// Runtime whose timer backs the convenience methods.
#[cfg(feature = "runtime-tokio")]
pub type DefaultRuntime = coflux_runtime::impls::tokio::TokioRuntime;

#[cfg(feature = "runtime-tokio")]
pub type DefaultTimer = <DefaultRuntime as coflux_runtime::runtime::Runtime>::Timer;
