// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Leading / trailing throttling driven by a per-item window duration.
//!
//! The gate alternates between *idle* and *window open*. An item arriving
//! while idle opens a window whose length comes from the duration selector;
//! items arriving while the window is open only replace the pending value.
//!
//! | behavior   | window opens              | window closes                 |
//! |------------|---------------------------|-------------------------------|
//! | `Leading`  | emit the item             | nothing                       |
//! | `Trailing` | hold the item             | emit the latest held item     |
//! | `Both`     | emit the item             | emit a newer item, if any     |
//!
//! When the upstream completes with a trailing value pending, the gate waits
//! for the open window to close, emits that value, then completes. A
//! zero-length window closes on the spot. Errors (from the upstream or the
//! selector) are delivered right away and end the stream.
//!
//! # Example
//!
//! ```
//! use coflux_core::StreamItem;
//! use coflux_stream_time::ThrottleExt;
//! use futures::{stream, StreamExt};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let burst = stream::iter([1, 2, 3]).map(StreamItem::Value);
//! let values: Vec<_> = burst
//!     .throttle_leading(Duration::from_secs(1))
//!     .filter_map(|item| async move { item.ok() })
//!     .collect()
//!     .await;
//!
//! assert_eq!(values, vec![1]);
//! # }
//! ```

use core::pin::Pin;
use core::task::{Context, Poll};
use core::time::Duration;

use coflux_core::{debug, CofluxError, Result, StreamItem};
use coflux_runtime::timer::Timer;
use futures::Stream;
use pin_project::pin_project;

use crate::pending_timer::PendingTimer;
#[cfg(feature = "runtime-tokio")]
use crate::DefaultTimer;

/// Which end of each window reaches the downstream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ThrottleBehavior {
    /// First item of each window.
    #[default]
    Leading,
    /// Last item of each window, once it closes.
    Trailing,
    /// First item immediately and the last one when the window closes.
    Both,
}

impl ThrottleBehavior {
    pub fn is_leading(self) -> bool {
        matches!(self, Self::Leading | Self::Both)
    }

    pub fn is_trailing(self) -> bool {
        matches!(self, Self::Trailing | Self::Both)
    }
}

/// Computes the length of the window opened by an item.
///
/// Implemented for closures `FnMut(&T) -> Result<Duration>` and for a plain
/// [`Duration`] (constant window).
pub trait WindowSelector<T> {
    fn window_for(&mut self, value: &T) -> Result<Duration>;
}

impl<T, F> WindowSelector<T> for F
where
    F: FnMut(&T) -> Result<Duration>,
{
    fn window_for(&mut self, value: &T) -> Result<Duration> {
        self(value)
    }
}

impl<T> WindowSelector<T> for Duration {
    fn window_for(&mut self, _value: &T) -> Result<Duration> {
        Ok(*self)
    }
}

/// Extension trait providing the throttle family of operators.
pub trait ThrottleExt<T>: Stream<Item = StreamItem<T>> + Sized {
    /// Throttles with windows chosen by `selector`, on an explicit timer.
    fn throttle_with_timer<W, TM>(
        self,
        behavior: ThrottleBehavior,
        selector: W,
        timer: TM,
    ) -> Throttle<Self, T, W, TM>
    where
        W: WindowSelector<T>,
        TM: Timer,
    {
        Throttle {
            stream: self,
            behavior,
            selector,
            timer,
            window: PendingTimer::new(),
            latest: None,
            deferred_error: None,
            upstream_done: false,
            terminated: false,
        }
    }

    /// Throttles with windows chosen by `selector`.
    #[cfg(feature = "runtime-tokio")]
    fn throttle_with<W>(self, behavior: ThrottleBehavior, selector: W) -> Throttle<Self, T, W, DefaultTimer>
    where
        W: WindowSelector<T>,
    {
        self.throttle_with_timer(behavior, selector, DefaultTimer::default())
    }

    /// Throttles with a fixed window.
    #[cfg(feature = "runtime-tokio")]
    fn throttle(self, duration: Duration, behavior: ThrottleBehavior) -> Throttle<Self, T, Duration, DefaultTimer> {
        self.throttle_with(behavior, duration)
    }

    #[cfg(feature = "runtime-tokio")]
    fn throttle_leading(self, duration: Duration) -> Throttle<Self, T, Duration, DefaultTimer> {
        self.throttle(duration, ThrottleBehavior::Leading)
    }

    #[cfg(feature = "runtime-tokio")]
    fn throttle_trailing(self, duration: Duration) -> Throttle<Self, T, Duration, DefaultTimer> {
        self.throttle(duration, ThrottleBehavior::Trailing)
    }

    #[cfg(feature = "runtime-tokio")]
    fn throttle_both(self, duration: Duration) -> Throttle<Self, T, Duration, DefaultTimer> {
        self.throttle(duration, ThrottleBehavior::Both)
    }
}

impl<S, T> ThrottleExt<T> for S where S: Stream<Item = StreamItem<T>> {}

/// Output of the [`ThrottleExt`] operators.
#[pin_project]
#[must_use = "streams do nothing unless polled"]
pub struct Throttle<S, T, W, TM>
where
    TM: Timer,
{
    #[pin]
    stream: S,
    behavior: ThrottleBehavior,
    selector: W,
    timer: TM,
    #[pin]
    window: PendingTimer<TM::Sleep>,
    latest: Option<T>,
    // A selector failure on a leading item surfaces right after that item.
    deferred_error: Option<CofluxError>,
    upstream_done: bool,
    terminated: bool,
}

impl<S, T, W, TM> Stream for Throttle<S, T, W, TM>
where
    S: Stream<Item = StreamItem<T>>,
    W: WindowSelector<T>,
    TM: Timer,
{
    type Item = StreamItem<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        let leading = this.behavior.is_leading();
        let trailing = this.behavior.is_trailing();

        loop {
            if *this.terminated {
                return Poll::Ready(None);
            }
            if let Some(err) = this.deferred_error.take() {
                *this.terminated = true;
                return Poll::Ready(Some(StreamItem::Error(err)));
            }

            if this.window.is_armed() && this.window.as_mut().poll_elapsed(cx).is_ready() {
                if let Some(value) = this.latest.take() {
                    return Poll::Ready(Some(StreamItem::Value(value)));
                }
                continue;
            }

            if *this.upstream_done {
                if this.window.is_armed() && this.latest.is_some() {
                    // The trailing value waits for its window; the timer holds our waker.
                    return Poll::Pending;
                }
                *this.terminated = true;
                return Poll::Ready(this.latest.take().map(StreamItem::Value));
            }

            let value = match this.stream.as_mut().poll_next(cx) {
                Poll::Ready(Some(StreamItem::Value(value))) => value,
                Poll::Ready(Some(StreamItem::Error(err))) => {
                    this.window.as_mut().cancel();
                    *this.latest = None;
                    *this.terminated = true;
                    return Poll::Ready(Some(StreamItem::Error(err)));
                }
                Poll::Ready(None) => {
                    *this.upstream_done = true;
                    continue;
                }
                Poll::Pending => return Poll::Pending,
            };

            if this.window.is_armed() {
                if trailing {
                    *this.latest = Some(value);
                }
                continue;
            }

            let window = match this.selector.window_for(&value) {
                Ok(window) => window,
                Err(err) => {
                    debug!("throttle: window selector failed: {}", err);
                    *this.latest = None;
                    if leading {
                        *this.deferred_error = Some(err);
                        return Poll::Ready(Some(StreamItem::Value(value)));
                    }
                    *this.terminated = true;
                    return Poll::Ready(Some(StreamItem::Error(err)));
                }
            };

            let emit_now = if leading {
                Some(value)
            } else {
                *this.latest = Some(value);
                None
            };

            if window.is_zero() {
                // The window closes before the next item can arrive.
                if let Some(value) = emit_now.or_else(|| this.latest.take()) {
                    return Poll::Ready(Some(StreamItem::Value(value)));
                }
                continue;
            }

            this.window.as_mut().start(&*this.timer, window);
            if let Some(value) = emit_now {
                return Poll::Ready(Some(StreamItem::Value(value)));
            }
        }
    }
}
