// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use core::pin::Pin;
use core::task::{Context, Poll};
use core::time::Duration;

use coflux_core::StreamItem;
use coflux_runtime::timer::Timer;
use futures::Stream;
use pin_project::pin_project;

use crate::pending_timer::PendingTimer;
#[cfg(feature = "runtime-tokio")]
use crate::DefaultTimer;

/// Extension trait providing the `debounce` operator.
pub trait DebounceExt<T>: Stream<Item = StreamItem<T>> + Sized {
    /// Emits an item only after `duration` passes without a newer one.
    ///
    /// Every new value restarts the quiet period and replaces the pending
    /// one. On completion the pending value is flushed immediately. An error
    /// is forwarded right away, discards the pending value and ends the
    /// stream.
    fn debounce_with_timer<TM>(self, duration: Duration, timer: TM) -> Debounce<Self, T, TM>
    where
        TM: Timer,
    {
        Debounce {
            stream: self,
            duration,
            timer,
            quiet: PendingTimer::new(),
            pending: None,
            upstream_done: false,
            terminated: false,
        }
    }

    /// [`debounce_with_timer`](DebounceExt::debounce_with_timer) on the default runtime's timer.
    #[cfg(feature = "runtime-tokio")]
    fn debounce(self, duration: Duration) -> Debounce<Self, T, DefaultTimer> {
        self.debounce_with_timer(duration, DefaultTimer::default())
    }
}

impl<S, T> DebounceExt<T> for S where S: Stream<Item = StreamItem<T>> {}

#[pin_project]
#[must_use = "streams do nothing unless polled"]
pub struct Debounce<S, T, TM>
where
    TM: Timer,
{
    #[pin]
    stream: S,
    duration: Duration,
    timer: TM,
    #[pin]
    quiet: PendingTimer<TM::Sleep>,
    pending: Option<T>,
    upstream_done: bool,
    terminated: bool,
}

impl<S, T, TM> Stream for Debounce<S, T, TM>
where
    S: Stream<Item = StreamItem<T>>,
    TM: Timer,
{
    type Item = StreamItem<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        if *this.terminated {
            return Poll::Ready(None);
        }

        loop {
            if *this.upstream_done {
                return Poll::Ready(this.pending.take().map(StreamItem::Value));
            }

            if this.quiet.is_armed() && this.quiet.as_mut().poll_elapsed(cx).is_ready() {
                if let Some(value) = this.pending.take() {
                    return Poll::Ready(Some(StreamItem::Value(value)));
                }
            }

            match this.stream.as_mut().poll_next(cx) {
                Poll::Ready(Some(StreamItem::Value(value))) => {
                    *this.pending = Some(value);
                    this.quiet.as_mut().start(&*this.timer, *this.duration);
                }
                Poll::Ready(Some(StreamItem::Error(err))) => {
                    *this.pending = None;
                    *this.terminated = true;
                    this.quiet.as_mut().cancel();
                    return Poll::Ready(Some(StreamItem::Error(err)));
                }
                Poll::Ready(None) => {
                    *this.upstream_done = true;
                    this.quiet.as_mut().cancel();
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
