// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Lossy decoupling of a fast producer from a slow consumer.
//!
//! [`on_backpressure_drop`](BackpressureExt::on_backpressure_drop) pulls the
//! upstream on its own task and never waits for the consumer. The consumer
//! declares readiness once per item; the next upstream value claims that
//! readiness and is parked in the slot until the consumer takes it. Values
//! arriving while no readiness is declared are discarded, so a value already
//! handed off is never replaced and the output is an ordered, duplicate-free
//! subsequence of the upstream.
//!
//! Terminal signals are never dropped: a handed-off value is delivered before
//! the completion or error that follows it.

use crate::util::until_cancelled;
use coflux_core::{CofluxError, CofluxTask, Signal, StreamItem, Wait};
use core::future::Future;
use core::pin::Pin;
use core::sync::atomic::{AtomicBool, Ordering};
use core::task::{Context, Poll};
use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use std::sync::Arc;

/// Extension trait providing [`on_backpressure_drop`](BackpressureExt::on_backpressure_drop).
pub trait BackpressureExt<T>: Stream<Item = StreamItem<T>> + Sized
where
    T: Send + 'static,
{
    /// Drops upstream values the consumer is not ready for.
    ///
    /// The upstream is pulled on a background task started on the first
    /// poll and cancelled when the returned stream is dropped.
    fn on_backpressure_drop(self) -> OnBackpressureDrop<Self, T>
    where
        Self: Send + 'static,
    {
        OnBackpressureDrop {
            source: Some(self),
            shared: Arc::new(Shared {
                slot: Mutex::new(DropSlot {
                    value: None,
                    terminal: None,
                }),
                consumer_ready: AtomicBool::new(false),
                value_ready: Signal::new(),
            }),
            task: None,
            wait: None,
            requested: false,
            done: false,
        }
    }
}

impl<S, T> BackpressureExt<T> for S
where
    S: Stream<Item = StreamItem<T>>,
    T: Send + 'static,
{
}

struct DropSlot<T> {
    value: Option<T>,
    // `Some(None)` is completion, `Some(Some(e))` an error.
    terminal: Option<Option<CofluxError>>,
}

struct Shared<T> {
    slot: Mutex<DropSlot<T>>,
    consumer_ready: AtomicBool,
    value_ready: Signal,
}

/// Output of [`BackpressureExt::on_backpressure_drop`].
#[must_use = "streams do nothing unless polled"]
pub struct OnBackpressureDrop<S, T> {
    source: Option<S>,
    shared: Arc<Shared<T>>,
    task: Option<CofluxTask>,
    wait: Option<Wait>,
    requested: bool,
    done: bool,
}

// The source is moved onto the producer task before it is ever polled.
impl<S, T> Unpin for OnBackpressureDrop<S, T> {}

async fn produce<S, T>(source: S, shared: Arc<Shared<T>>, cancel: coflux_core::CancellationToken)
where
    S: Stream<Item = StreamItem<T>>,
{
    let mut source = Box::pin(source);
    loop {
        let Some(item) = until_cancelled(&cancel, source.next()).await else {
            return;
        };
        match item {
            Some(StreamItem::Value(value)) => {
                if shared
                    .consumer_ready
                    .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
                {
                    shared.slot.lock().value = Some(value);
                    shared.value_ready.signal();
                } else {
                    coflux_core::trace!("on_backpressure_drop: value dropped");
                }
            }
            terminal => {
                shared.slot.lock().terminal = Some(terminal.and_then(StreamItem::err));
                shared.value_ready.signal();
                return;
            }
        }
    }
}

impl<S, T> Stream for OnBackpressureDrop<S, T>
where
    S: Stream<Item = StreamItem<T>> + Send + 'static,
    T: Send + 'static,
{
    type Item = StreamItem<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        if this.done {
            return Poll::Ready(None);
        }

        if let Some(source) = this.source.take() {
            let shared = Arc::clone(&this.shared);
            this.task = Some(CofluxTask::spawn(move |cancel| {
                produce(source, shared, cancel)
            }));
        }

        loop {
            {
                let mut slot = this.shared.slot.lock();
                if let Some(value) = slot.value.take() {
                    this.requested = false;
                    return Poll::Ready(Some(StreamItem::Value(value)));
                }
                if let Some(terminal) = slot.terminal.take() {
                    drop(slot);
                    this.done = true;
                    this.wait = None;
                    this.task = None;
                    return Poll::Ready(terminal.map(StreamItem::Error));
                }
            }

            // One declaration per item; the producer clears it when it hands off.
            if !this.requested {
                this.requested = true;
                this.shared.consumer_ready.store(true, Ordering::Release);
            }

            let wait = this
                .wait
                .get_or_insert_with(|| this.shared.value_ready.wait());
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
