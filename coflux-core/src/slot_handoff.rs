// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! One-item, consumer-driven mailbox between a producer task and a consumer.
//!
//! The consumer declares readiness before the producer may deposit anything,
//! so at most one item is ever in flight. Two [`Signal`]s carry the
//! handshake: `consumer_ready` (consumer to producer) and `value_ready`
//! (producer to consumer).
//!
//! The receiving half is a regular [`Stream`] of [`StreamItem`]s. Dropping it
//! cancels the handoff and re-arms the producer once, so a producer suspended
//! in [`HandoffSender::publish`] wakes up and observes
//! [`CofluxError::Cancelled`].
//!
//! # Example
//!
//! ```
//! use coflux_core::{SlotHandoff, StreamItem};
//! use futures::StreamExt;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let (tx, mut rx) = SlotHandoff::channel();
//!
//! tokio::spawn(async move {
//!     for i in 1..=3 {
//!         tx.publish(i).await?;
//!     }
//!     tx.finish().await
//! });
//!
//! assert_eq!(rx.next().await, Some(StreamItem::Value(1)));
//! assert_eq!(rx.next().await, Some(StreamItem::Value(2)));
//! assert_eq!(rx.next().await, Some(StreamItem::Value(3)));
//! assert!(rx.next().await.is_none());
//! # }
//! ```

use crate::signal::{Signal, Wait};
use crate::{CofluxError, Result, StreamItem};
use core::future::Future;
use core::pin::Pin;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use core::task::{Context, Poll};
use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use std::sync::Arc;

/// Namespace for creating handoff pairs.
pub struct SlotHandoff;

impl SlotHandoff {
    /// Creates a connected sender / receiver pair.
    pub fn channel<T>() -> (HandoffSender<T>, HandoffReceiver<T>) {
        let shared = Arc::new(Shared {
            slot: Mutex::new(Slot {
                value: None,
                error: None,
                done: false,
            }),
            consumer_ready: Signal::new(),
            value_ready: Signal::new(),
            cancelled: AtomicBool::new(false),
            senders: AtomicUsize::new(1),
        });

        (
            HandoffSender {
                shared: Arc::clone(&shared),
            },
            HandoffReceiver {
                shared,
                wait: None,
                requested: false,
                terminated: false,
            },
        )
    }
}

struct Slot<T> {
    value: Option<T>,
    error: Option<CofluxError>,
    done: bool,
}

struct Shared<T> {
    // Written only after the consumer_ready handshake, read only after value_ready;
    // the lock is never held across a suspension point.
    slot: Mutex<Slot<T>>,
    consumer_ready: Signal,
    value_ready: Signal,
    cancelled: AtomicBool,
    senders: AtomicUsize,
}

/// Producing half of a [`SlotHandoff`].
///
/// Clones share the same slot; only one of them may be suspended in a
/// handshake at a time.
pub struct HandoffSender<T> {
    shared: Arc<Shared<T>>,
}

impl<T> HandoffSender<T> {
    /// Waits until the consumer is ready, then hands over `value`.
    ///
    /// # Errors
    ///
    /// [`CofluxError::Cancelled`] once the receiver has been dropped.
    pub async fn publish(&self, value: T) -> Result<()> {
        self.handshake().await?;
        self.shared.slot.lock().value = Some(value);
        self.shared.value_ready.signal();
        Ok(())
    }

    /// Waits until the consumer is ready, then terminates it with `error`.
    ///
    /// # Errors
    ///
    /// [`CofluxError::Cancelled`] once the receiver has been dropped.
    pub async fn fail(&self, error: CofluxError) -> Result<()> {
        self.handshake().await?;
        {
            let mut slot = self.shared.slot.lock();
            slot.error = Some(error);
            slot.done = true;
        }
        self.shared.value_ready.signal();
        Ok(())
    }

    /// Waits until the consumer is ready, then completes it.
    ///
    /// # Errors
    ///
    /// [`CofluxError::Cancelled`] once the receiver has been dropped.
    pub async fn finish(&self) -> Result<()> {
        self.handshake().await?;
        self.shared.slot.lock().done = true;
        self.shared.value_ready.signal();
        Ok(())
    }

    /// Completes the consumer without waiting for it to be ready.
    ///
    /// A value still sitting in the slot is delivered first. Used on terminal
    /// paths where the consumer may never poll again.
    pub fn finish_now(&self) {
        self.terminate_now(None);
    }

    /// Fails the consumer without waiting for it to be ready.
    pub fn fail_now(&self, error: CofluxError) {
        self.terminate_now(Some(error));
    }

    fn terminate_now(&self, error: Option<CofluxError>) {
        {
            let mut slot = self.shared.slot.lock();
            if slot.done {
                return;
            }
            slot.error = error;
            slot.done = true;
        }
        self.shared.value_ready.signal();
    }

    /// `true` once the receiver has been dropped.
    pub fn is_closed(&self) -> bool {
        self.shared.cancelled.load(Ordering::Acquire)
    }

    async fn handshake(&self) -> Result<()> {
        let terminated = self.shared.slot.lock().done;
        if terminated {
            return Err(CofluxError::protocol_violation(
                "SlotHandoff already terminated",
            ));
        }
        // The receiver re-arms only once, so later calls must not wait for it.
        if self.is_closed() {
            return Err(CofluxError::Cancelled);
        }
        self.shared.consumer_ready.wait().await?;
        if self.is_closed() {
            return Err(CofluxError::Cancelled);
        }
        Ok(())
    }
}

impl<T> Clone for HandoffSender<T> {
    fn clone(&self) -> Self {
        self.shared.senders.fetch_add(1, Ordering::AcqRel);
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Drop for HandoffSender<T> {
    fn drop(&mut self) {
        if self.shared.senders.fetch_sub(1, Ordering::AcqRel) != 1 {
            return;
        }
        // Last producer gone without a terminal signal: complete the consumer.
        let mut slot = self.shared.slot.lock();
        if !slot.done {
            slot.done = true;
            drop(slot);
            self.shared.value_ready.signal();
        }
    }
}

/// Consuming half of a [`SlotHandoff`].
pub struct HandoffReceiver<T> {
    shared: Arc<Shared<T>>,
    wait: Option<Wait>,
    requested: bool,
    terminated: bool,
}

impl<T> HandoffReceiver<T> {
    /// Pulls every item into `sink` until the producer terminates.
    ///
    /// A failing `sink` stops the loop; the handoff is dropped on the way
    /// out, which re-arms a producer blocked in `publish` so it can observe
    /// the cancellation.
    ///
    /// # Errors
    ///
    /// The producer's error, or the first error returned by `sink`.
    pub async fn drain<F>(mut self, mut sink: F) -> Result<()>
    where
        F: FnMut(T) -> Result<()>,
    {
        while let Some(item) = self.next().await {
            match item {
                StreamItem::Value(value) => sink(value)?,
                StreamItem::Error(err) => return Err(err),
            }
        }
        Ok(())
    }
}

impl<T> Stream for HandoffReceiver<T> {
    type Item = StreamItem<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        if this.terminated {
            return Poll::Ready(None);
        }

        loop {
            // Always look at the slot before suspending: value and done
            // wake-ups may have collapsed into one signal.
            {
                let mut slot = this.shared.slot.lock();
                if let Some(value) = slot.value.take() {
                    this.requested = false;
                    return Poll::Ready(Some(StreamItem::Value(value)));
                }
                if slot.done {
                    this.terminated = true;
                    this.wait = None;
                    return Poll::Ready(slot.error.take().map(StreamItem::Error));
                }
            }

            if !this.requested {
                this.requested = true;
                this.shared.consumer_ready.signal();
            }

            let wait = this
                .wait
                .get_or_insert_with(|| this.shared.value_ready.wait());
            match Pin::new(wait).poll(cx) {
                Poll::Ready(Ok(())) => {
                    this.wait = None;
                }
                Poll::Ready(Err(err)) => {
                    this.terminated = true;
                    this.wait = None;
                    return Poll::Ready(Some(StreamItem::Error(err)));
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl<T> Drop for HandoffReceiver<T> {
    fn drop(&mut self) {
        self.shared.cancelled.store(true, Ordering::Release);
        // Re-arm once so a producer suspended in `publish` can see the cancellation.
        self.shared.consumer_ready.signal();
    }
}
