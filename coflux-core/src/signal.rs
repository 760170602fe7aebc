// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Single-waiter wake-up primitive.
//!
//! A [`Signal`] remembers a wake-up delivered while nobody waits, so the next
//! [`Signal::wait`] completes without suspending. Only one task may wait at a
//! time; a concurrent second wait resolves to
//! [`CofluxError::ProtocolViolation`] instead of queueing silently.
//!
//! ```
//! use coflux_core::Signal;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let signal = Signal::new();
//! signal.signal();
//! signal.wait().await.unwrap(); // remembered, returns at once
//! assert!(!signal.is_ready());
//! # }
//! ```

use crate::CofluxError;
use core::future::Future;
use core::pin::Pin;
use core::sync::atomic::{AtomicBool, Ordering};
use core::task::{Context, Poll};
use futures::task::AtomicWaker;
use std::sync::Arc;

/// Binary wake-up flag shared between a signalling side and one waiter.
#[derive(Clone, Debug, Default)]
pub struct Signal {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    ready: AtomicBool,
    waiting: AtomicBool,
    waker: AtomicWaker,
}

impl Signal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wakes the current waiter, or records the wake-up for the next one.
    ///
    /// Repeated calls while already ready collapse into a single wake-up.
    pub fn signal(&self) {
        self.inner.ready.store(true, Ordering::Release);
        self.inner.waker.wake();
    }

    /// Returns `true` if a wake-up is recorded and not yet consumed.
    pub fn is_ready(&self) -> bool {
        self.inner.ready.load(Ordering::Acquire)
    }

    /// Waits for the next wake-up, consuming it.
    ///
    /// The returned future owns a handle on the signal and can be stored in
    /// a poll-based state machine.
    pub fn wait(&self) -> Wait {
        Wait {
            inner: Arc::clone(&self.inner),
            state: WaitState::Idle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaitState {
    Idle,
    Waiting,
    Done,
}

/// Future returned by [`Signal::wait`].
#[derive(Debug)]
#[must_use = "futures do nothing unless polled"]
pub struct Wait {
    inner: Arc<Inner>,
    state: WaitState,
}

impl Wait {
    fn finish(&mut self) -> Poll<Result<(), CofluxError>> {
        self.inner.waiting.store(false, Ordering::Release);
        self.state = WaitState::Done;
        Poll::Ready(Ok(()))
    }
}

impl Future for Wait {
    type Output = Result<(), CofluxError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.state {
            WaitState::Done => return Poll::Ready(Ok(())),
            WaitState::Idle => {
                if self
                    .inner
                    .waiting
                    .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                    .is_err()
                {
                    self.state = WaitState::Done;
                    return Poll::Ready(Err(CofluxError::protocol_violation(
                        "Signal is already awaited by another task",
                    )));
                }
                self.state = WaitState::Waiting;
            }
            WaitState::Waiting => {}
        }

        // Fast path: signal already delivered
        if self.inner.ready.swap(false, Ordering::AcqRel) {
            return self.finish();
        }

        self.inner.waker.register(cx.waker());

        // Re-check after registering, a signal may have raced the registration
        if self.inner.ready.swap(false, Ordering::AcqRel) {
            return self.finish();
        }

        Poll::Pending
    }
}

impl Drop for Wait {
    fn drop(&mut self) {
        if self.state == WaitState::Waiting {
            self.inner.waiting.store(false, Ordering::Release);
        }
    }
}
