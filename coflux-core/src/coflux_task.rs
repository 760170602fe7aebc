// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Background task owned by an operator subscription.
//!
//! Operators that need a producer running independently of their consumer
//! (multicast pumps, partition routing, the backpressure drop gate) spawn a
//! [`CofluxTask`]. The task receives a [`CancellationToken`]; dropping the
//! `CofluxTask` cancels the token, so the producer's lifetime is tied to the
//! subscription that created it.

use crate::CancellationToken;
use core::future::Future;

#[derive(Debug)]
pub struct CofluxTask {
    cancel: CancellationToken,
}

impl CofluxTask {
    /// Spawns `f` on the tokio runtime, handing it the task's cancellation token.
    #[cfg(feature = "runtime-tokio")]
    pub fn spawn<F, Fut>(f: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        tokio::spawn(f(cancel.clone()));
        Self { cancel }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// A clone of the token handed to the task.
    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl Drop for CofluxTask {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
