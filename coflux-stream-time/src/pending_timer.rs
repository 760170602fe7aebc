// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};
use core::time::Duration;

use coflux_runtime::timer::Timer;
use futures::ready;
use pin_project::pin_project;

/// At most one cancellable sleep owned by a timed operator.
///
/// Starting a new window replaces (and thereby cancels) the previous one.
/// Firing and cancelling both happen on the owner's poll path, so exactly
/// one of them wins.
#[pin_project]
#[derive(Debug)]
pub struct PendingTimer<S> {
    #[pin]
    sleep: Option<S>,
}

impl<S> PendingTimer<S>
where
    S: Future<Output = ()>,
{
    pub fn new() -> Self {
        Self { sleep: None }
    }

    /// Arms the timer for `duration`, dropping any sleep already in flight.
    pub fn start<TM>(self: Pin<&mut Self>, timer: &TM, duration: Duration)
    where
        TM: Timer<Sleep = S>,
    {
        self.project().sleep.set(Some(timer.sleep_future(duration)));
    }

    pub fn cancel(self: Pin<&mut Self>) {
        self.project().sleep.set(None);
    }

    pub fn is_armed(&self) -> bool {
        self.sleep.is_some()
    }

    /// Resolves once when an armed timer fires, disarming it.
    ///
    /// An unarmed timer stays pending without registering a waker.
    pub fn poll_elapsed(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let mut this = self.project();
        match this.sleep.as_mut().as_pin_mut() {
            Some(sleep) => {
                ready!(sleep.poll(cx));
                this.sleep.set(None);
                Poll::Ready(())
            }
            None => Poll::Pending,
        }
    }
}

impl<S> Default for PendingTimer<S>
where
    S: Future<Output = ()>,
{
    fn default() -> Self {
        Self::new()
    }
}
