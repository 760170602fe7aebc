// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use super::{PublishSubject, Subject, SubjectStream};
use async_trait::async_trait;
use coflux_core::{CofluxError, Result, Signal};
use core::sync::atomic::{AtomicUsize, Ordering};
use futures::lock::Mutex as QuotaGate;
use std::sync::Arc;

/// Publish subject that holds back its producer until `expected`
/// consumers have attached.
///
/// The first `emit` suspends until the quota is met, closing the race in
/// which an upstream starts before anyone is listening. Once released the
/// subject behaves exactly like a [`PublishSubject`]. Concurrent emitters
/// queue behind a gate while the quota is pending, so only one of them ever
/// waits on the release signal. Terminal signals are never held back.
pub struct MulticastSubject<T> {
    inner: PublishSubject<T>,
    remaining: Arc<AtomicUsize>,
    producer: Signal,
    quota: Arc<QuotaGate<()>>,
}

impl<T> MulticastSubject<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a subject releasing its producer after `expected` subscriptions.
    ///
    /// `expected == 0` releases immediately.
    pub fn new(expected: usize) -> Self {
        let producer = Signal::new();
        if expected == 0 {
            producer.signal();
        }
        Self {
            inner: PublishSubject::new(),
            remaining: Arc::new(AtomicUsize::new(expected)),
            producer,
            quota: Arc::new(QuotaGate::new(())),
        }
    }

    /// Number of subscriptions still missing before emissions flow.
    pub fn remaining_collectors(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    async fn await_collectors(&self) -> Result<()> {
        if self.remaining.load(Ordering::Acquire) == 0 {
            return Ok(());
        }
        let _quota = self.quota.lock().await;
        while self.remaining.load(Ordering::Acquire) > 0 {
            self.producer.wait().await?;
        }
        Ok(())
    }
}

impl<T> Clone for MulticastSubject<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            remaining: Arc::clone(&self.remaining),
            producer: self.producer.clone(),
            quota: Arc::clone(&self.quota),
        }
    }
}

#[async_trait]
impl<T> Subject<T> for MulticastSubject<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn emit(&self, value: T) -> Result<()> {
        self.await_collectors().await?;
        self.inner.emit(value).await
    }

    async fn emit_error(&self, error: CofluxError) -> Result<()> {
        self.inner.emit_error(error).await
    }

    async fn complete(&self) -> Result<()> {
        self.inner.complete().await
    }

    fn subscribe(&self) -> SubjectStream<T> {
        let stream = self.inner.subscribe();
        let previous = self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        if previous == Ok(1) {
            coflux_core::debug!("multicast subject: all collectors attached");
            self.producer.signal();
        }
        stream
    }

    fn collector_count(&self) -> usize {
        self.inner.collector_count()
    }
}
