// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use super::{ReplayBounds, ReplaySubject, Subject, SubjectStream};
use async_trait::async_trait;
use coflux_core::{CofluxError, Result};

/// Subject that always hands its latest item to a new consumer.
///
/// A thin specialisation of [`ReplaySubject`] retaining exactly one item.
pub struct BehaviorSubject<T> {
    inner: ReplaySubject<T>,
}

impl<T> BehaviorSubject<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a subject seeded with `initial`.
    pub fn new(initial: T) -> Self {
        let subject = Self::empty();
        // A fresh subject is open, so the seed cannot be rejected.
        let _ = subject.inner.try_emit(initial);
        subject
    }

    /// Creates a subject without a current value.
    pub fn empty() -> Self {
        Self {
            inner: ReplaySubject::with_bounds(ReplayBounds::sized(1)),
        }
    }

    /// The current value, if one was ever emitted.
    pub fn value(&self) -> Option<T> {
        self.inner.latest()
    }
}

impl<T> Clone for BehaviorSubject<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

#[async_trait]
impl<T> Subject<T> for BehaviorSubject<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn emit(&self, value: T) -> Result<()> {
        self.inner.emit(value).await
    }

    async fn emit_error(&self, error: CofluxError) -> Result<()> {
        self.inner.emit_error(error).await
    }

    async fn complete(&self) -> Result<()> {
        self.inner.complete().await
    }

    fn subscribe(&self) -> SubjectStream<T> {
        self.inner.subscribe()
    }

    fn collector_count(&self) -> usize {
        self.inner.collector_count()
    }
}
