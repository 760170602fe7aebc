// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Broadcast hubs.
//!
//! A [`Subject`] is a hot, multi-consumer fan-out point. Every consumer
//! obtained through [`Subject::subscribe`] receives the items emitted from
//! its attach point onward, in emission order. The flavours differ in what a
//! late consumer sees and in when the producer may start:
//!
//! | subject                | late consumer sees              | producer waits for |
//! |------------------------|---------------------------------|--------------------|
//! | [`PublishSubject`]     | live items only                 | each consumer, one item at a time |
//! | [`MulticastSubject`]   | live items only                 | `N` consumers to attach first |
//! | [`ReplaySubject`]      | bounded backlog, then live      | nobody |
//! | [`BehaviorSubject`]    | latest item, then live          | nobody |
//!
//! Emitting into a terminated subject is a protocol violation. A consumer
//! attaching after termination receives the backlog (replay flavours) and
//! then the terminal signal.

mod behavior_subject;
mod multicast_subject;
mod publish_subject;
mod replay_subject;

use async_trait::async_trait;
use coflux_core::{CofluxError, Result, StreamItem};
use core::pin::Pin;
use futures::Stream;

pub use behavior_subject::BehaviorSubject;
pub use multicast_subject::MulticastSubject;
pub use publish_subject::PublishSubject;
pub use replay_subject::{ReplayBounds, ReplaySubject};

/// Consumer side of a subject.
pub type SubjectStream<T> = Pin<Box<dyn Stream<Item = StreamItem<T>> + Send + 'static>>;

/// A hot multi-consumer hub.
#[async_trait]
pub trait Subject<T>: Send + Sync + 'static
where
    T: Send + 'static,
{
    /// Delivers `value` to every attached consumer.
    ///
    /// # Errors
    ///
    /// A protocol violation if the subject already terminated.
    async fn emit(&self, value: T) -> Result<()>;

    /// Terminates every consumer with `error`.
    async fn emit_error(&self, error: CofluxError) -> Result<()>;

    /// Completes every consumer.
    async fn complete(&self) -> Result<()>;

    /// Attaches a new consumer.
    fn subscribe(&self) -> SubjectStream<T>;

    /// Number of currently attached consumers.
    fn collector_count(&self) -> usize;

    fn has_collectors(&self) -> bool {
        self.collector_count() > 0
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Terminal {
    Open,
    Completed,
    Failed(CofluxError),
}

impl Terminal {
    pub(crate) const fn is_open(&self) -> bool {
        matches!(self, Terminal::Open)
    }
}

pub(crate) fn terminated_error() -> CofluxError {
    CofluxError::protocol_violation("subject already terminated")
}
