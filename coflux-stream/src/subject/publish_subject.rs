// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use super::{terminated_error, Subject, SubjectStream, Terminal};
use async_trait::async_trait;
use coflux_core::{CofluxError, HandoffReceiver, HandoffSender, Result, SlotHandoff, StreamItem};
use core::pin::Pin;
use core::task::{Context, Poll};
use futures::lock::Mutex as EmitGate;
use futures::{stream, Stream};
use parking_lot::Mutex;
use std::sync::Arc;

/// Hot subject without a buffer.
///
/// Each emission is handed to every attached consumer through its own
/// [`SlotHandoff`], so `emit` resumes only after every consumer has taken
/// the item. Items emitted while nobody is attached are dropped.
///
/// # Example
///
/// ```
/// use coflux_stream::subject::{PublishSubject, Subject};
/// use coflux_core::StreamItem;
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() {
/// let subject = PublishSubject::new();
/// let mut consumer = subject.subscribe();
///
/// let producer = {
///     let subject = subject.clone();
///     tokio::spawn(async move {
///         subject.emit(1).await?;
///         subject.complete().await
///     })
/// };
///
/// assert_eq!(consumer.next().await, Some(StreamItem::Value(1)));
/// assert!(consumer.next().await.is_none());
/// producer.await.unwrap().unwrap();
/// # }
/// ```
pub struct PublishSubject<T> {
    state: Arc<Mutex<PublishState<T>>>,
    gate: Arc<EmitGate<()>>,
}

struct PublishState<T> {
    collectors: Vec<(u64, HandoffSender<T>)>,
    next_id: u64,
    terminal: Terminal,
}

impl<T> PublishSubject<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(PublishState {
                collectors: Vec::new(),
                next_id: 0,
                terminal: Terminal::Open,
            })),
            gate: Arc::new(EmitGate::new(())),
        }
    }

    /// `true` once `complete` or `emit_error` ran.
    pub fn is_terminated(&self) -> bool {
        !self.state.lock().terminal.is_open()
    }

    async fn terminate(&self, terminal: Terminal) -> Result<()> {
        let _gate = self.gate.lock().await;
        let collectors = {
            let mut state = self.state.lock();
            if !state.terminal.is_open() {
                return Err(terminated_error());
            }
            state.terminal = terminal.clone();
            core::mem::take(&mut state.collectors)
        };

        coflux_core::trace!("publish subject terminating {} collectors", collectors.len());
        for (_, sender) in collectors {
            match &terminal {
                Terminal::Failed(err) => sender.fail_now(err.clone()),
                _ => sender.finish_now(),
            }
        }
        Ok(())
    }

    fn remove(state: &Mutex<PublishState<T>>, id: u64) {
        state.lock().collectors.retain(|(cid, _)| *cid != id);
    }
}

impl<T> Default for PublishSubject<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for PublishSubject<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            gate: Arc::clone(&self.gate),
        }
    }
}

#[async_trait]
impl<T> Subject<T> for PublishSubject<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn emit(&self, value: T) -> Result<()> {
        let _gate = self.gate.lock().await;
        let targets: Vec<(u64, HandoffSender<T>)> = {
            let state = self.state.lock();
            if !state.terminal.is_open() {
                return Err(terminated_error());
            }
            state
                .collectors
                .iter()
                .map(|(id, sender)| (*id, sender.clone()))
                .collect()
        };

        for (id, sender) in targets {
            if sender.publish(value.clone()).await.is_err() {
                // Consumer went away while we were waiting on it.
                Self::remove(&self.state, id);
            }
        }
        Ok(())
    }

    async fn emit_error(&self, error: CofluxError) -> Result<()> {
        self.terminate(Terminal::Failed(error)).await
    }

    async fn complete(&self) -> Result<()> {
        self.terminate(Terminal::Completed).await
    }

    fn subscribe(&self) -> SubjectStream<T> {
        let mut state = self.state.lock();
        match &state.terminal {
            Terminal::Completed => return Box::pin(stream::empty()),
            Terminal::Failed(err) => return Box::pin(stream::iter([StreamItem::Error(err.clone())])),
            Terminal::Open => {}
        }

        let (sender, receiver) = SlotHandoff::channel();
        let id = state.next_id;
        state.next_id += 1;
        state.collectors.push((id, sender));

        Box::pin(CollectorStream {
            receiver,
            state: Arc::clone(&self.state),
            id,
        })
    }

    fn collector_count(&self) -> usize {
        self.state.lock().collectors.len()
    }
}

/// Consumer attached to a [`PublishSubject`]; detaches itself on drop.
struct CollectorStream<T> {
    receiver: HandoffReceiver<T>,
    state: Arc<Mutex<PublishState<T>>>,
    id: u64,
}

impl<T> Stream for CollectorStream<T> {
    type Item = StreamItem<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.receiver).poll_next(cx)
    }
}

impl<T> Drop for CollectorStream<T> {
    fn drop(&mut self) {
        let id = self.id;
        self.state.lock().collectors.retain(|(cid, _)| *cid != id);
    }
}
