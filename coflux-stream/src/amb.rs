// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! First-to-signal race between streams.
//!
//! [`amb`] polls every input until one of them produces an item (a value,
//! an error, or completion). That input wins: every other input is dropped
//! on the spot, which cancels whatever work it had in flight, and the output
//! continues as a transparent relay of the winner. The winner is released as
//! soon as it ends or fails, so it is never polled past its terminal item.
//!
//! When several inputs are ready within the same poll the one with the
//! lowest index wins.
//!
//! ```rust
//! use coflux_stream::amb;
//! use coflux_core::StreamItem;
//! use futures::{stream, StreamExt};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let slow = stream::pending::<StreamItem<i32>>().boxed();
//! let fast = stream::iter([StreamItem::Value(1), StreamItem::Value(2)]).boxed();
//!
//! let winner: Vec<_> = amb(vec![slow, fast]).collect().await;
//! assert_eq!(winner, vec![StreamItem::Value(1), StreamItem::Value(2)]);
//! # }
//! ```

use coflux_core::StreamItem;
use core::pin::Pin;
use core::task::{Context, Poll};
use futures::{ready, Stream};

/// Races `streams`; see the [module documentation](self).
pub fn amb<I, S, T>(streams: I) -> AmbStream<S>
where
    I: IntoIterator<Item = S>,
    S: Stream<Item = StreamItem<T>> + Unpin,
{
    AmbStream {
        inputs: streams.into_iter().collect(),
        decided: false,
    }
}

type BoxedInput<T> = Pin<Box<dyn Stream<Item = StreamItem<T>> + Send + 'static>>;

/// Extension trait providing [`amb_with`](AmbExt::amb_with).
pub trait AmbExt<T>: Stream<Item = StreamItem<T>> + Sized {
    /// Races this stream against `other`; ties go to `self`.
    fn amb_with<S>(self, other: S) -> AmbStream<BoxedInput<T>>
    where
        Self: Send + 'static,
        S: Stream<Item = StreamItem<T>> + Send + 'static,
    {
        amb([Box::pin(self) as BoxedInput<T>, Box::pin(other)])
    }
}

impl<S, T> AmbExt<T> for S where S: Stream<Item = StreamItem<T>> {}

/// Output of [`amb`].
#[derive(Debug)]
#[must_use = "streams do nothing unless polled"]
pub struct AmbStream<S> {
    inputs: Vec<S>,
    decided: bool,
}

impl<S, T> Stream for AmbStream<S>
where
    S: Stream<Item = StreamItem<T>> + Unpin,
{
    type Item = StreamItem<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;

        if this.decided {
            let Some(winner) = this.inputs.first_mut() else {
                return Poll::Ready(None);
            };
            let item = ready!(Pin::new(winner).poll_next(cx));
            if !is_value(&item) {
                this.inputs.clear();
            }
            return Poll::Ready(item);
        }

        if this.inputs.is_empty() {
            this.decided = true;
            return Poll::Ready(None);
        }

        for index in 0..this.inputs.len() {
            if let Poll::Ready(item) = Pin::new(&mut this.inputs[index]).poll_next(cx) {
                let winner = this.inputs.swap_remove(index);
                coflux_core::debug!(
                    "amb: input {} won, cancelling {} others",
                    index,
                    this.inputs.len()
                );
                // Dropping the losers cancels them.
                this.inputs.clear();
                this.decided = true;
                if is_value(&item) {
                    this.inputs.push(winner);
                }
                return Poll::Ready(item);
            }
        }

        Poll::Pending
    }
}

fn is_value<T>(item: &Option<StreamItem<T>>) -> bool {
    matches!(item, Some(StreamItem::Value(_)))
}
