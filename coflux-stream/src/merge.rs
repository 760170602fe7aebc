// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Unordered merge of several streams.
//!
//! Every input is subscribed on the first poll and relayed as soon as it
//! produces, so the output interleaves inputs in arrival order. Polling
//! starts one input further on each call to keep a chatty input from
//! starving the others.
//!
//! The output completes once every input completed. The first error from
//! any input is forwarded and ends the output, dropping the other inputs.

use coflux_core::StreamItem;
use core::pin::Pin;
use core::task::{Context, Poll};
use futures::Stream;

/// Merges `streams` without buffering or ordering.
pub fn merge_all<I, S, T>(streams: I) -> MergeAll<S>
where
    I: IntoIterator<Item = S>,
    S: Stream<Item = StreamItem<T>> + Unpin,
{
    MergeAll {
        inputs: streams.into_iter().collect(),
        next_start: 0,
    }
}

/// Extension trait for merging a vector of streams.
pub trait MergeAllExt {
    type Stream;

    /// Merges every stream of the vector; see [`merge_all`].
    fn merge_all(self) -> MergeAll<Self::Stream>;
}

impl<S, T> MergeAllExt for Vec<S>
where
    S: Stream<Item = StreamItem<T>> + Unpin,
{
    type Stream = S;

    fn merge_all(self) -> MergeAll<S> {
        merge_all(self)
    }
}

/// Output of [`merge_all`].
#[derive(Debug)]
#[must_use = "streams do nothing unless polled"]
pub struct MergeAll<S> {
    inputs: Vec<S>,
    next_start: usize,
}

impl<S, T> Stream for MergeAll<S>
where
    S: Stream<Item = StreamItem<T>> + Unpin,
{
    type Item = StreamItem<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;

        let mut offset = 0;
        while offset < this.inputs.len() {
            let index = (this.next_start + offset) % this.inputs.len();
            match Pin::new(&mut this.inputs[index]).poll_next(cx) {
                Poll::Ready(Some(StreamItem::Value(value))) => {
                    this.next_start = index + 1;
                    return Poll::Ready(Some(StreamItem::Value(value)));
                }
                Poll::Ready(Some(StreamItem::Error(err))) => {
                    coflux_core::debug!(
                        "merge_all: input {} failed, dropping {} others",
                        index,
                        this.inputs.len() - 1
                    );
                    this.inputs.clear();
                    return Poll::Ready(Some(StreamItem::Error(err)));
                }
                Poll::Ready(None) => {
                    this.inputs.swap_remove(index);
                }
                Poll::Pending => offset += 1,
            }
        }

        if this.inputs.is_empty() {
            Poll::Ready(None)
        } else {
            Poll::Pending
        }
    }
}
