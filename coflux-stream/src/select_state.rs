// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Memoized selection of sub-state from a stream of states.
//!
//! A selector picks a slice of each state; the output only moves when that
//! slice changes. [`select_projected`](SelectStateExt::select_projected)
//! adds a projector that is re-run only when the selected slice changed, and
//! whose result is itself emitted only when it differs from the last one.
//!
//! Several selectors combine naturally by returning a tuple:
//!
//! ```rust
//! use coflux_stream::SelectStateExt;
//! use coflux_core::StreamItem;
//! use futures::{stream, StreamExt};
//!
//! #[derive(Clone)]
//! struct State { user: &'static str, unread: u32, ticks: u64 }
//!
//! # #[tokio::main]
//! # async fn main() {
//! let states = stream::iter([
//!     State { user: "ann", unread: 0, ticks: 1 },
//!     State { user: "ann", unread: 0, ticks: 2 },
//!     State { user: "ann", unread: 3, ticks: 3 },
//! ])
//! .map(StreamItem::Value);
//!
//! let badges: Vec<_> = states
//!     .select_projected(
//!         |s: &State| Ok((s.user, s.unread)),
//!         |&(user, unread): &(&str, u32)| Ok(format!("{user}:{unread}")),
//!     )
//!     .collect()
//!     .await;
//!
//! assert_eq!(
//!     badges,
//!     vec![
//!         StreamItem::Value("ann:0".to_string()),
//!         StreamItem::Value("ann:3".to_string()),
//!     ]
//! );
//! # }
//! ```
//!
//! A selector or projector error is forwarded and ends the stream.

use coflux_core::{Result, StreamItem};
use core::pin::Pin;
use core::task::{Context, Poll};
use futures::Stream;
use pin_project::pin_project;

/// Extension trait providing state selectors.
pub trait SelectStateExt<T>: Stream<Item = StreamItem<T>> + Sized {
    /// Emits the selected sub-state whenever it differs from the previous one.
    fn select_state<K, F>(self, selector: F) -> SelectState<Self, F, K>
    where
        F: FnMut(&T) -> Result<K>,
        K: PartialEq + Clone,
    {
        let identity: fn(&K) -> Result<K> = |sub| Ok(sub.clone());
        self.select_projected(selector, identity)
    }

    /// Projects the selected sub-state, skipping the projector while the
    /// sub-state is unchanged and skipping results equal to the last one.
    fn select_projected<K, R, F, P>(
        self,
        selector: F,
        projector: P,
    ) -> SelectProjected<Self, F, P, K, R>
    where
        F: FnMut(&T) -> Result<K>,
        P: FnMut(&K) -> Result<R>,
        K: PartialEq,
        R: PartialEq + Clone,
    {
        SelectProjected {
            source: self,
            selector,
            projector,
            last_selected: None,
            last_emitted: None,
            done: false,
        }
    }
}

impl<S, T> SelectStateExt<T> for S where S: Stream<Item = StreamItem<T>> {}

/// Output of [`SelectStateExt::select_state`].
pub type SelectState<S, F, K> = SelectProjected<S, F, fn(&K) -> Result<K>, K, K>;

/// Output of [`SelectStateExt::select_projected`].
#[pin_project]
#[must_use = "streams do nothing unless polled"]
pub struct SelectProjected<S, F, P, K, R> {
    #[pin]
    source: S,
    selector: F,
    projector: P,
    last_selected: Option<K>,
    last_emitted: Option<R>,
    done: bool,
}

impl<S, F, P, T, K, R> Stream for SelectProjected<S, F, P, K, R>
where
    S: Stream<Item = StreamItem<T>>,
    F: FnMut(&T) -> Result<K>,
    P: FnMut(&K) -> Result<R>,
    K: PartialEq,
    R: PartialEq + Clone,
{
    type Item = StreamItem<R>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        if *this.done {
            return Poll::Ready(None);
        }

        loop {
            let state = match futures::ready!(this.source.as_mut().poll_next(cx)) {
                Some(StreamItem::Value(state)) => state,
                Some(StreamItem::Error(err)) => {
                    *this.done = true;
                    return Poll::Ready(Some(StreamItem::Error(err)));
                }
                None => {
                    *this.done = true;
                    return Poll::Ready(None);
                }
            };

            let projected = (this.selector)(&state).and_then(|selected| {
                if this.last_selected.as_ref() == Some(&selected) {
                    return Ok(None);
                }
                let projected = (this.projector)(&selected)?;
                *this.last_selected = Some(selected);
                Ok(Some(projected))
            });

            match projected {
                Ok(Some(result)) if this.last_emitted.as_ref() != Some(&result) => {
                    *this.last_emitted = Some(result.clone());
                    return Poll::Ready(Some(StreamItem::Value(result)));
                }
                Ok(_) => {}
                Err(err) => {
                    *this.done = true;
                    return Poll::Ready(Some(StreamItem::Error(err)));
                }
            }
        }
    }
}
