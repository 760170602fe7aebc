// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Test utilities for the coflux workspace.
//!
//! This crate provides channels, timed sources, clocks and assertion helpers
//! for testing stream operators. It is meant for development and testing
//! only, not for production code.
//!
//! # Channels
//!
//! Operators take `self` by value, so tests drive them imperatively through
//! an unbounded channel whose receiving half is already a stream of
//! [`StreamItem`]s:
//!
//! ```rust
//! use coflux_test_utils::test_channel;
//! use coflux_core::StreamItem;
//! use futures::StreamExt;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let (tx, mut stream) = test_channel();
//! tx.try_send(1).unwrap();
//!
//! assert_eq!(stream.next().await, Some(StreamItem::Value(1)));
//! # }
//! ```
//!
//! # Module Organization
//!
//! - `helpers` - assertion helpers and timed sources
//! - `manual_clock` - a [`TimeSource`](coflux_runtime::time_source::TimeSource) moved by hand
//! - `error_injection` - a stream wrapper that injects an error at a position

#![allow(clippy::multiple_crate_versions, clippy::doc_markdown)]
pub mod error_injection;
pub mod helpers;
pub mod manual_clock;

use coflux_core::StreamItem;
use futures::{Stream, StreamExt};

pub use error_injection::ErrorInjectingStream;
pub use helpers::{
    assert_no_element_emitted, assert_no_recv, assert_stream_ended, collect_values,
    delayed_range, recv_timeout, unwrap_stream, unwrap_value, await_collectors,
};
pub use manual_clock::ManualClock;

/// Creates a test channel that wraps every sent value in `StreamItem::Value`.
///
/// The receiver is boxed so the stream is `Unpin` and can be polled in place.
pub fn test_channel<T: Send + 'static>() -> (
    async_channel::Sender<T>,
    impl Stream<Item = StreamItem<T>> + Send + Unpin,
) {
    let (tx, rx) = async_channel::unbounded();
    (tx, Box::pin(rx.map(StreamItem::Value)))
}

/// Creates a test channel that accepts `StreamItem<T>` so tests can send errors.
///
/// ```rust
/// use coflux_test_utils::test_channel_with_errors;
/// use coflux_core::{CofluxError, StreamItem};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() {
/// let (tx, mut stream) = test_channel_with_errors::<i32>();
/// tx.try_send(StreamItem::Value(42)).unwrap();
/// tx.try_send(StreamItem::Error(CofluxError::stream_error("boom"))).unwrap();
///
/// assert_eq!(stream.next().await, Some(StreamItem::Value(42)));
/// assert!(matches!(stream.next().await, Some(StreamItem::Error(_))));
/// # }
/// ```
pub fn test_channel_with_errors<T: Send + 'static>() -> (
    async_channel::Sender<StreamItem<T>>,
    impl Stream<Item = StreamItem<T>> + Send + Unpin,
) {
    let (tx, rx) = async_channel::unbounded();
    (tx, Box::pin(rx))
}
