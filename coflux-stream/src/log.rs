// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Observational pass-through.
//!
//! [`log`](LogExt::log) records the lifecycle of a stream under a tag
//! without altering it: `subscribe` on the first poll, `next` per value,
//! `error` and `complete` for the terminal signals and `cancel` when the
//! stream is dropped before terminating.

use coflux_core::{CofluxError, StreamItem};
use core::fmt::{self, Debug};
use core::marker::PhantomData;
use core::pin::Pin;
use core::task::{Context, Poll};
use futures::Stream;
use pin_project::{pin_project, pinned_drop};

/// One lifecycle record emitted by [`LogExt::log`].
#[derive(Debug)]
pub enum LogEvent<'a, T> {
    Subscribe,
    Next(&'a T),
    Error(&'a CofluxError),
    Complete,
    Cancel,
}

impl<T: Debug> fmt::Display for LogEvent<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogEvent::Subscribe => write!(f, "subscribe"),
            LogEvent::Next(value) => write!(f, "next {value:?}"),
            LogEvent::Error(err) => write!(f, "error {err}"),
            LogEvent::Complete => write!(f, "complete"),
            LogEvent::Cancel => write!(f, "cancel"),
        }
    }
}

fn info_sink<T: Debug>(tag: &str, event: LogEvent<'_, T>) {
    coflux_core::info!("[{}] {}", tag, event);
}

/// Extension trait providing the logging decorator.
pub trait LogExt<T>: Stream<Item = StreamItem<T>> + Sized {
    /// Logs lifecycle events at `info` level under `tag`.
    fn log(self, tag: impl Into<String>) -> Log<Self, fn(&str, LogEvent<'_, T>), T>
    where
        T: Debug,
    {
        self.log_with(tag, info_sink::<T> as fn(&str, LogEvent<'_, T>))
    }

    /// Hands lifecycle events to `sink` instead of the logger.
    fn log_with<F>(self, tag: impl Into<String>, sink: F) -> Log<Self, F, T>
    where
        F: Fn(&str, LogEvent<'_, T>),
    {
        Log {
            source: self,
            tag: tag.into(),
            sink,
            subscribed: false,
            terminated: false,
            _item: PhantomData,
        }
    }
}

impl<S, T> LogExt<T> for S where S: Stream<Item = StreamItem<T>> {}

/// Output of [`LogExt::log`] and [`LogExt::log_with`].
#[pin_project(PinnedDrop)]
#[must_use = "streams do nothing unless polled"]
pub struct Log<S, F, T>
where
    S: Stream<Item = StreamItem<T>>,
    F: Fn(&str, LogEvent<'_, T>),
{
    #[pin]
    source: S,
    tag: String,
    sink: F,
    subscribed: bool,
    terminated: bool,
    _item: PhantomData<fn() -> T>,
}

impl<S, F, T> Stream for Log<S, F, T>
where
    S: Stream<Item = StreamItem<T>>,
    F: Fn(&str, LogEvent<'_, T>),
{
    type Item = StreamItem<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        if !*this.subscribed {
            *this.subscribed = true;
            (this.sink)(this.tag.as_str(), LogEvent::Subscribe);
        }

        let polled = this.source.poll_next(cx);
        match &polled {
            Poll::Ready(Some(StreamItem::Value(value))) => {
                (this.sink)(this.tag.as_str(), LogEvent::Next(value));
            }
            Poll::Ready(Some(StreamItem::Error(err))) => {
                *this.terminated = true;
                (this.sink)(this.tag.as_str(), LogEvent::Error(err));
            }
            Poll::Ready(None) => {
                if !*this.terminated {
                    *this.terminated = true;
                    (this.sink)(this.tag.as_str(), LogEvent::Complete);
                }
            }
            Poll::Pending => {}
        }
        polled
    }
}

#[pinned_drop]
impl<S, F, T> PinnedDrop for Log<S, F, T>
where
    S: Stream<Item = StreamItem<T>>,
    F: Fn(&str, LogEvent<'_, T>),
{
    fn drop(self: Pin<&mut Self>) {
        let this = self.project();
        if *this.subscribed && !*this.terminated {
            (this.sink)(this.tag.as_str(), LogEvent::Cancel);
        }
    }
}
