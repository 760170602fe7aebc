// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use coflux_core::StreamItem;
use futures::stream::StreamExt;
use futures::Stream;
use std::fmt::Debug;
use std::time::Duration;
use tokio::time::{sleep, timeout};

pub async fn assert_no_element_emitted<S, T>(stream: &mut S, timeout_ms: u64)
where
    S: Stream<Item = T> + Unpin,
{
    tokio::select! {
        _item = stream.next() => {
            panic!("Unexpected item emitted, expected no output.");
        }
        _ = sleep(Duration::from_millis(timeout_ms)) => {
        }
    }
}

/// Pulls the next item, panicking if the stream ends or stays silent for `timeout_ms`.
pub async fn unwrap_stream<S, T>(stream: &mut S, timeout_ms: u64) -> StreamItem<T>
where
    S: Stream<Item = StreamItem<T>> + Unpin,
{
    match timeout(Duration::from_millis(timeout_ms), stream.next()).await {
        Ok(Some(item)) => item,
        Ok(None) => panic!("Expected StreamItem but stream ended"),
        Err(_) => panic!("Timeout: No item received within {timeout_ms} ms"),
    }
}

pub fn unwrap_value<T>(item: Option<StreamItem<T>>) -> T {
    match item {
        Some(StreamItem::Value(value)) => value,
        Some(StreamItem::Error(err)) => panic!("Expected Value but got Error: {err}"),
        None => panic!("Expected Value but stream ended"),
    }
}

pub async fn assert_stream_ended<S, T>(stream: &mut S, timeout_ms: u64)
where
    S: Stream<Item = StreamItem<T>> + Unpin,
{
    match timeout(Duration::from_millis(timeout_ms), stream.next()).await {
        Ok(None) => {}
        Ok(Some(StreamItem::Value(_))) => panic!("Expected stream to end but it returned a value"),
        Ok(Some(StreamItem::Error(err))) => {
            panic!("Expected stream to end but it returned an error: {err}")
        }
        Err(_) => panic!("Timeout: Stream did not end within {timeout_ms} ms"),
    }
}

/// Drains the stream, returning every value and stopping at the first error.
pub async fn collect_values<S, T>(stream: S) -> Result<Vec<T>, coflux_core::CofluxError>
where
    S: Stream<Item = StreamItem<T>>,
{
    let mut stream = Box::pin(stream);
    let mut values = Vec::new();
    while let Some(item) = stream.next().await {
        match item {
            StreamItem::Value(value) => values.push(value),
            StreamItem::Error(err) => return Err(err),
        }
    }
    Ok(values)
}

/// Receives from a result channel, panicking after `timeout_ms`.
pub async fn recv_timeout<T>(rx: &async_channel::Receiver<T>, timeout_ms: u64) -> T {
    match timeout(Duration::from_millis(timeout_ms), rx.recv()).await {
        Ok(Ok(value)) => value,
        Ok(Err(_)) => panic!("Expected a value but the channel closed"),
        Err(_) => panic!("Timeout: No value received within {timeout_ms} ms"),
    }
}

pub async fn assert_no_recv<T: Debug>(rx: &async_channel::Receiver<T>, timeout_ms: u64) {
    if let Ok(Ok(value)) = timeout(Duration::from_millis(timeout_ms), rx.recv()).await {
        panic!("Unexpected value received: {value:?}");
    }
}

/// Yields `1..=count`, sleeping `period` before each value.
pub fn delayed_range(count: u64, period: Duration) -> impl Stream<Item = StreamItem<u64>> + Send {
    futures::stream::iter(1..=count).then(move |value| async move {
        sleep(period).await;
        StreamItem::Value(value)
    })
}

/// Polls `count` until it reports at least `expected`, yielding between checks.
///
/// Panics once `timeout_ms` elapse, which keeps a broken subscription from
/// hanging a test.
pub async fn await_collectors<F>(count: F, expected: usize, timeout_ms: u64)
where
    F: Fn() -> usize,
{
    let poll = async {
        while count() < expected {
            tokio::task::yield_now().await;
            sleep(Duration::from_millis(1)).await;
        }
    };
    if timeout(Duration::from_millis(timeout_ms), poll).await.is_err() {
        panic!("Timeout: {expected} collectors not attached within {timeout_ms} ms");
    }
}
