// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use coflux_core::{CofluxError, StreamItem};
use coflux_stream::prelude::*;
use coflux_test_utils::{
    assert_stream_ended, collect_values, test_channel_with_errors, unwrap_stream, unwrap_value,
};
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use std::time::Duration;
use tokio::time::Instant;

/// `[n * 10, n * 10 + 1]`, released after `delay`.
fn delayed_pair(n: u64, delay: Duration) -> BoxStream<'static, StreamItem<u64>> {
    stream::once(tokio::time::sleep(delay))
        .flat_map(move |()| stream::iter([n * 10, n * 10 + 1]).map(StreamItem::Value))
        .boxed()
}

#[tokio::test(start_paused = true)]
async fn test_concat_map_eager_keeps_upstream_order() -> anyhow::Result<()> {
    // Arrange - later inner streams finish first
    let source = stream::iter(1..=3u64).map(StreamItem::Value);
    let start = Instant::now();

    // Act
    let values = collect_values(
        source.concat_map_eager(|n| delayed_pair(n, Duration::from_millis((4 - n) * 100))),
    )
    .await?;

    // Assert
    assert_eq!(values, vec![10, 11, 20, 21, 30, 31]);
    assert!(start.elapsed() < Duration::from_millis(400), "{:?}", start.elapsed());

    Ok(())
}

#[tokio::test]
async fn test_concat_map_eager_upstream_error_follows_earlier_inners() -> anyhow::Result<()> {
    // Arrange
    let (tx, source) = test_channel_with_errors::<u64>();
    let mut output = source.concat_map_eager(|n| stream::iter([n, n + 1]).map(StreamItem::Value));

    // Act
    tx.try_send(StreamItem::Value(1))?;
    tx.try_send(StreamItem::Error(CofluxError::stream_error("upstream failed")))?;

    // Assert
    assert_eq!(unwrap_value(Some(unwrap_stream(&mut output, 500).await)), 1);
    assert_eq!(unwrap_value(Some(unwrap_stream(&mut output, 500).await)), 2);
    assert!(matches!(
        unwrap_stream(&mut output, 500).await,
        StreamItem::Error(_)
    ));
    assert_stream_ended(&mut output, 500).await;

    Ok(())
}

#[tokio::test]
async fn test_concat_map_eager_inner_error_ends_output() -> anyhow::Result<()> {
    // Arrange
    let source = stream::iter([1, 2]).map(StreamItem::Value);
    let mut output = source.concat_map_eager(|n: i32| {
        if n == 1 {
            stream::iter([StreamItem::Error(CofluxError::stream_error("inner failed"))]).boxed()
        } else {
            stream::iter([StreamItem::Value(n)]).boxed()
        }
    });

    // Act & Assert
    assert!(matches!(
        unwrap_stream(&mut output, 500).await,
        StreamItem::Error(_)
    ));
    assert_stream_ended(&mut output, 500).await;

    Ok(())
}
