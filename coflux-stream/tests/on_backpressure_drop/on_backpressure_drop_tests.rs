// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use coflux_core::{CofluxError, StreamItem};
use coflux_stream::prelude::*;
use coflux_test_utils::{
    assert_stream_ended, collect_values, delayed_range, test_channel, test_channel_with_errors,
    unwrap_stream, unwrap_value,
};
use futures::{FutureExt, StreamExt};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_slow_consumer_receives_strict_ordered_subsequence() -> anyhow::Result<()> {
    // Arrange
    let source = delayed_range(20, Duration::from_millis(100));
    let mut gated = source.on_backpressure_drop();

    // Act
    let mut received = Vec::new();
    while let Some(item) = gated.next().await {
        received.push(unwrap_value(Some(item)));
        tokio::time::sleep(Duration::from_millis(130)).await;
    }

    // Assert
    assert!(received.windows(2).all(|w| w[0] < w[1]), "{received:?}");
    assert!(received.len() < 20, "nothing was dropped: {received:?}");
    assert!(received.len() > 1);
    assert!(received.iter().all(|v| (1..=20).contains(v)));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_fast_consumer_loses_nothing() -> anyhow::Result<()> {
    // Arrange
    let source = delayed_range(5, Duration::from_millis(100));

    // Act
    let received = collect_values(source.on_backpressure_drop()).await?;

    // Assert
    assert_eq!(received, vec![1, 2, 3, 4, 5]);

    Ok(())
}

#[tokio::test]
async fn test_pending_value_is_delivered_before_error() -> anyhow::Result<()> {
    // Arrange
    let (tx, source) = test_channel_with_errors::<i32>();
    let mut gated = source.on_backpressure_drop();

    // Act
    tx.try_send(StreamItem::Value(1))?;
    tx.try_send(StreamItem::Error(CofluxError::stream_error("overflow")))?;

    // Assert
    assert_eq!(unwrap_value(Some(unwrap_stream(&mut gated, 500).await)), 1);
    assert!(matches!(
        unwrap_stream(&mut gated, 500).await,
        StreamItem::Error(_)
    ));
    assert_stream_ended(&mut gated, 500).await;

    Ok(())
}

#[tokio::test]
async fn test_values_arriving_while_consumer_is_busy_are_dropped() -> anyhow::Result<()> {
    // Arrange
    let (tx, source) = test_channel::<i32>();
    let mut gated = source.on_backpressure_drop();
    tx.try_send(0)?;
    assert_eq!(unwrap_value(Some(unwrap_stream(&mut gated, 500).await)), 0);

    // Act - the consumer is not polling while these arrive
    for i in 1..=5 {
        tx.try_send(i)?;
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    drop(tx);

    // Assert
    assert_stream_ended(&mut gated, 500).await;

    Ok(())
}

#[tokio::test]
async fn test_handed_off_value_is_not_overwritten() -> anyhow::Result<()> {
    // Arrange - the consumer declares readiness before anything arrives
    let (tx, source) = test_channel::<i32>();
    let mut gated = source.on_backpressure_drop();
    assert!(gated.next().now_or_never().is_none());

    // Act
    for i in 1..=3 {
        tx.try_send(i)?;
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    drop(tx);

    // Assert
    assert_eq!(unwrap_value(Some(unwrap_stream(&mut gated, 500).await)), 1);
    assert_stream_ended(&mut gated, 500).await;

    Ok(())
}

#[tokio::test]
async fn test_dropping_output_stops_the_producer() -> anyhow::Result<()> {
    // Arrange
    let (tx, source) = test_channel::<i32>();
    let mut gated = source.on_backpressure_drop();
    tx.try_send(1)?;
    assert_eq!(unwrap_value(Some(unwrap_stream(&mut gated, 500).await)), 1);

    // Act
    drop(gated);

    // Assert
    tokio::time::timeout(Duration::from_millis(500), async {
        while !tx.is_closed() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await?;

    Ok(())
}
