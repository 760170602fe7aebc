// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use coflux_core::{CofluxError, StreamItem};
use coflux_stream::prelude::*;
use coflux_test_utils::{
    assert_stream_ended, test_channel, test_channel_with_errors, unwrap_stream, unwrap_value,
};
use futures::StreamExt;
use std::time::Duration;

#[tokio::test]
async fn test_upstream_error_reaches_consumer() -> anyhow::Result<()> {
    // Arrange
    let (tx, source) = test_channel_with_errors::<i32>();
    let mut output = source.publish(|hub| hub.subscribe());

    // Act
    tx.try_send(StreamItem::Value(1))?;
    tx.try_send(StreamItem::Error(CofluxError::stream_error("upstream failed")))?;

    // Assert
    assert_eq!(unwrap_value(Some(unwrap_stream(&mut output, 500).await)), 1);
    match unwrap_stream(&mut output, 500).await {
        StreamItem::Error(err) => assert_eq!(err.to_string(), "Stream processing error: upstream failed"),
        StreamItem::Value(v) => panic!("expected error, got {v}"),
    }
    assert_stream_ended(&mut output, 500).await;

    Ok(())
}

#[tokio::test]
async fn test_dropping_output_cancels_upstream() -> anyhow::Result<()> {
    // Arrange
    let (tx, source) = test_channel::<i32>();
    let mut output = source.publish(|hub| hub.subscribe());
    tx.try_send(1)?;
    assert_eq!(unwrap_value(Some(unwrap_stream(&mut output, 500).await)), 1);

    // Act
    drop(output);

    // Assert - the pump releases the channel receiver
    tokio::time::timeout(Duration::from_millis(500), async {
        while !tx.is_closed() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await?;

    Ok(())
}

#[tokio::test]
async fn test_early_finishing_transform_releases_upstream() -> anyhow::Result<()> {
    // Arrange
    let (tx, source) = test_channel::<i32>();
    let output = source.publish(|hub| hub.subscribe().take(2));
    let collector = tokio::spawn(output.collect::<Vec<_>>());

    // Act
    for i in 1..=3 {
        tx.try_send(i)?;
    }

    // Assert
    let items = collector.await?;
    assert_eq!(items, vec![StreamItem::Value(1), StreamItem::Value(2)]);
    tokio::time::timeout(Duration::from_millis(500), async {
        while !tx.is_closed() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await?;

    Ok(())
}
