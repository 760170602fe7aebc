// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use coflux_core::{CofluxError, StreamItem};
use coflux_stream::prelude::*;
use coflux_test_utils::{
    assert_no_element_emitted, assert_stream_ended, collect_values, delayed_range, test_channel, test_channel_with_errors,
    unwrap_stream, unwrap_value,
};
use futures::stream::{self, StreamExt};
use std::time::Duration;

#[tokio::test]
async fn test_flat_map_drop_relays_inner_streams_in_turn() -> anyhow::Result<()> {
    // Arrange
    let (tx, source) = test_channel::<u32>();
    let mut output = source.flat_map_drop(|n| stream::iter((0..n).map(StreamItem::Value)));

    // Act
    tx.try_send(2)?;

    // Assert
    assert_eq!(unwrap_value(Some(unwrap_stream(&mut output, 500).await)), 0);
    assert_eq!(unwrap_value(Some(unwrap_stream(&mut output, 500).await)), 1);
    assert_no_element_emitted(&mut output, 50).await;

    tx.try_send(1)?;
    assert_eq!(unwrap_value(Some(unwrap_stream(&mut output, 500).await)), 0);
    drop(tx);
    assert_stream_ended(&mut output, 500).await;

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_items_arriving_while_busy_are_dropped() -> anyhow::Result<()> {
    // Arrange - one upstream item every 100ms, each inner stream lasts 250ms
    let source = delayed_range(6, Duration::from_millis(100));

    // Act
    let output = source.flat_map_drop(|n| {
        stream::once(async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            StreamItem::Value(n)
        })
        .boxed()
    });
    let result = collect_values(output).await?;

    // Assert - 1 starts at 100ms; 2 and 3 land while it runs; 4 starts at 400ms
    assert_eq!(result, vec![1, 4]);

    Ok(())
}

#[tokio::test]
async fn test_inner_error_ends_the_output() -> anyhow::Result<()> {
    // Arrange
    let (tx, source) = test_channel::<i32>();
    let mut output = source.flat_map_drop(|n| {
        stream::iter([
            StreamItem::Value(n),
            StreamItem::Error(CofluxError::stream_error("inner")),
        ])
    });

    // Act
    tx.try_send(5)?;
    tx.try_send(6)?;

    // Assert
    assert_eq!(unwrap_value(Some(unwrap_stream(&mut output, 500).await)), 5);
    assert!(matches!(
        unwrap_stream(&mut output, 500).await,
        StreamItem::Error(_)
    ));
    assert_stream_ended(&mut output, 500).await;

    Ok(())
}

#[tokio::test]
async fn test_outer_error_cancels_active_inner() -> anyhow::Result<()> {
    // Arrange
    let (tx, source) = test_channel_with_errors::<i32>();
    let mut output = source.flat_map_drop(|_| stream::pending::<StreamItem<i32>>());

    // Act
    tx.try_send(StreamItem::Value(1))?;
    tx.try_send(StreamItem::Error(CofluxError::stream_error("outer")))?;

    // Assert
    assert!(matches!(
        unwrap_stream(&mut output, 500).await,
        StreamItem::Error(_)
    ));
    assert_stream_ended(&mut output, 500).await;

    Ok(())
}
