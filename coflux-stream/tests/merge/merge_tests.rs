// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use coflux_core::{CofluxError, StreamItem};
use coflux_stream::prelude::*;
use coflux_test_utils::{
    assert_no_element_emitted, assert_stream_ended, collect_values, delayed_range, test_channel,
    test_channel_with_errors, unwrap_stream, unwrap_value,
};
use futures::StreamExt;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_merge_all_relays_in_arrival_order() -> anyhow::Result<()> {
    // Arrange
    let fast = delayed_range(3, Duration::from_millis(100)).map(|item| item.map(|n| ('a', n)));
    let slow = delayed_range(2, Duration::from_millis(130)).map(|item| item.map(|n| ('b', n)));

    // Act
    let merged = collect_values(vec![fast.boxed(), slow.boxed()].merge_all()).await?;

    // Assert
    assert_eq!(
        merged,
        vec![('a', 1), ('b', 1), ('a', 2), ('b', 2), ('a', 3)]
    );

    Ok(())
}

#[tokio::test]
async fn test_merge_all_waits_for_every_input_to_complete() -> anyhow::Result<()> {
    // Arrange
    let (tx_a, a) = test_channel::<i32>();
    let (tx_b, b) = test_channel::<i32>();
    let mut merged = merge_all(vec![a.boxed(), b.boxed()]);

    // Act
    tx_a.try_send(1)?;
    assert_eq!(unwrap_value(Some(unwrap_stream(&mut merged, 500).await)), 1);
    drop(tx_a);
    assert_no_element_emitted(&mut merged, 50).await;
    tx_b.try_send(2)?;
    assert_eq!(unwrap_value(Some(unwrap_stream(&mut merged, 500).await)), 2);
    drop(tx_b);

    // Assert
    assert_stream_ended(&mut merged, 500).await;

    Ok(())
}

#[tokio::test]
async fn test_merge_all_error_ends_output_and_drops_other_inputs() -> anyhow::Result<()> {
    // Arrange
    let (tx_ok, healthy) = test_channel::<i32>();
    let (tx_err, failing) = test_channel_with_errors::<i32>();
    let mut merged = merge_all(vec![healthy.boxed(), failing.boxed()]);

    // Act
    tx_err.try_send(StreamItem::Error(CofluxError::stream_error("input failed")))?;

    // Assert
    assert!(matches!(
        unwrap_stream(&mut merged, 500).await,
        StreamItem::Error(_)
    ));
    assert!(tx_ok.is_closed());
    assert_stream_ended(&mut merged, 500).await;

    Ok(())
}
