// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use coflux_core::{CofluxError, StreamItem};
use coflux_stream::prelude::*;
use coflux_test_utils::{assert_stream_ended, collect_values, unwrap_stream, unwrap_value};
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// `values` after an initial delay, flagging `started` once the first one is produced.
fn delayed(
    delay: Duration,
    values: Vec<&'static str>,
    started: Arc<AtomicBool>,
) -> BoxStream<'static, StreamItem<&'static str>> {
    stream::once(async move {
        tokio::time::sleep(delay).await;
        started.store(true, Ordering::SeqCst);
        stream::iter(values.into_iter().map(StreamItem::Value))
    })
    .flatten()
    .boxed()
}

#[tokio::test(start_paused = true)]
async fn test_amb_forwards_only_the_first_stream_to_produce() -> anyhow::Result<()> {
    // Arrange
    let a_started = Arc::new(AtomicBool::new(false));
    let b_started = Arc::new(AtomicBool::new(false));
    let a = delayed(Duration::from_millis(1000), vec!["a1", "a2"], a_started.clone());
    let b = delayed(Duration::from_millis(100), vec!["b1", "b2"], b_started.clone());

    // Act
    let result = collect_values(amb(vec![a, b])).await?;
    tokio::time::sleep(Duration::from_millis(2000)).await;

    // Assert
    assert_eq!(result, vec!["b1", "b2"]);
    assert!(b_started.load(Ordering::SeqCst));
    assert!(!a_started.load(Ordering::SeqCst));

    Ok(())
}

#[tokio::test]
async fn test_amb_ties_go_to_the_lowest_index() -> anyhow::Result<()> {
    // Arrange
    let first = stream::iter([StreamItem::Value(1)]).boxed();
    let second = stream::iter([StreamItem::Value(2)]).boxed();

    // Act
    let result = collect_values(amb(vec![first, second])).await?;

    // Assert
    assert_eq!(result, vec![1]);

    Ok(())
}

#[tokio::test]
async fn test_amb_with_empty_input_completes() -> anyhow::Result<()> {
    // Arrange
    let inputs: Vec<BoxStream<'static, StreamItem<i32>>> = Vec::new();

    // Act
    let mut raced = amb(inputs);

    // Assert
    assert_stream_ended(&mut raced, 100).await;

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_completion_can_win_the_race() -> anyhow::Result<()> {
    // Arrange
    let never_started = Arc::new(AtomicBool::new(false));
    let slow = delayed(Duration::from_millis(500), vec!["late"], never_started.clone());
    let empty = stream::empty::<StreamItem<&'static str>>();

    // Act
    let mut raced = slow.amb_with(empty);

    // Assert
    assert_stream_ended(&mut raced, 100).await;
    assert!(!never_started.load(Ordering::SeqCst));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_error_can_win_the_race() -> anyhow::Result<()> {
    // Arrange
    let slow = stream::iter([StreamItem::Value(1)])
        .then(|item| async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            item
        });
    let failing = stream::once(async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        StreamItem::<i32>::Error(CofluxError::stream_error("lost"))
    });

    // Act
    let mut raced = slow.amb_with(failing);

    // Assert
    assert!(matches!(
        unwrap_stream(&mut raced, 1000).await,
        StreamItem::Error(_)
    ));
    assert_stream_ended(&mut raced, 1000).await;

    Ok(())
}

#[tokio::test]
async fn test_winner_is_relayed_transparently() -> anyhow::Result<()> {
    // Arrange
    let (tx, source) = coflux_test_utils::test_channel::<i32>();
    let mut raced = source.amb_with(stream::pending());

    // Act
    tx.try_send(1)?;
    tx.try_send(2)?;
    drop(tx);

    // Assert
    assert_eq!(unwrap_value(Some(unwrap_stream(&mut raced, 500).await)), 1);
    assert_eq!(unwrap_value(Some(unwrap_stream(&mut raced, 500).await)), 2);
    assert_stream_ended(&mut raced, 500).await;

    Ok(())
}

/// Yields `items`, then ends; panics if polled after the end.
fn strict(items: Vec<StreamItem<i32>>) -> BoxStream<'static, StreamItem<i32>> {
    let mut items = items.into_iter();
    let mut ended = false;
    stream::poll_fn(move |_| {
        assert!(!ended, "polled after its terminal item");
        let next = items.next();
        if !matches!(next, Some(StreamItem::Value(_))) {
            ended = true;
        }
        std::task::Poll::Ready(next)
    })
    .boxed()
}

#[tokio::test]
async fn test_winner_completion_is_terminal() -> anyhow::Result<()> {
    // Arrange
    let mut raced = amb(vec![strict(vec![StreamItem::Value(1)]), stream::pending().boxed()]);

    // Act
    assert_eq!(unwrap_value(Some(unwrap_stream(&mut raced, 500).await)), 1);

    // Assert
    assert_stream_ended(&mut raced, 500).await;
    assert_stream_ended(&mut raced, 500).await;

    Ok(())
}

#[tokio::test]
async fn test_winner_error_is_terminal() -> anyhow::Result<()> {
    // Arrange
    let failing = strict(vec![
        StreamItem::Value(1),
        StreamItem::Error(CofluxError::stream_error("winner failed")),
    ]);
    let mut raced = amb(vec![failing, stream::pending().boxed()]);

    // Act
    assert_eq!(unwrap_value(Some(unwrap_stream(&mut raced, 500).await)), 1);
    assert!(matches!(
        unwrap_stream(&mut raced, 500).await,
        StreamItem::Error(_)
    ));

    // Assert
    assert_stream_ended(&mut raced, 500).await;

    Ok(())
}
