// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use coflux_core::StreamItem;
use coflux_stream::prelude::*;
use coflux_test_utils::{
    assert_stream_ended, collect_values, test_channel, unwrap_stream, unwrap_value, ManualClock,
};
use futures::{stream, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn values(range: std::ops::RangeInclusive<i32>) -> impl futures::Stream<Item = StreamItem<i32>> + Send {
    stream::iter(range.map(StreamItem::Value))
}

#[tokio::test]
async fn test_publish_with_shares_one_upstream_between_consumers() -> anyhow::Result<()> {
    // Arrange
    let pulls = Arc::new(AtomicUsize::new(0));
    let source = {
        let pulls = pulls.clone();
        values(1..=4).inspect(move |_| {
            pulls.fetch_add(1, Ordering::SeqCst);
        })
    };

    // Act
    let output = source.publish_with(2, |hub| {
        let tens = hub.subscribe().map(|item| item.map(|x| x * 10));
        stream::select(hub.subscribe(), tens)
    });
    let mut result = collect_values(output).await?;

    // Assert
    result.sort_unstable();
    assert_eq!(result, vec![1, 2, 3, 4, 10, 20, 30, 40]);
    assert_eq!(pulls.load(Ordering::SeqCst), 4);

    Ok(())
}

#[tokio::test]
async fn test_multicast_is_lazy_until_polled() -> anyhow::Result<()> {
    // Arrange
    let pulls = Arc::new(AtomicUsize::new(0));
    let source = {
        let pulls = pulls.clone();
        values(1..=3).inspect(move |_| {
            pulls.fetch_add(1, Ordering::SeqCst);
        })
    };
    let output = source.publish(|hub| hub.subscribe());

    // Act
    tokio::time::sleep(Duration::from_millis(20)).await;

    // Assert
    assert_eq!(pulls.load(Ordering::SeqCst), 0);
    assert_eq!(collect_values(output).await?, vec![1, 2, 3]);

    Ok(())
}

#[tokio::test]
async fn test_replay_sized_late_consumer_sees_last_two() -> anyhow::Result<()> {
    // Arrange
    let source = values(1..=5);

    // Act - the only consumer attaches once the upstream is long finished
    let output = source.replay_sized(2, |hub| {
        stream::once(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            hub.subscribe()
        })
        .flatten()
    });

    // Assert
    assert_eq!(collect_values(output).await?, vec![4, 5]);

    Ok(())
}

#[tokio::test]
async fn test_replay_late_consumer_sees_whole_history() -> anyhow::Result<()> {
    // Arrange
    let (tx, source) = test_channel::<i32>();
    let mut output = source
        .replay(|hub| {
            stream::once(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                hub.subscribe().map(|item| item.map(|x| -x))
            })
            .flatten()
        })
        .boxed();

    // Act
    tx.try_send(1)?;
    tx.try_send(2)?;
    drop(tx);

    // Assert
    assert_eq!(unwrap_value(Some(unwrap_stream(&mut output, 500).await)), -1);
    assert_eq!(unwrap_value(Some(unwrap_stream(&mut output, 500).await)), -2);
    assert_stream_ended(&mut output, 500).await;

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_replay_with_time_source_drops_aged_items() -> anyhow::Result<()> {
    // Arrange
    let clock = ManualClock::new();
    let (tx, source) = test_channel::<&'static str>();
    let output = {
        let clock = clock.clone();
        source.replay_with_time_source(10, Duration::from_millis(100), clock.shared(), move |hub| {
            stream::once(async move {
                tokio::time::sleep(Duration::from_millis(500)).await;
                hub.subscribe()
            })
            .flatten()
        })
    };
    let collector = tokio::spawn(collect_values(output));

    // Act
    tx.try_send("stale")?;
    tokio::time::sleep(Duration::from_millis(10)).await;
    clock.advance(Duration::from_millis(150));
    tx.try_send("fresh")?;
    drop(tx);

    // Assert
    assert_eq!(collector.await??, vec!["fresh"]);

    Ok(())
}

#[tokio::test]
async fn test_multicast_accepts_custom_subject_factory() -> anyhow::Result<()> {
    // Arrange
    let source = values(1..=3);

    // Act
    let output = source.multicast(
        || BehaviorSubject::new(0),
        |hub| hub.subscribe(),
    );

    // Assert - the seed value is visible to the consumer, then the upstream
    let result = collect_values(output).await?;
    assert_eq!(result.first(), Some(&0));
    assert_eq!(result.last(), Some(&3));

    Ok(())
}
