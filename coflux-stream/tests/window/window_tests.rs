// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use coflux_core::StreamItem;
use coflux_stream::prelude::*;
use coflux_test_utils::{collect_values, test_channel, unwrap_stream, unwrap_value};
use futures::stream::{self, Stream};

fn source(n: u32) -> impl Stream<Item = StreamItem<u32>> {
    stream::iter((1..=n).map(StreamItem::Value))
}

#[tokio::test]
async fn test_chunked_then_flatten_reconstructs_input() -> anyhow::Result<()> {
    for size in 1..=7 {
        // Arrange
        let expected: Vec<u32> = (1..=20).collect();

        // Act
        let chunks = collect_values(source(20).chunked(size)).await?;

        // Assert
        assert!(chunks.iter().all(|c| !c.is_empty() && c.len() <= size));
        assert_eq!(chunks.concat(), expected, "chunk size {size}");
    }

    Ok(())
}

#[tokio::test]
async fn test_chunked_keeps_short_tail() -> anyhow::Result<()> {
    // Act
    let chunks = collect_values(source(5).chunked(2)).await?;

    // Assert
    assert_eq!(chunks, vec![vec![1, 2], vec![3, 4], vec![5]]);

    Ok(())
}

#[tokio::test]
async fn test_sliding_flushes_shrinking_tail() -> anyhow::Result<()> {
    // Act
    let windows = collect_values(source(5).sliding(3)).await?;

    // Assert
    assert_eq!(
        windows,
        vec![
            vec![1, 2, 3],
            vec![2, 3, 4],
            vec![3, 4, 5],
            vec![4, 5],
            vec![5],
        ]
    );

    Ok(())
}

#[tokio::test]
async fn test_windowed_with_step() -> anyhow::Result<()> {
    // Act
    let windows = collect_values(source(5).windowed(3, 2)).await?;

    // Assert
    assert_eq!(windows, vec![vec![1, 2, 3], vec![3, 4, 5], vec![5]]);

    Ok(())
}

#[tokio::test]
async fn test_windowed_window_counts_on_ten_items() -> anyhow::Result<()> {
    // Act
    let by_one = collect_values(source(10).windowed(5, 1)).await?;
    let by_four = collect_values(source(10).windowed(5, 4)).await?;
    let by_five = collect_values(source(10).windowed(5, 5)).await?;

    // Assert
    assert_eq!(by_one.len(), 10);
    assert_eq!(by_one[5], vec![6, 7, 8, 9, 10]);
    assert_eq!(by_one[9], vec![10]);
    assert_eq!(
        by_four,
        vec![vec![1, 2, 3, 4, 5], vec![5, 6, 7, 8, 9], vec![9, 10]]
    );
    assert_eq!(by_five, vec![vec![1, 2, 3, 4, 5], vec![6, 7, 8, 9, 10]]);

    Ok(())
}

#[tokio::test]
async fn test_windowed_step_equal_to_size_never_overlaps() -> anyhow::Result<()> {
    // Act
    let windows = collect_values(source(12).windowed(4, 4)).await?;

    // Assert
    let covered: Vec<u32> = windows.concat();
    assert_eq!(covered, (1..=12).collect::<Vec<_>>());
    assert_eq!(windows.len(), 3);

    Ok(())
}

#[tokio::test]
async fn test_buffered_sliding_grows_then_slides_without_tail() -> anyhow::Result<()> {
    // Act
    let windows = collect_values(source(5).buffered_sliding(3)).await?;

    // Assert
    assert_eq!(
        windows,
        vec![
            vec![1],
            vec![1, 2],
            vec![1, 2, 3],
            vec![2, 3, 4],
            vec![3, 4, 5],
        ]
    );

    Ok(())
}

#[tokio::test]
async fn test_pairwise_emits_consecutive_pairs() -> anyhow::Result<()> {
    // Act
    let pairs = collect_values(source(4).pairwise()).await?;
    let single = collect_values(source(1).pairwise()).await?;

    // Assert
    assert_eq!(pairs, vec![(1, 2), (2, 3), (3, 4)]);
    assert!(single.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_windows_are_emitted_as_soon_as_full() -> anyhow::Result<()> {
    // Arrange
    let (tx, stream) = test_channel::<u32>();
    let mut windows = stream.sliding(2);

    // Act
    tx.try_send(1)?;
    tx.try_send(2)?;

    // Assert - no need to wait for completion
    assert_eq!(
        unwrap_value(Some(unwrap_stream(&mut windows, 500).await)),
        vec![1, 2]
    );

    Ok(())
}

#[test]
#[should_panic = "windowed: step must not exceed size"]
fn test_step_larger_than_size_is_rejected() {
    let _ = source(3).windowed(2, 3);
}

#[test]
#[should_panic = "windowed: size must be positive"]
fn test_zero_size_is_rejected() {
    let _ = source(3).chunked(0);
}
