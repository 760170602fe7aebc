// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use coflux_core::{CofluxError, StreamItem};
use coflux_stream::prelude::*;
use coflux_test_utils::{
    assert_stream_ended, test_channel_with_errors, unwrap_stream, unwrap_value, ErrorInjectingStream,
};
use futures::stream;

#[tokio::test]
async fn test_error_discards_partial_window_and_terminates() -> anyhow::Result<()> {
    // Arrange
    let (tx, stream) = test_channel_with_errors::<i32>();
    let mut windows = stream.chunked(2);

    // Act
    for item in [
        StreamItem::Value(1),
        StreamItem::Value(2),
        StreamItem::Value(3),
        StreamItem::Error(CofluxError::stream_error("mid-window")),
        StreamItem::Value(4),
    ] {
        tx.try_send(item)?;
    }

    // Assert
    assert_eq!(
        unwrap_value(Some(unwrap_stream(&mut windows, 500).await)),
        vec![1, 2]
    );
    assert!(matches!(
        unwrap_stream(&mut windows, 500).await,
        StreamItem::Error(_)
    ));
    assert_stream_ended(&mut windows, 500).await;

    Ok(())
}

#[tokio::test]
async fn test_pairwise_forwards_error() -> anyhow::Result<()> {
    // Arrange
    let source = ErrorInjectingStream::new(stream::iter([1, 2, 3]), 2);
    let mut pairs = Box::pin(source.pairwise());

    // Assert
    assert_eq!(
        unwrap_value(Some(unwrap_stream(&mut pairs, 500).await)),
        (1, 2)
    );
    assert!(matches!(
        unwrap_stream(&mut pairs, 500).await,
        StreamItem::Error(_)
    ));
    assert_stream_ended(&mut pairs, 500).await;

    Ok(())
}
