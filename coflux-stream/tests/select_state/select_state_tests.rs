// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use coflux_core::{CofluxError, StreamItem};
use coflux_stream::prelude::*;
use coflux_test_utils::{
    assert_no_element_emitted, assert_stream_ended, collect_values, test_channel, unwrap_stream,
    unwrap_value,
};
use futures::{stream, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Clone, Debug)]
struct Session {
    user: &'static str,
    unread: u32,
    ticks: u64,
}

fn session(user: &'static str, unread: u32, ticks: u64) -> Session {
    Session {
        user,
        unread,
        ticks,
    }
}

#[tokio::test]
async fn test_select_state_emits_only_changes() -> anyhow::Result<()> {
    // Arrange
    let (tx, states) = test_channel::<Session>();
    let mut users = states.select_state(|s: &Session| Ok(s.user));

    // Act & Assert
    tx.try_send(session("ann", 0, 1))?;
    assert_eq!(unwrap_value(Some(unwrap_stream(&mut users, 500).await)), "ann");

    tx.try_send(session("ann", 4, 2))?;
    assert_no_element_emitted(&mut users, 50).await;

    tx.try_send(session("bob", 4, 3))?;
    assert_eq!(unwrap_value(Some(unwrap_stream(&mut users, 500).await)), "bob");

    drop(tx);
    assert_stream_ended(&mut users, 500).await;

    Ok(())
}

#[tokio::test]
async fn test_select_projected_skips_projector_for_unchanged_selection() -> anyhow::Result<()> {
    // Arrange
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let states = stream::iter([
        session("ann", 1, 1),
        session("ann", 1, 2),
        session("ann", 1, 3),
        session("ann", 2, 4),
    ])
    .map(StreamItem::Value);

    // Act
    let badges = collect_values(states.select_projected(
        |s: &Session| Ok(s.unread),
        move |unread: &u32| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(format!("{unread} unread"))
        },
    ))
    .await?;

    // Assert
    assert_eq!(badges, vec!["1 unread".to_string(), "2 unread".to_string()]);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    Ok(())
}

#[tokio::test]
async fn test_select_projected_skips_equal_results() -> anyhow::Result<()> {
    // Arrange
    let states = stream::iter([
        session("ann", 0, 1),
        session("ann", 0, 2),
        session("ann", 3, 3),
        session("bob", 5, 4),
    ])
    .map(StreamItem::Value);

    // Act - the selection changes on every tick but the projection only once
    let projected = collect_values(
        states.select_projected(|s: &Session| Ok((s.user, s.ticks)), |_: &(&str, u64)| Ok(true)),
    )
    .await?;

    // Assert
    assert_eq!(projected, vec![true]);

    Ok(())
}

#[tokio::test]
async fn test_select_state_selector_error_is_terminal() -> anyhow::Result<()> {
    // Arrange
    let (tx, states) = test_channel::<Session>();
    let mut unread = states.select_state(|s: &Session| {
        if s.user.is_empty() {
            Err(CofluxError::stream_error("missing user"))
        } else {
            Ok(s.unread)
        }
    });

    // Act
    tx.try_send(session("ann", 1, 1))?;
    tx.try_send(session("", 2, 2))?;
    tx.try_send(session("ann", 3, 3))?;

    // Assert
    assert_eq!(unwrap_value(Some(unwrap_stream(&mut unread, 500).await)), 1);
    assert!(matches!(
        unwrap_stream(&mut unread, 500).await,
        StreamItem::Error(_)
    ));
    assert_stream_ended(&mut unread, 500).await;

    Ok(())
}
