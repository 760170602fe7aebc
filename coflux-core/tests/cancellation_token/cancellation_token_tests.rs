// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use coflux_core::{CancellationToken, CofluxTask};
use futures::FutureExt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};

#[test]
fn test_cancel_is_idempotent_and_shared_by_clones() {
    let token = CancellationToken::new();
    let clone = token.clone();
    assert!(!clone.is_cancelled());

    token.cancel();
    token.cancel();

    assert!(clone.is_cancelled());
    assert!(clone.cancelled().now_or_never().is_some());
}

#[tokio::test]
async fn test_all_waiters_are_released() -> anyhow::Result<()> {
    // Arrange
    let token = CancellationToken::new();
    let released = Arc::new(AtomicUsize::new(0));
    let handles: Vec<_> = (0..10)
        .map(|_| {
            let token = token.clone();
            let released = released.clone();
            tokio::spawn(async move {
                token.cancelled().await;
                released.fetch_add(1, Ordering::SeqCst);
            })
        })
        .collect();
    sleep(Duration::from_millis(10)).await;

    // Act
    token.cancel();

    // Assert
    for handle in handles {
        timeout(Duration::from_millis(200), handle).await??;
    }
    assert_eq!(released.load(Ordering::SeqCst), 10);

    Ok(())
}

#[tokio::test]
async fn test_dropping_task_cancels_its_token() -> anyhow::Result<()> {
    // Arrange
    let stopped = Arc::new(AtomicBool::new(false));
    let task = {
        let stopped = stopped.clone();
        CofluxTask::spawn(move |cancel| async move {
            cancel.cancelled().await;
            stopped.store(true, Ordering::SeqCst);
        })
    };
    sleep(Duration::from_millis(10)).await;
    assert!(!stopped.load(Ordering::SeqCst));

    // Act
    drop(task);
    sleep(Duration::from_millis(10)).await;

    // Assert
    assert!(stopped.load(Ordering::SeqCst));

    Ok(())
}
