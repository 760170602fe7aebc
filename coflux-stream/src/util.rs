// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use coflux_core::CancellationToken;
use core::future::Future;
use futures::FutureExt;

/// Runs `fut` until it resolves or `cancel` fires, whichever comes first.
///
/// Returns `None` when cancellation won. Cancellation is checked first on
/// every poll, so a token cancelled before the call never lets `fut` start.
pub(crate) async fn until_cancelled<F>(cancel: &CancellationToken, fut: F) -> Option<F::Output>
where
    F: Future,
{
    let cancelled = cancel.cancelled().fuse();
    let fut = fut.fuse();
    futures::pin_mut!(cancelled, fut);

    futures::select_biased! {
        () = cancelled => None,
        output = fut => Some(output),
    }
}
