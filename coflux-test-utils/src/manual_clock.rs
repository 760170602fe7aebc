// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use coflux_runtime::time_source::{SharedTimeSource, TimeSource};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A [`TimeSource`] that only moves when the test says so.
///
/// Clones share the same reading, so one handle can be given to an operator
/// while the test keeps another to advance it.
///
/// ```rust
/// use coflux_test_utils::ManualClock;
/// use coflux_runtime::time_source::TimeSource;
/// use std::time::Duration;
///
/// let clock = ManualClock::new();
/// clock.advance(Duration::from_millis(250));
/// assert_eq!(clock.now(), Duration::from_millis(250));
/// ```
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    millis: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.millis.fetch_add(duration_millis(by), Ordering::SeqCst);
    }

    pub fn set(&self, at: Duration) {
        self.millis.store(duration_millis(at), Ordering::SeqCst);
    }

    pub fn shared(&self) -> SharedTimeSource {
        Arc::new(self.clone())
    }
}

impl TimeSource for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_millis(self.millis.load(Ordering::SeqCst))
    }
}

fn duration_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
