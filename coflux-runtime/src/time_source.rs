// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Injectable monotonic clocks.
//!
//! Operators that age data (replay buffers) never read the wall clock
//! directly; they ask a [`TimeSource`] for the elapsed time since an
//! arbitrary origin. Tests substitute a manual clock or a closure.
//!
//! ```
//! use coflux_runtime::time_source::TimeSource;
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let millis = Arc::new(AtomicU64::new(0));
//! let clock = {
//!     let millis = millis.clone();
//!     move || Duration::from_millis(millis.load(Ordering::SeqCst))
//! };
//!
//! millis.store(250, Ordering::SeqCst);
//! assert_eq!(clock.now(), Duration::from_millis(250));
//! ```

use core::fmt;
use core::time::Duration;
use std::sync::Arc;
use std::time::Instant;

/// Monotonic "current time" as the elapsed duration since a fixed origin.
pub trait TimeSource: Send + Sync + 'static {
    fn now(&self) -> Duration;
}

impl<F> TimeSource for F
where
    F: Fn() -> Duration + Send + Sync + 'static,
{
    fn now(&self) -> Duration {
        self()
    }
}

/// Shared, type-erased time source.
pub type SharedTimeSource = Arc<dyn TimeSource>;

/// Clock backed by [`std::time::Instant`].
#[derive(Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MonotonicClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonotonicClock")
            .field("elapsed", &self.origin.elapsed())
            .finish()
    }
}

impl TimeSource for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}
