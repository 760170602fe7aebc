// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::time_source::TimeSource;
use crate::timer::Timer;

/// Default timer and clock of an async runtime.
pub trait Runtime: 'static {
    type Timer: Timer + Default;
    type Clock: TimeSource + Default;
}
