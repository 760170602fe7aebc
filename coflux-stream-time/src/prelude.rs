// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Extension traits and option types for the timed operators.
//!
//! ```
//! use coflux_stream_time::prelude::*;
//! ```

pub use crate::debounce::DebounceExt;
pub use crate::throttle::{ThrottleBehavior, ThrottleExt};
