// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Time abstractions consumed by coflux operators.
//!
//! - [`timer::Timer`] creates sleep futures for gates that wait on a window
//! - [`time_source::TimeSource`] reports monotonic "now" for age-bounded buffers
//! - [`runtime::Runtime`] bundles the default choice of both

pub mod impls;
pub mod runtime;
pub mod time_source;
pub mod timer;
