// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Core types for coflux stream operators.
//!
//! - [`StreamItem`] / [`Event`]: what flows through streams
//! - [`CofluxError`]: the error taxonomy shared by every operator
//! - [`Signal`] and [`SlotHandoff`]: the suspension primitives operators use
//!   to coordinate producer and consumer tasks
//! - [`CancellationToken`] and [`CofluxTask`]: lifetime of background tasks

#![allow(clippy::multiple_crate_versions, clippy::doc_markdown)]
pub mod cancellation_token;
pub mod coflux_error;
pub mod coflux_task;
pub mod event;
pub mod logging;
pub mod signal;
pub mod slot_handoff;
pub mod stream_item;

pub use self::cancellation_token::CancellationToken;
pub use self::coflux_error::{CofluxError, IntoCofluxError, Result, ResultExt};
pub use self::coflux_task::CofluxTask;
pub use self::event::Event;
pub use self::signal::{Signal, Wait};
pub use self::slot_handoff::{HandoffReceiver, HandoffSender, SlotHandoff};
pub use self::stream_item::StreamItem;
