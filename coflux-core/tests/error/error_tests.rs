// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use coflux_core::{CofluxError, Event, IntoCofluxError, ResultExt, StreamItem};
use std::io;

#[test]
fn test_clone_keeps_user_error_message() {
    let err = CofluxError::user_error(io::Error::other("disk gone"));

    let cloned = err.clone();

    match cloned {
        CofluxError::StreamProcessingError { context } => assert!(context.contains("disk gone")),
        other => panic!("unexpected clone: {other:?}"),
    }
}

#[test]
fn test_context_wraps_user_errors_only() {
    let user: Result<(), CofluxError> = Err(CofluxError::user_error(io::Error::other("io")));
    let violation: Result<(), CofluxError> = Err(CofluxError::protocol_violation("twice"));

    assert!(matches!(
        user.context("loading"),
        Err(CofluxError::StreamProcessingError { context }) if context == "loading: io"
    ));
    assert!(violation.context("loading").unwrap_err().is_protocol_violation());
}

#[test]
fn test_into_coflux_error_with_and_without_context() {
    let bare = io::Error::other("x").into_coflux();
    let with_context = io::Error::other("x").into_coflux_error("reading");

    assert!(matches!(bare, CofluxError::UserError(_)));
    assert_eq!(with_context.to_string(), "Stream processing error: reading: x");
}

#[test]
fn test_cancellation_predicate() {
    assert!(CofluxError::Cancelled.is_cancellation());
    assert!(!CofluxError::stream_error("x").is_cancellation());
}

#[test]
fn test_event_round_trips_stream_items() {
    let value: Event<i32> = Some(StreamItem::Value(3)).into();
    let complete: Event<i32> = None.into();
    let error: Event<i32> = StreamItem::Error(CofluxError::stream_error("e")).into();

    assert_eq!(value, Event::Value(3));
    assert_eq!(complete, Event::Complete);
    assert!(error.is_terminal());
    assert!(complete.into_item().is_none());
    assert_eq!(value.map(|v| v * 2).into_item(), Some(StreamItem::Value(6)));
}
