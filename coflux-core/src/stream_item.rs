// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::coflux_error::CofluxError;

/// An item travelling through a coflux stream: a value or a terminal error.
///
/// Normal completion is the end of the stream (`None` from `poll_next`), so
/// the three terminal outcomes stay mutually exclusive: after an `Error`
/// operators stop emitting.
#[derive(Debug, Clone)]
pub enum StreamItem<T> {
    Value(T),
    Error(CofluxError),
}

impl<T: PartialEq> PartialEq for StreamItem<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (StreamItem::Value(a), StreamItem::Value(b)) => a == b,
            _ => false, // Errors are never equal
        }
    }
}

impl<T> StreamItem<T> {
    pub const fn is_value(&self) -> bool {
        matches!(self, StreamItem::Value(_))
    }

    pub const fn is_error(&self) -> bool {
        matches!(self, StreamItem::Error(_))
    }

    /// Converts into `Option<T>`, discarding an error.
    pub fn ok(self) -> Option<T> {
        match self {
            StreamItem::Value(v) => Some(v),
            StreamItem::Error(_) => None,
        }
    }

    /// Converts into `Option<CofluxError>`, discarding a value.
    pub fn err(self) -> Option<CofluxError> {
        match self {
            StreamItem::Value(_) => None,
            StreamItem::Error(e) => Some(e),
        }
    }

    pub fn as_value(&self) -> Option<&T> {
        match self {
            StreamItem::Value(v) => Some(v),
            StreamItem::Error(_) => None,
        }
    }

    pub fn map<U, F>(self, f: F) -> StreamItem<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            StreamItem::Value(v) => StreamItem::Value(f(v)),
            StreamItem::Error(e) => StreamItem::Error(e),
        }
    }

    pub fn and_then<U, F>(self, f: F) -> StreamItem<U>
    where
        F: FnOnce(T) -> StreamItem<U>,
    {
        match self {
            StreamItem::Value(v) => f(v),
            StreamItem::Error(e) => StreamItem::Error(e),
        }
    }

    /// Returns the value.
    ///
    /// # Panics
    ///
    /// Panics if the item is an `Error`.
    pub fn unwrap(self) -> T {
        match self {
            StreamItem::Value(v) => v,
            StreamItem::Error(e) => {
                panic!("called `StreamItem::unwrap()` on an `Error` value: {e:?}")
            }
        }
    }

    /// Returns the value.
    ///
    /// # Panics
    ///
    /// Panics with `msg` if the item is an `Error`.
    pub fn expect(self, msg: &str) -> T {
        match self {
            StreamItem::Value(v) => v,
            StreamItem::Error(e) => panic!("{msg}: {e:?}"),
        }
    }
}

impl<T> From<Result<T, CofluxError>> for StreamItem<T> {
    fn from(result: Result<T, CofluxError>) -> Self {
        match result {
            Ok(v) => StreamItem::Value(v),
            Err(e) => StreamItem::Error(e),
        }
    }
}

impl<T> From<StreamItem<T>> for Result<T, CofluxError> {
    fn from(item: StreamItem<T>) -> Self {
        match item {
            StreamItem::Value(v) => Ok(v),
            StreamItem::Error(e) => Err(e),
        }
    }
}
