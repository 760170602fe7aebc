// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::{CofluxError, StreamItem};

/// A materialized stream signal.
///
/// Where [`StreamItem`] leaves completion implicit (the stream ends),
/// `Event` names all three cases so they can be stored, forwarded through a
/// channel or matched exhaustively.
#[derive(Debug, Clone)]
pub enum Event<T> {
    Value(T),
    Error(CofluxError),
    Complete,
}

impl<T> Event<T> {
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Event::Error(_) | Event::Complete)
    }

    pub fn map<U, F>(self, f: F) -> Event<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Event::Value(v) => Event::Value(f(v)),
            Event::Error(e) => Event::Error(e),
            Event::Complete => Event::Complete,
        }
    }

    /// Converts back into a stream item; `None` stands for completion.
    pub fn into_item(self) -> Option<StreamItem<T>> {
        match self {
            Event::Value(v) => Some(StreamItem::Value(v)),
            Event::Error(e) => Some(StreamItem::Error(e)),
            Event::Complete => None,
        }
    }
}

impl<T: PartialEq> PartialEq for Event<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Event::Value(a), Event::Value(b)) => a == b,
            (Event::Complete, Event::Complete) => true,
            _ => false,
        }
    }
}

impl<T> From<StreamItem<T>> for Event<T> {
    fn from(item: StreamItem<T>) -> Self {
        match item {
            StreamItem::Value(v) => Event::Value(v),
            StreamItem::Error(e) => Event::Error(e),
        }
    }
}

impl<T> From<Option<StreamItem<T>>> for Event<T> {
    fn from(item: Option<StreamItem<T>>) -> Self {
        item.map_or(Event::Complete, Event::from)
    }
}
