// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Error types for coflux stream operators.
//!
//! A single root [`CofluxError`] travels through streams as
//! [`StreamItem::Error`](crate::StreamItem::Error). It separates the failure
//! modes operators care about:
//!
//! - upstream and selector failures (`StreamProcessingError`, `UserError`)
//! - programming errors caught at runtime (`ProtocolViolation`)
//! - the internal `Cancelled` marker a producer sees once its consumer is gone
//!
//! # Examples
//!
//! ```
//! use coflux_core::{CofluxError, Result};
//!
//! fn parse(input: &str) -> Result<u32> {
//!     input
//!         .parse()
//!         .map_err(|_| CofluxError::stream_error(format!("not a number: {input}")))
//! }
//!
//! assert!(parse("x").is_err());
//! ```

/// Root error type for all coflux operations.
#[derive(Debug, thiserror::Error)]
pub enum CofluxError {
    /// Failure raised while processing a stream (usually the upstream source).
    #[error("Stream processing error: {context}")]
    StreamProcessingError {
        /// What went wrong.
        context: String,
    },

    /// Error produced by user code such as a selector callback.
    #[error("User error: {0}")]
    UserError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A usage contract was broken, e.g. a second concurrent wait on a
    /// [`Signal`](crate::Signal) or a partition subscribed twice.
    #[error("Protocol violation: {context}")]
    ProtocolViolation {
        /// Which contract was broken.
        context: String,
    },

    /// The consuming side went away. Producers use it to stop pulling.
    #[error("Consumer cancelled")]
    Cancelled,

    /// Several errors collected together.
    #[error("Multiple errors occurred: {count} errors")]
    MultipleErrors {
        /// Number of aggregated errors.
        count: usize,
        /// The aggregated errors.
        errors: Vec<CofluxError>,
    },
}

impl CofluxError {
    /// Creates a stream processing error with the given context.
    pub fn stream_error(context: impl Into<String>) -> Self {
        Self::StreamProcessingError {
            context: context.into(),
        }
    }

    /// Wraps an arbitrary user error.
    pub fn user_error(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::UserError(Box::new(error))
    }

    /// Creates a protocol violation error.
    pub fn protocol_violation(context: impl Into<String>) -> Self {
        Self::ProtocolViolation {
            context: context.into(),
        }
    }

    /// Aggregates user errors into a single [`CofluxError::MultipleErrors`].
    pub fn from_user_errors<E>(errors: Vec<E>) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let count = errors.len();
        let errors = errors
            .into_iter()
            .map(|e| Self::UserError(Box::new(e)))
            .collect();

        Self::MultipleErrors { count, errors }
    }

    #[must_use]
    pub const fn is_protocol_violation(&self) -> bool {
        matches!(self, Self::ProtocolViolation { .. })
    }

    #[must_use]
    pub const fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Specialized `Result` type for coflux operations.
pub type Result<T> = std::result::Result<T, CofluxError>;

/// Converts foreign errors into [`CofluxError`].
pub trait IntoCofluxError {
    fn into_coflux_error(self, context: &str) -> CofluxError;

    fn into_coflux(self) -> CofluxError
    where
        Self: Sized,
    {
        self.into_coflux_error("")
    }
}

impl<E: std::error::Error + Send + Sync + 'static> IntoCofluxError for E {
    fn into_coflux_error(self, context: &str) -> CofluxError {
        if context.is_empty() {
            CofluxError::user_error(self)
        } else {
            CofluxError::stream_error(format!("{context}: {self}"))
        }
    }
}

/// Adds context to results on their way into a stream.
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<CofluxError>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.with_context(|| context.into())
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| match e.into() {
            CofluxError::UserError(inner) => CofluxError::StreamProcessingError {
                context: format!("{}: {inner}", f()),
            },
            other => other,
        })
    }
}

impl Clone for CofluxError {
    fn clone(&self) -> Self {
        match self {
            Self::StreamProcessingError { context } => Self::StreamProcessingError {
                context: context.clone(),
            },
            // Boxed user errors cannot be cloned; keep the message.
            Self::UserError(e) => Self::StreamProcessingError {
                context: format!("User error: {e}"),
            },
            Self::ProtocolViolation { context } => Self::ProtocolViolation {
                context: context.clone(),
            },
            Self::Cancelled => Self::Cancelled,
            Self::MultipleErrors { count, errors } => Self::MultipleErrors {
                count: *count,
                errors: errors.clone(),
            },
        }
    }
}
