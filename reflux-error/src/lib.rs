// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![allow(clippy::multiple_crate_versions)]
//! Error types for the Reflux reactive streams core
//!
//! Every terminal failure travelling through a Reflux pipeline is a [`RefluxError`].
//! The variants follow the failure classes a demand-driven pipeline distinguishes:
//! collaborators that break the signalling contract, upstream failures, and
//! errors raised by user-supplied callbacks.
//!
//! # Examples
//!
//! ```
//! use reflux_error::{RefluxError, Result};
//!
//! fn next_source() -> Result<()> {
//!     Err(RefluxError::missing_source("iterator yielded no source"))
//! }
//!
//! assert!(next_source().unwrap_err().is_protocol_violation());
//! ```

/// Root error type for all Reflux operations
///
/// An error delivered through `on_error` terminates the chain it travels on.
#[derive(Debug, thiserror::Error)]
pub enum RefluxError {
    /// A collaborator broke the signalling contract
    ///
    /// Examples are a producer emitting past the requested amount or a second
    /// terminal signal.
    #[error("Protocol violation: {context}")]
    ProtocolViolation {
        /// What the collaborator did wrong
        context: String,
    },

    /// A source iterator announced another source but did not yield one
    #[error("Missing source: {context}")]
    MissingSource {
        /// Where the source was expected
        context: String,
    },

    /// Stream processing encountered an error
    ///
    /// General failure reported by a producer that does not fit the other variants.
    #[error("Stream processing error: {context}")]
    StreamProcessingError {
        /// Description of what went wrong during stream processing
        context: String,
    },

    /// Custom error from user code
    ///
    /// Wraps failures of predicates, source factories and source iterators.
    #[error("User error: {0}")]
    UserError(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl RefluxError {
    /// Create a protocol violation error with the given context
    pub fn protocol_violation(context: impl Into<String>) -> Self {
        Self::ProtocolViolation {
            context: context.into(),
        }
    }

    /// Create a missing source error with the given context
    pub fn missing_source(context: impl Into<String>) -> Self {
        Self::MissingSource {
            context: context.into(),
        }
    }

    /// Create a stream processing error with the given context
    pub fn stream_error(context: impl Into<String>) -> Self {
        Self::StreamProcessingError {
            context: context.into(),
        }
    }

    /// Wrap a user error
    pub fn user_error(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::UserError(Box::new(error))
    }

    /// Check if this error reports a collaborator breaking the contract
    #[must_use]
    pub const fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            Self::ProtocolViolation { .. } | Self::MissingSource { .. }
        )
    }

    /// Check if this error indicates a permanent failure
    ///
    /// Reflux never retries, but higher layers may choose to resubscribe on
    /// upstream processing errors. Contract violations and user errors are permanent.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        !matches!(self, Self::StreamProcessingError { .. })
    }
}

/// Specialized Result type for Reflux operations
///
/// # Examples
///
/// ```
/// use reflux_error::Result;
///
/// fn accept() -> Result<bool> {
///     Ok(true)
/// }
/// ```
pub type Result<T> = std::result::Result<T, RefluxError>;

/// Extension trait for converting errors into `RefluxError`
///
/// Implemented for every `std::error::Error + Send + Sync + 'static`.
pub trait IntoRefluxError {
    /// Convert this error into a `RefluxError` with additional context
    fn into_reflux_error(self, context: &str) -> RefluxError;

    /// Convert this error into a `RefluxError` without additional context
    fn into_reflux(self) -> RefluxError
    where
        Self: Sized,
    {
        self.into_reflux_error("")
    }
}

impl<E: std::error::Error + Send + Sync + 'static> IntoRefluxError for E {
    fn into_reflux_error(self, context: &str) -> RefluxError {
        if context.is_empty() {
            RefluxError::user_error(self)
        } else {
            RefluxError::stream_error(format!("{context}: {self}"))
        }
    }
}

/// Helper trait for adding context to `Result`s
pub trait ResultExt<T> {
    /// Add context to an error
    ///
    /// # Errors
    /// Returns `Err(RefluxError)` if the underlying result is `Err`.
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context to an error using a closure (lazy evaluation)
    ///
    /// # Errors
    /// Returns `Err(RefluxError)` if the underlying result is `Err`.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<RefluxError>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| wrap_user_error(e.into(), context.into()))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| wrap_user_error(e.into(), f()))
    }
}

fn wrap_user_error(error: RefluxError, context: String) -> RefluxError {
    match error {
        RefluxError::UserError(inner) => RefluxError::StreamProcessingError {
            context: format!("{context}: {inner}"),
        },
        other => other,
    }
}

impl Clone for RefluxError {
    fn clone(&self) -> Self {
        match self {
            Self::ProtocolViolation { context } => Self::ProtocolViolation {
                context: context.clone(),
            },
            Self::MissingSource { context } => Self::MissingSource {
                context: context.clone(),
            },
            Self::StreamProcessingError { context } => Self::StreamProcessingError {
                context: context.clone(),
            },
            // The boxed source cannot be cloned, keep its message
            Self::UserError(e) => Self::StreamProcessingError {
                context: format!("User error: {e}"),
            },
        }
    }
}
