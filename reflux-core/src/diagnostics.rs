// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Reporting of signals that cannot be delivered.
//!
//! A misbehaving producer may keep signalling after its sequence terminated, or a
//! subscriber may request a zero amount. Such signals are never delivered and never
//! silently swallowed: operators hand them to a [`Diagnostics`] sink supplied by the
//! host application. The default sink logs them.
//!
//! ```
//! use reflux_core::{Diagnostics, DroppedSignal};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let dropped = Arc::new(AtomicUsize::new(0));
//! let counter = dropped.clone();
//! let diagnostics = Diagnostics::from_fn(move |_signal| {
//!     counter.fetch_add(1, Ordering::Relaxed);
//! });
//!
//! diagnostics.report(DroppedSignal::Complete);
//! assert_eq!(dropped.load(Ordering::Relaxed), 1);
//! ```

use crate::RefluxError;
use std::fmt;
use std::sync::Arc;

/// A signal that was not delivered, or a demand call that was rejected.
#[derive(Debug, Clone)]
pub enum DroppedSignal {
    /// `on_next` arrived after the sequence terminated
    Next {
        /// Type of the dropped value
        type_name: &'static str,
    },
    /// `on_error` arrived after the sequence terminated
    Error(RefluxError),
    /// `on_complete` arrived after the sequence terminated
    Complete,
    /// `request` was called with a non-positive amount
    BadRequest {
        /// The rejected amount
        requested: u64,
    },
    /// `on_subscribe` was called a second time
    DuplicateSubscription,
    /// A producer emitted more values than were requested from it
    ExcessProduction {
        /// Outstanding demand when the production was accounted
        requested: u64,
        /// Amount reported as produced
        produced: u64,
    },
}

impl DroppedSignal {
    /// Describes a dropped `on_next` carrying a `T`.
    #[must_use]
    pub fn next<T>() -> Self {
        Self::Next {
            type_name: std::any::type_name::<T>(),
        }
    }
}

impl fmt::Display for DroppedSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Next { type_name } => write!(f, "on_next({type_name}) after termination"),
            Self::Error(error) => write!(f, "on_error after termination: {error}"),
            Self::Complete => write!(f, "on_complete after termination"),
            Self::BadRequest { requested } => {
                write!(f, "request({requested}) rejected: amount must be positive")
            }
            Self::DuplicateSubscription => write!(f, "on_subscribe called more than once"),
            Self::ExcessProduction {
                requested,
                produced,
            } => write!(
                f,
                "produced {produced} values against {requested} outstanding requests"
            ),
        }
    }
}

/// Destination of dropped signals.
pub trait DiagnosticSink: Send + Sync {
    /// Receives one dropped signal. May be called from any thread.
    fn on_dropped(&self, signal: DroppedSignal);
}

struct LoggingSink;

impl DiagnosticSink for LoggingSink {
    fn on_dropped(&self, signal: DroppedSignal) {
        warn!("Reflux dropped signal: {}", signal);
    }
}

struct SilentSink;

impl DiagnosticSink for SilentSink {
    fn on_dropped(&self, _signal: DroppedSignal) {}
}

struct FnSink<F>(F);

impl<F> DiagnosticSink for FnSink<F>
where
    F: Fn(DroppedSignal) + Send + Sync,
{
    fn on_dropped(&self, signal: DroppedSignal) {
        (self.0)(signal);
    }
}

/// Cheap-to-clone handle on a [`DiagnosticSink`].
///
/// Every operator carries one. Operators built with their plain constructors use
/// [`Diagnostics::logging`]; `with_diagnostics` constructors accept any other sink.
#[derive(Clone)]
pub struct Diagnostics {
    sink: Arc<dyn DiagnosticSink>,
}

impl Diagnostics {
    /// Sink that logs every dropped signal as a warning.
    #[must_use]
    pub fn logging() -> Self {
        Self::from_sink(Arc::new(LoggingSink))
    }

    /// Sink that discards everything.
    #[must_use]
    pub fn silent() -> Self {
        Self::from_sink(Arc::new(SilentSink))
    }

    /// Sink backed by a closure.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(DroppedSignal) + Send + Sync + 'static,
    {
        Self::from_sink(Arc::new(FnSink(f)))
    }

    /// Wraps an existing sink.
    #[must_use]
    pub fn from_sink(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self { sink }
    }

    /// Reports a dropped signal.
    pub fn report(&self, signal: DroppedSignal) {
        self.sink.on_dropped(signal);
    }

    /// Reports an `on_next` that arrived after termination.
    pub fn next_dropped<T>(&self) {
        self.report(DroppedSignal::next::<T>());
    }

    /// Reports an `on_error` that arrived after termination.
    pub fn error_dropped(&self, error: RefluxError) {
        self.report(DroppedSignal::Error(error));
    }

    /// Reports an `on_complete` that arrived after termination.
    pub fn complete_dropped(&self) {
        self.report(DroppedSignal::Complete);
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::logging()
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics").finish_non_exhaustive()
    }
}
