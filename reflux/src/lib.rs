// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! # Reflux
//!
//! Demand-driven reactive streams with lock-free operators.
//!
//! ## Overview
//!
//! A [`Publisher`] produces values for a [`Subscriber`], which controls the flow by
//! requesting a number of values through the [`Subscription`] it receives. Nothing
//! is delivered beyond what was requested, and every subscriber sees at most one
//! terminal signal.
//!
//! The operators in this crate coordinate without locks:
//!
//! - [`ConcatIterable`] subscribes to a lazily produced sequence of sources one after
//!   another, carrying outstanding demand across them and running arbitrarily long
//!   chains of synchronous sources in constant stack depth.
//! - [`ScalarDelayed`] releases a single value once both the value and a request are
//!   present, whichever arrives first and from whichever thread.
//! - [`SkipWhile`] drops a leading run of values selected by a predicate.
//!
//! ## Quick Start
//!
//! ```rust
//! use reflux_rs::prelude::*;
//! use reflux_test_utils::{sources, TestSubscriber};
//!
//! let first_large = sources::range(0, 5)
//!     .concat_with(sources::range(100, 5))
//!     .skip_while(|n| *n < 3)
//!     .next();
//!
//! let subscriber = TestSubscriber::<u64>::manual();
//! first_large.subscribe(subscriber.clone());
//! subscriber.request(1);
//!
//! subscriber.assert_values(&[3]);
//! subscriber.assert_complete();
//! ```
//!
//! ## Diagnostics
//!
//! Signals that cannot be delivered, such as a value arriving after completion or a
//! request for zero items, never reach the downstream. Operators report them to a
//! [`Diagnostics`] handle instead; by default they are logged (through `tracing` with
//! the `tracing` feature).

// Re-export the contract
pub use reflux_core::{
    Diagnostics, DiagnosticSink, DroppedSignal, Introspect, Lifecycle, Publisher,
    PublisherRef, Subscriber, SubscriberRef, Subscription, SubscriptionRef, UNBOUNDED,
};

// Re-export the coordination primitives
pub use reflux_core::{Drain, MultiSubscription, Trampoline};

// Re-export the operators
pub use reflux_stream::{
    concat, concat_from_fn, ConcatIterable, FromFn, IterSources, Next, PublisherExt,
    ScalarDelayed, SkipWhile, Sources,
};

// Re-export error types
pub use reflux_error::{IntoRefluxError, RefluxError, Result, ResultExt};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        concat, Publisher, PublisherExt, PublisherRef, RefluxError, Subscriber, Subscription,
        SubscriptionRef, UNBOUNDED,
    };
}
