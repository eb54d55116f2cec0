// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![allow(clippy::multiple_crate_versions, clippy::doc_markdown)]
//! Core contract and concurrency primitives for Reflux.
//!
//! Reflux pipelines follow a pull-based backpressure protocol: a [`Publisher`] hands
//! each [`Subscriber`] a [`Subscription`] through which the subscriber requests a
//! bounded number of values or cancels. Producers never emit more than requested.
//!
//! This crate holds the pieces every operator builds on:
//!
//! - the contract traits and their `Arc` aliases,
//! - [`MultiSubscription`], a demand carrier that lets an operator switch upstream
//!   subscriptions without the downstream noticing,
//! - [`Trampoline`], the work-counter drain loop that turns re-entrant signals into
//!   iteration,
//! - [`Diagnostics`], the pluggable sink for signals that cannot be delivered,
//! - [`Introspect`], optional lifecycle inspection for operators.
//!
//! None of these take a lock. Shared state is mutated with atomic operations only.

#[macro_use]
mod logging;

pub mod diagnostics;
pub mod introspect;
pub mod multi_subscription;
pub mod publisher;
pub mod subscriber;
pub mod subscription;
pub mod trampoline;

pub use self::diagnostics::{DiagnosticSink, Diagnostics, DroppedSignal};
pub use self::introspect::{Introspect, Lifecycle};
pub use self::multi_subscription::MultiSubscription;
pub use self::publisher::{Publisher, PublisherRef};
pub use self::subscriber::{Subscriber, SubscriberRef};
pub use self::subscription::{
    add_cap, set_once, validate_request, EmptySubscription, Subscription, SubscriptionRef,
    UNBOUNDED,
};
pub use self::trampoline::{Drain, Trampoline};
pub use reflux_error::{IntoRefluxError, RefluxError, Result, ResultExt};
