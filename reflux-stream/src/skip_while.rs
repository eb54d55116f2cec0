// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Drops values from the start of a sequence while a predicate holds.
//!
//! Every dropped value is replaced by a `request(1)` upstream, so the downstream
//! receives as many values as it asked for. Once the predicate returns `false` it
//! is never evaluated again and values pass straight through.
//!
//! The operator has a single upstream and runs on the producer's thread; its flags
//! are atomics only because subscribers must be `Sync`.

use reflux_core::{
    set_once, Diagnostics, Introspect, Lifecycle, Publisher, PublisherRef, RefluxError,
    Result, Subscriber, SubscriberRef, Subscription, SubscriptionRef,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};

/// Publisher skipping the leading values of `source` that match a fallible
/// predicate.
///
/// A predicate `Err` cancels the source and fails the downstream with that
/// error. Panics inside the predicate are not caught.
///
/// # Examples
///
/// ```
/// use reflux_core::Publisher;
/// use reflux_stream::SkipWhile;
/// use reflux_test_utils::{sources, TestSubscriber};
///
/// let skip = SkipWhile::new(sources::from_iter(vec![1, 2, 5, 1]), |v: &i32| Ok(*v < 3));
/// let subscriber = TestSubscriber::<i32>::new();
/// skip.subscribe(subscriber.clone());
///
/// subscriber.assert_values(&[5, 1]);
/// subscriber.assert_complete();
/// ```
pub struct SkipWhile<T, P> {
    source: PublisherRef<T>,
    predicate: Arc<P>,
    diagnostics: Diagnostics,
}

impl<T, P> SkipWhile<T, P>
where
    P: Fn(&T) -> Result<bool>,
{
    pub fn new(source: PublisherRef<T>, predicate: P) -> Self {
        Self {
            source,
            predicate: Arc::new(predicate),
            diagnostics: Diagnostics::default(),
        }
    }

    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }
}

impl<T, P> Publisher<T> for SkipWhile<T, P>
where
    T: Send + 'static,
    P: Fn(&T) -> Result<bool> + Send + Sync + 'static,
{
    fn subscribe(&self, subscriber: SubscriberRef<T>) {
        let skipper = SkipWhileSubscriber::new(
            subscriber,
            Arc::clone(&self.predicate),
            self.diagnostics.clone(),
        );
        self.source.subscribe(skipper);
    }
}

/// Subscriber side of [`SkipWhile`]; also the subscription the downstream holds.
pub struct SkipWhileSubscriber<T, P> {
    downstream: SubscriberRef<T>,
    predicate: Arc<P>,
    upstream: OnceLock<SubscriptionRef>,
    skipping_done: AtomicBool,
    done: AtomicBool,
    cancelled: AtomicBool,
    diagnostics: Diagnostics,
    this: Weak<Self>,
}

impl<T, P> SkipWhileSubscriber<T, P>
where
    T: Send + 'static,
    P: Fn(&T) -> Result<bool> + Send + Sync + 'static,
{
    pub fn new(
        downstream: SubscriberRef<T>,
        predicate: Arc<P>,
        diagnostics: Diagnostics,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            downstream,
            predicate,
            upstream: OnceLock::new(),
            skipping_done: AtomicBool::new(false),
            done: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
            diagnostics,
            this: this.clone(),
        })
    }

    fn upstream(&self) -> Option<&SubscriptionRef> {
        self.upstream.get()
    }
}

impl<T, P> Subscriber<T> for SkipWhileSubscriber<T, P>
where
    T: Send + 'static,
    P: Fn(&T) -> Result<bool> + Send + Sync + 'static,
{
    fn on_subscribe(&self, subscription: SubscriptionRef) {
        if !set_once(&self.upstream, subscription, &self.diagnostics) {
            return;
        }
        if let Some(this) = self.this.upgrade() {
            self.downstream.on_subscribe(this);
        }
    }

    fn on_next(&self, value: T) {
        if self.done.load(Ordering::Acquire) {
            self.diagnostics.next_dropped::<T>();
            return;
        }

        if self.skipping_done.load(Ordering::Acquire) {
            self.downstream.on_next(value);
            return;
        }

        match (self.predicate)(&value) {
            Ok(true) => {
                if let Some(upstream) = self.upstream() {
                    upstream.request(1);
                }
            }
            Ok(false) => {
                self.skipping_done.store(true, Ordering::Release);
                self.downstream.on_next(value);
            }
            Err(error) => {
                debug!("skip_while predicate failed, cancelling upstream: {}", error);
                if let Some(upstream) = self.upstream() {
                    upstream.cancel();
                }
                self.on_error(error);
            }
        }
    }

    fn on_error(&self, error: RefluxError) {
        if self.done.swap(true, Ordering::AcqRel) {
            self.diagnostics.error_dropped(error);
            return;
        }
        self.downstream.on_error(error);
    }

    fn on_complete(&self) {
        if self.done.swap(true, Ordering::AcqRel) {
            self.diagnostics.complete_dropped();
            return;
        }
        self.downstream.on_complete();
    }
}

impl<T, P> Subscription for SkipWhileSubscriber<T, P>
where
    T: Send + 'static,
    P: Fn(&T) -> Result<bool> + Send + Sync + 'static,
{
    fn request(&self, n: u64) {
        if let Some(upstream) = self.upstream() {
            upstream.request(n);
        }
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        if let Some(upstream) = self.upstream() {
            upstream.cancel();
        }
    }
}

impl<T, P> Introspect for SkipWhileSubscriber<T, P> {
    fn name(&self) -> &'static str {
        "skip_while"
    }

    fn lifecycle(&self) -> Lifecycle {
        if self.done.load(Ordering::Acquire) {
            Lifecycle::Terminated
        } else if self.cancelled.load(Ordering::Acquire) {
            Lifecycle::Cancelled
        } else if self.upstream.get().is_some() {
            Lifecycle::Active
        } else {
            Lifecycle::Idle
        }
    }
}
