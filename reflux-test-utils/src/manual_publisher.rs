// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Publisher driven by hand from the test body.

use parking_lot::Mutex;
use reflux_core::{
    add_cap, Publisher, RefluxError, SubscriberRef, Subscription, SubscriptionRef,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Subscription handed out by [`ManualPublisher`]; records demand and cancellation.
pub struct ManualSubscription {
    requested: AtomicU64,
    request_calls: AtomicU64,
    cancelled: AtomicBool,
}

impl ManualSubscription {
    /// Detached subscription, for tests that hand subscriptions to an operator
    /// directly.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            requested: AtomicU64::new(0),
            request_calls: AtomicU64::new(0),
            cancelled: AtomicBool::new(false),
        })
    }

    /// Total demand received, capped at `u64::MAX`.
    pub fn requested(&self) -> u64 {
        self.requested.load(Ordering::Acquire)
    }

    /// Number of `request` calls received.
    pub fn request_calls(&self) -> u64 {
        self.request_calls.load(Ordering::Acquire)
    }

    /// Returns `true` once `cancel` has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Subscription for ManualSubscription {
    fn request(&self, n: u64) {
        self.request_calls.fetch_add(1, Ordering::AcqRel);
        let _ = self
            .requested
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(add_cap(current, n))
            });
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

struct Attached<T> {
    subscriber: SubscriberRef<T>,
    subscription: Arc<ManualSubscription>,
}

impl<T> Clone for Attached<T> {
    fn clone(&self) -> Self {
        Self {
            subscriber: Arc::clone(&self.subscriber),
            subscription: Arc::clone(&self.subscription),
        }
    }
}

/// Publisher whose signals are emitted explicitly by the test.
///
/// Emission ignores demand and termination on purpose, so the test can play a
/// misbehaving producer and check how an operator copes. Signals go to the most
/// recent subscriber. Clones share the same state.
pub struct ManualPublisher<T> {
    attached: Arc<Mutex<Vec<Attached<T>>>>,
}

impl<T> Clone for ManualPublisher<T> {
    fn clone(&self) -> Self {
        Self {
            attached: Arc::clone(&self.attached),
        }
    }
}

impl<T> Default for ManualPublisher<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ManualPublisher<T> {
    /// Creates a publisher with no subscriber.
    #[must_use]
    pub fn new() -> Self {
        Self {
            attached: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Number of times `subscribe` has been called.
    pub fn subscriber_count(&self) -> usize {
        self.attached.lock().len()
    }

    /// Subscription handed to the most recent subscriber.
    pub fn subscription(&self) -> Option<Arc<ManualSubscription>> {
        self.attached
            .lock()
            .last()
            .map(|attached| Arc::clone(&attached.subscription))
    }

    /// Demand received from the most recent subscriber, `0` if none subscribed.
    pub fn requested(&self) -> u64 {
        self.subscription().map_or(0, |s| s.requested())
    }

    /// Returns `true` if the most recent subscriber cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.subscription().is_some_and(|s| s.is_cancelled())
    }

    /// Sends `value` to the most recent subscriber.
    ///
    /// # Panics
    ///
    /// Panics if nobody subscribed.
    pub fn emit(&self, value: T) {
        self.current().subscriber.on_next(value);
    }

    /// Sends every value of `values`, in order.
    pub fn emit_all(&self, values: impl IntoIterator<Item = T>) {
        for value in values {
            self.emit(value);
        }
    }

    /// Completes the most recent subscriber.
    ///
    /// # Panics
    ///
    /// Panics if nobody subscribed.
    pub fn complete(&self) {
        self.current().subscriber.on_complete();
    }

    /// Fails the most recent subscriber with `error`.
    ///
    /// # Panics
    ///
    /// Panics if nobody subscribed.
    pub fn error(&self, error: RefluxError) {
        self.current().subscriber.on_error(error);
    }

    /// Calls `on_subscribe` on the most recent subscriber once more, with a fresh
    /// subscription, and returns that subscription.
    ///
    /// # Panics
    ///
    /// Panics if nobody subscribed.
    pub fn resubscribe(&self) -> Arc<ManualSubscription> {
        let current = self.current();
        let extra = ManualSubscription::new();
        current
            .subscriber
            .on_subscribe(Arc::clone(&extra) as SubscriptionRef);
        extra
    }

    // The lock is released before the subscriber is signalled.
    fn current(&self) -> Attached<T> {
        self.attached
            .lock()
            .last()
            .cloned()
            .expect("ManualPublisher has no subscriber")
    }
}

impl<T> Publisher<T> for ManualPublisher<T>
where
    T: Send,
{
    fn subscribe(&self, subscriber: SubscriberRef<T>) {
        let subscription = ManualSubscription::new();
        self.attached.lock().push(Attached {
            subscriber: Arc::clone(&subscriber),
            subscription: Arc::clone(&subscription),
        });
        subscriber.on_subscribe(subscription);
    }
}
