// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::{RefluxError, SubscriptionRef};
use std::sync::Arc;

/// Receiver side of the demand contract.
///
/// Signals arrive in the order `on_subscribe`, zero or more `on_next`, then at most
/// one of `on_error` or `on_complete`. The number of `on_next` calls never exceeds
/// the total amount requested through the subscription.
///
/// Signals for one sequence are never delivered concurrently, but consecutive
/// signals may come from different threads, hence the `Send + Sync` bound.
pub trait Subscriber<T>: Send + Sync {
    /// Hands over the subscription. Called exactly once, before any other signal.
    fn on_subscribe(&self, subscription: SubscriptionRef);

    /// Delivers one requested value.
    fn on_next(&self, value: T);

    /// Terminates the sequence with a failure.
    fn on_error(&self, error: RefluxError);

    /// Terminates the sequence normally.
    fn on_complete(&self);
}

/// Shared handle to a subscriber.
pub type SubscriberRef<T> = Arc<dyn Subscriber<T>>;
