// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Demand side of the contract and the helpers every operator uses to validate it.

use crate::{Diagnostics, DroppedSignal, RefluxError, Subscriber};
use std::sync::{Arc, OnceLock};

/// Requested amount meaning "no bound". Once reached, demand stays unbounded.
pub const UNBOUNDED: u64 = u64::MAX;

/// Handle a subscriber holds on its producer.
///
/// Both methods may be called from any thread, concurrently with signal delivery.
pub trait Subscription: Send + Sync {
    /// Adds `n` to the amount of values the producer may emit.
    ///
    /// `n` must be positive. A zero request is a usage error: implementations report
    /// it through [`validate_request`] and leave demand unchanged.
    fn request(&self, n: u64);

    /// Asks the producer to stop. Idempotent; the producer stops eventually, not
    /// necessarily before this call returns.
    fn cancel(&self);
}

/// Shared handle to a subscription.
pub type SubscriptionRef = Arc<dyn Subscription>;

/// Checks that a request amount is positive, reporting it otherwise.
///
/// # Examples
///
/// ```
/// use reflux_core::{validate_request, Diagnostics};
///
/// let diagnostics = Diagnostics::silent();
/// assert!(validate_request(3, &diagnostics));
/// assert!(!validate_request(0, &diagnostics));
/// ```
pub fn validate_request(n: u64, diagnostics: &Diagnostics) -> bool {
    if n == 0 {
        diagnostics.report(DroppedSignal::BadRequest { requested: n });
        return false;
    }
    true
}

/// Adds two demand amounts, capping at [`UNBOUNDED`].
#[must_use]
pub const fn add_cap(a: u64, b: u64) -> u64 {
    a.saturating_add(b)
}

/// Stores the first subscription an operator receives.
///
/// A second subscription is a contract violation: it is cancelled, reported as
/// [`DroppedSignal::DuplicateSubscription`] and `false` is returned.
pub fn set_once(
    slot: &OnceLock<SubscriptionRef>,
    subscription: SubscriptionRef,
    diagnostics: &Diagnostics,
) -> bool {
    match slot.set(subscription) {
        Ok(()) => true,
        Err(duplicate) => {
            duplicate.cancel();
            diagnostics.report(DroppedSignal::DuplicateSubscription);
            false
        }
    }
}

/// Subscription that ignores every call.
///
/// Publishers that terminate before producing anything still owe their subscriber
/// an `on_subscribe`; they hand over this one.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptySubscription;

impl EmptySubscription {
    /// Delivers `on_subscribe` followed immediately by `on_error`.
    pub fn error<T>(subscriber: &dyn Subscriber<T>, error: RefluxError) {
        subscriber.on_subscribe(Arc::new(Self));
        subscriber.on_error(error);
    }

    /// Delivers `on_subscribe` followed immediately by `on_complete`.
    pub fn complete<T>(subscriber: &dyn Subscriber<T>) {
        subscriber.on_subscribe(Arc::new(Self));
        subscriber.on_complete();
    }
}

impl Subscription for EmptySubscription {
    fn request(&self, _n: u64) {}

    fn cancel(&self) {}
}
