// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Demand carrier for operators that switch upstream subscriptions.
//!
//! An operator that consumes several producers one after another (concatenation,
//! retry, switch-on-empty) must present a single, continuous demand stream to its
//! downstream. [`MultiSubscription`] holds the downstream's outstanding demand and
//! re-issues it to every new upstream subscription, so that the downstream never
//! observes a re-subscribe and never receives more than it requested.
//!
//! # Concurrency
//!
//! `request` and `cancel` arrive from the downstream's thread while
//! `set_subscription` and `produced` arrive from the producer's thread. Each call
//! first tries to take the drain region with a single CAS and apply its update
//! directly. If the region is busy, the update is parked in a "missed" slot
//! (`missed_subscription`, `missed_requested`, `missed_produced`) and the thread
//! currently draining folds it in before it leaves. Calls into upstream
//! subscriptions happen outside the region.

use crate::{
    add_cap, validate_request, Diagnostics, Drain, DroppedSignal, Introspect, Lifecycle,
    SubscriberRef, Subscription, SubscriptionRef, Trampoline, UNBOUNDED,
};
use arc_swap::ArcSwapOption;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

// Owned by the drain region.
struct Arbiter {
    actual: Option<SubscriptionRef>,
}

// Request to issue once the drain region has been left.
#[derive(Default)]
struct PendingRequest {
    amount: u64,
    target: Option<SubscriptionRef>,
}

impl PendingRequest {
    fn flush(self) {
        if self.amount != 0 {
            if let Some(target) = self.target {
                target.request(self.amount);
            }
        }
    }
}

/// Subscription arbiter that carries demand across upstream switches.
///
/// The downstream subscriber is fixed for the carrier's lifetime; upstream
/// subscriptions come and go through [`set_subscription`](Self::set_subscription).
/// The owning operator reports every value it forwarded with
/// [`produced`](Self::produced) before switching, so the next upstream is asked
/// only for the demand that is still outstanding.
///
/// # Examples
///
/// ```
/// use reflux_core::{MultiSubscription, Subscriber, SubscriberRef, Subscription, SubscriptionRef};
/// use reflux_core::RefluxError;
/// use std::sync::atomic::{AtomicU64, Ordering};
/// use std::sync::Arc;
///
/// struct Sink;
/// impl Subscriber<u32> for Sink {
///     fn on_subscribe(&self, _subscription: SubscriptionRef) {}
///     fn on_next(&self, _value: u32) {}
///     fn on_error(&self, _error: RefluxError) {}
///     fn on_complete(&self) {}
/// }
///
/// #[derive(Default)]
/// struct Upstream(AtomicU64);
/// impl Subscription for Upstream {
///     fn request(&self, n: u64) {
///         self.0.fetch_add(n, Ordering::SeqCst);
///     }
///     fn cancel(&self) {}
/// }
///
/// let carrier = MultiSubscription::new(Arc::new(Sink) as SubscriberRef<u32>);
/// carrier.request(5);
///
/// let first = Arc::new(Upstream::default());
/// carrier.set_subscription(first.clone());
/// assert_eq!(first.0.load(Ordering::SeqCst), 5);
///
/// // Two values went downstream before the first upstream finished
/// carrier.produced(2);
/// let second = Arc::new(Upstream::default());
/// carrier.set_subscription(second.clone());
/// assert_eq!(second.0.load(Ordering::SeqCst), 3);
/// ```
pub struct MultiSubscription<T> {
    downstream: SubscriberRef<T>,
    arbiter: Trampoline<Arbiter>,
    // Written inside the drain region only, readable from anywhere.
    requested: AtomicU64,
    missed_subscription: ArcSwapOption<SubscriptionRef>,
    missed_requested: AtomicU64,
    missed_produced: AtomicU64,
    cancelled: AtomicBool,
    unbounded: AtomicBool,
    diagnostics: Diagnostics,
}

impl<T> MultiSubscription<T> {
    /// Creates a carrier for `downstream` with no upstream and no demand yet.
    #[must_use]
    pub fn new(downstream: SubscriberRef<T>) -> Self {
        Self::with_diagnostics(downstream, Diagnostics::default())
    }

    /// Same as [`new`](Self::new), reporting rejected requests and excess production
    /// to `diagnostics`.
    #[must_use]
    pub fn with_diagnostics(downstream: SubscriberRef<T>, diagnostics: Diagnostics) -> Self {
        Self {
            downstream,
            arbiter: Trampoline::new(Arbiter { actual: None }),
            requested: AtomicU64::new(0),
            missed_subscription: ArcSwapOption::empty(),
            missed_requested: AtomicU64::new(0),
            missed_produced: AtomicU64::new(0),
            cancelled: AtomicBool::new(false),
            unbounded: AtomicBool::new(false),
            diagnostics,
        }
    }

    /// The subscriber values are forwarded to.
    pub fn downstream(&self) -> &SubscriberRef<T> {
        &self.downstream
    }

    /// The sink this carrier reports to.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Returns `true` once [`cancel`](Subscription::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Returns `true` once the downstream demand reached [`UNBOUNDED`].
    pub fn is_unbounded(&self) -> bool {
        self.unbounded.load(Ordering::Acquire)
    }

    /// Outstanding demand not yet covered by reported production.
    ///
    /// Updates parked by a concurrent caller are not included until they are drained.
    pub fn requested(&self) -> u64 {
        self.requested.load(Ordering::Acquire)
    }

    /// Installs `subscription` as the live upstream and asks it for all outstanding
    /// demand.
    ///
    /// The previous upstream is released without being cancelled: callers switch
    /// only after it terminated. After [`cancel`](Subscription::cancel), the new
    /// subscription is cancelled instead of installed.
    pub fn set_subscription(&self, subscription: SubscriptionRef) {
        if self.is_cancelled() {
            subscription.cancel();
            return;
        }

        let mut pending = PendingRequest::default();
        let outstanding = self.arbiter.try_enter(
            |arbiter| {
                // A cancel that drained before we entered already left the region.
                if self.is_cancelled() {
                    return None;
                }
                arbiter.actual = Some(Arc::clone(&subscription));
                Some(self.requested.load(Ordering::Acquire))
            },
            |arbiter| self.drain_step(arbiter, &mut pending),
        );

        match outstanding {
            Some(Some(outstanding)) => {
                pending.flush();
                if outstanding != 0 {
                    subscription.request(outstanding);
                }
            }
            Some(None) => subscription.cancel(),
            None => {
                self.missed_subscription
                    .store(Some(Arc::new(subscription)));
                self.drain();
            }
        }
    }

    /// Accounts for `n` values delivered downstream by the current upstream.
    ///
    /// No request is issued: the amount only lowers the demand handed to the next
    /// upstream. Accounting more than is outstanding is reported as
    /// [`DroppedSignal::ExcessProduction`] and clamps the demand to zero.
    pub fn produced(&self, n: u64) {
        if n == 0 || self.is_unbounded() {
            return;
        }

        let mut pending = PendingRequest::default();
        let entered = self.arbiter.try_enter(
            |_| {
                let requested = self.requested.load(Ordering::Acquire);
                if requested != UNBOUNDED {
                    self.requested
                        .store(self.settle(requested, n), Ordering::Release);
                }
            },
            |arbiter| self.drain_step(arbiter, &mut pending),
        );

        if entered.is_some() {
            pending.flush();
        } else {
            add_missed(&self.missed_produced, n);
            self.drain();
        }
    }

    /// Shorthand for `produced(1)`.
    pub fn produced_one(&self) {
        self.produced(1);
    }

    fn drain(&self) {
        let mut pending = PendingRequest::default();
        self.arbiter
            .drain(|arbiter| self.drain_step(arbiter, &mut pending));
        pending.flush();
    }

    fn drain_step(&self, arbiter: &mut Arbiter, pending: &mut PendingRequest) -> Drain {
        let missed_subscription = self
            .missed_subscription
            .swap(None)
            .map(Arc::unwrap_or_clone);
        let missed_requested = take(&self.missed_requested);
        let missed_produced = take(&self.missed_produced);

        if self.is_cancelled() {
            if let Some(actual) = arbiter.actual.take() {
                actual.cancel();
            }
            if let Some(subscription) = missed_subscription {
                subscription.cancel();
            }
            *pending = PendingRequest::default();
            return Drain::Continue;
        }

        let mut requested = self.requested.load(Ordering::Acquire);
        if requested != UNBOUNDED {
            let total = add_cap(requested, missed_requested);
            requested = if total == UNBOUNDED {
                self.unbounded.store(true, Ordering::Release);
                UNBOUNDED
            } else {
                self.settle(total, missed_produced)
            };
            self.requested.store(requested, Ordering::Release);
        }

        if let Some(subscription) = missed_subscription {
            debug!("switching upstream subscription, outstanding demand {}", requested);
            arbiter.actual = Some(Arc::clone(&subscription));
            // The new upstream inherits the whole outstanding amount, which already
            // covers anything pending for the previous one.
            pending.amount = requested;
            pending.target = Some(subscription);
        } else if missed_requested != 0 {
            if let Some(actual) = &arbiter.actual {
                pending.amount = add_cap(pending.amount, missed_requested);
                pending.target = Some(Arc::clone(actual));
            }
        }
        Drain::Continue
    }

    fn settle(&self, requested: u64, produced: u64) -> u64 {
        requested.checked_sub(produced).unwrap_or_else(|| {
            self.diagnostics.report(DroppedSignal::ExcessProduction {
                requested,
                produced,
            });
            0
        })
    }
}

impl<T> Subscription for MultiSubscription<T> {
    /// Adds demand, forwarding it to the live upstream or keeping it for the next one.
    fn request(&self, n: u64) {
        if !validate_request(n, &self.diagnostics) || self.is_unbounded() {
            return;
        }

        let mut pending = PendingRequest::default();
        let actual = self.arbiter.try_enter(
            |arbiter| {
                let requested = self.requested.load(Ordering::Acquire);
                if requested != UNBOUNDED {
                    let total = add_cap(requested, n);
                    self.requested.store(total, Ordering::Release);
                    if total == UNBOUNDED {
                        self.unbounded.store(true, Ordering::Release);
                    }
                }
                arbiter.actual.clone()
            },
            |arbiter| self.drain_step(arbiter, &mut pending),
        );

        match actual {
            Some(actual) => {
                pending.flush();
                if let Some(actual) = actual {
                    actual.request(n);
                }
            }
            None => {
                add_missed(&self.missed_requested, n);
                self.drain();
            }
        }
    }

    fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::AcqRel) {
            self.drain();
        }
    }
}

impl<T> Introspect for MultiSubscription<T> {
    fn name(&self) -> &'static str {
        "multi_subscription"
    }

    fn lifecycle(&self) -> Lifecycle {
        if self.is_cancelled() {
            Lifecycle::Cancelled
        } else {
            Lifecycle::Active
        }
    }

    fn requested(&self) -> Option<u64> {
        Some(MultiSubscription::requested(self))
    }
}

fn take(counter: &AtomicU64) -> u64 {
    if counter.load(Ordering::Acquire) == 0 {
        0
    } else {
        counter.swap(0, Ordering::AcqRel)
    }
}

fn add_missed(counter: &AtomicU64, n: u64) {
    // The closure never rejects, so the update always succeeds.
    let _ = counter.fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
        Some(add_cap(current, n))
    });
}
