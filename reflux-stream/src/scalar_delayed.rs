// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Single-value rendezvous between "a value is available" and "a value was
//! requested".
//!
//! Either event may come first, from any thread, and [`cancel`](Subscription::cancel)
//! may race both. The state is one of four tags stored in an [`AtomicU8`]; every
//! transition is a single CAS and only moves towards "has value" and/or "has
//! request". Whichever call completes the pair wins the CAS into the terminal tag
//! and is the only one that emits.
//!
//! ```text
//!   NO_REQUEST_NO_VALUE ──set──▶ NO_REQUEST_HAS_VALUE
//!          │                            │
//!       request                      request (emits)
//!          ▼                            ▼
//!   HAS_REQUEST_NO_VALUE ──set (emits)──▶ HAS_REQUEST_HAS_VALUE ◀── cancel
//! ```

use reflux_core::{
    set_once, validate_request, Diagnostics, Introspect, Lifecycle, RefluxError, Subscriber,
    SubscriberRef, Subscription, SubscriptionRef,
};
use std::marker::PhantomData;
use std::ptr;
use std::sync::atomic::{fence, AtomicBool, AtomicPtr, AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};

const NO_REQUEST_NO_VALUE: u8 = 0;
const NO_REQUEST_HAS_VALUE: u8 = 1;
const HAS_REQUEST_NO_VALUE: u8 = 2;
const HAS_REQUEST_HAS_VALUE: u8 = 3;

/// Holds at most one value and releases it, followed by completion, once demand
/// has arrived.
///
/// `ScalarDelayed` is the subscription its downstream holds. It is also a
/// [`Subscriber`]: subscribed to a source, it asks for one value, keeps the first
/// one it receives and cancels the source. Producers that compute the value
/// themselves call [`set`](Self::set) instead.
///
/// # Examples
///
/// ```
/// use reflux_core::Subscriber;
/// use reflux_stream::ScalarDelayed;
/// use reflux_test_utils::TestSubscriber;
/// use std::sync::Arc;
///
/// let subscriber = TestSubscriber::<&str>::manual();
/// let rendezvous = Arc::new(ScalarDelayed::<&str>::new(subscriber.clone()));
/// subscriber.on_subscribe(rendezvous.clone());
///
/// subscriber.request(1);
/// subscriber.assert_values(&[]);
///
/// rendezvous.set("x");
/// subscriber.assert_values(&["x"]);
/// subscriber.assert_complete();
/// ```
pub struct ScalarDelayed<T> {
    downstream: SubscriberRef<T>,
    state: AtomicU8,
    // Owned `Box<T>` while the state is NO_REQUEST_HAS_VALUE.
    slot: AtomicPtr<T>,
    upstream: OnceLock<SubscriptionRef>,
    upstream_done: AtomicBool,
    cancelled: AtomicBool,
    diagnostics: Diagnostics,
    _owns: PhantomData<T>,
}

// SAFETY: the value is moved through `slot`, never shared by reference, so moving
// `T` between threads is all that is needed.
unsafe impl<T: Send> Sync for ScalarDelayed<T> {}

impl<T> ScalarDelayed<T> {
    pub fn new(downstream: SubscriberRef<T>) -> Self {
        Self::with_diagnostics(downstream, Diagnostics::default())
    }

    pub fn with_diagnostics(downstream: SubscriberRef<T>, diagnostics: Diagnostics) -> Self {
        Self {
            downstream,
            state: AtomicU8::new(NO_REQUEST_NO_VALUE),
            slot: AtomicPtr::new(ptr::null_mut()),
            upstream: OnceLock::new(),
            upstream_done: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
            diagnostics,
            _owns: PhantomData,
        }
    }

    /// Offers the value.
    ///
    /// Emits it right away if demand is already pending; otherwise keeps it until
    /// the first `request`. Only the first value counts: later ones are dropped, as
    /// is any value offered after cancellation.
    pub fn set(&self, mut value: T) {
        loop {
            match self.state.load(Ordering::Acquire) {
                NO_REQUEST_HAS_VALUE | HAS_REQUEST_HAS_VALUE => return,
                HAS_REQUEST_NO_VALUE => {
                    if self.transition(HAS_REQUEST_NO_VALUE, HAS_REQUEST_HAS_VALUE) {
                        self.emit(value);
                    }
                    return;
                }
                _ => {
                    let boxed = Box::into_raw(Box::new(value));
                    if self
                        .slot
                        .compare_exchange(
                            ptr::null_mut(),
                            boxed,
                            Ordering::AcqRel,
                            Ordering::Acquire,
                        )
                        .is_err()
                    {
                        // Another `set` holds the slot and will settle the state.
                        // SAFETY: `boxed` was never published, so it is still ours.
                        drop(unsafe { Box::from_raw(boxed) });
                        return;
                    }
                    if self.transition(NO_REQUEST_NO_VALUE, NO_REQUEST_HAS_VALUE) {
                        return;
                    }
                    // A request or a cancel got in first; take the value back.
                    let taken = self.slot.swap(ptr::null_mut(), Ordering::AcqRel);
                    // SAFETY: the failed CAS means nobody observed NO_REQUEST_HAS_VALUE,
                    // so nobody else could take the box stored above, and concurrent
                    // `set` calls back off while the slot is occupied.
                    value = *unsafe { Box::from_raw(taken) };
                }
            }
        }
    }

    /// Returns `true` once the terminal tag is reached, by emission or by cancel.
    pub fn is_cancelled(&self) -> bool {
        self.state.load(Ordering::Acquire) == HAS_REQUEST_HAS_VALUE
    }

    fn transition(&self, from: u8, to: u8) -> bool {
        self.state
            .compare_exchange(from, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn emit(&self, value: T) {
        self.downstream.on_next(value);
        self.downstream.on_complete();
    }

    fn take_value(&self) -> Option<T> {
        let taken = self.slot.swap(ptr::null_mut(), Ordering::AcqRel);
        // SAFETY: non-null pointers in `slot` always come from `Box::into_raw` and
        // the swap hands ownership to exactly one caller.
        (!taken.is_null()).then(|| *unsafe { Box::from_raw(taken) })
    }

    fn cancel_upstream(&self) {
        if let Some(upstream) = self.upstream.get() {
            upstream.cancel();
        }
    }
}

impl<T: Send> Subscription for ScalarDelayed<T> {
    fn request(&self, n: u64) {
        if !validate_request(n, &self.diagnostics) {
            return;
        }
        loop {
            match self.state.load(Ordering::Acquire) {
                HAS_REQUEST_NO_VALUE | HAS_REQUEST_HAS_VALUE => return,
                NO_REQUEST_HAS_VALUE => {
                    if self.transition(NO_REQUEST_HAS_VALUE, HAS_REQUEST_HAS_VALUE) {
                        if let Some(value) = self.take_value() {
                            self.emit(value);
                        }
                    }
                    return;
                }
                _ => {
                    if self.transition(NO_REQUEST_NO_VALUE, HAS_REQUEST_NO_VALUE) {
                        return;
                    }
                }
            }
        }
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        // Pairs with the fence in `on_subscribe`: at least one side sees the other,
        // so a concurrently arriving upstream is always cancelled.
        self.state.store(HAS_REQUEST_HAS_VALUE, Ordering::SeqCst);
        fence(Ordering::SeqCst);
        self.cancel_upstream();
    }
}

impl<T: Send> Subscriber<T> for ScalarDelayed<T> {
    fn on_subscribe(&self, subscription: SubscriptionRef) {
        if !set_once(&self.upstream, Arc::clone(&subscription), &self.diagnostics) {
            return;
        }
        fence(Ordering::SeqCst);
        if self.state.load(Ordering::SeqCst) == HAS_REQUEST_HAS_VALUE {
            subscription.cancel();
        } else {
            subscription.request(1);
        }
    }

    fn on_next(&self, value: T) {
        if self.upstream_done.swap(true, Ordering::AcqRel) {
            self.diagnostics.next_dropped::<T>();
            return;
        }
        self.cancel_upstream();
        self.set(value);
    }

    fn on_error(&self, error: RefluxError) {
        if self.upstream_done.swap(true, Ordering::AcqRel) {
            self.diagnostics.error_dropped(error);
            return;
        }
        self.state.store(HAS_REQUEST_HAS_VALUE, Ordering::Release);
        self.downstream.on_error(error);
    }

    fn on_complete(&self) {
        if self.upstream_done.swap(true, Ordering::AcqRel) {
            self.diagnostics.complete_dropped();
            return;
        }
        self.state.store(HAS_REQUEST_HAS_VALUE, Ordering::Release);
        self.downstream.on_complete();
    }
}

impl<T> Introspect for ScalarDelayed<T> {
    fn name(&self) -> &'static str {
        "scalar_delayed"
    }

    fn lifecycle(&self) -> Lifecycle {
        if self.cancelled.load(Ordering::Acquire) {
            Lifecycle::Cancelled
        } else if self.state.load(Ordering::Acquire) == HAS_REQUEST_HAS_VALUE {
            Lifecycle::Terminated
        } else {
            Lifecycle::Active
        }
    }

    fn requested(&self) -> Option<u64> {
        Some(u64::from(
            self.state.load(Ordering::Acquire) == HAS_REQUEST_NO_VALUE,
        ))
    }
}

impl<T> Drop for ScalarDelayed<T> {
    fn drop(&mut self) {
        let leftover = *self.slot.get_mut();
        if !leftover.is_null() {
            // SAFETY: `&mut self` rules out concurrent access and the pointer came
            // from `Box::into_raw`.
            drop(unsafe { Box::from_raw(leftover) });
        }
    }
}
