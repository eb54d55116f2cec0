// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Recording subscriber with manual demand control.

use event_listener::{Event, Listener};
use parking_lot::Mutex;
use reflux_core::{add_cap, RefluxError, Subscriber, Subscription, SubscriptionRef, UNBOUNDED};
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

struct Recorded<T> {
    values: Vec<T>,
    errors: Vec<RefluxError>,
    completions: usize,
    subscriptions: usize,
    requested: u64,
    violations: Vec<String>,
}

/// Subscriber that records every signal.
///
/// Besides recording, it checks the contract from the receiving side: a value
/// beyond the requested amount, a signal after a terminal one, or a second
/// `on_subscribe` is stored as a violation instead of panicking inside the
/// producer. [`assert_complete`](Self::assert_complete) and
/// [`assert_error`](Self::assert_error) fail when violations were recorded.
///
/// The internal lock is never held while calling into the subscription, so
/// producers may deliver re-entrantly from inside [`request`](Self::request).
pub struct TestSubscriber<T> {
    recorded: Mutex<Recorded<T>>,
    subscription: OnceLock<SubscriptionRef>,
    initial_request: u64,
    terminated: AtomicBool,
    terminal_event: Event,
}

impl<T> TestSubscriber<T> {
    /// Subscriber that requests an unbounded amount on subscribe.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Self::with_request(UNBOUNDED)
    }

    /// Subscriber that requests `n` values on subscribe; `0` requests nothing.
    #[must_use]
    pub fn with_request(n: u64) -> Arc<Self> {
        Arc::new(Self {
            recorded: Mutex::new(Recorded {
                values: Vec::new(),
                errors: Vec::new(),
                completions: 0,
                subscriptions: 0,
                requested: 0,
                violations: Vec::new(),
            }),
            subscription: OnceLock::new(),
            initial_request: n,
            terminated: AtomicBool::new(false),
            terminal_event: Event::new(),
        })
    }

    /// Subscriber that requests nothing until told to.
    #[must_use]
    pub fn manual() -> Arc<Self> {
        Self::with_request(0)
    }

    /// Requests `n` more values through the received subscription.
    ///
    /// # Panics
    ///
    /// Panics if no subscription has been received yet.
    pub fn request(&self, n: u64) {
        let subscription = self
            .subscription
            .get()
            .expect("request called before on_subscribe");
        {
            let mut recorded = self.recorded.lock();
            recorded.requested = add_cap(recorded.requested, n);
        }
        subscription.request(n);
    }

    /// Cancels the received subscription.
    ///
    /// # Panics
    ///
    /// Panics if no subscription has been received yet.
    pub fn cancel(&self) {
        self.subscription
            .get()
            .expect("cancel called before on_subscribe")
            .cancel();
    }

    /// The subscription received in `on_subscribe`, if any.
    pub fn subscription(&self) -> Option<SubscriptionRef> {
        self.subscription.get().cloned()
    }

    /// Returns `true` once `on_subscribe` has been received.
    pub fn is_subscribed(&self) -> bool {
        self.subscription.get().is_some()
    }

    /// Values received so far.
    pub fn values(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.recorded.lock().values.clone()
    }

    /// Number of values received so far.
    pub fn value_count(&self) -> usize {
        self.recorded.lock().values.len()
    }

    /// Errors received so far.
    pub fn errors(&self) -> Vec<RefluxError> {
        self.recorded.lock().errors.clone()
    }

    /// Number of `on_complete` signals received.
    pub fn completions(&self) -> usize {
        self.recorded.lock().completions
    }

    /// Total demand issued through this subscriber.
    pub fn requested(&self) -> u64 {
        self.recorded.lock().requested
    }

    /// Contract violations observed so far.
    pub fn violations(&self) -> Vec<String> {
        self.recorded.lock().violations.clone()
    }

    /// Returns `true` once `on_error` or `on_complete` has been received.
    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    /// Blocks until a terminal signal arrives or `timeout` elapses.
    ///
    /// Returns `true` if the subscriber terminated.
    pub fn wait_terminal(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.is_terminated() {
                return true;
            }
            let listener = self.terminal_event.listen();
            if self.is_terminated() {
                return true;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() || listener.wait_timeout(remaining).is_none() {
                return self.is_terminated();
            }
        }
    }

    /// Resolves once a terminal signal arrives.
    pub async fn terminated(&self) {
        loop {
            if self.is_terminated() {
                return;
            }
            let listener = self.terminal_event.listen();
            if self.is_terminated() {
                return;
            }
            listener.await;
        }
    }

    /// Asserts the received values equal `expected`, in order.
    ///
    /// # Panics
    ///
    /// Panics on mismatch.
    #[track_caller]
    pub fn assert_values(&self, expected: &[T])
    where
        T: PartialEq + Debug,
    {
        let recorded = self.recorded.lock();
        assert_eq!(recorded.values.as_slice(), expected, "unexpected values");
    }

    /// Asserts exactly one `on_complete`, no error and no violation.
    ///
    /// # Panics
    ///
    /// Panics otherwise.
    #[track_caller]
    pub fn assert_complete(&self) {
        let recorded = self.recorded.lock();
        assert!(
            recorded.violations.is_empty(),
            "contract violations: {:?}",
            recorded.violations
        );
        assert!(
            recorded.errors.is_empty(),
            "expected completion but got errors: {:?}",
            recorded.errors
        );
        assert_eq!(recorded.completions, 1, "expected exactly one completion");
    }

    /// Asserts exactly one `on_error`, no completion and no violation, and returns
    /// the error.
    ///
    /// # Panics
    ///
    /// Panics otherwise.
    #[track_caller]
    pub fn assert_error(&self) -> RefluxError {
        let recorded = self.recorded.lock();
        assert!(
            recorded.violations.is_empty(),
            "contract violations: {:?}",
            recorded.violations
        );
        assert_eq!(recorded.completions, 0, "expected an error but completed");
        assert_eq!(recorded.errors.len(), 1, "expected exactly one error");
        recorded.errors[0].clone()
    }

    /// Asserts like [`assert_error`](Self::assert_error), then runs `inspect` on the
    /// recorded error in place.
    ///
    /// Unlike a clone, the borrowed error keeps its variant, so user errors can be
    /// matched and downcast to their original type.
    ///
    /// # Panics
    ///
    /// Panics unless exactly one error and no completion or violation was recorded.
    #[track_caller]
    pub fn with_error<R>(&self, inspect: impl FnOnce(&RefluxError) -> R) -> R {
        let recorded = self.recorded.lock();
        assert!(
            recorded.violations.is_empty(),
            "contract violations: {:?}",
            recorded.violations
        );
        assert_eq!(recorded.completions, 0, "expected an error but completed");
        assert_eq!(recorded.errors.len(), 1, "expected exactly one error");
        inspect(&recorded.errors[0])
    }

    /// Asserts no terminal signal has been received.
    ///
    /// # Panics
    ///
    /// Panics otherwise.
    #[track_caller]
    pub fn assert_not_terminated(&self) {
        let recorded = self.recorded.lock();
        assert_eq!(recorded.completions, 0, "unexpected completion");
        assert!(
            recorded.errors.is_empty(),
            "unexpected errors: {:?}",
            recorded.errors
        );
    }

    /// Asserts no contract violation has been observed.
    ///
    /// # Panics
    ///
    /// Panics otherwise.
    #[track_caller]
    pub fn assert_no_violations(&self) {
        let recorded = self.recorded.lock();
        assert!(
            recorded.violations.is_empty(),
            "contract violations: {:?}",
            recorded.violations
        );
    }

    fn terminate(&self, record: impl FnOnce(&mut Recorded<T>)) {
        {
            let mut recorded = self.recorded.lock();
            if recorded.subscriptions == 0 {
                recorded
                    .violations
                    .push("terminal signal before on_subscribe".to_string());
            }
            if self.terminated.load(Ordering::Acquire) {
                recorded
                    .violations
                    .push("terminal signal after termination".to_string());
            }
            record(&mut recorded);
        }
        self.terminated.store(true, Ordering::Release);
        self.terminal_event.notify(usize::MAX);
    }
}

impl<T> Subscriber<T> for TestSubscriber<T>
where
    T: Send,
{
    fn on_subscribe(&self, subscription: SubscriptionRef) {
        {
            let mut recorded = self.recorded.lock();
            recorded.subscriptions += 1;
            if recorded.subscriptions > 1 {
                recorded
                    .violations
                    .push("on_subscribe called more than once".to_string());
            }
        }
        if self.subscription.set(Arc::clone(&subscription)).is_err() {
            subscription.cancel();
            return;
        }
        if self.initial_request != 0 {
            self.request(self.initial_request);
        }
    }

    fn on_next(&self, value: T) {
        let mut recorded = self.recorded.lock();
        if recorded.subscriptions == 0 {
            recorded
                .violations
                .push("on_next before on_subscribe".to_string());
        }
        if self.terminated.load(Ordering::Acquire) {
            recorded
                .violations
                .push("on_next after termination".to_string());
        }
        recorded.values.push(value);
        let received = recorded.values.len() as u64;
        if recorded.requested != UNBOUNDED && received > recorded.requested {
            let message = format!(
                "received {received} values with only {} requested",
                recorded.requested
            );
            recorded.violations.push(message);
        }
    }

    fn on_error(&self, error: RefluxError) {
        self.terminate(|recorded| recorded.errors.push(error));
    }

    fn on_complete(&self) {
        self.terminate(|recorded| recorded.completions += 1);
    }
}
