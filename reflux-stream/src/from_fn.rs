// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::ScalarDelayed;
use reflux_core::{Diagnostics, Publisher, Result, Subscriber, SubscriberRef};
use std::marker::PhantomData;
use std::sync::Arc;

/// Publisher of a single value computed by a closure at subscribe time.
///
/// The value is computed eagerly, before any demand, and held by a
/// [`ScalarDelayed`] until the subscriber requests it. An `Err` fails the
/// subscriber instead.
///
/// # Examples
///
/// ```
/// use reflux_core::Publisher;
/// use reflux_stream::FromFn;
/// use reflux_test_utils::TestSubscriber;
///
/// let publisher = FromFn::new(|| Ok(21 * 2));
/// let subscriber = TestSubscriber::<i32>::manual();
/// publisher.subscribe(subscriber.clone());
/// subscriber.assert_values(&[]);
///
/// subscriber.request(1);
/// subscriber.assert_values(&[42]);
/// subscriber.assert_complete();
/// ```
pub struct FromFn<T, F> {
    supplier: F,
    diagnostics: Diagnostics,
    _marker: PhantomData<fn() -> T>,
}

impl<T, F> FromFn<T, F>
where
    F: Fn() -> Result<T>,
{
    pub fn new(supplier: F) -> Self {
        Self {
            supplier,
            diagnostics: Diagnostics::default(),
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }
}

impl<T, F> Publisher<T> for FromFn<T, F>
where
    T: Send + 'static,
    F: Fn() -> Result<T> + Send + Sync,
{
    fn subscribe(&self, subscriber: SubscriberRef<T>) {
        let rendezvous = Arc::new(ScalarDelayed::with_diagnostics(
            Arc::clone(&subscriber),
            self.diagnostics.clone(),
        ));
        subscriber.on_subscribe(rendezvous.clone());
        if rendezvous.is_cancelled() {
            return;
        }
        match (self.supplier)() {
            Ok(value) => rendezvous.set(value),
            Err(error) => rendezvous.on_error(error),
        }
    }
}
