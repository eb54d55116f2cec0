// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::{concat, Next, SkipWhile};
use reflux_core::{PublisherRef, Result};
use std::sync::Arc;

/// Operator methods on shared publishers.
///
/// Every method consumes the handle and returns a new one, so operators chain:
///
/// ```
/// use reflux_core::Publisher;
/// use reflux_stream::PublisherExt;
/// use reflux_test_utils::{sources, TestSubscriber};
///
/// let first_large = sources::range(0, 10).skip_while(|n| *n < 7).next();
///
/// let subscriber = TestSubscriber::<u64>::new();
/// first_large.subscribe(subscriber.clone());
/// subscriber.assert_values(&[7]);
/// subscriber.assert_complete();
/// ```
pub trait PublisherExt<T> {
    /// Skips leading values while `predicate` returns `true`.
    #[must_use]
    fn skip_while<P>(self, predicate: P) -> PublisherRef<T>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static;

    /// Skips leading values while `predicate` returns `Ok(true)`; an `Err` fails the
    /// sequence.
    #[must_use]
    fn try_skip_while<P>(self, predicate: P) -> PublisherRef<T>
    where
        P: Fn(&T) -> Result<bool> + Send + Sync + 'static;

    /// Emits only the first value, or completes empty.
    #[must_use]
    fn next(self) -> PublisherRef<T>;

    /// Emits all values of `self`, then all values of `other`.
    #[must_use]
    fn concat_with(self, other: PublisherRef<T>) -> PublisherRef<T>;
}

impl<T: Send + 'static> PublisherExt<T> for PublisherRef<T> {
    fn skip_while<P>(self, predicate: P) -> PublisherRef<T>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Arc::new(SkipWhile::new(self, move |value: &T| Ok(predicate(value))))
    }

    fn try_skip_while<P>(self, predicate: P) -> PublisherRef<T>
    where
        P: Fn(&T) -> Result<bool> + Send + Sync + 'static,
    {
        Arc::new(SkipWhile::new(self, predicate))
    }

    fn next(self) -> PublisherRef<T> {
        Arc::new(Next::new(self))
    }

    fn concat_with(self, other: PublisherRef<T>) -> PublisherRef<T> {
        concat(vec![self, other])
    }
}
