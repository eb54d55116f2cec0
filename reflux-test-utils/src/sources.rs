// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Well-behaved publishers over fixed data.
//!
//! Every source here is cold: each subscriber gets its own run over the data. They
//! emit only what was requested, complete as soon as the data is exhausted, and stop
//! on cancel.

use reflux_core::{
    add_cap, validate_request, Diagnostics, EmptySubscription, Publisher, PublisherRef,
    RefluxError, SubscriberRef, Subscription, UNBOUNDED,
};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

/// Publisher emitting `items` in order, then completing.
pub fn from_iter<T, I>(items: I) -> PublisherRef<T>
where
    T: Clone + Send + Sync + 'static,
    I: IntoIterator<Item = T>,
{
    Arc::new(ArrayPublisher {
        items: items.into_iter().collect(),
    })
}

/// Publisher emitting `count` consecutive integers starting at `start`.
pub fn range(start: u64, count: u64) -> PublisherRef<u64> {
    from_iter(start..start + count)
}

/// Publisher emitting `value` once, then completing.
pub fn just<T>(value: T) -> PublisherRef<T>
where
    T: Clone + Send + Sync + 'static,
{
    from_iter([value])
}

/// Publisher completing right after `on_subscribe`.
pub fn empty<T: 'static>() -> PublisherRef<T> {
    Arc::new(Empty)
}

/// Publisher failing with `error` right after `on_subscribe`.
pub fn error<T: 'static>(error: RefluxError) -> PublisherRef<T> {
    Arc::new(Failing(error))
}

/// Publisher that subscribes and then never signals.
pub fn never<T: 'static>() -> PublisherRef<T> {
    Arc::new(Never)
}

/// Subscribes `source` from a freshly spawned thread.
///
/// Signals issued during subscription, including a synchronous completion, then
/// originate from that thread instead of the subscriber's.
pub fn on_thread<T: Send + 'static>(source: PublisherRef<T>) -> PublisherRef<T> {
    Arc::new(OnThread { source })
}

struct ArrayPublisher<T> {
    items: Arc<[T]>,
}

impl<T> Publisher<T> for ArrayPublisher<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn subscribe(&self, subscriber: SubscriberRef<T>) {
        if self.items.is_empty() {
            EmptySubscription::complete(&*subscriber);
            return;
        }
        let subscription = Arc::new(ArraySubscription {
            items: Arc::clone(&self.items),
            index: AtomicUsize::new(0),
            requested: AtomicU64::new(0),
            finished: AtomicBool::new(false),
            subscriber: Arc::clone(&subscriber),
        });
        subscriber.on_subscribe(subscription);
    }
}

struct ArraySubscription<T> {
    items: Arc<[T]>,
    // Touched only by the thread that moved `requested` away from zero.
    index: AtomicUsize,
    requested: AtomicU64,
    finished: AtomicBool,
    subscriber: SubscriberRef<T>,
}

impl<T: Clone> ArraySubscription<T> {
    fn emit(&self, mut requested: u64) {
        let mut index = self.index.load(Ordering::Relaxed);
        loop {
            let mut emitted = 0;
            while emitted != requested && index < self.items.len() {
                if self.finished.load(Ordering::Acquire) {
                    return;
                }
                self.subscriber.on_next(self.items[index].clone());
                index += 1;
                emitted += 1;
                self.index.store(index, Ordering::Relaxed);
            }

            if index == self.items.len() {
                if !self.finished.swap(true, Ordering::AcqRel) {
                    self.subscriber.on_complete();
                }
                return;
            }
            if self.finished.load(Ordering::Acquire) {
                return;
            }

            requested = match self.requested.fetch_update(
                Ordering::AcqRel,
                Ordering::Acquire,
                |current| {
                    if current == UNBOUNDED {
                        Some(current)
                    } else {
                        Some(current - emitted)
                    }
                },
            ) {
                Ok(UNBOUNDED) | Err(UNBOUNDED) => UNBOUNDED,
                Ok(previous) | Err(previous) => previous - emitted,
            };
            if requested == 0 {
                return;
            }
        }
    }
}

impl<T> Subscription for ArraySubscription<T>
where
    T: Clone + Send + Sync,
{
    fn request(&self, n: u64) {
        if !validate_request(n, &Diagnostics::default()) {
            return;
        }
        let previous = self
            .requested
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(add_cap(current, n))
            })
            .unwrap_or_else(|current| current);
        if previous == 0 {
            self.emit(add_cap(previous, n));
        }
    }

    fn cancel(&self) {
        self.finished.store(true, Ordering::Release);
    }
}

struct Empty;

impl<T> Publisher<T> for Empty {
    fn subscribe(&self, subscriber: SubscriberRef<T>) {
        EmptySubscription::complete(&*subscriber);
    }
}

struct Failing(RefluxError);

impl<T> Publisher<T> for Failing {
    fn subscribe(&self, subscriber: SubscriberRef<T>) {
        EmptySubscription::error(&*subscriber, self.0.clone());
    }
}

struct Never;

impl<T> Publisher<T> for Never {
    fn subscribe(&self, subscriber: SubscriberRef<T>) {
        subscriber.on_subscribe(Arc::new(EmptySubscription));
    }
}

struct OnThread<T> {
    source: PublisherRef<T>,
}

impl<T: Send + 'static> Publisher<T> for OnThread<T> {
    fn subscribe(&self, subscriber: SubscriberRef<T>) {
        let source = Arc::clone(&self.source);
        thread::spawn(move || source.subscribe(subscriber));
    }
}
