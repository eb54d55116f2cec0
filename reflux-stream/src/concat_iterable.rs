// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Sequential concatenation of a lazily produced sequence of publishers.
//!
//! The operator subscribes to the first source, forwards its values and, when it
//! completes, subscribes to the next one. A source that completes synchronously
//! inside `subscribe` would make this recursive, so "a source completed" is a
//! [`Trampoline`] signal: the thread that finds the loop idle walks the sources in
//! a loop, every nested completion only bumps the work counter. Chains of any
//! length run in constant stack depth.
//!
//! Demand is carried across sources by a [`MultiSubscription`], so the downstream
//! sees one continuous sequence and never more values than it requested.

use reflux_core::{
    Diagnostics, Drain, EmptySubscription, Introspect, Lifecycle, MultiSubscription,
    Publisher, PublisherRef, RefluxError, Result, Subscriber, SubscriberRef, Subscription,
    SubscriptionRef, Trampoline,
};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Fallible, lazily advanced sequence of sources.
///
/// Both methods are called from inside the concat drain loop only, never
/// concurrently.
pub trait Sources<T>: Send {
    /// Returns whether another source follows.
    fn has_next(&mut self) -> Result<bool>;

    /// Returns the next source. `Ok(None)` right after `has_next` returned `true`
    /// is a contract violation and terminates the chain.
    fn next_source(&mut self) -> Result<Option<PublisherRef<T>>>;
}

/// [`Sources`] over an iterator of fallible publishers.
///
/// An `Err` item surfaces from whichever call reaches it first.
pub struct IterSources<T, I> {
    iter: I,
    pending: Option<Result<PublisherRef<T>>>,
}

impl<T, I> IterSources<T, I>
where
    I: Iterator<Item = Result<PublisherRef<T>>>,
{
    pub fn new(iter: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            iter: iter.into_iter(),
            pending: None,
        }
    }
}

impl<T, I> Sources<T> for IterSources<T, I>
where
    I: Iterator<Item = Result<PublisherRef<T>>> + Send,
{
    fn has_next(&mut self) -> Result<bool> {
        if self.pending.is_none() {
            self.pending = self.iter.next();
        }
        match self.pending.take() {
            None => Ok(false),
            Some(Err(error)) => Err(error),
            Some(Ok(source)) => {
                self.pending = Some(Ok(source));
                Ok(true)
            }
        }
    }

    fn next_source(&mut self) -> Result<Option<PublisherRef<T>>> {
        match self.pending.take().or_else(|| self.iter.next()) {
            None => Ok(None),
            Some(result) => result.map(Some),
        }
    }
}

/// Publisher concatenating the sources produced by a factory.
///
/// The factory is called once per subscription, so every subscriber walks its own
/// sequence of sources. A factory error fails the subscriber right away.
///
/// # Examples
///
/// ```
/// use reflux_core::{Publisher, PublisherRef};
/// use reflux_stream::{ConcatIterable, IterSources};
/// use reflux_test_utils::{sources, TestSubscriber};
///
/// let concat: ConcatIterable<u64, _> = ConcatIterable::new(|| {
///     let parts: Vec<reflux_core::Result<PublisherRef<u64>>> =
///         vec![Ok(sources::range(0, 2)), Ok(sources::range(10, 2))];
///     Ok(IterSources::new(parts))
/// });
///
/// let subscriber = TestSubscriber::<u64>::new();
/// concat.subscribe(subscriber.clone());
/// subscriber.assert_values(&[0, 1, 10, 11]);
/// subscriber.assert_complete();
/// ```
pub struct ConcatIterable<T, F> {
    factory: F,
    diagnostics: Diagnostics,
    _marker: PhantomData<fn() -> T>,
}

impl<T, F> ConcatIterable<T, F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            diagnostics: Diagnostics::default(),
            _marker: PhantomData,
        }
    }

    /// Reports late signals and rejected requests to `diagnostics`.
    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }
}

impl<T, F, S> Publisher<T> for ConcatIterable<T, F>
where
    T: Send + 'static,
    F: Fn() -> Result<S> + Send + Sync,
    S: Sources<T> + 'static,
{
    fn subscribe(&self, subscriber: SubscriberRef<T>) {
        match (self.factory)() {
            Ok(sources) => {
                ConcatSubscriber::new(subscriber, sources, self.diagnostics.clone()).start();
            }
            Err(error) => EmptySubscription::error(&*subscriber, error),
        }
    }
}

/// Concatenates a fixed list of publishers.
pub fn concat<T>(sources: Vec<PublisherRef<T>>) -> PublisherRef<T>
where
    T: Send + 'static,
{
    concat_from_fn(move || sources.clone().into_iter().map(Ok))
}

/// Concatenates the publishers yielded by a fresh iterator per subscription.
pub fn concat_from_fn<T, G, I>(iterable: G) -> PublisherRef<T>
where
    T: Send + 'static,
    G: Fn() -> I + Send + Sync + 'static,
    I: IntoIterator<Item = Result<PublisherRef<T>>>,
    I::IntoIter: Send + 'static,
{
    Arc::new(ConcatIterable::<T, _>::new(move || -> Result<_> {
        Ok(IterSources::new(iterable()))
    }))
}

/// Subscriber side of [`ConcatIterable`]; also the subscription the downstream
/// holds.
pub struct ConcatSubscriber<T, S> {
    carrier: MultiSubscription<T>,
    sources: Trampoline<S>,
    // Values forwarded since the last source switch.
    produced: AtomicU64,
    done: AtomicBool,
    this: Weak<Self>,
}

impl<T, S> ConcatSubscriber<T, S>
where
    T: Send + 'static,
    S: Sources<T> + 'static,
{
    pub fn new(
        downstream: SubscriberRef<T>,
        sources: S,
        diagnostics: Diagnostics,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            carrier: MultiSubscription::with_diagnostics(downstream, diagnostics),
            sources: Trampoline::new(sources),
            produced: AtomicU64::new(0),
            done: AtomicBool::new(false),
            this: this.clone(),
        })
    }

    /// Hands itself to the downstream and subscribes to the first source, unless
    /// the downstream cancelled from within `on_subscribe`.
    pub fn start(self: &Arc<Self>) {
        self.carrier
            .downstream()
            .on_subscribe(Arc::clone(self) as SubscriptionRef);
        if !self.carrier.is_cancelled() {
            self.on_complete();
        }
    }

    fn subscribe_next(&self, sources: &mut S) -> Drain {
        if self.carrier.is_cancelled() {
            return Drain::Halt;
        }

        let more = match sources.has_next() {
            Ok(more) => more,
            Err(error) => return self.fail(error),
        };
        if self.carrier.is_cancelled() {
            return Drain::Halt;
        }
        if !more {
            if !self.done.swap(true, Ordering::AcqRel) {
                self.carrier.downstream().on_complete();
            }
            return Drain::Halt;
        }

        let source = match sources.next_source() {
            Ok(Some(source)) => source,
            Ok(None) => {
                warn!("concat source iterator announced a source but yielded none");
                return self.fail(RefluxError::missing_source(
                    "has_next reported a source that next_source did not return",
                ));
            }
            Err(error) => return self.fail(error),
        };
        if self.carrier.is_cancelled() {
            return Drain::Halt;
        }

        let produced = self.produced.swap(0, Ordering::AcqRel);
        if produced != 0 {
            self.carrier.produced(produced);
        }

        let Some(this) = self.this.upgrade() else {
            return Drain::Halt;
        };
        source.subscribe(this);

        if self.carrier.is_cancelled() {
            return Drain::Halt;
        }
        Drain::Continue
    }

    fn fail(&self, error: RefluxError) -> Drain {
        if self.done.swap(true, Ordering::AcqRel) {
            self.carrier.diagnostics().error_dropped(error);
        } else {
            debug!("concat terminating with error: {}", error);
            self.carrier.downstream().on_error(error);
        }
        Drain::Halt
    }
}

impl<T, S> Subscriber<T> for ConcatSubscriber<T, S>
where
    T: Send + 'static,
    S: Sources<T> + 'static,
{
    fn on_subscribe(&self, subscription: SubscriptionRef) {
        self.carrier.set_subscription(subscription);
    }

    fn on_next(&self, value: T) {
        if self.done.load(Ordering::Acquire) {
            self.carrier.diagnostics().next_dropped::<T>();
            return;
        }
        self.produced.fetch_add(1, Ordering::AcqRel);
        self.carrier.downstream().on_next(value);
    }

    fn on_error(&self, error: RefluxError) {
        if self.done.swap(true, Ordering::AcqRel) {
            self.carrier.diagnostics().error_dropped(error);
            return;
        }
        self.carrier.downstream().on_error(error);
    }

    fn on_complete(&self) {
        if self.done.load(Ordering::Acquire) {
            self.carrier.diagnostics().complete_dropped();
            return;
        }
        self.sources.signal(|sources| self.subscribe_next(sources));
    }
}

impl<T, S> Subscription for ConcatSubscriber<T, S>
where
    T: Send + 'static,
    S: Sources<T> + 'static,
{
    fn request(&self, n: u64) {
        self.carrier.request(n);
    }

    fn cancel(&self) {
        self.carrier.cancel();
    }
}

impl<T, S> Introspect for ConcatSubscriber<T, S> {
    fn name(&self) -> &'static str {
        "concat_iterable"
    }

    fn lifecycle(&self) -> Lifecycle {
        if self.done.load(Ordering::Acquire) {
            Lifecycle::Terminated
        } else if self.carrier.is_cancelled() {
            Lifecycle::Cancelled
        } else {
            Lifecycle::Active
        }
    }

    fn requested(&self) -> Option<u64> {
        Some(self.carrier.requested())
    }
}
