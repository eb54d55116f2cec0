// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![allow(clippy::multiple_crate_versions, clippy::doc_markdown)]
//! Operators built on the Reflux demand contract.
//!
//! | Operator | Kind | Concurrency |
//! |----------|------|-------------|
//! | [`ConcatIterable`] | subscribes to sources one after another | drain loop, any thread |
//! | [`ScalarDelayed`] | releases one value once both value and demand exist | CAS rendezvous |
//! | [`SkipWhile`] | drops a prefix selected by a predicate | single producer thread |
//!
//! [`FromFn`] and [`Next`] are small publishers built on [`ScalarDelayed`].
//! [`PublisherExt`] adds the operators as methods on [`PublisherRef`](reflux_core::PublisherRef).
//!
//! ```
//! use reflux_core::Publisher;
//! use reflux_stream::{concat, PublisherExt};
//! use reflux_test_utils::{sources, TestSubscriber};
//!
//! let chained = concat(vec![sources::from_iter(vec![1, 2]), sources::from_iter(vec![3, 4])])
//!     .skip_while(|value| *value < 2);
//!
//! let subscriber = TestSubscriber::<i32>::new();
//! chained.subscribe(subscriber.clone());
//!
//! subscriber.assert_values(&[2, 3, 4]);
//! subscriber.assert_complete();
//! ```

#[macro_use]
mod logging;

pub mod concat_iterable;
pub mod from_fn;
pub mod next;
pub mod publisher_ext;
pub mod scalar_delayed;
pub mod skip_while;

pub use self::concat_iterable::{
    concat, concat_from_fn, ConcatIterable, ConcatSubscriber, IterSources, Sources,
};
pub use self::from_fn::FromFn;
pub use self::next::Next;
pub use self::publisher_ext::PublisherExt;
pub use self::scalar_delayed::ScalarDelayed;
pub use self::skip_while::{SkipWhile, SkipWhileSubscriber};
