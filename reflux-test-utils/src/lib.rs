// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Test utilities and fixtures for the Reflux reactive streams core.
//!
//! Designed for development and testing only, not for production code.
//!
//! # Key Types
//!
//! - [`TestSubscriber`] records every signal it receives, lets the test drive demand,
//!   and flags contract violations such as over-delivery or a second terminal signal.
//! - [`ManualPublisher`] hands the test full control over what a producer signals,
//!   including misbehaviour, and records the demand it was given.
//! - [`sources`] holds well-behaved publishers over fixed data that honour demand.
//! - [`CollectingSink`] captures dropped signals for assertions.
//!
//! # Example
//!
//! ```rust
//! use reflux_core::Publisher;
//! use reflux_test_utils::{sources, TestSubscriber};
//!
//! let subscriber = TestSubscriber::<i32>::with_request(2);
//! sources::from_iter(vec![1, 2, 3]).subscribe(subscriber.clone());
//!
//! subscriber.assert_values(&[1, 2]);
//! subscriber.assert_not_terminated();
//!
//! subscriber.request(1);
//! subscriber.assert_values(&[1, 2, 3]);
//! subscriber.assert_complete();
//! ```

#![allow(clippy::multiple_crate_versions, clippy::doc_markdown)]
pub mod collecting_sink;
pub mod manual_publisher;
pub mod sources;
pub mod test_subscriber;

pub use collecting_sink::CollectingSink;
pub use manual_publisher::{ManualPublisher, ManualSubscription};
pub use test_subscriber::TestSubscriber;
