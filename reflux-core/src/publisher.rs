// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::SubscriberRef;
use std::sync::Arc;

/// A source of values that emits only what its subscribers request.
///
/// `subscribe` must call [`Subscriber::on_subscribe`](crate::Subscriber::on_subscribe)
/// exactly once before any other signal, even when the publisher fails immediately.
/// A publisher may be subscribed to many times; each call starts an independent
/// sequence.
pub trait Publisher<T>: Send + Sync {
    /// Starts a new sequence towards `subscriber`.
    fn subscribe(&self, subscriber: SubscriberRef<T>);
}

/// Shared handle to a publisher.
pub type PublisherRef<T> = Arc<dyn Publisher<T>>;
