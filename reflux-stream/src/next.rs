// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::ScalarDelayed;
use reflux_core::{Diagnostics, Publisher, PublisherRef, SubscriberRef};
use std::sync::Arc;

/// Publisher of the first value of `source`, or of nothing if `source` completes
/// empty.
///
/// The source is asked for exactly one value and cancelled once it arrives. The
/// value waits for downstream demand in a [`ScalarDelayed`].
pub struct Next<T> {
    source: PublisherRef<T>,
    diagnostics: Diagnostics,
}

impl<T> Next<T> {
    pub fn new(source: PublisherRef<T>) -> Self {
        Self {
            source,
            diagnostics: Diagnostics::default(),
        }
    }

    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }
}

impl<T: Send + 'static> Publisher<T> for Next<T> {
    fn subscribe(&self, subscriber: SubscriberRef<T>) {
        let rendezvous = Arc::new(ScalarDelayed::with_diagnostics(
            Arc::clone(&subscriber),
            self.diagnostics.clone(),
        ));
        subscriber.on_subscribe(rendezvous.clone());
        self.source.subscribe(rendezvous);
    }
}
