// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use parking_lot::Mutex;
use reflux_core::{DiagnosticSink, Diagnostics, DroppedSignal};
use std::sync::Arc;

/// Diagnostic sink that keeps every dropped signal for later assertions.
///
/// Clones share the same buffer.
#[derive(Clone, Default)]
pub struct CollectingSink {
    signals: Arc<Mutex<Vec<DroppedSignal>>>,
}

impl CollectingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A [`Diagnostics`] handle reporting into this sink.
    #[must_use]
    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics::from_sink(Arc::new(self.clone()))
    }

    /// Signals collected so far, in arrival order.
    pub fn signals(&self) -> Vec<DroppedSignal> {
        self.signals.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.signals.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.lock().is_empty()
    }

    /// Number of collected signals matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&DroppedSignal) -> bool) -> usize {
        self.signals.lock().iter().filter(|s| predicate(s)).count()
    }
}

impl DiagnosticSink for CollectingSink {
    fn on_dropped(&self, signal: DroppedSignal) {
        self.signals.lock().push(signal);
    }
}
