// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use reflux_core::{DiagnosticSink, Diagnostics, DroppedSignal, Lifecycle, RefluxError};
use reflux_test_utils::CollectingSink;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn test_from_fn_receives_every_report() {
    // Arrange
    let count = Arc::new(AtomicUsize::new(0));
    let counter = count.clone();
    let diagnostics = Diagnostics::from_fn(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    // Act
    diagnostics.complete_dropped();
    diagnostics.next_dropped::<u8>();
    diagnostics.error_dropped(RefluxError::stream_error("late"));

    // Assert
    assert_eq!(count.load(Ordering::SeqCst), 3);
}

#[test]
fn test_clones_share_the_sink() {
    // Arrange
    let sink = CollectingSink::new();
    let diagnostics = sink.diagnostics();
    let clone = diagnostics.clone();

    // Act
    diagnostics.complete_dropped();
    clone.complete_dropped();

    // Assert
    assert_eq!(sink.len(), 2);
}

#[test]
fn test_custom_sink_via_trait() {
    struct Counting(AtomicUsize);

    impl DiagnosticSink for Counting {
        fn on_dropped(&self, _signal: DroppedSignal) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    let sink = Arc::new(Counting(AtomicUsize::new(0)));
    let diagnostics = Diagnostics::from_sink(sink.clone());

    diagnostics.report(DroppedSignal::DuplicateSubscription);

    assert_eq!(sink.0.load(Ordering::SeqCst), 1);
}

#[test]
fn test_silent_and_logging_sinks_accept_reports() {
    Diagnostics::silent().complete_dropped();
    Diagnostics::logging().report(DroppedSignal::BadRequest { requested: 0 });
}

#[test]
fn test_next_dropped_records_value_type() {
    let sink = CollectingSink::new();

    sink.diagnostics().next_dropped::<String>();

    let signals = sink.signals();
    match &signals[..] {
        [DroppedSignal::Next { type_name }] => assert!(type_name.contains("String")),
        other => panic!("unexpected signals: {other:?}"),
    }
}

#[test]
fn test_error_dropped_keeps_the_error() {
    let sink = CollectingSink::new();

    sink.diagnostics()
        .error_dropped(RefluxError::protocol_violation("second terminal"));

    match &sink.signals()[..] {
        [DroppedSignal::Error(error)] => assert!(error.is_protocol_violation()),
        other => panic!("unexpected signals: {other:?}"),
    }
}

#[test]
fn test_dropped_signal_display() {
    assert_eq!(
        DroppedSignal::Complete.to_string(),
        "on_complete after termination"
    );
    assert_eq!(
        DroppedSignal::BadRequest { requested: 0 }.to_string(),
        "request(0) rejected: amount must be positive"
    );
    assert_eq!(
        DroppedSignal::DuplicateSubscription.to_string(),
        "on_subscribe called more than once"
    );
    assert_eq!(
        DroppedSignal::ExcessProduction {
            requested: 1,
            produced: 3
        }
        .to_string(),
        "produced 3 values against 1 outstanding requests"
    );
    assert_eq!(
        DroppedSignal::next::<u32>().to_string(),
        "on_next(u32) after termination"
    );
    assert_eq!(
        DroppedSignal::Error(RefluxError::stream_error("x")).to_string(),
        "on_error after termination: Stream processing error: x"
    );
}

#[test]
fn test_diagnostics_debug_is_opaque() {
    assert_eq!(format!("{:?}", Diagnostics::silent()), "Diagnostics { .. }");
}

#[test]
fn test_lifecycle_finished_states() {
    assert!(!Lifecycle::Idle.is_finished());
    assert!(!Lifecycle::Active.is_finished());
    assert!(Lifecycle::Terminated.is_finished());
    assert!(Lifecycle::Cancelled.is_finished());
}
