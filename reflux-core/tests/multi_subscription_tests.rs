// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use reflux_core::{
    DroppedSignal, Introspect, Lifecycle, MultiSubscription, Subscription, UNBOUNDED,
};
use reflux_test_utils::{CollectingSink, ManualSubscription, TestSubscriber};
use std::sync::{Arc, Barrier};
use std::thread;

fn carrier() -> MultiSubscription<i32> {
    MultiSubscription::new(TestSubscriber::<i32>::manual())
}

fn carrier_with(sink: &CollectingSink) -> MultiSubscription<i32> {
    MultiSubscription::with_diagnostics(TestSubscriber::<i32>::manual(), sink.diagnostics())
}

#[test]
fn test_demand_before_first_subscription_is_flushed_once() {
    // Arrange
    let carrier = carrier();
    let upstream = ManualSubscription::new();

    // Act
    carrier.request(3);
    carrier.request(4);
    carrier.set_subscription(upstream.clone());

    // Assert
    assert_eq!(upstream.requested(), 7);
    assert_eq!(upstream.request_calls(), 1);
    assert_eq!(carrier.requested(), 7);
}

#[test]
fn test_no_request_issued_without_demand() {
    // Arrange
    let carrier = carrier();
    let upstream = ManualSubscription::new();

    // Act
    carrier.set_subscription(upstream.clone());

    // Assert
    assert_eq!(upstream.request_calls(), 0);
}

#[test]
fn test_request_is_forwarded_to_live_upstream() {
    // Arrange
    let carrier = carrier();
    let upstream = ManualSubscription::new();
    carrier.set_subscription(upstream.clone());

    // Act
    carrier.request(2);
    carrier.request(5);

    // Assert
    assert_eq!(upstream.requested(), 7);
    assert_eq!(upstream.request_calls(), 2);
    assert_eq!(carrier.requested(), 7);
}

#[test]
fn test_next_upstream_receives_only_outstanding_demand() {
    // Arrange
    let carrier = carrier();
    let first = ManualSubscription::new();
    let second = ManualSubscription::new();
    carrier.request(10);
    carrier.set_subscription(first.clone());

    // Act
    carrier.produced(4);
    carrier.set_subscription(second.clone());

    // Assert
    assert_eq!(first.requested(), 10);
    assert_eq!(second.requested(), 6);
    assert!(!first.is_cancelled(), "switching must not cancel the old upstream");
}

#[test]
fn test_fully_consumed_demand_issues_no_request() {
    // Arrange
    let carrier = carrier();
    let first = ManualSubscription::new();
    let second = ManualSubscription::new();
    carrier.request(2);
    carrier.set_subscription(first);

    // Act
    carrier.produced_one();
    carrier.produced_one();
    carrier.set_subscription(second.clone());

    // Assert
    assert_eq!(carrier.requested(), 0);
    assert_eq!(second.request_calls(), 0);
}

#[test]
fn test_excess_production_is_reported_and_clamped() {
    // Arrange
    let sink = CollectingSink::new();
    let carrier = carrier_with(&sink);
    carrier.request(2);

    // Act
    carrier.produced(5);

    // Assert
    assert_eq!(carrier.requested(), 0);
    let signals = sink.signals();
    assert_eq!(signals.len(), 1);
    assert!(matches!(
        signals[0],
        DroppedSignal::ExcessProduction {
            requested: 2,
            produced: 5
        }
    ));
}

#[test]
fn test_unbounded_demand_is_sticky() {
    // Arrange
    let carrier = carrier();
    let first = ManualSubscription::new();
    let second = ManualSubscription::new();

    // Act
    carrier.request(UNBOUNDED);
    carrier.set_subscription(first.clone());
    carrier.produced(1_000);
    carrier.request(5);
    carrier.set_subscription(second.clone());

    // Assert
    assert!(carrier.is_unbounded());
    assert_eq!(carrier.requested(), UNBOUNDED);
    assert_eq!(first.requested(), UNBOUNDED);
    assert_eq!(first.request_calls(), 1);
    assert_eq!(second.requested(), UNBOUNDED);
}

#[test]
fn test_accumulated_demand_saturates_to_unbounded() {
    // Arrange
    let carrier = carrier();

    // Act
    carrier.request(UNBOUNDED - 1);
    carrier.request(5);

    // Assert
    assert!(carrier.is_unbounded());
    assert_eq!(carrier.requested(), UNBOUNDED);
}

#[test]
fn test_zero_request_is_reported_and_ignored() {
    // Arrange
    let sink = CollectingSink::new();
    let carrier = carrier_with(&sink);
    let upstream = ManualSubscription::new();
    carrier.set_subscription(upstream.clone());

    // Act
    carrier.request(0);

    // Assert
    assert_eq!(upstream.request_calls(), 0);
    assert_eq!(carrier.requested(), 0);
    assert_eq!(
        sink.count(|s| matches!(s, DroppedSignal::BadRequest { requested: 0 })),
        1
    );
}

#[test]
fn test_cancel_cancels_current_and_every_later_upstream() {
    // Arrange
    let carrier = carrier();
    let first = ManualSubscription::new();
    let second = ManualSubscription::new();
    carrier.request(3);
    carrier.set_subscription(first.clone());

    // Act
    carrier.cancel();
    carrier.set_subscription(second.clone());
    carrier.request(1);

    // Assert
    assert!(carrier.is_cancelled());
    assert!(first.is_cancelled());
    assert!(second.is_cancelled());
    assert_eq!(second.request_calls(), 0);
    assert_eq!(first.requested(), 3);
}

#[test]
fn test_cancel_is_idempotent() {
    // Arrange
    let carrier = carrier();
    let upstream = ManualSubscription::new();
    carrier.set_subscription(upstream.clone());

    // Act
    carrier.cancel();
    carrier.cancel();

    // Assert
    assert!(upstream.is_cancelled());
    assert_eq!(carrier.lifecycle(), Lifecycle::Cancelled);
}

#[test]
fn test_introspection_reports_outstanding_demand() {
    // Arrange
    let carrier = carrier();

    // Act
    carrier.request(8);
    carrier.produced(3);

    // Assert
    assert_eq!(carrier.name(), "multi_subscription");
    assert_eq!(carrier.lifecycle(), Lifecycle::Active);
    assert_eq!(Introspect::requested(&carrier), Some(5));
}

#[test]
fn test_carrier_is_usable_as_subscription_ref() {
    // Arrange
    let carrier = Arc::new(carrier());
    let upstream = ManualSubscription::new();
    carrier.set_subscription(upstream.clone());
    let handle: reflux_core::SubscriptionRef = carrier.clone();

    // Act
    handle.request(4);
    handle.cancel();

    // Assert
    assert_eq!(upstream.requested(), 4);
    assert!(upstream.is_cancelled());
}

#[test]
fn test_concurrent_requests_and_switches_lose_no_demand() {
    const REQUESTS: u64 = 10_000;
    const SWITCHES: usize = 200;

    // Arrange
    let carrier = Arc::new(carrier());
    let barrier = Arc::new(Barrier::new(2));
    let upstreams: Vec<_> = (0..SWITCHES).map(|_| ManualSubscription::new()).collect();

    // Act
    let requester = {
        let carrier = carrier.clone();
        let barrier = barrier.clone();
        thread::spawn(move || {
            barrier.wait();
            for _ in 0..REQUESTS {
                carrier.request(1);
            }
        })
    };
    let switcher = {
        let carrier = carrier.clone();
        let upstreams = upstreams.clone();
        thread::spawn(move || {
            barrier.wait();
            for upstream in upstreams {
                carrier.set_subscription(upstream);
            }
        })
    };
    requester.join().unwrap();
    switcher.join().unwrap();

    // Assert
    assert_eq!(carrier.requested(), REQUESTS);
    let last = upstreams.last().unwrap();
    assert_eq!(last.requested(), REQUESTS);
    for upstream in &upstreams {
        assert!(upstream.requested() <= REQUESTS);
    }
}

#[test]
fn test_concurrent_production_accounting_is_exact() {
    const THREADS: u64 = 4;
    const PER_THREAD: u64 = 2_500;

    // Arrange
    let sink = CollectingSink::new();
    let carrier = Arc::new(carrier_with(&sink));
    carrier.request(THREADS * PER_THREAD + 10);
    let barrier = Arc::new(Barrier::new(THREADS as usize));

    // Act
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let carrier = carrier.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..PER_THREAD {
                    carrier.produced_one();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // Assert
    assert_eq!(carrier.requested(), 10);
    assert!(sink.is_empty());
}

#[test]
fn test_cancel_racing_with_switch_leaves_last_upstream_cancelled() {
    for _ in 0..200 {
        // Arrange
        let carrier = Arc::new(carrier());
        let barrier = Arc::new(Barrier::new(2));
        let upstreams: Vec<_> = (0..20).map(|_| ManualSubscription::new()).collect();

        // Act
        let switcher = {
            let carrier = carrier.clone();
            let barrier = barrier.clone();
            let upstreams = upstreams.clone();
            thread::spawn(move || {
                barrier.wait();
                for upstream in upstreams {
                    carrier.set_subscription(upstream);
                }
            })
        };
        barrier.wait();
        carrier.cancel();
        switcher.join().unwrap();

        // Assert
        assert!(upstreams.last().unwrap().is_cancelled());
    }
}
