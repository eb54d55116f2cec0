// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use reflux_core::{RefluxError, Subscriber, SubscriptionRef, UNBOUNDED};
use reflux_test_utils::{ManualSubscription, TestSubscriber};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn test_requests_initial_demand_on_subscribe() -> anyhow::Result<()> {
    // Arrange
    let subscription = ManualSubscription::new();
    let subscriber = TestSubscriber::<i32>::with_request(3);

    // Act
    subscriber.on_subscribe(subscription.clone());

    // Assert
    assert!(subscriber.is_subscribed());
    assert_eq!(subscription.requested(), 3);
    assert_eq!(subscriber.requested(), 3);
    Ok(())
}

#[test]
fn test_manual_subscriber_requests_nothing() -> anyhow::Result<()> {
    // Arrange
    let subscription = ManualSubscription::new();
    let subscriber = TestSubscriber::<i32>::manual();

    // Act
    subscriber.on_subscribe(subscription.clone());

    // Assert
    assert_eq!(subscription.request_calls(), 0);
    subscriber.request(2);
    assert_eq!(subscription.requested(), 2);
    Ok(())
}

#[test]
fn test_records_values_and_completion() -> anyhow::Result<()> {
    // Arrange
    let subscriber = TestSubscriber::<i32>::new();
    subscriber.on_subscribe(ManualSubscription::new());

    // Act
    subscriber.on_next(1);
    subscriber.on_next(2);
    subscriber.on_complete();

    // Assert
    subscriber.assert_values(&[1, 2]);
    subscriber.assert_complete();
    assert!(subscriber.is_terminated());
    assert_eq!(subscriber.requested(), UNBOUNDED);
    Ok(())
}

#[test]
fn test_records_error() -> anyhow::Result<()> {
    // Arrange
    let subscriber = TestSubscriber::<i32>::new();
    subscriber.on_subscribe(ManualSubscription::new());

    // Act
    subscriber.on_error(RefluxError::stream_error("broken"));

    // Assert
    let error = subscriber.assert_error();
    assert_eq!(error.to_string(), "Stream processing error: broken");
    Ok(())
}

#[test]
fn test_with_error_borrows_the_original_user_error() -> anyhow::Result<()> {
    // Arrange
    let subscriber = TestSubscriber::<i32>::new();
    subscriber.on_subscribe(ManualSubscription::new());

    // Act
    subscriber.on_error(RefluxError::user_error(std::io::Error::other("disk gone")));

    // Assert
    let kind = subscriber.with_error(|error| match error {
        RefluxError::UserError(inner) => inner.downcast_ref::<std::io::Error>().map(|e| e.kind()),
        _ => None,
    });
    assert_eq!(kind, Some(std::io::ErrorKind::Other));
    assert!(matches!(
        subscriber.assert_error(),
        RefluxError::StreamProcessingError { .. }
    ));
    Ok(())
}

#[test]
fn test_flags_over_delivery() -> anyhow::Result<()> {
    // Arrange
    let subscriber = TestSubscriber::<i32>::with_request(1);
    subscriber.on_subscribe(ManualSubscription::new());

    // Act
    subscriber.on_next(1);
    subscriber.on_next(2);

    // Assert
    let violations = subscriber.violations();
    assert_eq!(violations.len(), 1);
    assert!(violations[0].contains("only 1 requested"));
    Ok(())
}

#[test]
fn test_flags_signals_before_subscribe_and_after_termination() -> anyhow::Result<()> {
    // Arrange
    let subscriber = TestSubscriber::<i32>::new();

    // Act
    subscriber.on_next(1);
    subscriber.on_subscribe(ManualSubscription::new());
    subscriber.on_complete();
    subscriber.on_complete();

    // Assert
    let violations = subscriber.violations();
    assert!(violations.iter().any(|v| v == "on_next before on_subscribe"));
    assert!(violations.iter().any(|v| v == "terminal signal after termination"));
    Ok(())
}

#[test]
fn test_second_subscription_is_cancelled_and_flagged() -> anyhow::Result<()> {
    // Arrange
    let first = ManualSubscription::new();
    let second = ManualSubscription::new();
    let subscriber = TestSubscriber::<i32>::new();
    subscriber.on_subscribe(first.clone());

    // Act
    subscriber.on_subscribe(second.clone() as SubscriptionRef);

    // Assert
    assert!(second.is_cancelled());
    assert!(!first.is_cancelled());
    assert_eq!(subscriber.violations(), vec!["on_subscribe called more than once"]);
    Ok(())
}

#[test]
fn test_cancel_reaches_the_subscription() -> anyhow::Result<()> {
    // Arrange
    let subscription = ManualSubscription::new();
    let subscriber = TestSubscriber::<i32>::new();
    subscriber.on_subscribe(subscription.clone());

    // Act
    subscriber.cancel();

    // Assert
    assert!(subscription.is_cancelled());
    Ok(())
}

#[test]
fn test_wait_terminal_sees_completion_from_another_thread() -> anyhow::Result<()> {
    // Arrange
    let subscriber = TestSubscriber::<i32>::new();
    subscriber.on_subscribe(ManualSubscription::new());
    let completer = Arc::clone(&subscriber);

    // Act
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        completer.on_complete();
    });

    // Assert
    assert!(subscriber.wait_terminal(Duration::from_secs(5)));
    handle.join().expect("completer panicked");
    subscriber.assert_complete();
    Ok(())
}

#[test]
fn test_wait_terminal_times_out() -> anyhow::Result<()> {
    // Arrange
    let subscriber = TestSubscriber::<i32>::new();
    subscriber.on_subscribe(ManualSubscription::new());

    // Act
    let terminated = subscriber.wait_terminal(Duration::from_millis(20));

    // Assert
    assert!(!terminated);
    subscriber.assert_not_terminated();
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_terminated_future_resolves_on_error() -> anyhow::Result<()> {
    // Arrange
    let subscriber = TestSubscriber::<i32>::new();
    subscriber.on_subscribe(ManualSubscription::new());
    let failer = Arc::clone(&subscriber);

    // Act
    let handle =
        tokio::task::spawn_blocking(move || failer.on_error(RefluxError::stream_error("late")));
    tokio::time::timeout(Duration::from_secs(5), subscriber.terminated()).await?;
    handle.await?;

    // Assert
    subscriber.assert_error();
    Ok(())
}
