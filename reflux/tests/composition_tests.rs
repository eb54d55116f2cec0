// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! End-to-end scenarios composing several operators.

use reflux_rs::prelude::*;
use reflux_rs::{concat_from_fn, ConcatIterable, Diagnostics, DroppedSignal, FromFn, IterSources};
use reflux_test_utils::{sources, TestSubscriber};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

fn page(number: u64) -> PublisherRef<u64> {
    Arc::new(FromFn::new(move || Ok(number * 10)))
}

#[test]
fn test_pages_are_fetched_one_request_at_a_time() -> anyhow::Result<()> {
    // Arrange
    let fetched = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fetched);
    let pages = concat_from_fn(move || {
        let counter = Arc::clone(&counter);
        (0..5).map(move |number| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(page(number))
        })
    });
    let subscriber = TestSubscriber::<u64>::manual();
    pages.subscribe(subscriber.clone());

    // Act & Assert
    assert_eq!(fetched.load(Ordering::SeqCst), 1);
    for expected in 1..=5u64 {
        subscriber.request(1);
        assert_eq!(subscriber.value_count() as u64, expected);
    }

    assert_eq!(subscriber.values(), vec![0, 10, 20, 30, 40]);
    assert_eq!(fetched.load(Ordering::SeqCst), 5);
    subscriber.assert_complete();
    Ok(())
}

#[test]
fn test_first_value_past_a_threshold_across_pages() -> anyhow::Result<()> {
    // Arrange
    let readings = concat(vec![
        sources::from_iter(vec![3, 8, 12]),
        sources::from_iter(vec![19, 25, 40]),
        sources::from_iter(vec![41, 60]),
    ]);
    let first_alarm = readings.skip_while(|reading| *reading < 20).next();
    let subscriber = TestSubscriber::<i32>::new();

    // Act
    first_alarm.subscribe(subscriber.clone());

    // Assert
    subscriber.assert_values(&[25]);
    subscriber.assert_complete();
    Ok(())
}

#[test]
fn test_every_subscription_walks_a_fresh_sequence() -> anyhow::Result<()> {
    // Arrange
    let factory_calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&factory_calls);
    let chain = concat_from_fn(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        vec![Ok(sources::range(0, 2)), Ok(sources::range(7, 1))]
    });
    let first = TestSubscriber::<u64>::new();
    let second = TestSubscriber::<u64>::new();

    // Act
    chain.subscribe(first.clone());
    chain.subscribe(second.clone());

    // Assert
    assert_eq!(factory_calls.load(Ordering::SeqCst), 2);
    first.assert_values(&[0, 1, 7]);
    second.assert_values(&[0, 1, 7]);
    Ok(())
}

#[test]
fn test_nested_concatenation_flattens_in_order() -> anyhow::Result<()> {
    // Arrange
    let inner = concat(vec![sources::range(0, 2), sources::range(2, 2)]);
    let outer = concat(vec![inner.clone(), sources::empty(), inner]);
    let subscriber = TestSubscriber::<u64>::with_request(3);

    // Act
    outer.subscribe(subscriber.clone());
    subscriber.assert_values(&[0, 1, 2]);
    subscriber.request(UNBOUNDED);

    // Assert
    subscriber.assert_values(&[0, 1, 2, 3, 0, 1, 2, 3]);
    subscriber.assert_complete();
    Ok(())
}

#[test]
fn test_custom_diagnostics_receive_rejected_requests() -> anyhow::Result<()> {
    // Arrange
    let rejected = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&rejected);
    let diagnostics = Diagnostics::from_fn(move |signal| {
        if matches!(signal, DroppedSignal::BadRequest { .. }) {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });
    let chain = ConcatIterable::<u64, _>::new(|| -> reflux_rs::Result<_> {
        let parts: Vec<reflux_rs::Result<PublisherRef<u64>>> = vec![Ok(sources::range(0, 3))];
        Ok(IterSources::new(parts))
    })
    .with_diagnostics(diagnostics);
    let subscriber = TestSubscriber::<u64>::manual();
    chain.subscribe(subscriber.clone());

    // Act
    subscriber.request(0);
    subscriber.request(2);

    // Assert
    assert_eq!(rejected.load(Ordering::SeqCst), 1);
    subscriber.assert_values(&[0, 1]);
    subscriber.assert_no_violations();
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_threaded_sources_with_concurrent_demand() -> anyhow::Result<()> {
    // Arrange
    let parts: Vec<PublisherRef<u64>> = (0..200).map(|n| sources::on_thread(page(n))).collect();
    let chain = concat(parts);
    let subscriber = TestSubscriber::<u64>::manual();
    chain.subscribe(subscriber.clone());

    // Act
    let requesters: Vec<_> = (0..4)
        .map(|_| {
            let subscriber = subscriber.clone();
            tokio::task::spawn_blocking(move || {
                for _ in 0..50 {
                    subscriber.request(1);
                }
            })
        })
        .collect();
    for requester in requesters {
        requester.await?;
    }
    timeout(Duration::from_secs(10), subscriber.terminated()).await?;

    // Assert
    let expected: Vec<u64> = (0..200).map(|n| n * 10).collect();
    assert_eq!(subscriber.values(), expected);
    subscriber.assert_complete();
    Ok(())
}
