//! Failure injection tests for the resilience layer.

use std::time::Duration;

use futures_util::StreamExt;
use tokio::time::Instant;

use store_gateway::resilience::ResilienceError;
use store_gateway::store::{CollectionKind, DocRef, ErrorCode};

mod common;

fn doc() -> DocRef {
    DocRef::new(CollectionKind::Jobs, "j1")
}

#[tokio::test(start_paused = true)]
async fn test_circuit_trips_then_recovers() {
    let mut config = common::fast_config();
    config.resilience.failure_threshold = 5;
    config.resilience.max_retries = 0;
    let (store, client) = common::client_with(vec![common::job("j1", "Lineman", "WA")], &config);

    store.fail_next(ErrorCode::Unavailable, 5);
    for call in 1..=5 {
        let err = client.get(doc()).await.unwrap_err();
        assert!(
            matches!(err, ResilienceError::RetriesExhausted { .. }),
            "call {} should fail with the backend error",
            call
        );
    }
    assert!(client.circuit_status().is_open);

    // Call 6: immediate rejection, no backend call, no delay.
    store.reset_call_count();
    let start = Instant::now();
    let err = client.get(doc()).await.unwrap_err();
    assert!(err.is_circuit_open());
    assert_eq!(store.call_count(), 0);
    assert_eq!(start.elapsed(), Duration::ZERO);

    // Call 7: after the timeout the backend is tried again.
    tokio::time::advance(Duration::from_secs(60)).await;
    let record = client.get(doc()).await.unwrap();
    assert!(record.is_some());
    assert_eq!(store.call_count(), 1);

    let status = client.circuit_status();
    assert!(!status.is_open);
    assert_eq!(status.failure_count, 0);
}

#[tokio::test(start_paused = true)]
async fn test_each_call_exhausts_retries_before_counting() {
    let mut config = common::fast_config();
    config.resilience.failure_threshold = 2;
    let (store, client) = common::client_with(Vec::new(), &config);

    store.fail_next(ErrorCode::DeadlineExceeded, 100);
    let start = Instant::now();
    let err = client.get(doc()).await.unwrap_err();
    match &err {
        ResilienceError::RetriesExhausted { operation, retries, source } => {
            assert_eq!(operation, "jobs.get");
            assert_eq!(*retries, 3);
            assert_eq!(source.code, ErrorCode::DeadlineExceeded);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    // max_retries + 1 attempts, delays 100 + 200 + 400 ms.
    assert_eq!(store.call_count(), 4);
    assert_eq!(start.elapsed(), Duration::from_millis(700));

    let status = client.circuit_status();
    assert!(!status.is_open);
    assert_eq!(status.failure_count, 1);
}

#[tokio::test(start_paused = true)]
async fn test_permanent_error_single_attempt() {
    let (store, client) = common::client_with(Vec::new(), &common::fast_config());
    store.fail_next(ErrorCode::PermissionDenied, 1);

    let start = Instant::now();
    let err = client.get(doc()).await.unwrap_err();
    assert!(matches!(err, ResilienceError::Permanent { .. }));
    assert_eq!(err.code(), Some(ErrorCode::PermissionDenied));
    assert_eq!(store.call_count(), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_eq!(client.circuit_status().failure_count, 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_trial_keeps_circuit_open() {
    let mut config = common::fast_config();
    config.resilience.failure_threshold = 1;
    config.resilience.circuit_timeout_secs = 30;
    let (store, client) = common::client_with(Vec::new(), &config);

    store.fail_next(ErrorCode::NotFound, 2);
    client.get(doc()).await.unwrap_err();
    assert!(client.circuit_status().is_open);

    tokio::time::advance(Duration::from_secs(30)).await;
    let err = client.get(doc()).await.unwrap_err();
    assert!(!err.is_circuit_open());

    let status = client.circuit_status();
    assert!(status.is_open);
    assert_eq!(status.time_until_reset, Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn test_stream_rejected_while_open() {
    let mut config = common::fast_config();
    config.resilience.failure_threshold = 1;
    let (store, client) = common::client_with(vec![common::job("j1", "Lineman", "WA")], &config);

    store.fail_next(ErrorCode::InvalidArgument, 1);
    client.get(doc()).await.unwrap_err();

    store.reset_call_count();
    let items: Vec<_> = client
        .get_optimized(CollectionKind::Jobs, 10, None, Vec::new())
        .collect()
        .await;
    assert_eq!(items.len(), 1);
    assert!(items[0].as_ref().unwrap_err().is_circuit_open());
    assert_eq!(store.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_search_degrades_without_touching_breaker() {
    let mut config = common::fast_config();
    config.resilience.failure_threshold = 1;
    let (store, client) = common::client_with(common::seeded_locals(), &config);

    store.fail_next(ErrorCode::Unavailable, 2);
    assert!(client.search_enhanced("ibew local", None, 5).await.is_empty());

    let status = client.circuit_status();
    assert!(!status.is_open);
    assert_eq!(status.failure_count, 0);
    assert_eq!(client.search_stats().error_rate, 1.0);
}
