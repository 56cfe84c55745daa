use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
};
use std::time::Duration;

use anyhow::{Result, anyhow};
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;

use notify_service::models::retry::{RetryConfig, RetryDelay};
use notify_service::retry::{RetryError, RetryService};

fn retry_service(max_attempts: u32) -> RetryService {
    RetryService::new(RetryConfig {
        max_attempts,
        operation_timeout_seconds: 5,
    })
}

/// Test: a succeeding operation is invoked exactly once
#[tokio::test]
async fn test_successful_operation_single_attempt() -> Result<()> {
    let retry = retry_service(3);
    let cancel = CancellationToken::new();

    let attempt_count = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&attempt_count);

    let result = retry
        .execute_with_retry("test op", &cancel, || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, anyhow::Error>("done")
            }
        })
        .await?;

    assert_eq!(result, "done");
    assert_eq!(attempt_count.load(Ordering::SeqCst), 1);

    Ok(())
}

/// Test: failing k-1 times with a budget of k succeeds on invocation k
#[tokio::test]
async fn test_eventual_success_invokes_exactly_k_times() -> Result<()> {
    let retry = retry_service(4);
    let cancel = CancellationToken::new();

    let attempt_count = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&attempt_count);

    let result = retry
        .execute_with_retry("flaky op", &cancel, || {
            let counter = Arc::clone(&counter);
            async move {
                let attempts = counter.fetch_add(1, Ordering::SeqCst);
                if attempts < 3 {
                    Err(anyhow!("Transient error"))
                } else {
                    Ok("done")
                }
            }
        })
        .await?;

    assert_eq!(result, "done");
    assert_eq!(attempt_count.load(Ordering::SeqCst), 4);

    Ok(())
}

/// Test: an always-failing operation is invoked exactly k times, and the
/// raised error carries the operation name and the last failure
#[tokio::test]
async fn test_exhaustion_carries_operation_name_and_last_error() {
    let retry = retry_service(3);
    let cancel = CancellationToken::new();

    let attempt_count = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&attempt_count);

    let result = retry
        .execute_with_retry("doomed op", &cancel, || {
            let counter = Arc::clone(&counter);
            async move {
                let attempt = counter.fetch_add(1, Ordering::SeqCst) + 1;
                Err::<(), _>(anyhow!("failure #{attempt}"))
            }
        })
        .await;

    assert_eq!(attempt_count.load(Ordering::SeqCst), 3);

    match result {
        Err(RetryError::Exhausted {
            operation,
            attempts,
            last_error,
        }) => {
            assert_eq!(operation, "doomed op");
            assert_eq!(attempts, 3);
            assert!(last_error.to_string().contains("failure #3"));
        }
        other => panic!("Expected Exhausted, got {other:?}"),
    }
}

/// Test: an attempt exceeding the timeout counts as a failed attempt
#[tokio::test]
async fn test_timeout_counts_as_failed_attempt() {
    let retry = RetryService::new(RetryConfig {
        max_attempts: 2,
        operation_timeout_seconds: 1,
    });
    let cancel = CancellationToken::new();

    let attempt_count = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&attempt_count);

    let result = retry
        .execute_with_retry::<(), _, _>("slow op", &cancel, || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                sleep(Duration::from_secs(10)).await;
                Ok(())
            }
        })
        .await;

    assert_eq!(attempt_count.load(Ordering::SeqCst), 2);

    match result {
        Err(RetryError::Exhausted { last_error, .. }) => {
            assert!(last_error.to_string().contains("timed out"));
        }
        other => panic!("Expected Exhausted, got {other:?}"),
    }
}

/// Test: cancellation short-circuits instead of being retried
#[tokio::test]
async fn test_cancellation_propagates_immediately() {
    let retry = retry_service(10);
    let cancel = CancellationToken::new();

    let cancel_handle = cancel.clone();
    tokio::spawn(async move {
        sleep(Duration::from_millis(100)).await;
        cancel_handle.cancel();
    });

    let start = Instant::now();
    let result = retry
        .execute_with_retry::<(), _, _>("pending op", &cancel, || async {
            std::future::pending::<()>().await;
            Ok(())
        })
        .await;

    assert!(
        matches!(result, Err(RetryError::Cancelled { ref operation }) if operation.as_str() == "pending op"),
        "Expected Cancelled, got {result:?}"
    );
    assert!(
        start.elapsed() < Duration::from_secs(2),
        "Cancellation should not wait for the attempt timeout"
    );
}

/// Test: the default policy retries without inter-attempt delay
#[tokio::test]
async fn test_immediate_policy_has_no_backoff() {
    let retry = retry_service(5);
    let cancel = CancellationToken::new();

    let start = Instant::now();
    let _ = retry
        .execute_with_retry::<(), _, _>("fast fail", &cancel, || async {
            Err(anyhow!("fail"))
        })
        .await;

    assert!(
        start.elapsed() < Duration::from_millis(200),
        "Immediate policy should not sleep between attempts"
    );
}

/// Test: the backoff policy delays between attempts without changing the
/// attempt budget
#[tokio::test]
async fn test_backoff_policy_delays_between_attempts() {
    let retry = retry_service(3).with_delay(RetryDelay::ExponentialBackoff {
        initial_delay_ms: 100,
        max_delay_ms: 1000,
        backoff_multiplier: 2,
    });
    let cancel = CancellationToken::new();

    let attempt_count = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&attempt_count);

    let start = Instant::now();
    let _ = retry
        .execute_with_retry::<(), _, _>("backed-off op", &cancel, || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(anyhow!("fail"))
            }
        })
        .await;

    assert_eq!(attempt_count.load(Ordering::SeqCst), 3);

    // Two delays: ~100ms and ~200ms, each jittered by up to 10%.
    let elapsed = start.elapsed();
    assert!(
        elapsed >= Duration::from_millis(250),
        "Expected backoff delays, elapsed only {elapsed:?}"
    );
}
