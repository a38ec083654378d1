//! Fetcher tests against scripted HTTP clients.
//!
//! Backoff timing tests run with tokio's clock paused, so sleeps complete
//! instantly and call timestamps are exact.

use super::*;
use crate::coord::TileCoord;
use crate::provider::{HttpResponse, MockAsyncHttpClient, ProviderError, Scripted, UrlTemplate};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

// ===== Test Helpers =====

fn request(max_attempts: u32, delay: Duration) -> FetchRequest {
    FetchRequest::new(
        TileCoord::new(3, 5, 4),
        UrlTemplate::new("http://tiles.test/{z}/{x}/{y}.png"),
        Scale::One,
        RetryPolicy::new(max_attempts, Duration::from_secs(5), delay),
    )
}

fn status(code: u16) -> Scripted {
    Scripted::Respond(HttpResponse::new(code, b"error".to_vec()))
}

fn ok(body: &[u8]) -> Scripted {
    Scripted::Respond(HttpResponse::ok(body.to_vec()))
}

fn scripted_fetcher(
    script: Vec<Scripted>,
    fallback: Scripted,
) -> (Fetcher<MockAsyncHttpClient>, Arc<MockAsyncHttpClient>) {
    let client = Arc::new(MockAsyncHttpClient::new(script, fallback));
    (Fetcher::new(Arc::clone(&client)), client)
}

fn gaps(client: &MockAsyncHttpClient) -> Vec<Duration> {
    client
        .call_times()
        .windows(2)
        .map(|w| w[1].duration_since(w[0]))
        .collect()
}

// ===== Success paths =====

#[tokio::test]
async fn test_first_attempt_success() {
    let (fetcher, client) = scripted_fetcher(vec![], ok(b"png-bytes"));

    let outcome = fetcher.fetch(&request(5, Duration::from_secs(1))).await;

    assert_eq!(
        outcome,
        FetchOutcome::Success {
            bytes: b"png-bytes".to_vec()
        }
    );
    assert_eq!(client.call_count(), 1);
}

#[tokio::test]
async fn test_placeholders_resolved_in_request_url() {
    let (fetcher, client) = scripted_fetcher(vec![], ok(b"x"));
    fetcher.fetch(&request(1, Duration::ZERO)).await;
    assert_eq!(client.urls(), vec!["http://tiles.test/4/3/5.png"]);
}

#[tokio::test(start_paused = true)]
async fn test_transient_then_success() {
    let (fetcher, client) = scripted_fetcher(vec![status(503)], ok(b"tile"));

    let outcome = fetcher.fetch(&request(5, Duration::from_secs(2))).await;

    assert!(outcome.is_success());
    assert_eq!(client.call_count(), 2);
    assert_eq!(gaps(&client), vec![Duration::from_secs(2)]);
}

// ===== Retry budget =====

#[tokio::test(start_paused = true)]
async fn test_exhaustion_after_max_attempts() {
    let (fetcher, client) = scripted_fetcher(vec![], status(500));

    let outcome = fetcher.fetch(&request(4, Duration::from_secs(1))).await;

    assert_eq!(outcome.failure_kind(), Some(FailureKind::Exhausted));
    assert_eq!(client.call_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_doubles_between_attempts() {
    let (fetcher, client) = scripted_fetcher(vec![], status(502));

    fetcher.fetch(&request(4, Duration::from_secs(1))).await;

    assert_eq!(
        gaps(&client),
        vec![
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_secs(4)
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_not_found_consumes_full_budget() {
    let (fetcher, client) = scripted_fetcher(vec![], status(404));

    let outcome = fetcher.fetch(&request(3, Duration::from_millis(100))).await;

    assert_eq!(outcome.failure_kind(), Some(FailureKind::NotFound));
    assert_eq!(client.call_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_final_attempt_decides_not_found() {
    let (fetcher, _) = scripted_fetcher(vec![status(404), status(404)], status(500));
    let outcome = fetcher.fetch(&request(3, Duration::ZERO)).await;
    assert_eq!(outcome.failure_kind(), Some(FailureKind::Exhausted));

    let (fetcher, _) = scripted_fetcher(vec![status(500), status(500)], status(404));
    let outcome = fetcher.fetch(&request(3, Duration::ZERO)).await;
    assert_eq!(outcome.failure_kind(), Some(FailureKind::NotFound));
}

#[tokio::test(start_paused = true)]
async fn test_empty_body_is_retried() {
    let (fetcher, client) = scripted_fetcher(vec![ok(b"")], ok(b"data"));

    let outcome = fetcher.fetch(&request(3, Duration::from_secs(1))).await;

    assert!(outcome.is_success());
    assert_eq!(client.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_transport_error_is_retried() {
    let (fetcher, client) = scripted_fetcher(
        vec![Scripted::Fail(ProviderError::Transport(
            "connection reset".to_string(),
        ))],
        ok(b"data"),
    );

    assert!(fetcher
        .fetch(&request(2, Duration::from_secs(1)))
        .await
        .is_success());
    assert_eq!(client.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_counts_as_attempt() {
    let (fetcher, client) = scripted_fetcher(vec![Scripted::Hang], ok(b"late"));

    let outcome = fetcher.fetch(&request(2, Duration::from_secs(1))).await;

    assert!(outcome.is_success());
    // 5 s timeout, then 1 s backoff
    assert_eq!(gaps(&client), vec![Duration::from_secs(6)]);
}

#[tokio::test(start_paused = true)]
async fn test_single_attempt_policy_never_sleeps() {
    let (fetcher, client) = scripted_fetcher(vec![], status(500));
    let start = tokio::time::Instant::now();

    let outcome = fetcher.fetch(&request(1, Duration::from_secs(30))).await;

    assert!(outcome.is_failure());
    assert_eq!(client.call_count(), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

// ===== fetch_to_file =====

#[tokio::test]
async fn test_fetch_to_file_writes_body() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("tile.png");
    let (fetcher, _) = scripted_fetcher(vec![], ok(b"\x89PNG-data"));

    let outcome = fetcher
        .fetch_to_file(&request(2, Duration::ZERO), &path)
        .await;

    assert!(outcome.is_success());
    assert_eq!(std::fs::read(&path).unwrap(), b"\x89PNG-data");
}

#[tokio::test]
async fn test_fetch_to_file_write_failure_consumes_attempts() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("missing-dir").join("tile.png");
    let (fetcher, client) = scripted_fetcher(vec![], ok(b"data"));

    let outcome = fetcher
        .fetch_to_file(&request(3, Duration::ZERO), &path)
        .await;

    assert_eq!(outcome.failure_kind(), Some(FailureKind::Exhausted));
    assert_eq!(client.call_count(), 3);
}

// ===== Cancellation =====

fn cancel_after(delay: Duration) -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        trigger.cancel();
    });
    token
}

#[tokio::test(start_paused = true)]
async fn test_cancel_interrupts_backoff() {
    let (fetcher, client) = scripted_fetcher(vec![], status(503));
    let fetcher = fetcher.with_cancellation(cancel_after(Duration::from_millis(10)));
    let started = tokio::time::Instant::now();

    let outcome = fetcher.fetch(&request(5, Duration::from_secs(2))).await;

    assert_eq!(outcome, FetchOutcome::cancelled());
    assert_eq!(client.call_count(), 1);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_abandons_hanging_attempt() {
    let (fetcher, client) = scripted_fetcher(vec![], Scripted::Hang);
    let fetcher = fetcher.with_cancellation(cancel_after(Duration::from_millis(10)));
    let started = tokio::time::Instant::now();

    let outcome = fetcher.fetch(&request(5, Duration::from_secs(2))).await;

    assert!(outcome.is_cancelled());
    assert_eq!(client.call_count(), 1);
    // Well before the 5 s per-attempt timeout
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn test_cancelled_fetcher_makes_no_request() {
    let token = CancellationToken::new();
    token.cancel();
    let (fetcher, client) = scripted_fetcher(vec![], ok(b"tile"));

    let outcome = fetcher
        .with_cancellation(token)
        .fetch(&request(3, Duration::ZERO))
        .await;

    assert!(outcome.is_cancelled());
    assert_eq!(client.call_count(), 0);
}
