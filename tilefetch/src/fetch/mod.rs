//! Resilient single-tile fetching.
//!
//! A [`Fetcher`] turns a [`FetchRequest`] into a [`FetchOutcome`]. Each
//! request gets `max_attempts` tries, each bounded by the policy timeout and
//! separated by exponentially growing sleeps. 404s consume the budget like
//! any other failure; only the final classification distinguishes them.
//!
//! A cancelled fetcher abandons the attempt in flight and any pending
//! backoff, and reports the tile as skipped.
//!
//! The fetcher never talks to an output backend.

mod outcome;
mod request;
mod retry;

#[cfg(test)]
mod tests;

pub use outcome::{FailureKind, FetchOutcome, CANCELLED};
pub use request::{FetchRequest, Scale};
pub use retry::{AttemptFailure, AttemptState, RetryPolicy};

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::provider::AsyncHttpClient;

/// Fetches tiles over an [`AsyncHttpClient`].
pub struct Fetcher<C> {
    client: Arc<C>,
    cancel: CancellationToken,
}

impl<C> Clone for Fetcher<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            cancel: self.cancel.clone(),
        }
    }
}

impl<C: AsyncHttpClient> Fetcher<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            cancel: CancellationToken::new(),
        }
    }

    /// Stops retrying once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Fetches the request's tile into memory.
    pub async fn fetch(&self, request: &FetchRequest) -> FetchOutcome {
        self.run(request, None).await
    }

    /// Fetches the request's tile and writes it to `path`.
    ///
    /// The write is part of each attempt: an I/O error or a file that ends
    /// up shorter than the body costs an attempt and is retried.
    pub async fn fetch_to_file(&self, request: &FetchRequest, path: &Path) -> FetchOutcome {
        self.run(request, Some(path)).await
    }

    async fn run(&self, request: &FetchRequest, dest: Option<&Path>) -> FetchOutcome {
        let policy = &request.retry_policy;
        let url = request.url();
        let mut state = AttemptState::start();

        loop {
            match state {
                AttemptState::Attempt(attempt) => {
                    trace!(
                        tile = %request.tile,
                        attempt = attempt,
                        max_attempts = policy.max_attempts(),
                        "Fetching tile"
                    );
                    let result = tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => {
                            debug!(tile = %request.tile, attempt = attempt, "Tile fetch cancelled");
                            return FetchOutcome::cancelled();
                        }
                        result = self.attempt(&url, policy.timeout(), dest) => result,
                    };
                    match result {
                        Ok(bytes) => return FetchOutcome::Success { bytes },
                        Err(failure) => {
                            debug!(
                                tile = %request.tile,
                                attempt = attempt,
                                max_attempts = policy.max_attempts(),
                                error = %failure,
                                "Tile attempt failed"
                            );
                            state = AttemptState::on_failure(attempt, failure, policy);
                        }
                    }
                }
                AttemptState::Backoff { next, delay } => {
                    if !delay.is_zero() {
                        tokio::select! {
                            _ = self.cancel.cancelled() => {
                                debug!(tile = %request.tile, "Tile backoff cancelled");
                                return FetchOutcome::cancelled();
                            }
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                    state = AttemptState::Attempt(next);
                }
                AttemptState::Exhausted { attempts, last } => {
                    debug!(
                        tile = %request.tile,
                        attempts = attempts,
                        error = %last,
                        "Tile retries exhausted"
                    );
                    return FetchOutcome::exhausted(attempts, &last);
                }
            }
        }
    }

    /// One bounded GET, classified, optionally persisted.
    async fn attempt(
        &self,
        url: &str,
        timeout: Duration,
        dest: Option<&Path>,
    ) -> Result<Vec<u8>, AttemptFailure> {
        let response = match tokio::time::timeout(timeout, self.client.get(url)).await {
            Err(_) => return Err(AttemptFailure::Timeout),
            Ok(Err(e)) => return Err(AttemptFailure::Transport(e.to_string())),
            Ok(Ok(response)) => response,
        };

        if response.is_not_found() {
            return Err(AttemptFailure::NotFound);
        }
        if !response.is_success() {
            return Err(AttemptFailure::Status(response.status));
        }
        if response.body.is_empty() {
            return Err(AttemptFailure::EmptyBody);
        }

        if let Some(path) = dest {
            write_verified(path, &response.body).await?;
        }

        Ok(response.body)
    }
}

/// Writes `bytes` to `path` and checks the file holds all of them.
pub(crate) async fn write_verified(path: &Path, bytes: &[u8]) -> Result<(), AttemptFailure> {
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| AttemptFailure::Write(format!("{}: {}", path.display(), e)))?;

    let written = tokio::fs::metadata(path)
        .await
        .map_err(|e| AttemptFailure::Write(format!("{}: {}", path.display(), e)))?
        .len();

    if written == 0 || written != bytes.len() as u64 {
        return Err(AttemptFailure::Write(format!(
            "{}: wrote {} of {} bytes",
            path.display(),
            written,
            bytes.len()
        )));
    }
    Ok(())
}
