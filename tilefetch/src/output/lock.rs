//! Mutual exclusion for backend writes.
//!
//! Every mutating [`OutputBackend`](super::OutputBackend) method takes a
//! `&BackendGuard`, and a guard can only be obtained by locking a
//! [`BackendLock`]. Holding the lock while writing is therefore checked by
//! the compiler rather than by convention.

use tokio::sync::{Mutex, MutexGuard};

/// The single write lock of a download job.
#[derive(Debug, Default)]
pub struct BackendLock {
    inner: Mutex<()>,
}

impl BackendLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access.
    pub async fn lock(&self) -> BackendGuard<'_> {
        BackendGuard {
            _guard: self.inner.lock().await,
        }
    }

    /// Takes the lock if it is free, for callers outside an async context.
    pub fn try_lock(&self) -> Option<BackendGuard<'_>> {
        self.inner
            .try_lock()
            .ok()
            .map(|guard| BackendGuard { _guard: guard })
    }
}

/// Proof that the job's [`BackendLock`] is held. Released on drop.
#[derive(Debug)]
pub struct BackendGuard<'a> {
    _guard: MutexGuard<'a, ()>,
}
