// src/core/envelope.rs

//! Deadline wrapper for check operations.
//!
//! The operation is spawned onto the runtime and raced against a timer. If the
//! timer wins, the caller gets the fallback immediately and the spawned task is
//! detached: it keeps running and its eventual output is dropped. This bounds
//! observed latency, not resource usage.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

/// Resolves with the operation's output, or with `fallback` once `budget` has
/// elapsed, whichever comes first. Exactly one of the two is returned.
pub async fn with_timeout<F, T>(operation: F, budget: Duration, fallback: T) -> T
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    with_timeout_else(operation, budget, move || fallback).await
}

/// Like [`with_timeout`], but the fallback is computed only when the deadline
/// fires, so it can observe state the operation published before expiring.
///
/// A panic inside the operation is resumed on the caller; callers that need to
/// contain panics should catch them inside `operation`.
pub async fn with_timeout_else<F, T, G>(operation: F, budget: Duration, fallback: G) -> T
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
    G: FnOnce() -> T,
{
    let mut handle = tokio::spawn(operation);

    tokio::select! {
        joined = &mut handle => match joined {
            Ok(value) => value,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            // Cancelled by runtime shutdown.
            Err(_) => fallback(),
        },
        _ = tokio::time::sleep(budget) => {
            debug!(budget_ms = budget.as_millis() as u64, "Deadline elapsed, detaching operation.");
            // Dropping a JoinHandle detaches the task; it is not aborted.
            drop(handle);
            fallback()
        }
    }
}
