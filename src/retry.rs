//! Bounded Write Retries
//!
//! Wraps an applier operation in a bounded attempt loop with no
//! inter-attempt delay. Only retryable errors are re-attempted; typed
//! failures such as verification mismatches pass through unchanged so
//! the caller can decide their severity.

use std::future::Future;

use crate::error::Result;

/// Run `op` up to `max_attempts` times, returning the first success or
/// the last error.
pub async fn with_retries<T, Fut, F>(max_attempts: u32, what: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < max_attempts => {
                tracing::warn!(
                    "{} attempt {}/{} failed, retrying: {}",
                    what,
                    attempt,
                    max_attempts,
                    err
                );
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
