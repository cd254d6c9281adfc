//! Caller-side retry for optimistic lock conflicts.

use std::future::Future;

use crate::error::DomainError;

/// Runs `operation` up to `attempts` times, re-running it only while it fails
/// with an optimistic lock conflict.
///
/// Each attempt must load the aggregate afresh; that is what makes a re-run
/// meaningful. Any other error is returned immediately. At least one attempt
/// is always made.
pub async fn retry_on_conflict<T, F, Fut>(attempts: usize, mut operation: F) -> Result<T, DomainError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DomainError>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Err(error) if error.is_conflict() && attempt < attempts => {
                tracing::debug!(attempt, %error, "retrying after version conflict");
                attempt += 1;
            }
            result => return result,
        }
    }
}
