//! Bounded polling primitive.
//!
//! Every wait-for-DOM-state site in the pipeline goes through this one
//! helper, so the retry/timeout policy is defined and tested once.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Evaluate `predicate` up to `max_attempts` times, waiting `interval`
/// between attempts, until it yields a value.
///
/// Returns `None` once the attempt budget is spent. No sleep happens after
/// the final attempt.
pub async fn poll_until<T, F, Fut>(interval: Duration, max_attempts: u32, mut predicate: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    for attempt in 0..max_attempts {
        if let Some(value) = predicate().await {
            return Some(value);
        }
        if attempt + 1 < max_attempts {
            sleep(interval).await;
        }
    }
    None
}
