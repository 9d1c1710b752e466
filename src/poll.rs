//! Generic retry-until-acceptable polling primitive.
//!
//! The remote automation offers no push notifications, so convergence is
//! observed by repeatedly fetching state until a predicate holds. Transient
//! "not yet" results are routine and retried; fetch errors are unexpected
//! and fail the whole poll immediately.

use std::future::Future;
use std::time::Duration;

/// Fixed delay between polling attempts.
///
/// Deliberately not configurable: the run is bounded by the remote job
/// runner's own timeout, which is the real backstop.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Repeatedly invokes `fetch` until `accept` holds for the fetched value,
/// sleeping `interval` between attempts.
///
/// Resolves with the first acceptable value. There is no retry cap: a
/// permanently unsatisfied predicate polls forever. Any error from `fetch`
/// propagates immediately and is never retried.
///
/// `accept` must be a pure function of the fetched value.
pub async fn poll<T, E, F, Fut, A>(interval: Duration, mut fetch: F, accept: A) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    A: Fn(&T) -> bool,
{
    loop {
        let value = fetch().await?;
        if accept(&value) {
            return Ok(value);
        }
        tokio::time::sleep(interval).await;
    }
}
