//! Blocking queries.
//!
//! A reader that has already observed index `n` may ask to be woken only once the index moves
//! past `n`, bounded by a timeout. A minimum index of zero never blocks.

use std::time::Duration;
use tokio::{sync::watch, time};

/// Applied when a blocking query does not request a timeout.
pub const DEFAULT_QUERY_TIME: Duration = Duration::from_secs(5 * 60);

/// The longest a blocking query may wait.
pub const MAX_QUERY_TIME: Duration = Duration::from_secs(10 * 60);

/// Clamps a requested wait to `(0, MAX_QUERY_TIME]`, substituting the default for zero.
pub fn query_time(requested: Duration) -> Duration {
    if requested.is_zero() {
        return DEFAULT_QUERY_TIME;
    }
    requested.min(MAX_QUERY_TIME)
}

/// Waits until the watched index exceeds `min_index` or `timeout` elapses, returning the latest
/// observed index either way.
pub async fn wait_for_index(
    mut rx: watch::Receiver<u64>,
    min_index: u64,
    timeout: Duration,
) -> u64 {
    if min_index == 0 {
        return *rx.borrow();
    }

    let reached = match time::timeout(timeout, rx.wait_for(|index| *index > min_index)).await {
        Ok(Ok(index)) => Some(*index),
        Ok(Err(_)) => {
            tracing::debug!("Index watch closed");
            None
        }
        Err(_) => {
            tracing::trace!(min_index, ?timeout, "Blocking query timed out");
            None
        }
    };
    reached.unwrap_or_else(|| *rx.borrow())
}
