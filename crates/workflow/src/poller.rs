//! Repeated job-status fetching with terminal-state detection.
//!
//! [`poll_until_terminal`] is the single polling primitive shared by the
//! import and export workflows: fetch immediately, apply the newest
//! snapshot (last write wins), stop permanently on the first terminal
//! status, sleep between rounds, and honour cancellation at every
//! suspension point -- a cancelled activation never applies a late
//! result.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Default interval between import status fetches.
pub const DEFAULT_IMPORT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Default interval between export status fetches.
pub const DEFAULT_EXPORT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Poll `fetch` until `is_terminal` holds for a fetched status.
///
/// The first fetch starts immediately (poll-then-wait); afterwards the
/// loop sleeps `interval` between rounds. Every successful fetch is
/// passed to `on_update` before the terminal check, so observers always
/// see the final status too. A failed fetch is logged and retried on the
/// next round; the previously applied status stays in effect.
///
/// Returns `Some(status)` with the terminal status -- exactly once per
/// activation -- or `None` if `cancel` fired first. Cancellation during
/// an in-flight fetch drops the fetch; its result is never applied.
pub async fn poll_until_terminal<T, E, F, Fut, O>(
    mut fetch: F,
    is_terminal: impl Fn(&T) -> bool,
    interval: Duration,
    cancel: &CancellationToken,
    mut on_update: O,
) -> Option<T>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    O: FnMut(&T),
{
    loop {
        // Biased so cancellation always beats a ready fetch: a cancelled
        // activation must not apply a result, even one already available.
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!("Status poll cancelled");
                return None;
            }
            result = fetch() => match result {
                Ok(status) => {
                    on_update(&status);
                    if is_terminal(&status) {
                        return Some(status);
                    }
                }
                Err(e) => {
                    // Transient by assumption; the job's own status will
                    // report a real failure.
                    tracing::warn!(error = %e, "Status fetch failed, retrying next round");
                }
            }
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!("Status poll cancelled");
                return None;
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
}
