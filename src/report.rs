use std::time::Duration;

use thiserror::Error;

use crate::remote::{RemoteClient, RemoteError, ReportPayload};

#[derive(Debug, Error)]
pub enum ReportError {
    /// The remote rejected or failed the request outright.
    #[error(transparent)]
    Remote(RemoteError),
    /// The retry budget ran out while the report was still being generated.
    /// Distinct from a remote-side failure so callers can tell "gave up
    /// waiting" apart from "remote rejected the request".
    #[error("report was not ready after {attempts} attempts")]
    TimedOut { attempts: u32 },
}

/// Fetches an asynchronously generated report, retrying on "not ready" at a
/// fixed interval up to `max_attempts`. Any other remote error aborts
/// immediately. The wait runs on the calling task, so dropping the
/// surrounding request cancels it.
pub async fn poll_for_report(
    remote: &dyn RemoteClient,
    report_token: &str,
    max_attempts: u32,
    interval: Duration,
) -> Result<ReportPayload, ReportError> {
    for attempt in 1..=max_attempts {
        match remote.get_report(report_token).await {
            Ok(payload) => {
                tracing::debug!(attempt, "Report ready");
                return Ok(payload);
            }
            Err(RemoteError::NotReady) => {
                tracing::debug!(attempt, max_attempts, "Report not ready, retrying");
                if attempt < max_attempts {
                    tokio::time::sleep(interval).await;
                }
            }
            Err(other) => return Err(ReportError::Remote(other)),
        }
    }

    Err(ReportError::TimedOut {
        attempts: max_attempts,
    })
}
