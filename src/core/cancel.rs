//! Cooperative cancellation helpers

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::core::error::{FinderError, Result};

/// Fail with [`FinderError::Cancelled`] once `cancel` has fired
pub fn check_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(FinderError::Cancelled);
    }
    Ok(())
}

/// Drive `future` to completion unless `cancel` fires first.
///
/// Cancellation wins ties: an already-cancelled token never polls `future`.
pub async fn run_cancellable<T, F>(cancel: &CancellationToken, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(FinderError::Cancelled),
        result = future => result,
    }
}
