//! Deadline helpers for transport operations.

use std::future::Future;
use std::time::Duration;

use crate::error::{ProtocolError, Result};

/// Default deadline for connecting and for each handshake read
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Run `fut` under a deadline. Expiry becomes a `Connection` error of kind `TimedOut`.
pub async fn with_timeout<F, T>(deadline: Duration, context: &'static str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(ProtocolError::timeout(context)),
    }
}
