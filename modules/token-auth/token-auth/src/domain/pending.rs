//! Blocking work exposed as a future.
//!
//! Trust evaluation, logon and ticket acquisition call into the platform
//! synchronously. The async variants run them on Tokio's blocking pool and
//! hand back a [`PendingOperation`]. The work cannot be cancelled: dropping
//! the future detaches it and it runs to completion unobserved. Bound the
//! wait with `tokio::time::timeout`.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::task::JoinHandle;

use token_auth_sdk::{ProviderError, ValidationError};

/// Errors that can report a faulted background operation.
pub trait OperationFault {
    fn operation_faulted(reason: String) -> Self;
}

impl OperationFault for ValidationError {
    fn operation_faulted(reason: String) -> Self {
        Self::OperationFaulted { reason }
    }
}

impl OperationFault for ProviderError {
    fn operation_faulted(reason: String) -> Self {
        Self::OperationFaulted { reason }
    }
}

/// Completion of a blocking operation running on another thread.
///
/// Awaiting consumes the future, so the result is observed exactly once.
#[must_use = "the operation still runs if dropped, but its result is lost"]
pub struct PendingOperation<T, E> {
    handle: JoinHandle<Result<T, E>>,
}

impl<T, E> PendingOperation<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Starts `work` on the blocking pool. Must be called within a Tokio runtime.
    pub fn spawn<F>(work: F) -> Self
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
    {
        Self {
            handle: tokio::task::spawn_blocking(work),
        }
    }
}

impl<T, E: OperationFault> Future for PendingOperation<T, E> {
    type Output = Result<T, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.handle).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(join_err)) => {
                let reason = if join_err.is_panic() {
                    "background operation panicked".to_owned()
                } else {
                    "background operation was aborted".to_owned()
                };
                tracing::error!(error = %join_err, "{reason}");
                Poll::Ready(Err(E::operation_faulted(reason)))
            }
        }
    }
}
