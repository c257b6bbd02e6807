//! Sender abstraction.

use crate::data::EmailData;
use crate::error::{Error, Result};
use crate::response::SendResponse;
use async_trait::async_trait;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Delivers an [`EmailData`] through one transport.
///
/// Both methods share the same contract:
///
/// - a missing or empty from-address is `Err(Error::InvalidArgument)`, raised
///   before any transport work;
/// - an already cancelled token yields a failed response with exactly one
///   message and no I/O;
/// - transport and provider failures are `Ok` responses carrying one message
///   per reported error.
#[async_trait]
pub trait Sender: Send + Sync {
    /// Sends the email.
    ///
    /// # Errors
    ///
    /// Returns an error for precondition failures and local I/O failures.
    async fn send_async(
        &self,
        email: &EmailData,
        token: Option<&CancellationToken>,
    ) -> Result<SendResponse>;

    /// Blocking variant of [`send_async`](Self::send_async).
    ///
    /// Runs the async send on a worker thread with its own runtime, so it may
    /// be called from synchronous code and from inside another runtime.
    ///
    /// # Errors
    ///
    /// Same as [`send_async`](Self::send_async).
    fn send(&self, email: &EmailData, token: Option<&CancellationToken>) -> Result<SendResponse> {
        block_on(self.send_async(email, token))?
    }
}

/// Returns true when the token exists and has been cancelled.
#[must_use]
pub fn is_cancelled(token: Option<&CancellationToken>) -> bool {
    token.is_some_and(CancellationToken::is_cancelled)
}

/// Drives a future to completion on a scoped worker thread.
///
/// The worker owns a current-thread runtime, so this never blocks (or
/// panics inside) a runtime the caller may already be running on.
///
/// # Errors
///
/// Returns [`Error::Io`] if the worker runtime cannot be created.
pub fn block_on<F>(future: F) -> Result<F::Output>
where
    F: Future + Send,
    F::Output: Send,
{
    std::thread::scope(|scope| {
        let worker = scope.spawn(move || {
            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map(|runtime| runtime.block_on(future))
        });

        match worker.join() {
            Ok(output) => output.map_err(Error::Io),
            Err(panic) => std::panic::resume_unwind(panic),
        }
    })
}
