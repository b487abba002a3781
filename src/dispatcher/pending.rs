use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use crate::engine::EngineError;

/// The eventual answer to a submitted request.
///
/// Await it from async code, or call [`PendingOutcome::wait`] from a plain thread.
/// A request dropped unanswered by a forced shutdown resolves to [`EngineError::Cancelled`].
#[must_use = "the request runs either way, but its result is lost"]
pub struct PendingOutcome<T> {
    reply: oneshot::Receiver<Result<T, EngineError>>,
}

impl<T> PendingOutcome<T> {
    pub(super) fn new(reply: oneshot::Receiver<Result<T, EngineError>>) -> Self {
        PendingOutcome { reply }
    }

    pub(super) fn resolved(result: Result<T, EngineError>) -> Self {
        let (reply_tx, reply_rx) = oneshot::channel();
        // the receiver is right here, so this can't fail
        let _ = reply_tx.send(result);
        PendingOutcome::new(reply_rx)
    }

    /// Blocks until the worker answers.
    ///
    /// # Panics
    /// When called from inside an async runtime, where blocking would stall the runtime's thread.
    /// Await the outcome there instead.
    pub fn wait(self) -> Result<T, EngineError> {
        assert!(
            Handle::try_current().is_err(),
            "PendingOutcome::wait called from inside an async runtime, await the outcome instead",
        );

        self.reply.blocking_recv().unwrap_or(Err(EngineError::Cancelled))
    }
}

impl<T> Future for PendingOutcome<T> {
    type Output = Result<T, EngineError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.reply)
            .poll(cx)
            .map(|x| x.unwrap_or(Err(EngineError::Cancelled)))
    }
}
