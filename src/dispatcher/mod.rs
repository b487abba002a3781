use std::collections::HashSet;
use std::io::{BufRead, BufReader, PipeReader, Write};
use std::process::ChildStdin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use crate::engine::{EngineConfig, EngineError, EngineProcess, EngineSession};
use crate::query::{Query, QueryOutcome};

pub mod pending;

pub use pending::PendingOutcome;

/// How long `shutdown` lets queued requests finish before killing the engine.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

type Job<R, W> = Box<dyn FnOnce(&mut EngineSession<R, W>) + Send>;

/// Runs requests against one [`EngineSession`] on a dedicated thread, one at a time,
/// in the order they were submitted.
///
/// UCI output carries no request ids, so two exchanges on the same engine must never
/// overlap. Every caller goes through the queue; only the worker touches the session.
pub struct QueryDispatcher<R = BufReader<PipeReader>, W: Write = ChildStdin> {
    queue: Option<Sender<Job<R, W>>>,
    worker: Option<JoinHandle<EngineSession<R, W>>>,
    drained: Mutex<Receiver<()>>,  // signalled once the worker loop has returned
    cancelled: Arc<AtomicBool>,
    process: Option<EngineProcess>,
    drain_timeout: Duration,
}

impl QueryDispatcher {
    /// Starts the engine and its worker. Fails if the engine does not come up.
    pub fn start(config: &EngineConfig) -> Result<Self, EngineError> {
        Ok(QueryDispatcher::new(EngineSession::start(config)?))
    }
}

impl<R, W> QueryDispatcher<R, W>
    where R: BufRead + Send + 'static, W: Write + Send + 'static {

    pub fn new(session: EngineSession<R, W>) -> Self {
        let (queue_tx, queue_rx) = channel::<Job<R, W>>();
        let cancelled = Arc::new(AtomicBool::new(false));
        let process = session.process().cloned();

        let (drained_tx, drained_rx) = channel();
        let worker_cancelled = cancelled.clone();
        let worker = thread::spawn(move || {
            let session = run_worker(session, queue_rx, worker_cancelled);
            drained_tx.send(()).ok();
            session
        });

        QueryDispatcher {
            queue: Some(queue_tx),
            worker: Some(worker),
            drained: Mutex::new(drained_rx),
            cancelled,
            process,
            drain_timeout: DRAIN_TIMEOUT,
        }
    }

    pub fn with_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    pub fn submit(&self, query: Query) -> PendingOutcome<QueryOutcome> {
        self.enqueue(move |session| session.execute(&query))
    }

    pub fn best_move(&self, query: Query) -> PendingOutcome<String> {
        self.enqueue(move |session| session.best_move(&query))
    }

    pub fn make_moves(&self, query: Query) -> PendingOutcome<String> {
        self.enqueue(move |session| session.make_moves(&query))
    }

    pub fn legal_moves(&self, query: Query) -> PendingOutcome<HashSet<String>> {
        self.enqueue(move |session| session.legal_moves(&query))
    }

    pub fn checkers(&self, query: Query) -> PendingOutcome<String> {
        self.enqueue(move |session| session.checkers(&query))
    }

    pub fn new_game(&self) -> PendingOutcome<()> {
        self.enqueue(|session| session.new_game())
    }

    fn enqueue<T, F>(&self, operation: F) -> PendingOutcome<T>
        where T: Send + 'static, F: FnOnce(&mut EngineSession<R, W>) -> Result<T, EngineError> + Send + 'static {

        let queue = match &self.queue {
            Some(queue) => queue,
            None => return PendingOutcome::resolved(Err(EngineError::Disconnected)),
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job<R, W> = Box::new(move |session| {
            if reply_tx.send(operation(session)).is_err() {
                debug!("caller dropped its request before the answer arrived");
            }
        });

        match queue.send(job) {
            Ok(()) => PendingOutcome::new(reply_rx),
            Err(_) => PendingOutcome::resolved(Err(EngineError::Disconnected)),
        }
    }
}

/// The worker loop: one job at a time until the queue closes. Once cancelled, remaining jobs
/// are dropped unanswered.
fn run_worker<R: BufRead, W: Write>(
    mut session: EngineSession<R, W>,
    queue: Receiver<Job<R, W>>,
    cancelled: Arc<AtomicBool>,
) -> EngineSession<R, W> {
    for job in queue.iter() {
        if cancelled.load(Ordering::Acquire) {
            continue;
        }

        job(&mut session);
    }

    info!("dispatcher worker stopped");
    session
}

impl<R, W: Write> QueryDispatcher<R, W> {
    /// Stops taking requests, lets the queue drain for at most the drain timeout, then kills
    /// the engine so whatever is still running fails and whatever is still queued is cancelled.
    /// Finally closes the session. Every step runs even if an earlier one failed.
    pub fn shutdown(mut self) -> Result<(), EngineError> {
        self.shutdown_in_place()
    }

    fn shutdown_in_place(&mut self) -> Result<(), EngineError> {
        // Closing the queue ends the worker loop once it is empty
        match self.queue.take() {
            Some(queue) => drop(queue),
            None => return Ok(()),
        }

        let mut failures = Vec::new();

        if let Some(worker) = self.worker.take() {
            let drained = self.drained.get_mut().unwrap_or_else(|poisoned| poisoned.into_inner());

            // A worker that panicked drops its sender, which counts as finished here
            if let Err(RecvTimeoutError::Timeout) = drained.recv_timeout(self.drain_timeout) {
                warn!(timeout = ?self.drain_timeout, "engine did not drain in time, cancelling");
                self.cancelled.store(true, Ordering::Release);

                if let Some(process) = &self.process {
                    if let Err(error) = process.terminate() {
                        failures.push(EngineError::Io(error));
                    }
                }
            }

            match worker.join() {
                Ok(mut session) => {
                    if let Err(error) = session.close() {
                        match error {
                            EngineError::Shutdown(causes) => failures.extend(causes),
                            other => failures.push(other),
                        }
                    }
                },
                Err(_) => {
                    warn!("dispatcher worker panicked");
                    if let Some(process) = &self.process {
                        if let Err(error) = process.terminate() {
                            failures.push(EngineError::Io(error));
                        }
                    }
                },
            }
        }

        match failures.is_empty() {
            true => Ok(()),
            false => Err(EngineError::Shutdown(failures)),
        }
    }
}

impl<R, W: Write> Drop for QueryDispatcher<R, W> {
    fn drop(&mut self) {
        if let Err(error) = self.shutdown_in_place() {
            warn!(%error, "failed to shut down dispatcher");
        }
    }
}
