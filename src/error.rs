//! Error types raised at the crate boundary (SPEC_FULL.md §10, expanding
//! §7). The core's own internal failure modes (contention miss,
//! worker-raised exception) are represented as plain `bool`s and panic
//! payloads respectively; these types exist for the two cases a *host*
//! might want to observe or report.

use std::any::Any;
use std::fmt;

/// A programming-error precondition violation: calling a worker-only API
/// from a non-worker thread, or an unrecoverable `prepare` misuse. Per
/// SPEC_FULL.md §10.3 this is fail-stop — the crate logs it (if the
/// `tracing` feature is enabled) and aborts the process rather than
/// returning it, but it is still named here so the abort path has
/// something concrete to report.
#[derive(thiserror::Error, Debug)]
pub enum PreconditionError {
    #[error("worker id {0} called a worker-only API, but is not a managed worker thread")]
    NotAManagedWorker(usize),

    #[error("worker id {0} is out of range for a roster of size {1}")]
    UnknownWorkerId(usize, usize),

    #[error("the pool has not been `prepare`d yet")]
    PoolNotPrepared,
}

/// One worker's contribution to an aggregate shutdown failure: its id and
/// the panic payload its callback raised.
pub struct WorkerPanic {
    pub worker_id: usize,
    pub payload: Box<dyn Any + Send + 'static>,
}

impl fmt::Debug for WorkerPanic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPanic")
            .field("worker_id", &self.worker_id)
            .field("payload", &payload_message(&self.payload))
            .finish()
    }
}

fn payload_message(payload: &(dyn Any + Send + 'static)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}

/// Raised by the exit hook (or by an explicit `shutdown()` call) when one
/// or more workers' callbacks panicked instead of returning normally. The
/// distinguished "terminate" control signal is never part of this list —
/// it is the ordinary shutdown path, per SPEC_FULL.md §7.2. Entries are in
/// reverse join order, per SPEC_FULL.md §7.2 / §8.
#[derive(thiserror::Error)]
#[error("{} worker callback(s) panicked during shutdown: {}", .0.len(), render(&.0))]
pub struct ShutdownError(pub Vec<WorkerPanic>);

impl fmt::Debug for ShutdownError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ShutdownError").field(&self.0).finish()
    }
}

fn render(panics: &[WorkerPanic]) -> String {
    panics
        .iter()
        .map(|p| format!("worker {}: {}", p.worker_id, payload_message(&p.payload)))
        .collect::<Vec<_>>()
        .join("; ")
}
