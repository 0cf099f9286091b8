//! Scan queue (§4.7, §5 "Shared resources"): a FIFO of pending scan jobs
//! shared by the worker pool.
//!
//! Termination is the tricky part: a worker seeing an empty queue doesn't
//! mean the scan is done, since another worker may be mid-`unpack()` and
//! about to push more jobs. `pending` counts jobs that have been pushed but
//! not yet [`ScanQueue::task_done`]-ed, so `is_idle` is only true once every
//! pushed job has actually finished being processed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::job::ScanJob;

/// Outcome of a timed `get` against the queue.
pub enum RecvOutcome {
    Job(ScanJob),
    Empty,
}

/// Thin wrapper around a `crossbeam_channel` pair giving the driver
/// `push`/`get`/`task_done` vocabulary (§4.7).
#[derive(Clone)]
pub struct ScanQueue {
    sender: Sender<ScanJob>,
    receiver: Receiver<ScanJob>,
    pending: Arc<AtomicUsize>,
}

impl ScanQueue {
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            sender,
            receiver,
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Enqueue a job for a worker to pick up.
    pub fn push(&self, job: ScanJob) {
        self.pending.fetch_add(1, Ordering::SeqCst);
        // An unbounded channel never blocks on send, and the queue is never
        // dropped while workers still hold a sender clone.
        let _ = self.sender.send(job);
    }

    /// Block for up to `timeout` waiting for a job. `RecvOutcome::Empty`
    /// means no job arrived within the timeout; callers must still check
    /// [`ScanQueue::is_idle`] before concluding the scan is finished.
    pub fn get(&self, timeout: Duration) -> RecvOutcome {
        match self.receiver.recv_timeout(timeout) {
            Ok(job) => RecvOutcome::Job(job),
            Err(RecvTimeoutError::Timeout) => RecvOutcome::Empty,
            Err(RecvTimeoutError::Disconnected) => RecvOutcome::Empty,
        }
    }

    /// Mark one previously-pushed job as fully processed, including any
    /// jobs its processing itself pushed.
    pub fn task_done(&self) {
        self.pending.fetch_sub(1, Ordering::SeqCst);
    }

    /// True once every job ever pushed has been `task_done`-ed. A worker
    /// that sees both `Empty` and `is_idle()` can stop (§5 "Termination").
    pub fn is_idle(&self) -> bool {
        self.pending.load(Ordering::SeqCst) == 0
    }
}

impl Default for ScanQueue {
    fn default() -> Self {
        Self::new()
    }
}
