//! Bounded pool for the `cat`/`rm` finalization child processes (spec.md
//! §4.6), kept separate from the transfer concurrency semaphore so a burst of
//! completions can't starve in-flight transfers for process-table slots.
//!
//! Grounded in the original's `CommandQueue`: jobs queue up, and a
//! non-blocking `free()` pass polls running children with `proc.poll()`
//! (here, `Child::try_wait()`) and promotes queued jobs into the freed slots.
//! Nothing here blocks; the scheduler calls `reap()` on every loop tick.

use std::collections::VecDeque;
use std::process::{Child, Command};
use std::sync::Mutex;

use crossbeam_channel::{Receiver, Sender, unbounded};

/// Identifies what a queued/running child process is for, so the finalizer
/// can react to its outcome without re-deriving it from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcJob {
    Cat { host: String },
    Rm { host: String },
}

#[derive(Debug, Clone)]
pub struct JobResult {
    pub job: ProcJob,
    pub success: bool,
}

struct Inner {
    running: Vec<(Child, ProcJob)>,
    pending: VecDeque<(Command, ProcJob)>,
}

pub struct ProcessPool {
    capacity: usize,
    inner: Mutex<Inner>,
    results_tx: Sender<JobResult>,
    results_rx: Receiver<JobResult>,
}

impl ProcessPool {
    pub fn new(capacity: usize) -> Self {
        let (results_tx, results_rx) = unbounded();
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Inner { running: Vec::new(), pending: VecDeque::new() }),
            results_tx,
            results_rx,
        }
    }

    /// Receiving half for completed `cat`/`rm` jobs; the finalizer drains
    /// this to decide when a host's cleanup is done.
    pub fn results(&self) -> &Receiver<JobResult> {
        &self.results_rx
    }

    /// Queues `cmd`/`job`, starting it immediately if a slot is free.
    pub fn enqueue(&self, cmd: Command, job: ProcJob) {
        let mut inner = self.inner.lock().unwrap();
        inner.pending.push_back((cmd, job));
        self.promote(&mut inner);
    }

    /// Non-blocking poll of every running child. Finished children are
    /// removed, their result is pushed to the results channel, and freed
    /// slots are backfilled from `pending`. Safe to call on a tight loop.
    pub fn reap(&self) {
        let mut inner = self.inner.lock().unwrap();
        let mut i = 0;
        while i < inner.running.len() {
            let finished = match inner.running[i].0.try_wait() {
                Ok(Some(status)) => Some(status.success()),
                Ok(None) => None,
                Err(_) => Some(false),
            };
            if let Some(success) = finished {
                let (_, job) = inner.running.remove(i);
                let _ = self.results_tx.send(JobResult { job, success });
            } else {
                i += 1;
            }
        }
        self.promote(&mut inner);
    }

    pub fn running_count(&self) -> usize {
        self.inner.lock().unwrap().running.len()
    }

    pub fn pending_count(&self) -> usize {
        self.inner.lock().unwrap().pending.len()
    }

    fn promote(&self, inner: &mut Inner) {
        while inner.running.len() < self.capacity {
            let Some((mut cmd, job)) = inner.pending.pop_front() else { break };
            match cmd.spawn() {
                Ok(child) => inner.running.push((child, job)),
                Err(_) => {
                    let _ = self.results_tx.send(JobResult { job, success: false });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn queued_job_runs_once_a_slot_frees() {
        let pool = ProcessPool::new(1);
        pool.enqueue(Command::new("true"), ProcJob::Cat { host: "a".into() });
        pool.enqueue(Command::new("true"), ProcJob::Cat { host: "b".into() });
        assert_eq!(pool.running_count(), 1);
        assert_eq!(pool.pending_count(), 1);

        // give the first child time to exit, then reap.
        thread::sleep(Duration::from_millis(50));
        pool.reap();
        assert_eq!(pool.running_count(), 1, "second job should now be running");
        assert_eq!(pool.pending_count(), 0);

        thread::sleep(Duration::from_millis(50));
        pool.reap();
        assert_eq!(pool.running_count(), 0);

        let mut results = Vec::new();
        while let Ok(r) = pool.results().try_recv() {
            results.push(r);
        }
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.success));
    }

    #[test]
    fn failing_child_reports_failure() {
        let pool = ProcessPool::new(2);
        pool.enqueue(Command::new("false"), ProcJob::Rm { host: "a".into() });
        thread::sleep(Duration::from_millis(50));
        pool.reap();
        let r = pool.results().try_recv().expect("result available");
        assert!(!r.success);
        assert_eq!(r.job, ProcJob::Rm { host: "a".into() });
    }
}
