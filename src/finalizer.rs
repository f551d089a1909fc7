//! Finalizer (spec.md §4.7): drains every `cat` job enqueued during the run,
//! then — once all of them have finished, not just the one for a given host —
//! sweeps one `rm <prefix>*` per host still alive, origin included (spec.md
//! §5: "the end-of-run rm sweep strictly follows drainage of every cat
//! child"). Runs on its own thread alongside the scheduler.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crate::process_pool::{ProcJob, ProcessPool};
use crate::swarm::Swarm;
use crate::transport::{BinPaths, rm_command};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Default, Clone)]
pub struct FinalizeReport {
    pub hosts_cleaned: usize,
    pub failures: Vec<String>,
}

/// Phase 1 blocks until `stop` is set and the pool has drained every `cat`
/// job (jobs enqueued by the very last transfer completions must still be
/// let through). Phase 2 is skipped entirely when `keep_chunks` is set
/// (spec.md §6 `-p`); otherwise it enqueues one `rm` per live host —
/// including the origin, whose chunk prefix nothing else ever cleans up —
/// and blocks until every one of those has finished too.
pub fn run_finalizer(
    pool: Arc<ProcessPool>,
    bins: Arc<BinPaths>,
    prefix: String,
    swarm: Arc<Swarm>,
    keep_chunks: bool,
    stop: Arc<AtomicBool>,
) -> FinalizeReport {
    let mut report = FinalizeReport::default();

    loop {
        pool.reap();
        while let Ok(result) = pool.results().try_recv() {
            match result.job {
                ProcJob::Cat { host } => {
                    if result.success {
                        tracing::info!(host = %host, "cat completed");
                    } else {
                        tracing::error!(host = %host, "cat failed, leaving chunks in place");
                        report.failures.push(format!("cat failed on {host}"));
                    }
                }
                ProcJob::Rm { .. } => unreachable!("rm is never enqueued before the cat phase ends"),
            }
        }

        if stop.load(Ordering::SeqCst) && pool.running_count() == 0 && pool.pending_count() == 0 {
            break;
        }
        thread::sleep(POLL_INTERVAL);
    }

    if keep_chunks {
        return report;
    }

    let mut pending_rms = 0usize;
    for host in swarm.hosts() {
        if host.is_alive() {
            let cmd = rm_command(&bins, &host.name, &prefix);
            pool.enqueue(cmd, ProcJob::Rm { host: host.name.clone() });
            pending_rms += 1;
        }
    }

    let mut seen_rms = 0usize;
    while seen_rms < pending_rms {
        pool.reap();
        while let Ok(result) = pool.results().try_recv() {
            match result.job {
                ProcJob::Rm { host } => {
                    seen_rms += 1;
                    if result.success {
                        report.hosts_cleaned += 1;
                    } else {
                        tracing::warn!(host = %host, "rm cleanup failed");
                        report.failures.push(format!("rm failed on {host}"));
                    }
                }
                ProcJob::Cat { .. } => unreachable!("cat is never enqueued during the rm sweep"),
            }
        }
        if seen_rms < pending_rms {
            thread::sleep(POLL_INTERVAL);
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;

    #[test]
    fn cat_success_is_followed_by_an_rm_sweep_over_every_live_host() {
        let pool = Arc::new(ProcessPool::new(2));
        pool.enqueue(Command::new("true"), ProcJob::Cat { host: "h1".to_string() });
        let stop = Arc::new(AtomicBool::new(true));
        let bins = BinPaths { ssh: "true".to_string(), ..BinPaths::default() };
        let swarm = Arc::new(Swarm::new("origin", ["h1"], 4, 3));
        let report =
            run_finalizer(pool, Arc::new(bins), "/tmp/f.chunk_".to_string(), swarm, false, stop);
        // the origin gets an rm too — nothing else ever cleans its chunks up.
        assert_eq!(report.hosts_cleaned, 2);
        assert!(report.failures.is_empty());
    }

    #[test]
    fn cat_failure_is_recorded_but_the_rm_sweep_still_runs() {
        let pool = Arc::new(ProcessPool::new(2));
        pool.enqueue(Command::new("false"), ProcJob::Cat { host: "h1".to_string() });
        let stop = Arc::new(AtomicBool::new(true));
        let bins = BinPaths { ssh: "true".to_string(), ..BinPaths::default() };
        let swarm = Arc::new(Swarm::new("origin", ["h1"], 4, 3));
        let report =
            run_finalizer(pool, Arc::new(bins), "/tmp/f.chunk_".to_string(), swarm, false, stop);
        assert_eq!(report.hosts_cleaned, 2);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].contains("cat failed"));
    }

    #[test]
    fn keep_chunks_skips_the_rm_sweep_entirely() {
        let pool = Arc::new(ProcessPool::new(2));
        pool.enqueue(Command::new("true"), ProcJob::Cat { host: "h1".to_string() });
        let stop = Arc::new(AtomicBool::new(true));
        let bins = BinPaths { ssh: "true".to_string(), ..BinPaths::default() };
        let swarm = Arc::new(Swarm::new("origin", ["h1"], 4, 3));
        let report =
            run_finalizer(pool, Arc::new(bins), "/tmp/f.chunk_".to_string(), swarm, true, stop);
        assert_eq!(report.hosts_cleaned, 0);
        assert!(report.failures.is_empty());
    }

    #[test]
    fn dead_hosts_are_excluded_from_the_rm_sweep() {
        let pool = Arc::new(ProcessPool::new(2));
        let stop = Arc::new(AtomicBool::new(true));
        let bins = BinPaths { ssh: "true".to_string(), ..BinPaths::default() };
        let swarm = Arc::new(Swarm::new("origin", ["h1", "h2"], 4, 3));
        swarm.mark_host_dead(2); // h2
        let report =
            run_finalizer(pool, Arc::new(bins), "/tmp/f.chunk_".to_string(), swarm, false, stop);
        // origin + h1, not the dead h2.
        assert_eq!(report.hosts_cleaned, 2);
        assert!(report.failures.is_empty());
    }
}
