//! Scheduler loop (spec.md §4.3): repeatedly asks the swarm database for a
//! match and spawns a thread per match up to the global transfer concurrency
//! limit. Exits once the swarm reports `done()`. Draining the process pool
//! is the finalizer's job (`finalizer.rs`), which runs concurrently.
//!
//! The global limit is a token-bucket semaphore built on a bounded
//! `crossbeam_channel`, the same primitive the teacher reaches for whenever
//! it needs bounded fan-out (its worker pool sizing in `transfer.rs`).

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, bounded};

use crate::swarm::Swarm;
use crate::worker::{WorkerEnv, run_transfer_worker};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct SchedulerReport {
    pub hosts_with_file: usize,
    pub dead_hosts: usize,
    pub split_failed: bool,
    pub interrupted: bool,
}

/// Runs until the swarm is `done()`. Blocks the calling thread; spawn it on
/// its own thread if the splitter also needs to run concurrently (it does —
/// see `run.rs`).
pub fn run_scheduler(swarm: Arc<Swarm>, env: WorkerEnv, max_concurrent_transfers: usize) -> SchedulerReport {
    let (tokens_tx, tokens_rx): (Sender<()>, Receiver<()>) = bounded(max_concurrent_transfers);
    for _ in 0..max_concurrent_transfers {
        tokens_tx.send(()).expect("freshly created channel cannot be full");
    }

    let mut handles = Vec::new();
    loop {
        if swarm.done() {
            break;
        }

        match tokens_rx.try_recv() {
            Ok(()) => match swarm.try_match() {
                Some(m) => {
                    let env = env.clone();
                    let tokens_tx = tokens_tx.clone();
                    handles.push(thread::spawn(move || {
                        run_transfer_worker(&env, m);
                        let _ = tokens_tx.send(());
                    }));
                }
                None => {
                    let _ = tokens_tx.send(());
                    thread::sleep(POLL_INTERVAL);
                }
            },
            Err(_) => thread::sleep(POLL_INTERVAL),
        }
    }

    for h in handles {
        let _ = h.join();
    }

    SchedulerReport {
        hosts_with_file: swarm.hosts_with_file(),
        dead_hosts: swarm.dead_hosts(),
        split_failed: swarm.split_failed(),
        interrupted: swarm.interrupted(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process_pool::ProcessPool;
    use crate::statslog::StatsLog;
    use crate::transport::{BinPaths, Transport};
    use std::sync::Arc;

    #[test]
    fn single_host_cluster_terminates_immediately() {
        let swarm = Arc::new(Swarm::new("origin", Vec::<String>::new(), 4, 3));
        let env = WorkerEnv {
            swarm: swarm.clone(),
            bins: Arc::new(BinPaths::default()),
            transport: Transport::Scp,
            prefix: "/tmp/f.chunk_".to_string(),
            dest_path: "/data/f".to_string(),
            process_pool: Arc::new(ProcessPool::new(2)),
            stats: None::<Arc<StatsLog>>,
            progress: None,
        };
        let report = run_scheduler(swarm, env, 4);
        assert_eq!(report.hosts_with_file, 1);
        assert_eq!(report.dead_hosts, 0);
    }

    #[test]
    fn two_hosts_one_transfer_each_completes_with_fake_transport() {
        let swarm = Arc::new(Swarm::new("origin", ["t1"], 4, 3));
        let chunk = crate::chunk::Chunk::new("/tmp/f.chunk_aa");
        swarm.origin().push_owned(chunk);
        swarm.register_new_chunk(1);
        swarm.set_split_complete();

        let env = WorkerEnv {
            swarm: swarm.clone(),
            bins: Arc::new(BinPaths { ssh: "true".to_string(), ..BinPaths::default() }),
            transport: Transport::Scp,
            prefix: "/tmp/f.chunk_".to_string(),
            dest_path: "/data/f".to_string(),
            process_pool: Arc::new(ProcessPool::new(2)),
            stats: None::<Arc<StatsLog>>,
            progress: None,
        };
        let report = run_scheduler(swarm.clone(), env, 4);
        assert_eq!(report.hosts_with_file, 2);
        assert_eq!(report.dead_hosts, 0);
        assert!(swarm.done());
    }
}
