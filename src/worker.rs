//! Transfer worker (spec.md §4.4): runs one transport child for an already
//! slot-debited `(seed, target, chunk)` triple and reconciles the outcome
//! back into the swarm database.

use std::sync::Arc;

use crate::host::Host;
use crate::process_pool::{ProcessPool, ProcJob};
use crate::statslog::StatsLog;
use crate::swarm::{Match, Swarm};
use crate::transport::{BinPaths, Transport, cat_command, transfer_command};

#[derive(Debug, Clone, Copy, Default)]
pub struct WorkerOutcome {
    pub succeeded: bool,
    pub host_completed: bool,
}

/// Shared, read-only environment every transfer worker needs. Cheap to
/// clone (everything behind `Arc`), so the scheduler hands one copy per
/// spawned worker.
#[derive(Clone)]
pub struct WorkerEnv {
    pub swarm: Arc<Swarm>,
    pub bins: Arc<BinPaths>,
    pub transport: Transport,
    pub prefix: String,
    pub dest_path: String,
    pub process_pool: Arc<ProcessPool>,
    pub stats: Option<Arc<StatsLog>>,
    pub progress: Option<indicatif::ProgressBar>,
}

/// Runs to completion inside the calling thread (the scheduler spawns one
/// OS thread per in-flight transfer — spec.md §9 "Threads vs. tasks").
pub fn run_transfer_worker(env: &WorkerEnv, m: Match) -> WorkerOutcome {
    let seed = env.swarm.host(m.seed);
    let target = env.swarm.host(m.target);

    let mut cmd =
        transfer_command(&env.bins, env.transport, &seed.name, &target.name, m.chunk.filename());
    let outcome = match cmd.output() {
        Ok(out) if out.status.success() => on_success(env, target, &m.chunk),
        Ok(out) => {
            tracing::warn!(
                seed = %seed.name,
                target = %target.name,
                chunk = %m.chunk,
                stderr = %String::from_utf8_lossy(&out.stderr),
                "transfer failed"
            );
            on_failure(env, seed, target, m.chunk.clone());
            WorkerOutcome::default()
        }
        Err(e) => {
            tracing::warn!(
                seed = %seed.name,
                target = %target.name,
                chunk = %m.chunk,
                error = %e,
                "failed to spawn transfer child"
            );
            on_failure(env, seed, target, m.chunk.clone());
            WorkerOutcome::default()
        }
    };

    seed.release_slot();
    target.release_slot();
    outcome
}

fn on_success(env: &WorkerEnv, target: &Host, chunk: &crate::chunk::Chunk) -> WorkerOutcome {
    let new_len = target.mark_owned(chunk.clone());
    target.reset_fail_count();

    let mut host_completed = false;
    if env.swarm.split_complete() && new_len == env.swarm.chunk_count() {
        env.swarm.host_done();
        host_completed = true;
        if let Some(stats) = &env.stats {
            stats.record_completion(env.swarm.hosts_with_file());
        }
        let cmd = cat_command(&env.bins, &target.name, &env.prefix, &env.dest_path);
        env.process_pool.enqueue(cmd, ProcJob::Cat { host: target.name.clone() });
        tracing::info!(host = %target.name, "all chunks received, cat enqueued");
        if let Some(pb) = &env.progress {
            pb.inc(1);
        }
    }
    WorkerOutcome { succeeded: true, host_completed }
}

fn on_failure(env: &WorkerEnv, seed: &Host, target: &Host, chunk: crate::chunk::Chunk) {
    target.requeue_needed(chunk);
    let reached_threshold = target.inc_fail_count();

    // Liveness probes per spec.md §4.4 step 3: always run on a failure,
    // regardless of the fail-count extension outcome.
    if !crate::liveness::probe(&env.bins, &target.name) || reached_threshold {
        env.swarm.mark_host_dead(index_of(env.swarm.as_ref(), target));
    }
    if !crate::liveness::probe(&env.bins, &seed.name) {
        env.swarm.mark_host_dead(index_of(env.swarm.as_ref(), seed));
    }
}

fn index_of(swarm: &Swarm, host: &Host) -> usize {
    swarm
        .hosts()
        .iter()
        .position(|h| std::ptr::eq(h, host))
        .expect("host must belong to this swarm")
}
