//! Top-level orchestration tying the swarm database, splitter, scheduler,
//! process pool, and finalizer together — the counterpart to the teacher's
//! `transfer.rs::handle_ts`.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Instant;

use crate::chunk::chunk_prefix;
use crate::cli::Cli;
use crate::config::Config;
use crate::error::SwarmError;
use crate::finalizer::run_finalizer;
use crate::hostlist::{expand_range, merge_host_sources, read_host_file};
use crate::process_pool::{ProcJob, ProcessPool};
use crate::scheduler::run_scheduler;
use crate::splitter::run_splitter;
use crate::statslog::StatsLog;
use crate::swarm::Swarm;
use crate::transport::{BinPaths, rm_command};
use crate::worker::WorkerEnv;

/// The origin is always the machine invoking this tool; other hosts reach
/// it over ssh the same way they reach each other, so it needs a name too.
const ORIGIN_HOST: &str = "localhost";

/// Confirms an external binary is resolvable on `$PATH` (or is itself an
/// absolute/relative path that exists), matching the teacher's use of
/// `which` to probe for `ssh-copy-id` before offering to use it.
fn check_binary(path: &str) -> Result<(), SwarmError> {
    which::which(path).map(|_| ()).map_err(|_| SwarmError::MissingBinary(path.to_string()))
}

fn resolve_hosts(
    host_file: &Option<PathBuf>,
    hosts: &[String],
    host_range: &Option<String>,
) -> Result<Vec<String>, SwarmError> {
    let mut sources = Vec::new();
    if let Some(path) = host_file {
        let file_hosts = read_host_file(path)
            .map_err(|e| SwarmError::ConfigError(path.clone(), e.to_string()))?;
        sources.push(file_hosts);
    }
    if !hosts.is_empty() {
        sources.push(hosts.to_vec());
    }
    if let Some(range) = host_range {
        let expanded = expand_range(range).map_err(SwarmError::InvalidRange)?;
        sources.push(expanded);
    }
    let merged = merge_host_sources(sources);
    if merged.is_empty() {
        return Err(SwarmError::EmptyHostList);
    }
    Ok(merged)
}

pub fn run_transfer(cli: &Cli, config: &Config) -> Result<(), SwarmError> {
    let source = cli.source.clone().expect("required when not in `clean` mode");
    let dest = cli.dest.clone().expect("required when not in `clean` mode");

    if !source.is_file() {
        return Err(SwarmError::SourceUnreadable(source, "not a regular file".to_string()));
    }
    let source_str = source.to_string_lossy().to_string();

    let hosts = resolve_hosts(&cli.host_file, &cli.hosts, &cli.host_range)?;
    let max_slots_per_host = cli.max_slots_per_host.unwrap_or(config.max_slots_per_host);
    let max_concurrent_transfers =
        cli.max_concurrent_transfers.unwrap_or(config.max_concurrent_transfers);
    let max_procs = cli.max_procs.unwrap_or(config.max_procs);
    let max_fail_count = cli.max_fail_count.unwrap_or(config.max_fail_count);
    let chunk_size = cli.chunk_size.clone().unwrap_or_else(|| config.default_chunk_size.clone());

    let bins = Arc::new(BinPaths {
        ssh: config.ssh_client_path.to_string_lossy().to_string(),
        scp: config.scp_path.to_string_lossy().to_string(),
        rcp: config.rcp_path.to_string_lossy().to_string(),
        rsync: config.rsync_path.to_string_lossy().to_string(),
        username: cli.username.clone(),
    });
    let split_bin = config.split_path.to_string_lossy().to_string();
    let transport = cli.transport();

    check_binary(&bins.ssh)?;
    check_binary(match transport {
        crate::transport::Transport::Scp => &bins.scp,
        crate::transport::Transport::Rcp => &bins.rcp,
        crate::transport::Transport::Rsync => &bins.rsync,
    })?;
    check_binary(&split_bin)?;

    let swarm = Arc::new(Swarm::new(ORIGIN_HOST, hosts, max_slots_per_host, max_fail_count));
    let prefix = chunk_prefix(&source_str);
    let process_pool = Arc::new(ProcessPool::new(max_procs));
    let stats = if cli.stats_log {
        let _ = std::fs::create_dir_all(config.logs_dir());
        let path = config.logs_dir().join("stats.log");
        match StatsLog::create(&path) {
            Ok(log) => Some(Arc::new(log)),
            Err(e) => {
                eprintln!("warning: could not open stats log at {}: {e}", path.display());
                None
            }
        }
    } else {
        None
    };

    let started = Instant::now();
    let (_mp, total_pb, header) =
        crate::util::init_progress_and_mp(cli.verbose, swarm.host_count() as u64);
    crate::util::set_startup_header(
        &header,
        transport.as_str(),
        swarm.host_count(),
        &chunk_size,
        max_concurrent_transfers,
    );
    total_pb.inc(1); // the origin already has the file

    {
        let swarm_for_signal = swarm.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            tracing::warn!("operator interrupt received, draining in-flight work");
            swarm_for_signal.mark_interrupted();
        }) {
            tracing::warn!(error = %e, "failed to install Ctrl-C handler");
        }
    }

    let split_timeout_secs = cli.split_timeout_secs;
    let splitter_handle = {
        let swarm = swarm.clone();
        let split_bin = split_bin.clone();
        let chunk_size = chunk_size.clone();
        let source_str = source_str.clone();
        let prefix = prefix.clone();
        thread::spawn(move || {
            run_splitter(&split_bin, &chunk_size, &source_str, &prefix, &swarm, split_timeout_secs)
        })
    };

    let keep_chunks = cli.keep_chunks;
    let stop = Arc::new(AtomicBool::new(false));
    let finalizer_handle = {
        let pool = process_pool.clone();
        let bins = bins.clone();
        let prefix = prefix.clone();
        let swarm = swarm.clone();
        let stop = stop.clone();
        thread::spawn(move || run_finalizer(pool, bins, prefix, swarm, keep_chunks, stop))
    };

    let worker_env = WorkerEnv {
        swarm: swarm.clone(),
        bins: bins.clone(),
        transport,
        prefix: prefix.clone(),
        dest_path: dest,
        process_pool: process_pool.clone(),
        stats: stats.clone(),
        progress: Some(total_pb.clone()),
    };
    let report = run_scheduler(swarm.clone(), worker_env, max_concurrent_transfers);

    if let Err(e) = splitter_handle.join() {
        tracing::error!(?e, "splitter thread panicked");
    }
    stop.store(true, Ordering::SeqCst);
    let finalize_report = finalizer_handle.join().unwrap_or_default();
    total_pb.finish_and_clear();

    let elapsed = started.elapsed().as_secs_f64();
    if let Some(stats) = &stats {
        stats.finish();
    }
    crate::util::print_summary(report.hosts_with_file, swarm.host_count(), report.dead_hosts, elapsed);
    for failure in &finalize_report.failures {
        eprintln!("warning: {failure}");
    }

    if report.interrupted {
        return Err(SwarmError::OperatorInterrupt);
    }
    if report.split_failed {
        return Err(SwarmError::SplitFailure(format!(
            "split exited before producing every chunk; {} host(s) received the full file",
            report.hosts_with_file
        )));
    }
    if report.hosts_with_file <= 1 {
        return Err(SwarmError::AllHostsDead);
    }
    Ok(())
}

pub fn run_clean(
    filename: &str,
    host_file: &Option<PathBuf>,
    hosts: &[String],
    host_range: &Option<String>,
    username: &Option<String>,
    config: &Config,
) -> Result<(), SwarmError> {
    let targets = resolve_hosts(host_file, hosts, host_range)?;
    let bins = BinPaths {
        ssh: config.ssh_client_path.to_string_lossy().to_string(),
        scp: config.scp_path.to_string_lossy().to_string(),
        rcp: config.rcp_path.to_string_lossy().to_string(),
        rsync: config.rsync_path.to_string_lossy().to_string(),
        username: username.clone(),
    };
    check_binary(&bins.ssh)?;
    let prefix = chunk_prefix(filename);
    let pool = ProcessPool::new(config.max_procs);
    for host in &targets {
        pool.enqueue(rm_command(&bins, host, &prefix), ProcJob::Rm { host: host.clone() });
    }

    let mut failures = Vec::new();
    loop {
        pool.reap();
        while let Ok(result) = pool.results().try_recv() {
            if !result.success {
                if let ProcJob::Rm { host } = result.job {
                    failures.push(host);
                }
            }
        }
        if pool.running_count() == 0 && pool.pending_count() == 0 {
            break;
        }
        thread::sleep(std::time::Duration::from_millis(100));
    }

    println!("cleaned {} of {} hosts", targets.len() - failures.len(), targets.len());
    for host in &failures {
        eprintln!("warning: cleanup failed on {host}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_hosts_merges_and_dedupes() {
        let hosts =
            resolve_hosts(&None, &["a".to_string(), "b".to_string()], &Some("c[1-2]".to_string()))
                .unwrap();
        assert_eq!(hosts, vec!["a", "b", "c1", "c2"]);
    }

    #[test]
    fn resolve_hosts_rejects_empty() {
        assert!(resolve_hosts(&None, &[], &None).is_err());
    }
}
