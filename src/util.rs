//! Ambient display helpers: progress bars, the startup header line, and the
//! post-run summary — all adapted from the teacher's `util.rs`, which does
//! the same job around its own transfers.

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use owo_colors::OwoColorize;
use std::sync::Arc;

/// Sets up a `MultiProgress` with a header spinner line and a total
/// progress bar tracking hosts completed out of the swarm size.
pub fn init_progress_and_mp(
    verbose: bool,
    total_hosts: u64,
) -> (Arc<MultiProgress>, ProgressBar, ProgressBar) {
    let mp = Arc::new(if verbose {
        MultiProgress::with_draw_target(ProgressDrawTarget::stdout())
    } else {
        MultiProgress::new()
    });
    let header = mp.add(ProgressBar::new_spinner());
    header.set_style(ProgressStyle::with_template("{msg}").expect("valid header template"));
    let total_pb = mp.add(ProgressBar::new(total_hosts));
    total_pb.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} hosts complete")
            .expect("valid total-bar template"),
    );
    (mp, total_pb, header)
}

/// Populate the startup header above the total progress bar: transport,
/// host count, chunk size, and concurrency limits.
pub fn set_startup_header(
    header: &ProgressBar,
    transport: &str,
    host_count: usize,
    chunk_size: &str,
    max_concurrent_transfers: usize,
) {
    let transport_field = format!("{:<14}", format!("Transport:{transport}"));
    let hosts_field = format!("{:<14}", format!("Hosts:{host_count}"));
    let chunk_field = format!("{:<16}", format!("Chunk:{chunk_size}"));
    let conc_field = format!("{:<16}", format!("Concurrency:{max_concurrent_transfers}"));
    let msg = format!(
        "{}    {}    {}    {}",
        transport_field.green(),
        hosts_field.cyan(),
        chunk_field.yellow(),
        conc_field.magenta()
    );
    header.set_message(msg);
}

/// Prints a concise, colored end-of-run summary.
pub fn print_summary(hosts_with_file: usize, total_hosts: usize, dead_hosts: usize, elapsed_secs: f64) {
    let completed = format!("{hosts_with_file}/{total_hosts}").green();
    let dead = if dead_hosts > 0 {
        format!("{dead_hosts} dead").red().to_string()
    } else {
        "0 dead".to_string()
    };
    println!("{completed} hosts received the file ({dead}) in {elapsed_secs:.1}s");
}

