//! Splitter driver (spec.md §4.5): runs `split --verbose` over the source
//! file and publishes each chunk to the swarm as soon as it's created, so
//! transfers of early chunks can start before the whole file is split.
//!
//! Grounded in the original's `split_file`, which reads `split`'s `--verbose`
//! output (GNU coreutils writes it to stdout) line by line and calls back
//! into the database on every "creating file" line rather than waiting for
//! the child to exit.

use std::io::{BufRead, BufReader};
use std::process::{Child, Command};
use std::thread;
use std::time::Duration;

use crate::chunk::Chunk;
use crate::swarm::Swarm;
use crate::transport::split_command;

/// GNU `split --verbose` prints `creating file 'xaa'` (or, on some
/// versions, without the leading quote style) for every chunk it writes.
/// Pull the filename out of the last single-quoted span on the line.
fn parse_created_filename(line: &str) -> Option<&str> {
    if !line.contains("creating file") {
        return None;
    }
    let start = line.find('\'')?;
    let rest = &line[start + 1..];
    let end = rest.find('\'')?;
    Some(&rest[..end])
}

/// Spawns `split`, streams its stdout (GNU split writes `--verbose` progress
/// to stdout) line by line, and registers each chunk with the swarm as it
/// appears. Blocks until `split` exits; intended to run on its own thread.
///
/// `timeout_secs` (0 disables) is a belt-and-suspenders safeguard: if the
/// child hasn't exited by then it is killed, which surfaces as the same
/// `SplitFailure` path as a non-zero exit (spec.md §9 open question).
pub fn run_splitter(
    split_bin: &str,
    chunk_size: &str,
    source_path: &str,
    prefix: &str,
    swarm: &Swarm,
    timeout_secs: u64,
) -> std::io::Result<()> {
    let mut child: Child = split_command(split_bin, chunk_size, source_path, prefix).spawn()?;
    let stdout = child.stdout.take().expect("split_command pipes stdout");
    let reader = BufReader::new(stdout);

    if timeout_secs > 0 {
        let pid = child.id();
        thread::spawn(move || {
            thread::sleep(Duration::from_secs(timeout_secs));
            let _ = Command::new("kill").arg("-9").arg(pid.to_string()).status();
        });
    }

    let mut produced = 0usize;
    for line in reader.lines() {
        let line = line?;
        if let Some(name) = parse_created_filename(&line) {
            swarm.origin().push_owned(Chunk::new(name));
            produced += 1;
            swarm.register_new_chunk(produced);
            tracing::debug!(chunk = name, produced, "split produced chunk");
        }
    }

    let status = child.wait()?;
    if !status.success() {
        tracing::warn!(source = source_path, "split exited with a failure status");
        swarm.mark_split_failed();
        return Ok(());
    }
    swarm.set_split_complete();
    Ok(())
}
