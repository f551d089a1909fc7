//! Optional stats log (`-s <path>`, SPEC_FULL.md §10.5): a `start`/`end`
//! header and trailer bracketing one `<elapsedSeconds>, <cumulativeHosts>`
//! line per host completion, timestamped the way the teacher stamps
//! `last_connect` in its server records.

use std::fs::File;
use std::io::{self, Write};
use std::sync::Mutex;
use std::time::Instant;

use chrono::Local;

pub struct StatsLog {
    file: Mutex<File>,
    start: Instant,
}

impl StatsLog {
    pub fn create(path: &std::path::Path) -> io::Result<Self> {
        let mut file = File::create(path)?;
        writeln!(file, "start {}", Local::now().format("%Y-%m-%d %H:%M:%S"))?;
        Ok(Self { file: Mutex::new(file), start: Instant::now() })
    }

    /// Appends a line when a host finishes receiving every chunk.
    /// `cumulative_completed` is the running total, including the origin,
    /// and must be read under the same per-host-completion lock that
    /// enforces invariant 6 so the log's counter agrees with `hostsWithFile`.
    pub fn record_completion(&self, cumulative_completed: usize) {
        let elapsed = self.start.elapsed().as_secs();
        let mut file = self.file.lock().unwrap();
        let _ = writeln!(file, "{elapsed}, {cumulative_completed}");
    }

    pub fn finish(&self) {
        let elapsed = self.start.elapsed().as_secs();
        let mut file = self.file.lock().unwrap();
        let _ = writeln!(file, "end {} (total = {elapsed})", Local::now().format("%Y-%m-%d %H:%M:%S"));
        let _ = file.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_header_completion_and_trailer_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.log");
        let log = StatsLog::create(&path).unwrap();
        log.record_completion(2);
        log.record_completion(3);
        log.finish();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert!(lines[0].starts_with("start "));
        assert!(lines[1].ends_with(", 2"));
        assert!(lines[2].ends_with(", 3"));
        assert!(lines[3].starts_with("end ") && lines[3].contains("(total = "));
    }
}
