//! Structured errors for setup and terminal failures (SPEC_FULL.md §7.1).
//! Per-transfer and per-host failures are recoverable and handled inline by
//! the scheduler/worker/finalizer; this enum is for the things that stop a
//! whole run.

use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub enum SwarmError {
    /// A required external binary (ssh/scp/rsync/rcp/split) was not found
    /// on `$PATH` or at its configured path.
    MissingBinary(String),
    /// The source file to distribute does not exist or is not readable.
    SourceUnreadable(PathBuf, String),
    /// The host list resolved to zero hosts (after `-f`/`-l`/`-r` expansion).
    EmptyHostList,
    /// A `-r` range spec failed to parse.
    InvalidRange(String),
    /// The config directory/file could not be created or read.
    ConfigError(PathBuf, String),
    /// Every host in the swarm died before the origin's copy could be
    /// fully distributed (spec.md §4.2 "Termination query", every-host-dead
    /// case).
    AllHostsDead,
    /// The splitter child exited non-zero (or was killed by
    /// `--split-timeout-secs`) before the swarm could make further progress.
    SplitFailure(String),
    /// The operator interrupted the run (Ctrl-C) before it finished.
    OperatorInterrupt,
}

impl fmt::Display for SwarmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwarmError::MissingBinary(bin) => {
                write!(f, "required binary not found on PATH: {bin}")
            }
            SwarmError::SourceUnreadable(path, msg) => {
                write!(f, "cannot read source file {}: {msg}", path.display())
            }
            SwarmError::EmptyHostList => write!(f, "host list is empty after expansion"),
            SwarmError::InvalidRange(spec) => write!(f, "invalid host range: {spec}"),
            SwarmError::ConfigError(path, msg) => {
                write!(f, "config error at {}: {msg}", path.display())
            }
            SwarmError::AllHostsDead => {
                write!(f, "every host in the swarm died before the transfer completed")
            }
            SwarmError::SplitFailure(msg) => write!(f, "split failed: {msg}"),
            SwarmError::OperatorInterrupt => write!(f, "interrupted by operator"),
        }
    }
}

impl std::error::Error for SwarmError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_identifying_detail() {
        let e = SwarmError::MissingBinary("rsync".to_string());
        assert!(e.to_string().contains("rsync"));
    }

    #[test]
    fn operator_interrupt_has_a_display_message() {
        assert_eq!(SwarmError::OperatorInterrupt.to_string(), "interrupted by operator");
    }
}
