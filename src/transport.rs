//! Command templates for the three supported transports plus concatenation,
//! cleanup, and liveness probing — all issued through an `ssh` wrapper
//! (spec.md §6). Every command here is built as a `std::process::Command`
//! rather than a shell string; the `cat`/`rm` jobs still need a remote shell
//! for the glob (`prefix*`), so those two keep the single-quoted inline
//! script form the original relies on.

use std::process::{Command, Stdio};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Scp,
    Rcp,
    Rsync,
}

impl Transport {
    pub fn as_str(self) -> &'static str {
        match self {
            Transport::Scp => "scp",
            Transport::Rcp => "rcp",
            Transport::Rsync => "rsync",
        }
    }
}

/// Paths to the external binaries this crate shells out to. Defaults match
/// what's on `$PATH`; overridable via config (SPEC_FULL.md §10.3).
#[derive(Debug, Clone)]
pub struct BinPaths {
    pub ssh: String,
    pub scp: String,
    pub rcp: String,
    pub rsync: String,
    /// `-u` (spec.md §6): prefixed onto every host argument as `user@host`
    /// when set, the same shape the teacher's `parse_remote_host` accepts.
    pub username: Option<String>,
}

impl Default for BinPaths {
    fn default() -> Self {
        Self {
            ssh: "ssh".to_string(),
            scp: "scp".to_string(),
            rcp: "rcp".to_string(),
            rsync: "rsync".to_string(),
            username: None,
        }
    }
}

/// Prefixes `host` with `username@` when one is configured.
fn addr(bins: &BinPaths, host: &str) -> String {
    match &bins.username {
        Some(user) => format!("{user}@{host}"),
        None => host.to_string(),
    }
}

/// Build the child command that copies `chunk` from `seed` to `target`
/// through the configured transport, issued from the seed via ssh:
/// `ssh -o StrictHostKeyChecking=no <seed> <copy-cmd> <chunk> <target>:<chunk>`.
pub fn transfer_command(
    bins: &BinPaths,
    transport: Transport,
    seed_host: &str,
    target_host: &str,
    chunk_path: &str,
) -> Command {
    let mut cmd = Command::new(&bins.ssh);
    cmd.arg("-o").arg("StrictHostKeyChecking=no").arg(addr(bins, seed_host));
    let target_addr = addr(bins, target_host);
    match transport {
        Transport::Scp => {
            cmd.arg(&bins.scp)
                .arg("-c")
                .arg("blowfish")
                .arg("-o")
                .arg("StrictHostKeyChecking=no")
                .arg(chunk_path)
                .arg(format!("{target_addr}:{chunk_path}"));
        }
        Transport::Rcp => {
            cmd.arg(&bins.rcp).arg(chunk_path).arg(format!("{target_addr}:{chunk_path}"));
        }
        Transport::Rsync => {
            cmd.arg(&bins.rsync)
                .arg("-c")
                .arg(chunk_path)
                .arg(format!("{target_addr}:{chunk_path}"));
        }
    }
    cmd.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::piped());
    cmd
}

/// `ssh ... 'cat <prefix>* > <dest>'`.
pub fn cat_command(bins: &BinPaths, host: &str, prefix: &str, dest: &str) -> Command {
    let mut cmd = Command::new(&bins.ssh);
    cmd.arg("-o")
        .arg("StrictHostKeyChecking=no")
        .arg(addr(bins, host))
        .arg(format!("cat {prefix}* > {dest}"))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());
    cmd
}

/// `ssh ... 'rm -f <prefix>*'`.
pub fn rm_command(bins: &BinPaths, host: &str, prefix: &str) -> Command {
    let mut cmd = Command::new(&bins.ssh);
    cmd.arg("-o")
        .arg("StrictHostKeyChecking=no")
        .arg(addr(bins, host))
        .arg(format!("rm -f {prefix}*"))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());
    cmd
}

/// `ssh ... exit`; exit 0 means alive.
pub fn probe_command(bins: &BinPaths, host: &str) -> Command {
    let mut cmd = Command::new(&bins.ssh);
    cmd.arg("-o")
        .arg("StrictHostKeyChecking=no")
        .arg(addr(bins, host))
        .arg("exit")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    cmd
}

/// `split --verbose -b <chunksize> <source> <prefix>`.
pub fn split_command(split_bin: &str, chunk_size: &str, source_path: &str, prefix: &str) -> Command {
    let mut cmd = Command::new(split_bin);
    cmd.arg("--verbose")
        .arg("-b")
        .arg(chunk_size)
        .arg(source_path)
        .arg(prefix)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scp_command_has_expected_shape() {
        let bins = BinPaths::default();
        let cmd = transfer_command(&bins, Transport::Scp, "seed1", "target1", "/tmp/f.chunk_aa");
        let args: Vec<String> = cmd.get_args().map(|a| a.to_string_lossy().to_string()).collect();
        assert_eq!(cmd.get_program().to_string_lossy(), "ssh");
        assert!(args.contains(&"seed1".to_string()));
        assert!(args.contains(&"scp".to_string()));
        assert!(args.iter().any(|a| a == "target1:/tmp/f.chunk_aa"));
        // StrictHostKeyChecking=no must appear exactly twice per spec.md §6: in
        // the outer ssh wrapper and (for scp) the inner copy command.
        assert_eq!(args.iter().filter(|a| *a == "StrictHostKeyChecking=no").count(), 2);
    }

    #[test]
    fn rcp_command_has_no_inner_strict_host_flag() {
        let bins = BinPaths::default();
        let cmd = transfer_command(&bins, Transport::Rcp, "seed1", "target1", "/tmp/f.chunk_aa");
        let args: Vec<String> = cmd.get_args().map(|a| a.to_string_lossy().to_string()).collect();
        assert_eq!(args.iter().filter(|a| *a == "StrictHostKeyChecking=no").count(), 1);
    }

    #[test]
    fn username_is_prefixed_onto_every_host_argument() {
        let bins = BinPaths { username: Some("alice".to_string()), ..BinPaths::default() };
        let cmd = transfer_command(&bins, Transport::Scp, "seed1", "target1", "/tmp/f.chunk_aa");
        let args: Vec<String> = cmd.get_args().map(|a| a.to_string_lossy().to_string()).collect();
        assert!(args.contains(&"alice@seed1".to_string()));
        assert!(args.iter().any(|a| a == "alice@target1:/tmp/f.chunk_aa"));

        let rm = rm_command(&bins, "target1", "/tmp/foo.chunk_");
        let rm_args: Vec<String> = rm.get_args().map(|a| a.to_string_lossy().to_string()).collect();
        assert!(rm_args.contains(&"alice@target1".to_string()));
    }

    #[test]
    fn cat_command_globs_the_prefix() {
        let bins = BinPaths::default();
        let cmd = cat_command(&bins, "target1", "/tmp/foo.chunk_", "/data/foo");
        let args: Vec<String> = cmd.get_args().map(|a| a.to_string_lossy().to_string()).collect();
        assert!(args.iter().any(|a| a == "cat /tmp/foo.chunk_* > /data/foo"));
    }
}
