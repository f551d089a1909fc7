//! Command-line surface (spec.md §6, SPEC_FULL.md §6.1/§10.1). Mirrors the
//! teacher's top-level-positional-plus-subcommand shape: a bare invocation
//! distributes `source` to `dest` across the swarm; `clean` is the one
//! subcommand, for sweeping up leftover chunk files without a transfer.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
#[clap(subcommand_negates_reqs(true))]
pub struct Cli {
    #[clap(required = true, help = "Local file to distribute")]
    pub source: Option<PathBuf>,

    #[clap(required = true, help = "Destination path on every target host")]
    pub dest: Option<String>,

    #[clap(short = 'f', long, help = "File containing one hostname per line", display_order = 1)]
    pub host_file: Option<PathBuf>,

    #[clap(
        short = 'l',
        long,
        num_args = 1..,
        value_delimiter = ' ',
        help = "Space-separated hostnames, e.g. -l 'host1 host2 host3'",
        display_order = 2
    )]
    pub hosts: Vec<String>,

    #[clap(
        short = 'r',
        long,
        help = "Bracketed hostname range, e.g. node[01-03,7-8]",
        display_order = 3
    )]
    pub host_range: Option<String>,

    #[clap(short = 'u', long, help = "Username to prefix onto every host as user@host", display_order = 4)]
    pub username: Option<String>,

    #[clap(long, help = "Use scp for inter-host transfers (default)")]
    pub scp: bool,

    #[clap(long, help = "Use rcp for inter-host transfers")]
    pub rcp: bool,

    #[clap(long, help = "Use rsync for inter-host transfers")]
    pub rsync: bool,

    #[clap(short = 'b', long, help = "Chunk size passed to split, e.g. 10m", display_order = 5)]
    pub chunk_size: Option<String>,

    #[clap(short = 't', long, help = "Concurrent transfer slots per host", display_order = 6)]
    pub max_slots_per_host: Option<usize>,

    #[clap(long, help = "Global concurrent transfer limit")]
    pub max_concurrent_transfers: Option<usize>,

    #[clap(long, help = "Concurrent cat/rm child processes")]
    pub max_procs: Option<usize>,

    #[clap(long, help = "Consecutive transfer failures before a host is marked dead")]
    pub max_fail_count: Option<usize>,

    #[clap(
        long,
        help = "Kill the splitter after N seconds with no progress (0 disables)",
        default_value_t = 0
    )]
    pub split_timeout_secs: u64,

    #[clap(short = 's', long = "stats", help = "Log run statistics to the default stats log")]
    pub stats_log: bool,

    #[clap(short = 'p', long, help = "Leave chunk files on target hosts instead of cleaning them up")]
    pub keep_chunks: bool,

    #[clap(short = 'v', long, help = "Show progress bars on stdout")]
    pub verbose: bool,

    #[clap(long, help = "Enable debug-level logging to the log file")]
    pub debug: bool,

    #[clap(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Resolves the `--scp`/`--rcp`/`--rsync` flags to a single transport,
    /// scp by default — independent bools rather than an enum, matching the
    /// teacher's own `Copy` subcommand flags.
    pub fn transport(&self) -> crate::transport::Transport {
        if self.rsync {
            crate::transport::Transport::Rsync
        } else if self.rcp {
            crate::transport::Transport::Rcp
        } else {
            crate::transport::Transport::Scp
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[clap(about = "Remove leftover chunk files for a prior transfer from every host")]
    Clean {
        #[clap(help = "Original source filename used for the prior transfer")]
        filename: String,

        #[clap(short = 'f', long)]
        host_file: Option<PathBuf>,

        #[clap(short = 'l', long, num_args = 1.., value_delimiter = ' ')]
        hosts: Vec<String>,

        #[clap(short = 'r', long)]
        host_range: Option<String>,

        #[clap(short = 'u', long)]
        username: Option<String>,

        #[clap(long)]
        debug: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn transport_defaults_to_scp_and_the_flags_are_independent_bools() {
        let cli = Cli::try_parse_from(["chunkswarm", "src", "dst"]).unwrap();
        assert_eq!(cli.transport(), crate::transport::Transport::Scp);

        let cli = Cli::try_parse_from(["chunkswarm", "src", "dst", "--rsync"]).unwrap();
        assert_eq!(cli.transport(), crate::transport::Transport::Rsync);

        let cli = Cli::try_parse_from(["chunkswarm", "src", "dst", "--rcp"]).unwrap();
        assert_eq!(cli.transport(), crate::transport::Transport::Rcp);
    }

    #[test]
    fn dash_t_binds_to_max_slots_per_host() {
        let cli = Cli::try_parse_from(["chunkswarm", "src", "dst", "-t", "8"]).unwrap();
        assert_eq!(cli.max_slots_per_host, Some(8));
    }

    #[test]
    fn dash_p_and_dash_s_and_dash_v_are_plain_flags() {
        let cli = Cli::try_parse_from(["chunkswarm", "src", "dst", "-p", "-s", "-v"]).unwrap();
        assert!(cli.keep_chunks);
        assert!(cli.stats_log);
        assert!(cli.verbose);
    }

    #[test]
    fn dash_u_sets_username() {
        let cli = Cli::try_parse_from(["chunkswarm", "src", "dst", "-u", "alice"]).unwrap();
        assert_eq!(cli.username.as_deref(), Some("alice"));
    }
}
