use std::fs::OpenOptions;

use anyhow::Result;
use clap::Parser;
use tracing_appender::non_blocking;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

mod chunk;
mod cli;
mod config;
mod error;
mod finalizer;
mod host;
mod hostlist;
mod liveness;
mod process_pool;
mod run;
mod scheduler;
mod splitter;
mod statslog;
mod swarm;
mod transport;
mod util;
mod worker;

pub use error::SwarmError;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    let config = config::Config::init();

    let debug = match &cli.command {
        Some(cli::Commands::Clean { debug, .. }) => *debug,
        None => cli.debug,
    };
    init_tracing_if_requested(&config, debug);

    let result = match &cli.command {
        Some(cli::Commands::Clean { filename, host_file, hosts, host_range, username, .. }) => {
            run::run_clean(filename, host_file, hosts, host_range, username, &config)
        }
        None => run::run_transfer(&cli, &config),
    };

    if let Err(e) = result {
        eprintln!("chunkswarm: {e}");
        std::process::exit(1);
    }
    Ok(())
}

fn init_tracing_if_requested(config: &config::Config, debug: bool) {
    let logs_dir = config.logs_dir();
    let _ = std::fs::create_dir_all(&logs_dir);
    let log_path = logs_dir.join("debug.log");
    let level_str = if debug { "debug" } else { "warn" };

    match OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(file) => {
            let (non_blocking_writer, guard) = non_blocking(file);
            // Leak the worker guard so the background writer thread stays
            // alive for the life of the process.
            let _ = Box::leak(Box::new(guard));
            let file_layer = fmt::layer()
                .with_writer(non_blocking_writer)
                .with_ansi(false)
                .with_filter(EnvFilter::new(level_str));
            tracing_subscriber::registry().with(file_layer).init();
        }
        Err(e) => {
            eprintln!("warning: could not open debug log at {}: {e}", log_path.display());
        }
    }
}
