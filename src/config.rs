//! Persisted configuration (SPEC_FULL.md §10.3): external binary paths and
//! the default tuning knobs, stored as JSON at `~/.chunkswarm/config.json`.
//! Mirrors the teacher's home-dir-based init/save pattern, minus the
//! version-migration machinery this crate has no legacy format to migrate
//! from.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    pub ssh_client_path: PathBuf,
    pub scp_path: PathBuf,
    pub rsync_path: PathBuf,
    pub rcp_path: PathBuf,
    pub split_path: PathBuf,
    pub default_chunk_size: String,
    pub max_slots_per_host: usize,
    pub max_concurrent_transfers: usize,
    pub max_procs: usize,
    pub max_fail_count: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ssh_client_path: PathBuf::from("ssh"),
            scp_path: PathBuf::from("scp"),
            rsync_path: PathBuf::from("rsync"),
            rcp_path: PathBuf::from("rcp"),
            split_path: PathBuf::from("split"),
            default_chunk_size: "10m".to_string(),
            max_slots_per_host: 4,
            max_concurrent_transfers: 250,
            max_procs: 500,
            max_fail_count: 3,
        }
    }
}

impl Config {
    /// Loads `~/.chunkswarm/config.json`, creating the directory and a
    /// default config file on first run. Exits the process on an
    /// unrecoverable home-dir or filesystem failure, matching the teacher's
    /// `Config::init`.
    pub fn init() -> Self {
        let Some(home_dir) = dirs::home_dir() else {
            eprintln!("cannot find user's home directory");
            std::process::exit(1);
        };
        let storage_dir = match ensure_config_dir(&home_dir) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("unable to prepare config directory: {e}");
                std::process::exit(1);
            }
        };
        let config_path = storage_dir.join("config.json");
        if !config_path.exists() {
            let config = Config::default();
            config.save_to(&config_path);
            return config;
        }
        Config::read_from(&config_path)
    }

    fn read_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                eprintln!("config at {} is corrupt ({e}); using defaults", path.display());
                Config::default()
            }),
            Err(e) => {
                eprintln!("unable to read config at {}: {e}; using defaults", path.display());
                Config::default()
            }
        }
    }

    fn save_to(&self, path: &Path) {
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = std::fs::write(path, json) {
                    eprintln!("unable to write config to {}: {e}", path.display());
                }
            }
            Err(e) => eprintln!("unable to serialize config: {e}"),
        }
    }

    /// Persists the current settings back to `~/.chunkswarm/config.json`.
    pub fn save_to_storage(&self) {
        if let Some(home_dir) = dirs::home_dir() {
            match ensure_config_dir(&home_dir) {
                Ok(dir) => self.save_to(&dir.join("config.json")),
                Err(e) => eprintln!("unable to prepare config directory: {e}"),
            }
        } else {
            eprintln!("unable to find home directory, cannot save config");
        }
    }

    /// This crate has no persistent `~/.chunkswarm` requirement beyond the
    /// optional config file above, so the log directory lives alongside the
    /// chunk prefix's parent instead (SPEC_FULL.md §10.2).
    pub fn logs_dir(&self) -> PathBuf {
        PathBuf::from("/tmp/.chunkswarm/logs")
    }
}

fn ensure_config_dir(home_dir: &Path) -> std::io::Result<PathBuf> {
    let dir = home_dir.join(".chunkswarm");
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
    }
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_limits() {
        let c = Config::default();
        assert!(c.max_slots_per_host > 0);
        assert!(c.max_concurrent_transfers > 0);
        assert!(c.max_procs > 0);
    }

    #[test]
    fn round_trips_through_json() {
        let c = Config::default();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        c.save_to(&path);
        let loaded = Config::read_from(&path);
        assert_eq!(loaded.default_chunk_size, c.default_chunk_size);
        assert_eq!(loaded.max_fail_count, c.max_fail_count);
    }
}
