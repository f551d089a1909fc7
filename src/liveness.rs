//! Liveness probing (spec.md §4.1, §6). Synchronous by design: called only
//! from a failing transfer's completion path, never from the scheduler hot
//! loop (spec.md §4.1).
//!
//! SPEC_FULL.md §4.9 documents running this on a separate, independently
//! bounded probe queue as a future extension; this crate's scheduler always
//! probes inline.

use crate::transport::{BinPaths, probe_command};

/// Runs `ssh -o StrictHostKeyChecking=no <host> exit` and returns true iff it
/// exits 0.
pub fn probe(bins: &BinPaths, host: &str) -> bool {
    probe_command(bins, host).status().map(|s| s.success()).unwrap_or(false)
}
