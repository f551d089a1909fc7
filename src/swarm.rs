//! The swarm database: aggregate state over host records plus the atomic
//! `match()` operation the scheduler calls in a loop (spec.md §4.2).
//!
//! All cross-host mutations (`match`, `register_new_chunk`, `host_done`,
//! `inc_dead_hosts`, reading/setting `split_complete`) happen under a single
//! mutex. `match()` holds it for the whole scan — the scan is O(hostCount²)
//! worst case but bounded and cheap next to the network operations it's
//! gating (spec.md §4.2, §5).

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use rand::Rng;

use crate::chunk::Chunk;
use crate::host::Host;

/// A matched triple ready for a transfer worker: seed index, target index,
/// and the chunk to move between them. Slots on both hosts are already
/// debited by the time this is returned (spec.md §4.2 step 3).
#[derive(Debug, Clone)]
pub struct Match {
    pub seed: usize,
    pub target: usize,
    pub chunk: Chunk,
}

struct DbState {
    rr_cursor: usize,
}

pub struct Swarm {
    hosts: Vec<Host>,
    origin_index: usize,
    chunk_count: AtomicUsize,
    split_complete: AtomicBool,
    split_failed: AtomicBool,
    interrupted: AtomicBool,
    hosts_with_file: AtomicUsize,
    dead_hosts: AtomicUsize,
    state: Mutex<DbState>,
}

impl Swarm {
    /// `origin_name` becomes `hosts[0]`; `target_names` follow in the given
    /// order (the matcher's round robin visits them in array order).
    pub fn new(
        origin_name: impl Into<String>,
        target_names: impl IntoIterator<Item = impl Into<String>>,
        max_slots_per_host: usize,
        max_fail_count: usize,
    ) -> Self {
        let mut hosts = vec![Host::new_origin(origin_name, max_slots_per_host, max_fail_count)];
        for name in target_names {
            hosts.push(Host::new(name, max_slots_per_host, max_fail_count));
        }
        Self {
            hosts,
            origin_index: 0,
            chunk_count: AtomicUsize::new(0),
            split_complete: AtomicBool::new(false),
            split_failed: AtomicBool::new(false),
            interrupted: AtomicBool::new(false),
            hosts_with_file: AtomicUsize::new(1), // the origin already has the file
            dead_hosts: AtomicUsize::new(0),
            state: Mutex::new(DbState { rr_cursor: 0 }),
        }
    }

    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    pub fn origin(&self) -> &Host {
        &self.hosts[self.origin_index]
    }

    pub fn origin_index(&self) -> usize {
        self.origin_index
    }

    pub fn host(&self, idx: usize) -> &Host {
        &self.hosts[idx]
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_count.load(Ordering::SeqCst)
    }

    pub fn split_complete(&self) -> bool {
        self.split_complete.load(Ordering::SeqCst)
    }

    pub fn set_split_complete(&self) {
        self.split_complete.store(true, Ordering::SeqCst);
    }

    /// The splitter child exited non-zero (or was killed by a timeout).
    /// Told explicitly rather than leaving the scheduler to spin forever
    /// waiting for a `splitComplete` that will never come (spec.md §9).
    pub fn split_failed(&self) -> bool {
        self.split_failed.load(Ordering::SeqCst)
    }

    pub fn mark_split_failed(&self) {
        self.split_failed.store(true, Ordering::SeqCst);
    }

    /// The operator hit Ctrl-C. Set from a signal handler installed by the
    /// caller (spec.md §5): the scheduler stops initiating new transfers but
    /// still waits for in-flight workers before returning.
    pub fn interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    pub fn mark_interrupted(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }

    pub fn hosts_with_file(&self) -> usize {
        self.hosts_with_file.load(Ordering::SeqCst)
    }

    pub fn dead_hosts(&self) -> usize {
        self.dead_hosts.load(Ordering::SeqCst)
    }

    /// Called after a host has all chunks, so the scheduler knows when to
    /// stop (spec.md §4.1/§4.4 step 2).
    pub fn host_done(&self) {
        self.hosts_with_file.fetch_add(1, Ordering::SeqCst);
    }

    /// Called the first time `Host::mark_dead` actually transitions a host,
    /// so it's counted exactly once toward termination (invariant 5).
    pub fn inc_dead_hosts(&self) {
        self.dead_hosts.fetch_add(1, Ordering::SeqCst);
    }

    /// `hostsWithFile + deadHosts >= hostCount` (spec.md §4.2 "Termination
    /// query"), or the splitter reported it can never supply the rest of
    /// the chunks.
    pub fn done(&self) -> bool {
        self.interrupted()
            || self.split_failed()
            || self.hosts_with_file() + self.dead_hosts() >= self.host_count()
    }

    /// Marks a host dead and, if this is the transition that actually makes
    /// it dead (idempotent), increments `deadHosts` exactly once.
    pub fn mark_host_dead(&self, idx: usize) {
        if self.hosts[idx].mark_dead() {
            self.inc_dead_hosts();
        }
    }

    /// A new chunk was appended to `origin.owned` by the splitter driver
    /// (which must do that itself before calling this). For every
    /// non-origin host, insert each newly available chunk at a uniformly
    /// random position in its `needed` list, diversifying demand order
    /// (spec.md §4.2 "registerNewChunk").
    pub fn register_new_chunk(&self, new_chunk_count: usize) {
        self.chunk_count.store(new_chunk_count, Ordering::SeqCst);
        let origin_owned = self.hosts[self.origin_index].owned_snapshot_pub();
        let mut rng = rand::thread_rng();
        for (i, host) in self.hosts.iter().enumerate() {
            if i == self.origin_index {
                continue;
            }
            let start = host.chunk_index();
            if start >= origin_owned.len() {
                continue;
            }
            let mut idx = start;
            for chunk in &origin_owned[start..] {
                let cur_len = host.needed_len_for_insert();
                let pos = rng.gen_range(0..=cur_len);
                idx += 1;
                host.insert_needed_at(pos, chunk.clone(), idx);
            }
        }
    }

    /// The core scheduling step: find an eligible `(seed, target, chunk)`
    /// triple and debit slots on both hosts, or return `None` if no match
    /// currently exists (spec.md §4.2).
    pub fn try_match(&self) -> Option<Match> {
        let mut state = self.state.lock().unwrap();
        let host_count = self.host_count();
        if host_count == 0 {
            return None;
        }

        for _ in 0..host_count {
            state.rr_cursor = (state.rr_cursor + 1) % host_count;
            let t_idx = state.rr_cursor;
            if t_idx == self.origin_index {
                continue;
            }
            let target = &self.hosts[t_idx];
            if !target.is_alive() || target.slots() == 0 {
                continue;
            }

            // Try each chunk this target still needs, in its preferred
            // order, until we find a live seed with an open slot owning it.
            let needed = target.needed_snapshot_pub();
            if needed.is_empty() {
                continue;
            }

            for chunk in &needed {
                if let Some(s_idx) = self.find_seed(t_idx, chunk) {
                    // Debit slots first (both must succeed; seed slot can't
                    // disappear between the scan above and here because we
                    // still hold the database mutex).
                    if !self.hosts[s_idx].try_acquire_slot() {
                        continue;
                    }
                    if !target.try_acquire_slot() {
                        self.hosts[s_idx].release_slot();
                        continue;
                    }
                    // Remove the chunk from target.needed — it is now
                    // "in flight", belonging to neither owned nor needed
                    // (spec.md §5 ordering guarantees).
                    let taken = target.take_first_needed_owned_by(|c| c == chunk);
                    match taken {
                        Some(c) => {
                            return Some(Match { seed: s_idx, target: t_idx, chunk: c });
                        }
                        None => {
                            // Raced with itself within this single-threaded
                            // scan (shouldn't happen since we hold the lock
                            // for the whole scan), release and keep looking.
                            self.hosts[s_idx].release_slot();
                            target.release_slot();
                            continue;
                        }
                    }
                }
            }
        }
        None
    }

    /// Random starting index into the host array, scanning up to
    /// `hostCount` positions, for a live host with an open slot owning
    /// `chunk` (spec.md §4.2 step 2). Spreads seeder load so freshly
    /// produced chunks don't funnel only through the origin.
    fn find_seed(&self, target_idx: usize, chunk: &Chunk) -> Option<usize> {
        let host_count = self.host_count();
        let mut rng = rand::thread_rng();
        let mut idx = rng.gen_range(0..host_count);
        for _ in 0..host_count {
            if idx != target_idx {
                let h = &self.hosts[idx];
                if h.is_alive() && h.slots() > 0 && h.owns(chunk) {
                    return Some(idx);
                }
            }
            idx = (idx + host_count - 1) % host_count;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_host_cluster_is_immediately_done() {
        let db = Swarm::new("origin", Vec::<String>::new(), 4, 3);
        assert_eq!(db.hosts_with_file(), 1);
        assert_eq!(db.host_count(), 1);
        assert!(db.done());
        assert!(db.try_match().is_none());
    }

    #[test]
    fn origin_never_selected_as_target() {
        let db = Swarm::new("origin", ["t1"], 4, 3);
        // origin owns nothing needed, and its "needed" is always empty, so a
        // match would only ever pick t1 as target — verify the origin index
        // is always skipped even as rr_cursor sweeps past it repeatedly.
        for _ in 0..10 {
            assert!(db.try_match().is_none()); // t1 needs nothing yet (no chunks)
        }
    }

    #[test]
    fn register_new_chunk_reaches_every_non_origin_host_exactly_once() {
        let db = Swarm::new("origin", ["t1", "t2", "t3"], 4, 3);
        let c = Chunk::new("/tmp/f.chunk_aa");
        db.origin().push_owned(c.clone());
        db.register_new_chunk(1);
        for idx in 1..db.host_count() {
            let h = db.host(idx);
            assert_eq!(h.needed_len(), 1);
            assert!(h.needs(&c));
            assert_eq!(h.chunk_index(), 1);
        }
    }

    #[test]
    fn match_fairness_round_robins_targets() {
        // 1 origin + 3 targets, max_slots=1, 6 chunks already owned by origin.
        let db = Swarm::new("origin", ["t1", "t2", "t3"], 1, 3);
        for i in 0..6 {
            db.origin().push_owned(Chunk::new(format!("/tmp/f.chunk_{i:02}")));
        }
        db.register_new_chunk(6);

        let mut targets_seen = Vec::new();
        for _ in 0..3 {
            let m = db.try_match().expect("match should succeed");
            targets_seen.push(m.target);
        }
        let mut unique = targets_seen.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), 3, "expected 3 distinct targets, got {targets_seen:?}");
    }

    #[test]
    fn interrupt_marks_done_without_touching_progress_counters() {
        let db = Swarm::new("origin", ["t1", "t2"], 4, 3);
        assert!(!db.done());
        db.mark_interrupted();
        assert!(db.done());
        assert_eq!(db.hosts_with_file(), 1);
        assert_eq!(db.dead_hosts(), 0);
    }

    #[test]
    fn slot_conservation_after_match_and_release() {
        let db = Swarm::new("origin", ["t1"], 2, 3);
        db.origin().push_owned(Chunk::new("/tmp/f.chunk_aa"));
        db.register_new_chunk(1);
        let m = db.try_match().expect("match");
        assert_eq!(db.host(m.seed).slots(), 1);
        assert_eq!(db.host(m.target).slots(), 1);
        db.host(m.seed).release_slot();
        db.host(m.target).release_slot();
        assert_eq!(db.host(m.seed).slots(), 2);
        assert_eq!(db.host(m.target).slots(), 2);
    }
}
