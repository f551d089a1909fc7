//! Per-host state: chunks owned, chunks needed, slots, liveness.
//!
//! `owned`/`needed`/`slots`/`alive`/`failCount` all mutate under a single
//! per-host mutex (spec.md §4.1, §5). The host never holds the swarm
//! database's mutex while its own is held; callers that need both take the
//! database lock first (spec.md §5, "lock ordering: database first, then
//! per-host").

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::chunk::Chunk;

#[derive(Debug, Default)]
struct HostInner {
    owned: Vec<Chunk>,
    needed: Vec<Chunk>,
    slots: usize,
    alive: bool,
    fail_count: usize,
}

/// A participant in the swarm: the origin, or one of its targets.
#[derive(Debug)]
pub struct Host {
    pub name: String,
    max_slots: usize,
    max_fail_count: usize,
    inner: Mutex<HostInner>,
    /// High-water mark into `origin.owned`, used by the splitter driver to
    /// discover newly produced chunks to append to this host's `needed`.
    /// Unused (stays 0) for the origin itself.
    chunk_index: AtomicUsize,
    is_origin: bool,
}

impl Host {
    pub fn new(name: impl Into<String>, max_slots: usize, max_fail_count: usize) -> Self {
        Self {
            name: name.into(),
            max_slots,
            max_fail_count,
            inner: Mutex::new(HostInner {
                owned: Vec::new(),
                needed: Vec::new(),
                slots: max_slots,
                alive: true,
                fail_count: 0,
            }),
            chunk_index: AtomicUsize::new(0),
            is_origin: false,
        }
    }

    /// The origin starts owning every chunk as it's produced and never needs
    /// anything; it's marked so the matcher and `registerNewChunk` can skip
    /// it (invariant 7: the origin is never a target).
    pub fn new_origin(name: impl Into<String>, max_slots: usize, max_fail_count: usize) -> Self {
        let mut h = Self::new(name, max_slots, max_fail_count);
        h.is_origin = true;
        h
    }

    pub fn is_origin(&self) -> bool {
        self.is_origin
    }

    pub fn is_alive(&self) -> bool {
        self.inner.lock().unwrap().alive
    }

    pub fn slots(&self) -> usize {
        self.inner.lock().unwrap().slots
    }

    pub fn fail_count(&self) -> usize {
        self.inner.lock().unwrap().fail_count
    }

    pub fn owned_len(&self) -> usize {
        self.inner.lock().unwrap().owned.len()
    }

    pub fn needed_len(&self) -> usize {
        self.inner.lock().unwrap().needed.len()
    }

    pub fn owns(&self, c: &Chunk) -> bool {
        self.inner.lock().unwrap().owned.iter().any(|o| o == c)
    }

    pub fn needs(&self, c: &Chunk) -> bool {
        self.inner.lock().unwrap().needed.iter().any(|o| o == c)
    }

    /// Appends `c` to `owned` without touching `needed`. Used by the
    /// splitter driver to record newly produced chunks on the origin.
    pub fn push_owned(&self, c: Chunk) {
        self.inner.lock().unwrap().owned.push(c);
    }

    /// Snapshot of `origin.owned` from `chunk_index` onward, advancing
    /// `chunk_index` to the new length. Only meaningful on the origin.
    pub fn drain_new_owned(&self) -> Vec<Chunk> {
        let inner = self.inner.lock().unwrap();
        let idx = self.chunk_index.load(Ordering::SeqCst);
        let fresh = inner.owned[idx..].to_vec();
        self.chunk_index.store(inner.owned.len(), Ordering::SeqCst);
        fresh
    }

    /// `chunk_index` high-water mark for a non-origin host: how many of the
    /// origin's produced chunks have already been folded into `needed`.
    pub fn chunk_index(&self) -> usize {
        self.chunk_index.load(Ordering::SeqCst)
    }

    /// Insert `c` into `needed` at `pos` (clamped to the current length),
    /// then advance this host's `chunk_index` to `new_index`. Called once
    /// per newly produced chunk, under the swarm database's `registerNewChunk`.
    pub fn insert_needed_at(&self, pos: usize, c: Chunk, new_index: usize) {
        let mut inner = self.inner.lock().unwrap();
        let pos = pos.min(inner.needed.len());
        inner.needed.insert(pos, c);
        self.chunk_index.store(new_index, Ordering::SeqCst);
    }

    pub fn needed_len_for_insert(&self) -> usize {
        self.inner.lock().unwrap().needed.len()
    }

    /// Snapshot of `owned`, used by the database to diff against its own
    /// high-water mark when registering newly produced chunks.
    pub fn owned_snapshot_pub(&self) -> Vec<Chunk> {
        self.inner.lock().unwrap().owned.clone()
    }

    /// Snapshot of `needed` in preference order, used by the matcher to scan
    /// without holding this host's lock across the (potentially recursive)
    /// seed search.
    pub fn needed_snapshot_pub(&self) -> Vec<Chunk> {
        self.inner.lock().unwrap().needed.clone()
    }

    /// Try to acquire one slot; returns true on success (mirrors the
    /// Python's unconditional decrement, but never drives `slots` negative —
    /// invariant 3).
    pub fn try_acquire_slot(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.slots > 0 {
            inner.slots -= 1;
            true
        } else {
            false
        }
    }

    pub fn release_slot(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.slots = (inner.slots + 1).min(self.max_slots);
    }

    /// Find the first chunk in `needed` (in order) for which `seed_has`
    /// returns true, and remove it. This is the "remove from needed when a
    /// transfer starts" half of invariant 4.
    pub fn take_first_needed_owned_by(
        &self,
        seed_has: impl Fn(&Chunk) -> bool,
    ) -> Option<Chunk> {
        let mut inner = self.inner.lock().unwrap();
        let pos = inner.needed.iter().position(|c| seed_has(c))?;
        Some(inner.needed.remove(pos))
    }

    /// Re-insert a chunk at the tail of `needed` after a failed transfer
    /// (invariant 4, second half). A no-op if the chunk is already present
    /// (defensive: the transfer worker only calls this once per failure).
    pub fn requeue_needed(&self, c: Chunk) {
        let mut inner = self.inner.lock().unwrap();
        if !inner.needed.iter().any(|o| *o == c) {
            inner.needed.push(c);
        }
    }

    /// Move `c` from in-flight into `owned` on transfer success. Returns the
    /// new `owned` length so the caller can check the completion invariant
    /// (6) under this same lock, avoiding a second acquisition racing another
    /// worker's completion.
    pub fn mark_owned(&self, c: Chunk) -> usize {
        let mut inner = self.inner.lock().unwrap();
        inner.owned.push(c);
        inner.owned.len()
    }

    pub fn reset_fail_count(&self) {
        self.inner.lock().unwrap().fail_count = 0;
    }

    /// Increments the consecutive-failure counter and reports whether it has
    /// now reached `max_fail_count` (the §9 extension: mark dead after N
    /// consecutive failures, same as a failed liveness probe).
    pub fn inc_fail_count(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_count += 1;
        inner.fail_count >= self.max_fail_count
    }

    /// Marks the host dead, zeroing its slots. Returns true iff this call
    /// performed the transition (idempotent: a dead host stays dead, and the
    /// database's `deadHosts` counter is incremented at most once per host).
    pub fn mark_dead(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.alive {
            inner.alive = false;
            inner.slots = 0;
            true
        } else {
            false
        }
    }

    /// `owned ∪ needed ⊆ producedChunks` sanity check used by tests; not on
    /// the hot path.
    #[cfg(test)]
    pub fn owned_and_needed_disjoint(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.owned.iter().all(|o| !inner.needed.iter().any(|n| n == o))
    }

    #[cfg(test)]
    pub fn needed_snapshot(&self) -> Vec<Chunk> {
        self.inner.lock().unwrap().needed.clone()
    }

    #[cfg(test)]
    pub fn owned_snapshot(&self) -> Vec<Chunk> {
        self.inner.lock().unwrap().owned.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_acquire_release_clamped() {
        let h = Host::new("a", 2, 3);
        assert!(h.try_acquire_slot());
        assert!(h.try_acquire_slot());
        assert!(!h.try_acquire_slot());
        h.release_slot();
        h.release_slot();
        h.release_slot(); // clamp: extra release must not exceed max_slots
        assert_eq!(h.slots(), 2);
    }

    #[test]
    fn mark_dead_is_idempotent() {
        let h = Host::new("a", 4, 3);
        assert!(h.mark_dead());
        assert!(!h.mark_dead());
        assert_eq!(h.slots(), 0);
        assert!(!h.is_alive());
    }

    #[test]
    fn fail_count_threshold() {
        let h = Host::new("a", 4, 3);
        assert!(!h.inc_fail_count());
        assert!(!h.inc_fail_count());
        assert!(h.inc_fail_count());
        h.reset_fail_count();
        assert_eq!(h.fail_count(), 0);
    }

    #[test]
    fn needed_owned_disjoint_across_transfer_lifecycle() {
        let h = Host::new("a", 4, 3);
        let c = Chunk::new("/tmp/f.chunk_aa");
        h.insert_needed_at(0, c.clone(), 1);
        assert!(h.needs(&c));
        let taken = h.take_first_needed_owned_by(|x| x == &c);
        assert_eq!(taken, Some(c.clone()));
        assert!(h.owned_and_needed_disjoint());
        h.mark_owned(c.clone());
        assert!(h.owns(&c));
        assert!(h.owned_and_needed_disjoint());
    }
}
