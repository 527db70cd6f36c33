// crates/oscar-core/src/arena.rs

//! State arena & duplicate hash (component C).
//!
//! An append-only store of `P`-phase states with parent back-links, plus a
//! Zobrist-style duplicate filter. This keeps the semantics of a flat,
//! strided array of fixed-size slots (monotonic growth, backward-only
//! parent links, capacity-triggered compaction) on top of a plain
//! `Vec<State>`, the idiomatic Rust equivalent of a flat array of
//! fixed-size records.

use crate::rule::Row;
use anyhow::{ensure, Result};
use rand::{rngs::StdRng, Rng as _, SeedableRng};
use std::collections::HashMap;

/// Seed used to build the Zobrist hash tables. Fixed rather than random so
/// runs are reproducible across processes.
const HASH_SEED: u64 = 0x0bb1_f0cc_a11a_51ed;

/// One state: a back-link to its parent plus `P` phase rows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct State {
    /// Index of this state's parent in the arena. The root is its own
    /// parent (index 0).
    pub parent: usize,
    /// Phase rows `row_0..row_{P-1}`.
    pub rows: Vec<Row>,
}

impl State {
    fn root(period: u32) -> Self {
        Self {
            parent: 0,
            rows: vec![0; period as usize],
        }
    }
}

/// Zobrist-style duplicate filter.
///
/// Two states are duplicates iff their own rows *and* their parents' rows
/// agree across every phase. We hash on that same key and chain collisions
/// in a small `Vec`, rather than
/// replicating the historical fixed-size open-addressed table with
/// three-probe linear scanning: the observable behaviour (dedup soundness)
/// is identical, and a `HashMap` is the idiomatic Rust substitute for a
/// hand-rolled hash table.
#[derive(Clone)]
struct DuplicateHash {
    period: usize,
    h: Vec<[u64; 256]>,  // h[phase][byte value], for this state's own rows
    hp: Vec<[u64; 256]>, // h'[phase][byte value], for the parent's rows
    table: HashMap<u64, Vec<usize>>,
}

impl DuplicateHash {
    fn new(period: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(HASH_SEED);
        let mut gen_table = |rng: &mut StdRng| -> Vec<[u64; 256]> {
            (0..period)
                .map(|_| {
                    let mut row = [0u64; 256];
                    for v in &mut row {
                        *v = rng.random();
                    }
                    row
                })
                .collect()
        };
        let h = gen_table(&mut rng);
        let hp = gen_table(&mut rng);
        Self {
            period,
            h,
            hp,
            table: HashMap::new(),
        }
    }

    fn key_of(&self, own: &[Row], parent: &[Row]) -> u64 {
        let mut acc = 0u64;
        for (p, &row) in own.iter().enumerate() {
            for b in 0..4 {
                let byte = (row >> (8 * b)) & 0xff;
                acc = acc.wrapping_add(self.h[p][byte as usize]);
            }
        }
        for (p, &row) in parent.iter().enumerate() {
            for b in 0..4 {
                let byte = (row >> (8 * b)) & 0xff;
                acc = acc.wrapping_add(self.hp[p][byte as usize]);
            }
        }
        acc
    }

    /// Returns `true` if an identical `(own, parent)` pair is already
    /// recorded; otherwise records `idx` under its hash and returns `false`.
    fn insert_if_new(&mut self, idx: usize, own: &[Row], parent: &[Row], equal_to: impl Fn(usize) -> bool) -> bool {
        debug_assert_eq!(own.len(), self.period);
        let key = self.key_of(own, parent);
        let bucket = self.table.entry(key).or_default();
        for &candidate in bucket.iter() {
            if equal_to(candidate) {
                return true;
            }
        }
        bucket.push(idx);
        false
    }
}

/// Append-only arena of `P`-phase states.
#[derive(Clone)]
pub struct StateArena {
    period: u32,
    states: Vec<State>,
    capacity: usize,
    dup: DuplicateHash,
    hashing_enabled: bool,
}

impl StateArena {
    /// Default capacity. Large-scale oscillator hunts want a much bigger
    /// arena addressed by a wider index; this default is tuned for a
    /// reference implementation, not a record-chasing one, and is
    /// overridable via [`crate::config::SearchConfig::capacity`].
    pub const DEFAULT_CAPACITY: usize = 1 << 20;

    /// Install the root (self-parent, all-zero rows) and optionally up to
    /// two user-supplied history rows as its ancestors.
    pub fn seed(
        period: u32,
        capacity: usize,
        parent_rows: Option<Vec<Row>>,
        grandparent_rows: Option<Vec<Row>>,
    ) -> Result<Self> {
        ensure!(capacity >= 1, "arena capacity must be at least 1");
        let mut states = Vec::with_capacity(capacity.min(1 << 16));
        states.push(State::root(period));

        let mut arena = Self {
            period,
            states,
            capacity,
            dup: DuplicateHash::new(period as usize),
            hashing_enabled: true,
        };

        // Seed history runs oldest-first: grandparent, then parent, each
        // parented to the previous entry, so `enqueue`'s ordering invariant
        // (parent index strictly precedes child) holds from the start.
        if let Some(gp_rows) = grandparent_rows {
            ensure!(
                gp_rows.len() as u32 == period,
                "grandparent seed must supply {} rows, got {}",
                period,
                gp_rows.len()
            );
            arena.states.push(State { parent: 0, rows: gp_rows });
        }
        if let Some(p_rows) = parent_rows {
            ensure!(
                p_rows.len() as u32 == period,
                "parent seed must supply {} rows, got {}",
                period,
                p_rows.len()
            );
            let parent_idx = arena.states.len() - 1;
            arena.states.push(State {
                parent: parent_idx,
                rows: p_rows,
            });
        }
        Ok(arena)
    }

    /// Number of live states (including the root and any seeded history).
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Configured capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oscillation period.
    #[must_use]
    pub fn period(&self) -> u32 {
        self.period
    }

    /// Disable (or re-enable) duplicate hashing, used to switch hashing off
    /// during compaction's scratch-arena DFS re-run.
    pub fn set_hashing_enabled(&mut self, enabled: bool) {
        self.hashing_enabled = enabled;
    }

    /// Index of the root (always `0`).
    #[must_use]
    pub const fn root(&self) -> usize {
        0
    }

    /// Next arena index after `s`.
    #[must_use]
    pub const fn next_slot(s: usize) -> usize {
        s + 1
    }

    /// Previous arena index before `s`.
    ///
    /// # Panics
    /// Panics if `s == 0` (the root has no predecessor).
    #[must_use]
    pub fn prev_slot(s: usize) -> usize {
        s.checked_sub(1).expect("prev_slot called on the root")
    }

    /// Borrow a state by index.
    #[must_use]
    pub fn get(&self, idx: usize) -> &State {
        &self.states[idx]
    }

    /// Parent index of `idx`.
    #[must_use]
    pub fn parent_of(&self, idx: usize) -> usize {
        self.states[idx].parent
    }

    /// Depth of `idx`: its distance from the self-parent root.
    #[must_use]
    pub fn depth(&self, idx: usize) -> usize {
        let mut d = 0;
        let mut cur = idx;
        while cur != self.states[cur].parent {
            cur = self.states[cur].parent;
            d += 1;
        }
        d
    }

    /// Validate a candidate child and, if it is not a duplicate, append it.
    ///
    /// Returns `Ok(None)` if the candidate duplicates an existing state
    /// (caller discards it), `Ok(Some(idx))` with the new state's index
    /// otherwise. Fails if `parent` is out of range or the arena is full.
    pub fn enqueue(&mut self, parent: usize, rows: Vec<Row>) -> Result<Option<usize>> {
        ensure!(parent < self.states.len(), "enqueue: parent index {parent} out of range");
        ensure!(
            rows.len() as u32 == self.period,
            "enqueue: expected {} rows, got {}",
            self.period,
            rows.len()
        );
        ensure!(
            self.states.len() < self.capacity,
            "state arena capacity exceeded ({} states)",
            self.capacity
        );

        if self.hashing_enabled {
            let parent_rows = self.states[parent].rows.clone();
            let new_idx = self.states.len();
            let is_dup = {
                let states = &self.states;
                self.dup.insert_if_new(new_idx, &rows, &parent_rows, |candidate_idx| {
                    states[candidate_idx].rows == rows && states[states[candidate_idx].parent].rows == parent_rows
                })
            };
            if is_dup {
                return Ok(None);
            }
        }

        self.states.push(State { parent, rows });
        Ok(Some(self.states.len() - 1))
    }

    /// Whether the arena should trigger compaction: the free pointer
    /// (equal to `len()` for an append-only arena with no holes yet) has
    /// reached half of capacity.
    #[must_use]
    pub fn needs_compaction(&self) -> bool {
        self.states.len() * 2 >= self.capacity
    }

    /// Replace the live state set after mark-and-compact, rehashing every
    /// surviving state. `states` must be in final index order, with every
    /// state's `parent` field already rewritten to the new indices.
    pub fn replace_states(&mut self, states: Vec<State>) -> Result<()> {
        ensure!(!states.is_empty(), "replace_states requires at least the root");
        self.dup = DuplicateHash::new(self.period as usize);
        self.states = Vec::with_capacity(self.capacity.min(1 << 16));
        for state in states {
            let idx = self.states.len();
            if idx > 0 {
                let parent_rows = self.states[state.parent].rows.clone();
                // Rehashing only rebuilds lookup bookkeeping for future
                // enqueues; surviving states are already known distinct; so
                // the equality test here always reports "not a duplicate".
                self.dup.insert_if_new(idx, &state.rows, &parent_rows, |_| false);
            }
            self.states.push(state);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arena_ordering_holds_after_enqueue() {
        let mut arena = StateArena::seed(2, 16, None, None).unwrap();
        let a = arena.enqueue(0, vec![1, 2]).unwrap().unwrap();
        let b = arena.enqueue(a, vec![3, 4]).unwrap().unwrap();
        assert!(arena.parent_of(a) < a);
        assert!(arena.parent_of(b) < b);
        assert_eq!(arena.parent_of(0), 0);
    }

    #[test]
    fn duplicate_rows_are_rejected() {
        let mut arena = StateArena::seed(2, 16, None, None).unwrap();
        let a = arena.enqueue(0, vec![1, 2]).unwrap().unwrap();
        let dup = arena.enqueue(0, vec![1, 2]).unwrap();
        assert!(dup.is_none());
        let distinct = arena.enqueue(0, vec![1, 3]).unwrap();
        assert!(distinct.is_some());
        let _ = a;
    }

    #[test]
    fn capacity_overflow_is_fatal() {
        let mut arena = StateArena::seed(1, 2, None, None).unwrap();
        assert!(arena.enqueue(0, vec![1]).is_err());
    }

    #[test]
    fn disabling_hashing_allows_literal_duplicates() {
        let mut arena = StateArena::seed(1, 16, None, None).unwrap();
        arena.set_hashing_enabled(false);
        assert!(arena.enqueue(0, vec![1]).unwrap().is_some());
        assert!(arena.enqueue(0, vec![1]).unwrap().is_some());
    }
}
