// crates/oscar-core/src/graph.rs

//! Per-state compatibility/reachability graph (component D).
//!
//! Given a state `s` (identified by its arena index) this builds, for each
//! phase `k`, the list of candidate rows for `s`'s *child* at phase `k`,
//! then a `P`-layer compatibility graph over those candidates, and finally
//! enumerates every `P`-tuple that is simultaneously compatible end-to-end
//! — each such tuple is a new child state.
//!
//! Phase bookkeeping: a state's `rows[k]` is the spatial row it occupies at
//! generation (phase) `k`. Extending the search one row further down means
//! choosing, for every phase `k`, a new row `rows[k]` for the child such
//! that stepping `(parent.rows[k], s.rows[k])` forward one generation
//! reproduces `s.rows[(k+1) % P]` — i.e. `s`'s already-fixed next-phase row
//! is the constraint the child's candidate rows must satisfy. Symmetrically,
//! a child candidate at phase `k` is only usable if, combined with `s`'s row
//! at phase `k-1` as upper context and `s`'s row at phase `k`, it reproduces
//! `parent(s)`'s row at phase `k+1` — this is the edge test wired in
//! [`build`]'s third pass.

use crate::arena::StateArena;
use crate::config::Symmetry;
use crate::rows::list_rows;
use crate::rule::Rule;
use tracing::debug;

/// Candidate rows for one phase. Stator agreement between adjacent phases
/// is enforced directly in [`build`]'s compatibility pass rather than by
/// grouping candidates here.
#[derive(Clone, Debug, Default)]
pub struct PhaseCandidates {
    pub rows: Vec<u32>,
}

/// The per-state graph: one candidate list per phase, plus a compatibility
/// bitmap between adjacent phases and a reachability bitmap computed by
/// backward induction from the last phase.
pub struct StateGraph {
    pub period: usize,
    pub candidates: Vec<PhaseCandidates>,
    /// `compat[k]` is a `rows[k-1 mod P].len() x rows[k].len()` bitmap,
    /// row-major, `true` when `(candidates[k-1][i], candidates[k][j])` is a
    /// consistent adjacent pair (see [`build`]'s edge test): it is the edge
    /// *into* phase `k` from its predecessor, not the edge out of it.
    pub compat: Vec<Vec<bool>>,
    /// `reach[k][i]` is `true` iff candidate `i` at phase `k` can reach a
    /// fully consistent assignment of every later phase, computed by
    /// backward induction.
    pub reach: Vec<Vec<bool>>,
}

/// Build the full per-state graph for `s`.
///
/// The root is its own parent, which is intentional rather than a special
/// case: with an all-zero root this makes `upper == mid == 0`, i.e. "empty
/// field above", the correct boundary condition for the very first
/// expansion step.
pub fn build(
    arena: &StateArena,
    s: usize,
    rule: Rule,
    width: u32,
    spark_mask: u32,
    symmetry: Symmetry,
    stator_mask: u32,
) -> StateGraph {
    let period = arena.period() as usize;
    let parent = arena.parent_of(s);

    let state = arena.get(s);
    let parent_state = arena.get(parent);

    // Step 1: per-phase candidate generation.
    //
    // upper = row_k(parent(s)), mid = row_k(s), required_next = row_{k+1}(s).
    // The enumerated `lower` becomes the child's row at phase k: it is the
    // row that, sandwiched under `s`'s own phase-k row with `parent(s)`'s
    // phase-k row above, steps `s.rows[k]` forward into `s.rows[(k+1)%P]`.
    let mut candidates = Vec::with_capacity(period);
    for k in 0..period {
        let upper = parent_state.rows[k];
        let mid = state.rows[k];
        let required_next = state.rows[(k + 1) % period];
        let rows = list_rows(upper, mid, required_next, spark_mask, symmetry, rule, width);
        debug!(phase = k, candidates = rows.len(), "graph::build candidates");
        candidates.push(PhaseCandidates { rows });
    }

    // Step 3: edge compatibility between adjacent phases.
    //
    // A child candidate `i` at phase `k-1` and candidate `j` at phase `k`
    // are compatible iff, using `s.rows[k]` as the middle context row, they
    // reproduce `parent(s)`'s already-fixed row at phase `k+1` (the same
    // transition test `s` itself had to satisfy one phase earlier, now
    // re-checked one level down the arena for the child's own candidates),
    // *and* their stator columns agree: stator cells are a still life and
    // must carry the same value at every phase, so two candidate rows for
    // the same spatial row that disagree outside the rotor can never both
    // belong to a valid child, however their rotor columns compare.
    let mut compat = Vec::with_capacity(period);
    for k in 0..period {
        let prev_k = (k + period - 1) % period;
        let next_required = parent_state.rows[(k + 1) % period];
        let mid = state.rows[k];
        let prev_rows = &candidates[prev_k].rows;
        let cur_rows = &candidates[k].rows;
        let mut layer = vec![false; prev_rows.len() * cur_rows.len()];
        for (i, &upper) in prev_rows.iter().enumerate() {
            for (j, &lower) in cur_rows.iter().enumerate() {
                let stator_matches = (upper & stator_mask) == (lower & stator_mask);
                let ok = stator_matches
                    && crate::rows::transition_ok(upper, mid, lower, next_required, spark_mask, rule, width, symmetry);
                layer[i * cur_rows.len() + j] = ok;
            }
        }
        compat.push(layer);
    }

    let reach = compute_reachability(&candidates, &compat, period);

    StateGraph {
        period,
        candidates,
        compat,
        reach,
    }
}

/// Backward induction: a candidate at phase `k` is "reaching" if some
/// compatible candidate at phase `k+1` is reaching, with phase `P-1`'s
/// reaching set seeded as "everything survives" and then pruned once the
/// wraparound edge (`P-1` -> `0`) is folded in.
fn compute_reachability(candidates: &[PhaseCandidates], compat: &[Vec<bool>], period: usize) -> Vec<Vec<bool>> {
    let mut reach: Vec<Vec<bool>> = candidates.iter().map(|c| vec![true; c.rows.len()]).collect();

    // Iterate to a fixed point: since the phase graph is cyclic, one linear
    // backward pass is not enough in general (a node only reaches the end
    // via a path that wraps around). `period` passes are always sufficient
    // because a reachability fact can propagate at most one phase per pass
    // all the way around the cycle.
    for _ in 0..period {
        let mut changed = false;
        for k in (0..period).rev() {
            let next_k = (k + 1) % period;
            let cur_len = candidates[k].rows.len();
            let next_len = candidates[next_k].rows.len();
            // compat[next_k] holds the edge *into* next_k, i.e. from k.
            let layer = &compat[next_k];
            for i in 0..cur_len {
                if !reach[k][i] {
                    continue;
                }
                let can_continue = (0..next_len).any(|j| layer[i * next_len + j] && reach[next_k][j]);
                if !can_continue && reach[k][i] {
                    reach[k][i] = false;
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }
    reach
}

/// Enumerate every `P`-tuple of candidate indices that forms a fully
/// consistent cycle around all phases, returning each as the new child's
/// `rows` vector (`candidates[k].rows[tuple[k]]` for each `k`).
///
/// This is a depth-first backtracking search guided by `reach`: a partial
/// assignment is abandoned as soon as it picks a non-reaching candidate,
/// and phase 0's choice is carried through to validate the final wraparound
/// edge back to phase 0.
#[must_use]
pub fn enumerate_children(graph: &StateGraph) -> Vec<Vec<u32>> {
    let period = graph.period;
    if period == 0 {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut chosen = vec![0usize; period];

    fn backtrack(graph: &StateGraph, k: usize, first: usize, chosen: &mut Vec<usize>, out: &mut Vec<Vec<u32>>) {
        let period = graph.period;
        if k == period {
            // Close the cycle: verify phase (P-1) -> phase 0 compatibility
            // against the candidate actually chosen for phase 0.
            let last = period - 1;
            // compat[0] holds the wraparound edge into phase 0, from `last`.
            if graph.compat[0][chosen[last] * graph.candidates[0].rows.len() + first] {
                out.push((0..period).map(|p| graph.candidates[p].rows[chosen[p]]).collect());
            }
            return;
        }
        let cur_len = graph.candidates[k].rows.len();
        for i in 0..cur_len {
            if !graph.reach[k][i] {
                continue;
            }
            if k > 0 {
                // compat[k] holds the edge into phase k, from phase k-1.
                let cur_len = graph.candidates[k].rows.len();
                let prev_choice = chosen[k - 1];
                let layer = &graph.compat[k];
                if !layer[prev_choice * cur_len + i] {
                    continue;
                }
            }
            chosen[k] = i;
            if k == 0 {
                backtrack(graph, k + 1, i, chosen, out);
            } else {
                backtrack(graph, k + 1, first, chosen, out);
            }
        }
    }

    backtrack(graph, 0, 0, &mut chosen, &mut out);
    out
}
