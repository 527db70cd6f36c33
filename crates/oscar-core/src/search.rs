// crates/oscar-core/src/search.rs

//! Search driver (component F).
//!
//! Drives the BFS loop over the state arena, dispatching each dequeued
//! state to the compatibility graph ([`crate::graph`]) and the termination
//! detector ([`crate::term`]), and runs iterative-deepening-DFS compaction
//! when the arena approaches capacity.

use crate::arena::{State, StateArena};
use crate::config::SearchConfig;
use crate::graph;
use crate::pattern::{Pattern, SearchOutcome};
use crate::rule::{tcompatible, Row, Rule, RuleTables};
use crate::term;
use anyhow::{ensure, Result};
use tracing::{debug, info};

/// Owns the arena and configuration for one search run.
pub struct Searcher {
    config: SearchConfig,
    rule: Rule,
    tables: RuleTables,
    arena: StateArena,
    unprocessed: usize,
    last_depth: usize,
    on_tick: Box<dyn FnMut() + Send>,
}

impl Searcher {
    /// Build a searcher from a validated configuration.
    pub fn new(config: SearchConfig) -> Result<Self> {
        config.validate()?;
        let rule = Rule::new(config.rule);
        ensure!(
            !tcompatible(rule, 0, 0b00010, 0),
            "rule {:#x} treats an isolated live cell in an empty field as a \
             still life, which should never hold for a CA-family rule; \
             refusing to search with it",
            rule.0
        );
        let tables = RuleTables::build(rule);
        let capacity = config.capacity.unwrap_or(StateArena::DEFAULT_CAPACITY);
        let arena = StateArena::seed(
            config.period,
            capacity,
            config.seed_rows.parent.clone(),
            config.seed_rows.grandparent.clone(),
        )?;
        Ok(Self {
            config,
            rule,
            tables,
            arena,
            unprocessed: 0,
            last_depth: 0,
            on_tick: Box::new(|| {}),
        })
    }

    /// Install the periodic "be nice" callback invoked from the hot loop.
    /// A no-op by default.
    pub fn set_tick_callback(&mut self, cb: impl FnMut() + Send + 'static) {
        self.on_tick = Box::new(cb);
    }

    /// Run the search to completion: either a printable success or an
    /// exhausted queue.
    pub fn run(&mut self) -> Result<SearchOutcome> {
        loop {
            if self.unprocessed >= self.arena.len() {
                let deepest = self.deepest_index();
                let pattern = Pattern::from_ancestry(&self.arena, deepest, self.config.width(), 0);
                return Ok(SearchOutcome::Exhausted(pattern));
            }

            if self.arena.needs_compaction() {
                self.compact()?;
                continue;
            }

            let s = self.unprocessed;
            self.unprocessed = StateArena::next_slot(self.unprocessed);
            (self.on_tick)();

            if let Some(outcome) = self.try_terminal(s)? {
                return Ok(outcome);
            }

            self.expand(s)?;
        }
    }

    /// Borrow the arena (for callers that want to inspect progress, e.g.
    /// status-line printers).
    #[must_use]
    pub fn arena(&self) -> &StateArena {
        &self.arena
    }

    /// Current unprocessed-slot index, the search's "frontier" position.
    #[must_use]
    pub fn unprocessed(&self) -> usize {
        self.unprocessed
    }

    /// Reconstruct the deepest line reached so far, by walking parent links
    /// from the slot immediately before the frontier. Every fatal error path
    /// calls this to print alongside its diagnostic, so a crash still shows
    /// how far the search got.
    #[must_use]
    pub fn deepest_pattern(&self) -> Pattern {
        let deepest = self.deepest_index();
        Pattern::from_ancestry(&self.arena, deepest, self.config.width(), 0)
    }

    fn expand(&mut self, s: usize) -> Result<()> {
        let spark_mask = self.spark_mask_for(s);
        let graph = graph::build(
            &self.arena,
            s,
            self.rule,
            self.config.width(),
            spark_mask,
            self.config.symmetry,
            self.config.stator_mask(),
        );
        let children = graph::enumerate_children(&graph);
        debug!(s, children = children.len(), "expand");
        for rows in children {
            self.arena.enqueue(s, rows)?;
        }
        Ok(())
    }

    fn try_terminal(&self, s: usize) -> Result<Option<SearchOutcome>> {
        if let Some((symmetry, _offset)) = term::detect_row_symmetric_wrap(&self.arena, s, self.config.allow_row_sym) {
            let rows = self.ancestry_phase0_rows(s);
            if term::is_nontrivial(&rows) {
                let mut pattern = Pattern::from_ancestry(&self.arena, s, self.config.width(), 0);
                pattern.append_symmetry_mirror(symmetry);
                info!(s, ?symmetry, "terminal via row-symmetric wrap");
                return Ok(Some(SearchOutcome::Success(pattern)));
            }
        }

        if term::complete_stator(&self.arena, s, self.rule, &self.tables, self.config.zero_lot_line).is_some() {
            let rows = self.ancestry_phase0_rows(s);
            if term::is_nontrivial(&rows) {
                let mut pattern = Pattern::from_ancestry(&self.arena, s, self.config.width(), 0);
                let extra = term::best_asymmetric_completion(self.config.width());
                pattern.append_stator_columns(&extra);
                info!(s, "terminal via stator completion");
                return Ok(Some(SearchOutcome::Success(pattern)));
            }
        }

        Ok(None)
    }

    fn ancestry_phase0_rows(&self, s: usize) -> Vec<Row> {
        let mut rows = Vec::new();
        let mut cur = s;
        loop {
            rows.push(self.arena.get(cur).rows[0]);
            let parent = self.arena.parent_of(cur);
            if parent == cur {
                break;
            }
            cur = parent;
        }
        rows
    }

    /// Spark relaxation mask for `s`: only the very first row (depth 0) is
    /// ever relaxed, for the pattern's leading edge; deeper rows are fully
    /// determined.
    fn spark_mask_for(&self, s: usize) -> u32 {
        if self.arena.depth(s) != 0 {
            return 0;
        }
        match self.config.spark_level.level() {
            0 => 0,
            1 => 0b1,
            _ => 0b11,
        }
    }

    fn deepest_index(&self) -> usize {
        self.unprocessed.saturating_sub(1).min(self.arena.len().saturating_sub(1))
    }

    /// Iterative-deepening-DFS compaction.
    fn compact(&mut self) -> Result<()> {
        let frontier_depth = self.arena.depth(self.unprocessed);
        self.last_depth = self.last_depth.max(frontier_depth) + 1;

        info!(
            "Queue full, depth = {}, deepening {}, {}/{} -> {}/{}\n{}",
            frontier_depth,
            self.last_depth - frontier_depth,
            self.arena.len(),
            self.arena.capacity(),
            self.arena.len(),
            self.arena.capacity(),
            self.deepest_pattern().render(),
        );

        if self.config.max_deepen > 0 && (self.last_depth - frontier_depth) as u32 > self.config.max_deepen {
            self.contract_rotor();
            self.last_depth = frontier_depth + 1;
        }
        let target_depth = self.last_depth - frontier_depth;

        let mut alive = vec![false; self.arena.len()];
        alive[0] = true;

        for s in self.unprocessed..self.arena.len() {
            let mut scratch = self.arena.clone();
            scratch.set_hashing_enabled(false);
            if self.dfs_reaches_depth(&mut scratch, s, target_depth)? {
                let mut cur = s;
                loop {
                    alive[cur] = true;
                    let parent = self.arena.parent_of(cur);
                    if parent == cur {
                        break;
                    }
                    cur = parent;
                }
            }
        }

        info!(
            target_depth,
            kept = alive.iter().filter(|&&a| a).count(),
            total = alive.len(),
            "compaction"
        );
        self.rebuild_arena(&alive)
    }

    fn dfs_reaches_depth(&self, scratch: &mut StateArena, s: usize, remaining: usize) -> Result<bool> {
        if remaining == 0 {
            return Ok(true);
        }
        let spark_mask = self.spark_mask_for(s);
        let graph = graph::build(
            scratch,
            s,
            self.rule,
            self.config.width(),
            spark_mask,
            self.config.symmetry,
            self.config.stator_mask(),
        );
        let children = graph::enumerate_children(&graph);
        for rows in children {
            if let Some(child) = scratch.enqueue(s, rows)? {
                if self.dfs_reaches_depth(scratch, child, remaining - 1)? {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn contract_rotor(&mut self) {
        if self.config.rotor_width == 0 {
            return;
        }
        self.config.rotor_width -= 1;
        self.config.right_stator_width += 1;
        if self.config.left_stator_width > 0 && self.config.rotor_width > 0 {
            self.config.left_stator_width += 1;
        }
    }

    fn rebuild_arena(&mut self, alive: &[bool]) -> Result<()> {
        let mut new_index = vec![None; alive.len()];
        let mut next = 0usize;
        for (old, &is_alive) in alive.iter().enumerate() {
            if is_alive {
                new_index[old] = Some(next);
                next += 1;
            }
        }

        let mut new_states = Vec::with_capacity(next);
        for (old, &is_alive) in alive.iter().enumerate() {
            if !is_alive {
                continue;
            }
            let state = self.arena.get(old).clone();
            let old_parent = self.arena.parent_of(old);
            let new_parent = new_index[old_parent].expect("parent of a live state must itself be live");
            new_states.push(State {
                parent: new_parent,
                rows: state.rows,
            });
        }

        let old_unprocessed = self.unprocessed;
        self.unprocessed = (old_unprocessed..alive.len())
            .find(|&i| alive[i])
            .and_then(|i| new_index[i])
            .unwrap_or(new_states.len());

        self.arena.replace_states(new_states)
    }
}
