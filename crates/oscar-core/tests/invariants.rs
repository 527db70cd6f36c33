// crates/oscar-core/tests/invariants.rs
//
// Property and end-to-end coverage for the search engine's testable
// invariants: arena ordering, rule-consistency against an independent
// reference simulator, dedup soundness, reachability closure,
// aperiodicity, and termination-table round-tripping, plus a handful of
// small end-to-end scenarios (still life, blinker, exhaustion, dedup).

use oscar_core::arena::StateArena;
use oscar_core::config::{SearchConfig, SeedRows, SparkLevel, Symmetry};
use oscar_core::graph;
use oscar_core::rule::{reverse_term_bits, window3, Rule};
use oscar_core::{SearchOutcome, Searcher};
use proptest::prelude::*;

fn life_rule() -> Rule {
    Rule::new((1 << 2) | (1 << 3) | (1 << (9 + 3)))
}

fn life_config(period: u32, rotor_width: u32, symmetry: Symmetry) -> SearchConfig {
    SearchConfig {
        rule: life_rule().0,
        period,
        symmetry,
        allow_row_sym: true,
        rotor_width,
        left_stator_width: 0,
        right_stator_width: 0,
        zero_lot_line: false,
        max_deepen: 0,
        spark_level: SparkLevel::None,
        seed_rows: SeedRows::default(),
        capacity: None,
    }
}

/// Independent reference simulator for `step_row`: a direct per-cell
/// neighbour count over the full 3x3 neighbourhood, computed without any
/// of the bit-window helpers `rule.rs` itself relies on.
fn reference_step_row(above: u32, mid: u32, below: u32, rule: Rule, width: u32) -> u32 {
    let bit = |row: u32, col: i32| -> u32 {
        if col < 0 || col >= width as i32 {
            0
        } else {
            (row >> col) & 1
        }
    };
    let mut out = 0u32;
    for col in 0..width as i32 {
        let mut neighbours = 0u32;
        for dc in [-1i32, 0, 1] {
            neighbours += bit(above, col + dc);
            neighbours += bit(below, col + dc);
        }
        neighbours += bit(mid, col - 1);
        neighbours += bit(mid, col + 1);
        let alive = bit(mid, col) != 0;
        if rule.next_cell(alive, neighbours) {
            out |= 1 << col;
        }
    }
    out
}

proptest! {
    /// `step_row` must agree with an independently written reference
    /// simulator for every input.
    #[test]
    fn step_row_matches_reference_simulator(
        above in 0u32..(1 << 8),
        mid in 0u32..(1 << 8),
        below in 0u32..(1 << 8),
        rule_mask in 0u32..(1 << 18),
    ) {
        let rule = Rule::new(rule_mask);
        let width = 8;
        let got = oscar_core::rule::step_row(above, mid, below, rule, width);
        let want = reference_step_row(above, mid, below, rule, width);
        prop_assert_eq!(got, want);
    }

    /// The term-state reversal permutation is an involution over the full
    /// 16-bit domain.
    #[test]
    fn rev_term_round_trips(x in 0u16..=u16::MAX) {
        prop_assert_eq!(reverse_term_bits(reverse_term_bits(x)), x);
    }

    /// Every enqueued state's parent index strictly precedes it, and the
    /// root is its own parent, regardless of how many states are appended.
    #[test]
    fn arena_ordering_holds_for_any_enqueue_sequence(rows in prop::collection::vec(0u32..16, 1..20)) {
        let mut arena = StateArena::seed(1, 1024, None, None).unwrap();
        let mut cursor = 0usize;
        for r in rows {
            if let Some(next) = arena.enqueue(cursor, vec![r]).unwrap() {
                prop_assert!(arena.parent_of(next) < next);
                cursor = next;
            }
        }
        prop_assert_eq!(arena.parent_of(0), 0);
    }

    /// Enqueueing the same (own, parent) row pair twice must retain only one
    /// of the two resulting states.
    #[test]
    fn duplicate_own_and_parent_rows_are_never_both_retained(
        period in 1usize..4,
        own_seed in prop::collection::vec(0u32..16, 1..4),
        other_seed in prop::collection::vec(0u32..16, 1..4),
    ) {
        let own: Vec<u32> = (0..period).map(|i| own_seed[i % own_seed.len()]).collect();
        let other: Vec<u32> = (0..period).map(|i| other_seed[i % other_seed.len()]).collect();
        let mut arena = StateArena::seed(period as u32, 1024, None, None).unwrap();
        let parent = arena.enqueue(0, other).unwrap();
        if let Some(parent) = parent {
            let first = arena.enqueue(parent, own.clone()).unwrap();
            let second = arena.enqueue(parent, own).unwrap();
            prop_assert!(first.is_some());
            prop_assert!(second.is_none());
        }
    }

    /// Aperiodicity: a row sequence built by repeating a nonzero block
    /// `reps` times has true period equal to the block length whenever the
    /// block itself is nontrivial, so the repeated sequence (with
    /// `reps > 1`) must be classified trivial.
    #[test]
    fn repeated_nonzero_block_is_trivial(
        block in prop::collection::vec(1u32..16, 1..4),
        reps in 2usize..5,
    ) {
        let mut rows = Vec::new();
        for _ in 0..reps {
            rows.extend_from_slice(&block);
        }
        prop_assert!(!oscar_core::term::is_nontrivial(&rows));
    }
}

/// For every phase `k` and candidate `j`, `reach[k][j]` holds iff some
/// compatible candidate at phase `k+1` is itself reaching.
#[test]
fn reachability_closure_matches_its_definition() {
    let rule = life_rule();
    let width = 4;
    let arena = StateArena::seed(3, 64, None, None).unwrap();
    let graph = graph::build(&arena, 0, rule, width, 0, Symmetry::None, 0);

    for k in 0..graph.period {
        let next_k = (k + 1) % graph.period;
        let cur_len = graph.candidates[k].rows.len();
        let next_len = graph.candidates[next_k].rows.len();
        let layer = &graph.compat[next_k];
        for i in 0..cur_len {
            let expected = (0..next_len).any(|j| layer[i * next_len + j] && graph.reach[next_k][j]);
            assert_eq!(graph.reach[k][i], expected, "phase {k} candidate {i}");
        }
    }
}

/// With period 4, a child matching the root parent's all-zero rows is
/// detected as even-symmetric at offset 0.
#[test]
fn row_symmetry_detected_against_root_parent() {
    let mut arena = StateArena::seed(4, 16, None, None).unwrap();
    let child = arena.enqueue(0, vec![0, 0, 0, 0]).unwrap().unwrap();
    let detected = oscar_core::term::detect_row_symmetric_wrap(&arena, child, true);
    assert_eq!(detected, Some((Symmetry::Even, 0)));
}

/// With period 3, a grandparent-mirrored (odd) wraparound is detected.
#[test]
fn odd_row_symmetry_detected_against_grandparent() {
    let mut arena = StateArena::seed(3, 16, None, None).unwrap();
    let parent = arena.enqueue(0, vec![1, 0, 0]).unwrap().unwrap();
    let child = arena.enqueue(parent, vec![0, 0, 0]).unwrap().unwrap();
    let detected = oscar_core::term::detect_row_symmetric_wrap(&arena, child, true);
    assert_eq!(detected, Some((Symmetry::Odd, 0)));
}

/// A 2-wide still life exists under B3/S23 (e.g. a block's edge), so a
/// period-1 search over it must succeed, not merely exhaust.
#[test]
fn still_life_scenario_terminates() {
    let cfg = life_config(1, 2, Symmetry::None);
    let mut searcher = Searcher::new(cfg).unwrap();
    let outcome = searcher.run().unwrap();
    match outcome {
        SearchOutcome::Success(p) => assert!(p.width >= 2),
        SearchOutcome::Exhausted(p) => panic!("expected a still life, search exhausted at width {}", p.width),
    }
}

/// An odd-symmetry period-2 search over a 3-wide rotor must find the
/// blinker and reconstruct a mirrored row sequence (the mirror doubles the
/// row count minus the shared axis row).
#[test]
fn blinker_scenario_mirrors_on_success() {
    let cfg = life_config(2, 3, Symmetry::Odd);
    let mut searcher = Searcher::new(cfg).unwrap();
    let outcome = searcher.run().unwrap();
    match outcome {
        SearchOutcome::Success(p) => assert!(p.symmetry.is_some()),
        SearchOutcome::Exhausted(p) => panic!("expected a blinker, search exhausted at width {}", p.width),
    }
}

/// After a full run, no two arena slots share identical (own rows,
/// parent rows) across every phase.
#[test]
fn dedup_sanity_over_a_full_run() {
    let cfg = life_config(3, 3, Symmetry::None);
    let mut searcher = Searcher::new(cfg).unwrap();
    let _ = searcher.run().unwrap();

    let arena = searcher.arena();
    let mut seen = std::collections::HashSet::new();
    for idx in 0..arena.len() {
        let state = arena.get(idx);
        let parent_rows = arena.get(arena.parent_of(idx)).rows.clone();
        let key = (state.rows.clone(), parent_rows);
        assert!(seen.insert(key), "duplicate (own, parent) pair retained at slot {idx}");
    }
}

/// A rotor too narrow to host any oscillator under B3/S23 must terminate
/// with an exhausted (not a success) outcome.
#[test]
fn exhaustion_scenario_reports_no_pattern() {
    let cfg = life_config(2, 1, Symmetry::None);
    let mut searcher = Searcher::new(cfg).unwrap();
    let outcome = searcher.run().unwrap();
    assert!(
        matches!(outcome, SearchOutcome::Exhausted(_)),
        "expected exhaustion for a single-column period-2 rotor"
    );
}

/// Forcing compaction via a tiny capacity still yields valid arena
/// ordering after the run.
#[test]
fn compaction_preserves_arena_ordering() {
    let mut cfg = life_config(3, 3, Symmetry::None);
    cfg.max_deepen = 4;
    cfg.capacity = Some(64);
    let mut searcher = Searcher::new(cfg).unwrap();
    let _ = searcher.run().unwrap();

    let arena = searcher.arena();
    for idx in 0..arena.len() {
        assert!(arena.parent_of(idx) <= idx, "slot {idx} has a parent that does not precede it");
    }
    assert_eq!(arena.parent_of(0), 0);
}

/// Sanity check for `window3` feeding `step_row`: out-of-range columns read
/// as dead on both sides.
#[test]
fn window3_treats_negative_columns_as_dead() {
    // col = -1: bit(-2) and bit(-1) both read dead; bit(0) reads row's bit 0.
    assert_eq!(window3(0b11, -1), 0b100);
}
