// crates/oscar-core/src/rows.rs

//! Row-extension enumerator (component B).
//!
//! `list_rows` is the search's only source of new candidate rows: given
//! two known context rows and the value they must (eventually) produce, it
//! enumerates every width-`W` row consistent with that requirement, the
//! configured symmetry, and the spark mask.

use crate::config::Symmetry;
use crate::rule::{Row, Rule};
use tracing::trace;

/// Shared append-only arena for candidate rows emitted by [`list_rows`].
///
/// A single global arena that all row-list construction appends into;
/// overflow is fatal. This is a `Vec`-backed arena with an explicit
/// capacity check rather than letting the allocator grow it unboundedly,
/// so a runaway enumeration fails with a capacity cap instead of
/// unbounded memory growth.
#[derive(Debug)]
pub struct RowArena {
    rows: Vec<Row>,
    capacity: usize,
}

impl RowArena {
    /// Default capacity.
    pub const DEFAULT_CAPACITY: usize = 1 << 20;

    /// Construct an empty arena with the given capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rows: Vec::with_capacity(capacity.min(1 << 16)),
            capacity,
        }
    }

    /// Number of rows currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the arena holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a batch of rows, starting a new segment.
    ///
    /// Returns the segment as `(first_index, len)`. Fatal if the arena
    /// would overflow.
    pub fn push_segment(&mut self, rows: impl IntoIterator<Item = Row>) -> anyhow::Result<(usize, usize)> {
        let first = self.rows.len();
        for r in rows {
            anyhow::ensure!(
                self.rows.len() < self.capacity,
                "row arena capacity exceeded ({} rows)",
                self.capacity
            );
            self.rows.push(r);
        }
        Ok((first, self.rows.len() - first))
    }

    /// Rows of a previously-returned segment.
    #[must_use]
    pub fn segment(&self, first: usize, len: usize) -> &[Row] {
        &self.rows[first..first + len]
    }

    /// Clear all rows (used between successive row-list constructions,
    /// since row lists are regenerated on every state expansion and do
    /// not need to persist).
    pub fn clear(&mut self) {
        self.rows.clear();
    }
}

/// Checks whether `lower`, sandwiched between `upper` and `mid` (all three
/// spatially stacked at the same generation, `lower` playing the role of
/// the row below `mid`), reproduces `required_next` as `mid`'s value one
/// generation later — at every column not relaxed by `spark_mask`.
///
/// This is the core "does this extension work" primitive behind row
/// enumeration: rather than threading a running accumulator bit-by-bit
/// through a precomputed table, it recomputes the local neighbourhood
/// directly at each column, which is the same arithmetic with clearer
/// control flow.
#[must_use]
pub fn transition_ok(
    upper: Row,
    mid: Row,
    lower: Row,
    required_next: Row,
    spark_mask: Row,
    rule: Rule,
    width: u32,
    symmetry: Symmetry,
) -> bool {
    let mask = if width == 32 { u32::MAX } else { (1u32 << width) - 1 };
    let check_mask = mask & !spark_mask;
    for col in 0..width {
        if (check_mask >> col) & 1 == 0 {
            continue;
        }
        if !check_column(upper, mid, lower, required_next, col, rule, symmetry) {
            return false;
        }
    }
    true
}

/// The virtual column just left of column 0, under the configured boundary
/// symmetry.
///
/// The rotor/stator field `[0, width)` sits to the right of the symmetry
/// axis: `None` treats everything left of it as permanently dead, matching
/// [`crate::rule::window3`]'s own out-of-range convention. `Even` places the
/// axis between columns -1 and 0, so column -1 is column 0's own mirror
/// partner (`row & 1`). `Odd` places the axis through column 0 itself (a
/// self-paired fixed point), so column 1 is the one that mirrors into
/// column -1 (`(row >> 1) & 1`).
#[inline]
fn axis_bit(row: Row, symmetry: Symmetry) -> u32 {
    match symmetry {
        Symmetry::None => 0,
        Symmetry::Even => row & 1,
        Symmetry::Odd => (row >> 1) & 1,
    }
}

/// Enumerate every width-`width` row `lower` such that
/// `transition_ok(upper, mid, lower, required_next, spark_mask, rule, width,
/// symmetry)` holds.
///
/// Complexity is proportional to the number of free (spark-relaxed)
/// columns: with `spark_mask == 0` there is at most one valid `lower` per
/// `(upper, mid, required_next)` triple (the transition fully determines
/// it), and relaxed columns each double the branching factor.
pub fn list_rows(
    upper: Row,
    mid: Row,
    required_next: Row,
    spark_mask: Row,
    symmetry: Symmetry,
    rule: Rule,
    width: u32,
) -> Vec<Row> {
    trace!(upper, mid, required_next, spark_mask, width, "list_rows");
    let mask = if width == 32 { u32::MAX } else { (1u32 << width) - 1 };
    let free_bits: Vec<u32> = (0..width).filter(|&c| (spark_mask >> c) & 1 != 0).collect();

    let mut out = Vec::new();
    let combos = 1u32 << free_bits.len();
    for combo in 0..combos {
        let mut candidate = 0u32;
        for (i, &bit) in free_bits.iter().enumerate() {
            if (combo >> i) & 1 != 0 {
                candidate |= 1 << bit;
            }
        }
        // Forced columns: take the value that makes the fixed columns of
        // `required_next` exactly reproduce under the rule. We search over
        // the 2^W space only implicitly, by solving column-by-column via
        // direct trial: since `step_row`'s neighbour count at each column
        // depends on `lower`'s own neighbouring columns too, forced bits
        // aren't independent; we therefore still need to search the space
        // of the non-free columns, but can prune early per column using
        // the running partial row. A direct 2^(width) scan would be too
        // slow for width=32; instead we solve greedily left-to-right,
        // which is valid because `step_row`'s window only looks one
        // column either side, so fixing columns in order lets each new
        // column be chosen independently of columns more than one away.
        if let Some(full) = solve_forced_columns(upper, mid, required_next, spark_mask, candidate, rule, width, symmetry)
        {
            out.push(full & mask);
        }
    }
    out
}

/// Fill in the non-spark columns of a candidate `lower` row so that
/// `step_row(upper, mid, lower)` matches `required_next` everywhere outside
/// `spark_mask`. `seed` supplies the spark-relaxed columns; all other bits
/// of `seed` are ignored.
///
/// Each column of `step_row`'s output depends on `lower`'s own columns
/// `{c-1, c, c+1}`, so fixing column `c` greedily left-to-right is unsound:
/// its correctness can depend on column `c+1`, which a left-to-right sweep
/// has not chosen yet. This instead backtracks, deferring each column's
/// check until its right neighbour is known (see [`try_column`]), trying
/// both bit values and undoing a choice whenever every continuation from it
/// fails. If no assignment works we report no extension, the correct
/// "no such row" answer.
fn solve_forced_columns(
    upper: Row,
    mid: Row,
    required_next: Row,
    spark_mask: Row,
    seed: Row,
    rule: Rule,
    width: u32,
    symmetry: Symmetry,
) -> Option<Row> {
    let mut lower = seed & spark_mask;
    if try_column(upper, mid, required_next, spark_mask, rule, symmetry, width, 0, &mut lower) {
        Some(lower)
    } else {
        None
    }
}

/// Recursively assigns `lower`'s bit at `col` and every column after it,
/// backtracking on contradiction.
///
/// Column `c`'s check needs columns `{c-1, c, c+1}`, so it is performed
/// right after column `c+1` is chosen (by which point all three are
/// settled), never against a column that is still implicitly zero. The
/// last column's check has no `c+1` to wait for and is folded into the
/// base case instead. Spark (free) columns are assigned but never checked
/// against `required_next`, matching their role as relaxed boundary cells.
fn try_column(
    upper: Row,
    mid: Row,
    required_next: Row,
    spark_mask: Row,
    rule: Rule,
    symmetry: Symmetry,
    width: u32,
    col: u32,
    lower: &mut Row,
) -> bool {
    if col == width {
        return is_spark(spark_mask, width - 1)
            || check_column(upper, mid, *lower, required_next, width - 1, rule, symmetry);
    }
    let choices: &[u32] = if is_spark(spark_mask, col) { &[(*lower >> col) & 1] } else { &[0, 1] };
    for &bit in choices {
        *lower = (*lower & !(1 << col)) | (bit << col);
        let prior_ok = col == 0
            || is_spark(spark_mask, col - 1)
            || check_column(upper, mid, *lower, required_next, col - 1, rule, symmetry);
        if prior_ok && try_column(upper, mid, required_next, spark_mask, rule, symmetry, width, col + 1, lower) {
            return true;
        }
    }
    false
}

#[inline]
fn is_spark(spark_mask: Row, col: u32) -> bool {
    (spark_mask >> col) & 1 != 0
}

/// Whether `lower`'s bit at `col` (fully resolved up to `col + 1`) matches
/// the required output at `col`.
fn check_column(upper: Row, mid: Row, lower: Row, required_next: Row, col: u32, rule: Rule, symmetry: Symmetry) -> bool {
    let got = cell_next(upper, mid, lower, col, rule, symmetry);
    let want = (required_next >> col) & 1;
    got == want
}

/// `step_row`'s output bit at a single column, without materialising the
/// whole row. At column 0, the otherwise-dead virtual neighbour column is
/// replaced by [`axis_bit`]'s symmetry-aware reading of each of the three
/// rows involved.
fn cell_next(upper: Row, mid: Row, lower: Row, col: u32, rule: Rule, symmetry: Symmetry) -> u32 {
    let signed_col = col as i32;
    let mut a = crate::rule::window3(upper, signed_col).count_ones();
    let mut b = crate::rule::window3(lower, signed_col).count_ones();
    let mut left = if col == 0 { 0 } else { (mid >> (col - 1)) & 1 };
    if col == 0 {
        a += axis_bit(upper, symmetry);
        b += axis_bit(lower, symmetry);
        left = axis_bit(mid, symmetry);
    }
    let right = (mid >> (col + 1)) & 1;
    let neighbours = a + b + left + right;
    let alive = (mid >> col) & 1 != 0;
    u32::from(rule.next_cell(alive, neighbours))
}
