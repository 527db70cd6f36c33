// crates/oscar-core/src/pattern.rs

//! Printable pattern record and ASCII rendering. This module only builds
//! the row data a caller needs and offers a reference renderer `oscar-cli`
//! reuses directly.

use crate::arena::StateArena;
use crate::config::Symmetry;
use crate::rule::Row;

/// One reconstructed pattern: the rows of every ancestor from deepest to
/// root, using a single chosen generation's bitmap as each ancestor's
/// printed row (phase 0 by convention — any ancestor's row is equally
/// representative once the oscillator has been found, since the pattern is
/// printed at one instant in its cycle).
#[derive(Clone, Debug)]
pub struct Pattern {
    pub width: u32,
    /// Rows, deepest ancestor first, root last.
    pub rows: Vec<Row>,
    /// Row-symmetric wrap completion detected for this pattern, if any.
    pub symmetry: Option<(Symmetry, u32)>,
}

impl Pattern {
    /// Walk `s`'s ancestry back to the root, collecting `printed_phase`'s
    /// row from each ancestor in deepest-first order.
    #[must_use]
    pub fn from_ancestry(arena: &StateArena, s: usize, width: u32, printed_phase: usize) -> Self {
        let mut rows = Vec::new();
        let mut cur = s;
        loop {
            rows.push(arena.get(cur).rows[printed_phase]);
            let parent = arena.parent_of(cur);
            if parent == cur {
                break;
            }
            cur = parent;
        }
        Self {
            width,
            rows,
            symmetry: None,
        }
    }

    /// Append the mirrored rows implied by a detected row-symmetric wrap.
    pub fn append_symmetry_mirror(&mut self, symmetry: Symmetry) {
        self.symmetry = Some((symmetry, 0));
        let mirrored: Vec<Row> = match symmetry {
            Symmetry::Even => self.rows.iter().rev().copied().collect(),
            Symmetry::Odd => self.rows.iter().rev().skip(1).copied().collect(),
            Symmetry::None => Vec::new(),
        };
        self.rows.extend(mirrored);
    }

    /// Append resolved stator columns (widening every row) from an
    /// asymmetric termination. `extra_cols` holds one bit per row to append,
    /// indexed in the same deepest-first order as `self.rows`.
    pub fn append_stator_columns(&mut self, extra_cols: &[Row]) {
        for (row, &bit) in self.rows.iter_mut().zip(extra_cols.iter()) {
            *row |= (bit & 1) << self.width;
        }
        self.width += 1;
    }

    /// Render as a blank line, then one line per row, `.` for dead and `o`
    /// for live, left to right.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push('\n');
        for row in &self.rows {
            for col in 0..self.width {
                out.push(if (row >> col) & 1 != 0 { 'o' } else { '.' });
            }
            out.push('\n');
        }
        out
    }
}

/// Result of a completed search.
pub enum SearchOutcome {
    /// A terminal, nontrivial pattern was found and printed.
    Success(Pattern),
    /// The queue was exhausted with no pattern found; carries the deepest
    /// partial pattern reached, for the give-up message.
    Exhausted(Pattern),
}

impl SearchOutcome {
    /// Render the outcome: the pattern itself, or a give-up message
    /// followed by the deepest partial pattern reached.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Success(p) => p.render(),
            Self::Exhausted(p) => format!("No patterns found\n{}", p.render()),
        }
    }
}
