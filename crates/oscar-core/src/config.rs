// crates/oscar-core/src/config.rs

//! Configuration record consumed by the search engine.
//!
//! This is produced by whatever sits outside the core (a CLI flag parser,
//! a config file, an interactive prompt) and is assumed valid by the time
//! it reaches [`crate::search::Searcher`]: range checks happen once, here,
//! via [`SearchConfig::validate`].

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

/// Row symmetry constraint applied while seeding and completing a pattern.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Symmetry {
    /// No symmetry assumed.
    #[default]
    None,
    /// Odd (point) reflection about the left edge.
    Odd,
    /// Even reflection about the left edge.
    Even,
}

/// How aggressively the enumerator treats boundary cells as sparks (cells
/// that may be either live or dead, searched both ways).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SparkLevel {
    /// No spark relaxation.
    #[default]
    None,
    /// Relax the leftmost column only.
    Edge,
    /// Relax the two leftmost columns.
    Wide,
}

impl SparkLevel {
    /// Numeric level in `0..=2`.
    #[must_use]
    pub const fn level(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Edge => 1,
            Self::Wide => 2,
        }
    }
}

/// Up to two user-supplied history rows seeded as ancestors of the arena root.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedRows {
    /// Rows for the state immediately above the root (closest ancestor), if any.
    pub parent: Option<Vec<u32>>,
    /// Rows for the state above that one (grandparent of the root), if any.
    pub grandparent: Option<Vec<u32>>,
}

/// Fully-populated search configuration.
///
/// Construction from CLI flags happens in `oscar-cli`; this type itself
/// only knows how to validate itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// 18-bit rule mask: bits 0..=8 are survival counts, bits 9..=17 are birth counts.
    pub rule: u32,
    /// Oscillator period, in `1..=19`.
    pub period: u32,
    /// Row symmetry assumed while seeding/completing.
    pub symmetry: Symmetry,
    /// Whether row-symmetric wrap completion is attempted.
    pub allow_row_sym: bool,
    /// Width of the oscillating (rotor) region, in `1..=32`.
    pub rotor_width: u32,
    /// Width of the still-life stator on the left.
    pub left_stator_width: u32,
    /// Width of the still-life stator on the right.
    pub right_stator_width: u32,
    /// Whether stator rows may exceed the configured width during completion.
    pub zero_lot_line: bool,
    /// Deepening budget for compaction's bounded DFS; `0` means unlimited.
    pub max_deepen: u32,
    /// Spark relaxation level.
    pub spark_level: SparkLevel,
    /// Optional seed history rows.
    pub seed_rows: SeedRows,
    /// Arena capacity override, mainly for forcing compaction in tests;
    /// defaults to [`crate::arena::StateArena::DEFAULT_CAPACITY`] when absent.
    #[serde(default)]
    pub capacity: Option<usize>,
}

impl SearchConfig {
    /// Total pattern width (rotor + both stators).
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.rotor_width + self.left_stator_width + self.right_stator_width
    }

    /// Stator mask: set bits mark stator columns, clear bits mark the rotor.
    #[must_use]
    pub const fn stator_mask(&self) -> u32 {
        let right_bits = ((1u32 << self.right_stator_width) - 1)
            << (self.rotor_width + self.left_stator_width);
        let left_bits = (1u32 << self.left_stator_width) - 1;
        right_bits | left_bits
    }

    /// Validate every range invariant. Out-of-range parameters are a
    /// configuration rejection, expected to be caught at the UI boundary;
    /// this is the one place the core still checks them, so a config built
    /// programmatically (e.g. by a property test) can't silently violate
    /// the core's assumptions.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.rule < (1 << 18),
            "rule must fit in 18 bits, got {:#x}",
            self.rule
        );
        ensure!(
            (1..=19).contains(&self.period),
            "period must be in 1..=19, got {}",
            self.period
        );
        ensure!(
            (1..=32).contains(&self.rotor_width),
            "rotorWidth must be in 1..=32, got {}",
            self.rotor_width
        );
        ensure!(
            self.width() <= 32,
            "total width (rotor {} + left stator {} + right stator {}) exceeds 32",
            self.rotor_width,
            self.left_stator_width,
            self.right_stator_width
        );
        if let Some(rows) = &self.seed_rows.parent {
            ensure!(
                rows.len() as u32 == self.period,
                "seed_rows.parent must supply exactly {} rows, got {}",
                self.period,
                rows.len()
            );
        }
        if let Some(rows) = &self.seed_rows.grandparent {
            ensure!(
                rows.len() as u32 == self.period,
                "seed_rows.grandparent must supply exactly {} rows, got {}",
                self.period,
                rows.len()
            );
        }
        Ok(())
    }

    /// Survival bit for `n` live neighbours (`n` in `0..=8`).
    #[must_use]
    pub const fn survives(&self, n: u32) -> bool {
        (self.rule >> n) & 1 != 0
    }

    /// Birth bit for `n` live neighbours (`n` in `0..=8`).
    #[must_use]
    pub const fn births(&self, n: u32) -> bool {
        (self.rule >> (9 + n)) & 1 != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn life_config() -> SearchConfig {
        // B3/S23 = bits 2,3 set for survival, bit 3 (n=3) set for birth.
        let rule = (1 << 2) | (1 << 3) | (1 << (9 + 3));
        SearchConfig {
            rule,
            period: 2,
            symmetry: Symmetry::None,
            allow_row_sym: true,
            rotor_width: 3,
            left_stator_width: 0,
            right_stator_width: 0,
            zero_lot_line: false,
            max_deepen: 0,
            spark_level: SparkLevel::None,
            seed_rows: SeedRows::default(),
            capacity: None,
        }
    }

    #[test]
    fn life_rule_bits_decode_correctly() {
        let cfg = life_config();
        assert!(cfg.survives(2));
        assert!(cfg.survives(3));
        assert!(!cfg.survives(4));
        assert!(cfg.births(3));
        assert!(!cfg.births(2));
    }

    #[test]
    fn width_and_stator_mask_are_consistent() {
        let mut cfg = life_config();
        cfg.left_stator_width = 1;
        cfg.right_stator_width = 2;
        assert_eq!(cfg.width(), 6);
        // rotor occupies bits 1..=3, left stator bit 0, right stator bits 4..=5.
        assert_eq!(cfg.stator_mask(), 0b11_0001);
    }

    #[test]
    fn validate_rejects_oversized_width() {
        let mut cfg = life_config();
        cfg.rotor_width = 32;
        cfg.left_stator_width = 1;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_accepts_well_formed_config() {
        assert!(life_config().validate().is_ok());
    }
}
