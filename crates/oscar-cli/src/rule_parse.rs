// crates/oscar-cli/src/rule_parse.rs

//! Textual `Bxxx/Syyy` rule notation, e.g. `B3/S23` for Conway's Life.
//!
//! Lives here rather than in the core crate: it's a UI-facing text format,
//! not part of the rule's internal representation.

use anyhow::{ensure, Context, Result};

/// Parse `Bxxx/Syyy` (case-insensitive, digits 0-8, either half optionally
/// empty) into the 18-bit rule mask the core expects.
pub fn parse_rule_text(text: &str) -> Result<u32> {
    let text = text.trim();
    let (b_part, s_part) = text
        .split_once('/')
        .with_context(|| format!("rule {text:?} must be of the form Bxxx/Syyy"))?;

    let b_digits = b_part
        .strip_prefix(['B', 'b'])
        .with_context(|| format!("rule {text:?}: birth half must start with B"))?;
    let s_digits = s_part
        .strip_prefix(['S', 's'])
        .with_context(|| format!("rule {text:?}: survival half must start with S"))?;

    let mut mask = 0u32;
    for c in b_digits.chars() {
        let n = c.to_digit(10).with_context(|| format!("invalid birth digit '{c}' in {text:?}"))?;
        ensure!(n <= 8, "birth count {n} out of range 0..=8 in {text:?}");
        mask |= 1 << (9 + n);
    }
    for c in s_digits.chars() {
        let n = c.to_digit(10).with_context(|| format!("invalid survival digit '{c}' in {text:?}"))?;
        ensure!(n <= 8, "survival count {n} out of range 0..=8 in {text:?}");
        mask |= 1 << n;
    }
    Ok(mask)
}
