//! Dice Expressions
//!
//! Parses dice notation (`2d6`, `9d10 + 9`, `1d4 − 1`) and validates roll
//! formulas before they are stored on a record. Invalid formulas are never
//! propagated: callers fall back to an empty string.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

// ============================================================================
// Regex Patterns
// ============================================================================

/// Pattern for basic dice expressions: "d20", "2d6", "3d8+5", "1d4 - 1"
/// Captures: (count)d(sides)(+/-modifier)
pub(crate) static DICE_EXPR_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)
        (?P<count>\d+)?                 # Optional count (defaults to 1)
        d                               # The 'd' separator
        (?P<sides>\d+)                  # Die sides
        (?:
            \s*
            (?P<mod_sign>[+\-−–])       # Modifier sign (various dash types)
            \s*
            (?P<modifier>\d+)
        )?
        \b",
    )
    .expect("Failed to compile dice expression regex")
});

/// A whole roll formula: dice terms and flat numbers joined by + or -.
static FORMULA_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:\d*d\d+|\d+)(?:\s*[+\-]\s*(?:\d*d\d+|\d+))*\s*$")
        .expect("Failed to compile roll formula regex")
});

// ============================================================================
// Types
// ============================================================================

/// A parsed dice expression (e.g., "2d6 + 3").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceExpression {
    /// Number of dice to roll (e.g., 2 in "2d6")
    pub count: u32,
    /// Number of sides on each die (e.g., 6 in "2d6")
    pub sides: u32,
    /// Flat modifier (e.g., 3 in "2d6+3", -1 in "1d4-1")
    pub modifier: i32,
}

impl DiceExpression {
    pub fn new(count: u32, sides: u32, modifier: i32) -> Self {
        Self {
            count,
            sides,
            modifier,
        }
    }

    /// Parse the first dice expression found in `text`.
    pub fn parse(text: &str) -> Option<Self> {
        let caps = DICE_EXPR_PATTERN.captures(text)?;

        let count: u32 = caps
            .name("count")
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(1);
        let sides: u32 = caps.name("sides")?.as_str().parse().ok()?;

        let modifier: i32 = match (caps.name("mod_sign"), caps.name("modifier")) {
            (Some(sign), Some(value)) => {
                let val: i32 = value.as_str().parse().unwrap_or(0);
                if sign.as_str() == "+" {
                    val
                } else {
                    -val
                }
            }
            _ => 0,
        };

        Some(Self::new(count, sides, modifier))
    }

    /// The dice term alone, lower-cased ("2d6").
    pub fn dice_term(&self) -> String {
        format!("{}d{}", self.count, self.sides)
    }

    /// Calculate the average roll.
    pub fn average_roll(&self) -> f64 {
        let avg_per_die = (1.0 + self.sides as f64) / 2.0;
        (self.count as f64 * avg_per_die) + self.modifier as f64
    }
}

impl std::fmt::Display for DiceExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&with_modifier(&self.dice_term(), self.modifier))
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Whether `text` is a complete, well-formed roll formula.
pub fn is_valid_formula(text: &str) -> bool {
    FORMULA_PATTERN.is_match(text)
}

/// Render `<dice> ± <modifier>`; a zero modifier leaves the dice bare.
pub fn with_modifier(dice: &str, modifier: i32) -> String {
    match modifier {
        0 => dice.to_string(),
        m if m > 0 => format!("{dice} + {m}"),
        m => format!("{dice} - {}", m.unsigned_abs()),
    }
}

// ============================================================================
// Tests
// ============================================================================
