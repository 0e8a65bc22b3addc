//! Parse-or-default utilities.
//!
//! One helper per value kind (numeric, label, formula). Every extraction rule
//! funnels its candidate through one of these so a missing or malformed value
//! always lands on a declared default instead of leaking into arithmetic.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::dice::is_valid_formula;
use super::input::LooseValue;

/// First number in a string: "30 ft." → 30, "-2" → -2, "1,800" → 1800.
static LEADING_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([+-]?\d[\d,]*(?:\.\d+)?)").expect("Failed to compile leading number regex")
});

// ============================================================================
// Numeric
// ============================================================================

/// Parse the leading number of `text`, validating it before the cast.
pub fn leading_number(text: &str) -> Option<f64> {
    let caps = LEADING_NUMBER.captures(text)?;
    caps.get(1)?
        .as_str()
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}

/// Numeric value of a loose input field.
pub fn number(value: Option<&LooseValue>) -> Option<f64> {
    match value? {
        LooseValue::Number(n) if n.is_finite() => Some(*n),
        LooseValue::Text(text) => leading_number(text),
        _ => None,
    }
}

/// Numeric value or `default`.
pub fn number_or(field: &str, value: Option<&LooseValue>, default: f64) -> f64 {
    number(value).unwrap_or_else(|| {
        debug!(field, default, "numeric field absent or unparsable, using default");
        default
    })
}

/// Integer value or `default`; fractional input is truncated toward zero.
pub fn int_or(field: &str, value: Option<&LooseValue>, default: i32) -> i32 {
    number_or(field, value, default as f64) as i32
}

/// Non-negative integer value or `default` (negative input also defaults).
pub fn count_or(field: &str, value: Option<&LooseValue>, default: u32) -> u32 {
    match number(value) {
        Some(n) if n >= 0.0 => n as u32,
        _ => {
            debug!(field, default, "count field absent or invalid, using default");
            default
        }
    }
}

/// Truthiness of a loose flag: `true`, non-zero numbers and non-empty text
/// other than "false"/"0".
pub fn flag(value: Option<&LooseValue>) -> bool {
    match value {
        Some(LooseValue::Flag(b)) => *b,
        Some(LooseValue::Number(n)) => *n != 0.0,
        Some(LooseValue::Text(text)) => {
            let t = text.trim();
            !t.is_empty() && !t.eq_ignore_ascii_case("false") && t != "0"
        }
        None => false,
    }
}

/// Parse a numeric capture group, defaulting on any failure.
pub fn capture_or<T: std::str::FromStr>(capture: Option<regex::Match<'_>>, default: T) -> T {
    capture
        .and_then(|m| m.as_str().trim().replace(' ', "").parse().ok())
        .unwrap_or(default)
}

// ============================================================================
// Labels
// ============================================================================

/// Trimmed label, or `default` when blank or absent.
pub fn label_or(value: Option<&str>, default: &str) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
        .to_string()
}

/// Text form of a loose value (numbers render without a trailing ".0").
pub fn text(value: Option<&LooseValue>) -> Option<String> {
    match value? {
        LooseValue::Text(text) => Some(text.clone()),
        LooseValue::Number(n) if n.fract() == 0.0 => Some(format!("{}", *n as i64)),
        LooseValue::Number(n) => Some(n.to_string()),
        LooseValue::Flag(_) => None,
    }
}

// ============================================================================
// Formulas
// ============================================================================

/// The candidate if it is a valid roll formula, otherwise an empty string.
pub fn formula_or_empty(candidate: Option<&str>) -> String {
    match candidate.map(str::trim) {
        Some(f) if is_valid_formula(f) => f.to_string(),
        Some(f) => {
            debug!(formula = f, "invalid roll formula, dropping");
            String::new()
        }
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_number() {
        assert_eq!(leading_number("30 ft."), Some(30.0));
        assert_eq!(leading_number(" 17 (natural armor)"), Some(17.0));
        assert_eq!(leading_number("1,800"), Some(1800.0));
        assert_eq!(leading_number("-2"), Some(-2.0));
        assert_eq!(leading_number("ft. 30"), None);
        assert_eq!(leading_number(""), None);
    }

    #[test]
    fn test_number_or_defaults() {
        assert_eq!(number_or("speed", None, 30.0), 30.0);
        assert_eq!(number_or("speed", Some(&LooseValue::from("fast")), 30.0), 30.0);
        assert_eq!(number_or("speed", Some(&LooseValue::from("40 ft.")), 30.0), 40.0);
        assert_eq!(number_or("speed", Some(&LooseValue::Number(f64::NAN)), 30.0), 30.0);
        assert_eq!(number_or("speed", Some(&LooseValue::Flag(true)), 30.0), 30.0);
    }

    #[test]
    fn test_count_or_rejects_negative() {
        assert_eq!(count_or("fly", Some(&LooseValue::Number(-10.0)), 0), 0);
        assert_eq!(count_or("fly", Some(&LooseValue::Number(60.0)), 0), 60);
    }

    #[test]
    fn test_flag() {
        assert!(flag(Some(&LooseValue::Flag(true))));
        assert!(flag(Some(&LooseValue::from("hover"))));
        assert!(!flag(Some(&LooseValue::from("false"))));
        assert!(!flag(Some(&LooseValue::Number(0.0))));
        assert!(!flag(None));
    }

    #[test]
    fn test_label_or() {
        assert_eq!(label_or(Some("  chaotic evil "), ""), "chaotic evil");
        assert_eq!(label_or(Some("   "), "unaligned"), "unaligned");
        assert_eq!(label_or(None, "unaligned"), "unaligned");
    }

    #[test]
    fn test_text_of_number() {
        assert_eq!(text(Some(&LooseValue::Number(5.0))).as_deref(), Some("5"));
        assert_eq!(text(Some(&LooseValue::Number(0.5))).as_deref(), Some("0.5"));
    }

    #[test]
    fn test_formula_or_empty() {
        assert_eq!(formula_or_empty(Some("9d10 + 9")), "9d10 + 9");
        assert_eq!(formula_or_empty(Some("see text")), "");
        assert_eq!(formula_or_empty(None), "");
    }
}
