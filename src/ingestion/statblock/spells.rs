//! Spell list scanning.
//!
//! Finds the spell-name lists embedded in spellcasting features and emits one
//! [`SpellUseDeclaration`] per name. Recognised line shapes:
//!
//! - `Cantrips (at will): fire bolt, light`
//! - `3rd level (3 slots): counterspell, fireball`
//! - `At will: detect magic, mage hand`
//! - `1/day each: plane shift, wish`

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::input::AbilityEntry;
use super::record::{SpellUsage, SpellUseDeclaration, UsePeriod};

// ============================================================================
// Regex Patterns
// ============================================================================

static LEVELED_LIST_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)
        ^(?:cantrips|(?P<level>\d)\w{1,2}[\s-]level)
        \s*(?:\([^)]*\))?
        \s*:\s*
        (?P<list>.+)$",
    )
    .expect("Failed to compile leveled spell list regex")
});

static AT_WILL_LIST_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^at\s+will\s*:\s*(?P<list>.+)$").expect("Failed to compile at-will spell list regex")
});

static PER_DAY_LIST_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?P<count>\d+)\s*/\s*day(?:\s+each)?\s*:\s*(?P<list>.+)$")
        .expect("Failed to compile per-day spell list regex")
});

static LINE_BREAK_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\r?\n|<br\s*/?>").expect("Failed to compile line break regex")
});

/// Trailing "(self only)" style notes.
static TRAILING_NOTE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*\([^)]*\)\s*$").expect("Failed to compile trailing note regex")
});

// ============================================================================
// Scanning
// ============================================================================

/// Spell declarations from every feature description, in source order.
/// Repeated names keep their first declaration.
pub fn scan_features(features: &[AbilityEntry]) -> Vec<SpellUseDeclaration> {
    let mut seen = HashSet::new();
    features
        .iter()
        .filter_map(|feature| feature.parts().map(|(_, desc)| desc))
        .flat_map(scan_description)
        .filter(|declaration| seen.insert(declaration.name.to_lowercase()))
        .collect()
}

/// Spell declarations from one description.
pub fn scan_description(description: &str) -> Vec<SpellUseDeclaration> {
    let mut declarations = Vec::new();

    for line in LINE_BREAK_PATTERN.split(description) {
        let line = line
            .trim()
            .trim_start_matches(|c: char| !c.is_ascii_alphanumeric())
            .trim_end();

        let Some((usage, list)) = classify_line(line) else {
            continue;
        };
        for name in spell_names(list) {
            declarations.push(SpellUseDeclaration::new(name, usage));
        }
    }

    if !declarations.is_empty() {
        debug!(count = declarations.len(), "found spell declarations");
    }
    declarations
}

fn classify_line(line: &str) -> Option<(SpellUsage, &str)> {
    if let Some(caps) = LEVELED_LIST_PATTERN.captures(line) {
        let level = caps
            .name("level")
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0);
        return Some((SpellUsage::Slot { level }, caps.name("list")?.as_str()));
    }
    if let Some(caps) = AT_WILL_LIST_PATTERN.captures(line) {
        return Some((SpellUsage::AtWill, caps.name("list")?.as_str()));
    }
    if let Some(caps) = PER_DAY_LIST_PATTERN.captures(line) {
        let count = caps.name("count")?.as_str().parse().ok()?;
        return Some((
            SpellUsage::PerPeriod {
                count,
                period: UsePeriod::Day,
            },
            caps.name("list")?.as_str(),
        ));
    }
    None
}

/// Clean a comma-separated list: markup stripped, trailing notes dropped.
pub fn spell_names(list: &str) -> Vec<String> {
    list.replace(['*', '_'], "")
        .split(',')
        .map(|name| TRAILING_NOTE_PATTERN.replace(name.trim(), "").trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leveled_lists() {
        let declarations = scan_description(
            "The mage is a 9th-level spellcaster.\n\
             Cantrips (at will): fire bolt, light\n\
             1st level (4 slots): _magic missile_, shield\n\
             3rd-level (3 slots): counterspell",
        );
        assert_eq!(
            declarations,
            vec![
                SpellUseDeclaration::new("fire bolt", SpellUsage::Slot { level: 0 }),
                SpellUseDeclaration::new("light", SpellUsage::Slot { level: 0 }),
                SpellUseDeclaration::new("magic missile", SpellUsage::Slot { level: 1 }),
                SpellUseDeclaration::new("shield", SpellUsage::Slot { level: 1 }),
                SpellUseDeclaration::new("counterspell", SpellUsage::Slot { level: 3 }),
            ]
        );
    }

    #[test]
    fn test_innate_lists_with_br() {
        let declarations = scan_description(
            "It can innately cast the following spells:<br>At will: detect magic, mage hand<br>\
             1/day each: plane shift (self only), *wish*",
        );
        assert_eq!(declarations.len(), 4);
        assert_eq!(declarations[0].usage, SpellUsage::AtWill);
        assert_eq!(declarations[2].name, "plane shift");
        assert_eq!(
            declarations[3],
            SpellUseDeclaration::new("wish", SpellUsage::PerPeriod { count: 1, period: UsePeriod::Day })
        );
    }

    #[test]
    fn test_bulleted_lines() {
        let declarations = scan_description("• At will: thaumaturgy");
        assert_eq!(declarations, vec![SpellUseDeclaration::new("thaumaturgy", SpellUsage::AtWill)]);
    }

    #[test]
    fn test_no_lists() {
        assert!(scan_description("The dragon can breathe air and water.").is_empty());
    }

    #[test]
    fn test_scan_features_dedups_names() {
        let features = vec![
            AbilityEntry::new("Spellcasting", "1st level (2 slots): Shield"),
            AbilityEntry::new("Innate Spellcasting", "At will: shield, darkness"),
        ];
        let declarations = scan_features(&features);
        assert_eq!(declarations.len(), 2);
        assert_eq!(declarations[0].usage, SpellUsage::Slot { level: 1 });
        assert_eq!(declarations[1].name, "darkness");
    }
}
