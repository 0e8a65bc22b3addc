//! Description Post-processing
//!
//! Substitutes generator placeholders in ability descriptions with computed
//! values, optionally wraps dice as inline roll commands, and converts
//! underscore emphasis into an explicit tag.
//!
//! Placeholders:
//! - `[STR ATK]` → signed attack bonus (modifier + proficiency)
//! - `[STR SAVE]` → save DC (8 + modifier + proficiency)
//! - `[STR 1D6]` → `1d6 + <modifier>`
//! - `[2D6]` → `2d6`
//!
//! Each placeholder occurrence is replaced exactly once, left to right.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::dice::DiceExpression;
use super::record::AbilityScores;
use super::taxonomy::AbilityKey;

// ============================================================================
// Regex Patterns
// ============================================================================

static PLACEHOLDER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)
        \[
        (?:(?P<ability>STR|DEX|CON|INT|WIS|CHA)\s+)?
        (?P<token>ATK|SAVE|\d*d\d+(?:\s*[+\-]\s*\d+)?)
        \]",
    )
    .expect("Failed to compile placeholder regex")
});

/// Dice with an optional flat modifier, not already inside a roll command.
static INLINE_DICE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b\d+d\d+(?:\s*[+\-]\s*\d+\b)?").expect("Failed to compile inline dice regex")
});

/// "_Hit:_"
static EMPHASIS_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"_(?P<text>[^_\n]+)_").expect("Failed to compile emphasis regex")
});

// ============================================================================
// Formatter
// ============================================================================

/// Renders descriptions against one creature's numbers.
#[derive(Debug, Clone)]
pub struct DescriptionFormatter<'a> {
    abilities: &'a AbilityScores,
    proficiency: i32,
    inline_rolls: bool,
    emphasis_tag: &'a str,
}

impl<'a> DescriptionFormatter<'a> {
    pub fn new(
        abilities: &'a AbilityScores,
        proficiency: i32,
        inline_rolls: bool,
        emphasis_tag: &'a str,
    ) -> Self {
        Self {
            abilities,
            proficiency,
            inline_rolls,
            emphasis_tag,
        }
    }

    /// Full post-processing pass.
    pub fn render(&self, text: &str) -> String {
        let substituted = self.substitute_placeholders(text);
        let rolled = if self.inline_rolls {
            make_rollable(&substituted)
        } else {
            substituted
        };
        emphasize(&rolled, self.emphasis_tag)
    }

    pub fn substitute_placeholders(&self, text: &str) -> String {
        PLACEHOLDER_PATTERN
            .replace_all(text, |caps: &Captures<'_>| self.replacement(caps))
            .into_owned()
    }

    fn replacement(&self, caps: &Captures<'_>) -> String {
        let whole = caps.get(0).map_or("", |m| m.as_str());
        let Some(token) = caps.name("token").map(|m| m.as_str()) else {
            return whole.to_string();
        };
        let ability = caps.name("ability").and_then(|m| AbilityKey::resolve(m.as_str()));

        match (ability, token.to_ascii_uppercase().as_str()) {
            (Some(key), "ATK") => format!("{:+}", self.attack_bonus(key)),
            (Some(key), "SAVE") => self.attack_bonus(key).saturating_add(8).to_string(),
            (None, "ATK" | "SAVE") => whole.to_string(),
            (Some(key), _) => match DiceExpression::parse(token) {
                Some(dice) => DiceExpression {
                    modifier: dice.modifier.saturating_add(self.abilities.modifier(key)),
                    ..dice
                }
                .to_string(),
                None => whole.to_string(),
            },
            (None, _) => token.to_ascii_lowercase(),
        }
    }

    fn attack_bonus(&self, key: AbilityKey) -> i32 {
        self.abilities.modifier(key).saturating_add(self.proficiency)
    }
}

/// Wrap each dice expression as `[[/r <dice>]]{<dice>}`.
pub fn make_rollable(text: &str) -> String {
    INLINE_DICE_PATTERN
        .replace_all(text, |caps: &Captures<'_>| {
            let dice = caps.get(0).map_or("", |m| m.as_str());
            format!("[[/r {dice}]]{{{dice}}}")
        })
        .into_owned()
}

/// Convert `_text_` into `<tag>text</tag>`.
pub fn emphasize(text: &str, tag: &str) -> String {
    EMPHASIS_PATTERN
        .replace_all(text, |caps: &Captures<'_>| {
            let inner = caps.name("text").map_or("", |m| m.as_str());
            format!("<{tag}>{inner}</{tag}>")
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::statblock::record::AbilityScore;

    fn scores() -> AbilityScores {
        let mut scores = AbilityScores::default();
        scores.set(AbilityKey::Str, AbilityScore { value: 16, proficient: false });
        scores.set(AbilityKey::Dex, AbilityScore { value: 8, proficient: false });
        scores
    }

    #[test]
    fn test_attack_and_save_placeholders() {
        let scores = scores();
        let fmt = DescriptionFormatter::new(&scores, 2, false, "em");
        assert_eq!(
            fmt.substitute_placeholders("Melee Weapon Attack: [STR ATK] to hit. DC [STR SAVE] Strength."),
            "Melee Weapon Attack: +5 to hit. DC 13 Strength."
        );
        assert_eq!(fmt.substitute_placeholders("[DEX ATK]"), "+1");
    }

    #[test]
    fn test_negative_attack_bonus_is_signed() {
        let scores = scores();
        let fmt = DescriptionFormatter::new(&scores, 0, false, "em");
        assert_eq!(fmt.substitute_placeholders("[DEX ATK]"), "-1");
    }

    #[test]
    fn test_dice_placeholders() {
        let scores = scores();
        let fmt = DescriptionFormatter::new(&scores, 2, false, "em");
        assert_eq!(fmt.substitute_placeholders("Hit: [STR 1D6] bludgeoning"), "Hit: 1d6 + 3 bludgeoning");
        assert_eq!(fmt.substitute_placeholders("[DEX 1d4]"), "1d4 - 1");
        assert_eq!(fmt.substitute_placeholders("[CON 2d8]"), "2d8");
        assert_eq!(fmt.substitute_placeholders("plus [2D6] fire"), "plus 2d6 fire");
    }

    #[test]
    fn test_extreme_numbers_saturate() {
        let mut scores = AbilityScores::default();
        scores.set(AbilityKey::Str, AbilityScore { value: i32::MAX, proficient: false });
        scores.set(AbilityKey::Dex, AbilityScore { value: i32::MIN, proficient: false });
        let fmt = DescriptionFormatter::new(&scores, i32::MAX, false, "em");

        assert_eq!(fmt.substitute_placeholders("[STR ATK]"), "+2147483647");
        assert_eq!(fmt.substitute_placeholders("[STR SAVE]"), "2147483647");
        assert_eq!(fmt.substitute_placeholders("[STR 1d6 + 2147483647]"), "1d6 + 2147483647");
        assert_eq!(fmt.substitute_placeholders("[DEX 1d6 - 2147483647]"), "1d6 - 2147483648");
    }

    #[test]
    fn test_unqualified_attack_placeholder_untouched() {
        let scores = scores();
        let fmt = DescriptionFormatter::new(&scores, 2, false, "em");
        assert_eq!(fmt.substitute_placeholders("[ATK] and [SAVE]"), "[ATK] and [SAVE]");
    }

    #[test]
    fn test_each_occurrence_replaced_once() {
        let scores = scores();
        let fmt = DescriptionFormatter::new(&scores, 2, false, "em");
        assert_eq!(fmt.substitute_placeholders("[STR ATK]/[STR ATK]"), "+5/+5");
    }

    #[test]
    fn test_make_rollable() {
        assert_eq!(
            make_rollable("Hit: 7 (1d8 + 3) slashing"),
            "Hit: 7 ([[/r 1d8 + 3]]{1d8 + 3}) slashing"
        );
        assert_eq!(make_rollable("takes 2d6 fire"), "takes [[/r 2d6]]{2d6} fire");
    }

    #[test]
    fn test_emphasis() {
        assert_eq!(emphasize("_Hit:_ 5 damage", "em"), "<em>Hit:</em> 5 damage");
        assert_eq!(emphasize("_Melee_ and _Ranged_", "i"), "<i>Melee</i> and <i>Ranged</i>");
        assert_eq!(emphasize("no markup", "em"), "no markup");
    }

    #[test]
    fn test_render_pipeline() {
        let scores = scores();
        let fmt = DescriptionFormatter::new(&scores, 2, true, "em");
        assert_eq!(
            fmt.render("_Hit:_ [STR 1D6] bludgeoning"),
            "<em>Hit:</em> [[/r 1d6 + 3]]{1d6 + 3} bludgeoning"
        );
    }
}
