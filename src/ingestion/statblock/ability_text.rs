//! Ability Text Parser
//!
//! Pulls combat semantics out of a single ability entry: damage dice and
//! types, saving throw DC, to-hit bonus, range and area shape from the
//! description; recharge, limited uses and legendary cost from the name; and
//! caster level / ability / slot declarations from spellcasting blocks.
//!
//! # Example
//!
//! ```ignore
//! use crate::ingestion::statblock::ability_text::AbilityTextParser;
//!
//! let parser = AbilityTextParser::new(Taxonomies::dnd5e());
//! let parsed = parser.parse(
//!     "Claw",
//!     "Melee Weapon Attack: +5 to hit, reach 5 ft., one target. Hit: 7 (1d8 + 3) slashing damage.",
//! );
//! assert_eq!(parsed.to_hit, Some(5));
//! assert_eq!(parsed.damage[0].formula, "1d8 + @mod");
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

use super::defaults::capture_or;
use super::record::{
    AreaShape, DamagePart, LimitedUses, RangeBlock, RangeUnits, Recharge, SaveBlock, TargetBlock,
    UsePeriod,
};
use super::taxonomy::{AbilityKey, Taxonomies};

/// Default width of a line area when the text does not state one.
pub const DEFAULT_LINE_WIDTH: u32 = 5;

/// Marker appended to damage formulas that scale with the attacker modifier.
pub const MODIFIER_MARKER: &str = "@mod";

// ============================================================================
// Regex Patterns
// ============================================================================

/// "(1d8 + 3) slashing damage", "(2d6) fire damage"
static DAMAGE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)
        \(\s*
        (?P<dice>\d+d\d+)
        (?:\s*(?P<sign>[+\-−–])\s*(?P<modifier>\d+))?
        \s*\)
        \s+
        (?P<type>[a-z]+)
        \s+damage",
    )
    .expect("Failed to compile damage regex")
});

/// "DC 15 Dexterity"
static SAVE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"DC\s+(?P<dc>\d+)\s+(?P<ability>\w+)").expect("Failed to compile save regex")
});

/// "+5 to hit", "- 1 to hit"
static TO_HIT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?P<bonus>[+\-−–]\s?\d+)\s+to\s+hit").expect("Failed to compile to-hit regex")
});

/// "reach 5 ft.", "60-foot cone", "20-foot-radius sphere"
static SINGLE_RANGE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)
        (?:^|\s)
        (?P<value>\d+)
        [\s-]
        (?:ft|feet|foot)\.?
        (?:-radius)?
        (?:\s+(?P<shape>line|cone|cube|sphere)\b)?",
    )
    .expect("Failed to compile single range regex")
});

/// "range 80/320 ft."
static DOUBLE_RANGE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s(?P<short>\d+)/(?P<long>\d+)\s*(?:ft\b|feet\b|foot\b)")
        .expect("Failed to compile double range regex")
});

/// "that is 10 feet wide"
static LINE_WIDTH_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?P<width>\d+)[\s-](?:ft\.?|feet|foot)\s+wide").expect("Failed to compile line width regex")
});

/// "Fire Breath (Recharge 5-6)", "Recharge 6"
static RECHARGE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)recharge\s+(?P<threshold>\d)(?:\s*[-–—]\s*6)?").expect("Failed to compile recharge regex")
});

/// "(3/Day)", "2/Long Rest", "1/SR"
static USES_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?P<count>\d+)\s*/\s*(?P<period>(?:long|short)\s+rest|[a-z]+)")
        .expect("Failed to compile limited uses regex")
});

/// "(Costs 2 Actions)"
static COST_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\(\s*costs\s+(?P<cost>\d+)\s+actions?\s*\)").expect("Failed to compile cost regex")
});

/// "is a 9th-level spellcaster"
static CASTER_LEVEL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?P<level>\d+)\w{1,2}-level\s+spellcaster").expect("Failed to compile caster level regex")
});

/// "spellcasting ability is Intelligence"
static CASTER_ABILITY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)spell\s?casting\s+ability\s+is\s+(?P<ability>\w+)")
        .expect("Failed to compile caster ability regex")
});

/// "3rd level (3 slots)"
static SLOT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?P<level>\d+)\w{1,2}\s+level\s*\((?P<slots>\d+)\s+slots?\)")
        .expect("Failed to compile spell slot regex")
});

/// "Legendary Resistance (3/Day)"
static LEGENDARY_RESISTANCE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)legendary\s+resistance\s*\((?P<count>\d+)\s*/\s*day\)")
        .expect("Failed to compile legendary resistance regex")
});

// ============================================================================
// Types
// ============================================================================

/// Everything recoverable from one ability entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedAbility {
    pub damage: Vec<DamagePart>,
    pub save: Option<SaveBlock>,
    pub to_hit: Option<i32>,
    pub range: RangeBlock,
    pub target: TargetBlock,
    pub recharge: Option<Recharge>,
    pub uses: Option<LimitedUses>,
}

/// Caster details declared by a spellcasting block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpellcastingBlock {
    pub level: Option<u32>,
    /// Ability label as written ("Intelligence", "wis", ...).
    pub ability: Option<String>,
    /// (spell level, slot count) in source order.
    pub slots: Vec<(u8, u32)>,
}

// ============================================================================
// Parser
// ============================================================================

/// Parses individual ability entries.
#[derive(Debug, Clone, Copy)]
pub struct AbilityTextParser {
    taxonomies: &'static Taxonomies,
}

impl AbilityTextParser {
    pub fn new(taxonomies: &'static Taxonomies) -> Self {
        Self { taxonomies }
    }

    /// Parse one entry. Recharge and limited uses are mutually exclusive: a
    /// recharge token in the name suppresses limited-use extraction.
    pub fn parse(&self, name: &str, description: &str) -> ParsedAbility {
        let (range, target) = parse_range_target(description);
        let recharge = parse_recharge(name);
        let uses = if recharge.is_some() {
            None
        } else {
            parse_limited_uses(name)
        };

        ParsedAbility {
            damage: self.parse_damage(description),
            save: parse_save(description),
            to_hit: parse_to_hit(description),
            range,
            target,
            recharge,
            uses,
        }
    }

    /// Every "(<dice> [± n]) <type> damage" occurrence, in order.
    pub fn parse_damage(&self, text: &str) -> Vec<DamagePart> {
        DAMAGE_PATTERN
            .captures_iter(text)
            .filter_map(|caps| {
                let dice = caps.name("dice")?.as_str().to_ascii_lowercase();
                let modifier = match (caps.name("sign"), caps.name("modifier")) {
                    (Some(sign), Some(value)) => {
                        let value: i32 = capture_or(Some(value), 0);
                        Some(if sign.as_str() == "+" { value } else { -value })
                    }
                    _ => None,
                };
                let label = caps.name("type")?.as_str();
                let damage_type = self
                    .taxonomies
                    .damage_types
                    .resolve(label)
                    .map(str::to_string)
                    .unwrap_or_else(|| label.to_ascii_lowercase());

                let formula = match modifier {
                    Some(_) => format!("{dice} + {MODIFIER_MARKER}"),
                    None => dice,
                };

                Some(DamagePart {
                    formula,
                    damage_type,
                    modifier,
                })
            })
            .collect()
    }
}

/// First "DC <n> <Ability>" phrase. An unrecognised ability word keeps the DC
/// and leaves the ability empty.
pub fn parse_save(text: &str) -> Option<SaveBlock> {
    let caps = SAVE_PATTERN.captures(text)?;
    let dc: u32 = caps.name("dc")?.as_str().parse().ok()?;
    let ability = caps.name("ability").and_then(|m| AbilityKey::resolve(m.as_str()));
    Some(SaveBlock { dc, ability })
}

/// Signed bonus before "to hit".
pub fn parse_to_hit(text: &str) -> Option<i32> {
    let caps = TO_HIT_PATTERN.captures(text)?;
    let raw = caps.name("bonus")?.as_str();
    let negative = !raw.starts_with('+');
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    let value: i32 = digits.parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Range and target. An area suffix turns the single value into a target
/// area with a self range; otherwise a short/long pair wins over a single
/// value.
pub fn parse_range_target(text: &str) -> (RangeBlock, TargetBlock) {
    let single = SINGLE_RANGE_PATTERN.captures(text).and_then(|caps| {
        let value: u32 = caps.name("value")?.as_str().parse().ok()?;
        let shape = caps.name("shape").and_then(|m| AreaShape::parse(m.as_str()));
        Some((value, shape))
    });
    let double = DOUBLE_RANGE_PATTERN.captures(text).and_then(|caps| {
        let short: u32 = caps.name("short")?.as_str().parse().ok()?;
        let long: u32 = caps.name("long")?.as_str().parse().ok()?;
        Some((short, long))
    });

    match (single, double) {
        (Some((value, Some(shape))), _) => {
            let width = (shape == AreaShape::Line).then(|| {
                LINE_WIDTH_PATTERN
                    .captures(text)
                    .and_then(|caps| caps.name("width")?.as_str().parse().ok())
                    .unwrap_or(DEFAULT_LINE_WIDTH)
            });
            let target = TargetBlock {
                shape: Some(shape),
                value: Some(value),
                width,
                units: Some(RangeUnits::Ft),
            };
            let range = RangeBlock {
                value: None,
                long: None,
                units: Some(RangeUnits::Own),
            };
            (range, target)
        }
        (_, Some((short, long))) => (
            RangeBlock {
                value: Some(short),
                long: Some(long),
                units: Some(RangeUnits::Ft),
            },
            TargetBlock::default(),
        ),
        (Some((value, None)), None) => (
            RangeBlock {
                value: Some(value),
                long: None,
                units: Some(RangeUnits::Ft),
            },
            TargetBlock::default(),
        ),
        (None, None) => (RangeBlock::default(), TargetBlock::default()),
    }
}

/// "Recharge N–6" token in an ability name.
pub fn parse_recharge(name: &str) -> Option<Recharge> {
    let caps = RECHARGE_PATTERN.captures(name)?;
    let threshold: u8 = caps.name("threshold")?.as_str().parse().ok()?;
    (1..=6).contains(&threshold).then_some(Recharge { threshold })
}

/// "<N>/<period>" token in an ability name.
pub fn parse_limited_uses(name: &str) -> Option<LimitedUses> {
    let caps = USES_PATTERN.captures(name)?;
    let count: u32 = caps.name("count")?.as_str().parse().ok()?;
    let period = UsePeriod::from_label(caps.name("period")?.as_str());
    Some(LimitedUses { count, period })
}

/// "(Costs N Actions)" in a legendary action name.
pub fn parse_legendary_cost(name: &str) -> Option<u32> {
    let caps = COST_PATTERN.captures(name)?;
    caps.name("cost")?.as_str().parse().ok()
}

/// "Legendary Resistance (N/Day)" anywhere in `text`.
pub fn parse_legendary_resistance(text: &str) -> Option<u32> {
    let caps = LEGENDARY_RESISTANCE_PATTERN.captures(text)?;
    caps.name("count")?.as_str().parse().ok()
}

/// Whether `text` declares at least one spell slot count.
pub fn declares_spell_slots(text: &str) -> bool {
    SLOT_PATTERN.is_match(text)
}

/// Whether `text` names a spellcasting ability.
pub fn declares_spellcasting_ability(text: &str) -> bool {
    CASTER_ABILITY_PATTERN.is_match(text)
}

/// Caster level, ability and slot table of a spellcasting block.
pub fn parse_spellcasting(text: &str) -> SpellcastingBlock {
    let level = CASTER_LEVEL_PATTERN
        .captures(text)
        .and_then(|caps| caps.name("level")?.as_str().parse().ok());
    let ability = CASTER_ABILITY_PATTERN
        .captures(text)
        .and_then(|caps| caps.name("ability").map(|m| m.as_str().to_string()));
    let slots = SLOT_PATTERN
        .captures_iter(text)
        .filter_map(|caps| {
            let level: u8 = caps.name("level")?.as_str().parse().ok()?;
            let slots: u32 = caps.name("slots")?.as_str().parse().ok()?;
            (1..=9).contains(&level).then_some((level, slots))
        })
        .collect();

    SpellcastingBlock {
        level,
        ability,
        slots,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> AbilityTextParser {
        AbilityTextParser::new(Taxonomies::dnd5e())
    }

    // ========================================================================
    // Damage
    // ========================================================================

    #[test]
    fn test_damage_with_modifier_gets_marker() {
        let damage = parser().parse_damage("Hit: 7 (1d8 + 3) slashing damage.");
        assert_eq!(
            damage,
            vec![DamagePart {
                formula: "1d8 + @mod".into(),
                damage_type: "slashing".into(),
                modifier: Some(3),
            }]
        );
    }

    #[test]
    fn test_damage_without_modifier_stays_bare() {
        let damage = parser().parse_damage("takes 13 (3d8) fire damage");
        assert_eq!(damage[0].formula, "3d8");
        assert_eq!(damage[0].modifier, None);
    }

    #[test]
    fn test_multiple_damage_parts_and_negative_modifier() {
        let damage = parser()
            .parse_damage("Hit: 3 (1d6 - 1) piercing damage plus 7 (2d6) poison damage.");
        assert_eq!(damage.len(), 2);
        assert_eq!(damage[0].modifier, Some(-1));
        assert_eq!(damage[0].formula, "1d6 + @mod");
        assert_eq!(damage[1].damage_type, "poison");
    }

    #[test]
    fn test_unknown_damage_type_kept_lowercase() {
        let damage = parser().parse_damage("(2d4) Eldritch damage");
        assert_eq!(damage[0].damage_type, "eldritch");
    }

    // ========================================================================
    // Save / to hit
    // ========================================================================

    #[test]
    fn test_save() {
        let save = parse_save("must succeed on a DC 15 Dexterity saving throw").unwrap();
        assert_eq!(save.dc, 15);
        assert_eq!(save.ability, Some(AbilityKey::Dex));

        let save = parse_save("DC 12 check").unwrap();
        assert_eq!(save.ability, None);

        assert!(parse_save("no save here").is_none());
    }

    #[test]
    fn test_to_hit() {
        assert_eq!(parse_to_hit("Melee Weapon Attack: +5 to hit"), Some(5));
        assert_eq!(parse_to_hit("Ranged Weapon Attack: + 7 to hit"), Some(7));
        assert_eq!(parse_to_hit("Melee Weapon Attack: -1 to hit"), Some(-1));
        assert_eq!(parse_to_hit("no attack roll"), None);
    }

    // ========================================================================
    // Range / target
    // ========================================================================

    #[test]
    fn test_reach() {
        let (range, target) = parse_range_target("Melee Weapon Attack: +5 to hit, reach 10 ft., one target.");
        assert_eq!(range.value, Some(10));
        assert_eq!(range.long, None);
        assert_eq!(range.units, Some(RangeUnits::Ft));
        assert_eq!(target, TargetBlock::default());
    }

    #[test]
    fn test_double_range_wins_over_single() {
        let (range, _) = parse_range_target("+4 to hit, reach 5 ft. or range 20/60 ft., one target.");
        assert_eq!(range.value, Some(20));
        assert_eq!(range.long, Some(60));
    }

    #[test]
    fn test_fraction_in_prose_is_not_a_range() {
        let (range, target) = parse_range_target("The target regains 1/2 its lost hit points.");
        assert_eq!(range, RangeBlock::default());
        assert_eq!(target, TargetBlock::default());

        let (range, _) = parse_range_target("Ranged Weapon Attack: +6 to hit, range 150/600 feet, one target.");
        assert_eq!((range.value, range.long), (Some(150), Some(600)));
    }

    #[test]
    fn test_cone_area() {
        let (range, target) = parse_range_target("The dragon exhales fire in a 60-foot cone.");
        assert_eq!(range.units, Some(RangeUnits::Own));
        assert_eq!(target.shape, Some(AreaShape::Cone));
        assert_eq!(target.value, Some(60));
        assert_eq!(target.width, None);
    }

    #[test]
    fn test_line_width_defaults_to_five() {
        let (_, target) = parse_range_target("exhales acid in a 30-foot line.");
        assert_eq!(target.shape, Some(AreaShape::Line));
        assert_eq!(target.width, Some(5));

        let (_, target) = parse_range_target("lightning in a 90-foot line that is 10 feet wide.");
        assert_eq!(target.value, Some(90));
        assert_eq!(target.width, Some(10));
    }

    #[test]
    fn test_radius_sphere() {
        let (_, target) = parse_range_target("each creature in a 20-foot-radius sphere");
        assert_eq!(target.shape, Some(AreaShape::Sphere));
        assert_eq!(target.value, Some(20));
    }

    // ========================================================================
    // Name tokens
    // ========================================================================

    #[test]
    fn test_recharge() {
        assert_eq!(parse_recharge("Recharge 5-6"), Some(Recharge { threshold: 5 }));
        assert_eq!(parse_recharge("Fire Breath (Recharge 5–6)"), Some(Recharge { threshold: 5 }));
        assert_eq!(parse_recharge("Web (Recharge 6)"), Some(Recharge { threshold: 6 }));
        assert_eq!(parse_recharge("Recharge 0"), None);
        assert_eq!(parse_recharge("Bite"), None);
    }

    #[test]
    fn test_limited_uses() {
        assert_eq!(
            parse_limited_uses("Legendary Resistance (3/Day)"),
            Some(LimitedUses { count: 3, period: UsePeriod::Day })
        );
        assert_eq!(
            parse_limited_uses("Healing Touch (2/Long Rest)"),
            Some(LimitedUses { count: 2, period: UsePeriod::Lr })
        );
        assert_eq!(
            parse_limited_uses("Surge (1/SR)"),
            Some(LimitedUses { count: 1, period: UsePeriod::Sr })
        );
        assert_eq!(
            parse_limited_uses("Blink (1/Turn)"),
            Some(LimitedUses { count: 1, period: UsePeriod::Charges })
        );
        assert_eq!(parse_limited_uses("Multiattack"), None);
    }

    #[test]
    fn test_recharge_suppresses_uses() {
        let parsed = parser().parse("Breath (Recharge 5-6) (1/Day)", "A 15-foot cone.");
        assert!(parsed.recharge.is_some());
        assert!(parsed.uses.is_none());
    }

    #[test]
    fn test_legendary_cost() {
        assert_eq!(parse_legendary_cost("Tail Swipe (Costs 2 Actions)"), Some(2));
        assert_eq!(parse_legendary_cost("Detect"), None);
    }

    #[test]
    fn test_legendary_resistance() {
        assert_eq!(parse_legendary_resistance("Legendary Resistance (3/Day)"), Some(3));
        assert_eq!(parse_legendary_resistance("Magic Resistance"), None);
    }

    // ========================================================================
    // Spellcasting
    // ========================================================================

    #[test]
    fn test_spellcasting_block() {
        let text = "The mage is a 9th-level spellcaster. Its spellcasting ability is Intelligence \
                    (spell save DC 14, +6 to hit with spell attacks).\n\
                    Cantrips (at will): fire bolt, light\n\
                    1st level (4 slots): magic missile, shield\n\
                    2nd level (3 slots): misty step\n\
                    5th level (1 slot): cone of cold";
        let block = parse_spellcasting(text);
        assert_eq!(block.level, Some(9));
        assert_eq!(block.ability.as_deref(), Some("Intelligence"));
        assert_eq!(block.slots, vec![(1, 4), (2, 3), (5, 1)]);
        assert!(declares_spell_slots(text));
    }

    #[test]
    fn test_innate_spellcasting_has_no_slots() {
        let text = "The djinni's innate spellcasting ability is Charisma (spell save DC 17).";
        let block = parse_spellcasting(text);
        assert_eq!(block.level, None);
        assert_eq!(block.ability.as_deref(), Some("Charisma"));
        assert!(block.slots.is_empty());
        assert!(!declares_spell_slots(text));
        assert!(declares_spellcasting_ability(text));
    }

    // ========================================================================
    // Whole entries
    // ========================================================================

    #[test]
    fn test_parse_melee_attack_entry() {
        let parsed = parser().parse(
            "Recharge 5-6",
            "Melee Weapon Attack: +5 to hit, reach 5 ft., one target. Hit: 7 (1d8 + 3) slashing damage.",
        );
        assert_eq!(parsed.to_hit, Some(5));
        assert_eq!(parsed.recharge, Some(Recharge { threshold: 5 }));
        assert_eq!(parsed.damage.len(), 1);
        assert_eq!(parsed.range.value, Some(5));
        assert!(parsed.save.is_none());
    }
}
