//! Item Synthesizer
//!
//! Turns every named, described ability entry into an [`ActionRecord`],
//! walking the five categories in fixed order (passive, action, bonus action,
//! reaction, legendary) and each category in source order.

use tracing::debug;

use super::ability_text::{parse_legendary_cost, AbilityTextParser};
use super::description::DescriptionFormatter;
use super::input::{AbilityEntry, StatBlockInput};
use super::record::{
    AbilityScores, ActionCategory, ActionRecord, ActionType, DamagePart, GoverningAbility,
    ItemKind,
};

/// Action-type phrases in priority order.
const ACTION_TYPE_PHRASES: &[(&str, ActionType)] = &[
    ("melee weapon attack", ActionType::MeleeWeapon),
    ("ranged weapon attack", ActionType::RangedWeapon),
    ("melee spell attack", ActionType::MeleeSpell),
    ("ranged spell attack", ActionType::RangedSpell),
    ("saving throw", ActionType::SavingThrow),
];

/// Legendary action cost when the name states none.
pub const DEFAULT_LEGENDARY_COST: u32 = 1;

// ============================================================================
// Classification
// ============================================================================

/// First matching phrase wins; otherwise `Other` with damage, `None` without.
pub fn classify_action_type(description: &str, has_damage: bool) -> ActionType {
    let lowered = description.to_lowercase();
    ACTION_TYPE_PHRASES
        .iter()
        .find(|(phrase, _)| lowered.contains(phrase))
        .map(|(_, action_type)| *action_type)
        .unwrap_or(if has_damage {
            ActionType::Other
        } else {
            ActionType::None
        })
}

/// Which ability score produced an action's numbers.
///
/// With a to-hit bonus the candidate modifier is `bonus - proficiency`; a
/// single matching ability wins, anything else is the `None` sentinel
/// carrying that difference. Without a to-hit bonus a unique match on the
/// first flat damage modifier is used, otherwise `Default`.
pub fn infer_governing_ability(
    abilities: &AbilityScores,
    proficiency: i32,
    to_hit: Option<i32>,
    damage: &[DamagePart],
) -> GoverningAbility {
    if let Some(bonus) = to_hit {
        let difference = bonus.saturating_sub(proficiency);
        let matches = abilities.with_modifier(difference);
        return match matches.as_slice() {
            [key] => GoverningAbility::Ability { key: *key },
            _ => {
                debug!(
                    bonus,
                    proficiency,
                    candidates = matches.len(),
                    "no unique ability for attack bonus"
                );
                GoverningAbility::None {
                    attack_bonus: difference.to_string(),
                }
            }
        };
    }

    let modifier = damage.iter().find_map(|part| part.modifier);
    match modifier.map(|m| abilities.with_modifier(m)).as_deref() {
        Some([key]) => GoverningAbility::Ability { key: *key },
        _ => GoverningAbility::Default,
    }
}

// ============================================================================
// Synthesizer
// ============================================================================

/// Builds action records against one creature's resolved numbers.
#[derive(Debug, Clone)]
pub struct ItemSynthesizer<'a> {
    parser: AbilityTextParser,
    abilities: &'a AbilityScores,
    proficiency: i32,
    formatter: DescriptionFormatter<'a>,
}

impl<'a> ItemSynthesizer<'a> {
    pub fn new(
        parser: AbilityTextParser,
        abilities: &'a AbilityScores,
        proficiency: i32,
        formatter: DescriptionFormatter<'a>,
    ) -> Self {
        Self {
            parser,
            abilities,
            proficiency,
            formatter,
        }
    }

    /// All action records for a document, in category then source order.
    /// Entries lacking a name or description are skipped.
    pub fn synthesize(&self, input: &StatBlockInput) -> Vec<ActionRecord> {
        input
            .categories()
            .into_iter()
            .flat_map(|(category, entries)| {
                entries
                    .iter()
                    .filter_map(move |entry| self.synthesize_entry(category, entry))
            })
            .collect()
    }

    pub fn synthesize_entry(&self, category: ActionCategory, entry: &AbilityEntry) -> Option<ActionRecord> {
        let Some((name, raw_description)) = entry.parts() else {
            debug!(?category, "skipping entry without name or description");
            return None;
        };

        let description = self.formatter.substitute_placeholders(raw_description);
        let parsed = self.parser.parse(name, &description);

        let action_type = classify_action_type(&description, !parsed.damage.is_empty());
        let ability = infer_governing_ability(
            self.abilities,
            self.proficiency,
            parsed.to_hit,
            &parsed.damage,
        );
        let kind = if parsed.damage.iter().any(|part| part.modifier.is_some()) {
            ItemKind::Weapon
        } else {
            ItemKind::Feat
        };
        let cost = (category == ActionCategory::Legendary)
            .then(|| {
                parse_legendary_cost(name)
                    .filter(|cost| *cost > 0)
                    .unwrap_or(DEFAULT_LEGENDARY_COST)
            });

        Some(ActionRecord {
            name: name.to_string(),
            description: self.formatter.render(raw_description),
            category,
            kind,
            cost,
            damage: parsed.damage,
            save: parsed.save,
            to_hit: parsed.to_hit,
            range: parsed.range,
            target: parsed.target,
            recharge: parsed.recharge,
            uses: parsed.uses,
            action_type,
            ability,
        })
    }
}
