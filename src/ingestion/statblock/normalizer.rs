//! Schema Normalizer
//!
//! Reconciles extracted labels against the taxonomy tables and merges
//! repeated mentions into a [`NormalizedFields`] patch set. Every label lands
//! either in a recognised-key list or, verbatim, in the `;`-joined custom
//! overflow for its category.
//!
//! Each normalisation step yields its own partial patch; [`normalize`] folds
//! them with [`NormalizedFields::merge`], later patches overriding earlier
//! ones field by field.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use super::ability_text::{
    declares_spell_slots, declares_spellcasting_ability, parse_legendary_resistance,
    parse_spellcasting,
};
use super::fields::{proficiency_for_challenge, ExtractedFields, RawSkill};
use super::input::AbilityEntry;
use super::record::{
    AbilityScore, AbilityScores, ArmorClass, Challenge, CreatureType, DamageModifiers, HitPoints,
    LabelBuckets, Movement, ResourcePool, Resources, Senses, SpellSlotTable, Spellcasting,
};
use super::taxonomy::{AbilityKey, Taxonomies, Taxonomy};
use crate::config::ImportConfig;

/// Separator for custom overflow strings.
pub const CUSTOM_SEPARATOR: &str = ";";

/// "Telepathy 120 ft."
static TELEPATHY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^telepathy\b\s*(?P<range>\d+)?").expect("Failed to compile telepathy regex")
});

// ============================================================================
// Partial Record
// ============================================================================

/// A skill after taxonomy resolution. The governing ability is filled from
/// the taxonomy by the builder when absent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedSkill {
    pub value: f32,
    pub ability: Option<AbilityKey>,
}

/// Typed partial creature record. `None` means "not set by this step".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedFields {
    pub name: Option<String>,
    pub size: Option<String>,
    pub creature_type: Option<CreatureType>,
    pub alignment: Option<String>,
    pub challenge: Option<Challenge>,
    pub proficiency: Option<i32>,
    pub abilities: Option<AbilityScores>,
    pub skills: Option<BTreeMap<String, NormalizedSkill>>,
    pub armor_class: Option<ArmorClass>,
    pub hit_points: Option<HitPoints>,
    pub movement: Option<Movement>,
    pub senses: Option<Senses>,
    pub damage_modifiers: Option<DamageModifiers>,
    pub languages: Option<LabelBuckets>,
    pub resources: Option<Resources>,
    pub spellcasting: Option<Spellcasting>,
}

impl NormalizedFields {
    /// Structural merge: every field set in `patch` replaces the current one.
    pub fn merge(&mut self, patch: NormalizedFields) {
        fn apply<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }

        apply(&mut self.name, patch.name);
        apply(&mut self.size, patch.size);
        apply(&mut self.creature_type, patch.creature_type);
        apply(&mut self.alignment, patch.alignment);
        apply(&mut self.challenge, patch.challenge);
        apply(&mut self.proficiency, patch.proficiency);
        apply(&mut self.abilities, patch.abilities);
        apply(&mut self.skills, patch.skills);
        apply(&mut self.armor_class, patch.armor_class);
        apply(&mut self.hit_points, patch.hit_points);
        apply(&mut self.movement, patch.movement);
        apply(&mut self.senses, patch.senses);
        apply(&mut self.damage_modifiers, patch.damage_modifiers);
        apply(&mut self.languages, patch.languages);
        apply(&mut self.resources, patch.resources);
        apply(&mut self.spellcasting, patch.spellcasting);
    }

    /// Proficiency bonus, falling back to the challenge-derived value.
    pub fn proficiency_bonus(&self) -> i32 {
        self.proficiency.unwrap_or_else(|| {
            proficiency_for_challenge(self.challenge.map(|c| c.cr).unwrap_or(0.0))
        })
    }
}

// ============================================================================
// Normalizer
// ============================================================================

/// Run every normalisation step over extracted fields and passive features.
pub fn normalize(
    fields: &ExtractedFields,
    features: &[AbilityEntry],
    taxonomies: &Taxonomies,
    config: &ImportConfig,
) -> NormalizedFields {
    let mut normalized = NormalizedFields::default();
    normalized.merge(identity_patch(fields, taxonomies));
    normalized.merge(combat_patch(fields));
    normalized.merge(ability_patch(fields));

    let proficiency = normalized.proficiency_bonus();
    let abilities = normalized.abilities.clone().unwrap_or_default();
    normalized.merge(NormalizedFields {
        skills: Some(normalize_skills(
            &fields.skills,
            &abilities,
            proficiency,
            taxonomies,
            config.half_proficiency,
        )),
        ..Default::default()
    });

    normalized.merge(trait_patch(fields, taxonomies));
    normalized.merge(NormalizedFields {
        resources: Some(resources(fields, features, config.default_legendary_actions)),
        spellcasting: Some(spellcasting(features)),
        ..Default::default()
    });

    normalized
}

fn identity_patch(fields: &ExtractedFields, taxonomies: &Taxonomies) -> NormalizedFields {
    let identity = &fields.identity;
    NormalizedFields {
        name: Some(identity.name.clone()),
        size: identity.size.as_deref().and_then(|label| {
            let key = taxonomies.sizes.resolve(label);
            if key.is_none() {
                debug!(size = label, "unrecognised size, leaving default");
            }
            key.map(str::to_string)
        }),
        creature_type: identity
            .creature_type
            .as_deref()
            .map(|label| creature_type(label, &identity.subtype, taxonomies)),
        alignment: Some(identity.alignment.clone()),
        ..Default::default()
    }
}

fn combat_patch(fields: &ExtractedFields) -> NormalizedFields {
    NormalizedFields {
        challenge: Some(fields.challenge),
        proficiency: Some(proficiency_for_challenge(fields.challenge.cr)),
        armor_class: Some(ArmorClass {
            flat: fields.armor_class,
            ..ArmorClass::default()
        }),
        hit_points: Some(fields.hit_points.clone()),
        movement: Some(fields.movement.clone()),
        senses: Some(fields.senses.clone()),
        ..Default::default()
    }
}

fn ability_patch(fields: &ExtractedFields) -> NormalizedFields {
    let mut scores = AbilityScores::default();
    for (key, value) in &fields.ability_scores {
        scores.set(
            *key,
            AbilityScore {
                value: *value,
                proficient: fields.saving_throws.contains(key),
            },
        );
    }
    NormalizedFields {
        abilities: Some(scores),
        ..Default::default()
    }
}

fn trait_patch(fields: &ExtractedFields, taxonomies: &Taxonomies) -> NormalizedFields {
    let damage = &fields.damage;
    NormalizedFields {
        damage_modifiers: Some(DamageModifiers {
            dr: bucket_labels(&damage.resistances, &taxonomies.damage_types),
            di: bucket_labels(&damage.immunities, &taxonomies.damage_types),
            dv: bucket_labels(&damage.vulnerabilities, &taxonomies.damage_types),
            ci: bucket_labels(&damage.condition_immunities, &taxonomies.conditions),
        }),
        languages: Some(normalize_languages(
            &fields.languages,
            fields.telepathy,
            &taxonomies.languages,
        )),
        ..Default::default()
    }
}

/// Creature type key, or the verbatim label in `custom` when unrecognised.
pub fn creature_type(label: &str, subtype: &str, taxonomies: &Taxonomies) -> CreatureType {
    match taxonomies.creature_types.resolve(label) {
        Some(key) => CreatureType {
            value: key.to_string(),
            subtype: subtype.to_string(),
            custom: String::new(),
        },
        None => {
            debug!(creature_type = label, "unrecognised creature type, keeping as custom");
            CreatureType {
                value: String::new(),
                subtype: subtype.to_string(),
                custom: label.trim().to_string(),
            }
        }
    }
}

// ============================================================================
// Label Buckets
// ============================================================================

/// Split labels into recognised keys (deduplicated, first-seen order) and a
/// `;`-joined verbatim overflow.
pub fn bucket_labels<S: AsRef<str>>(labels: &[S], table: &Taxonomy) -> LabelBuckets {
    let mut value: Vec<String> = Vec::new();
    let mut custom: Vec<&str> = Vec::new();

    for label in labels {
        let label = label.as_ref().trim();
        if label.is_empty() {
            continue;
        }
        match table.resolve(label) {
            Some(key) => {
                if !value.iter().any(|k| k == key) {
                    value.push(key.to_string());
                }
            }
            None => custom.push(label),
        }
    }

    LabelBuckets {
        value,
        custom: custom.join(CUSTOM_SEPARATOR),
    }
}

/// Languages with telepathy folded into the overflow as "Telepathy N ft".
/// The explicit telepathy range wins over a number embedded in a label.
pub fn normalize_languages<S: AsRef<str>>(
    labels: &[S],
    telepathy: u32,
    table: &Taxonomy,
) -> LabelBuckets {
    let mut spoken: Vec<&str> = Vec::new();
    let mut mentioned_range = None;

    for label in labels {
        let label = label.as_ref().trim();
        match TELEPATHY_PATTERN.captures(label) {
            Some(caps) => match caps.name("range").and_then(|m| m.as_str().parse::<u32>().ok()) {
                Some(range) => {
                    mentioned_range.get_or_insert(range);
                }
                None if telepathy > 0 => {}
                None => spoken.push(label),
            },
            None => spoken.push(label),
        }
    }

    let mut buckets = bucket_labels(&spoken, table);
    let range = if telepathy > 0 { Some(telepathy) } else { mentioned_range };
    if let Some(range) = range.filter(|r| *r > 0) {
        let entry = format!("Telepathy {range} ft");
        if buckets.custom.is_empty() {
            buckets.custom = entry;
        } else {
            buckets.custom = format!("{}{CUSTOM_SEPARATOR}{entry}", buckets.custom);
        }
    }
    buckets
}

// ============================================================================
// Skills
// ============================================================================

/// Proficiency multiplier for one skill.
///
/// With a stated bonus the multiplier is `(bonus - ability modifier) /
/// proficiency`, bucketed to 0, 0.5, 1 or 2. Without one, expertise means 2
/// and a plain listing means 1.
pub fn skill_multiplier(
    skill: &RawSkill,
    ability_modifier: i32,
    proficiency: i32,
    half_proficiency: bool,
) -> f32 {
    let Some(bonus) = skill.bonus.filter(|_| proficiency > 0) else {
        return if skill.expertise { 2.0 } else { 1.0 };
    };

    let multiplier = (bonus - ability_modifier as f64) / proficiency as f64;
    if multiplier <= 0.0 {
        0.0
    } else if multiplier < 1.0 {
        if half_proficiency {
            0.5
        } else {
            1.0
        }
    } else if multiplier < 1.5 {
        1.0
    } else {
        2.0
    }
}

/// Resolve skills against the taxonomy. Unknown skill names are dropped with
/// a warning since the record has no overflow slot for them.
pub fn normalize_skills(
    skills: &[RawSkill],
    abilities: &AbilityScores,
    proficiency: i32,
    taxonomies: &Taxonomies,
    half_proficiency: bool,
) -> BTreeMap<String, NormalizedSkill> {
    let mut resolved = BTreeMap::new();
    for skill in skills {
        let Some(definition) = taxonomies.skill(&skill.label) else {
            warn!(skill = %skill.label, "unrecognised skill, skipping");
            continue;
        };
        let value = skill_multiplier(
            skill,
            abilities.modifier(definition.ability),
            proficiency,
            half_proficiency,
        );
        debug!(skill = definition.key, value, "resolved skill proficiency");
        resolved.insert(
            definition.key.to_string(),
            NormalizedSkill {
                value,
                ability: Some(definition.ability),
            },
        );
    }
    resolved
}

// ============================================================================
// Resources
// ============================================================================

/// First "Legendary Resistance (N/Day)" among passive features, checking
/// each feature's name before its description. Later mentions are ignored.
pub fn legendary_resistance(features: &[AbilityEntry]) -> Option<u32> {
    features.iter().find_map(|feature| {
        let (name, desc) = feature.parts()?;
        parse_legendary_resistance(name).or_else(|| parse_legendary_resistance(desc))
    })
}

/// Legendary action and resistance pools.
pub fn resources(
    fields: &ExtractedFields,
    features: &[AbilityEntry],
    default_legendary_actions: u32,
) -> Resources {
    let legact = fields.legendary.then(|| {
        let count = fields.legendary_actions.unwrap_or_else(|| {
            debug!(
                default = default_legendary_actions,
                "legendary action count not stated, using default"
            );
            default_legendary_actions
        });
        ResourcePool::full(count)
    });

    Resources {
        legact,
        legres: legendary_resistance(features).map(ResourcePool::full),
    }
}

// ============================================================================
// Spellcasting
// ============================================================================

/// Spellcasting from the first passive feature that declares slots, or
/// ability-only from the first innate casting feature.
pub fn spellcasting(features: &[AbilityEntry]) -> Spellcasting {
    let descriptions: Vec<&str> = features
        .iter()
        .filter_map(|feature| feature.parts().map(|(_, desc)| desc))
        .collect();

    if let Some(desc) = descriptions.iter().find(|desc| declares_spell_slots(desc)) {
        let block = parse_spellcasting(desc);
        let mut slots = SpellSlotTable::default();
        for (level, count) in &block.slots {
            slots.merge(*level, *count);
        }
        debug!(level = ?block.level, slot_levels = slots.len(), "parsed spellcasting block");
        return Spellcasting {
            ability: caster_ability(block.ability.as_deref()),
            level: block.level,
            slots,
        };
    }

    if let Some(desc) = descriptions
        .iter()
        .find(|desc| declares_spellcasting_ability(desc))
    {
        let block = parse_spellcasting(desc);
        return Spellcasting {
            ability: caster_ability(block.ability.as_deref()),
            ..Spellcasting::default()
        };
    }

    Spellcasting::default()
}

fn caster_ability(label: Option<&str>) -> String {
    label
        .and_then(AbilityKey::resolve)
        .map(|key| key.key().to_string())
        .unwrap_or_default()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::statblock::fields::extract;
    use crate::ingestion::statblock::input::StatBlockInput;

    fn tax() -> &'static Taxonomies {
        Taxonomies::dnd5e()
    }

    fn skill(label: &str, expertise: bool, bonus: Option<f64>) -> RawSkill {
        RawSkill {
            label: label.to_string(),
            expertise,
            bonus,
        }
    }

    // ========================================================================
    // Buckets
    // ========================================================================

    #[test]
    fn test_bucket_labels_splits_and_dedups() {
        let buckets = bucket_labels(
            &["Fire", "fire", "COLD", "bludgeoning from nonmagical attacks", "  "],
            &tax().damage_types,
        );
        assert_eq!(buckets.value, vec!["fire", "cold"]);
        assert_eq!(buckets.custom, "bludgeoning from nonmagical attacks");
    }

    #[test]
    fn test_bucket_labels_joins_overflow() {
        let buckets = bucket_labels(&["Sahuagin", "Common", "Ixitxachitl"], &tax().languages);
        assert_eq!(buckets.value, vec!["common"]);
        assert_eq!(buckets.custom, "Sahuagin;Ixitxachitl");
    }

    #[test]
    fn test_languages_with_telepathy_field() {
        let buckets = normalize_languages(&["Common", "Draconic", "Telepathy 60"], 60, &tax().languages);
        assert_eq!(buckets.value, vec!["common", "draconic"]);
        assert_eq!(buckets.custom, "Telepathy 60 ft");
    }

    #[test]
    fn test_languages_telepathy_from_label_only() {
        let buckets = normalize_languages(&["Deep Speech", "telepathy 120 ft."], 0, &tax().languages);
        assert_eq!(buckets.value, vec!["deep"]);
        assert_eq!(buckets.custom, "Telepathy 120 ft");
    }

    #[test]
    fn test_languages_telepathy_field_appends_after_custom() {
        let buckets = normalize_languages(&["Sahuagin"], 30, &tax().languages);
        assert_eq!(buckets.custom, "Sahuagin;Telepathy 30 ft");
    }

    #[test]
    fn test_bare_telepathy_label_is_not_lost() {
        let buckets = normalize_languages(&["Telepathy"], 0, &tax().languages);
        assert_eq!(buckets.custom, "Telepathy");
    }

    #[test]
    fn test_creature_type_custom() {
        let known = creature_type("Dragon", "", tax());
        assert_eq!(known.value, "dragon");
        assert!(known.custom.is_empty());

        let unknown = creature_type("Swarm of Tiny beasts", "", tax());
        assert_eq!(unknown.value, "");
        assert_eq!(unknown.custom, "Swarm of Tiny beasts");
    }

    // ========================================================================
    // Skills
    // ========================================================================

    #[test]
    fn test_skill_multiplier_from_note() {
        assert_eq!(skill_multiplier(&skill("stealth", true, None), 2, 2, true), 2.0);
        assert_eq!(skill_multiplier(&skill("stealth", false, None), 2, 2, true), 1.0);
    }

    #[test]
    fn test_skill_multiplier_from_bonus() {
        // +2 dex, +4 proficiency
        assert_eq!(skill_multiplier(&skill("stealth", false, Some(2.0)), 2, 4, true), 0.0);
        assert_eq!(skill_multiplier(&skill("stealth", false, Some(4.0)), 2, 4, true), 0.5);
        assert_eq!(skill_multiplier(&skill("stealth", false, Some(4.0)), 2, 4, false), 1.0);
        assert_eq!(skill_multiplier(&skill("stealth", false, Some(6.0)), 2, 4, true), 1.0);
        assert_eq!(skill_multiplier(&skill("stealth", false, Some(10.0)), 2, 4, true), 2.0);
    }

    #[test]
    fn test_normalize_skills_resolves_and_drops_unknown() {
        let mut scores = AbilityScores::default();
        scores.set(AbilityKey::Wis, AbilityScore { value: 14, proficient: false });
        let skills = normalize_skills(
            &[skill("perception", false, Some(6.0)), skill("basket weaving", false, None)],
            &scores,
            2,
            tax(),
            true,
        );
        assert_eq!(skills.len(), 1);
        let prc = skills["prc"];
        assert_eq!(prc.value, 2.0);
        assert_eq!(prc.ability, Some(AbilityKey::Wis));
    }

    // ========================================================================
    // Resources / spellcasting
    // ========================================================================

    #[test]
    fn test_legendary_resistance_first_match_wins() {
        let features = vec![
            AbilityEntry::new("Amphibious", "The dragon can breathe air and water."),
            AbilityEntry::new("Legendary Resistance (3/Day)", "If the dragon fails a saving throw..."),
            AbilityEntry::new("Legendary Resistance (5/Day)", "Later duplicate."),
        ];
        assert_eq!(legendary_resistance(&features), Some(3));
    }

    #[test]
    fn test_legendary_resistance_in_description() {
        let features = vec![AbilityEntry::new(
            "Resilience",
            "The lich has Legendary Resistance (2/Day) against spells.",
        )];
        assert_eq!(legendary_resistance(&features), Some(2));
    }

    #[test]
    fn test_resources_default_count_when_legendary() {
        let input = StatBlockInput::from_json(r#"{"isLegendary": true}"#).unwrap();
        let fields = extract(&input);
        let resources = resources(&fields, &[], 3);
        assert_eq!(resources.legact, Some(ResourcePool::full(3)));
        assert_eq!(resources.legres, None);

        let input = StatBlockInput::from_json("{}").unwrap();
        assert_eq!(resources_of(&input), Resources::default());
    }

    fn resources_of(input: &StatBlockInput) -> Resources {
        resources(&extract(input), &input.abilities, 3)
    }

    #[test]
    fn test_spellcasting_from_slot_feature() {
        let features = vec![
            AbilityEntry::new(
                "Innate Spellcasting",
                "The mage's innate spellcasting ability is Charisma.",
            ),
            AbilityEntry::new(
                "Spellcasting",
                "The mage is a 9th-level spellcaster. Its spellcasting ability is Intelligence. \
                 1st level (4 slots): magic missile\n2nd level (3 slots): misty step",
            ),
        ];
        let casting = spellcasting(&features);
        assert_eq!(casting.ability, "int");
        assert_eq!(casting.level, Some(9));
        assert_eq!(casting.slots.get(1).unwrap().value, 4);
        assert_eq!(casting.slots.get(2).unwrap().max, 3);
    }

    #[test]
    fn test_spellcasting_innate_only() {
        let features = vec![AbilityEntry::new(
            "Innate Spellcasting",
            "The djinni's innate spellcasting ability is Charisma (spell save DC 17).",
        )];
        let casting = spellcasting(&features);
        assert_eq!(casting.ability, "cha");
        assert_eq!(casting.level, None);
        assert!(casting.slots.is_empty());
    }

    // ========================================================================
    // Merge
    // ========================================================================

    #[test]
    fn test_merge_overrides_only_set_fields() {
        let mut base = NormalizedFields {
            name: Some("Goblin".into()),
            alignment: Some("neutral evil".into()),
            ..Default::default()
        };
        base.merge(NormalizedFields {
            name: Some("Goblin Boss".into()),
            ..Default::default()
        });
        assert_eq!(base.name.as_deref(), Some("Goblin Boss"));
        assert_eq!(base.alignment.as_deref(), Some("neutral evil"));
    }

    #[test]
    fn test_normalize_end_to_end() {
        let input = StatBlockInput::from_json(
            r#"{
                "name": "Young Green Dragon",
                "size": "Large",
                "type": "dragon",
                "cr": "8",
                "dexPoints": 12,
                "wisPoints": 13,
                "sthrows": ["dex", "wis"],
                "skills": [{"name": "perception", "note": " (ex)"}],
                "damagetypes": [{"name": "poison", "type": "i"}],
                "conditions": [{"name": "poisoned"}],
                "languages": "Common, Draconic"
            }"#,
        )
        .unwrap();
        let fields = extract(&input);
        let normalized = normalize(&fields, &input.abilities, tax(), &ImportConfig::default());

        assert_eq!(normalized.size.as_deref(), Some("lg"));
        assert_eq!(normalized.proficiency, Some(3));
        let abilities = normalized.abilities.as_ref().unwrap();
        assert!(abilities.get(AbilityKey::Dex).proficient);
        assert!(!abilities.get(AbilityKey::Str).proficient);
        assert_eq!(normalized.skills.as_ref().unwrap()["prc"].value, 2.0);
        let modifiers = normalized.damage_modifiers.as_ref().unwrap();
        assert_eq!(modifiers.di.value, vec!["poison"]);
        assert_eq!(modifiers.ci.value, vec!["poisoned"]);
        assert_eq!(normalized.languages.as_ref().unwrap().value, vec!["common", "draconic"]);
        assert!(normalized.resources.as_ref().unwrap().legact.is_none());
    }
}
