//! Data Model Builder
//!
//! Pure assembly of a [`CreatureRecord`] from [`NormalizedFields`]. The only
//! decisions made here are default substitutions for fields no normalisation
//! step set.

use tracing::debug;

use super::fields::DEFAULT_NAME;
use super::normalizer::NormalizedFields;
use super::record::{CreatureRecord, SkillProficiency};
use super::taxonomy::Taxonomies;

/// Size key used when the source size is missing or unrecognised.
pub const DEFAULT_SIZE: &str = "med";

/// Assembles creature records.
#[derive(Debug, Clone, Copy)]
pub struct CreatureRecordBuilder {
    taxonomies: &'static Taxonomies,
}

impl CreatureRecordBuilder {
    pub fn new(taxonomies: &'static Taxonomies) -> Self {
        Self { taxonomies }
    }

    pub fn build(&self, fields: NormalizedFields) -> CreatureRecord {
        let proficiency = fields.proficiency_bonus();

        let skills = fields
            .skills
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(key, skill)| {
                let ability = skill
                    .ability
                    .or_else(|| self.taxonomies.skill_by_key(&key).map(|def| def.ability))?;
                Some((key, SkillProficiency { value: skill.value, ability }))
            })
            .collect();

        let size = fields.size.unwrap_or_else(|| {
            debug!(default = DEFAULT_SIZE, "size not set, using default");
            DEFAULT_SIZE.to_string()
        });

        CreatureRecord {
            name: fields.name.unwrap_or_else(|| DEFAULT_NAME.to_string()),
            size,
            creature_type: fields.creature_type.unwrap_or_default(),
            alignment: fields.alignment.unwrap_or_default(),
            challenge: fields.challenge.unwrap_or_default(),
            proficiency,
            abilities: fields.abilities.unwrap_or_default(),
            skills,
            armor_class: fields.armor_class.unwrap_or_default(),
            hit_points: fields.hit_points.unwrap_or_default(),
            movement: fields.movement.unwrap_or_default(),
            senses: fields.senses.unwrap_or_default(),
            damage_modifiers: fields.damage_modifiers.unwrap_or_default(),
            languages: fields.languages.unwrap_or_default(),
            resources: fields.resources.unwrap_or_default(),
            spellcasting: fields.spellcasting.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::ingestion::statblock::normalizer::NormalizedSkill;
    use crate::ingestion::statblock::record::{Challenge, HitPoints};
    use crate::ingestion::statblock::taxonomy::AbilityKey;

    fn builder() -> CreatureRecordBuilder {
        CreatureRecordBuilder::new(Taxonomies::dnd5e())
    }

    #[test]
    fn test_empty_fields_build_defaults() {
        let record = builder().build(NormalizedFields::default());
        assert_eq!(record.name, "Unnamed Creature");
        assert_eq!(record.size, "med");
        assert_eq!(record.armor_class.flat, 10);
        assert_eq!(record.armor_class.calc, "flat");
        assert_eq!(record.hit_points, HitPoints::default());
        assert_eq!(record.movement.walk, 30);
        assert_eq!(record.proficiency, 2);
        assert_eq!(record.abilities.get(AbilityKey::Con).value, 10);
        assert!(record.resources.legact.is_none());
        assert!(record.spellcasting.slots.is_empty());
    }

    #[test]
    fn test_skill_ability_filled_from_taxonomy() {
        let mut skills = BTreeMap::new();
        skills.insert("ath".to_string(), NormalizedSkill { value: 1.0, ability: None });
        skills.insert("ste".to_string(), NormalizedSkill { value: 2.0, ability: Some(AbilityKey::Str) });

        let record = builder().build(NormalizedFields {
            skills: Some(skills),
            ..Default::default()
        });
        assert_eq!(record.skills["ath"].ability, AbilityKey::Str);
        assert_eq!(record.skills["ste"].ability, AbilityKey::Str);
        assert_eq!(record.skills["ste"].value, 2.0);
    }

    #[test]
    fn test_proficiency_derived_from_challenge_when_unset() {
        let record = builder().build(NormalizedFields {
            challenge: Some(Challenge { cr: 13.0, xp: 10_000 }),
            ..Default::default()
        });
        assert_eq!(record.proficiency, 5);
        assert_eq!(record.challenge.xp, 10_000);
    }
}
