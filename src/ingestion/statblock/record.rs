//! Canonical Record Types
//!
//! [`CreatureRecord`] is the normalized creature handed to the entity store;
//! [`ActionRecord`] is one derived item per ability entry; and
//! [`SpellUseDeclaration`] is a bare spell name awaiting catalog resolution.
//! All three are built once per import and never mutated afterwards.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::taxonomy::AbilityKey;

// ============================================================================
// Creature
// ============================================================================

/// The canonical creature record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatureRecord {
    pub name: String,
    /// Size key ("tiny", "sm", "med", ...).
    pub size: String,
    pub creature_type: CreatureType,
    pub alignment: String,
    pub challenge: Challenge,
    pub proficiency: i32,
    pub abilities: AbilityScores,
    pub skills: BTreeMap<String, SkillProficiency>,
    pub armor_class: ArmorClass,
    pub hit_points: HitPoints,
    pub movement: Movement,
    pub senses: Senses,
    pub damage_modifiers: DamageModifiers,
    pub languages: LabelBuckets,
    pub resources: Resources,
    pub spellcasting: Spellcasting,
}

/// Creature type key (empty when unrecognised) plus subtype and overflow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatureType {
    pub value: String,
    pub subtype: String,
    pub custom: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    pub cr: f64,
    pub xp: u32,
}

/// One ability score with its saving throw proficiency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityScore {
    pub value: i32,
    pub proficient: bool,
}

impl Default for AbilityScore {
    fn default() -> Self {
        Self {
            value: 10,
            proficient: false,
        }
    }
}

impl AbilityScore {
    /// D&D modifier: floor((score - 10) / 2).
    pub fn modifier(&self) -> i32 {
        ability_modifier(self.value)
    }
}

/// D&D modifier formula, flooring for odd scores below 10.
pub fn ability_modifier(score: i32) -> i32 {
    score.saturating_sub(10).div_euclid(2)
}

/// The six ability scores, always fully populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AbilityScores(BTreeMap<AbilityKey, AbilityScore>);

impl Default for AbilityScores {
    fn default() -> Self {
        Self(AbilityKey::ALL.into_iter().map(|k| (k, AbilityScore::default())).collect())
    }
}

impl AbilityScores {
    pub fn get(&self, key: AbilityKey) -> AbilityScore {
        self.0.get(&key).copied().unwrap_or_default()
    }

    pub fn set(&mut self, key: AbilityKey, score: AbilityScore) {
        self.0.insert(key, score);
    }

    pub fn modifier(&self, key: AbilityKey) -> i32 {
        self.get(key).modifier()
    }

    /// Abilities whose modifier equals `modifier`, in stat block order.
    pub fn with_modifier(&self, modifier: i32) -> Vec<AbilityKey> {
        AbilityKey::ALL
            .into_iter()
            .filter(|k| self.modifier(*k) == modifier)
            .collect()
    }
}

/// Skill proficiency multiplier (0, 0.5, 1 or 2) and governing ability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkillProficiency {
    pub value: f32,
    pub ability: AbilityKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmorClass {
    pub flat: i32,
    pub calc: String,
}

impl Default for ArmorClass {
    fn default() -> Self {
        Self {
            flat: 10,
            calc: "flat".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitPoints {
    pub value: i32,
    pub max: i32,
    /// A validated roll formula or an empty string.
    pub formula: String,
}

impl Default for HitPoints {
    fn default() -> Self {
        Self {
            value: 10,
            max: 10,
            formula: String::new(),
        }
    }
}

/// Movement speeds in feet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub walk: u32,
    pub burrow: u32,
    pub climb: u32,
    pub fly: u32,
    pub swim: u32,
    pub hover: bool,
    pub units: String,
}

impl Default for Movement {
    fn default() -> Self {
        Self {
            walk: 30,
            burrow: 0,
            climb: 0,
            fly: 0,
            swim: 0,
            hover: false,
            units: "ft".to_string(),
        }
    }
}

/// Sense radii in feet; `range` is the base vision range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Senses {
    pub blindsight: u32,
    pub darkvision: u32,
    pub tremorsense: u32,
    pub truesight: u32,
    pub range: u32,
    pub units: String,
}

impl Default for Senses {
    fn default() -> Self {
        Self {
            blindsight: 0,
            darkvision: 0,
            tremorsense: 0,
            truesight: 0,
            range: 0,
            units: "ft".to_string(),
        }
    }
}

/// Recognised canonical keys plus verbatim overflow joined with ";".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelBuckets {
    pub value: Vec<String>,
    pub custom: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageModifiers {
    /// Damage resistances
    pub dr: LabelBuckets,
    /// Damage immunities
    pub di: LabelBuckets,
    /// Damage vulnerabilities
    pub dv: LabelBuckets,
    /// Condition immunities
    pub ci: LabelBuckets,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePool {
    pub value: u32,
    pub max: u32,
}

impl ResourcePool {
    pub fn full(amount: u32) -> Self {
        Self {
            value: amount,
            max: amount,
        }
    }
}

/// Legendary resources; absent unless the source signals legendary status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legact: Option<ResourcePool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legres: Option<ResourcePool>,
}

// ============================================================================
// Spellcasting
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellSlot {
    pub value: u32,
    pub max: u32,
    #[serde(rename = "override", skip_serializing_if = "Option::is_none")]
    pub override_value: Option<u32>,
}

/// Spell slots keyed by spell level (1–9).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpellSlotTable(BTreeMap<u8, SpellSlot>);

impl SpellSlotTable {
    /// Merge one textual slot mention. The stored value only ever grows; the
    /// override marker is set when a later mention changes the stored value.
    pub fn merge(&mut self, level: u8, count: u32) {
        match self.0.get_mut(&level) {
            None => {
                self.0.insert(
                    level,
                    SpellSlot {
                        value: count,
                        max: count,
                        override_value: None,
                    },
                );
            }
            Some(slot) => {
                let merged = slot.value.max(count);
                if merged != slot.value {
                    slot.value = merged;
                    slot.max = merged;
                    slot.override_value = Some(merged);
                }
            }
        }
    }

    pub fn get(&self, level: u8) -> Option<&SpellSlot> {
        self.0.get(&level)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spellcasting {
    /// Governing ability key, or empty.
    pub ability: String,
    pub level: Option<u32>,
    pub slots: SpellSlotTable,
}

// ============================================================================
// Actions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionCategory {
    Passive,
    Action,
    BonusAction,
    Reaction,
    Legendary,
}

/// Inferred attack/effect classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionType {
    MeleeWeapon,
    RangedWeapon,
    MeleeSpell,
    RangedSpell,
    SavingThrow,
    Other,
    None,
}

/// Item kind the entity store should create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Weapon,
    Feat,
}

/// One damage entry. `formula` carries "+ @mod" only when the source stated a
/// flat modifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamagePart {
    pub formula: String,
    pub damage_type: String,
    pub modifier: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveBlock {
    pub dc: u32,
    pub ability: Option<AbilityKey>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeUnits {
    Ft,
    #[serde(rename = "self")]
    Own,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeBlock {
    pub value: Option<u32>,
    pub long: Option<u32>,
    pub units: Option<RangeUnits>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AreaShape {
    Line,
    Cone,
    Cube,
    Sphere,
}

impl AreaShape {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "line" => Some(AreaShape::Line),
            "cone" => Some(AreaShape::Cone),
            "cube" => Some(AreaShape::Cube),
            "sphere" => Some(AreaShape::Sphere),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetBlock {
    pub shape: Option<AreaShape>,
    pub value: Option<u32>,
    /// Only set for line shapes.
    pub width: Option<u32>,
    pub units: Option<RangeUnits>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recharge {
    /// Lowest d6 roll that recharges the ability (1–6).
    pub threshold: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsePeriod {
    Day,
    Lr,
    Sr,
    Charges,
}

impl UsePeriod {
    /// Map a period synonym; anything unknown becomes a charges counter.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "day" | "days" => UsePeriod::Day,
            "long rest" | "lr" => UsePeriod::Lr,
            "short rest" | "sr" => UsePeriod::Sr,
            _ => UsePeriod::Charges,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitedUses {
    pub count: u32,
    pub period: UsePeriod,
}

/// Which ability drives an action's numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum GoverningAbility {
    /// Nothing to infer from (no to-hit bonus, no damage modifier).
    Default,
    /// Exactly one ability matched.
    Ability { key: AbilityKey },
    /// No unique match; `attack_bonus` is the flat bonus beyond proficiency.
    None { attack_bonus: String },
}

/// One derived item per ability entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub name: String,
    pub description: String,
    pub category: ActionCategory,
    pub kind: ItemKind,
    /// Legendary action cost; `None` outside the legendary category.
    pub cost: Option<u32>,
    pub damage: Vec<DamagePart>,
    pub save: Option<SaveBlock>,
    pub to_hit: Option<i32>,
    pub range: RangeBlock,
    pub target: TargetBlock,
    pub recharge: Option<Recharge>,
    pub uses: Option<LimitedUses>,
    pub action_type: ActionType,
    pub ability: GoverningAbility,
}

// ============================================================================
// Spell declarations
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum SpellUsage {
    /// Leveled or cantrip (level 0) list entry.
    Slot { level: u8 },
    AtWill,
    PerPeriod { count: u32, period: UsePeriod },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellUseDeclaration {
    pub name: String,
    pub usage: SpellUsage,
}

impl SpellUseDeclaration {
    pub fn new(name: impl Into<String>, usage: SpellUsage) -> Self {
        Self {
            name: name.into(),
            usage,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ability_modifier() {
        assert_eq!(ability_modifier(10), 0);
        assert_eq!(ability_modifier(11), 0);
        assert_eq!(ability_modifier(9), -1);
        assert_eq!(ability_modifier(8), -1);
        assert_eq!(ability_modifier(14), 2);
        assert_eq!(ability_modifier(20), 5);
        assert_eq!(ability_modifier(1), -5);
        assert_eq!(ability_modifier(i32::MIN), i32::MIN / 2);
        assert_eq!(ability_modifier(i32::MAX), (i32::MAX - 10) / 2);
    }

    #[test]
    fn test_with_modifier_lists_ties_in_order() {
        let mut scores = AbilityScores::default();
        scores.set(AbilityKey::Str, AbilityScore { value: 14, proficient: false });
        scores.set(AbilityKey::Wis, AbilityScore { value: 15, proficient: false });
        assert_eq!(scores.with_modifier(2), vec![AbilityKey::Str, AbilityKey::Wis]);
        assert_eq!(scores.with_modifier(0).len(), 4);
    }

    #[test]
    fn test_spell_slot_merge_keeps_maximum() {
        let mut slots = SpellSlotTable::default();
        slots.merge(1, 4);
        assert_eq!(slots.get(1), Some(&SpellSlot { value: 4, max: 4, override_value: None }));

        slots.merge(1, 4);
        assert_eq!(slots.get(1).unwrap().override_value, None);

        slots.merge(1, 2);
        assert_eq!(slots.get(1).unwrap().value, 4);
        assert_eq!(slots.get(1).unwrap().override_value, None);

        slots.merge(1, 5);
        assert_eq!(slots.get(1), Some(&SpellSlot { value: 5, max: 5, override_value: Some(5) }));
    }

    #[test]
    fn test_use_period_synonyms() {
        assert_eq!(UsePeriod::from_label("Day"), UsePeriod::Day);
        assert_eq!(UsePeriod::from_label("Long Rest"), UsePeriod::Lr);
        assert_eq!(UsePeriod::from_label("LR"), UsePeriod::Lr);
        assert_eq!(UsePeriod::from_label("short rest"), UsePeriod::Sr);
        assert_eq!(UsePeriod::from_label("Turn"), UsePeriod::Charges);
    }

    #[test]
    fn test_category_serialization() {
        let json = serde_json::to_string(&ActionCategory::BonusAction).unwrap();
        assert_eq!(json, "\"bonus-action\"");
        let json = serde_json::to_string(&ActionType::MeleeWeapon).unwrap();
        assert_eq!(json, "\"melee-weapon\"");
    }

    #[test]
    fn test_governing_ability_serialization() {
        let none = GoverningAbility::None { attack_bonus: "3".into() };
        let json = serde_json::to_value(&none).unwrap();
        assert_eq!(json["kind"], "none");
        assert_eq!(json["attack_bonus"], "3");
    }
}
