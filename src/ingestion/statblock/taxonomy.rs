//! Taxonomy Tables
//!
//! Static bidirectional mappings between canonical keys and the
//! human-readable labels used in D&D 5e stat blocks: ability scores, skills,
//! sizes, creature types, damage types, conditions and languages.
//!
//! The tables are loaded once into a process-wide [`Taxonomies`] value and
//! handed to every component by shared reference.

use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

// ============================================================================
// Ability Scores
// ============================================================================

/// One of the six ability scores, keyed the way the entity store expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbilityKey {
    Str,
    Dex,
    Con,
    Int,
    Wis,
    Cha,
}

impl AbilityKey {
    /// All abilities in stat block order.
    pub const ALL: [AbilityKey; 6] = [
        AbilityKey::Str,
        AbilityKey::Dex,
        AbilityKey::Con,
        AbilityKey::Int,
        AbilityKey::Wis,
        AbilityKey::Cha,
    ];

    /// Canonical key ("str", "dex", ...).
    pub fn key(self) -> &'static str {
        match self {
            AbilityKey::Str => "str",
            AbilityKey::Dex => "dex",
            AbilityKey::Con => "con",
            AbilityKey::Int => "int",
            AbilityKey::Wis => "wis",
            AbilityKey::Cha => "cha",
        }
    }

    /// Human-readable label ("Strength", ...).
    pub fn label(self) -> &'static str {
        match self {
            AbilityKey::Str => "Strength",
            AbilityKey::Dex => "Dexterity",
            AbilityKey::Con => "Constitution",
            AbilityKey::Int => "Intelligence",
            AbilityKey::Wis => "Wisdom",
            AbilityKey::Cha => "Charisma",
        }
    }

    /// Resolve a key or label, case-insensitively.
    pub fn resolve(text: &str) -> Option<Self> {
        let needle = text.trim();
        Self::ALL.into_iter().find(|ability| {
            needle.eq_ignore_ascii_case(ability.key()) || needle.eq_ignore_ascii_case(ability.label())
        })
    }
}

impl fmt::Display for AbilityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

// ============================================================================
// Generic key/label table
// ============================================================================

/// A closed key ↔ label table.
#[derive(Debug, Clone, Copy)]
pub struct Taxonomy {
    entries: &'static [(&'static str, &'static str)],
}

impl Taxonomy {
    pub const fn new(entries: &'static [(&'static str, &'static str)]) -> Self {
        Self { entries }
    }

    /// Exact, case-insensitive match against the label side.
    pub fn key_for_label(&self, label: &str) -> Option<&'static str> {
        let needle = label.trim();
        self.entries
            .iter()
            .find(|(_, l)| needle.eq_ignore_ascii_case(l))
            .map(|(k, _)| *k)
    }

    /// Label match first, then key match.
    pub fn resolve(&self, text: &str) -> Option<&'static str> {
        self.key_for_label(text).or_else(|| {
            let needle = text.trim();
            self.entries
                .iter()
                .find(|(k, _)| needle.eq_ignore_ascii_case(k))
                .map(|(k, _)| *k)
        })
    }

    pub fn entries(&self) -> &'static [(&'static str, &'static str)] {
        self.entries
    }
}

// ============================================================================
// Skills
// ============================================================================

/// A skill with its governing ability.
#[derive(Debug, Clone, Copy)]
pub struct SkillDefinition {
    pub key: &'static str,
    pub label: &'static str,
    pub ability: AbilityKey,
}

const SKILLS: &[SkillDefinition] = &[
    SkillDefinition { key: "acr", label: "Acrobatics", ability: AbilityKey::Dex },
    SkillDefinition { key: "ani", label: "Animal Handling", ability: AbilityKey::Wis },
    SkillDefinition { key: "arc", label: "Arcana", ability: AbilityKey::Int },
    SkillDefinition { key: "ath", label: "Athletics", ability: AbilityKey::Str },
    SkillDefinition { key: "dec", label: "Deception", ability: AbilityKey::Cha },
    SkillDefinition { key: "his", label: "History", ability: AbilityKey::Int },
    SkillDefinition { key: "ins", label: "Insight", ability: AbilityKey::Wis },
    SkillDefinition { key: "itm", label: "Intimidation", ability: AbilityKey::Cha },
    SkillDefinition { key: "inv", label: "Investigation", ability: AbilityKey::Int },
    SkillDefinition { key: "med", label: "Medicine", ability: AbilityKey::Wis },
    SkillDefinition { key: "nat", label: "Nature", ability: AbilityKey::Int },
    SkillDefinition { key: "prc", label: "Perception", ability: AbilityKey::Wis },
    SkillDefinition { key: "prf", label: "Performance", ability: AbilityKey::Cha },
    SkillDefinition { key: "per", label: "Persuasion", ability: AbilityKey::Cha },
    SkillDefinition { key: "rel", label: "Religion", ability: AbilityKey::Int },
    SkillDefinition { key: "slt", label: "Sleight of Hand", ability: AbilityKey::Dex },
    SkillDefinition { key: "ste", label: "Stealth", ability: AbilityKey::Dex },
    SkillDefinition { key: "sur", label: "Survival", ability: AbilityKey::Wis },
];

// ============================================================================
// Tables
// ============================================================================

const SIZES: &[(&str, &str)] = &[
    ("tiny", "Tiny"),
    ("sm", "Small"),
    ("med", "Medium"),
    ("lg", "Large"),
    ("huge", "Huge"),
    ("grg", "Gargantuan"),
];

const CREATURE_TYPES: &[(&str, &str)] = &[
    ("aberration", "Aberration"),
    ("beast", "Beast"),
    ("celestial", "Celestial"),
    ("construct", "Construct"),
    ("dragon", "Dragon"),
    ("elemental", "Elemental"),
    ("fey", "Fey"),
    ("fiend", "Fiend"),
    ("giant", "Giant"),
    ("humanoid", "Humanoid"),
    ("monstrosity", "Monstrosity"),
    ("ooze", "Ooze"),
    ("plant", "Plant"),
    ("undead", "Undead"),
];

const DAMAGE_TYPES: &[(&str, &str)] = &[
    ("acid", "Acid"),
    ("bludgeoning", "Bludgeoning"),
    ("cold", "Cold"),
    ("fire", "Fire"),
    ("force", "Force"),
    ("lightning", "Lightning"),
    ("necrotic", "Necrotic"),
    ("piercing", "Piercing"),
    ("poison", "Poison"),
    ("psychic", "Psychic"),
    ("radiant", "Radiant"),
    ("slashing", "Slashing"),
    ("thunder", "Thunder"),
];

const CONDITIONS: &[(&str, &str)] = &[
    ("blinded", "Blinded"),
    ("charmed", "Charmed"),
    ("deafened", "Deafened"),
    ("diseased", "Diseased"),
    ("exhaustion", "Exhaustion"),
    ("frightened", "Frightened"),
    ("grappled", "Grappled"),
    ("incapacitated", "Incapacitated"),
    ("invisible", "Invisible"),
    ("paralyzed", "Paralyzed"),
    ("petrified", "Petrified"),
    ("poisoned", "Poisoned"),
    ("prone", "Prone"),
    ("restrained", "Restrained"),
    ("stunned", "Stunned"),
    ("unconscious", "Unconscious"),
];

const LANGUAGES: &[(&str, &str)] = &[
    ("common", "Common"),
    ("aarakocra", "Aarakocra"),
    ("abyssal", "Abyssal"),
    ("aquan", "Aquan"),
    ("auran", "Auran"),
    ("celestial", "Celestial"),
    ("deep", "Deep Speech"),
    ("draconic", "Draconic"),
    ("druidic", "Druidic"),
    ("dwarvish", "Dwarvish"),
    ("elvish", "Elvish"),
    ("giant", "Giant"),
    ("gith", "Gith"),
    ("gnoll", "Gnoll"),
    ("gnomish", "Gnomish"),
    ("goblin", "Goblin"),
    ("halfling", "Halfling"),
    ("ignan", "Ignan"),
    ("infernal", "Infernal"),
    ("orc", "Orc"),
    ("primordial", "Primordial"),
    ("sylvan", "Sylvan"),
    ("terran", "Terran"),
    ("cant", "Thieves' Cant"),
    ("undercommon", "Undercommon"),
];

// ============================================================================
// Taxonomies
// ============================================================================

/// All taxonomy tables, read-only for the life of the process.
#[derive(Debug)]
pub struct Taxonomies {
    pub sizes: Taxonomy,
    pub creature_types: Taxonomy,
    pub damage_types: Taxonomy,
    pub conditions: Taxonomy,
    pub languages: Taxonomy,
    skills: &'static [SkillDefinition],
}

static DND5E: Lazy<Taxonomies> = Lazy::new(|| Taxonomies {
    sizes: Taxonomy::new(SIZES),
    creature_types: Taxonomy::new(CREATURE_TYPES),
    damage_types: Taxonomy::new(DAMAGE_TYPES),
    conditions: Taxonomy::new(CONDITIONS),
    languages: Taxonomy::new(LANGUAGES),
    skills: SKILLS,
});

impl Taxonomies {
    /// The D&D 5e tables.
    pub fn dnd5e() -> &'static Taxonomies {
        &DND5E
    }

    /// Resolve a skill by label or key, case-insensitively.
    pub fn skill(&self, text: &str) -> Option<&SkillDefinition> {
        let needle = text.trim();
        self.skills
            .iter()
            .find(|s| needle.eq_ignore_ascii_case(s.label))
            .or_else(|| self.skills.iter().find(|s| needle.eq_ignore_ascii_case(s.key)))
    }

    /// Look up a skill by its canonical key.
    pub fn skill_by_key(&self, key: &str) -> Option<&SkillDefinition> {
        self.skills.iter().find(|s| s.key == key)
    }
}

// ============================================================================
// Tests
// ============================================================================
