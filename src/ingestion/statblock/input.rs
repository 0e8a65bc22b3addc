//! Structured Input Document
//!
//! The upstream text-to-fields converter hands over one JSON document per
//! creature. Every field is optional; numeric-looking fields may arrive as
//! numbers or as text ("30", "30 ft.") and are resolved later through the
//! parse-or-default helpers in [`super::defaults`].

use serde::{Deserialize, Serialize};

use super::error::{ImportError, Result};
use super::record::ActionCategory;

/// A scalar that may be a number, a string or a flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LooseValue {
    Number(f64),
    Flag(bool),
    Text(String),
}

impl From<&str> for LooseValue {
    fn from(value: &str) -> Self {
        LooseValue::Text(value.to_string())
    }
}

impl From<f64> for LooseValue {
    fn from(value: f64) -> Self {
        LooseValue::Number(value)
    }
}

/// A list item that is either a bare string or an object with a `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NamedEntry {
    Plain(String),
    Named { name: String },
}

impl NamedEntry {
    pub fn name(&self) -> &str {
        match self {
            NamedEntry::Plain(name) => name,
            NamedEntry::Named { name } => name,
        }
    }
}

/// A skill mention. `note` carries the expertise marker (" (ex)"), `bonus`
/// the total skill bonus when the source states it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillEntry {
    pub name: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub bonus: Option<LooseValue>,
}

/// A damage type / special damage mention. `kind` is `r`, `i` or `v`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageTypeEntry {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// Languages arrive either as a list or as one delimited string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LanguageList {
    Joined(String),
    Entries(Vec<NamedEntry>),
}

impl Default for LanguageList {
    fn default() -> Self {
        LanguageList::Entries(Vec::new())
    }
}

impl LanguageList {
    /// Individual labels, split on commas and semicolons for the joined form.
    pub fn labels(&self) -> Vec<String> {
        match self {
            LanguageList::Joined(text) => text
                .split([',', ';'])
                .map(|part| part.trim().to_string())
                .filter(|part| !part.is_empty())
                .collect(),
            LanguageList::Entries(entries) => entries
                .iter()
                .map(|entry| entry.name().trim().to_string())
                .filter(|name| !name.is_empty())
                .collect(),
        }
    }
}

/// One named, described stat block entry (trait, action, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AbilityEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "description")]
    pub desc: Option<String>,
}

impl AbilityEntry {
    pub fn new(name: impl Into<String>, desc: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            desc: Some(desc.into()),
        }
    }

    /// Name and description when both are present and non-blank.
    pub fn parts(&self) -> Option<(&str, &str)> {
        let name = self.name.as_deref().map(str::trim).filter(|n| !n.is_empty())?;
        let desc = self.desc.as_deref().map(str::trim).filter(|d| !d.is_empty())?;
        Some((name, desc))
    }
}

/// The structured stat block document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StatBlockInput {
    pub name: Option<String>,
    pub size: Option<String>,
    #[serde(rename = "type")]
    pub creature_type: Option<String>,
    pub tag: Option<String>,
    pub alignment: Option<String>,
    pub cr: Option<LooseValue>,
    #[serde(alias = "armorDesc", alias = "ac")]
    pub other_armor_desc: Option<LooseValue>,
    pub hp_text: Option<LooseValue>,

    pub speed: Option<LooseValue>,
    pub burrow_speed: Option<LooseValue>,
    pub climb_speed: Option<LooseValue>,
    pub fly_speed: Option<LooseValue>,
    pub swim_speed: Option<LooseValue>,
    pub hover: Option<LooseValue>,

    pub str_points: Option<LooseValue>,
    pub dex_points: Option<LooseValue>,
    pub con_points: Option<LooseValue>,
    pub int_points: Option<LooseValue>,
    pub wis_points: Option<LooseValue>,
    pub cha_points: Option<LooseValue>,

    pub sthrows: Vec<NamedEntry>,
    pub skills: Vec<SkillEntry>,
    pub damagetypes: Vec<DamageTypeEntry>,
    pub specialdamage: Vec<DamageTypeEntry>,
    pub conditions: Vec<NamedEntry>,
    pub languages: LanguageList,
    pub telepathy: Option<LooseValue>,

    pub blindsight: Option<LooseValue>,
    pub darkvision: Option<LooseValue>,
    pub tremorsense: Option<LooseValue>,
    pub truesight: Option<LooseValue>,

    pub is_legendary: bool,
    pub legendaries_description: Option<String>,

    pub abilities: Vec<AbilityEntry>,
    pub actions: Vec<AbilityEntry>,
    pub bonus_actions: Vec<AbilityEntry>,
    pub reactions: Vec<AbilityEntry>,
    pub legendaries: Vec<AbilityEntry>,
}

impl StatBlockInput {
    /// Parse a document from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(ImportError::MalformedInput)
    }

    /// The five category buckets in fixed synthesis order.
    pub fn categories(&self) -> [(ActionCategory, &[AbilityEntry]); 5] {
        [
            (ActionCategory::Passive, self.abilities.as_slice()),
            (ActionCategory::Action, self.actions.as_slice()),
            (ActionCategory::BonusAction, self.bonus_actions.as_slice()),
            (ActionCategory::Reaction, self.reactions.as_slice()),
            (ActionCategory::Legendary, self.legendaries.as_slice()),
        ]
    }
}
