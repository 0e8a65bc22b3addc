//! Field Extractor
//!
//! Independent rules, one per stat block fact. Each rule reads the input
//! document (and, for the legendary and spellcasting facts, the ability
//! entries) and returns either a parsed value or its declared default. No
//! rule looks at another rule's output.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::defaults::{
    count_or, flag, formula_or_empty, int_or, label_or, leading_number, number, text,
};
use super::dice::DiceExpression;
use super::input::{DamageTypeEntry, StatBlockInput};
use super::record::{Challenge, HitPoints, Movement, Senses};
use super::taxonomy::AbilityKey;

pub const DEFAULT_NAME: &str = "Unnamed Creature";
pub const DEFAULT_ARMOR_CLASS: i32 = 10;
pub const DEFAULT_HIT_POINTS: i32 = 10;
pub const DEFAULT_WALK_SPEED: u32 = 30;
pub const DEFAULT_ABILITY_SCORE: i32 = 10;
/// Highest challenge rating in the standard tables.
pub const MAX_CHALLENGE_RATING: f64 = 30.0;

// ============================================================================
// Regex Patterns
// ============================================================================

/// "58 (9d10 + 9)"
static HP_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?P<value>\d+)\s*\((?P<formula>.*)\)").expect("Failed to compile hit points regex")
});

/// "1/4", "1 / 8"
static CR_FRACTION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?P<num>\d+)\s*/\s*(?P<den>\d+)").expect("Failed to compile CR fraction regex")
});

/// "(1,800 XP)"
static XP_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\(\s*(?P<xp>[\d,]+)\s*xp\s*\)").expect("Failed to compile XP regex")
});

/// "can take 3 legendary actions"
static LEGENDARY_ACTIONS_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)can\s+take\s+(?P<count>\d+)\s+legendary\s+actions?")
        .expect("Failed to compile legendary actions regex")
});

/// " (ex)", "expertise"
static EXPERTISE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\(\s*ex\s*\)|\bexpertise\b").expect("Failed to compile expertise regex")
});

/// Experience points by challenge rating.
const XP_BY_CR: &[(f64, u32)] = &[
    (0.0, 10),
    (0.125, 25),
    (0.25, 50),
    (0.5, 100),
    (1.0, 200),
    (2.0, 450),
    (3.0, 700),
    (4.0, 1_100),
    (5.0, 1_800),
    (6.0, 2_300),
    (7.0, 2_900),
    (8.0, 3_900),
    (9.0, 5_000),
    (10.0, 5_900),
    (11.0, 7_200),
    (12.0, 8_400),
    (13.0, 10_000),
    (14.0, 11_500),
    (15.0, 13_000),
    (16.0, 15_000),
    (17.0, 18_000),
    (18.0, 20_000),
    (19.0, 22_000),
    (20.0, 25_000),
    (21.0, 33_000),
    (22.0, 41_000),
    (23.0, 50_000),
    (24.0, 62_000),
    (25.0, 75_000),
    (26.0, 90_000),
    (27.0, 105_000),
    (28.0, 120_000),
    (29.0, 135_000),
    (30.0, 155_000),
];

// ============================================================================
// Extracted Values
// ============================================================================

/// A skill mention before taxonomy resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSkill {
    pub label: String,
    pub expertise: bool,
    /// Total skill bonus when the source states it.
    pub bonus: Option<f64>,
}

/// Free-text damage and condition labels, sorted into their buckets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DamageLabels {
    pub resistances: Vec<String>,
    pub immunities: Vec<String>,
    pub vulnerabilities: Vec<String>,
    pub condition_immunities: Vec<String>,
}

/// Identity labels as written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityLabels {
    pub name: String,
    pub size: Option<String>,
    pub creature_type: Option<String>,
    pub subtype: String,
    pub alignment: String,
}

/// Every scalar fact of a stat block, each already parsed or defaulted.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedFields {
    pub identity: IdentityLabels,
    pub challenge: Challenge,
    pub armor_class: i32,
    pub hit_points: HitPoints,
    pub movement: Movement,
    pub senses: Senses,
    pub ability_scores: Vec<(AbilityKey, i32)>,
    pub saving_throws: Vec<AbilityKey>,
    pub skills: Vec<RawSkill>,
    pub damage: DamageLabels,
    pub languages: Vec<String>,
    pub telepathy: u32,
    pub legendary: bool,
    /// Count from the legendary introduction, when stated.
    pub legendary_actions: Option<u32>,
}

// ============================================================================
// Extractor
// ============================================================================

/// Runs every field rule over one document.
pub fn extract(input: &StatBlockInput) -> ExtractedFields {
    ExtractedFields {
        identity: extract_identity(input),
        challenge: extract_challenge(input),
        armor_class: extract_armor_class(input),
        hit_points: extract_hit_points(input),
        movement: extract_movement(input),
        senses: extract_senses(input),
        ability_scores: extract_ability_scores(input),
        saving_throws: extract_saving_throws(input),
        skills: extract_skills(input),
        damage: extract_damage_labels(input),
        languages: input.languages.labels(),
        telepathy: count_or("telepathy", input.telepathy.as_ref(), 0),
        legendary: is_legendary(input),
        legendary_actions: extract_legendary_actions(input),
    }
}

pub fn extract_identity(input: &StatBlockInput) -> IdentityLabels {
    let non_blank = |value: Option<&String>| {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    IdentityLabels {
        name: label_or(input.name.as_deref(), DEFAULT_NAME),
        size: non_blank(input.size.as_ref()),
        creature_type: non_blank(input.creature_type.as_ref()),
        subtype: label_or(input.tag.as_deref(), ""),
        alignment: label_or(input.alignment.as_deref(), ""),
    }
}

/// Challenge rating from "5", "1/4", "0.5" or "5 (1,800 XP)". XP comes from
/// the suffix when present, otherwise from the standard table.
pub fn extract_challenge(input: &StatBlockInput) -> Challenge {
    let raw = text(input.cr.as_ref()).unwrap_or_default();
    let cr = parse_challenge_rating(&raw).unwrap_or_else(|| {
        debug!(field = "cr", raw = %raw, "challenge rating absent or unparsable, using 0");
        0.0
    });

    let xp = XP_PATTERN
        .captures(&raw)
        .and_then(|caps| caps.name("xp")?.as_str().replace(',', "").parse().ok())
        .unwrap_or_else(|| xp_for_challenge(cr));

    Challenge { cr, xp }
}

/// Numeric challenge rating, accepting fractions.
pub fn parse_challenge_rating(raw: &str) -> Option<f64> {
    if let Some(caps) = CR_FRACTION_PATTERN.captures(raw) {
        let num: f64 = caps.name("num")?.as_str().parse().ok()?;
        let den: f64 = caps.name("den")?.as_str().parse().ok()?;
        return (den != 0.0)
            .then(|| num / den)
            .filter(|cr| cr.is_finite());
    }
    leading_number(raw).filter(|cr| *cr >= 0.0)
}

/// Standard XP award; 0 for ratings not in the table.
pub fn xp_for_challenge(cr: f64) -> u32 {
    XP_BY_CR
        .iter()
        .find(|(rating, _)| (rating - cr).abs() < 1e-6)
        .map(|(_, xp)| *xp)
        .unwrap_or(0)
}

/// Proficiency bonus for a challenge rating, between 2 and 9. Ratings past
/// the top of the table count as the top.
pub fn proficiency_for_challenge(cr: f64) -> i32 {
    let cr = if cr.is_finite() {
        cr.clamp(0.0, MAX_CHALLENGE_RATING)
    } else {
        0.0
    };
    ((((cr - 1.0) / 4.0).floor() as i32) + 2).max(2)
}

pub fn extract_armor_class(input: &StatBlockInput) -> i32 {
    int_or("armor_class", input.other_armor_desc.as_ref(), DEFAULT_ARMOR_CLASS)
}

/// "58 (9d10 + 9)" → 58 / "9d10 + 9". A bare formula yields its average; a
/// bare number keeps an empty formula.
pub fn extract_hit_points(input: &StatBlockInput) -> HitPoints {
    let Some(raw) = text(input.hp_text.as_ref()) else {
        debug!(field = "hit_points", "hit points absent, using default");
        return HitPoints::default();
    };

    if let Some(caps) = HP_PATTERN.captures(&raw) {
        let value = caps
            .name("value")
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(DEFAULT_HIT_POINTS);
        let formula = formula_or_empty(caps.name("formula").map(|m| m.as_str()));
        return HitPoints {
            value,
            max: value,
            formula,
        };
    }

    let formula = formula_or_empty(Some(&raw));
    if !formula.is_empty() && formula.contains(['d', 'D']) {
        if let Some(dice) = DiceExpression::parse(&formula) {
            let value = (dice.average_roll().floor() as i32).max(1);
            return HitPoints {
                value,
                max: value,
                formula,
            };
        }
    }

    let value = int_or("hit_points", input.hp_text.as_ref(), DEFAULT_HIT_POINTS);
    HitPoints {
        value,
        max: value,
        formula: String::new(),
    }
}

pub fn extract_movement(input: &StatBlockInput) -> Movement {
    Movement {
        walk: count_or("speed", input.speed.as_ref(), DEFAULT_WALK_SPEED),
        burrow: count_or("burrow_speed", input.burrow_speed.as_ref(), 0),
        climb: count_or("climb_speed", input.climb_speed.as_ref(), 0),
        fly: count_or("fly_speed", input.fly_speed.as_ref(), 0),
        swim: count_or("swim_speed", input.swim_speed.as_ref(), 0),
        hover: flag(input.hover.as_ref()),
        ..Movement::default()
    }
}

/// Sense radii; the base vision range is the widest of them.
pub fn extract_senses(input: &StatBlockInput) -> Senses {
    let blindsight = count_or("blindsight", input.blindsight.as_ref(), 0);
    let darkvision = count_or("darkvision", input.darkvision.as_ref(), 0);
    let tremorsense = count_or("tremorsense", input.tremorsense.as_ref(), 0);
    let truesight = count_or("truesight", input.truesight.as_ref(), 0);

    Senses {
        blindsight,
        darkvision,
        tremorsense,
        truesight,
        range: blindsight.max(darkvision).max(tremorsense).max(truesight),
        ..Senses::default()
    }
}

pub fn extract_ability_scores(input: &StatBlockInput) -> Vec<(AbilityKey, i32)> {
    AbilityKey::ALL
        .into_iter()
        .map(|key| {
            let raw = match key {
                AbilityKey::Str => input.str_points.as_ref(),
                AbilityKey::Dex => input.dex_points.as_ref(),
                AbilityKey::Con => input.con_points.as_ref(),
                AbilityKey::Int => input.int_points.as_ref(),
                AbilityKey::Wis => input.wis_points.as_ref(),
                AbilityKey::Cha => input.cha_points.as_ref(),
            };
            (key, int_or(key.key(), raw, DEFAULT_ABILITY_SCORE))
        })
        .collect()
}

/// Saving throw proficiencies; unknown names are dropped with a debug line.
pub fn extract_saving_throws(input: &StatBlockInput) -> Vec<AbilityKey> {
    let mut keys = Vec::new();
    for entry in &input.sthrows {
        match AbilityKey::resolve(entry.name()) {
            Some(key) if !keys.contains(&key) => keys.push(key),
            Some(_) => {}
            None => debug!(name = entry.name(), "unrecognised saving throw, ignoring"),
        }
    }
    keys
}

pub fn extract_skills(input: &StatBlockInput) -> Vec<RawSkill> {
    input
        .skills
        .iter()
        .filter(|skill| !skill.name.trim().is_empty())
        .map(|skill| RawSkill {
            label: skill.name.trim().to_string(),
            expertise: skill
                .note
                .as_deref()
                .is_some_and(|note| EXPERTISE_PATTERN.is_match(note)),
            bonus: number(skill.bonus.as_ref()),
        })
        .collect()
}

/// Sort `damagetypes`, `specialdamage` and `conditions` into their buckets.
pub fn extract_damage_labels(input: &StatBlockInput) -> DamageLabels {
    let mut labels = DamageLabels::default();

    for entry in input.damagetypes.iter().chain(&input.specialdamage) {
        push_damage_label(&mut labels, entry);
    }

    labels.condition_immunities = input
        .conditions
        .iter()
        .map(|c| c.name().trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();

    labels
}

fn push_damage_label(labels: &mut DamageLabels, entry: &DamageTypeEntry) {
    let name = entry.name.trim();
    if name.is_empty() {
        return;
    }
    let bucket = match entry.kind.as_deref().map(str::trim) {
        Some("i") => &mut labels.immunities,
        Some("v") => &mut labels.vulnerabilities,
        Some("r") | None => &mut labels.resistances,
        Some(other) => {
            debug!(name, kind = other, "unknown damage modifier kind, treating as resistance");
            &mut labels.resistances
        }
    };
    bucket.push(name.to_string());
}

/// Legendary status: the explicit flag or any legendary action entries.
pub fn is_legendary(input: &StatBlockInput) -> bool {
    input.is_legendary || input.legendaries.iter().any(|entry| entry.parts().is_some())
}

/// "can take N legendary actions" in the legendary introduction.
pub fn extract_legendary_actions(input: &StatBlockInput) -> Option<u32> {
    let description = input.legendaries_description.as_deref()?;
    LEGENDARY_ACTIONS_PATTERN
        .captures(description)
        .and_then(|caps| caps.name("count")?.as_str().parse().ok())
}

// ============================================================================
// Tests
// ============================================================================
