//! Semantic field matching - maps a feature keyword onto dumped fields.
//!
//! Matching is deliberately strict: an alias term must equal a *whole token*
//! of the field name's tokenization. Substring containment is never enough,
//! so `health` matches `maxHealth` (token `health` is present) but a field
//! named `Healthy` is not a candidate at all. Fields whose extra tokens look
//! like derived-stat modifiers (`HealthRegenRate`) are kept but ranked last.

use crate::structure::FieldDescriptor;
use std::fmt;

/// Feature keyword to semantic alias terms. Keys are the feature identifiers
/// the orchestrating pipeline uses; terms are compared against whole tokens.
static FEATURE_ALIASES: phf::Map<&'static str, &'static [&'static str]> = phf::phf_map! {
    "infinite_health" => &["health", "hp", "hitpoint", "hitpoints", "life"],
    "infinite_mana" => &["mana", "mp", "magic"],
    "infinite_ammo" => &["ammo", "ammunition", "clip", "bullets"],
    "infinite_stamina" => &["stamina", "energy", "endurance"],
    "infinite_gold" => &["gold", "money", "coin", "coins", "currency", "cash"],
    "infinite_currency" => &["gold", "money", "coin", "coins", "currency", "cash"],
    "speed_hack" => &["speed", "velocity", "movespeed"],
    "freeze_timer" => &["timer", "time", "countdown"],
};

/// Tokens that mark a matching field as a derived or secondary stat rather
/// than the stat itself ("HealthRegenRate" is not the health pool).
const DERIVED_MODIFIERS: &[&str] = &["regen", "rate", "max", "cap", "bonus", "percent"];

/// Alias terms for a feature keyword. `None` means the feature is not in the
/// table at all, which callers report differently from "no field matched".
pub fn alias_terms(feature: &str) -> Option<&'static [&'static str]> {
    FEATURE_ALIASES.get(feature).copied()
}

/// All feature keywords the matcher understands.
pub fn known_features() -> impl Iterator<Item = &'static str> {
    FEATURE_ALIASES.keys().copied()
}

/// Split an identifier into lowercase word tokens on case-transition and
/// digit boundaries: `HealthRegenRate` -> `[health, regen, rate]`,
/// `maxHealth` -> `[max, health]`, `HPRegen` -> `[hp, regen]`,
/// `ammo2` -> `[ammo, 2]`.
pub fn tokenize_name(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut tokens = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            continue;
        }
        if !current.is_empty() {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let boundary = (prev.is_lowercase() && c.is_uppercase())
                || (prev.is_ascii_digit() != c.is_ascii_digit())
                || (prev.is_uppercase() && c.is_uppercase() && next_lower);
            if boundary {
                tokens.push(std::mem::take(&mut current));
            }
        }
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Confidence band of one candidate, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchRank {
    /// The field name tokenizes to exactly the alias term.
    ExactToken,
    /// The alias term is one token among others, none deny-listed.
    WholeToken,
    /// The alias term is present but a derived-stat modifier is too.
    DerivedStat,
}

impl MatchRank {
    fn confidence(self) -> f32 {
        match self {
            MatchRank::ExactToken => 1.0,
            MatchRank::WholeToken => 0.75,
            MatchRank::DerivedStat => 0.4,
        }
    }
}

/// One field that matched a feature's alias terms.
#[derive(Debug, Clone)]
pub struct MatchCandidate {
    pub field: FieldDescriptor,
    pub rank: MatchRank,
    /// The alias term that hit.
    pub matched_term: &'static str,
    pub confidence: f32,
    /// True when the field looks like a derived stat; callers that only want
    /// the primary stat should filter on this.
    pub likely_derived: bool,
}

impl fmt::Display for MatchCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:?}, {:.2})",
            self.field.qualified_name(),
            self.rank,
            self.confidence
        )
    }
}

/// Ranks dumped fields against the feature alias table.
#[derive(Debug, Clone, Default)]
pub struct FieldMatcher {
    player_class: Option<String>,
}

impl FieldMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefer fields declared on `class` when ranks tie. Usually fed from
    /// [`StructureDump::guess_player_class`](crate::StructureDump::guess_player_class).
    pub fn with_player_class(class: impl Into<String>) -> Self {
        FieldMatcher {
            player_class: Some(class.into()),
        }
    }

    /// Rank `fields` against `feature`'s alias terms, best candidate first.
    ///
    /// Returns an empty vector both when no field matches and when the
    /// feature has no alias row; use [`alias_terms`] to tell the two apart.
    /// Ties within a rank prefer the player class, then declaration order.
    pub fn rank_fields(&self, feature: &str, fields: &[FieldDescriptor]) -> Vec<MatchCandidate> {
        let Some(terms) = alias_terms(feature) else {
            return Vec::new();
        };

        let mut candidates = Vec::new();
        for field in fields {
            let tokens = tokenize_name(&field.name);
            let Some(term) = terms
                .iter()
                .copied()
                .find(|term| tokens.iter().any(|tok| tok == term))
            else {
                continue;
            };

            let derived = tokens
                .iter()
                .any(|tok| DERIVED_MODIFIERS.contains(&tok.as_str()));
            let rank = if tokens.len() == 1 {
                MatchRank::ExactToken
            } else if derived {
                MatchRank::DerivedStat
            } else {
                MatchRank::WholeToken
            };

            candidates.push(MatchCandidate {
                field: field.clone(),
                rank,
                matched_term: term,
                confidence: rank.confidence(),
                likely_derived: rank == MatchRank::DerivedStat,
            });
        }

        // Stable sort keeps declaration order inside each band.
        candidates.sort_by_key(|c| (c.rank, !self.is_player_class(&c.field)));
        candidates
    }

    fn is_player_class(&self, field: &FieldDescriptor) -> bool {
        self.player_class
            .as_deref()
            .is_some_and(|p| p.eq_ignore_ascii_case(&field.declaring_class))
    }
}
