//! Reference efficiency data: who can work where, and how well.
//!
//! An immutable, versioned table mapping (operator identity, facility kind,
//! promotion level) to a base efficiency contribution in percent points,
//! plus innate operator tags and the synergy rule set.
//!
//! A bundled snapshot is embedded from `data/base_efficiency.json` at
//! compile time via `include_str!()`. To update values, edit the JSON file,
//! no code changes required. Hosts tracking newer game data can supply
//! their own table through [`ReferenceData::from_table`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::constants::{FacilityKind, ELITE_LEVELS};

/// One operator's reference profile.
///
/// Ladders are indexed by promotion level. A missing ladder means the
/// operator has no base skill for that facility kind and is ineligible
/// there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorProfile {
    /// Stable identity key, e.g. `char_102_texas`.
    pub id: String,
    /// Canonical display name.
    pub name: String,
    /// Innate tags referenced by synergy rules (faction, specialty).
    #[serde(default)]
    pub tags: Vec<String>,
    /// Trading efficiency per promotion level.
    #[serde(default)]
    pub trading: Option<[f32; ELITE_LEVELS]>,
    /// Manufacturing efficiency per promotion level.
    #[serde(default)]
    pub manufacturing: Option<[f32; ELITE_LEVELS]>,
    /// Power plant efficiency per promotion level.
    #[serde(default)]
    pub power: Option<[f32; ELITE_LEVELS]>,
}

impl OperatorProfile {
    pub fn ladder(&self, kind: FacilityKind) -> Option<&[f32; ELITE_LEVELS]> {
        match kind {
            FacilityKind::Trading => self.trading.as_ref(),
            FacilityKind::Manufacturing => self.manufacturing.as_ref(),
            FacilityKind::Power => self.power.as_ref(),
        }
    }
}

/// Which assigned operators a synergy rule needs inside one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynergyMembers {
    /// Every listed identity must be assigned to the group.
    Ids(Vec<String>),
    /// At least `count` assigned operators must carry the tag.
    Tag { tag: String, count: usize },
}

/// How a satisfied rule changes participating contributions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynergyEffect {
    /// Percent points added to each participating slot.
    FlatEach(f32),
    /// Factor applied to each participating slot's base value.
    MultiplyEach(f32),
}

/// A co-location bonus rule, evaluated within a single facility group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynergyRule {
    pub id: String,
    pub group: FacilityKind,
    pub members: SynergyMembers,
    pub effect: SynergyEffect,
    /// Human-readable note carried through to reports.
    #[serde(default)]
    pub note: String,
}

/// Raw reference table as stored in `data/base_efficiency.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceTable {
    /// Data snapshot version, reported alongside plans built from it.
    pub version: String,
    pub operators: Vec<OperatorProfile>,
    #[serde(default)]
    pub synergies: Vec<SynergyRule>,
}

/// Reference table defect found at construction.
#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceError {
    /// The same identity appears twice in the operator list.
    DuplicateProfile { id: String },
    /// A profile has no efficiency ladder for any facility kind.
    MissingLadder { id: String },
    /// A ladder contains a negative efficiency value.
    NegativeValue { id: String, kind: FacilityKind },
    /// A ladder decreases somewhere; promotion must never lower output.
    NonMonotonicLadder { id: String, kind: FacilityKind },
    /// A synergy rule has an empty identity list or a zero tag count.
    EmptyRuleMembers { rule: String },
    /// A synergy rule names an identity absent from the operator list.
    UnknownRuleMember { rule: String, id: String },
}

impl std::fmt::Display for ReferenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReferenceError::DuplicateProfile { id } => {
                write!(f, "duplicate operator profile: {}", id)
            }
            ReferenceError::MissingLadder { id } => {
                write!(f, "operator profile {} has no efficiency ladder", id)
            }
            ReferenceError::NegativeValue { id, kind } => {
                write!(f, "operator {} has a negative {} efficiency value", id, kind.label())
            }
            ReferenceError::NonMonotonicLadder { id, kind } => {
                write!(f, "operator {} has a decreasing {} efficiency ladder", id, kind.label())
            }
            ReferenceError::EmptyRuleMembers { rule } => {
                write!(f, "synergy rule {} has no member requirement", rule)
            }
            ReferenceError::UnknownRuleMember { rule, id } => {
                write!(f, "synergy rule {} references unknown operator {}", rule, id)
            }
        }
    }
}

impl std::error::Error for ReferenceError {}

/// One assigned operator as seen by synergy evaluation.
#[derive(Debug, Clone, Copy)]
pub struct GroupMember<'a> {
    pub id: &'a str,
    pub tags: &'a [String],
    /// Base efficiency at the effective promotion level.
    pub base: f32,
}

/// Validated, indexed reference store.
#[derive(Debug, Clone)]
pub struct ReferenceData {
    version: String,
    profiles: HashMap<String, OperatorProfile>,
    /// Profile ids in sorted order, for deterministic iteration.
    order: Vec<String>,
    rules: Vec<SynergyRule>,
}

impl ReferenceData {
    /// Returns the reference table bundled with the crate.
    ///
    /// Loaded from `data/base_efficiency.json` embedded at compile time.
    /// The bundled data is kept valid by tests, so construction cannot fail.
    pub fn builtin() -> ReferenceData {
        const TABLE_JSON: &str = include_str!("../../../data/base_efficiency.json");
        let table: ReferenceTable =
            serde_json::from_str(TABLE_JSON).expect("base_efficiency.json is invalid");
        ReferenceData::from_table(table).expect("base_efficiency.json failed validation")
    }

    /// Validates and indexes a raw table.
    pub fn from_table(table: ReferenceTable) -> Result<ReferenceData, ReferenceError> {
        let mut profiles = HashMap::with_capacity(table.operators.len());
        for profile in table.operators {
            if profile.ladder(FacilityKind::Trading).is_none()
                && profile.ladder(FacilityKind::Manufacturing).is_none()
                && profile.ladder(FacilityKind::Power).is_none()
            {
                return Err(ReferenceError::MissingLadder { id: profile.id });
            }
            for kind in FacilityKind::ALL {
                if let Some(ladder) = profile.ladder(kind) {
                    if ladder.iter().any(|v| *v < 0.0) {
                        return Err(ReferenceError::NegativeValue {
                            id: profile.id.clone(),
                            kind,
                        });
                    }
                    if ladder.windows(2).any(|w| w[1] < w[0]) {
                        return Err(ReferenceError::NonMonotonicLadder {
                            id: profile.id.clone(),
                            kind,
                        });
                    }
                }
            }
            let id = profile.id.clone();
            if profiles.insert(id.clone(), profile).is_some() {
                return Err(ReferenceError::DuplicateProfile { id });
            }
        }

        for rule in &table.synergies {
            match &rule.members {
                SynergyMembers::Ids(ids) => {
                    if ids.is_empty() {
                        return Err(ReferenceError::EmptyRuleMembers { rule: rule.id.clone() });
                    }
                    for id in ids {
                        match profiles.get(id) {
                            None => {
                                return Err(ReferenceError::UnknownRuleMember {
                                    rule: rule.id.clone(),
                                    id: id.clone(),
                                })
                            }
                            Some(profile) if profile.ladder(rule.group).is_none() => {
                                log::warn!(
                                    "synergy rule {} member {} has no {} ladder and can never fire",
                                    rule.id,
                                    id,
                                    rule.group.label()
                                );
                            }
                            Some(_) => {}
                        }
                    }
                }
                SynergyMembers::Tag { tag, count } => {
                    if *count == 0 {
                        return Err(ReferenceError::EmptyRuleMembers { rule: rule.id.clone() });
                    }
                    let eligible = profiles
                        .values()
                        .filter(|p| {
                            p.tags.iter().any(|t| t == tag) && p.ladder(rule.group).is_some()
                        })
                        .count();
                    if eligible < *count {
                        log::warn!(
                            "synergy rule {} wants {} operators tagged {} in {} but only {} qualify, rule can never fire",
                            rule.id,
                            count,
                            tag,
                            rule.group.label(),
                            eligible
                        );
                    }
                }
            }
        }

        let mut order: Vec<String> = profiles.keys().cloned().collect();
        order.sort();

        Ok(ReferenceData {
            version: table.version,
            profiles,
            order,
            rules: table.synergies,
        })
    }

    /// Data snapshot version string.
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn profile(&self, id: &str) -> Option<&OperatorProfile> {
        self.profiles.get(id)
    }

    /// All profiles in sorted id order.
    pub fn profiles(&self) -> impl Iterator<Item = &OperatorProfile> {
        self.order.iter().filter_map(|id| self.profiles.get(id))
    }

    /// Base efficiency for an operator at a promotion level, if eligible.
    pub fn base_value(&self, id: &str, kind: FacilityKind, level: u8) -> Option<f32> {
        self.profiles
            .get(id)?
            .ladder(kind)?
            .get(level as usize)
            .copied()
    }

    pub fn is_eligible(&self, id: &str, kind: FacilityKind) -> bool {
        self.profiles
            .get(id)
            .and_then(|p| p.ladder(kind))
            .is_some()
    }

    pub fn rules(&self) -> &[SynergyRule] {
        &self.rules
    }

    /// Extra contribution per assigned operator from satisfied synergy rules.
    ///
    /// The returned vector is parallel to `members`. A rule whose requirement
    /// is met inside the group credits each of its participants: `FlatEach`
    /// adds percent points, `MultiplyEach` scales the participant's base.
    pub fn synergy_bonuses(&self, kind: FacilityKind, members: &[GroupMember]) -> Vec<f32> {
        let mut bonuses = vec![0.0; members.len()];
        for rule in self.rules.iter().filter(|r| r.group == kind) {
            let participants: Vec<usize> = match &rule.members {
                SynergyMembers::Ids(ids) => {
                    let hits: Vec<usize> = members
                        .iter()
                        .enumerate()
                        .filter(|(_, m)| ids.iter().any(|id| id == m.id))
                        .map(|(i, _)| i)
                        .collect();
                    if hits.len() < ids.len() {
                        continue;
                    }
                    hits
                }
                SynergyMembers::Tag { tag, count } => {
                    let hits: Vec<usize> = members
                        .iter()
                        .enumerate()
                        .filter(|(_, m)| m.tags.iter().any(|t| t == tag))
                        .map(|(i, _)| i)
                        .collect();
                    if hits.len() < *count {
                        continue;
                    }
                    hits
                }
            };
            match rule.effect {
                SynergyEffect::FlatEach(delta) => {
                    for &i in &participants {
                        bonuses[i] += delta;
                    }
                }
                SynergyEffect::MultiplyEach(factor) => {
                    for &i in &participants {
                        bonuses[i] += members[i].base * (factor - 1.0);
                    }
                }
            }
        }
        bonuses
    }
}
