//! Roster loading: raw operator export to validated planning records.
//!
//! The raw shape matches the assistant tool's operator-box export, a JSON
//! array of records with identity keys and promotion levels. The loader
//! resolves each record against the reference table, clamps levels to the
//! legal range, and reports data-quality problems as warnings instead of
//! aborting the whole load.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::constants::ELITE_MAX;
use crate::reference::ReferenceData;

/// Raw operator record as exported by the assistant tool.
///
/// Only `id` is required; everything else defaults. Extra fields in the
/// export are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawOperator {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Promotion (elite) level as exported, clamped on load.
    #[serde(default)]
    pub elite: u8,
    /// In-promotion level; not used by efficiency lookup.
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub potential: u8,
    /// Whether the account owns this operator. Defaults to owned.
    #[serde(default = "default_own")]
    pub own: bool,
    /// Extra tags merged with the reference profile's innate tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_own() -> bool {
    true
}

/// Validated operator ready for the solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operator {
    pub id: String,
    pub name: String,
    /// Promotion level after clamping, 0..=2.
    pub elite: u8,
    pub tags: Vec<String>,
}

/// Data-quality warning attached to a successful load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LoadWarning {
    /// Identity absent from reference data; the record was dropped.
    UnknownOperator { id: String },
    /// Promotion level outside the legal range; clamped.
    LevelClamped { id: String, given: u8, clamped: u8 },
}

/// Load failure.
#[derive(Debug, Clone, PartialEq)]
pub enum RosterError {
    /// The same identity appears more than once among owned records.
    DuplicateOperator { id: String },
}

impl std::fmt::Display for RosterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RosterError::DuplicateOperator { id } => {
                write!(f, "duplicate operator in roster: {}", id)
            }
        }
    }
}

impl std::error::Error for RosterError {}

/// Result of a roster load: validated operators plus what was skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterLoad {
    pub operators: Vec<Operator>,
    pub warnings: Vec<LoadWarning>,
}

/// Validates a raw export against the reference table.
///
/// Records marked not-owned are skipped. Unknown identities are dropped
/// with a warning; out-of-range promotion levels are clamped with a
/// warning. A duplicate identity fails the whole load.
pub fn load_roster(
    raw: &[RawOperator],
    reference: &ReferenceData,
) -> Result<RosterLoad, RosterError> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut operators = Vec::new();
    let mut warnings = Vec::new();

    for record in raw.iter().filter(|r| r.own) {
        if !seen.insert(record.id.as_str()) {
            return Err(RosterError::DuplicateOperator {
                id: record.id.clone(),
            });
        }

        let profile = match reference.profile(&record.id) {
            Some(p) => p,
            None => {
                log::warn!("roster entry {} not in reference data, dropped", record.id);
                warnings.push(LoadWarning::UnknownOperator {
                    id: record.id.clone(),
                });
                continue;
            }
        };

        let elite = if record.elite > ELITE_MAX {
            log::warn!(
                "roster entry {} promotion level {} clamped to {}",
                record.id,
                record.elite,
                ELITE_MAX
            );
            warnings.push(LoadWarning::LevelClamped {
                id: record.id.clone(),
                given: record.elite,
                clamped: ELITE_MAX,
            });
            ELITE_MAX
        } else {
            record.elite
        };

        let name = if record.name.trim().is_empty() {
            profile.name.clone()
        } else {
            record.name.clone()
        };

        let mut tags = profile.tags.clone();
        for tag in &record.tags {
            if !tags.contains(tag) {
                tags.push(tag.clone());
            }
        }

        operators.push(Operator {
            id: record.id.clone(),
            name,
            elite,
            tags,
        });
    }

    Ok(RosterLoad {
        operators,
        warnings,
    })
}
