//! Upgrade path analysis.
//!
//! Compares the plan for the roster as it stands against the ceiling
//! plan where everyone is fully promoted, and turns the difference into
//! a ranked list of promotion suggestions. Each suggestion is scored by
//! replaying the current plan with just that promotion applied, so the
//! gain reflects synergy partners and policy adjustments, not the raw
//! ladder delta.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::constants::FacilityKind;
use crate::engine::{evaluate_fixed, Assignment, FixedSlot, TIE_EPS};
use crate::layout::LayoutConfig;
use crate::reference::{ReferenceData, SynergyMembers};
use crate::roster::Operator;

/// Joint gain must beat the sum of solo gains by this much before a
/// group of promotions is reported as one bundle.
pub const BUNDLE_TOLERANCE: f32 = 0.5;
/// Suggestions below this gain are noise and get dropped.
pub const MIN_REPORTED_GAIN: f32 = 0.05;

/// One operator's promotion within a suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelChange {
    pub operator_id: String,
    pub operator_name: String,
    pub current_level: u8,
    pub target_level: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeKind {
    Single,
    Bundle,
}

/// A suggested promotion, or a set of promotions that only pay off
/// together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpgradeItem {
    pub kind: UpgradeKind,
    pub operators: Vec<LevelChange>,
    /// Labels of the slots whose contribution this change moves.
    pub affected_rooms: Vec<String>,
    /// Day-total efficiency gained by applying the change to the
    /// current plan.
    pub gain: f32,
}

impl UpgradeItem {
    /// Total promotion levels the suggestion asks for.
    pub fn upgrade_cost(&self) -> u32 {
        self.operators
            .iter()
            .map(|c| (c.target_level - c.current_level) as u32)
            .sum()
    }
}

struct UpgradeCandidate<'a> {
    op: &'a Operator,
    /// Slot the ceiling plan puts this operator in.
    ceiling_pos: (FacilityKind, u32),
    target: u8,
}

/// Ranks the promotions that close the gap between the current plan and
/// the ceiling plan.
///
/// Returns an empty list when the ceiling offers nothing over the
/// current plan. Suggestions are sorted by gain, largest first; equal
/// gains are broken by the cheaper promotion count.
pub fn diff(
    current: &Assignment,
    ceiling: &Assignment,
    roster: &[Operator],
    layout: &LayoutConfig,
    reference: &ReferenceData,
) -> Vec<UpgradeItem> {
    if ceiling.total_efficiency - current.total_efficiency <= TIE_EPS {
        return Vec::new();
    }

    let roster_by_id: HashMap<&str, &Operator> =
        roster.iter().map(|op| (op.id.as_str(), op)).collect();

    let mut candidates: Vec<UpgradeCandidate<'_>> = Vec::new();
    for slot in &ceiling.slots {
        let op = match roster_by_id.get(slot.operator_id.as_str()) {
            Some(op) => *op,
            None => continue,
        };
        if op.elite < slot.elite {
            candidates.push(UpgradeCandidate {
                op,
                ceiling_pos: (slot.kind, slot.index),
                target: slot.elite,
            });
        }
    }

    let singles: Vec<(f32, Vec<String>)> = candidates
        .iter()
        .map(|c| scenario_gain(current, &roster_by_id, &[c], layout, reference))
        .collect();

    let mut consumed: HashSet<usize> = HashSet::new();
    let mut items: Vec<UpgradeItem> = Vec::new();

    // Promotions that only pay off together surface through the pair
    // rules: solo scenarios lack the partner, the joint scenario fires
    // the rule.
    for rule in reference.rules() {
        let ids = match &rule.members {
            SynergyMembers::Ids(ids) => ids,
            SynergyMembers::Tag { .. } => continue,
        };
        let positions: Vec<usize> = ids
            .iter()
            .filter_map(|id| {
                candidates
                    .iter()
                    .position(|c| c.op.id == *id)
                    .filter(|pos| !consumed.contains(pos))
            })
            .collect();
        if positions.len() < 2 {
            continue;
        }

        let joint_set: Vec<&UpgradeCandidate<'_>> =
            positions.iter().map(|&pos| &candidates[pos]).collect();
        let (joint_gain, joint_rooms) =
            scenario_gain(current, &roster_by_id, &joint_set, layout, reference);
        let solo_sum: f32 = positions.iter().map(|&pos| singles[pos].0).sum();

        if joint_gain - solo_sum > BUNDLE_TOLERANCE && joint_gain >= MIN_REPORTED_GAIN {
            items.push(UpgradeItem {
                kind: UpgradeKind::Bundle,
                operators: positions
                    .iter()
                    .map(|&pos| level_change(&candidates[pos]))
                    .collect(),
                affected_rooms: joint_rooms,
                gain: joint_gain,
            });
            consumed.extend(positions);
        }
    }

    for (pos, candidate) in candidates.iter().enumerate() {
        if consumed.contains(&pos) {
            continue;
        }
        let (gain, rooms) = singles[pos].clone();
        if gain < MIN_REPORTED_GAIN {
            continue;
        }
        items.push(UpgradeItem {
            kind: UpgradeKind::Single,
            operators: vec![level_change(candidate)],
            affected_rooms: rooms,
            gain,
        });
    }

    items.sort_by(|a, b| {
        b.gain
            .total_cmp(&a.gain)
            .then_with(|| a.upgrade_cost().cmp(&b.upgrade_cost()))
            .then_with(|| {
                a.operators
                    .first()
                    .map(|c| c.operator_id.as_str())
                    .cmp(&b.operators.first().map(|c| c.operator_id.as_str()))
            })
    });
    items
}

fn level_change(candidate: &UpgradeCandidate<'_>) -> LevelChange {
    LevelChange {
        operator_id: candidate.op.id.clone(),
        operator_name: candidate.op.name.clone(),
        current_level: candidate.op.elite,
        target_level: candidate.target,
    }
}

/// Replays the current plan with the given promotions applied in place.
/// Operators already seated get the higher level; benched operators take
/// over the slot the ceiling plan gives them.
fn scenario_gain(
    current: &Assignment,
    roster_by_id: &HashMap<&str, &Operator>,
    changes: &[&UpgradeCandidate<'_>],
    layout: &LayoutConfig,
    reference: &ReferenceData,
) -> (f32, Vec<String>) {
    const NO_TAGS: &[String] = &[];
    let mut scenario: Vec<FixedSlot<'_>> = current
        .slots
        .iter()
        .map(|s| FixedSlot {
            kind: s.kind,
            index: s.index,
            product: s.product,
            id: &s.operator_id,
            name: &s.operator_name,
            elite: s.elite,
            tags: roster_by_id
                .get(s.operator_id.as_str())
                .map(|op| op.tags.as_slice())
                .unwrap_or(NO_TAGS),
        })
        .collect();

    for change in changes {
        if let Some(slot) = scenario.iter_mut().find(|s| s.id == change.op.id) {
            slot.elite = change.target;
            continue;
        }
        let (kind, index) = change.ceiling_pos;
        if let Some(slot) = scenario
            .iter_mut()
            .find(|s| s.kind == kind && s.index == index)
        {
            slot.id = &change.op.id;
            slot.name = &change.op.name;
            slot.elite = change.target;
            slot.tags = &change.op.tags;
        }
    }

    let scored = evaluate_fixed(&scenario, layout, reference);
    let gain = scored.total_efficiency - current.total_efficiency;

    let mut rooms = Vec::new();
    for slot in &scored.slots {
        let before = current
            .slots
            .iter()
            .find(|s| s.kind == slot.kind && s.index == slot.index);
        let moved = match before {
            Some(b) => {
                b.operator_id != slot.operator_id
                    || (b.contribution - slot.contribution).abs() > 1e-6
            }
            None => true,
        };
        if moved {
            rooms.push(slot.room_label());
        }
    }
    (gain, rooms)
}
