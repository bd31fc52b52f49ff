//! Shift assignment solver.
//!
//! Splits the roster across the layout's facility groups so the combined
//! efficiency of a full day is as high as the search can make it. Small
//! groups are solved exactly by subset enumeration; oversized pools fall
//! back to a greedy fill refined by pairwise swaps. Operators eligible
//! for more than one group are settled by comparing what each group
//! would lose by giving them up.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::constants::{rotations, FacilityKind, Product, ELITE_MAX};
use crate::layout::{validate_layout, AccelerantOrder, LayoutConfig, LayoutViolation};
use crate::reference::{GroupMember, ReferenceData};
use crate::roster::Operator;

/// Subset-count ceiling below which a group is solved by enumeration.
pub const ENUMERATION_BUDGET: u128 = 200_000;
/// Contention passes before the solver gives up on a stable split.
pub const MAX_CONTENTION_PASSES: usize = 8;
/// Accepted-swap budget for the greedy fallback improver.
pub const MAX_SWAP_SWEEPS: usize = 64;
/// Efficiency boost applied to the accelerant target's subtotal.
pub const ACCELERANT_BOOST_RATE: f32 = 0.15;
/// Margin under which two evaluations count as tied.
pub const TIE_EPS: f32 = 1e-4;

/// One working slot of the final plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotAssignment {
    pub kind: FacilityKind,
    /// Position within the group, strongest contribution first.
    pub index: u32,
    /// Commodity the slot produces. Power slots produce nothing.
    pub product: Option<Product>,
    pub operator_id: String,
    pub operator_name: String,
    /// Promotion level used for the efficiency lookup.
    pub elite: u8,
    /// Base efficiency plus this operator's share of synergy bonuses.
    pub contribution: f32,
}

impl SlotAssignment {
    /// Human-readable slot label, e.g. `trading-1 (lmd)` or `power-3`.
    pub fn room_label(&self) -> String {
        match self.product {
            Some(product) => format!(
                "{}-{} ({})",
                self.kind.label(),
                self.index + 1,
                product.label()
            ),
            None => format!("{}-{}", self.kind.label(), self.index + 1),
        }
    }
}

/// Efficiency accounting for one of the three daily rotations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotationTally {
    pub rotation: u8,
    /// Accelerant bonus credited this rotation.
    pub boost: f32,
    /// Drone-recharge debit charged this rotation.
    pub debit: f32,
    /// Combined efficiency for the rotation.
    pub tally: f32,
}

/// A complete day plan: who sits where, and what it adds up to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub slots: Vec<SlotAssignment>,
    /// Sum of all slot contributions before policy adjustments.
    pub base_efficiency: f32,
    pub rotations: [RotationTally; rotations::COUNT],
    /// Mean of the three rotation tallies.
    pub total_efficiency: f32,
}

impl Assignment {
    pub fn slots_in(&self, kind: FacilityKind) -> impl Iterator<Item = &SlotAssignment> + '_ {
        self.slots.iter().filter(move |s| s.kind == kind)
    }

    pub fn slot_for(&self, operator_id: &str) -> Option<&SlotAssignment> {
        self.slots.iter().find(|s| s.operator_id == operator_id)
    }
}

/// Why the solver could not produce a plan.
#[derive(Debug, Clone, PartialEq)]
pub enum SolveError {
    /// The layout failed validation; every violation is included.
    InvalidLayout(Vec<LayoutViolation>),
    /// A group has fewer eligible operators than slots.
    InsufficientOperators {
        kind: FacilityKind,
        required: u32,
        available: u32,
    },
    /// Cross-group contention never settled into a feasible split.
    DegenerateSolution { detail: String },
}

impl std::fmt::Display for SolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolveError::InvalidLayout(violations) => {
                write!(f, "invalid layout: {:?}", violations)
            }
            SolveError::InsufficientOperators {
                kind,
                required,
                available,
            } => write!(
                f,
                "{} group needs {} eligible operators, roster has {}",
                kind.label(),
                required,
                available
            ),
            SolveError::DegenerateSolution { detail } => {
                write!(f, "no stable assignment: {}", detail)
            }
        }
    }
}

impl std::error::Error for SolveError {}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    /// Index into the roster slice.
    idx: usize,
    /// Base efficiency at the operator's effective promotion level.
    value: f32,
}

struct GroupState {
    kind: FacilityKind,
    required: usize,
    pool: Vec<Candidate>,
    excluded: HashSet<usize>,
    members: Vec<usize>,
    eval: f32,
}

/// Computes the best shift plan for a roster under a layout.
///
/// With `ignore_proficiency_cap` set, every operator is evaluated at the
/// top promotion level regardless of roster state; the result is the
/// ceiling plan used for upgrade analysis.
pub fn solve(
    roster: &[Operator],
    layout: &LayoutConfig,
    reference: &ReferenceData,
    ignore_proficiency_cap: bool,
) -> Result<Assignment, SolveError> {
    let violations = validate_layout(layout);
    if !violations.is_empty() {
        return Err(SolveError::InvalidLayout(violations));
    }

    let effective: Vec<u8> = roster
        .iter()
        .map(|op| if ignore_proficiency_cap { ELITE_MAX } else { op.elite })
        .collect();

    let mut groups = Vec::new();
    for kind in FacilityKind::ALL {
        let required = layout.slots(kind) as usize;
        let mut pool: Vec<Candidate> = roster
            .iter()
            .enumerate()
            .filter_map(|(idx, op)| {
                reference
                    .base_value(&op.id, kind, effective[idx])
                    .map(|value| Candidate { idx, value })
            })
            .collect();
        pool.sort_by(|a, b| {
            b.value
                .total_cmp(&a.value)
                .then_with(|| roster[a.idx].id.cmp(&roster[b.idx].id))
        });
        if pool.len() < required {
            return Err(SolveError::InsufficientOperators {
                kind,
                required: required as u32,
                available: pool.len() as u32,
            });
        }
        groups.push(GroupState {
            kind,
            required,
            pool,
            excluded: HashSet::new(),
            members: Vec::new(),
            eval: 0.0,
        });
    }

    for group in &mut groups {
        let (members, eval) = match best_set(
            group.kind,
            &group.pool,
            &group.excluded,
            group.required,
            roster,
            reference,
        ) {
            Some(solution) => solution,
            None => {
                return Err(SolveError::InsufficientOperators {
                    kind: group.kind,
                    required: group.required as u32,
                    available: group.pool.len() as u32,
                })
            }
        };
        group.members = members;
        group.eval = eval;
    }

    for _pass in 0..MAX_CONTENTION_PASSES {
        let contested = contested_indices(&groups, roster);
        if contested.is_empty() {
            break;
        }
        for op_idx in contested {
            let holders: Vec<usize> = (0..groups.len())
                .filter(|&g| groups[g].members.contains(&op_idx))
                .collect();
            if holders.len() < 2 {
                continue;
            }

            // The group that would lose the most keeps the operator.
            let mut winner = holders[0];
            let mut winner_loss = f32::NEG_INFINITY;
            for &h in &holders {
                let group = &groups[h];
                let mut trial = group.excluded.clone();
                trial.insert(op_idx);
                let loss = match best_set(
                    group.kind,
                    &group.pool,
                    &trial,
                    group.required,
                    roster,
                    reference,
                ) {
                    Some((_, eval_without)) => group.eval - eval_without,
                    None => f32::INFINITY,
                };
                if loss > winner_loss + TIE_EPS {
                    winner = h;
                    winner_loss = loss;
                }
            }

            for &h in &holders {
                if h == winner {
                    continue;
                }
                groups[h].excluded.insert(op_idx);
                let (members, eval) = match best_set(
                    groups[h].kind,
                    &groups[h].pool,
                    &groups[h].excluded,
                    groups[h].required,
                    roster,
                    reference,
                ) {
                    Some(solution) => solution,
                    None => {
                        return Err(SolveError::DegenerateSolution {
                            detail: format!(
                                "{} group cannot be filled once {} goes to the {} group",
                                groups[h].kind.label(),
                                roster[op_idx].id,
                                groups[winner].kind.label()
                            ),
                        })
                    }
                };
                log::debug!(
                    "contention: {} keeps {}, {} re-solved",
                    groups[winner].kind.label(),
                    roster[op_idx].id,
                    groups[h].kind.label()
                );
                groups[h].members = members;
                groups[h].eval = eval;
            }
        }
    }

    if !contested_indices(&groups, roster).is_empty() {
        return Err(SolveError::DegenerateSolution {
            detail: format!(
                "slot contention did not settle after {} passes",
                MAX_CONTENTION_PASSES
            ),
        });
    }

    let mut fixed: Vec<FixedSlot<'_>> = Vec::new();
    for group in &groups {
        let members: Vec<GroupMember<'_>> = group
            .members
            .iter()
            .map(|&i| GroupMember {
                id: &roster[i].id,
                tags: &roster[i].tags,
                base: reference
                    .base_value(&roster[i].id, group.kind, effective[i])
                    .unwrap_or(0.0),
            })
            .collect();
        let bonuses = reference.synergy_bonuses(group.kind, &members);

        let mut ranked: Vec<(usize, f32)> = Vec::with_capacity(group.members.len());
        for (pos, &i) in group.members.iter().enumerate() {
            ranked.push((i, members[pos].base + bonuses[pos]));
        }
        ranked.sort_by(|a, b| {
            b.1.total_cmp(&a.1)
                .then_with(|| roster[a.0].id.cmp(&roster[b.0].id))
        });

        let products = layout.products(group.kind);
        for (slot_pos, (i, _)) in ranked.iter().enumerate() {
            fixed.push(FixedSlot {
                kind: group.kind,
                index: slot_pos as u32,
                product: products.get(slot_pos).copied(),
                id: &roster[*i].id,
                name: &roster[*i].name,
                elite: effective[*i],
                tags: &roster[*i].tags,
            });
        }
    }

    Ok(evaluate_fixed(&fixed, layout, reference))
}

/// A slot whose occupant is already decided. Upgrade analysis builds
/// these directly to score what-if scenarios.
pub(crate) struct FixedSlot<'a> {
    pub kind: FacilityKind,
    pub index: u32,
    pub product: Option<Product>,
    pub id: &'a str,
    pub name: &'a str,
    pub elite: u8,
    pub tags: &'a [String],
}

/// Scores a fully decided slot arrangement, from per-slot contributions
/// with synergy through to the rotation tallies and the day total.
pub(crate) fn evaluate_fixed(
    slots: &[FixedSlot<'_>],
    layout: &LayoutConfig,
    reference: &ReferenceData,
) -> Assignment {
    let mut out: Vec<SlotAssignment> = Vec::with_capacity(slots.len());
    for kind in FacilityKind::ALL {
        let group: Vec<&FixedSlot<'_>> = slots.iter().filter(|s| s.kind == kind).collect();
        if group.is_empty() {
            continue;
        }
        let members: Vec<GroupMember<'_>> = group
            .iter()
            .map(|s| GroupMember {
                id: s.id,
                tags: s.tags,
                base: reference.base_value(s.id, kind, s.elite).unwrap_or(0.0),
            })
            .collect();
        let bonuses = reference.synergy_bonuses(kind, &members);
        for ((slot, member), bonus) in group.iter().zip(&members).zip(&bonuses) {
            out.push(SlotAssignment {
                kind,
                index: slot.index,
                product: slot.product,
                operator_id: slot.id.to_string(),
                operator_name: slot.name.to_string(),
                elite: slot.elite,
                contribution: member.base + bonus,
            });
        }
    }

    let base_efficiency: f32 = out.iter().map(|s| s.contribution).sum();

    // The strongest production slot pays the drone-recharge debit.
    let debited: Option<(f32, Option<Product>)> = if layout.auto_recharge {
        out.iter()
            .filter(|s| s.product.is_some())
            .max_by(|a, b| a.contribution.total_cmp(&b.contribution))
            .map(|s| (s.contribution, s.product))
    } else {
        None
    };

    let mut tallies = [RotationTally {
        rotation: 0,
        boost: 0.0,
        debit: 0.0,
        tally: base_efficiency,
    }; rotations::COUNT];
    for (r, entry) in tallies.iter_mut().enumerate() {
        let target = layout.accelerant.targets[r];
        let mut boost = 0.0;
        if layout.accelerant.enabled {
            let mut subtotal: f32 = out
                .iter()
                .filter(|s| s.product == Some(target))
                .map(|s| s.contribution)
                .sum();
            // Post order: the slot drained for recharge misses the boost.
            if layout.accelerant.order == AccelerantOrder::Post {
                if let Some((debit_value, debit_product)) = debited {
                    if debit_product == Some(target) {
                        subtotal -= debit_value;
                    }
                }
            }
            boost = ACCELERANT_BOOST_RATE * subtotal;
        }
        let debit = debited.map(|(value, _)| value).unwrap_or(0.0);
        *entry = RotationTally {
            rotation: r as u8,
            boost,
            debit,
            tally: base_efficiency + boost - debit,
        };
    }

    let total_efficiency =
        tallies.iter().map(|t| t.tally).sum::<f32>() / rotations::COUNT as f32;

    Assignment {
        slots: out,
        base_efficiency,
        rotations: tallies,
        total_efficiency,
    }
}

/// Best member set for one group, as roster indices plus its evaluation.
/// Returns `None` when the pool minus exclusions cannot fill the group.
/// Evaluation ties keep the set with the smaller tag footprint so that
/// tag-versatile operators stay free for other groups.
fn best_set(
    kind: FacilityKind,
    pool: &[Candidate],
    excluded: &HashSet<usize>,
    required: usize,
    roster: &[Operator],
    reference: &ReferenceData,
) -> Option<(Vec<usize>, f32)> {
    if required == 0 {
        return Some((Vec::new(), 0.0));
    }
    let available: Vec<Candidate> = pool
        .iter()
        .filter(|c| !excluded.contains(&c.idx))
        .copied()
        .collect();
    if available.len() < required {
        return None;
    }

    let eval_of = |picks: &[usize]| -> f32 {
        let members: Vec<GroupMember<'_>> = picks
            .iter()
            .map(|&p| {
                let candidate = available[p];
                GroupMember {
                    id: &roster[candidate.idx].id,
                    tags: &roster[candidate.idx].tags,
                    base: candidate.value,
                }
            })
            .collect();
        let base: f32 = members.iter().map(|m| m.base).sum();
        let bonus: f32 = reference.synergy_bonuses(kind, &members).iter().sum();
        base + bonus
    };

    let tag_footprint = |picks: &[usize]| -> usize {
        picks.iter().map(|&p| roster[available[p].idx].tags.len()).sum()
    };

    if count_subsets(available.len(), required) <= ENUMERATION_BUDGET {
        let mut best: Option<(Vec<usize>, f32, usize)> = None;
        let mut scratch = Vec::with_capacity(required);
        visit_subsets(available.len(), required, 0, &mut scratch, &mut |picks| {
            let eval = eval_of(picks);
            let tags = tag_footprint(picks);
            let take = match &best {
                None => true,
                Some((_, best_eval, best_tags)) => {
                    eval > best_eval + TIE_EPS
                        || (eval > best_eval - TIE_EPS && tags < *best_tags)
                }
            };
            if take {
                best = Some((picks.to_vec(), eval, tags));
            }
        });
        best.map(|(picks, eval, _)| (picks.iter().map(|&p| available[p].idx).collect(), eval))
    } else {
        log::warn!(
            "{} group: {} candidates over enumeration budget, greedy fallback",
            kind.label(),
            available.len()
        );
        let mut picks: Vec<usize> = (0..required).collect();
        let mut eval = eval_of(&picks);
        for _ in 0..MAX_SWAP_SWEEPS {
            let mut improved = false;
            'sweep: for slot in 0..picks.len() {
                for candidate in 0..available.len() {
                    if picks.contains(&candidate) {
                        continue;
                    }
                    let prev = picks[slot];
                    picks[slot] = candidate;
                    let trial = eval_of(&picks);
                    if trial > eval + TIE_EPS {
                        eval = trial;
                        improved = true;
                        break 'sweep;
                    }
                    picks[slot] = prev;
                }
            }
            if !improved {
                break;
            }
        }
        Some((picks.iter().map(|&p| available[p].idx).collect(), eval))
    }
}

/// Roster indices claimed by more than one group, ordered by operator id.
fn contested_indices(groups: &[GroupState], roster: &[Operator]) -> Vec<usize> {
    let mut counts: HashMap<usize, u32> = HashMap::new();
    for group in groups {
        for &idx in &group.members {
            *counts.entry(idx).or_insert(0) += 1;
        }
    }
    let mut contested: Vec<usize> = counts
        .into_iter()
        .filter(|&(_, claims)| claims > 1)
        .map(|(idx, _)| idx)
        .collect();
    contested.sort_by(|a, b| roster[*a].id.cmp(&roster[*b].id));
    contested
}

/// Number of `k`-subsets of `n` items. Exact for the sizes the solver
/// sees; callers guarantee `k <= n`.
fn count_subsets(n: usize, k: usize) -> u128 {
    let k = k.min(n - k);
    let mut result: u128 = 1;
    for i in 0..k {
        result = result * (n - i) as u128 / (i + 1) as u128;
    }
    result
}

/// Visits every `k`-subset of `0..n` in lexicographic order.
fn visit_subsets(
    n: usize,
    k: usize,
    start: usize,
    scratch: &mut Vec<usize>,
    visit: &mut dyn FnMut(&[usize]),
) {
    if scratch.len() == k {
        visit(scratch);
        return;
    }
    let remaining = k - scratch.len();
    let mut i = start;
    while i + remaining <= n {
        scratch.push(i);
        visit_subsets(n, k, i + 1, scratch, visit);
        scratch.pop();
        i += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{LayoutPreset, ManufacturingTargets, TradingTargets};
    use crate::reference::{
        OperatorProfile, ReferenceTable, SynergyEffect, SynergyMembers, SynergyRule,
    };

    fn profile(id: &str, kind: FacilityKind, ladder: [f32; 3]) -> OperatorProfile {
        let mut p = OperatorProfile {
            id: id.to_string(),
            name: id.to_string(),
            tags: Vec::new(),
            trading: None,
            manufacturing: None,
            power: None,
        };
        match kind {
            FacilityKind::Trading => p.trading = Some(ladder),
            FacilityKind::Manufacturing => p.manufacturing = Some(ladder),
            FacilityKind::Power => p.power = Some(ladder),
        }
        p
    }

    fn op_from(p: &OperatorProfile, elite: u8) -> Operator {
        Operator {
            id: p.id.clone(),
            name: p.name.clone(),
            elite,
            tags: p.tags.clone(),
        }
    }

    fn reference_of(operators: Vec<OperatorProfile>, synergies: Vec<SynergyRule>) -> ReferenceData {
        let table = ReferenceTable {
            version: "test".to_string(),
            operators,
            synergies,
        };
        ReferenceData::from_table(table).expect("test table is valid")
    }

    fn builtin_roster(elite: u8) -> Vec<Operator> {
        ReferenceData::builtin()
            .profiles()
            .map(|p| Operator {
                id: p.id.clone(),
                name: p.name.clone(),
                elite,
                tags: p.tags.clone(),
            })
            .collect()
    }

    #[test]
    fn test_count_subsets() {
        assert_eq!(count_subsets(5, 2), 10);
        assert_eq!(count_subsets(6, 6), 1);
        assert_eq!(count_subsets(50, 4), 230_300);
    }

    #[test]
    fn test_full_roster_fills_every_slot() {
        let reference = ReferenceData::builtin();
        let roster = builtin_roster(2);
        let layout = LayoutPreset::Balanced243.config();

        let plan = solve(&roster, &layout, &reference, false).expect("solvable");
        assert_eq!(plan.slots.len(), 9);

        let mut ids: Vec<&str> = plan.slots.iter().map(|s| s.operator_id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 9, "no operator works two slots");

        assert_eq!(plan.slots_in(FacilityKind::Trading).count(), 2);
        assert_eq!(plan.slots_in(FacilityKind::Manufacturing).count(), 4);
        assert_eq!(plan.slots_in(FacilityKind::Power).count(), 3);
    }

    #[test]
    fn test_ceiling_not_below_capped() {
        let reference = ReferenceData::builtin();
        let roster: Vec<Operator> = ReferenceData::builtin()
            .profiles()
            .enumerate()
            .map(|(i, p)| Operator {
                id: p.id.clone(),
                name: p.name.clone(),
                elite: (i % 3) as u8,
                tags: p.tags.clone(),
            })
            .collect();
        let layout = LayoutPreset::Balanced243.config();

        let capped = solve(&roster, &layout, &reference, false).expect("capped plan");
        let ceiling = solve(&roster, &layout, &reference, true).expect("ceiling plan");
        assert!(
            ceiling.total_efficiency >= capped.total_efficiency - TIE_EPS,
            "ceiling {} fell below capped {}",
            ceiling.total_efficiency,
            capped.total_efficiency
        );
    }

    #[test]
    fn test_trading_products_follow_targets() {
        let reference = ReferenceData::builtin();
        let roster = builtin_roster(2);
        let layout = LayoutPreset::Orundum333.config();

        let plan = solve(&roster, &layout, &reference, false).expect("solvable");
        let products: Vec<Option<Product>> = plan
            .slots_in(FacilityKind::Trading)
            .map(|s| s.product)
            .collect();
        assert_eq!(
            products,
            vec![Some(Product::Lmd), Some(Product::Lmd), Some(Product::Orundum)]
        );

        let labels: Vec<String> = plan
            .slots_in(FacilityKind::Trading)
            .map(|s| s.room_label())
            .collect();
        assert_eq!(labels[0], "trading-1 (lmd)");
        assert_eq!(labels[2], "trading-3 (orundum)");
    }

    #[test]
    fn test_invalid_layout_rejected_before_solving() {
        let reference = ReferenceData::builtin();
        let roster = builtin_roster(2);
        let mut layout = LayoutPreset::Balanced243.config();
        layout.trading = 3;

        let err = solve(&roster, &layout, &reference, false).expect_err("layout is broken");
        match err {
            SolveError::InvalidLayout(violations) => {
                assert_eq!(violations.len(), 2, "sum and target mismatch both reported")
            }
            other => panic!("expected InvalidLayout, got {:?}", other),
        }
    }

    #[test]
    fn test_insufficient_power_operators() {
        let operators = vec![
            profile("t1", FacilityKind::Trading, [5.0, 10.0, 15.0]),
            profile("t2", FacilityKind::Trading, [5.0, 10.0, 14.0]),
            profile("m1", FacilityKind::Manufacturing, [5.0, 9.0, 13.0]),
            profile("m2", FacilityKind::Manufacturing, [5.0, 9.0, 12.0]),
            profile("m3", FacilityKind::Manufacturing, [5.0, 9.0, 11.0]),
            profile("m4", FacilityKind::Manufacturing, [5.0, 9.0, 10.0]),
            profile("p1", FacilityKind::Power, [5.0, 8.0, 11.0]),
            profile("p2", FacilityKind::Power, [5.0, 8.0, 10.0]),
        ];
        let roster: Vec<Operator> = operators.iter().map(|p| op_from(p, 2)).collect();
        let reference = reference_of(operators, Vec::new());
        let layout = LayoutPreset::Balanced243.config();

        let err = solve(&roster, &layout, &reference, false).expect_err("too few power hands");
        assert_eq!(
            err,
            SolveError::InsufficientOperators {
                kind: FacilityKind::Power,
                required: 3,
                available: 2,
            }
        );
    }

    #[test]
    fn test_synergy_pair_beats_stronger_singles() {
        let mut pair_a = profile("pair_a", FacilityKind::Trading, [5.0, 10.0, 15.0]);
        let mut pair_b = profile("pair_b", FacilityKind::Trading, [5.0, 10.0, 15.0]);
        pair_a.tags.push("couriers".to_string());
        pair_b.tags.push("couriers".to_string());

        let operators = vec![
            profile("solo_1", FacilityKind::Trading, [8.0, 14.0, 20.0]),
            profile("solo_2", FacilityKind::Trading, [8.0, 14.0, 19.0]),
            pair_a,
            pair_b,
            profile("m1", FacilityKind::Manufacturing, [5.0, 9.0, 13.0]),
            profile("m2", FacilityKind::Manufacturing, [5.0, 9.0, 12.0]),
            profile("m3", FacilityKind::Manufacturing, [5.0, 9.0, 11.0]),
            profile("m4", FacilityKind::Manufacturing, [5.0, 9.0, 10.0]),
            profile("p1", FacilityKind::Power, [5.0, 8.0, 11.0]),
            profile("p2", FacilityKind::Power, [5.0, 8.0, 10.0]),
            profile("p3", FacilityKind::Power, [5.0, 8.0, 9.0]),
        ];
        let roster: Vec<Operator> = operators.iter().map(|p| op_from(p, 2)).collect();
        let synergies = vec![SynergyRule {
            id: "courier_pair".to_string(),
            group: FacilityKind::Trading,
            members: SynergyMembers::Ids(vec!["pair_a".to_string(), "pair_b".to_string()]),
            effect: SynergyEffect::FlatEach(6.0),
            note: String::new(),
        }];
        let reference = reference_of(operators, synergies);
        let layout = LayoutPreset::Balanced243.config();

        // Pair: 15 + 15 + 6 + 6 = 42 beats solos: 20 + 19 = 39.
        let plan = solve(&roster, &layout, &reference, false).expect("solvable");
        assert!(plan.slot_for("pair_a").is_some());
        assert!(plan.slot_for("pair_b").is_some());
        assert!(plan.slot_for("solo_1").is_none());
    }

    #[test]
    fn test_equal_sets_prefer_smaller_tag_footprint() {
        let mut versatile = profile("a_versatile", FacilityKind::Trading, [10.0, 15.0, 20.0]);
        versatile.tags = vec!["metalworker".to_string(), "logistics".to_string()];
        let plain = profile("b_plain", FacilityKind::Trading, [10.0, 15.0, 20.0]);

        let mut operators = vec![versatile, plain];
        for i in 0..5 {
            operators.push(profile(
                &format!("m{i}"),
                FacilityKind::Manufacturing,
                [5.0, 10.0, 15.0 + i as f32],
            ));
        }
        for i in 0..3 {
            operators.push(profile(
                &format!("p{i}"),
                FacilityKind::Power,
                [4.0, 8.0, 12.0 + i as f32],
            ));
        }
        let roster: Vec<Operator> = operators.iter().map(|p| op_from(p, 2)).collect();
        let reference = reference_of(operators, Vec::new());
        let layout = LayoutPreset::Factory153.config();

        // Both trading candidates evaluate to 20; the untagged one is kept.
        let plan = solve(&roster, &layout, &reference, false).expect("solvable");
        let trading: Vec<&str> = plan
            .slots_in(FacilityKind::Trading)
            .map(|s| s.operator_id.as_str())
            .collect();
        assert_eq!(trading, vec!["b_plain"]);
        assert!(plan.slot_for("a_versatile").is_none());
    }

    #[test]
    fn test_contention_goes_to_bigger_loss() {
        let mut shared = profile("shared", FacilityKind::Trading, [10.0, 20.0, 30.0]);
        shared.manufacturing = Some([10.0, 20.0, 30.0]);

        let operators = vec![
            shared,
            profile("t_alt", FacilityKind::Trading, [4.0, 7.0, 10.0]),
            profile("m_spare", FacilityKind::Manufacturing, [10.0, 19.0, 28.0]),
            profile("m1", FacilityKind::Manufacturing, [9.0, 17.0, 25.0]),
            profile("m2", FacilityKind::Manufacturing, [9.0, 17.0, 25.0]),
            profile("m3", FacilityKind::Manufacturing, [9.0, 17.0, 25.0]),
            profile("m4", FacilityKind::Manufacturing, [9.0, 17.0, 25.0]),
            profile("p1", FacilityKind::Power, [5.0, 8.0, 11.0]),
            profile("p2", FacilityKind::Power, [5.0, 8.0, 10.0]),
            profile("p3", FacilityKind::Power, [5.0, 8.0, 9.0]),
        ];
        let roster: Vec<Operator> = operators.iter().map(|p| op_from(p, 2)).collect();
        let reference = reference_of(operators, Vec::new());
        let layout = LayoutConfig {
            trading: 1,
            manufacturing: 5,
            trading_targets: TradingTargets { lmd: 1, orundum: 0 },
            manufacturing_targets: ManufacturingTargets {
                pure_gold: 2,
                battle_record: 3,
                originium_shard: 0,
            },
            auto_recharge: false,
            accelerant: Default::default(),
        };

        // Trading would drop 30 to 10; manufacturing only 30 to 28.
        let plan = solve(&roster, &layout, &reference, false).expect("solvable");
        let slot = plan.slot_for("shared").expect("shared operator is placed");
        assert_eq!(slot.kind, FacilityKind::Trading);
        assert!(plan.slot_for("m_spare").is_some(), "manufacturing refilled");
        assert_eq!(plan.slots.len(), 9);
    }

    #[test]
    fn test_large_pool_takes_fallback_and_picks_top_values() {
        // C(50, 4) = 230_300 sits just over the enumeration budget.
        let mut operators: Vec<OperatorProfile> = (0..50)
            .map(|i| {
                profile(
                    &format!("m{:03}", i),
                    FacilityKind::Manufacturing,
                    [1.0, 2.0, 5.0 + i as f32 * 0.25],
                )
            })
            .collect();
        operators.push(profile("t1", FacilityKind::Trading, [5.0, 10.0, 15.0]));
        operators.push(profile("t2", FacilityKind::Trading, [5.0, 10.0, 14.0]));
        operators.push(profile("p1", FacilityKind::Power, [5.0, 8.0, 11.0]));
        operators.push(profile("p2", FacilityKind::Power, [5.0, 8.0, 10.0]));
        operators.push(profile("p3", FacilityKind::Power, [5.0, 8.0, 9.0]));

        let roster: Vec<Operator> = operators.iter().map(|p| op_from(p, 2)).collect();
        let reference = reference_of(operators, Vec::new());
        let layout = LayoutPreset::Balanced243.config();

        let plan = solve(&roster, &layout, &reference, false).expect("solvable");
        let mut picked: Vec<String> = plan
            .slots_in(FacilityKind::Manufacturing)
            .map(|s| s.operator_id.clone())
            .collect();
        picked.sort();
        assert_eq!(picked, vec!["m046", "m047", "m048", "m049"]);
    }

    #[test]
    fn test_rotation_tallies_account_for_policy() {
        let reference = ReferenceData::builtin();
        let ids = [
            "char_102_texas",
            "char_103_angel",
            "char_284_spot",
            "char_196_sunbr",
            "char_190_clour",
            "char_118_yuki",
            "char_285_medic2",
            "char_277_sqrrel",
            "char_253_greyy",
        ];
        let roster: Vec<Operator> = ids
            .iter()
            .map(|id| {
                let p = reference.profile(id).expect("builtin id");
                Operator {
                    id: p.id.clone(),
                    name: p.name.clone(),
                    elite: 2,
                    tags: p.tags.clone(),
                }
            })
            .collect();

        let mut layout = LayoutPreset::Balanced243.config();
        layout.auto_recharge = true;
        layout.accelerant.enabled = true;
        layout.accelerant.targets = [Product::Lmd, Product::PureGold, Product::Lmd];

        let plan = solve(&roster, &layout, &reference, false).expect("solvable");

        // Trading 30 + 28 + 6 + 6, manufacturing (24 + 25 + 23) * 1.25 + 24,
        // power 15 + 25 + 24 with the engineer pair adding 3 each.
        let group_sum =
            |kind: FacilityKind| -> f32 { plan.slots_in(kind).map(|s| s.contribution).sum() };
        assert!((group_sum(FacilityKind::Trading) - 70.0).abs() < 1e-3);
        assert!((group_sum(FacilityKind::Manufacturing) - 114.0).abs() < 1e-3);
        assert!((group_sum(FacilityKind::Power) - 70.0).abs() < 1e-3);
        assert!((plan.base_efficiency - 254.0).abs() < 1e-3);

        let debit = plan
            .slots
            .iter()
            .filter(|s| s.product.is_some())
            .map(|s| s.contribution)
            .fold(0.0, f32::max);
        let lmd: f32 = plan
            .slots
            .iter()
            .filter(|s| s.product == Some(Product::Lmd))
            .map(|s| s.contribution)
            .sum();
        let gold: f32 = plan
            .slots
            .iter()
            .filter(|s| s.product == Some(Product::PureGold))
            .map(|s| s.contribution)
            .sum();

        let expect_0 = plan.base_efficiency + ACCELERANT_BOOST_RATE * lmd - debit;
        let expect_1 = plan.base_efficiency + ACCELERANT_BOOST_RATE * gold - debit;
        assert!((plan.rotations[0].tally - expect_0).abs() < 1e-3);
        assert!((plan.rotations[1].tally - expect_1).abs() < 1e-3);
        assert!((plan.rotations[2].tally - expect_0).abs() < 1e-3);

        let mean = (plan.rotations[0].tally + plan.rotations[1].tally + plan.rotations[2].tally)
            / 3.0;
        assert!((plan.total_efficiency - mean).abs() < 1e-3);
    }

    #[test]
    fn test_post_order_boost_skips_debited_slot() {
        let reference = ReferenceData::builtin();
        let roster = builtin_roster(2);
        let mut layout = LayoutPreset::Balanced243.config();
        layout.auto_recharge = true;
        layout.accelerant.enabled = true;
        layout.accelerant.targets = [Product::Lmd, Product::Lmd, Product::Lmd];

        let pre = solve(&roster, &layout, &reference, false).expect("solvable");
        layout.accelerant.order = AccelerantOrder::Post;
        let post = solve(&roster, &layout, &reference, false).expect("solvable");

        // The top production slot is a trading slot here, so the post-order
        // boost loses that slot's share.
        assert!(post.rotations[0].boost < pre.rotations[0].boost);
        assert!(post.total_efficiency < pre.total_efficiency);
    }

    #[test]
    fn test_layout_without_trading_group() {
        let reference = ReferenceData::builtin();
        let roster = builtin_roster(2);
        let layout = LayoutConfig {
            trading: 0,
            manufacturing: 6,
            trading_targets: TradingTargets::default(),
            manufacturing_targets: ManufacturingTargets {
                pure_gold: 2,
                battle_record: 2,
                originium_shard: 2,
            },
            auto_recharge: false,
            accelerant: Default::default(),
        };

        let plan = solve(&roster, &layout, &reference, false).expect("solvable");
        assert_eq!(plan.slots_in(FacilityKind::Trading).count(), 0);
        assert_eq!(plan.slots_in(FacilityKind::Manufacturing).count(), 6);
        assert_eq!(plan.slots.len(), 9);
    }

    #[test]
    fn test_solver_is_deterministic() {
        let reference = ReferenceData::builtin();
        let roster = builtin_roster(1);
        let layout = LayoutPreset::Orundum333.config();

        let first = solve(&roster, &layout, &reference, false).expect("solvable");
        let second = solve(&roster, &layout, &reference, false).expect("solvable");
        assert_eq!(first, second);
    }
}
