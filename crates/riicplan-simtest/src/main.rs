//! RiicPlan Headless Planning Harness
//!
//! Validates the planning logic end to end without any host UI.
//! Runs entirely in-process; no files and no network.
//!
//! Usage:
//!   cargo run -p riicplan-simtest
//!   cargo run -p riicplan-simtest -- --verbose

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use riicplan_logic::constants::{FacilityKind, Product, POWER_SLOTS, TOTAL_SLOTS};
use riicplan_logic::engine::{solve, SolveError};
use riicplan_logic::layout::{validate_layout, LayoutPreset, LayoutViolation};
use riicplan_logic::reference::{OperatorProfile, ReferenceData, ReferenceTable};
use riicplan_logic::roster::{load_roster, LoadWarning, Operator, RawOperator, RosterError};
use riicplan_logic::snapshot::{load_plan, save_plan, PlanRecord, SnapshotError};
use riicplan_logic::upgrade::{diff, MIN_REPORTED_GAIN};

// ── Sample roster (same JSON shape hosts hand over) ─────────────────────
const SAMPLE_ROSTER_JSON: &str = include_str!("../../../data/sample_roster.json");

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn main() {
    let verbose = std::env::args().any(|a| a == "--verbose");
    println!("=== RiicPlan Planning Harness ===\n");

    let mut results = Vec::new();

    // 1. Reference data validation
    results.extend(validate_reference_data(verbose));

    // 2. Layout presets & validation
    results.extend(validate_layout_presets(verbose));

    // 3. Roster loader
    results.extend(validate_roster_loader(verbose));

    // 4. Assignment engine
    results.extend(validate_assignment_engine(verbose));

    // 5. Upgrade analysis
    results.extend(validate_upgrade_analysis(verbose));

    // 6. Plan snapshots
    results.extend(validate_snapshots(verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

fn sample_roster(reference: &ReferenceData) -> Vec<Operator> {
    let raw: Vec<RawOperator> =
        serde_json::from_str(SAMPLE_ROSTER_JSON).expect("sample_roster.json is invalid");
    load_roster(&raw, reference)
        .expect("sample roster loads")
        .operators
}

// ── 1. Reference Data ───────────────────────────────────────────────────

fn validate_reference_data(verbose: bool) -> Vec<TestResult> {
    println!("--- Reference Data ---");
    let mut results = Vec::new();

    let reference = ReferenceData::builtin();

    results.push(TestResult {
        name: "reference_version".into(),
        passed: !reference.version().is_empty(),
        detail: format!("data version {}", reference.version()),
    });

    let total = reference.profiles().count();
    results.push(TestResult {
        name: "reference_not_empty".into(),
        passed: total >= 20,
        detail: format!("{} operator profiles loaded", total),
    });

    // Enough hands per group to fill the widest preset.
    let mut eligible = Vec::new();
    for kind in FacilityKind::ALL {
        let count = reference
            .profiles()
            .filter(|p| reference.is_eligible(&p.id, kind))
            .count();
        eligible.push((kind, count));
    }
    let trading = eligible[0].1;
    let manufacturing = eligible[1].1;
    let power = eligible[2].1;
    results.push(TestResult {
        name: "reference_group_coverage".into(),
        passed: trading >= 3 && manufacturing >= 5 && power >= POWER_SLOTS as usize,
        detail: format!(
            "trading={} manufacturing={} power={}",
            trading, manufacturing, power
        ),
    });

    results.push(TestResult {
        name: "reference_has_synergies".into(),
        passed: !reference.rules().is_empty(),
        detail: format!("{} synergy rules", reference.rules().len()),
    });

    // Ladders grow with promotion for a known profile.
    let low = reference.base_value("char_102_texas", FacilityKind::Trading, 0);
    let high = reference.base_value("char_102_texas", FacilityKind::Trading, 2);
    results.push(TestResult {
        name: "reference_ladder_monotone".into(),
        passed: matches!((low, high), (Some(l), Some(h)) if h > l),
        detail: format!("texas trading {:?} -> {:?}", low, high),
    });

    if verbose {
        println!("  Eligible operators by group:");
        for (kind, count) in &eligible {
            println!("    {:13}: {}", kind.label(), count);
        }
    }

    results
}

// ── 2. Layout Presets ───────────────────────────────────────────────────

fn validate_layout_presets(_verbose: bool) -> Vec<TestResult> {
    println!("--- Layout Presets ---");
    let mut results = Vec::new();

    for preset in LayoutPreset::ALL {
        let config = preset.config();
        let violations = validate_layout(&config);
        let products_line_up = config.products(FacilityKind::Trading).len()
            == config.trading as usize
            && config.products(FacilityKind::Manufacturing).len() == config.manufacturing as usize;
        results.push(TestResult {
            name: format!("preset_{}_valid", preset.label().replace('-', "_")),
            passed: violations.is_empty() && config.power() == POWER_SLOTS && products_line_up,
            detail: format!(
                "trading={} manufacturing={} power={} violations={}",
                config.trading,
                config.manufacturing,
                config.power(),
                violations.len()
            ),
        });
    }

    // A lopsided split and a bad target sum are both reported at once.
    let mut broken = LayoutPreset::Balanced243.config();
    broken.manufacturing = 5;
    broken.manufacturing_targets.pure_gold = 4;
    let violations = validate_layout(&broken);
    let has_sum = violations
        .iter()
        .any(|v| matches!(v, LayoutViolation::GroupSumInvalid { .. }));
    let has_target = violations
        .iter()
        .any(|v| matches!(v, LayoutViolation::ManufacturingTargetMismatch { .. }));
    results.push(TestResult {
        name: "layout_collects_all_violations".into(),
        passed: has_sum && has_target && violations.len() == 2,
        detail: format!("{:?}", violations),
    });

    let mut unproduced = LayoutPreset::Balanced243.config();
    unproduced.accelerant.enabled = true;
    unproduced.accelerant.targets = [Product::Orundum, Product::Lmd, Product::Lmd];
    let violations = validate_layout(&unproduced);
    results.push(TestResult {
        name: "layout_accelerant_target_checked".into(),
        passed: violations
            .iter()
            .any(|v| matches!(v, LayoutViolation::AccelerantTargetUnproduced { rotation: 0, .. })),
        detail: format!("{:?}", violations),
    });

    results
}

// ── 3. Roster Loader ────────────────────────────────────────────────────

fn validate_roster_loader(_verbose: bool) -> Vec<TestResult> {
    println!("--- Roster Loader ---");
    let mut results = Vec::new();

    let reference = ReferenceData::builtin();

    let raw: Vec<RawOperator> = match serde_json::from_str(SAMPLE_ROSTER_JSON) {
        Ok(r) => r,
        Err(e) => {
            results.push(TestResult {
                name: "roster_parse".into(),
                passed: false,
                detail: format!("JSON parse error: {}", e),
            });
            return results;
        }
    };

    results.push(TestResult {
        name: "roster_parse".into(),
        passed: raw.len() == 16,
        detail: format!("{} raw records", raw.len()),
    });

    match load_roster(&raw, &reference) {
        Ok(load) => {
            results.push(TestResult {
                name: "roster_sample_clean".into(),
                passed: load.operators.len() == 15 && load.warnings.is_empty(),
                detail: format!(
                    "{} operators, {} warnings",
                    load.operators.len(),
                    load.warnings.len()
                ),
            });
            results.push(TestResult {
                name: "roster_skips_unowned".into(),
                passed: !load.operators.iter().any(|o| o.id == "char_486_takila"),
                detail: "not-owned record left out".into(),
            });
        }
        Err(e) => results.push(TestResult {
            name: "roster_sample_clean".into(),
            passed: false,
            detail: format!("load failed: {}", e),
        }),
    }

    // Unknown identity drops the record with a warning.
    let mut with_ghost = raw.clone();
    with_ghost.push(RawOperator {
        id: "char_999_ghost".into(),
        name: String::new(),
        elite: 1,
        level: 30,
        potential: 0,
        own: true,
        tags: Vec::new(),
    });
    let ghost_load = load_roster(&with_ghost, &reference);
    results.push(TestResult {
        name: "roster_warns_unknown".into(),
        passed: matches!(
            &ghost_load,
            Ok(load) if load.warnings
                == vec![LoadWarning::UnknownOperator { id: "char_999_ghost".into() }]
        ),
        detail: format!("{:?}", ghost_load.map(|l| l.warnings)),
    });

    // Out-of-range promotion level is clamped with a warning.
    let mut overleveled = raw.clone();
    overleveled[0].elite = 9;
    let clamp_load = load_roster(&overleveled, &reference);
    results.push(TestResult {
        name: "roster_clamps_levels".into(),
        passed: matches!(
            &clamp_load,
            Ok(load) if load.operators[0].elite == 2
                && load.warnings
                    == vec![LoadWarning::LevelClamped {
                        id: "char_102_texas".into(),
                        given: 9,
                        clamped: 2,
                    }]
        ),
        detail: format!("{:?}", clamp_load.map(|l| l.warnings)),
    });

    // Duplicate identity fails the whole load.
    let mut doubled = raw.clone();
    doubled.push(raw[0].clone());
    let dup = load_roster(&doubled, &reference);
    results.push(TestResult {
        name: "roster_rejects_duplicates".into(),
        passed: matches!(
            dup,
            Err(RosterError::DuplicateOperator { ref id }) if id == "char_102_texas"
        ),
        detail: "duplicate id is a hard error".into(),
    });

    results
}

// ── 4. Assignment Engine ────────────────────────────────────────────────

fn validate_assignment_engine(verbose: bool) -> Vec<TestResult> {
    println!("--- Assignment Engine ---");
    let mut results = Vec::new();

    let reference = ReferenceData::builtin();
    let roster = sample_roster(&reference);
    let layout = LayoutPreset::Balanced243.config();

    let current = match solve(&roster, &layout, &reference, false) {
        Ok(plan) => plan,
        Err(e) => {
            results.push(TestResult {
                name: "engine_solves_sample".into(),
                passed: false,
                detail: format!("solve failed: {}", e),
            });
            return results;
        }
    };

    let mut ids: Vec<&str> = current.slots.iter().map(|s| s.operator_id.as_str()).collect();
    ids.sort();
    ids.dedup();
    results.push(TestResult {
        name: "engine_solves_sample".into(),
        passed: current.slots.len() == TOTAL_SLOTS as usize && ids.len() == TOTAL_SLOTS as usize,
        detail: format!(
            "{} slots filled, total efficiency {:.2}",
            current.slots.len(),
            current.total_efficiency
        ),
    });

    // Product labels follow the configured targets.
    let orundum_layout = LayoutPreset::Orundum333.config();
    match solve(&roster, &orundum_layout, &reference, false) {
        Ok(plan) => {
            let trading_products: Vec<Option<Product>> = plan
                .slots_in(FacilityKind::Trading)
                .map(|s| s.product)
                .collect();
            results.push(TestResult {
                name: "engine_labels_products".into(),
                passed: trading_products
                    == vec![
                        Some(Product::Lmd),
                        Some(Product::Lmd),
                        Some(Product::Orundum),
                    ],
                detail: format!("{:?}", trading_products),
            });
        }
        Err(e) => results.push(TestResult {
            name: "engine_labels_products".into(),
            passed: false,
            detail: format!("solve failed: {}", e),
        }),
    }

    // Lifting the proficiency cap can only help.
    let ceiling = solve(&roster, &layout, &reference, true);
    results.push(TestResult {
        name: "engine_ceiling_not_below".into(),
        passed: matches!(
            &ceiling,
            Ok(c) if c.total_efficiency >= current.total_efficiency - 1e-4
        ),
        detail: match &ceiling {
            Ok(c) => format!(
                "current {:.2}, ceiling {:.2}",
                current.total_efficiency, c.total_efficiency
            ),
            Err(e) => format!("ceiling failed: {}", e),
        },
    });

    let again = solve(&roster, &layout, &reference, false);
    results.push(TestResult {
        name: "engine_deterministic".into(),
        passed: matches!(&again, Ok(plan) if *plan == current),
        detail: "same inputs, same plan".into(),
    });

    // Broken layouts never reach the solver proper.
    let mut broken = LayoutPreset::Balanced243.config();
    broken.trading = 4;
    results.push(TestResult {
        name: "engine_rejects_bad_layout".into(),
        passed: matches!(
            solve(&roster, &broken, &reference, false),
            Err(SolveError::InvalidLayout(_))
        ),
        detail: "group sums checked up front".into(),
    });

    // Too few power-capable operators is a hard error.
    let thin: Vec<Operator> = roster
        .iter()
        .filter(|o| !matches!(o.id.as_str(), "char_253_greyy" | "char_328_cammou" | "char_236_rope"))
        .cloned()
        .collect();
    let shorthanded = solve(&thin, &layout, &reference, false);
    results.push(TestResult {
        name: "engine_detects_shortage".into(),
        passed: matches!(
            shorthanded,
            Err(SolveError::InsufficientOperators {
                kind: FacilityKind::Power,
                required: 3,
                available: 2,
            })
        ),
        detail: "power group shortfall reported".into(),
    });

    // Policy toggles reshape the rotation tallies.
    let mut policy_layout = LayoutPreset::Balanced243.config();
    policy_layout.auto_recharge = true;
    policy_layout.accelerant.enabled = true;
    match solve(&roster, &policy_layout, &reference, false) {
        Ok(plan) => {
            let debit_expected = plan
                .slots
                .iter()
                .filter(|s| s.product.is_some())
                .map(|s| s.contribution)
                .fold(0.0, f32::max);
            let tallies_consistent = plan.rotations.iter().all(|r| {
                (r.tally - (plan.base_efficiency + r.boost - r.debit)).abs() < 1e-3
                    && (r.debit - debit_expected).abs() < 1e-3
            });
            let mean = plan.rotations.iter().map(|r| r.tally).sum::<f32>() / 3.0;
            results.push(TestResult {
                name: "engine_policy_tallies".into(),
                passed: tallies_consistent && (plan.total_efficiency - mean).abs() < 1e-3,
                detail: format!(
                    "boost {:.2}/{:.2}/{:.2}, debit {:.2}",
                    plan.rotations[0].boost,
                    plan.rotations[1].boost,
                    plan.rotations[2].boost,
                    debit_expected
                ),
            });
        }
        Err(e) => results.push(TestResult {
            name: "engine_policy_tallies".into(),
            passed: false,
            detail: format!("solve failed: {}", e),
        }),
    }

    // Oversized pools go through the fallback path and still fill up.
    results.push(wide_pool_sweep());

    if verbose {
        println!("  Sample plan:");
        for slot in &current.slots {
            println!(
                "    {:22} {:14} {:>7.2}",
                slot.room_label(),
                slot.operator_name,
                slot.contribution
            );
        }
    }

    results
}

/// Synthetic 60-operator manufacturing pool, well past the enumeration
/// budget for a four-slot group.
fn wide_pool_sweep() -> TestResult {
    let mut operators: Vec<OperatorProfile> = (0..60)
        .map(|i| {
            let top = 5.0 + i as f32 * 0.3;
            OperatorProfile {
                id: format!("sweep_m{:03}", i),
                name: format!("Sweep M{:03}", i),
                tags: Vec::new(),
                trading: None,
                manufacturing: Some([top * 0.4, top * 0.7, top]),
                power: None,
            }
        })
        .collect();
    for (id, kind) in [
        ("sweep_t1", FacilityKind::Trading),
        ("sweep_t2", FacilityKind::Trading),
        ("sweep_p1", FacilityKind::Power),
        ("sweep_p2", FacilityKind::Power),
        ("sweep_p3", FacilityKind::Power),
    ] {
        let mut profile = OperatorProfile {
            id: id.into(),
            name: id.into(),
            tags: Vec::new(),
            trading: None,
            manufacturing: None,
            power: None,
        };
        match kind {
            FacilityKind::Trading => profile.trading = Some([4.0, 8.0, 12.0]),
            FacilityKind::Manufacturing => profile.manufacturing = Some([4.0, 8.0, 12.0]),
            FacilityKind::Power => profile.power = Some([4.0, 8.0, 12.0]),
        }
        operators.push(profile);
    }

    let table = ReferenceTable {
        version: "sweep".into(),
        operators: operators.clone(),
        synergies: Vec::new(),
    };
    let reference = match ReferenceData::from_table(table) {
        Ok(r) => r,
        Err(e) => {
            return TestResult {
                name: "engine_wide_pool".into(),
                passed: false,
                detail: format!("table rejected: {}", e),
            }
        }
    };

    let mut rng = StdRng::seed_from_u64(7);
    let roster: Vec<Operator> = operators
        .iter()
        .map(|p| Operator {
            id: p.id.clone(),
            name: p.name.clone(),
            elite: rng.gen_range(0..3u8),
            tags: Vec::new(),
        })
        .collect();

    match solve(&roster, &LayoutPreset::Balanced243.config(), &reference, false) {
        Ok(plan) => TestResult {
            name: "engine_wide_pool".into(),
            passed: plan.slots.len() == TOTAL_SLOTS as usize,
            detail: format!(
                "{} candidates handled, efficiency {:.2}",
                roster.len(),
                plan.total_efficiency
            ),
        },
        Err(e) => TestResult {
            name: "engine_wide_pool".into(),
            passed: false,
            detail: format!("solve failed: {}", e),
        },
    }
}

// ── 5. Upgrade Analysis ─────────────────────────────────────────────────

fn validate_upgrade_analysis(verbose: bool) -> Vec<TestResult> {
    println!("--- Upgrade Analysis ---");
    let mut results = Vec::new();

    let reference = ReferenceData::builtin();
    let roster = sample_roster(&reference);
    let layout = LayoutPreset::Balanced243.config();

    let plans = solve(&roster, &layout, &reference, false)
        .and_then(|current| solve(&roster, &layout, &reference, true).map(|c| (current, c)));
    let (current, ceiling) = match plans {
        Ok(pair) => pair,
        Err(e) => {
            results.push(TestResult {
                name: "upgrade_list_sorted".into(),
                passed: false,
                detail: format!("solve failed: {}", e),
            });
            return results;
        }
    };

    let upgrades = diff(&current, &ceiling, &roster, &layout, &reference);
    let sorted = upgrades.windows(2).all(|w| w[0].gain >= w[1].gain - 1e-6);
    let meaningful = upgrades
        .iter()
        .all(|u| u.gain >= MIN_REPORTED_GAIN && u.upgrade_cost() > 0);
    results.push(TestResult {
        name: "upgrade_list_sorted".into(),
        passed: sorted && meaningful,
        detail: format!("{} suggestions, sorted by gain", upgrades.len()),
    });

    results.push(TestResult {
        name: "upgrade_sample_has_room".into(),
        passed: !upgrades.is_empty(),
        detail: "mixed-level sample leaves efficiency on the table".into(),
    });

    let maxed: Vec<Operator> = roster
        .iter()
        .map(|o| Operator {
            elite: 2,
            ..o.clone()
        })
        .collect();
    let maxed_diff = solve(&maxed, &layout, &reference, false)
        .and_then(|cur| solve(&maxed, &layout, &reference, true).map(|c| (cur, c)))
        .map(|(cur, ceil)| diff(&cur, &ceil, &maxed, &layout, &reference));
    results.push(TestResult {
        name: "upgrade_maxed_is_empty".into(),
        passed: matches!(&maxed_diff, Ok(items) if items.is_empty()),
        detail: "fully promoted roster needs nothing".into(),
    });

    if verbose {
        println!("  Top suggestions:");
        for item in upgrades.iter().take(3) {
            let who: Vec<&str> = item
                .operators
                .iter()
                .map(|c| c.operator_name.as_str())
                .collect();
            println!(
                "    +{:.2} ({} levels): {}",
                item.gain,
                item.upgrade_cost(),
                who.join(" + ")
            );
        }
    }

    results
}

// ── 6. Plan Snapshots ───────────────────────────────────────────────────

fn validate_snapshots(_verbose: bool) -> Vec<TestResult> {
    println!("--- Plan Snapshots ---");
    let mut results = Vec::new();

    let reference = ReferenceData::builtin();
    let roster = sample_roster(&reference);
    let layout = LayoutPreset::Balanced243.config();

    let record = match solve(&roster, &layout, &reference, false).and_then(|current| {
        solve(&roster, &layout, &reference, true).map(|ceiling| {
            let upgrades = diff(&current, &ceiling, &roster, &layout, &reference);
            PlanRecord::new(reference.version().to_string(), current, ceiling, upgrades)
        })
    }) {
        Ok(record) => record,
        Err(e) => {
            results.push(TestResult {
                name: "snapshot_roundtrip".into(),
                passed: false,
                detail: format!("solve failed: {}", e),
            });
            return results;
        }
    };

    let mut buffer: Vec<u8> = Vec::new();
    let roundtrip = save_plan(&mut buffer, &record)
        .and_then(|_| load_plan(buffer.as_slice()))
        .map(|loaded| loaded == record);
    results.push(TestResult {
        name: "snapshot_roundtrip".into(),
        passed: matches!(roundtrip, Ok(true)),
        detail: format!("{} bytes round-tripped", buffer.len()),
    });

    let mut stale = record.clone();
    stale.version = 99;
    let mut stale_buffer: Vec<u8> = Vec::new();
    let mismatch = save_plan(&mut stale_buffer, &stale)
        .and_then(|_| load_plan(stale_buffer.as_slice()));
    results.push(TestResult {
        name: "snapshot_version_checked".into(),
        passed: matches!(
            mismatch,
            Err(SnapshotError::VersionMismatch {
                expected: 1,
                found: 99,
            })
        ),
        detail: "stale format version rejected".into(),
    });

    results
}
