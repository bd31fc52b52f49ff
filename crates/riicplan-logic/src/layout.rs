//! Base layout and scheduling policy.
//!
//! A [`LayoutConfig`] describes how the nine working slots split between
//! trading, manufacturing and power, which commodity each production slot
//! targets, and the policy toggles the solver has to account for.
//! Validation collects every problem instead of stopping at the first so
//! a host UI can show them all at once.

use serde::{Deserialize, Serialize};

use crate::constants::{rotations, FacilityKind, Product, POWER_SLOTS, TOTAL_SLOTS};

/// Slot counts per trading commodity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingTargets {
    pub lmd: u32,
    pub orundum: u32,
}

/// Slot counts per manufacturing commodity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManufacturingTargets {
    pub pure_gold: u32,
    pub battle_record: u32,
    pub originium_shard: u32,
}

/// When the accelerant boost lands relative to the rotation's output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccelerantOrder {
    #[default]
    Pre,
    Post,
}

/// Accelerant usage policy: one boosted commodity per rotation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccelerantPolicy {
    pub enabled: bool,
    pub order: AccelerantOrder,
    /// Boost target for each of the three rotations.
    pub targets: [Product; rotations::COUNT],
}

impl Default for AccelerantPolicy {
    fn default() -> Self {
        AccelerantPolicy {
            enabled: false,
            order: AccelerantOrder::Pre,
            targets: [Product::Lmd, Product::PureGold, Product::Lmd],
        }
    }
}

/// Full layout plus policy toggles. The power slot count is derived, not
/// stored: whatever the production groups leave of the nine slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub trading: u32,
    pub manufacturing: u32,
    pub trading_targets: TradingTargets,
    pub manufacturing_targets: ManufacturingTargets,
    /// Debit the strongest production contribution each rotation to keep
    /// drones topped up.
    pub auto_recharge: bool,
    pub accelerant: AccelerantPolicy,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutPreset::Balanced243.config()
    }
}

impl LayoutConfig {
    /// Power slots left over after the production groups.
    pub fn power(&self) -> u32 {
        TOTAL_SLOTS.saturating_sub(self.trading + self.manufacturing)
    }

    /// Slot count for one facility group.
    pub fn slots(&self, kind: FacilityKind) -> u32 {
        match kind {
            FacilityKind::Trading => self.trading,
            FacilityKind::Manufacturing => self.manufacturing,
            FacilityKind::Power => self.power(),
        }
    }

    /// Configured slot count for one commodity.
    pub fn product_slots(&self, product: Product) -> u32 {
        match product {
            Product::Lmd => self.trading_targets.lmd,
            Product::Orundum => self.trading_targets.orundum,
            Product::PureGold => self.manufacturing_targets.pure_gold,
            Product::BattleRecord => self.manufacturing_targets.battle_record,
            Product::OriginiumShard => self.manufacturing_targets.originium_shard,
        }
    }

    /// Commodity for each slot of a group, in configured order. Power
    /// slots produce nothing and get an empty list.
    pub fn products(&self, kind: FacilityKind) -> Vec<Product> {
        let mut out = Vec::new();
        for product in Product::ALL {
            if product.kind() == kind {
                for _ in 0..self.product_slots(product) {
                    out.push(product);
                }
            }
        }
        out
    }
}

/// Shipped layout presets, named after their trading/manufacturing/power
/// split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum LayoutPreset {
    Balanced243 = 0,
    Orundum333 = 1,
    Factory153 = 2,
}

impl LayoutPreset {
    pub const ALL: [LayoutPreset; 3] = [
        LayoutPreset::Balanced243,
        LayoutPreset::Orundum333,
        LayoutPreset::Factory153,
    ];

    pub fn label(self) -> &'static str {
        match self {
            LayoutPreset::Balanced243 => "2-4-3",
            LayoutPreset::Orundum333 => "3-3-3",
            LayoutPreset::Factory153 => "1-5-3",
        }
    }

    pub fn config(self) -> LayoutConfig {
        match self {
            LayoutPreset::Balanced243 => LayoutConfig {
                trading: 2,
                manufacturing: 4,
                trading_targets: TradingTargets { lmd: 2, orundum: 0 },
                manufacturing_targets: ManufacturingTargets {
                    pure_gold: 2,
                    battle_record: 2,
                    originium_shard: 0,
                },
                auto_recharge: false,
                accelerant: AccelerantPolicy::default(),
            },
            LayoutPreset::Orundum333 => LayoutConfig {
                trading: 3,
                manufacturing: 3,
                trading_targets: TradingTargets { lmd: 2, orundum: 1 },
                manufacturing_targets: ManufacturingTargets {
                    pure_gold: 2,
                    battle_record: 0,
                    originium_shard: 1,
                },
                auto_recharge: false,
                accelerant: AccelerantPolicy::default(),
            },
            LayoutPreset::Factory153 => LayoutConfig {
                trading: 1,
                manufacturing: 5,
                trading_targets: TradingTargets { lmd: 1, orundum: 0 },
                manufacturing_targets: ManufacturingTargets {
                    pure_gold: 2,
                    battle_record: 3,
                    originium_shard: 0,
                },
                auto_recharge: false,
                accelerant: AccelerantPolicy::default(),
            },
        }
    }
}

/// A single problem found by [`validate_layout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutViolation {
    /// Production groups do not leave exactly the fixed power allotment.
    GroupSumInvalid { trading: u32, manufacturing: u32 },
    /// Trading commodity targets do not sum to the trading slot count.
    TradingTargetMismatch { expected: u32, got: u32 },
    /// Manufacturing commodity targets do not sum to the manufacturing
    /// slot count.
    ManufacturingTargetMismatch { expected: u32, got: u32 },
    /// Accelerant targets a commodity no configured slot produces.
    AccelerantTargetUnproduced { rotation: u8, product: Product },
}

/// Checks a layout and returns every violation found. An empty result
/// means the layout is solvable in principle.
pub fn validate_layout(config: &LayoutConfig) -> Vec<LayoutViolation> {
    let mut violations = Vec::new();

    if config.trading + config.manufacturing != TOTAL_SLOTS - POWER_SLOTS {
        violations.push(LayoutViolation::GroupSumInvalid {
            trading: config.trading,
            manufacturing: config.manufacturing,
        });
    }

    let trading_sum = config.trading_targets.lmd + config.trading_targets.orundum;
    if trading_sum != config.trading {
        violations.push(LayoutViolation::TradingTargetMismatch {
            expected: config.trading,
            got: trading_sum,
        });
    }

    let manufacturing_sum = config.manufacturing_targets.pure_gold
        + config.manufacturing_targets.battle_record
        + config.manufacturing_targets.originium_shard;
    if manufacturing_sum != config.manufacturing {
        violations.push(LayoutViolation::ManufacturingTargetMismatch {
            expected: config.manufacturing,
            got: manufacturing_sum,
        });
    }

    if config.accelerant.enabled {
        for (rotation, product) in config.accelerant.targets.iter().enumerate() {
            if config.product_slots(*product) == 0 {
                violations.push(LayoutViolation::AccelerantTargetUnproduced {
                    rotation: rotation as u8,
                    product: *product,
                });
            }
        }
    }

    violations
}
