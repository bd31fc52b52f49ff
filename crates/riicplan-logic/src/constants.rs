//! Planning constants: facility kinds, products, slot totals, rotations.
//!
//! Simple shared constants with no host dependency.
//! Both the library solver and the native simtest use these.

use serde::{Deserialize, Serialize};

/// Total production slots in the base left wing (trading + manufacturing + power).
pub const TOTAL_SLOTS: u32 = 9;
/// Power plants required by the fixed nine-slot layout.
pub const POWER_SLOTS: u32 = 3;
/// Highest promotion (elite) level an operator can reach.
pub const ELITE_MAX: u8 = 2;
/// Promotion ladder length: levels 0, 1 and 2.
pub const ELITE_LEVELS: usize = 3;

pub mod rotations {
    pub const FIRST: u8 = 0; // 0000-0800
    pub const SECOND: u8 = 1; // 0800-1600
    pub const THIRD: u8 = 2; // 1600-0000
    /// Shift rotations per day.
    pub const COUNT: usize = 3;
}

/// Production facility category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum FacilityKind {
    /// Trading posts broker sales orders for a configured commodity.
    Trading = 0,
    /// Factories produce a configured commodity.
    Manufacturing = 1,
    /// Power plants keep drones charged; no configurable product.
    Power = 2,
}

impl FacilityKind {
    pub const ALL: [FacilityKind; 3] = [Self::Trading, Self::Manufacturing, Self::Power];

    pub fn from_u8(val: u8) -> Option<Self> {
        match val {
            0 => Some(Self::Trading),
            1 => Some(Self::Manufacturing),
            2 => Some(Self::Power),
            _ => None,
        }
    }

    /// Label used in room identifiers and reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Trading => "trading",
            Self::Manufacturing => "manufacturing",
            Self::Power => "power",
        }
    }
}

/// A commodity a trading or manufacturing slot can be configured to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Product {
    /// Trading: LMD sales orders.
    Lmd = 0,
    /// Trading: orundum brokerage orders.
    Orundum = 1,
    /// Manufacturing: pure gold bars.
    PureGold = 2,
    /// Manufacturing: combat drill battle records.
    BattleRecord = 3,
    /// Manufacturing: originium shards.
    OriginiumShard = 4,
}

impl Product {
    pub const ALL: [Product; 5] = [
        Self::Lmd,
        Self::Orundum,
        Self::PureGold,
        Self::BattleRecord,
        Self::OriginiumShard,
    ];

    pub fn from_u8(val: u8) -> Option<Self> {
        match val {
            0 => Some(Self::Lmd),
            1 => Some(Self::Orundum),
            2 => Some(Self::PureGold),
            3 => Some(Self::BattleRecord),
            4 => Some(Self::OriginiumShard),
            _ => None,
        }
    }

    /// Facility kind that can produce this commodity.
    pub fn kind(&self) -> FacilityKind {
        match self {
            Self::Lmd | Self::Orundum => FacilityKind::Trading,
            Self::PureGold | Self::BattleRecord | Self::OriginiumShard => {
                FacilityKind::Manufacturing
            }
        }
    }

    /// Label used in slot listings and reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Lmd => "lmd",
            Self::Orundum => "orundum",
            Self::PureGold => "pure_gold",
            Self::BattleRecord => "battle_record",
            Self::OriginiumShard => "originium_shard",
        }
    }
}
