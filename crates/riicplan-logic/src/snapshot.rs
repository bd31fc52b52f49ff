//! Plan snapshots.
//!
//! A solved day can be frozen into a versioned binary record so a host
//! can stash it and compare a later run against it. The record carries
//! the reference data version it was computed with; hosts should treat
//! a version drift as a reason to re-solve.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::engine::Assignment;
use crate::upgrade::UpgradeItem;

/// Bump when the record layout changes incompatibly.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Everything worth keeping from one planning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRecord {
    /// Snapshot format version, checked on load.
    pub version: u32,
    /// Version string of the reference data the plans were solved with.
    pub data_version: String,
    pub current: Assignment,
    pub ceiling: Assignment,
    pub upgrades: Vec<UpgradeItem>,
}

impl PlanRecord {
    pub fn new(
        data_version: String,
        current: Assignment,
        ceiling: Assignment,
        upgrades: Vec<UpgradeItem>,
    ) -> Self {
        PlanRecord {
            version: SNAPSHOT_VERSION,
            data_version,
            current,
            ceiling,
            upgrades,
        }
    }
}

#[derive(Debug)]
pub enum SnapshotError {
    Bincode(bincode::Error),
    VersionMismatch { expected: u32, found: u32 },
}

impl From<bincode::Error> for SnapshotError {
    fn from(err: bincode::Error) -> Self {
        SnapshotError::Bincode(err)
    }
}

impl std::fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotError::Bincode(err) => write!(f, "snapshot encoding error: {}", err),
            SnapshotError::VersionMismatch { expected, found } => write!(
                f,
                "snapshot version mismatch: expected {}, found {}",
                expected, found
            ),
        }
    }
}

impl std::error::Error for SnapshotError {}

/// Writes a plan record to any writer.
pub fn save_plan<W: Write>(writer: W, plan: &PlanRecord) -> Result<(), SnapshotError> {
    bincode::serialize_into(writer, plan)?;
    Ok(())
}

/// Reads a plan record back and checks the format version.
pub fn load_plan<R: Read>(reader: R) -> Result<PlanRecord, SnapshotError> {
    let record: PlanRecord = bincode::deserialize_from(reader)?;
    if record.version != SNAPSHOT_VERSION {
        return Err(SnapshotError::VersionMismatch {
            expected: SNAPSHOT_VERSION,
            found: record.version,
        });
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::rotations;
    use crate::engine::RotationTally;

    fn sample_record() -> PlanRecord {
        let empty = Assignment {
            slots: Vec::new(),
            base_efficiency: 0.0,
            rotations: [RotationTally {
                rotation: 0,
                boost: 0.0,
                debit: 0.0,
                tally: 0.0,
            }; rotations::COUNT],
            total_efficiency: 0.0,
        };
        PlanRecord::new(
            "2026-07-30".to_string(),
            empty.clone(),
            empty,
            Vec::new(),
        )
    }

    #[test]
    fn test_save_load_roundtrip() {
        let record = sample_record();
        let mut buffer: Vec<u8> = Vec::new();
        save_plan(&mut buffer, &record).expect("save succeeds");

        let loaded = load_plan(buffer.as_slice()).expect("load succeeds");
        assert_eq!(loaded, record);
    }

    #[test]
    fn test_version_mismatch_is_rejected() {
        let mut record = sample_record();
        record.version = 99;
        let mut buffer: Vec<u8> = Vec::new();
        save_plan(&mut buffer, &record).expect("save succeeds");

        match load_plan(buffer.as_slice()) {
            Err(SnapshotError::VersionMismatch { expected, found }) => {
                assert_eq!(expected, SNAPSHOT_VERSION);
                assert_eq!(found, 99);
            }
            other => panic!("expected version mismatch, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_truncated_stream_fails_cleanly() {
        let record = sample_record();
        let mut buffer: Vec<u8> = Vec::new();
        save_plan(&mut buffer, &record).expect("save succeeds");
        buffer.truncate(buffer.len() / 2);

        match load_plan(buffer.as_slice()) {
            Err(SnapshotError::Bincode(_)) => {}
            other => panic!("expected decode failure, got {:?}", other.map(|_| ())),
        }
    }
}
