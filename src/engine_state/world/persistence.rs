//! # Persistence Module
//!
//! Saves and restores the voxel population as a slot-ordered snapshot.
//!
//! The wire format is a JSON array of flat records, one per occupied cell,
//! carrying the cell coordinate, the block type encoding, and the mirror
//! slot the voxel held when saved. The slot is authoritative: load hands
//! back each voxel under its saved slot, sorted ascending, so replaying
//! through the store's restore path reproduces the exact save-time slot
//! assignment, holes from cleared voxels included.

use std::fs;
use std::path::Path;

use cgmath::Point3;
use log::info;
use serde::{Deserialize, Serialize};

use super::block_type::{BlockType, BlockTypeSize};
use super::error::WorldError;
use super::voxel_store::{SlotIndex, Voxel};

/// One voxel as it appears in a snapshot file.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoxelRecord {
    /// Cell x coordinate
    pub x: i32,
    /// Cell y coordinate
    pub y: i32,
    /// Cell z coordinate
    pub z: i32,
    /// Compact block type encoding
    pub block_type: BlockTypeSize,
    /// Mirror slot at save time, the replay sort key
    pub slot: SlotIndex,
}

/// Writes `voxels` to `path` as a slot-ordered JSON snapshot.
///
/// The caller passes the store's `snapshot()` output, which is already
/// slot-ascending; the order is preserved verbatim in the file.
///
/// # Errors
/// `WorldError::Snapshot` when the directory cannot be created or the file
/// cannot be written.
pub fn save_snapshot<P: AsRef<Path>>(path: P, voxels: &[Voxel]) -> Result<(), WorldError> {
    let records: Vec<VoxelRecord> = voxels
        .iter()
        .map(|voxel| VoxelRecord {
            x: voxel.position.x,
            y: voxel.position.y,
            z: voxel.position.z,
            block_type: voxel.block_type.as_int(),
            slot: voxel.slot,
        })
        .collect();

    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(&path, serde_json::to_vec(&records)?)?;
    info!(
        "saved {} voxels to {}",
        records.len(),
        path.as_ref().display()
    );
    Ok(())
}

/// Reads a snapshot from `path` and returns the voxels in replay order.
///
/// Records are sorted by their saved slot and keep that slot, so restoring
/// the result in sequence reproduces the saved slot assignment exactly.
///
/// # Errors
/// `WorldError::Snapshot` when the file cannot be read, the JSON is
/// malformed, or a record carries an unknown block type encoding.
pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<Vec<Voxel>, WorldError> {
    let bytes = fs::read(&path)?;
    let mut records: Vec<VoxelRecord> = serde_json::from_slice(&bytes)?;
    records.sort_by_key(|record| record.slot);

    let mut voxels = Vec::with_capacity(records.len());
    for record in records {
        let block_type = BlockType::from_int(record.block_type).ok_or_else(|| {
            WorldError::Snapshot(format!(
                "unknown block type encoding {} at ({}, {}, {})",
                record.block_type, record.x, record.y, record.z
            ))
        })?;
        voxels.push(Voxel {
            position: Point3::new(record.x, record.y, record.z),
            block_type,
            slot: record.slot,
        });
    }

    info!(
        "loaded {} voxels from {}",
        voxels.len(),
        path.as_ref().display()
    );
    Ok(voxels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::world::voxel_store::{SparseVoxelStore, VoxelStorage};

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("{}-{}.json", name, fastrand::u64(..)))
    }

    #[test]
    fn snapshot_round_trips_through_a_file() {
        let mut store = SparseVoxelStore::new();
        store.set(Point3::new(1, 2, 3), BlockType::GRASS).unwrap();
        store.set(Point3::new(4, 5, 6), BlockType::ROAD).unwrap();
        store.set(Point3::new(7, 8, 9), BlockType::SLATE).unwrap();
        store.clear(Point3::new(4, 5, 6));

        let path = temp_path("snapshot-round-trip");
        let saved = store.snapshot();
        save_snapshot(&path, &saved).unwrap();

        let loaded = load_snapshot(&path).unwrap();
        let mut restored = SparseVoxelStore::new();
        for voxel in &loaded {
            restored
                .restore(voxel.position, voxel.block_type, voxel.slot)
                .unwrap();
        }
        fs::remove_file(&path).ok();

        assert_eq!(restored.occupied_count(), 2);
        assert_eq!(
            restored.get(Point3::new(1, 2, 3)).unwrap().block_type,
            BlockType::GRASS
        );
        // Save-time slots survive the file, the cleared hole included.
        assert_eq!(restored.snapshot(), saved);
    }

    #[test]
    fn load_sorts_records_by_saved_slot() {
        let path = temp_path("snapshot-unsorted");
        let records = vec![
            VoxelRecord {
                x: 9,
                y: 9,
                z: 9,
                block_type: BlockType::PILLAR.as_int(),
                slot: 12,
            },
            VoxelRecord {
                x: 1,
                y: 1,
                z: 1,
                block_type: BlockType::SLATE.as_int(),
                slot: 3,
            },
        ];
        fs::write(&path, serde_json::to_vec(&records).unwrap()).unwrap();

        let voxels = load_snapshot(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(voxels[0].position, Point3::new(1, 1, 1));
        assert_eq!(voxels[0].slot, 3);
        assert_eq!(voxels[1].position, Point3::new(9, 9, 9));
        assert_eq!(voxels[1].slot, 12);
    }

    #[test]
    fn unknown_block_encoding_is_a_snapshot_error() {
        let path = temp_path("snapshot-bad-type");
        let records = vec![VoxelRecord {
            x: 0,
            y: 0,
            z: 0,
            block_type: 200,
            slot: 0,
        }];
        fs::write(&path, serde_json::to_vec(&records).unwrap()).unwrap();

        let result = load_snapshot(&path);
        fs::remove_file(&path).ok();
        assert!(matches!(result, Err(WorldError::Snapshot(_))));
    }

    #[test]
    fn missing_file_is_a_snapshot_error() {
        let result = load_snapshot(temp_path("snapshot-missing"));
        assert!(matches!(result, Err(WorldError::Snapshot(_))));
    }
}
