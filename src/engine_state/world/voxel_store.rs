//! # Voxel Store Module
//!
//! Sparse storage and lookup for the voxels of the fixed cubic region.
//!
//! ## Storage Strategy
//!
//! The store is defined as a trait (`VoxelStorage`) so the backing shape can
//! be swapped without touching the facade: a hashed sparse map suits the low
//! fill fractions a desktop shell produces, a chunked dense array would suit
//! a mostly-solid region, and a true octree sits in between. The default
//! backing here is [`SparseVoxelStore`], a hash map keyed by cell coordinate
//! that allocates nothing for empty cells.
//!
//! ## Slot Allocation
//!
//! Every voxel receives a slot index at first insertion: the fixed offset in
//! the GPU instance mirror where its draw record lives. Slots are handed out
//! monotonically and are never reused within the store's lifetime, so
//! clearing a cell leaves a hole in the mirror rather than moving any other
//! voxel's record. Re-placing an occupied cell overwrites the type in place
//! and keeps the existing slot.
//!
//! ## Snapshot Ordering
//!
//! `snapshot()` returns voxels ordered by slot index ascending, each carrying
//! its slot. Replaying the sequence through `restore` reproduces the exact
//! save-time slot assignment, holes included, which is how persistence
//! round-trips the world.

use std::collections::HashMap;

use cgmath::Point3;

use super::block_type::BlockType;
use super::error::WorldError;

/// The fixed offset within a GPU instance mirror where one entity's draw
/// record lives.
pub type SlotIndex = u32;

/// The dimension (width, height, depth) of the voxel region in cells.
pub const REGION_DIMENSION: i32 = 128;

/// Reserved voxel slot namespace, shared with the voxel instance mirror.
///
/// Sized generously above any plausible peak occupancy: slots are not
/// reclaimed on removal, so the namespace must absorb churn as well as the
/// live population.
pub const VOXEL_SLOT_CAPACITY: u32 = 200_000;

/// One occupied cell of the region.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Voxel {
    /// Cell coordinate, each component in `[0, REGION_DIMENSION)`.
    pub position: Point3<i32>,
    /// The block type occupying the cell.
    pub block_type: BlockType,
    /// The mirror slot assigned at first insertion.
    pub slot: SlotIndex,
}

/// Returns true when every component of `position` lies inside the region.
pub fn in_region(position: Point3<i32>) -> bool {
    (0..REGION_DIMENSION).contains(&position.x)
        && (0..REGION_DIMENSION).contains(&position.y)
        && (0..REGION_DIMENSION).contains(&position.z)
}

/// The store interface the world facade and the ray caster depend on.
///
/// Implementations own voxel existence, type, and slot assignment. All
/// methods are synchronous; a failed `set` leaves the store unchanged.
pub trait VoxelStorage {
    /// Places or overwrites a voxel.
    ///
    /// A fresh insert assigns the next monotonically increasing slot index;
    /// re-setting an occupied cell overwrites the type and returns the
    /// existing slot without consuming a new one.
    ///
    /// # Errors
    /// * `WorldError::OutOfBounds` if the coordinate leaves the region
    /// * `WorldError::CapacityExceeded` if the slot namespace is exhausted
    fn set(&mut self, position: Point3<i32>, block_type: BlockType)
        -> Result<SlotIndex, WorldError>;

    /// Marks a cell empty and returns the slot the caller must neutralize in
    /// the mirror. The slot is never reassigned. Returns `None` for empty or
    /// out-of-range cells.
    fn clear(&mut self, position: Point3<i32>) -> Option<SlotIndex>;

    /// Read-only lookup. Out-of-range is a query miss, not an error.
    fn get(&self, position: Point3<i32>) -> Option<&Voxel>;

    /// Whether the cell currently holds a voxel.
    fn is_occupied(&self, position: Point3<i32>) -> bool {
        self.get(position).is_some()
    }

    /// All occupied voxels ordered by slot index ascending.
    ///
    /// This is the exact persistence format: each voxel carries its slot,
    /// and replaying through [`SparseVoxelStore::restore`] reproduces the
    /// identical slot assignment on reload.
    fn snapshot(&self) -> Vec<Voxel>;

    /// Number of currently occupied cells. Non-decreasing except on `clear`.
    fn occupied_count(&self) -> usize;

    /// One past the highest slot index ever assigned.
    ///
    /// With no compaction this is the instance count a draw call must cover;
    /// see the instance mirror for how sentinel holes are collapsed.
    fn slot_watermark(&self) -> SlotIndex;
}

/// Hash-map-backed sparse store, the default backing for low fill fractions.
pub struct SparseVoxelStore {
    cells: HashMap<Point3<i32>, Voxel>,
    next_slot: SlotIndex,
    slot_capacity: u32,
}

impl SparseVoxelStore {
    /// Creates an empty store with the default slot capacity.
    pub fn new() -> Self {
        Self::with_slot_capacity(VOXEL_SLOT_CAPACITY)
    }

    /// Creates an empty store with an explicit slot capacity.
    ///
    /// The capacity must match the reserved capacity of the instance mirror
    /// the store feeds; tests use small capacities to exercise the boundary.
    pub fn with_slot_capacity(slot_capacity: u32) -> Self {
        Self {
            cells: HashMap::new(),
            next_slot: 0,
            slot_capacity,
        }
    }

    /// Inserts a voxel under a previously assigned slot, for snapshot replay.
    ///
    /// The watermark advances past `slot`, so cleared-slot holes in the
    /// saved namespace stay holes and later fresh inserts cannot collide
    /// with a restored slot. Only meaningful on a store whose watermark sits
    /// at or below the incoming slots; `World::load` replays into a fresh
    /// store.
    ///
    /// # Errors
    /// * `WorldError::OutOfBounds` if the coordinate leaves the region
    /// * `WorldError::CapacityExceeded` if `slot` lies beyond the namespace
    pub fn restore(
        &mut self,
        position: Point3<i32>,
        block_type: BlockType,
        slot: SlotIndex,
    ) -> Result<(), WorldError> {
        if !in_region(position) {
            return Err(WorldError::OutOfBounds {
                x: position.x,
                y: position.y,
                z: position.z,
                region: REGION_DIMENSION,
            });
        }
        if slot >= self.slot_capacity {
            return Err(WorldError::CapacityExceeded {
                capacity: self.slot_capacity,
            });
        }

        self.cells.insert(
            position,
            Voxel {
                position,
                block_type,
                slot,
            },
        );
        self.next_slot = self.next_slot.max(slot + 1);
        Ok(())
    }
}

impl Default for SparseVoxelStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VoxelStorage for SparseVoxelStore {
    fn set(
        &mut self,
        position: Point3<i32>,
        block_type: BlockType,
    ) -> Result<SlotIndex, WorldError> {
        if !in_region(position) {
            return Err(WorldError::OutOfBounds {
                x: position.x,
                y: position.y,
                z: position.z,
                region: REGION_DIMENSION,
            });
        }

        if let Some(existing) = self.cells.get_mut(&position) {
            existing.block_type = block_type;
            return Ok(existing.slot);
        }

        if self.next_slot >= self.slot_capacity {
            return Err(WorldError::CapacityExceeded {
                capacity: self.slot_capacity,
            });
        }

        let slot = self.next_slot;
        self.next_slot += 1;
        self.cells.insert(
            position,
            Voxel {
                position,
                block_type,
                slot,
            },
        );
        Ok(slot)
    }

    fn clear(&mut self, position: Point3<i32>) -> Option<SlotIndex> {
        self.cells.remove(&position).map(|voxel| voxel.slot)
    }

    fn get(&self, position: Point3<i32>) -> Option<&Voxel> {
        self.cells.get(&position)
    }

    fn snapshot(&self) -> Vec<Voxel> {
        let mut voxels: Vec<Voxel> = self.cells.values().copied().collect();
        voxels.sort_by_key(|voxel| voxel.slot);
        voxels
    }

    fn occupied_count(&self) -> usize {
        self.cells.len()
    }

    fn slot_watermark(&self) -> SlotIndex {
        self.next_slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(x: i32, y: i32, z: i32) -> Point3<i32> {
        Point3::new(x, y, z)
    }

    #[test]
    fn set_then_get_returns_the_voxel() {
        let mut store = SparseVoxelStore::new();
        let slot = store.set(cell(2, 3, 4), BlockType::GRASS).unwrap();

        let voxel = store.get(cell(2, 3, 4)).unwrap();
        assert_eq!(voxel.slot, slot);
        assert_eq!(voxel.block_type, BlockType::GRASS);
        assert_eq!(store.occupied_count(), 1);
    }

    #[test]
    fn clear_then_get_returns_nothing() {
        let mut store = SparseVoxelStore::new();
        let slot = store.set(cell(1, 1, 1), BlockType::SLATE).unwrap();

        assert_eq!(store.clear(cell(1, 1, 1)), Some(slot));
        assert!(store.get(cell(1, 1, 1)).is_none());
        assert_eq!(store.occupied_count(), 0);
    }

    #[test]
    fn set_is_idempotent_on_slot_and_count() {
        let mut store = SparseVoxelStore::new();
        let first = store.set(cell(7, 7, 7), BlockType::ROAD).unwrap();
        let second = store.set(cell(7, 7, 7), BlockType::ROAD).unwrap();

        assert_eq!(first, second);
        assert_eq!(store.occupied_count(), 1);
    }

    #[test]
    fn reset_overwrites_type_in_place() {
        let mut store = SparseVoxelStore::new();
        let slot = store.set(cell(0, 0, 0), BlockType::SLATE).unwrap();
        let reused = store.set(cell(0, 0, 0), BlockType::PILLAR).unwrap();

        assert_eq!(slot, reused);
        assert_eq!(store.get(cell(0, 0, 0)).unwrap().block_type, BlockType::PILLAR);
    }

    #[test]
    fn out_of_bounds_set_is_rejected_without_effect() {
        let mut store = SparseVoxelStore::new();
        let result = store.set(cell(-1, 0, 0), BlockType::SLATE);
        assert!(matches!(result, Err(WorldError::OutOfBounds { .. })));

        let result = store.set(cell(0, REGION_DIMENSION, 0), BlockType::SLATE);
        assert!(matches!(result, Err(WorldError::OutOfBounds { .. })));
        assert_eq!(store.occupied_count(), 0);
        assert_eq!(store.slot_watermark(), 0);
    }

    #[test]
    fn out_of_range_get_is_a_miss_not_an_error() {
        let store = SparseVoxelStore::new();
        assert!(store.get(cell(-5, 200, 0)).is_none());
    }

    #[test]
    fn slots_are_not_reused_after_clear() {
        let mut store = SparseVoxelStore::new();
        let first = store.set(cell(1, 0, 0), BlockType::SLATE).unwrap();
        store.clear(cell(1, 0, 0));
        let second = store.set(cell(1, 0, 0), BlockType::SLATE).unwrap();

        assert_ne!(first, second);
        assert_eq!(store.slot_watermark(), 2);
        assert_eq!(store.occupied_count(), 1);
    }

    #[test]
    fn capacity_exhaustion_is_a_hard_error() {
        let mut store = SparseVoxelStore::with_slot_capacity(2);
        store.set(cell(0, 0, 0), BlockType::SLATE).unwrap();
        store.set(cell(1, 0, 0), BlockType::SLATE).unwrap();

        let result = store.set(cell(2, 0, 0), BlockType::SLATE);
        assert!(matches!(result, Err(WorldError::CapacityExceeded { capacity: 2 })));
        assert_eq!(store.occupied_count(), 2);

        // Overwriting an occupied cell still works at capacity.
        store.set(cell(0, 0, 0), BlockType::GRASS).unwrap();
    }

    #[test]
    fn snapshot_is_ordered_by_slot() {
        let mut store = SparseVoxelStore::new();
        store.set(cell(9, 0, 0), BlockType::SLATE).unwrap();
        store.set(cell(3, 2, 1), BlockType::ROAD).unwrap();
        store.set(cell(0, 5, 5), BlockType::GRASS).unwrap();
        store.clear(cell(3, 2, 1));

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.windows(2).all(|pair| pair[0].slot < pair[1].slot));
    }

    #[test]
    fn snapshot_replay_reproduces_slot_assignment() {
        let mut store = SparseVoxelStore::new();
        for _ in 0..200 {
            let position = cell(
                fastrand::i32(0..REGION_DIMENSION),
                fastrand::i32(0..REGION_DIMENSION),
                fastrand::i32(0..REGION_DIMENSION),
            );
            if fastrand::bool() {
                store.set(position, BlockType::SPECKLE).unwrap();
            } else {
                store.clear(position);
            }
        }

        let snapshot = store.snapshot();
        let mut replayed = SparseVoxelStore::new();
        for voxel in &snapshot {
            replayed
                .restore(voxel.position, voxel.block_type, voxel.slot)
                .unwrap();
        }

        // Identical (coordinate, slot, type) tuples, holes included.
        assert_eq!(replayed.snapshot(), snapshot);
        if let Some(last) = snapshot.last() {
            assert_eq!(replayed.slot_watermark(), last.slot + 1);
        }
    }

    #[test]
    fn restore_keeps_fresh_inserts_clear_of_restored_slots() {
        let mut store = SparseVoxelStore::new();
        store.restore(cell(0, 0, 0), BlockType::SLATE, 7).unwrap();

        let fresh = store.set(cell(1, 0, 0), BlockType::GRASS).unwrap();
        assert_eq!(fresh, 8);
        assert_eq!(store.slot_watermark(), 9);
    }

    #[test]
    fn restore_rejects_slots_beyond_the_namespace() {
        let mut store = SparseVoxelStore::with_slot_capacity(4);
        let result = store.restore(cell(0, 0, 0), BlockType::SLATE, 4);
        assert!(matches!(result, Err(WorldError::CapacityExceeded { capacity: 4 })));
        assert_eq!(store.occupied_count(), 0);
    }
}
