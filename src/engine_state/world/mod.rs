//! # World Module
//!
//! The simulation core of the shell: a bounded voxel region, the app
//! anchors placed inside it, and the per-frame view-ray selection. Nothing
//! in this module touches a graphics context; everything is synchronous and
//! runs on the engine thread, which keeps it directly testable.
//!
//! ## Mutation and Mirroring
//!
//! Every mutation either fully applies or leaves all state untouched, and
//! each successful one enqueues a [`SlotDelta`] describing the single GPU
//! mirror slot that must change. The engine drains the delta queues once
//! per frame and forwards them to the instance mirrors, so the GPU side is
//! always a slot-for-slot image of this module's state at frame boundaries.

pub mod app_registry;
pub mod app_surface;
pub mod block_type;
pub mod error;
pub mod persistence;
pub mod ray_caster;
pub mod voxel_store;

use std::path::Path;

use cgmath::{Point3, Vector3};
use log::warn;

use app_registry::{AppHandle, AppPlacementRegistry};
use app_surface::AppSurfaceHost;
use block_type::BlockType;
use error::WorldError;
use ray_caster::{RayCaster, RayHit};
use voxel_store::{SlotIndex, SparseVoxelStore, Voxel, VoxelStorage};

/// World-space edge length of one voxel cell.
pub const VOXEL_EDGE_LENGTH: f32 = 0.1;

/// Type tag marking an empty mirror record.
///
/// Live block types encode as non-negative integers; the vertex shader
/// collapses any instance carrying this tag to a degenerate primitive.
pub const EMPTY_TYPE_TAG: i32 = -1;

/// A pending single-slot change to one of the GPU instance mirrors.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum SlotDelta {
    /// Write a live record at `slot`.
    Upsert {
        /// Mirror slot to write
        slot: SlotIndex,
        /// World-space position of the record
        position: Point3<f32>,
        /// Non-negative type tag (block type encoding, or app handle)
        type_tag: i32,
    },
    /// Write the empty sentinel at `slot`.
    Clear {
        /// Mirror slot to neutralize
        slot: SlotIndex,
    },
}

/// The facade the engine drives: voxel store, app registry, selection, and
/// the pending mirror deltas of the current frame.
pub struct World {
    store: SparseVoxelStore,
    apps: AppPlacementRegistry,
    caster: RayCaster,
    selection: Option<RayHit>,
    focused_app: Option<AppHandle>,
    voxel_deltas: Vec<SlotDelta>,
    app_deltas: Vec<SlotDelta>,
}

impl World {
    /// Creates an empty world.
    pub fn new() -> Self {
        Self {
            store: SparseVoxelStore::new(),
            apps: AppPlacementRegistry::new(),
            caster: RayCaster::new(VOXEL_EDGE_LENGTH),
            selection: None,
            focused_app: None,
            voxel_deltas: Vec::new(),
            app_deltas: Vec::new(),
        }
    }

    /// World-space min corner of a cell.
    pub fn cell_world_position(cell: Point3<i32>) -> Point3<f32> {
        Point3::new(
            cell.x as f32 * VOXEL_EDGE_LENGTH,
            cell.y as f32 * VOXEL_EDGE_LENGTH,
            cell.z as f32 * VOXEL_EDGE_LENGTH,
        )
    }

    /// World-space center of a cell.
    pub fn cell_center(cell: Point3<i32>) -> Point3<f32> {
        let corner = Self::cell_world_position(cell);
        Point3::new(
            corner.x + VOXEL_EDGE_LENGTH * 0.5,
            corner.y + VOXEL_EDGE_LENGTH * 0.5,
            corner.z + VOXEL_EDGE_LENGTH * 0.5,
        )
    }

    // ------------------------------------------------------------------
    // Voxel mutation
    // ------------------------------------------------------------------

    /// Places or overwrites a voxel and queues the mirror upsert.
    pub fn set_voxel(
        &mut self,
        cell: Point3<i32>,
        block_type: BlockType,
    ) -> Result<SlotIndex, WorldError> {
        let slot = self.store.set(cell, block_type)?;
        self.voxel_deltas.push(SlotDelta::Upsert {
            slot,
            position: Self::cell_world_position(cell),
            type_tag: block_type.as_int() as i32,
        });
        Ok(slot)
    }

    /// Clears a cell and queues the mirror sentinel write.
    pub fn clear_voxel(&mut self, cell: Point3<i32>) -> Option<SlotIndex> {
        let slot = self.store.clear(cell)?;
        self.voxel_deltas.push(SlotDelta::Clear { slot });
        Some(slot)
    }

    /// Read-only cell lookup.
    pub fn voxel_at(&self, cell: Point3<i32>) -> Option<&Voxel> {
        self.store.get(cell)
    }

    /// Number of occupied cells.
    pub fn occupied_count(&self) -> usize {
        self.store.occupied_count()
    }

    /// Instance count a voxel draw must cover.
    ///
    /// This is the slot watermark, not the occupied count: slots are never
    /// compacted, so live voxels can sit above any number of sentinel holes
    /// and the draw has to span them all.
    pub fn voxel_draw_count(&self) -> u32 {
        self.store.slot_watermark()
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    /// Recomputes the looked-at cell from the camera. Called once per frame
    /// before edits are processed.
    pub fn update_selection(&mut self, eye: Point3<f32>, facing: Vector3<f32>) {
        self.selection = self.caster.cast(eye, facing, &self.store);
    }

    /// The current frame's selection, if the view ray hit a voxel.
    pub fn selection(&self) -> Option<RayHit> {
        self.selection
    }

    /// Places a voxel in the cell adjacent to the selected face.
    ///
    /// Returns `Ok(None)` when nothing is selected. A selection whose
    /// adjacent cell leaves the region is rejected with `OutOfBounds`.
    pub fn place_at_selection(
        &mut self,
        block_type: BlockType,
    ) -> Result<Option<SlotIndex>, WorldError> {
        match self.selection {
            Some(hit) => self.set_voxel(hit.adjacent_cell(), block_type).map(Some),
            None => Ok(None),
        }
    }

    /// Removes the selected voxel, invalidating the selection until the
    /// next recompute.
    pub fn remove_at_selection(&mut self) -> Option<SlotIndex> {
        let hit = self.selection.take()?;
        self.clear_voxel(hit.cell)
    }

    // ------------------------------------------------------------------
    // Apps
    // ------------------------------------------------------------------

    /// Anchors an app surface and queues the app mirror upsert.
    pub fn place_app(
        &mut self,
        handle: AppHandle,
        position: Point3<f32>,
    ) -> Result<SlotIndex, WorldError> {
        let slot = self.apps.place(handle, position)?;
        self.app_deltas.push(SlotDelta::Upsert {
            slot,
            position,
            type_tag: handle.0 as i32,
        });
        Ok(slot)
    }

    /// Removes an app anchor and queues the app mirror sentinel write.
    pub fn remove_app(&mut self, handle: AppHandle) -> Option<SlotIndex> {
        let slot = self.apps.remove(handle)?;
        if self.focused_app == Some(handle) {
            self.focused_app = None;
        }
        self.app_deltas.push(SlotDelta::Clear { slot });
        Some(slot)
    }

    /// The registry, for lookups the engine needs directly.
    pub fn apps(&self) -> &AppPlacementRegistry {
        &self.apps
    }

    /// The app whose anchor sits nearest the selected cell, within half a
    /// cell of its center.
    pub fn looked_at_app(&self) -> Option<AppHandle> {
        let hit = self.selection?;
        self.apps
            .lookup_by_position(Self::cell_center(hit.cell), VOXEL_EDGE_LENGTH)
            .map(|anchor| anchor.handle)
    }

    /// Moves focus and notifies the surface host.
    pub fn set_focus(&mut self, handle: Option<AppHandle>, host: &mut dyn AppSurfaceHost) {
        if self.focused_app != handle {
            self.focused_app = handle;
            host.focus_changed(handle);
        }
    }

    /// The app currently holding focus.
    pub fn focused_app(&self) -> Option<AppHandle> {
        self.focused_app
    }

    /// Instance count an app draw must cover.
    ///
    /// App slots are dense, so the draw spans slots up to the highest
    /// occupied one.
    pub fn app_draw_count(&self) -> u32 {
        self.apps
            .all_anchors()
            .last()
            .map(|anchor| anchor.slot + 1)
            .unwrap_or(0)
    }

    // ------------------------------------------------------------------
    // Mirror deltas
    // ------------------------------------------------------------------

    /// Takes the voxel mirror deltas accumulated since the last drain.
    pub fn drain_voxel_deltas(&mut self) -> Vec<SlotDelta> {
        std::mem::take(&mut self.voxel_deltas)
    }

    /// Takes the app mirror deltas accumulated since the last drain.
    pub fn drain_app_deltas(&mut self) -> Vec<SlotDelta> {
        std::mem::take(&mut self.app_deltas)
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Saves the voxel population as a slot-ordered snapshot.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), WorldError> {
        persistence::save_snapshot(path, &self.store.snapshot())
    }

    /// Replaces the voxel population with a saved snapshot.
    ///
    /// Every previously assigned slot is neutralized in the mirror before
    /// the replay upserts, so stale records cannot survive a load. Each
    /// voxel comes back under its save-time slot, holes from cleared voxels
    /// included. App anchors are unaffected.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<(), WorldError> {
        let voxels = persistence::load_snapshot(path)?;

        for slot in 0..self.store.slot_watermark() {
            self.voxel_deltas.push(SlotDelta::Clear { slot });
        }
        self.store = SparseVoxelStore::new();
        self.selection = None;

        for voxel in voxels {
            match self
                .store
                .restore(voxel.position, voxel.block_type, voxel.slot)
            {
                Ok(()) => self.voxel_deltas.push(SlotDelta::Upsert {
                    slot: voxel.slot,
                    position: Self::cell_world_position(voxel.position),
                    type_tag: voxel.block_type.as_int() as i32,
                }),
                Err(err) => warn!("skipping snapshot voxel at {:?}: {}", voxel.position, err),
            }
        }
        Ok(())
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use app_surface::StubSurfaceHost;

    #[test]
    fn add_add_clear_snapshot_scenario() {
        let mut world = World::new();

        let first = world.set_voxel(Point3::new(1, 2, 3), BlockType::SLATE).unwrap();
        let second = world.set_voxel(Point3::new(4, 5, 6), BlockType::GRASS).unwrap();
        assert_eq!(world.clear_voxel(Point3::new(1, 2, 3)), Some(first));

        let snapshot = world.store.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].position, Point3::new(4, 5, 6));
        assert_eq!(snapshot[0].block_type, BlockType::GRASS);
        assert_eq!(snapshot[0].slot, second);

        let deltas = world.drain_voxel_deltas();
        assert_eq!(deltas.len(), 3);
        assert!(matches!(deltas[0], SlotDelta::Upsert { slot, .. } if slot == first));
        assert!(matches!(deltas[1], SlotDelta::Upsert { slot, .. } if slot == second));
        assert!(matches!(deltas[2], SlotDelta::Clear { slot } if slot == first));

        // Draws still span the cleared slot below the surviving voxel.
        assert_eq!(world.voxel_draw_count(), 2);
        assert_eq!(world.occupied_count(), 1);
    }

    #[test]
    fn placement_lands_in_the_face_adjacent_cell() {
        let mut world = World::new();
        world.set_voxel(Point3::new(5, 0, 0), BlockType::SLATE).unwrap();

        world.update_selection(Point3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0));
        let slot = world.place_at_selection(BlockType::ROAD).unwrap();
        assert!(slot.is_some());
        assert_eq!(
            world.voxel_at(Point3::new(4, 0, 0)).unwrap().block_type,
            BlockType::ROAD
        );
    }

    #[test]
    fn removal_consumes_the_selection() {
        let mut world = World::new();
        world.set_voxel(Point3::new(5, 0, 0), BlockType::SLATE).unwrap();
        world.update_selection(Point3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0));

        assert!(world.remove_at_selection().is_some());
        assert!(world.selection().is_none());
        assert!(world.voxel_at(Point3::new(5, 0, 0)).is_none());
        // No selection, so a second removal is a no-op.
        assert!(world.remove_at_selection().is_none());
    }

    #[test]
    fn edit_with_no_selection_is_a_no_op() {
        let mut world = World::new();
        assert_eq!(world.place_at_selection(BlockType::SLATE).unwrap(), None);
        assert_eq!(world.occupied_count(), 0);
        assert!(world.drain_voxel_deltas().is_empty());
    }

    #[test]
    fn looked_at_app_matches_anchor_near_selected_cell() {
        let mut world = World::new();
        world.set_voxel(Point3::new(5, 0, 0), BlockType::SLATE).unwrap();
        world
            .place_app(AppHandle(9), World::cell_center(Point3::new(5, 0, 0)))
            .unwrap();

        world.update_selection(Point3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(world.looked_at_app(), Some(AppHandle(9)));
    }

    #[test]
    fn focus_change_notifies_the_host_once() {
        let mut world = World::new();
        let mut host = StubSurfaceHost::new(1.0);
        world.place_app(AppHandle(2), Point3::new(0.5, 0.5, 0.5)).unwrap();

        world.set_focus(Some(AppHandle(2)), &mut host);
        assert_eq!(host.focused(), Some(AppHandle(2)));
        assert_eq!(world.focused_app(), Some(AppHandle(2)));

        // Removing the focused app drops focus locally.
        world.remove_app(AppHandle(2));
        assert_eq!(world.focused_app(), None);
    }

    #[test]
    fn app_mutations_queue_app_deltas() {
        let mut world = World::new();
        let slot = world.place_app(AppHandle(4), Point3::new(1.0, 1.0, 1.0)).unwrap();
        world.remove_app(AppHandle(4));

        let deltas = world.drain_app_deltas();
        assert_eq!(deltas.len(), 2);
        assert!(matches!(
            deltas[0],
            SlotDelta::Upsert { slot: s, type_tag: 4, .. } if s == slot
        ));
        assert!(matches!(deltas[1], SlotDelta::Clear { slot: s } if s == slot));
    }

    #[test]
    fn save_and_load_reproduce_slot_assignment() {
        let mut world = World::new();
        let first = world.set_voxel(Point3::new(1, 1, 1), BlockType::SLATE).unwrap();
        world.set_voxel(Point3::new(2, 2, 2), BlockType::ROAD).unwrap();
        let third = world.set_voxel(Point3::new(3, 3, 3), BlockType::GRASS).unwrap();
        world.clear_voxel(Point3::new(2, 2, 2));

        let path = std::env::temp_dir().join(format!("world-save-{}.json", fastrand::u64(..)));
        world.save(&path).unwrap();

        let mut restored = World::new();
        restored.set_voxel(Point3::new(9, 9, 9), BlockType::PILLAR).unwrap();
        restored.drain_voxel_deltas();
        restored.load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(restored.occupied_count(), 2);
        assert!(restored.voxel_at(Point3::new(9, 9, 9)).is_none());

        // Save-time slots come back verbatim, the cleared hole included.
        assert_eq!(restored.voxel_at(Point3::new(1, 1, 1)).unwrap().slot, first);
        assert_eq!(restored.voxel_at(Point3::new(3, 3, 3)).unwrap().slot, third);
        assert_eq!(restored.voxel_draw_count(), world.voxel_draw_count());

        // The load neutralizes the pre-load slot before replaying.
        let deltas = restored.drain_voxel_deltas();
        assert!(matches!(deltas[0], SlotDelta::Clear { slot: 0 }));
        let upserts: Vec<_> = deltas
            .iter()
            .filter_map(|delta| match delta {
                SlotDelta::Upsert { slot, .. } => Some(*slot),
                _ => None,
            })
            .collect();
        assert_eq!(upserts, vec![first, third]);
    }
}
