//! # App Registry Module
//!
//! Anchors external application surfaces at fixed world positions.
//!
//! ## Slot Policy
//!
//! App anchors live in a small fixed namespace of [`APP_SLOT_CAPACITY`]
//! slots mirrored one-to-one into the app instance buffer. Unlike voxel
//! slots, app slots are dense and reused: removal frees the slot and the
//! next placement takes the lowest free one. With at most a few dozen
//! anchors the linear scan for a free slot is cheaper than any free list.

use cgmath::{MetricSpace, Point3};

use super::error::WorldError;
use super::voxel_store::SlotIndex;

/// Maximum number of application anchors the world can hold at once.
pub const APP_SLOT_CAPACITY: usize = 32;

/// Opaque identity of an external application surface.
///
/// Handles are issued by the surface host; the registry never interprets
/// the value beyond equality.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct AppHandle(pub u32);

/// One placed application surface.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AppAnchor {
    /// The surface this anchor displays.
    pub handle: AppHandle,
    /// World-space anchor position of the quad center.
    pub position: Point3<f32>,
    /// The app mirror slot this anchor occupies.
    pub slot: SlotIndex,
}

/// Fixed-capacity registry mapping app handles to world anchors.
///
/// The handle to anchor relationship is one-to-one in both directions: a
/// handle is anchored at most once, and every occupied slot names exactly
/// one handle.
pub struct AppPlacementRegistry {
    slots: [Option<AppAnchor>; APP_SLOT_CAPACITY],
}

impl AppPlacementRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            slots: [None; APP_SLOT_CAPACITY],
        }
    }

    /// Anchors `handle` at `position` in the lowest free slot.
    ///
    /// # Errors
    /// * `WorldError::DuplicateHandle` if the handle is already anchored
    /// * `WorldError::CapacityExceeded` if every slot is occupied
    pub fn place(
        &mut self,
        handle: AppHandle,
        position: Point3<f32>,
    ) -> Result<SlotIndex, WorldError> {
        if self.lookup_by_handle(handle).is_some() {
            return Err(WorldError::DuplicateHandle(handle.0));
        }

        let free = self
            .slots
            .iter()
            .position(|slot| slot.is_none())
            .ok_or(WorldError::CapacityExceeded {
                capacity: APP_SLOT_CAPACITY as u32,
            })?;

        let slot = free as SlotIndex;
        self.slots[free] = Some(AppAnchor {
            handle,
            position,
            slot,
        });
        Ok(slot)
    }

    /// Removes the anchor for `handle`, returning the freed slot so the
    /// caller can neutralize it in the app mirror.
    pub fn remove(&mut self, handle: AppHandle) -> Option<SlotIndex> {
        for entry in self.slots.iter_mut() {
            if entry.map(|anchor| anchor.handle) == Some(handle) {
                let slot = entry.take().map(|anchor| anchor.slot);
                return slot;
            }
        }
        None
    }

    /// The anchor for `handle`, if it is placed.
    pub fn lookup_by_handle(&self, handle: AppHandle) -> Option<&AppAnchor> {
        self.slots
            .iter()
            .flatten()
            .find(|anchor| anchor.handle == handle)
    }

    /// The anchor closest to `position` within `tolerance`, if any.
    ///
    /// Used to match a ray selection against app quads, whose anchors sit
    /// at fractional world coordinates.
    pub fn lookup_by_position(
        &self,
        position: Point3<f32>,
        tolerance: f32,
    ) -> Option<&AppAnchor> {
        self.slots
            .iter()
            .flatten()
            .filter(|anchor| anchor.position.distance2(position) <= tolerance * tolerance)
            .min_by(|a, b| {
                a.position
                    .distance2(position)
                    .total_cmp(&b.position.distance2(position))
            })
    }

    /// All placed anchors ordered by slot ascending.
    pub fn all_anchors(&self) -> impl Iterator<Item = &AppAnchor> {
        self.slots.iter().flatten()
    }

    /// Number of placed anchors.
    pub fn occupied_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }
}

impl Default for AppPlacementRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor_point(x: f32) -> Point3<f32> {
        Point3::new(x, 0.5, 0.5)
    }

    #[test]
    fn place_then_lookup_round_trips() {
        let mut registry = AppPlacementRegistry::new();
        let slot = registry.place(AppHandle(7), anchor_point(1.0)).unwrap();

        let anchor = registry.lookup_by_handle(AppHandle(7)).unwrap();
        assert_eq!(anchor.slot, slot);
        assert_eq!(anchor.position, anchor_point(1.0));
        assert_eq!(registry.occupied_count(), 1);
    }

    #[test]
    fn duplicate_handle_is_rejected() {
        let mut registry = AppPlacementRegistry::new();
        registry.place(AppHandle(1), anchor_point(0.0)).unwrap();

        let result = registry.place(AppHandle(1), anchor_point(2.0));
        assert!(matches!(result, Err(WorldError::DuplicateHandle(1))));
        assert_eq!(registry.occupied_count(), 1);
    }

    #[test]
    fn removal_frees_the_lowest_slot_for_reuse() {
        let mut registry = AppPlacementRegistry::new();
        registry.place(AppHandle(1), anchor_point(0.0)).unwrap();
        let middle = registry.place(AppHandle(2), anchor_point(1.0)).unwrap();
        registry.place(AppHandle(3), anchor_point(2.0)).unwrap();

        assert_eq!(registry.remove(AppHandle(2)), Some(middle));
        let reused = registry.place(AppHandle(4), anchor_point(3.0)).unwrap();
        assert_eq!(reused, middle);
    }

    #[test]
    fn capacity_boundary_leaves_count_at_capacity() {
        let mut registry = AppPlacementRegistry::new();
        for id in 0..APP_SLOT_CAPACITY as u32 {
            registry.place(AppHandle(id), anchor_point(id as f32)).unwrap();
        }

        let result = registry.place(AppHandle(999), anchor_point(99.0));
        assert!(matches!(result, Err(WorldError::CapacityExceeded { .. })));
        assert_eq!(registry.occupied_count(), APP_SLOT_CAPACITY);
    }

    #[test]
    fn remove_of_unplaced_handle_is_a_miss() {
        let mut registry = AppPlacementRegistry::new();
        assert_eq!(registry.remove(AppHandle(42)), None);
    }

    #[test]
    fn position_lookup_respects_tolerance() {
        let mut registry = AppPlacementRegistry::new();
        registry.place(AppHandle(1), anchor_point(1.0)).unwrap();
        registry.place(AppHandle(2), anchor_point(5.0)).unwrap();

        let near = registry
            .lookup_by_position(Point3::new(1.05, 0.5, 0.5), 0.1)
            .unwrap();
        assert_eq!(near.handle, AppHandle(1));

        assert!(registry
            .lookup_by_position(Point3::new(3.0, 0.5, 0.5), 0.1)
            .is_none());
    }

    #[test]
    fn anchors_iterate_in_slot_order() {
        let mut registry = AppPlacementRegistry::new();
        registry.place(AppHandle(10), anchor_point(0.0)).unwrap();
        registry.place(AppHandle(11), anchor_point(1.0)).unwrap();
        registry.place(AppHandle(12), anchor_point(2.0)).unwrap();
        registry.remove(AppHandle(11));

        let slots: Vec<SlotIndex> = registry.all_anchors().map(|a| a.slot).collect();
        assert_eq!(slots, vec![0, 2]);
    }
}
