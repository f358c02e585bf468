//! # Ray Caster Module
//!
//! Grid traversal from the camera through the voxel region, used every frame
//! to find the cell the viewer is looking at.
//!
//! ## Traversal
//!
//! The caster walks cells with the Amanatides & Woo voxel traversal: per axis
//! it tracks the ray parameter at which the next cell boundary is crossed
//! (`t_max`) and the parameter width of one cell (`t_delta`), then repeatedly
//! steps along the axis whose boundary comes first. Ties between axes break
//! to the lowest axis index (x before y before z) so edge-aligned rays report
//! the same face every frame.
//!
//! ## Inputs and Result
//!
//! The caster needs exactly three things from the camera side: a world-space
//! eye position, a normalized facing direction, and the voxel edge length
//! that scales world space into cell space. The result is `Option<RayHit>`,
//! recomputed per frame and never persisted. The cell the eye itself occupies
//! is skipped; the viewer is inside it and its faces would otherwise shadow
//! everything else.

use cgmath::{Point3, Vector3};

use super::voxel_store::{in_region, VoxelStorage, REGION_DIMENSION};

/// A cell hit by the view ray.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RayHit {
    /// The occupied cell the ray entered.
    pub cell: Point3<i32>,
    /// Unit normal of the entered face, pointing back toward the viewer.
    ///
    /// This is the opposite of the step taken on the last crossed axis, so
    /// `cell + normal` is the empty cell a placement lands in.
    pub normal: Vector3<i32>,
}

impl RayHit {
    /// The empty cell adjacent to the hit face, where a placed voxel goes.
    pub fn adjacent_cell(&self) -> Point3<i32> {
        self.cell + self.normal
    }
}

/// Casts rays through a [`VoxelStorage`] in cell space.
pub struct RayCaster {
    voxel_edge_length: f32,
    max_steps: u32,
}

impl RayCaster {
    /// Creates a caster for a region of the given voxel edge length.
    ///
    /// The step bound is the region's space diagonal in cells, the longest
    /// straight path a ray can take through the region.
    pub fn new(voxel_edge_length: f32) -> Self {
        let max_steps = (REGION_DIMENSION as f32 * 3.0_f32.sqrt()).ceil() as u32;
        Self {
            voxel_edge_length,
            max_steps,
        }
    }

    /// Walks the grid from `origin` along `direction` until an occupied cell
    /// is entered or the traversal gives up.
    ///
    /// # Arguments
    /// * `origin` - world-space eye position
    /// * `direction` - normalized world-space facing
    /// * `store` - the voxel store to test occupancy against
    ///
    /// # Returns
    /// `Some(RayHit)` with the entered cell and its inward face normal, or
    /// `None` when the ray exits the region after having been inside it,
    /// exceeds the step bound, or has a degenerate zero direction.
    pub fn cast<S: VoxelStorage>(
        &self,
        origin: Point3<f32>,
        direction: Vector3<f32>,
        store: &S,
    ) -> Option<RayHit> {
        if direction.x == 0.0 && direction.y == 0.0 && direction.z == 0.0 {
            return None;
        }

        // Scale into cell space so every cell is a unit cube.
        let position = [
            origin.x / self.voxel_edge_length,
            origin.y / self.voxel_edge_length,
            origin.z / self.voxel_edge_length,
        ];
        let direction = [direction.x, direction.y, direction.z];

        let mut cell = [
            position[0].floor() as i32,
            position[1].floor() as i32,
            position[2].floor() as i32,
        ];

        let mut step = [0i32; 3];
        let mut t_max = [f32::INFINITY; 3];
        let mut t_delta = [f32::INFINITY; 3];
        for axis in 0..3 {
            if direction[axis] > 0.0 {
                step[axis] = 1;
                t_delta[axis] = 1.0 / direction[axis];
                t_max[axis] = (cell[axis] as f32 + 1.0 - position[axis]) / direction[axis];
            } else if direction[axis] < 0.0 {
                step[axis] = -1;
                t_delta[axis] = -1.0 / direction[axis];
                t_max[axis] = (position[axis] - cell[axis] as f32) / -direction[axis];
            }
            // A zero component never crosses a boundary on that axis; the
            // infinite t_max keeps it out of the axis selection below.
        }

        let mut was_inside = in_region(Point3::new(cell[0], cell[1], cell[2]));

        for _ in 0..self.max_steps {
            // Lowest axis index wins ties so edge-aligned rays are stable.
            let axis = if t_max[0] <= t_max[1] && t_max[0] <= t_max[2] {
                0
            } else if t_max[1] <= t_max[2] {
                1
            } else {
                2
            };

            cell[axis] += step[axis];
            t_max[axis] += t_delta[axis];

            let current = Point3::new(cell[0], cell[1], cell[2]);
            if in_region(current) {
                was_inside = true;
                if store.is_occupied(current) {
                    let mut normal = Vector3::new(0, 0, 0);
                    normal[axis] = -step[axis];
                    return Some(RayHit {
                        cell: current,
                        normal,
                    });
                }
            } else if was_inside {
                // Once the ray has left the region it cannot re-enter.
                return None;
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::world::block_type::BlockType;
    use crate::engine_state::world::voxel_store::SparseVoxelStore;

    const EDGE: f32 = 0.1;

    fn store_with(cells: &[(i32, i32, i32)]) -> SparseVoxelStore {
        let mut store = SparseVoxelStore::new();
        for &(x, y, z) in cells {
            store.set(Point3::new(x, y, z), BlockType::SLATE).unwrap();
        }
        store
    }

    #[test]
    fn axis_aligned_ray_hits_first_occupied_cell() {
        let store = store_with(&[(5, 0, 0), (6, 0, 0)]);
        let caster = RayCaster::new(EDGE);

        let hit = caster
            .cast(Point3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0), &store)
            .unwrap();

        assert_eq!(hit.cell, Point3::new(5, 0, 0));
        assert_eq!(hit.normal, Vector3::new(-1, 0, 0));
        assert_eq!(hit.adjacent_cell(), Point3::new(4, 0, 0));
    }

    #[test]
    fn starting_cell_is_never_a_hit() {
        let store = store_with(&[(3, 3, 3), (5, 3, 3)]);
        let caster = RayCaster::new(EDGE);

        // Eye sits inside the voxel at (3,3,3); the ray must see past it.
        let hit = caster
            .cast(
                Point3::new(0.35, 0.35, 0.35),
                Vector3::new(1.0, 0.0, 0.0),
                &store,
            )
            .unwrap();

        assert_eq!(hit.cell, Point3::new(5, 3, 3));
    }

    #[test]
    fn negative_direction_reports_positive_normal() {
        let store = store_with(&[(2, 4, 4)]);
        let caster = RayCaster::new(EDGE);

        let hit = caster
            .cast(
                Point3::new(0.85, 0.45, 0.45),
                Vector3::new(-1.0, 0.0, 0.0),
                &store,
            )
            .unwrap();

        assert_eq!(hit.cell, Point3::new(2, 4, 4));
        assert_eq!(hit.normal, Vector3::new(1, 0, 0));
    }

    #[test]
    fn edge_aligned_ray_is_deterministic() {
        // Both cells border the first crossing; the tie decides the winner.
        let store = store_with(&[(1, 0, 0), (0, 1, 0)]);
        let caster = RayCaster::new(EDGE);
        let origin = Point3::new(0.0, 0.0, 0.05);
        let diagonal = Vector3::new(
            std::f32::consts::FRAC_1_SQRT_2,
            std::f32::consts::FRAC_1_SQRT_2,
            0.0,
        );

        let first = caster.cast(origin, diagonal, &store);
        for _ in 0..100 {
            assert_eq!(caster.cast(origin, diagonal, &store), first);
        }

        // Ties break to x, so the diagonal enters through the -x face.
        let hit = first.unwrap();
        assert_eq!(hit.cell, Point3::new(1, 0, 0));
        assert_eq!(hit.normal, Vector3::new(-1, 0, 0));
    }

    #[test]
    fn ray_through_empty_region_misses() {
        let store = SparseVoxelStore::new();
        let caster = RayCaster::new(EDGE);

        let result = caster.cast(
            Point3::new(6.4, 6.4, 6.4),
            Vector3::new(0.0, 1.0, 0.0),
            &store,
        );
        assert!(result.is_none());
    }

    #[test]
    fn ray_leaving_the_region_misses_voxels_behind_it() {
        let store = store_with(&[(0, 0, 0)]);
        let caster = RayCaster::new(EDGE);

        // Pointing away from the only voxel: exits through +x and stops.
        let result = caster.cast(
            Point3::new(0.55, 0.05, 0.05),
            Vector3::new(1.0, 0.0, 0.0),
            &store,
        );
        assert!(result.is_none());
    }

    #[test]
    fn zero_direction_is_a_miss() {
        let store = store_with(&[(1, 1, 1)]);
        let caster = RayCaster::new(EDGE);

        let result = caster.cast(
            Point3::new(0.15, 0.15, 0.15),
            Vector3::new(0.0, 0.0, 0.0),
            &store,
        );
        assert!(result.is_none());
    }
}
