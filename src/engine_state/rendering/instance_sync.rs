//! # Instance Sync Module
//!
//! CPU-side mirror of a fixed-capacity GPU instance buffer, written slot by
//! slot as the world changes.
//!
//! ## Contract
//!
//! The mirror is sized once at creation and never reallocates: the shadow
//! array, the dirty queue, and the GPU buffer all hold exactly `capacity`
//! records for the life of the program. Mutations touch single slots; the
//! per-frame flush uploads only the slots dirtied since the previous flush,
//! each as a bounded `write_buffer` region. The whole buffer is written
//! exactly once, at registration, to lay down the empty sentinels.
//!
//! Two mirrors exist at runtime: the voxel mirror sized to the voxel slot
//! namespace and the app mirror sized to the app slot namespace. They share
//! nothing but this type.

use bytemuck::{Pod, Zeroable};
use log::error;

use crate::engine_state::buffer_state::BufferState;
use crate::engine_state::world::error::WorldError;
use crate::engine_state::world::voxel_store::SlotIndex;
use crate::engine_state::world::{SlotDelta, EMPTY_TYPE_TAG};

/// One slot of an instance mirror, as the GPU sees it.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct InstanceRecord {
    /// World-space position of the instance
    pub position: [f32; 3],
    /// Block type encoding or app handle; [`EMPTY_TYPE_TAG`] for a hole
    pub type_tag: i32,
}

impl InstanceRecord {
    /// The sentinel record occupying empty and cleared slots.
    pub const EMPTY: Self = Self {
        position: [0.0, 0.0, 0.0],
        type_tag: EMPTY_TYPE_TAG,
    };

    /// Byte size of one record in the buffer.
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    /// Vertex layout of the mirror as an instance-rate buffer.
    ///
    /// Locations 2 and 3, after the per-vertex position and normal.
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: Self::SIZE,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Sint32,
                },
            ],
        }
    }
}

/// Fixed-capacity slot-addressed mirror of one GPU instance buffer.
pub struct InstanceSyncBuffer {
    buffer_name: &'static str,
    capacity: u32,
    shadow: Vec<InstanceRecord>,
    dirty: Vec<SlotIndex>,
    dirty_flags: Vec<bool>,
}

impl InstanceSyncBuffer {
    /// Creates a mirror of `capacity` slots backed by the named GPU buffer.
    ///
    /// All storage is allocated here; nothing grows afterwards.
    pub fn new(buffer_name: &'static str, capacity: u32) -> Self {
        Self {
            buffer_name,
            capacity,
            shadow: vec![InstanceRecord::EMPTY; capacity as usize],
            dirty: Vec::with_capacity(capacity as usize),
            dirty_flags: vec![false; capacity as usize],
        }
    }

    /// Reserved slot count.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Creates the GPU buffer at full capacity, initialized to sentinels.
    pub fn register(&self, buffer_state: &mut BufferState) {
        buffer_state.create_buffer_init(
            self.buffer_name,
            wgpu::util::BufferInitDescriptor {
                label: Some(self.buffer_name),
                contents: bytemuck::cast_slice(&self.shadow),
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            },
        );
    }

    /// Applies one world delta to the shadow and dirty queue.
    pub fn apply(&mut self, delta: SlotDelta) -> Result<(), WorldError> {
        match delta {
            SlotDelta::Upsert {
                slot,
                position,
                type_tag,
            } => self.apply_upsert(
                slot,
                InstanceRecord {
                    position: [position.x, position.y, position.z],
                    type_tag,
                },
            ),
            SlotDelta::Clear { slot } => self.apply_clear(slot),
        }
    }

    /// Writes a live record at `slot`.
    ///
    /// # Errors
    /// `WorldError::SlotOutOfCapacity` when the slot lies beyond the
    /// reserved region. The stores pre-check their own capacity, so this
    /// surfacing at all means a store and its mirror were sized apart.
    pub fn apply_upsert(
        &mut self,
        slot: SlotIndex,
        record: InstanceRecord,
    ) -> Result<(), WorldError> {
        self.write_slot(slot, record)
    }

    /// Writes the empty sentinel at `slot`.
    pub fn apply_clear(
        &mut self,
        slot: SlotIndex,
    ) -> Result<(), WorldError> {
        self.write_slot(slot, InstanceRecord::EMPTY)
    }

    fn write_slot(
        &mut self,
        slot: SlotIndex,
        record: InstanceRecord,
    ) -> Result<(), WorldError> {
        if slot >= self.capacity {
            error!(
                "rejected write to slot {} of mirror '{}' (capacity {})",
                slot, self.buffer_name, self.capacity
            );
            return Err(
                WorldError::SlotOutOfCapacity {
                    slot,
                    capacity: self.capacity,
                },
            );
        }

        self.shadow[slot as usize] = record;
        if !self.dirty_flags[slot as usize] {
            self.dirty_flags[slot as usize] = true;
            // Deduplication above bounds the queue at capacity, so this
            // push never allocates.
            self.dirty.push(slot);
        }
        Ok(())
    }

    /// The shadow record at `slot`, if the slot exists.
    pub fn record(&self, slot: SlotIndex) -> Option<&InstanceRecord> {
        self.shadow.get(slot as usize)
    }

    /// Number of slots awaiting upload.
    pub fn pending_count(&self) -> usize {
        self.dirty.len()
    }

    /// Uploads every dirty slot to the GPU buffer and empties the queue.
    pub fn flush(&mut self, buffer_state: &BufferState) {
        let buffer_name = self.buffer_name;
        let shadow = &self.shadow;
        let dirty_flags = &mut self.dirty_flags;
        for &slot in self.dirty.iter() {
            dirty_flags[slot as usize] = false;
            buffer_state.write_buffer(
                buffer_name,
                slot as u64 * InstanceRecord::SIZE,
                bytemuck::bytes_of(&shadow[slot as usize]),
            );
        }
        self.dirty.clear();
    }

    /// Flush variant taking a raw region writer, used by tests that have no
    /// GPU device to build a [`BufferState`] around.
    #[cfg(test)]
    fn flush_with(&mut self, mut write_region: impl FnMut(u64, &[u8])) {
        for &slot in self.dirty.iter() {
            self.dirty_flags[slot as usize] = false;
            write_region(
                slot as u64 * InstanceRecord::SIZE,
                bytemuck::bytes_of(&self.shadow[slot as usize]),
            );
        }
        self.dirty.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::world::block_type::BlockType;
    use crate::engine_state::world::World;
    use cgmath::Point3;

    /// Byte array standing in for the GPU buffer.
    struct FakeGpuBuffer {
        bytes: Vec<u8>,
    }

    impl FakeGpuBuffer {
        fn new(capacity: u32) -> Self {
            let empty = vec![InstanceRecord::EMPTY; capacity as usize];
            Self {
                bytes: bytemuck::cast_slice(&empty).to_vec(),
            }
        }

        fn write(&mut self, offset: u64, data: &[u8]) {
            let start = offset as usize;
            self.bytes[start..start + data.len()].copy_from_slice(data);
        }

        fn record(&self, slot: u32) -> InstanceRecord {
            let start = slot as usize * InstanceRecord::SIZE as usize;
            *bytemuck::from_bytes(&self.bytes[start..start + InstanceRecord::SIZE as usize])
        }
    }

    #[test]
    fn upsert_then_clear_round_trips_through_the_shadow() {
        let mut mirror = InstanceSyncBuffer::new("test_mirror", 8);
        let record = InstanceRecord {
            position: [0.1, 0.2, 0.3],
            type_tag: 2,
        };

        mirror.apply_upsert(3, record).unwrap();
        assert_eq!(mirror.record(3), Some(&record));

        mirror.apply_clear(3).unwrap();
        assert_eq!(mirror.record(3), Some(&InstanceRecord::EMPTY));
    }

    #[test]
    fn out_of_capacity_slot_is_rejected() {
        let mut mirror = InstanceSyncBuffer::new("test_mirror", 4);
        let result = mirror.apply_upsert(4, InstanceRecord::EMPTY);
        assert!(matches!(
            result,
            Err(WorldError::SlotOutOfCapacity { slot: 4, capacity: 4 })
        ));
        assert_eq!(mirror.pending_count(), 0);
    }

    #[test]
    fn repeated_writes_to_one_slot_upload_once() {
        let mut mirror = InstanceSyncBuffer::new("test_mirror", 8);
        for tag in 0..5 {
            mirror
                .apply_upsert(
                    2,
                    InstanceRecord {
                        position: [0.0; 3],
                        type_tag: tag,
                    },
                )
                .unwrap();
        }
        assert_eq!(mirror.pending_count(), 1);

        let mut writes = 0;
        let mut gpu = FakeGpuBuffer::new(8);
        mirror.flush_with(|offset, data| {
            writes += 1;
            gpu.write(offset, data);
        });

        assert_eq!(writes, 1);
        assert_eq!(gpu.record(2).type_tag, 4);
        assert_eq!(mirror.pending_count(), 0);
    }

    #[test]
    fn queue_storage_never_grows_past_creation() {
        let mut mirror = InstanceSyncBuffer::new("test_mirror", 16);
        let dirty_capacity = mirror.dirty.capacity();

        for round in 0..10 {
            for slot in 0..16 {
                mirror
                    .apply_upsert(
                        slot,
                        InstanceRecord {
                            position: [round as f32; 3],
                            type_tag: 0,
                        },
                    )
                    .unwrap();
            }
            mirror.flush_with(|_, _| {});
        }

        assert_eq!(mirror.dirty.capacity(), dirty_capacity);
        assert_eq!(mirror.shadow.len(), 16);
    }

    #[test]
    fn mirror_tracks_the_world_through_arbitrary_edits() {
        let mut world = World::new();
        let mut mirror = InstanceSyncBuffer::new("test_mirror", 4096);
        let mut gpu = FakeGpuBuffer::new(4096);

        for _ in 0..500 {
            let cell = Point3::new(
                fastrand::i32(0..8),
                fastrand::i32(0..8),
                fastrand::i32(0..8),
            );
            if fastrand::bool() {
                world.set_voxel(cell, BlockType::GRASS).unwrap();
            } else {
                world.clear_voxel(cell);
            }

            // Flush every few edits so dirtiness spans frames.
            if fastrand::u8(..) % 3 == 0 {
                for delta in world.drain_voxel_deltas() {
                    mirror.apply(delta).unwrap();
                }
                mirror.flush_with(|offset, data| gpu.write(offset, data));
            }
        }
        for delta in world.drain_voxel_deltas() {
            mirror.apply(delta).unwrap();
        }
        mirror.flush_with(|offset, data| gpu.write(offset, data));

        // Every live voxel's slot holds its record; all other assigned
        // slots hold the sentinel.
        let mut live_slots = std::collections::HashSet::new();
        for x in 0..8 {
            for y in 0..8 {
                for z in 0..8 {
                    if let Some(voxel) = world.voxel_at(Point3::new(x, y, z)) {
                        let record = gpu.record(voxel.slot);
                        assert_eq!(record.type_tag, voxel.block_type.as_int() as i32);
                        assert_eq!(
                            record.position,
                            [x as f32 * 0.1, y as f32 * 0.1, z as f32 * 0.1]
                        );
                        live_slots.insert(voxel.slot);
                    }
                }
            }
        }
        for slot in 0..world.voxel_draw_count() {
            if !live_slots.contains(&slot) {
                assert_eq!(gpu.record(slot).type_tag, EMPTY_TYPE_TAG);
            }
        }
    }
}
