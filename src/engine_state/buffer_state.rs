//! # Buffer State Module
//!
//! Central registry for the GPU buffers of the shell: the two instance
//! mirrors, the uniform buffers, and the static cube geometry.
//!
//! ## Architecture
//!
//! Buffers are created once at startup and referenced by static name for
//! the rest of the run. The registry owns nothing about a buffer's layout;
//! it enforces the one rule every writer must obey here, that a write stays
//! inside the buffer's allocation. Writes beyond the allocation panic
//! rather than truncate, because a truncated mirror write would silently
//! desynchronize the GPU image of the world.
//!
//! ## Analytics
//!
//! Per-buffer allocation, high-water usage, and write counts are tracked;
//! the allocation total feeds the engine's startup memory summary and the
//! allocation sizes back the write bounds check.

use std::collections::HashMap;

use wgpu::{util::DeviceExt, Buffer, Device, Queue};

use crate::core::{StResource, StSystem};

/// Allocation and write tracking for one buffer.
#[derive(Debug)]
struct BufferAnalytics {
    /// Bytes allocated for the buffer
    pub allocated_memory: u64,
    /// High-water mark of bytes touched by writes
    pub used_memory: u64,
    /// Number of writes issued against the buffer
    pub times_written: u64,
}

/// Registry of named GPU buffers with bounds-checked writes.
pub struct BufferState {
    /// Reference to the GPU device
    pub device: StSystem<Device>,
    /// Reference to the GPU command queue
    pub queue: StSystem<Queue>,
    /// Map of buffer names to buffer objects
    pub buffers: HashMap<&'static str, Buffer>,
    buffer_analytics: StResource<HashMap<&'static str, BufferAnalytics>>,
}

impl BufferState {
    /// Creates an empty registry over the given device and queue.
    pub fn new(device: StSystem<Device>, queue: StSystem<Queue>) -> Self {
        Self {
            device,
            queue,
            buffers: HashMap::new(),
            buffer_analytics: StResource::new(HashMap::new()),
        }
    }

    /// Creates a buffer under `buffer_name` initialized with `contents`.
    ///
    /// Every buffer here starts with known contents: the mirrors upload
    /// their zeroed full-capacity shadow at registration, geometry and
    /// uniforms their first value.
    pub fn create_buffer_init(
        &mut self,
        buffer_name: &'static str,
        init_descriptor: wgpu::util::BufferInitDescriptor,
    ) {
        let buffer_analytics = BufferAnalytics {
            allocated_memory: init_descriptor.contents.len() as u64,
            used_memory: init_descriptor.contents.len() as u64,
            times_written: 1,
        };
        let buffer = self.device.get().create_buffer_init(&init_descriptor);

        self.buffers.insert(buffer_name, buffer);
        self.buffer_analytics
            .get_mut()
            .insert(buffer_name, buffer_analytics);
    }

    /// Writes `data` at `offset` into the named buffer.
    ///
    /// # Panics
    ///
    /// Panics if the buffer does not exist or the write would cross the end
    /// of its allocation. Both indicate a wiring bug, not a runtime
    /// condition.
    pub fn write_buffer(
        &self,
        buffer_name: &'static str,
        offset: wgpu::BufferAddress,
        data: &[u8],
    ) {
        let buffer = self.buffers.get(buffer_name).unwrap();
        let mut buffer_dictionary = self.buffer_analytics.get_mut();
        let buffer_analytics = buffer_dictionary.get_mut(buffer_name).unwrap();

        let buffer_size = buffer_analytics.allocated_memory;
        let data_size = data.len() as u64;

        if offset + data_size > buffer_size {
            panic!(
                "Buffer write out of bounds for buffer name '{}'",
                buffer_name
            );
        }

        let queue = self.queue.get();
        queue.write_buffer(buffer, offset, data);
        buffer_analytics.used_memory = buffer_analytics.used_memory.max(offset + data_size);
        buffer_analytics.times_written += 1;
    }

    /// Gets a reference to a buffer by name.
    ///
    /// # Panics
    ///
    /// Panics if the buffer does not exist.
    pub fn get_buffer(&self, buffer_name: &'static str) -> &Buffer {
        self.buffers.get(buffer_name).unwrap()
    }

    /// Gets a binding resource covering the entire named buffer.
    ///
    /// # Panics
    ///
    /// Panics if the buffer does not exist.
    pub fn get_entire_binding(&self, buffer_name: &'static str) -> wgpu::BindingResource {
        let buffer = self.buffers.get(buffer_name).unwrap();
        buffer.as_entire_binding()
    }

    /// Total bytes allocated across all registered buffers.
    pub fn get_total_allocated_memory(&self) -> u64 {
        self.buffer_analytics
            .get()
            .iter()
            .fold(0, |acc, (_, buffer_analytics)| {
                acc + buffer_analytics.allocated_memory
            })
    }

}
