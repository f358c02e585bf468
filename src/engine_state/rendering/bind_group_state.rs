//! Manages WebGPU bind groups and their layouts.
//!
//! Two bind groups cover everything the world shader binds: the camera
//! uniform at group 0 and the per-frame uniform (selection highlight and
//! focused app) at group 1. Both are plain uniform buffers created by the
//! engine before this registry is built.

use std::collections::HashMap;

use wgpu::{BindGroup, BindGroupLayout, Device};

use crate::{
    core::StSystem,
    engine_state::{buffer_state::BufferState, camera_state::CAMERA_BUFFER_NAME},
};

use super::FRAME_UNIFORM_BUFFER_NAME;

/// Registry of named bind groups and layouts.
pub struct BindGroupState {
    bind_groups: HashMap<&'static str, wgpu::BindGroup>,
    bind_group_layouts: HashMap<&'static str, wgpu::BindGroupLayout>,
}

impl BindGroupState {
    /// Creates the registry with the camera and frame bind groups.
    ///
    /// The camera and frame uniform buffers must already exist in
    /// `buffer_state`.
    pub fn new(device: StSystem<Device>, buffer_state: StSystem<BufferState>) -> Self {
        let mut bind_groups = HashMap::new();
        let mut bind_group_layouts = HashMap::new();

        let device = device.get();

        let (camera_bind_group, camera_bind_group_layout) = Self::generate_uniform_bindgroups(
            &device,
            &buffer_state.get(),
            CAMERA_BUFFER_NAME,
            CAMERA_BIND_GROUP,
            CAMERA_BIND_GROUP_LAYOUT,
        );
        bind_groups.insert(CAMERA_BIND_GROUP, camera_bind_group);
        bind_group_layouts.insert(CAMERA_BIND_GROUP_LAYOUT, camera_bind_group_layout);

        let (frame_bind_group, frame_bind_group_layout) = Self::generate_uniform_bindgroups(
            &device,
            &buffer_state.get(),
            FRAME_UNIFORM_BUFFER_NAME,
            FRAME_BIND_GROUP,
            FRAME_BIND_GROUP_LAYOUT,
        );
        bind_groups.insert(FRAME_BIND_GROUP, frame_bind_group);
        bind_group_layouts.insert(FRAME_BIND_GROUP_LAYOUT, frame_bind_group_layout);

        Self {
            bind_groups,
            bind_group_layouts,
        }
    }

    /// Retrieves a bind group by name.
    ///
    /// # Panics
    /// Panics if no bind group with the given name exists.
    pub fn get_bind_group(&self, name: &'static str) -> &wgpu::BindGroup {
        self.bind_groups.get(name).unwrap()
    }

    /// Retrieves a bind group layout by name.
    ///
    /// # Panics
    /// Panics if no bind group layout with the given name exists.
    pub fn get_bind_group_layout(&self, name: &'static str) -> &wgpu::BindGroupLayout {
        self.bind_group_layouts.get(name).unwrap()
    }

    /// Builds a single-entry uniform bind group over a whole named buffer,
    /// visible to both shader stages.
    fn generate_uniform_bindgroups(
        device: &Device,
        buffer_state: &BufferState,
        buffer_name: &'static str,
        group_label: &'static str,
        layout_label: &'static str,
    ) -> (BindGroup, BindGroupLayout) {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some(layout_label),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer_state.get_entire_binding(buffer_name),
            }],
            label: Some(group_label),
        });

        (bind_group, layout)
    }
}

/// Name of the camera bind group
pub const CAMERA_BIND_GROUP: &str = "camera_bind_group";
/// Name of the camera bind group layout
pub const CAMERA_BIND_GROUP_LAYOUT: &str = "camera_bind_group_layout";
/// Name of the per-frame uniform bind group
pub const FRAME_BIND_GROUP: &str = "frame_bind_group";
/// Name of the per-frame uniform bind group layout
pub const FRAME_BIND_GROUP_LAYOUT: &str = "frame_bind_group_layout";
