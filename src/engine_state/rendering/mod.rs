//! Rendering system for the voxel shell.
//!
//! Everything GPU-facing lives under this module: the instance mirrors, the
//! bind group and pipeline setup, and the per-frame pass that draws the
//! voxel cubes and app quads. The domain core never appears here except as
//! slot deltas and instance counts.

use bytemuck::{Pod, Zeroable};
use log::error;
use wgpu::{Device, Queue, Surface, SurfaceConfiguration};

use crate::core::StSystem;
use crate::engine_state::world::ray_caster::RayHit;
use crate::engine_state::world::voxel_store::SlotIndex;

use super::{buffer_state::BufferState, camera_state::camera};

mod bind_group_state;
pub mod instance_sync;
mod renderer;
mod texture;
mod vertex;

pub use instance_sync::{InstanceRecord, InstanceSyncBuffer};
use bind_group_state::BindGroupState;
use renderer::WorldRenderer;

/// Name of the voxel instance mirror's GPU buffer
pub const VOXEL_INSTANCE_BUFFER_NAME: &str = "voxel_instance_buffer";
/// Name of the app instance mirror's GPU buffer
pub const APP_INSTANCE_BUFFER_NAME: &str = "app_instance_buffer";
/// Name of the per-frame uniform buffer
pub const FRAME_UNIFORM_BUFFER_NAME: &str = "frame_uniform_buffer";

/// Per-frame shader state: the selected cell and the focused app.
///
/// Rewritten every frame after selection recompute; the shader tints the
/// selected voxel and the focused app's quad from these fields.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct FrameUniform {
    selected_cell: [i32; 3],
    selected_valid: i32,
    focused_app_slot: i32,
    _padding: [i32; 3],
}

impl FrameUniform {
    /// No selection, no focused app.
    pub fn new() -> Self {
        Self {
            selected_cell: [0, 0, 0],
            selected_valid: 0,
            focused_app_slot: -1,
            _padding: [0; 3],
        }
    }

    /// Updates the selection fields from this frame's ray result.
    pub fn set_selection(&mut self, selection: Option<RayHit>) {
        match selection {
            Some(hit) => {
                self.selected_cell = [hit.cell.x, hit.cell.y, hit.cell.z];
                self.selected_valid = 1;
            }
            None => {
                self.selected_valid = 0;
            }
        }
    }

    /// Updates the focused app slot, `None` clearing the tint.
    pub fn set_focused_slot(&mut self, slot: Option<SlotIndex>) {
        self.focused_app_slot = slot.map(|slot| slot as i32).unwrap_or(-1);
    }
}

impl Default for FrameUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns the surface, depth buffer, bind groups, and the world renderer.
pub struct WorldRenderManager {
    /// The WebGPU surface being rendered to
    pub surface: Surface<'static>,
    /// Configuration for the surface (size, format, etc.)
    pub surface_config: SurfaceConfiguration,
    /// The WebGPU device used for creating GPU resources
    pub device: StSystem<Device>,
    /// The WebGPU queue for submitting command buffers
    pub queue: StSystem<Queue>,
    /// Camera projection settings
    pub camera_projection: camera::Projection,
    buffer_state: StSystem<BufferState>,
    bind_group_state: StSystem<BindGroupState>,
    depth_texture: texture::Texture,
    renderer: WorldRenderer,
}

impl WorldRenderManager {
    /// Creates all rendering resources.
    ///
    /// The camera uniform buffer and the mirror buffers must already be
    /// registered in `buffer_state`; the frame uniform buffer is created
    /// here, before the bind groups that reference it.
    pub fn new(
        surface: Surface<'static>,
        surface_config: SurfaceConfiguration,
        shader_string: String,
        camera_projection: camera::Projection,
        device: StSystem<Device>,
        queue: StSystem<Queue>,
        buffer_state: StSystem<BufferState>,
    ) -> Self {
        buffer_state.get_mut().create_buffer_init(
            FRAME_UNIFORM_BUFFER_NAME,
            wgpu::util::BufferInitDescriptor {
                label: Some(FRAME_UNIFORM_BUFFER_NAME),
                contents: bytemuck::cast_slice(&[FrameUniform::new()]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            },
        );

        let bind_group_state = StSystem::new(Box::new(BindGroupState::new(
            device.clone(),
            buffer_state.clone(),
        )));

        let depth_texture = texture::Texture::create_depth_texture(
            &device.get(),
            &surface_config,
            "DEPTH TEXTURE",
        );

        let depth_stencil = Some(wgpu::DepthStencilState {
            format: texture::Texture::DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        });

        let renderer = WorldRenderer::new(
            device.clone(),
            buffer_state.clone(),
            &shader_string,
            surface_config.format,
            bind_group_state.clone(),
            depth_stencil,
        );

        Self {
            surface,
            surface_config,
            device,
            queue,
            camera_projection,
            buffer_state,
            bind_group_state,
            depth_texture,
            renderer,
        }
    }

    /// Uploads this frame's selection and focus state.
    pub fn write_frame_uniform(&self, frame_uniform: &FrameUniform) {
        self.buffer_state.get().write_buffer(
            FRAME_UNIFORM_BUFFER_NAME,
            0,
            bytemuck::cast_slice(&[*frame_uniform]),
        );
    }

    /// Handles window resize events.
    pub fn resize_surface(&mut self, size: winit::dpi::PhysicalSize<u32>) {
        self.surface_config.width = size.width;
        self.surface_config.height = size.height;
        self.surface
            .configure(&self.device.get(), &self.surface_config);

        self.camera_projection.resize(size.width, size.height);
        self.depth_texture = texture::Texture::create_depth_texture(
            &self.device.get(),
            &self.surface_config,
            "DEPTH TEXTURE",
        );
    }

    /// Renders one frame: clear, draw both mirrors, present.
    ///
    /// # Panics
    /// Panics if the surface texture cannot be acquired.
    pub fn render(&mut self, voxel_instance_count: u32, app_instance_count: u32) {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(err) => {
                error!("Error getting current frame: {:?}", err);
                panic!();
            }
        };

        let view = frame.texture.create_view(&Default::default());
        let mut encoder = self.device.get().create_command_encoder(&Default::default());
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });
            self.renderer
                .render(&mut rpass, voxel_instance_count, app_instance_count);
        }

        let command_buffer = encoder.finish();
        self.queue.get().submit([command_buffer]);
        frame.present();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Point3, Vector3};

    #[test]
    fn frame_uniform_tracks_selection_and_focus() {
        let mut uniform = FrameUniform::new();
        assert_eq!(uniform.selected_valid, 0);
        assert_eq!(uniform.focused_app_slot, -1);

        uniform.set_selection(Some(RayHit {
            cell: Point3::new(3, 4, 5),
            normal: Vector3::new(-1, 0, 0),
        }));
        uniform.set_focused_slot(Some(7));
        assert_eq!(uniform.selected_cell, [3, 4, 5]);
        assert_eq!(uniform.selected_valid, 1);
        assert_eq!(uniform.focused_app_slot, 7);

        uniform.set_selection(None);
        uniform.set_focused_slot(None);
        assert_eq!(uniform.selected_valid, 0);
        assert_eq!(uniform.focused_app_slot, -1);
    }
}
