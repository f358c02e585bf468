//! World renderer for the voxel shell.
//!
//! Owns the two instanced pipelines: cubes for the voxel mirror and quads
//! for the app mirror. Both share the static geometry buffers created here,
//! one WGSL module, and the camera and frame bind groups.
//!
//! Instance counts come from the domain each frame. The voxel draw spans
//! the slot watermark and relies on the vertex shader collapsing sentinel
//! records to degenerate triangles, so cleared slots cost vertex work but
//! never fragments.

use wgpu::{Device, RenderPass, RenderPipeline, TextureFormat};

use crate::{
    core::StSystem,
    engine_state::{buffer_state::BufferState, world::VOXEL_EDGE_LENGTH},
};

use super::{
    bind_group_state::{
        BindGroupState, CAMERA_BIND_GROUP, CAMERA_BIND_GROUP_LAYOUT, FRAME_BIND_GROUP,
        FRAME_BIND_GROUP_LAYOUT,
    },
    instance_sync::InstanceRecord,
    vertex::{cube_vertices, quad_vertices, Vertex, CUBE_INDICES, QUAD_INDICES},
    APP_INSTANCE_BUFFER_NAME, VOXEL_INSTANCE_BUFFER_NAME,
};

/// Name of the shared cube vertex buffer
pub const CUBE_VERTEX_BUFFER_NAME: &str = "cube_vertex_buffer";
/// Name of the shared cube index buffer
pub const CUBE_INDEX_BUFFER_NAME: &str = "cube_index_buffer";
/// Name of the shared app quad vertex buffer
pub const QUAD_VERTEX_BUFFER_NAME: &str = "quad_vertex_buffer";
/// Name of the shared app quad index buffer
pub const QUAD_INDEX_BUFFER_NAME: &str = "quad_index_buffer";

/// App quad width in world units.
const APP_QUAD_WIDTH: f32 = VOXEL_EDGE_LENGTH * 4.0;
/// App quad height in world units.
const APP_QUAD_HEIGHT: f32 = VOXEL_EDGE_LENGTH * 3.0;

/// Issues the voxel and app instanced draws.
pub struct WorldRenderer {
    voxel_pipeline: RenderPipeline,
    app_pipeline: RenderPipeline,
    buffer_state: StSystem<BufferState>,
    bind_group_state: StSystem<BindGroupState>,
}

impl WorldRenderer {
    /// Creates the renderer: static geometry, shader module, and the two
    /// pipelines.
    pub fn new(
        device: StSystem<Device>,
        buffer_state: StSystem<BufferState>,
        shader_string: &str,
        texture_format: TextureFormat,
        bind_group_state: StSystem<BindGroupState>,
        depth_stencil: Option<wgpu::DepthStencilState>,
    ) -> Self {
        Self::create_geometry_buffers(&buffer_state);

        let device_ref = device.get();

        let pipeline_layout = device_ref.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("World Render Pipeline Layout"),
            bind_group_layouts: &[
                bind_group_state
                    .get()
                    .get_bind_group_layout(CAMERA_BIND_GROUP_LAYOUT),
                bind_group_state
                    .get()
                    .get_bind_group_layout(FRAME_BIND_GROUP_LAYOUT),
            ],
            push_constant_ranges: &[],
        });

        let shader = device_ref.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("World Shader"),
            source: wgpu::ShaderSource::Wgsl(shader_string.into()),
        });

        let make_pipeline = |label, vs_entry, fs_entry, cull_mode| {
            device_ref.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some(vs_entry),
                    compilation_options: Default::default(),
                    buffers: &[Vertex::desc(), InstanceRecord::desc()],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some(fs_entry),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: texture_format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: depth_stencil.clone(),
                multisample: Default::default(),
                multiview: None,
                cache: None,
            })
        };

        let voxel_pipeline = make_pipeline(
            "Voxel Render Pipeline",
            "vs_voxel",
            "fs_voxel",
            Some(wgpu::Face::Back),
        );
        // App quads stay visible from both sides.
        let app_pipeline = make_pipeline("App Render Pipeline", "vs_app", "fs_app", None);

        Self {
            voxel_pipeline,
            app_pipeline,
            buffer_state,
            bind_group_state,
        }
    }

    fn create_geometry_buffers(buffer_state: &StSystem<BufferState>) {
        let mut buffer_state = buffer_state.get_mut();

        buffer_state.create_buffer_init(
            CUBE_VERTEX_BUFFER_NAME,
            wgpu::util::BufferInitDescriptor {
                label: Some(CUBE_VERTEX_BUFFER_NAME),
                contents: bytemuck::cast_slice(&cube_vertices(VOXEL_EDGE_LENGTH)),
                usage: wgpu::BufferUsages::VERTEX,
            },
        );
        buffer_state.create_buffer_init(
            CUBE_INDEX_BUFFER_NAME,
            wgpu::util::BufferInitDescriptor {
                label: Some(CUBE_INDEX_BUFFER_NAME),
                contents: bytemuck::cast_slice(&CUBE_INDICES),
                usage: wgpu::BufferUsages::INDEX,
            },
        );
        buffer_state.create_buffer_init(
            QUAD_VERTEX_BUFFER_NAME,
            wgpu::util::BufferInitDescriptor {
                label: Some(QUAD_VERTEX_BUFFER_NAME),
                contents: bytemuck::cast_slice(&quad_vertices(APP_QUAD_WIDTH, APP_QUAD_HEIGHT)),
                usage: wgpu::BufferUsages::VERTEX,
            },
        );
        buffer_state.create_buffer_init(
            QUAD_INDEX_BUFFER_NAME,
            wgpu::util::BufferInitDescriptor {
                label: Some(QUAD_INDEX_BUFFER_NAME),
                contents: bytemuck::cast_slice(&QUAD_INDICES),
                usage: wgpu::BufferUsages::INDEX,
            },
        );
    }

    /// Records both instanced draws into the pass.
    ///
    /// # Arguments
    /// * `render_pass` - the pass to record into
    /// * `voxel_instance_count` - voxel slot watermark from the world
    /// * `app_instance_count` - app draw span from the registry
    pub fn render<'a, 'b>(
        &'a self,
        render_pass: &mut RenderPass<'b>,
        voxel_instance_count: u32,
        app_instance_count: u32,
    ) where
        'a: 'b,
    {
        let buffer_state = self.buffer_state.get();
        let bind_group_state = self.bind_group_state.get();

        render_pass.set_bind_group(0, bind_group_state.get_bind_group(CAMERA_BIND_GROUP), &[]);
        render_pass.set_bind_group(1, bind_group_state.get_bind_group(FRAME_BIND_GROUP), &[]);

        if voxel_instance_count > 0 {
            render_pass.set_pipeline(&self.voxel_pipeline);
            render_pass
                .set_vertex_buffer(0, buffer_state.get_buffer(CUBE_VERTEX_BUFFER_NAME).slice(..));
            render_pass.set_vertex_buffer(
                1,
                buffer_state.get_buffer(VOXEL_INSTANCE_BUFFER_NAME).slice(..),
            );
            render_pass.set_index_buffer(
                buffer_state.get_buffer(CUBE_INDEX_BUFFER_NAME).slice(..),
                wgpu::IndexFormat::Uint32,
            );
            render_pass.draw_indexed(0..CUBE_INDICES.len() as u32, 0, 0..voxel_instance_count);
        }

        if app_instance_count > 0 {
            render_pass.set_pipeline(&self.app_pipeline);
            render_pass
                .set_vertex_buffer(0, buffer_state.get_buffer(QUAD_VERTEX_BUFFER_NAME).slice(..));
            render_pass.set_vertex_buffer(
                1,
                buffer_state.get_buffer(APP_INSTANCE_BUFFER_NAME).slice(..),
            );
            render_pass.set_index_buffer(
                buffer_state.get_buffer(QUAD_INDEX_BUFFER_NAME).slice(..),
                wgpu::IndexFormat::Uint32,
            );
            render_pass.draw_indexed(0..QUAD_INDICES.len() as u32, 0, 0..app_instance_count);
        }
    }
}
