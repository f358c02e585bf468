//! # Engine State Module
//!
//! The frame-driven core of the shell. `EngineState` owns the world, the
//! camera, the two instance mirrors, and the render manager, and runs the
//! fixed per-frame order everything else assumes:
//!
//! 1. input sampling (actions translated from the processed input state)
//! 2. camera update (movement, look, focus transition completion)
//! 3. selection recompute (one ray cast from the camera)
//! 4. world mutation (debounced edits against the fresh selection, app
//!    focus, save hotkey)
//! 5. mirror flush (slot deltas drained into bounded GPU writes)
//! 6. draw submission
//!
//! Everything runs on the one event-loop thread; the `StSystem` handles
//! exist to share the device, queue, and buffer registry across subsystems,
//! not to cross threads.

use camera_state::{camera, CameraState, CAMERA_BUFFER_NAME};
use cgmath::{Point3, Rad};
use log::{error, info, warn};
use web_time::{Duration, Instant};
use wgpu::{Device, Queue, Surface, SurfaceConfiguration};
use winit::keyboard::KeyCode;

use crate::{
    application_state::input_state::ProcessedInputState,
    core::StSystem,
};

use rendering::{
    FrameUniform, InstanceSyncBuffer, WorldRenderManager, APP_INSTANCE_BUFFER_NAME,
    VOXEL_INSTANCE_BUFFER_NAME,
};
use world::{
    app_registry::{AppHandle, APP_SLOT_CAPACITY},
    app_surface::{AppSurfaceHost, StubSurfaceHost},
    block_type::BlockType,
    voxel_store::VOXEL_SLOT_CAPACITY,
    World,
};

pub mod buffer_state;
pub mod camera_state;
pub mod rendering;
pub mod world;

/// Minimum interval between repeated edit actions while a button is held.
const EDIT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Duration of the camera move when an app takes focus.
const FOCUS_TRANSITION: Duration = Duration::from_millis(600);

/// Where the save hotkey writes the world snapshot.
const SNAPSHOT_PATH: &str = "saves/world.json";

/// Camera distance apps prefer when focused, passed to the stub host.
const DEFAULT_APP_VIEW_DISTANCE: f32 = 1.2;

/// The main state container for the shell.
pub struct EngineState {
    /// Camera state managing position, orientation and movement
    pub camera_state: CameraState,
    /// Current player actions derived from input
    pub player_actions: PlayerAction,
    /// Buffer state for managing GPU buffers
    pub buffer_state: StSystem<buffer_state::BufferState>,
    /// Manager for render pipelines and frame submission
    pub render_manager: WorldRenderManager,
    /// The voxel world, app anchors, and selection
    pub world: World,
    /// Reference to the GPU device
    pub device: StSystem<Device>,
    /// Reference to the GPU queue
    pub queue: StSystem<Queue>,
    surface_host: StubSurfaceHost,
    voxel_mirror: InstanceSyncBuffer,
    app_mirror: InstanceSyncBuffer,
    frame_uniform: FrameUniform,
    active_block_type: BlockType,
    last_edit_at: Option<Instant>,
    pending_focus: Option<AppHandle>,
}

impl EngineState {
    /// Creates the engine with all subsystems initialized and the demo
    /// world seeded.
    pub fn new(
        surface: Surface<'static>,
        surface_config: SurfaceConfiguration,
        device: Device,
        queue: Queue,
        shader_string: String,
    ) -> Self {
        let device = StSystem::new(Box::new(device));
        let queue = StSystem::new(Box::new(queue));

        let buffer_state = StSystem::new(Box::new(buffer_state::BufferState::new(
            device.clone(),
            queue.clone(),
        )));

        let camera_projection = camera::Projection::new(
            surface_config.width,
            surface_config.height,
            cgmath::Deg(45.0),
            0.01,
            100.0,
        );

        let mut camera_state = CameraState::new(buffer_state.clone(), &camera_projection);

        let voxel_mirror = InstanceSyncBuffer::new(VOXEL_INSTANCE_BUFFER_NAME, VOXEL_SLOT_CAPACITY);
        let app_mirror = InstanceSyncBuffer::new(APP_INSTANCE_BUFFER_NAME, APP_SLOT_CAPACITY as u32);
        voxel_mirror.register(&mut buffer_state.get_mut());
        app_mirror.register(&mut buffer_state.get_mut());

        let render_manager = WorldRenderManager::new(
            surface,
            surface_config,
            shader_string,
            camera_projection,
            device.clone(),
            queue.clone(),
            buffer_state.clone(),
        );

        let mut world = World::new();
        if std::path::Path::new(SNAPSHOT_PATH).exists() {
            match world.load(SNAPSHOT_PATH) {
                Ok(()) => info!("restored world from {}", SNAPSHOT_PATH),
                Err(err) => {
                    error!("snapshot restore failed, reseeding: {}", err);
                    Self::seed_demo_world(&mut world);
                }
            }
        } else {
            Self::seed_demo_world(&mut world);
        }

        // Start above the plaza, looking down into it.
        camera_state.camera.set_pose(
            Point3::new(2.2, 0.8, 2.2),
            cgmath::Deg(45.0).into(),
            cgmath::Deg(-20.0).into(),
        );
        camera_state
            .camera_uniform
            .update_view_proj_and_pos(&camera_state.camera, &render_manager.camera_projection);
        buffer_state.get().write_buffer(
            CAMERA_BUFFER_NAME,
            0,
            bytemuck::cast_slice(&[camera_state.camera_uniform]),
        );

        info!(
            "GPU buffers allocated: {} bytes",
            buffer_state.get().get_total_allocated_memory()
        );

        Self {
            camera_state,
            player_actions: PlayerAction::default(),
            buffer_state,
            render_manager,
            world,
            device,
            queue,
            surface_host: StubSurfaceHost::new(DEFAULT_APP_VIEW_DISTANCE),
            voxel_mirror,
            app_mirror,
            frame_uniform: FrameUniform::new(),
            active_block_type: BlockType::SLATE,
            last_edit_at: None,
            pending_focus: None,
        }
    }

    /// Lays down a small plaza with a road and two anchored apps, so a
    /// fresh start has something to look at and focus on.
    fn seed_demo_world(world: &mut World) {
        for x in 16..48 {
            for z in 16..48 {
                let block_type = if z == 31 || z == 32 {
                    BlockType::ROAD
                } else {
                    BlockType::GRASS
                };
                if let Err(err) = world.set_voxel(Point3::new(x, 0, z), block_type) {
                    warn!("seeding skipped ({}, 0, {}): {}", x, z, err);
                }
            }
        }
        for (x, z) in [(20, 20), (20, 43), (43, 20), (43, 43)] {
            for y in 1..5 {
                if let Err(err) = world.set_voxel(Point3::new(x, y, z), BlockType::PILLAR) {
                    warn!("seeding skipped ({}, {}, {}): {}", x, y, z, err);
                }
            }
        }

        for (id, cell) in [(1, Point3::new(26, 4, 24)), (2, Point3::new(38, 4, 40))] {
            if let Err(err) = world.place_app(AppHandle(id), World::cell_center(cell)) {
                warn!("seeding skipped app {}: {}", id, err);
            }
        }
    }

    /// Resizes the rendering surface when the window size changes.
    pub fn resize_surface(&mut self, size: winit::dpi::PhysicalSize<u32>) {
        self.render_manager.resize_surface(size);
    }

    /// Renders the current frame.
    pub fn render(&mut self) {
        self.render_manager
            .render(self.world.voxel_draw_count(), self.world.app_draw_count());
    }

    /// Runs one frame of simulation: camera, edits, selection, and the
    /// mirror flush.
    ///
    /// # Arguments
    /// * `wait_duration` - time elapsed since the last frame
    pub fn process_input(&mut self, wait_duration: Duration) {
        let now = Instant::now();

        self.camera_state.intake_actions(&self.player_actions);
        let transition_completed = self.camera_state.update(
            wait_duration,
            now,
            &self.render_manager.camera_projection,
        );
        if transition_completed {
            // Deferred completion: focus flips only when the camera lands.
            self.world
                .set_focus(self.pending_focus.take(), &mut self.surface_host);
        }

        self.world.update_selection(
            self.camera_state.camera.position,
            self.camera_state.camera.facing(),
        );

        self.process_edit_actions(now);
        self.process_app_actions(now);

        if self.player_actions.save_world {
            match self.world.save(SNAPSHOT_PATH) {
                Ok(()) => info!("world saved to {}", SNAPSHOT_PATH),
                Err(err) => error!("save failed: {}", err),
            }
        }

        self.flush_mirrors();

        self.frame_uniform.set_selection(self.world.selection());
        let focused_slot = self.world.focused_app().and_then(|handle| {
            self.world
                .apps()
                .lookup_by_handle(handle)
                .map(|anchor| anchor.slot)
        });
        self.frame_uniform.set_focused_slot(focused_slot);
        self.render_manager.write_frame_uniform(&self.frame_uniform);
    }

    /// Debounced place and remove edits against the current selection.
    fn process_edit_actions(&mut self, now: Instant) {
        if self.player_actions.cycle_block_type {
            self.active_block_type = self.active_block_type.next();
            info!("active block type: {}", self.active_block_type);
        }

        let wants_edit = self.player_actions.place_voxel || self.player_actions.remove_voxel;
        if !wants_edit || !self.debounce_elapsed(now) {
            return;
        }

        if self.player_actions.place_voxel {
            match self.world.place_at_selection(self.active_block_type) {
                Ok(Some(_)) => self.last_edit_at = Some(now),
                Ok(None) => {}
                Err(err) => warn!("placement rejected: {}", err),
            }
        } else if self.world.remove_at_selection().is_some() {
            self.last_edit_at = Some(now);
        }
    }

    /// The focus toggle: defocus if an app holds focus, otherwise fly to
    /// the looked-at app.
    fn process_app_actions(&mut self, now: Instant) {
        if !self.player_actions.toggle_app_focus || self.camera_state.in_transition() {
            return;
        }

        if self.world.focused_app().is_some() {
            self.world.set_focus(None, &mut self.surface_host);
            return;
        }

        let Some(handle) = self.world.looked_at_app() else {
            return;
        };
        let Some(anchor) = self.world.apps().lookup_by_handle(handle) else {
            return;
        };

        let distance = self.surface_host.view_distance(handle);
        let rotation = self.surface_host.anchor_rotation(handle);
        // The quad faces +z rotated about y; stand back along its normal.
        let normal = cgmath::Vector3::new(rotation.sin(), 0.0, rotation.cos());
        let target = anchor.position + normal * distance;
        let yaw = Rad((-normal.z).atan2(-normal.x));

        self.camera_state
            .begin_transition(now, target, yaw, Rad(0.0), FOCUS_TRANSITION);
        self.pending_focus = Some(handle);
    }

    fn debounce_elapsed(&self, now: Instant) -> bool {
        match self.last_edit_at {
            Some(last) => now.duration_since(last) >= EDIT_DEBOUNCE,
            None => true,
        }
    }

    /// Drains world deltas into the mirrors and uploads the dirty slots.
    fn flush_mirrors(&mut self) {
        for delta in self.world.drain_voxel_deltas() {
            if let Err(err) = self.voxel_mirror.apply(delta) {
                error!("voxel mirror write dropped: {}", err);
            }
        }
        for delta in self.world.drain_app_deltas() {
            if let Err(err) = self.app_mirror.apply(delta) {
                error!("app mirror write dropped: {}", err);
            }
        }

        let buffer_state = self.buffer_state.get();
        self.voxel_mirror.flush(&buffer_state);
        self.app_mirror.flush(&buffer_state);
    }

    /// Sets the input commands for the engine state.
    pub fn set_input_commands(&mut self, input: ProcessedInputState) {
        self.player_actions = Self::translate_processed_input(input);
    }

    /// Translates the processed input state into player actions.
    fn translate_processed_input(input: ProcessedInputState) -> PlayerAction {
        let mut player_action = PlayerAction::default();

        // Movement actions - active if key is pressed or held
        player_action.move_forward = input.get_key_state(KeyCode::KeyW).is_active();
        player_action.move_backward = input.get_key_state(KeyCode::KeyS).is_active();
        player_action.move_left = input.get_key_state(KeyCode::KeyA).is_active();
        player_action.move_right = input.get_key_state(KeyCode::KeyD).is_active();
        player_action.move_up = input.get_key_state(KeyCode::Space).is_active();
        player_action.move_down = input.get_key_state(KeyCode::ShiftLeft).is_active();

        // Mouse rotation - active while the left button is down and moving
        if input.get_mouse_delta().is_some()
            && input
                .get_mouse_button_state(winit::event::MouseButton::Left)
                .is_active()
        {
            player_action.rotate_view = input.mouse_delta;
        }

        // Edits repeat while held; the engine debounces the rate
        player_action.place_voxel = input
            .get_mouse_button_state(winit::event::MouseButton::Right)
            .is_active();
        player_action.remove_voxel = input.get_key_state(KeyCode::KeyQ).is_active();

        // One-shot actions trigger on press only
        player_action.cycle_block_type = input.get_key_state(KeyCode::KeyB).is_just_pressed();
        player_action.toggle_app_focus = input.get_key_state(KeyCode::KeyF).is_just_pressed();
        player_action.save_world = input.get_key_state(KeyCode::KeyL).is_just_pressed();

        player_action
    }
}

/// Player actions derived from one frame of input.
#[derive(Default)]
pub struct PlayerAction {
    /// Movement actions - true while the key is pressed or held
    move_forward: bool,
    move_backward: bool,
    move_left: bool,
    move_right: bool,
    move_up: bool,
    move_down: bool,

    /// View rotation - Some while the look button is held and moving
    rotate_view: Option<(f64, f64)>,

    /// Edit actions - true while held, rate-limited by the engine
    place_voxel: bool,
    remove_voxel: bool,

    /// One-shot actions, true only on the press frame
    cycle_block_type: bool,
    toggle_app_focus: bool,
    save_world: bool,
}
