//! # Camera State Management
//!
//! Owns the camera, its projection uniform buffer, and the focus transition
//! machinery.
//!
//! ## Frame Flow
//!
//! Input actions accumulate in the controller during input processing, then
//! `update` is called once per frame with the frame's sampled clock. While a
//! focus transition is active the controller is ignored and the pose is
//! interpolated toward the target instead; the frame a transition crosses
//! its end time, `update` reports completion so the engine can flip focus.
//! Nothing outside the frame loop ever moves the camera.

use camera::CameraController;
use cgmath::{EuclideanSpace, Point3, Rad};
use web_time::{Duration, Instant};

use crate::core::StSystem;

use super::{buffer_state::BufferState, PlayerAction};

pub mod camera;

/// Name of the GPU buffer holding the camera uniform.
pub const CAMERA_BUFFER_NAME: &str = "camera_buffer";

/// A timed interpolation of the camera pose toward a focus target.
struct CameraTransition {
    from_position: Point3<f32>,
    from_yaw: Rad<f32>,
    from_pitch: Rad<f32>,
    to_position: Point3<f32>,
    to_yaw: Rad<f32>,
    to_pitch: Rad<f32>,
    started: Instant,
    duration: Duration,
}

impl CameraTransition {
    fn progress(&self, now: Instant) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (now.duration_since(self.started).as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
    }

    fn sample(&self, now: Instant) -> (Point3<f32>, Rad<f32>, Rad<f32>) {
        // Smoothstep, so the move eases out as it lands on the app.
        let t = self.progress(now);
        let t = t * t * (3.0 - 2.0 * t);

        let position = Point3::from_vec(
            self.from_position.to_vec() * (1.0 - t) + self.to_position.to_vec() * t,
        );
        let yaw = Rad(self.from_yaw.0 * (1.0 - t) + self.to_yaw.0 * t);
        let pitch = Rad(self.from_pitch.0 * (1.0 - t) + self.to_pitch.0 * t);
        (position, yaw, pitch)
    }

    fn finished(&self, now: Instant) -> bool {
        self.progress(now) >= 1.0
    }
}

/// The camera system: state, controller, uniform buffer, and transition.
pub struct CameraState {
    /// The current camera pose
    pub camera: camera::Camera,
    /// Packed camera data mirrored into the uniform buffer
    pub camera_uniform: camera::CameraUniform,
    /// Accumulates input between frames
    pub camera_controller: camera::CameraController,
    /// Registry the camera uniform buffer lives in
    pub buffer_state: StSystem<BufferState>,
    transition: Option<CameraTransition>,
}

impl CameraState {
    /// Creates the camera system and its uniform buffer.
    pub fn new(buffer_state: StSystem<BufferState>, projection: &camera::Projection) -> Self {
        let camera = camera::Camera::new(
            Point3::new(0.0, 0.0, 0.0),
            cgmath::Deg(0.0),
            cgmath::Deg(0.0),
        );
        let camera_controller = CameraController::new(2.0, 2.0);

        let mut camera_uniform = camera::CameraUniform::new();
        camera_uniform.update_view_proj_and_pos(&camera, projection);

        buffer_state.get_mut().create_buffer_init(
            CAMERA_BUFFER_NAME,
            wgpu::util::BufferInitDescriptor {
                label: Some(CAMERA_BUFFER_NAME),
                contents: bytemuck::cast_slice(&[camera_uniform]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            },
        );

        CameraState {
            camera,
            camera_uniform,
            camera_controller,
            buffer_state: buffer_state.clone(),
            transition: None,
        }
    }

    /// Feeds one frame's player actions to the controller.
    ///
    /// Ignored while a focus transition is flying the camera.
    pub fn intake_actions(&mut self, actions: &PlayerAction) {
        if self.transition.is_none() {
            self.camera_controller.intake_actions(actions);
        }
    }

    /// Starts a timed move to the given pose.
    ///
    /// A transition already in flight is replaced; the new one starts from
    /// wherever the camera currently is.
    pub fn begin_transition(
        &mut self,
        now: Instant,
        position: Point3<f32>,
        yaw: Rad<f32>,
        pitch: Rad<f32>,
        duration: Duration,
    ) {
        self.transition = Some(CameraTransition {
            from_position: self.camera.position,
            from_yaw: self.camera.yaw,
            from_pitch: self.camera.pitch,
            to_position: position,
            to_yaw: yaw,
            to_pitch: pitch,
            started: now,
            duration,
        });
    }

    /// Whether a focus transition is currently flying the camera.
    pub fn in_transition(&self) -> bool {
        self.transition.is_some()
    }

    /// Advances the camera one frame and refreshes the uniform buffer if
    /// the pose changed.
    ///
    /// # Returns
    /// `true` exactly once per transition, on the frame it completes. The
    /// engine uses that edge to flip app focus.
    pub fn update(
        &mut self,
        dt: Duration,
        now: Instant,
        projection: &camera::Projection,
    ) -> bool {
        let mut transition_completed = false;
        let mut moved = false;

        if let Some(transition) = &self.transition {
            let (position, yaw, pitch) = transition.sample(now);
            self.camera.set_pose(position, yaw, pitch);
            moved = true;
            if transition.finished(now) {
                self.transition = None;
                transition_completed = true;
            }
        } else if self.camera_controller.has_updates() {
            self.camera
                .apply_controller(&mut self.camera_controller, dt);
            moved = true;
        }

        if moved {
            self.camera_uniform
                .update_view_proj_and_pos(&self.camera, projection);
            self.buffer_state.get_mut().write_buffer(
                CAMERA_BUFFER_NAME,
                0,
                bytemuck::cast_slice(&[self.camera_uniform]),
            );
        }

        transition_completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_samples_interpolate_and_finish() {
        let start = Instant::now();
        let transition = CameraTransition {
            from_position: Point3::new(0.0, 0.0, 0.0),
            from_yaw: Rad(0.0),
            from_pitch: Rad(0.0),
            to_position: Point3::new(1.0, 0.0, 0.0),
            to_yaw: Rad(1.0),
            to_pitch: Rad(0.0),
            started: start,
            duration: Duration::from_millis(100),
        };

        let (position, yaw, _) = transition.sample(start);
        assert!(position.x.abs() < 1e-6);
        assert!(yaw.0.abs() < 1e-6);
        assert!(!transition.finished(start));

        let end = start + Duration::from_millis(150);
        let (position, yaw, _) = transition.sample(end);
        assert!((position.x - 1.0).abs() < 1e-6);
        assert!((yaw.0 - 1.0).abs() < 1e-6);
        assert!(transition.finished(end));
    }

    #[test]
    fn zero_duration_transition_finishes_immediately() {
        let start = Instant::now();
        let transition = CameraTransition {
            from_position: Point3::new(0.0, 0.0, 0.0),
            from_yaw: Rad(0.0),
            from_pitch: Rad(0.0),
            to_position: Point3::new(2.0, 0.0, 0.0),
            to_yaw: Rad(0.0),
            to_pitch: Rad(0.0),
            started: start,
            duration: Duration::ZERO,
        };
        assert!(transition.finished(start));
        let (position, _, _) = transition.sample(start);
        assert!((position.x - 2.0).abs() < 1e-6);
    }
}
