//! # Camera Implementation
//!
//! First-person camera, perspective projection, and the input-driven
//! controller that moves them. The camera's eye position and facing vector
//! are the only inputs the selection ray needs, so this module is also the
//! source of truth for "what is the viewer looking at".

use cgmath::*;
use std::f32::consts::FRAC_PI_2;
use web_time::Duration;

use crate::engine_state::PlayerAction;

/// Transformation matrix converting OpenGL clip space to WGPU clip space.
///
/// cgmath's `perspective` produces OpenGL-style z in [-1, 1]; WGPU expects
/// [0, 1]. This matrix rescales and shifts z accordingly.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Pitch limit just short of straight up/down, avoiding gimbal lock.
const SAFE_FRAC_PI_2: f32 = FRAC_PI_2 - 0.0001;

/// A first-person camera: eye position plus yaw and pitch.
#[derive(Debug)]
pub struct Camera {
    /// Eye position in world space
    pub position: Point3<f32>,
    /// Rotation around the y axis, radians
    pub yaw: Rad<f32>,
    /// Rotation toward the y axis, radians, clamped short of vertical
    pub pitch: Rad<f32>,
}

impl Camera {
    /// Creates a camera at `position` with the given orientation.
    pub fn new<V: Into<Point3<f32>>, Y: Into<Rad<f32>>, P: Into<Rad<f32>>>(
        position: V,
        yaw: Y,
        pitch: P,
    ) -> Self {
        Self {
            position: position.into(),
            yaw: yaw.into(),
            pitch: pitch.into(),
        }
    }

    /// Normalized facing direction, the ray the selection is cast along.
    pub fn facing(&self) -> Vector3<f32> {
        let (yaw_sin, yaw_cos) = self.yaw.0.sin_cos();
        let (pitch_sin, pitch_cos) = self.pitch.0.sin_cos();
        Vector3::new(pitch_cos * yaw_cos, pitch_sin, pitch_cos * yaw_sin).normalize()
    }

    /// View matrix transforming world space into camera space.
    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_to_rh(self.position, self.facing(), Vector3::unit_y())
    }

    /// Replaces the full pose in one call. Used by focus transitions, which
    /// drive the camera directly instead of through the controller.
    pub fn set_pose(&mut self, position: Point3<f32>, yaw: Rad<f32>, pitch: Rad<f32>) {
        self.position = position;
        self.yaw = yaw;
        self.pitch = self.clamp_pitch(pitch);
    }

    /// Applies the controller's accumulated input over `dt`, then resets it.
    pub fn apply_controller(&mut self, controller: &mut CameraController, dt: Duration) {
        let dt = dt.as_secs_f32();

        let (yaw_sin, yaw_cos) = self.yaw.0.sin_cos();
        let forward = Vector3::new(yaw_cos, 0.0, yaw_sin).normalize();
        let right = Vector3::new(-yaw_sin, 0.0, yaw_cos).normalize();
        self.position += forward
            * (controller.amount_forward - controller.amount_backward)
            * controller.speed
            * dt;
        self.position +=
            right * (controller.amount_right - controller.amount_left) * controller.speed * dt;
        self.position.y += (controller.amount_up - controller.amount_down) * controller.speed * dt;

        self.yaw += Rad(controller.rotate_horizontal) * controller.sensitivity * dt;
        let pitch = self.pitch + Rad(-controller.rotate_vertical) * controller.sensitivity * dt;
        self.pitch = self.clamp_pitch(pitch);

        controller.reset();
    }

    fn clamp_pitch(&self, pitch: Rad<f32>) -> Rad<f32> {
        if pitch < -Rad(SAFE_FRAC_PI_2) {
            -Rad(SAFE_FRAC_PI_2)
        } else if pitch > Rad(SAFE_FRAC_PI_2) {
            Rad(SAFE_FRAC_PI_2)
        } else {
            pitch
        }
    }
}

/// Perspective projection parameters and matrix.
#[derive(Debug)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    /// Creates a projection for a viewport of `width` by `height` pixels.
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    /// Updates the aspect ratio after a viewport resize.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height as f32;
    }

    /// Projection matrix in WGPU clip space.
    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

/// Accumulates movement and look input between frames.
#[derive(Debug)]
pub struct CameraController {
    amount_left: f32,
    amount_right: f32,
    amount_forward: f32,
    amount_backward: f32,
    amount_up: f32,
    amount_down: f32,
    rotate_horizontal: f32,
    rotate_vertical: f32,
    speed: f32,
    sensitivity: f32,
}

impl CameraController {
    /// Creates a controller with the given movement speed and look
    /// sensitivity.
    pub fn new(speed: f32, sensitivity: f32) -> Self {
        Self {
            amount_left: 0.0,
            amount_right: 0.0,
            amount_forward: 0.0,
            amount_backward: 0.0,
            amount_up: 0.0,
            amount_down: 0.0,
            rotate_horizontal: 0.0,
            rotate_vertical: 0.0,
            speed,
            sensitivity,
        }
    }

    /// Folds one frame's worth of player actions into the accumulators.
    pub fn intake_actions(&mut self, actions: &PlayerAction) {
        if actions.move_forward {
            self.amount_forward = self.speed;
        }
        if actions.move_backward {
            self.amount_backward = self.speed;
        }
        if actions.move_left {
            self.amount_left = self.speed;
        }
        if actions.move_right {
            self.amount_right = self.speed;
        }
        if actions.move_up {
            self.amount_up = self.speed;
        }
        if actions.move_down {
            self.amount_down = self.speed;
        }
        if let Some((delta_x, delta_y)) = actions.rotate_view {
            if delta_x.abs() > 0.5 {
                self.rotate_horizontal = (delta_x as f32) * self.sensitivity;
            }
            if delta_y.abs() > 0.5 {
                self.rotate_vertical = (delta_y as f32) * self.sensitivity;
            }
        }
    }

    /// Whether any accumulated input would move or turn the camera.
    pub fn has_updates(&self) -> bool {
        self.amount_forward > 0.0
            || self.amount_backward > 0.0
            || self.amount_left > 0.0
            || self.amount_right > 0.0
            || self.amount_up > 0.0
            || self.amount_down > 0.0
            || self.rotate_horizontal != 0.0
            || self.rotate_vertical != 0.0
    }

    fn reset(&mut self) {
        self.amount_left = 0.0;
        self.amount_right = 0.0;
        self.amount_forward = 0.0;
        self.amount_backward = 0.0;
        self.amount_up = 0.0;
        self.amount_down = 0.0;
        self.rotate_horizontal = 0.0;
        self.rotate_vertical = 0.0;
    }
}

/// Camera data in the layout the shaders expect.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_proj: [[f32; 4]; 4],
    position: [f32; 4],
}

impl CameraUniform {
    /// Identity matrices and a zero position.
    pub fn new() -> Self {
        Self {
            view_proj: cgmath::Matrix4::identity().into(),
            position: [0.0, 0.0, 0.0, 0.0],
        }
    }

    /// Refreshes the packed matrices from the live camera and projection.
    pub fn update_view_proj_and_pos(&mut self, camera: &Camera, projection: &Projection) {
        self.view_proj = (projection.calc_matrix() * camera.calc_matrix()).into();
        let pos3: [f32; 3] = camera.position.into();
        self.position = [pos3[0], pos3[1], pos3[2], 0.0];
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facing_follows_yaw() {
        let camera = Camera::new(Point3::new(0.0, 0.0, 0.0), Rad(0.0), Rad(0.0));
        let facing = camera.facing();
        assert!((facing.x - 1.0).abs() < 1e-6);
        assert!(facing.y.abs() < 1e-6);
        assert!(facing.z.abs() < 1e-6);
    }

    #[test]
    fn pitch_is_clamped_short_of_vertical() {
        let mut camera = Camera::new(Point3::new(0.0, 0.0, 0.0), Rad(0.0), Rad(0.0));
        camera.set_pose(camera.position, camera.yaw, Rad(10.0));
        assert!(camera.pitch.0 < FRAC_PI_2);
        camera.set_pose(camera.position, camera.yaw, Rad(-10.0));
        assert!(camera.pitch.0 > -FRAC_PI_2);
    }
}
