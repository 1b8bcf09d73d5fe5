use brickyard_shared::raycast::CameraBasis;
use glam::{Mat4, Vec3};
use winit::keyboard::KeyCode;

use crate::input::InputState;

const MAX_PITCH: f32 = 89.0_f32.to_radians();

#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    /// Radians; zero looks down +Z.
    pub yaw: f32,
    pub pitch: f32,
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
            fov: 70.0_f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1024.0,
        }
    }
}

impl Camera {
    pub fn forward_direction(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        Vec3::new(cos_pitch * sin_yaw, sin_pitch, cos_pitch * cos_yaw).normalize_or_zero()
    }

    pub fn basis(&self) -> CameraBasis {
        let forward = self.forward_direction();
        let right = forward.cross(Vec3::Y).normalize_or_zero();
        let up = right.cross(forward).normalize_or_zero();
        CameraBasis {
            position: self.position,
            forward,
            right,
            up,
        }
    }

    /// Degrees in, radians stored; pitch stops just short of straight up/down.
    pub fn rotate(&mut self, delta_pitch_deg: f32, delta_yaw_deg: f32) {
        self.yaw += delta_yaw_deg.to_radians();
        self.pitch = (self.pitch + delta_pitch_deg.to_radians()).clamp(-MAX_PITCH, MAX_PITCH);
    }

    /// Moves along the camera's own right, up and forward axes.
    pub fn move_local(&mut self, dx: f32, dy: f32, dz: f32) {
        let basis = self.basis();
        self.position += basis.right * dx + basis.up * dy + basis.forward * dz;
    }

    pub fn update_look(&mut self, input: &InputState, degrees_per_pixel: f32) {
        if !input.is_looking() {
            return;
        }
        let delta = input.mouse_delta * degrees_per_pixel;
        self.rotate(-delta.y, -delta.x);
    }

    pub fn update_movement(&mut self, input: &InputState, speed: f32, dt: f32) {
        let mut axes = Vec3::ZERO;
        if input.is_pressed(KeyCode::KeyW) {
            axes.z += 1.0;
        }
        if input.is_pressed(KeyCode::KeyS) {
            axes.z -= 1.0;
        }
        if input.is_pressed(KeyCode::KeyD) {
            axes.x += 1.0;
        }
        if input.is_pressed(KeyCode::KeyA) {
            axes.x -= 1.0;
        }
        if input.is_pressed(KeyCode::Space) {
            axes.y += 1.0;
        }
        if input.is_pressed(KeyCode::ShiftLeft) {
            axes.y -= 1.0;
        }

        let step = axes.normalize_or_zero() * speed * dt;
        if step != Vec3::ZERO {
            self.move_local(step.x, step.y, step.z);
        }
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        let view = Mat4::look_to_rh(self.position, self.forward_direction(), Vec3::Y);
        let projection = Mat4::perspective_rh(
            self.fov,
            self.aspect.max(0.0001),
            self.near.max(0.0001),
            self.far.max(self.near + 0.0001),
        );

        projection * view
    }
}

#[cfg(test)]
mod tests {
    use glam::{Vec3, Vec4};

    use super::Camera;

    #[test]
    fn default_camera_looks_down_positive_z() {
        let camera = Camera::default();
        let basis = camera.basis();
        assert!((basis.forward - Vec3::Z).length() < 1e-6);
        assert!((basis.up - Vec3::Y).length() < 1e-6);
        // Screen right when looking down +Z in a right-handed frame.
        assert!((basis.right - Vec3::NEG_X).length() < 1e-6);
    }

    #[test]
    fn basis_stays_orthonormal_when_rotated() {
        let mut camera = Camera::default();
        camera.rotate(-35.0, 120.0);
        let basis = camera.basis();
        for axis in [basis.forward, basis.right, basis.up] {
            assert!((axis.length() - 1.0).abs() < 1e-5);
        }
        assert!(basis.forward.dot(basis.right).abs() < 1e-5);
        assert!(basis.forward.dot(basis.up).abs() < 1e-5);
        assert!(basis.right.dot(basis.up).abs() < 1e-5);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut camera = Camera::default();
        camera.rotate(500.0, 0.0);
        assert!(camera.pitch <= 89.0_f32.to_radians() + 1e-6);
        camera.rotate(-1000.0, 0.0);
        assert!(camera.pitch >= -89.0_f32.to_radians() - 1e-6);
    }

    #[test]
    fn move_local_follows_forward() {
        let mut camera = Camera::default();
        camera.move_local(0.0, 0.0, 10.0);
        assert!((camera.position - Vec3::new(0.0, 0.0, 10.0)).length() < 1e-5);
    }

    #[test]
    fn point_ahead_projects_to_screen_centre() {
        let mut camera = Camera::default();
        camera.position = Vec3::new(5.0, 80.0, -20.0);
        camera.rotate(-20.0, 45.0);

        let target = camera.position + camera.forward_direction() * 50.0;
        let clip = camera.view_projection_matrix() * Vec4::new(target.x, target.y, target.z, 1.0);
        let ndc = clip / clip.w;
        assert!(ndc.x.abs() < 1e-4 && ndc.y.abs() < 1e-4);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }
}
