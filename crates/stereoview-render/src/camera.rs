//! Fly camera driven by keyboard movement, mouse look and scroll zoom.

use glam::{Mat4, Vec3};

pub const DEFAULT_YAW: f32 = -90.0;
pub const DEFAULT_PITCH: f32 = 0.0;
pub const DEFAULT_SPEED: f32 = 2.5;
pub const DEFAULT_SENSITIVITY: f32 = 0.1;
pub const DEFAULT_ZOOM: f32 = 45.0;

const PITCH_LIMIT: f32 = 89.0;
const MIN_ZOOM: f32 = 1.0;
const MAX_ZOOM: f32 = 45.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraMovement {
    Forward,
    Backward,
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    front: Vec3,
    up: Vec3,
    right: Vec3,
    world_up: Vec3,
    /// Degrees.
    yaw: f32,
    /// Degrees, kept within ±89.
    pitch: f32,
    pub movement_speed: f32,
    pub mouse_sensitivity: f32,
    /// Vertical field of view in degrees, kept within [1, 45].
    zoom: f32,
}

impl Camera {
    pub fn new(position: Vec3, world_up: Vec3) -> Self {
        let mut camera = Self {
            position,
            front: Vec3::NEG_Z,
            up: world_up,
            right: Vec3::X,
            world_up,
            yaw: DEFAULT_YAW,
            pitch: DEFAULT_PITCH,
            movement_speed: DEFAULT_SPEED,
            mouse_sensitivity: DEFAULT_SENSITIVITY,
            zoom: DEFAULT_ZOOM,
        };
        camera.update_vectors();
        camera
    }

    pub fn front(&self) -> Vec3 {
        self.front
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    pub fn move_in(&mut self, direction: CameraMovement, dt: f32) {
        let velocity = self.movement_speed * dt;
        match direction {
            CameraMovement::Forward => self.position += self.front * velocity,
            CameraMovement::Backward => self.position -= self.front * velocity,
            CameraMovement::Left => self.position -= self.right * velocity,
            CameraMovement::Right => self.position += self.right * velocity,
        }
    }

    /// `dx`/`dy` are raw pointer deltas; positive `dy` looks up.
    pub fn look(&mut self, dx: f32, dy: f32) {
        self.yaw += dx * self.mouse_sensitivity;
        self.pitch = (self.pitch + dy * self.mouse_sensitivity).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.update_vectors();
    }

    pub fn scroll(&mut self, dy: f32) {
        self.zoom = (self.zoom - dy).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    fn update_vectors(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.front = Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos())
            .normalize();
        self.right = self.front.cross(self.world_up).normalize();
        self.up = self.right.cross(self.front).normalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn default_camera_looks_down_negative_z() {
        let camera = Camera::new(Vec3::new(0.0, 0.0, 3.0), Vec3::Y);
        assert!(approx(camera.front(), Vec3::NEG_Z));
        assert!(approx(camera.right(), Vec3::X));
        assert!(approx(camera.up(), Vec3::Y));
    }

    #[test]
    fn movement_scales_with_speed_and_dt() {
        let mut camera = Camera::new(Vec3::ZERO, Vec3::Y);
        camera.move_in(CameraMovement::Forward, 2.0);
        assert!(approx(camera.position, Vec3::new(0.0, 0.0, -5.0)));
        camera.move_in(CameraMovement::Right, 0.4);
        assert!(approx(camera.position, Vec3::new(1.0, 0.0, -5.0)));
        camera.move_in(CameraMovement::Left, 0.4);
        camera.move_in(CameraMovement::Backward, 2.0);
        assert!(approx(camera.position, Vec3::ZERO));
    }

    #[test]
    fn pitch_is_clamped() {
        let mut camera = Camera::new(Vec3::ZERO, Vec3::Y);
        camera.look(0.0, 10_000.0);
        assert_eq!(camera.pitch(), 89.0);
        camera.look(0.0, -100_000.0);
        assert_eq!(camera.pitch(), -89.0);
    }

    #[test]
    fn look_right_turns_toward_positive_x() {
        let mut camera = Camera::new(Vec3::ZERO, Vec3::Y);
        camera.look(900.0, 0.0);
        assert!((camera.yaw() - 0.0).abs() < 1e-4);
        assert!(approx(camera.front(), Vec3::X));
    }

    #[test]
    fn zoom_is_clamped() {
        let mut camera = Camera::new(Vec3::ZERO, Vec3::Y);
        camera.scroll(-10.0);
        assert_eq!(camera.zoom(), 45.0);
        camera.scroll(50.0);
        assert_eq!(camera.zoom(), 1.0);
        camera.scroll(-4.0);
        assert_eq!(camera.zoom(), 5.0);
    }

    #[test]
    fn view_matrix_moves_world_opposite_to_camera() {
        let camera = Camera::new(Vec3::new(0.0, 0.0, 3.0), Vec3::Y);
        let p = camera.view_matrix().transform_point3(Vec3::ZERO);
        assert!(approx(p, Vec3::new(0.0, 0.0, -3.0)));
    }
}
