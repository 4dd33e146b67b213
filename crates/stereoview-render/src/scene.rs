//! Shared scene state: two eye cameras looking at one textured quad.

use glam::{Mat4, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use stereoview_vr::{Eye, EyePair, Fov, Pose};

use crate::camera::{Camera, CameraMovement};
use crate::projection;
use crate::quad::QUAD_PLANE_Z;

/// Closest the quad may come to the origin.
const MIN_QUAD_DISTANCE: f32 = 0.5;
/// Both cameras start on this z plane.
const CAMERA_START_Z: f32 = 3.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    /// The image follows the head; the runtime only contributes projections.
    #[default]
    HeadLocked,
    /// Runtime eye poses are applied on top of the camera, so the image stays put.
    Tracked,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneSettings {
    /// Initial x offset of the right camera, in meters.
    pub eye_separation: f32,
    /// Initial distance of the quad in front of the origin.
    pub quad_distance: f32,
    pub near: f32,
    pub far: f32,
    pub clear_color: [f32; 4],
    /// Right camera drift per second at full disparity input.
    pub disparity_speed: f32,
    /// Quad drift per second at full depth input.
    pub depth_speed: f32,
    pub camera_speed: f32,
    pub mouse_sensitivity: f32,
    pub view_mode: ViewMode,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            eye_separation: 0.065,
            quad_distance: 8.0,
            near: 0.1,
            far: 100.0,
            clear_color: [0.2, 0.3, 0.3, 1.0],
            disparity_speed: 0.5,
            depth_speed: 3.0,
            camera_speed: crate::camera::DEFAULT_SPEED,
            mouse_sensitivity: crate::camera::DEFAULT_SENSITIVITY,
            view_mode: ViewMode::HeadLocked,
        }
    }
}

impl SceneSettings {
    /// Allowed quad distances. At the far end the quad plane sits exactly `far - near`
    /// in front of the cameras' starting position.
    pub fn quad_distance_limits(&self) -> (f32, f32) {
        let far = self.far - self.near - (CAMERA_START_Z - QUAD_PLANE_Z);
        (MIN_QUAD_DISTANCE, far)
    }
}

/// One frame's worth of user intent, from the keyboard or a controller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneInput {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    /// -1..=1, positive moves the right camera toward +x.
    pub disparity: f32,
    /// -1..=1, positive brings the quad closer.
    pub depth: f32,
    /// Pointer delta; positive y looks up.
    pub look: Vec2,
    pub scroll: f32,
    pub reset: bool,
    pub swap_eyes: bool,
}

impl SceneInput {
    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }

    fn movements(&self) -> impl Iterator<Item = CameraMovement> {
        [
            (self.forward, CameraMovement::Forward),
            (self.backward, CameraMovement::Backward),
            (self.left, CameraMovement::Left),
            (self.right, CameraMovement::Right),
        ]
        .into_iter()
        .filter_map(|(active, movement)| active.then_some(movement))
    }

    /// Folds another input into this one; axes are summed and clamped.
    pub fn merge(&mut self, other: &SceneInput) {
        self.forward |= other.forward;
        self.backward |= other.backward;
        self.left |= other.left;
        self.right |= other.right;
        self.disparity = (self.disparity + other.disparity).clamp(-1.0, 1.0);
        self.depth = (self.depth + other.depth).clamp(-1.0, 1.0);
        self.look += other.look;
        self.scroll += other.scroll;
        self.reset |= other.reset;
        self.swap_eyes |= other.swap_eyes;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EyeProjection {
    /// Desktop-only rendering: symmetric perspective using the eye camera's zoom.
    Perspective { aspect: f32 },
    /// Runtime-supplied frustum.
    Frustum(Fov),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeMatrices {
    pub model: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
}

#[derive(Debug, Clone)]
pub struct StereoScene {
    settings: SceneSettings,
    cameras: EyePair<Camera>,
    quad_position: Vec3,
    image_aspect: f32,
}

impl StereoScene {
    pub fn new(settings: SceneSettings) -> Self {
        let cameras = Self::initial_cameras(&settings);
        let quad_position = Vec3::new(0.0, 0.0, -settings.quad_distance);
        Self {
            settings,
            cameras,
            quad_position,
            image_aspect: 1.0,
        }
    }

    fn initial_cameras(settings: &SceneSettings) -> EyePair<Camera> {
        let camera = |x: f32| {
            let mut camera = Camera::new(Vec3::new(x, 0.0, CAMERA_START_Z), Vec3::Y);
            camera.movement_speed = settings.camera_speed;
            camera.mouse_sensitivity = settings.mouse_sensitivity;
            camera
        };
        EyePair::new(camera(0.0), camera(settings.eye_separation))
    }

    pub fn settings(&self) -> &SceneSettings {
        &self.settings
    }

    pub fn camera(&self, eye: Eye) -> &Camera {
        &self.cameras[eye]
    }

    pub fn quad_position(&self) -> Vec3 {
        self.quad_position
    }

    /// Distance of the quad in front of the origin along -z.
    pub fn quad_distance(&self) -> f32 {
        -self.quad_position.z
    }

    pub fn image_aspect(&self) -> f32 {
        self.image_aspect
    }

    pub fn set_image_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.image_aspect = aspect;
        }
    }

    /// Horizontal offset of the right camera relative to the left one.
    pub fn disparity(&self) -> f32 {
        self.cameras.right.position.x - self.cameras.left.position.x
    }

    pub fn reset(&mut self) {
        self.cameras = Self::initial_cameras(&self.settings);
        self.quad_position = Vec3::new(0.0, 0.0, -self.settings.quad_distance);
    }

    pub fn apply(&mut self, input: &SceneInput, dt: f32) {
        if input.reset {
            self.reset();
        }

        for eye in Eye::BOTH {
            let camera = &mut self.cameras[eye];
            for movement in input.movements() {
                camera.move_in(movement, dt);
            }
            if input.look != Vec2::ZERO {
                camera.look(input.look.x, input.look.y);
            }
            if input.scroll != 0.0 {
                camera.scroll(input.scroll);
            }
        }

        if input.disparity != 0.0 {
            self.cameras.right.position.x += input.disparity * self.settings.disparity_speed * dt;
        }

        if input.depth != 0.0 {
            let (nearest, farthest) = self.settings.quad_distance_limits();
            let (min_z, max_z) = (-farthest, -nearest);
            self.quad_position.z =
                (self.quad_position.z + input.depth * self.settings.depth_speed * dt)
                    .clamp(min_z, max_z);
        }
    }

    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.quad_position)
            * Mat4::from_scale(Vec3::new(1.0, self.image_aspect, 1.0))
    }

    pub fn eye_matrices(
        &self,
        eye: Eye,
        projection: EyeProjection,
        eye_pose: Option<&Pose>,
    ) -> EyeMatrices {
        let camera = &self.cameras[eye];
        let (near, far) = (self.settings.near, self.settings.far);
        let projection = match projection {
            EyeProjection::Perspective { aspect } => {
                projection::perspective(camera.zoom(), aspect, near, far)
            }
            EyeProjection::Frustum(fov) => projection::frustum(&fov, near, far),
        };

        let camera_view = camera.view_matrix();
        let view = match (self.settings.view_mode, eye_pose) {
            (ViewMode::Tracked, Some(pose)) => {
                projection::pose_matrix(pose).inverse() * camera_view
            }
            _ => camera_view,
        };

        EyeMatrices {
            model: self.model_matrix(),
            view,
            projection,
        }
    }
}

impl Default for StereoScene {
    fn default() -> Self {
        Self::new(SceneSettings::default())
    }
}
