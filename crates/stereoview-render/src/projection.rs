//! Projection and pose matrices for GL clip space (z in [-1, 1]).

use glam::{Mat4, Quat, Vec3, Vec4};
use stereoview_vr::{Fov, Pose};

/// Symmetric perspective; `fov_y_degrees` is the full vertical angle.
pub fn perspective(fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    Mat4::perspective_rh_gl(fov_y_degrees.to_radians(), aspect, near, far)
}

/// Asymmetric frustum from the four half-angles a VR runtime reports per eye.
pub fn frustum(fov: &Fov, near: f32, far: f32) -> Mat4 {
    let tan_left = fov.angle_left.tan();
    let tan_right = fov.angle_right.tan();
    let tan_up = fov.angle_up.tan();
    let tan_down = fov.angle_down.tan();

    let width = tan_right - tan_left;
    let height = tan_up - tan_down;

    Mat4::from_cols(
        Vec4::new(2.0 / width, 0.0, 0.0, 0.0),
        Vec4::new(0.0, 2.0 / height, 0.0, 0.0),
        Vec4::new(
            (tan_right + tan_left) / width,
            (tan_up + tan_down) / height,
            -(far + near) / (far - near),
            -1.0,
        ),
        Vec4::new(0.0, 0.0, -2.0 * far * near / (far - near), 0.0),
    )
}

/// Rigid transform of a runtime pose (eye space to tracking space).
pub fn pose_matrix(pose: &Pose) -> Mat4 {
    let [x, y, z, w] = pose.orientation;
    let rotation = Quat::from_xyzw(x, y, z, w).normalize();
    Mat4::from_rotation_translation(rotation, Vec3::from_array(pose.position))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symmetric_frustum_matches_perspective() {
        let fov_y = 90.0f32;
        let half = (fov_y / 2.0).to_radians();
        let fov = Fov {
            angle_left: -half,
            angle_right: half,
            angle_up: half,
            angle_down: -half,
        };
        let a = frustum(&fov, 0.1, 100.0);
        let b = perspective(fov_y, 1.0, 0.1, 100.0);
        assert!(a.abs_diff_eq(b, 1e-5), "{a:?} != {b:?}");
    }

    #[test]
    fn asymmetric_frustum_shifts_center() {
        let fov = Fov {
            angle_left: -0.9,
            angle_right: 0.7,
            angle_up: 0.8,
            angle_down: -0.8,
        };
        let m = frustum(&fov, 0.1, 100.0);
        // A point straight ahead lands right of center when the frustum extends further left.
        let clip = m * Vec4::new(0.0, 0.0, -1.0, 1.0);
        assert!(clip.x / clip.w > 0.0);
        assert!((clip.y / clip.w).abs() < 1e-6);
    }

    #[test]
    fn near_and_far_map_to_clip_bounds() {
        let fov = Fov::symmetric(1.6, 1.6);
        let m = frustum(&fov, 0.1, 100.0);
        let near = m * Vec4::new(0.0, 0.0, -0.1, 1.0);
        let far = m * Vec4::new(0.0, 0.0, -100.0, 1.0);
        assert!((near.z / near.w + 1.0).abs() < 1e-4);
        assert!((far.z / far.w - 1.0).abs() < 1e-4);
    }

    #[test]
    fn identity_pose_is_identity() {
        assert!(pose_matrix(&Pose::default()).abs_diff_eq(Mat4::IDENTITY, 1e-6));
    }

    #[test]
    fn pose_translation_is_applied() {
        let pose = Pose {
            position: [0.032, 1.6, 0.0],
            orientation: [0.0, 0.0, 0.0, 1.0],
        };
        let p = pose_matrix(&pose).transform_point3(Vec3::ZERO);
        assert!(p.abs_diff_eq(Vec3::new(0.032, 1.6, 0.0), 1e-6));
    }
}
