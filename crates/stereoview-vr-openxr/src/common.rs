use openxr as xr;
use stereoview_vr::types::{ControllerInput, EyePair, EyeView, Fov, Hand, Pose};
use stereoview_vr::{VrError, VrResult};
use tracing::warn;

pub const STICK_DEADZONE: f32 = 0.05;
pub const REFRESH_EPS_HZ: f32 = 0.1;

#[derive(Clone, Copy, Default, Debug, PartialEq)]
pub struct ControllerSnapshot {
    pub stick: [f32; 2],
    pub primary: bool,
    pub secondary: bool,
}

pub struct InputActions {
    pub action_set: xr::ActionSet,
    pub stick: xr::Action<xr::Vector2f>,
    pub primary: xr::Action<bool>,
    pub secondary: xr::Action<bool>,
    pub left: xr::Path,
    pub right: xr::Path,
    pub last: [ControllerSnapshot; 2],
}

impl InputActions {
    pub fn new<G>(instance: &xr::Instance, session: &xr::Session<G>) -> VrResult<Self> {
        let action_set = instance
            .create_action_set("stereoview", "Stereoview", 0)
            .map_err(|e| VrError::Runtime(format!("OpenXR action set: {e:?}")))?;

        let left = instance
            .string_to_path("/user/hand/left")
            .map_err(|e| VrError::Runtime(format!("OpenXR path left: {e:?}")))?;
        let right = instance
            .string_to_path("/user/hand/right")
            .map_err(|e| VrError::Runtime(format!("OpenXR path right: {e:?}")))?;
        let subaction_paths = [left, right];

        let stick = action_set
            .create_action("thumbstick", "Thumbstick", &subaction_paths)
            .map_err(|e| VrError::Runtime(format!("OpenXR action thumbstick: {e:?}")))?;
        let primary = action_set
            .create_action("primary", "Reset view", &subaction_paths)
            .map_err(|e| VrError::Runtime(format!("OpenXR action primary: {e:?}")))?;
        let secondary = action_set
            .create_action("secondary", "Swap eyes", &subaction_paths)
            .map_err(|e| VrError::Runtime(format!("OpenXR action secondary: {e:?}")))?;

        let profile_paths = [
            "/interaction_profiles/khr/simple_controller",
            "/interaction_profiles/oculus/touch_controller",
            "/interaction_profiles/valve/index_controller",
            "/interaction_profiles/microsoft/motion_controller",
            "/interaction_profiles/htc/vive_controller",
        ];

        for profile in profile_paths {
            let profile_path = instance
                .string_to_path(profile)
                .map_err(|e| VrError::Runtime(format!("OpenXR profile path: {e:?}")))?;
            let bindings = Self::bindings_for_profile(instance, profile, &stick, &primary, &secondary);
            if let Err(err) = instance.suggest_interaction_profile_bindings(profile_path, &bindings)
            {
                warn!(profile, ?err, "OpenXR binding suggestion rejected");
            }
        }

        session
            .attach_action_sets(&[&action_set])
            .map_err(|e| VrError::Runtime(format!("OpenXR attach actions: {e:?}")))?;

        Ok(Self {
            action_set,
            stick,
            primary,
            secondary,
            left,
            right,
            last: [ControllerSnapshot::default(); 2],
        })
    }

    fn bindings_for_profile<'a>(
        instance: &'a xr::Instance,
        profile: &'a str,
        stick: &'a xr::Action<xr::Vector2f>,
        primary: &'a xr::Action<bool>,
        secondary: &'a xr::Action<bool>,
    ) -> Vec<xr::Binding<'a>> {
        let mut bindings = Vec::with_capacity(8);
        macro_rules! bind {
            ($action:expr, $path:expr) => {
                if let Ok(path) = instance.string_to_path($path) {
                    bindings.push(xr::Binding::new($action, path));
                }
            };
        }

        match profile {
            "/interaction_profiles/khr/simple_controller" => {
                bind!(primary, "/user/hand/left/input/select/click");
                bind!(primary, "/user/hand/right/input/select/click");
                bind!(secondary, "/user/hand/left/input/menu/click");
                bind!(secondary, "/user/hand/right/input/menu/click");
            }
            "/interaction_profiles/oculus/touch_controller" => {
                bind!(stick, "/user/hand/left/input/thumbstick");
                bind!(stick, "/user/hand/right/input/thumbstick");
                bind!(primary, "/user/hand/left/input/x/click");
                bind!(primary, "/user/hand/right/input/a/click");
                bind!(secondary, "/user/hand/left/input/y/click");
                bind!(secondary, "/user/hand/right/input/b/click");
            }
            "/interaction_profiles/valve/index_controller" => {
                bind!(stick, "/user/hand/left/input/thumbstick");
                bind!(stick, "/user/hand/right/input/thumbstick");
                bind!(primary, "/user/hand/left/input/a/click");
                bind!(primary, "/user/hand/right/input/a/click");
                bind!(secondary, "/user/hand/left/input/b/click");
                bind!(secondary, "/user/hand/right/input/b/click");
            }
            "/interaction_profiles/microsoft/motion_controller" => {
                bind!(stick, "/user/hand/left/input/thumbstick");
                bind!(stick, "/user/hand/right/input/thumbstick");
                bind!(primary, "/user/hand/left/input/trackpad/click");
                bind!(primary, "/user/hand/right/input/trackpad/click");
                bind!(secondary, "/user/hand/left/input/menu/click");
                bind!(secondary, "/user/hand/right/input/menu/click");
            }
            "/interaction_profiles/htc/vive_controller" => {
                bind!(stick, "/user/hand/left/input/trackpad");
                bind!(stick, "/user/hand/right/input/trackpad");
                bind!(primary, "/user/hand/left/input/trackpad/click");
                bind!(primary, "/user/hand/right/input/trackpad/click");
                bind!(secondary, "/user/hand/left/input/menu/click");
                bind!(secondary, "/user/hand/right/input/menu/click");
            }
            _ => {}
        }

        bindings
    }

    pub fn poll<G>(&mut self, session: &xr::Session<G>) -> VrResult<Vec<ControllerInput>> {
        session
            .sync_actions(&[xr::ActiveActionSet::new(&self.action_set)])
            .map_err(|e| VrError::Runtime(format!("OpenXR sync actions: {e:?}")))?;

        let mut outputs = Vec::new();
        let hands = [(self.left, Hand::Left, 0usize), (self.right, Hand::Right, 1usize)];

        for (path, hand, index) in hands {
            let stick = self
                .stick
                .state(session, path)
                .ok()
                .filter(|s| s.is_active)
                .map(|s| apply_deadzone([s.current_state.x, s.current_state.y]))
                .unwrap_or([0.0; 2]);
            let primary = self
                .primary
                .state(session, path)
                .map(|s| s.is_active && s.current_state)
                .unwrap_or(false);
            let secondary = self
                .secondary
                .state(session, path)
                .map(|s| s.is_active && s.current_state)
                .unwrap_or(false);

            let snapshot = ControllerSnapshot {
                stick,
                primary,
                secondary,
            };
            if let Some(input) = controller_input(hand, snapshot, self.last[index]) {
                outputs.push(input);
            }
            self.last[index] = snapshot;
        }

        Ok(outputs)
    }
}

pub fn apply_deadzone(stick: [f32; 2]) -> [f32; 2] {
    stick.map(|v| if v.abs() < STICK_DEADZONE { 0.0 } else { v })
}

/// Input worth reporting: a deflected stick, or a button that just went down.
pub fn controller_input(
    hand: Hand,
    current: ControllerSnapshot,
    last: ControllerSnapshot,
) -> Option<ControllerInput> {
    let input = ControllerInput {
        hand,
        stick: current.stick,
        primary_pressed: current.primary && !last.primary,
        secondary_pressed: current.secondary && !last.secondary,
    };
    let active = input.stick != [0.0; 2] || input.primary_pressed || input.secondary_pressed;
    active.then_some(input)
}

pub fn refresh_changed(last: Option<f32>, refresh_hz: f32) -> bool {
    last.is_none_or(|prev| (prev - refresh_hz).abs() > REFRESH_EPS_HZ)
}

pub fn to_pose(pose: xr::Posef) -> Pose {
    Pose {
        position: [pose.position.x, pose.position.y, pose.position.z],
        orientation: [
            pose.orientation.x,
            pose.orientation.y,
            pose.orientation.z,
            pose.orientation.w,
        ],
    }
}

pub fn to_fov(fov: xr::Fovf) -> Fov {
    Fov {
        angle_left: fov.angle_left,
        angle_right: fov.angle_right,
        angle_up: fov.angle_up,
        angle_down: fov.angle_down,
    }
}

pub fn eye_views(views: &[xr::View]) -> Option<EyePair<EyeView>> {
    let [left, right] = views else {
        return None;
    };
    let convert = |view: &xr::View| EyeView {
        pose: to_pose(view.pose),
        fov: to_fov(view.fov),
    };
    Some(EyePair::new(convert(left), convert(right)))
}

fn describe_gl_swapchain_format(format: u32) -> (&'static str, bool) {
    match format {
        glow::RGBA8 => ("GL_RGBA8", false),
        glow::SRGB8_ALPHA8 => ("GL_SRGB8_ALPHA8", true),
        _ => ("UNKNOWN_GL_FORMAT", false),
    }
}

/// Returns the format, its name and whether the runtime applies sRGB conversion.
pub fn choose_gl_swapchain_format(formats: &[u32]) -> (u32, &'static str, bool) {
    let preferred = [glow::RGBA8, glow::SRGB8_ALPHA8];
    if let Some(format) = preferred.iter().copied().find(|fmt| formats.contains(fmt)) {
        let (name, srgb) = describe_gl_swapchain_format(format);
        return (format, name, srgb);
    }
    let fallback = formats.first().copied().unwrap_or(glow::RGBA8);
    let (name, srgb) = describe_gl_swapchain_format(fallback);
    (fallback, name, srgb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadzone_zeroes_small_deflection() {
        assert_eq!(apply_deadzone([0.04, -0.049]), [0.0, 0.0]);
        assert_eq!(apply_deadzone([0.5, -0.06]), [0.5, -0.06]);
    }

    #[test]
    fn buttons_are_edge_triggered() {
        let down = ControllerSnapshot {
            primary: true,
            ..Default::default()
        };
        let first = controller_input(Hand::Left, down, ControllerSnapshot::default()).unwrap();
        assert!(first.primary_pressed);
        assert!(!first.secondary_pressed);
        assert!(controller_input(Hand::Left, down, down).is_none());
    }

    #[test]
    fn stick_is_reported_while_deflected() {
        let held = ControllerSnapshot {
            stick: [0.0, 0.7],
            ..Default::default()
        };
        let input = controller_input(Hand::Right, held, held).unwrap();
        assert_eq!(input.hand, Hand::Right);
        assert_eq!(input.stick, [0.0, 0.7]);
        assert!(controller_input(Hand::Right, ControllerSnapshot::default(), held).is_none());
    }

    #[test]
    fn refresh_only_reported_on_change() {
        assert!(refresh_changed(None, 90.0));
        assert!(!refresh_changed(Some(90.0), 90.05));
        assert!(refresh_changed(Some(90.0), 120.0));
    }

    #[test]
    fn swapchain_format_prefers_rgba8() {
        let (format, name, srgb) =
            choose_gl_swapchain_format(&[glow::SRGB8_ALPHA8, glow::RGBA8]);
        assert_eq!(format, glow::RGBA8);
        assert_eq!(name, "GL_RGBA8");
        assert!(!srgb);

        let (format, _, srgb) = choose_gl_swapchain_format(&[glow::SRGB8_ALPHA8]);
        assert_eq!(format, glow::SRGB8_ALPHA8);
        assert!(srgb);

        let (format, name, _) = choose_gl_swapchain_format(&[0x1234]);
        assert_eq!(format, 0x1234);
        assert_eq!(name, "UNKNOWN_GL_FORMAT");

        assert_eq!(choose_gl_swapchain_format(&[]).0, glow::RGBA8);
    }

    #[test]
    fn pose_and_fov_conversion() {
        let pose = xr::Posef {
            orientation: xr::Quaternionf {
                x: 0.0,
                y: 0.0,
                z: 0.0,
                w: 1.0,
            },
            position: xr::Vector3f {
                x: 0.03,
                y: 1.6,
                z: -0.1,
            },
        };
        assert_eq!(to_pose(pose).position, [0.03, 1.6, -0.1]);
        assert_eq!(to_pose(pose).orientation, [0.0, 0.0, 0.0, 1.0]);

        let fov = to_fov(xr::Fovf {
            angle_left: -0.8,
            angle_right: 0.7,
            angle_up: 0.75,
            angle_down: -0.9,
        });
        assert_eq!(fov.angle_left, -0.8);
        assert_eq!(fov.angle_down, -0.9);
    }
}
