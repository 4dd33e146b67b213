//! Scene and image state shared by the desktop preview and the VR runtime thread.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use stereoview_render::{
    ImageSlot, RenderResult, SceneInput, StereoImage, StereoScene, StereoSource,
};
use stereoview_vr::{ControllerInput, EyePair, EyeView, VrRuntimeCallbacks, VrTiming};
use tracing::{debug, info, warn};

use crate::input::controller_input;

/// Frame time assumed for controller input until the runtime reports its refresh rate.
const DEFAULT_REFRESH_HZ: f32 = 90.0;

pub struct ViewerState {
    pub scene: Arc<Mutex<StereoScene>>,
    pub images: Arc<ImageSlot>,
    /// `f32` bits; zero until the runtime reports a rate.
    refresh_hz: AtomicU32,
    /// Midpoint of the last located eye positions.
    head_position: Mutex<Option<[f32; 3]>>,
}

impl ViewerState {
    pub fn new(scene: StereoScene) -> Self {
        Self {
            scene: Arc::new(Mutex::new(scene)),
            images: Arc::new(ImageSlot::new()),
            refresh_hz: AtomicU32::new(0),
            head_position: Mutex::new(None),
        }
    }

    pub fn scene(&self) -> MutexGuard<'_, StereoScene> {
        match self.scene.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Decodes `source` and makes it the displayed image.
    pub fn load(&self, source: &StereoSource, swap_eyes: bool) -> RenderResult<()> {
        let image = StereoImage::load(source)?;
        self.show(if swap_eyes { image.swapped() } else { image });
        Ok(())
    }

    pub fn show(&self, image: StereoImage) {
        info!(label = %image.label, aspect = image.aspect(), "showing image");
        self.scene().set_image_aspect(image.aspect());
        self.images.publish(image);
    }

    /// Applies one frame of input; eye swaps go to the image slot, the rest to the scene.
    pub fn apply(&self, input: &SceneInput, dt: f32) {
        if input.is_idle() {
            return;
        }
        if input.swap_eyes {
            match self.images.swap_eyes().then(|| self.images.current()).flatten() {
                Some(image) => self.scene().set_image_aspect(image.aspect()),
                None => debug!("swap requested without an image"),
            }
        }
        self.scene().apply(input, dt);
    }

    pub fn head_position(&self) -> Option<[f32; 3]> {
        match self.head_position.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn set_head_position(&self, position: [f32; 3]) {
        match self.head_position.lock() {
            Ok(mut guard) => *guard = Some(position),
            Err(poisoned) => *poisoned.into_inner() = Some(position),
        }
    }

    pub fn refresh_hz(&self) -> Option<f32> {
        let hz = f32::from_bits(self.refresh_hz.load(Ordering::Relaxed));
        (hz > 0.0).then_some(hz)
    }

    fn set_refresh_hz(&self, hz: f32) {
        self.refresh_hz.store(hz.to_bits(), Ordering::Relaxed);
    }

    fn frame_time(&self) -> f32 {
        1.0 / self.refresh_hz().unwrap_or(DEFAULT_REFRESH_HZ)
    }
}

/// Runtime callbacks feeding controller input into the shared scene.
pub struct ViewerCallbacks {
    state: Arc<ViewerState>,
}

impl ViewerCallbacks {
    pub fn new(state: Arc<ViewerState>) -> Self {
        Self { state }
    }
}

impl VrRuntimeCallbacks for ViewerCallbacks {
    fn on_views(&self, views: EyePair<EyeView>, _timestamp_us: u64) {
        let EyePair { left, right } = views.map(|view| view.pose.position);
        self.state.set_head_position([
            (left[0] + right[0]) / 2.0,
            (left[1] + right[1]) / 2.0,
            (left[2] + right[2]) / 2.0,
        ]);
    }

    fn on_vr_timing(&self, timing: VrTiming) {
        if !(timing.refresh_hz.is_finite() && timing.refresh_hz > 0.0) {
            warn!(refresh_hz = timing.refresh_hz, "ignoring invalid refresh rate");
            return;
        }
        info!(refresh_hz = timing.refresh_hz, "headset refresh rate");
        self.state.set_refresh_hz(timing.refresh_hz);
    }

    fn on_controller_input(&self, input: ControllerInput) {
        self.state
            .apply(&controller_input(&input), self.state.frame_time());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stereoview_render::SceneSettings;
    use stereoview_vr::{Fov, Hand, Pose};

    fn state_with_image() -> ViewerState {
        let state = ViewerState::new(StereoScene::default());
        let left = stereoview_render::EyeImage {
            width: 4,
            height: 2,
            pixels: vec![1u8; 32].into(),
        };
        let right = stereoview_render::EyeImage {
            width: 4,
            height: 2,
            pixels: vec![2u8; 32].into(),
        };
        state.show(StereoImage {
            eyes: EyePair::new(left, right),
            label: "test".to_string(),
        });
        state
    }

    #[test]
    fn show_updates_aspect_and_generation() {
        let state = state_with_image();
        assert_eq!(state.scene().image_aspect(), 0.5);
        assert_eq!(state.images.generation(), 1);
    }

    #[test]
    fn swap_input_swaps_the_slot() {
        let state = state_with_image();
        state.apply(
            &SceneInput {
                swap_eyes: true,
                ..Default::default()
            },
            0.016,
        );
        let image = state.images.current().unwrap();
        assert_eq!(image.eyes.left.pixels[0], 2);
        assert_eq!(state.images.generation(), 2);
    }

    #[test]
    fn swap_input_follows_new_left_aspect() {
        let state = ViewerState::new(StereoScene::default());
        let wide = stereoview_render::EyeImage {
            width: 4,
            height: 2,
            pixels: vec![1u8; 32].into(),
        };
        let square = stereoview_render::EyeImage {
            width: 4,
            height: 4,
            pixels: vec![2u8; 64].into(),
        };
        state.show(StereoImage {
            eyes: EyePair::new(wide, square),
            label: "mismatched".to_string(),
        });
        assert_eq!(state.scene().image_aspect(), 0.5);

        let swap = SceneInput {
            swap_eyes: true,
            ..Default::default()
        };
        state.apply(&swap, 0.016);
        assert_eq!(state.scene().image_aspect(), 1.0);
        state.apply(&swap, 0.016);
        assert_eq!(state.scene().image_aspect(), 0.5);
    }

    #[test]
    fn swap_without_image_keeps_aspect() {
        let state = ViewerState::new(StereoScene::default());
        state.apply(
            &SceneInput {
                swap_eyes: true,
                ..Default::default()
            },
            0.016,
        );
        assert_eq!(state.scene().image_aspect(), 1.0);
        assert_eq!(state.images.generation(), 0);
    }

    #[test]
    fn located_views_update_head_position() {
        let state = Arc::new(ViewerState::new(StereoScene::default()));
        let callbacks = ViewerCallbacks::new(state.clone());
        assert_eq!(state.head_position(), None);

        let view = |x: f32| EyeView {
            pose: Pose {
                position: [x, 1.6, -0.5],
                ..Default::default()
            },
            fov: Fov::symmetric(1.6, 1.6),
        };
        callbacks.on_views(EyePair::new(view(-0.03), view(0.03)), 0);
        assert_eq!(state.head_position(), Some([0.0, 1.6, -0.5]));
    }

    #[test]
    fn controller_input_uses_runtime_frame_time() {
        let state = Arc::new(ViewerState::new(StereoScene::default()));
        let callbacks = ViewerCallbacks::new(state.clone());
        callbacks.on_vr_timing(VrTiming { refresh_hz: 0.0 });
        assert_eq!(state.refresh_hz(), None);
        callbacks.on_vr_timing(VrTiming { refresh_hz: 120.0 });
        assert_eq!(state.refresh_hz(), Some(120.0));

        let before = state.scene().disparity();
        callbacks.on_controller_input(ControllerInput {
            hand: Hand::Right,
            stick: [1.0, 0.0],
            primary_pressed: false,
            secondary_pressed: false,
        });
        let expected = SceneSettings::default().disparity_speed / 120.0;
        assert!((state.scene().disparity() - before - expected).abs() < 1e-6);

        callbacks.on_controller_input(ControllerInput {
            hand: Hand::Left,
            stick: [0.0, 0.0],
            primary_pressed: true,
            secondary_pressed: false,
        });
        assert!((state.scene().disparity() - before).abs() < 1e-6);
    }
}
