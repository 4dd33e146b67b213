//! Maps desktop keys/pointer and VR controllers onto [`SceneInput`].

use eframe::egui::{self, Key};
use glam::Vec2;
use stereoview_render::SceneInput;
use stereoview_vr::ControllerInput;

/// egui reports wheel scroll in points; one notch is roughly this many.
const SCROLL_POINTS_PER_NOTCH: f32 = 50.0;

/// `-1`, `0` or `1`; opposing keys cancel.
pub fn axis(negative: bool, positive: bool) -> f32 {
    match (negative, positive) {
        (true, false) => -1.0,
        (false, true) => 1.0,
        _ => 0.0,
    }
}

/// Keyboard state to scene input. `down` is held keys, `pressed` is keys pressed this frame.
pub fn keyboard_input(down: impl Fn(Key) -> bool, pressed: impl Fn(Key) -> bool) -> SceneInput {
    SceneInput {
        forward: down(Key::W),
        backward: down(Key::S),
        left: down(Key::A),
        right: down(Key::D),
        disparity: axis(down(Key::C), down(Key::V)),
        depth: axis(down(Key::X), down(Key::Z)),
        reset: pressed(Key::R),
        swap_eyes: pressed(Key::E),
        ..Default::default()
    }
}

/// Pointer drag (screen space, y down) and wheel delta to look/zoom input.
pub fn pointer_input(drag: Option<egui::Vec2>, scroll: egui::Vec2) -> SceneInput {
    SceneInput {
        look: drag.map_or(Vec2::ZERO, |d| Vec2::new(d.x, -d.y)),
        scroll: scroll.y / SCROLL_POINTS_PER_NOTCH,
        ..Default::default()
    }
}

/// Collects this frame's desktop input from egui.
pub fn desktop_input(input: &egui::InputState) -> SceneInput {
    let mut scene = keyboard_input(|key| input.key_down(key), |key| input.key_pressed(key));
    let drag = input
        .pointer
        .primary_down()
        .then(|| input.pointer.delta());
    scene.merge(&pointer_input(drag, input.raw_scroll_delta));
    scene
}

/// Stick x drives disparity, stick y distance; primary resets, secondary swaps eyes.
pub fn controller_input(input: &ControllerInput) -> SceneInput {
    let [x, y] = input.stick;
    SceneInput {
        disparity: x.clamp(-1.0, 1.0),
        depth: y.clamp(-1.0, 1.0),
        reset: input.primary_pressed,
        swap_eyes: input.secondary_pressed,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stereoview_vr::Hand;

    #[test]
    fn keys_map_to_scene_input() {
        let held = [Key::W, Key::D, Key::V, Key::Z];
        let input = keyboard_input(|k| held.contains(&k), |k| k == Key::E);
        assert!(input.forward && input.right);
        assert!(!input.backward && !input.left);
        assert_eq!(input.disparity, 1.0);
        assert_eq!(input.depth, 1.0);
        assert!(input.swap_eyes);
        assert!(!input.reset);
    }

    #[test]
    fn opposing_keys_cancel() {
        let held = [Key::C, Key::V, Key::X];
        let input = keyboard_input(|k| held.contains(&k), |_| false);
        assert_eq!(input.disparity, 0.0);
        assert_eq!(input.depth, -1.0);
        assert!(keyboard_input(|_| false, |_| false).is_idle());
    }

    #[test]
    fn drag_up_looks_up() {
        let input = pointer_input(Some(egui::vec2(4.0, -10.0)), egui::Vec2::ZERO);
        assert_eq!(input.look, Vec2::new(4.0, 10.0));
        assert!(pointer_input(None, egui::Vec2::ZERO).is_idle());

        let input = pointer_input(None, egui::vec2(0.0, 100.0));
        assert_eq!(input.scroll, 2.0);
    }

    #[test]
    fn controller_mapping() {
        let input = controller_input(&ControllerInput {
            hand: Hand::Left,
            stick: [-0.5, 2.0],
            primary_pressed: false,
            secondary_pressed: true,
        });
        assert_eq!(input.disparity, -0.5);
        assert_eq!(input.depth, 1.0);
        assert!(input.swap_eyes);
        assert!(!input.reset);
    }
}
