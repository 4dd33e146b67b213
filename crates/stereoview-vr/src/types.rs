use std::ops::{Index, IndexMut};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Eye {
    Left,
    Right,
}

impl Eye {
    pub const BOTH: [Eye; 2] = [Eye::Left, Eye::Right];

    pub fn index(self) -> usize {
        match self {
            Eye::Left => 0,
            Eye::Right => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Eye::Left => "left",
            Eye::Right => "right",
        }
    }
}

/// One value per eye, indexable by [`Eye`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EyePair<T> {
    pub left: T,
    pub right: T,
}

impl<T> EyePair<T> {
    pub fn new(left: T, right: T) -> Self {
        Self { left, right }
    }

    pub fn from_fn(mut f: impl FnMut(Eye) -> T) -> Self {
        Self {
            left: f(Eye::Left),
            right: f(Eye::Right),
        }
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> EyePair<U> {
        EyePair {
            left: f(self.left),
            right: f(self.right),
        }
    }

    pub fn swapped(self) -> Self {
        Self {
            left: self.right,
            right: self.left,
        }
    }
}

impl<T> Index<Eye> for EyePair<T> {
    type Output = T;

    fn index(&self, eye: Eye) -> &T {
        match eye {
            Eye::Left => &self.left,
            Eye::Right => &self.right,
        }
    }
}

impl<T> IndexMut<Eye> for EyePair<T> {
    fn index_mut(&mut self, eye: Eye) -> &mut T {
        match eye {
            Eye::Left => &mut self.left,
            Eye::Right => &mut self.right,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: [f32; 3],
    pub orientation: [f32; 4], // x, y, z, w
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            orientation: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// Half-angles of an eye frustum in radians. Left and down are negative for a
/// symmetric or typical HMD frustum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fov {
    pub angle_left: f32,
    pub angle_right: f32,
    pub angle_up: f32,
    pub angle_down: f32,
}

impl Fov {
    pub fn symmetric(horizontal: f32, vertical: f32) -> Self {
        Self {
            angle_left: -horizontal / 2.0,
            angle_right: horizontal / 2.0,
            angle_up: vertical / 2.0,
            angle_down: -vertical / 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeView {
    pub pose: Pose,
    pub fov: Fov,
}

#[derive(Debug, Clone, Copy)]
pub struct VrTiming {
    pub refresh_hz: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hand {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerInput {
    pub hand: Hand,
    /// Thumbstick or trackpad, dead zone already applied.
    pub stick: [f32; 2],
    /// Edge-triggered: true only on the poll where the button went down.
    pub primary_pressed: bool,
    pub secondary_pressed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeInfo {
    pub runtime_name: String,
    pub system_name: String,
    pub recommended_eye_width: u32,
    pub recommended_eye_height: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eye_pair_indexing() {
        let mut pair = EyePair::new(1, 2);
        assert_eq!(pair[Eye::Left], 1);
        assert_eq!(pair[Eye::Right], 2);
        pair[Eye::Right] = 5;
        assert_eq!(pair.right, 5);
        assert_eq!(pair.swapped(), EyePair::new(5, 1));
    }

    #[test]
    fn eye_pair_from_fn_follows_eye_order() {
        let pair = EyePair::from_fn(Eye::index);
        assert_eq!(pair, EyePair::new(0, 1));
        assert_eq!(pair.map(|i| i * 10), EyePair::new(0, 10));
    }

    #[test]
    fn symmetric_fov_is_centered() {
        let fov = Fov::symmetric(1.0, 0.5);
        assert_eq!(fov.angle_left, -0.5);
        assert_eq!(fov.angle_right, 0.5);
        assert_eq!(fov.angle_up, 0.25);
        assert_eq!(fov.angle_down, -0.25);
    }
}
