//! Stereo image loading, camera/scene math and GL eye composition.
//!
//! The math modules (`camera`, `projection`, `scene`, `image`) are pure and usable
//! without a GL context. The GL modules expect the caller to have a current context
//! on the calling thread for every call that takes a `&glow::Context`.

pub mod camera;
pub mod error;
pub mod image;
pub mod projection;
pub mod quad;
pub mod renderer;
pub mod scene;
pub mod shader;
pub mod target;
pub mod texture;

pub use camera::{Camera, CameraMovement};
pub use error::{RenderError, RenderResult};
pub use crate::image::{stereo_layout, EyeImage, ImageSlot, StereoImage, StereoLayout, StereoSource};
pub use renderer::StereoRenderer;
pub use scene::{
    EyeMatrices, EyeProjection, SceneInput, SceneSettings, StereoScene, ViewMode,
};
pub use target::EyeTarget;
