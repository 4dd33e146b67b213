//! Stereo image decoding and the slot that hands the current image to render threads.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use image::{imageops, RgbaImage};
use stereoview_vr::{Eye, EyePair};
use tracing::{debug, warn};

use crate::{RenderError, RenderResult};

/// RGBA8 pixels of one eye, rows stored bottom-up as GL expects them.
#[derive(Debug, Clone, PartialEq)]
pub struct EyeImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Bytes,
}

impl EyeImage {
    fn from_rgba(mut image: RgbaImage) -> Self {
        imageops::flip_vertical_in_place(&mut image);
        Self {
            width: image.width(),
            height: image.height(),
            pixels: Bytes::from(image.into_raw()),
        }
    }

    /// Height over width.
    pub fn aspect(&self) -> f32 {
        self.height as f32 / self.width as f32
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StereoSource {
    /// Separate files for each eye.
    Pair { left: PathBuf, right: PathBuf },
    /// One file holding both eyes, left half first.
    SideBySide(PathBuf),
    /// Side-by-side when the image is at least twice as wide as tall, mono otherwise.
    Auto(PathBuf),
}

impl StereoSource {
    pub fn label(&self) -> String {
        match self {
            StereoSource::Pair { left, right } => {
                format!("{} | {}", file_name(left), file_name(right))
            }
            StereoSource::SideBySide(path) | StereoSource::Auto(path) => file_name(path),
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub struct StereoLayout {
    pub eye_width: u32,
    pub eye_height: u32,
    pub is_sbs: bool,
}

pub fn stereo_layout(width: u32, height: u32) -> StereoLayout {
    let is_sbs = height > 0 && width >= height * 2 && width.is_multiple_of(2);
    let eye_width = if is_sbs { width / 2 } else { width };
    StereoLayout {
        eye_width,
        eye_height: height,
        is_sbs,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StereoImage {
    pub eyes: EyePair<EyeImage>,
    pub label: String,
}

impl StereoImage {
    pub fn load(source: &StereoSource) -> RenderResult<Self> {
        let label = source.label();
        let image = match source {
            StereoSource::Pair { left, right } => {
                Self::from_pair(decode(left)?, decode(right)?, label)?
            }
            StereoSource::SideBySide(path) => Self::from_side_by_side(decode(path)?, label)?,
            StereoSource::Auto(path) => Self::from_auto(decode(path)?, label)?,
        };
        debug!(
            label = %image.label,
            width = image.eyes.left.width,
            height = image.eyes.left.height,
            "stereo image loaded"
        );
        Ok(image)
    }

    /// In-memory pixels: a pair when `right` is given, auto-detected otherwise.
    pub fn from_rgba(
        left: RgbaImage,
        right: Option<RgbaImage>,
        label: impl Into<String>,
    ) -> RenderResult<Self> {
        match right {
            Some(right) => Self::from_pair(left, right, label),
            None => Self::from_auto(left, label),
        }
    }

    /// Encoded file contents, e.g. files dropped without a path.
    pub fn from_encoded(
        left: &[u8],
        right: Option<&[u8]>,
        label: impl Into<String>,
    ) -> RenderResult<Self> {
        let left = decode_memory(left)?;
        let right = right.map(decode_memory).transpose()?;
        Self::from_rgba(left, right, label)
    }

    pub fn from_pair(
        left: RgbaImage,
        right: RgbaImage,
        label: impl Into<String>,
    ) -> RenderResult<Self> {
        ensure_not_empty(&left)?;
        ensure_not_empty(&right)?;
        let label = label.into();
        let (l, r) = (EyeImage::from_rgba(left), EyeImage::from_rgba(right));
        if (l.aspect() - r.aspect()).abs() > f32::EPSILON {
            warn!(
                %label,
                left = l.aspect(),
                right = r.aspect(),
                "eye images differ in aspect, using the left one"
            );
        }
        Ok(Self {
            eyes: EyePair::new(l, r),
            label,
        })
    }

    pub fn from_side_by_side(image: RgbaImage, label: impl Into<String>) -> RenderResult<Self> {
        ensure_not_empty(&image)?;
        let (width, height) = image.dimensions();
        if !width.is_multiple_of(2) {
            return Err(RenderError::image(format!(
                "side-by-side image width must be even, got {width}"
            )));
        }
        let half = width / 2;
        let left = imageops::crop_imm(&image, 0, 0, half, height).to_image();
        let right = imageops::crop_imm(&image, half, 0, half, height).to_image();
        Ok(Self {
            eyes: EyePair::new(EyeImage::from_rgba(left), EyeImage::from_rgba(right)),
            label: label.into(),
        })
    }

    pub fn from_auto(image: RgbaImage, label: impl Into<String>) -> RenderResult<Self> {
        ensure_not_empty(&image)?;
        if stereo_layout(image.width(), image.height()).is_sbs {
            return Self::from_side_by_side(image, label);
        }
        let eye = EyeImage::from_rgba(image);
        Ok(Self {
            eyes: EyePair::new(eye.clone(), eye),
            label: label.into(),
        })
    }

    /// Height over width of the left eye; the quad is scaled by it.
    pub fn aspect(&self) -> f32 {
        self.eyes.left.aspect()
    }

    pub fn eye(&self, eye: Eye) -> &EyeImage {
        &self.eyes[eye]
    }

    pub fn swapped(&self) -> Self {
        Self {
            eyes: self.eyes.clone().swapped(),
            label: self.label.clone(),
        }
    }
}

fn decode(path: &Path) -> RenderResult<RgbaImage> {
    image::open(path)
        .map(|image| image.into_rgba8())
        .map_err(|e| RenderError::image(format!("{}: {e}", path.display())))
}

fn decode_memory(bytes: &[u8]) -> RenderResult<RgbaImage> {
    image::load_from_memory(bytes)
        .map(|image| image.into_rgba8())
        .map_err(|e| RenderError::image(e.to_string()))
}

fn ensure_not_empty(image: &RgbaImage) -> RenderResult<()> {
    if image.width() == 0 || image.height() == 0 {
        return Err(RenderError::image("image has no pixels"));
    }
    Ok(())
}

#[derive(Default)]
struct SlotState {
    image: Option<Arc<StereoImage>>,
    generation: u64,
}

/// The image currently on display, shared between the preview and the VR thread.
///
/// Every change bumps a generation counter so each GL context can tell when its
/// uploaded textures are stale.
#[derive(Default)]
pub struct ImageSlot {
    state: Mutex<SlotState>,
}

impl ImageSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Replaces the image and returns the new generation.
    pub fn publish(&self, image: StereoImage) -> u64 {
        let mut state = self.lock();
        state.image = Some(Arc::new(image));
        state.generation += 1;
        state.generation
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        if state.image.take().is_some() {
            state.generation += 1;
        }
    }

    /// Exchanges the eyes of the current image. Returns false when the slot is empty.
    pub fn swap_eyes(&self) -> bool {
        let mut state = self.lock();
        let Some(image) = state.image.as_ref() else {
            return false;
        };
        state.image = Some(Arc::new(image.swapped()));
        state.generation += 1;
        true
    }

    pub fn current(&self) -> Option<Arc<StereoImage>> {
        self.lock().image.clone()
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Generation and image read under one lock.
    pub fn snapshot(&self) -> (u64, Option<Arc<StereoImage>>) {
        let state = self.lock();
        (state.generation, state.image.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn two_tone(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, _| {
            if x < width / 2 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        })
    }

    fn first_pixel(eye: &EyeImage) -> [u8; 4] {
        [eye.pixels[0], eye.pixels[1], eye.pixels[2], eye.pixels[3]]
    }

    #[test]
    fn layout_detects_side_by_side() {
        let layout = stereo_layout(3840, 1080);
        assert!(layout.is_sbs);
        assert_eq!(layout.eye_width, 1920);
        assert_eq!(layout.eye_height, 1080);

        assert!(!stereo_layout(1920, 1080).is_sbs);
        assert!(!stereo_layout(2001, 1000).is_sbs);
        assert!(!stereo_layout(0, 0).is_sbs);
    }

    #[test]
    fn side_by_side_is_split_in_halves() {
        let image = StereoImage::from_side_by_side(two_tone(8, 2), "sbs").unwrap();
        assert_eq!(image.eyes.left.width, 4);
        assert_eq!(image.eyes.right.width, 4);
        assert_eq!(image.eyes.left.pixels.len(), 4 * 2 * 4);
        assert_eq!(first_pixel(&image.eyes.left), [255, 0, 0, 255]);
        assert_eq!(first_pixel(&image.eyes.right), [0, 0, 255, 255]);
        assert_eq!(image.aspect(), 0.5);
    }

    #[test]
    fn side_by_side_rejects_odd_width() {
        let err = StereoImage::from_side_by_side(two_tone(7, 2), "odd").unwrap_err();
        assert!(matches!(err, RenderError::Image(_)));
    }

    #[test]
    fn auto_uses_mono_for_regular_images() {
        let image = StereoImage::from_auto(two_tone(4, 3), "mono").unwrap();
        assert_eq!(image.eyes.left, image.eyes.right);
        assert_eq!(image.eyes.left.width, 4);
        assert_eq!(image.aspect(), 0.75);
    }

    #[test]
    fn rows_are_stored_bottom_up() {
        let image = RgbaImage::from_fn(1, 2, |_, y| {
            if y == 0 {
                Rgba([1, 1, 1, 255])
            } else {
                Rgba([2, 2, 2, 255])
            }
        });
        let stereo = StereoImage::from_auto(image, "rows").unwrap();
        assert_eq!(first_pixel(&stereo.eyes.left), [2, 2, 2, 255]);
    }

    #[test]
    fn from_rgba_picks_pair_or_auto() {
        let pair = StereoImage::from_rgba(two_tone(4, 4), Some(two_tone(4, 4)), "pair").unwrap();
        assert_eq!(pair.aspect(), 1.0);
        assert_eq!(pair.eyes.left.width, 4);

        let auto = StereoImage::from_rgba(two_tone(8, 4), None, "auto").unwrap();
        assert_eq!(auto.eyes.left.width, 4);
        assert_eq!(first_pixel(&auto.eyes.right), [0, 0, 255, 255]);
    }

    #[test]
    fn encoded_bytes_decode() {
        let mut png = std::io::Cursor::new(Vec::new());
        two_tone(8, 4)
            .write_to(&mut png, image::ImageFormat::Png)
            .unwrap();
        let image = StereoImage::from_encoded(png.get_ref(), None, "dropped").unwrap();
        assert_eq!(image.eyes.left.width, 4);
        assert!(StereoImage::from_encoded(b"not an image", None, "junk").is_err());
    }

    #[test]
    fn empty_image_is_rejected() {
        assert!(StereoImage::from_auto(RgbaImage::new(0, 0), "empty").is_err());
    }

    #[test]
    fn pair_with_mismatched_aspect_uses_left_eye() {
        let image = StereoImage::from_pair(two_tone(4, 2), two_tone(4, 4), "mismatch").unwrap();
        assert_eq!(image.eyes.left.aspect(), 0.5);
        assert_eq!(image.eyes.right.aspect(), 1.0);
        assert_eq!(image.aspect(), 0.5);
        assert_eq!(image.swapped().aspect(), 1.0);
    }

    #[test]
    fn swapped_exchanges_eyes() {
        let image = StereoImage::from_side_by_side(two_tone(8, 2), "sbs").unwrap();
        let swapped = image.swapped();
        assert_eq!(swapped.eyes.left, image.eyes.right);
        assert_eq!(swapped.eyes.right, image.eyes.left);
    }

    #[test]
    fn slot_generation_tracks_changes() {
        let slot = ImageSlot::new();
        assert_eq!(slot.generation(), 0);
        assert!(!slot.swap_eyes());
        slot.clear();
        assert_eq!(slot.generation(), 0);

        let image = StereoImage::from_side_by_side(two_tone(8, 2), "sbs").unwrap();
        assert_eq!(slot.publish(image.clone()), 1);
        assert!(slot.swap_eyes());
        let (generation, current) = slot.snapshot();
        assert_eq!(generation, 2);
        assert_eq!(current.unwrap().eyes.left, image.eyes.right);

        slot.clear();
        assert_eq!(slot.generation(), 3);
        assert!(slot.current().is_none());
    }

    #[test]
    fn label_uses_file_names() {
        let source = StereoSource::Pair {
            left: PathBuf::from("/photos/wL.jpg"),
            right: PathBuf::from("/photos/wR.jpg"),
        };
        assert_eq!(source.label(), "wL.jpg | wR.jpg");
        assert_eq!(
            StereoSource::Auto(PathBuf::from("pano.png")).label(),
            "pano.png"
        );
    }

    #[test]
    fn missing_file_is_an_image_error() {
        let err = StereoImage::load(&StereoSource::Auto(PathBuf::from(
            "/nonexistent/stereoview.png",
        )))
        .unwrap_err();
        assert!(err.to_string().contains("stereoview.png"));
    }
}
