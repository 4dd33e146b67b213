use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use stereoview_common::{load_json, Dimensions, Error, Result};
use stereoview_render::{SceneSettings, StereoSource, ViewMode};

const MIN_DIMENSION: u32 = 64;
const MAX_DIMENSION: u32 = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VrMode {
    /// Use the headset when one is found, otherwise run the desktop preview only
    Auto,
    /// Fail when no headset is available
    Required,
    /// Desktop preview only
    Off,
}

#[derive(Parser, Debug)]
#[command(name = "stereoview")]
#[command(about = "Stereo image viewer for VR headsets with a desktop preview")]
pub struct Args {
    /// Left eye image (requires --right)
    #[arg(long, env = "STEREOVIEW_LEFT")]
    pub left: Option<PathBuf>,

    /// Right eye image (requires --left)
    #[arg(long, env = "STEREOVIEW_RIGHT")]
    pub right: Option<PathBuf>,

    /// Single image, split when at least twice as wide as tall
    #[arg(long, env = "STEREOVIEW_IMAGE")]
    pub image: Option<PathBuf>,

    /// Single side-by-side image, left eye in the left half
    #[arg(long, env = "STEREOVIEW_SIDE_BY_SIDE")]
    pub side_by_side: Option<PathBuf>,

    /// Show the left image to the right eye and vice versa
    #[arg(long, env = "STEREOVIEW_SWAP_EYES")]
    pub swap_eyes: bool,

    /// Headset usage
    #[arg(long, value_enum, default_value_t = VrMode::Auto, env = "STEREOVIEW_VR")]
    pub vr: VrMode,

    /// Keep the image fixed in space while the head moves
    #[arg(long, env = "STEREOVIEW_TRACKED")]
    pub tracked: bool,

    /// Size of each desktop preview eye target
    #[arg(long, default_value = "2048x2048", env = "STEREOVIEW_EYE_SIZE")]
    pub eye_size: Dimensions,

    /// Per-eye headset swapchain size (runtime recommendation when unset)
    #[arg(long, env = "STEREOVIEW_VR_EYE_SIZE")]
    pub vr_eye_size: Option<Dimensions>,

    /// Initial window size
    #[arg(long, default_value = "1000x500", env = "STEREOVIEW_WINDOW")]
    pub window: Dimensions,

    /// JSON file with scene settings
    #[arg(long, env = "STEREOVIEW_SETTINGS")]
    pub settings: Option<PathBuf>,
}

/// Validated viewer configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    /// `None` starts with an empty scene until files are dropped on the window.
    pub source: Option<StereoSource>,
    pub swap_eyes: bool,
    pub vr_mode: VrMode,
    pub eye_size: Dimensions,
    pub vr_eye_size: Option<Dimensions>,
    pub window: Dimensions,
    pub scene: SceneSettings,
}

impl ViewerConfig {
    pub fn from_args(args: Args) -> Result<Self> {
        let source = image_source(&args)?;

        let mut scene = match &args.settings {
            Some(path) => load_json::<SceneSettings>(path)?,
            None => SceneSettings::default(),
        };
        if args.tracked {
            scene.view_mode = ViewMode::Tracked;
        }
        validate_scene(&scene)?;

        Ok(Self {
            source,
            swap_eyes: args.swap_eyes,
            vr_mode: args.vr,
            eye_size: args.eye_size.validated("eye size", MIN_DIMENSION, MAX_DIMENSION)?,
            vr_eye_size: args
                .vr_eye_size
                .map(|size| size.validated("VR eye size", MIN_DIMENSION, MAX_DIMENSION))
                .transpose()?,
            window: args.window.validated("window", MIN_DIMENSION, MAX_DIMENSION)?,
            scene,
        })
    }
}

fn image_source(args: &Args) -> Result<Option<StereoSource>> {
    match (
        args.left.clone(),
        args.right.clone(),
        args.image.clone(),
        args.side_by_side.clone(),
    ) {
        (None, None, None, None) => Ok(None),
        (Some(left), Some(right), None, None) => Ok(Some(StereoSource::Pair { left, right })),
        (None, None, Some(path), None) => Ok(Some(StereoSource::Auto(path))),
        (None, None, None, Some(path)) => Ok(Some(StereoSource::SideBySide(path))),
        (Some(_), None, None, None) | (None, Some(_), None, None) => Err(Error::config(
            "--left and --right must be given together",
        )),
        _ => Err(Error::config(
            "use either --left/--right, --image or --side-by-side",
        )),
    }
}

fn validate_scene(scene: &SceneSettings) -> Result<()> {
    if !(scene.near > 0.0 && scene.far > scene.near) {
        return Err(Error::config(format!(
            "clip planes must satisfy 0 < near < far, got near={} far={}",
            scene.near, scene.far
        )));
    }
    let (nearest, farthest) = scene.quad_distance_limits();
    if !(nearest..=farthest).contains(&scene.quad_distance) {
        return Err(Error::config(format!(
            "quad distance must lie within {nearest}..={farthest}, got {}",
            scene.quad_distance
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(argv: &[&str]) -> Result<ViewerConfig> {
        let args = Args::try_parse_from(std::iter::once("stereoview").chain(argv.iter().copied()))
            .expect("arguments parse");
        ViewerConfig::from_args(args)
    }

    #[test]
    fn defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.source, None);
        assert_eq!(cfg.vr_mode, VrMode::Auto);
        assert_eq!(cfg.eye_size, Dimensions::new(2048, 2048));
        assert_eq!(cfg.window, Dimensions::new(1000, 500));
        assert_eq!(cfg.vr_eye_size, None);
        assert_eq!(cfg.scene, SceneSettings::default());
        assert!(!cfg.swap_eyes);
    }

    #[test]
    fn pair_and_single_sources() {
        let cfg = config(&["--left", "l.png", "--right", "r.png", "--swap-eyes"]).unwrap();
        assert_eq!(
            cfg.source,
            Some(StereoSource::Pair {
                left: "l.png".into(),
                right: "r.png".into(),
            })
        );
        assert!(cfg.swap_eyes);

        let cfg = config(&["--image", "pano.jpg"]).unwrap();
        assert_eq!(cfg.source, Some(StereoSource::Auto("pano.jpg".into())));

        let cfg = config(&["--side-by-side", "sbs.jpg"]).unwrap();
        assert_eq!(cfg.source, Some(StereoSource::SideBySide("sbs.jpg".into())));
    }

    #[test]
    fn conflicting_sources_are_rejected() {
        assert!(config(&["--left", "l.png"]).is_err());
        assert!(config(&["--image", "a.png", "--side-by-side", "b.png"]).is_err());
        assert!(config(&["--left", "l.png", "--right", "r.png", "--image", "a.png"]).is_err());
    }

    #[test]
    fn dimensions_are_validated() {
        let cfg = config(&["--eye-size", "1024x512", "--vr-eye-size", "1832X1920"]).unwrap();
        assert_eq!(cfg.eye_size, Dimensions::new(1024, 512));
        assert_eq!(cfg.vr_eye_size, Some(Dimensions::new(1832, 1920)));

        assert!(config(&["--eye-size", "32x32"]).is_err());
        assert!(config(&["--window", "10000x500"]).is_err());
        assert!(Args::try_parse_from(["stereoview", "--window", "wide"]).is_err());
    }

    #[test]
    fn vr_mode_and_tracking() {
        let cfg = config(&["--vr", "off", "--tracked"]).unwrap();
        assert_eq!(cfg.vr_mode, VrMode::Off);
        assert_eq!(cfg.scene.view_mode, ViewMode::Tracked);
        assert!(Args::try_parse_from(["stereoview", "--vr", "sometimes"]).is_err());
    }

    #[test]
    fn settings_file_overrides_defaults() {
        let path = std::env::temp_dir().join(format!(
            "stereoview-settings-{}.json",
            std::process::id()
        ));
        std::fs::write(
            &path,
            serde_json::json!({ "quad_distance": 4.0, "view_mode": "tracked" }).to_string(),
        )
        .unwrap();

        let cfg = config(&["--settings", path.to_str().unwrap()]).unwrap();
        assert_eq!(cfg.scene.quad_distance, 4.0);
        assert_eq!(cfg.scene.view_mode, ViewMode::Tracked);
        assert_eq!(cfg.scene.near, SceneSettings::default().near);

        std::fs::write(&path, r#"{ "near": 5.0, "far": 1.0 }"#).unwrap();
        assert!(config(&["--settings", path.to_str().unwrap()]).is_err());

        // Distance 99 puts the quad plane 101 units from the cameras, beyond far = 100.
        std::fs::write(&path, r#"{ "quad_distance": 99.0 }"#).unwrap();
        assert!(config(&["--settings", path.to_str().unwrap()]).is_err());
        std::fs::write(&path, r#"{ "quad_distance": 97.5 }"#).unwrap();
        assert!(config(&["--settings", path.to_str().unwrap()]).is_ok());

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn missing_settings_file_is_an_error() {
        let err = config(&["--settings", "/nonexistent/stereoview.json"]).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
