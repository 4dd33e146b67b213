//! Stereoview: shows a stereo image pair on a VR headset, with a desktop preview window.

mod app;
mod config;
mod input;
mod state;
mod vr;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use stereoview_render::StereoScene;
use tracing::info;

use crate::config::{Args, ViewerConfig};
use crate::state::ViewerState;

fn main() -> Result<()> {
    stereoview_common::init_tracing();

    let args = Args::parse();
    let config = ViewerConfig::from_args(args)?;
    info!(
        vr = ?config.vr_mode,
        eye_size = %config.eye_size,
        window = %config.window,
        view_mode = ?config.scene.view_mode,
        "starting stereoview"
    );

    let state = Arc::new(ViewerState::new(StereoScene::new(config.scene.clone())));
    if let Some(source) = &config.source {
        state
            .load(source, config.swap_eyes)
            .with_context(|| format!("failed to load {}", source.label()))?;
    }

    let runtime = vr::start(config.vr_mode, &state, config.vr_eye_size)?;
    app::run(config, state, runtime)
}
