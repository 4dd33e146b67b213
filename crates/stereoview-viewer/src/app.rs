//! Desktop preview window: both eyes side by side plus a status overlay.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use eframe::egui::{self, Align2, Color32, Key, Pos2, Rect, TextureId, ViewportCommand};
use stereoview_common::Dimensions;
use stereoview_render::{
    EyeProjection, EyeTarget, RenderResult, StereoImage, StereoRenderer, StereoSource,
};
use stereoview_vr::{Eye, EyePair, VrRuntime};
use stereoview_vr_openxr::OpenXrRuntime;
use tracing::{error, info, warn};

use crate::config::ViewerConfig;
use crate::input::desktop_input;
use crate::state::ViewerState;

/// Upper bound for one frame's time step, in seconds.
const MAX_FRAME_TIME: f32 = 0.1;

/// GL resources owned by the preview's context.
struct PreviewGpu {
    renderer: StereoRenderer,
    targets: EyePair<EyeTarget>,
    texture_ids: Option<EyePair<TextureId>>,
}

impl PreviewGpu {
    fn new(gl: &glow::Context, size: Dimensions) -> RenderResult<Self> {
        let mut renderer = StereoRenderer::new(gl)?;
        let mut left = match EyeTarget::with_color(gl, size.width, size.height) {
            Ok(target) => target,
            Err(err) => {
                renderer.destroy(gl);
                return Err(err);
            }
        };
        let right = match EyeTarget::with_color(gl, size.width, size.height) {
            Ok(target) => target,
            Err(err) => {
                left.destroy(gl);
                renderer.destroy(gl);
                return Err(err);
            }
        };
        Ok(Self {
            renderer,
            targets: EyePair::new(left, right),
            texture_ids: None,
        })
    }

    fn render(&mut self, gl: &glow::Context, state: &ViewerState) -> RenderResult<()> {
        self.renderer.sync_image(gl, &state.images)?;
        let scene = state.scene().clone();
        for eye in Eye::BOTH {
            let target = &self.targets[eye];
            let matrices = scene.eye_matrices(
                eye,
                EyeProjection::Perspective {
                    aspect: target.aspect(),
                },
                None,
            );
            self.renderer
                .render_to_target(gl, target, eye, &matrices, scene.settings().clear_color)?;
        }
        Ok(())
    }

    /// egui ids for the eye textures, registered on first use.
    fn texture_ids(&mut self, frame: &mut eframe::Frame) -> Option<EyePair<TextureId>> {
        if self.texture_ids.is_none() {
            let left = self.targets.left.color_texture()?;
            let right = self.targets.right.color_texture()?;
            self.texture_ids = Some(EyePair::new(
                frame.register_native_glow_texture(left),
                frame.register_native_glow_texture(right),
            ));
        }
        self.texture_ids
    }

    fn destroy(&mut self, gl: &glow::Context) {
        for eye in Eye::BOTH {
            self.targets[eye].destroy(gl);
        }
        self.renderer.destroy(gl);
    }
}

pub struct PreviewApp {
    state: Arc<ViewerState>,
    runtime: Option<OpenXrRuntime>,
    gpu: Option<PreviewGpu>,
    swap_eyes: bool,
    /// Last load or render failure, shown in the overlay.
    last_error: Option<String>,
}

impl PreviewApp {
    fn new(
        cc: &eframe::CreationContext<'_>,
        config: &ViewerConfig,
        state: Arc<ViewerState>,
        runtime: Option<OpenXrRuntime>,
    ) -> Self {
        let mut last_error = None;
        let gpu = match cc.gl.as_ref() {
            Some(gl) => match PreviewGpu::new(gl, config.eye_size) {
                Ok(gpu) => Some(gpu),
                Err(err) => {
                    error!("preview renderer init failed: {err}");
                    last_error = Some(err.to_string());
                    None
                }
            },
            None => {
                error!("eframe started without a glow context");
                last_error = Some("no GL context".to_string());
                None
            }
        };
        Self {
            state,
            runtime,
            gpu,
            swap_eyes: config.swap_eyes,
            last_error,
        }
    }

    fn handle_dropped_files(&mut self, files: Vec<egui::DroppedFile>) {
        let result = if files.iter().all(|file| file.path.is_some()) {
            let paths = files.into_iter().filter_map(|file| file.path).collect();
            dropped_source(paths).and_then(|source| {
                info!(source = %source.label(), "loading dropped files");
                self.state
                    .load(&source, self.swap_eyes)
                    .map_err(|err| err.to_string())
            })
        } else {
            self.load_dropped_bytes(&files)
        };
        match result {
            Ok(()) => self.last_error = None,
            Err(err) => {
                warn!("failed to load dropped files: {err}");
                self.last_error = Some(err);
            }
        }
    }

    /// Drops that carry file contents instead of paths.
    fn load_dropped_bytes(&self, files: &[egui::DroppedFile]) -> std::result::Result<(), String> {
        let contents: Vec<&[u8]> = files
            .iter()
            .filter_map(|file| file.bytes.as_deref())
            .collect();
        let (left, right) = match contents.as_slice() {
            [single] => (*single, None),
            [left, right] => (*left, Some(*right)),
            _ => return Err(format!("drop one or two image files, got {}", files.len())),
        };
        let label = files
            .iter()
            .map(|file| file.name.as_str())
            .collect::<Vec<_>>()
            .join(" | ");
        let image = StereoImage::from_encoded(left, right, label).map_err(|e| e.to_string())?;
        self.state
            .show(if self.swap_eyes { image.swapped() } else { image });
        Ok(())
    }

    fn status_lines(&self) -> Vec<String> {
        let scene = self.state.scene();
        let image = self
            .state
            .images
            .current()
            .map(|image| image.label.clone())
            .unwrap_or_else(|| "no image, drop one or two files here".to_string());
        let refresh = self
            .state
            .refresh_hz()
            .map(|hz| format!("{hz:.1} Hz"))
            .unwrap_or_else(|| "-".to_string());

        let mut lines = vec![
            stereoview_vr::runtime_status(),
            image,
            format!(
                "disparity {:.3}  distance {:.2}  zoom {:.1}°  refresh {refresh}",
                scene.disparity(),
                scene.quad_distance(),
                scene.camera(Eye::Left).zoom(),
            ),
        ];
        if let Some([x, y, z]) = self.state.head_position() {
            lines.push(format!("head {x:.2} {y:.2} {z:.2}"));
        }
        if let Some(err) = &self.last_error {
            lines.push(format!("error: {err}"));
        }
        lines
    }
}

/// One file loads as auto-detected mono/side-by-side, two as a left/right pair in drop order.
fn dropped_source(mut paths: Vec<PathBuf>) -> std::result::Result<StereoSource, String> {
    match paths.len() {
        1 => Ok(StereoSource::Auto(paths.remove(0))),
        2 => {
            let right = paths.remove(1);
            let left = paths.remove(0);
            Ok(StereoSource::Pair { left, right })
        }
        n => Err(format!("drop one or two image files, got {n}")),
    }
}

impl eframe::App for PreviewApp {
    fn update(&mut self, ctx: &egui::Context, frame: &mut eframe::Frame) {
        let (input, dt, close, dropped) = ctx.input(|i| {
            (
                desktop_input(i),
                i.stable_dt.min(MAX_FRAME_TIME),
                i.key_pressed(Key::Escape),
                i.raw.dropped_files.clone(),
            )
        });
        if close {
            ctx.send_viewport_cmd(ViewportCommand::Close);
        }
        if !dropped.is_empty() {
            self.handle_dropped_files(dropped);
        }
        self.state.apply(&input, dt);

        let textures = match (self.gpu.as_mut(), frame.gl().cloned()) {
            (Some(gpu), Some(gl)) => {
                if let Err(err) = gpu.render(&gl, &self.state) {
                    warn!("preview render failed: {err}");
                    self.last_error = Some(err.to_string());
                }
                gpu.texture_ids(frame)
            }
            _ => None,
        };

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(Color32::BLACK))
            .show(ctx, |ui| {
                let Some(textures) = textures else {
                    return;
                };
                let rect = ui.max_rect();
                let half = rect.width() / 2.0;
                // Targets are stored bottom-up.
                let uv = Rect::from_min_max(Pos2::new(0.0, 1.0), Pos2::new(1.0, 0.0));
                for eye in Eye::BOTH {
                    let min = Pos2::new(rect.min.x + half * eye.index() as f32, rect.min.y);
                    let eye_rect = Rect::from_min_size(min, egui::vec2(half, rect.height()));
                    ui.painter()
                        .image(textures[eye], eye_rect, uv, Color32::WHITE);
                }
            });

        let lines = self.status_lines();
        egui::Area::new(egui::Id::new("stereoview-status"))
            .anchor(Align2::LEFT_TOP, [8.0, 8.0])
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    for line in lines {
                        ui.label(line);
                    }
                });
            });

        ctx.request_repaint();
    }

    fn on_exit(&mut self, gl: Option<&glow::Context>) {
        if let Some(mut runtime) = self.runtime.take() {
            info!("stopping VR runtime");
            runtime.stop();
        }
        if let (Some(mut gpu), Some(gl)) = (self.gpu.take(), gl) {
            gpu.destroy(gl);
        }
    }
}

pub fn run(
    config: ViewerConfig,
    state: Arc<ViewerState>,
    runtime: Option<OpenXrRuntime>,
) -> Result<()> {
    let options = eframe::NativeOptions {
        renderer: eframe::Renderer::Glow,
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.window.width as f32, config.window.height as f32])
            .with_title("Stereoview")
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "Stereoview",
        options,
        Box::new(move |cc| Box::new(PreviewApp::new(cc, &config, state, runtime))),
    )
    .map_err(|e| anyhow!("desktop preview failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_drop_is_auto() {
        let source = dropped_source(vec![PathBuf::from("a.jpg")]).unwrap();
        assert_eq!(source, StereoSource::Auto(PathBuf::from("a.jpg")));
    }

    #[test]
    fn double_drop_keeps_order() {
        let source =
            dropped_source(vec![PathBuf::from("wL.jpg"), PathBuf::from("wR.jpg")]).unwrap();
        assert_eq!(
            source,
            StereoSource::Pair {
                left: PathBuf::from("wL.jpg"),
                right: PathBuf::from("wR.jpg"),
            }
        );
    }

    #[test]
    fn other_drop_counts_are_rejected() {
        assert!(dropped_source(Vec::new()).is_err());
        assert!(dropped_source(vec![PathBuf::new(); 3]).is_err());
    }
}
