use glow::HasContext;
use stereoview_vr::Eye;

use crate::image::ImageSlot;
use crate::quad::QuadMesh;
use crate::scene::EyeMatrices;
use crate::shader::ShaderProgram;
use crate::target::EyeTarget;
use crate::texture::ImageTextures;
use crate::{RenderError, RenderResult};

/// Draws the stereo quad for one eye at a time into an [`EyeTarget`].
///
/// One renderer per GL context; textures are synced from the shared [`ImageSlot`].
pub struct StereoRenderer {
    program: ShaderProgram,
    quad: QuadMesh,
    textures: ImageTextures,
}

impl StereoRenderer {
    pub fn new(gl: &glow::Context) -> RenderResult<Self> {
        let program = ShaderProgram::quad(gl)?;
        let quad = match QuadMesh::new(gl) {
            Ok(quad) => quad,
            Err(err) => {
                program.destroy(gl);
                return Err(err);
            }
        };
        Ok(Self {
            program,
            quad,
            textures: ImageTextures::new(),
        })
    }

    /// Picks up a newly published image. Returns true when textures changed.
    pub fn sync_image(&mut self, gl: &glow::Context, slot: &ImageSlot) -> RenderResult<bool> {
        self.textures.sync(gl, slot)
    }

    pub fn has_image(&self) -> bool {
        self.textures.get(Eye::Left).is_some()
    }

    /// Renders into `color` through `target`. Without an image only the clear color is drawn.
    pub fn render_eye(
        &self,
        gl: &glow::Context,
        target: &EyeTarget,
        color: glow::Texture,
        eye: Eye,
        matrices: &EyeMatrices,
        clear_color: [f32; 4],
    ) -> RenderResult<()> {
        target.bind(gl, color)?;
        unsafe {
            let [r, g, b, a] = clear_color;
            gl.clear_color(r, g, b, a);
            gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);

            if let Some(texture) = self.textures.get(eye) {
                gl.enable(glow::DEPTH_TEST);
                self.program.bind(gl, matrices);
                gl.active_texture(glow::TEXTURE0);
                gl.bind_texture(glow::TEXTURE_2D, Some(texture));
                self.quad.draw(gl);
                gl.bind_texture(glow::TEXTURE_2D, None);
                gl.use_program(None);
                gl.disable(glow::DEPTH_TEST);
            }

            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        }
        Ok(())
    }

    /// Renders into the target's own color texture.
    pub fn render_to_target(
        &self,
        gl: &glow::Context,
        target: &EyeTarget,
        eye: Eye,
        matrices: &EyeMatrices,
        clear_color: [f32; 4],
    ) -> RenderResult<()> {
        let color = target
            .color_texture()
            .ok_or_else(|| RenderError::gl("eye target has no color texture"))?;
        self.render_eye(gl, target, color, eye, matrices, clear_color)
    }

    pub fn destroy(&mut self, gl: &glow::Context) {
        self.textures.destroy(gl);
        self.quad.destroy(gl);
        self.program.destroy(gl);
    }
}
