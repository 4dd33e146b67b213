use glow::HasContext;

use crate::{RenderError, RenderResult};

/// Offscreen framebuffer with a depth/stencil renderbuffer of a fixed size.
///
/// The color attachment is either owned by the target (desktop preview) or
/// supplied per frame (runtime swapchain images).
pub struct EyeTarget {
    framebuffer: glow::Framebuffer,
    depth: glow::Renderbuffer,
    color: Option<glow::Texture>,
    width: u32,
    height: u32,
}

impl EyeTarget {
    /// Target that renders into externally owned color textures.
    pub fn new(gl: &glow::Context, width: u32, height: u32) -> RenderResult<Self> {
        unsafe {
            let framebuffer = gl.create_framebuffer().map_err(RenderError::gl)?;
            let depth = match gl.create_renderbuffer() {
                Ok(depth) => depth,
                Err(err) => {
                    gl.delete_framebuffer(framebuffer);
                    return Err(RenderError::gl(err));
                }
            };

            gl.bind_renderbuffer(glow::RENDERBUFFER, Some(depth));
            gl.renderbuffer_storage(
                glow::RENDERBUFFER,
                glow::DEPTH24_STENCIL8,
                width as i32,
                height as i32,
            );
            gl.bind_renderbuffer(glow::RENDERBUFFER, None);

            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));
            gl.framebuffer_renderbuffer(
                glow::FRAMEBUFFER,
                glow::DEPTH_STENCIL_ATTACHMENT,
                glow::RENDERBUFFER,
                Some(depth),
            );
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);

            Ok(Self {
                framebuffer,
                depth,
                color: None,
                width,
                height,
            })
        }
    }

    /// Target with its own RGBA8 color texture.
    pub fn with_color(gl: &glow::Context, width: u32, height: u32) -> RenderResult<Self> {
        let mut target = Self::new(gl, width, height)?;
        unsafe {
            let texture = match gl.create_texture() {
                Ok(texture) => texture,
                Err(err) => {
                    target.destroy(gl);
                    return Err(RenderError::gl(err));
                }
            };
            gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA8 as i32,
                width as i32,
                height as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                None,
            );
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, glow::LINEAR as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32);
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_S,
                glow::CLAMP_TO_EDGE as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_T,
                glow::CLAMP_TO_EDGE as i32,
            );
            gl.bind_texture(glow::TEXTURE_2D, None);
            target.color = Some(texture);
        }
        Ok(target)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    pub fn color_texture(&self) -> Option<glow::Texture> {
        self.color
    }

    /// Binds the framebuffer with `color` attached and sets the viewport.
    pub fn bind(&self, gl: &glow::Context, color: glow::Texture) -> RenderResult<()> {
        unsafe {
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(self.framebuffer));
            gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::TEXTURE_2D,
                Some(color),
                0,
            );
            let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
            if status != glow::FRAMEBUFFER_COMPLETE {
                gl.bind_framebuffer(glow::FRAMEBUFFER, None);
                return Err(RenderError::gl(format!(
                    "eye framebuffer incomplete: 0x{status:X}"
                )));
            }
            gl.disable(glow::SCISSOR_TEST);
            gl.viewport(0, 0, self.width as i32, self.height as i32);
        }
        Ok(())
    }

    pub fn destroy(&mut self, gl: &glow::Context) {
        unsafe {
            if let Some(color) = self.color.take() {
                gl.delete_texture(color);
            }
            gl.delete_renderbuffer(self.depth);
            gl.delete_framebuffer(self.framebuffer);
        }
    }
}
