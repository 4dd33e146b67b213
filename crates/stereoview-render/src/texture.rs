use glow::HasContext;
use stereoview_vr::{Eye, EyePair};
use tracing::debug;

use crate::image::{EyeImage, ImageSlot};
use crate::{RenderError, RenderResult};

/// Per-eye textures of the current image, uploaded into one GL context.
#[derive(Default)]
pub struct ImageTextures {
    textures: Option<EyePair<glow::Texture>>,
    generation: u64,
}

impl ImageTextures {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-uploads when the slot changed since the last sync. Returns true on change.
    pub fn sync(&mut self, gl: &glow::Context, slot: &ImageSlot) -> RenderResult<bool> {
        let (generation, image) = slot.snapshot();
        if generation == self.generation {
            return Ok(false);
        }

        self.release(gl);
        if let Some(image) = image {
            let left = upload(gl, image.eye(Eye::Left))?;
            let right = match upload(gl, image.eye(Eye::Right)) {
                Ok(texture) => texture,
                Err(err) => {
                    unsafe { gl.delete_texture(left) };
                    return Err(err);
                }
            };
            self.textures = Some(EyePair::new(left, right));
            debug!(label = %image.label, generation, "image textures uploaded");
        }
        self.generation = generation;
        Ok(true)
    }

    pub fn get(&self, eye: Eye) -> Option<glow::Texture> {
        self.textures.map(|textures| textures[eye])
    }

    fn release(&mut self, gl: &glow::Context) {
        if let Some(textures) = self.textures.take() {
            unsafe {
                gl.delete_texture(textures.left);
                gl.delete_texture(textures.right);
            }
        }
    }

    pub fn destroy(&mut self, gl: &glow::Context) {
        self.release(gl);
        self.generation = 0;
    }
}

fn upload(gl: &glow::Context, image: &EyeImage) -> RenderResult<glow::Texture> {
    unsafe {
        let texture = gl.create_texture().map_err(RenderError::gl)?;
        gl.bind_texture(glow::TEXTURE_2D, Some(texture));
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::REPEAT as i32);
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::REPEAT as i32);
        gl.tex_parameter_i32(
            glow::TEXTURE_2D,
            glow::TEXTURE_MIN_FILTER,
            glow::LINEAR_MIPMAP_LINEAR as i32,
        );
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32);
        gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
        gl.tex_image_2d(
            glow::TEXTURE_2D,
            0,
            glow::RGBA8 as i32,
            image.width as i32,
            image.height as i32,
            0,
            glow::RGBA,
            glow::UNSIGNED_BYTE,
            Some(&image.pixels[..]),
        );
        gl.generate_mipmap(glow::TEXTURE_2D);
        gl.bind_texture(glow::TEXTURE_2D, None);
        Ok(texture)
    }
}
