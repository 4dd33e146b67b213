use glow::HasContext;

use crate::{RenderError, RenderResult};

const FLOATS_PER_VERTEX: i32 = 5;

/// Model-space z of the quad's vertices.
pub const QUAD_PLANE_Z: f32 = 1.0;

// position xyz, uv
#[rustfmt::skip]
const QUAD_VERTICES: [f32; 30] = [
    -1.0, -1.0, QUAD_PLANE_Z,   0.0, 0.0,
     1.0, -1.0, QUAD_PLANE_Z,   1.0, 0.0,
     1.0,  1.0, QUAD_PLANE_Z,   1.0, 1.0,
     1.0,  1.0, QUAD_PLANE_Z,   1.0, 1.0,
    -1.0,  1.0, QUAD_PLANE_Z,   0.0, 1.0,
    -1.0, -1.0, QUAD_PLANE_Z,   0.0, 0.0,
];

/// Unit quad in the z = 1 plane, drawn as two triangles.
pub struct QuadMesh {
    vao: glow::VertexArray,
    vbo: glow::Buffer,
}

impl QuadMesh {
    pub fn new(gl: &glow::Context) -> RenderResult<Self> {
        let bytes: Vec<u8> = QUAD_VERTICES.iter().flat_map(|v| v.to_ne_bytes()).collect();
        let stride = FLOATS_PER_VERTEX * std::mem::size_of::<f32>() as i32;

        unsafe {
            let vao = gl.create_vertex_array().map_err(RenderError::gl)?;
            let vbo = match gl.create_buffer() {
                Ok(vbo) => vbo,
                Err(err) => {
                    gl.delete_vertex_array(vao);
                    return Err(RenderError::gl(err));
                }
            };

            gl.bind_vertex_array(Some(vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, &bytes, glow::STATIC_DRAW);

            gl.vertex_attrib_pointer_f32(0, 3, glow::FLOAT, false, stride, 0);
            gl.enable_vertex_attrib_array(0);
            gl.vertex_attrib_pointer_f32(
                1,
                2,
                glow::FLOAT,
                false,
                stride,
                3 * std::mem::size_of::<f32>() as i32,
            );
            gl.enable_vertex_attrib_array(1);

            gl.bind_vertex_array(None);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);

            Ok(Self { vao, vbo })
        }
    }

    pub fn draw(&self, gl: &glow::Context) {
        unsafe {
            gl.bind_vertex_array(Some(self.vao));
            gl.draw_arrays(glow::TRIANGLES, 0, QUAD_VERTICES.len() as i32 / FLOATS_PER_VERTEX);
            gl.bind_vertex_array(None);
        }
    }

    pub fn destroy(&self, gl: &glow::Context) {
        unsafe {
            gl.delete_vertex_array(self.vao);
            gl.delete_buffer(self.vbo);
        }
    }
}
