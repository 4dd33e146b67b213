use glow::HasContext;

use crate::scene::EyeMatrices;
use crate::{RenderError, RenderResult};

pub const QUAD_VERTEX_SHADER: &str = r#"#version 330 core
layout (location = 0) in vec3 a_position;
layout (location = 1) in vec2 a_uv;

uniform mat4 u_model;
uniform mat4 u_view;
uniform mat4 u_projection;

out vec2 v_uv;

void main() {
    gl_Position = u_projection * u_view * u_model * vec4(a_position, 1.0);
    v_uv = a_uv;
}
"#;

pub const QUAD_FRAGMENT_SHADER: &str = r#"#version 330 core
in vec2 v_uv;
out vec4 frag_color;

uniform sampler2D u_image;

void main() {
    frag_color = texture(u_image, v_uv);
}
"#;

pub struct ShaderProgram {
    program: glow::Program,
    model: Option<glow::UniformLocation>,
    view: Option<glow::UniformLocation>,
    projection: Option<glow::UniformLocation>,
    image: Option<glow::UniformLocation>,
}

impl ShaderProgram {
    pub fn quad(gl: &glow::Context) -> RenderResult<Self> {
        Self::new(gl, QUAD_VERTEX_SHADER, QUAD_FRAGMENT_SHADER)
    }

    pub fn new(gl: &glow::Context, vertex_src: &str, fragment_src: &str) -> RenderResult<Self> {
        unsafe {
            let program = gl.create_program().map_err(RenderError::gl)?;

            let sources = [
                (glow::VERTEX_SHADER, vertex_src, "vertex"),
                (glow::FRAGMENT_SHADER, fragment_src, "fragment"),
            ];
            let mut shaders = Vec::with_capacity(sources.len());
            for (kind, source, name) in sources {
                let shader = gl.create_shader(kind).map_err(RenderError::gl)?;
                gl.shader_source(shader, source);
                gl.compile_shader(shader);
                if !gl.get_shader_compile_status(shader) {
                    let log = gl.get_shader_info_log(shader);
                    gl.delete_shader(shader);
                    for shader in shaders {
                        gl.delete_shader(shader);
                    }
                    gl.delete_program(program);
                    return Err(RenderError::gl(format!("{name} shader: {log}")));
                }
                gl.attach_shader(program, shader);
                shaders.push(shader);
            }

            gl.link_program(program);
            let linked = gl.get_program_link_status(program);
            for shader in shaders {
                gl.detach_shader(program, shader);
                gl.delete_shader(shader);
            }
            if !linked {
                let log = gl.get_program_info_log(program);
                gl.delete_program(program);
                return Err(RenderError::gl(format!("program link: {log}")));
            }

            Ok(Self {
                program,
                model: gl.get_uniform_location(program, "u_model"),
                view: gl.get_uniform_location(program, "u_view"),
                projection: gl.get_uniform_location(program, "u_projection"),
                image: gl.get_uniform_location(program, "u_image"),
            })
        }
    }

    /// Binds the program and uploads the eye's matrices. The image sampler reads unit 0.
    pub fn bind(&self, gl: &glow::Context, matrices: &EyeMatrices) {
        unsafe {
            gl.use_program(Some(self.program));
            gl.uniform_matrix_4_f32_slice(
                self.model.as_ref(),
                false,
                &matrices.model.to_cols_array(),
            );
            gl.uniform_matrix_4_f32_slice(self.view.as_ref(), false, &matrices.view.to_cols_array());
            gl.uniform_matrix_4_f32_slice(
                self.projection.as_ref(),
                false,
                &matrices.projection.to_cols_array(),
            );
            gl.uniform_1_i32(self.image.as_ref(), 0);
        }
    }

    pub fn destroy(&self, gl: &glow::Context) {
        unsafe {
            gl.delete_program(self.program);
        }
    }
}
