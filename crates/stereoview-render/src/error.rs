use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("GL error: {0}")]
    Gl(String),
    #[error("image error: {0}")]
    Image(String),
}

impl RenderError {
    pub fn gl(msg: impl std::fmt::Display) -> Self {
        Self::Gl(msg.to_string())
    }

    pub fn image(msg: impl std::fmt::Display) -> Self {
        Self::Image(msg.to_string())
    }
}

pub type RenderResult<T> = Result<T, RenderError>;
