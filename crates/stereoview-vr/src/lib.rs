#![forbid(unsafe_code)]

pub mod adapter;
pub mod status;
pub mod types;

pub use adapter::{VrRuntime, VrRuntimeCallbacks};
pub use status::{runtime_status, set_runtime_status};
pub use types::{
    ControllerInput, Eye, EyePair, EyeView, Fov, Hand, Pose, RuntimeInfo, VrTiming,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VrError {
    #[error("runtime unavailable: {0}")]
    Unavailable(String),
    #[error("runtime error: {0}")]
    Runtime(String),
}

pub type VrResult<T> = Result<T, VrError>;
