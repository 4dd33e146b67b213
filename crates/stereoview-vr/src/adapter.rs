use std::sync::Arc;

use crate::{
    types::{ControllerInput, EyePair, EyeView, VrTiming},
    VrResult,
};

pub trait VrRuntimeCallbacks: Send + Sync {
    // Runtime -> viewer
    fn on_views(&self, views: EyePair<EyeView>, timestamp_us: u64);
    fn on_vr_timing(&self, timing: VrTiming);
    fn on_controller_input(&self, input: ControllerInput);
}

pub trait VrRuntime: Send {
    fn start(&mut self, cb: Arc<dyn VrRuntimeCallbacks>) -> VrResult<()>;
    /// Signals the runtime thread to end its session and waits for it.
    fn stop(&mut self);
    fn is_running(&self) -> bool;
}
