use std::sync::Arc;

use anyhow::{bail, Result};
use stereoview_common::Dimensions;
use stereoview_vr::{VrError, VrRuntime};
use stereoview_vr_openxr::{OpenXrRuntime, RuntimeConfig};
use tracing::{info, warn};

use crate::config::VrMode;
use crate::state::{ViewerCallbacks, ViewerState};

/// Probes for a headset according to `mode` and starts the runtime thread.
///
/// Returns `None` when the viewer should run as a desktop preview only.
pub fn start(
    mode: VrMode,
    state: &Arc<ViewerState>,
    eye_size: Option<Dimensions>,
) -> Result<Option<OpenXrRuntime>> {
    if mode == VrMode::Off {
        stereoview_vr::set_runtime_status("VR: disabled");
        return Ok(None);
    }

    let info = match stereoview_vr_openxr::probe() {
        Ok(info) => info,
        Err(err) => return fallback(mode, err),
    };
    info!(
        runtime = %info.runtime_name,
        system = %info.system_name,
        recommended = %format_args!("{}x{}", info.recommended_eye_width, info.recommended_eye_height),
        "headset found"
    );

    let mut runtime = OpenXrRuntime::new(
        state.scene.clone(),
        state.images.clone(),
        RuntimeConfig { eye_size },
    );
    match runtime.start(Arc::new(ViewerCallbacks::new(state.clone()))) {
        Ok(()) => Ok(Some(runtime)),
        Err(err) => fallback(mode, err),
    }
}

fn fallback(mode: VrMode, err: VrError) -> Result<Option<OpenXrRuntime>> {
    if mode == VrMode::Required {
        bail!("HMD not found: {err}");
    }
    warn!("HMD not found, running desktop preview only: {err}");
    stereoview_vr::set_runtime_status("VR: HMD not found");
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stereoview_render::StereoScene;

    #[test]
    fn off_never_probes() {
        let state = Arc::new(ViewerState::new(StereoScene::default()));
        assert!(start(VrMode::Off, &state, None).unwrap().is_none());
    }

    #[test]
    fn required_turns_probe_failure_into_error() {
        let err = VrError::Unavailable("no runtime".to_string());
        let msg = fallback(VrMode::Required, err).unwrap_err().to_string();
        assert!(msg.contains("HMD not found"));

        let err = VrError::Unavailable("no runtime".to_string());
        assert!(fallback(VrMode::Auto, err).unwrap().is_none());
    }
}
