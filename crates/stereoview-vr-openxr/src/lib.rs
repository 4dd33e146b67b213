use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use stereoview_common::Dimensions;
use stereoview_render::{ImageSlot, StereoScene};
use stereoview_vr::{RuntimeInfo, VrError, VrResult, VrRuntime, VrRuntimeCallbacks};
use tracing::{info, warn};

pub mod common;

#[cfg(target_os = "linux")]
pub mod linux;

#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeConfig {
    /// Per-eye swapchain size; the runtime's recommendation when `None`.
    pub eye_size: Option<Dimensions>,
}

pub struct SharedState {
    pub callbacks: Arc<dyn VrRuntimeCallbacks>,
    pub scene: Arc<Mutex<StereoScene>>,
    pub images: Arc<ImageSlot>,
    pub config: RuntimeConfig,
    pub stop: AtomicBool,
}

impl SharedState {
    pub fn new(
        callbacks: Arc<dyn VrRuntimeCallbacks>,
        scene: Arc<Mutex<StereoScene>>,
        images: Arc<ImageSlot>,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            callbacks,
            scene,
            images,
            config,
            stop: AtomicBool::new(false),
        }
    }

    /// Copy of the scene, so the lock is not held while rendering.
    pub fn scene_snapshot(&self) -> StereoScene {
        match self.scene.lock() {
            Ok(scene) => scene.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

/// Checks for an OpenXR runtime with an HMD attached.
pub fn probe() -> VrResult<RuntimeInfo> {
    #[cfg(target_os = "linux")]
    return linux::probe();

    #[cfg(not(target_os = "linux"))]
    Err(VrError::Unavailable(
        "Unsupported platform for OpenXR".to_string(),
    ))
}

pub fn spawn_runtime(state: Arc<SharedState>) -> VrResult<JoinHandle<()>> {
    #[cfg(target_os = "linux")]
    return linux::spawn(state);

    #[cfg(not(target_os = "linux"))]
    {
        let _ = state;
        Err(VrError::Unavailable(
            "Unsupported platform for OpenXR".to_string(),
        ))
    }
}

/// [`VrRuntime`] backed by an OpenXR session on its own thread.
pub struct OpenXrRuntime {
    scene: Arc<Mutex<StereoScene>>,
    images: Arc<ImageSlot>,
    config: RuntimeConfig,
    state: Option<Arc<SharedState>>,
    handle: Option<JoinHandle<()>>,
}

impl OpenXrRuntime {
    pub fn new(
        scene: Arc<Mutex<StereoScene>>,
        images: Arc<ImageSlot>,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            scene,
            images,
            config,
            state: None,
            handle: None,
        }
    }
}

impl VrRuntime for OpenXrRuntime {
    fn start(&mut self, cb: Arc<dyn VrRuntimeCallbacks>) -> VrResult<()> {
        if self.is_running() {
            return Err(VrError::Runtime("runtime already started".to_string()));
        }
        let state = Arc::new(SharedState::new(
            cb,
            self.scene.clone(),
            self.images.clone(),
            self.config,
        ));
        let handle = spawn_runtime(state.clone())?;
        info!("OpenXR runtime thread started");
        self.state = Some(state);
        self.handle = Some(handle);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(state) = self.state.take() {
            state.stop.store(true, Ordering::Relaxed);
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("OpenXR runtime thread panicked");
            }
        }
    }

    fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for OpenXrRuntime {
    fn drop(&mut self) {
        self.stop();
    }
}
