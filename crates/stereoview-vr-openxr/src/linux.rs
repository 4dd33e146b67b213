use std::ffi::{c_void, CString};
use std::num::NonZeroU32;
use std::ptr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

use glow::HasContext;
use openxr as xr;
use tracing::{debug, error, info, warn};
use x11::{glx, xlib};

use stereoview_render::{EyeProjection, EyeTarget, StereoRenderer};
use stereoview_vr::types::{Eye, EyePair, RuntimeInfo, VrTiming};
use stereoview_vr::{VrError, VrResult};

use crate::common::{choose_gl_swapchain_format, eye_views, refresh_changed, InputActions};
use crate::SharedState;

const VIEW_COUNT: usize = 2;
const VIEW_TYPE: xr::ViewConfigurationType = xr::ViewConfigurationType::PRIMARY_STEREO;
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(5);
const SWAPCHAIN_WAIT_NS: i64 = 5_000_000;

struct GlxContext {
    display: *mut xlib::Display,
    fb_config: glx::GLXFBConfig,
    visualid: u64,
    drawable: glx::GLXDrawable,
    context: glx::GLXContext,
}

impl GlxContext {
    /// Hidden-sized X11 window with a current GL context, as the OpenXR GL binding requires.
    unsafe fn new() -> VrResult<Self> {
        let display = xlib::XOpenDisplay(ptr::null());
        if display.is_null() {
            return Err(VrError::Runtime("XOpenDisplay failed".to_string()));
        }

        let screen = xlib::XDefaultScreen(display);
        let attrs = [
            glx::GLX_X_RENDERABLE,
            1,
            glx::GLX_DRAWABLE_TYPE,
            glx::GLX_WINDOW_BIT,
            glx::GLX_RENDER_TYPE,
            glx::GLX_RGBA_BIT,
            glx::GLX_X_VISUAL_TYPE,
            glx::GLX_TRUE_COLOR,
            glx::GLX_RED_SIZE,
            8,
            glx::GLX_GREEN_SIZE,
            8,
            glx::GLX_BLUE_SIZE,
            8,
            glx::GLX_ALPHA_SIZE,
            8,
            glx::GLX_DEPTH_SIZE,
            24,
            glx::GLX_STENCIL_SIZE,
            8,
            glx::GLX_DOUBLEBUFFER,
            1,
            0,
        ];

        let mut fbcount = 0;
        let fb_configs = glx::glXChooseFBConfig(display, screen, attrs.as_ptr(), &mut fbcount);
        if fb_configs.is_null() || fbcount == 0 {
            xlib::XCloseDisplay(display);
            return Err(VrError::Runtime("glXChooseFBConfig failed".to_string()));
        }
        let fb_config = *fb_configs;

        let visual_info = glx::glXGetVisualFromFBConfig(display, fb_config);
        if visual_info.is_null() {
            xlib::XFree(fb_configs as *mut _);
            xlib::XCloseDisplay(display);
            return Err(VrError::Runtime(
                "glXGetVisualFromFBConfig failed".to_string(),
            ));
        }
        let visualid = (*visual_info).visualid;

        let root = xlib::XDefaultRootWindow(display);
        let colormap = xlib::XCreateColormap(display, root, (*visual_info).visual, xlib::AllocNone);

        let mut swa: xlib::XSetWindowAttributes = std::mem::zeroed();
        swa.colormap = colormap;
        swa.event_mask = 0;
        let window = xlib::XCreateWindow(
            display,
            root,
            0,
            0,
            16,
            16,
            0,
            (*visual_info).depth,
            xlib::InputOutput as u32,
            (*visual_info).visual,
            xlib::CWColormap,
            &mut swa,
        );
        xlib::XStoreName(display, window, c"stereoview-vr".as_ptr());

        let context =
            glx::glXCreateNewContext(display, fb_config, glx::GLX_RGBA_TYPE, ptr::null_mut(), 1);
        if context.is_null() {
            xlib::XFree(visual_info as *mut _);
            xlib::XFree(fb_configs as *mut _);
            xlib::XDestroyWindow(display, window);
            xlib::XCloseDisplay(display);
            return Err(VrError::Runtime("glXCreateNewContext failed".to_string()));
        }

        if glx::glXMakeCurrent(display, window, context) == 0 {
            glx::glXDestroyContext(display, context);
            xlib::XFree(visual_info as *mut _);
            xlib::XFree(fb_configs as *mut _);
            xlib::XDestroyWindow(display, window);
            xlib::XCloseDisplay(display);
            return Err(VrError::Runtime("glXMakeCurrent failed".to_string()));
        }

        xlib::XFree(visual_info as *mut _);
        xlib::XFree(fb_configs as *mut _);

        Ok(Self {
            display,
            fb_config,
            visualid,
            drawable: window,
            context,
        })
    }

    fn load_gl(&self) -> glow::Context {
        unsafe {
            glow::Context::from_loader_function(|name| {
                let Ok(name) = CString::new(name) else {
                    return ptr::null();
                };
                match glx::glXGetProcAddress(name.as_ptr() as *const u8) {
                    Some(f) => f as *const c_void,
                    None => ptr::null(),
                }
            })
        }
    }
}

impl Drop for GlxContext {
    fn drop(&mut self) {
        unsafe {
            glx::glXMakeCurrent(self.display, 0, ptr::null_mut());
            glx::glXDestroyContext(self.display, self.context);
            xlib::XDestroyWindow(self.display, self.drawable);
            xlib::XCloseDisplay(self.display);
        }
    }
}

fn native_texture(name: u32) -> Option<glow::Texture> {
    NonZeroU32::new(name).map(glow::NativeTexture)
}

fn app_info() -> xr::ApplicationInfo<'static> {
    xr::ApplicationInfo {
        application_name: "Stereoview",
        application_version: 1,
        engine_name: "Stereoview",
        engine_version: 1,
        api_version: xr::Version::new(1, 0, 0),
    }
}

/// Loader, GL extension and HMD system, without opening a session.
fn open_instance() -> VrResult<(xr::Instance, xr::SystemId)> {
    let entry = unsafe { xr::Entry::load() }
        .map_err(|e| VrError::Unavailable(format!("OpenXR load failed: {e:?}")))?;
    let available_exts = entry
        .enumerate_extensions()
        .map_err(|e| VrError::Runtime(format!("OpenXR ext enumerate: {e:?}")))?;
    if !available_exts.khr_opengl_enable {
        return Err(VrError::Unavailable(
            "OpenXR KHR_opengl_enable not available".to_string(),
        ));
    }
    let mut exts = xr::ExtensionSet::default();
    exts.khr_opengl_enable = true;

    let instance = entry
        .create_instance(&app_info(), &exts, &[])
        .map_err(|e| VrError::Runtime(format!("OpenXR create_instance: {e:?}")))?;
    let system = instance
        .system(xr::FormFactor::HEAD_MOUNTED_DISPLAY)
        .map_err(|e| match e {
            xr::sys::Result::ERROR_FORM_FACTOR_UNAVAILABLE => {
                VrError::Unavailable("HMD not found".to_string())
            }
            other => VrError::Runtime(format!("OpenXR system: {other:?}")),
        })?;
    Ok((instance, system))
}

fn recommended_eye_size(instance: &xr::Instance, system: xr::SystemId) -> VrResult<(u32, u32)> {
    let views = instance
        .enumerate_view_configuration_views(system, VIEW_TYPE)
        .map_err(|e| VrError::Runtime(format!("OpenXR view configuration: {e:?}")))?;
    let view = views
        .first()
        .ok_or_else(|| VrError::Runtime("OpenXR reported no stereo views".to_string()))?;
    Ok((
        view.recommended_image_rect_width,
        view.recommended_image_rect_height,
    ))
}

pub fn probe() -> VrResult<RuntimeInfo> {
    let (instance, system) = open_instance()?;
    let runtime_name = instance
        .properties()
        .map(|p| p.runtime_name)
        .unwrap_or_else(|_| "unknown-runtime".to_string());
    let system_name = instance
        .system_properties(system)
        .map(|p| p.system_name)
        .unwrap_or_else(|_| "unknown-system".to_string());
    let (width, height) = recommended_eye_size(&instance, system)?;
    Ok(RuntimeInfo {
        runtime_name,
        system_name,
        recommended_eye_width: width,
        recommended_eye_height: height,
    })
}

pub fn spawn(state: Arc<SharedState>) -> VrResult<JoinHandle<()>> {
    thread::Builder::new()
        .name("stereoview-vr-linux".to_string())
        .spawn(move || {
            stereoview_vr::set_runtime_status("VR: starting (OpenXR)");
            match run(state) {
                Ok(()) => {
                    info!("OpenXR runtime stopped");
                    stereoview_vr::set_runtime_status("VR: runtime stopped");
                }
                Err(err) => {
                    error!("OpenXR runtime failed: {err}");
                    stereoview_vr::set_runtime_status(format!("VR: runtime failed: {err}"));
                }
            }
        })
        .map_err(|e| VrError::Runtime(format!("thread spawn: {e}")))
}

fn log_swapchain_validation(
    instance: &xr::Instance,
    available: &[u32],
    selected: u32,
    selected_name: &str,
    selected_srgb: bool,
) {
    let runtime = instance.properties().ok();
    let runtime_name = runtime
        .as_ref()
        .map(|p| p.runtime_name.as_str())
        .unwrap_or("unknown-runtime");
    let gamma_mode = if selected_srgb {
        "sRGB (runtime gamma conversion)"
    } else {
        "linear UNORM (passthrough)"
    };
    info!(
        runtime = runtime_name,
        selected = selected_name,
        format = format_args!("0x{selected:X}"),
        gamma_mode,
        ?available,
        "OpenXR swapchain format selected"
    );
}

/// Swapchains plus the depth targets that wrap their images.
struct EyeSwapchains {
    swapchains: [xr::Swapchain<xr::OpenGL>; VIEW_COUNT],
    images: [Vec<u32>; VIEW_COUNT],
    targets: [EyeTarget; VIEW_COUNT],
    width: i32,
    height: i32,
}

impl EyeSwapchains {
    fn new(
        instance: &xr::Instance,
        session: &xr::Session<xr::OpenGL>,
        gl: &glow::Context,
        width: u32,
        height: u32,
    ) -> VrResult<Self> {
        let formats = session
            .enumerate_swapchain_formats()
            .map_err(|e| VrError::Runtime(format!("OpenXR swapchain formats: {e:?}")))?;
        let (format, format_name, format_srgb) = choose_gl_swapchain_format(&formats);
        log_swapchain_validation(instance, &formats, format, format_name, format_srgb);

        let create_info = xr::SwapchainCreateInfo {
            create_flags: xr::SwapchainCreateFlags::EMPTY,
            usage_flags: xr::SwapchainUsageFlags::COLOR_ATTACHMENT,
            format,
            sample_count: 1,
            width,
            height,
            face_count: 1,
            array_size: 1,
            mip_count: 1,
        };
        let sc0 = session
            .create_swapchain(&create_info)
            .map_err(|e| VrError::Runtime(format!("OpenXR swapchain: {e:?}")))?;
        let sc1 = session
            .create_swapchain(&create_info)
            .map_err(|e| VrError::Runtime(format!("OpenXR swapchain: {e:?}")))?;
        let imgs0 = sc0
            .enumerate_images()
            .map_err(|e| VrError::Runtime(format!("OpenXR swapchain images: {e:?}")))?;
        let imgs1 = sc1
            .enumerate_images()
            .map_err(|e| VrError::Runtime(format!("OpenXR swapchain images: {e:?}")))?;

        let runtime_err = |e| VrError::Runtime(format!("eye target: {e}"));
        let mut left = EyeTarget::new(gl, width, height).map_err(runtime_err)?;
        let right = match EyeTarget::new(gl, width, height) {
            Ok(target) => target,
            Err(err) => {
                left.destroy(gl);
                return Err(runtime_err(err));
            }
        };

        debug!(width, height, images = imgs0.len(), "OpenXR swapchains created");
        Ok(Self {
            swapchains: [sc0, sc1],
            images: [imgs0, imgs1],
            targets: [left, right],
            width: width as i32,
            height: height as i32,
        })
    }

    fn destroy(&mut self, gl: &glow::Context) {
        for target in self.targets.iter_mut() {
            target.destroy(gl);
        }
    }
}

fn run(state: Arc<SharedState>) -> VrResult<()> {
    let glx = unsafe { GlxContext::new()? };
    let gl = glx.load_gl();
    let mut renderer = StereoRenderer::new(&gl)
        .map_err(|e| VrError::Runtime(format!("renderer init: {e}")))?;

    let mut swapchains: Option<EyeSwapchains> = None;
    let result = run_session(&state, &glx, &gl, &mut renderer, &mut swapchains);

    if let Some(mut swapchains) = swapchains {
        swapchains.destroy(&gl);
    }
    renderer.destroy(&gl);
    result
}

fn run_session(
    state: &SharedState,
    glx: &GlxContext,
    gl: &glow::Context,
    renderer: &mut StereoRenderer,
    swapchains: &mut Option<EyeSwapchains>,
) -> VrResult<()> {
    let (instance, system) = open_instance()?;
    let (recommended_width, recommended_height) = recommended_eye_size(&instance, system)?;
    let (eye_width, eye_height) = match state.config.eye_size {
        Some(size) => (size.width, size.height),
        None => (recommended_width, recommended_height),
    };

    // The runtime refuses sessions whose graphics requirements were never queried.
    let reqs = instance
        .graphics_requirements::<xr::OpenGL>(system)
        .map_err(|e| VrError::Runtime(format!("OpenXR GL requirements: {e:?}")))?;
    debug!(
        min = ?reqs.min_api_version_supported,
        max = ?reqs.max_api_version_supported,
        "OpenXR GL requirements"
    );

    let create_info = xr::opengl::SessionCreateInfo::Xlib {
        x_display: glx.display as *mut _,
        visualid: glx.visualid as u32,
        glx_fb_config: glx.fb_config as *mut _,
        glx_drawable: glx.drawable,
        glx_context: glx.context as *mut _,
    };

    let (session, mut frame_waiter, mut frame_stream) = unsafe {
        instance
            .create_session::<xr::OpenGL>(system, &create_info)
            .map_err(|e| VrError::Runtime(format!("OpenXR create_session: {e:?}")))?
    };
    stereoview_vr::set_runtime_status("VR: OpenXR session active");
    let mut input_actions = match InputActions::new(&instance, &session) {
        Ok(actions) => Some(actions),
        Err(err) => {
            warn!("controller input disabled: {err}");
            None
        }
    };

    let reference_space = session
        .create_reference_space(
            xr::ReferenceSpaceType::LOCAL,
            xr::Posef {
                orientation: xr::Quaternionf {
                    x: 0.0,
                    y: 0.0,
                    z: 0.0,
                    w: 1.0,
                },
                position: xr::Vector3f {
                    x: 0.0,
                    y: 0.0,
                    z: 0.0,
                },
            },
        )
        .map_err(|e| VrError::Runtime(format!("OpenXR reference space: {e:?}")))?;

    let mut event_buffer = xr::EventDataBuffer::new();
    let mut session_running = false;
    let mut last_refresh_hz: Option<f32> = None;

    loop {
        while let Some(event) = instance
            .poll_event(&mut event_buffer)
            .map_err(|e| VrError::Runtime(format!("OpenXR poll_event: {e:?}")))?
        {
            if let xr::Event::SessionStateChanged(e) = event {
                debug!(state = ?e.state(), "OpenXR session state changed");
                match e.state() {
                    xr::SessionState::READY => {
                        session.begin(VIEW_TYPE).map_err(|e| {
                            VrError::Runtime(format!("OpenXR session begin: {e:?}"))
                        })?;
                        session_running = true;
                    }
                    xr::SessionState::STOPPING => {
                        session
                            .end()
                            .map_err(|e| VrError::Runtime(format!("OpenXR session end: {e:?}")))?;
                        session_running = false;
                    }
                    xr::SessionState::EXITING | xr::SessionState::LOSS_PENDING => {
                        return Ok(());
                    }
                    _ => {}
                }
            }
        }

        if state.stop.load(Ordering::Relaxed) {
            if session_running {
                let _ = session.end();
            }
            return Ok(());
        }

        if !session_running {
            thread::sleep(IDLE_POLL_INTERVAL);
            continue;
        }

        let frame_state = frame_waiter
            .wait()
            .map_err(|e| VrError::Runtime(format!("OpenXR wait: {e:?}")))?;
        frame_stream
            .begin()
            .map_err(|e| VrError::Runtime(format!("OpenXR begin: {e:?}")))?;

        let (_view_state, views) = session
            .locate_views(VIEW_TYPE, frame_state.predicted_display_time, &reference_space)
            .map_err(|e| VrError::Runtime(format!("OpenXR locate_views: {e:?}")))?;
        let located = eye_views(&views);

        if let Some(located) = located {
            let timestamp_us = (frame_state.predicted_display_time.as_nanos() / 1_000) as u64;
            state.callbacks.on_views(located, timestamp_us);
        }
        if let Some(actions) = input_actions.as_mut() {
            match actions.poll(&session) {
                Ok(inputs) => {
                    for input in inputs {
                        state.callbacks.on_controller_input(input);
                    }
                }
                Err(err) => debug!("controller poll failed: {err}"),
            }
        }

        let period_ns = frame_state.predicted_display_period.as_nanos();
        if period_ns > 0 {
            let refresh_hz = 1_000_000_000.0 / period_ns as f32;
            if refresh_changed(last_refresh_hz, refresh_hz) {
                state.callbacks.on_vr_timing(VrTiming { refresh_hz });
                last_refresh_hz = Some(refresh_hz);
            }
        }

        if swapchains.is_none() {
            *swapchains = Some(EyeSwapchains::new(
                &instance, &session, gl, eye_width, eye_height,
            )?);
        }

        if let Err(err) = renderer.sync_image(gl, &state.images) {
            warn!("image upload failed: {err}");
        }

        let (Some(chains), Some(located), true) =
            (swapchains.as_mut(), located, frame_state.should_render)
        else {
            frame_stream
                .end(
                    frame_state.predicted_display_time,
                    xr::EnvironmentBlendMode::OPAQUE,
                    &[],
                )
                .map_err(|e| VrError::Runtime(format!("OpenXR end: {e:?}")))?;
            continue;
        };

        let scene = state.scene_snapshot();
        let clear_color = scene.settings().clear_color;

        for (i, eye) in Eye::BOTH.into_iter().enumerate() {
            let image_index = chains.swapchains[i]
                .acquire_image()
                .map_err(|e| VrError::Runtime(format!("OpenXR acquire: {e:?}")))?;
            chains.swapchains[i]
                .wait_image(xr::Duration::from_nanos(SWAPCHAIN_WAIT_NS))
                .map_err(|e| VrError::Runtime(format!("OpenXR wait_image: {e:?}")))?;

            let view = located[eye];
            let matrices =
                scene.eye_matrices(eye, EyeProjection::Frustum(view.fov), Some(&view.pose));
            let rendered = match native_texture(chains.images[i][image_index as usize]) {
                Some(texture) => renderer
                    .render_eye(gl, &chains.targets[i], texture, eye, &matrices, clear_color)
                    .map_err(|e| e.to_string()),
                None => Err("swapchain returned texture 0".to_string()),
            };
            if let Err(err) = rendered {
                warn!(eye = eye.name(), "eye render failed: {err}");
            }

            chains.swapchains[i]
                .release_image()
                .map_err(|e| VrError::Runtime(format!("OpenXR release: {e:?}")))?;
        }
        unsafe {
            gl.flush();
        }

        let layer_views = EyePair::from_fn(|eye| {
            let i = eye.index();
            xr::CompositionLayerProjectionView::new()
                .pose(views[i].pose)
                .fov(views[i].fov)
                .sub_image(
                    xr::SwapchainSubImage::new()
                        .swapchain(&chains.swapchains[i])
                        .image_array_index(0)
                        .image_rect(xr::Rect2Di {
                            offset: xr::Offset2Di { x: 0, y: 0 },
                            extent: xr::Extent2Di {
                                width: chains.width,
                                height: chains.height,
                            },
                        }),
                )
        });
        let layer_views = [layer_views.left, layer_views.right];

        let layer = xr::CompositionLayerProjection::new()
            .space(&reference_space)
            .views(&layer_views);
        let layers: [&xr::CompositionLayerBase<xr::OpenGL>; 1] = [&layer];

        frame_stream
            .end(
                frame_state.predicted_display_time,
                xr::EnvironmentBlendMode::OPAQUE,
                &layers,
            )
            .map_err(|e| VrError::Runtime(format!("OpenXR end: {e:?}")))?;
    }
}
