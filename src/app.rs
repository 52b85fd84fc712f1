//! The playground application core: the per-frame callbacks a window (or
//! headless) driver invokes, and the clock that feeds them.

use std::path::{Path, PathBuf};
use std::time::Instant;

use glam::Mat4;

use crate::camera::OrbitCamera;
use crate::config::{Args, ResourceKind, ResourcePaths};
use crate::math;
use crate::renderer::gltf::{import_model, upload_model, GpuModel};
use crate::renderer::{GpuBackend, SceneRenderer};
use crate::Error;

pub const FIELD_OF_VIEW_DEGREES: f32 = 60.0;
pub const NEAR_PLANE: f32 = 0.1;
pub const FAR_PLANE: f32 = 2000.0;

/// Callbacks driven once per frame by the window loop.
pub trait FrameHandler {
    fn on_init(&mut self, backend: &mut dyn GpuBackend) -> Result<(), Error>;
    /// `dt` is the time since the previous frame, in seconds.
    fn on_update(&mut self, backend: &mut dyn GpuBackend, dt: f32) -> Result<(), Error>;
    fn on_cleanup(&mut self, backend: &mut dyn GpuBackend);
}

/// Clamps a frame delta into `[0, max_time_step]`, so a stall doesn't turn
/// into one huge simulation step.
pub fn clamp_delta(dt: f32, max_time_step: f32) -> f32 {
    if dt.is_nan() {
        0.0
    } else {
        dt.clamp(0.0, max_time_step)
    }
}

/// Measures wall-clock time between frames.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last_frame: Instant,
    max_time_step: f32,
}

impl FrameClock {
    pub fn new(max_time_step: f32) -> FrameClock {
        FrameClock {
            last_frame: Instant::now(),
            max_time_step,
        }
    }

    /// Seconds since the previous tick (or since creation), clamped.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        clamp_delta(dt, self.max_time_step)
    }
}

struct LoadedModel {
    model: GpuModel,
    renderer: SceneRenderer,
}

/// Loads one model and orbits the camera around it.
pub struct Playground {
    model_path: PathBuf,
    camera: OrbitCamera,
    orbit_speed: f32,
    max_time_step: f32,
    aspect_ratio: f32,
    loaded: Option<LoadedModel>,
}

impl Playground {
    pub fn new(args: &Args, paths: &ResourcePaths) -> Playground {
        Playground {
            model_path: paths.resolve(ResourceKind::Common, &args.model),
            camera: OrbitCamera {
                distance: args.distance,
                ..OrbitCamera::default()
            },
            orbit_speed: args.orbit_speed,
            max_time_step: args.max_time_step,
            aspect_ratio: args.width as f32 / args.height.max(1) as f32,
            loaded: None,
        }
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    /// The uploaded model, between `on_init` and `on_cleanup`.
    pub fn model(&self) -> Option<&GpuModel> {
        self.loaded.as_ref().map(|loaded| &loaded.model)
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect_ratio = width as f32 / height.max(1) as f32;
    }

    pub fn projection(&self) -> Mat4 {
        math::perspective_reversed(
            FIELD_OF_VIEW_DEGREES.to_radians(),
            self.aspect_ratio,
            NEAR_PLANE,
            FAR_PLANE,
        )
    }
}

impl FrameHandler for Playground {
    fn on_init(&mut self, backend: &mut dyn GpuBackend) -> Result<(), Error> {
        // Reinitializing replaces the model, so release the old one first.
        self.on_cleanup(backend);
        let model = import_model(&self.model_path)?;
        let model = upload_model(model, backend)?;
        let renderer = match SceneRenderer::new(backend) {
            Ok(renderer) => renderer,
            Err(err) => {
                model.destroy(backend);
                return Err(err.into());
            }
        };
        self.loaded = Some(LoadedModel { model, renderer });
        Ok(())
    }

    fn on_update(&mut self, backend: &mut dyn GpuBackend, dt: f32) -> Result<(), Error> {
        let dt = clamp_delta(dt, self.max_time_step);
        self.camera.orbit(self.orbit_speed, dt);
        let projection = self.projection();
        if let Some(LoadedModel { model, renderer }) = &mut self.loaded {
            renderer.set_camera(backend, self.camera.view_matrix(), projection)?;
            renderer.render_model(backend, model, Mat4::IDENTITY)?;
        }
        Ok(())
    }

    fn on_cleanup(&mut self, backend: &mut dyn GpuBackend) {
        if let Some(LoadedModel { model, renderer }) = self.loaded.take() {
            renderer.destroy(backend);
            model.destroy(backend);
        }
    }
}

/// Drives `handler` for `frames` frames of `time_step` seconds each without
/// a window. Cleanup runs even if a frame fails.
pub fn run_headless(
    handler: &mut dyn FrameHandler,
    backend: &mut dyn GpuBackend,
    frames: u32,
    time_step: f32,
) -> Result<(), Error> {
    handler.on_init(backend)?;
    let result = (0..frames).try_for_each(|frame| {
        log::debug!("Headless frame {frame}");
        handler.on_update(backend, time_step)
    });
    handler.on_cleanup(backend);
    result
}
