//! A small glTF playground: imports glTF/GLB models, packs their geometry into
//! shared GPU buffers and draws the scene graph every frame while an orbit
//! camera circles the model.
//!
//! The GPU is reached only through [`renderer::GpuBackend`]. The OpenGL 3.3
//! implementation lives in [`renderer::GlBackend`], and
//! [`renderer::HeadlessBackend`] keeps everything in memory.

pub mod app;
pub mod camera;
pub mod config;
mod error;
pub mod math;
pub mod renderer;

pub use error::Error;
