//! Everything between a glTF file on disk and draw calls on the GPU.

mod backend;
mod draw_calls;
pub mod gl;
mod gl_backend;
pub mod gltf;
mod headless;
mod scene_renderer;

pub use backend::{
    BufferHandle, BufferUsage, FilterMode, GpuBackend, GpuResourceError, SamplerDesc,
    SamplerHandle, TextureHandle, WrapMode,
};
pub use draw_calls::DrawCall;
pub use gl_backend::GlBackend;
pub use headless::{HeadlessBackend, RecordedDraw};
pub use scene_renderer::{
    DrawUniforms, MaterialUniforms, SceneRenderer, ViewUniforms, BASE_COLOR_TEXTURE_UNIT,
    DRAW_BINDING, MATERIAL_BINDING, VIEW_BINDING,
};
