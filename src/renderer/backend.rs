//! The interface every graphics API implementation provides to the model
//! uploader and the scene renderer.

use thiserror::Error;

use crate::renderer::draw_calls::DrawCall;

#[derive(Error, Debug)]
pub enum GpuResourceError {
    #[error("Failed to create texture: {0}")]
    TextureCreationFailed(String),
    #[error("Failed to create sampler: {0}")]
    SamplerCreationFailed(String),
    #[error("Failed to create buffer: {0}")]
    BufferCreationFailed(String),
    #[error("Failed to upload buffer data: {0}")]
    UploadFailed(String),
    #[error("Failed to create shader: {0}")]
    ShaderCreationFailed(String),
}

/// Handle to a 2D RGBA8 texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub(crate) u32);

/// Handle to a sampler object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerHandle(pub(crate) u32);

/// Handle to a GPU buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    Vertex,
    Index,
    Uniform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterMode {
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
}

impl FilterMode {
    /// Maps a glTF (OpenGL enum) filter value.
    pub fn from_gl(value: u32) -> Option<FilterMode> {
        match value {
            9728 => Some(FilterMode::Nearest),
            9729 => Some(FilterMode::Linear),
            9984 => Some(FilterMode::NearestMipmapNearest),
            9985 => Some(FilterMode::LinearMipmapNearest),
            9986 => Some(FilterMode::NearestMipmapLinear),
            9987 => Some(FilterMode::LinearMipmapLinear),
            _ => None,
        }
    }

    pub fn uses_mipmaps(self) -> bool {
        !matches!(self, FilterMode::Nearest | FilterMode::Linear)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WrapMode {
    Repeat,
    ClampToEdge,
    MirroredRepeat,
}

impl WrapMode {
    /// Maps a glTF (OpenGL enum) wrap value.
    pub fn from_gl(value: u32) -> Option<WrapMode> {
        match value {
            10497 => Some(WrapMode::Repeat),
            33071 => Some(WrapMode::ClampToEdge),
            33648 => Some(WrapMode::MirroredRepeat),
            _ => None,
        }
    }
}

/// Fully resolved sampler state. glTF leaves every field optional;
/// [`SamplerDesc::from_gltf`] substitutes the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerDesc {
    pub mag_filter: FilterMode,
    pub min_filter: FilterMode,
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
    pub wrap_r: WrapMode,
}

impl Default for SamplerDesc {
    fn default() -> Self {
        SamplerDesc {
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::LinearMipmapLinear,
            wrap_s: WrapMode::Repeat,
            wrap_t: WrapMode::Repeat,
            wrap_r: WrapMode::Repeat,
        }
    }
}

impl SamplerDesc {
    /// Builds a sampler from raw glTF values, where `None` and `0` both mean
    /// "unset". Returns the offending value if one isn't a valid enum. The
    /// third wrap axis is always repeat.
    pub fn from_gltf(
        mag_filter: Option<u32>,
        min_filter: Option<u32>,
        wrap_s: Option<u32>,
        wrap_t: Option<u32>,
    ) -> Result<SamplerDesc, u32> {
        let defaults = SamplerDesc::default();
        let set = |value: Option<u32>| value.filter(|&v| v != 0);
        let mag_filter = match set(mag_filter) {
            Some(v) => FilterMode::from_gl(v)
                .filter(|mode| !mode.uses_mipmaps())
                .ok_or(v)?,
            None => defaults.mag_filter,
        };
        let min_filter = match set(min_filter) {
            Some(v) => FilterMode::from_gl(v).ok_or(v)?,
            None => defaults.min_filter,
        };
        let wrap = |value: Option<u32>| match set(value) {
            Some(v) => WrapMode::from_gl(v).ok_or(v),
            None => Ok(WrapMode::Repeat),
        };
        Ok(SamplerDesc {
            mag_filter,
            min_filter,
            wrap_s: wrap(wrap_s)?,
            wrap_t: wrap(wrap_t)?,
            wrap_r: WrapMode::Repeat,
        })
    }
}

/// The capabilities the core needs from a graphics API. Creation and upload
/// failures are reported; binds and draws are fire-and-forget like the
/// underlying APIs.
pub trait GpuBackend {
    /// Creates a 2D texture from tightly packed RGBA8 pixels.
    fn create_texture_2d(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
    ) -> Result<TextureHandle, GpuResourceError>;

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<SamplerHandle, GpuResourceError>;

    /// Creates a buffer of `size` bytes with unspecified contents.
    fn create_buffer(
        &mut self,
        size: usize,
        usage: BufferUsage,
    ) -> Result<BufferHandle, GpuResourceError>;

    fn upload_buffer_region(
        &mut self,
        buffer: BufferHandle,
        offset: usize,
        data: &[u8],
    ) -> Result<(), GpuResourceError>;

    /// Makes `size` bytes of `buffer` starting at `offset` visible to shaders
    /// as uniform block `slot`.
    fn bind_uniform_block(&mut self, slot: u32, buffer: BufferHandle, offset: usize, size: usize);

    /// Selects the vertex and index buffers subsequent draws read from.
    fn bind_geometry(&mut self, vertex_buffer: BufferHandle, index_buffer: BufferHandle);

    /// Binds a texture and sampler to a texture unit. `None` unbinds.
    fn bind_texture(
        &mut self,
        unit: u32,
        texture: Option<TextureHandle>,
        sampler: Option<SamplerHandle>,
    );

    /// Draws an indexed triangle list with 32-bit indices.
    fn draw_indexed(&mut self, draw_call: DrawCall);

    fn destroy_texture(&mut self, texture: TextureHandle);
    fn destroy_sampler(&mut self, sampler: SamplerHandle);
    fn destroy_buffer(&mut self, buffer: BufferHandle);
}
