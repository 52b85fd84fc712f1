//! A [`GpuBackend`] that keeps every resource in memory and records draws
//! instead of rasterizing them. Drives the renderer without a window or GPU.

use std::collections::{BTreeMap, HashMap};

use bytemuck::Pod;

use crate::renderer::backend::{
    BufferHandle, BufferUsage, GpuBackend, GpuResourceError, SamplerDesc, SamplerHandle,
    TextureHandle,
};
use crate::renderer::draw_calls::DrawCall;

#[derive(Debug)]
struct Texture {
    width: u32,
    height: u32,
}

#[derive(Debug)]
struct Buffer {
    usage: BufferUsage,
    data: Vec<u8>,
}

/// A draw as seen by the backend, with a copy of the uniform data bound to
/// each slot at the time of the draw.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDraw {
    pub draw_call: DrawCall,
    pub vertex_buffer: BufferHandle,
    pub index_buffer: BufferHandle,
    /// Texture and sampler bound to unit 0.
    pub texture: Option<TextureHandle>,
    pub sampler: Option<SamplerHandle>,
    pub uniform_blocks: BTreeMap<u32, Vec<u8>>,
    /// The vertex indices fetched by the draw, base vertex applied.
    pub vertices: Vec<u32>,
}

impl RecordedDraw {
    /// Reads the uniform block bound to `slot` as a `T`.
    pub fn uniform_block<T: Pod>(&self, slot: u32) -> Option<T> {
        let bytes = self.uniform_blocks.get(&slot)?;
        bytemuck::try_pod_read_unaligned(bytes.get(..std::mem::size_of::<T>())?).ok()
    }
}

#[derive(Debug, Default)]
pub struct HeadlessBackend {
    next_handle: u32,
    textures: HashMap<u32, Texture>,
    samplers: HashMap<u32, SamplerDesc>,
    buffers: HashMap<u32, Buffer>,
    uniform_blocks: BTreeMap<u32, (BufferHandle, usize, usize)>,
    geometry: Option<(BufferHandle, BufferHandle)>,
    bound_textures: HashMap<u32, (Option<TextureHandle>, Option<SamplerHandle>)>,
    draws: Vec<RecordedDraw>,
    resource_limit: Option<usize>,
}

impl HeadlessBackend {
    pub fn new() -> HeadlessBackend {
        HeadlessBackend::default()
    }

    /// A backend whose resource creation fails once `limit` resources are
    /// alive, for exercising out-of-memory paths.
    pub fn with_resource_limit(limit: usize) -> HeadlessBackend {
        HeadlessBackend {
            resource_limit: Some(limit),
            ..HeadlessBackend::default()
        }
    }

    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&buffer.0).map(|buffer| &buffer.data[..])
    }

    pub fn buffer_usage(&self, buffer: BufferHandle) -> Option<BufferUsage> {
        self.buffers.get(&buffer.0).map(|buffer| buffer.usage)
    }

    pub fn texture_size(&self, texture: TextureHandle) -> Option<(u32, u32)> {
        self.textures
            .get(&texture.0)
            .map(|texture| (texture.width, texture.height))
    }

    pub fn sampler_desc(&self, sampler: SamplerHandle) -> Option<&SamplerDesc> {
        self.samplers.get(&sampler.0)
    }

    pub fn draws(&self) -> &[RecordedDraw] {
        &self.draws
    }

    pub fn clear_draws(&mut self) {
        self.draws.clear();
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn live_samplers(&self) -> usize {
        self.samplers.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_resources(&self) -> usize {
        self.live_textures() + self.live_samplers() + self.live_buffers()
    }

    fn allocate_handle(&mut self, what: &str) -> Result<u32, String> {
        if let Some(limit) = self.resource_limit {
            if self.live_resources() >= limit {
                return Err(format!("{what} would exceed the limit of {limit} resources"));
            }
        }
        self.next_handle += 1;
        Ok(self.next_handle)
    }

    fn fetched_vertices(&self, draw_call: &DrawCall, index_buffer: BufferHandle) -> Vec<u32> {
        let Some(buffer) = self.buffers.get(&index_buffer.0) else {
            return Vec::new();
        };
        let start = draw_call.index_byte_offset;
        let end = start + draw_call.index_count as usize * 4;
        let Some(bytes) = buffer.data.get(start..end) else {
            log::warn!("draw reads indices {start}..{end} past the end of the index buffer");
            return Vec::new();
        };
        bytes
            .chunks_exact(4)
            .map(|index| {
                let index = u32::from_le_bytes([index[0], index[1], index[2], index[3]]);
                (index as i64 + draw_call.base_vertex as i64) as u32
            })
            .collect()
    }
}

impl GpuBackend for HeadlessBackend {
    fn create_texture_2d(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
    ) -> Result<TextureHandle, GpuResourceError> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(GpuResourceError::TextureCreationFailed(format!(
                "{width}x{height} texture needs {expected} bytes, got {}",
                pixels.len()
            )));
        }
        let handle = self
            .allocate_handle("texture")
            .map_err(GpuResourceError::TextureCreationFailed)?;
        self.textures.insert(handle, Texture { width, height });
        Ok(TextureHandle(handle))
    }

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<SamplerHandle, GpuResourceError> {
        let handle = self
            .allocate_handle("sampler")
            .map_err(GpuResourceError::SamplerCreationFailed)?;
        self.samplers.insert(handle, *desc);
        Ok(SamplerHandle(handle))
    }

    fn create_buffer(
        &mut self,
        size: usize,
        usage: BufferUsage,
    ) -> Result<BufferHandle, GpuResourceError> {
        let handle = self
            .allocate_handle("buffer")
            .map_err(GpuResourceError::BufferCreationFailed)?;
        let data = vec![0; size];
        self.buffers.insert(handle, Buffer { usage, data });
        Ok(BufferHandle(handle))
    }

    fn upload_buffer_region(
        &mut self,
        buffer: BufferHandle,
        offset: usize,
        data: &[u8],
    ) -> Result<(), GpuResourceError> {
        let target = self.buffers.get_mut(&buffer.0).ok_or_else(|| {
            GpuResourceError::UploadFailed(format!("unknown buffer {buffer:?}"))
        })?;
        let size = target.data.len();
        let region = offset
            .checked_add(data.len())
            .and_then(|end| target.data.get_mut(offset..end))
            .ok_or_else(|| {
                GpuResourceError::UploadFailed(format!(
                    "{} bytes at offset {offset} overflow a {size} byte buffer",
                    data.len()
                ))
            })?;
        region.copy_from_slice(data);
        Ok(())
    }

    fn bind_uniform_block(&mut self, slot: u32, buffer: BufferHandle, offset: usize, size: usize) {
        self.uniform_blocks.insert(slot, (buffer, offset, size));
    }

    fn bind_geometry(&mut self, vertex_buffer: BufferHandle, index_buffer: BufferHandle) {
        self.geometry = Some((vertex_buffer, index_buffer));
    }

    fn bind_texture(
        &mut self,
        unit: u32,
        texture: Option<TextureHandle>,
        sampler: Option<SamplerHandle>,
    ) {
        self.bound_textures.insert(unit, (texture, sampler));
    }

    fn draw_indexed(&mut self, draw_call: DrawCall) {
        let Some((vertex_buffer, index_buffer)) = self.geometry else {
            log::warn!("draw without bound geometry ignored");
            return;
        };
        let uniform_blocks = self
            .uniform_blocks
            .iter()
            .filter_map(|(&slot, &(buffer, offset, size))| {
                let data = self.buffers.get(&buffer.0)?.data.get(offset..offset + size)?;
                Some((slot, data.to_vec()))
            })
            .collect();
        let (texture, sampler) = self.bound_textures.get(&0).copied().unwrap_or_default();
        let vertices = self.fetched_vertices(&draw_call, index_buffer);
        self.draws.push(RecordedDraw {
            draw_call,
            vertex_buffer,
            index_buffer,
            texture,
            sampler,
            uniform_blocks,
            vertices,
        });
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        if self.textures.remove(&texture.0).is_none() {
            log::warn!("destroying unknown texture {texture:?}");
        }
    }

    fn destroy_sampler(&mut self, sampler: SamplerHandle) {
        if self.samplers.remove(&sampler.0).is_none() {
            log::warn!("destroying unknown sampler {sampler:?}");
        }
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        if self.buffers.remove(&buffer.0).is_none() {
            log::warn!("destroying unknown buffer {buffer:?}");
        }
    }
}
