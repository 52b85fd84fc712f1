use std::mem;

use super::{Material, Model, Scene, SceneNode, TextureRef, Vertex};
use crate::renderer::backend::{
    BufferHandle, BufferUsage, GpuBackend, GpuResourceError, SamplerHandle, TextureHandle,
};
use crate::renderer::draw_calls::DrawCall;

/// Where a submesh's geometry lives in the model's shared buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuSubMesh {
    pub material: Option<usize>,
    pub index_count: u32,
    pub vertex_count: u32,
    pub gpu_vertex_buffer_offset_in_bytes: usize,
    pub gpu_index_buffer_offset_in_bytes: usize,
    /// The vertex offset divided by the vertex size.
    pub base_vertex: i32,
}

impl GpuSubMesh {
    pub fn draw_call(&self) -> DrawCall {
        DrawCall {
            index_count: self.index_count,
            index_byte_offset: self.gpu_index_buffer_offset_in_bytes,
            base_vertex: self.base_vertex,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuMesh {
    pub name: Option<String>,
    pub sub_meshes: Vec<GpuSubMesh>,
}

/// A model whose textures, samplers and geometry live on the GPU. Must be
/// released with [`GpuModel::destroy`] on the backend that created it.
#[derive(Debug)]
pub struct GpuModel {
    pub textures: Vec<TextureHandle>,
    pub samplers: Vec<SamplerHandle>,
    pub materials: Vec<Material>,
    pub meshes: Vec<GpuMesh>,
    pub nodes: Vec<SceneNode>,
    pub scenes: Vec<Scene>,
    pub default_scene: Option<usize>,
    pub vertex_buffer: BufferHandle,
    pub index_buffer: BufferHandle,
    pub vertex_buffer_size: usize,
    pub index_buffer_size: usize,
}

impl GpuModel {
    /// The texture and sampler handles for a material texture reference.
    pub fn texture(&self, texture: TextureRef) -> (TextureHandle, Option<SamplerHandle>) {
        let sampler = texture.sampler.map(|sampler| self.samplers[sampler]);
        (self.textures[texture.texture], sampler)
    }

    /// Releases the shared buffers, then the samplers and textures.
    pub fn destroy(self, backend: &mut dyn GpuBackend) {
        log::debug!(
            "Destroying model with {} textures, {} samplers",
            self.textures.len(),
            self.samplers.len()
        );
        backend.destroy_buffer(self.vertex_buffer);
        backend.destroy_buffer(self.index_buffer);
        for sampler in self.samplers {
            backend.destroy_sampler(sampler);
        }
        for texture in self.textures {
            backend.destroy_texture(texture);
        }
    }
}

/// Everything created so far, so a failed upload can be rolled back.
#[derive(Default)]
struct Created {
    textures: Vec<TextureHandle>,
    samplers: Vec<SamplerHandle>,
    buffers: Vec<BufferHandle>,
}

impl Created {
    fn release(self, backend: &mut dyn GpuBackend) {
        for buffer in self.buffers {
            backend.destroy_buffer(buffer);
        }
        for sampler in self.samplers {
            backend.destroy_sampler(sampler);
        }
        for texture in self.textures {
            backend.destroy_texture(texture);
        }
    }
}

struct Geometry {
    meshes: Vec<GpuMesh>,
    vertex_buffer: BufferHandle,
    index_buffer: BufferHandle,
    vertex_buffer_size: usize,
    index_buffer_size: usize,
}

/// Creates the model's textures and samplers and packs every submesh into
/// one shared vertex buffer and one shared index buffer. On failure,
/// everything created so far is destroyed before the error is returned.
pub fn upload_model(
    model: Model,
    backend: &mut dyn GpuBackend,
) -> Result<GpuModel, GpuResourceError> {
    let mut created = Created::default();
    let geometry = match upload_resources(&model, backend, &mut created) {
        Ok(geometry) => geometry,
        Err(err) => {
            log::error!("Model upload failed, releasing partial resources: {err}");
            created.release(backend);
            return Err(err);
        }
    };
    log::info!(
        "Uploaded {} bytes of vertices and {} bytes of indices",
        geometry.vertex_buffer_size,
        geometry.index_buffer_size
    );

    let Model {
        materials,
        nodes,
        scenes,
        default_scene,
        ..
    } = model;
    Ok(GpuModel {
        textures: created.textures,
        samplers: created.samplers,
        materials,
        meshes: geometry.meshes,
        nodes,
        scenes,
        default_scene,
        vertex_buffer: geometry.vertex_buffer,
        index_buffer: geometry.index_buffer,
        vertex_buffer_size: geometry.vertex_buffer_size,
        index_buffer_size: geometry.index_buffer_size,
    })
}

fn upload_resources(
    model: &Model,
    backend: &mut dyn GpuBackend,
    created: &mut Created,
) -> Result<Geometry, GpuResourceError> {
    for image in &model.textures {
        let texture = backend.create_texture_2d(&image.pixels, image.width, image.height)?;
        created.textures.push(texture);
    }
    for sampler in &model.samplers {
        created.samplers.push(backend.create_sampler(sampler)?);
    }

    // Sizes first: the buffers are allocated once, then filled in order.
    let vertex_buffer_size = model.sub_meshes().map(|s| s.vertex_bytes().len()).sum();
    let index_buffer_size = model.sub_meshes().map(|s| s.index_bytes().len()).sum();
    let vertex_buffer = backend.create_buffer(vertex_buffer_size, BufferUsage::Vertex)?;
    created.buffers.push(vertex_buffer);
    let index_buffer = backend.create_buffer(index_buffer_size, BufferUsage::Index)?;
    created.buffers.push(index_buffer);

    let mut vertex_offset = 0;
    let mut index_offset = 0;
    let mut meshes = Vec::with_capacity(model.meshes.len());
    for mesh in &model.meshes {
        let mut sub_meshes = Vec::with_capacity(mesh.sub_meshes.len());
        for sub_mesh in &mesh.sub_meshes {
            let too_large = || {
                GpuResourceError::UploadFailed(format!(
                    "submesh at vertex byte {vertex_offset} exceeds 32-bit draw parameters"
                ))
            };
            let gpu_sub_mesh = GpuSubMesh {
                material: sub_mesh.material,
                index_count: u32::try_from(sub_mesh.indices.len()).map_err(|_| too_large())?,
                vertex_count: u32::try_from(sub_mesh.vertices.len()).map_err(|_| too_large())?,
                gpu_vertex_buffer_offset_in_bytes: vertex_offset,
                gpu_index_buffer_offset_in_bytes: index_offset,
                base_vertex: i32::try_from(vertex_offset / mem::size_of::<Vertex>())
                    .map_err(|_| too_large())?,
            };
            backend.upload_buffer_region(vertex_buffer, vertex_offset, sub_mesh.vertex_bytes())?;
            backend.upload_buffer_region(index_buffer, index_offset, sub_mesh.index_bytes())?;
            vertex_offset += sub_mesh.vertex_bytes().len();
            index_offset += sub_mesh.index_bytes().len();
            sub_meshes.push(gpu_sub_mesh);
        }
        meshes.push(GpuMesh {
            name: mesh.name.clone(),
            sub_meshes,
        });
    }

    Ok(Geometry {
        meshes,
        vertex_buffer,
        index_buffer,
        vertex_buffer_size,
        index_buffer_size,
    })
}
