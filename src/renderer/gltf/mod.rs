//! glTF import into a CPU-side [`Model`], and its upload into a [`GpuModel`].
//!
//! Everything refers to everything else by index into the owning model's
//! arrays. The importer guarantees every index is in range and that nodes
//! form a forest, so consumers index without further checks.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::renderer::backend::SamplerDesc;

mod accessor;
mod error;
mod glb;
mod json;
mod loader;
mod program;
mod upload;
mod uri;

pub use error::ImportError;
pub use loader::{import_model, import_model_from_slice, resolve_document_path};
pub(crate) use program::{
    create_program, ShaderProgram, ATTR_LOC_COLOR, ATTR_LOC_NORMAL, ATTR_LOC_POSITION,
    ATTR_LOC_TEXCOORD,
};
pub use program::ShaderSources;
pub use upload::{upload_model, GpuMesh, GpuModel, GpuSubMesh};

/// The vertex format shared by every submesh. Each attribute is padded to a
/// vec4 so the layout is identical across backends.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 4],
    pub color: [f32; 4],
    pub texcoord: [f32; 4],
    pub normal: [f32; 4],
}

impl Default for Vertex {
    fn default() -> Self {
        Vertex {
            position: [0.0, 0.0, 0.0, 1.0],
            color: [1.0; 4],
            texcoord: [0.0; 4],
            normal: [0.0; 4],
        }
    }
}

/// Indices are always widened to 32 bits.
pub type VertexIndex = u32;

/// Decoded image, always RGBA8.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Reference to one of the model's textures (decoded images) and the
/// sampler to read it with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureRef {
    pub texture: usize,
    pub sampler: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlphaMode {
    #[default]
    Opaque,
    Mask,
    Blend,
}

/// A metallic-roughness material.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: Option<String>,
    pub base_color_factor: [f32; 4],
    pub base_color_texture: Option<TextureRef>,
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    pub metallic_roughness_texture: Option<TextureRef>,
    pub normal_texture: Option<TextureRef>,
    pub normal_scale: f32,
    pub occlusion_texture: Option<TextureRef>,
    pub occlusion_strength: f32,
    pub emissive_factor: [f32; 3],
    pub emissive_texture: Option<TextureRef>,
    pub alpha_mode: AlphaMode,
    pub alpha_cutoff: f32,
    pub double_sided: bool,
}

impl Default for Material {
    /// The glTF default material, used by primitives that don't name one.
    fn default() -> Self {
        Material {
            name: None,
            base_color_factor: [1.0; 4],
            base_color_texture: None,
            metallic_factor: 1.0,
            roughness_factor: 1.0,
            metallic_roughness_texture: None,
            normal_texture: None,
            normal_scale: 1.0,
            occlusion_texture: None,
            occlusion_strength: 1.0,
            emissive_factor: [0.0; 3],
            emissive_texture: None,
            alpha_mode: AlphaMode::Opaque,
            alpha_cutoff: 0.5,
            double_sided: false,
        }
    }
}

/// One glTF primitive: a triangle list drawn with a single material.
#[derive(Debug, Clone, PartialEq)]
pub struct SubMesh {
    pub material: Option<usize>,
    /// `max(indices) + 1` vertices, whether or not every one is referenced.
    pub vertices: Vec<Vertex>,
    pub indices: Vec<VertexIndex>,
}

impl SubMesh {
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub name: Option<String>,
    pub sub_meshes: Vec<SubMesh>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub name: Option<String>,
    pub parent: Option<usize>,
    pub local_transform: Mat4,
    /// `parent.world_transform * local_transform`, resolved at import.
    pub world_transform: Mat4,
    pub mesh: Option<usize>,
    pub children: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub name: Option<String>,
    /// Root nodes of this scene, in document order.
    pub nodes: Vec<usize>,
}

/// A glTF document with all of its data decoded, ready for upload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Model {
    /// One per glTF image.
    pub textures: Vec<Image>,
    pub samplers: Vec<SamplerDesc>,
    pub materials: Vec<Material>,
    pub meshes: Vec<Mesh>,
    pub nodes: Vec<SceneNode>,
    pub scenes: Vec<Scene>,
    /// The scene the document marks as the one to show. Every scene is
    /// rendered regardless.
    pub default_scene: Option<usize>,
}

impl Model {
    pub fn sub_meshes(&self) -> impl Iterator<Item = &SubMesh> {
        self.meshes.iter().flat_map(|mesh| mesh.sub_meshes.iter())
    }
}
