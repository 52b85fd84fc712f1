use std::mem;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::math;
use crate::renderer::backend::{BufferHandle, BufferUsage, GpuBackend, GpuResourceError};
use crate::renderer::gltf::{GpuMesh, GpuModel, Material};

/// Uniform block binding of [`ViewUniforms`].
pub const VIEW_BINDING: u32 = 0;
/// Uniform block binding of [`MaterialUniforms`].
pub const MATERIAL_BINDING: u32 = 1;
/// Uniform block binding of [`DrawUniforms`].
pub const DRAW_BINDING: u32 = 2;
/// The texture unit the base color texture is bound to.
pub const BASE_COLOR_TEXTURE_UNIT: u32 = 0;

/// Per-frame camera state, std140.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ViewUniforms {
    pub view: Mat4,
    pub projection: Mat4,
}

/// Per-submesh material state, std140.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MaterialUniforms {
    pub base_color_factor: [f32; 4],
    /// xyz used, w is padding.
    pub emissive_factor: [f32; 4],
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    /// 1 if a base color texture is bound, 0 otherwise.
    pub has_base_color_texture: u32,
    pub _padding: u32,
}

impl MaterialUniforms {
    pub fn new(material: &Material) -> MaterialUniforms {
        let [r, g, b] = material.emissive_factor;
        MaterialUniforms {
            base_color_factor: material.base_color_factor,
            emissive_factor: [r, g, b, 0.0],
            metallic_factor: material.metallic_factor,
            roughness_factor: material.roughness_factor,
            has_base_color_texture: material.base_color_texture.is_some() as u32,
            _padding: 0,
        }
    }
}

/// Per-node transforms, std140.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DrawUniforms {
    pub model: Mat4,
    pub normal: Mat4,
}

/// Draws uploaded models. Owns the uniform buffers shared by every draw.
pub struct SceneRenderer {
    view_buffer: BufferHandle,
    material_buffer: BufferHandle,
    draw_buffer: BufferHandle,
    default_material: Material,
}

impl SceneRenderer {
    pub fn new(backend: &mut dyn GpuBackend) -> Result<SceneRenderer, GpuResourceError> {
        let view_buffer =
            backend.create_buffer(mem::size_of::<ViewUniforms>(), BufferUsage::Uniform)?;
        let material_buffer =
            match backend.create_buffer(mem::size_of::<MaterialUniforms>(), BufferUsage::Uniform) {
                Ok(buffer) => buffer,
                Err(err) => {
                    backend.destroy_buffer(view_buffer);
                    return Err(err);
                }
            };
        let draw_buffer =
            match backend.create_buffer(mem::size_of::<DrawUniforms>(), BufferUsage::Uniform) {
                Ok(buffer) => buffer,
                Err(err) => {
                    backend.destroy_buffer(view_buffer);
                    backend.destroy_buffer(material_buffer);
                    return Err(err);
                }
            };
        Ok(SceneRenderer {
            view_buffer,
            material_buffer,
            draw_buffer,
            default_material: Material::default(),
        })
    }

    pub fn set_camera(
        &mut self,
        backend: &mut dyn GpuBackend,
        view: Mat4,
        projection: Mat4,
    ) -> Result<(), GpuResourceError> {
        let uniforms = ViewUniforms { view, projection };
        backend.upload_buffer_region(self.view_buffer, 0, bytemuck::bytes_of(&uniforms))
    }

    /// Draws every mesh reachable from every scene of `model`, placing the
    /// model with `base_transform`. Nodes are visited in pre-order with
    /// children in declaration order.
    pub fn render_model(
        &mut self,
        backend: &mut dyn GpuBackend,
        model: &GpuModel,
        base_transform: Mat4,
    ) -> Result<(), GpuResourceError> {
        backend.bind_geometry(model.vertex_buffer, model.index_buffer);
        backend.bind_uniform_block(
            VIEW_BINDING,
            self.view_buffer,
            0,
            mem::size_of::<ViewUniforms>(),
        );
        backend.bind_uniform_block(
            MATERIAL_BINDING,
            self.material_buffer,
            0,
            mem::size_of::<MaterialUniforms>(),
        );
        backend.bind_uniform_block(
            DRAW_BINDING,
            self.draw_buffer,
            0,
            mem::size_of::<DrawUniforms>(),
        );

        let mut node_queue: Vec<usize> = Vec::new();
        for scene in &model.scenes {
            node_queue.extend(scene.nodes.iter().rev());
            while let Some(node_index) = node_queue.pop() {
                let node = &model.nodes[node_index];
                if let Some(mesh) = node.mesh {
                    let model_transform = node.world_transform * base_transform;
                    let uniforms = DrawUniforms {
                        model: model_transform,
                        normal: math::normal_matrix(model_transform),
                    };
                    backend.upload_buffer_region(self.draw_buffer, 0, bytemuck::bytes_of(&uniforms))?;
                    self.render_mesh(backend, model, &model.meshes[mesh])?;
                }
                node_queue.extend(node.children.iter().rev());
            }
        }
        Ok(())
    }

    fn render_mesh(
        &self,
        backend: &mut dyn GpuBackend,
        model: &GpuModel,
        mesh: &GpuMesh,
    ) -> Result<(), GpuResourceError> {
        for sub_mesh in &mesh.sub_meshes {
            let material = match sub_mesh.material {
                Some(material) => &model.materials[material],
                None => &self.default_material,
            };
            let uniforms = MaterialUniforms::new(material);
            backend.upload_buffer_region(self.material_buffer, 0, bytemuck::bytes_of(&uniforms))?;
            match material.base_color_texture {
                Some(texture) => {
                    let (texture, sampler) = model.texture(texture);
                    backend.bind_texture(BASE_COLOR_TEXTURE_UNIT, Some(texture), sampler);
                }
                None => backend.bind_texture(BASE_COLOR_TEXTURE_UNIT, None, None),
            }
            backend.draw_indexed(sub_mesh.draw_call());
        }
        Ok(())
    }

    pub fn destroy(self, backend: &mut dyn GpuBackend) {
        backend.destroy_buffer(self.view_buffer);
        backend.destroy_buffer(self.material_buffer);
        backend.destroy_buffer(self.draw_buffer);
    }
}
