use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use glam::Mat4;
use tinyjson::JsonValue;

use super::accessor::Accessor;
use super::json::{self, Object};
use super::{glb, uri};
use super::{
    AlphaMode, Image, ImportError, Material, Mesh, Model, Scene, SceneNode, SubMesh, TextureRef,
    Vertex,
};
use crate::renderer::backend::SamplerDesc;

/// Returns the document to load for `path` and the directory its relative
/// URIs are resolved against. `.glb` and `.gltf` files are used as is; any
/// other path names a model directory `NAME` holding `NAME.gltf`.
pub fn resolve_document_path(path: &Path) -> (PathBuf, PathBuf) {
    let is_document = path
        .extension()
        .and_then(|extension| extension.to_str())
        .map_or(false, |extension| {
            extension.eq_ignore_ascii_case("glb") || extension.eq_ignore_ascii_case("gltf")
        });
    if is_document {
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        (path.to_path_buf(), base_dir)
    } else {
        let mut file_name = path.file_name().unwrap_or_default().to_os_string();
        file_name.push(".gltf");
        (path.join(file_name), path.to_path_buf())
    }
}

/// Loads a glTF or GLB model and everything it references from disk.
pub fn import_model(path: impl AsRef<Path>) -> Result<Model, ImportError> {
    let (document_path, base_dir) = resolve_document_path(path.as_ref());
    log::info!("Importing {}", document_path.display());
    let bytes = fs::read(&document_path).map_err(|source| ImportError::Io {
        path: document_path.clone(),
        source,
    })?;
    import_model_from_slice(&bytes, &base_dir)
}

/// Imports a glTF JSON document or GLB container held in memory. External
/// buffers and images are read relative to `base_dir`.
pub fn import_model_from_slice(bytes: &[u8], base_dir: &Path) -> Result<Model, ImportError> {
    let (json, bin) = if glb::is_glb(bytes) {
        let glb = glb::parse(bytes)?;
        (glb.json, glb.bin)
    } else {
        let json = std::str::from_utf8(bytes)
            .map_err(|err| ImportError::parse(format!("document is not UTF-8: {err}")))?;
        (json, None)
    };
    let root: JsonValue = json
        .trim_end()
        .parse()
        .map_err(|err: tinyjson::JsonParseError| ImportError::parse(err.to_string()))?;
    let root = json::as_object(&root, "document root")?;
    Document::new(root, bin, base_dir)?.import()
}

/// The parsed document with its buffers loaded.
struct Document<'a> {
    root: &'a Object,
    base_dir: &'a Path,
    buffers: Vec<Vec<u8>>,
    buffer_views: Vec<&'a Object>,
    accessors: Vec<&'a Object>,
}

#[derive(Debug, Clone, Copy)]
enum Semantic {
    Position,
    Normal,
    Texcoord,
    Color,
}

impl Semantic {
    fn from_name(name: &str) -> Option<Semantic> {
        match name {
            "POSITION" => Some(Semantic::Position),
            "NORMAL" => Some(Semantic::Normal),
            "TEXCOORD_0" => Some(Semantic::Texcoord),
            "COLOR_0" => Some(Semantic::Color),
            _ => None,
        }
    }

    fn field(self, vertex: &mut Vertex) -> &mut [f32; 4] {
        match self {
            Semantic::Position => &mut vertex.position,
            Semantic::Normal => &mut vertex.normal,
            Semantic::Texcoord => &mut vertex.texcoord,
            Semantic::Color => &mut vertex.color,
        }
    }
}

impl<'a> Document<'a> {
    fn new(
        root: &'a Object,
        bin: Option<&[u8]>,
        base_dir: &'a Path,
    ) -> Result<Document<'a>, ImportError> {
        check_asset(root)?;
        let buffers = load_buffers(root, bin, base_dir)?;
        Ok(Document {
            root,
            base_dir,
            buffers,
            buffer_views: json::objects(root, "bufferViews")?,
            accessors: json::objects(root, "accessors")?,
        })
    }

    fn import(&self) -> Result<Model, ImportError> {
        let textures = self.load_images()?;
        let samplers = self.load_samplers()?;
        let texture_refs = self.load_texture_refs(textures.len(), samplers.len())?;
        let materials = self.load_materials(&texture_refs)?;
        let meshes = self.load_meshes(materials.len())?;
        let nodes = self.load_nodes(meshes.len())?;
        let scenes = self.load_scenes(&nodes)?;
        let default_scene = json::opt_usize(self.root, "scene")?;
        if let Some(scene) = default_scene {
            check_index(scene, scenes.len(), "default scene")?;
        }

        let model = Model {
            textures,
            samplers,
            materials,
            meshes,
            nodes,
            scenes,
            default_scene,
        };
        log::info!(
            "Imported {} textures, {} samplers, {} materials, {} meshes ({} submeshes), {} nodes, {} scenes",
            model.textures.len(),
            model.samplers.len(),
            model.materials.len(),
            model.meshes.len(),
            model.sub_meshes().count(),
            model.nodes.len(),
            model.scenes.len(),
        );
        Ok(model)
    }

    fn accessor(&self, index: usize) -> Result<Accessor<'_>, ImportError> {
        Accessor::resolve(index, &self.accessors, &self.buffer_views, &self.buffers)
    }

    fn buffer_view_bytes(&self, index: usize) -> Result<&[u8], ImportError> {
        let view = self
            .buffer_views
            .get(index)
            .ok_or_else(|| ImportError::parse(format!("buffer view {index} does not exist")))?;
        let buffer = json::usize_field(view, "buffer")?;
        let offset = json::opt_usize(view, "byteOffset")?.unwrap_or(0);
        let length = json::usize_field(view, "byteLength")?;
        self.buffers
            .get(buffer)
            .and_then(|buffer| buffer.get(offset..offset + length))
            .ok_or_else(|| ImportError::parse(format!("buffer view {index} is out of bounds")))
    }

    fn load_images(&self) -> Result<Vec<Image>, ImportError> {
        let images = json::objects(self.root, "images")?;
        let mut decoded_images = Vec::with_capacity(images.len());
        for (index, image) in images.into_iter().enumerate() {
            let view = json::opt_usize(image, "bufferView")?;
            let encoded = match (view, json::opt_str(image, "uri")?) {
                (Some(view), _) => Cow::Borrowed(self.buffer_view_bytes(view)?),
                (None, Some(uri)) => Cow::Owned(uri::read_uri(uri, self.base_dir)?),
                (None, None) => {
                    return Err(ImportError::parse(format!(
                        "image {index} has neither a bufferView nor a uri"
                    )))
                }
            };
            let decoded = image::load_from_memory(&encoded)
                .map_err(|source| ImportError::ImageDecode { index, source })?
                .to_rgba8();
            let (width, height) = decoded.dimensions();
            log::debug!("image {index}: {width}x{height}");
            decoded_images.push(Image {
                width,
                height,
                pixels: decoded.into_raw(),
            });
        }
        Ok(decoded_images)
    }

    fn load_samplers(&self) -> Result<Vec<SamplerDesc>, ImportError> {
        let samplers = json::objects(self.root, "samplers")?;
        samplers
            .into_iter()
            .enumerate()
            .map(|(index, sampler)| {
                let field = |key| -> Result<Option<u32>, ImportError> {
                    Ok(json::opt_usize(sampler, key)?.map(|value| value as u32))
                };
                SamplerDesc::from_gltf(
                    field("magFilter")?,
                    field("minFilter")?,
                    field("wrapS")?,
                    field("wrapT")?,
                )
                .map_err(|value| {
                    ImportError::parse(format!("sampler {index} has invalid mode {value}"))
                })
            })
            .collect()
    }

    /// Resolves glTF textures into (image, sampler) pairs.
    fn load_texture_refs(
        &self,
        image_count: usize,
        sampler_count: usize,
    ) -> Result<Vec<TextureRef>, ImportError> {
        let textures = json::objects(self.root, "textures")?;
        textures
            .into_iter()
            .enumerate()
            .map(|(index, texture)| {
                let source = json::opt_usize(texture, "source")?.ok_or_else(|| {
                    ImportError::unsupported(format!("texture {index} has no source image"))
                })?;
                check_index(source, image_count, "texture source")?;
                let sampler = json::opt_usize(texture, "sampler")?;
                if let Some(sampler) = sampler {
                    check_index(sampler, sampler_count, "texture sampler")?;
                }
                Ok(TextureRef {
                    texture: source,
                    sampler,
                })
            })
            .collect()
    }

    fn load_materials(&self, textures: &[TextureRef]) -> Result<Vec<Material>, ImportError> {
        let materials = json::objects(self.root, "materials")?;
        materials
            .into_iter()
            .enumerate()
            .map(|(index, material)| load_material(index, material, textures))
            .collect()
    }

    fn load_meshes(&self, material_count: usize) -> Result<Vec<Mesh>, ImportError> {
        let meshes = json::objects(self.root, "meshes")?;
        meshes
            .into_iter()
            .enumerate()
            .map(|(mesh_index, mesh)| {
                let sub_meshes = json::objects(mesh, "primitives")?
                    .into_iter()
                    .enumerate()
                    .map(|(primitive_index, primitive)| {
                        self.load_primitive(mesh_index, primitive_index, primitive, material_count)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Mesh {
                    name: json::opt_name(mesh)?,
                    sub_meshes,
                })
            })
            .collect()
    }

    fn load_primitive(
        &self,
        mesh_index: usize,
        primitive_index: usize,
        primitive: &Object,
        material_count: usize,
    ) -> Result<SubMesh, ImportError> {
        let what = format!("mesh {mesh_index} primitive {primitive_index}");
        let mode = json::opt_usize(primitive, "mode")?.unwrap_or(4);
        if mode != 4 {
            return Err(ImportError::unsupported(format!(
                "{what} has topology mode {mode}, only triangle lists are supported"
            )));
        }
        let material = json::opt_usize(primitive, "material")?;
        if let Some(material) = material {
            check_index(material, material_count, "primitive material")?;
        }
        let attributes = json::object(primitive, "attributes")?
            .ok_or_else(|| ImportError::parse(format!("{what} has no attributes")))?;
        let positions = match attributes.get("POSITION") {
            Some(index) => self.accessor(json::take_usize(index, "POSITION")?)?,
            None => return Err(ImportError::parse(format!("{what} has no POSITION"))),
        };
        // Vertex and index storage is sized from these counts, so they must
        // be backed by buffer data.
        if !positions.has_data() {
            return Err(ImportError::parse(format!(
                "{what} has a POSITION accessor without a buffer view"
            )));
        }

        // The vertex count is only known once every index has been seen.
        let mut max_index = None;
        let indices = match json::opt_usize(primitive, "indices")? {
            Some(accessor) => {
                let accessor = self.accessor(accessor)?;
                accessor.check_indices()?;
                if !accessor.has_data() {
                    return Err(ImportError::parse(format!(
                        "{what} has an index accessor without a buffer view"
                    )));
                }
                let mut indices = allocate(accessor.count(), &what)?;
                for i in 0..accessor.count() {
                    let index = accessor.index(i);
                    max_index = max_index.max(Some(index));
                    indices.push(index);
                }
                indices
            }
            None => {
                let count = u32::try_from(positions.count()).map_err(|_| {
                    ImportError::parse(format!("{what} has too many vertices"))
                })?;
                max_index = count.checked_sub(1);
                let mut indices = allocate(positions.count(), &what)?;
                indices.extend(0..count);
                indices
            }
        };
        let vertex_count = max_index.map_or(0, |max| max as usize + 1);
        if vertex_count > positions.count() {
            return Err(ImportError::parse(format!(
                "{what} references vertex {} but has only {} positions",
                vertex_count - 1,
                positions.count()
            )));
        }

        let mut vertices = allocate(vertex_count, &what)?;
        vertices.resize(vertex_count, Vertex::default());
        for (name, accessor) in attributes {
            let Some(semantic) = Semantic::from_name(name) else {
                log::debug!("{what}: ignoring attribute {name}");
                continue;
            };
            let accessor = self.accessor(json::take_usize(accessor, name)?)?;
            if accessor.count() < vertex_count {
                log::warn!(
                    "{what}: {name} has {} elements for {vertex_count} vertices",
                    accessor.count()
                );
            }
            for (i, vertex) in vertices.iter_mut().enumerate().take(accessor.count()) {
                accessor.read_floats(i, semantic.field(vertex));
            }
        }

        log::debug!(
            "{what}: {} vertices, {} indices",
            vertices.len(),
            indices.len()
        );
        Ok(SubMesh {
            material,
            vertices,
            indices,
        })
    }

    fn load_nodes(&self, mesh_count: usize) -> Result<Vec<SceneNode>, ImportError> {
        let nodes_json = json::objects(self.root, "nodes")?;
        let node_count = nodes_json.len();
        let mut nodes = Vec::with_capacity(node_count);
        for node in nodes_json {
            let mesh = json::opt_usize(node, "mesh")?;
            if let Some(mesh) = mesh {
                check_index(mesh, mesh_count, "node mesh")?;
            }
            let children = json::usize_list(node, "children")?;
            for &child in &children {
                check_index(child, node_count, "node child")?;
            }
            nodes.push(SceneNode {
                name: json::opt_name(node)?,
                parent: None,
                local_transform: json::local_transform(node)?,
                world_transform: Mat4::IDENTITY,
                mesh,
                children,
            });
        }
        link_hierarchy(&mut nodes)?;
        Ok(nodes)
    }

    fn load_scenes(&self, nodes: &[SceneNode]) -> Result<Vec<Scene>, ImportError> {
        let scenes = json::objects(self.root, "scenes")?;
        scenes
            .into_iter()
            .enumerate()
            .map(|(index, scene)| {
                let roots = json::usize_list(scene, "nodes")?;
                for &root in &roots {
                    check_index(root, nodes.len(), "scene node")?;
                    if let Some(parent) = nodes[root].parent {
                        log::warn!("scene {index} lists node {root} as a root but its parent is node {parent}");
                    }
                }
                Ok(Scene {
                    name: json::opt_name(scene)?,
                    nodes: roots,
                })
            })
            .collect()
    }
}

fn check_asset(root: &Object) -> Result<(), ImportError> {
    let asset = json::object(root, "asset")?
        .ok_or_else(|| ImportError::parse("missing \"asset\""))?;
    let version = json::opt_str(asset, "version")?
        .ok_or_else(|| ImportError::parse("missing \"asset.version\""))?;
    if version != "2" && !version.starts_with("2.") {
        return Err(ImportError::unsupported(format!("glTF version {version}")));
    }
    if let Some(extension) = json::array(root, "extensionsRequired")?.first() {
        let name = extension.get::<String>().map_or("<invalid>", String::as_str);
        return Err(ImportError::unsupported(format!(
            "required extension {name}"
        )));
    }
    for extension in json::array(root, "extensionsUsed")? {
        if let Some(name) = extension.get::<String>() {
            log::debug!("ignoring optional extension {name}");
        }
    }
    Ok(())
}

fn load_buffers(
    root: &Object,
    bin: Option<&[u8]>,
    base_dir: &Path,
) -> Result<Vec<Vec<u8>>, ImportError> {
    let buffers = json::objects(root, "buffers")?;
    buffers
        .into_iter()
        .enumerate()
        .map(|(index, buffer)| {
            let byte_length = json::usize_field(buffer, "byteLength")?;
            let mut data = match (json::opt_str(buffer, "uri")?, bin) {
                (Some(uri), _) => uri::read_uri(uri, base_dir)?,
                // The BIN chunk of GLBs
                (None, Some(bin)) if index == 0 => bin.to_vec(),
                (None, _) => {
                    return Err(ImportError::parse(format!(
                        "buffer {index} has no uri and no GLB binary chunk"
                    )))
                }
            };
            if data.len() < byte_length {
                return Err(ImportError::parse(format!(
                    "buffer {index} is {} bytes, expected {byte_length}",
                    data.len()
                )));
            }
            data.truncate(byte_length);
            log::debug!("buffer {index}: {byte_length} bytes");
            Ok(data)
        })
        .collect()
}

/// Returns the texture reference under `key` of a material (or its
/// `pbrMetallicRoughness`) together with the texture info object.
fn texture_ref<'a>(
    object: &'a Object,
    key: &str,
    textures: &[TextureRef],
) -> Result<Option<(TextureRef, &'a Object)>, ImportError> {
    let Some(info) = json::object(object, key)? else {
        return Ok(None);
    };
    let index = json::usize_field(info, "index")?;
    let texture = *textures
        .get(index)
        .ok_or_else(|| ImportError::parse(format!("{key} refers to missing texture {index}")))?;
    if json::opt_usize(info, "texCoord")?.unwrap_or(0) != 0 {
        log::warn!("{key} uses a texture coordinate set other than TEXCOORD_0");
    }
    Ok(Some((texture, info)))
}

fn load_material(
    index: usize,
    material: &Object,
    textures: &[TextureRef],
) -> Result<Material, ImportError> {
    let pbr = json::object(material, "pbrMetallicRoughness")?.ok_or_else(|| {
        ImportError::unsupported(format!(
            "material {index} does not use the metallic-roughness model"
        ))
    })?;
    let defaults = Material::default();

    let (normal_texture, normal_scale) = match texture_ref(material, "normalTexture", textures)? {
        Some((texture, info)) => (Some(texture), json::opt_f32(info, "scale")?.unwrap_or(1.0)),
        None => (None, defaults.normal_scale),
    };
    let (occlusion_texture, occlusion_strength) =
        match texture_ref(material, "occlusionTexture", textures)? {
            Some((texture, info)) => (
                Some(texture),
                json::opt_f32(info, "strength")?.unwrap_or(1.0),
            ),
            None => (None, defaults.occlusion_strength),
        };
    let alpha_mode = match json::opt_str(material, "alphaMode")? {
        None | Some("OPAQUE") => AlphaMode::Opaque,
        Some("MASK") => AlphaMode::Mask,
        Some("BLEND") => AlphaMode::Blend,
        Some(mode) => {
            return Err(ImportError::parse(format!(
                "material {index} has unknown alphaMode {mode}"
            )))
        }
    };

    Ok(Material {
        name: json::opt_name(material)?,
        base_color_factor: json::opt_floats(pbr, "baseColorFactor")?
            .unwrap_or(defaults.base_color_factor),
        base_color_texture: texture_ref(pbr, "baseColorTexture", textures)?.map(|(t, _)| t),
        metallic_factor: json::opt_f32(pbr, "metallicFactor")?.unwrap_or(defaults.metallic_factor),
        roughness_factor: json::opt_f32(pbr, "roughnessFactor")?
            .unwrap_or(defaults.roughness_factor),
        metallic_roughness_texture: texture_ref(pbr, "metallicRoughnessTexture", textures)?
            .map(|(t, _)| t),
        normal_texture,
        normal_scale,
        occlusion_texture,
        occlusion_strength,
        emissive_factor: json::opt_floats(material, "emissiveFactor")?
            .unwrap_or(defaults.emissive_factor),
        emissive_texture: texture_ref(material, "emissiveTexture", textures)?.map(|(t, _)| t),
        alpha_mode,
        alpha_cutoff: json::opt_f32(material, "alphaCutoff")?.unwrap_or(defaults.alpha_cutoff),
        double_sided: json::opt_bool(material, "doubleSided")?.unwrap_or(false),
    })
}

/// Sets every node's parent and world transform. Fails unless the nodes
/// form a forest.
fn link_hierarchy(nodes: &mut [SceneNode]) -> Result<(), ImportError> {
    for parent in 0..nodes.len() {
        for i in 0..nodes[parent].children.len() {
            let child = nodes[parent].children[i];
            if child == parent {
                return Err(ImportError::parse(format!("node {parent} is its own child")));
            }
            if let Some(other) = nodes[child].parent {
                return Err(ImportError::parse(format!(
                    "node {child} has two parents, {other} and {parent}"
                )));
            }
            nodes[child].parent = Some(parent);
        }
    }

    // Walk down from the roots. With single parents guaranteed above, any
    // node the walk doesn't reach hangs off a cycle.
    let mut node_queue = (0..nodes.len())
        .rev()
        .filter(|&i| nodes[i].parent.is_none())
        .map(|i| (Mat4::IDENTITY, i))
        .collect::<Vec<_>>();
    let mut visited = 0;
    while let Some((parent_transform, index)) = node_queue.pop() {
        let node = &mut nodes[index];
        node.world_transform = parent_transform * node.local_transform;
        visited += 1;
        let transform = node.world_transform;
        node_queue.extend(node.children.iter().rev().map(|&child| (transform, child)));
    }
    if visited != nodes.len() {
        return Err(ImportError::parse(format!(
            "node hierarchy contains a cycle ({} of {} nodes unreachable from a root)",
            nodes.len() - visited,
            nodes.len()
        )));
    }
    Ok(())
}

/// An empty vector with room for `len` elements, or a parse error if that
/// much memory isn't available.
fn allocate<T>(len: usize, what: &str) -> Result<Vec<T>, ImportError> {
    let mut items = Vec::new();
    items.try_reserve_exact(len).map_err(|err| {
        ImportError::parse(format!("{what}: cannot allocate {len} elements: {err}"))
    })?;
    Ok(items)
}

fn check_index(index: usize, len: usize, what: &str) -> Result<(), ImportError> {
    if index < len {
        Ok(())
    } else {
        Err(ImportError::parse(format!(
            "{what} {index} is out of range (there are {len})"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::backend::{FilterMode, WrapMode};
    use crate::renderer::gltf::glb::tests::make_glb;
    use glam::Vec3;

    /// Collects binary data into buffer 0 and describes it as buffer views.
    #[derive(Default)]
    struct Bin {
        data: Vec<u8>,
        views: Vec<String>,
    }

    impl Bin {
        fn push(&mut self, bytes: &[u8]) -> usize {
            while self.data.len() % 4 != 0 {
                self.data.push(0);
            }
            self.views.push(format!(
                r#"{{"buffer": 0, "byteOffset": {}, "byteLength": {}}}"#,
                self.data.len(),
                bytes.len()
            ));
            self.data.extend_from_slice(bytes);
            self.views.len() - 1
        }

        fn push_f32(&mut self, values: &[f32]) -> usize {
            self.push(bytemuck::cast_slice(values))
        }

        fn push_u16(&mut self, values: &[u16]) -> usize {
            self.push(bytemuck::cast_slice(values))
        }

        /// `body` holds the remaining top-level members of the document.
        fn import(&self, body: &str) -> Result<Model, ImportError> {
            let json = format!(
                r#"{{"asset": {{"version": "2.0"}}, "buffers": [{{"byteLength": {}}}], "bufferViews": [{}], {body}}}"#,
                self.data.len(),
                self.views.join(", ")
            );
            import_model_from_slice(&make_glb(&json, Some(&self.data)), Path::new("."))
        }
    }

    const TRIANGLE: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];

    fn triangle(primitive_extra: &str, materials: &str) -> Result<Model, ImportError> {
        let mut bin = Bin::default();
        bin.push_f32(&TRIANGLE);
        bin.push_u16(&[0, 1, 2]);
        bin.import(&format!(
            r#""accessors": [
                {{"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3"}},
                {{"bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR"}}
            ],
            "meshes": [{{"primitives": [{{"attributes": {{"POSITION": 0}}, "indices": 1{primitive_extra}}}]}}],
            "materials": [{materials}],
            "nodes": [{{"mesh": 0}}],
            "scenes": [{{"nodes": [0]}}],
            "scene": 0"#
        ))
    }

    #[test]
    fn imports_a_triangle() {
        let model = triangle(
            r#", "material": 0"#,
            r#"{"pbrMetallicRoughness": {"baseColorFactor": [1, 0, 0, 1]}}"#,
        )
        .unwrap();
        assert_eq!(model.meshes.len(), 1);
        assert_eq!(model.default_scene, Some(0));
        assert_eq!(model.scenes[0].nodes, vec![0]);
        assert_eq!(model.nodes[0].mesh, Some(0));
        assert_eq!(model.nodes[0].parent, None);

        let sub_mesh = &model.meshes[0].sub_meshes[0];
        assert_eq!(sub_mesh.indices, vec![0, 1, 2]);
        assert_eq!(sub_mesh.vertices.len(), 3);
        assert_eq!(sub_mesh.material, Some(0));
        assert_eq!(sub_mesh.vertices[1].position, [1.0, 0.0, 0.0, 1.0]);
        assert!(sub_mesh.vertices.iter().all(|v| v.color == [1.0; 4]));

        let material = &model.materials[0];
        assert_eq!(material.base_color_factor, [1.0, 0.0, 0.0, 1.0]);
        assert!(material.base_color_texture.is_none());
        assert_eq!(material.metallic_factor, 1.0);
        assert_eq!(material.roughness_factor, 1.0);
    }

    #[test]
    fn vertex_count_is_max_index_plus_one() {
        let mut bin = Bin::default();
        bin.push_f32(&[0.0; 18]);
        bin.push_u16(&[0, 4, 2]);
        let model = bin
            .import(
                r#""accessors": [
                    {"bufferView": 0, "componentType": 5126, "count": 6, "type": "VEC3"},
                    {"bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR"}
                ],
                "meshes": [{"primitives": [{"attributes": {"POSITION": 0}, "indices": 1}]}]"#,
            )
            .unwrap();
        let sub_mesh = &model.meshes[0].sub_meshes[0];
        let max = *sub_mesh.indices.iter().max().unwrap() as usize;
        assert_eq!(sub_mesh.vertices.len(), max + 1);
        assert_eq!(sub_mesh.vertices.len(), 5);
        assert_eq!(sub_mesh.material, None);
    }

    #[test]
    fn indices_past_the_positions_are_rejected() {
        let mut bin = Bin::default();
        bin.push_f32(&TRIANGLE);
        bin.push_u16(&[0, 1, 3]);
        let result = bin.import(
            r#""accessors": [
                {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3"},
                {"bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR"}
            ],
            "meshes": [{"primitives": [{"attributes": {"POSITION": 0}, "indices": 1}]}]"#,
        );
        assert!(matches!(result, Err(ImportError::Parse(_))));
    }

    #[test]
    fn accessor_counts_must_be_backed_by_buffer_data() {
        let mut bin = Bin::default();
        bin.push_f32(&TRIANGLE);
        bin.push_u16(&[0, 1, 2]);

        let unbacked_positions = bin.import(
            r#""accessors": [
                {"componentType": 5126, "count": 4294967295, "type": "VEC3"}
            ],
            "meshes": [{"primitives": [{"attributes": {"POSITION": 0}}]}]"#,
        );
        assert!(matches!(unbacked_positions, Err(ImportError::Parse(_))));

        let unbacked_indices = bin.import(
            r#""accessors": [
                {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3"},
                {"componentType": 5125, "count": 4294967295, "type": "SCALAR"}
            ],
            "meshes": [{"primitives": [{"attributes": {"POSITION": 0}, "indices": 1}]}]"#,
        );
        assert!(matches!(unbacked_indices, Err(ImportError::Parse(_))));
    }

    #[test]
    fn missing_indices_draw_positions_in_order() {
        let mut bin = Bin::default();
        bin.push_f32(&TRIANGLE);
        let model = bin
            .import(
                r#""accessors": [
                    {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3"}
                ],
                "meshes": [{"primitives": [{"attributes": {"POSITION": 0}}]}]"#,
            )
            .unwrap();
        let sub_mesh = &model.meshes[0].sub_meshes[0];
        assert_eq!(sub_mesh.indices, vec![0, 1, 2]);
        assert_eq!(sub_mesh.vertices.len(), 3);
        assert_eq!(sub_mesh.vertices[2].position, [0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn reads_known_attributes_and_ignores_the_rest() {
        let mut bin = Bin::default();
        bin.push_f32(&TRIANGLE);
        bin.push_f32(&[0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
        bin.push_f32(&[0.0, 0.0, 1.0, 0.0, 0.5, 1.0]);
        bin.push(&[255, 0, 0, 0, 255, 0, 0, 0, 255]);
        let model = bin
            .import(
                r#""accessors": [
                    {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3"},
                    {"bufferView": 1, "componentType": 5126, "count": 3, "type": "VEC3"},
                    {"bufferView": 2, "componentType": 5126, "count": 3, "type": "VEC2"},
                    {"bufferView": 3, "componentType": 5121, "normalized": true, "count": 3, "type": "VEC3"}
                ],
                "meshes": [{"primitives": [{"attributes": {
                    "POSITION": 0, "NORMAL": 1, "TEXCOORD_0": 2, "COLOR_0": 3, "_TEMPERATURE": 2
                }}]}]"#,
            )
            .unwrap();
        let sub_mesh = &model.meshes[0].sub_meshes[0];
        // Without indices every position is used once, in order.
        assert_eq!(sub_mesh.indices, vec![0, 1, 2]);
        let v = &sub_mesh.vertices[2];
        assert_eq!(v.position, [0.0, 1.0, 0.0, 1.0]);
        assert_eq!(v.normal, [0.0, 0.0, 1.0, 0.0]);
        assert_eq!(v.texcoord, [0.5, 1.0, 0.0, 0.0]);
        // A three component color keeps the default alpha.
        assert_eq!(v.color, [0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn rejects_unsupported_features() {
        let mut bin = Bin::default();
        bin.push_f32(&TRIANGLE);
        let sparse = bin.import(
            r#""accessors": [
                {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                 "sparse": {"count": 1, "indices": {"bufferView": 0, "componentType": 5125},
                            "values": {"bufferView": 0}}}
            ],
            "meshes": [{"primitives": [{"attributes": {"POSITION": 0}}]}]"#,
        );
        assert!(matches!(sparse, Err(ImportError::UnsupportedFeature(_))));

        let not_metallic_roughness = triangle(
            r#", "material": 0"#,
            r#"{"extensions": {"KHR_materials_pbrSpecularGlossiness": {}}}"#,
        );
        assert!(matches!(
            not_metallic_roughness,
            Err(ImportError::UnsupportedFeature(_))
        ));

        let lines = triangle(r#", "mode": 1"#, "");
        assert!(matches!(lines, Err(ImportError::UnsupportedFeature(_))));

        let required = import_model_from_slice(
            br#"{"asset": {"version": "2.0"}, "extensionsRequired": ["KHR_draco_mesh_compression"]}"#,
            Path::new("."),
        );
        assert!(matches!(required, Err(ImportError::UnsupportedFeature(_))));

        let version_one =
            import_model_from_slice(br#"{"asset": {"version": "1.0"}}"#, Path::new("."));
        assert!(matches!(version_one, Err(ImportError::UnsupportedFeature(_))));
    }

    #[test]
    fn rejects_malformed_documents() {
        let garbage = import_model_from_slice(b"{ not json", Path::new("."));
        assert!(matches!(garbage, Err(ImportError::Parse(_))));
        let no_asset = import_model_from_slice(b"{}", Path::new("."));
        assert!(matches!(no_asset, Err(ImportError::Parse(_))));
        let bad_material = triangle(r#", "material": 3"#, "");
        assert!(matches!(bad_material, Err(ImportError::Parse(_))));
    }

    #[test]
    fn world_transforms_follow_the_parent_chain() {
        let model = Bin::default()
            .import(
                r#""nodes": [
                    {"translation": [1, 0, 0], "children": [1]},
                    {"rotation": [0, 0.7071068, 0, 0.7071068], "children": [2]},
                    {"translation": [0, 0, 2], "scale": [3, 3, 3]},
                    {"matrix": [2,0,0,0, 0,2,0,0, 0,0,2,0, 0,0,0,1]}
                ],
                "scenes": [{"name": "main", "nodes": [0, 3]}]"#,
            )
            .unwrap();
        let nodes = &model.nodes;
        assert_eq!(nodes[1].parent, Some(0));
        assert_eq!(nodes[2].parent, Some(1));
        assert_eq!(nodes[3].parent, None);
        assert_eq!(model.scenes[0].name.as_deref(), Some("main"));
        for node in nodes {
            let parent_world = node
                .parent
                .map_or(Mat4::IDENTITY, |parent| nodes[parent].world_transform);
            assert!(node
                .world_transform
                .abs_diff_eq(parent_world * node.local_transform, 1e-6));
        }
        // Node 2's origin: (0,0,2) rotated 90° about Y is (2,0,0), plus (1,0,0).
        let origin = nodes[2].world_transform.transform_point3(Vec3::ZERO);
        assert!(origin.abs_diff_eq(Vec3::new(3.0, 0.0, 0.0), 1e-5), "{origin:?}");
    }

    #[test]
    fn rejects_node_graphs_that_are_not_forests() {
        let cycle = Bin::default().import(
            r#""nodes": [{"children": [1]}, {"children": [2]}, {"children": [1]}]"#,
        );
        assert!(matches!(cycle, Err(ImportError::Parse(_))));

        let loop_without_root =
            Bin::default().import(r#""nodes": [{"children": [1]}, {"children": [0]}]"#);
        assert!(matches!(loop_without_root, Err(ImportError::Parse(_))));

        let own_child = Bin::default().import(r#""nodes": [{"children": [0]}]"#);
        assert!(matches!(own_child, Err(ImportError::Parse(_))));

        let missing_child = Bin::default().import(r#""nodes": [{"children": [5]}]"#);
        assert!(matches!(missing_child, Err(ImportError::Parse(_))));
    }

    fn png(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
        let image = image::RgbImage::from_pixel(width, height, image::Rgb(rgb));
        let mut bytes = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(image)
            .write_to(&mut bytes, image::ImageOutputFormat::Png)
            .unwrap();
        bytes.into_inner()
    }

    #[test]
    fn decodes_embedded_images_and_resolves_textures() {
        let mut bin = Bin::default();
        bin.push(&png(2, 1, [0, 255, 0]));
        let model = bin
            .import(
                r#""images": [{"bufferView": 0, "mimeType": "image/png"}],
                "samplers": [{}, {"magFilter": 9728, "minFilter": 9729, "wrapS": 33071}],
                "textures": [{"source": 0, "sampler": 1}, {"source": 0}],
                "materials": [{
                    "pbrMetallicRoughness": {
                        "baseColorTexture": {"index": 0},
                        "metallicFactor": 0.25,
                        "metallicRoughnessTexture": {"index": 1}
                    },
                    "normalTexture": {"index": 1, "scale": 0.5},
                    "emissiveFactor": [1, 0.5, 0],
                    "alphaMode": "MASK",
                    "doubleSided": true
                }]"#,
            )
            .unwrap();

        let image = &model.textures[0];
        assert_eq!((image.width, image.height), (2, 1));
        assert_eq!(image.pixels, vec![0, 255, 0, 255, 0, 255, 0, 255]);

        assert_eq!(model.samplers[0], SamplerDesc::default());
        assert_eq!(model.samplers[1].mag_filter, FilterMode::Nearest);
        assert_eq!(model.samplers[1].min_filter, FilterMode::Linear);
        assert_eq!(model.samplers[1].wrap_s, WrapMode::ClampToEdge);
        assert_eq!(model.samplers[1].wrap_t, WrapMode::Repeat);

        let material = &model.materials[0];
        assert_eq!(
            material.base_color_texture,
            Some(TextureRef {
                texture: 0,
                sampler: Some(1)
            })
        );
        assert_eq!(
            material.metallic_roughness_texture,
            Some(TextureRef {
                texture: 0,
                sampler: None
            })
        );
        assert_eq!(material.metallic_factor, 0.25);
        assert_eq!(material.normal_scale, 0.5);
        assert_eq!(material.occlusion_texture, None);
        assert_eq!(material.emissive_factor, [1.0, 0.5, 0.0]);
        assert_eq!(material.alpha_mode, AlphaMode::Mask);
        assert!(material.double_sided);
    }

    #[test]
    fn undecodable_images_fail_the_import() {
        let mut bin = Bin::default();
        bin.push(b"definitely not a png");
        let result = bin.import(r#""images": [{"bufferView": 0}]"#);
        assert!(matches!(result, Err(ImportError::ImageDecode { index: 0, .. })));
    }

    #[test]
    fn document_paths() {
        assert_eq!(
            resolve_document_path(Path::new("assets/Box.glb")),
            (PathBuf::from("assets/Box.glb"), PathBuf::from("assets"))
        );
        assert_eq!(
            resolve_document_path(Path::new("assets/Box/scene.gltf")),
            (
                PathBuf::from("assets/Box/scene.gltf"),
                PathBuf::from("assets/Box")
            )
        );
        assert_eq!(
            resolve_document_path(Path::new("assets/AnimatedCube")),
            (
                PathBuf::from("assets/AnimatedCube/AnimatedCube.gltf"),
                PathBuf::from("assets/AnimatedCube")
            )
        );
    }
}
