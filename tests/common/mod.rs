//! Synthetic glTF fixtures written to temporary directories.

#![allow(dead_code)]

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// A fresh, empty directory under the system temp dir.
pub fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("orbit_playground_test_{name}"));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

pub const RED_MATERIAL: &str = r#"{"pbrMetallicRoughness": {"baseColorFactor": [1, 0, 0, 1]}}"#;
pub const SINGLE_NODE: &str = r#"[{"mesh": 0}]"#;

/// Positions (36 bytes), texcoords (24 bytes) and u16 indices (6 bytes) of
/// one triangle.
pub fn triangle_bin() -> Vec<u8> {
    let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    let texcoords: [f32; 6] = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0];
    let indices: [u16; 3] = [0, 1, 2];
    let mut bin = Vec::new();
    bin.extend_from_slice(bytemuck::cast_slice(&positions));
    bin.extend_from_slice(bytemuck::cast_slice(&texcoords));
    bin.extend_from_slice(bytemuck::cast_slice(&indices));
    bin
}

/// A document drawing [`triangle_bin`] with one material. Node 0 must be a
/// root; `extra` holds further top-level members, each preceded by a comma.
pub fn triangle_json(buffer: &str, material: &str, nodes: &str, extra: &str) -> String {
    format!(
        r#"{{
            "asset": {{"version": "2.0"}},
            "buffers": [{buffer}],
            "bufferViews": [
                {{"buffer": 0, "byteOffset": 0, "byteLength": 36}},
                {{"buffer": 0, "byteOffset": 36, "byteLength": 24}},
                {{"buffer": 0, "byteOffset": 60, "byteLength": 6}}
            ],
            "accessors": [
                {{"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3"}},
                {{"bufferView": 1, "componentType": 5126, "count": 3, "type": "VEC2"}},
                {{"bufferView": 2, "componentType": 5123, "count": 3, "type": "SCALAR"}}
            ],
            "materials": [{material}],
            "meshes": [{{"primitives": [{{
                "attributes": {{"POSITION": 0, "TEXCOORD_0": 1}},
                "indices": 2,
                "material": 0
            }}]}}],
            "nodes": {nodes},
            "scenes": [{{"nodes": [0]}}],
            "scene": 0{extra}
        }}"#
    )
}

/// Writes `root/name/name.gltf` with its buffer in `name.bin`, the layout a
/// model directory path resolves to. Returns the model directory.
pub fn write_model_dir(root: &Path, name: &str, material: &str, nodes: &str) -> PathBuf {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    let bin = triangle_bin();
    fs::write(dir.join(format!("{name}.bin")), &bin).unwrap();
    let buffer = format!(r#"{{"uri": "{name}.bin", "byteLength": {}}}"#, bin.len());
    let json = triangle_json(&buffer, material, nodes, "");
    fs::write(dir.join(format!("{name}.gltf")), json).unwrap();
    dir
}

/// Packs a JSON document and a binary chunk into a GLB container.
pub fn make_glb(json: &str, bin: &[u8]) -> Vec<u8> {
    let mut json = json.as_bytes().to_vec();
    while json.len() % 4 != 0 {
        json.push(b' ');
    }
    let mut bin = bin.to_vec();
    while bin.len() % 4 != 0 {
        bin.push(0);
    }
    let total = 12 + 8 + json.len() + 8 + bin.len();

    let mut glb = Vec::with_capacity(total);
    glb.extend_from_slice(b"glTF");
    glb.extend_from_slice(&2u32.to_le_bytes());
    glb.extend_from_slice(&(total as u32).to_le_bytes());
    glb.extend_from_slice(&(json.len() as u32).to_le_bytes());
    glb.extend_from_slice(b"JSON");
    glb.extend_from_slice(&json);
    glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    glb.extend_from_slice(b"BIN\0");
    glb.extend_from_slice(&bin);
    glb
}

/// A GLB of the red triangle with its geometry in the BIN chunk.
pub fn triangle_glb() -> Vec<u8> {
    let bin = triangle_bin();
    let buffer = format!(r#"{{"byteLength": {}}}"#, bin.len());
    make_glb(&triangle_json(&buffer, RED_MATERIAL, SINGLE_NODE, ""), &bin)
}

pub fn png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
    let mut bytes = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(image)
        .write_to(&mut bytes, image::ImageOutputFormat::Png)
        .unwrap();
    bytes.into_inner()
}

pub fn base64(bytes: &[u8]) -> String {
    use ::base64::Engine;
    ::base64::engine::general_purpose::STANDARD.encode(bytes)
}
