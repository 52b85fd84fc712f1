//! Import, upload and render synthetic models through the headless backend.

mod common;

use std::fs;

use clap::Parser;
use glam::{Mat4, Vec3};

use orbit_playground::app::{run_headless, FrameHandler, Playground};
use orbit_playground::config::{Args, ResourcePaths};
use orbit_playground::renderer::gltf::{import_model, upload_model, ImportError};
use orbit_playground::renderer::{
    DrawUniforms, FilterMode, HeadlessBackend, MaterialUniforms, SamplerDesc, SceneRenderer,
    WrapMode, DRAW_BINDING, MATERIAL_BINDING,
};

#[test]
fn triangle_renders_as_one_red_draw() {
    let root = common::temp_dir("triangle");
    let model_dir = common::write_model_dir(&root, "Triangle", common::RED_MATERIAL, common::SINGLE_NODE);

    let model = import_model(&model_dir).unwrap();
    let sub_mesh = &model.meshes[0].sub_meshes[0];
    assert_eq!(sub_mesh.vertices.len(), 3);
    assert_eq!(sub_mesh.vertices[2].texcoord, [0.0, 1.0, 0.0, 0.0]);

    let mut backend = HeadlessBackend::new();
    let model = upload_model(model, &mut backend).unwrap();
    let mut renderer = SceneRenderer::new(&mut backend).unwrap();
    renderer
        .render_model(&mut backend, &model, Mat4::IDENTITY)
        .unwrap();

    let draws = backend.draws();
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].draw_call.index_count, 3);
    assert_eq!(draws[0].draw_call.base_vertex, 0);
    assert_eq!(draws[0].vertices, vec![0, 1, 2]);
    let material = draws[0]
        .uniform_block::<MaterialUniforms>(MATERIAL_BINDING)
        .unwrap();
    assert_eq!(material.base_color_factor, [1.0, 0.0, 0.0, 1.0]);

    renderer.destroy(&mut backend);
    model.destroy(&mut backend);
    assert_eq!(backend.live_resources(), 0);
    let _ = fs::remove_dir_all(&root);
}

#[test]
fn child_nodes_inherit_parent_transforms() {
    let root = common::temp_dir("hierarchy");
    let nodes = r#"[
        {"mesh": 0, "translation": [1, 0, 0], "children": [1]},
        {"mesh": 0, "scale": [2, 2, 2]}
    ]"#;
    let model_dir = common::write_model_dir(&root, "Pair", common::RED_MATERIAL, nodes);

    let model = import_model(&model_dir).unwrap();
    assert_eq!(model.nodes[1].parent, Some(0));
    let mut backend = HeadlessBackend::new();
    let model = upload_model(model, &mut backend).unwrap();
    let mut renderer = SceneRenderer::new(&mut backend).unwrap();
    let base = Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0));
    renderer.render_model(&mut backend, &model, base).unwrap();

    let draws = backend.draws();
    assert_eq!(draws.len(), 2);
    let child = draws[1].uniform_block::<DrawUniforms>(DRAW_BINDING).unwrap();
    let expected = Mat4::from_translation(Vec3::X) * Mat4::from_scale(Vec3::splat(2.0)) * base;
    assert!(child.model.abs_diff_eq(expected, 1e-5));
    let p = child.model.transform_point3(Vec3::X);
    assert!(p.abs_diff_eq(Vec3::new(3.0, 0.0, -10.0), 1e-5), "{p:?}");

    renderer.destroy(&mut backend);
    model.destroy(&mut backend);
    let _ = fs::remove_dir_all(&root);
}

#[test]
fn textured_model_binds_texture_and_default_sampler() {
    let root = common::temp_dir("textured");
    fs::write(root.join("tex ture.png"), common::png(2, 2, [0, 0, 255, 255])).unwrap();
    let bin = common::triangle_bin();
    let buffer = format!(
        r#"{{"uri": "data:application/octet-stream;base64,{}", "byteLength": {}}}"#,
        common::base64(&bin),
        bin.len()
    );
    let material = r#"{"pbrMetallicRoughness": {"baseColorTexture": {"index": 0}}}"#;
    let extra = r#",
        "images": [{"uri": "tex%20ture.png"}],
        "samplers": [{"magFilter": 0, "minFilter": 0}],
        "textures": [{"source": 0, "sampler": 0}]"#;
    let json = common::triangle_json(&buffer, material, common::SINGLE_NODE, extra);
    fs::write(root.join("textured.gltf"), json).unwrap();

    let model = import_model(root.join("textured.gltf")).unwrap();
    assert_eq!(model.textures[0].pixels[..4], [0, 0, 255, 255]);
    let mut backend = HeadlessBackend::new();
    let model = upload_model(model, &mut backend).unwrap();
    assert_eq!(backend.texture_size(model.textures[0]), Some((2, 2)));
    let sampler = backend.sampler_desc(model.samplers[0]).unwrap();
    assert_eq!(*sampler, SamplerDesc::default());
    assert_eq!(sampler.mag_filter, FilterMode::Linear);
    assert_eq!(sampler.min_filter, FilterMode::LinearMipmapLinear);
    assert_eq!(sampler.wrap_r, WrapMode::Repeat);

    let mut renderer = SceneRenderer::new(&mut backend).unwrap();
    renderer
        .render_model(&mut backend, &model, Mat4::IDENTITY)
        .unwrap();
    let draw = &backend.draws()[0];
    assert_eq!(draw.texture, Some(model.textures[0]));
    assert_eq!(draw.sampler, Some(model.samplers[0]));
    let material = draw
        .uniform_block::<MaterialUniforms>(MATERIAL_BINDING)
        .unwrap();
    assert_eq!(material.has_base_color_texture, 1);
    assert_eq!(material.base_color_factor, [1.0; 4]);

    renderer.destroy(&mut backend);
    model.destroy(&mut backend);
    let _ = fs::remove_dir_all(&root);
}

#[test]
fn missing_buffer_file_is_an_io_error() {
    let root = common::temp_dir("missing_buffer");
    let model_dir = common::write_model_dir(&root, "Broken", common::RED_MATERIAL, common::SINGLE_NODE);
    fs::remove_file(model_dir.join("Broken.bin")).unwrap();

    let result = import_model(&model_dir);
    assert!(matches!(result, Err(ImportError::Io { ref path, .. }) if path.ends_with("Broken.bin")));
    let _ = fs::remove_dir_all(&root);
}

#[test]
fn playground_orbits_and_renders_a_glb_headless() {
    let root = common::temp_dir("playground");
    fs::write(root.join("scene.glb"), common::triangle_glb()).unwrap();
    let args = Args::parse_from([
        "orbit-playground",
        "--resource-root",
        root.to_str().unwrap(),
        "--frames",
        "4",
        "scene.glb",
    ]);
    let mut playground = Playground::new(&args, &ResourcePaths::from_args(&args));
    let mut backend = HeadlessBackend::new();

    // A one second step is clamped to the maximum time step every frame.
    run_headless(&mut playground, &mut backend, args.frames, 1.0).unwrap();
    assert_eq!(backend.draws().len(), 4);
    let expected_phi = -90.0 + 4.0 * args.orbit_speed * args.max_time_step;
    assert!((playground.camera().phi - expected_phi).abs() < 1e-4);
    assert!(playground.model().is_none());
    assert_eq!(backend.live_resources(), 0);

    // Frames can also be driven by hand.
    playground.on_init(&mut backend).unwrap();
    assert_eq!(playground.model().map(|model| model.meshes.len()), Some(1));
    playground.on_update(&mut backend, 0.0).unwrap();
    playground.on_cleanup(&mut backend);
    assert_eq!(backend.draws().len(), 5);
    assert_eq!(backend.live_resources(), 0);
    let _ = fs::remove_dir_all(&root);
}
