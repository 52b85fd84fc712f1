use std::fs;
use std::io;

use crate::config::{ResourceKind, ResourcePaths};
use crate::renderer::backend::GpuResourceError;
use crate::renderer::gl;
use crate::renderer::scene_renderer::{
    BASE_COLOR_TEXTURE_UNIT, DRAW_BINDING, MATERIAL_BINDING, VIEW_BINDING,
};

/// The vertex attribute location of the position of glTF vertices.
pub const ATTR_LOC_POSITION: gl::types::GLuint = 0;
/// The vertex attribute location of the COLOR_0 attribute of glTF vertices.
pub const ATTR_LOC_COLOR: gl::types::GLuint = 1;
/// The vertex attribute location of the TEXCOORD_0 attribute of glTF vertices.
pub const ATTR_LOC_TEXCOORD: gl::types::GLuint = 2;
/// The vertex attribute location of the NORMAL attribute of glTF vertices.
pub const ATTR_LOC_NORMAL: gl::types::GLuint = 3;

const VERTEX_SHADER_FILE: &str = "phong_vert.glsl";
const FRAGMENT_SHADER_FILE: &str = "phong_frag.glsl";

const VERTEX_SHADER: &str = r#"#version 330 core
layout(location = 0) in vec4 POSITION;
layout(location = 1) in vec4 COLOR;
layout(location = 2) in vec4 TEXCOORD;
layout(location = 3) in vec4 NORMAL;

layout(std140) uniform ViewData {
    mat4 view;
    mat4 projection;
};
layout(std140) uniform DrawData {
    mat4 model;
    mat4 normalMatrix;
};

out vec4 vertex_color;
out vec2 vertex_texcoord;
out vec3 world_normal;
out vec3 world_position;

void main() {
    vec4 world = model * vec4(POSITION.xyz, 1.0);
    world_position = world.xyz;
    world_normal = mat3(normalMatrix) * NORMAL.xyz;
    vertex_color = COLOR;
    vertex_texcoord = TEXCOORD.xy;
    gl_Position = projection * view * world;
}
"#;
const FRAGMENT_SHADER: &str = r#"#version 330 core
layout(std140) uniform ViewData {
    mat4 view;
    mat4 projection;
};
layout(std140) uniform MaterialData {
    vec4 baseColorFactor;
    vec4 emissiveFactor;
    float metallicFactor;
    float roughnessFactor;
    uint hasBaseColorTexture;
    uint padding;
};
uniform sampler2D baseColorTexture;

in vec4 vertex_color;
in vec2 vertex_texcoord;
in vec3 world_normal;
in vec3 world_position;
out vec4 FRAG_COLOR;

void main() {
    vec4 base_color = baseColorFactor * vertex_color;
    if (hasBaseColorTexture != 0u) {
        base_color *= texture(baseColorTexture, vertex_texcoord);
    }

    // Headlight: the light sits at the eye.
    vec3 eye = inverse(view)[3].xyz;
    vec3 to_eye = normalize(eye - world_position);
    float lighting = 1.0;
    if (dot(world_normal, world_normal) > 1e-8) {
        vec3 normal = normalize(world_normal);
        float diffuse = max(dot(normal, to_eye), 0.0);
        float shininess = mix(64.0, 2.0, roughnessFactor);
        float specular = pow(max(dot(reflect(-to_eye, normal), to_eye), 0.0), shininess)
            * (1.0 - roughnessFactor);
        lighting = 0.2 + 0.8 * diffuse + specular;
    }
    vec3 linear_color = base_color.rgb * lighting + emissiveFactor.rgb;

    // The framebuffer is not SRGB, so we transform the linear color to close-enough-to-srgb.
    FRAG_COLOR = vec4(pow(linear_color, vec3(1.0 / 2.2)), base_color.a);
}
"#;

/// GLSL sources of the model shader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSources {
    pub vertex: String,
    pub fragment: String,
}

impl Default for ShaderSources {
    fn default() -> Self {
        ShaderSources {
            vertex: VERTEX_SHADER.to_string(),
            fragment: FRAGMENT_SHADER.to_string(),
        }
    }
}

impl ShaderSources {
    /// The built-in sources, with each stage replaced by its file from the
    /// shader resource directory if one exists.
    pub fn load(paths: &ResourcePaths) -> ShaderSources {
        let defaults = ShaderSources::default();
        ShaderSources {
            vertex: read_override(paths, VERTEX_SHADER_FILE).unwrap_or(defaults.vertex),
            fragment: read_override(paths, FRAGMENT_SHADER_FILE).unwrap_or(defaults.fragment),
        }
    }
}

fn read_override(paths: &ResourcePaths, file: &str) -> Option<String> {
    let path = paths.resolve(ResourceKind::Shader, file);
    match fs::read_to_string(&path) {
        Ok(source) => {
            log::info!("Using shader override {}", path.display());
            Some(source)
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => None,
        Err(err) => {
            log::warn!("Ignoring unreadable shader {}: {err}", path.display());
            None
        }
    }
}

pub struct ShaderProgram {
    pub program: gl::types::GLuint,
}

/// Compiles and returns the shader program which should be used to render the
/// glTF models, with its uniform blocks bound to the renderer's slots.
pub fn create_program(sources: &ShaderSources) -> Result<ShaderProgram, GpuResourceError> {
    let vertex_shader = gl::create_shader(gl::VERTEX_SHADER, &sources.vertex)?;
    let fragment_shader = match gl::create_shader(gl::FRAGMENT_SHADER, &sources.fragment) {
        Ok(shader) => shader,
        Err(err) => {
            gl::call!(gl::DeleteShader(vertex_shader));
            return Err(err);
        }
    };
    let program = gl::create_program(&[vertex_shader, fragment_shader]);
    gl::call!(gl::DeleteShader(vertex_shader));
    gl::call!(gl::DeleteShader(fragment_shader));
    let program = program?;

    for (block, binding) in [
        ("ViewData", VIEW_BINDING),
        ("MaterialData", MATERIAL_BINDING),
        ("DrawData", DRAW_BINDING),
    ] {
        match gl::get_uniform_block_index(program, block) {
            Some(index) => gl::call!(gl::UniformBlockBinding(program, index, binding)),
            None => log::debug!("Uniform block {block} is unused by the model shader"),
        }
    }
    gl::call!(gl::UseProgram(program));
    if let Some(location) = gl::get_uniform_location(program, "baseColorTexture") {
        gl::call!(gl::Uniform1i(location, BASE_COLOR_TEXTURE_UNIT as gl::types::GLint));
    }
    Ok(ShaderProgram { program })
}
