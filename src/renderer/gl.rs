//! Generated OpenGL 3.3 core bindings, plus error checking and shader
//! compilation helpers.

#![allow(clippy::all, non_upper_case_globals, non_snake_case, dead_code, unused_imports)]

include!(concat!(env!("OUT_DIR"), "/bindings.rs"));

use crate::renderer::backend::GpuResourceError;

/// Runs an unsafe GL call. In debug builds, panics with the call site if it
/// raised a GL error.
macro_rules! call {
    ($expr:expr) => {{
        #[allow(unused_unsafe)]
        let result = unsafe { $expr };
        if cfg!(debug_assertions) {
            let error = unsafe { $crate::renderer::gl::GetError() };
            if error != $crate::renderer::gl::NO_ERROR {
                panic!(
                    "OpenGL error {} at {}:{}:{}",
                    $crate::renderer::gl::error_name(error),
                    file!(),
                    line!(),
                    column!(),
                );
            }
        }
        result
    }};
}
pub(crate) use call;

pub fn error_name(error: types::GLenum) -> String {
    match error {
        INVALID_ENUM => "INVALID_ENUM".to_string(),
        INVALID_VALUE => "INVALID_VALUE".to_string(),
        INVALID_OPERATION => "INVALID_OPERATION".to_string(),
        OUT_OF_MEMORY => "OUT_OF_MEMORY".to_string(),
        INVALID_FRAMEBUFFER_OPERATION => "INVALID_FRAMEBUFFER_OPERATION".to_string(),
        _ => format!("{error}"),
    }
}

/// Returns the error raised by the preceding GL calls, if any. Used where a
/// failure must be reported instead of panicking.
pub fn take_error() -> Option<String> {
    let error = unsafe { GetError() };
    (error != NO_ERROR).then(|| error_name(error))
}

pub fn create_shader(
    shader_type: types::GLenum,
    source: &str,
) -> Result<types::GLuint, GpuResourceError> {
    let shader = call!(CreateShader(shader_type));
    let sources = [source.as_ptr() as *const types::GLchar];
    let source_lens = [source.len() as types::GLint];
    call!(ShaderSource(shader, 1, sources.as_ptr(), source_lens.as_ptr()));
    call!(CompileShader(shader));
    let mut compile_status = 0;
    call!(GetShaderiv(shader, COMPILE_STATUS, &mut compile_status));
    if compile_status == FALSE as types::GLint {
        let mut info_log = [0u8; 4096];
        let mut length = 0;
        call!(GetShaderInfoLog(
            shader,
            info_log.len() as types::GLsizei,
            &mut length,
            info_log.as_mut_ptr() as *mut types::GLchar,
        ));
        call!(DeleteShader(shader));
        let info_log = String::from_utf8_lossy(&info_log[..length.max(0) as usize]);
        let stage = if shader_type == VERTEX_SHADER {
            "vertex"
        } else {
            "fragment"
        };
        return Err(GpuResourceError::ShaderCreationFailed(format!(
            "compiling {stage} shader failed: {info_log}"
        )));
    }
    Ok(shader)
}

pub fn create_program(shaders: &[types::GLuint]) -> Result<types::GLuint, GpuResourceError> {
    let program = call!(CreateProgram());
    for &shader in shaders {
        call!(AttachShader(program, shader));
    }
    call!(LinkProgram(program));
    let mut link_status = 0;
    call!(GetProgramiv(program, LINK_STATUS, &mut link_status));
    if link_status == FALSE as types::GLint {
        let mut info_log = [0u8; 4096];
        let mut length = 0;
        call!(GetProgramInfoLog(
            program,
            info_log.len() as types::GLsizei,
            &mut length,
            info_log.as_mut_ptr() as *mut types::GLchar,
        ));
        call!(DeleteProgram(program));
        let info_log = String::from_utf8_lossy(&info_log[..length.max(0) as usize]);
        return Err(GpuResourceError::ShaderCreationFailed(format!(
            "linking shader program failed: {info_log}"
        )));
    }
    Ok(program)
}

pub fn get_uniform_block_index(program: types::GLuint, name: &str) -> Option<types::GLuint> {
    let name = std::ffi::CString::new(name).ok()?;
    let index = call!(GetUniformBlockIndex(program, name.as_ptr()));
    (index != INVALID_INDEX).then_some(index)
}

pub fn get_uniform_location(program: types::GLuint, name: &str) -> Option<types::GLint> {
    let name = std::ffi::CString::new(name).ok()?;
    let location = call!(GetUniformLocation(program, name.as_ptr()));
    (location != -1).then_some(location)
}
