//! The OpenGL 3.3 core implementation of [`GpuBackend`].

use std::collections::HashMap;
use std::ffi::c_void;
use std::mem;
use std::ptr;

use crate::config::ResourcePaths;
use crate::renderer::backend::{
    BufferHandle, BufferUsage, FilterMode, GpuBackend, GpuResourceError, SamplerDesc,
    SamplerHandle, TextureHandle, WrapMode,
};
use crate::renderer::draw_calls::DrawCall;
use crate::renderer::gl;
use crate::renderer::gltf::{
    create_program, ShaderProgram, ShaderSources, Vertex, ATTR_LOC_COLOR, ATTR_LOC_NORMAL,
    ATTR_LOC_POSITION, ATTR_LOC_TEXCOORD,
};

pub struct GlBackend {
    vao: gl::types::GLuint,
    program: ShaderProgram,
    /// Sizes of live buffers, for bounds checking uploads.
    buffer_sizes: HashMap<gl::types::GLuint, usize>,
}

impl GlBackend {
    /// Sets up the model shader and vertex layout. The caller must have
    /// loaded the GL function pointers with [`gl::load_with`] and made a
    /// 3.3 core context current.
    pub fn new(paths: &ResourcePaths) -> Result<GlBackend, GpuResourceError> {
        let program = create_program(&ShaderSources::load(paths))?;

        let mut vao = 0;
        gl::call!(gl::GenVertexArrays(1, &mut vao));
        gl::call!(gl::BindVertexArray(vao));
        for location in [
            ATTR_LOC_POSITION,
            ATTR_LOC_COLOR,
            ATTR_LOC_TEXCOORD,
            ATTR_LOC_NORMAL,
        ] {
            gl::call!(gl::EnableVertexAttribArray(location));
        }

        // Reversed depth: near is 1, far is 0.
        gl::call!(gl::Enable(gl::DEPTH_TEST));
        gl::call!(gl::DepthFunc(gl::GEQUAL));
        gl::call!(gl::ClearDepth(0.0));
        gl::call!(gl::ClearColor(0.1, 0.1, 0.1, 1.0));

        log::info!("OpenGL backend ready");
        Ok(GlBackend {
            vao,
            program,
            buffer_sizes: HashMap::new(),
        })
    }

    pub fn resize(&mut self, width: i32, height: i32) {
        gl::call!(gl::Viewport(0, 0, width, height));
    }

    /// Clears the framebuffer and binds the model shader.
    pub fn begin_frame(&mut self) {
        gl::call!(gl::Clear(gl::COLOR_BUFFER_BIT | gl::DEPTH_BUFFER_BIT));
        gl::call!(gl::UseProgram(self.program.program));
        gl::call!(gl::BindVertexArray(self.vao));
    }
}

fn gl_filter(filter: FilterMode) -> gl::types::GLint {
    let filter = match filter {
        FilterMode::Nearest => gl::NEAREST,
        FilterMode::Linear => gl::LINEAR,
        FilterMode::NearestMipmapNearest => gl::NEAREST_MIPMAP_NEAREST,
        FilterMode::LinearMipmapNearest => gl::LINEAR_MIPMAP_NEAREST,
        FilterMode::NearestMipmapLinear => gl::NEAREST_MIPMAP_LINEAR,
        FilterMode::LinearMipmapLinear => gl::LINEAR_MIPMAP_LINEAR,
    };
    filter as gl::types::GLint
}

fn gl_wrap(wrap: WrapMode) -> gl::types::GLint {
    let wrap = match wrap {
        WrapMode::Repeat => gl::REPEAT,
        WrapMode::ClampToEdge => gl::CLAMP_TO_EDGE,
        WrapMode::MirroredRepeat => gl::MIRRORED_REPEAT,
    };
    wrap as gl::types::GLint
}

impl GpuBackend for GlBackend {
    fn create_texture_2d(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
    ) -> Result<TextureHandle, GpuResourceError> {
        if pixels.len() != width as usize * height as usize * 4 {
            return Err(GpuResourceError::TextureCreationFailed(format!(
                "{} bytes of pixels for a {width}x{height} RGBA8 texture",
                pixels.len()
            )));
        }
        let mut texture = 0;
        gl::call!(gl::GenTextures(1, &mut texture));
        gl::call!(gl::BindTexture(gl::TEXTURE_2D, texture));
        gl::call!(gl::PixelStorei(gl::UNPACK_ALIGNMENT, 1));
        unsafe {
            gl::TexImage2D(
                gl::TEXTURE_2D,
                0,
                gl::RGBA8 as gl::types::GLint,
                width as gl::types::GLsizei,
                height as gl::types::GLsizei,
                0,
                gl::RGBA,
                gl::UNSIGNED_BYTE,
                pixels.as_ptr() as *const c_void,
            );
            gl::GenerateMipmap(gl::TEXTURE_2D);
        }
        if let Some(error) = gl::take_error() {
            gl::call!(gl::DeleteTextures(1, &texture));
            return Err(GpuResourceError::TextureCreationFailed(error));
        }
        Ok(TextureHandle(texture))
    }

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<SamplerHandle, GpuResourceError> {
        let mut sampler = 0;
        gl::call!(gl::GenSamplers(1, &mut sampler));
        if sampler == 0 {
            return Err(GpuResourceError::SamplerCreationFailed(
                "glGenSamplers returned no name".to_string(),
            ));
        }
        let parameters = [
            (gl::TEXTURE_MAG_FILTER, gl_filter(desc.mag_filter)),
            (gl::TEXTURE_MIN_FILTER, gl_filter(desc.min_filter)),
            (gl::TEXTURE_WRAP_S, gl_wrap(desc.wrap_s)),
            (gl::TEXTURE_WRAP_T, gl_wrap(desc.wrap_t)),
            (gl::TEXTURE_WRAP_R, gl_wrap(desc.wrap_r)),
        ];
        for (parameter, value) in parameters {
            gl::call!(gl::SamplerParameteri(sampler, parameter, value));
        }
        Ok(SamplerHandle(sampler))
    }

    fn create_buffer(
        &mut self,
        size: usize,
        usage: BufferUsage,
    ) -> Result<BufferHandle, GpuResourceError> {
        let hint = match usage {
            BufferUsage::Vertex | BufferUsage::Index => gl::STATIC_DRAW,
            BufferUsage::Uniform => gl::DYNAMIC_DRAW,
        };
        let mut buffer = 0;
        gl::call!(gl::GenBuffers(1, &mut buffer));
        gl::call!(gl::BindBuffer(gl::COPY_WRITE_BUFFER, buffer));
        unsafe {
            gl::BufferData(
                gl::COPY_WRITE_BUFFER,
                size as gl::types::GLsizeiptr,
                ptr::null(),
                hint,
            );
        }
        if let Some(error) = gl::take_error() {
            gl::call!(gl::DeleteBuffers(1, &buffer));
            return Err(GpuResourceError::BufferCreationFailed(format!(
                "{size} byte {usage:?} buffer: {error}"
            )));
        }
        self.buffer_sizes.insert(buffer, size);
        Ok(BufferHandle(buffer))
    }

    fn upload_buffer_region(
        &mut self,
        buffer: BufferHandle,
        offset: usize,
        data: &[u8],
    ) -> Result<(), GpuResourceError> {
        let size = *self.buffer_sizes.get(&buffer.0).ok_or_else(|| {
            GpuResourceError::UploadFailed(format!("unknown buffer {buffer:?}"))
        })?;
        if offset.checked_add(data.len()).map_or(true, |end| end > size) {
            return Err(GpuResourceError::UploadFailed(format!(
                "{} bytes at offset {offset} overflow a {size} byte buffer",
                data.len()
            )));
        }
        gl::call!(gl::BindBuffer(gl::COPY_WRITE_BUFFER, buffer.0));
        gl::call!(gl::BufferSubData(
            gl::COPY_WRITE_BUFFER,
            offset as gl::types::GLintptr,
            data.len() as gl::types::GLsizeiptr,
            data.as_ptr() as *const c_void,
        ));
        Ok(())
    }

    fn bind_uniform_block(&mut self, slot: u32, buffer: BufferHandle, offset: usize, size: usize) {
        gl::call!(gl::BindBufferRange(
            gl::UNIFORM_BUFFER,
            slot,
            buffer.0,
            offset as gl::types::GLintptr,
            size as gl::types::GLsizeiptr,
        ));
    }

    fn bind_geometry(&mut self, vertex_buffer: BufferHandle, index_buffer: BufferHandle) {
        gl::call!(gl::BindVertexArray(self.vao));
        gl::call!(gl::BindBuffer(gl::ARRAY_BUFFER, vertex_buffer.0));
        let stride = mem::size_of::<Vertex>() as gl::types::GLsizei;
        for (location, offset) in [
            (ATTR_LOC_POSITION, mem::offset_of!(Vertex, position)),
            (ATTR_LOC_COLOR, mem::offset_of!(Vertex, color)),
            (ATTR_LOC_TEXCOORD, mem::offset_of!(Vertex, texcoord)),
            (ATTR_LOC_NORMAL, mem::offset_of!(Vertex, normal)),
        ] {
            gl::call!(gl::VertexAttribPointer(
                location,
                4,
                gl::FLOAT,
                gl::FALSE,
                stride,
                offset as *const c_void,
            ));
        }
        gl::call!(gl::BindBuffer(gl::ELEMENT_ARRAY_BUFFER, index_buffer.0));
    }

    fn bind_texture(
        &mut self,
        unit: u32,
        texture: Option<TextureHandle>,
        sampler: Option<SamplerHandle>,
    ) {
        gl::call!(gl::ActiveTexture(gl::TEXTURE0 + unit));
        gl::call!(gl::BindTexture(gl::TEXTURE_2D, texture.map_or(0, |t| t.0)));
        gl::call!(gl::BindSampler(unit, sampler.map_or(0, |s| s.0)));
    }

    fn draw_indexed(&mut self, draw_call: DrawCall) {
        gl::call!(gl::DrawElementsBaseVertex(
            gl::TRIANGLES,
            draw_call.index_count as gl::types::GLsizei,
            gl::UNSIGNED_INT,
            draw_call.index_byte_offset as *const c_void,
            draw_call.base_vertex,
        ));
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        gl::call!(gl::DeleteTextures(1, &texture.0));
    }

    fn destroy_sampler(&mut self, sampler: SamplerHandle) {
        gl::call!(gl::DeleteSamplers(1, &sampler.0));
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        self.buffer_sizes.remove(&buffer.0);
        gl::call!(gl::DeleteBuffers(1, &buffer.0));
    }
}

impl Drop for GlBackend {
    fn drop(&mut self) {
        gl::call!(gl::DeleteVertexArrays(1, &self.vao));
        gl::call!(gl::DeleteProgram(self.program.program));
    }
}
