/// The parameters of one indexed draw out of the model's shared vertex and
/// index buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    pub index_count: u32,
    /// Byte offset of the first index in the bound index buffer.
    pub index_byte_offset: usize,
    /// Added to every index before fetching the vertex.
    pub base_vertex: i32,
}
