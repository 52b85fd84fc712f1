//! Typed, bounds-checked reads out of glTF accessors.

use super::json::{self, Object};
use super::ImportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ComponentType {
    I8,
    U8,
    I16,
    U16,
    U32,
    F32,
}

impl ComponentType {
    fn from_gl(value: usize) -> Option<ComponentType> {
        match value {
            5120 => Some(ComponentType::I8),
            5121 => Some(ComponentType::U8),
            5122 => Some(ComponentType::I16),
            5123 => Some(ComponentType::U16),
            5125 => Some(ComponentType::U32),
            5126 => Some(ComponentType::F32),
            _ => None,
        }
    }

    fn size(self) -> usize {
        match self {
            ComponentType::I8 | ComponentType::U8 => 1,
            ComponentType::I16 | ComponentType::U16 => 2,
            ComponentType::U32 | ComponentType::F32 => 4,
        }
    }
}

fn component_count(element_type: &str) -> Option<usize> {
    match element_type {
        "SCALAR" => Some(1),
        "VEC2" => Some(2),
        "VEC3" => Some(3),
        "VEC4" | "MAT2" => Some(4),
        "MAT3" => Some(9),
        "MAT4" => Some(16),
        _ => None,
    }
}

/// A resolved accessor. The byte range of every element has been checked
/// against its buffer view and buffer, so reads can't go out of bounds.
#[derive(Debug, Clone, Copy)]
pub struct Accessor<'a> {
    /// Starts at the first element. `None` for accessors without a buffer
    /// view, which read as zeros.
    data: Option<&'a [u8]>,
    stride: usize,
    count: usize,
    component_type: ComponentType,
    components: usize,
    normalized: bool,
}

impl<'a> Accessor<'a> {
    pub fn resolve(
        index: usize,
        accessors: &[&Object],
        buffer_views: &[&Object],
        buffers: &'a [Vec<u8>],
    ) -> Result<Accessor<'a>, ImportError> {
        let accessor = accessors
            .get(index)
            .ok_or_else(|| ImportError::parse(format!("accessor {index} does not exist")))?;
        if accessor.contains_key("sparse") {
            return Err(ImportError::unsupported(format!(
                "accessor {index} is sparse"
            )));
        }

        let component_type = json::usize_field(accessor, "componentType")?;
        let component_type = ComponentType::from_gl(component_type).ok_or_else(|| {
            ImportError::parse(format!(
                "accessor {index} has unknown componentType {component_type}"
            ))
        })?;
        let element_type = json::opt_str(accessor, "type")?
            .ok_or_else(|| ImportError::parse(format!("accessor {index} has no type")))?;
        let components = component_count(element_type).ok_or_else(|| {
            ImportError::parse(format!(
                "accessor {index} has unknown type \"{element_type}\""
            ))
        })?;
        let count = json::usize_field(accessor, "count")?;
        let normalized = json::opt_bool(accessor, "normalized")?.unwrap_or(false);
        let element_size = components * component_type.size();

        let mut resolved = Accessor {
            data: None,
            stride: element_size,
            count,
            component_type,
            components,
            normalized,
        };
        let Some(view_index) = json::opt_usize(accessor, "bufferView")? else {
            return Ok(resolved);
        };

        let out_of_bounds = |what: &str| {
            ImportError::parse(format!("accessor {index}: {what} is out of bounds"))
        };
        let view = buffer_views
            .get(view_index)
            .ok_or_else(|| out_of_bounds("buffer view"))?;
        let buffer_index = json::usize_field(view, "buffer")?;
        let buffer = buffers
            .get(buffer_index)
            .ok_or_else(|| out_of_bounds("buffer"))?;
        let view_offset = json::opt_usize(view, "byteOffset")?.unwrap_or(0);
        let view_length = json::usize_field(view, "byteLength")?;
        let view_bytes = buffer
            .get(view_offset..view_offset + view_length)
            .ok_or_else(|| out_of_bounds("buffer view range"))?;

        if let Some(stride) = json::opt_usize(view, "byteStride")? {
            if stride < element_size {
                return Err(ImportError::parse(format!(
                    "accessor {index}: byteStride {stride} is smaller than its {element_size} byte elements"
                )));
            }
            resolved.stride = stride;
        }

        let offset = json::opt_usize(accessor, "byteOffset")?.unwrap_or(0);
        let span = match count {
            0 => 0,
            _ => resolved.stride * (count - 1) + element_size,
        };
        let data = view_bytes
            .get(offset..offset + span)
            .ok_or_else(|| out_of_bounds("element range"))?;
        resolved.data = Some(data);
        Ok(resolved)
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// False for accessors without a buffer view, whose `count` isn't
    /// backed by any bytes.
    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    /// Fails unless this accessor can be read with [`Accessor::index`].
    pub fn check_indices(&self) -> Result<(), ImportError> {
        let integer = matches!(
            self.component_type,
            ComponentType::U8 | ComponentType::U16 | ComponentType::U32
        );
        if !integer || self.components != 1 {
            return Err(ImportError::parse(format!(
                "index accessor must hold unsigned integer scalars, not {:?}x{}",
                self.component_type, self.components
            )));
        }
        Ok(())
    }

    /// Reads element `i` of an index accessor checked by
    /// [`Accessor::check_indices`].
    pub fn index(&self, i: usize) -> u32 {
        match self.component_type {
            ComponentType::U8 => self.component_bytes::<1>(i, 0)[0] as u32,
            ComponentType::U16 => u16::from_le_bytes(self.component_bytes(i, 0)) as u32,
            _ => u32::from_le_bytes(self.component_bytes(i, 0)),
        }
    }

    /// Reads element `i` as floats into `out`, writing at most as many
    /// components as the element has and leaving the rest of `out` alone.
    pub fn read_floats(&self, i: usize, out: &mut [f32]) {
        for (c, value) in out.iter_mut().enumerate().take(self.components) {
            *value = self.component_f32(i, c);
        }
    }

    fn component_f32(&self, i: usize, c: usize) -> f32 {
        let normalized = self.normalized;
        match self.component_type {
            ComponentType::F32 => f32::from_le_bytes(self.component_bytes(i, c)),
            ComponentType::I8 => {
                let v = i8::from_le_bytes(self.component_bytes(i, c)) as f32;
                if normalized { (v / 127.0).max(-1.0) } else { v }
            }
            ComponentType::U8 => {
                let v = u8::from_le_bytes(self.component_bytes(i, c)) as f32;
                if normalized { v / 255.0 } else { v }
            }
            ComponentType::I16 => {
                let v = i16::from_le_bytes(self.component_bytes(i, c)) as f32;
                if normalized { (v / 32767.0).max(-1.0) } else { v }
            }
            ComponentType::U16 => {
                let v = u16::from_le_bytes(self.component_bytes(i, c)) as f32;
                if normalized { v / 65535.0 } else { v }
            }
            ComponentType::U32 => {
                let v = u32::from_le_bytes(self.component_bytes(i, c)) as f32;
                if normalized { v / u32::MAX as f32 } else { v }
            }
        }
    }

    fn component_bytes<const N: usize>(&self, i: usize, c: usize) -> [u8; N] {
        let mut bytes = [0; N];
        if let Some(data) = self.data {
            let offset = i * self.stride + c * N;
            bytes.copy_from_slice(&data[offset..offset + N]);
        }
        bytes
    }
}
