//! The binary glTF container: a 12 byte header followed by a JSON chunk and
//! an optional BIN chunk.

use super::ImportError;

const MAGIC: u32 = 0x4654_6C67; // "glTF"
const CHUNK_JSON: u32 = 0x4E4F_534A;
const CHUNK_BIN: u32 = 0x004E_4942;
const HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;

pub struct Glb<'a> {
    pub json: &'a str,
    pub bin: Option<&'a [u8]>,
}

pub fn is_glb(bytes: &[u8]) -> bool {
    read_u32(bytes, 0) == Some(MAGIC)
}

pub fn parse(bytes: &[u8]) -> Result<Glb<'_>, ImportError> {
    if !is_glb(bytes) {
        return Err(ImportError::parse("missing GLB magic"));
    }
    let (Some(version), Some(length)) = (read_u32(bytes, 4), read_u32(bytes, 8)) else {
        return Err(ImportError::parse("truncated GLB header"));
    };
    if version != 2 {
        return Err(ImportError::unsupported(format!(
            "GLB container version {version}"
        )));
    }
    let length = length as usize;
    if length > bytes.len() {
        return Err(ImportError::parse(format!(
            "GLB header claims {length} bytes but only {} are present",
            bytes.len()
        )));
    }
    let bytes = &bytes[..length];

    let mut chunks = Vec::new();
    let mut offset = HEADER_LEN;
    while offset < bytes.len() {
        let (chunk_type, data) = read_chunk(bytes, offset)?;
        offset += CHUNK_HEADER_LEN + data.len();
        chunks.push((chunk_type, data));
    }

    let json = match chunks.first() {
        Some(&(CHUNK_JSON, data)) => std::str::from_utf8(data)
            .map_err(|err| ImportError::parse(format!("GLB JSON chunk is not UTF-8: {err}")))?,
        _ => return Err(ImportError::parse("first GLB chunk is not JSON")),
    };
    let bin = match chunks.get(1) {
        Some(&(CHUNK_BIN, data)) => Some(data),
        _ => None,
    };
    Ok(Glb { json, bin })
}

fn read_chunk(bytes: &[u8], offset: usize) -> Result<(u32, &[u8]), ImportError> {
    let truncated = || ImportError::parse(format!("truncated GLB chunk at byte {offset}"));
    let length = read_u32(bytes, offset).ok_or_else(truncated)? as usize;
    let chunk_type = read_u32(bytes, offset + 4).ok_or_else(truncated)?;
    let start = offset + CHUNK_HEADER_LEN;
    let data = bytes
        .get(start..start.checked_add(length).ok_or_else(truncated)?)
        .ok_or_else(truncated)?;
    Ok((chunk_type, data))
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let word = bytes.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([word[0], word[1], word[2], word[3]]))
}
