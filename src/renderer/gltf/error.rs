//! Error types for glTF import.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a model import. There is no partial result: a model
/// either imports completely or not at all.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The document or one of its binary containers is malformed.
    #[error("malformed glTF: {0}")]
    Parse(String),
    /// The document is valid glTF but uses something this importer doesn't
    /// handle, e.g. sparse accessors or non metallic-roughness materials.
    #[error("unsupported glTF feature: {0}")]
    UnsupportedFeature(String),
    /// A document, buffer or image file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// An image was read but could not be decoded.
    #[error("failed to decode image {index}: {source}")]
    ImageDecode {
        index: usize,
        #[source]
        source: image::ImageError,
    },
}

impl ImportError {
    pub(crate) fn parse(message: impl Into<String>) -> ImportError {
        ImportError::Parse(message.into())
    }

    pub(crate) fn unsupported(message: impl Into<String>) -> ImportError {
        ImportError::UnsupportedFeature(message.into())
    }
}
