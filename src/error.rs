use thiserror::Error;

use crate::renderer::gltf::ImportError;
use crate::renderer::GpuResourceError;

/// Any error that aborts loading or rendering a model.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Gpu(#[from] GpuResourceError),
}
