//! Command line options and resource path resolution.

use std::path::{Path, PathBuf};

use clap::Parser;

/// glTF playground: loads a model and orbits a camera around it.
#[derive(Debug, Clone, Parser)]
#[command(version, about)]
pub struct Args {
    /// Model to load, relative to the asset root. Either a `.glb`/`.gltf`
    /// file or a directory `NAME` containing `NAME.gltf`.
    #[arg(default_value = "gltf/AnimatedCube")]
    pub model: PathBuf,

    /// Directory the model path is resolved against. Defaults to
    /// `../resources` next to the executable.
    #[arg(long)]
    pub resource_root: Option<PathBuf>,

    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    #[arg(long, default_value_t = 720)]
    pub height: u32,

    /// Distance between the camera and the model origin.
    #[arg(long, default_value_t = 3.0)]
    pub distance: f32,

    /// Camera orbit speed in degrees per second.
    #[arg(long, default_value_t = 20.0)]
    pub orbit_speed: f32,

    /// Longest frame delta in seconds; slower frames are simulated as this.
    #[arg(long, default_value_t = 1.0 / 60.0)]
    pub max_time_step: f32,

    /// Number of frames to render when running without a window.
    #[arg(long, default_value_t = 1)]
    pub frames: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// Models and textures shared by every backend.
    Common,
    /// Shader sources overriding the ones built into the backend.
    Shader,
}

impl ResourceKind {
    fn root(self) -> &'static str {
        match self {
            ResourceKind::Common => "../resources",
            ResourceKind::Shader => "../shaders/glsl330",
        }
    }
}

/// Maps resource categories to directories relative to a base directory,
/// usually the one the executable lives in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePaths {
    base: PathBuf,
    common_override: Option<PathBuf>,
}

impl ResourcePaths {
    pub fn new(base: impl Into<PathBuf>) -> ResourcePaths {
        ResourcePaths {
            base: base.into(),
            common_override: None,
        }
    }

    /// Resolves relative to the running executable's directory, falling back
    /// to the working directory if it can't be determined.
    pub fn from_executable() -> ResourcePaths {
        let base = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));
        ResourcePaths::new(base)
    }

    pub fn from_args(args: &Args) -> ResourcePaths {
        let mut paths = ResourcePaths::from_executable();
        paths.common_override = args.resource_root.clone();
        paths
    }

    pub fn resolve(&self, kind: ResourceKind, relative: impl AsRef<Path>) -> PathBuf {
        let root = match (kind, &self.common_override) {
            (ResourceKind::Common, Some(root)) => root.clone(),
            _ => self.base.join(kind.root()),
        };
        root.join(relative)
    }
}
