//! Error types for asset loading and rendering.
//!
//! Everything that can fail at startup (missing files, malformed meshes,
//! shaders that do not compile, an unusable shadow target) is reported as a
//! [`RenderError`]. Per-frame GPU errors are not errors of this kind: they are
//! collected by [`crate::context::GpuErrorLog`] and logged.

use std::path::PathBuf;

use thiserror::Error;

/// A line of a mesh description that could not be parsed.
#[derive(Debug, Error, PartialEq)]
pub enum MeshError {
    #[error("line {line}: expected {expected} values after `{keyword}`, found {found}")]
    TokenCount {
        line: usize,
        keyword: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: `{token}` is not a number")]
    BadNumber { line: usize, token: String },
    #[error("line {line}: face corner `{corner}` must be position/texcoord/normal")]
    BadCorner { line: usize, corner: String },
    #[error("line {line}: {space} index {index} is out of range (1..={len})")]
    IndexOutOfRange {
        line: usize,
        space: &'static str,
        index: i64,
        len: usize,
    },
    #[error("line {line}: a face needs at least 3 corners, found {found}")]
    DegenerateFace { line: usize, found: usize },
}

/// Failure to load an asset file. Always names the offending path.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("could not read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not decode image {path}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("malformed mesh {path}")]
    Mesh {
        path: PathBuf,
        #[source]
        source: MeshError,
    },
}

impl AssetError {
    pub fn path(&self) -> &std::path::Path {
        match self {
            AssetError::Io { path, .. } => path,
            AssetError::Image { path, .. } => path,
            AssetError::Mesh { path, .. } => path,
        }
    }
}

/// Anything that stops the renderer from starting or from drawing a frame.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error("shader {path} failed to compile: {message}")]
    Shader { path: PathBuf, message: String },
    #[error("pipeline `{label}` failed to link: {message}")]
    Link { label: &'static str, message: String },
    #[error("shadow target is incomplete: {0}")]
    IncompleteShadowTarget(String),
    #[error("no suitable graphics adapter: {0}")]
    Adapter(String),
    #[error("could not create a device: {0}")]
    Device(String),
    #[error("could not create a surface: {0}")]
    Surface(String),
    #[error("frame plan is invalid: {0}")]
    Plan(String),
    #[error("{what} was released twice")]
    DoubleRelease { what: String },
}
