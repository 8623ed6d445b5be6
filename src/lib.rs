//! shade-ngin
//!
//! A small shadow-mapped forward renderer. One point light casts
//! omnidirectional shadows through a distance cubemap that is rebuilt every
//! frame; the scene is then drawn from a first-person camera, opaque props
//! first and a blended light bulb last.
//!
//! High-level modules
//! - `camera`: the first-person player and the camera projection
//! - `config`: renderer settings and the asset table
//! - `context`: GPU instance, device, queue and surface
//! - `data_structures`: scene objects, meshes, materials, textures, resource ledger
//! - `error`: error types of asset loading and rendering
//! - `flow`: the windowed host and its input handling
//! - `pipelines`: the shadow, forward and translucent programs and their uniforms
//! - `render`: GPU-free frame plans and binding-state tracking
//! - `renderer`: owns every GPU resource and executes frame plans
//! - `resources`: loaders for meshes, textures and shader sources
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod flow;
pub mod pipelines;
pub mod render;
pub mod renderer;
pub mod resources;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;
pub use config::RendererConfig;
pub use data_structures::scene::{Light, Prop, Scene, SceneSnapshot};
pub use renderer::Renderer;
