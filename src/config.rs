//! Renderer configuration.
//!
//! [`RendererConfig`] carries every tunable the renderer reads at startup. The
//! defaults reproduce the demo: a 640x480 viewport, a 100x100 shadow cubemap
//! and a far plane of 50 units shared by the shadow and forward passes.

use std::path::{Path, PathBuf};

use crate::data_structures::scene::Prop;

#[derive(Clone, Debug)]
pub struct RendererConfig {
    pub width: u32,
    pub height: u32,
    /// Edge length of each cubemap face in texels.
    pub shadow_resolution: u32,
    /// Largest light-to-surface distance the shadow map can encode.
    pub far_plane: f32,
    pub shadow_near: f32,
    pub camera_near: f32,
    /// Vertical field of view in degrees.
    pub fov_y: f32,
    pub clear_colour: wgpu::Color,
    pub asset_root: PathBuf,
    /// Log every captured GPU error at error level instead of debug level.
    pub debug_validation: bool,
    /// Ask for an uncapped present mode, falling back to FIFO.
    pub uncapped: bool,
    pub assets: SceneAssets,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            shadow_resolution: 100,
            far_plane: 50.0,
            shadow_near: 0.01,
            camera_near: 0.1,
            fov_y: 45.0,
            clear_colour: wgpu::Color {
                r: 0.1,
                g: 0.1,
                b: 0.1,
                a: 1.0,
            },
            asset_root: PathBuf::from("./assets"),
            debug_validation: cfg!(debug_assertions),
            uncapped: true,
            assets: SceneAssets::default(),
        }
    }
}

impl RendererConfig {
    pub fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_shadow_resolution(mut self, resolution: u32) -> Self {
        self.shadow_resolution = resolution;
        self
    }

    pub fn with_asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.asset_root = root.into();
        self
    }

    pub fn with_debug_validation(mut self, on: bool) -> Self {
        self.debug_validation = on;
        self
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    pub fn asset_path(&self, file: impl AsRef<Path>) -> PathBuf {
        self.asset_root.join(file)
    }

    pub fn shader_path(&self, file: &str) -> PathBuf {
        self.asset_root.join("shaders").join(file)
    }
}

/// Mesh and texture files, one pair per [`Prop`].
#[derive(Clone, Debug)]
pub struct SceneAssets {
    entries: [(Prop, &'static str, &'static str); 5],
}

impl Default for SceneAssets {
    fn default() -> Self {
        Self {
            entries: [
                (Prop::Shade, "models/shade.obj", "textures/lampshade.png"),
                (Prop::Base, "models/base.obj", "textures/marble.png"),
                (Prop::Ground, "models/ground.obj", "textures/dark_wood.png"),
                (Prop::Movable, "models/cube.obj", "textures/wood.png"),
                (Prop::Bulb, "models/bulb.obj", "textures/glow.png"),
            ],
        }
    }
}

impl SceneAssets {
    pub fn mesh(&self, prop: Prop) -> &'static str {
        self.entry(prop).1
    }

    pub fn texture(&self, prop: Prop) -> &'static str {
        self.entry(prop).2
    }

    pub fn set(&mut self, prop: Prop, mesh: &'static str, texture: &'static str) {
        if let Some(entry) = self.entries.iter_mut().find(|(p, _, _)| *p == prop) {
            *entry = (prop, mesh, texture);
        }
    }

    fn entry(&self, prop: Prop) -> &(Prop, &'static str, &'static str) {
        // every prop has exactly one entry
        &self.entries[prop.index()]
    }
}
