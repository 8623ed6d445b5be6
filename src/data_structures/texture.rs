//! GPU textures used by the renderer.
//!
//! This module provides [`Texture`] (mipmapped 2D colour textures for
//! materials), [`DepthTexture`] (depth attachments) and [`ShadowCubemap`]
//! (the six-face colour target the shadow pass renders distances into).

use image::RgbaImage;

use crate::data_structures::ledger::{
    GpuResource, ResourceId, ResourceKind, ResourceLedger,
};
use crate::error::RenderError;

/// A mipmapped 2D texture with a view and sampler.
#[derive(Debug)]
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl Texture {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

    /// Uploads a full mip chain. `levels[0]` is the base image and each
    /// following level is half the size of the previous one.
    pub fn from_mip_chain(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        levels: &[RgbaImage],
        label: &str,
    ) -> Self {
        let (width, height) = levels
            .first()
            .map(|base| base.dimensions())
            .unwrap_or((1, 1));
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: levels.len().max(1) as u32,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (mip_level, level) in levels.iter().enumerate() {
            let (level_width, level_height) = level.dimensions();
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    aspect: wgpu::TextureAspect::All,
                    texture: &texture,
                    mip_level: mip_level as u32,
                    origin: wgpu::Origin3d::ZERO,
                },
                level.as_raw(),
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * level_width),
                    rows_per_image: Some(level_height),
                },
                wgpu::Extent3d {
                    width: level_width,
                    height: level_height,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }
}

/// A depth attachment.
#[derive(Debug)]
pub struct DepthTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    id: ResourceId,
}

impl DepthTexture {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    pub fn new(
        device: &wgpu::Device,
        size: [u32; 2],
        label: &str,
        ledger: &mut ResourceLedger,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let id = ledger.track(ResourceKind::DepthTarget, label);
        Self { texture, view, id }
    }
}

impl GpuResource for DepthTexture {
    fn resource_id(&self) -> ResourceId {
        self.id
    }

    fn destroy(self, ledger: &mut ResourceLedger) -> Result<(), RenderError> {
        self.texture.destroy();
        ledger.release(self.id)
    }
}

/// Six square colour layers viewed as a cube for sampling and as six 2D
/// views for rendering, plus the depth attachment shared by all faces.
#[derive(Debug)]
pub struct ShadowCubemap {
    pub texture: wgpu::Texture,
    pub cube_view: wgpu::TextureView,
    pub face_views: [wgpu::TextureView; 6],
    pub sampler: wgpu::Sampler,
    pub depth: DepthTexture,
    pub resolution: u32,
    cubemap_id: ResourceId,
    target_id: ResourceId,
}

impl ShadowCubemap {
    /// Distance is stored as a fraction of the far plane in a half float.
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

    pub fn new(device: &wgpu::Device, resolution: u32, ledger: &mut ResourceLedger) -> Self {
        let resolution = resolution.max(1);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("shadow cubemap"),
            size: wgpu::Extent3d {
                width: resolution,
                height: resolution,
                depth_or_array_layers: 6,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let cube_view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("shadow cubemap view"),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            array_layer_count: Some(6),
            ..Default::default()
        });
        let face_views = std::array::from_fn(|face| {
            texture.create_view(&wgpu::TextureViewDescriptor {
                label: Some("shadow face view"),
                dimension: Some(wgpu::TextureViewDimension::D2),
                base_array_layer: face as u32,
                array_layer_count: Some(1),
                ..Default::default()
            })
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("shadow cubemap sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });
        let cubemap_id = ledger.track(ResourceKind::Cubemap, "shadow cubemap");
        let target_id = ledger.track(ResourceKind::ShadowTarget, "shadow target");
        let depth = DepthTexture::new(device, [resolution, resolution], "shadow depth", ledger);

        Self {
            texture,
            cube_view,
            face_views,
            sampler,
            depth,
            resolution,
            cubemap_id,
            target_id,
        }
    }
}

impl GpuResource for ShadowCubemap {
    fn resource_id(&self) -> ResourceId {
        self.cubemap_id
    }

    fn destroy(self, ledger: &mut ResourceLedger) -> Result<(), RenderError> {
        self.texture.destroy();
        ledger.release(self.target_id)?;
        ledger.release(self.cubemap_id)?;
        self.depth.destroy(ledger)
    }
}
