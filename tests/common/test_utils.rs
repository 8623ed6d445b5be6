use std::path::PathBuf;

use shade_ngin::config::RendererConfig;
#[cfg(feature = "integration-tests")]
use shade_ngin::context::Context;

/// The crate's own asset directory, independent of the working directory.
#[allow(dead_code)]
pub(crate) fn asset_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets")
}

#[allow(dead_code)]
pub(crate) fn test_config() -> RendererConfig {
    RendererConfig::default()
        .with_asset_root(asset_root())
        .with_viewport(256, 192)
        .with_debug_validation(true)
}

/// Linear clear colour as it lands in an sRGB target.
#[allow(dead_code)]
pub(crate) fn srgb_u8(linear: f64) -> u8 {
    let linear = linear.clamp(0.0, 1.0);
    let encoded = if linear <= 0.0031308 {
        linear * 12.92
    } else {
        1.055 * linear.powf(1.0 / 2.4) - 0.055
    };
    (encoded * 255.0).round() as u8
}

#[cfg(feature = "integration-tests")]
#[allow(dead_code)]
pub(crate) fn render_target(ctx: &Context) -> wgpu::Texture {
    ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Test Output Texture"),
        size: wgpu::Extent3d {
            width: ctx.config.width,
            height: ctx.config.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: ctx.config.format,
        usage: wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    })
}
