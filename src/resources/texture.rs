use std::path::Path;

use image::{RgbaImage, imageops::FilterType};

use crate::error::AssetError;

/// Layout of the material slot: one filterable 2D texture and its sampler.
pub fn material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("material_bind_group_layout"),
    })
}

pub fn decode_rgba(bytes: &[u8], path: &Path) -> Result<RgbaImage, AssetError> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgba8())
        .map_err(|source| AssetError::Image {
            path: path.to_path_buf(),
            source,
        })
}

/// Number of levels in a full mip chain down to 1x1.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    u32::BITS - width.max(height).max(1).leading_zeros()
}

/// Builds every mip level from the base image, each one filtered down from
/// the previous level.
pub fn build_mip_chain(base: RgbaImage) -> Vec<RgbaImage> {
    let count = mip_level_count(base.width(), base.height()) as usize;
    let mut levels = Vec::with_capacity(count);
    levels.push(base);
    while levels.len() < count {
        let Some(previous) = levels.last() else { break };
        let width = (previous.width() / 2).max(1);
        let height = (previous.height() / 2).max(1);
        let next = image::imageops::resize(previous, width, height, FilterType::Triangle);
        levels.push(next);
    }
    levels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_count_follows_longest_side() {
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(2, 2), 2);
        assert_eq!(mip_level_count(256, 256), 9);
        assert_eq!(mip_level_count(640, 480), 10);
        assert_eq!(mip_level_count(5, 1), 3);
    }

    #[test]
    fn chain_halves_down_to_one_texel() {
        let base = RgbaImage::from_pixel(8, 2, image::Rgba([10, 20, 30, 255]));
        let sizes: Vec<_> = build_mip_chain(base).iter().map(|l| l.dimensions()).collect();
        assert_eq!(sizes, vec![(8, 2), (4, 1), (2, 1), (1, 1)]);
    }

    #[test]
    fn flat_colour_survives_filtering() {
        let base = RgbaImage::from_pixel(4, 4, image::Rgba([200, 100, 50, 255]));
        let chain = build_mip_chain(base);
        assert_eq!(*chain[2].get_pixel(0, 0), image::Rgba([200, 100, 50, 255]));
    }

    #[test]
    fn undecodable_bytes_name_the_file() {
        let err = decode_rgba(b"not an image", Path::new("textures/broken.png")).unwrap_err();
        assert_eq!(err.path(), Path::new("textures/broken.png"));
    }
}
