use std::path::Path;

use crate::{
    data_structures::{
        ledger::ResourceLedger,
        model::{FLOATS_PER_VERTEX, Material, Mesh},
        texture::Texture,
    },
    error::AssetError,
};

/**
 * This module contains all logic for loading meshes, textures and shader
 * sources from the asset directory.
 */
pub mod mesh;
pub mod texture;

pub async fn load_string(path: &Path) -> Result<String, AssetError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| AssetError::Io {
            path: path.to_path_buf(),
            source,
        })
}

pub async fn load_binary(path: &Path) -> Result<Vec<u8>, AssetError> {
    tokio::fs::read(path).await.map_err(|source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads and parses a mesh file into interleaved vertex floats.
pub async fn load_mesh_floats(path: &Path) -> Result<Vec<f32>, AssetError> {
    let text = load_string(path).await?;
    mesh::parse_obj(&text).map_err(|source| AssetError::Mesh {
        path: path.to_path_buf(),
        source,
    })
}

pub async fn load_mesh(
    path: &Path,
    device: &wgpu::Device,
    ledger: &mut ResourceLedger,
) -> Result<Mesh, AssetError> {
    let floats = load_mesh_floats(path).await?;
    let name = path.display().to_string();
    log::info!(
        "loaded mesh {} ({} vertices)",
        name,
        floats.len() / FLOATS_PER_VERTEX
    );
    Ok(Mesh::from_floats(device, &name, &floats, ledger))
}

pub async fn load_material(
    path: &Path,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    ledger: &mut ResourceLedger,
) -> Result<Material, AssetError> {
    let bytes = load_binary(path).await?;
    let base = texture::decode_rgba(&bytes, path)?;
    let name = path.display().to_string();
    log::info!("loaded texture {} ({}x{})", name, base.width(), base.height());
    let levels = texture::build_mip_chain(base);
    let diffuse = Texture::from_mip_chain(device, queue, &levels, &name);
    Ok(Material::new(device, &name, diffuse, layout, ledger))
}
