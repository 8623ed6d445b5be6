use anyhow::*;
use fs_extra::copy_items;
use fs_extra::dir::CopyOptions;
use std::env;
use std::path::PathBuf;

/// Shader sources the renderer loads at startup, relative to `assets/`.
const SHADERS: [&str; 6] = [
    "shaders/forward_vertex.wgsl",
    "shaders/forward_fragment.wgsl",
    "shaders/translucent_vertex.wgsl",
    "shaders/translucent_fragment.wgsl",
    "shaders/shadow_vertex.wgsl",
    "shaders/shadow_fragment.wgsl",
];

fn main() -> Result<()> {
    // This tells Cargo to rerun this script if something in /assets/ changes.
    println!("cargo:rerun-if-changed=assets/*");
    println!("cargo:rerun-if-changed=assets/shaders/*");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let assets_src = manifest_dir.join("assets");
    if !assets_src.exists() {
        return Ok(());
    }

    for shader in SHADERS {
        let path = assets_src.join(shader);
        if !path.is_file() {
            bail!("missing shader source {}", path.display());
        }
    }

    let out_dir = env::var("OUT_DIR")?;
    let mut copy_options = CopyOptions::new();
    copy_options.overwrite = true;
    let paths_to_copy = vec!["assets/"];
    copy_items(&paths_to_copy, out_dir, &copy_options)?;

    Ok(())
}
