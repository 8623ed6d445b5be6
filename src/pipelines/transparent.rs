use crate::{
    data_structures::{
        model::{ModelVertex, Vertex},
        texture::DepthTexture,
    },
    pipelines::{ShaderPair, basic::mk_render_pipeline, light::uniform_entry},
};

pub fn translucent_frame_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[uniform_entry(
            0,
            wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            None,
        )],
        label: Some("translucent_frame_bind_group_layout"),
    })
}

pub fn translucent_frame_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    uniform: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: uniform.as_entire_binding(),
        }],
        label: Some("translucent_frame_bind_group"),
    })
}

/**
 * Unlit, tinted and alpha blended (source alpha, one minus source alpha).
 *
 * Used for the light bulb, which is drawn after every opaque prop so the
 * blend sees the finished opaque image behind it.
 */
pub fn mk_translucent_pipeline(
    device: &wgpu::Device,
    color_format: wgpu::TextureFormat,
    frame_layout: &wgpu::BindGroupLayout,
    material_layout: &wgpu::BindGroupLayout,
    object_layout: &wgpu::BindGroupLayout,
    shaders: &ShaderPair,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Translucent Pipeline Layout"),
        bind_group_layouts: &[frame_layout, material_layout, object_layout],
        immediate_size: 0,
    });
    mk_render_pipeline(
        device,
        "Translucent Pipeline",
        &layout,
        color_format,
        Some(wgpu::BlendState::ALPHA_BLENDING),
        Some(DepthTexture::FORMAT),
        &[ModelVertex::desc()],
        shaders,
    )
}
