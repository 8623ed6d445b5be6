//! Meshes, materials and the vertex layout they share.
//!
//! A [`Mesh`] is a non-indexed triangle list of interleaved [`ModelVertex`]
//! data. A [`Material`] is a single mipmapped diffuse texture together with
//! the bind group that exposes it to the shaders.
//!
//! # Key types
//!
//! - [`ModelVertex`]: position, texture coordinate and normal (8 floats)
//! - [`Mesh`]: GPU vertex buffer plus its vertex count
//! - [`Material`]: diffuse texture, sampler and bind group
//! - [`DrawMesh`]: extension trait to draw a mesh on a render pass

use wgpu::util::DeviceExt;

use crate::{
    data_structures::{
        ledger::{GpuResource, ResourceId, ResourceKind, ResourceLedger},
        texture::Texture,
    },
    error::RenderError,
};

/// Floats per interleaved vertex.
pub const FLOATS_PER_VERTEX: usize = 8;

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

#[derive(Debug)]
pub struct Mesh {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub vertex_count: u32,
    id: ResourceId,
}

impl Mesh {
    /// Uploads interleaved vertex floats into an immutable vertex buffer.
    pub fn from_floats(
        device: &wgpu::Device,
        name: &str,
        floats: &[f32],
        ledger: &mut ResourceLedger,
    ) -> Self {
        debug_assert_eq!(floats.len() % FLOATS_PER_VERTEX, 0);
        let vertex_count = (floats.len() / FLOATS_PER_VERTEX) as u32;
        if vertex_count == 0 {
            log::warn!("mesh {} has no triangles", name);
        }
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Vertex Buffer", name)),
            contents: bytemuck::cast_slice(floats),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let id = ledger.track(ResourceKind::Mesh, name);
        Self {
            name: name.to_string(),
            vertex_buffer,
            vertex_count,
            id,
        }
    }
}

impl GpuResource for Mesh {
    fn resource_id(&self) -> ResourceId {
        self.id
    }

    fn destroy(self, ledger: &mut ResourceLedger) -> Result<(), RenderError> {
        self.vertex_buffer.destroy();
        ledger.release(self.id)
    }
}

#[derive(Debug)]
pub struct Material {
    pub name: String,
    pub diffuse_texture: Texture,
    pub bind_group: wgpu::BindGroup,
    id: ResourceId,
}

impl Material {
    pub fn new(
        device: &wgpu::Device,
        name: &str,
        diffuse_texture: Texture,
        layout: &wgpu::BindGroupLayout,
        ledger: &mut ResourceLedger,
    ) -> Self {
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&diffuse_texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&diffuse_texture.sampler),
                },
            ],
            label: Some(name),
        });
        let id = ledger.track(ResourceKind::Texture, name);
        Self {
            name: name.to_string(),
            diffuse_texture,
            bind_group,
            id,
        }
    }

    /// Binds the diffuse texture to the material slot of `pass`.
    pub fn bind(&self, pass: &mut wgpu::RenderPass<'_>, group: u32) {
        pass.set_bind_group(group, &self.bind_group, &[]);
    }
}

impl GpuResource for Material {
    fn resource_id(&self) -> ResourceId {
        self.id
    }

    fn destroy(self, ledger: &mut ResourceLedger) -> Result<(), RenderError> {
        self.diffuse_texture.texture.destroy();
        ledger.release(self.id)
    }
}

pub trait DrawMesh<'a> {
    fn draw_mesh(&mut self, mesh: &'a Mesh);
}

impl<'a, 'b> DrawMesh<'b> for wgpu::RenderPass<'a>
where
    'b: 'a,
{
    fn draw_mesh(&mut self, mesh: &'b Mesh) {
        if mesh.vertex_count == 0 {
            return;
        }
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.draw(0..mesh.vertex_count, 0..1);
    }
}
