//! Uniform blocks shared between the CPU and the shaders.
//!
//! Layouts follow WGSL's uniform rules: every `vec3` is followed by a scalar
//! so that it fills a whole 16-byte slot.

use std::num::NonZeroU64;

use cgmath::{Matrix4, Vector3};

use crate::data_structures::{
    ledger::{GpuResource, ResourceId, ResourceKind, ResourceLedger},
    scene::Light,
};
use crate::error::RenderError;

/// Frame-wide data of the opaque forward program.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ForwardUniform {
    pub projection: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub camera_position: [f32; 3],
    pub far_plane: f32,
    pub light_position: [f32; 3],
    pub light_strength: f32,
    pub light_color: [f32; 3],
    // Due to uniforms requiring 16 byte (4 float) spacing, we need to use a padding field here
    pub _padding: u32,
}

impl ForwardUniform {
    pub fn new(
        projection: Matrix4<f32>,
        view: Matrix4<f32>,
        camera_position: Vector3<f32>,
        light: &Light,
        far_plane: f32,
    ) -> Self {
        Self {
            projection: projection.into(),
            view: view.into(),
            camera_position: camera_position.into(),
            far_plane,
            light_position: light.position.into(),
            light_strength: light.strength,
            light_color: light.color.into(),
            _padding: 0,
        }
    }
}

/// Frame-wide data of the translucent program.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TranslucentUniform {
    pub projection: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub tint: [f32; 3],
    pub _padding: u32,
}

/// All six face matrices of the shadow pass plus what the fragment stage
/// needs to encode distance.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ShadowUniform {
    pub face_matrices: [[[f32; 4]; 4]; 6],
    pub light_position: [f32; 3],
    pub far_plane: f32,
}

/// Selects one of [`ShadowUniform::face_matrices`].
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FaceUniform {
    pub index: u32,
    pub _padding: [u32; 3],
}

/// Per-draw data: the model matrix and the two-sided lighting switch.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ObjectUniform {
    pub model: [[f32; 4]; 4],
    pub two_sided: u32,
    pub _padding: [u32; 3],
}

impl ObjectUniform {
    pub fn new(model: Matrix4<f32>, two_sided: bool) -> Self {
        Self {
            model: model.into(),
            two_sided: two_sided as u32,
            _padding: [0; 3],
        }
    }
}

pub fn align_to(size: u64, alignment: u64) -> u64 {
    size.div_ceil(alignment) * alignment
}

/// A uniform buffer holding one value.
#[derive(Debug)]
pub struct UniformBuffer {
    pub buffer: wgpu::Buffer,
    id: ResourceId,
}

impl UniformBuffer {
    pub fn new<T: bytemuck::Pod>(
        device: &wgpu::Device,
        label: &str,
        ledger: &mut ResourceLedger,
    ) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: std::mem::size_of::<T>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let id = ledger.track(ResourceKind::UniformBuffer, label);
        Self { buffer, id }
    }

    pub fn write<T: bytemuck::Pod>(&self, queue: &wgpu::Queue, value: &T) {
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(value));
    }
}

impl GpuResource for UniformBuffer {
    fn resource_id(&self) -> ResourceId {
        self.id
    }

    fn destroy(self, ledger: &mut ResourceLedger) -> Result<(), RenderError> {
        self.buffer.destroy();
        ledger.release(self.id)
    }
}

/// A uniform buffer of fixed-size slots addressed with dynamic offsets.
#[derive(Debug)]
pub struct UniformSlots {
    pub buffer: wgpu::Buffer,
    pub stride: u64,
    pub item_size: u64,
    pub capacity: u32,
    id: ResourceId,
}

impl UniformSlots {
    pub fn new<T: bytemuck::Pod>(
        device: &wgpu::Device,
        label: &str,
        capacity: u32,
        ledger: &mut ResourceLedger,
    ) -> Self {
        let item_size = std::mem::size_of::<T>() as u64;
        let alignment = device.limits().min_uniform_buffer_offset_alignment as u64;
        let stride = align_to(item_size, alignment);
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: stride * capacity.max(1) as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let id = ledger.track(ResourceKind::UniformBuffer, label);
        Self {
            buffer,
            stride,
            item_size,
            capacity,
            id,
        }
    }

    pub fn offset(&self, slot: u32) -> wgpu::DynamicOffset {
        (slot as u64 * self.stride) as wgpu::DynamicOffset
    }

    /// Writes `items` into consecutive slots starting at slot 0.
    pub fn write<T: bytemuck::Pod>(
        &self,
        queue: &wgpu::Queue,
        items: &[T],
    ) -> Result<(), RenderError> {
        if items.len() > self.capacity as usize {
            return Err(RenderError::Plan(format!(
                "{} uniform slots requested, {} available",
                items.len(),
                self.capacity
            )));
        }
        let mut staging = vec![0u8; (self.stride as usize) * items.len()];
        for (slot, item) in staging.chunks_mut(self.stride as usize).zip(items) {
            let bytes = bytemuck::bytes_of(item);
            slot[..bytes.len()].copy_from_slice(bytes);
        }
        if !staging.is_empty() {
            queue.write_buffer(&self.buffer, 0, &staging);
        }
        Ok(())
    }

    pub fn binding(&self) -> wgpu::BindingResource<'_> {
        wgpu::BindingResource::Buffer(wgpu::BufferBinding {
            buffer: &self.buffer,
            offset: 0,
            size: NonZeroU64::new(self.item_size),
        })
    }
}

impl GpuResource for UniformSlots {
    fn resource_id(&self) -> ResourceId {
        self.id
    }

    fn destroy(self, ledger: &mut ResourceLedger) -> Result<(), RenderError> {
        self.buffer.destroy();
        ledger.release(self.id)
    }
}

pub fn uniform_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    dynamic: Option<u64>,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: dynamic.is_some(),
            min_binding_size: dynamic.and_then(NonZeroU64::new),
        },
        count: None,
    }
}

/// Layout of the per-draw object slot.
pub fn object_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[uniform_entry(
            0,
            wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            Some(std::mem::size_of::<ObjectUniform>() as u64),
        )],
        label: Some("object_bind_group_layout"),
    })
}
