//! GPU context: instance, adapter, device, queue and (optionally) a window
//! surface.
//!
//! # Key types
//!
//! - [`Context`] owns the device/queue pair and the surface configuration
//! - [`GpuErrorLog`] collects errors wgpu reports outside of any call

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicU64, Ordering},
};

use winit::window::Window;

use crate::{config::RendererConfig, error::RenderError};

/// Counts uncaptured GPU errors and keeps the most recent message.
#[derive(Clone, Debug, Default)]
pub struct GpuErrorLog {
    count: Arc<AtomicU64>,
    last: Arc<Mutex<Option<String>>>,
}

impl GpuErrorLog {
    pub fn install(&self, device: &wgpu::Device) {
        let log = self.clone();
        device.on_uncaptured_error(Arc::new(move |error: wgpu::Error| {
            log.record(error.to_string());
        }));
    }

    pub fn record(&self, message: String) {
        self.count.fetch_add(1, Ordering::SeqCst);
        log::debug!("gpu error: {}", message);
        if let Ok(mut last) = self.last.lock() {
            *last = Some(message);
        }
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::SeqCst)
    }

    pub fn last_message(&self) -> Option<String> {
        self.last.lock().ok().and_then(|last| last.clone())
    }
}

#[derive(Debug)]
pub struct Context {
    pub(crate) window: Option<Arc<Window>>,
    pub surface: Option<wgpu::Surface<'static>>,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub errors: GpuErrorLog,
}

impl Context {
    /// Creates a context that presents to `window`.
    pub async fn new(window: Arc<Window>, settings: &RendererConfig) -> Result<Self, RenderError> {
        let size = window.inner_size();
        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| RenderError::Surface(e.to_string()))?;
        let adapter = request_adapter(&instance, Some(&surface)).await?;
        let (device, queue, errors) = request_device(&adapter).await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| RenderError::Surface("surface reports no formats".to_string()))?;
        let present_mode = if settings.uncapped
            && surface_caps
                .present_modes
                .contains(&wgpu::PresentMode::Immediate)
        {
            wgpu::PresentMode::Immediate
        } else {
            wgpu::PresentMode::Fifo
        };
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        log::info!(
            "surface {:?} {}x{} ({:?})",
            config.format,
            config.width,
            config.height,
            config.present_mode
        );

        Ok(Self {
            window: Some(window),
            surface: Some(surface),
            adapter,
            device,
            queue,
            config,
            errors,
        })
    }

    /// Creates a context without a window. Frames are rendered into
    /// textures of `config.format`.
    pub async fn headless(settings: &RendererConfig) -> Result<Self, RenderError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = request_adapter(&instance, None).await?;
        let (device, queue, errors) = request_device(&adapter).await?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            width: settings.width.max(1),
            height: settings.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        Ok(Self {
            window: None,
            surface: None,
            adapter,
            device,
            queue,
            config,
            errors,
        })
    }

    pub fn window(&self) -> Option<&Arc<Window>> {
        self.window.as_ref()
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            log::warn!("ignoring resize to {}x{}", width, height);
            return;
        }
        self.config.width = width;
        self.config.height = height;
        if let Some(surface) = &self.surface {
            surface.configure(&self.device, &self.config);
        }
    }

    /// Copies a rendered colour texture back to the CPU.
    #[cfg(feature = "integration-tests")]
    pub async fn read_texture(
        &self,
        texture: &wgpu::Texture,
    ) -> anyhow::Result<image::RgbaImage> {
        let width = texture.width();
        let height = texture.height();
        let unpadded = 4 * width;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded = unpadded.div_ceil(align) * align;
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback buffer"),
            size: (padded * height) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("readback encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            texture.size(),
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
        let slice = buffer.slice(..);
        slice.map_async(wgpu::MapMode::Read, move |result| {
            tx.send(result).ok();
        });
        self.device.poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: Some(std::time::Duration::from_secs(3)),
        })?;
        rx.receive()
            .await
            .ok_or_else(|| anyhow::anyhow!("readback channel closed"))??;

        let data = slice.get_mapped_range();
        let mut pixels = Vec::with_capacity((unpadded * height) as usize);
        for row in data.chunks(padded as usize) {
            pixels.extend_from_slice(&row[..unpadded as usize]);
        }
        drop(data);
        buffer.unmap();
        image::RgbaImage::from_raw(width, height, pixels)
            .ok_or_else(|| anyhow::anyhow!("readback size mismatch"))
    }
}

async fn request_adapter(
    instance: &wgpu::Instance,
    surface: Option<&wgpu::Surface<'_>>,
) -> Result<wgpu::Adapter, RenderError> {
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: surface,
            force_fallback_adapter: false,
        })
        .await
        .map_err(|e| RenderError::Adapter(e.to_string()))?;
    let info = adapter.get_info();
    log::info!("adapter \"{}\" ({:?})", info.name, info.backend);
    Ok(adapter)
}

async fn request_device(
    adapter: &wgpu::Adapter,
) -> Result<(wgpu::Device, wgpu::Queue, GpuErrorLog), RenderError> {
    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("shade-ngin device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            experimental_features: Default::default(),
            memory_hints: Default::default(),
            trace: wgpu::Trace::Off,
        })
        .await
        .map_err(|e| RenderError::Device(e.to_string()))?;
    let errors = GpuErrorLog::default();
    errors.install(&device);
    Ok((device, queue, errors))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_log_counts_and_keeps_the_last_message() {
        let log = GpuErrorLog::default();
        assert_eq!(log.count(), 0);
        assert_eq!(log.last_message(), None);
        let shared = log.clone();
        shared.record("first".to_string());
        shared.record("second".to_string());
        assert_eq!(log.count(), 2);
        assert_eq!(log.last_message().as_deref(), Some("second"));
    }
}
