use std::sync::Arc;

use anyhow::{Context, Result};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use super::surface::{choose_alpha_mode, choose_surface_format, recover};
use super::{GpuInit, SurfaceErrorAction, SurfaceFrame};

/// wgpu core objects plus the window surface.
///
/// The surface borrows the window for `'w`; the window must outlive this value.
pub struct Gpu<'w> {
    #[allow(dead_code)]
    instance: wgpu::Instance,
    surface: wgpu::Surface<'w>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
}

impl<'w> Gpu<'w> {
    /// Creates the device and configures a surface for `window`.
    ///
    /// Any failure here is fatal; no partially initialized state escapes.
    pub async fn new(window: &'w Window, init: GpuInit) -> Result<Self> {
        let size = window.inner_size();
        anyhow::ensure!(size.width > 0 && size.height > 0, "window has zero size");

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .context("failed to create window surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no GPU adapter can present to this window")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("quadbatch device"),
                required_features: init.required_features,
                required_limits: init.required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create GPU device")?;

        // Errors outside an error scope are logged instead of panicking.
        device.on_uncaptured_error(Arc::new(|err| {
            log::error!("wgpu: uncaptured error: {err}");
        }));

        let caps = surface.get_capabilities(&adapter);
        let format = choose_surface_format(&caps, init.prefer_srgb)
            .context("surface reports no supported formats")?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode: init.present_mode,
            alpha_mode: choose_alpha_mode(&caps, init.alpha_mode),
            view_formats: vec![],
            desired_maximum_frame_latency: init.desired_maximum_frame_latency,
        };
        surface.configure(&device, &config);

        log::info!(
            "gpu: {} ({:?}), surface {}x{} {:?}",
            adapter.get_info().name,
            adapter.get_info().backend,
            size.width,
            size.height,
            format
        );

        Ok(Gpu {
            instance,
            surface,
            device,
            queue,
            config,
            size,
        })
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Drawable size in physical pixels.
    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Reconfigures the swapchain. A zero size is recorded but configuration
    /// waits for the next non-zero size.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.size = new_size;
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
    }

    pub fn create_encoder(&self, label: &str) -> wgpu::CommandEncoder {
        self.device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) })
    }

    /// Acquires the next swapchain image.
    pub fn acquire_surface(&self) -> std::result::Result<SurfaceFrame, wgpu::SurfaceError> {
        let surface_texture = self.surface.get_current_texture()?;
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        Ok(SurfaceFrame {
            surface_texture,
            view,
        })
    }

    /// Submits `encoder` as one command buffer, then presents `surface` if an
    /// image was acquired.
    pub fn submit(&self, window: &Window, encoder: wgpu::CommandEncoder, surface: Option<SurfaceFrame>) {
        self.queue.submit(std::iter::once(encoder.finish()));
        if let Some(SurfaceFrame { surface_texture, view }) = surface {
            drop(view);
            window.pre_present_notify();
            surface_texture.present();
        }
    }

    /// Attempts recovery from a failed acquisition.
    pub fn handle_surface_error(&mut self, err: &wgpu::SurfaceError) -> SurfaceErrorAction {
        recover(&self.surface, &self.device, &self.config, self.size, err)
    }
}
