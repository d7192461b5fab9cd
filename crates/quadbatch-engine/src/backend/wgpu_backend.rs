use std::borrow::Cow;

use anyhow::Result;
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::batch::Vertex;
use crate::camera::CameraUniform;
use crate::config::SamplerFilter;
use crate::device::{Gpu, GpuInit, SurfaceErrorAction, SurfaceFrame};
use crate::error::{FrameError, InitError, ResourceError, ResourceKind};
use crate::resource::{
    ImageData, LiveResources, PipelineId, ResourceTable, ShaderId, ShaderSource, ShaderStage,
    TextureId,
};

use super::{Backend, LoadOp, PassDesc, TextureInfo};

/// Format of textures decoded from image files (straight-alpha RGBA8).
const IMAGE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

struct WgpuShader {
    stage: ShaderStage,
    module: wgpu::ShaderModule,
}

struct WgpuTexture {
    #[allow(dead_code)]
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    bind_group: wgpu::BindGroup,
    width: u32,
    height: u32,
    render_target: bool,
}

/// Bind group and pipeline layouts shared by every sprite pipeline.
struct SpriteLayouts {
    camera: wgpu::BindGroupLayout,
    texture: wgpu::BindGroupLayout,
    pipeline: wgpu::PipelineLayout,
}

impl SpriteLayouts {
    fn new(device: &wgpu::Device) -> Self {
        let camera = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("quadbatch camera bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<CameraUniform>() as u64,
                    ),
                },
                count: None,
            }],
        });

        let texture = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("quadbatch texture bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
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
        });

        let pipeline = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("quadbatch sprite pipeline layout"),
            bind_group_layouts: &[&camera, &texture],
            immediate_size: 0,
        });

        Self {
            camera,
            texture,
            pipeline,
        }
    }
}

/// Process-lifetime objects created by `init_buffers`.
struct SpriteBuffers {
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
    staging: wgpu::Buffer,
    sampler: wgpu::Sampler,
}

enum PassTarget {
    Surface(SurfaceFrame),
    Texture(TextureId),
}

/// One command buffer plus the destination acquired for it.
pub struct WgpuFrame {
    encoder: wgpu::CommandEncoder,
    target: Option<PassTarget>,
}

/// Sprite device on top of wgpu, presenting to a winit window.
pub struct WgpuBackend<'w> {
    gpu: Gpu<'w>,
    window: &'w Window,

    texture_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    camera_ubo: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    buffers: Option<SpriteBuffers>,

    shaders: ResourceTable<WgpuShader>,
    pipelines: ResourceTable<wgpu::RenderPipeline>,
    textures: ResourceTable<WgpuTexture>,
}

impl<'w> WgpuBackend<'w> {
    /// Creates the device, the window surface and the layouts shared by all
    /// sprite pipelines.
    pub async fn new(window: &'w Window, init: GpuInit) -> Result<Self> {
        let gpu = Gpu::new(window, init).await?;
        let device = gpu.device();

        let layouts = SpriteLayouts::new(device);

        let camera_ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("quadbatch camera ubo"),
            size: std::mem::size_of::<CameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("quadbatch camera bind group"),
            layout: &layouts.camera,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_ubo.as_entire_binding(),
            }],
        });

        Ok(Self {
            gpu,
            window,
            texture_layout: layouts.texture,
            pipeline_layout: layouts.pipeline,
            camera_ubo,
            camera_bind_group,
            buffers: None,
            shaders: ResourceTable::new(ResourceKind::Shader),
            pipelines: ResourceTable::new(ResourceKind::Pipeline),
            textures: ResourceTable::new(ResourceKind::Texture),
        })
    }

    pub fn gpu(&self) -> &Gpu<'w> {
        &self.gpu
    }

    pub fn window(&self) -> &'w Window {
        self.window
    }

    fn sampler(&self, kind: ResourceKind) -> Result<&wgpu::Sampler, ResourceError> {
        self.buffers
            .as_ref()
            .map(|b| &b.sampler)
            .ok_or_else(|| ResourceError::Device {
                kind,
                message: "sprite buffers not initialized".to_string(),
            })
    }

    fn check_size(&self, width: u32, height: u32) -> Result<(), ResourceError> {
        let max = self.gpu.device().limits().max_texture_dimension_2d;
        if width == 0 || height == 0 || width > max || height > max {
            return Err(ResourceError::InvalidSize { width, height });
        }
        Ok(())
    }

    fn insert_texture(
        &mut self,
        texture: wgpu::Texture,
        render_target: bool,
    ) -> Result<TextureId, ResourceError> {
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = self
            .gpu
            .device()
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("quadbatch texture bind group"),
                layout: &self.texture_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(self.sampler(ResourceKind::Texture)?),
                    },
                ],
            });

        let (width, height) = (texture.width(), texture.height());
        let index = self.textures.insert(WgpuTexture {
            texture,
            view,
            bind_group,
            width,
            height,
            render_target,
        });
        log::debug!("wgpu: texture {width}x{height} created (render target: {render_target})");
        Ok(TextureId::from_index(index))
    }
}

fn sampler_filter(filter: SamplerFilter) -> wgpu::FilterMode {
    match filter {
        SamplerFilter::Nearest => wgpu::FilterMode::Nearest,
        SamplerFilter::Linear => wgpu::FilterMode::Linear,
    }
}

fn sprite_blend() -> wgpu::BlendState {
    let component = wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
        operation: wgpu::BlendOperation::Add,
    };
    wgpu::BlendState {
        color: component,
        alpha: component,
    }
}

/// Runs `create` inside a validation error scope, so a rejected object comes
/// back as an error instead of reaching the uncaptured-error handler.
fn capture_validation<T>(
    device: &wgpu::Device,
    create: impl FnOnce(&wgpu::Device) -> T,
) -> Result<T, wgpu::Error> {
    let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = create(device);
    match pollster::block_on(scope.pop()) {
        Some(err) => Err(err),
        None => Ok(value),
    }
}

fn compile_module(
    device: &wgpu::Device,
    code: &str,
    stage: ShaderStage,
) -> Result<wgpu::ShaderModule, ResourceError> {
    capture_validation(device, |device| {
        device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("quadbatch shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(code)),
        })
    })
    .map_err(|err| ResourceError::Compile {
        stage,
        message: err.to_string(),
    })
}

fn link_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    vertex: &wgpu::ShaderModule,
    fragment: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
) -> Result<wgpu::RenderPipeline, ResourceError> {
    capture_validation(device, |device| {
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("quadbatch sprite pipeline"),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: vertex,
                entry_point: Some(ShaderSource::ENTRY_POINT),
                compilation_options: Default::default(),
                buffers: &[Vertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: fragment,
                entry_point: Some(ShaderSource::ENTRY_POINT),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(sprite_blend()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        })
    })
    .map_err(|err| ResourceError::Device {
        kind: ResourceKind::Pipeline,
        message: err.to_string(),
    })
}

impl<'w> Backend for WgpuBackend<'w> {
    type Frame = WgpuFrame;

    fn init_buffers(
        &mut self,
        capacity: usize,
        indices: &[u16],
        filter: SamplerFilter,
    ) -> Result<(), InitError> {
        let device = self.gpu.device();
        let vertex_bytes = capacity as u64 * 4 * Vertex::SIZE;
        if vertex_bytes > device.limits().max_buffer_size {
            return Err(InitError::Buffers(format!(
                "{vertex_bytes} byte vertex buffer exceeds the device limit"
            )));
        }

        let vertex = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("quadbatch vertex buffer"),
            size: vertex_bytes,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("quadbatch staging buffer"),
            size: vertex_bytes,
            usage: wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quadbatch index buffer"),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("quadbatch sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: sampler_filter(filter),
            min_filter: sampler_filter(filter),
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        self.buffers = Some(SpriteBuffers {
            vertex,
            index,
            staging,
            sampler,
        });
        log::debug!("wgpu: sprite buffers for {capacity} sprites ({vertex_bytes} bytes)");
        Ok(())
    }

    fn create_shader(
        &mut self,
        source: &ShaderSource,
        stage: ShaderStage,
    ) -> Result<ShaderId, ResourceError> {
        source.validate(stage)?;
        let module = compile_module(self.gpu.device(), source.code(), stage)?;

        let index = self.shaders.insert(WgpuShader { stage, module });
        log::debug!("wgpu: {stage} shader created");
        Ok(ShaderId::from_index(index))
    }

    fn shader_stage(&self, id: ShaderId) -> Result<ShaderStage, ResourceError> {
        Ok(self.shaders.get(id.index())?.stage)
    }

    fn destroy_shader(&mut self, id: ShaderId) -> Result<(), ResourceError> {
        self.shaders.remove(id.index()).map(drop)
    }

    fn create_pipeline(
        &mut self,
        vertex: ShaderId,
        fragment: ShaderId,
    ) -> Result<PipelineId, ResourceError> {
        let vs = self.shaders.get(vertex.index())?;
        let fs = self.shaders.get(fragment.index())?;

        let pipeline = link_pipeline(
            self.gpu.device(),
            &self.pipeline_layout,
            &vs.module,
            &fs.module,
            self.gpu.surface_format(),
        )?;

        let index = self.pipelines.insert(pipeline);
        log::debug!("wgpu: sprite pipeline created");
        Ok(PipelineId::from_index(index))
    }

    fn has_pipeline(&self, id: PipelineId) -> bool {
        self.pipelines.contains(id.index())
    }

    fn destroy_pipeline(&mut self, id: PipelineId) -> Result<(), ResourceError> {
        self.pipelines.remove(id.index()).map(drop)
    }

    fn create_texture(&mut self, image: &ImageData) -> Result<TextureId, ResourceError> {
        self.check_size(image.width, image.height)?;

        let size = wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        };
        let texture = self.gpu.device().create_texture(&wgpu::TextureDescriptor {
            label: Some("quadbatch texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: IMAGE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        self.gpu.queue().write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &image.pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * image.width),
                rows_per_image: Some(image.height),
            },
            size,
        );

        self.insert_texture(texture, false)
    }

    fn create_render_target(&mut self, width: u32, height: u32) -> Result<TextureId, ResourceError> {
        self.check_size(width, height)?;

        let texture = self.gpu.device().create_texture(&wgpu::TextureDescriptor {
            label: Some("quadbatch render target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.gpu.surface_format(),
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });

        self.insert_texture(texture, true)
    }

    fn texture_info(&self, id: TextureId) -> Result<TextureInfo, ResourceError> {
        let tex = self.textures.get(id.index())?;
        Ok(TextureInfo {
            width: tex.width,
            height: tex.height,
            render_target: tex.render_target,
        })
    }

    fn destroy_texture(&mut self, id: TextureId) -> Result<(), ResourceError> {
        self.textures.remove(id.index()).map(drop)
    }

    fn live_resources(&self) -> LiveResources {
        LiveResources {
            pipelines: self.pipelines.len(),
            shaders: self.shaders.len(),
            textures: self.textures.len(),
        }
    }

    fn resize_surface(&mut self, width: u32, height: u32) {
        self.gpu.resize(PhysicalSize::new(width, height));
    }

    fn begin_frame(&mut self) -> Result<WgpuFrame, FrameError> {
        Ok(WgpuFrame {
            encoder: self.gpu.create_encoder("quadbatch frame encoder"),
            target: None,
        })
    }

    fn copy_vertices(&mut self, frame: &mut WgpuFrame, vertices: &[Vertex]) {
        let Some(buffers) = self.buffers.as_ref() else {
            log::warn!("wgpu: vertex copy skipped; sprite buffers not initialized");
            return;
        };

        let bytes: &[u8] = bytemuck::cast_slice(vertices);
        self.gpu.queue().write_buffer(&buffers.staging, 0, bytes);
        frame
            .encoder
            .copy_buffer_to_buffer(&buffers.staging, 0, &buffers.vertex, 0, bytes.len() as u64);
    }

    fn acquire_target(
        &mut self,
        frame: &mut WgpuFrame,
        target: Option<TextureId>,
    ) -> Result<(), FrameError> {
        let target = match target {
            Some(id) => PassTarget::Texture(id),
            None => match self.gpu.acquire_surface() {
                Ok(surface) => PassTarget::Surface(surface),
                Err(err) => {
                    let action = self.gpu.handle_surface_error(&err);
                    if action == SurfaceErrorAction::Fatal {
                        log::error!("wgpu: swapchain acquisition failed fatally: {err}");
                    }
                    return Err(FrameError::SwapchainUnavailable(format!("{err} ({action:?})")));
                }
            },
        };
        frame.target = Some(target);
        Ok(())
    }

    fn render_pass(&mut self, frame: &mut WgpuFrame, pass: &PassDesc) -> Result<(), ResourceError> {
        let WgpuFrame { encoder, target } = frame;

        let (view, target_id) = match target {
            Some(PassTarget::Surface(surface)) => (&surface.view, None),
            Some(PassTarget::Texture(id)) => (&self.textures.get(id.index())?.view, Some(*id)),
            None => {
                log::warn!("wgpu: render pass recorded before a target was acquired; skipped");
                return Ok(());
            }
        };

        let draw = match &pass.draw {
            Some(draw) => {
                if target_id == Some(draw.texture) {
                    return Err(ResourceError::FeedbackLoop);
                }
                let pipeline = self.pipelines.get(draw.pipeline.index())?;
                let texture = self.textures.get(draw.texture.index())?;
                let buffers = self.buffers.as_ref().ok_or_else(|| ResourceError::Device {
                    kind: ResourceKind::Pipeline,
                    message: "sprite buffers not initialized".to_string(),
                })?;
                Some((draw, pipeline, &texture.bind_group, buffers))
            }
            None => None,
        };

        if let Some((d, ..)) = &draw {
            let uniform = CameraUniform::from(d.projection);
            self.gpu
                .queue()
                .write_buffer(&self.camera_ubo, 0, bytemuck::bytes_of(&uniform));
        }

        let load = match pass.load {
            LoadOp::Clear(color) => wgpu::LoadOp::Clear(color.to_wgpu()),
            LoadOp::Load => wgpu::LoadOp::Load,
        };

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("quadbatch sprite pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        if let Some((d, pipeline, bind_group, buffers)) = draw {
            rpass.set_pipeline(pipeline);
            rpass.set_bind_group(0, &self.camera_bind_group, &[]);
            rpass.set_bind_group(1, bind_group, &[]);
            rpass.set_vertex_buffer(0, buffers.vertex.slice(..));
            rpass.set_index_buffer(buffers.index.slice(..), wgpu::IndexFormat::Uint16);
            rpass.draw_indexed(0..d.index_count, 0, 0..1);
        }

        Ok(())
    }

    fn submit(&mut self, frame: WgpuFrame) {
        let WgpuFrame { encoder, target } = frame;
        let surface = match target {
            Some(PassTarget::Surface(surface)) => Some(surface),
            _ => None,
        };
        self.gpu.submit(self.window, encoder, surface);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FOREIGN_LAYOUT_FRAGMENT: &str = r#"
@group(2) @binding(0) var tex: texture_2d<f32>;
@group(2) @binding(1) var samp: sampler;

struct FragmentInput {
    @location(0) uv: vec2<f32>,
    @location(1) color: vec4<f32>,
};

@fragment
fn main(in: FragmentInput) -> @location(0) vec4<f32> {
    return textureSample(tex, samp, in.uv) * in.color;
}
"#;

    fn noop_device() -> wgpu::Device {
        let (device, _queue) = wgpu::Device::noop(&wgpu::DeviceDescriptor::default());
        device
    }

    fn builtin_module(device: &wgpu::Device, stage: ShaderStage) -> wgpu::ShaderModule {
        compile_module(device, ShaderSource::builtin(stage).code(), stage).unwrap()
    }

    #[test]
    fn broken_wgsl_is_returned_as_compile_error() {
        let device = noop_device();
        let err = compile_module(&device, "fn main( this is not wgsl {{{", ShaderStage::Vertex)
            .unwrap_err();
        assert!(matches!(err, ResourceError::Compile { stage: ShaderStage::Vertex, .. }));
    }

    #[test]
    fn builtin_pair_links_against_sprite_layout() {
        let device = noop_device();
        let layouts = SpriteLayouts::new(&device);
        let vs = builtin_module(&device, ShaderStage::Vertex);
        let fs = builtin_module(&device, ShaderStage::Fragment);

        link_pipeline(&device, &layouts.pipeline, &vs, &fs, wgpu::TextureFormat::Bgra8UnormSrgb)
            .unwrap();
    }

    #[test]
    fn shader_outside_sprite_layout_fails_to_link() {
        let device = noop_device();
        let layouts = SpriteLayouts::new(&device);
        let vs = builtin_module(&device, ShaderStage::Vertex);
        let fs = compile_module(&device, FOREIGN_LAYOUT_FRAGMENT, ShaderStage::Fragment).unwrap();

        let err = link_pipeline(&device, &layouts.pipeline, &vs, &fs, wgpu::TextureFormat::Bgra8UnormSrgb)
            .unwrap_err();
        assert!(matches!(err, ResourceError::Device { kind: ResourceKind::Pipeline, .. }));
    }
}
