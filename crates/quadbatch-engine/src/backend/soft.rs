//! Software reference device.
//!
//! Keeps every device object in host memory and executes recorded commands
//! on `submit`, in recording order. Rasterization follows GPU conventions:
//! pixel centers at `+0.5`, edges shared by two triangles are filled once,
//! clamp-to-edge sampling, and `ONE / ONE_MINUS_SRC_ALPHA` blending of the
//! sprite shader's premultiplied output.
//!
//! Shader code is validated and stored but not interpreted; every pipeline
//! behaves like the built-in sprite shader pair.

use glam::{Mat4, Vec4};

use crate::batch::Vertex;
use crate::config::SamplerFilter;
use crate::error::{FrameError, InitError, ResourceError, ResourceKind};
use crate::resource::{
    ImageData, LiveResources, PipelineId, ResourceTable, ShaderId, ShaderSource, ShaderStage,
    TextureId,
};

use super::{Backend, LoadOp, PassDesc, TextureInfo};

/// Destination of a recorded pass.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SoftTarget {
    Surface,
    Texture(TextureId),
}

/// One recorded command, as kept in the submission log.
#[derive(Debug, Clone, PartialEq)]
pub enum SoftCommand {
    CopyVertices {
        vertex_count: usize,
    },
    BeginPass {
        target: SoftTarget,
        load: LoadOp,
    },
    DrawIndexed {
        pipeline: PipelineId,
        texture: TextureId,
        projection: Mat4,
        index_count: u32,
    },
    EndPass,
}

/// Commands of one frame plus the staging snapshot they copy from.
#[derive(Debug, Default)]
pub struct SoftFrame {
    commands: Vec<SoftCommand>,
    staging: Vec<Vertex>,
    target: Option<SoftTarget>,
}

#[derive(Debug, Clone, Default)]
struct SoftImage {
    width: u32,
    height: u32,
    texels: Vec<[f32; 4]>,
}

impl SoftImage {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            texels: vec![[0.0; 4]; width as usize * height as usize],
        }
    }

    fn from_image(image: &ImageData) -> Self {
        let texels = image
            .pixels
            .chunks_exact(4)
            .map(|p| [p[0], p[1], p[2], p[3]].map(|c| c as f32 / 255.0))
            .collect();
        Self {
            width: image.width,
            height: image.height,
            texels,
        }
    }

    #[inline]
    fn texel(&self, x: u32, y: u32) -> [f32; 4] {
        self.texels[y as usize * self.width as usize + x as usize]
    }

    #[inline]
    fn texel_mut(&mut self, x: u32, y: u32) -> &mut [f32; 4] {
        &mut self.texels[y as usize * self.width as usize + x as usize]
    }

    fn fill(&mut self, color: [f32; 4]) {
        self.texels.fill(color);
    }

    fn sample(&self, uv: [f32; 2], filter: SamplerFilter) -> [f32; 4] {
        if self.width == 0 || self.height == 0 {
            return [0.0; 4];
        }
        match filter {
            SamplerFilter::Nearest => {
                let x = clamp_texel(uv[0] * self.width as f32, self.width);
                let y = clamp_texel(uv[1] * self.height as f32, self.height);
                self.texel(x, y)
            }
            SamplerFilter::Linear => {
                let fx = uv[0] * self.width as f32 - 0.5;
                let fy = uv[1] * self.height as f32 - 0.5;
                let (tx, ty) = (fx - fx.floor(), fy - fy.floor());
                let x0 = clamp_texel(fx, self.width);
                let x1 = clamp_texel(fx + 1.0, self.width);
                let y0 = clamp_texel(fy, self.height);
                let y1 = clamp_texel(fy + 1.0, self.height);

                let top = lerp4(self.texel(x0, y0), self.texel(x1, y0), tx);
                let bottom = lerp4(self.texel(x0, y1), self.texel(x1, y1), tx);
                lerp4(top, bottom, ty)
            }
        }
    }
}

#[inline]
fn clamp_texel(coord: f32, size: u32) -> u32 {
    let c = coord.floor();
    if c.is_nan() || c < 0.0 {
        0
    } else {
        (c as u32).min(size - 1)
    }
}

#[inline]
fn lerp4(a: [f32; 4], b: [f32; 4], t: f32) -> [f32; 4] {
    std::array::from_fn(|i| a[i] + (b[i] - a[i]) * t)
}

#[derive(Debug)]
struct SoftShader {
    stage: ShaderStage,
    #[allow(dead_code)]
    source: ShaderSource,
}

#[derive(Debug)]
#[allow(dead_code)]
struct SoftPipeline {
    vertex: ShaderId,
    fragment: ShaderId,
}

#[derive(Debug)]
struct SoftTexture {
    image: SoftImage,
    render_target: bool,
}

/// Deterministic in-memory device for tests and headless rendering.
#[derive(Debug)]
pub struct SoftBackend {
    surface: SoftImage,
    vertex_buffer: Vec<Vertex>,
    index_buffer: Vec<u16>,
    filter: SamplerFilter,

    shaders: ResourceTable<SoftShader>,
    pipelines: ResourceTable<SoftPipeline>,
    textures: ResourceTable<SoftTexture>,

    failing_command_buffers: u32,
    failing_acquires: u32,
    submissions: Vec<Vec<SoftCommand>>,
    presented: u64,
}

impl SoftBackend {
    /// Device whose presentation surface is `width x height` pixels.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            surface: SoftImage::new(width, height),
            vertex_buffer: Vec::new(),
            index_buffer: Vec::new(),
            filter: SamplerFilter::Nearest,
            shaders: ResourceTable::new(ResourceKind::Shader),
            pipelines: ResourceTable::new(ResourceKind::Pipeline),
            textures: ResourceTable::new(ResourceKind::Texture),
            failing_command_buffers: 0,
            failing_acquires: 0,
            submissions: Vec::new(),
            presented: 0,
        }
    }

    /// Makes the next `n` swapchain acquisitions fail.
    pub fn fail_next_acquires(&mut self, n: u32) {
        self.failing_acquires = n;
    }

    /// Makes the next `n` command-buffer acquisitions fail.
    pub fn fail_next_command_buffers(&mut self, n: u32) {
        self.failing_command_buffers = n;
    }

    pub fn surface_size(&self) -> (u32, u32) {
        (self.surface.width, self.surface.height)
    }

    /// Surface pixel `(x, y)` as premultiplied RGBA.
    pub fn surface_pixel(&self, x: u32, y: u32) -> [f32; 4] {
        self.surface.texel(x, y)
    }

    pub fn texture_pixel(&self, id: TextureId, x: u32, y: u32) -> Result<[f32; 4], ResourceError> {
        Ok(self.textures.get(id.index())?.image.texel(x, y))
    }

    /// Command lists of every submission so far, oldest first.
    pub fn submissions(&self) -> &[Vec<SoftCommand>] {
        &self.submissions
    }

    pub fn last_submission(&self) -> Option<&[SoftCommand]> {
        self.submissions.last().map(Vec::as_slice)
    }

    /// Number of swapchain images presented.
    pub fn presented_frames(&self) -> u64 {
        self.presented
    }

    pub fn vertex_buffer(&self) -> &[Vertex] {
        &self.vertex_buffer
    }

    pub fn index_buffer(&self) -> &[u16] {
        &self.index_buffer
    }

    fn take_target(&mut self, target: SoftTarget) -> Option<SoftImage> {
        match target {
            SoftTarget::Surface => Some(std::mem::take(&mut self.surface)),
            SoftTarget::Texture(id) => match self.textures.get_mut(id.index()) {
                Ok(tex) => Some(std::mem::take(&mut tex.image)),
                Err(err) => {
                    log::warn!("soft: pass target vanished before submit: {err}");
                    None
                }
            },
        }
    }

    fn restore_target(&mut self, target: SoftTarget, image: SoftImage) {
        match target {
            SoftTarget::Surface => self.surface = image,
            SoftTarget::Texture(id) => {
                if let Ok(tex) = self.textures.get_mut(id.index()) {
                    tex.image = image;
                }
            }
        }
    }

    fn draw_indexed(&self, target: &mut SoftImage, texture: TextureId, projection: &Mat4, index_count: u32) {
        let Ok(texture) = self.textures.get(texture.index()) else {
            log::warn!("soft: sampled texture vanished before submit");
            return;
        };

        let count = (index_count as usize).min(self.index_buffer.len());
        for tri in self.index_buffer[..count].chunks_exact(3) {
            let verts = [tri[0], tri[1], tri[2]].map(|i| self.vertex_buffer[i as usize]);
            let screen = verts.map(|v| to_screen(projection, v.position, target.width, target.height));
            rasterize(target, &texture.image, self.filter, verts, screen);
        }
    }
}

/// Clip space to pixel space (`y` down, pixel centers at `+0.5`).
fn to_screen(projection: &Mat4, position: [f32; 3], width: u32, height: u32) -> [f32; 2] {
    let clip = *projection * Vec4::new(position[0], position[1], position[2], 1.0);
    let ndc_x = clip.x / clip.w;
    let ndc_y = clip.y / clip.w;
    [
        (ndc_x + 1.0) * 0.5 * width as f32,
        (1.0 - ndc_y) * 0.5 * height as f32,
    ]
}

#[inline]
fn edge(a: [f32; 2], b: [f32; 2], p: [f32; 2]) -> f32 {
    (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0])
}

/// Tie-break for pixels exactly on an edge: of the two triangles sharing an
/// edge, only the one walking it "downwards" (or leftwards when flat) owns it.
#[inline]
fn owns_edge(a: [f32; 2], b: [f32; 2]) -> bool {
    let dx = b[0] - a[0];
    let dy = b[1] - a[1];
    dy > 0.0 || (dy == 0.0 && dx < 0.0)
}

#[inline]
fn covers(w: f32, a: [f32; 2], b: [f32; 2]) -> bool {
    w > 0.0 || (w == 0.0 && owns_edge(a, b))
}

/// Barycentric interpolation relative to the third vertex; a value shared by
/// all three vertices comes back exactly.
#[inline]
fn interpolate(a0: f32, a1: f32, a2: f32, l0: f32, l1: f32) -> f32 {
    a2 + l0 * (a0 - a2) + l1 * (a1 - a2)
}

fn rasterize(
    target: &mut SoftImage,
    texture: &SoftImage,
    filter: SamplerFilter,
    mut verts: [Vertex; 3],
    mut p: [[f32; 2]; 3],
) {
    let mut area = edge(p[0], p[1], p[2]);
    if area == 0.0 || !area.is_finite() {
        return;
    }
    if area < 0.0 {
        p.swap(1, 2);
        verts.swap(1, 2);
        area = -area;
    }

    let min_x = p.iter().map(|q| q[0]).fold(f32::INFINITY, f32::min).floor().max(0.0);
    let min_y = p.iter().map(|q| q[1]).fold(f32::INFINITY, f32::min).floor().max(0.0);
    let max_x = p.iter().map(|q| q[0]).fold(f32::NEG_INFINITY, f32::max).ceil().min(target.width as f32);
    let max_y = p.iter().map(|q| q[1]).fold(f32::NEG_INFINITY, f32::max).ceil().min(target.height as f32);
    if min_x >= max_x || min_y >= max_y {
        return;
    }

    for py in min_y as u32..max_y as u32 {
        for px in min_x as u32..max_x as u32 {
            let c = [px as f32 + 0.5, py as f32 + 0.5];
            let w0 = edge(p[1], p[2], c);
            let w1 = edge(p[2], p[0], c);
            let w2 = edge(p[0], p[1], c);
            if !(covers(w0, p[1], p[2]) && covers(w1, p[2], p[0]) && covers(w2, p[0], p[1])) {
                continue;
            }

            let (l0, l1) = (w0 / area, w1 / area);
            let uv: [f32; 2] = std::array::from_fn(|i| {
                interpolate(verts[0].uv[i], verts[1].uv[i], verts[2].uv[i], l0, l1)
            });
            let tint: [f32; 4] = std::array::from_fn(|i| {
                interpolate(verts[0].color[i], verts[1].color[i], verts[2].color[i], l0, l1)
            });

            let texel = texture.sample(uv, filter);
            let c: [f32; 4] = std::array::from_fn(|i| texel[i] * tint[i]);
            let src = [c[0] * c[3], c[1] * c[3], c[2] * c[3], c[3]];

            let dst = target.texel_mut(px, py);
            for i in 0..4 {
                dst[i] = src[i] + dst[i] * (1.0 - src[3]);
            }
        }
    }
}

impl Backend for SoftBackend {
    type Frame = SoftFrame;

    fn init_buffers(
        &mut self,
        capacity: usize,
        indices: &[u16],
        filter: SamplerFilter,
    ) -> Result<(), InitError> {
        let vertex_count = capacity * 4;
        if indices.iter().any(|&i| i as usize >= vertex_count) {
            return Err(InitError::Buffers(format!(
                "index data references vertices beyond {vertex_count}"
            )));
        }

        self.vertex_buffer = vec![Vertex::default(); vertex_count];
        self.index_buffer = indices.to_vec();
        self.filter = filter;
        log::debug!("soft: buffers for {capacity} sprites");
        Ok(())
    }

    fn create_shader(
        &mut self,
        source: &ShaderSource,
        stage: ShaderStage,
    ) -> Result<ShaderId, ResourceError> {
        source.validate(stage)?;
        let index = self.shaders.insert(SoftShader {
            stage,
            source: source.clone(),
        });
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
        self.shaders.get(vertex.index())?;
        self.shaders.get(fragment.index())?;
        let index = self.pipelines.insert(SoftPipeline { vertex, fragment });
        Ok(PipelineId::from_index(index))
    }

    fn has_pipeline(&self, id: PipelineId) -> bool {
        self.pipelines.contains(id.index())
    }

    fn destroy_pipeline(&mut self, id: PipelineId) -> Result<(), ResourceError> {
        self.pipelines.remove(id.index()).map(drop)
    }

    fn create_texture(&mut self, image: &ImageData) -> Result<TextureId, ResourceError> {
        check_size(image.width, image.height)?;
        let index = self.textures.insert(SoftTexture {
            image: SoftImage::from_image(image),
            render_target: false,
        });
        Ok(TextureId::from_index(index))
    }

    fn create_render_target(&mut self, width: u32, height: u32) -> Result<TextureId, ResourceError> {
        check_size(width, height)?;
        let index = self.textures.insert(SoftTexture {
            image: SoftImage::new(width, height),
            render_target: true,
        });
        Ok(TextureId::from_index(index))
    }

    fn texture_info(&self, id: TextureId) -> Result<TextureInfo, ResourceError> {
        let tex = self.textures.get(id.index())?;
        Ok(TextureInfo {
            width: tex.image.width,
            height: tex.image.height,
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
        if width == 0 || height == 0 {
            return;
        }
        self.surface = SoftImage::new(width, height);
    }

    fn begin_frame(&mut self) -> Result<SoftFrame, FrameError> {
        if self.failing_command_buffers > 0 {
            self.failing_command_buffers -= 1;
            return Err(FrameError::CommandBufferUnavailable("device busy".to_string()));
        }
        Ok(SoftFrame::default())
    }

    fn copy_vertices(&mut self, frame: &mut SoftFrame, vertices: &[Vertex]) {
        frame.staging.clear();
        frame.staging.extend_from_slice(vertices);
        frame.commands.push(SoftCommand::CopyVertices {
            vertex_count: vertices.len(),
        });
    }

    fn acquire_target(
        &mut self,
        frame: &mut SoftFrame,
        target: Option<TextureId>,
    ) -> Result<(), FrameError> {
        frame.target = Some(match target {
            Some(id) => SoftTarget::Texture(id),
            None => {
                if self.failing_acquires > 0 {
                    self.failing_acquires -= 1;
                    return Err(FrameError::SwapchainUnavailable("surface timeout".to_string()));
                }
                SoftTarget::Surface
            }
        });
        Ok(())
    }

    fn render_pass(&mut self, frame: &mut SoftFrame, pass: &PassDesc) -> Result<(), ResourceError> {
        let Some(target) = frame.target else {
            log::warn!("soft: render pass recorded before a target was acquired; skipped");
            return Ok(());
        };

        if let Some(draw) = &pass.draw {
            if !self.has_pipeline(draw.pipeline) {
                return Err(ResourceError::stale(ResourceKind::Pipeline));
            }
            self.textures.get(draw.texture.index())?;
            if target == SoftTarget::Texture(draw.texture) {
                return Err(ResourceError::FeedbackLoop);
            }
        }

        frame.commands.push(SoftCommand::BeginPass { target, load: pass.load });
        if let Some(draw) = &pass.draw {
            frame.commands.push(SoftCommand::DrawIndexed {
                pipeline: draw.pipeline,
                texture: draw.texture,
                projection: draw.projection,
                index_count: draw.index_count,
            });
        }
        frame.commands.push(SoftCommand::EndPass);
        Ok(())
    }

    fn submit(&mut self, frame: SoftFrame) {
        let SoftFrame { commands, staging, target } = frame;
        let mut current: Option<(SoftTarget, SoftImage)> = None;

        for cmd in &commands {
            match cmd {
                SoftCommand::CopyVertices { vertex_count } => {
                    let n = (*vertex_count).min(self.vertex_buffer.len()).min(staging.len());
                    self.vertex_buffer[..n].copy_from_slice(&staging[..n]);
                }
                SoftCommand::BeginPass { target, load } => {
                    if let Some(mut image) = self.take_target(*target) {
                        if let LoadOp::Clear(color) = load {
                            image.fill(color.to_array());
                        }
                        current = Some((*target, image));
                    }
                }
                SoftCommand::DrawIndexed { texture, projection, index_count, .. } => {
                    if let Some((_, image)) = current.as_mut() {
                        self.draw_indexed(image, *texture, projection, *index_count);
                    }
                }
                SoftCommand::EndPass => {
                    if let Some((target, image)) = current.take() {
                        self.restore_target(target, image);
                    }
                }
            }
        }

        if target == Some(SoftTarget::Surface) {
            self.presented += 1;
        }
        self.submissions.push(commands);
    }
}

fn check_size(width: u32, height: u32) -> Result<(), ResourceError> {
    if width == 0 || height == 0 {
        return Err(ResourceError::InvalidSize { width, height });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_sampling_clamps_to_edge() {
        let img = SoftImage::from_image(&ImageData {
            width: 2,
            height: 1,
            pixels: vec![255, 0, 0, 255, 0, 0, 255, 255],
        });
        assert_eq!(img.sample([-3.0, 0.5], SamplerFilter::Nearest), [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(img.sample([0.75, 0.5], SamplerFilter::Nearest), [0.0, 0.0, 1.0, 1.0]);
        assert_eq!(img.sample([7.0, 0.5], SamplerFilter::Nearest), [0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn linear_sampling_blends_neighbours() {
        let img = SoftImage::from_image(&ImageData {
            width: 2,
            height: 1,
            pixels: vec![0, 0, 0, 255, 255, 255, 255, 255],
        });
        let mid = img.sample([0.5, 0.5], SamplerFilter::Linear);
        assert!((mid[0] - 0.5).abs() < 1e-6);
        assert_eq!(mid[3], 1.0);
    }

    #[test]
    fn shared_edge_is_filled_once() {
        // Two half-transparent triangles covering one quad; the diagonal must
        // not be blended twice.
        let mut target = SoftImage::new(4, 4);
        let white = SoftImage::from_image(&ImageData::solid(1, 1, [255; 4]));
        let v = |x: f32, y: f32| Vertex { position: [x, y, 0.0], uv: [0.0, 0.0], color: [1.0, 1.0, 1.0, 0.5] };
        let (tl, tr, br, bl) = (v(0.0, 0.0), v(4.0, 0.0), v(4.0, 4.0), v(0.0, 4.0));
        let s = |v: &Vertex| [v.position[0], v.position[1]];

        rasterize(&mut target, &white, SamplerFilter::Nearest, [tl, tr, br], [s(&tl), s(&tr), s(&br)]);
        rasterize(&mut target, &white, SamplerFilter::Nearest, [tl, br, bl], [s(&tl), s(&br), s(&bl)]);

        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(target.texel(x, y), [0.5, 0.5, 0.5, 0.5], "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn constant_attributes_interpolate_exactly() {
        let mut target = SoftImage::new(7, 5);
        let white = SoftImage::from_image(&ImageData::solid(1, 1, [255; 4]));
        let v = |x: f32, y: f32| Vertex { position: [x, y, 0.0], uv: [0.0, 0.0], color: [1.0, 0.0, 0.0, 1.0] };
        let (a, b, c) = (v(0.3, 0.1), v(6.9, 1.7), v(2.2, 4.9));
        let s = |v: &Vertex| [v.position[0], v.position[1]];

        rasterize(&mut target, &white, SamplerFilter::Nearest, [a, b, c], [s(&a), s(&b), s(&c)]);

        for y in 0..5 {
            for x in 0..7 {
                let px = target.texel(x, y);
                assert!(px == [1.0, 0.0, 0.0, 1.0] || px == [0.0; 4], "pixel ({x}, {y}) = {px:?}");
            }
        }
        assert_eq!(target.texel(3, 2), [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn shader_without_main_is_rejected() {
        let mut dev = SoftBackend::new(1, 1);
        let source = ShaderSource::wgsl(
            "@vertex fn vs() -> @builtin(position) vec4<f32> { return vec4<f32>(0.0); }",
        );
        let err = dev.create_shader(&source, ShaderStage::Vertex).unwrap_err();
        assert!(matches!(err, ResourceError::Compile { stage: ShaderStage::Vertex, .. }));
        assert_eq!(dev.live_resources().shaders, 0);
    }

    #[test]
    fn zero_sized_render_target_is_rejected() {
        let mut dev = SoftBackend::new(1, 1);
        assert_eq!(
            dev.create_render_target(0, 8),
            Err(ResourceError::InvalidSize { width: 0, height: 8 })
        );
    }

    #[test]
    fn dropped_frame_records_nothing() {
        let mut dev = SoftBackend::new(2, 2);
        dev.init_buffers(1, &[0, 1, 2, 0, 2, 3], SamplerFilter::Nearest).unwrap();
        let mut frame = dev.begin_frame().unwrap();
        dev.copy_vertices(&mut frame, &[Vertex::default(); 4]);
        drop(frame);
        assert!(dev.submissions().is_empty());
    }
}
