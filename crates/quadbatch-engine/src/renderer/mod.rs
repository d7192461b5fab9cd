//! Sprite renderer: batch staging and frame submission.
//!
//! ```text
//! stage_sprite* -> render(target) -> [render(other target) ...] -> next frame
//! ```
//!
//! Each `render` uploads the staged quads and draws them with one indexed draw
//! inside one command-buffer submission, then empties the batch. A render
//! target drawn in one call can be sampled by a later call, which is how a
//! scene drawn at the logical resolution gets upscaled to the window.


use crate::backend::{Backend, DrawCall, LoadOp, PassDesc};
use crate::batch::{quad_indices, SpriteBatch, INDICES_PER_QUAD};
use crate::camera::Camera;
use crate::config::RendererConfig;
use crate::coords::{ColorRgba, Rect, Viewport};
use crate::error::{
    FrameError, InitError, LoadError, ResourceError, ResourceKind, StageError,
};
use crate::resource::{
    ImageData, LiveResources, PipelineId, ShaderId, ShaderSource, ShaderStage, TextureId,
};

/// Result of a `render` or `clear` call that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// One indexed draw of `index_count` indices was submitted.
    Drawn { index_count: u32 },
    /// The pass was submitted without a draw (empty batch or `clear`).
    Cleared,
    /// A command buffer or swapchain image was unavailable; nothing was
    /// submitted.
    Dropped(FrameError),
}

impl FrameOutcome {
    #[inline]
    pub fn is_dropped(&self) -> bool {
        matches!(self, FrameOutcome::Dropped(_))
    }
}

/// Texture created from a decoded image file.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct LoadedTexture {
    pub id: TextureId,
    pub width: u32,
    pub height: u32,
}

/// Running totals since the renderer was created.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct RenderStats {
    pub submissions: u64,
    pub draw_calls: u64,
    pub sprites_drawn: u64,
    pub dropped_frames: u64,
}

/// Owns the device, the sprite batch and the static quad indices.
///
/// Caller-created pipelines, shaders and textures are never destroyed
/// implicitly; release them with the matching `destroy_*` / `unload_*` call
/// before dropping the renderer.
pub struct Renderer<B: Backend> {
    backend: B,
    batch: SpriteBatch,
    config: RendererConfig,
    stats: RenderStats,
}

impl<B: Backend> Renderer<B> {
    /// Allocates the sprite buffers on `backend` and uploads the index data.
    pub fn new(mut backend: B, config: RendererConfig) -> Result<Self, InitError> {
        config.validate()?;

        let indices = quad_indices(config.capacity);
        backend.init_buffers(config.capacity, &indices, config.filter)?;

        log::info!(
            "renderer: {} sprites per batch, logical size {}x{}",
            config.capacity,
            config.logical_size.width,
            config.logical_size.height
        );

        Ok(Self {
            backend,
            batch: SpriteBatch::new(config.capacity),
            config,
            stats: RenderStats::default(),
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.batch.capacity()
    }

    #[inline]
    pub fn logical_size(&self) -> Viewport {
        self.config.logical_size
    }

    /// Sprites staged since the last `render`.
    #[inline]
    pub fn staged(&self) -> usize {
        self.batch.len()
    }

    pub fn batch(&self) -> &SpriteBatch {
        &self.batch
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    // ── resources ─────────────────────────────────────────────────────────

    pub fn create_shader(
        &mut self,
        source: &ShaderSource,
        stage: ShaderStage,
    ) -> Result<ShaderId, ResourceError> {
        self.backend.create_shader(source, stage)
    }

    /// Compiles the built-in sprite shader for `stage`.
    pub fn builtin_shader(&mut self, stage: ShaderStage) -> Result<ShaderId, ResourceError> {
        self.backend.create_shader(&ShaderSource::builtin(stage), stage)
    }

    /// Loads `<assets>/Content/Shaders/<name>.wgsl`.
    pub fn load_shader(&mut self, name: &str, stage: ShaderStage) -> Result<ShaderId, LoadError> {
        let path = self.config.assets.shader(name);
        let result = ShaderSource::read(&path)
            .and_then(|source| Ok(self.backend.create_shader(&source, stage)?));

        match &result {
            Ok(_) => log::debug!("renderer: loaded {stage} shader {}", path.display()),
            Err(err) => log::error!("renderer: failed to load {stage} shader: {err}"),
        }
        result
    }

    pub fn unload_shader(&mut self, id: ShaderId) -> Result<(), ResourceError> {
        self.backend.destroy_shader(id)
    }

    /// Links a vertex and a fragment shader with the sprite vertex layout and
    /// premultiplied-alpha blending.
    pub fn create_pipeline(
        &mut self,
        vertex: ShaderId,
        fragment: ShaderId,
    ) -> Result<PipelineId, ResourceError> {
        expect_stage(self.backend.shader_stage(vertex)?, ShaderStage::Vertex)?;
        expect_stage(self.backend.shader_stage(fragment)?, ShaderStage::Fragment)?;
        self.backend.create_pipeline(vertex, fragment)
    }

    pub fn destroy_pipeline(&mut self, id: PipelineId) -> Result<(), ResourceError> {
        self.backend.destroy_pipeline(id)
    }

    pub fn create_texture(&mut self, image: &ImageData) -> Result<TextureId, ResourceError> {
        self.backend.create_texture(image)
    }

    /// Loads and decodes `<assets>/Content/Images/<name>`.
    pub fn load_texture(&mut self, name: &str) -> Result<LoadedTexture, LoadError> {
        let path = self.config.assets.image(name);
        let result = ImageData::decode_file(&path).and_then(|image| {
            let id = self.backend.create_texture(&image)?;
            Ok(LoadedTexture {
                id,
                width: image.width,
                height: image.height,
            })
        });

        match &result {
            Ok(tex) => log::debug!(
                "renderer: loaded texture {} ({}x{})",
                path.display(),
                tex.width,
                tex.height
            ),
            Err(err) => log::error!("renderer: failed to load texture: {err}"),
        }
        result
    }

    /// Offscreen image usable as a `render` destination and, afterwards, as
    /// a sampled texture.
    pub fn create_render_target(&mut self, width: u32, height: u32) -> Result<TextureId, ResourceError> {
        self.backend.create_render_target(width, height)
    }

    pub fn unload_texture(&mut self, id: TextureId) -> Result<(), ResourceError> {
        self.backend.destroy_texture(id)
    }

    pub fn live_resources(&self) -> LiveResources {
        self.backend.live_resources()
    }

    /// Reconfigures the presentation surface after a window resize.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.backend.resize_surface(width, height);
    }

    // ── frame ─────────────────────────────────────────────────────────────

    /// Stages one sprite: `dest` in world units, `source` in normalized
    /// texture space, `color` as a straight-alpha tint.
    ///
    /// Nothing is submitted to the device.
    pub fn stage_sprite(&mut self, dest: Rect, source: Rect, color: ColorRgba) -> Result<(), StageError> {
        self.batch.stage(dest, source, color)
    }

    /// Uploads the staged sprites and draws them with `pipeline` sampling
    /// `texture`, into `target` or the next swapchain image when `None`.
    ///
    /// `clear` replaces the destination's content with the clear color first;
    /// otherwise previous content is kept. The batch is empty afterwards in
    /// every case, including errors and dropped frames.
    pub fn render(
        &mut self,
        pipeline: PipelineId,
        texture: TextureId,
        camera: Camera,
        target: Option<TextureId>,
        clear: bool,
    ) -> Result<FrameOutcome, ResourceError> {
        let result = self
            .validate_draw(pipeline, texture, target)
            .and_then(|()| self.submit_frame(Some((pipeline, texture)), camera, target, clear));
        self.batch.reset();
        result
    }

    /// Clears `target` (or the next swapchain image) to the clear color
    /// without drawing.
    ///
    /// Staged sprites cannot be drawn without a pipeline and are discarded.
    pub fn clear(&mut self, target: Option<TextureId>) -> Result<FrameOutcome, ResourceError> {
        if !self.batch.is_empty() {
            log::warn!(
                "renderer: clear discards {} staged sprite(s); render them first",
                self.batch.len()
            );
        }

        let result = self
            .validate_target(target)
            .and_then(|()| self.submit_frame(None, Camera::default(), target, true));
        self.batch.reset();
        result
    }

    /// Releases the renderer's buffers and the device.
    pub fn quit(self) {
        drop(self);
    }

    fn validate_target(&self, target: Option<TextureId>) -> Result<(), ResourceError> {
        if let Some(target) = target {
            if !self.backend.texture_info(target)?.render_target {
                return Err(ResourceError::NotARenderTarget);
            }
        }
        Ok(())
    }

    fn validate_draw(
        &self,
        pipeline: PipelineId,
        texture: TextureId,
        target: Option<TextureId>,
    ) -> Result<(), ResourceError> {
        if !self.backend.has_pipeline(pipeline) {
            return Err(ResourceError::stale(ResourceKind::Pipeline));
        }
        self.backend.texture_info(texture)?;
        self.validate_target(target)?;
        if target == Some(texture) {
            return Err(ResourceError::FeedbackLoop);
        }
        Ok(())
    }

    fn submit_frame(
        &mut self,
        draw_with: Option<(PipelineId, TextureId)>,
        camera: Camera,
        target: Option<TextureId>,
        clear: bool,
    ) -> Result<FrameOutcome, ResourceError> {
        let sprites = self.batch.len();

        let mut frame = match self.backend.begin_frame() {
            Ok(frame) => frame,
            Err(err) => return Ok(self.dropped(err)),
        };

        let vertices = self.batch.close();
        if !vertices.is_empty() {
            self.backend.copy_vertices(&mut frame, vertices);
        }

        if let Err(err) = self.backend.acquire_target(&mut frame, target) {
            return Ok(self.dropped(err));
        }

        let draw = match draw_with {
            Some((pipeline, texture)) if sprites > 0 => Some(DrawCall {
                pipeline,
                texture,
                projection: camera.projection(self.config.logical_size),
                index_count: (sprites * INDICES_PER_QUAD) as u32,
            }),
            _ => None,
        };

        let load = if clear {
            LoadOp::Clear(self.config.clear_color)
        } else {
            LoadOp::Load
        };

        self.backend.render_pass(&mut frame, &PassDesc { load, draw })?;
        self.backend.submit(frame);

        self.stats.submissions += 1;
        log::trace!("renderer: submitted pass ({sprites} sprites, clear: {clear})");

        Ok(match draw {
            Some(draw) => {
                self.stats.draw_calls += 1;
                self.stats.sprites_drawn += sprites as u64;
                FrameOutcome::Drawn {
                    index_count: draw.index_count,
                }
            }
            None => FrameOutcome::Cleared,
        })
    }

    fn dropped(&mut self, err: FrameError) -> FrameOutcome {
        log::warn!("renderer: frame dropped: {err}");
        self.stats.dropped_frames += 1;
        FrameOutcome::Dropped(err)
    }
}

impl<B: Backend> Drop for Renderer<B> {
    fn drop(&mut self) {
        let live = self.backend.live_resources();
        if live.total() > 0 {
            log::warn!(
                "renderer: shutting down with {} pipeline(s), {} shader(s), {} texture(s) still loaded",
                live.pipelines,
                live.shaders,
                live.textures
            );
        }
        log::debug!("renderer: released sprite buffers");
    }
}

fn expect_stage(actual: ShaderStage, expected: ShaderStage) -> Result<(), ResourceError> {
    if actual == expected {
        Ok(())
    } else {
        Err(ResourceError::StageMismatch { expected, actual })
    }
}
