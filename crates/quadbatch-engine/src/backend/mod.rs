//! Device seam between the renderer and a graphics API.
//!
//! A backend owns every device object and hands out generation-checked ids.
//! One `Renderer::render` call drives a backend through exactly one frame:
//!
//! ```text
//! begin_frame -> [copy_vertices] -> acquire_target -> render_pass -> submit
//! ```
//!
//! All commands of a frame are recorded into one `Frame` and submitted
//! together, so the vertex copy is ordered before the draw that reads it.
//! Dropping a `Frame` without submitting discards everything recorded in it.

mod soft;
mod wgpu_backend;

use glam::Mat4;

use crate::batch::Vertex;
use crate::config::SamplerFilter;
use crate::coords::ColorRgba;
use crate::error::{FrameError, InitError, ResourceError};
use crate::resource::{ImageData, LiveResources, PipelineId, ShaderId, ShaderSource, ShaderStage, TextureId};

pub use self::soft::{SoftBackend, SoftCommand, SoftFrame, SoftTarget};
pub use self::wgpu_backend::{WgpuBackend, WgpuFrame};

/// Size and role of a texture.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TextureInfo {
    pub width: u32,
    pub height: u32,
    /// Created by `create_render_target`; may be drawn into.
    pub render_target: bool,
}

/// What happens to the destination's previous content when a pass begins.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum LoadOp {
    Clear(ColorRgba),
    Load,
}

/// One indexed draw over the first `index_count` indices.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DrawCall {
    pub pipeline: PipelineId,
    pub texture: TextureId,
    pub projection: Mat4,
    pub index_count: u32,
}

/// A render pass on the frame's acquired target.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PassDesc {
    pub load: LoadOp,
    pub draw: Option<DrawCall>,
}

/// Graphics device used by `Renderer`.
///
/// Handles passed in are expected to be validated by the caller; backends
/// still report stale ids instead of panicking.
pub trait Backend {
    /// Recording state of one frame.
    type Frame;

    /// Allocates the vertex, index and staging buffers for `capacity` sprites,
    /// uploads the static index data and creates the sampler.
    fn init_buffers(
        &mut self,
        capacity: usize,
        indices: &[u16],
        filter: SamplerFilter,
    ) -> Result<(), InitError>;

    fn create_shader(
        &mut self,
        source: &ShaderSource,
        stage: ShaderStage,
    ) -> Result<ShaderId, ResourceError>;
    fn shader_stage(&self, id: ShaderId) -> Result<ShaderStage, ResourceError>;
    fn destroy_shader(&mut self, id: ShaderId) -> Result<(), ResourceError>;

    fn create_pipeline(
        &mut self,
        vertex: ShaderId,
        fragment: ShaderId,
    ) -> Result<PipelineId, ResourceError>;
    fn has_pipeline(&self, id: PipelineId) -> bool;
    fn destroy_pipeline(&mut self, id: PipelineId) -> Result<(), ResourceError>;

    fn create_texture(&mut self, image: &ImageData) -> Result<TextureId, ResourceError>;
    fn create_render_target(&mut self, width: u32, height: u32) -> Result<TextureId, ResourceError>;
    fn texture_info(&self, id: TextureId) -> Result<TextureInfo, ResourceError>;
    fn destroy_texture(&mut self, id: TextureId) -> Result<(), ResourceError>;

    fn live_resources(&self) -> LiveResources;

    /// Reconfigures the presentation surface; a zero size defers until the
    /// next non-zero size.
    fn resize_surface(&mut self, width: u32, height: u32);

    /// Acquires a command buffer for one frame.
    fn begin_frame(&mut self) -> Result<Self::Frame, FrameError>;

    /// Records the upload of `vertices` from staging into the vertex buffer.
    fn copy_vertices(&mut self, frame: &mut Self::Frame, vertices: &[Vertex]);

    /// Resolves the draw destination: `target`, or the next swapchain image.
    fn acquire_target(
        &mut self,
        frame: &mut Self::Frame,
        target: Option<TextureId>,
    ) -> Result<(), FrameError>;

    fn render_pass(&mut self, frame: &mut Self::Frame, pass: &PassDesc) -> Result<(), ResourceError>;

    /// Submits everything recorded in `frame` and presents an acquired
    /// swapchain image.
    fn submit(&mut self, frame: Self::Frame);
}
