//! Quadbatch engine crate.
//!
//! A sprite renderer that stages textured quads into one vertex batch and
//! submits each batch as a single indexed draw, plus the window runtime that
//! drives it.

pub mod backend;
pub mod batch;
pub mod camera;
pub mod config;
pub mod coords;
pub mod core;
pub mod device;
pub mod error;
pub mod logging;
pub mod renderer;
pub mod resource;
pub mod time;
pub mod window;

pub use backend::{Backend, SoftBackend, WgpuBackend};
pub use camera::Camera;
pub use config::{RendererConfig, SamplerFilter};
pub use coords::{ColorRgba, Rect, Vec2, Viewport};
pub use error::{ConfigError, FrameError, InitError, LoadError, ResourceError, StageError};
pub use renderer::{FrameOutcome, LoadedTexture, RenderStats, Renderer};
pub use resource::{ImageData, PipelineId, ShaderId, ShaderSource, ShaderStage, TextureId};
