//! Error types surfaced to callers.
//!
//! Every failure is terminal to its own operation; nothing here is retried.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::resource::ShaderStage;

/// Staging was rejected; the offending sprite was not written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StageError {
    #[error("sprite batch is full ({capacity} sprites); render before staging more")]
    OutOfCapacity { capacity: usize },
}

/// Kind of device object a handle refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Pipeline,
    Shader,
    Texture,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceKind::Pipeline => "pipeline",
            ResourceKind::Shader => "shader",
            ResourceKind::Texture => "texture",
        };
        f.write_str(s)
    }
}

/// Invalid use of a device object, or the device refused to create one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    #[error("{kind} handle is stale (already destroyed)")]
    Stale { kind: ResourceKind },

    #[error("texture was not created as a render target")]
    NotARenderTarget,

    #[error("texture is sampled and rendered to in the same pass")]
    FeedbackLoop,

    #[error("expected a {expected} shader, got a {actual} shader")]
    StageMismatch {
        expected: ShaderStage,
        actual: ShaderStage,
    },

    #[error("{stage} shader failed to compile:\n{message}")]
    Compile { stage: ShaderStage, message: String },

    #[error("invalid texture size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("device rejected {kind}: {message}")]
    Device { kind: ResourceKind, message: String },
}

impl ResourceError {
    #[inline]
    pub(crate) fn stale(kind: ResourceKind) -> Self {
        ResourceError::Stale { kind }
    }
}

/// Shader or texture could not be loaded from disk.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode image {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("pixel data is {actual} bytes, expected {expected} for {width}x{height} RGBA8")]
    PixelData {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error(transparent)]
    Resource(#[from] ResourceError),
}

/// Transient failure while recording a frame; the frame is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("no command buffer available: {0}")]
    CommandBufferUnavailable(String),

    #[error("no swapchain image available: {0}")]
    SwapchainUnavailable(String),
}

/// Rejected renderer configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("sprite capacity must be in 1..={max}, got {capacity}")]
    Capacity { capacity: usize, max: usize },

    #[error("logical size must be positive and finite, got {width}x{height}")]
    LogicalSize { width: f32, height: f32 },
}

/// Renderer construction failed; no partial state is usable.
#[derive(Debug, Error)]
pub enum InitError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to allocate sprite buffers: {0}")]
    Buffers(String),
}
