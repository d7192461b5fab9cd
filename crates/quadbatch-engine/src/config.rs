use crate::coords::{ColorRgba, Viewport};
use crate::error::ConfigError;
use crate::resource::AssetPaths;

/// Sprites per batch when nothing else is requested.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Upper bound on sprites per batch; every vertex index must fit in a `u16`.
pub const MAX_CAPACITY: usize = (u16::MAX as usize + 1) / 4;

/// Texture filtering used by the renderer's sampler.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum SamplerFilter {
    /// Point sampling; keeps pixel art crisp when upscaled.
    #[default]
    Nearest,
    Linear,
}

/// Renderer construction parameters.
///
/// Capacity is fixed for the renderer's lifetime; the sprite buffers are never
/// reallocated.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Maximum sprites staged between two `render` calls.
    pub capacity: usize,

    /// World units visible through the camera.
    pub logical_size: Viewport,

    /// Color written by `clear = true` passes.
    pub clear_color: ColorRgba,

    pub filter: SamplerFilter,

    /// Where `load_shader` / `load_texture` look for files.
    pub assets: AssetPaths,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            logical_size: Viewport::default(),
            clear_color: ColorRgba::BLACK,
            filter: SamplerFilter::Nearest,
            assets: AssetPaths::default(),
        }
    }
}

impl RendererConfig {
    /// Checks the parameters without touching any device.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 || self.capacity > MAX_CAPACITY {
            return Err(ConfigError::Capacity {
                capacity: self.capacity,
                max: MAX_CAPACITY,
            });
        }

        let Viewport { width, height } = self.logical_size;
        if !self.logical_size.is_valid() {
            return Err(ConfigError::LogicalSize { width, height });
        }

        Ok(())
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_logical_size(mut self, width: f32, height: f32) -> Self {
        self.logical_size = Viewport::new(width, height);
        self
    }

    pub fn with_clear_color(mut self, color: ColorRgba) -> Self {
        self.clear_color = color;
        self
    }

    pub fn with_filter(mut self, filter: SamplerFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_assets(mut self, assets: AssetPaths) -> Self {
        self.assets = assets;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = RendererConfig::default();
        assert_eq!(cfg.capacity, 1024);
        assert_eq!(cfg.logical_size, Viewport::new(160.0, 90.0));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let err = RendererConfig::default().with_capacity(0).validate().unwrap_err();
        assert_eq!(err, ConfigError::Capacity { capacity: 0, max: MAX_CAPACITY });
    }

    #[test]
    fn capacity_is_bounded_by_u16_indices() {
        assert_eq!(MAX_CAPACITY, 16384);
        assert!(RendererConfig::default().with_capacity(MAX_CAPACITY).validate().is_ok());
        assert!(RendererConfig::default().with_capacity(MAX_CAPACITY + 1).validate().is_err());
    }

    #[test]
    fn degenerate_logical_size_is_rejected() {
        let err = RendererConfig::default()
            .with_logical_size(0.0, 90.0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::LogicalSize { .. }));

        let nan = RendererConfig::default().with_logical_size(f32::NAN, 90.0);
        assert!(nan.validate().is_err());
    }
}
