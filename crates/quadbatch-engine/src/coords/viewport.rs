/// Fixed logical viewport the camera projects onto.
///
/// Independent of the destination image size: a 160x90 viewport rendered into
/// a 1280x720 window is upscaled by 8.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(160.0, 90.0)
    }
}
