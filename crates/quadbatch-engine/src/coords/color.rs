/// RGBA tint with straight (non-premultiplied) alpha.
///
/// Stored verbatim in every vertex of a staged quad; premultiplication happens
/// in the fragment stage.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ColorRgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl ColorRgba {
    pub const WHITE: ColorRgba = ColorRgba::new(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: ColorRgba = ColorRgba::new(0.0, 0.0, 0.0, 1.0);

    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub const fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    #[inline]
    pub(crate) fn to_wgpu(self) -> wgpu::Color {
        wgpu::Color {
            r: self.r as f64,
            g: self.g as f64,
            b: self.b as f64,
            a: self.a as f64,
        }
    }
}

impl Default for ColorRgba {
    fn default() -> Self {
        Self::WHITE
    }
}

impl From<[f32; 4]> for ColorRgba {
    #[inline]
    fn from([r, g, b, a]: [f32; 4]) -> Self {
        Self::new(r, g, b, a)
    }
}
