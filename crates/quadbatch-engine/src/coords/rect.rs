use super::Vec2;

/// Axis-aligned rectangle given by its top-left corner and its size.
///
/// Used for both destination rectangles (world units) and source rectangles
/// (normalized texture space). Sizes may be negative; a negative width mirrors
/// the sprite horizontally, which the stager passes through untouched.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rect {
    pub origin: Vec2,
    pub size: Vec2,
}

impl Rect {
    /// The whole texture as a source rectangle.
    pub const FULL: Rect = Rect::new(0.0, 0.0, 1.0, 1.0);

    #[inline]
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            origin: Vec2::new(x, y),
            size: Vec2::new(w, h),
        }
    }

    /// Source rectangle of frame `(col, row)` in a grid atlas.
    ///
    /// All arguments are in texels; the result is normalized so that
    /// `origin = (col, row) * frame / texture` and `size = frame / texture`.
    #[inline]
    pub fn atlas_frame(
        col: f32,
        row: f32,
        frame_w: f32,
        frame_h: f32,
        texture_w: f32,
        texture_h: f32,
    ) -> Self {
        let fw = frame_w / texture_w;
        let fh = frame_h / texture_h;
        Rect::new(col * fw, row * fh, fw, fh)
    }

    #[inline]
    pub fn min(self) -> Vec2 {
        self.origin
    }

    #[inline]
    pub fn max(self) -> Vec2 {
        self.origin + self.size
    }

    /// Corners in quad winding order: top-left, top-right, bottom-right, bottom-left.
    #[inline]
    pub fn corners(self) -> [Vec2; 4] {
        let min = self.min();
        let max = self.max();
        [
            Vec2::new(min.x, min.y),
            Vec2::new(max.x, min.y),
            Vec2::new(max.x, max.y),
            Vec2::new(min.x, max.y),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(x: f32, y: f32, w: f32, h: f32) -> Rect { Rect::new(x, y, w, h) }

    // ── corners ───────────────────────────────────────────────────────────

    #[test]
    fn corners_follow_quad_winding() {
        let c = r(2.0, 3.0, 10.0, 20.0).corners();
        assert_eq!(c[0], Vec2::new(2.0, 3.0));
        assert_eq!(c[1], Vec2::new(12.0, 3.0));
        assert_eq!(c[2], Vec2::new(12.0, 23.0));
        assert_eq!(c[3], Vec2::new(2.0, 23.0));
    }

    #[test]
    fn corners_keep_negative_size() {
        // Mirrored sprites: the top-left corner stays at `origin`.
        let c = r(10.0, 0.0, -4.0, 5.0).corners();
        assert_eq!(c[0], Vec2::new(10.0, 0.0));
        assert_eq!(c[1], Vec2::new(6.0, 0.0));
    }

    // ── atlas_frame ───────────────────────────────────────────────────────

    #[test]
    fn atlas_frame_second_row() {
        let f = Rect::atlas_frame(0.0, 1.0, 25.0, 25.0, 250.0, 250.0);
        assert_eq!(f, r(0.0, 0.1, 0.1, 0.1));
    }

    #[test]
    fn atlas_frame_single_frame_is_full() {
        assert_eq!(Rect::atlas_frame(0.0, 0.0, 64.0, 32.0, 64.0, 32.0), Rect::FULL);
    }
}
