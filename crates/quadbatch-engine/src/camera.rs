//! Camera and orthographic projection.
//!
//! The projection maps the logical viewport (top-left origin, +Y down) onto
//! clip space with near = 0 and far = -1, so a vertex at `z = 0` lands at
//! depth 0.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::coords::{Vec2, Viewport};

/// Camera supplied per `render` call.
///
/// `zoom` divides the positional offset only; the visible extent is always the
/// logical viewport size.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    pub x: f32,
    pub y: f32,
    pub zoom: f32,
}

impl Camera {
    #[inline]
    pub const fn new(x: f32, y: f32, zoom: f32) -> Self {
        Self { x, y, zoom }
    }

    /// Top-left corner of the visible world region.
    #[inline]
    pub fn origin(self) -> Vec2 {
        Vec2::new(self.x / self.zoom, self.y / self.zoom)
    }

    /// Projection for this camera over `viewport`.
    pub fn projection(self, viewport: Viewport) -> Mat4 {
        let o = self.origin();
        Mat4::orthographic_rh(
            o.x,
            o.x + viewport.width,
            o.y + viewport.height,
            o.y,
            0.0,
            -1.0,
        )
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0)
    }
}

/// Projects a world point to normalized device coordinates.
#[inline]
pub fn project(projection: &Mat4, point: Vec2) -> Vec2 {
    let p = projection.project_point3(Vec3::new(point.x, point.y, 0.0));
    Vec2::new(p.x, p.y)
}

/// Vertex-stage uniform carrying the projection (column-major).
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct CameraUniform {
    pub projection: [[f32; 4]; 4],
}

impl From<Mat4> for CameraUniform {
    fn from(m: Mat4) -> Self {
        Self {
            projection: m.to_cols_array_2d(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const VIEW: Viewport = Viewport::new(160.0, 90.0);

    fn ndc(cam: Camera, x: f32, y: f32) -> Vec2 {
        project(&cam.projection(VIEW), Vec2::new(x, y))
    }

    #[test]
    fn world_origin_maps_to_top_left() {
        let p = ndc(Camera::default(), 0.0, 0.0);
        assert_relative_eq!(p.x, -1.0, epsilon = 1e-5);
        assert_relative_eq!(p.y, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn viewport_extent_maps_to_bottom_right() {
        let p = ndc(Camera::default(), 160.0, 90.0);
        assert_relative_eq!(p.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(p.y, -1.0, epsilon = 1e-5);
    }

    #[test]
    fn viewport_center_maps_to_clip_center() {
        let p = ndc(Camera::default(), 80.0, 45.0);
        assert_relative_eq!(p.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(p.y, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn camera_offset_pans_the_view() {
        let p = ndc(Camera::new(10.0, 5.0, 1.0), 10.0, 5.0);
        assert_relative_eq!(p.x, -1.0, epsilon = 1e-5);
        assert_relative_eq!(p.y, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn zoom_divides_offset_not_extent() {
        let cam = Camera::new(20.0, 10.0, 2.0);
        assert_eq!(cam.origin(), Vec2::new(10.0, 5.0));

        // The visible extent is still one full viewport wide.
        let left = ndc(cam, 10.0, 5.0);
        let right = ndc(cam, 170.0, 95.0);
        assert_relative_eq!(left.x, -1.0, epsilon = 1e-5);
        assert_relative_eq!(right.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(right.y, -1.0, epsilon = 1e-5);
    }

    #[test]
    fn depth_of_zero_plane_is_zero() {
        let m = Camera::default().projection(VIEW);
        let p = m.project_point3(Vec3::new(3.0, 4.0, 0.0));
        assert_relative_eq!(p.z, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn uniform_is_column_major() {
        let u = CameraUniform::from(Camera::default().projection(VIEW));
        // Translation lives in the fourth column.
        assert_relative_eq!(u.projection[3][0], -1.0, epsilon = 1e-5);
        assert_relative_eq!(u.projection[3][1], 1.0, epsilon = 1e-5);
        assert_relative_eq!(u.projection[3][3], 1.0, epsilon = 1e-5);
    }
}
