//! Coordinate and color types shared by the stager, camera and backends.
//!
//! World space:
//! - units are logical pixels of the fixed logical viewport (e.g. 160x90)
//! - origin top-left, +X right, +Y down
//!
//! Texture space is normalized `[0, 1] x [0, 1]` with the origin at the
//! top-left texel; values outside that range are allowed for atlas math.

mod color;
mod rect;
mod vec2;
mod viewport;

pub use color::ColorRgba;
pub use rect::Rect;
pub use vec2::Vec2;
pub use viewport::Viewport;
