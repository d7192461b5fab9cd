//! Sprite batching: vertex format, static quad indices and host staging.
//!
//! A batch cycle is `stage* -> close -> upload -> reset`. The stager never
//! talks to a device; `renderer::Renderer` drives the upload.

mod geometry;
mod stager;
mod vertex;

pub use geometry::{quad_indices, quad_vertices, INDICES_PER_QUAD, QUAD_INDEX_PATTERN, VERTICES_PER_QUAD};
pub use stager::SpriteBatch;
pub use vertex::Vertex;
