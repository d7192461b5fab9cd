use crate::coords::{ColorRgba, Rect};

use super::Vertex;

pub const VERTICES_PER_QUAD: usize = 4;
pub const INDICES_PER_QUAD: usize = 6;

/// Two triangles over corners TL(0), TR(1), BR(2), BL(3).
pub const QUAD_INDEX_PATTERN: [u16; INDICES_PER_QUAD] = [0, 1, 2, 0, 2, 3];

/// Index data for `capacity` quad slots.
///
/// Slot `i` reads vertices `4i..4i+4`; the result depends on nothing but
/// `capacity` and is uploaded once.
pub fn quad_indices(capacity: usize) -> Vec<u16> {
    let mut indices = Vec::with_capacity(capacity * INDICES_PER_QUAD);
    for slot in 0..capacity {
        let base = (slot * VERTICES_PER_QUAD) as u16;
        indices.extend(QUAD_INDEX_PATTERN.iter().map(|i| base + i));
    }
    indices
}

/// Corners of one sprite: `dest` corners paired with `source` corners.
pub fn quad_vertices(dest: Rect, source: Rect, color: ColorRgba) -> [Vertex; VERTICES_PER_QUAD] {
    let pos = dest.corners();
    let uv = source.corners();
    let color = color.to_array();

    std::array::from_fn(|i| Vertex {
        position: [pos[i].x, pos[i].y, 0.0],
        uv: uv[i].into(),
        color,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_slot_follows_the_pattern() {
        let indices = quad_indices(64);
        assert_eq!(indices.len(), 64 * 6);
        for (slot, quad) in indices.chunks_exact(6).enumerate() {
            let b = (slot * 4) as u16;
            assert_eq!(quad, &[b, b + 1, b + 2, b, b + 2, b + 3]);
        }
    }

    #[test]
    fn largest_capacity_fits_u16() {
        let indices = quad_indices(crate::config::MAX_CAPACITY);
        assert_eq!(indices.last().copied(), Some(u16::MAX));
    }

    #[test]
    fn zero_capacity_is_empty() {
        assert!(quad_indices(0).is_empty());
    }

    #[test]
    fn corners_pair_dest_with_source() {
        let v = quad_vertices(
            Rect::new(10.0, 20.0, 16.0, 8.0),
            Rect::new(0.5, 0.5, 0.5, 0.5),
            ColorRgba::new(1.0, 0.5, 0.25, 0.5),
        );

        assert_eq!(v[0].position, [10.0, 20.0, 0.0]);
        assert_eq!(v[0].uv, [0.5, 0.5]);
        assert_eq!(v[1].position, [26.0, 20.0, 0.0]);
        assert_eq!(v[1].uv, [1.0, 0.5]);
        assert_eq!(v[2].position, [26.0, 28.0, 0.0]);
        assert_eq!(v[2].uv, [1.0, 1.0]);
        assert_eq!(v[3].position, [10.0, 28.0, 0.0]);
        assert_eq!(v[3].uv, [0.5, 1.0]);
        assert!(v.iter().all(|v| v.color == [1.0, 0.5, 0.25, 0.5]));
    }
}
