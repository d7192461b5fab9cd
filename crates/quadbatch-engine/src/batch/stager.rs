use crate::coords::{ColorRgba, Rect};
use crate::error::StageError;

use super::geometry::{quad_vertices, VERTICES_PER_QUAD};
use super::Vertex;

/// Host-visible staging memory for one batch of sprite quads.
///
/// Only the first `len()` quad slots hold meaningful data. The write mapping
/// is opened lazily by the first `stage` of a cycle and closed before upload;
/// at most one mapping is open at a time.
#[derive(Debug)]
pub struct SpriteBatch {
    staging: Box<[Vertex]>,
    count: usize,
    mapped: bool,
}

impl SpriteBatch {
    pub fn new(capacity: usize) -> Self {
        Self {
            staging: vec![Vertex::default(); capacity * VERTICES_PER_QUAD].into_boxed_slice(),
            count: 0,
            mapped: false,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.staging.len() / VERTICES_PER_QUAD
    }

    /// Number of staged sprites.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.count == self.capacity()
    }

    /// Whether a write mapping is currently open.
    #[inline]
    pub fn is_mapped(&self) -> bool {
        self.mapped
    }

    /// Appends one quad at slot `len()`.
    ///
    /// When the batch is full nothing is written and the count is unchanged.
    pub fn stage(&mut self, dest: Rect, source: Rect, color: ColorRgba) -> Result<(), StageError> {
        if self.is_full() {
            return Err(StageError::OutOfCapacity {
                capacity: self.capacity(),
            });
        }

        if !self.mapped {
            log::trace!("sprite batch: opening staging mapping");
            self.mapped = true;
        }

        let base = self.count * VERTICES_PER_QUAD;
        self.staging[base..base + VERTICES_PER_QUAD]
            .copy_from_slice(&quad_vertices(dest, source, color));
        self.count += 1;
        Ok(())
    }

    /// Vertices of the staged quads.
    #[inline]
    pub fn vertices(&self) -> &[Vertex] {
        &self.staging[..self.count * VERTICES_PER_QUAD]
    }

    /// Closes the write mapping and returns the vertices ready for upload.
    pub(crate) fn close(&mut self) -> &[Vertex] {
        self.mapped = false;
        self.vertices()
    }

    /// Starts a new cycle. Slot contents are left in place and overwritten by
    /// the next stages.
    pub(crate) fn reset(&mut self) {
        self.count = 0;
        self.mapped = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sprite(batch: &mut SpriteBatch, x: f32) -> Result<(), StageError> {
        batch.stage(Rect::new(x, 0.0, 8.0, 8.0), Rect::FULL, ColorRgba::WHITE)
    }

    #[test]
    fn new_batch_is_empty_and_unmapped() {
        let batch = SpriteBatch::new(4);
        assert_eq!(batch.capacity(), 4);
        assert!(batch.is_empty());
        assert!(!batch.is_mapped());
        assert!(batch.vertices().is_empty());
    }

    #[test]
    fn first_stage_opens_the_mapping() {
        let mut batch = SpriteBatch::new(4);
        sprite(&mut batch, 0.0).unwrap();
        assert!(batch.is_mapped());
        sprite(&mut batch, 1.0).unwrap();
        assert!(batch.is_mapped());
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn stage_writes_slot_at_count() {
        let mut batch = SpriteBatch::new(4);
        sprite(&mut batch, 0.0).unwrap();
        sprite(&mut batch, 32.0).unwrap();

        let v = batch.vertices();
        assert_eq!(v.len(), 8);
        assert_eq!(v[4].position, [32.0, 0.0, 0.0]);
        assert_eq!(v[6].position, [40.0, 8.0, 0.0]);
    }

    #[test]
    fn overflow_is_rejected_without_writing() {
        let mut batch = SpriteBatch::new(2);
        sprite(&mut batch, 0.0).unwrap();
        sprite(&mut batch, 1.0).unwrap();
        let before = batch.vertices().to_vec();

        assert_eq!(
            sprite(&mut batch, 2.0),
            Err(StageError::OutOfCapacity { capacity: 2 })
        );
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.vertices(), &before[..]);
    }

    #[test]
    fn close_unmaps_and_keeps_data() {
        let mut batch = SpriteBatch::new(2);
        sprite(&mut batch, 0.0).unwrap();
        assert_eq!(batch.close().len(), 4);
        assert!(!batch.is_mapped());
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn reset_starts_a_new_cycle() {
        let mut batch = SpriteBatch::new(1);
        sprite(&mut batch, 0.0).unwrap();
        batch.reset();
        assert!(batch.is_empty());
        assert!(!batch.is_mapped());
        sprite(&mut batch, 5.0).unwrap();
        assert_eq!(batch.vertices()[0].position, [5.0, 0.0, 0.0]);
    }
}
