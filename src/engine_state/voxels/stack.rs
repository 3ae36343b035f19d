//! # Voxel Stack
//!
//! The voxels standing in one grid cell, kept in insertion order.

use super::voxel::{FaceId, Voxel};

/// An ordered collection of voxels sharing one `(x, z)` cell.
///
/// Heights are not required to be contiguous. No two voxels of a stack share a
/// height.
#[derive(Clone, Debug, Default)]
pub struct VoxelStack {
    voxels: Vec<Voxel>,
}

impl VoxelStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn voxels(&self) -> &[Voxel] {
        &self.voxels
    }

    pub fn len(&self) -> usize {
        self.voxels.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty()
    }

    /// Highest height present, or `None` for an empty stack.
    pub fn max_height(&self) -> Option<i32> {
        self.voxels.iter().map(|voxel| voxel.height).max()
    }

    pub fn contains_height(&self, height: i32) -> bool {
        self.voxels.iter().any(|voxel| voxel.height == height)
    }

    /// Whether `voxel` is the highest voxel of this stack.
    pub fn is_surface(&self, voxel: &Voxel) -> bool {
        self.max_height() == Some(voxel.height)
    }

    /// Appends a voxel. The caller guarantees its height is free.
    pub(super) fn push(&mut self, voxel: Voxel) {
        debug_assert!(!self.contains_height(voxel.height));
        self.voxels.push(voxel);
    }

    /// Removes and returns the voxel owning `face_id`.
    pub(super) fn remove_by_face(&mut self, face_id: FaceId) -> Option<Voxel> {
        let index = self
            .voxels
            .iter()
            .position(|voxel| voxel.face_with_id(face_id).is_some())?;
        Some(self.voxels.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::voxel::{block_type::BlockType, FaceIdGenerator};

    #[test]
    fn empty_stack_has_no_height() {
        let stack = VoxelStack::new();
        assert!(stack.is_empty());
        assert_eq!(stack.max_height(), None);
    }

    #[test]
    fn surface_follows_max_height() {
        let mut ids = FaceIdGenerator::new();
        let mut stack = VoxelStack::new();
        stack.push(Voxel::new(0, 0, 0, BlockType::GRASS, &mut ids));
        stack.push(Voxel::new(0, 0, 3, BlockType::GRASS, &mut ids));
        stack.push(Voxel::new(0, 0, 1, BlockType::GRASS, &mut ids));

        assert_eq!(stack.max_height(), Some(3));
        assert!(stack.is_surface(&stack.voxels()[1]));
        assert!(!stack.is_surface(&stack.voxels()[2]));

        let removed = stack.remove_by_face(8).map(|voxel| voxel.height);
        assert_eq!(removed, Some(3));
        assert_eq!(stack.max_height(), Some(1));
        assert_eq!(stack.len(), 2);
    }
}
