//! # Voxel Module
//!
//! A voxel is a unit cube standing in a grid cell at some height. Each of its six
//! faces carries an identifier that is unique across the whole surface, which is
//! what the pick pass renders and reads back.

use block_type::BlockType;
use voxel_face::VoxelFace;

pub mod block_type;
pub mod voxel_face;

/// Globally unique identifier of one voxel face. Zero means "no face".
pub type FaceId = u64;

/// Hands out face identifiers from a monotonically increasing counter.
///
/// The first id returned is 1 so that a cleared pick target (all zero) never
/// decodes to a real face.
#[derive(Debug, Default)]
pub struct FaceIdGenerator {
    current: FaceId,
}

impl FaceIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next unused id.
    pub fn next_id(&mut self) -> FaceId {
        self.current += 1;
        self.current
    }

    /// The last id handed out, or 0 if none has been.
    #[cfg(test)]
    pub fn last(&self) -> FaceId {
        self.current
    }
}

/// A single cube in the surface grid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Voxel {
    /// Grid column.
    pub x: usize,

    /// Grid row.
    pub z: usize,

    /// Vertical offset inside the stack.
    pub height: i32,

    pub block_type: BlockType,

    /// Face ids indexed by `VoxelFace::index`.
    face_ids: [FaceId; 6],
}

impl Voxel {
    /// Creates a voxel and draws six fresh face ids for it.
    ///
    /// # Arguments
    /// * `x`, `z` - Grid cell of the owning stack
    /// * `height` - Vertical offset in that stack
    /// * `block_type` - Material of the voxel
    /// * `ids` - The grid's face id counter
    pub fn new(
        x: usize,
        z: usize,
        height: i32,
        block_type: BlockType,
        ids: &mut FaceIdGenerator,
    ) -> Self {
        let face_ids = std::array::from_fn(|_| ids.next_id());
        Voxel {
            x,
            z,
            height,
            block_type,
            face_ids,
        }
    }

    pub fn face_id(&self, face: VoxelFace) -> FaceId {
        self.face_ids[face.index()]
    }

    #[cfg(test)]
    pub fn face_ids(&self) -> &[FaceId; 6] {
        &self.face_ids
    }

    /// Returns which of this voxel's faces carries `id`, if any.
    ///
    /// Faces are checked in `VoxelFace::all()` order.
    pub fn face_with_id(&self, id: FaceId) -> Option<VoxelFace> {
        VoxelFace::all()
            .into_iter()
            .find(|face| self.face_id(*face) == id)
    }

    /// World-space position of the voxel's minimum corner.
    pub fn origin(&self) -> [f32; 3] {
        [self.x as f32, self.height as f32, self.z as f32]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_starts_at_one() {
        let mut ids = FaceIdGenerator::new();
        assert_eq!(ids.last(), 0);
        assert_eq!(ids.next_id(), 1);
        assert_eq!(ids.next_id(), 2);
        assert_eq!(ids.last(), 2);
    }

    #[test]
    fn voxel_faces_are_distinct_and_found() {
        let mut ids = FaceIdGenerator::new();
        let voxel = Voxel::new(2, 3, 0, BlockType::IRON, &mut ids);
        assert_eq!(voxel.face_ids(), &[1, 2, 3, 4, 5, 6]);
        assert_eq!(voxel.face_with_id(3), Some(VoxelFace::TOP));
        assert_eq!(voxel.face_with_id(0), None);
        assert_eq!(voxel.face_with_id(7), None);
        assert_eq!(voxel.origin(), [2.0, 0.0, 3.0]);
    }
}
