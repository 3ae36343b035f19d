//! # Voxel Face Module
//!
//! This module defines the six faces of a voxel cube, their geometry on the unit
//! cube and the grid offset used when a new voxel is built against them.

/// Represents the six faces of a voxel cube.
///
/// Each variant is assigned an integer value that doubles as its index into a
/// voxel's face id array and as the face's slot in the cube vertex layout.
///
/// The order is: [FRONT, BACK, TOP, BOTTOM, RIGHT, LEFT]
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum VoxelFace {
    /// The front face (facing positive Z)
    FRONT = 0,

    /// The back face (facing negative Z)
    BACK = 1,

    /// The top face (facing positive Y)
    TOP = 2,

    /// The bottom face (facing negative Y)
    BOTTOM = 3,

    /// The right face (facing positive X)
    RIGHT = 4,

    /// The left face (facing negative X)
    LEFT = 5,
}

impl VoxelFace {
    /// Returns all six faces in layout order.
    ///
    /// Face resolution scans faces in this order, so it is also the tie-break
    /// order when several faces would match.
    pub fn all() -> [VoxelFace; 6] {
        [
            VoxelFace::FRONT,
            VoxelFace::BACK,
            VoxelFace::TOP,
            VoxelFace::BOTTOM,
            VoxelFace::RIGHT,
            VoxelFace::LEFT,
        ]
    }

    /// Index of this face in face id arrays and in the cube vertex layout.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Grid offset `(dx, dheight, dz)` of the cell that a voxel built against
    /// this face occupies, relative to the picked voxel.
    pub fn build_offset(self) -> (i64, i32, i64) {
        match self {
            VoxelFace::FRONT => (0, 0, 1),
            VoxelFace::BACK => (0, 0, -1),
            VoxelFace::TOP => (0, 1, 0),
            VoxelFace::BOTTOM => (0, -1, 0),
            VoxelFace::RIGHT => (1, 0, 0),
            VoxelFace::LEFT => (-1, 0, 0),
        }
    }

    /// Outward unit normal of the face.
    pub fn normal(self) -> [f32; 3] {
        match self {
            VoxelFace::FRONT => [0.0, 0.0, 1.0],
            VoxelFace::BACK => [0.0, 0.0, -1.0],
            VoxelFace::TOP => [0.0, 1.0, 0.0],
            VoxelFace::BOTTOM => [0.0, -1.0, 0.0],
            VoxelFace::RIGHT => [1.0, 0.0, 0.0],
            VoxelFace::LEFT => [-1.0, 0.0, 0.0],
        }
    }

    /// The four corners of this face on the unit cube `[0, 1]³`.
    ///
    /// Corners are wound counter-clockwise when seen from outside the cube, so the
    /// triangles `(0, 1, 2)` and `(0, 2, 3)` survive back-face culling.
    #[rustfmt::skip]
    pub fn corners(self) -> [[f32; 3]; 4] {
        match self {
            VoxelFace::FRONT  => [[0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [1.0, 1.0, 1.0], [0.0, 1.0, 1.0]],
            VoxelFace::BACK   => [[0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0], [1.0, 0.0, 0.0]],
            VoxelFace::TOP    => [[0.0, 1.0, 0.0], [0.0, 1.0, 1.0], [1.0, 1.0, 1.0], [1.0, 1.0, 0.0]],
            VoxelFace::BOTTOM => [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0, 1.0], [0.0, 0.0, 1.0]],
            VoxelFace::RIGHT  => [[1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [1.0, 1.0, 1.0], [1.0, 0.0, 1.0]],
            VoxelFace::LEFT   => [[0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 1.0], [0.0, 1.0, 0.0]],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
        [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
    }

    fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
        [
            a[1] * b[2] - a[2] * b[1],
            a[2] * b[0] - a[0] * b[2],
            a[0] * b[1] - a[1] * b[0],
        ]
    }

    #[test]
    fn indices_match_layout_order() {
        for (i, face) in VoxelFace::all().into_iter().enumerate() {
            assert_eq!(face.index(), i);
        }
    }

    #[test]
    fn corners_wind_towards_the_normal() {
        for face in VoxelFace::all() {
            let [c0, c1, c2, _] = face.corners();
            let winding = cross(sub(c1, c0), sub(c2, c0));
            assert_eq!(winding, face.normal(), "{face:?}");
        }
    }

    #[test]
    fn build_offsets_follow_normals() {
        for face in VoxelFace::all() {
            let (dx, dy, dz) = face.build_offset();
            let normal = face.normal();
            assert_eq!([dx as f32, dy as f32, dz as f32], normal, "{face:?}");
        }
    }
}
