//! # Block Type Module
//!
//! This module defines the block types a player can place and maps each of them
//! to tiles of the texture atlas.

use num_derive::FromPrimitive;

use super::voxel_face::VoxelFace;

/// Number of tiles laid out horizontally in the texture atlas.
pub const ATLAS_TILES: u32 = 4;

/// Atlas tile indices, left to right.
pub mod tile {
    pub const EARTH: u32 = 0;
    pub const EARTH_GRASS_SIDE: u32 = 1;
    pub const GRASS: u32 = 2;
    pub const DARK: u32 = 3;
}

/// Enumerates the block types a voxel can have.
///
/// The `FromPrimitive` derive lets the number-key selection map a digit straight
/// onto a variant.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, FromPrimitive)]
pub enum BlockType {
    /// Plain earth on every face.
    EARTH = 1,

    /// Dark iron on every face.
    IRON = 2,

    /// Earth with a grass cover when it is the top voxel of its stack.
    #[default]
    GRASS = 3,
}

impl BlockType {
    /// Converts a selection digit (1, 2 or 3) to a block type.
    ///
    /// # Returns
    /// `None` if the digit does not name a block type.
    pub fn from_digit(digit: u8) -> Option<Self> {
        num::FromPrimitive::from_u8(digit)
    }

    /// Returns the atlas tile used for one face of a voxel of this type.
    ///
    /// # Arguments
    /// * `face` - The face being textured
    /// * `is_surface` - Whether the voxel is the highest one of its stack
    pub fn atlas_tile(self, face: VoxelFace, is_surface: bool) -> u32 {
        match (self, is_surface) {
            (BlockType::IRON, _) => tile::DARK,
            (BlockType::EARTH, _) | (BlockType::GRASS, false) => tile::EARTH,
            (BlockType::GRASS, true) => match face {
                VoxelFace::TOP => tile::GRASS,
                VoxelFace::BOTTOM => tile::EARTH,
                _ => tile::EARTH_GRASS_SIDE,
            },
        }
    }
}

/// Maps a corner's unit UV on a face onto the given atlas tile.
pub fn tile_uv(tile: u32, unit: [f32; 2]) -> [f32; 2] {
    let width = 1.0 / ATLAS_TILES as f32;
    [(tile as f32 + unit[0]) * width, unit[1]]
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn digits_select_block_types() {
        assert_eq!(BlockType::from_digit(1), Some(BlockType::EARTH));
        assert_eq!(BlockType::from_digit(2), Some(BlockType::IRON));
        assert_eq!(BlockType::from_digit(3), Some(BlockType::GRASS));
        assert_eq!(BlockType::from_digit(0), None);
        assert_eq!(BlockType::from_digit(4), None);
    }

    #[test]
    fn grass_cover_only_on_surface() {
        for face in VoxelFace::all() {
            assert_eq!(BlockType::GRASS.atlas_tile(face, false), tile::EARTH);
        }
        assert_eq!(BlockType::GRASS.atlas_tile(VoxelFace::TOP, true), tile::GRASS);
        assert_eq!(BlockType::GRASS.atlas_tile(VoxelFace::BOTTOM, true), tile::EARTH);
        assert_eq!(
            BlockType::GRASS.atlas_tile(VoxelFace::LEFT, true),
            tile::EARTH_GRASS_SIDE
        );
        assert_eq!(BlockType::IRON.atlas_tile(VoxelFace::TOP, true), tile::DARK);
        assert_eq!(BlockType::EARTH.atlas_tile(VoxelFace::TOP, true), tile::EARTH);
    }

    #[test]
    fn tile_uv_stays_inside_tile() {
        let [u0, v0] = tile_uv(tile::GRASS, [0.0, 0.0]);
        let [u1, v1] = tile_uv(tile::GRASS, [1.0, 1.0]);
        assert_approx_eq!(u0, 0.5);
        assert_approx_eq!(u1, 0.75);
        assert_approx_eq!(v0, 0.0);
        assert_approx_eq!(v1, 1.0);
    }
}
