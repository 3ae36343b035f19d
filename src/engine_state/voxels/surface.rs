//! # Surface Grid
//!
//! A fixed square of voxel stacks together with the face id counter. Face
//! resolution and the build/break edits operate here.

use log::debug;

use super::{
    stack::VoxelStack,
    voxel::{block_type::BlockType, voxel_face::VoxelFace, FaceId, FaceIdGenerator, Voxel},
};

/// Identifies the face struck by a pick.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PickResult {
    pub x: usize,
    pub z: usize,
    pub height: i32,
    pub face: VoxelFace,
    pub face_id: FaceId,
}

/// The edit a click requests.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EditAction {
    /// Remove the picked voxel.
    Break,

    /// Add a voxel next to the picked face.
    Build,
}

/// What happened when an edit was applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EditOutcome {
    /// The id did not belong to any face.
    Missed,

    /// A voxel was added at `(x, z, height)`.
    Built { x: usize, z: usize, height: i32 },

    /// The picked voxel was removed.
    Removed(Voxel),

    /// The face was found but the build target is outside the grid or taken.
    Rejected,
}

impl EditOutcome {
    /// Whether the grid changed.
    pub fn mutated(&self) -> bool {
        matches!(self, EditOutcome::Built { .. } | EditOutcome::Removed(_))
    }
}

/// A `size × size` grid of voxel stacks, stored row-major with `x` outer.
#[derive(Debug)]
pub struct SurfaceGrid {
    size: usize,
    stacks: Vec<VoxelStack>,
    ids: FaceIdGenerator,
}

impl SurfaceGrid {
    /// Creates the grid with one GRASS voxel at height 0 in every stack.
    ///
    /// # Arguments
    /// * `size` - Number of cells along each axis
    pub fn new(size: usize) -> Self {
        let mut grid = SurfaceGrid {
            size,
            stacks: vec![VoxelStack::new(); size * size],
            ids: FaceIdGenerator::new(),
        };
        for x in 0..size {
            for z in 0..size {
                grid.push_on_top(x, z, BlockType::GRASS);
            }
        }
        grid
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Converts signed coordinates into a cell, if inside the grid.
    pub fn cell(&self, x: i64, z: i64) -> Option<(usize, usize)> {
        let size = self.size as i64;
        if (0..size).contains(&x) && (0..size).contains(&z) {
            Some((x as usize, z as usize))
        } else {
            None
        }
    }

    pub fn stack(&self, x: usize, z: usize) -> Option<&VoxelStack> {
        self.index(x, z).map(|i| &self.stacks[i])
    }

    /// Iterates stacks in row-major order along with their cell.
    pub fn stacks(&self) -> impl Iterator<Item = (usize, usize, &VoxelStack)> {
        let size = self.size;
        self.stacks
            .iter()
            .enumerate()
            .map(move |(i, stack)| (i / size, i % size, stack))
    }

    /// Total number of voxels on the surface.
    pub fn voxel_count(&self) -> usize {
        self.stacks.iter().map(VoxelStack::len).sum()
    }

    /// The last face id handed out.
    #[cfg(test)]
    pub fn last_face_id(&self) -> FaceId {
        self.ids.last()
    }

    pub fn max_height(&self, x: usize, z: usize) -> Option<i32> {
        self.stack(x, z).and_then(VoxelStack::max_height)
    }

    /// Places a voxel directly above the current top of a stack, or at height 0
    /// when the stack is empty.
    ///
    /// # Returns
    /// The new voxel's height, or `None` if the cell is outside the grid.
    pub fn push_on_top(&mut self, x: usize, z: usize, block_type: BlockType) -> Option<i32> {
        let height = self.max_height(x, z).map_or(0, |top| top + 1);
        self.place_voxel(x, z, height, block_type).then_some(height)
    }

    /// Places a voxel at an exact height.
    ///
    /// # Returns
    /// `false` when the cell is outside the grid or the height is occupied.
    pub fn place_voxel(&mut self, x: usize, z: usize, height: i32, block_type: BlockType) -> bool {
        let Some(index) = self.index(x, z) else {
            return false;
        };
        if self.stacks[index].contains_height(height) {
            return false;
        }
        let voxel = Voxel::new(x, z, height, block_type, &mut self.ids);
        self.stacks[index].push(voxel);
        true
    }

    /// Finds the voxel face carrying `face_id`.
    ///
    /// Stacks are scanned with `x` outer and `z` inner, voxels in insertion
    /// order, faces in `VoxelFace::all()` order. The first match wins.
    pub fn resolve_face(&self, face_id: FaceId) -> Option<PickResult> {
        if face_id == 0 {
            return None;
        }
        self.stacks().find_map(|(x, z, stack)| {
            stack.voxels().iter().find_map(|voxel| {
                voxel.face_with_id(face_id).map(|face| PickResult {
                    x,
                    z,
                    height: voxel.height,
                    face,
                    face_id,
                })
            })
        })
    }

    /// Builds a voxel against the picked face.
    ///
    /// # Returns
    /// The new voxel's cell and height, or `None` if the target lies outside the
    /// grid or already holds a voxel.
    pub fn build(&mut self, pick: &PickResult, block_type: BlockType) -> Option<(usize, usize, i32)> {
        let (dx, dh, dz) = pick.face.build_offset();
        let (x, z) = self.cell(pick.x as i64 + dx, pick.z as i64 + dz)?;
        let height = pick.height + dh;
        self.place_voxel(x, z, height, block_type)
            .then_some((x, z, height))
    }

    /// Removes the voxel that owns the picked face. Voxels above it stay where
    /// they are.
    pub fn remove(&mut self, pick: &PickResult) -> Option<Voxel> {
        let index = self.index(pick.x, pick.z)?;
        self.stacks[index].remove_by_face(pick.face_id)
    }

    /// Resolves `face_id` and applies `action` to the grid.
    pub fn apply_edit(
        &mut self,
        action: EditAction,
        face_id: FaceId,
        block_type: BlockType,
    ) -> EditOutcome {
        let Some(pick) = self.resolve_face(face_id) else {
            debug!("No face with id {face_id}");
            return EditOutcome::Missed;
        };
        debug!("Picked {:?}", pick);

        match action {
            EditAction::Break => match self.remove(&pick) {
                Some(voxel) => EditOutcome::Removed(voxel),
                None => EditOutcome::Missed,
            },
            EditAction::Build => match self.build(&pick, block_type) {
                Some((x, z, height)) => EditOutcome::Built { x, z, height },
                None => {
                    debug!("Build target next to {:?} is out of grid or occupied", pick.face);
                    EditOutcome::Rejected
                }
            },
        }
    }

    fn index(&self, x: usize, z: usize) -> Option<usize> {
        (x < self.size && z < self.size).then(|| x * self.size + z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn top_face_of(grid: &SurfaceGrid, x: usize, z: usize) -> FaceId {
        let stack = grid.stack(x, z).unwrap();
        let voxel = stack
            .voxels()
            .iter()
            .find(|voxel| stack.is_surface(voxel))
            .unwrap();
        voxel.face_id(VoxelFace::TOP)
    }

    fn face_of(grid: &SurfaceGrid, x: usize, z: usize, face: VoxelFace) -> FaceId {
        grid.stack(x, z).unwrap().voxels()[0].face_id(face)
    }

    #[test]
    fn fresh_grid_has_one_voxel_per_stack() {
        let grid = SurfaceGrid::new(5);
        assert_eq!(grid.voxel_count(), 25);
        for (_, _, stack) in grid.stacks() {
            assert_eq!(stack.len(), 1);
            assert_eq!(stack.voxels()[0].height, 0);
            assert_eq!(stack.voxels()[0].block_type, BlockType::GRASS);
        }
        assert_eq!(grid.last_face_id(), 25 * 6);
    }

    #[test]
    fn stacks_are_row_major() {
        let grid = SurfaceGrid::new(3);
        let cells: Vec<_> = grid.stacks().map(|(x, z, _)| (x, z)).take(4).collect();
        assert_eq!(cells, vec![(0, 0), (0, 1), (0, 2), (1, 0)]);
        for (x, z, stack) in grid.stacks() {
            assert_eq!((stack.voxels()[0].x, stack.voxels()[0].z), (x, z));
        }
    }

    #[test]
    fn resolve_finds_the_right_face() {
        let grid = SurfaceGrid::new(4);
        let id = face_of(&grid, 2, 1, VoxelFace::RIGHT);
        let pick = grid.resolve_face(id).unwrap();
        assert_eq!((pick.x, pick.z, pick.height), (2, 1, 0));
        assert_eq!(pick.face, VoxelFace::RIGHT);
        assert_eq!(pick.face_id, id);
    }

    #[test]
    fn top_build_stacks_up() {
        let mut grid = SurfaceGrid::new(4);
        let id = top_face_of(&grid, 1, 1);
        let outcome = grid.apply_edit(EditAction::Build, id, BlockType::IRON);
        assert_eq!(outcome, EditOutcome::Built { x: 1, z: 1, height: 1 });
        assert_eq!(grid.max_height(1, 1), Some(1));
        assert_eq!(grid.stack(1, 1).unwrap().voxels()[1].block_type, BlockType::IRON);
    }

    #[test]
    fn side_builds_land_in_neighbours() {
        let mut grid = SurfaceGrid::new(4);

        let top = top_face_of(&grid, 2, 2);
        grid.apply_edit(EditAction::Build, top, BlockType::EARTH);
        let raised = grid.stack(2, 2).unwrap().voxels()[1].clone();

        let cases = [
            (VoxelFace::LEFT, (1, 2)),
            (VoxelFace::RIGHT, (3, 2)),
            (VoxelFace::BACK, (2, 1)),
            (VoxelFace::FRONT, (2, 3)),
        ];
        for (face, (x, z)) in cases {
            let outcome = grid.apply_edit(EditAction::Build, raised.face_id(face), BlockType::EARTH);
            assert_eq!(outcome, EditOutcome::Built { x, z, height: 1 }, "{face:?}");
        }
    }

    #[test]
    fn bottom_build_fills_a_gap() {
        let mut grid = SurfaceGrid::new(2);
        assert!(grid.place_voxel(0, 0, 3, BlockType::EARTH));
        let floating = grid.stack(0, 0).unwrap().voxels()[1].face_id(VoxelFace::BOTTOM);
        let outcome = grid.apply_edit(EditAction::Build, floating, BlockType::EARTH);
        assert_eq!(outcome, EditOutcome::Built { x: 0, z: 0, height: 2 });
    }

    #[test]
    fn build_outside_or_occupied_is_rejected() {
        let mut grid = SurfaceGrid::new(3);
        let before = grid.voxel_count();

        let edge = face_of(&grid, 0, 0, VoxelFace::LEFT);
        assert_eq!(
            grid.apply_edit(EditAction::Build, edge, BlockType::EARTH),
            EditOutcome::Rejected
        );
        let far = face_of(&grid, 2, 2, VoxelFace::FRONT);
        assert_eq!(
            grid.apply_edit(EditAction::Build, far, BlockType::EARTH),
            EditOutcome::Rejected
        );
        let taken = face_of(&grid, 1, 1, VoxelFace::RIGHT);
        assert_eq!(
            grid.apply_edit(EditAction::Build, taken, BlockType::EARTH),
            EditOutcome::Rejected
        );
        assert_eq!(grid.voxel_count(), before);
    }

    #[test]
    fn break_removes_exactly_the_owner() {
        let mut grid = SurfaceGrid::new(3);
        let top = top_face_of(&grid, 1, 0);
        grid.apply_edit(EditAction::Build, top, BlockType::IRON);
        let top = top_face_of(&grid, 1, 0);
        grid.apply_edit(EditAction::Build, top, BlockType::EARTH);
        assert_eq!(grid.stack(1, 0).unwrap().len(), 3);

        let middle = grid.stack(1, 0).unwrap().voxels()[1].clone();
        let outcome = grid.apply_edit(EditAction::Break, middle.face_id(VoxelFace::BACK), BlockType::GRASS);
        assert_eq!(outcome, EditOutcome::Removed(middle));

        let heights: Vec<_> = grid.stack(1, 0).unwrap().voxels().iter().map(|v| v.height).collect();
        assert_eq!(heights, vec![0, 2]);
        assert_eq!(grid.max_height(1, 0), Some(2));
    }

    #[test]
    fn miss_leaves_grid_untouched() {
        let mut grid = SurfaceGrid::new(3);
        let last = grid.last_face_id();
        for id in [0, last + 1, last + 100] {
            assert_eq!(grid.resolve_face(id), None);
            assert_eq!(
                grid.apply_edit(EditAction::Break, id, BlockType::GRASS),
                EditOutcome::Missed
            );
            assert!(!EditOutcome::Missed.mutated());
        }
        assert_eq!(grid.voxel_count(), 9);
        assert_eq!(grid.last_face_id(), last);
    }

    #[test]
    fn removing_the_last_voxel_empties_the_stack() {
        let mut grid = SurfaceGrid::new(2);
        let id = face_of(&grid, 1, 1, VoxelFace::TOP);
        assert!(grid.apply_edit(EditAction::Break, id, BlockType::GRASS).mutated());
        assert_eq!(grid.max_height(1, 1), None);
        assert!(!grid.place_voxel(2, 0, 0, BlockType::GRASS));
        assert_eq!(grid.push_on_top(1, 1, BlockType::EARTH), Some(0));
    }
}
