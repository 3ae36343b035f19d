//! # Frame Geometry
//!
//! Anything that can be drawn appends its geometry to a `FrameBuilder` made for
//! one pass. The shaded pass gets textured, lit vertices. The pick pass gets the
//! same cubes in flat colors that encode each face id.
//!
//! Each voxel is one draw call: 24 vertices appended to the frame's vertex
//! buffer, drawn with the shared 36-index cube index buffer starting at the
//! voxel's first vertex.

use crate::engine_state::{
    picking::ColorIdCodec,
    voxels::{
        surface::SurfaceGrid,
        voxel::{block_type::tile_uv, voxel_face::VoxelFace, Voxel},
    },
};

use super::vertex::{PickVertex, Vertex};

pub const VERTICES_PER_CUBE: u32 = 24;
pub const INDICES_PER_CUBE: u32 = 36;

/// Index list of one cube, two triangles per face in `VoxelFace::all()` order.
pub const CUBE_INDICES: [u16; INDICES_PER_CUBE as usize] = cube_indices();

const fn cube_indices() -> [u16; INDICES_PER_CUBE as usize] {
    let mut indices = [0u16; INDICES_PER_CUBE as usize];
    let mut face = 0;
    while face < 6 {
        let first = (face * 4) as u16;
        let at = face * 6;
        indices[at] = first;
        indices[at + 1] = first + 1;
        indices[at + 2] = first + 2;
        indices[at + 3] = first;
        indices[at + 4] = first + 2;
        indices[at + 5] = first + 3;
        face += 1;
    }
    indices
}

/// Unit UV of each face corner, matching the corner order of `VoxelFace::corners`.
/// `v` grows downwards in texture space.
fn corner_uvs(face: VoxelFace) -> [[f32; 2]; 4] {
    match face {
        VoxelFace::FRONT | VoxelFace::LEFT => [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]],
        VoxelFace::BACK | VoxelFace::RIGHT => [[1.0, 1.0], [1.0, 0.0], [0.0, 0.0], [0.0, 1.0]],
        VoxelFace::TOP => [[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0]],
        VoxelFace::BOTTOM => [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
    }
}

/// Which pass a frame is built for.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PassKind {
    Shaded,
    Pick,
}

/// One per-voxel draw.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DrawCall {
    /// Index of the voxel's first vertex in the frame's vertex buffer.
    pub first_vertex: u32,
}

/// The vertices of a frame, typed by pass.
#[derive(Clone, Debug)]
pub enum FrameGeometry {
    Shaded(Vec<Vertex>),
    Pick(Vec<PickVertex>),
}

impl FrameGeometry {
    pub fn len(&self) -> usize {
        match self {
            FrameGeometry::Shaded(vertices) => vertices.len(),
            FrameGeometry::Pick(vertices) => vertices.len(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            FrameGeometry::Shaded(vertices) => bytemuck::cast_slice(vertices),
            FrameGeometry::Pick(vertices) => bytemuck::cast_slice(vertices),
        }
    }

    /// Size of one vertex in bytes.
    pub fn stride(&self) -> u64 {
        match self {
            FrameGeometry::Shaded(_) => std::mem::size_of::<Vertex>() as u64,
            FrameGeometry::Pick(_) => std::mem::size_of::<PickVertex>() as u64,
        }
    }
}

/// Collects the geometry and draw calls of one pass.
pub struct FrameBuilder {
    codec: ColorIdCodec,
    geometry: FrameGeometry,
    draws: Vec<DrawCall>,
}

impl FrameBuilder {
    /// Starts an empty frame for `pass`. `codec` turns face ids into pick colors
    /// and is unused by the shaded pass.
    pub fn new(pass: PassKind, codec: ColorIdCodec) -> Self {
        let geometry = match pass {
            PassKind::Shaded => FrameGeometry::Shaded(Vec::new()),
            PassKind::Pick => FrameGeometry::Pick(Vec::new()),
        };
        Self {
            codec,
            geometry,
            draws: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn pass(&self) -> PassKind {
        match self.geometry {
            FrameGeometry::Shaded(_) => PassKind::Shaded,
            FrameGeometry::Pick(_) => PassKind::Pick,
        }
    }

    #[cfg(test)]
    pub fn draws(&self) -> &[DrawCall] {
        &self.draws
    }

    #[cfg(test)]
    pub fn geometry(&self) -> &FrameGeometry {
        &self.geometry
    }

    /// Appends one cube and records its draw call.
    ///
    /// # Arguments
    /// * `voxel` - The voxel to draw
    /// * `is_surface` - Whether it is the top voxel of its stack, which selects
    ///   the grass-covered atlas variant
    ///
    /// # Returns
    /// An error in the pick pass if a face id cannot be encoded.
    pub fn push_cube(&mut self, voxel: &Voxel, is_surface: bool) -> anyhow::Result<()> {
        let first_vertex = self.geometry.len() as u32;
        let [ox, oy, oz] = voxel.origin();

        match &mut self.geometry {
            FrameGeometry::Shaded(vertices) => {
                for face in VoxelFace::all() {
                    let tile = voxel.block_type.atlas_tile(face, is_surface);
                    let normal = face.normal();
                    for (corner, uv) in face.corners().into_iter().zip(corner_uvs(face)) {
                        vertices.push(Vertex {
                            position: [ox + corner[0], oy + corner[1], oz + corner[2]],
                            normal,
                            tex_coords: tile_uv(tile, uv),
                        });
                    }
                }
            }
            FrameGeometry::Pick(vertices) => {
                for face in VoxelFace::all() {
                    let color = self.codec.encode(voxel.face_id(face))?;
                    for corner in face.corners() {
                        vertices.push(PickVertex {
                            position: [ox + corner[0], oy + corner[1], oz + corner[2]],
                            color,
                        });
                    }
                }
            }
        }

        self.draws.push(DrawCall { first_vertex });
        Ok(())
    }

    pub fn finish(self) -> (FrameGeometry, Vec<DrawCall>) {
        (self.geometry, self.draws)
    }
}

/// Something that can append its geometry to a frame.
pub trait Drawable {
    fn compute_buffers(&self, frame: &mut FrameBuilder) -> anyhow::Result<()>;
}

/// A single voxel together with whether it tops its stack.
pub struct VoxelInstance<'a> {
    pub voxel: &'a Voxel,
    pub is_surface: bool,
}

impl Drawable for VoxelInstance<'_> {
    fn compute_buffers(&self, frame: &mut FrameBuilder) -> anyhow::Result<()> {
        frame.push_cube(self.voxel, self.is_surface)
    }
}

impl Drawable for SurfaceGrid {
    fn compute_buffers(&self, frame: &mut FrameBuilder) -> anyhow::Result<()> {
        for (_, _, stack) in self.stacks() {
            for voxel in stack.voxels() {
                VoxelInstance {
                    voxel,
                    is_surface: stack.is_surface(voxel),
                }
                .compute_buffers(frame)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::{
        picking::ChannelBits,
        voxels::{
            surface::EditAction,
            voxel::block_type::{tile, BlockType, ATLAS_TILES},
        },
    };

    fn codec() -> ColorIdCodec {
        ColorIdCodec::new(ChannelBits::RGBA8).unwrap()
    }

    fn build(grid: &SurfaceGrid, pass: PassKind) -> FrameBuilder {
        let mut frame = FrameBuilder::new(pass, codec());
        grid.compute_buffers(&mut frame).unwrap();
        frame
    }

    fn tile_of(quad: &[Vertex]) -> u32 {
        let u = quad.iter().map(|vertex| vertex.tex_coords[0]).sum::<f32>() / quad.len() as f32;
        (u * ATLAS_TILES as f32).floor() as u32
    }

    #[test]
    fn cube_indices_cover_all_faces() {
        assert_eq!(&CUBE_INDICES[..6], &[0, 1, 2, 0, 2, 3]);
        assert_eq!(&CUBE_INDICES[30..], &[20, 21, 22, 20, 22, 23]);
        assert!(CUBE_INDICES.iter().all(|&i| (i as u32) < VERTICES_PER_CUBE));
    }

    #[test]
    fn one_draw_call_per_voxel() {
        let mut grid = SurfaceGrid::new(3);
        grid.place_voxel(1, 1, 1, BlockType::IRON);

        for pass in [PassKind::Shaded, PassKind::Pick] {
            let frame = build(&grid, pass);
            assert_eq!(frame.pass(), pass);
            assert_eq!(frame.draws().len(), 10);
            assert_eq!(frame.geometry().len(), 10 * VERTICES_PER_CUBE as usize);
            for (i, draw) in frame.draws().iter().enumerate() {
                assert_eq!(draw.first_vertex, i as u32 * VERTICES_PER_CUBE);
            }
        }
    }

    #[test]
    fn grass_cover_only_on_the_surface_voxel() {
        let mut grid = SurfaceGrid::new(1);
        grid.push_on_top(0, 0, BlockType::GRASS);

        let frame = build(&grid, PassKind::Shaded);
        let FrameGeometry::Shaded(vertices) = frame.geometry() else {
            panic!("expected shaded geometry");
        };

        let face_vertices = |cube: usize, face: VoxelFace| {
            let start = cube * VERTICES_PER_CUBE as usize + face.index() * 4;
            &vertices[start..start + 4]
        };

        // the lower voxel is covered and plain earth everywhere
        for face in VoxelFace::all() {
            assert_eq!(tile_of(face_vertices(0, face)), tile::EARTH, "{face:?}");
        }
        assert_eq!(tile_of(face_vertices(1, VoxelFace::TOP)), tile::GRASS);
        assert_eq!(tile_of(face_vertices(1, VoxelFace::FRONT)), tile::EARTH_GRASS_SIDE);
        assert_eq!(tile_of(face_vertices(1, VoxelFace::BOTTOM)), tile::EARTH);
    }

    #[test]
    fn shaded_vertices_sit_on_the_voxel() {
        let mut grid = SurfaceGrid::new(3);
        let frame = build(&grid, PassKind::Shaded);
        let FrameGeometry::Shaded(vertices) = frame.geometry() else {
            panic!("expected shaded geometry");
        };
        // the voxel at (1, 2) is the sixth stack in row-major order
        let cube = &vertices[5 * VERTICES_PER_CUBE as usize..6 * VERTICES_PER_CUBE as usize];
        for vertex in cube {
            assert!((1.0..=2.0).contains(&vertex.position[0]));
            assert!((0.0..=1.0).contains(&vertex.position[1]));
            assert!((2.0..=3.0).contains(&vertex.position[2]));
        }

        // the next frame no longer has the broken cube
        let id = grid.stack(1, 2).unwrap().voxels()[0].face_id(VoxelFace::TOP);
        grid.apply_edit(EditAction::Break, id, BlockType::GRASS);
        assert_eq!(build(&grid, PassKind::Shaded).draws().len(), 8);
    }

    #[test]
    fn pick_colors_decode_to_face_ids() {
        let grid = SurfaceGrid::new(2);
        let codec = codec();
        let frame = build(&grid, PassKind::Pick);
        let FrameGeometry::Pick(vertices) = frame.geometry() else {
            panic!("expected pick geometry");
        };

        let mut expected = Vec::new();
        for (_, _, stack) in grid.stacks() {
            for voxel in stack.voxels() {
                expected.extend(voxel.face_ids().iter().copied());
            }
        }

        for (face_index, quad) in vertices.chunks(4).enumerate() {
            assert!(quad.iter().all(|vertex| vertex.color == quad[0].color));
            let bytes = quad[0].color.map(|c| (c * 255.0).round() as u8);
            assert_eq!(codec.decode_rgba8(bytes), expected[face_index]);
        }
    }

    #[test]
    fn pick_frame_fails_when_ids_overflow() {
        let grid = SurfaceGrid::new(2);
        let tiny = ColorIdCodec::new(ChannelBits {
            red: 0,
            green: 0,
            blue: 2,
            alpha: 2,
        })
        .unwrap();
        let mut frame = FrameBuilder::new(PassKind::Pick, tiny);
        assert!(grid.compute_buffers(&mut frame).is_err());
    }
}
