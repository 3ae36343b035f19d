//! # Voxel World
//!
//! This module holds everything that describes the editable surface, independent
//! of how it is drawn.
//!
//! ## Architecture
//!
//! * **Voxel**: A unit cube with a block type and six globally unique face ids
//! * **Stack**: The voxels of one grid cell, in insertion order
//! * **Surface**: The fixed square grid of stacks, face resolution and edits
//! * **Terrain**: Mountains and ridges raised on the flat starting surface
//!
//! ## Data Flow
//!
//! 1. The surface is created flat and randomized once at startup
//! 2. A pick yields a face id which the surface resolves to a voxel face
//! 3. The edit adds a voxel next to that face or removes its owner
//! 4. The renderer rebuilds the shaded geometry from the surface

pub mod stack;
pub mod surface;
pub mod terrain;
pub mod voxel;
