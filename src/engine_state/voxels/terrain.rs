//! # Terrain Randomization
//!
//! Raises mountains and ridges on top of the flat starting surface.

use log::{debug, info};

use crate::config::TerrainConfig;

use super::{surface::SurfaceGrid, voxel::block_type::BlockType};

/// Counts of what a randomization pass actually did.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TerrainSummary {
    pub mountains_placed: usize,
    pub mountains_aborted: usize,
    pub ridge_voxels: usize,
    pub voxels_added: usize,
}

impl SurfaceGrid {
    /// Applies the configured number of mountains and ridges.
    ///
    /// # Arguments
    /// * `rng` - Random source, seeded by the caller when reproducibility matters
    /// * `terrain` - Counts and sizes of the features to generate
    pub fn randomize(&mut self, rng: &mut fastrand::Rng, terrain: &TerrainConfig) -> TerrainSummary {
        let mut summary = TerrainSummary::default();
        let before = self.voxel_count();

        for _ in 0..terrain.mountains {
            let cx = rng.usize(0..self.size());
            let cz = rng.usize(0..self.size());
            let radius = rng.usize(1..=terrain.max_mountain_radius.max(1));
            if self.place_mountain(cx, cz, radius) {
                summary.mountains_placed += 1;
            } else {
                summary.mountains_aborted += 1;
            }
        }

        for _ in 0..terrain.ridges {
            let start = (rng.usize(0..self.size()), rng.usize(0..self.size()));
            summary.ridge_voxels += self.walk_ridge(rng, start, terrain.ridge_steps);
        }

        summary.voxels_added = self.voxel_count() - before;
        info!(
            "Terrain: {} mountains ({} aborted), {} ridge voxels, {} voxels total",
            summary.mountains_placed,
            summary.mountains_aborted,
            summary.ridge_voxels,
            self.voxel_count()
        );
        summary
    }

    /// Raises a stepped mountain centred on `(cx, cz)`.
    ///
    /// Layers of radius `radius, radius - 1, .., 1` each add one voxel on top of
    /// every cell inside the layer's circle. Cells past the far edge of the grid
    /// are skipped.
    ///
    /// # Returns
    /// `false` without touching the grid when the mountain would reach below
    /// coordinate zero on either axis.
    pub fn place_mountain(&mut self, cx: usize, cz: usize, radius: usize) -> bool {
        if cx < radius || cz < radius {
            debug!("Mountain at ({cx}, {cz}) r={radius} crosses the lower edge, skipped");
            return false;
        }

        let r = radius as i64;
        for layer in (1..=r).rev() {
            for dx in -layer..=layer {
                for dz in -layer..=layer {
                    if dx * dx + dz * dz > layer * layer {
                        continue;
                    }
                    if let Some((x, z)) = self.cell(cx as i64 + dx, cz as i64 + dz) {
                        self.push_on_top(x, z, BlockType::GRASS);
                    }
                }
            }
        }
        true
    }

    /// Random-walks from `start`, pushing one voxel onto every visited cell that
    /// is inside the grid.
    ///
    /// # Returns
    /// The number of voxels added.
    pub fn walk_ridge(&mut self, rng: &mut fastrand::Rng, start: (usize, usize), steps: usize) -> usize {
        let (mut x, mut z) = (start.0 as i64, start.1 as i64);
        let mut added = 0;
        for _ in 0..steps {
            x += rng.i64(-1..=1);
            z += rng.i64(-1..=1);
            if let Some((cx, cz)) = self.cell(x, z) {
                if self.push_on_top(cx, cz, BlockType::GRASS).is_some() {
                    added += 1;
                }
            }
        }
        added
    }
}
