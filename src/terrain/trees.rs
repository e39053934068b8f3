//! Tree pre-pass: plants trunks and canopies per column region.
//!
//! Trees are not chunk-local. A region's trees are computed in world space
//! and collected into a [`TreeOverlay`]; every chunk then stamps the part of
//! the overlay that falls inside its own bounds. A canopy that straddles a
//! chunk border therefore lands in both chunks.

use std::collections::HashMap;

use glam::IVec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::biome::Biome;
use super::surface_height;
use crate::voxel::block::Block;

/// Tree placement parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeParams {
    pub min_trunk_height: i32,
    pub max_trunk_height: i32,
    /// Minimum distance on both X and Z between consecutive trunks of a scan
    pub min_spacing: i32,
    /// Percent chance (0-100) that an eligible column grows a tree
    pub spawn_chance: u32,
    pub min_trees_per_region: u32,
    pub max_trees_per_region: u32,
    /// Canopy extends this many blocks around the trunk on X and Z
    pub canopy_radius: i32,
    /// Canopy layers below the trunk top
    pub canopy_below: i32,
    /// Canopy layers above the trunk top
    pub canopy_above: i32,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            min_trunk_height: 3,
            max_trunk_height: 7,
            min_spacing: 3,
            spawn_chance: 80,
            min_trees_per_region: 2,
            max_trees_per_region: 9,
            canopy_radius: 2,
            canopy_below: 1,
            canopy_above: 2,
        }
    }
}

/// Part of a tree occupying one block
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TreeKind {
    Trunk,
    Leaves,
}

impl TreeKind {
    pub fn block(&self) -> Block {
        match self {
            TreeKind::Trunk => Block::TreeBark,
            TreeKind::Leaves => Block::TreeLeaves,
        }
    }
}

/// World-space tree blocks bucketed by chunk-sized region.
///
/// When a trunk and a leaf claim the same cell the trunk is kept.
#[derive(Clone, Debug)]
pub struct TreeOverlay {
    region_size: i32,
    regions: HashMap<IVec3, HashMap<IVec3, TreeKind>>,
}

impl TreeOverlay {
    pub fn new(region_size: i32) -> Self {
        Self {
            region_size: region_size.max(1),
            regions: HashMap::new(),
        }
    }

    fn region_of(&self, pos: IVec3) -> IVec3 {
        pos.div_euclid(IVec3::splat(self.region_size))
    }

    pub fn insert(&mut self, pos: IVec3, kind: TreeKind) {
        let region = self.region_of(pos);
        let cells = self.regions.entry(region).or_default();
        match cells.get(&pos) {
            Some(TreeKind::Trunk) => {}
            _ => {
                cells.insert(pos, kind);
            }
        }
    }

    pub fn get(&self, pos: IVec3) -> Option<TreeKind> {
        self.regions
            .get(&self.region_of(pos))
            .and_then(|cells| cells.get(&pos).copied())
    }

    /// Number of tree blocks
    pub fn len(&self) -> usize {
        self.regions.values().map(|cells| cells.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.values().all(|cells| cells.is_empty())
    }

    pub fn clear(&mut self) {
        self.regions.clear();
    }

    /// Every tree block inside the cube `[min, min + size)`
    pub fn blocks_in(&self, min: IVec3, size: i32) -> Vec<(IVec3, TreeKind)> {
        if size <= 0 {
            return Vec::new();
        }
        let max = min + IVec3::splat(size);
        let first = self.region_of(min);
        let last = self.region_of(max - IVec3::ONE);

        let mut out = Vec::new();
        for rz in first.z..=last.z {
            for rx in first.x..=last.x {
                for ry in first.y..=last.y {
                    let Some(cells) = self.regions.get(&IVec3::new(rx, ry, rz)) else {
                        continue;
                    };
                    out.extend(
                        cells
                            .iter()
                            .filter(|(p, _)| p.cmpge(min).all() && p.cmplt(max).all())
                            .map(|(p, k)| (*p, *k)),
                    );
                }
            }
        }
        out
    }
}

/// Deterministic per-region tree placement
pub struct TreePlanter<'a> {
    params: &'a TreeParams,
    seed: u32,
    region_size: i32,
    column_height: f32,
}

impl<'a> TreePlanter<'a> {
    /// `column_height` is the height of the full vertical chunk stack,
    /// as used for terrain carving.
    pub fn new(params: &'a TreeParams, seed: u32, region_size: i32, column_height: f32) -> Self {
        Self {
            params,
            seed,
            region_size,
            column_height,
        }
    }

    fn region_rng(&self, x: i32, z: i32) -> ChaCha8Rng {
        let region_seed = self.seed as i64 + x as i64 + z as i64;
        ChaCha8Rng::seed_from_u64(region_seed as u64)
    }

    /// Plant trees for the column region starting at `(x, z)`.
    ///
    /// `noise` is the region's elevation grid (`index = dz * size + dx`).
    /// Returns the number of trees planted.
    pub fn plant_region(
        &self,
        biome: Biome,
        x: i32,
        z: i32,
        noise: &[f32],
        overlay: &mut TreeOverlay,
    ) -> usize {
        if !biome.has_trees() {
            return 0;
        }
        let size = self.region_size;
        if noise.len() < (size * size) as usize {
            log::warn!(
                "Tree pass at ({}, {}): noise has {} samples, expected {}",
                x, z, noise.len(), size * size
            );
            return 0;
        }

        let p = self.params;
        let mut rng = self.region_rng(x, z);
        let min_trees = p.min_trees_per_region.min(p.max_trees_per_region);
        let max_height = p.max_trunk_height.max(p.min_trunk_height);
        let mut remaining = rng.random_range(min_trees..=p.max_trees_per_region);
        let mut last_tree: Option<(i32, i32)> = None;
        let mut planted = 0;

        for dz in 0..size {
            for dx in 0..size {
                if remaining == 0 {
                    return planted;
                }
                let (cx, cz) = (x + dx, z + dz);
                let spaced = last_tree.is_none_or(|(lx, lz)| {
                    (cx - lx).abs() >= p.min_spacing && (cz - lz).abs() >= p.min_spacing
                });
                if !spaced {
                    continue;
                }
                if rng.random_range(0..100) >= p.spawn_chance {
                    continue;
                }

                let height = rng.random_range(p.min_trunk_height..=max_height);
                let sample = noise[(dz * size + dx) as usize];
                let surface = surface_height(sample, self.column_height) as i32;
                let top = surface + height;

                for ly in (top - p.canopy_below)..=(top + p.canopy_above) {
                    for lz in (cz - p.canopy_radius)..=(cz + p.canopy_radius) {
                        for lx in (cx - p.canopy_radius)..=(cx + p.canopy_radius) {
                            overlay.insert(IVec3::new(lx, ly, lz), TreeKind::Leaves);
                        }
                    }
                }
                for ty in (surface + 1)..=top {
                    overlay.insert(IVec3::new(cx, ty, cz), TreeKind::Trunk);
                }

                last_tree = Some((cx, cz));
                remaining -= 1;
                planted += 1;
            }
        }
        planted
    }
}
