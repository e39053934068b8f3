//! Chunk: a fixed-size cube of blocks
//!
//! Chunks are pooled by the world and relocated with [`Chunk::recreate`]
//! rather than dropped. Two coordinate conventions meet here:
//!
//! - Generation addresses block `(x, y, z)` at world cell `origin + (x, y, z)`.
//!   Terrain carving and the tree overlay use this.
//! - Render and physics space center the chunk on its origin: block
//!   `(x, y, z)` is the unit cube with min corner `origin - size/2 + (x, y, z)`.
//!   Meshes, collision boxes, bounds and edits use this.

use std::time::Instant;

use crate::core::config::LayerRange;
use crate::core::transform::Transform;
use crate::core::types::{IVec3, Mat4, Vec3};
use crate::math::Aabb;
use crate::terrain::{surface_height, Biome, TreeOverlay};

use super::block::Block;
use super::mesh::{build_mesh, AtlasLayout, MeshData};

/// Thickness of the subsurface-high band directly below the surface
pub const SUBSURFACE_BAND: i32 = 3;

/// Flat index of block `(x, y, z)` in a `size³` grid stored as `[z][x][y]`
#[inline]
pub fn block_index(x: usize, y: usize, z: usize, size: usize) -> usize {
    (z * size + x) * size + y
}

/// Terrain inputs for one chunk column
#[derive(Clone, Copy, Debug)]
pub struct ChunkTerrain<'a> {
    pub biome: Biome,
    /// `size²` elevation samples, `index = dz * size + dx`
    pub noise: &'a [f32],
    pub layers: LayerRange,
}

/// A single chunk of the world grid
#[derive(Clone, Debug)]
pub struct Chunk {
    origin: IVec3,
    size: usize,
    seed: u32,
    biome: Biome,
    /// Dense `[z][x][y]` grid. Empty means the chunk has no valid bounds.
    blocks: Vec<Block>,
    collision_boxes: Vec<Aabb>,
    mesh: MeshData,
    atlas: AtlasLayout,
    transform: Transform,
    model: Mat4,
    /// Mesh rebuilt but not yet committed on the owning thread
    needs_commit: bool,
    mesh_resident: bool,
}

impl Chunk {
    /// Generate a chunk at `origin`: terrain, tree overlay, collision and mesh
    pub fn new(
        terrain: &ChunkTerrain<'_>,
        origin: IVec3,
        size: usize,
        seed: u32,
        overlay: &TreeOverlay,
        atlas: AtlasLayout,
    ) -> Self {
        let mut chunk = Self::from_blocks(origin, size, Vec::new(), atlas);
        chunk.recreate(terrain, origin, seed, overlay);
        chunk
    }

    /// Wrap an existing grid. A grid that is not `size³` is discarded,
    /// leaving a chunk that fails every in-bounds query.
    pub fn from_blocks(origin: IVec3, size: usize, blocks: Vec<Block>, atlas: AtlasLayout) -> Self {
        let blocks = if blocks.len() == size * size * size {
            blocks
        } else {
            Vec::new()
        };
        let mut chunk = Self {
            origin,
            size,
            seed: 0,
            biome: Biome::Grassland,
            blocks,
            collision_boxes: Vec::new(),
            mesh: MeshData::default(),
            atlas,
            transform: Transform::from_translation(origin.as_vec3()),
            model: Mat4::IDENTITY,
            needs_commit: false,
            mesh_resident: false,
        };
        chunk.update_collision_data();
        chunk.generate_mesh();
        chunk
    }

    /// Relocate and regenerate in place.
    ///
    /// Leaves the chunk identical to `Chunk::new` with the same arguments.
    /// Only CPU-side data is produced; call [`Chunk::commit`] on the owning
    /// thread afterwards.
    pub fn recreate(&mut self, terrain: &ChunkTerrain<'_>, origin: IVec3, seed: u32, overlay: &TreeOverlay) {
        self.origin = origin;
        self.seed = seed;
        self.biome = terrain.biome;
        self.transform.set_translation(origin.as_vec3());
        self.blocks.clear();
        self.blocks.resize(self.size * self.size * self.size, Block::Air);
        self.mesh_resident = false;

        self.use_noise(terrain.noise, terrain.layers);
        self.update_blocks(overlay);
        self.update_collision_data();
        self.generate_mesh();
    }

    /// Carve terrain from an elevation grid.
    ///
    /// Per column, `surface = column_height/2 + noise·column_height/2` where
    /// `column_height` spans every vertical layer. Comparison is on the
    /// truncated surface `s`: above is Air, `s` itself is the biome surface
    /// block, the [`SUBSURFACE_BAND`] blocks below it are subsurface-high and
    /// everything lower is subsurface-low.
    pub fn use_noise(&mut self, noise: &[f32], layers: LayerRange) {
        let size = self.size;
        if self.blocks.is_empty() {
            return;
        }
        self.blocks.fill(Block::Air);
        if noise.len() != size * size {
            log::warn!(
                "Chunk {:?}: noise buffer has {} samples, expected {}; leaving chunk empty",
                self.origin,
                noise.len(),
                size * size
            );
            return;
        }

        let palette = self.biome.palette();
        let column_height = layers.column_height(size);
        for z in 0..size {
            for x in 0..size {
                let surface = surface_height(noise[z * size + x], column_height) as i32;
                for y in 0..size {
                    let world_y = self.origin.y + y as i32;
                    let block = if world_y > surface {
                        Block::Air
                    } else if world_y == surface {
                        palette.surface
                    } else if world_y >= surface - SUBSURFACE_BAND {
                        palette.subsurface_high
                    } else {
                        palette.subsurface_low
                    };
                    self.blocks[block_index(x, y, z, size)] = block;
                }
            }
        }
    }

    /// Stamp tree blocks that fall inside this chunk.
    ///
    /// Returns whether any block changed, in which case the caller must
    /// rebuild collision data and the mesh.
    pub fn update_blocks(&mut self, overlay: &TreeOverlay) -> bool {
        if self.blocks.is_empty() {
            return false;
        }
        let mut changed = false;
        for (pos, kind) in overlay.blocks_in(self.origin, self.size as i32) {
            let local = pos - self.origin;
            let idx = block_index(local.x as usize, local.y as usize, local.z as usize, self.size);
            let block = kind.block();
            if self.blocks[idx] != block {
                self.blocks[idx] = block;
                changed = true;
            }
        }
        changed
    }

    /// Rebuild the mesh from the current grid and stage it for commit
    pub fn generate_mesh(&mut self) {
        self.mesh = build_mesh(&self.blocks, self.size, &self.atlas);
        self.needs_commit = true;
    }

    /// Apply staged state on the owning thread: refresh the model matrix and
    /// mark the mesh resident. Returns false when nothing was staged.
    pub fn commit(&mut self) -> bool {
        if !self.needs_commit {
            return false;
        }
        if self.transform.has_changed() {
            self.model = self.transform.model();
            self.transform.clear_changed();
        }
        self.needs_commit = false;
        self.mesh_resident = true;
        true
    }

    /// One unit collision box per solid block
    pub fn update_collision_data(&mut self) {
        self.collision_boxes.clear();
        let size = self.size;
        if self.blocks.is_empty() {
            return;
        }
        for z in 0..size {
            for x in 0..size {
                for y in 0..size {
                    if self.blocks[block_index(x, y, z, size)].is_solid() {
                        let local = IVec3::new(x as i32, y as i32, z as i32);
                        self.collision_boxes.push(Aabb::unit_cube(self.block_min_corner(local)));
                    }
                }
            }
        }
    }

    /// Release geometry. The chunk stays valid until the next `recreate`.
    pub fn unload(&mut self) {
        self.mesh.clear();
        self.needs_commit = false;
        self.mesh_resident = false;
    }

    /// Rebuild collision and mesh after an edit and commit immediately.
    /// Must run on the owning thread.
    pub fn reload(&mut self) {
        let start = Instant::now();
        self.update_collision_data();
        self.generate_mesh();
        self.commit();
        log::trace!("Chunk {:?} reloaded in {:?}", self.origin, start.elapsed());
    }

    /// Whether a local coordinate addresses a block of this chunk
    pub fn is_in_chunk(&self, local: IVec3) -> bool {
        let n = self.size as i32;
        !self.blocks.is_empty()
            && local.x >= 0 && local.x < n
            && local.y >= 0 && local.y < n
            && local.z >= 0 && local.z < n
    }

    fn index_of(&self, local: IVec3) -> Option<usize> {
        self.is_in_chunk(local).then(|| {
            block_index(local.x as usize, local.y as usize, local.z as usize, self.size)
        })
    }

    pub fn block_at(&self, local: IVec3) -> Option<Block> {
        self.index_of(local).map(|idx| self.blocks[idx])
    }

    /// Set a block and reload. Fails closed outside the grid.
    pub fn place_block_at(&mut self, local: IVec3, block: Block) -> bool {
        let Some(idx) = self.index_of(local) else {
            return false;
        };
        self.blocks[idx] = block;
        self.reload();
        true
    }

    /// Render-space position to local block coordinate
    pub fn world_to_local(&self, world: Vec3) -> IVec3 {
        let half = self.size as f32 * 0.5;
        (world - self.origin.as_vec3() + Vec3::splat(half)).floor().as_ivec3()
    }

    /// Min corner of a block's cube in render space
    pub fn block_min_corner(&self, local: IVec3) -> Vec3 {
        let half = self.size as f32 * 0.5;
        self.origin.as_vec3() - Vec3::splat(half) + local.as_vec3()
    }

    pub fn block_center(&self, local: IVec3) -> Vec3 {
        self.block_min_corner(local) + Vec3::splat(0.5)
    }

    /// Replace the block containing `world` with Air.
    /// Returns false when the position is outside this chunk.
    pub fn remove_block_at(&mut self, world: Vec3) -> bool {
        let local = self.world_to_local(world);
        self.place_block_at(local, Block::Air)
    }

    /// Place `block` in the Air neighbor of the block at `world` that is
    /// closest to `viewer`. Returns false when `world` is outside the chunk
    /// or the block has no Air neighbor inside it.
    pub fn place_block_next_to(&mut self, world: Vec3, viewer: Vec3, block: Block) -> bool {
        let hit = self.world_to_local(world);
        if !self.is_in_chunk(hit) {
            return false;
        }

        const NEIGHBORS: [IVec3; 6] = [
            IVec3::X,
            IVec3::NEG_X,
            IVec3::Y,
            IVec3::NEG_Y,
            IVec3::Z,
            IVec3::NEG_Z,
        ];
        let target = NEIGHBORS
            .iter()
            .map(|offset| hit + *offset)
            .filter(|n| self.block_at(*n) == Some(Block::Air))
            .min_by(|a, b| {
                let da = self.block_center(*a).distance_squared(viewer);
                let db = self.block_center(*b).distance_squared(viewer);
                da.total_cmp(&db)
            });

        match target {
            Some(local) => self.place_block_at(local, block),
            None => false,
        }
    }

    /// Center of the block matching `filter` closest to `world`
    pub fn find_nearest_block(&self, world: Vec3, filter: impl Fn(Block) -> bool) -> Option<Vec3> {
        let size = self.size;
        if self.blocks.is_empty() {
            return None;
        }
        let mut best: Option<(f32, Vec3)> = None;
        for z in 0..size {
            for x in 0..size {
                for y in 0..size {
                    if !filter(self.blocks[block_index(x, y, z, size)]) {
                        continue;
                    }
                    let center = self.block_center(IVec3::new(x as i32, y as i32, z as i32));
                    let d = center.distance_squared(world);
                    if best.is_none_or(|(bd, _)| d < bd) {
                        best = Some((d, center));
                    }
                }
            }
        }
        best.map(|(_, center)| center)
    }

    /// Bounds in render space, centered on the origin
    pub fn bounds(&self) -> Aabb {
        Aabb::from_center_size(self.origin.as_vec3(), Vec3::splat(self.size as f32))
    }

    pub fn origin(&self) -> IVec3 {
        self.origin
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn biome(&self) -> Biome {
        self.biome
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn collision_boxes(&self) -> &[Aabb] {
        &self.collision_boxes
    }

    pub fn mesh(&self) -> &MeshData {
        &self.mesh
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Model matrix as of the last commit
    pub fn model(&self) -> Mat4 {
        self.model
    }

    pub fn needs_commit(&self) -> bool {
        self.needs_commit
    }

    pub fn is_mesh_resident(&self) -> bool {
        self.mesh_resident
    }
}
