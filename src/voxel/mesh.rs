//! Face-culled chunk meshing
//!
//! Every solid block emits one quad per face whose neighbor is Air or lies
//! outside the chunk. Only the chunk's own grid is consulted, so faces on a
//! chunk border are always emitted. Coplanar quads are never merged.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use super::block::Block;
use super::chunk::block_index;
use crate::core::types::{Vec2, Vec3};

/// Vertex uploaded to the renderer (36 bytes)
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    /// Quad-local UV in `[0, 1]`
    pub uv: [f32; 2],
    /// Texture array layer, see [`AtlasLayout::layer_index`]
    pub layer: u32,
}

/// Block face, in texture column order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Face {
    Up = 0,
    Down = 1,
    Right = 2,
    Left = 3,
    Front = 4,
    Back = 5,
}

impl Face {
    pub const ALL: [Face; 6] = [
        Face::Up,
        Face::Down,
        Face::Right,
        Face::Left,
        Face::Front,
        Face::Back,
    ];

    pub fn index(&self) -> u32 {
        *self as u32
    }

    /// Offset to the neighboring block across this face
    pub fn neighbor_offset(&self) -> [i32; 3] {
        match self {
            Face::Up => [0, 1, 0],
            Face::Down => [0, -1, 0],
            Face::Right => [1, 0, 0],
            Face::Left => [-1, 0, 0],
            Face::Front => [0, 0, 1],
            Face::Back => [0, 0, -1],
        }
    }

    pub fn normal(&self) -> Vec3 {
        let [x, y, z] = self.neighbor_offset();
        Vec3::new(x as f32, y as f32, z as f32)
    }

    /// Quad corner and edge vectors for a unit cube at `min`.
    ///
    /// Returns `(anchor, u, w)` with `u × w` equal to the face normal.
    fn quad(&self, min: Vec3) -> (Vec3, Vec3, Vec3) {
        let max = min + Vec3::ONE;
        match self {
            Face::Up => (Vec3::new(min.x, max.y, max.z), Vec3::X, Vec3::NEG_Z),
            Face::Down => (min, Vec3::X, Vec3::Z),
            Face::Right => (Vec3::new(max.x, min.y, max.z), Vec3::NEG_Z, Vec3::Y),
            Face::Left => (min, Vec3::Z, Vec3::Y),
            Face::Front => (Vec3::new(min.x, min.y, max.z), Vec3::X, Vec3::Y),
            Face::Back => (Vec3::new(max.x, min.y, min.z), Vec3::NEG_X, Vec3::Y),
        }
    }
}

/// Two triangles per quad, counter-clockwise seen from outside
const QUAD_INDICES: [u32; 6] = [3, 2, 1, 2, 0, 1];

/// UV sub-rectangle of an atlas cell
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UvRect {
    pub min: Vec2,
    pub max: Vec2,
}

impl UvRect {
    /// Map a quad-local UV into this rectangle
    pub fn map(&self, uv: Vec2) -> Vec2 {
        self.min + (self.max - self.min) * uv
    }
}

/// Texture atlas arranged as one row per block type and one column per face
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasLayout {
    pub rows: u32,
    pub cols: u32,
}

impl Default for AtlasLayout {
    fn default() -> Self {
        Self { rows: 8, cols: 6 }
    }
}

impl AtlasLayout {
    /// UV rectangle of cell `(row, col)`
    pub fn sub_texture(&self, row: u32, col: u32) -> UvRect {
        let cell = Vec2::new(1.0 / self.cols as f32, 1.0 / self.rows as f32);
        let min = Vec2::new(col as f32, row as f32) * cell;
        UvRect { min, max: min + cell }
    }

    /// Texture array layer for a block row and face
    pub fn layer_index(&self, row: u32, face: Face) -> u32 {
        row * self.cols + face.index()
    }
}

/// CPU-side geometry of one chunk
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn quad_count(&self) -> usize {
        self.vertices.len() / 4
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
    }

    fn push_quad(&mut self, face: Face, min: Vec3, layer: u32) {
        let (a, u, w) = face.quad(min);
        let normal = face.normal().to_array();
        let base = self.vertices.len() as u32;
        let corners = [
            (a, [0.0, 1.0]),
            (a + u, [1.0, 1.0]),
            (a + w, [0.0, 0.0]),
            (a + u + w, [1.0, 0.0]),
        ];
        for (position, uv) in corners {
            self.vertices.push(Vertex {
                position: position.to_array(),
                normal,
                uv,
                layer,
            });
        }
        self.indices.extend(QUAD_INDICES.iter().map(|i| base + i));
    }
}

/// Build the face-culled mesh for a `size³` grid.
///
/// Block `(x, y, z)` occupies the unit cube with min corner
/// `(x, y, z) - size / 2`, so the mesh is centered on the chunk origin.
/// An empty or wrongly sized grid produces an empty mesh.
pub fn build_mesh(blocks: &[Block], size: usize, atlas: &AtlasLayout) -> MeshData {
    let mut mesh = MeshData::default();
    if size == 0 || blocks.len() != size * size * size {
        return mesh;
    }

    let half = size as f32 * 0.5;
    let n = size as i32;
    let is_air = |x: i32, y: i32, z: i32| -> bool {
        if x < 0 || y < 0 || z < 0 || x >= n || y >= n || z >= n {
            return true;
        }
        !blocks[block_index(x as usize, y as usize, z as usize, size)].is_solid()
    };

    for z in 0..size {
        for x in 0..size {
            for y in 0..size {
                let block = blocks[block_index(x, y, z, size)];
                let Some(row) = block.texture_row() else {
                    continue;
                };
                let min = Vec3::new(x as f32 - half, y as f32 - half, z as f32 - half);
                for face in Face::ALL {
                    let [dx, dy, dz] = face.neighbor_offset();
                    if is_air(x as i32 + dx, y as i32 + dy, z as i32 + dz) {
                        mesh.push_quad(face, min, atlas.layer_index(row, face));
                    }
                }
            }
        }
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(size: usize) -> Vec<Block> {
        vec![Block::Air; size * size * size]
    }

    #[test]
    fn test_vertex_size() {
        assert_eq!(std::mem::size_of::<Vertex>(), 36);
        let v = Vertex::zeroed();
        assert_eq!(bytemuck::bytes_of(&v).len(), 36);
    }

    #[test]
    fn test_all_air_is_empty() {
        let mesh = build_mesh(&grid(16), 16, &AtlasLayout::default());
        assert!(mesh.vertices.is_empty());
        assert!(mesh.indices.is_empty());
    }

    #[test]
    fn test_single_block_has_six_quads() {
        let mut blocks = grid(4);
        blocks[block_index(1, 2, 1, 4)] = Block::Stone;
        let mesh = build_mesh(&blocks, 4, &AtlasLayout::default());
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.indices.len(), 36);
        assert_eq!(mesh.quad_count(), 6);
    }

    #[test]
    fn test_adjacent_blocks_hide_shared_faces() {
        let mut blocks = grid(4);
        blocks[block_index(1, 1, 1, 4)] = Block::Dirt;
        blocks[block_index(2, 1, 1, 4)] = Block::Dirt;
        let mesh = build_mesh(&blocks, 4, &AtlasLayout::default());
        assert_eq!(mesh.quad_count(), 10);
    }

    #[test]
    fn test_border_faces_are_kept() {
        let blocks = vec![Block::Stone; 8];
        let mesh = build_mesh(&blocks, 2, &AtlasLayout::default());
        // Full 2x2x2 cube: only outer faces, 4 per side
        assert_eq!(mesh.quad_count(), 24);
    }

    #[test]
    fn test_wrong_grid_size_is_empty() {
        let mesh = build_mesh(&[Block::Stone; 7], 2, &AtlasLayout::default());
        assert!(mesh.is_empty());
    }

    #[test]
    fn test_triangles_face_outward() {
        let mut blocks = grid(2);
        blocks[block_index(0, 0, 0, 2)] = Block::Grass;
        let mesh = build_mesh(&blocks, 2, &AtlasLayout::default());

        for tri in mesh.indices.chunks(3) {
            let p: Vec<Vec3> = tri
                .iter()
                .map(|&i| Vec3::from_array(mesh.vertices[i as usize].position))
                .collect();
            let n = Vec3::from_array(mesh.vertices[tri[0] as usize].normal);
            let geometric = (p[1] - p[0]).cross(p[2] - p[0]);
            assert!(geometric.dot(n) > 0.0, "triangle {tri:?} winds inward");
        }
    }

    #[test]
    fn test_mesh_is_centered() {
        let mut blocks = grid(16);
        blocks[block_index(0, 0, 0, 16)] = Block::Sand;
        let mesh = build_mesh(&blocks, 16, &AtlasLayout::default());
        let min = mesh
            .vertices
            .iter()
            .map(|v| Vec3::from_array(v.position))
            .fold(Vec3::splat(f32::MAX), Vec3::min);
        assert_eq!(min, Vec3::splat(-8.0));
    }

    #[test]
    fn test_layer_index_per_face() {
        let atlas = AtlasLayout::default();
        assert_eq!(atlas.layer_index(0, Face::Up), 0);
        assert_eq!(atlas.layer_index(2, Face::Back), 17);

        let mut blocks = grid(1);
        blocks[0] = Block::Stone;
        let mesh = build_mesh(&blocks, 1, &atlas);
        let mut layers: Vec<u32> = mesh.vertices.iter().map(|v| v.layer).collect();
        layers.dedup();
        assert_eq!(layers, vec![12, 13, 14, 15, 16, 17]);
    }

    #[test]
    fn test_sub_texture() {
        let atlas = AtlasLayout::default();
        let rect = atlas.sub_texture(2, 3);
        assert!(rect.min.abs_diff_eq(Vec2::new(0.5, 0.25), 1e-6));
        assert!(rect.max.abs_diff_eq(Vec2::new(4.0 / 6.0, 0.375), 1e-6));
        assert_eq!(rect.map(Vec2::ZERO), rect.min);
        assert!(rect.map(Vec2::ONE).abs_diff_eq(rect.max, 1e-6));
    }
}
