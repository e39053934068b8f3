//! Blocks, chunks and the streamed world

pub mod block;
pub mod mesh;
pub mod chunk;
pub mod world;
pub mod query;

pub use block::Block;
pub use mesh::{AtlasLayout, Face, MeshData, UvRect, Vertex};
pub use chunk::{Chunk, ChunkTerrain};
pub use world::{ChunkSlot, StreamingUpdate, World};
pub use query::{RaycastHit, RaycastParams};
