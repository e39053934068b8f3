//! Block type stored in chunk grids

use serde::{Deserialize, Serialize};

/// Single block - exactly 1 byte
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Block {
    #[default]
    Air = 0,
    Grass = 1,
    Dirt = 2,
    Stone = 3,
    Sand = 4,
    Snow = 5,
    ForestGrass = 6,
    TreeBark = 7,
    TreeLeaves = 8,
    /// Placeholder for "no block"; never textured
    None = 9,
}

impl Block {
    /// Air is the only non-solid block
    pub fn is_solid(&self) -> bool {
        !matches!(self, Block::Air)
    }

    /// Row of this block in the texture atlas, `None` for untextured blocks
    pub fn texture_row(&self) -> Option<u32> {
        match self {
            Block::Air | Block::None => None,
            other => Some(*other as u32 - 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_size() {
        assert_eq!(std::mem::size_of::<Block>(), 1);
    }

    #[test]
    fn test_only_air_is_not_solid() {
        assert!(!Block::Air.is_solid());
        for b in [Block::Grass, Block::Stone, Block::TreeLeaves, Block::None] {
            assert!(b.is_solid());
        }
    }

    #[test]
    fn test_texture_rows() {
        assert_eq!(Block::Air.texture_row(), None);
        assert_eq!(Block::Grass.texture_row(), Some(0));
        assert_eq!(Block::TreeLeaves.texture_row(), Some(7));
        assert_eq!(Block::None.texture_row(), None);
    }
}
