//! Biome classification from temperature

use serde::{Deserialize, Serialize};

use crate::voxel::block::Block;

/// Biome types
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Biome {
    Snow,
    Grassland,
    Desert,
    Rock,
    Forest,
}

/// Blocks used when carving a terrain column
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BiomePalette {
    /// Block at the surface height
    pub surface: Block,
    /// Block in the band directly below the surface
    pub subsurface_high: Block,
    /// Block below that band
    pub subsurface_low: Block,
}

impl Biome {
    /// Block triple used for this biome's terrain
    pub fn palette(&self) -> BiomePalette {
        let (surface, subsurface_high, subsurface_low) = match self {
            Biome::Desert => (Block::Sand, Block::Sand, Block::Sand),
            Biome::Grassland => (Block::Grass, Block::Dirt, Block::Stone),
            Biome::Snow => (Block::Snow, Block::Dirt, Block::Stone),
            Biome::Rock => (Block::Stone, Block::Stone, Block::Stone),
            Biome::Forest => (Block::ForestGrass, Block::Dirt, Block::Stone),
        };
        BiomePalette { surface, subsurface_high, subsurface_low }
    }

    /// Whether the tree pre-pass plants trees here
    pub fn has_trees(&self) -> bool {
        matches!(self, Biome::Forest)
    }
}

/// Upper temperature bounds (inclusive) for each biome band.
///
/// Temperatures above `forest_max` are desert.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BiomeThresholds {
    pub snow_max: f32,
    pub grassland_max: f32,
    pub forest_max: f32,
}

impl Default for BiomeThresholds {
    fn default() -> Self {
        Self {
            snow_max: -0.7,
            grassland_max: -0.1,
            forest_max: 0.7,
        }
    }
}

impl BiomeThresholds {
    /// Thresholds must be strictly increasing
    pub fn is_monotonic(&self) -> bool {
        self.snow_max < self.grassland_max && self.grassland_max < self.forest_max
    }

    /// Classify a temperature sample
    pub fn classify(&self, temperature: f32) -> Biome {
        if temperature <= self.snow_max {
            Biome::Snow
        } else if temperature <= self.grassland_max {
            Biome::Grassland
        } else if temperature <= self.forest_max {
            Biome::Forest
        } else {
            Biome::Desert
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_bands() {
        let t = BiomeThresholds::default();
        assert_eq!(t.classify(-1.0), Biome::Snow);
        assert_eq!(t.classify(-0.7), Biome::Snow);
        assert_eq!(t.classify(-0.69), Biome::Grassland);
        assert_eq!(t.classify(-0.1), Biome::Grassland);
        assert_eq!(t.classify(0.0), Biome::Forest);
        assert_eq!(t.classify(0.7), Biome::Forest);
        assert_eq!(t.classify(0.71), Biome::Desert);
    }

    #[test]
    fn test_palettes() {
        let grass = Biome::Grassland.palette();
        assert_eq!(grass.surface, Block::Grass);
        assert_eq!(grass.subsurface_high, Block::Dirt);
        assert_eq!(grass.subsurface_low, Block::Stone);

        assert_eq!(Biome::Desert.palette().subsurface_low, Block::Sand);
        assert_eq!(Biome::Forest.palette().surface, Block::ForestGrass);
        assert_eq!(Biome::Snow.palette().surface, Block::Snow);
        assert_eq!(Biome::Rock.palette().surface, Block::Stone);
    }

    #[test]
    fn test_trees_only_in_forest() {
        for biome in [Biome::Snow, Biome::Grassland, Biome::Desert, Biome::Rock] {
            assert!(!biome.has_trees());
        }
        assert!(Biome::Forest.has_trees());
    }

    #[test]
    fn test_monotonic() {
        assert!(BiomeThresholds::default().is_monotonic());
        let bad = BiomeThresholds { snow_max: 0.5, ..Default::default() };
        assert!(!bad.is_monotonic());
    }
}
