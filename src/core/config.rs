//! World configuration
//!
//! Every tunable constant of generation, streaming and queries lives here so
//! a world can be described by a single JSON document.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::Error;
use super::types::Result;
use crate::terrain::{BiomeThresholds, NoiseParams, TemperatureParams, TreeParams};
use crate::voxel::mesh::AtlasLayout;
use crate::voxel::query::RaycastParams;

/// Inclusive range of vertical chunk layers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerRange {
    pub y_min: i32,
    pub y_max: i32,
}

impl Default for LayerRange {
    fn default() -> Self {
        Self { y_min: 0, y_max: 3 }
    }
}

impl LayerRange {
    pub fn new(y_min: i32, y_max: i32) -> Self {
        Self { y_min, y_max }
    }

    /// Number of chunk layers stacked per column
    pub fn count(&self) -> usize {
        (self.y_max - self.y_min + 1).max(0) as usize
    }

    /// Height of the full vertical chunk stack in blocks
    pub fn column_height(&self, chunk_size: usize) -> f32 {
        (self.count() * chunk_size) as f32
    }

    pub fn iter(&self) -> std::ops::RangeInclusive<i32> {
        self.y_min..=self.y_max
    }
}

/// Configuration for a streamed world
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Chunk edge length in blocks
    pub chunk_size: usize,
    /// Radius of the streamed square in chunks
    pub render_distance: u32,
    /// Vertical chunk layers
    pub layers: LayerRange,
    /// Threads in the streaming worker pool
    pub worker_threads: usize,
    /// World seed; a random one is drawn when absent
    pub seed: Option<u32>,
    pub noise: NoiseParams,
    pub temperature: TemperatureParams,
    pub biomes: BiomeThresholds,
    pub trees: TreeParams,
    pub raycast: RaycastParams,
    pub atlas: AtlasLayout,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            chunk_size: 16,
            render_distance: 4,
            layers: LayerRange::default(),
            worker_threads: 1,
            seed: None,
            noise: NoiseParams::default(),
            temperature: TemperatureParams::default(),
            biomes: BiomeThresholds::default(),
            trees: TreeParams::default(),
            raycast: RaycastParams::default(),
            atlas: AtlasLayout::default(),
        }
    }
}

impl WorldConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: WorldConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        log::info!("Loaded world config from {}", path.display());
        Ok(config)
    }

    /// Pool size: columns in the streamed square times vertical layers
    pub fn pool_size(&self) -> usize {
        let side = 2 * self.render_distance as usize + 1;
        side * side * self.layers.count()
    }

    /// Reject values generation and streaming cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be positive".into()));
        }
        if self.layers.y_min > self.layers.y_max {
            return Err(Error::InvalidConfig(format!(
                "layer range is inverted: y_min {} > y_max {}",
                self.layers.y_min, self.layers.y_max
            )));
        }
        if self.worker_threads == 0 {
            return Err(Error::InvalidConfig("worker_threads must be at least 1".into()));
        }
        if !self.biomes.is_monotonic() {
            return Err(Error::InvalidConfig(
                "biome thresholds must be strictly increasing".into(),
            ));
        }
        let t = &self.trees;
        if t.min_trunk_height <= 0 || t.min_trunk_height > t.max_trunk_height {
            return Err(Error::InvalidConfig(format!(
                "invalid trunk height range {}..={}",
                t.min_trunk_height, t.max_trunk_height
            )));
        }
        if t.min_trees_per_region > t.max_trees_per_region {
            return Err(Error::InvalidConfig("min_trees_per_region exceeds max".into()));
        }
        if t.spawn_chance > 100 {
            return Err(Error::InvalidConfig("spawn_chance is a percentage".into()));
        }
        if self.raycast.num_steps == 0 || self.raycast.max_distance <= 0.0 {
            return Err(Error::InvalidConfig(
                "raycast needs a positive distance and step count".into(),
            ));
        }
        if self.raycast.probe_size <= 0.0 {
            return Err(Error::InvalidConfig("raycast probe_size must be positive".into()));
        }
        if self.atlas.rows == 0 || self.atlas.cols == 0 {
            return Err(Error::InvalidConfig("atlas needs at least one row and column".into()));
        }
        Ok(())
    }

    /// Configured seed, or a fresh random one
    pub fn resolve_seed(&self) -> u32 {
        self.seed.unwrap_or_else(rand::random)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = WorldConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunk_size, 16);
        assert_eq!(config.layers.count(), 4);
        assert_eq!(config.layers.column_height(16), 64.0);
        assert_eq!(config.pool_size(), 81 * 4);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = WorldConfig::from_json_str(r#"{ "render_distance": 2, "seed": 42 }"#)
            .unwrap();
        assert_eq!(config.render_distance, 2);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.resolve_seed(), 42);
        assert_eq!(config.chunk_size, 16);
        assert_eq!(config.trees, TreeParams::default());
    }

    #[test]
    fn test_rejects_bad_values() {
        let cases = [
            r#"{ "chunk_size": 0 }"#,
            r#"{ "layers": { "y_min": 3, "y_max": 0 } }"#,
            r#"{ "worker_threads": 0 }"#,
            r#"{ "biomes": { "snow_max": 0.9 } }"#,
            r#"{ "trees": { "min_trunk_height": 8, "max_trunk_height": 3 } }"#,
            r#"{ "raycast": { "num_steps": 0 } }"#,
        ];
        for json in cases {
            let result = WorldConfig::from_json_str(json);
            assert!(
                matches!(result, Err(Error::InvalidConfig(_))),
                "expected rejection for {json}"
            );
        }
    }

    #[test]
    fn test_malformed_json() {
        let result = WorldConfig::from_json_str("{ not json");
        assert!(matches!(result, Err(Error::ConfigParse(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "chunk_size": 8, "worker_threads": 2 }}"#).unwrap();

        let config = WorldConfig::load(file.path()).unwrap();
        assert_eq!(config.chunk_size, 8);
        assert_eq!(config.worker_threads, 2);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = WorldConfig::load(dir.path().join("missing.json"));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_serialize_roundtrip_keeps_seed() {
        let config = WorldConfig { seed: Some(7), ..Default::default() };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(WorldConfig::from_json_str(&json).unwrap(), config);
    }
}
