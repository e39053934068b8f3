//! Procedural terrain: noise fields, biomes and the tree pre-pass

pub mod noise_field;
pub use noise_field::{NoiseField, NoiseParams, TemperatureParams};

pub mod biome;
pub use biome::{Biome, BiomePalette, BiomeThresholds};

pub mod trees;
pub use trees::{TreeKind, TreeOverlay, TreeParams, TreePlanter};

/// Height of the terrain surface for one noise sample.
///
/// The surface sits in the middle of the vertical chunk stack for a noise
/// value of zero and spans the full stack height over `[-1, 1]`.
pub fn surface_height(noise: f32, column_height: f32) -> f32 {
    (column_height / 2.0) + (noise * column_height / 2.0)
}
