//! Seeded scalar noise fields for elevation and temperature

use noise::{Fbm, MultiFractal, NoiseFn, ScalePoint, Simplex};
use serde::{Deserialize, Serialize};

/// Parameters of the layered elevation noise
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseParams {
    pub frequency: f32,    // World units to noise units
    pub domain_scale: f32, // Extra input scaling applied before the fractal
    pub octaves: u32,      // FBM octaves (detail levels)
    pub persistence: f32,  // FBM persistence (0.5 typical)
    pub lacunarity: f32,   // FBM lacunarity (2.0 typical)
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            frequency: 0.05,
            domain_scale: 0.35,
            octaves: 5,
            persistence: 0.5,
            lacunarity: 2.0,
        }
    }
}

/// Parameters of the temperature field used for biome selection
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemperatureParams {
    pub frequency: f32,
    pub octaves: u32,
    /// Added to the world seed so temperature is independent of elevation
    pub seed_offset: u32,
}

impl Default for TemperatureParams {
    fn default() -> Self {
        Self {
            // One sample per chunk column at 0.05, as chunk edges are 16 blocks
            frequency: 0.05 / 16.0,
            octaves: 1,
            seed_offset: 1000,
        }
    }
}

/// Deterministic elevation and temperature sampling.
///
/// The noise graphs are built once; sampling only reads them, so a single
/// `NoiseField` can be shared across worker threads.
pub struct NoiseField {
    seed: u32,
    elevation: ScalePoint<Fbm<Simplex>>,
    temperature: Fbm<Simplex>,
    elevation_frequency: f64,
    temperature_frequency: f64,
}

impl NoiseField {
    pub fn new(seed: u32, params: &NoiseParams, temperature: &TemperatureParams) -> Self {
        let fractal = Fbm::<Simplex>::new(seed)
            .set_octaves(params.octaves.max(1) as usize)
            .set_persistence(params.persistence as f64)
            .set_lacunarity(params.lacunarity as f64);
        let elevation = ScalePoint::new(fractal).set_scale(params.domain_scale as f64);

        let temperature_noise = Fbm::<Simplex>::new(seed.wrapping_add(temperature.seed_offset))
            .set_octaves(temperature.octaves.max(1) as usize)
            .set_persistence(1.0)
            .set_lacunarity(2.0);

        Self {
            seed,
            elevation,
            temperature: temperature_noise,
            elevation_frequency: params.frequency as f64,
            temperature_frequency: temperature.frequency as f64,
        }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Sample a `size * size` elevation grid whose first sample is at
    /// `(origin_x, origin_z)`.
    ///
    /// Samples are stored row-major with X varying fastest:
    /// `index = dz * size + dx`. Values are clamped to `[-1, 1]`.
    pub fn sample_height_grid(&self, origin_x: i32, origin_z: i32, size: usize) -> Vec<f32> {
        let mut out = Vec::with_capacity(size * size);
        for dz in 0..size {
            for dx in 0..size {
                let wx = (origin_x as f64 + dx as f64) * self.elevation_frequency;
                let wz = (origin_z as f64 + dz as f64) * self.elevation_frequency;
                out.push(self.elevation.get([wx, wz]).clamp(-1.0, 1.0) as f32);
            }
        }
        out
    }

    /// Single-point temperature sample, roughly in `[-1, 1]`
    pub fn sample_temperature(&self, world_x: f32, world_z: f32) -> f32 {
        let tx = world_x as f64 * self.temperature_frequency;
        let tz = world_z as f64 * self.temperature_frequency;
        self.temperature.get([tx, tz]).clamp(-1.0, 1.0) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn field(seed: u32) -> NoiseField {
        NoiseField::new(seed, &NoiseParams::default(), &TemperatureParams::default())
    }

    #[test]
    fn test_grid_len_and_range() {
        let grid = field(7).sample_height_grid(-32, 48, 16);
        assert_eq!(grid.len(), 256);
        assert!(grid.iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[test]
    fn test_grid_determinism() {
        let a = field(99).sample_height_grid(16, -16, 16);
        let b = field(99).sample_height_grid(16, -16, 16);
        assert_eq!(a, b);
    }

    #[test]
    fn test_grid_matches_across_threads() {
        let shared = Arc::new(field(4242));
        let expected = shared.sample_height_grid(160, 320, 16);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let f = Arc::clone(&shared);
                std::thread::spawn(move || f.sample_height_grid(160, 320, 16))
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    }

    #[test]
    fn test_grid_row_major_x_fastest() {
        let f = field(3);
        let grid = f.sample_height_grid(0, 0, 16);
        // A grid starting one column to the right is the same data shifted by one
        let shifted = f.sample_height_grid(1, 0, 16);
        for dz in 0..16 {
            for dx in 0..15 {
                assert_eq!(grid[dz * 16 + dx + 1], shifted[dz * 16 + dx]);
            }
        }
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = field(1).sample_height_grid(0, 0, 16);
        let b = field(2).sample_height_grid(0, 0, 16);
        assert_ne!(a, b);
    }

    #[test]
    fn test_temperature_determinism() {
        let f = field(12345);
        for (x, z) in [(0.0, 0.0), (160.0, -320.0), (-4096.0, 2048.0)] {
            let t1 = f.sample_temperature(x, z);
            let t2 = f.sample_temperature(x, z);
            assert_eq!(t1, t2);
            assert!((-1.0..=1.0).contains(&t1));
        }
    }
}
