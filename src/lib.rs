//! Blockworld - a streamed voxel block world
//!
//! Chunks of typed blocks are generated from seeded noise, meshed with
//! face culling, and recycled around a moving viewer by a background
//! worker. Collision, raycast and frustum queries run against the live set.

pub mod core;
pub mod math;
pub mod terrain;
pub mod voxel;
pub mod streaming;
