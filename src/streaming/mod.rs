//! Chunk streaming around a moving viewer

pub mod ring;
pub mod worker;

pub use ring::{closest_multiple, grid_cell, RingBounds};
pub use worker::WorldWorker;
