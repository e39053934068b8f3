//! Square ring of chunk columns around the viewer

use std::collections::HashSet;

use crate::core::config::LayerRange;
use crate::core::types::{IVec2, IVec3, Vec3};

/// Round `value` to the nearest multiple of `step`, saturating at the `i32`
/// range
pub fn closest_multiple(value: f32, step: i32) -> i32 {
    if step <= 0 {
        return value.round() as i32;
    }
    ((value / step as f32).round() as i32).saturating_mul(step)
}

/// Grid cell (X/Z) nearest to a world position
pub fn grid_cell(position: Vec3, chunk_size: usize) -> IVec2 {
    let step = chunk_size as i32;
    IVec2::new(closest_multiple(position.x, step), closest_multiple(position.z, step))
}

/// Columns within `radius` chunks of a grid-aligned center, inclusive
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RingBounds {
    pub center: IVec2,
    pub radius: i32,
    pub chunk_size: i32,
}

impl RingBounds {
    pub fn new(center: IVec2, radius: u32, chunk_size: usize) -> Self {
        Self {
            center,
            radius: radius as i32,
            chunk_size: chunk_size as i32,
        }
    }

    /// Ring centered on the grid cell nearest to `viewer`
    pub fn around(viewer: Vec3, radius: u32, chunk_size: usize) -> Self {
        Self::new(grid_cell(viewer, chunk_size), radius, chunk_size)
    }

    fn extent(&self) -> IVec2 {
        IVec2::splat(self.radius.saturating_mul(self.chunk_size))
    }

    pub fn min(&self) -> IVec2 {
        self.center.saturating_sub(self.extent())
    }

    pub fn max(&self) -> IVec2 {
        self.center.saturating_add(self.extent())
    }

    pub fn contains_column(&self, x: i32, z: i32) -> bool {
        let (min, max) = (self.min(), self.max());
        x >= min.x && x <= max.x && z >= min.y && z <= max.y
    }

    /// `(2·radius + 1)²`
    pub fn column_count(&self) -> usize {
        let side = (2 * self.radius + 1) as usize;
        side * side
    }

    /// Column origins (X, Z), row by row along Z
    pub fn columns(&self) -> impl Iterator<Item = IVec2> + use<> {
        let min = self.min();
        let side = 2 * self.radius + 1;
        let step = self.chunk_size;
        (0..side).flat_map(move |iz| {
            (0..side).map(move |ix| {
                IVec2::new(
                    min.x.saturating_add(ix * step),
                    min.y.saturating_add(iz * step),
                )
            })
        })
    }

    /// Every chunk origin of the ring across `layers`
    pub fn cells(&self, layers: LayerRange) -> Vec<IVec3> {
        let step = self.chunk_size;
        self.columns()
            .flat_map(|c| layers.iter().map(move |layer| IVec3::new(c.x, layer * step, c.y)))
            .collect()
    }

    /// Ring cells with no chunk in `occupied`, in column order
    pub fn missing_cells(&self, layers: LayerRange, occupied: &HashSet<IVec3>) -> Vec<IVec3> {
        self.cells(layers)
            .into_iter()
            .filter(|cell| !occupied.contains(cell))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closest_multiple() {
        assert_eq!(closest_multiple(0.0, 16), 0);
        assert_eq!(closest_multiple(7.9, 16), 0);
        assert_eq!(closest_multiple(8.1, 16), 16);
        assert_eq!(closest_multiple(23.0, 16), 16);
        assert_eq!(closest_multiple(25.0, 16), 32);
        assert_eq!(closest_multiple(-7.9, 16), 0);
        assert_eq!(closest_multiple(-8.1, 16), -16);
        assert_eq!(closest_multiple(-25.0, 16), -32);
    }

    #[test]
    fn test_closest_multiple_saturates() {
        assert_eq!(closest_multiple(f32::MAX, 16), i32::MAX);
        assert_eq!(closest_multiple(f32::MIN, 16), i32::MIN);
        assert_eq!(closest_multiple(3.0e9, 16), i32::MAX);
        assert_eq!(closest_multiple(-3.0e9, 16), i32::MIN);
        assert_eq!(closest_multiple(f32::NAN, 16), 0);
    }

    #[test]
    fn test_ring_at_extreme_position() {
        let ring = RingBounds::around(Vec3::new(f32::MAX, 0.0, f32::MIN), 2, 16);
        assert_eq!(ring.max().x, i32::MAX);
        assert_eq!(ring.min().y, i32::MIN);
        assert_eq!(ring.columns().count(), ring.column_count());
        assert!(ring.contains_column(ring.center.x, ring.center.y));
    }

    #[test]
    fn test_grid_cell() {
        assert_eq!(grid_cell(Vec3::new(30.0, 500.0, -30.0), 16), IVec2::new(32, -32));
    }

    #[test]
    fn test_ring_columns_are_complete() {
        let ring = RingBounds::around(Vec3::new(33.0, 0.0, -15.0), 2, 16);
        assert_eq!(ring.center, IVec2::new(32, -16));

        let columns: Vec<IVec2> = ring.columns().collect();
        assert_eq!(columns.len(), ring.column_count());
        assert_eq!(columns.len(), 25);

        let unique: HashSet<IVec2> = columns.iter().copied().collect();
        assert_eq!(unique.len(), 25);
        for c in &columns {
            assert!(ring.contains_column(c.x, c.y));
            assert_eq!(c.x.rem_euclid(16), 0);
            assert_eq!(c.y.rem_euclid(16), 0);
        }
        assert!(!ring.contains_column(ring.max().x + 16, ring.center.y));
    }

    #[test]
    fn test_cells_span_layers() {
        let ring = RingBounds::new(IVec2::ZERO, 1, 16);
        let cells = ring.cells(LayerRange::new(0, 3));
        assert_eq!(cells.len(), 9 * 4);
        assert!(cells.contains(&IVec3::new(-16, 48, 16)));
    }

    #[test]
    fn test_missing_cells() {
        let ring = RingBounds::new(IVec2::ZERO, 1, 16);
        let layers = LayerRange::new(0, 0);
        let mut occupied: HashSet<IVec3> = ring.cells(layers).into_iter().collect();
        assert!(ring.missing_cells(layers, &occupied).is_empty());

        occupied.remove(&IVec3::new(16, 0, -16));
        occupied.insert(IVec3::new(64, 0, 0));
        assert_eq!(ring.missing_cells(layers, &occupied), vec![IVec3::new(16, 0, -16)]);
    }

    #[test]
    fn test_shifted_ring_needs_one_row() {
        let layers = LayerRange::new(0, 0);
        let old = RingBounds::new(IVec2::ZERO, 2, 16);
        let new = RingBounds::new(IVec2::new(16, 0), 2, 16);
        let occupied: HashSet<IVec3> = old
            .cells(layers)
            .into_iter()
            .filter(|c| new.contains_column(c.x, c.z))
            .collect();
        let missing = new.missing_cells(layers, &occupied);
        assert_eq!(missing.len(), 5);
        assert!(missing.iter().all(|c| c.x == 48));
    }
}
