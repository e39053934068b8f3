//! Spatial queries against the live chunk set
//!
//! Broad phase is a linear scan of chunk bounds; narrow phase tests the
//! per-block collision boxes of the chunks that survive it. Slots that are
//! unloaded or being regenerated are invisible to every query.

use serde::{Deserialize, Serialize};

use crate::core::types::Vec3;
use crate::math::{Aabb, Frustum};

use super::block::Block;
use super::world::World;

/// Fixed-step ray march settings
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaycastParams {
    pub max_distance: f32,
    /// Edge length of the probe cube tested at each step
    pub probe_size: f32,
    pub num_steps: u32,
}

impl Default for RaycastParams {
    fn default() -> Self {
        Self {
            max_distance: 4.0,
            probe_size: 0.5,
            num_steps: 8,
        }
    }
}

/// First collision found by a ray march
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RaycastHit {
    /// Collision box of the block that was hit
    pub hit_box: Aabb,
    /// Step at which the probe first overlapped, 0 at the ray origin
    pub step: u32,
    /// Probe center at that step
    pub position: Vec3,
}

impl World {
    /// Indices of live slots whose bounds overlap `area` grown by half a
    /// chunk on every side
    pub fn get_chunks_inside_area(&self, area: &Aabb) -> Vec<usize> {
        let half = self.config().chunk_size as f32 * 0.5;
        let query = area.inflated(Vec3::splat(half));
        self.slots()
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_live() && slot.bounds().intersects(&query))
            .map(|(index, _)| index)
            .collect()
    }

    /// First block collision box overlapping `query`, if any
    pub fn is_colliding_with_world(&self, query: &Aabb) -> Option<Aabb> {
        for index in self.get_chunks_inside_area(query) {
            let chunk = self.slots()[index].read();
            if let Some(hit) = chunk.collision_boxes().iter().find(|b| b.intersects(query)) {
                return Some(*hit);
            }
        }
        None
    }

    /// March a probe cube from `origin` along `direction` in `num_steps`
    /// equal increments up to `max_distance`, returning the first step that
    /// collides. Step 0 tests the origin itself.
    pub fn perform_raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        params: &RaycastParams,
    ) -> Option<RaycastHit> {
        let direction = direction.try_normalize()?;
        if params.num_steps == 0 {
            return None;
        }
        let increment = params.max_distance / params.num_steps as f32;
        let probe = Vec3::splat(params.probe_size);

        (0..=params.num_steps).find_map(|step| {
            let position = origin + direction * (increment * step as f32);
            self.is_colliding_with_world(&Aabb::from_center_size(position, probe))
                .map(|hit_box| RaycastHit { hit_box, step, position })
        })
    }

    /// Ray march with the configured defaults
    pub fn raycast(&self, origin: Vec3, direction: Vec3) -> Option<RaycastHit> {
        let params = self.config().raycast;
        self.perform_raycast(origin, direction, &params)
    }

    /// Update every slot's draw flag from `frustum`. Returns the number of
    /// visible chunks.
    pub fn frustum_cull_chunks(&mut self, frustum: &Frustum) -> usize {
        let mut visible = 0;
        let mut culled = 0;
        for slot in self.slots() {
            if !slot.is_live() {
                slot.set_should_draw(false);
                continue;
            }
            let inside = frustum.intersects_aabb(&slot.bounds());
            slot.set_should_draw(inside);
            if inside {
                visible += 1;
            } else {
                culled += 1;
            }
        }
        self.culled = culled;
        visible
    }

    /// Live chunks rejected by the last frustum cull
    pub fn num_chunks_culled(&self) -> usize {
        self.culled
    }

    /// Block containing a render-space position
    pub fn block_at(&self, position: Vec3) -> Option<Block> {
        let point = Aabb::new(position, position);
        self.get_chunks_inside_area(&point).into_iter().find_map(|index| {
            let chunk = self.slots()[index].read();
            chunk.block_at(chunk.world_to_local(position))
        })
    }

    /// Slot and center of the block matching `filter` closest to `position`,
    /// searched in the chunks around it
    pub fn nearest_block(
        &self,
        position: Vec3,
        filter: impl Fn(Block) -> bool,
    ) -> Option<(usize, Vec3)> {
        let point = Aabb::new(position, position);
        self.get_chunks_inside_area(&point)
            .into_iter()
            .filter_map(|index| {
                let chunk = self.slots()[index].read();
                chunk
                    .find_nearest_block(position, &filter)
                    .map(|center| (index, center))
            })
            .min_by(|a, b| {
                a.1.distance_squared(position)
                    .total_cmp(&b.1.distance_squared(position))
            })
    }

    /// Place `block` against the solid block nearest to `hit`, on the free
    /// face closest to `viewer`
    pub fn place_block(&self, hit: Vec3, viewer: Vec3, block: Block) -> bool {
        let Some((index, center)) = self.nearest_block(hit, |b| b.is_solid()) else {
            return false;
        };
        let placed = self.slots()[index].write().place_block_next_to(center, viewer, block);
        if placed {
            log::debug!("Placed {:?} next to {:?}", block, center);
        }
        placed
    }

    /// Remove the solid block nearest to `position`
    pub fn break_block(&self, position: Vec3) -> bool {
        let Some((index, center)) = self.nearest_block(position, |b| b.is_solid()) else {
            return false;
        };
        let removed = self.slots()[index].write().remove_block_at(center);
        if removed {
            log::debug!("Removed block at {:?}", center);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{LayerRange, WorldConfig};
    use crate::core::types::IVec3;

    fn world() -> World {
        let config = WorldConfig {
            render_distance: 1,
            layers: LayerRange::new(0, 1),
            seed: Some(7),
            ..Default::default()
        };
        World::new(config, Vec3::ZERO).unwrap()
    }

    /// Center of a solid block resting on another solid block, with Air
    /// directly above it in the same chunk
    fn surface_block(world: &World) -> Vec3 {
        for slot in world.slots() {
            let chunk = slot.read();
            let n = chunk.size() as i32;
            let solid = |p: IVec3| chunk.block_at(p).is_some_and(|b| b.is_solid());
            for z in 0..n {
                for x in 0..n {
                    for y in 1..n - 1 {
                        let local = IVec3::new(x, y, z);
                        if solid(local)
                            && solid(local - IVec3::Y)
                            && chunk.block_at(local + IVec3::Y) == Some(Block::Air)
                        {
                            return chunk.block_center(local);
                        }
                    }
                }
            }
        }
        panic!("world has no exposed surface block");
    }

    #[test]
    fn test_broad_phase() {
        let world = world();
        let origin = world.slots()[0].origin().as_vec3();
        let hits = world.get_chunks_inside_area(&Aabb::new(origin, origin));
        assert!(hits.contains(&0));

        let far = Vec3::splat(10_000.0);
        assert!(world.get_chunks_inside_area(&Aabb::new(far, far)).is_empty());
    }

    #[test]
    fn test_collision() {
        let world = world();
        let solid = surface_block(&world);
        let probe = Aabb::from_center_size(solid, Vec3::splat(0.2));
        let hit = world.is_colliding_with_world(&probe).unwrap();
        assert!(hit.intersects(&probe));

        let sky = Aabb::from_center_size(Vec3::new(0.0, 500.0, 0.0), Vec3::ONE);
        assert_eq!(world.is_colliding_with_world(&sky), None);
    }

    #[test]
    fn test_raycast_hits_at_or_before_expected_step() {
        let world = world();
        let target = surface_block(&world);
        let origin = target + Vec3::Y * 3.0;
        let params = RaycastParams::default();

        let hit = world.perform_raycast(origin, Vec3::NEG_Y, &params).unwrap();
        // Probe bottom reaches the block top at step 5 with the defaults
        assert!(hit.step <= 5, "hit at step {}", hit.step);
        assert!(hit.hit_box.intersects(&Aabb::from_center_size(hit.position, Vec3::splat(0.5))));
    }

    #[test]
    fn test_raycast_from_inside_block_hits_at_origin() {
        let world = world();
        let target = surface_block(&world);
        let params = RaycastParams { num_steps: 2, ..Default::default() };

        let hit = world.perform_raycast(target, Vec3::Y, &params).unwrap();
        assert_eq!(hit.step, 0);
        assert_eq!(hit.position, target);
        assert!(hit.hit_box.contains_point(target));
    }

    #[test]
    fn test_raycast_step_count_is_a_parameter() {
        let world = world();
        let target = surface_block(&world);
        let origin = target + Vec3::Y * 3.0;

        let coarse = RaycastParams { num_steps: 2, ..Default::default() };
        let fine = RaycastParams { num_steps: 64, ..Default::default() };
        let coarse_hit = world.perform_raycast(origin, Vec3::NEG_Y, &coarse).unwrap();
        let fine_hit = world.perform_raycast(origin, Vec3::NEG_Y, &fine).unwrap();
        assert!(fine_hit.position.y >= coarse_hit.position.y);
    }

    #[test]
    fn test_raycast_misses() {
        let world = world();
        let up = world.raycast(Vec3::new(0.0, 200.0, 0.0), Vec3::Y);
        assert_eq!(up, None);
        assert_eq!(world.raycast(Vec3::ZERO, Vec3::ZERO), None);
    }

    #[test]
    fn test_frustum_cull() {
        let mut world = world();
        let looking_away = Frustum::from_camera(
            Vec3::new(0.0, 0.0, 10_000.0),
            Vec3::Z,
            Vec3::NEG_X,
            Vec3::Y,
            60f32.to_radians(),
            1.0,
            0.1,
            100.0,
        );
        assert_eq!(world.frustum_cull_chunks(&looking_away), 0);
        assert_eq!(world.num_chunks_culled(), world.chunk_count());
        assert!(world.slots().iter().all(|s| !s.should_draw()));

        let along_x = Frustum::from_camera(
            Vec3::new(0.0, 16.0, 0.0),
            Vec3::X,
            Vec3::Z,
            Vec3::Y,
            60f32.to_radians(),
            1.0,
            0.1,
            500.0,
        );
        let visible = world.frustum_cull_chunks(&along_x);
        assert!(visible > 0);
        assert!(world.num_chunks_culled() > 0);
        assert_eq!(visible + world.num_chunks_culled(), world.chunk_count());
    }

    #[test]
    fn test_break_block() {
        let world = world();
        let target = surface_block(&world);
        assert!(world.block_at(target).is_some_and(|b| b.is_solid()));

        assert!(world.break_block(target));
        assert_eq!(world.block_at(target), Some(Block::Air));
        let probe = Aabb::from_center_size(target, Vec3::splat(0.1));
        assert_ne!(
            world.is_colliding_with_world(&probe).map(|b| b.center()),
            Some(target)
        );
    }

    #[test]
    fn test_place_block_on_face_toward_viewer() {
        let world = world();
        let target = surface_block(&world);
        let viewer = target + Vec3::new(0.0, 6.0, 0.2);

        assert!(world.place_block(target, viewer, Block::Snow));
        assert_eq!(world.block_at(target + Vec3::Y), Some(Block::Snow));
    }

    #[test]
    fn test_queries_far_from_world_fail_closed() {
        let world = world();
        let far = Vec3::new(5_000.0, 0.0, 5_000.0);
        assert_eq!(world.block_at(far), None);
        assert!(!world.break_block(far));
        assert!(!world.place_block(far, Vec3::ZERO, Block::Dirt));
    }
}
