//! World: a fixed pool of chunks streamed around the viewer
//!
//! The pool holds `(2·render_distance + 1)² × layers` chunks and never grows.
//! When the viewer crosses a grid boundary, chunks that left the ring are
//! claimed on the main thread, retargeted, and regenerated in place by a
//! worker job. A claimed slot belongs to exactly one job until that job
//! releases it.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use rayon::prelude::*;

use crate::core::config::WorldConfig;
use crate::core::types::{IVec2, IVec3, Result, Vec3};
use crate::math::Aabb;
use crate::streaming::{grid_cell, RingBounds, WorldWorker};
use crate::terrain::{Biome, NoiseField, TreeOverlay, TreePlanter};

use super::chunk::{Chunk, ChunkTerrain};

/// One pooled chunk plus the state other threads read without locking it
pub struct ChunkSlot {
    chunk: RwLock<Chunk>,
    origin_x: AtomicI32,
    origin_y: AtomicI32,
    origin_z: AtomicI32,
    chunk_size: usize,
    unloaded: AtomicBool,
    should_draw: AtomicBool,
    /// Owned by an in-flight regeneration job
    claimed: AtomicBool,
}

impl ChunkSlot {
    fn new(chunk: Chunk) -> Self {
        let origin = chunk.origin();
        Self {
            chunk_size: chunk.size(),
            chunk: RwLock::new(chunk),
            origin_x: AtomicI32::new(origin.x),
            origin_y: AtomicI32::new(origin.y),
            origin_z: AtomicI32::new(origin.z),
            unloaded: AtomicBool::new(false),
            should_draw: AtomicBool::new(true),
            claimed: AtomicBool::new(false),
        }
    }

    /// Current (or, while claimed, target) chunk origin
    pub fn origin(&self) -> IVec3 {
        IVec3::new(
            self.origin_x.load(Ordering::Acquire),
            self.origin_y.load(Ordering::Acquire),
            self.origin_z.load(Ordering::Acquire),
        )
    }

    fn set_origin(&self, origin: IVec3) {
        self.origin_x.store(origin.x, Ordering::Release);
        self.origin_y.store(origin.y, Ordering::Release);
        self.origin_z.store(origin.z, Ordering::Release);
    }

    /// Render-space bounds, without locking the chunk
    pub fn bounds(&self) -> Aabb {
        Aabb::from_center_size(self.origin().as_vec3(), Vec3::splat(self.chunk_size as f32))
    }

    pub fn is_unloaded(&self) -> bool {
        self.unloaded.load(Ordering::Acquire)
    }

    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }

    pub fn should_draw(&self) -> bool {
        self.should_draw.load(Ordering::Acquire)
    }

    pub(super) fn set_should_draw(&self, visible: bool) {
        self.should_draw.store(visible, Ordering::Release);
    }

    /// Loaded and not being regenerated
    pub fn is_live(&self) -> bool {
        !self.is_unloaded() && !self.is_claimed()
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Chunk> {
        self.chunk.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Chunk> {
        self.chunk.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn mark_unloaded(&self) {
        self.unloaded.store(true, Ordering::Release);
        self.should_draw.store(false, Ordering::Release);
        self.write().unload();
    }

    fn release_claim(&self) {
        self.claimed.store(false, Ordering::Release);
    }

    fn finish_load(&self) {
        self.unloaded.store(false, Ordering::Release);
        self.should_draw.store(true, Ordering::Release);
        self.claimed.store(false, Ordering::Release);
    }
}

/// Outcome of [`World::update`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamingUpdate {
    /// Viewer still in the same grid cell, or nothing to load
    Unchanged,
    /// A new cell was entered but no worker thread was free
    Busy,
    /// A regeneration job was queued for this many chunks
    Queued { chunks: usize },
}

/// Elevation and biome of one chunk column
struct ColumnData {
    noise: Vec<f32>,
    biome: Biome,
}

/// Work handed to a worker thread: slots to regenerate and where
struct RegenerationJob {
    bounds: RingBounds,
    assignments: Vec<(usize, IVec3)>,
}

/// State shared between the main thread and worker jobs
pub(super) struct WorldShared {
    pub(super) config: WorldConfig,
    pub(super) seed: u32,
    noise: NoiseField,
    pub(super) slots: Vec<ChunkSlot>,
}

impl WorldShared {
    fn sample_column(&self, column: IVec2) -> ColumnData {
        let size = self.config.chunk_size;
        let noise = self.noise.sample_height_grid(column.x, column.y, size);
        let temperature = self.noise.sample_temperature(column.x as f32, column.y as f32);
        ColumnData {
            noise,
            biome: self.config.biomes.classify(temperature),
        }
    }

    /// Noise and biome for every column of the ring, sampled once per column
    fn sample_columns(&self, bounds: &RingBounds, parallel: bool) -> HashMap<IVec2, ColumnData> {
        let columns: Vec<IVec2> = bounds.columns().collect();
        let sample = |c: &IVec2| (*c, self.sample_column(*c));
        if parallel {
            columns.par_iter().map(sample).collect()
        } else {
            columns.iter().map(sample).collect()
        }
    }

    fn plant_trees(&self, columns: &HashMap<IVec2, ColumnData>) -> TreeOverlay {
        let size = self.config.chunk_size;
        let planter = TreePlanter::new(
            &self.config.trees,
            self.seed,
            size as i32,
            self.config.layers.column_height(size),
        );
        let mut overlay = TreeOverlay::new(size as i32);
        let mut trees = 0;
        for (column, data) in columns {
            trees += planter.plant_region(data.biome, column.x, column.y, &data.noise, &mut overlay);
        }
        log::debug!("Tree pass: {} trees, {} blocks", trees, overlay.len());
        overlay
    }

    /// Regenerate claimed slots at their targets.
    ///
    /// Runs on a worker thread. Live chunks get the fresh tree overlay first
    /// since trees near the ring edge can reach into chunks that did not move.
    fn load_new_chunks(&self, job: RegenerationJob) {
        let start = Instant::now();
        let columns = self.sample_columns(&job.bounds, false);
        let noise_time = start.elapsed();

        let overlay = self.plant_trees(&columns);
        let mut refreshed = 0;
        for slot in self.slots.iter().filter(|s| s.is_live()) {
            let mut chunk = slot.write();
            if chunk.update_blocks(&overlay) {
                chunk.update_collision_data();
                chunk.generate_mesh();
                refreshed += 1;
            }
        }

        let recreate_start = Instant::now();
        let layers = self.config.layers;
        for (index, target) in &job.assignments {
            let Some(slot) = self.slots.get(*index) else {
                continue;
            };
            let Some(column) = columns.get(&IVec2::new(target.x, target.z)) else {
                log::warn!("No column data for chunk target {:?}; leaving it unloaded", target);
                slot.release_claim();
                continue;
            };
            let terrain = ChunkTerrain {
                biome: column.biome,
                noise: &column.noise,
                layers,
            };
            slot.write().recreate(&terrain, *target, self.seed, &overlay);
            slot.finish_load();
        }

        log::debug!(
            "Streaming job: {} chunks recreated, {} refreshed (noise {:?}, recreate {:?}, total {:?})",
            job.assignments.len(),
            refreshed,
            noise_time,
            recreate_start.elapsed(),
            start.elapsed()
        );
    }
}

/// Streamed voxel world
pub struct World {
    pub(super) shared: Arc<WorldShared>,
    worker: WorldWorker,
    last_viewer: Vec3,
    last_center: IVec2,
    pub(super) culled: usize,
}

impl World {
    /// Generate the full ring around `viewer` synchronously and start the
    /// streaming worker.
    pub fn new(config: WorldConfig, viewer: Vec3) -> Result<Self> {
        config.validate()?;
        let start = Instant::now();
        let seed = config.resolve_seed();
        let noise = NoiseField::new(seed, &config.noise, &config.temperature);
        let worker = WorldWorker::new(config.worker_threads)?;

        let mut shared = WorldShared {
            config,
            seed,
            noise,
            slots: Vec::new(),
        };

        let size = shared.config.chunk_size;
        let bounds = RingBounds::around(viewer, shared.config.render_distance, size);
        let columns = shared.sample_columns(&bounds, true);
        let overlay = shared.plant_trees(&columns);

        let layers = shared.config.layers;
        let atlas = shared.config.atlas;
        let chunks: Vec<Chunk> = bounds
            .cells(layers)
            .par_iter()
            .map(|cell| match columns.get(&IVec2::new(cell.x, cell.z)) {
                Some(column) => {
                    let terrain = ChunkTerrain {
                        biome: column.biome,
                        noise: &column.noise,
                        layers,
                    };
                    Chunk::new(&terrain, *cell, size, seed, &overlay, atlas)
                }
                None => Chunk::from_blocks(*cell, size, Vec::new(), atlas),
            })
            .collect();

        shared.slots = chunks.into_iter().map(ChunkSlot::new).collect();
        for slot in &shared.slots {
            slot.write().commit();
        }

        log::info!(
            "World generated: seed {}, {} chunks around {:?} in {:?}",
            seed,
            shared.slots.len(),
            bounds.center,
            start.elapsed()
        );

        Ok(Self {
            shared: Arc::new(shared),
            worker,
            last_viewer: viewer,
            last_center: bounds.center,
            culled: 0,
        })
    }

    /// Per-frame streaming step.
    ///
    /// Never blocks: when every worker thread is busy the cycle is skipped
    /// and retried on a later call.
    pub fn update(&mut self, viewer: Vec3) -> StreamingUpdate {
        self.last_viewer = viewer;
        let config = &self.shared.config;
        let center = grid_cell(viewer, config.chunk_size);
        if center == self.last_center {
            return StreamingUpdate::Unchanged;
        }
        if !self.worker.are_any_threads_available() {
            log::trace!("Streaming skipped: no worker thread available");
            return StreamingUpdate::Busy;
        }

        let bounds = RingBounds::new(center, config.render_distance, config.chunk_size);
        let (assignments, unfilled) = self.claim_slots(&bounds);
        if assignments.is_empty() {
            if unfilled == 0 {
                self.last_center = center;
            }
            return StreamingUpdate::Unchanged;
        }

        let chunks = assignments.len();
        let claimed: Vec<usize> = assignments.iter().map(|(index, _)| *index).collect();
        let shared = Arc::clone(&self.shared);
        let job = RegenerationJob { bounds, assignments };
        if !self.worker.try_enqueue(move || shared.load_new_chunks(job)) {
            // Retargeted slots stay unloaded and are recycled by the retry
            for index in claimed {
                self.shared.slots[index].release_claim();
            }
            log::trace!("Streaming skipped: worker filled up before enqueue");
            return StreamingUpdate::Busy;
        }
        if unfilled == 0 {
            self.last_center = center;
        }
        log::debug!("Streaming job queued: {} chunks around {:?}", chunks, center);
        StreamingUpdate::Queued { chunks }
    }

    /// Diff the pool against `bounds` and claim recyclable slots for the
    /// missing cells. Returns the assignments and the number of cells left
    /// without a slot.
    fn claim_slots(&self, bounds: &RingBounds) -> (Vec<(usize, IVec3)>, usize) {
        let layers = self.shared.config.layers;
        let mut occupied = HashSet::new();
        let mut recyclable = Vec::new();
        for (index, slot) in self.shared.slots.iter().enumerate() {
            let origin = slot.origin();
            let claimed = slot.is_claimed();
            let in_range = bounds.contains_column(origin.x, origin.z)
                && origin.y >= layers.y_min * bounds.chunk_size
                && origin.y <= layers.y_max * bounds.chunk_size;
            if in_range && (claimed || !slot.is_unloaded()) && occupied.insert(origin) {
                continue;
            }
            if !claimed {
                recyclable.push(index);
            }
        }

        let targets = bounds.missing_cells(layers, &occupied);
        let mut assignments = Vec::with_capacity(targets.len().min(recyclable.len()));
        for (&index, &target) in recyclable.iter().zip(targets.iter()) {
            let slot = &self.shared.slots[index];
            slot.claimed.store(true, Ordering::Release);
            slot.set_origin(target);
            slot.mark_unloaded();
            assignments.push((index, target));
        }

        let leftover = recyclable.len().saturating_sub(targets.len());
        for &index in recyclable.iter().skip(targets.len()) {
            let slot = &self.shared.slots[index];
            if !slot.is_unloaded() {
                slot.mark_unloaded();
            }
        }
        if leftover > 0 {
            log::debug!("Streaming: {} recyclable chunks left unloaded", leftover);
        }

        let unfilled = targets.len().saturating_sub(recyclable.len());
        if unfilled > 0 {
            log::warn!(
                "Streaming: {} target cells but only {} recyclable chunks",
                targets.len(),
                recyclable.len()
            );
        }
        (assignments, unfilled)
    }

    /// Commit meshes and transforms staged by worker jobs. Call on the
    /// thread that owns render resources. Returns the number committed.
    pub fn sync_render_state(&self) -> usize {
        let mut committed = 0;
        for slot in self.shared.slots.iter().filter(|s| s.is_live()) {
            let staged = slot.read().needs_commit();
            if staged && slot.write().commit() {
                committed += 1;
            }
        }
        committed
    }

    /// Block until queued streaming jobs have finished
    pub fn wait_for_streaming(&self) {
        self.worker.wait_idle();
    }

    pub fn is_streaming(&self) -> bool {
        self.worker.pending_jobs() > 0
    }

    pub fn slots(&self) -> &[ChunkSlot] {
        &self.shared.slots
    }

    pub fn chunk_count(&self) -> usize {
        self.shared.slots.len()
    }

    /// Origins of every live chunk
    pub fn loaded_origins(&self) -> Vec<IVec3> {
        self.shared
            .slots
            .iter()
            .filter(|s| s.is_live())
            .map(|s| s.origin())
            .collect()
    }

    pub fn config(&self) -> &WorldConfig {
        &self.shared.config
    }

    pub fn seed(&self) -> u32 {
        self.shared.seed
    }

    pub fn last_viewer(&self) -> Vec3 {
        self.last_viewer
    }

    /// Grid cell the streamed ring is currently centered on
    pub fn center(&self) -> IVec2 {
        self.last_center
    }
}
