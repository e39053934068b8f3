//! Headless fly-through: streams a world along a straight path and reports
//! streaming, culling and query statistics.
//!
//! Usage: cargo run --release -- [OPTIONS]
//!
//! Options:
//!   --config <PATH>   World config JSON (default: built-in defaults)
//!   --seed <SEED>     World seed (default: from config, else random)
//!   --distance <N>    Render distance in chunks
//!   --threads <N>     Streaming worker threads
//!   --frames <N>      Frames to simulate (default: 600)
//!   --speed <BLOCKS>  Viewer speed per frame (default: 0.5)
//!   --log <FILTER>    Default log filter when RUST_LOG is unset (default: info)

use std::time::Instant;

use blockworld::core::{logging, Result, Vec3, WorldConfig};
use blockworld::math::Frustum;
use blockworld::voxel::{Block, StreamingUpdate, World};

fn main() {
    let args: Vec<String> = std::env::args().collect();
    match parse_str_arg(&args, "--log") {
        Some(filter) => logging::init_with_filter(&filter),
        None => logging::init(),
    }
    if let Err(e) = run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    let mut config = match parse_str_arg(&args, "--config") {
        Some(path) => WorldConfig::load(path)?,
        None => WorldConfig::default(),
    };
    if let Some(seed) = parse_u32_arg(&args, "--seed") {
        config.seed = Some(seed);
    }
    if let Some(distance) = parse_u32_arg(&args, "--distance") {
        config.render_distance = distance;
    }
    if let Some(threads) = parse_usize_arg(&args, "--threads") {
        config.worker_threads = threads;
    }
    let frames = parse_usize_arg(&args, "--frames").unwrap_or(600);
    let speed = parse_f32_arg(&args, "--speed").unwrap_or(0.5);

    let column_top = config.layers.column_height(config.chunk_size);
    let mut viewer = Vec3::new(0.0, column_top * 0.75, 0.0);
    let heading = Vec3::new(1.0, 0.0, 0.35).normalize();

    println!("=== Blockworld fly-through ===");
    println!("Render distance: {} chunks", config.render_distance);
    println!("Layers:          {}..={}", config.layers.y_min, config.layers.y_max);
    println!("Frames:          {} at {} blocks/frame", frames, speed);
    println!();

    let start = Instant::now();
    let mut world = World::new(config, viewer)?;
    println!("Seed {}: {} chunks in {:.2?}", world.seed(), world.chunk_count(), start.elapsed());

    let mut queued = 0usize;
    let mut busy = 0usize;
    let mut committed = 0usize;
    let mut culled = 0usize;
    let mut edits = 0usize;

    let run_start = Instant::now();
    for frame in 0..frames {
        viewer += heading * speed;
        match world.update(viewer) {
            StreamingUpdate::Queued { .. } => queued += 1,
            StreamingUpdate::Busy => busy += 1,
            StreamingUpdate::Unchanged => {}
        }
        committed += world.sync_render_state();

        let right = heading.cross(Vec3::Y).normalize();
        let up = right.cross(heading);
        let frustum = Frustum::from_camera(
            viewer,
            heading,
            right,
            up,
            70f32.to_radians(),
            16.0 / 9.0,
            0.1,
            256.0,
        );
        world.frustum_cull_chunks(&frustum);
        culled += world.num_chunks_culled();

        // Dig where the viewer looks straight down, then build on top
        if frame % 60 == 0 {
            let probe_from = Vec3::new(viewer.x, column_top, viewer.z);
            let reach = blockworld::voxel::RaycastParams {
                max_distance: column_top,
                num_steps: (column_top * 2.0) as u32,
                ..world.config().raycast
            };
            if let Some(hit) = world.perform_raycast(probe_from, Vec3::NEG_Y, &reach) {
                let target = hit.hit_box.center();
                if world.break_block(target) {
                    edits += 1;
                }
                if world.place_block(target, probe_from, Block::Stone) {
                    edits += 1;
                }
            }
        }
    }

    world.wait_for_streaming();
    committed += world.sync_render_state();
    let elapsed = run_start.elapsed();

    println!();
    println!("=== Summary ===");
    println!("Frames:     {} in {:.2?} ({:.1} fps)", frames, elapsed, frames as f64 / elapsed.as_secs_f64());
    println!("Streaming:  {} jobs queued, {} cycles deferred", queued, busy);
    println!("Commits:    {}", committed);
    println!("Culling:    {:.1} chunks/frame", culled as f64 / frames.max(1) as f64);
    println!("Edits:      {}", edits);
    println!("Final ring: {} live chunks around {:?}", world.loaded_origins().len(), world.center());
    Ok(())
}

fn parse_f32_arg(args: &[String], flag: &str) -> Option<f32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_u32_arg(args: &[String], flag: &str) -> Option<u32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_usize_arg(args: &[String], flag: &str) -> Option<usize> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
