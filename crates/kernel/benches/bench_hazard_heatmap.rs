use std::hint::black_box;
use std::time::Instant;

use agentspace_common::Coordinate;
use agentspace_kernel::{HazardHeatMap, SessionConfig, WorldState};

fn grid_point(i: usize, side: usize) -> Coordinate {
    // 0.0002 degree spacing keeps every point in its own 4-decimal cell.
    let lat = 50.0 + (i / side) as f64 * 0.0002;
    let lng = -1.0 + (i % side) as f64 * 0.0002;
    Coordinate::new(lat, lng)
}

fn bench_register(hit_count: usize, iterations: usize) {
    let side = (hit_count as f64).sqrt().ceil() as usize;
    let start = Instant::now();
    for _ in 0..iterations {
        let map = HazardHeatMap::new(&SessionConfig::default());
        for i in 0..hit_count {
            map.register_hit(black_box(-1), grid_point(i, side));
        }
        black_box(map.len());
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!(
        "  register ({hit_count} hits, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}"
    );
}

fn bench_decay(hit_count: usize, ticks: usize) {
    let side = (hit_count as f64).sqrt().ceil() as usize;
    let map = HazardHeatMap::new(&SessionConfig::default());
    for i in 0..hit_count {
        let code = (i % 3) as i32 - 1;
        map.register_hit(code, grid_point(i, side));
    }

    let start = Instant::now();
    for _ in 0..ticks {
        black_box(map.decay_tick());
    }
    let elapsed = start.elapsed();
    let per_tick = elapsed / ticks as u32;
    println!(
        "  decay_tick ({hit_count} hits, {ticks} ticks): {per_tick:?}/tick, total {elapsed:?}"
    );
}

fn bench_snapshot(entity_count: usize, iterations: usize) {
    let world = WorldState::new();
    for i in 0..entity_count {
        let loc = grid_point(i, 32);
        let _ = world.add_agent(agentspace_common::Agent::new(loc, 0.0));
        world.add_hazard_hit(0, loc);
    }

    let start = Instant::now();
    for _ in 0..iterations {
        black_box(world.snapshot());
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!(
        "  snapshot ({entity_count} entities, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}"
    );
}

fn main() {
    println!("=== Hazard Heat-Map Benchmarks ===\n");

    println!("Register:");
    bench_register(1_000, 100);
    bench_register(10_000, 10);

    println!("\nDecay:");
    bench_decay(1_000, 1_000);
    bench_decay(10_000, 100);

    println!("\nSnapshot:");
    bench_snapshot(100, 1_000);
    bench_snapshot(500, 200);
}
