use std::hint::black_box;
use std::time::Instant;

use gridspace_grid::{AreaOfInterest, Entity, EntityId, GridConfig, WorldGrid, WorldPoint};

#[derive(Clone)]
struct Mob(i64);

impl Entity for Mob {
    fn id(&self) -> EntityId {
        EntityId(self.0)
    }
}

fn make_grid(size: i32, cell: i32, entity_count: usize) -> WorldGrid<Mob> {
    let config = GridConfig::default()
        .with_world_size(size, size)
        .with_cell_size(cell, cell);
    let grid = WorldGrid::new(config).expect("valid bench config");
    let side = (entity_count as f64).sqrt().ceil() as usize;
    let spacing = (size as usize / side.max(1)).max(1);
    for i in 0..entity_count {
        let x = ((i % side) * spacing) as i32;
        let y = ((i / side) * spacing) as i32;
        if let Some(cell) = grid.cell_by_world_coord(x, y) {
            let _ = cell.add_entity(Mob(i as i64));
        }
    }
    grid
}

fn bench_build(size: i32, cell: i32, iterations: usize) {
    let config = GridConfig::default()
        .with_world_size(size, size)
        .with_cell_size(cell, cell);
    let start = Instant::now();
    for _ in 0..iterations {
        let _ = black_box(WorldGrid::<Mob>::new(black_box(config)));
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!("  build ({size}x{size}, cell {cell}, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}");
}

fn bench_range(entity_count: usize, radius: i32, iterations: usize) {
    let grid = make_grid(1000, 10, entity_count);
    let focus = WorldPoint::new(500, 500);
    let start = Instant::now();
    for _ in 0..iterations {
        let mut visited = 0usize;
        grid.range_entities(black_box(&focus), black_box(radius), |_| {
            visited += 1;
            Ok::<(), ()>(())
        });
        black_box(visited);
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!(
        "  range ({entity_count} entities, r={radius}, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}"
    );
}

fn bench_span(iterations: usize) {
    let grid = make_grid(1000, 10, 0);
    let src = WorldPoint::new(500, 500);
    let target = WorldPoint::new(530, 470);
    let start = Instant::now();
    for _ in 0..iterations {
        let _ = black_box(grid.cell_span(black_box(&src), black_box(&target)));
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!("  span ({iterations} iters): {per_iter:?}/iter, total {elapsed:?}");
}

fn bench_churn(iterations: usize) {
    let grid = make_grid(1000, 10, 0);
    let start = Instant::now();
    for i in 0..iterations {
        let x = (i % 1000) as i32;
        let from = grid.cell_by_world_coord(x, 0).expect("in world");
        let to = grid.cell_by_world_coord(x, 10).expect("in world");
        let id = i as i64;
        let _ = from.add_entity(Mob(id));
        from.remove_entity(EntityId(id));
        let _ = to.add_entity(Mob(id));
        to.remove_entity(EntityId(id));
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!("  re-home ({iterations} iters): {per_iter:?}/iter, total {elapsed:?}");
}

fn bench_view(iterations: usize) {
    let grid = make_grid(1000, 10, 0);
    let mut view = AreaOfInterest::new(3);
    let start = Instant::now();
    for i in 0..iterations {
        let x = ((i * 7) % 1000) as i32;
        let _ = black_box(view.update(&grid, &WorldPoint::new(x, 500)));
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!("  view update ({iterations} iters): {per_iter:?}/iter, total {elapsed:?}");
}

fn main() {
    println!("=== Grid Benchmarks ===\n");

    println!("Construction:");
    bench_build(100, 10, 1000);
    bench_build(1000, 10, 100);
    bench_build(1000, 4, 10);

    println!("\nNeighborhood query:");
    bench_range(1000, 1, 10000);
    bench_range(10000, 1, 10000);
    bench_range(10000, 3, 1000);

    println!("\nCell span:");
    bench_span(10000);

    println!("\nMembership churn:");
    bench_churn(100000);

    println!("\nView tracking:");
    bench_view(10000);

    println!("\n=== Done ===");
}
