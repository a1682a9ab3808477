use std::fmt::Write as _;

use sightline_cache::{Cell, PackedRegion, ResistanceGrid, VisibilityCache, VisibilityError};

/// Per-cache summary printed after precomputation.
pub fn summary(cache: &VisibilityCache) -> Result<String, VisibilityError> {
    let grid = cache.grid()?;
    let cfg = cache.config();
    let mut regions = 0usize;
    let mut cells = 0usize;
    let mut runs = 0usize;
    let mut widest = 0usize;
    for i in 0..grid.len() {
        let c = grid.cell_of(i);
        if grid.is_wall(c) {
            continue;
        }
        let r = cache.region(c, cfg.max_radius)?;
        regions += 1;
        cells += r.len();
        runs += r.run_count();
        widest = widest.max(r.len());
    }
    let mean = |n: usize| if regions == 0 { 0.0 } else { n as f64 / regions as f64 };

    let mut out = String::new();
    let _ = writeln!(out, "grid          {}x{} ({} open)", grid.width(), grid.height(), grid.walkable_count());
    let _ = writeln!(
        out,
        "radius        {} (los {}), {} metric, {:?} curve",
        cfg.max_radius,
        cfg.max_los_radius,
        cfg.metric.name(),
        cfg.curve
    );
    let _ = writeln!(out, "stage         {}", cache.stage().name());
    let _ = writeln!(
        out,
        "lights        {} ({} lit)",
        cache.lights().len(),
        cache.lights().active(&grid)
    );
    let _ = writeln!(out, "visible/cell  {:.1} (max {})", mean(cells), widest);
    let _ = writeln!(out, "runs/region   {:.1}", mean(runs));
    let _ = writeln!(out, "memory        {} KiB", cache.approximate_memory_usage() / 1024);
    Ok(out)
}

/// ASCII view of the grid: `#` wall, `*` in region, `.` other floor, plus
/// any marked cells drawn over the top.
pub fn render(grid: &ResistanceGrid, seen: &[Cell], marks: &[(Cell, char)]) -> String {
    let mut canvas: Vec<Vec<char>> = (0..grid.height())
        .map(|y| {
            (0..grid.width())
                .map(|x| if grid.is_wall(Cell::new(x, y)) { '#' } else { '.' })
                .collect()
        })
        .collect();
    for c in seen {
        canvas[c.y][c.x] = '*';
    }
    for &(c, ch) in marks {
        canvas[c.y][c.x] = ch;
    }
    let mut out = String::with_capacity(grid.len() + grid.height());
    for row in canvas {
        out.extend(row);
        out.push('\n');
    }
    out
}

pub fn render_region(
    cache: &VisibilityCache,
    region: &PackedRegion,
    marks: &[(Cell, char)],
) -> Result<String, VisibilityError> {
    let grid = cache.grid()?;
    Ok(render(&grid, &cache.cells(region)?, marks))
}
