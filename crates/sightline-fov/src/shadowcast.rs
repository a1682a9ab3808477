use std::sync::Arc;

use sightline_grid::{Cell, DistanceMetric, ResistanceGrid};
use sightline_region::VisibilityMask;

// Octant transforms (xx, xy, yx, yy): two per diagonal direction.
const OCTANTS: [(i32, i32, i32, i32); 8] = [
    (0, -1, -1, 0),
    (-1, 0, 0, -1),
    (0, 1, -1, 0),
    (1, 0, 0, -1),
    (0, -1, 1, 0),
    (-1, 0, 0, 1),
    (0, 1, 1, 0),
    (1, 0, 0, 1),
];

/// A visible cell and the smallest radius at which it is included.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct LitCell {
    pub idx: usize,
    pub ring: u32,
}

#[derive(Clone, Copy, Debug)]
struct Span {
    row: u32,
    start: f64,
    end: f64,
}

/// Recursive shadow casting over a resistance grid, driven by an explicit
/// span stack so depth does not grow with the radius.
#[derive(Clone, Debug)]
pub struct ShadowcastEngine {
    grid: Arc<ResistanceGrid>,
    metric: DistanceMetric,
}

impl ShadowcastEngine {
    pub fn new(grid: Arc<ResistanceGrid>, metric: DistanceMetric) -> Self {
        Self { grid, metric }
    }

    #[inline]
    pub fn grid(&self) -> &ResistanceGrid {
        &self.grid
    }

    #[inline]
    pub fn shared_grid(&self) -> Arc<ResistanceGrid> {
        Arc::clone(&self.grid)
    }

    #[inline]
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Every non-wall cell visible from `origin` within `radius`, each listed once.
    ///
    /// Walls stop sight at any depth short of `radius` whether or not they are
    /// inside the metric circle, so the result for a smaller radius is exactly
    /// this result filtered by `ring`.
    pub fn scan(&self, origin: Cell, radius: u32) -> Vec<LitCell> {
        let grid = &*self.grid;
        if !grid.contains(origin) || grid.is_wall(origin) {
            return Vec::new();
        }
        let ox = origin.x as i32;
        let oy = origin.y as i32;
        let r = radius as i32;
        let side = (2 * r + 1) as usize;
        let mut seen = vec![false; side * side];
        let mut out = Vec::new();

        let mut emit = |wx: i32, wy: i32, idx: usize| {
            let (dx, dy) = (wx - ox, wy - oy);
            let ring = self.metric.ring(dx, dy);
            if ring > radius {
                return;
            }
            let s = (dy + r) as usize * side + (dx + r) as usize;
            if !seen[s] {
                seen[s] = true;
                out.push(LitCell { idx, ring });
            }
        };

        emit(ox, oy, grid.idx(origin.x, origin.y));

        let mut stack: Vec<Span> = Vec::new();
        for &(xx, xy, yx, yy) in OCTANTS.iter() {
            stack.push(Span {
                row: 1,
                start: 1.0,
                end: 0.0,
            });
            while let Some(Span {
                row,
                mut start,
                end,
            }) = stack.pop()
            {
                if start < end {
                    continue;
                }
                let mut new_start = 0.0;
                let mut blocked = false;
                let mut distance = row;
                while distance <= radius && !blocked {
                    let dy = -(distance as i32);
                    for dx in dy..=0 {
                        let cx = ox + dx * xx + dy * xy;
                        let cy = oy + dx * yx + dy * yy;
                        let left = (f64::from(dx) - 0.5) / (f64::from(dy) + 0.5);
                        let right = (f64::from(dx) + 0.5) / (f64::from(dy) - 0.5);
                        let Some(idx) = grid.idx_signed(cx, cy) else {
                            continue;
                        };
                        if start < right {
                            continue;
                        }
                        if end > left {
                            break;
                        }
                        let opaque = grid.is_wall_idx(idx);
                        if !opaque {
                            emit(cx, cy, idx);
                        }
                        if blocked {
                            if opaque {
                                new_start = right;
                            } else {
                                blocked = false;
                                start = new_start;
                            }
                        } else if opaque && distance < radius {
                            blocked = true;
                            stack.push(Span {
                                row: distance + 1,
                                start,
                                end: left,
                            });
                            new_start = right;
                        }
                    }
                    distance += 1;
                }
            }
        }
        out
    }

    pub fn compute_visibility(&self, origin: Cell, radius: u32) -> VisibilityMask {
        let mut mask = VisibilityMask::new(self.grid.width(), self.grid.height());
        for lit in self.scan(origin, radius) {
            mask.set_linear(lit.idx, true);
        }
        mask
    }
}
