use std::sync::Arc;

use sightline_grid::Cell;
use sightline_region::{PackedRegion, VisibilityMask};

use crate::snapshot::CacheSnapshot;
use crate::{VisibilityCache, VisibilityError};

impl VisibilityCache {
    fn checked_snapshot(&self, cells: &[Cell]) -> Result<Arc<CacheSnapshot>, VisibilityError> {
        let snap = self.inner.snapshot()?;
        for &c in cells {
            if !snap.grid().contains(c) {
                return Err(VisibilityError::OutOfBounds { x: c.x, y: c.y });
            }
        }
        Ok(snap)
    }

    fn check_radius(&self, radius: u32) -> Result<(), VisibilityError> {
        let max = self.config().max_radius;
        if radius > max {
            return Err(VisibilityError::RadiusTooLarge { radius, max });
        }
        Ok(())
    }

    /// Packed visibility of `cell` at `radius`.
    pub fn region(&self, cell: Cell, radius: u32) -> Result<PackedRegion, VisibilityError> {
        self.check_radius(radius)?;
        let snap = self.checked_snapshot(&[cell])?;
        Ok(snap.region(cell, radius))
    }

    /// Packed line of sight of `cell` at the LOS radius.
    pub fn los_region(&self, cell: Cell) -> Result<PackedRegion, VisibilityError> {
        let snap = self.checked_snapshot(&[cell])?;
        Ok(snap.los_region(cell))
    }

    /// True if either cell sees the other within `radius`.
    pub fn is_visible(&self, radius: u32, viewer: Cell, target: Cell) -> Result<bool, VisibilityError> {
        self.check_radius(radius)?;
        let snap = self.checked_snapshot(&[viewer, target])?;
        let codec = snap.packer.codec();
        Ok(codec.contains(&snap.region(viewer, radius), target)
            || codec.contains(&snap.region(target, radius), viewer))
    }

    /// True if either cell has line of sight to the other.
    pub fn query_los(&self, viewer: Cell, target: Cell) -> Result<bool, VisibilityError> {
        let snap = self.checked_snapshot(&[viewer, target])?;
        Ok(los_between(&snap, viewer, target))
    }

    /// Cells whose centres lie within one unit of the segment `start`-`end`
    /// and that `start` has line of sight to. Empty when `end` is not in line
    /// of sight. Unordered.
    pub fn line_of_sight(&self, start: Cell, end: Cell) -> Result<Vec<Cell>, VisibilityError> {
        let snap = self.checked_snapshot(&[start, end])?;
        if !los_between(&snap, start, end) {
            return Ok(Vec::new());
        }
        let grid = snap.grid();
        let codec = snap.packer.codec();
        let from = snap.los_region(start);
        let (x_lo, x_hi) = (start.x.min(end.x), start.x.max(end.x));
        let (y_lo, y_hi) = (start.y.min(end.y), start.y.max(end.y));
        let mut out = Vec::new();
        for y in y_lo.saturating_sub(1)..=(y_hi + 1).min(grid.height() - 1) {
            for x in x_lo.saturating_sub(1)..=(x_hi + 1).min(grid.width() - 1) {
                let c = Cell::new(x, y);
                if segment_distance_sq(c, start, end) > 1.0 {
                    continue;
                }
                if c == end || codec.contains(&from, c) {
                    out.push(c);
                }
            }
        }
        Ok(out)
    }

    /// [`VisibilityCache::line_of_sight`] ordered by distance from `start`.
    pub fn line_of_sight_sorted(&self, start: Cell, end: Cell) -> Result<Vec<Cell>, VisibilityError> {
        let mut cells = self.line_of_sight(start, end)?;
        cells.sort_by_key(|&c| (c.distance_sq(start), c.y, c.x));
        Ok(cells)
    }

    /// Running union of what is seen at each step of `path`.
    pub fn path_cumulative_visibility(
        &self,
        path: &[Cell],
        radius: u32,
    ) -> Result<Vec<PackedRegion>, VisibilityError> {
        self.check_radius(radius)?;
        let snap = self.checked_snapshot(path)?;
        let mut acc = PackedRegion::empty();
        let mut out = Vec::with_capacity(path.len());
        for &step in path {
            acc = acc.union(&snap.region(step, radius));
            out.push(acc.clone());
        }
        Ok(out)
    }

    /// Union of what every member sees at its own radius.
    pub fn team_visibility(&self, members: &[(Cell, u32)]) -> Result<PackedRegion, VisibilityError> {
        for &(_, r) in members {
            self.check_radius(r)?;
        }
        let cells: Vec<Cell> = members.iter().map(|&(c, _)| c).collect();
        let snap = self.checked_snapshot(&cells)?;
        let regions: Vec<PackedRegion> = members
            .iter()
            .map(|&(c, r)| snap.region(c, r))
            .collect();
        Ok(PackedRegion::union_all(&regions))
    }

    pub fn unpack(&self, region: &PackedRegion) -> Result<VisibilityMask, VisibilityError> {
        Ok(self.inner.snapshot()?.packer.codec().unpack(region))
    }

    pub fn cells(&self, region: &PackedRegion) -> Result<Vec<Cell>, VisibilityError> {
        Ok(self.inner.snapshot()?.packer.codec().cells(region))
    }

    pub fn contains(&self, region: &PackedRegion, cell: Cell) -> Result<bool, VisibilityError> {
        let snap = self.checked_snapshot(&[cell])?;
        Ok(snap.packer.codec().contains(region, cell))
    }

    /// Approximate bytes held by the published snapshot. Zero once destroyed.
    pub fn approximate_memory_usage(&self) -> usize {
        self.inner
            .snapshot()
            .map_or(0, |snap| snap.memory_usage())
    }
}

fn los_between(snap: &CacheSnapshot, a: Cell, b: Cell) -> bool {
    let codec = snap.packer.codec();
    codec.contains(&snap.los_region(a), b) || codec.contains(&snap.los_region(b), a)
}

fn segment_distance_sq(p: Cell, a: Cell, b: Cell) -> f64 {
    let (px, py) = (p.x as f64, p.y as f64);
    let (ax, ay) = (a.x as f64, a.y as f64);
    let (dx, dy) = (b.x as f64 - ax, b.y as f64 - ay);
    let len2 = dx * dx + dy * dy;
    let t = if len2 == 0.0 {
        0.0
    } else {
        (((px - ax) * dx + (py - ay) * dy) / len2).clamp(0.0, 1.0)
    };
    let (cx, cy) = (ax + t * dx, ay + t * dy);
    (px - cx) * (px - cx) + (py - cy) * (py - cy)
}
