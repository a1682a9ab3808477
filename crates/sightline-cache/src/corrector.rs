use sightline_fov::{FovEntry, MultiRadiusPacker};
use sightline_grid::Cell;
use sightline_region::PackedRegion;

/// Repairs the asymmetry of raw shadow casting and folds in distant lights.
///
/// For an origin `o` and radius `r` the corrected region holds
/// - every cell of the raw region at `r`,
/// - every open `b` with `ring(b - o) <= r` whose raw region at the maximum
///   radius contains `o`,
/// - every lit cell `o` has line of sight to, at all radii,
///
/// minus every cell of the wall bitmap.
///
/// Reads many raw slots and writes none; results go to a separate array.
pub struct Corrector<'a> {
    packer: &'a MultiRadiusPacker,
    raw: &'a [FovEntry],
    los: &'a [PackedRegion],
    light_reach: &'a PackedRegion,
    walls: &'a PackedRegion,
}

impl<'a> Corrector<'a> {
    pub fn new(
        packer: &'a MultiRadiusPacker,
        raw: &'a [FovEntry],
        los: &'a [PackedRegion],
        light_reach: &'a PackedRegion,
        walls: &'a PackedRegion,
    ) -> Self {
        debug_assert_eq!(raw.len(), packer.engine().grid().len());
        debug_assert_eq!(los.len(), raw.len());
        Self {
            packer,
            raw,
            los,
            light_reach,
            walls,
        }
    }

    pub fn improve(&self, origin: Cell) -> FovEntry {
        if self.packer.engine().grid().is_wall(origin) {
            return self.packer.all_wall().clone();
        }
        let count = self.packer.max_radius() as usize + 1;
        self.packer
            .codec()
            .pack_levels(self.levels(origin), count)
            .into_iter()
            .map(|r| r.difference(self.walls))
            .collect()
    }

    pub fn improve_at(&self, origin: Cell, radius: u32) -> PackedRegion {
        if self.packer.engine().grid().is_wall(origin) {
            return PackedRegion::empty();
        }
        let positions = self
            .levels(origin)
            .into_iter()
            .filter(|&(_, level)| level <= radius)
            .map(|(pos, _)| pos)
            .collect();
        self.packer
            .codec()
            .pack_positions(positions)
            .difference(self.walls)
    }

    // (curve position, lowest radius it is visible at) for every candidate cell.
    fn levels(&self, origin: Cell) -> Vec<(u32, u32)> {
        let engine = self.packer.engine();
        let grid = engine.grid();
        let metric = engine.metric();
        let index = self.packer.codec().index();
        let max = self.packer.max_radius();
        let o_idx = grid.idx(origin.x, origin.y);
        let o_pos = index.curve_of_linear(o_idx);
        let ring_to = |c: Cell| metric.ring(c.x as i32 - origin.x as i32, c.y as i32 - origin.y as i32);

        let mut entries = Vec::new();
        for pos in self.raw[o_idx][max as usize].positions() {
            if let Some(c) = index.cell_at(pos) {
                entries.push((pos, ring_to(c)));
            }
        }

        let reach = max as usize;
        let x_hi = (origin.x + reach).min(grid.width() - 1);
        let y_hi = (origin.y + reach).min(grid.height() - 1);
        for y in origin.y.saturating_sub(reach)..=y_hi {
            for x in origin.x.saturating_sub(reach)..=x_hi {
                let b = grid.idx(x, y);
                if b == o_idx || grid.is_wall_idx(b) {
                    continue;
                }
                let ring = ring_to(Cell::new(x, y));
                if ring <= max && self.raw[b][max as usize].contains(o_pos) {
                    entries.push((index.curve_of_linear(b), ring));
                }
            }
        }

        if !self.light_reach.is_empty() {
            let lit = self.light_reach.intersection(&self.los[o_idx]);
            entries.extend(lit.positions().map(|pos| (pos, 0)));
        }
        entries
    }
}
