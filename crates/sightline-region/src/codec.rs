use std::sync::Arc;

use sightline_grid::{Cell, CellIndex, CurveKind, ResistanceGrid};

use crate::{PackedRegion, RunBuilder, VisibilityMask};

/// Packs and unpacks cell sets using one grid's curve ordering.
#[derive(Clone, Debug)]
pub struct RegionCodec {
    index: Arc<CellIndex>,
}

impl RegionCodec {
    pub fn new(index: Arc<CellIndex>) -> Self {
        Self { index }
    }

    pub fn for_grid(kind: CurveKind, grid: &ResistanceGrid) -> Self {
        Self::new(Arc::new(CellIndex::for_grid(kind, grid)))
    }

    #[inline]
    pub fn index(&self) -> &CellIndex {
        &self.index
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.index.width()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.index.height()
    }

    #[inline]
    pub fn position(&self, cell: Cell) -> u32 {
        self.index.curve_of(cell)
    }

    /// Walks every curve position in order. Cost is proportional to grid area;
    /// prefer [`RegionCodec::pack_cells`] for sparse sets.
    pub fn pack(&self, mask: &VisibilityMask) -> PackedRegion {
        debug_assert_eq!(mask.width(), self.width());
        debug_assert_eq!(mask.height(), self.height());
        let mut b = RunBuilder::new();
        for pos in 0..self.index.len() as u32 {
            let present = self
                .index
                .linear_at(pos)
                .is_some_and(|l| mask.get_linear(l));
            b.push(present, 1);
        }
        b.finish()
    }

    pub fn pack_cells<I>(&self, cells: I) -> PackedRegion
    where
        I: IntoIterator<Item = Cell>,
    {
        self.pack_positions(cells.into_iter().map(|c| self.index.curve_of(c)).collect())
    }

    pub fn pack_linear<I>(&self, cells: I) -> PackedRegion
    where
        I: IntoIterator<Item = usize>,
    {
        self.pack_positions(
            cells
                .into_iter()
                .map(|l| self.index.curve_of_linear(l))
                .collect(),
        )
    }

    pub fn pack_positions(&self, mut positions: Vec<u32>) -> PackedRegion {
        positions.sort_unstable();
        positions.dedup();
        let mut b = RunBuilder::new();
        for p in positions {
            b.push_position(p);
        }
        b.finish()
    }

    /// Packs `count` nested regions in one pass.
    ///
    /// Each entry is a curve position and the lowest level at which it becomes
    /// present; region `k` holds every position whose level is `<= k`, so
    /// `regions[k] ⊆ regions[k + 1]`. Duplicate positions keep their lowest
    /// level. Levels at or above `count` are never present.
    pub fn pack_levels(&self, mut entries: Vec<(u32, u32)>, count: usize) -> Vec<PackedRegion> {
        entries.sort_unstable();
        entries.dedup_by_key(|e| e.0);
        let mut builders: Vec<RunBuilder> = (0..count).map(|_| RunBuilder::new()).collect();
        for (pos, level) in entries {
            for b in builders.iter_mut().skip(level as usize) {
                b.push_position(pos);
            }
        }
        builders.into_iter().map(RunBuilder::finish).collect()
    }

    pub fn unpack(&self, region: &PackedRegion) -> VisibilityMask {
        let mut mask = VisibilityMask::new(self.width(), self.height());
        for pos in region.positions() {
            if let Some(l) = self.index.linear_at(pos) {
                mask.set_linear(l, true);
            }
        }
        mask
    }

    pub fn cells(&self, region: &PackedRegion) -> Vec<Cell> {
        region
            .positions()
            .filter_map(|p| self.index.cell_at(p))
            .collect()
    }

    #[inline]
    pub fn contains(&self, region: &PackedRegion, cell: Cell) -> bool {
        region.contains(self.index.curve_of(cell))
    }
}
