use std::mem;
use std::sync::Arc;

use hashbrown::HashSet;
use sightline_fov::{FovEntry, MultiRadiusPacker};
use sightline_grid::{Cell, ResistanceGrid};
use sightline_region::PackedRegion;

/// Precomputation phase. Ordered so `stage >= Stage::RawComplete` means cached
/// data is available.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Uninitialized,
    RawComputing,
    RawComplete,
    QualityComputing,
    QualityComplete,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Uninitialized => "uninitialized",
            Stage::RawComputing => "raw-computing",
            Stage::RawComplete => "raw-complete",
            Stage::QualityComputing => "quality-computing",
            Stage::QualityComplete => "quality-complete",
        }
    }
}

/// One fully published generation of cached data. Never mutated; a wave
/// builds a new one and swaps it in whole.
pub(crate) struct CacheSnapshot {
    pub stage: Stage,
    pub version: u64,
    pub packer: MultiRadiusPacker,
    pub walls: PackedRegion,
    pub raw_fov: Arc<[FovEntry]>,
    pub fov: Arc<[FovEntry]>,
    pub los: Arc<[PackedRegion]>,
    pub light_reach: PackedRegion,
}

impl CacheSnapshot {
    pub fn initial(packer: MultiRadiusPacker) -> Self {
        let walls = wall_region(&packer);
        Self {
            stage: Stage::Uninitialized,
            version: 0,
            packer,
            walls,
            raw_fov: Arc::from(Vec::new()),
            fov: Arc::from(Vec::new()),
            los: Arc::from(Vec::new()),
            light_reach: PackedRegion::empty(),
        }
    }

    /// Same stage and data, scanning a different grid. Only valid before any
    /// data has been cached.
    pub fn with_grid(&self, grid: Arc<ResistanceGrid>) -> Self {
        debug_assert!(self.stage < Stage::RawComplete);
        let mut next = Self::initial(self.packer.with_grid(grid));
        next.version = self.version + 1;
        next
    }

    #[inline]
    pub fn grid(&self) -> &ResistanceGrid {
        self.packer.engine().grid()
    }

    #[inline]
    pub fn is_cached(&self) -> bool {
        self.stage >= Stage::RawComplete
    }

    /// Visibility region at `radius`, falling back to a direct scan until the
    /// raw wave has been published.
    pub fn region(&self, cell: Cell, radius: u32) -> PackedRegion {
        if self.is_cached() {
            let idx = self.grid().idx(cell.x, cell.y);
            self.fov[idx][radius as usize].clone()
        } else {
            self.packer.pack_reach(cell, radius)
        }
    }

    pub fn los_region(&self, cell: Cell) -> PackedRegion {
        if self.is_cached() {
            self.los[self.grid().idx(cell.x, cell.y)].clone()
        } else {
            self.packer.pack_los(cell)
        }
    }

    /// Bytes held by tables and packed regions. Storage shared between entries
    /// (wall sentinel, empty region, regions reused across stages) counts once.
    pub fn memory_usage(&self) -> usize {
        let mut seen_entries = HashSet::new();
        let mut seen_regions = HashSet::new();
        let mut total = self.grid().len() * mem::size_of::<f32>()
            + self.packer.codec().index().heap_bytes();

        let mut count_region = |r: &PackedRegion, total: &mut usize| {
            if seen_regions.insert(r.storage_key()) {
                *total += r.heap_bytes();
            }
        };

        let quality: &[FovEntry] = if Arc::ptr_eq(&self.raw_fov, &self.fov) {
            &[]
        } else {
            &self.fov
        };
        for entry in self.raw_fov.iter().chain(quality) {
            total += mem::size_of::<FovEntry>();
            if !seen_entries.insert(Arc::as_ptr(entry) as *const PackedRegion as usize) {
                continue;
            }
            total += entry.len() * mem::size_of::<PackedRegion>();
            for r in entry.iter() {
                count_region(r, &mut total);
            }
        }
        for r in self.los.iter() {
            total += mem::size_of::<PackedRegion>();
            count_region(r, &mut total);
        }
        count_region(&self.walls, &mut total);
        count_region(&self.light_reach, &mut total);
        total
    }
}

pub(crate) fn wall_region(packer: &MultiRadiusPacker) -> PackedRegion {
    let grid = packer.engine().grid();
    packer.codec().pack_cells(grid.wall_cells())
}
