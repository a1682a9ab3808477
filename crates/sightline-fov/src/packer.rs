use std::sync::Arc;

use sightline_grid::{Cell, ResistanceGrid};
use sightline_region::{PackedRegion, RegionCodec};

use crate::ShadowcastEngine;

/// Packed visibility of one origin, indexed by radius `0..=max_radius`.
pub type FovEntry = Arc<[PackedRegion]>;

/// Turns one shadow-cast scan per origin into a full set of nested,
/// per-radius packed regions.
#[derive(Clone, Debug)]
pub struct MultiRadiusPacker {
    engine: ShadowcastEngine,
    codec: RegionCodec,
    max_radius: u32,
    max_los_radius: u32,
    all_wall: FovEntry,
}

impl MultiRadiusPacker {
    pub fn new(
        engine: ShadowcastEngine,
        codec: RegionCodec,
        max_radius: u32,
        max_los_radius: u32,
    ) -> Self {
        let all_wall: FovEntry = (0..=max_radius).map(|_| PackedRegion::empty()).collect();
        Self {
            engine,
            codec,
            max_radius,
            max_los_radius,
            all_wall,
        }
    }

    /// Same codec, radii and wall sentinel, scanning a different grid.
    pub fn with_grid(&self, grid: Arc<ResistanceGrid>) -> Self {
        Self {
            engine: ShadowcastEngine::new(grid, self.engine.metric()),
            codec: self.codec.clone(),
            max_radius: self.max_radius,
            max_los_radius: self.max_los_radius,
            all_wall: Arc::clone(&self.all_wall),
        }
    }

    #[inline]
    pub fn engine(&self) -> &ShadowcastEngine {
        &self.engine
    }

    #[inline]
    pub fn codec(&self) -> &RegionCodec {
        &self.codec
    }

    #[inline]
    pub fn max_radius(&self) -> u32 {
        self.max_radius
    }

    #[inline]
    pub fn max_los_radius(&self) -> u32 {
        self.max_los_radius
    }

    /// The shared entry handed to every wall origin.
    #[inline]
    pub fn all_wall(&self) -> &FovEntry {
        &self.all_wall
    }

    #[inline]
    pub fn is_all_wall(&self, entry: &FovEntry) -> bool {
        Arc::ptr_eq(entry, &self.all_wall)
    }

    pub fn pack_origin(&self, origin: Cell) -> FovEntry {
        if self.engine.grid().is_wall(origin) {
            return Arc::clone(&self.all_wall);
        }
        let index = self.codec.index();
        let entries = self
            .engine
            .scan(origin, self.max_radius)
            .into_iter()
            .map(|lit| (index.curve_of_linear(lit.idx), lit.ring))
            .collect();
        self.codec
            .pack_levels(entries, self.max_radius as usize + 1)
            .into()
    }

    pub fn pack_los(&self, origin: Cell) -> PackedRegion {
        self.pack_reach(origin, self.max_los_radius)
    }

    /// A single packed region at an arbitrary radius.
    pub fn pack_reach(&self, origin: Cell, radius: u32) -> PackedRegion {
        self.codec.pack_linear(
            self.engine
                .scan(origin, radius)
                .into_iter()
                .map(|lit| lit.idx),
        )
    }
}
