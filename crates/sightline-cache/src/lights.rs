use hashbrown::HashMap;
use sightline_fov::MultiRadiusPacker;
use sightline_grid::{Cell, ResistanceGrid};
use sightline_region::PackedRegion;

use crate::LightSpec;

/// Light sources keyed by cell, each with the radius it illuminates. A light
/// on a wall stays in the table and shines once its cell is opened.
#[derive(Clone, Debug, Default)]
pub struct LightTable {
    lights: HashMap<Cell, u32>,
}

impl LightTable {
    /// Drops lights outside the grid and clamps radii to `max_radius`. A cell
    /// listed twice keeps its brightest radius.
    pub fn new(specs: &[LightSpec], grid: &ResistanceGrid, max_radius: u32) -> Self {
        let mut lights = HashMap::with_capacity(specs.len());
        for s in specs {
            let cell = Cell::new(s.x, s.y);
            if !grid.contains(cell) {
                log::warn!(target: "lights", "light at {cell} is outside the grid; dropped");
                continue;
            }
            if grid.is_wall(cell) {
                log::debug!(target: "lights", "light at {cell} is on a wall; dark until opened");
            }
            let radius = s.radius.min(max_radius);
            let slot = lights.entry(cell).or_insert(radius);
            *slot = (*slot).max(radius);
        }
        Self { lights }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.lights.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    pub fn get(&self, cell: Cell) -> Option<u32> {
        self.lights.get(&cell).copied()
    }

    /// Number of lights whose cell is open on `grid`.
    pub fn active(&self, grid: &ResistanceGrid) -> usize {
        self.lights.keys().filter(|&&c| !grid.is_wall(c)).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Cell, u32)> + '_ {
        self.lights.iter().map(|(&c, &r)| (c, r))
    }

    /// Every open cell lit by at least one light on the packer's grid. A light
    /// whose cell has since become a wall contributes nothing.
    pub fn reach(&self, packer: &MultiRadiusPacker) -> PackedRegion {
        self.lights
            .iter()
            .map(|(&cell, &radius)| packer.pack_reach(cell, radius))
            .fold(PackedRegion::empty(), |acc, r| acc.union(&r))
    }
}
