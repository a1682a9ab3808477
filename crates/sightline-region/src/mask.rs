use sightline_grid::Cell;

/// Uncompressed boolean membership over a `width × height` grid, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VisibilityMask {
    width: usize,
    height: usize,
    cells: Vec<bool>,
}

impl VisibilityMask {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![false; width * height],
        }
    }

    pub fn from_cells<I>(width: usize, height: usize, cells: I) -> Self
    where
        I: IntoIterator<Item = Cell>,
    {
        let mut m = Self::new(width, height);
        for c in cells {
            m.set(c, true);
        }
        m
    }

    pub fn from_flags(width: usize, height: usize, cells: Vec<bool>) -> Self {
        debug_assert_eq!(cells.len(), width * height);
        Self {
            width,
            height,
            cells,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn get(&self, cell: Cell) -> bool {
        cell.x < self.width && cell.y < self.height && self.cells[cell.y * self.width + cell.x]
    }

    #[inline]
    pub fn get_linear(&self, idx: usize) -> bool {
        self.cells[idx]
    }

    #[inline]
    pub fn set(&mut self, cell: Cell, on: bool) {
        let i = cell.y * self.width + cell.x;
        self.cells[i] = on;
    }

    #[inline]
    pub fn set_linear(&mut self, idx: usize, on: bool) {
        self.cells[idx] = on;
    }

    pub fn count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        let w = self.width;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, on)| **on)
            .map(move |(i, _)| Cell::new(i % w, i / w))
    }

    pub fn as_flags(&self) -> &[bool] {
        &self.cells
    }
}
