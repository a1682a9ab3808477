use serde::{Deserialize, Serialize};

use crate::{Cell, ResistanceGrid};

/// Marker in the reverse table for curve positions that fall outside the grid.
pub const NO_CELL: u32 = u32::MAX;

/// Ordering used to lay grid cells out along one dimension for run-length packing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveKind {
    /// Hilbert curve over the bounding power-of-two square.
    #[default]
    Hilbert,
    /// Plain row-major order.
    Raster,
}

/// Precomputed bijection between linear cell indices and curve positions.
#[derive(Clone, Debug)]
pub struct CellIndex {
    kind: CurveKind,
    width: usize,
    height: usize,
    // linear index -> curve position
    to_curve: Box<[u16]>,
    // curve position -> linear index, NO_CELL outside the grid
    from_curve: Box<[u32]>,
}

impl CellIndex {
    pub fn new(kind: CurveKind, width: usize, height: usize) -> Self {
        debug_assert!(width > 0 && height > 0);
        debug_assert!(width <= crate::MAX_SIDE && height <= crate::MAX_SIDE);
        match kind {
            CurveKind::Hilbert => Self::hilbert(width, height),
            CurveKind::Raster => Self::raster(width, height),
        }
    }

    pub fn for_grid(kind: CurveKind, grid: &ResistanceGrid) -> Self {
        Self::new(kind, grid.width(), grid.height())
    }

    fn hilbert(width: usize, height: usize) -> Self {
        let side = width.max(height).next_power_of_two();
        let positions = side * side;
        let mut to_curve = vec![0u16; width * height].into_boxed_slice();
        let mut from_curve = vec![NO_CELL; positions].into_boxed_slice();
        for d in 0..positions {
            let (x, y) = hilbert_d2xy(side, d);
            if x < width && y < height {
                let linear = y * width + x;
                to_curve[linear] = d as u16;
                from_curve[d] = linear as u32;
            }
        }
        Self {
            kind: CurveKind::Hilbert,
            width,
            height,
            to_curve,
            from_curve,
        }
    }

    fn raster(width: usize, height: usize) -> Self {
        let n = width * height;
        Self {
            kind: CurveKind::Raster,
            width,
            height,
            to_curve: (0..n).map(|i| i as u16).collect(),
            from_curve: (0..n).map(|i| i as u32).collect(),
        }
    }

    #[inline]
    pub fn kind(&self) -> CurveKind {
        self.kind
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of curve positions, including any that fall outside the grid.
    #[inline]
    pub fn len(&self) -> usize {
        self.from_curve.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.from_curve.is_empty()
    }

    #[inline]
    pub fn to_curve(&self, x: usize, y: usize) -> u32 {
        u32::from(self.to_curve[y * self.width + x])
    }

    #[inline]
    pub fn curve_of(&self, cell: Cell) -> u32 {
        self.to_curve(cell.x, cell.y)
    }

    #[inline]
    pub fn curve_of_linear(&self, linear: usize) -> u32 {
        u32::from(self.to_curve[linear])
    }

    #[inline]
    pub fn linear_at(&self, pos: u32) -> Option<usize> {
        match self.from_curve.get(pos as usize) {
            Some(&l) if l != NO_CELL => Some(l as usize),
            _ => None,
        }
    }

    #[inline]
    pub fn from_curve(&self, pos: u32) -> Option<(usize, usize)> {
        self.linear_at(pos)
            .map(|l| (l % self.width, l / self.width))
    }

    #[inline]
    pub fn cell_at(&self, pos: u32) -> Option<Cell> {
        self.from_curve(pos).map(Cell::from)
    }

    pub fn heap_bytes(&self) -> usize {
        self.to_curve.len() * std::mem::size_of::<u16>()
            + self.from_curve.len() * std::mem::size_of::<u32>()
    }
}

// Classic iterative Hilbert d -> (x, y) for a square of side `n` (power of two).
fn hilbert_d2xy(n: usize, d: usize) -> (usize, usize) {
    let mut t = d;
    let (mut x, mut y) = (0usize, 0usize);
    let mut s = 1usize;
    while s < n {
        let rx = 1 & (t / 2);
        let ry = 1 & (t ^ rx);
        if ry == 0 {
            if rx == 1 {
                x = s - 1 - x;
                y = s - 1 - y;
            }
            std::mem::swap(&mut x, &mut y);
        }
        x += s * rx;
        y += s * ry;
        t /= 4;
        s *= 2;
    }
    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hilbert_first_quadrant_order() {
        // 2x2 curve visits (0,0) (0,1) (1,1) (1,0)
        assert_eq!(hilbert_d2xy(2, 0), (0, 0));
        assert_eq!(hilbert_d2xy(2, 1), (0, 1));
        assert_eq!(hilbert_d2xy(2, 2), (1, 1));
        assert_eq!(hilbert_d2xy(2, 3), (1, 0));
    }

    #[test]
    fn hilbert_steps_are_adjacent() {
        let n = 16;
        let mut prev = hilbert_d2xy(n, 0);
        for d in 1..n * n {
            let cur = hilbert_d2xy(n, d);
            let step = prev.0.abs_diff(cur.0) + prev.1.abs_diff(cur.1);
            assert_eq!(step, 1, "d={d}");
            prev = cur;
        }
    }

    #[test]
    fn non_square_grid_leaves_gaps() {
        let idx = CellIndex::new(CurveKind::Hilbert, 5, 3);
        assert_eq!(idx.len(), 64);
        let present = (0..idx.len() as u32)
            .filter(|&p| idx.linear_at(p).is_some())
            .count();
        assert_eq!(present, 15);
    }

    #[test]
    fn single_cell_grid() {
        let idx = CellIndex::new(CurveKind::Hilbert, 1, 1);
        assert_eq!(idx.len(), 1);
        assert_eq!(idx.to_curve(0, 0), 0);
        assert_eq!(idx.from_curve(0), Some((0, 0)));
    }
}
