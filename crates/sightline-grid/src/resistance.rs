use crate::Cell;

/// Largest supported side length; curve positions must fit in a `u16`.
pub const MAX_SIDE: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    Empty,
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
    TooLarge {
        width: usize,
        height: usize,
        max: usize,
    },
    SizeMismatch {
        expected: usize,
        found: usize,
    },
}

impl std::fmt::Display for GridError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GridError::Empty => write!(f, "grid has no cells"),
            GridError::Ragged {
                row,
                expected,
                found,
            } => write!(
                f,
                "row {} has {} cells, expected {}",
                row, found, expected
            ),
            GridError::TooLarge { width, height, max } => {
                write!(f, "grid {}x{} exceeds the {}-cell side limit", width, height, max)
            }
            GridError::SizeMismatch { expected, found } => {
                write!(f, "expected {} opacity values, got {}", expected, found)
            }
        }
    }
}

impl std::error::Error for GridError {}

/// Per-cell opacity. 0 is fully transparent, anything >= 1 is a wall.
#[derive(Clone, Debug, PartialEq)]
pub struct ResistanceGrid {
    width: usize,
    height: usize,
    resistance: Vec<f32>,
}

impl ResistanceGrid {
    pub fn from_resistance(
        width: usize,
        height: usize,
        resistance: Vec<f32>,
    ) -> Result<Self, GridError> {
        if width == 0 || height == 0 {
            return Err(GridError::Empty);
        }
        if width > MAX_SIDE || height > MAX_SIDE {
            return Err(GridError::TooLarge {
                width,
                height,
                max: MAX_SIDE,
            });
        }
        if resistance.len() != width * height {
            return Err(GridError::SizeMismatch {
                expected: width * height,
                found: resistance.len(),
            });
        }
        let resistance = resistance
            .into_iter()
            .map(|r| if r.is_nan() { 1.0 } else { r.clamp(0.0, 1.0) })
            .collect();
        Ok(Self {
            width,
            height,
            resistance,
        })
    }

    /// Row-major wall flags, `true` meaning wall.
    pub fn from_walls(width: usize, height: usize, walls: &[bool]) -> Result<Self, GridError> {
        let resistance = walls.iter().map(|&w| if w { 1.0 } else { 0.0 }).collect();
        Self::from_resistance(width, height, resistance)
    }

    pub fn from_rows(rows: &[Vec<bool>]) -> Result<Self, GridError> {
        let height = rows.len();
        let width = rows.first().map(Vec::len).unwrap_or(0);
        let mut walls = Vec::with_capacity(width * height);
        for (row, cells) in rows.iter().enumerate() {
            if cells.len() != width {
                return Err(GridError::Ragged {
                    row,
                    expected: width,
                    found: cells.len(),
                });
            }
            walls.extend_from_slice(cells);
        }
        Self::from_walls(width, height, &walls)
    }

    /// Parses a map drawn with `#` (wall) and `+` (closed door); every other
    /// glyph is floor. Blank lines are ignored.
    pub fn parse_ascii(text: &str) -> Result<Self, GridError> {
        let rows: Vec<Vec<bool>> = text
            .lines()
            .map(|l| l.trim_end_matches('\r'))
            .filter(|l| !l.is_empty())
            .map(|l| l.chars().map(|c| c == '#' || c == '+').collect())
            .collect();
        Self::from_rows(&rows)
    }

    /// An open room of the given size with no walls at all.
    pub fn open(width: usize, height: usize) -> Result<Self, GridError> {
        Self::from_resistance(width, height, vec![0.0; width * height])
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
    pub fn len(&self) -> usize {
        self.resistance.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.resistance.is_empty()
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    #[inline]
    pub fn cell_of(&self, idx: usize) -> Cell {
        Cell::new(idx % self.width, idx / self.width)
    }

    #[inline]
    pub fn contains(&self, cell: Cell) -> bool {
        cell.x < self.width && cell.y < self.height
    }

    /// Linear index of a signed coordinate, or `None` when outside the grid.
    #[inline]
    pub fn idx_signed(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(self.idx(x as usize, y as usize))
    }

    #[inline]
    pub fn resistance(&self, x: usize, y: usize) -> f32 {
        self.resistance[self.idx(x, y)]
    }

    #[inline]
    pub fn is_wall_idx(&self, idx: usize) -> bool {
        self.resistance[idx] >= 1.0
    }

    #[inline]
    pub fn is_wall(&self, cell: Cell) -> bool {
        self.is_wall_idx(self.idx(cell.x, cell.y))
    }

    pub fn walkable_count(&self) -> usize {
        self.resistance.iter().filter(|&&r| r < 1.0).count()
    }

    pub fn wall_cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.len())
            .filter(|&i| self.is_wall_idx(i))
            .map(|i| self.cell_of(i))
    }

    /// Linear indices whose opacity differs between the two grids.
    /// Both grids must share dimensions; returns `None` otherwise.
    pub fn changed_cells(&self, other: &ResistanceGrid) -> Option<Vec<usize>> {
        if self.width != other.width || self.height != other.height {
            return None;
        }
        Some(
            self.resistance
                .iter()
                .zip(&other.resistance)
                .enumerate()
                .filter(|(_, (a, b))| a != b)
                .map(|(i, _)| i)
                .collect(),
        )
    }

    /// Returns a copy with one cell's opacity replaced.
    pub fn with_resistance(&self, cell: Cell, resistance: f32) -> Self {
        let mut next = self.clone();
        let i = self.idx(cell.x, cell.y);
        next.resistance[i] = resistance.clamp(0.0, 1.0);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ascii_marks_walls_and_doors() {
        let g = ResistanceGrid::parse_ascii("#.#\n.+.\n...\n").unwrap();
        assert_eq!((g.width(), g.height()), (3, 3));
        assert!(g.is_wall(Cell::new(0, 0)));
        assert!(!g.is_wall(Cell::new(1, 0)));
        assert!(g.is_wall(Cell::new(1, 1)));
        assert_eq!(g.walkable_count(), 6);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = ResistanceGrid::parse_ascii("...\n..\n").unwrap_err();
        assert_eq!(
            err,
            GridError::Ragged {
                row: 1,
                expected: 3,
                found: 2
            }
        );
    }

    #[test]
    fn oversized_grid_is_fatal() {
        let err = ResistanceGrid::open(MAX_SIDE + 1, 4).unwrap_err();
        assert!(matches!(err, GridError::TooLarge { .. }));
        assert!(ResistanceGrid::open(MAX_SIDE, MAX_SIDE).is_ok());
    }

    #[test]
    fn opacity_is_clamped() {
        let g = ResistanceGrid::from_resistance(2, 1, vec![-3.0, 7.5]).unwrap();
        assert_eq!(g.resistance(0, 0), 0.0);
        assert_eq!(g.resistance(1, 0), 1.0);
        assert!(g.is_wall(Cell::new(1, 0)));
    }

    #[test]
    fn changed_cells_diff() {
        let a = ResistanceGrid::open(4, 4).unwrap();
        let b = a.with_resistance(Cell::new(2, 1), 1.0);
        assert_eq!(a.changed_cells(&a), Some(vec![]));
        assert_eq!(a.changed_cells(&b), Some(vec![b.idx(2, 1)]));
        let c = ResistanceGrid::open(3, 4).unwrap();
        assert_eq!(a.changed_cells(&c), None);
    }
}
