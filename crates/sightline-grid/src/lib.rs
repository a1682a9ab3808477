//! Grid cells, opacity, distance metrics, and space-filling-curve cell ordering.
#![forbid(unsafe_code)]

mod cell;
mod curve;
mod metric;
mod resistance;

pub use cell::Cell;
pub use curve::{CellIndex, CurveKind, NO_CELL};
pub use metric::DistanceMetric;
pub use resistance::{GridError, MAX_SIDE, ResistanceGrid};
