use std::fmt;

use sightline_grid::GridError;

/// Rejected construction parameters.
#[derive(Debug)]
pub enum ConfigError {
    RadiusOutOfRange(u32),
    LosRadiusOutOfRange(u32),
    NoWorkers,
    Grid(GridError),
    Pool(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::RadiusOutOfRange(r) => {
                write!(f, "max_radius {r} outside 1..={}", crate::MAX_RADIUS)
            }
            ConfigError::LosRadiusOutOfRange(r) => {
                write!(f, "max_los_radius {r} outside 1..={}", crate::MAX_RADIUS)
            }
            ConfigError::NoWorkers => write!(f, "worker count must be at least 1"),
            ConfigError::Grid(e) => write!(f, "grid: {e}"),
            ConfigError::Pool(msg) => write!(f, "worker pool: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Grid(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GridError> for ConfigError {
    fn from(e: GridError) -> Self {
        ConfigError::Grid(e)
    }
}

/// Per-call query failures. The cache stays usable after any of these
/// except `Destroyed`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VisibilityError {
    OutOfBounds { x: usize, y: usize },
    RadiusTooLarge { radius: u32, max: u32 },
    GridMismatch,
    Destroyed,
}

impl fmt::Display for VisibilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VisibilityError::OutOfBounds { x, y } => write!(f, "cell ({x}, {y}) is outside the grid"),
            VisibilityError::RadiusTooLarge { radius, max } => {
                write!(f, "radius {radius} exceeds cached maximum {max}")
            }
            VisibilityError::GridMismatch => write!(f, "replacement grid has different dimensions"),
            VisibilityError::Destroyed => write!(f, "visibility cache has been destroyed"),
        }
    }
}

impl std::error::Error for VisibilityError {}

/// Failure of a precomputation wave. Nothing from a failed wave is published.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PrecomputeError {
    WorkerPanicked { wave: &'static str },
    Cancelled,
    PoolUnavailable,
}

impl fmt::Display for PrecomputeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrecomputeError::WorkerPanicked { wave } => write!(f, "worker panicked during {wave} wave"),
            PrecomputeError::Cancelled => write!(f, "precomputation cancelled"),
            PrecomputeError::PoolUnavailable => write!(f, "worker pool has been shut down"),
        }
    }
}

impl std::error::Error for PrecomputeError {}
