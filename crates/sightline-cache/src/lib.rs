//! Precomputed, run-length compressed visibility for every cell of a grid.
#![forbid(unsafe_code)]

mod cache;
mod config;
mod corrector;
mod error;
mod lights;
mod query;
mod scheduler;
mod snapshot;

pub use cache::VisibilityCache;
pub use config::{CacheConfig, LightSpec, MAX_RADIUS, load_config_from_path};
pub use corrector::Corrector;
pub use error::{ConfigError, PrecomputeError, VisibilityError};
pub use lights::LightTable;
pub use snapshot::Stage;

pub use sightline_fov::{FovEntry, MultiRadiusPacker, ShadowcastEngine};
pub use sightline_grid::{Cell, CurveKind, DistanceMetric, GridError, MAX_SIDE, ResistanceGrid};
pub use sightline_region::{PackedRegion, RegionCodec, VisibilityMask};
