use std::error::Error;
use std::fs;
use std::path::Path;
use std::thread;

use serde::{Deserialize, Serialize};
use sightline_grid::{CurveKind, DistanceMetric};

use crate::ConfigError;

/// Largest radius the cache accepts for either FOV or LOS.
pub const MAX_RADIUS: u32 = 62;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CacheConfig {
    #[serde(default = "default_max_radius")]
    pub max_radius: u32,
    #[serde(default = "default_max_los_radius")]
    pub max_los_radius: u32,
    #[serde(default)]
    pub metric: DistanceMetric,
    #[serde(default)]
    pub curve: CurveKind,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default)]
    pub lights: Vec<LightSpec>,
}

/// A distant light: every open cell it reaches within `radius` counts as
/// visible to anyone with line of sight to that cell.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LightSpec {
    pub x: usize,
    pub y: usize,
    pub radius: u32,
}

fn default_max_radius() -> u32 {
    8
}
fn default_max_los_radius() -> u32 {
    MAX_RADIUS
}
fn default_workers() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_radius: default_max_radius(),
            max_los_radius: default_max_los_radius(),
            metric: DistanceMetric::default(),
            curve: CurveKind::default(),
            workers: default_workers(),
            lights: Vec::new(),
        }
    }
}

impl CacheConfig {
    pub fn with_max_radius(mut self, r: u32) -> Self {
        self.max_radius = r;
        self
    }

    pub fn with_max_los_radius(mut self, r: u32) -> Self {
        self.max_los_radius = r;
        self
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_curve(mut self, curve: CurveKind) -> Self {
        self.curve = curve;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_light(mut self, x: usize, y: usize, radius: u32) -> Self {
        self.lights.push(LightSpec { x, y, radius });
        self
    }

    /// Checks ranges and returns the effective configuration. The LOS radius
    /// is raised to at least the FOV radius.
    pub fn validated(&self) -> Result<CacheConfig, ConfigError> {
        if self.max_radius == 0 || self.max_radius > MAX_RADIUS {
            return Err(ConfigError::RadiusOutOfRange(self.max_radius));
        }
        if self.max_los_radius == 0 || self.max_los_radius > MAX_RADIUS {
            return Err(ConfigError::LosRadiusOutOfRange(self.max_los_radius));
        }
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        let mut cfg = self.clone();
        if cfg.max_los_radius < cfg.max_radius {
            log::debug!(
                target: "config",
                "max_los_radius {} raised to max_radius {}",
                cfg.max_los_radius,
                cfg.max_radius
            );
            cfg.max_los_radius = cfg.max_radius;
        }
        Ok(cfg)
    }
}

pub fn load_config_from_path(path: &Path) -> Result<CacheConfig, Box<dyn Error>> {
    let s = fs::read_to_string(path)?;
    let cfg: CacheConfig = toml::from_str(&s)?;
    Ok(cfg)
}
