//! Command-line driver: builds a visibility cache for a map and prints
//! statistics and ASCII views of queries against it.

use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use sightline_cache::{
    CacheConfig, Cell, CurveKind, DistanceMetric, LightSpec, MAX_SIDE, VisibilityCache,
    load_config_from_path,
};

mod mapgen;
mod report;

#[derive(Parser, Debug)]
#[command(name = "sightline", version, about = "Precomputed grid visibility")]
struct Args {
    /// ASCII map (`#` wall, `+` closed door, anything else floor)
    #[arg(long, conflicts_with = "generate")]
    map: Option<PathBuf>,

    /// Generate a noise cave of the given size, e.g. 64x48
    #[arg(long, value_parser = parse_size)]
    generate: Option<(usize, usize)>,

    #[arg(long, default_value_t = 1337)]
    seed: i32,

    /// Share of interior cells that become wall in generated caves
    #[arg(long, default_value_t = 0.42)]
    fill: f32,

    /// TOML cache configuration
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    radius: Option<u32>,

    #[arg(long)]
    los_radius: Option<u32>,

    #[arg(long)]
    workers: Option<usize>,

    #[arg(long, value_enum)]
    metric: Option<MetricArg>,

    #[arg(long, value_enum)]
    curve: Option<CurveArg>,

    /// Extra light source as x,y,radius (repeatable)
    #[arg(long = "light", value_parser = parse_light)]
    lights: Vec<LightSpec>,

    /// Viewer cell as x,y
    #[arg(long, value_parser = parse_cell)]
    from: Option<Cell>,

    /// Target cell as x,y
    #[arg(long, value_parser = parse_cell)]
    to: Option<Cell>,

    /// Query radius (defaults to the cache maximum)
    #[arg(long)]
    at: Option<u32>,

    /// Flip the wall state of a cell as x,y and refresh (repeatable)
    #[arg(long = "toggle", value_parser = parse_cell)]
    toggles: Vec<Cell>,

    /// Draw query results as ASCII
    #[arg(long)]
    render: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum MetricArg {
    Euclidean,
    Chebyshev,
    Manhattan,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum CurveArg {
    Hilbert,
    Raster,
}

fn parse_numbers(s: &str, n: usize) -> Result<Vec<usize>, String> {
    let parts: Vec<&str> = s.split([',', 'x']).map(str::trim).collect();
    if parts.len() != n {
        return Err(format!("expected {n} numbers, got '{s}'"));
    }
    parts
        .iter()
        .map(|p| p.parse::<usize>().map_err(|e| format!("'{p}': {e}")))
        .collect()
}

fn parse_cell(s: &str) -> Result<Cell, String> {
    let v = parse_numbers(s, 2)?;
    Ok(Cell::new(v[0], v[1]))
}

fn parse_size(s: &str) -> Result<(usize, usize), String> {
    let v = parse_numbers(s, 2)?;
    if v[0] == 0 || v[1] == 0 || v[0] > MAX_SIDE || v[1] > MAX_SIDE {
        return Err(format!("size must be within 1..={MAX_SIDE} on each side"));
    }
    Ok((v[0], v[1]))
}

fn parse_light(s: &str) -> Result<LightSpec, String> {
    let v = parse_numbers(s, 3)?;
    let radius = u32::try_from(v[2]).map_err(|_| format!("light radius {} is too large", v[2]))?;
    Ok(LightSpec {
        x: v[0],
        y: v[1],
        radius,
    })
}

fn effective_config(args: &Args) -> Result<CacheConfig, Box<dyn Error>> {
    let mut cfg = match &args.config {
        Some(path) => load_config_from_path(path)?,
        None => CacheConfig::default(),
    };
    if let Some(r) = args.radius {
        cfg.max_radius = r;
    }
    if let Some(r) = args.los_radius {
        cfg.max_los_radius = r;
    }
    if let Some(w) = args.workers {
        cfg.workers = w;
    }
    if let Some(m) = args.metric {
        cfg.metric = match m {
            MetricArg::Euclidean => DistanceMetric::Euclidean,
            MetricArg::Chebyshev => DistanceMetric::Chebyshev,
            MetricArg::Manhattan => DistanceMetric::Manhattan,
        };
    }
    if let Some(c) = args.curve {
        cfg.curve = match c {
            CurveArg::Hilbert => CurveKind::Hilbert,
            CurveArg::Raster => CurveKind::Raster,
        };
    }
    cfg.lights.extend(args.lights.iter().copied());
    Ok(cfg)
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let cfg = effective_config(&args)?;
    if args.print_config {
        print!("{}", toml::to_string_pretty(&cfg.validated()?)?);
        return Ok(());
    }

    let grid = match (&args.map, args.generate) {
        (Some(path), _) => mapgen::load_map(path)?,
        (None, Some((w, h))) => mapgen::generate_caves(w, h, args.seed, args.fill)?,
        (None, None) => sightline_cache::ResistanceGrid::parse_ascii(mapgen::DEMO_MAP)?,
    };

    let cache = VisibilityCache::new(grid, &cfg)?;
    cache.start_precompute()?;
    cache.await_precompute()?;
    print!("{}", report::summary(&cache)?);

    for &cell in &args.toggles {
        let current = cache.grid()?;
        if !current.contains(cell) {
            log::warn!("toggle {cell} is outside the grid; skipped");
            continue;
        }
        let opacity = if current.is_wall(cell) { 0.0 } else { 1.0 };
        cache.refresh(current.with_resistance(cell, opacity))?;
        cache.await_refresh()?;
        println!("toggled {cell}; cache version {}", cache.version()?);
    }

    if let Some(viewer) = args.from {
        let radius = args.at.unwrap_or(cache.config().max_radius);
        let region = cache.region(viewer, radius)?;
        println!("{viewer} sees {} cells at radius {radius}", region.len());
        if let Some(target) = args.to {
            println!(
                "visible: {}  line of sight: {}",
                cache.is_visible(radius, viewer, target)?,
                cache.query_los(viewer, target)?
            );
            let line = cache.line_of_sight_sorted(viewer, target)?;
            println!("sight line: {} cells", line.len());
            if args.render {
                let grid = cache.grid()?;
                let marks = [(viewer, '@'), (target, 'X')];
                print!("{}", report::render(&grid, &line, &marks));
            }
        } else if args.render {
            print!("{}", report::render_region(&cache, &region, &[(viewer, '@')])?);
        }
    }

    cache.destroy();
    Ok(())
}
