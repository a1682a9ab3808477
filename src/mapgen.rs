use std::error::Error;
use std::fs;
use std::path::Path;

use fastnoise_lite::{FastNoiseLite, FractalType, NoiseType};
use sightline_cache::ResistanceGrid;

/// Small built-in level used when no map is given: two rooms, a door and a
/// pillared hall.
pub const DEMO_MAP: &str = "\
##########################
#........#...............#
#........#...#.....#.....#
#........+...............#
#........#.......#.......#
#####.####...#.......#...#
#........#...............#
#........#.....#####.....#
#........................#
##########################
";

pub fn load_map(path: &Path) -> Result<ResistanceGrid, Box<dyn Error>> {
    let text = fs::read_to_string(path)?;
    Ok(ResistanceGrid::parse_ascii(&text)?)
}

/// Cave-like map from thresholded fractal noise, walled on every edge.
/// `fill` is the approximate share of interior cells that become wall.
pub fn generate_caves(
    width: usize,
    height: usize,
    seed: i32,
    fill: f32,
) -> Result<ResistanceGrid, Box<dyn Error>> {
    let mut noise = FastNoiseLite::with_seed(seed);
    noise.set_noise_type(Some(NoiseType::OpenSimplex2));
    noise.set_fractal_type(Some(FractalType::FBm));
    noise.set_fractal_octaves(Some(3));
    noise.set_frequency(Some(0.08));

    // noise is roughly symmetric around 0, so map fill in [0,1] onto [-1,1]
    let threshold = 1.0 - 2.0 * fill.clamp(0.0, 1.0);
    let mut walls = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let edge = x == 0 || y == 0 || x + 1 == width || y + 1 == height;
            let n = noise.get_noise_2d(x as f32, y as f32);
            walls.push(edge || n > threshold);
        }
    }
    let grid = ResistanceGrid::from_walls(width, height, &walls)?;
    log::info!(
        "generated {}x{} cave (seed {}), {} open cells",
        width,
        height,
        seed,
        grid.walkable_count()
    );
    Ok(grid)
}
