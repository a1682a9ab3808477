use std::collections::BTreeSet;
use std::sync::Arc;

use proptest::prelude::*;
use sightline_fov::{MultiRadiusPacker, ShadowcastEngine};
use sightline_grid::{Cell, CurveKind, DistanceMetric, ResistanceGrid};
use sightline_region::RegionCodec;

fn metric() -> impl Strategy<Value = DistanceMetric> {
    prop_oneof![
        Just(DistanceMetric::Euclidean),
        Just(DistanceMetric::Chebyshev),
        Just(DistanceMetric::Manhattan),
    ]
}

// Random grid with roughly a third of the cells walled, plus an origin inside it.
fn grid_and_origin() -> impl Strategy<Value = (ResistanceGrid, Cell)> {
    (1usize..=14, 1usize..=14).prop_flat_map(|(w, h)| {
        (
            prop::collection::vec(prop::bool::weighted(0.3), w * h),
            0..w,
            0..h,
        )
            .prop_map(move |(walls, x, y)| {
                (
                    ResistanceGrid::from_walls(w, h, &walls).unwrap(),
                    Cell::new(x, y),
                )
            })
    })
}

proptest! {
    // Scans never report walls, out-of-range cells, or the same cell twice
    #[test]
    fn scan_reports_unique_open_cells((grid, origin) in grid_and_origin(), m in metric(), radius in 0u32..=10) {
        let e = ShadowcastEngine::new(Arc::new(grid.clone()), m);
        let lit = e.scan(origin, radius);
        let mut seen = BTreeSet::new();
        for l in &lit {
            prop_assert!(l.idx < grid.len());
            prop_assert!(!grid.is_wall_idx(l.idx));
            prop_assert!(l.ring <= radius);
            prop_assert!(seen.insert(l.idx));
        }
        if !grid.is_wall(origin) {
            prop_assert!(seen.contains(&grid.idx(origin.x, origin.y)));
        }
    }

    // A smaller radius sees exactly the cells of a larger scan within its ring
    #[test]
    fn smaller_radius_is_a_ring_filter((grid, origin) in grid_and_origin(), m in metric(), big in 0u32..=9) {
        let e = ShadowcastEngine::new(Arc::new(grid), m);
        let full = e.scan(origin, big);
        for r in 0..=big {
            let direct: BTreeSet<usize> = e.scan(origin, r).into_iter().map(|l| l.idx).collect();
            let filtered: BTreeSet<usize> = full.iter().filter(|l| l.ring <= r).map(|l| l.idx).collect();
            prop_assert_eq!(direct, filtered, "radius {}", r);
        }
    }

    // Packed entries nest and each level equals the scan at that radius
    #[test]
    fn packed_levels_nest((grid, origin) in grid_and_origin(), m in metric(), max_radius in 0u32..=6) {
        let grid = Arc::new(grid);
        let e = ShadowcastEngine::new(Arc::clone(&grid), m);
        let codec = RegionCodec::for_grid(CurveKind::Hilbert, &grid);
        let p = MultiRadiusPacker::new(e.clone(), codec.clone(), max_radius, max_radius + 2);
        let entry = p.pack_origin(origin);
        prop_assert_eq!(entry.len(), max_radius as usize + 1);
        for r in 0..entry.len() {
            if r > 0 {
                prop_assert!(entry[r - 1].is_subset(&entry[r]));
            }
            let direct = codec.pack_linear(e.scan(origin, r as u32).into_iter().map(|l| l.idx));
            prop_assert_eq!(&entry[r], &direct);
        }
        prop_assert!(entry[max_radius as usize].is_subset(&p.pack_los(origin)));
    }
}
