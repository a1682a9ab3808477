use std::sync::Arc;

use proptest::prelude::*;
use sightline_cache::{
    CacheConfig, Cell, DistanceMetric, PackedRegion, RegionCodec, ResistanceGrid,
    ShadowcastEngine, VisibilityCache,
};

fn metric() -> impl Strategy<Value = DistanceMetric> {
    prop_oneof![
        Just(DistanceMetric::Euclidean),
        Just(DistanceMetric::Chebyshev),
        Just(DistanceMetric::Manhattan),
    ]
}

fn grid() -> impl Strategy<Value = ResistanceGrid> {
    (2usize..=9, 2usize..=9).prop_flat_map(|(w, h)| {
        prop::collection::vec(prop::bool::weighted(0.25), w * h)
            .prop_map(move |walls| ResistanceGrid::from_walls(w, h, &walls).unwrap())
    })
}

fn cells(g: &ResistanceGrid) -> Vec<Cell> {
    (0..g.len()).map(|i| g.cell_of(i)).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    // Without lights, a sees b at r exactly when b sees a at r; regions nest
    // and contain the raw scan
    #[test]
    fn corrected_regions_are_symmetric(g in grid(), m in metric(), max_radius in 1u32..=4) {
        let cfg = CacheConfig::default().with_max_radius(max_radius).with_metric(m).with_workers(2);
        let cache = VisibilityCache::new(g.clone(), &cfg).unwrap();
        cache.await_precompute().unwrap();
        let engine = ShadowcastEngine::new(Arc::new(g.clone()), m);
        let all = cells(&g);
        for r in 0..=max_radius {
            let regions: Vec<PackedRegion> = all.iter().map(|&c| cache.region(c, r).unwrap()).collect();
            for (i, &a) in all.iter().enumerate() {
                let scanned = cache.region(a, r).unwrap();
                for lit in engine.scan(a, r) {
                    prop_assert!(cache.contains(&scanned, g.cell_of(lit.idx)).unwrap());
                }
                if r < max_radius {
                    prop_assert!(regions[i].is_subset(&cache.region(a, r + 1).unwrap()));
                }
                for (j, &b) in all.iter().enumerate() {
                    let ab = cache.contains(&regions[i], b).unwrap();
                    prop_assert_eq!(ab, cache.contains(&regions[j], a).unwrap());
                    if ab {
                        prop_assert!(!g.is_wall(b));
                    }
                }
            }
        }
    }

    // At radius 0 a cell sees itself plus every lit cell it has line of sight to
    #[test]
    fn lights_union_through_line_of_sight(
        g in grid(),
        lights in prop::collection::vec((0usize..9, 0usize..9, 0u32..5), 0..4),
    ) {
        let mut cfg = CacheConfig::default().with_max_radius(2).with_workers(2);
        for &(x, y, r) in &lights {
            cfg = cfg.with_light(x, y, r);
        }
        let cache = VisibilityCache::new(g.clone(), &cfg).unwrap();
        cache.await_precompute().unwrap();

        let shared = Arc::new(g.clone());
        let engine = ShadowcastEngine::new(Arc::clone(&shared), DistanceMetric::Euclidean);
        let codec = RegionCodec::for_grid(cfg.curve, &shared);
        let reach = cache
            .lights()
            .iter()
            .map(|(c, r)| codec.pack_linear(engine.scan(c, r).into_iter().map(|l| l.idx)))
            .fold(PackedRegion::empty(), |acc, r| acc.union(&r));
        for &lit in &codec.cells(&reach) {
            prop_assert!(!g.is_wall(lit));
        }
        for c in cells(&g) {
            let at_zero = cache.region(c, 0).unwrap();
            if g.is_wall(c) {
                prop_assert!(at_zero.is_empty());
                continue;
            }
            let own = codec.pack_cells([c]);
            let expect = own.union(&reach.intersection(&cache.los_region(c).unwrap()));
            prop_assert_eq!(at_zero, expect);
        }
    }
}
