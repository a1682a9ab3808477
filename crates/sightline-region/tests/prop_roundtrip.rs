use std::sync::Arc;

use proptest::prelude::*;
use sightline_grid::{Cell, CellIndex, CurveKind};
use sightline_region::{PackedRegion, RegionCodec, VisibilityMask};

fn codec(kind: CurveKind, w: usize, h: usize) -> RegionCodec {
    RegionCodec::new(Arc::new(CellIndex::new(kind, w, h)))
}

fn kind() -> impl Strategy<Value = CurveKind> {
    prop_oneof![Just(CurveKind::Hilbert), Just(CurveKind::Raster)]
}

// Masks with a tunable fill so both sparse and dense sets are exercised.
fn mask() -> impl Strategy<Value = VisibilityMask> {
    (1usize..=24, 1usize..=24, 0u32..=100).prop_flat_map(|(w, h, fill)| {
        prop::collection::vec(prop::bool::weighted(f64::from(fill) / 100.0), w * h)
            .prop_map(move |flags| VisibilityMask::from_flags(w, h, flags))
    })
}

fn mask_pair() -> impl Strategy<Value = (VisibilityMask, VisibilityMask)> {
    (1usize..=20, 1usize..=20).prop_flat_map(|(w, h)| {
        let a = prop::collection::vec(any::<bool>(), w * h);
        let b = prop::collection::vec(any::<bool>(), w * h);
        (a, b).prop_map(move |(a, b)| {
            (
                VisibilityMask::from_flags(w, h, a),
                VisibilityMask::from_flags(w, h, b),
            )
        })
    })
}

fn zip_masks(a: &VisibilityMask, b: &VisibilityMask, op: impl Fn(bool, bool) -> bool) -> VisibilityMask {
    let flags = a
        .as_flags()
        .iter()
        .zip(b.as_flags())
        .map(|(&x, &y)| op(x, y))
        .collect();
    VisibilityMask::from_flags(a.width(), a.height(), flags)
}

proptest! {
    // unpack(pack(R)) == R
    #[test]
    fn pack_round_trips(m in mask(), kind in kind()) {
        let c = codec(kind, m.width(), m.height());
        let packed = c.pack(&m);
        prop_assert_eq!(c.unpack(&packed), m.clone());
        prop_assert_eq!(packed.len(), m.count());
    }

    // Sparse packing produces the same canonical runs as a full scan
    #[test]
    fn sparse_and_dense_packing_agree(m in mask(), kind in kind()) {
        let c = codec(kind, m.width(), m.height());
        prop_assert_eq!(c.pack_cells(m.cells()), c.pack(&m));
    }

    // Run-level set algebra matches cell-wise boolean logic
    #[test]
    fn set_algebra_matches_cells((a, b) in mask_pair(), kind in kind()) {
        let c = codec(kind, a.width(), a.height());
        let (pa, pb) = (c.pack(&a), c.pack(&b));
        prop_assert_eq!(c.unpack(&pa.union(&pb)), zip_masks(&a, &b, |x, y| x || y));
        prop_assert_eq!(c.unpack(&pa.intersection(&pb)), zip_masks(&a, &b, |x, y| x && y));
        prop_assert_eq!(c.unpack(&pa.difference(&pb)), zip_masks(&a, &b, |x, y| x && !y));
        prop_assert_eq!(c.unpack(&pa.symmetric_difference(&pb)), zip_masks(&a, &b, |x, y| x != y));
        let overlap = a.as_flags().iter().zip(b.as_flags()).any(|(&x, &y)| x && y);
        prop_assert_eq!(pa.intersects(&pb), overlap);
    }

    // contains agrees with the mask for every cell
    #[test]
    fn contains_matches_mask(m in mask(), kind in kind()) {
        let c = codec(kind, m.width(), m.height());
        let packed = c.pack(&m);
        for y in 0..m.height() { for x in 0..m.width() {
            let cell = Cell::new(x, y);
            prop_assert_eq!(c.contains(&packed, cell), m.get(cell));
        }}
    }

    // Nested levels equal independently packed threshold masks
    #[test]
    fn levels_equal_thresholded_masks(
        (w, h, levels) in (1usize..=16, 1usize..=16).prop_flat_map(|(w, h)| {
            prop::collection::vec(0u32..8, w * h).prop_map(move |l| (w, h, l))
        }),
        count in 1usize..6,
    ) {
        let c = codec(CurveKind::Hilbert, w, h);
        let entries = levels
            .iter()
            .enumerate()
            .map(|(i, &l)| (c.index().curve_of_linear(i), l))
            .collect();
        let packed = c.pack_levels(entries, count);
        prop_assert_eq!(packed.len(), count);
        for (k, region) in packed.iter().enumerate() {
            let expect = VisibilityMask::from_flags(
                w,
                h,
                levels.iter().map(|&l| (l as usize) <= k).collect(),
            );
            prop_assert_eq!(c.unpack(region), expect);
        }
    }
}

#[test]
fn largest_grid_full_and_empty() {
    let c = codec(CurveKind::Hilbert, 256, 256);
    let full = VisibilityMask::from_flags(256, 256, vec![true; 256 * 256]);
    let packed = c.pack(&full);
    assert_eq!(packed.len(), 65_536);
    assert_eq!(c.unpack(&packed), full);
    assert!(c.pack(&VisibilityMask::new(256, 256)).is_empty());
    assert_eq!(PackedRegion::union_all([&packed, &PackedRegion::empty()]), packed);
}
