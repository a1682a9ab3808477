use std::hint::black_box;
use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};

use sightline_grid::{Cell, CellIndex, CurveKind};
use sightline_region::RegionCodec;

fn disc(w: usize, h: usize, center: Cell, radius: usize) -> Vec<Cell> {
    (0..h)
        .flat_map(|y| (0..w).map(move |x| Cell::new(x, y)))
        .filter(|c| c.distance_sq(center) <= radius * radius)
        .collect()
}

fn bench_pack_disc(c: &mut Criterion) {
    let mut group = c.benchmark_group("pack_disc_128");
    let (w, h) = (128, 128);
    // Several centers so curve-quadrant alignment does not dominate.
    let discs: Vec<Vec<Cell>> = [(20, 20), (64, 64), (97, 33), (40, 110)]
        .into_iter()
        .map(|(x, y)| disc(w, h, Cell::new(x, y), 9))
        .collect();
    for kind in [CurveKind::Hilbert, CurveKind::Raster] {
        let codec = RegionCodec::new(Arc::new(CellIndex::new(kind, w, h)));
        let runs: usize = discs
            .iter()
            .map(|d| codec.pack_cells(d.iter().copied()).run_count())
            .sum();
        eprintln!("{kind:?}: {runs} runs across {} discs", discs.len());
        group.bench_function(format!("{kind:?}"), |b| {
            b.iter(|| {
                for d in &discs {
                    black_box(codec.pack_cells(d.iter().copied()));
                }
            })
        });
    }
    group.finish();
}

fn bench_union_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("union_chain_128");
    let (w, h) = (128, 128);
    let codec = RegionCodec::new(Arc::new(CellIndex::new(CurveKind::Hilbert, w, h)));
    let regions: Vec<_> = (0..32)
        .map(|i| codec.pack_cells(disc(w, h, Cell::new(10 + i * 3, 20 + i * 2), 8)))
        .collect();
    group.bench_function("hilbert_32", |b| {
        b.iter(|| {
            let mut acc = sightline_region::PackedRegion::empty();
            for r in &regions {
                acc = acc.union(r);
            }
            black_box(acc)
        })
    });
    group.finish();
}

criterion_group!(benches, bench_pack_disc, bench_union_chain);
criterion_main!(benches);
