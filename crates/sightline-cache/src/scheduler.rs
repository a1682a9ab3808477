use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crossbeam_channel::unbounded;
use rayon::ThreadPool;
use sightline_fov::{FovEntry, MultiRadiusPacker};
use sightline_region::PackedRegion;

use crate::PrecomputeError;
use crate::corrector::Corrector;

#[derive(Clone, Copy, Debug)]
pub(crate) enum RawTask {
    Fov(usize),
    Los(usize),
}

pub(crate) enum RawOut {
    Fov(usize, FovEntry),
    Los(usize, PackedRegion),
}

/// Fixed pool plus the knobs every wave shares.
pub(crate) struct Waves<'a> {
    pub pool: &'a ThreadPool,
    pub batches: usize,
    pub cancel: &'a AtomicBool,
}

impl Waves<'_> {
    /// Splits `tasks` into one batch per worker and runs them inside a scope.
    /// Batches report back over a channel; results come back in task order.
    /// Any panicking or cancelled batch fails the whole wave.
    pub fn run<T, R, F>(&self, wave: &'static str, tasks: &[T], f: F) -> Result<Vec<R>, PrecomputeError>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync,
    {
        if tasks.is_empty() {
            return Ok(Vec::new());
        }
        let t0 = Instant::now();
        let batch_len = tasks.len().div_ceil(self.batches.max(1));
        let batch_count = tasks.len().div_ceil(batch_len);
        log::debug!(
            target: "precompute",
            "{wave} wave: {} tasks in {} batches",
            tasks.len(),
            batch_count
        );

        let (tx, rx) = unbounded::<(usize, Result<Vec<R>, PrecomputeError>)>();
        let f = &f;
        let cancel = self.cancel;
        self.pool.scope(|s| {
            for (i, batch) in tasks.chunks(batch_len).enumerate() {
                let tx = tx.clone();
                s.spawn(move |_| {
                    let out = panic::catch_unwind(AssertUnwindSafe(|| {
                        let mut out = Vec::with_capacity(batch.len());
                        for t in batch {
                            if cancel.load(Ordering::Relaxed) {
                                return Err(PrecomputeError::Cancelled);
                            }
                            out.push(f(t));
                        }
                        Ok(out)
                    }))
                    .unwrap_or(Err(PrecomputeError::WorkerPanicked { wave }));
                    let _ = tx.send((i, out));
                });
            }
        });
        drop(tx);

        let mut parts: Vec<Option<Vec<R>>> = (0..batch_count).map(|_| None).collect();
        let mut failure = None;
        for (i, out) in rx.iter() {
            match out {
                Ok(v) => parts[i] = Some(v),
                Err(PrecomputeError::Cancelled) => {
                    failure.get_or_insert(PrecomputeError::Cancelled);
                }
                Err(e) => failure = Some(e),
            }
        }
        if failure.is_none() && cancel.load(Ordering::Relaxed) {
            failure = Some(PrecomputeError::Cancelled);
        }
        if let Some(e) = failure {
            log::warn!(target: "precompute", "{wave} wave failed: {e}");
            return Err(e);
        }
        log::debug!(
            target: "precompute",
            "{wave} wave finished in {:.1}ms",
            t0.elapsed().as_secs_f64() * 1000.0
        );
        Ok(parts.into_iter().flatten().flatten().collect())
    }

    /// FOV and LOS for every cell in `cells`, written into the given slots.
    /// The slots are left untouched if the wave fails.
    pub fn raw(
        &self,
        packer: &MultiRadiusPacker,
        cells: &[usize],
        fov: &mut [FovEntry],
        los: &mut [PackedRegion],
    ) -> Result<(), PrecomputeError> {
        let grid = packer.engine().grid();
        let tasks: Vec<RawTask> = cells
            .iter()
            .flat_map(|&i| [RawTask::Fov(i), RawTask::Los(i)])
            .collect();
        let outs = self.run("raw", &tasks, |task| match *task {
            RawTask::Fov(i) => RawOut::Fov(i, packer.pack_origin(grid.cell_of(i))),
            RawTask::Los(i) => RawOut::Los(i, packer.pack_los(grid.cell_of(i))),
        })?;
        for out in outs {
            match out {
                RawOut::Fov(i, entry) => fov[i] = entry,
                RawOut::Los(i, region) => los[i] = region,
            }
        }
        Ok(())
    }

    /// Corrected entries for `cells`, written into `fov`.
    pub fn quality(
        &self,
        corrector: &Corrector<'_>,
        grid: &sightline_grid::ResistanceGrid,
        cells: &[usize],
        fov: &mut [FovEntry],
    ) -> Result<(), PrecomputeError> {
        let outs = self.run("quality", cells, |&i| corrector.improve(grid.cell_of(i)))?;
        for (&i, entry) in cells.iter().zip(outs) {
            fov[i] = entry;
        }
        Ok(())
    }
}
