use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use rayon::{ThreadPool, ThreadPoolBuilder};
use sightline_fov::{FovEntry, MultiRadiusPacker, ShadowcastEngine};
use sightline_grid::{GridError, MAX_SIDE, ResistanceGrid};
use sightline_region::{PackedRegion, RegionCodec};

use crate::corrector::Corrector;
use crate::scheduler::Waves;
use crate::snapshot::{CacheSnapshot, Stage, wall_region};
use crate::{CacheConfig, ConfigError, LightTable, PrecomputeError, VisibilityError};

/// Precomputed, compressed FOV and LOS for every cell of one grid.
///
/// Queries work from the moment the cache is built: until the raw wave has
/// been published they fall back to direct shadow casting. Dropping the
/// handle destroys the cache.
pub struct VisibilityCache {
    pub(crate) inner: Arc<Inner>,
}

pub(crate) struct Inner {
    config: CacheConfig,
    lights: LightTable,
    pool: Mutex<Option<Arc<ThreadPool>>>,
    cancel: AtomicBool,
    destroyed: AtomicBool,
    // None once destroyed
    snapshot: RwLock<Option<Arc<CacheSnapshot>>>,
    progress: Mutex<Progress>,
    progress_cv: Condvar,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

struct Progress {
    phase: Stage,
    // a full precompute has been requested (background or synchronous)
    started: bool,
    // some job holds the exclusive right to run waves
    running: bool,
    refreshing: bool,
    pending_grid: Option<Arc<ResistanceGrid>>,
    last_refresh_changed: bool,
    failure: Option<PrecomputeError>,
    refresh_failure: Option<PrecomputeError>,
}

#[derive(Clone, Copy)]
enum Job {
    Precompute,
    Refresh,
}

impl VisibilityCache {
    pub fn new(grid: ResistanceGrid, config: &CacheConfig) -> Result<Self, ConfigError> {
        let cfg = config.validated()?;
        if grid.width() > MAX_SIDE || grid.height() > MAX_SIDE {
            return Err(ConfigError::Grid(GridError::TooLarge {
                width: grid.width(),
                height: grid.height(),
                max: MAX_SIDE,
            }));
        }
        let grid = Arc::new(grid);
        let engine = ShadowcastEngine::new(Arc::clone(&grid), cfg.metric);
        let codec = RegionCodec::for_grid(cfg.curve, &grid);
        let packer = MultiRadiusPacker::new(engine, codec, cfg.max_radius, cfg.max_los_radius);
        let lights = LightTable::new(&cfg.lights, &grid, cfg.max_los_radius);
        let pool = ThreadPoolBuilder::new()
            .num_threads(cfg.workers)
            .thread_name(|i| format!("sightline-worker-{i}"))
            .build()
            .map_err(|e| ConfigError::Pool(e.to_string()))?;
        log::info!(
            target: "precompute",
            "visibility cache {}x{} radius={} los_radius={} metric={} curve={:?} workers={} lights={}",
            grid.width(),
            grid.height(),
            cfg.max_radius,
            cfg.max_los_radius,
            cfg.metric.name(),
            cfg.curve,
            cfg.workers,
            lights.len()
        );
        let inner = Inner {
            config: cfg,
            lights,
            pool: Mutex::new(Some(Arc::new(pool))),
            cancel: AtomicBool::new(false),
            destroyed: AtomicBool::new(false),
            snapshot: RwLock::new(Some(Arc::new(CacheSnapshot::initial(packer)))),
            progress: Mutex::new(Progress {
                phase: Stage::Uninitialized,
                started: false,
                running: false,
                refreshing: false,
                pending_grid: None,
                last_refresh_changed: false,
                failure: None,
                refresh_failure: None,
            }),
            progress_cv: Condvar::new(),
            threads: Mutex::new(Vec::new()),
        };
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Effective configuration after validation.
    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    pub fn lights(&self) -> &LightTable {
        &self.inner.lights
    }

    pub fn stage(&self) -> Stage {
        self.inner.lock_progress().phase
    }

    pub fn is_refreshing(&self) -> bool {
        self.inner.lock_progress().refreshing
    }

    pub fn grid(&self) -> Result<Arc<ResistanceGrid>, VisibilityError> {
        Ok(self.inner.snapshot()?.packer.engine().shared_grid())
    }

    /// Bumped every time a new snapshot is published.
    pub fn version(&self) -> Result<u64, VisibilityError> {
        Ok(self.inner.snapshot()?.version)
    }

    /// Starts raw then quality precomputation on a background thread.
    /// Calling it again is a no-op.
    pub fn start_precompute(&self) -> Result<(), PrecomputeError> {
        let inner = &self.inner;
        let mut p = inner.lock_progress();
        if inner.is_destroyed() {
            return Err(PrecomputeError::PoolUnavailable);
        }
        if p.started {
            return Ok(());
        }
        p.started = true;
        let worker = Arc::clone(inner);
        let spawned = thread::Builder::new()
            .name("sightline-precompute".into())
            .spawn(move || {
                let _ = worker.exclusive(Job::Precompute, Inner::precompute);
            });
        match spawned {
            Ok(handle) => {
                inner.track(handle);
                Ok(())
            }
            Err(e) => {
                log::warn!(target: "precompute", "could not spawn precompute thread: {e}");
                p.started = false;
                Err(PrecomputeError::PoolUnavailable)
            }
        }
    }

    /// Blocks until raw data is published. Runs the raw wave on the calling
    /// thread if nothing has started it. `Ok(false)` means the cache was
    /// destroyed before anything was computed.
    pub fn await_raw(&self) -> Result<bool, PrecomputeError> {
        self.inner.await_stage(Stage::RawComplete, false, Inner::ensure_raw)
    }

    /// Blocks until corrected data is published, running both waves on the
    /// calling thread if `start_precompute` was never called. `Ok(false)`
    /// means the cache was destroyed before anything was computed.
    pub fn await_precompute(&self) -> Result<bool, PrecomputeError> {
        self.inner.await_stage(Stage::QualityComplete, true, Inner::precompute)
    }

    /// Replaces the grid. Only cells whose visibility may have changed are
    /// recomputed, on a background thread; the old snapshot stays readable
    /// until the new one is swapped in. Before any data is cached the grid is
    /// replaced immediately.
    pub fn refresh(&self, grid: ResistanceGrid) -> Result<(), VisibilityError> {
        let inner = &self.inner;
        let current = inner.snapshot()?.packer.engine().shared_grid();
        if current.width() != grid.width() || current.height() != grid.height() {
            return Err(VisibilityError::GridMismatch);
        }
        let grid = Arc::new(grid);
        let mut p = inner.lock_progress();
        if inner.is_destroyed() {
            return Err(VisibilityError::Destroyed);
        }
        p.refresh_failure = None;
        // waves publish only while `running` is held, so with it clear this
        // read is the snapshot any job left behind
        let snap = inner.snapshot()?;
        if !p.started && !p.running && !p.refreshing && !snap.is_cached() {
            p.last_refresh_changed = *snap.grid() != *grid;
            if p.last_refresh_changed {
                inner.publish(snap.with_grid(grid));
            }
            return Ok(());
        }
        p.pending_grid = Some(grid);
        if p.refreshing {
            return Ok(());
        }
        p.refreshing = true;
        let worker = Arc::clone(inner);
        let spawned = thread::Builder::new()
            .name("sightline-refresh".into())
            .spawn(move || worker.refresh_loop());
        match spawned {
            Ok(handle) => inner.track(handle),
            Err(e) => {
                log::warn!(target: "refresh", "could not spawn refresh thread: {e}");
                p.refreshing = false;
                p.pending_grid = None;
                p.refresh_failure = Some(PrecomputeError::PoolUnavailable);
            }
        }
        Ok(())
    }

    /// Blocks until every requested refresh has been applied. Returns whether
    /// the last one changed anything.
    pub fn await_refresh(&self) -> Result<bool, PrecomputeError> {
        let inner = &self.inner;
        let mut p = inner.lock_progress();
        while p.refreshing && !inner.is_destroyed() {
            p = inner.wait(p);
        }
        if let Some(e) = &p.refresh_failure {
            return Err(e.clone());
        }
        if p.refreshing {
            return Err(PrecomputeError::Cancelled);
        }
        Ok(p.last_refresh_changed)
    }

    /// Cancels running waves, joins background threads and shuts the worker
    /// pool down. Every later query fails with [`VisibilityError::Destroyed`].
    pub fn destroy(&self) {
        let inner = &self.inner;
        if inner.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        inner.cancel.store(true, Ordering::SeqCst);
        {
            let _p = inner.lock_progress();
            inner.progress_cv.notify_all();
        }
        let handles = mem::take(&mut *inner.threads.lock().unwrap());
        for h in handles {
            if h.join().is_err() {
                log::warn!(target: "precompute", "background thread panicked during shutdown");
            }
        }
        inner.pool.lock().unwrap().take();
        inner.snapshot.write().unwrap().take();
        {
            let _p = inner.lock_progress();
            inner.progress_cv.notify_all();
        }
        log::info!(target: "precompute", "visibility cache destroyed");
    }
}

impl Drop for VisibilityCache {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl Inner {
    fn lock_progress(&self) -> MutexGuard<'_, Progress> {
        self.progress.lock().unwrap()
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, Progress>) -> MutexGuard<'a, Progress> {
        self.progress_cv.wait(guard).unwrap()
    }

    #[inline]
    fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub(crate) fn snapshot(&self) -> Result<Arc<CacheSnapshot>, VisibilityError> {
        self.snapshot
            .read()
            .unwrap()
            .clone()
            .ok_or(VisibilityError::Destroyed)
    }

    fn wave_snapshot(&self) -> Result<Arc<CacheSnapshot>, PrecomputeError> {
        self.snapshot().map_err(|_| PrecomputeError::Cancelled)
    }

    fn published_stage(&self) -> Stage {
        self.snapshot
            .read()
            .unwrap()
            .as_ref()
            .map_or(Stage::Uninitialized, |s| s.stage)
    }

    fn publish(&self, next: CacheSnapshot) {
        let mut slot = self.snapshot.write().unwrap();
        if slot.is_some() {
            *slot = Some(Arc::new(next));
        }
    }

    fn set_phase(&self, phase: Stage) {
        let mut p = self.lock_progress();
        p.phase = phase;
        self.progress_cv.notify_all();
    }

    fn track(&self, handle: JoinHandle<()>) {
        let mut threads = self.threads.lock().unwrap();
        threads.retain(|h| !h.is_finished());
        threads.push(handle);
    }

    fn waves<'a>(&'a self, pool: &'a ThreadPool) -> Waves<'a> {
        Waves {
            pool,
            batches: self.config.workers,
            cancel: &self.cancel,
        }
    }

    fn pool(&self) -> Result<Arc<ThreadPool>, PrecomputeError> {
        self.pool
            .lock()
            .unwrap()
            .clone()
            .ok_or(PrecomputeError::PoolUnavailable)
    }

    /// Waits for any running job, then runs `job` while holding the exclusive
    /// right to run waves. A failure is recorded and the phase falls back to
    /// whatever is still published.
    fn exclusive<T>(
        &self,
        kind: Job,
        job: impl FnOnce(&Inner) -> Result<T, PrecomputeError>,
    ) -> Result<T, PrecomputeError> {
        {
            let mut p = self.lock_progress();
            while p.running && !self.is_destroyed() {
                p = self.wait(p);
            }
            if self.is_destroyed() {
                return Err(PrecomputeError::Cancelled);
            }
            p.running = true;
        }
        let res = job(self);
        let mut p = self.lock_progress();
        p.running = false;
        if let Err(e) = &res {
            match kind {
                Job::Precompute => p.failure = Some(e.clone()),
                Job::Refresh => p.refresh_failure = Some(e.clone()),
            }
            p.phase = self.published_stage();
        }
        self.progress_cv.notify_all();
        res
    }

    fn await_stage(
        &self,
        target: Stage,
        full: bool,
        job: fn(&Inner) -> Result<(), PrecomputeError>,
    ) -> Result<bool, PrecomputeError> {
        let mut p = self.lock_progress();
        loop {
            if p.phase >= target {
                return Ok(true);
            }
            if let Some(e) = &p.failure {
                return Err(e.clone());
            }
            if self.is_destroyed() {
                return if p.started {
                    Err(PrecomputeError::Cancelled)
                } else {
                    Ok(false)
                };
            }
            if !p.started && !p.running {
                p.started = full;
                drop(p);
                let _ = self.exclusive(Job::Precompute, job);
                p = self.lock_progress();
                continue;
            }
            p = self.wait(p);
        }
    }

    fn ensure_raw(&self) -> Result<(), PrecomputeError> {
        if self.wave_snapshot()?.stage < Stage::RawComplete {
            self.run_raw()?;
        }
        Ok(())
    }

    fn precompute(&self) -> Result<(), PrecomputeError> {
        self.ensure_raw()?;
        if self.wave_snapshot()?.stage < Stage::QualityComplete {
            self.run_quality()?;
        }
        Ok(())
    }

    fn run_raw(&self) -> Result<(), PrecomputeError> {
        let snap = self.wave_snapshot()?;
        let pool = self.pool()?;
        self.set_phase(Stage::RawComputing);
        let t0 = Instant::now();
        let packer = &snap.packer;
        let n = snap.grid().len();
        let mut fov: Vec<FovEntry> = vec![Arc::clone(packer.all_wall()); n];
        let mut los = vec![PackedRegion::empty(); n];
        let cells: Vec<usize> = (0..n).collect();
        self.waves(&pool).raw(packer, &cells, &mut fov, &mut los)?;
        let fov: Arc<[FovEntry]> = fov.into();
        self.publish(CacheSnapshot {
            stage: Stage::RawComplete,
            version: snap.version + 1,
            packer: packer.clone(),
            walls: snap.walls.clone(),
            raw_fov: Arc::clone(&fov),
            fov,
            los: los.into(),
            light_reach: PackedRegion::empty(),
        });
        self.set_phase(Stage::RawComplete);
        log::info!(
            target: "precompute",
            "raw wave: {} cells in {:.1}ms",
            n,
            t0.elapsed().as_secs_f64() * 1000.0
        );
        Ok(())
    }

    fn run_quality(&self) -> Result<(), PrecomputeError> {
        let snap = self.wave_snapshot()?;
        let pool = self.pool()?;
        self.set_phase(Stage::QualityComputing);
        let t0 = Instant::now();
        let packer = &snap.packer;
        let n = snap.grid().len();
        let light_reach = self.lights.reach(packer);
        let mut fov = snap.raw_fov.to_vec();
        let cells: Vec<usize> = (0..n).collect();
        {
            let corrector = Corrector::new(
                packer,
                &snap.raw_fov,
                &snap.los,
                &light_reach,
                &snap.walls,
            );
            self.waves(&pool)
                .quality(&corrector, snap.grid(), &cells, &mut fov)?;
        }
        self.publish(CacheSnapshot {
            stage: Stage::QualityComplete,
            version: snap.version + 1,
            packer: packer.clone(),
            walls: snap.walls.clone(),
            raw_fov: Arc::clone(&snap.raw_fov),
            fov: fov.into(),
            los: Arc::clone(&snap.los),
            light_reach,
        });
        self.set_phase(Stage::QualityComplete);
        log::info!(
            target: "precompute",
            "quality wave: {} cells in {:.1}ms",
            n,
            t0.elapsed().as_secs_f64() * 1000.0
        );
        Ok(())
    }

    fn refresh_loop(&self) {
        loop {
            let grid = {
                let mut p = self.lock_progress();
                // a requested precompute finishes before any refresh applies
                while (p.running
                    || (p.started && p.phase < Stage::QualityComplete && p.failure.is_none()))
                    && !self.is_destroyed()
                {
                    p = self.wait(p);
                }
                match p.pending_grid.take() {
                    Some(g) if !self.is_destroyed() => g,
                    _ => {
                        p.refreshing = false;
                        p.pending_grid = None;
                        self.progress_cv.notify_all();
                        return;
                    }
                }
            };
            let res = self.exclusive(Job::Refresh, |inner| inner.apply_refresh(grid));
            if let Ok(changed) = res {
                self.lock_progress().last_refresh_changed = changed;
            }
        }
    }

    /// Recomputes the cells a grid change can affect and publishes the result.
    fn apply_refresh(&self, grid: Arc<ResistanceGrid>) -> Result<bool, PrecomputeError> {
        let mut old = self.wave_snapshot()?;
        let changed = old.grid().changed_cells(&grid).unwrap_or_default();
        if changed.is_empty() {
            log::debug!(target: "refresh", "refresh with unchanged grid ignored");
            return Ok(false);
        }
        if !old.is_cached() {
            self.publish(old.with_grid(grid));
            return Ok(true);
        }
        if old.stage < Stage::QualityComplete {
            self.run_quality()?;
            old = self.wave_snapshot()?;
        }
        let pool = self.pool()?;
        let waves = self.waves(&pool);
        let t0 = Instant::now();
        let packer = old.packer.with_grid(grid);
        let g = packer.engine().grid();
        let (w, h, n) = (g.width(), g.height(), g.len());

        let mut is_changed = vec![false; n];
        let mut halo = vec![false; n];
        for &c in &changed {
            is_changed[c] = true;
            for_each_within(w, h, c, 1, |i| halo[i] = true);
        }
        let halo = packer
            .codec()
            .pack_linear((0..n).filter(|&i| halo[i]));
        let raw_cells: Vec<usize> = (0..n)
            .filter(|&o| is_changed[o] || old.los[o].intersects(&halo))
            .collect();

        let mut raw_fov = old.raw_fov.to_vec();
        let mut los = old.los.to_vec();
        waves.raw(&packer, &raw_cells, &mut raw_fov, &mut los)?;

        let light_reach = self.lights.reach(&packer);
        let lit_delta = old.light_reach.symmetric_difference(&light_reach);
        let mut dirty = vec![false; n];
        let reach = packer.max_radius() as usize;
        for &o in &raw_cells {
            for_each_within(w, h, o, reach, |i| dirty[i] = true);
        }
        if !lit_delta.is_empty() {
            for (o, slot) in dirty.iter_mut().enumerate() {
                if old.los[o].intersects(&lit_delta) || los[o].intersects(&lit_delta) {
                    *slot = true;
                }
            }
        }
        let quality_cells: Vec<usize> = (0..n).filter(|&i| dirty[i]).collect();

        let walls = wall_region(&packer);
        let mut fov = old.fov.to_vec();
        {
            let corrector = Corrector::new(&packer, &raw_fov, &los, &light_reach, &walls);
            waves.quality(&corrector, g, &quality_cells, &mut fov)?;
        }
        self.publish(CacheSnapshot {
            stage: Stage::QualityComplete,
            version: old.version + 1,
            packer,
            walls,
            raw_fov: raw_fov.into(),
            fov: fov.into(),
            los: los.into(),
            light_reach,
        });
        log::info!(
            target: "refresh",
            "refresh: {} changed, {} raw, {} corrected cells in {:.1}ms",
            changed.len(),
            raw_cells.len(),
            quality_cells.len(),
            t0.elapsed().as_secs_f64() * 1000.0
        );
        Ok(true)
    }
}

#[cfg(test)]
impl Inner {
    /// Fails every later wave as cancelled while leaving the cache usable.
    pub(crate) fn cancel_waves(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }
}

// Calls `f` for every linear index within Chebyshev distance `reach` of `idx`.
fn for_each_within(w: usize, h: usize, idx: usize, reach: usize, mut f: impl FnMut(usize)) {
    let (x, y) = (idx % w, idx / w);
    for ny in y.saturating_sub(reach)..=(y + reach).min(h - 1) {
        for nx in x.saturating_sub(reach)..=(x + reach).min(w - 1) {
            f(ny * w + nx);
        }
    }
}
