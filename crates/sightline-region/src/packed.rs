use std::fmt;
use std::sync::{Arc, LazyLock};

static EMPTY_RUNS: LazyLock<Arc<[u16]>> = LazyLock::new(|| Arc::from(Vec::<u16>::new()));

const UNBOUNDED: u32 = u32::MAX;

/// A set of curve positions stored as alternating `off, on, off, …` run lengths.
///
/// The first run is always "off" (it may be zero long). Runs are merged
/// wherever two neighbours share a state, and the trailing "off" run is
/// implied rather than stored, so the empty set has no runs at all. A run
/// longer than `u16::MAX` is split by a zero-length run of the opposite
/// state.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PackedRegion {
    runs: Arc<[u16]>,
}

impl PackedRegion {
    /// The shared empty region. Cloning it never allocates.
    pub fn empty() -> Self {
        Self {
            runs: Arc::clone(&EMPTY_RUNS),
        }
    }

    /// Canonicalises arbitrary alternating runs (starting with "off").
    pub fn from_runs(runs: &[u16]) -> Self {
        let mut b = RunBuilder::new();
        let mut on = false;
        for &r in runs {
            b.push(on, u32::from(r));
            on = !on;
        }
        b.finish()
    }

    #[inline]
    pub fn runs(&self) -> &[u16] {
        &self.runs
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Number of present positions.
    pub fn len(&self) -> usize {
        self.runs.iter().skip(1).step_by(2).map(|&r| r as usize).sum()
    }

    #[inline]
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    pub fn contains(&self, pos: u32) -> bool {
        let mut at = 0u32;
        let mut on = false;
        for &r in self.runs.iter() {
            let end = at + u32::from(r);
            if pos < end {
                return on;
            }
            at = end;
            on = !on;
        }
        false
    }

    /// Half-open `[start, end)` intervals of present positions, in order.
    pub fn intervals(&self) -> Intervals<'_> {
        Intervals {
            runs: &self.runs,
            idx: 0,
            at: 0,
        }
    }

    pub fn positions(&self) -> impl Iterator<Item = u32> + '_ {
        self.intervals().flat_map(|(s, e)| s..e)
    }

    pub fn union(&self, other: &PackedRegion) -> PackedRegion {
        if other.is_empty() || self.shares_storage(other) {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        combine(self, other, |a, b| a || b)
    }

    pub fn intersection(&self, other: &PackedRegion) -> PackedRegion {
        if self.is_empty() || other.is_empty() {
            return PackedRegion::empty();
        }
        if self.shares_storage(other) {
            return self.clone();
        }
        combine(self, other, |a, b| a && b)
    }

    pub fn difference(&self, other: &PackedRegion) -> PackedRegion {
        if self.is_empty() || other.is_empty() {
            return self.clone();
        }
        combine(self, other, |a, b| a && !b)
    }

    /// Positions present in exactly one of the two regions.
    pub fn symmetric_difference(&self, other: &PackedRegion) -> PackedRegion {
        combine(self, other, |a, b| a != b)
    }

    pub fn intersects(&self, other: &PackedRegion) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        let mut a = RunCursor::new(&self.runs);
        let mut b = RunCursor::new(&other.runs);
        while !(a.exhausted() && b.exhausted()) {
            if a.on && b.on {
                return true;
            }
            let step = a.remaining.min(b.remaining);
            a.advance(step);
            b.advance(step);
        }
        false
    }

    pub fn is_subset(&self, other: &PackedRegion) -> bool {
        self.difference(other).is_empty()
    }

    pub fn union_all<'a, I>(regions: I) -> PackedRegion
    where
        I: IntoIterator<Item = &'a PackedRegion>,
    {
        regions
            .into_iter()
            .fold(PackedRegion::empty(), |acc, r| acc.union(r))
    }

    #[inline]
    pub fn shares_storage(&self, other: &PackedRegion) -> bool {
        Arc::ptr_eq(&self.runs, &other.runs)
    }

    /// Address of the shared run storage; equal keys mean shared storage.
    #[inline]
    pub fn storage_key(&self) -> usize {
        Arc::as_ptr(&self.runs) as *const u16 as usize
    }

    /// Bytes owned by the run storage, including the reference-count header.
    pub fn heap_bytes(&self) -> usize {
        self.runs.len() * std::mem::size_of::<u16>() + 2 * std::mem::size_of::<usize>()
    }
}

impl Default for PackedRegion {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for PackedRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackedRegion")
            .field("cells", &self.len())
            .field("runs", &self.runs)
            .finish()
    }
}

pub struct Intervals<'a> {
    runs: &'a [u16],
    idx: usize,
    at: u32,
}

impl Iterator for Intervals<'_> {
    type Item = (u32, u32);

    fn next(&mut self) -> Option<Self::Item> {
        while self.idx < self.runs.len() {
            let len = u32::from(self.runs[self.idx]);
            let on = self.idx % 2 == 1;
            let start = self.at;
            self.at += len;
            self.idx += 1;
            if on && len > 0 {
                let mut end = self.at;
                // Fold split runs (`u16::MAX, 0, rest`) back into one interval.
                while self.idx + 1 < self.runs.len() && self.runs[self.idx] == 0 {
                    end += u32::from(self.runs[self.idx + 1]);
                    self.idx += 2;
                }
                self.at = end;
                return Some((start, end));
            }
        }
        None
    }
}

/// Incrementally builds a canonical [`PackedRegion`].
#[derive(Debug, Default)]
pub struct RunBuilder {
    runs: Vec<u16>,
    on: bool,
    pending: u32,
    cursor: u32,
}

impl RunBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `len` positions that are all present or all absent.
    pub fn push(&mut self, present: bool, len: u32) {
        if len == 0 {
            return;
        }
        if present != self.on {
            self.flush();
            self.on = present;
        }
        self.pending += len;
        self.cursor += len;
    }

    /// Marks `pos` present. Positions must arrive strictly increasing.
    pub fn push_position(&mut self, pos: u32) {
        debug_assert!(pos >= self.cursor, "positions must increase");
        let gap = pos - self.cursor;
        self.push(false, gap);
        self.push(true, 1);
    }

    fn flush(&mut self) {
        if self.pending == 0 {
            return;
        }
        // Even length means the next stored run is an "off" run.
        let next_is_on = self.runs.len() % 2 == 1;
        if next_is_on != self.on {
            self.runs.push(0);
        }
        let mut len = self.pending;
        while len > u32::from(u16::MAX) {
            self.runs.push(u16::MAX);
            self.runs.push(0);
            len -= u32::from(u16::MAX);
        }
        self.runs.push(len as u16);
        self.pending = 0;
    }

    pub fn finish(mut self) -> PackedRegion {
        if self.on {
            self.flush();
        }
        if self.runs.is_empty() {
            return PackedRegion::empty();
        }
        PackedRegion {
            runs: Arc::from(self.runs),
        }
    }
}

struct RunCursor<'a> {
    runs: &'a [u16],
    idx: usize,
    remaining: u32,
    on: bool,
}

impl<'a> RunCursor<'a> {
    fn new(runs: &'a [u16]) -> Self {
        let mut c = Self {
            runs,
            idx: 0,
            remaining: runs.first().map(|&r| u32::from(r)).unwrap_or(UNBOUNDED),
            on: false,
        };
        c.skip_empty();
        c
    }

    #[inline]
    fn exhausted(&self) -> bool {
        self.idx >= self.runs.len()
    }

    fn skip_empty(&mut self) {
        while self.remaining == 0 {
            self.idx += 1;
            match self.runs.get(self.idx) {
                Some(&r) => {
                    self.on = !self.on;
                    self.remaining = u32::from(r);
                }
                None => {
                    self.on = false;
                    self.remaining = UNBOUNDED;
                }
            }
        }
    }

    fn advance(&mut self, step: u32) {
        if self.remaining != UNBOUNDED {
            self.remaining -= step;
            self.skip_empty();
        }
    }
}

fn combine(a: &PackedRegion, b: &PackedRegion, op: impl Fn(bool, bool) -> bool) -> PackedRegion {
    let mut ca = RunCursor::new(&a.runs);
    let mut cb = RunCursor::new(&b.runs);
    let mut out = RunBuilder::new();
    while !(ca.exhausted() && cb.exhausted()) {
        let step = ca.remaining.min(cb.remaining);
        out.push(op(ca.on, cb.on), step);
        ca.advance(step);
        cb.advance(step);
    }
    out.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_positions(ps: &[u32]) -> PackedRegion {
        let mut b = RunBuilder::new();
        for &p in ps {
            b.push_position(p);
        }
        b.finish()
    }

    #[test]
    fn empty_region_has_no_runs_and_is_shared() {
        let a = PackedRegion::empty();
        let b = RunBuilder::new().finish();
        assert!(a.is_empty());
        assert_eq!(a.run_count(), 0);
        assert!(a.shares_storage(&b));
    }

    #[test]
    fn leading_present_run_gets_zero_off_run() {
        let r = from_positions(&[0, 1, 2, 5]);
        assert_eq!(r.runs(), &[0, 3, 2, 1]);
        assert_eq!(r.len(), 4);
        assert!(r.contains(0) && r.contains(2) && r.contains(5));
        assert!(!r.contains(3) && !r.contains(6));
    }

    #[test]
    fn absent_tail_is_not_stored() {
        let mut b = RunBuilder::new();
        b.push(false, 4);
        b.push(true, 2);
        b.push(false, 100);
        assert_eq!(b.finish().runs(), &[4, 2]);
    }

    #[test]
    fn full_sixteen_bit_span_is_split() {
        let mut b = RunBuilder::new();
        b.push(true, 65_536);
        let r = b.finish();
        assert_eq!(r.runs(), &[0, u16::MAX, 0, 1]);
        assert_eq!(r.len(), 65_536);
        assert!(r.contains(65_535));
        assert_eq!(r.intervals().collect::<Vec<_>>(), vec![(0, 65_536)]);
    }

    #[test]
    fn set_algebra_on_runs() {
        let a = from_positions(&[1, 2, 3, 8, 9]);
        let b = from_positions(&[3, 4, 9, 12]);
        assert_eq!(a.union(&b), from_positions(&[1, 2, 3, 4, 8, 9, 12]));
        assert_eq!(a.intersection(&b), from_positions(&[3, 9]));
        assert_eq!(a.difference(&b), from_positions(&[1, 2, 8]));
        assert_eq!(a.symmetric_difference(&b), from_positions(&[1, 2, 4, 8, 12]));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&from_positions(&[0, 4, 5])));
        assert!(from_positions(&[2, 8]).is_subset(&a));
    }

    #[test]
    fn from_runs_canonicalises() {
        let r = PackedRegion::from_runs(&[2, 0, 0, 3, 1, 0, 5]);
        assert_eq!(r.runs(), &[2, 3]);
        let merged = PackedRegion::from_runs(&[1, 2, 0, 3]);
        assert_eq!(merged.runs(), &[1, 5]);
    }
}
