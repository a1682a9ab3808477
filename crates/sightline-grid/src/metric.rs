use serde::{Deserialize, Serialize};

/// How far an offset from the origin is, in whole radius steps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    #[default]
    Euclidean,
    Chebyshev,
    Manhattan,
}

impl DistanceMetric {
    /// Smallest radius at which the offset `(dx, dy)` is inside the circle.
    ///
    /// Euclidean uses a half-cell allowance (`d <= r + 0.5`), evaluated in
    /// integers as `r * (r + 1) >= dx² + dy²`. Every metric satisfies
    /// `ring >= max(|dx|, |dy|)`.
    #[inline]
    pub fn ring(self, dx: i32, dy: i32) -> u32 {
        let ax = dx.unsigned_abs();
        let ay = dy.unsigned_abs();
        match self {
            DistanceMetric::Chebyshev => ax.max(ay),
            DistanceMetric::Manhattan => ax + ay,
            DistanceMetric::Euclidean => {
                let d2 = u64::from(ax) * u64::from(ax) + u64::from(ay) * u64::from(ay);
                let mut r = ((d2 as f64).sqrt() as u64).saturating_sub(1);
                while r * (r + 1) < d2 {
                    r += 1;
                }
                r as u32
            }
        }
    }

    #[inline]
    pub fn within(self, dx: i32, dy: i32, radius: u32) -> bool {
        self.ring(dx, dy) <= radius
    }

    pub fn name(self) -> &'static str {
        match self {
            DistanceMetric::Euclidean => "euclidean",
            DistanceMetric::Chebyshev => "chebyshev",
            DistanceMetric::Manhattan => "manhattan",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn euclidean_radius_one_includes_diagonals() {
        let m = DistanceMetric::Euclidean;
        assert_eq!(m.ring(0, 0), 0);
        assert_eq!(m.ring(1, 0), 1);
        assert_eq!(m.ring(1, 1), 1);
        assert_eq!(m.ring(2, 1), 2);
        assert_eq!(m.ring(2, 2), 3);
        assert_eq!(m.ring(-3, 0), 3);
    }

    #[test]
    fn chebyshev_and_manhattan() {
        assert_eq!(DistanceMetric::Chebyshev.ring(3, -2), 3);
        assert_eq!(DistanceMetric::Manhattan.ring(3, -2), 5);
        assert_eq!(DistanceMetric::Manhattan.ring(1, 1), 2);
    }

    #[test]
    fn ring_never_below_chebyshev() {
        for metric in [
            DistanceMetric::Euclidean,
            DistanceMetric::Chebyshev,
            DistanceMetric::Manhattan,
        ] {
            for dx in -20i32..=20 {
                for dy in -20i32..=20 {
                    let cheb = dx.unsigned_abs().max(dy.unsigned_abs());
                    assert!(metric.ring(dx, dy) >= cheb, "{metric:?} ({dx},{dy})");
                }
            }
        }
    }
}
