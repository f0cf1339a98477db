use serde::{Deserialize, Serialize};

use crate::{ChoreoError, Result};

/// One sample of a normalized curve: time fraction mapped to value fraction.
///
/// Both coordinates are guaranteed to lie in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 2]", into = "[f64; 2]")]
pub struct CurvePoint {
    t: f64,
    v: f64,
}

impl CurvePoint {
    /// Creates a point, rejecting coordinates outside `[0, 1]` (and NaN).
    pub fn new(t: f64, v: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&t) || !(0.0..=1.0).contains(&v) {
            return Err(ChoreoError::PointOutOfRange { t, v });
        }
        Ok(Self { t, v })
    }

    /// Creates a point by saturating both coordinates into `[0, 1]`. NaN maps
    /// to `0.0`.
    pub fn saturating(t: f64, v: f64) -> Self {
        Self {
            t: unit(t),
            v: unit(v),
        }
    }

    pub fn t(&self) -> f64 {
        self.t
    }

    pub fn v(&self) -> f64 {
        self.v
    }
}

impl TryFrom<[f64; 2]> for CurvePoint {
    type Error = ChoreoError;

    fn try_from(value: [f64; 2]) -> Result<Self> {
        Self::new(value[0], value[1])
    }
}

impl From<CurvePoint> for [f64; 2] {
    fn from(point: CurvePoint) -> Self {
        [point.t, point.v]
    }
}

/// Ordered sequence of [`CurvePoint`]s, non-decreasing in `t`, at least two
/// points long. Duplicate `t` values encode instantaneous steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<CurvePoint>", into = "Vec<CurvePoint>")]
pub struct SampledCurve {
    points: Vec<CurvePoint>,
}

impl SampledCurve {
    pub fn new(points: Vec<CurvePoint>) -> Result<Self> {
        match points.len() {
            0 => return Err(ChoreoError::EmptyCurve("input")),
            1 => return Err(ChoreoError::InsufficientPoints(1)),
            _ => {}
        }

        if let Some(index) = points
            .windows(2)
            .position(|pair| pair[1].t < pair[0].t)
        {
            return Err(ChoreoError::NonMonotonicCurve { index: index + 1 });
        }

        Ok(Self { points })
    }

    /// Builds a curve from values evenly spaced over `t ∈ [0, 1]`. Values are
    /// saturated into `[0, 1]`.
    pub fn from_values<I>(values: I) -> Result<Self>
    where
        I: IntoIterator<Item = f64>,
        I::IntoIter: ExactSizeIterator,
    {
        let values = values.into_iter();
        let n = values.len();
        if n < 2 {
            return Err(ChoreoError::InsufficientPoints(n));
        }

        let points = values
            .enumerate()
            .map(|(i, v)| CurvePoint::saturating(grid_t(i, n), v))
            .collect();
        Ok(Self { points })
    }

    /// Samples `f` at `n` evenly spaced points in `[0, 1]`.
    pub fn sample(n: usize, f: impl Fn(f64) -> f64) -> Result<Self> {
        if n < 2 {
            return Err(ChoreoError::InvalidSampleCount(n));
        }
        Self::from_values((0..n).map(|i| f(grid_t(i, n))))
    }

    /// Flat curve at `value` with `n` samples.
    pub fn constant(value: f64, n: usize) -> Result<Self> {
        Self::sample(n, |_| value)
    }

    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(CurvePoint::v)
    }

    /// Interpolates the curve at `t`, clamped to the curve's own domain.
    ///
    /// At a step (duplicate `t`) the later point wins.
    pub fn value_at(&self, t: f64) -> f64 {
        let idx = self.points.partition_point(|p| p.t <= t);
        if idx == 0 {
            return self.points[0].v;
        }
        if idx == self.points.len() {
            return self.points[idx - 1].v;
        }

        let p0 = self.points[idx - 1];
        let p1 = self.points[idx];
        // p0.t <= t < p1.t, so the span is strictly positive.
        let frac = (t - p0.t) / (p1.t - p0.t);
        p0.v + (p1.v - p0.v) * frac
    }

    /// Resamples onto `n` evenly spaced output times in `[0, 1]`, reading the
    /// source across its own `[first.t, last.t]` domain.
    pub fn resample(&self, n: usize) -> Result<Self> {
        if n < 2 {
            return Err(ChoreoError::InvalidSampleCount(n));
        }

        let start = self.points[0].t;
        let end = self.points[self.points.len() - 1].t;
        let span = end - start;
        Self::from_values((0..n).map(|i| self.value_at(start + span * grid_t(i, n))))
    }

    /// Returns the curve flipped around `v = 0.5`.
    pub fn mirrored(&self) -> Self {
        Self {
            points: self
                .points
                .iter()
                .map(|p| CurvePoint::saturating(p.t, 1.0 - p.v))
                .collect(),
        }
    }

    /// Applies `f` to every value, keeping times. Results are saturated.
    pub fn map_values(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            points: self
                .points
                .iter()
                .map(|p| CurvePoint::saturating(p.t, f(p.v)))
                .collect(),
        }
    }

    pub fn min_value(&self) -> f64 {
        self.values().fold(f64::INFINITY, f64::min)
    }

    pub fn max_value(&self) -> f64 {
        self.values().fold(f64::NEG_INFINITY, f64::max)
    }
}

impl TryFrom<Vec<CurvePoint>> for SampledCurve {
    type Error = ChoreoError;

    fn try_from(points: Vec<CurvePoint>) -> Result<Self> {
        Self::new(points)
    }
}

impl From<SampledCurve> for Vec<CurvePoint> {
    fn from(curve: SampledCurve) -> Self {
        curve.points
    }
}

/// Time of sample `i` out of `n` evenly spaced samples over `[0, 1]`.
pub(crate) fn grid_t(i: usize, n: usize) -> f64 {
    if n <= 1 {
        0.0
    } else {
        i as f64 / (n - 1) as f64
    }
}

pub(crate) fn unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve(points: &[(f64, f64)]) -> SampledCurve {
        SampledCurve::new(
            points
                .iter()
                .map(|&(t, v)| CurvePoint::new(t, v).unwrap())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn rejects_short_and_unordered_input() {
        assert!(matches!(
            SampledCurve::new(Vec::new()),
            Err(ChoreoError::EmptyCurve(_))
        ));
        assert!(matches!(
            SampledCurve::new(vec![CurvePoint::new(0.0, 0.0).unwrap()]),
            Err(ChoreoError::InsufficientPoints(1))
        ));

        let err = SampledCurve::new(vec![
            CurvePoint::new(0.5, 0.0).unwrap(),
            CurvePoint::new(0.2, 0.0).unwrap(),
        ])
        .unwrap_err();
        assert!(matches!(err, ChoreoError::NonMonotonicCurve { index: 1 }));
    }

    #[test]
    fn points_outside_unit_square_are_rejected() {
        assert!(CurvePoint::new(1.2, 0.5).is_err());
        assert!(CurvePoint::new(0.5, -0.1).is_err());
        assert!(CurvePoint::new(f64::NAN, 0.5).is_err());

        let p = CurvePoint::saturating(1.5, f64::NAN);
        assert_eq!((p.t(), p.v()), (1.0, 0.0));
    }

    #[test]
    fn interpolates_linearly_and_steps_right_continuous() {
        let c = curve(&[(0.0, 0.0), (0.5, 0.2), (0.5, 0.8), (1.0, 1.0)]);

        assert!((c.value_at(0.25) - 0.1).abs() < 1e-12);
        assert_eq!(c.value_at(0.5), 0.8);
        assert!((c.value_at(0.75) - 0.9).abs() < 1e-12);
        assert_eq!(c.value_at(-1.0), 0.0);
        assert_eq!(c.value_at(2.0), 1.0);
    }

    #[test]
    fn resample_reads_the_curve_over_its_own_domain() {
        let c = curve(&[(0.2, 0.0), (0.6, 1.0)]);
        let r = c.resample(3).unwrap();

        let values: Vec<f64> = r.values().collect();
        assert_eq!(values, vec![0.0, 0.5, 1.0]);
        assert_eq!(r.points()[2].t(), 1.0);
    }

    #[test]
    fn serializes_as_pairs() {
        let c = curve(&[(0.0, 0.25), (1.0, 0.75)]);
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, "[[0.0,0.25],[1.0,0.75]]");

        let back: SampledCurve = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
        assert!(serde_json::from_str::<SampledCurve>("[[0.0,0.25]]").is_err());
    }

    #[test]
    fn mirrored_flips_values() {
        let c = curve(&[(0.0, 0.1), (1.0, 0.7)]).mirrored();
        let values: Vec<f64> = c.values().collect();
        assert!((values[0] - 0.9).abs() < 1e-12);
        assert!((values[1] - 0.3).abs() < 1e-12);
    }
}
