use crate::{ChoreoError, CurvePoint, Result, SampledCurve};

/// Pointwise product of two curves after resampling both onto a shared grid.
///
/// `n_samples` defaults to `max(len(a), len(b), 2)`. Both inputs are read
/// across their own time domains, so a curve defined on `[0.2, 0.6]` is
/// stretched over the whole output.
pub fn multiply(
    a: &SampledCurve,
    b: &SampledCurve,
    n_samples: Option<usize>,
) -> Result<SampledCurve> {
    let n = n_samples.unwrap_or_else(|| a.len().max(b.len()).max(2));
    let a = a.resample(n)?;
    let b = b.resample(n)?;

    SampledCurve::from_values(a.values().zip(b.values()).map(|(x, y)| x * y).collect::<Vec<_>>())
}

/// Shapes `base` with `envelope`. Same operation as [`multiply`], named for
/// the layering use case (base motion × intensity envelope).
pub fn apply_envelope(
    base: &SampledCurve,
    envelope: &SampledCurve,
    n_samples: Option<usize>,
) -> Result<SampledCurve> {
    multiply(base, envelope, n_samples)
}

/// [`multiply`] over raw point slices, for callers that have not built
/// [`SampledCurve`]s yet.
pub fn multiply_points(
    a: &[CurvePoint],
    b: &[CurvePoint],
    n_samples: Option<usize>,
) -> Result<SampledCurve> {
    if a.is_empty() {
        return Err(ChoreoError::EmptyCurve("first"));
    }
    if b.is_empty() {
        return Err(ChoreoError::EmptyCurve("second"));
    }

    multiply(
        &SampledCurve::new(a.to_vec())?,
        &SampledCurve::new(b.to_vec())?,
        n_samples,
    )
}
