use crate::{Axis, ParameterizationLevel, ScalingParam};

/// Result alias that carries the custom [`ChoreoError`] type.
pub type Result<T> = std::result::Result<T, ChoreoError>;

/// Common error type for the core crate.
///
/// Every variant is fatal for the render request that raised it. Clamping is
/// never an error; it is reported through [`crate::Diagnostics`] instead.
#[derive(Debug, thiserror::Error)]
pub enum ChoreoError {
    /// A curve id that the registry has no definition for.
    #[error("unknown curve `{0}`")]
    UnknownCurve(String),
    /// A geometry pattern id that is in neither the symmetric nor the
    /// asymmetric set.
    #[error("unclassified geometry pattern `{0}`")]
    UnclassifiedGeometry(String),
    /// A (song-absolute, 1-indexed) bar that has no boundary in the beat grid.
    #[error("bar {bar} is not present in the beat grid ({available} bars available)")]
    BarNotInGrid { bar: u32, available: usize },
    #[error("inverted envelope on {axis} axis: min {min} > max {max}")]
    InvertedEnvelope { axis: Axis, min: f64, max: f64 },
    /// The avoid-backward window does not intersect the axis limits.
    #[error("avoid_backward leaves no forward range on the {axis} axis")]
    NoForwardRange { axis: Axis },
    #[error("unknown fixture or group `{0}`")]
    UnknownFixture(String),
    #[error("unknown section `{0}`")]
    UnknownSection(String),
    #[error("invalid intensity table: {0}")]
    InvalidIntensityTable(String),
    #[error("invalid beat grid: {0}")]
    InvalidGrid(String),
    #[error("invalid render config: {0}")]
    InvalidConfig(String),
    /// The curve has no points at all.
    #[error("{0} curve is empty")]
    EmptyCurve(&'static str),
    #[error("curve needs at least 2 points, got {0}")]
    InsufficientPoints(usize),
    #[error("curve time values must be non-decreasing (index {index})")]
    NonMonotonicCurve { index: usize },
    #[error("curve point ({t}, {v}) lies outside [0, 1]")]
    PointOutOfRange { t: f64, v: f64 },
    #[error("sample count must be at least 2, got {0}")]
    InvalidSampleCount(usize),
    /// A caller tried to rescale a curve whose taxonomy does not honor the
    /// parameter.
    #[error("curve `{curve}` is {level} and does not accept `{param}`")]
    ParameterRejected {
        curve: String,
        param: ScalingParam,
        level: ParameterizationLevel,
    },
    /// A malformed value in caller input (e.g. bar 0, bias outside `[0, 1]`).
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}
